//! Integration tests for the per-file driver.

use querylint_checkers::{FileLinter, LintError};

#[test]
fn test_parse_failure_is_an_error_not_a_panic() {
    let mut ctx = querylint_core::install();
    let result = FileLinter::new(&mut ctx).lint_source("def broken(:\n", "bad");
    assert!(matches!(result, Err(LintError::Core(_))));
}

#[test]
fn test_context_survives_a_parse_failure() {
    let mut ctx = querylint_core::install();
    let _ = FileLinter::new(&mut ctx).lint_source("def broken(:\n", "bad");

    let findings = FileLinter::new(&mut ctx)
        .lint_source(
            "\
from django.contrib.auth.models import User

User.objects.filter(pk=1)
",
            "good",
        )
        .expect("second file should parse");
    assert_eq!(findings.len(), 1);
}

#[test]
fn test_shared_context_across_files() {
    // synthesis is memoized per context; a second file with the same model
    // name resolves against fresh per-file classes without interference
    let mut ctx = querylint_core::install();
    let source = "\
from django.db import models

class Person(models.Model):
    objects = models.Manager()

Person.objects.all()
";
    let first = FileLinter::new(&mut ctx)
        .lint_source(source, "one")
        .unwrap();
    let second = FileLinter::new(&mut ctx)
        .lint_source(source, "two")
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
}

#[test]
fn test_findings_come_back_in_source_order() {
    let mut ctx = querylint_core::install();
    let findings = FileLinter::new(&mut ctx)
        .lint_source(
            "\
from django.contrib.auth.models import User

User.objects.all()

def later():
    User.objects.exclude(pk=1)
",
            "app",
        )
        .unwrap();
    let lines: Vec<u32> = findings.iter().map(|f| f.location.line).collect();
    assert_eq!(lines, vec![3, 6]);
}

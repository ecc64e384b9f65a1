//! Integration tests for the unassigned-queryset-expression checker.

use querylint_checkers::{DefectCode, FileLinter, Finding};

fn lint(source: &str) -> Vec<Finding> {
    let mut ctx = querylint_core::install();
    FileLinter::new(&mut ctx)
        .lint_source(source, "app")
        .expect("source should parse")
}

#[test]
fn test_bare_filter_on_declared_manager_is_flagged() {
    let findings = lint(
        "\
from django.db import models

class Person(models.Model):
    objects = models.Manager()

Person.objects.filter(x=1)
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::UnassignedQueryExpr);
    assert_eq!(findings[0].location.line, 6);
}

#[test]
fn test_assigned_filter_is_not_flagged() {
    let findings = lint(
        "\
from django.db import models

class Person(models.Model):
    objects = models.Manager()

x = Person.objects.filter(x=1)
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_returned_filter_is_not_flagged() {
    let findings = lint(
        "\
from django.contrib.auth.models import User

def latest_admins():
    return User.objects.filter(is_staff=True)
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_default_manager_injection_covers_undeclared_manager() {
    let findings = lint(
        "\
from django.db import models

class Person(models.Model):
    pass

Person.objects.all()
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::UnassignedQueryExpr);
}

#[test]
fn test_materializing_calls_are_not_flagged() {
    // get/count/exists consume the builder; nothing is discarded
    let findings = lint(
        "\
from django.contrib.auth.models import User

User.objects.get(pk=1)
User.objects.count()
User.objects.exists()
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_manager_variable_is_flagged() {
    let findings = lint(
        "\
from django.contrib.auth.models import User

manager = User.objects
manager.select_related()
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].location.line, 4);
}

#[test]
fn test_queryset_subclass_method_on_self() {
    let findings = lint(
        "\
from django.db import models

class PersonQuerySet(models.QuerySet):
    def authors(self):
        self.filter(role='A')

    def editors(self):
        return self.filter(role='E')
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].location.line, 5);
}

#[test]
fn test_unresolvable_call_is_silently_skipped() {
    // inference failure is an oracle limitation, not a defect
    let findings = lint("unknown_thing.filter(x=1)\n");
    assert!(findings.is_empty());
}

#[test]
fn test_each_bare_statement_gets_one_finding() {
    let findings = lint(
        "\
from django.contrib.auth.models import User

qs = User.objects.all()
qs.filter(first_name='A')
qs.exclude(first_name='B')
",
    );
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].location.line, 4);
    assert_eq!(findings[1].location.line, 5);
}

#[test]
fn test_rebound_queryset_still_flagged() {
    let findings = lint(
        "\
from django.contrib.auth.models import User

qs = User.objects.all()
qs = qs.order_by('first_name')
qs.filter(first_name='C')
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].location.line, 5);
}

#[test]
fn test_full_fixture_matches_expected_lines() {
    // mirror of the classic misuse fixture: three discarded chains
    let findings = lint(
        "\
from django.contrib.auth.models import User
from django.db import models


def test():
    qs = User.objects.all()
    qs.filter(first_name='A')

    manager = User.objects
    manager.select_related()
    qs = qs.order_by('first_name')
    return qs.filter(first_name='C')


class PersonQuerySet(models.QuerySet):

    def authors(self):
        self.filter(role='A')

    def editors(self):
        return self.filter(role='E')
",
    );
    let lines: Vec<u32> = findings.iter().map(|f| f.location.line).collect();
    assert_eq!(lines, vec![7, 10, 18]);
    assert!(findings
        .iter()
        .all(|f| f.code == DefectCode::UnassignedQueryExpr));
}

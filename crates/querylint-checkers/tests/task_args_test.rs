//! Integration tests for the task-argument-safety checker.

use querylint_checkers::{DefectCode, FileLinter, Finding};

fn lint(source: &str) -> Vec<Finding> {
    let mut ctx = querylint_core::install();
    FileLinter::new(&mut ctx)
        .lint_source(source, "app")
        .expect("source should parse")
}

const PREAMBLE: &str = "\
from celery import Celery
from django.contrib.auth.models import User

app = Celery('proj')

@app.task
def notify(arg):
    pass

";

fn lint_with_task(body: &str) -> Vec<Finding> {
    lint(&format!("{PREAMBLE}{body}"))
}

#[test]
fn test_direct_call_with_model_instance() {
    let findings = lint_with_task(
        "\
person = User.objects.get(pk=1)
notify.delay(person)
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
    assert_eq!(findings[0].location.line, 11);
}

#[test]
fn test_direct_call_with_queryset() {
    let findings = lint_with_task("notify.delay(User.objects.filter(pk=1))\n");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithQueryset);
}

#[test]
fn test_direct_call_with_scalar_is_clean() {
    let findings = lint_with_task("notify.delay(42)\nnotify.delay('x')\n");
    assert!(findings.is_empty());
}

#[test]
fn test_direct_call_keyword_argument() {
    let findings = lint_with_task(
        "\
person = User.objects.get(pk=1)
notify.delay(user=person)
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

#[test]
fn test_every_dispatch_method_is_covered() {
    for method in ["delay", "si", "s", "signature"] {
        let findings = lint_with_task(&format!(
            "person = User.objects.get(pk=1)\nnotify.{method}(person)\n"
        ));
        assert_eq!(findings.len(), 1, "method {method}");
    }
}

#[test]
fn test_args_call_with_literal_list() {
    let findings = lint_with_task(
        "\
person = User.objects.get(pk=1)
notify.apply_async(args=[person])
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

#[test]
fn test_args_call_with_positional_tuple() {
    let findings = lint_with_task(
        "\
person = User.objects.get(pk=1)
notify.apply((person,))
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

#[test]
fn test_args_call_with_opaque_variable_is_clean() {
    // never guess at a non-literal argument container
    let findings = lint_with_task(
        "\
person = User.objects.get(pk=1)
payload = [person]
notify.apply_async(args=payload)
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_args_call_with_kwargs_dict() {
    let findings = lint_with_task(
        "notify.apply_async(kwargs={'who': User.objects.filter(pk=1)})\n",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithQueryset);
}

#[test]
fn test_at_most_one_finding_per_call() {
    // scanning stops at the first unsafe argument
    let findings = lint_with_task(
        "\
person = User.objects.get(pk=1)
notify.delay(person, User.objects.filter(pk=1))
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

#[test]
fn test_args_call_positional_args_checked_before_kwargs() {
    let findings = lint_with_task(
        "\
person = User.objects.get(pk=1)
notify.apply_async(args=[person], kwargs={'who': User.objects.filter(pk=1)})
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

#[test]
fn test_shared_task_decorator_registers() {
    let findings = lint(
        "\
from celery import shared_task
from django.contrib.auth.models import User

@shared_task
def notify(arg):
    pass

notify.delay(User.objects.get(pk=1))
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

#[test]
fn test_undecorated_function_is_not_a_task() {
    let findings = lint(
        "\
from django.contrib.auth.models import User

def notify(arg):
    pass

notify.delay(User.objects.get(pk=1))
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_plain_decorator_without_task_name_is_ignored() {
    let findings = lint(
        "\
from django.contrib.auth.models import User

def wrap(f):
    return f

@wrap
def notify(arg):
    pass

notify.delay(User.objects.get(pk=1))
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_decorator_after_call_site_is_not_recognized() {
    // classification happens in the same pass as call checking; a task
    // defined lexically after the call that references it is unknown there
    let findings = lint(
        "\
from celery import shared_task
from django.contrib.auth.models import User

person = User.objects.get(pk=1)

def call_early():
    notify.delay(person)

@shared_task
def notify(user):
    pass
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_decorator_before_call_site_is_recognized() {
    let findings = lint(
        "\
from celery import shared_task
from django.contrib.auth.models import User

person = User.objects.get(pk=1)

@shared_task
def notify(user):
    pass

def call_late():
    notify.delay(person)
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

#[test]
fn test_unresolvable_decorator_aborts_classification() {
    // `task` matches by name but cannot be inferred; classification of the
    // whole function stops there, even though a later decorator would match
    let findings = lint(
        "\
from celery import shared_task
from django.contrib.auth.models import User

@task
@shared_task
def notify(arg):
    pass

notify.delay(User.objects.get(pk=1))
",
    );
    assert!(findings.is_empty());
}

#[test]
fn test_annotated_parameter_counts_as_model_instance() {
    let findings = lint(
        "\
from celery import Celery
from django.contrib.auth.models import User

app = Celery('proj')

@app.task
def notify(arg):
    pass

def forward(person: User):
    notify.delay(person)
",
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].code, DefectCode::TaskCallWithModelInstance);
}

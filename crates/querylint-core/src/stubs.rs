//! Library prelude
//!
//! Stand-in class hierarchy for the parts of the ORM and task-queue
//! libraries the checks care about, plus a dotted-path table so plain and
//! from-imports of these names resolve. This replaces "parse the installed
//! library on demand": only the names below are known; attribute lookups on
//! known modules that miss the table infer as unknown rather than failing.

use indexmap::IndexMap;

use crate::types::{ClassId, ClassInfo, ClassRegistry, MemberDef, ReturnContract};

pub const MODEL_QNAME: &str = "django.db.models.base.Model";
pub const BASE_MANAGER_QNAME: &str = "django.db.models.manager.BaseManager";
pub const MANAGER_QNAME: &str = "django.db.models.manager.Manager";
pub const QUERYSET_QNAME: &str = "django.db.models.query.QuerySet";
pub const RAW_QUERYSET_QNAME: &str = "django.db.models.query.RawQuerySet";
pub const CELERY_APP_QNAME: &str = "celery.app.base.Celery";
pub const SHARED_TASK_QNAME: &str = "celery.app.shared_task";

/// Resolved entry for one qualified name.
#[derive(Debug, Clone)]
pub enum PreludeEntry {
    Class(ClassId),
    /// Canonical qualified name of a library function.
    Function(String),
    Module,
}

#[derive(Debug)]
pub struct Prelude {
    pub model: ClassId,
    pub base_manager: ClassId,
    pub manager: ClassId,
    pub queryset: ClassId,
    pub raw_queryset: ClassId,
    pub celery_app: ClassId,
    pub auth_user: ClassId,
    paths: IndexMap<String, PreludeEntry>,
}

impl Prelude {
    pub fn lookup(&self, qname: &str) -> Option<&PreludeEntry> {
        self.paths.get(qname)
    }
}

/// Register the stub classes and build the path table.
pub fn build(classes: &mut ClassRegistry) -> Prelude {
    let model = classes.add(ClassInfo::new("Model", MODEL_QNAME));
    let base_manager = classes.add(ClassInfo::new("BaseManager", BASE_MANAGER_QNAME));
    let manager = classes.add(ClassInfo::new("Manager", MANAGER_QNAME).with_base(base_manager));
    let queryset = classes.add(ClassInfo::new("QuerySet", QUERYSET_QNAME));
    let raw_queryset = classes.add(ClassInfo::new("RawQuerySet", RAW_QUERYSET_QNAME));

    let mut celery = ClassInfo::new("Celery", CELERY_APP_QNAME);
    // Decorator factory; the checkers only ever ask what it is bound to.
    celery.members.insert(
        "task".to_string(),
        MemberDef::Method { contract: ReturnContract::Opaque },
    );
    let celery_app = classes.add(celery);

    let auth_user = classes.add(ClassInfo::new("User", "django.contrib.auth.models.User").with_base(model));

    let mut paths = IndexMap::new();
    for module in [
        "django",
        "django.db",
        "django.db.models",
        "django.db.models.base",
        "django.db.models.manager",
        "django.db.models.query",
        "django.contrib",
        "django.contrib.auth",
        "django.contrib.auth.models",
        "celery",
        "celery.app",
        "celery.app.base",
    ] {
        paths.insert(module.to_string(), PreludeEntry::Module);
    }

    let classes_by_path: &[(&str, ClassId)] = &[
        ("django.db.models.Model", model),
        ("django.db.models.base.Model", model),
        ("django.db.models.Manager", manager),
        ("django.db.models.manager.Manager", manager),
        ("django.db.models.manager.BaseManager", base_manager),
        ("django.db.models.QuerySet", queryset),
        ("django.db.models.query.QuerySet", queryset),
        ("django.db.models.query.RawQuerySet", raw_queryset),
        ("celery.Celery", celery_app),
        ("celery.app.base.Celery", celery_app),
        ("django.contrib.auth.models.User", auth_user),
    ];
    for (path, id) in classes_by_path {
        paths.insert(path.to_string(), PreludeEntry::Class(*id));
    }

    for alias in ["celery.shared_task", "celery.app.shared_task"] {
        paths.insert(
            alias.to_string(),
            PreludeEntry::Function(SHARED_TASK_QNAME.to_string()),
        );
    }

    Prelude {
        model,
        base_manager,
        manager,
        queryset,
        raw_queryset,
        celery_app,
        auth_user,
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_extends_base_manager() {
        let mut classes = ClassRegistry::new();
        let prelude = build(&mut classes);
        let info = classes.get(prelude.manager);
        assert_eq!(info.qname, MANAGER_QNAME);
        assert!(info
            .bases
            .iter()
            .any(|b| *b == crate::types::BaseSlot::Resolved(prelude.base_manager)));
    }

    #[test]
    fn test_lookup_covers_both_import_spellings() {
        let mut classes = ClassRegistry::new();
        let prelude = build(&mut classes);
        for path in ["django.db.models.Model", "django.db.models.base.Model"] {
            match prelude.lookup(path) {
                Some(PreludeEntry::Class(id)) => assert_eq!(*id, prelude.model),
                other => panic!("unexpected entry for {path}: {other:?}"),
            }
        }
        assert!(matches!(
            prelude.lookup("celery.shared_task"),
            Some(PreludeEntry::Function(q)) if q == SHARED_TASK_QNAME
        ));
    }
}

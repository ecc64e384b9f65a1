//! Augmented symbol-table overlay
//!
//! Synthetic members are never written into the classes they belong to;
//! they live in a separate mapping from (type identity, member name) to the
//! member definition, consulted by the oracle before declared members. This
//! keeps augmentation inspectable and leaves the real tables untouched.
//! Entries are appended or overwritten, never removed mid-run.

use indexmap::IndexMap;

use crate::types::{ClassId, MemberDef};

#[derive(Debug, Default)]
pub struct SymbolOverlay {
    entries: IndexMap<(ClassId, String), MemberDef>,
}

impl SymbolOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a synthetic member, overwriting on name collision.
    pub fn insert(&mut self, class: ClassId, name: impl Into<String>, member: MemberDef) {
        self.entries.insert((class, name.into()), member);
    }

    pub fn get(&self, class: ClassId, name: &str) -> Option<&MemberDef> {
        self.entries.get(&(class, name.to_string()))
    }

    pub fn contains(&self, class: ClassId, name: &str) -> bool {
        self.get(class, name).is_some()
    }

    /// Names injected for one type, in insertion order.
    pub fn member_names(&self, class: ClassId) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .filter(move |(c, _)| *c == class)
            .map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReturnContract;

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut overlay = SymbolOverlay::new();
        let class = ClassId(0);
        overlay.insert(class, "filter", MemberDef::Method { contract: ReturnContract::Opaque });
        overlay.insert(
            class,
            "filter",
            MemberDef::Method { contract: ReturnContract::FreshBuilder },
        );
        assert_eq!(overlay.len(), 1);
        assert!(matches!(
            overlay.get(class, "filter"),
            Some(MemberDef::Method { contract: ReturnContract::FreshBuilder })
        ));
    }

    #[test]
    fn test_member_names_scoped_to_class() {
        let mut overlay = SymbolOverlay::new();
        overlay.insert(ClassId(0), "all", MemberDef::Method { contract: ReturnContract::FreshBuilder });
        overlay.insert(ClassId(1), "get", MemberDef::Method { contract: ReturnContract::ModelInstance });
        let names: Vec<_> = overlay.member_names(ClassId(0)).collect();
        assert_eq!(names, vec!["all"]);
    }
}

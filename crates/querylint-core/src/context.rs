//! Analysis context
//!
//! All augmentation state lives in one explicit object created by
//! [`install`] and threaded through per-file analyses. Independent contexts
//! are fully isolated, so tests can run analyses side by side. State only
//! grows: classes, overlay entries, and synthesized fragments are appended
//! or overwritten for the lifetime of the context, never removed.

use std::collections::HashSet;

use crate::overlay::SymbolOverlay;
use crate::stubs::{self, Prelude};
use crate::synthetic::{self, SynthCache, BUILDER_METHODS};
use crate::transforms::{self, TransformRegistry};
use crate::types::{ClassId, ClassRegistry, MemberDef};

pub struct AnalysisContext {
    pub classes: ClassRegistry,
    pub overlay: SymbolOverlay,
    pub transforms: TransformRegistry,
    pub synth: SynthCache,
    pub prelude: Prelude,
    /// Classes whose class-shaped transform rules have already run.
    pub augmented: HashSet<ClassId>,
}

/// Build a ready-to-use context: library stubs, the three transform rules,
/// and the generic builder surface on the native builder and manager bases
/// (so chains over un-specialized library types still resolve).
pub fn install() -> AnalysisContext {
    let mut classes = ClassRegistry::new();
    let prelude = stubs::build(&mut classes);

    let mut registry = TransformRegistry::default();
    transforms::register_default_rules(&mut registry);

    let mut overlay = SymbolOverlay::new();
    let mut synth = SynthCache::default();

    // Generic extension of the native builder base: the full synthetic
    // surface with contracts late-bound to the stub model.
    let generic = synthetic::synthesize(
        &mut classes,
        &mut synth,
        prelude.queryset,
        prelude.model,
        prelude.base_manager,
    );
    let members: Vec<(String, MemberDef)> = classes
        .get(generic.queryset)
        .members
        .iter()
        .map(|(name, member)| (name.clone(), member.clone()))
        .collect();
    for (name, member) in members {
        overlay.insert(prelude.queryset, name, member);
    }
    for (name, contract) in BUILDER_METHODS {
        overlay.insert(
            prelude.base_manager,
            *name,
            MemberDef::Method { contract: *contract },
        );
    }

    tracing::debug!(
        classes = classes.len(),
        overlay = overlay.len(),
        rules = registry.len(),
        "analysis context installed"
    );

    AnalysisContext {
        classes,
        overlay,
        transforms: registry,
        synth,
        prelude,
        augmented: HashSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_registers_rules_once() {
        let ctx = install();
        assert_eq!(ctx.transforms.len(), 3);
    }

    #[test]
    fn test_generic_builder_surface_present() {
        let ctx = install();
        assert!(ctx.overlay.contains(ctx.prelude.queryset, "filter"));
        assert!(ctx.overlay.contains(ctx.prelude.queryset, "__getitem__"));
        assert!(ctx.overlay.contains(ctx.prelude.base_manager, "all"));
        // protocol members stay off the manager base
        assert!(!ctx.overlay.contains(ctx.prelude.base_manager, "__iter__"));
    }

    #[test]
    fn test_contexts_are_isolated() {
        let a = install();
        let b = install();
        assert_eq!(a.classes.len(), b.classes.len());
        assert!(a.augmented.is_empty() && b.augmented.is_empty());
    }
}

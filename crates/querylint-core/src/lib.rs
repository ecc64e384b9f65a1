//! # Querylint Core
//!
//! Inference-augmentation core for the querylint static analyzer.
//!
//! The ORM and task-queue libraries this tool targets assemble their
//! user-facing surface at run time, so plain type inference over application
//! code comes back empty exactly where the interesting defects live. This
//! crate teaches inference about that surface:
//!
//! - **[`synthetic`]** - on-demand synthesis of the builder-method mixin and
//!   a concrete builder type, late-bound to the model/manager classes found
//!   at the call site
//! - **[`transforms`]** - pattern-triggered rules that inject synthetic
//!   members or override a call's inferred result, consulted lazily while a
//!   query runs
//! - **[`overlay`]** - the augmented symbol table: (type, member) entries
//!   consulted before declared members, leaving real tables untouched
//! - **[`resolver`]** - the reference oracle: best-effort lazy resolution
//!   over the lowered AST, with a small library prelude ([`stubs`])
//! - **[`oracle`]** - the interface checkers consume; everything above is
//!   reachable through it
//!
//! [`context::install`] wires the pieces together once; per-file analyses
//! borrow the context and stay isolated from other contexts.

pub mod ast_bridge;
pub mod context;
pub mod hir;
pub mod oracle;
pub mod overlay;
pub mod resolver;
pub mod span;
pub mod stubs;
pub mod synthetic;
pub mod transforms;
pub mod types;

use thiserror::Error;

/// Errors surfaced by the core itself. Inference failures are not errors;
/// see [`oracle::InferenceError`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("python parse error: {0}")]
    Parse(String),
}

pub use ast_bridge::parse_module;
pub use context::{install, AnalysisContext};
pub use oracle::{Candidates, InferenceError, InferenceOracle};
pub use resolver::Resolver;
pub use span::{LineIndex, Location, Span};
pub use types::{ClassId, InferredType};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::context::{install, AnalysisContext};
    pub use crate::hir::{ExprId, ExprKind, HirModule, StmtId, StmtKind};
    pub use crate::oracle::{Candidates, InferenceError, InferenceOracle};
    pub use crate::resolver::Resolver;
    pub use crate::span::Location;
    pub use crate::types::{FunctionRef, InferredType};
}

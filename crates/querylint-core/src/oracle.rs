//! Interface consumed from the inference oracle
//!
//! Checkers and transform rules are written against this trait, not against
//! the reference resolver. Candidate sequences are ordered; consumers stop
//! at the first match, and a failure signal is always swallowed at the query
//! site; a missing answer never becomes a finding.

use smallvec::SmallVec;
use thiserror::Error;

use crate::hir::{Binding, ExprId, ScopeId};
use crate::types::{ClassId, InferredType};

/// Ordered candidate sequence for one expression.
pub type Candidates = SmallVec<[InferredType; 4]>;

/// Inference failed for a query. Expected, frequent, and non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("name `{0}` cannot be resolved")]
    Unresolved(String),
    #[error("inference recursed into an expression already being inferred")]
    Recursion,
    #[error("unsupported node shape")]
    Unsupported,
}

pub trait InferenceOracle {
    /// Candidate runtime types for an expression, in preference order.
    fn resolve_types(&mut self, node: ExprId) -> Result<Candidates, InferenceError>;

    /// First binding of `name` visible from `scope`, if any.
    fn lookup_binding(&self, scope: ScopeId, name: &str) -> Option<Binding>;

    /// Whether `ty` is (an instance of) a subtype of the qualified name.
    fn subtype_of(&mut self, ty: &InferredType, qname: &str) -> bool;

    /// The bound receiver type, when `ty` is a bound method.
    fn is_bound_method(&self, ty: &InferredType) -> Option<ClassId>;
}

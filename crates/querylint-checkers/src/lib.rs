//! # Querylint Checkers
//!
//! The two defect checkers and the per-file driver.
//!
//! - **[`queryset_expr`]** - flags queryset chains evaluated as bare
//!   statements (the computed query is discarded)
//! - **[`task_args`]** - flags task dispatch calls passing a live model
//!   instance or an un-evaluated queryset across the process boundary
//! - **[`driver`]** - one pre-order traversal per file, dispatching both
//!   checkers against the shared oracle
//! - **[`findings`]** - the finding model and report sink
//!
//! ## Quick start
//!
//! ```
//! use querylint_checkers::prelude::*;
//!
//! let mut ctx = querylint_core::install();
//! let findings = FileLinter::new(&mut ctx)
//!     .lint_source("x = 1\n", "app")
//!     .unwrap();
//! assert!(findings.is_empty());
//! ```

pub mod driver;
pub mod findings;
pub mod queryset_expr;
pub mod task_args;

pub use driver::{FileLinter, LintError};
pub use findings::{DefectCode, Finding, ReportSink};
pub use queryset_expr::QuerysetExprChecker;
pub use task_args::TaskArgsChecker;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::driver::{FileLinter, LintError};
    pub use crate::findings::{DefectCode, Finding, ReportSink};
    pub use crate::queryset_expr::QuerysetExprChecker;
    pub use crate::task_args::TaskArgsChecker;
}

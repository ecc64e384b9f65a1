//! Finding model and report sink
//!
//! A finding is immutable once produced: defect code, the one-line message,
//! the longer rationale, and a source location. Checkers append at most one
//! finding per visited node to the sink.

use serde::{Serialize, Serializer};

use querylint_core::span::Location;

/// Defect classes this analyzer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectCode {
    UnassignedQueryExpr,
    TaskCallWithModelInstance,
    TaskCallWithQueryset,
}

impl DefectCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectCode::UnassignedQueryExpr => "QL001",
            DefectCode::TaskCallWithModelInstance => "QL002",
            DefectCode::TaskCallWithQueryset => "QL003",
        }
    }

    /// Stable symbolic id, usable for suppression configuration.
    pub fn message_id(&self) -> &'static str {
        match self {
            DefectCode::UnassignedQueryExpr => "queryset-expr-not-assigned",
            DefectCode::TaskCallWithModelInstance => "task-call-with-model-instance",
            DefectCode::TaskCallWithQueryset => "task-call-with-queryset",
        }
    }
}

impl Serialize for DefectCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub code: DefectCode,
    pub short_message: &'static str,
    pub long_message: &'static str,
    pub location: Location,
}

impl Finding {
    pub fn unassigned_query_expr(location: Location) -> Self {
        Self {
            code: DefectCode::UnassignedQueryExpr,
            short_message: "Queryset expression is not assigned.",
            long_message: "Operations over a queryset are lazy and have no effect on their \
                           own; the result should be assigned to something or returned.",
            location,
        }
    }

    pub fn task_call_with_model_instance(location: Location) -> Self {
        Self {
            code: DefectCode::TaskCallWithModelInstance,
            short_message: "Celery task call with model instance as argument.",
            long_message: "Tasks run in another process; a model instance crossing that \
                           boundary goes stale. Pass the primary key and fetch the instance \
                           inside the task.",
            location,
        }
    }

    pub fn task_call_with_queryset(location: Location) -> Self {
        Self {
            code: DefectCode::TaskCallWithQueryset,
            short_message: "Celery task call with queryset as argument.",
            long_message: "Querysets are not meaningfully transferable across a process \
                           boundary. Pass the values needed to rebuild the query inside \
                           the task.",
            location,
        }
    }
}

/// Where checkers deliver findings. The host owns the sink.
pub trait ReportSink {
    fn report(&mut self, finding: Finding);
}

impl ReportSink for Vec<Finding> {
    fn report(&mut self, finding: Finding) {
        self.push(finding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(DefectCode::UnassignedQueryExpr.as_str(), "QL001");
        assert_eq!(DefectCode::TaskCallWithModelInstance.as_str(), "QL002");
        assert_eq!(DefectCode::TaskCallWithQueryset.as_str(), "QL003");
    }

    #[test]
    fn test_finding_serializes_to_json() {
        let finding = Finding::unassigned_query_expr(Location { line: 7, column: 5 });
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["code"], "QL001");
        assert_eq!(json["location"]["line"], 7);
        assert_eq!(json["location"]["column"], 5);
    }
}

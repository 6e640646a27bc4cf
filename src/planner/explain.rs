//! Explain output
//!
//! Deterministic, human-readable description of a plan or of the reason a
//! request was rejected.

use std::fmt;

use serde::Serialize;

use super::errors::PlannerError;
use super::planner::{QueryPlan, SortStrategy};

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// Table queried
    pub table: Option<String>,
    /// Row source description
    pub anchor: Option<String>,
    /// Chained predicates, in application order
    pub predicates: Vec<String>,
    /// Sort description
    pub sort: Option<String>,
    /// 1-based offset of the page
    pub offset: Option<usize>,
    /// Page size
    pub limit: Option<usize>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let predicates = plan
            .predicates
            .iter()
            .map(|p| p.filter().describe())
            .collect();

        let sort = match &plan.sort {
            SortStrategy::Native(target) => {
                format!("NATIVE {} {}", target, plan.direction.as_str())
            }
            SortStrategy::InMemory(key) => {
                format!("IN_MEMORY {} {}", key, plan.direction.as_str())
            }
        };

        Self {
            accepted: true,
            table: Some(plan.table.clone()),
            anchor: Some(plan.anchor.to_string()),
            predicates,
            sort: Some(sort),
            offset: Some(plan.page.skip + 1),
            limit: Some(plan.page.limit),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            table: None,
            anchor: None,
            predicates: Vec::new(),
            sort: None,
            offset: None,
            limit: None,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(table) = &self.table {
                writeln!(f, "Table: {}", table)?;
            }
            if let Some(anchor) = &self.anchor {
                writeln!(f, "Anchor: {}", anchor)?;
            }
            if !self.predicates.is_empty() {
                writeln!(f, "Predicates:")?;
                for pred in &self.predicates {
                    writeln!(f, "  - {}", pred)?;
                }
            }
            if let Some(sort) = &self.sort {
                writeln!(f, "Sort: {}", sort)?;
            }
            if let (Some(offset), Some(limit)) = (self.offset, self.limit) {
                writeln!(f, "Page: offset {} limit {}", offset, limit)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::filter::{Filter, FilterMethod};
    use crate::planner::QueryPlanner;
    use crate::request::{QueryRequest, SortDirection};
    use crate::schema::{IndexSpec, TableSchema};

    fn explain(request: &QueryRequest) -> ExplainPlan {
        let schema = TableSchema::unnamed().with_index(IndexSpec::single("age"));
        let config = EngineConfig::default();
        let plan = QueryPlanner::new(&schema, &config).plan(request).unwrap();
        ExplainPlan::from_plan(&plan)
    }

    #[test]
    fn test_explain_key_range() {
        let request = QueryRequest::new("log")
            .with_filter(Filter::on_key(FilterMethod::Above, "5"))
            .with_filter(Filter::new("msg", FilterMethod::Contains, "err"))
            .page(11, 10);
        let explain = explain(&request);

        assert!(explain.accepted);
        assert_eq!(explain.offset, Some(11));
        assert_eq!(explain.limit, Some(10));
        assert_eq!(explain.predicates.len(), 1);

        let output = format!("{}", explain);
        assert!(output.contains("ACCEPTED"));
        assert!(output.contains("KEY_RANGE"));
        assert!(output.contains("inAnyRange((5, +inf))"));
        assert!(output.contains("NATIVE :id asc"));
    }

    #[test]
    fn test_explain_in_memory_sort() {
        let request = QueryRequest::new("log")
            .with_filter(Filter::new("age", FilterMethod::Equal, "3").indexed())
            .order_by("msg", SortDirection::Desc);
        let output = explain(&request).to_string();
        assert!(output.contains("INDEX age anyOf"));
        assert!(output.contains("IN_MEMORY msg desc"));
    }

    #[test]
    fn test_explain_rejected_plan() {
        let err = PlannerError::limit_required();
        let explain = ExplainPlan::from_error(&err);

        assert!(!explain.accepted);
        assert_eq!(explain.rejection_code, Some("SCOPE_QUERY_LIMIT_REQUIRED".into()));

        let output = format!("{}", explain);
        assert!(output.contains("REJECTED"));
        assert!(output.contains("SCOPE_QUERY_LIMIT_REQUIRED"));
    }

    #[test]
    fn test_explain_deterministic() {
        let request = QueryRequest::new("log").with_filter(Filter::on_key(FilterMethod::NotEqual, "2"));
        assert_eq!(explain(&request).to_string(), explain(&request).to_string());
    }
}

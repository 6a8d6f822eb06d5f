use std::fmt;

use serde::Serialize;

use crate::mapping::{ConflictRecord, TableCounts};

/// Structured summary of one user action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionReport {
    /// Action name, e.g. "auto_detect"
    pub action: String,
    /// Human-readable one-line summary
    pub message: String,
    pub mapped: usize,
    pub unmapped: usize,
    pub disabled: usize,
    pub conflicts: Vec<ConflictRecord>,
    /// Per-slot notes: rejected candidates, skipped mirrors, disabled rows
    pub details: Vec<String>,
}

impl ActionReport {
    pub fn new(action: &str, message: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, counts: TableCounts) -> Self {
        self.mapped = counts.mapped;
        self.unmapped = counts.unmapped;
        self.disabled = counts.disabled;
        self
    }

    pub fn with_conflicts(mut self, conflicts: Vec<ConflictRecord>) -> Self {
        self.conflicts = conflicts;
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} mapped, {} unmapped, {} disabled)",
            self.action, self.message, self.mapped, self.unmapped, self.disabled
        )?;
        for conflict in &self.conflicts {
            write!(f, "\n  conflict {}", conflict)?;
        }
        for detail in &self.details {
            write!(f, "\n  {}", detail)?;
        }
        Ok(())
    }
}

/// Success flag plus report, returned by every session action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub report: ActionReport,
}

impl ActionOutcome {
    pub fn ok(report: ActionReport) -> Self {
        Self {
            success: true,
            report,
        }
    }

    pub fn failed(report: ActionReport) -> Self {
        Self {
            success: false,
            report,
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.success {
            f.write_str("FAILED ")?;
        }
        self.report.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = ActionReport::new("validate_mappings", "1 disabled")
            .with_counts(TableCounts {
                mapped: 3,
                unmapped: 2,
                disabled: 1,
            })
            .with_details(vec!["\" L Hand\": source bone not found in skeleton".to_string()]);
        let text = report.to_string();
        assert!(text.starts_with("validate_mappings: 1 disabled (3 mapped, 2 unmapped, 1 disabled)"));
        assert!(text.contains("\n  \" L Hand\""));
    }

    #[test]
    fn test_failed_outcome_display() {
        let outcome = ActionOutcome::failed(ActionReport::new("auto_detect", "no source skeleton"));
        assert!(!outcome.success);
        assert!(outcome.to_string().starts_with("FAILED auto_detect"));
    }
}

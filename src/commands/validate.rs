use tracing::info;

use crate::mapping::validate_and_disable_invalid;

use super::report::ActionOutcome;
use super::session::MappingSession;

impl MappingSession {
    /// Disable rows that no longer fit the selected skeleton or the
    /// vocabulary. Nothing is deleted.
    pub fn validate_mappings(&mut self) -> ActionOutcome {
        const ACTION: &str = "validate_mappings";

        let skeleton = match self.require_source() {
            Ok(skeleton) => skeleton.clone(),
            Err(e) => return self.failure(ACTION, e),
        };

        let result = validate_and_disable_invalid(&mut self.table, &skeleton, &self.vocabulary);
        let message = format!(
            "{} valid, {} disabled",
            result.valid_count,
            result.disabled.len()
        );
        info!("validate_mappings: {}", message);

        let details = result
            .disabled
            .iter()
            .map(|d| format!("{:?} <- {:?}: {}", d.target_bone, d.source_bone, d.reason))
            .collect();
        ActionOutcome::ok(self.report(ACTION, message).with_details(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{DetectionMethod, MappingEntry};
    use crate::skeleton::Skeleton;

    #[test]
    fn test_validate_without_source_fails() {
        let mut session = MappingSession::default();
        assert!(!session.validate_mappings().success);
    }

    #[test]
    fn test_validate_reports_disabled_rows() {
        let mut session = MappingSession::default();
        let skeleton = Skeleton::from_pairs([("Hips", None), ("Head", Some("Hips"))])
            .unwrap()
            .with_name("rig");
        session.select_source(skeleton.clone());
        session
            .table
            .set(MappingEntry::new("Head", "Head", DetectionMethod::Manual, 1.0));
        session
            .table
            .set(MappingEntry::new("Pelvis", "Hips", DetectionMethod::Automatic, 0.9));

        session.select_source(skeleton.without_bone("Head").unwrap());
        let outcome = session.validate_mappings();

        assert!(outcome.success);
        assert_eq!(outcome.report.details.len(), 1);
        assert!(outcome.report.details[0].starts_with("\"Head\""));
        assert_eq!(outcome.report.mapped, 1);
        assert_eq!(outcome.report.disabled, 1);
        // Still present for review.
        assert_eq!(session.table().get("Head").unwrap().source_bone, "Head");
    }
}

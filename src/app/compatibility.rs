//! Decides whether a statement plans (and optionally runs) on the target.
//!
//! The hint table below is the only place target-engine error text is
//! interpreted. Rules are tested in order against the lower-cased error text
//! and the first match wins.

use std::sync::Arc;

use tracing::{debug, warn};

use obreplay_domain::{BindParams, CheckStage, CompatibilityVerdict, ExecutionOutcome};

use crate::ports::{ExecutionError, ExecutionService};

pub const HINT_FEATURE_GAP: &str = "The target's Oracle mode does not support this syntax yet; rewrite the statement or retry on a newer version.";
pub const HINT_PROPRIETARY_SYNTAX: &str =
    "Check for Oracle-proprietary syntax or functions and switch to a compatible form.";
pub const HINT_PRIVILEGE_MISMATCH: &str =
    "Check the target user's privileges and align them with the source user.";
pub const HINT_MISSING_OBJECT: &str = "Confirm the migrated table/view exists, or create an object with the same name and structure.";

const UNKNOWN_ERROR: &str = "unknown error";

const HINT_RULES: &[(&[&str], &str)] = &[
    (&["not supported", "feature not supported"], HINT_FEATURE_GAP),
    (&["syntax error"], HINT_PROPRIETARY_SYNTAX),
    (&["permission", "privilege"], HINT_PRIVILEGE_MISMATCH),
    (&["table or view does not exist"], HINT_MISSING_OBJECT),
];

/// Maps target error text to a remediation hint.
pub fn hint_from_error(error_text: &str) -> Option<&'static str> {
    let lowered = error_text.to_lowercase();
    HINT_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, hint)| *hint)
}

pub struct CompatibilityClassifier {
    target: Arc<dyn ExecutionService>,
}

impl CompatibilityClassifier {
    pub fn new(target: Arc<dyn ExecutionService>) -> Self {
        Self { target }
    }

    /// EXPLAIN first; run the statement for real only when asked and only if
    /// EXPLAIN succeeded. A single failure is final for this verdict.
    pub async fn classify(
        &self,
        statement: &str,
        execute_after_explain: bool,
    ) -> Result<CompatibilityVerdict, ExecutionError> {
        let explained = absorb(statement, self.target.explain(statement).await)?;
        if !explained.succeeded {
            debug!(statement, "explain failed");
            return Ok(unsupported(statement, CheckStage::Explain, explained, None));
        }

        if !execute_after_explain {
            return Ok(CompatibilityVerdict::supported(
                statement,
                CheckStage::Explain,
                explained.plan_text,
            ));
        }

        let executed = absorb(
            statement,
            self.target
                .execute(statement, &BindParams::new(), false)
                .await,
        )?;
        if executed.succeeded {
            Ok(CompatibilityVerdict::supported(
                statement,
                CheckStage::Execute,
                explained.plan_text,
            ))
        } else {
            debug!(statement, "execute failed after successful explain");
            // Keep the plan: it is the best clue for why execution failed
            Ok(unsupported(
                statement,
                CheckStage::Execute,
                executed,
                explained.plan_text,
            ))
        }
    }
}

/// Turns a timeout or I/O failure into a failed outcome for this statement.
/// A client that cannot start stays an error.
fn absorb(
    statement: &str,
    result: Result<ExecutionOutcome, ExecutionError>,
) -> Result<ExecutionOutcome, ExecutionError> {
    match result {
        Err(e) if !e.is_fatal() => {
            warn!(statement, error = %e, "call failed before the engine answered");
            Ok(ExecutionOutcome::failure(statement, e.to_string(), 0.0))
        }
        other => other,
    }
}

fn unsupported(
    statement: &str,
    stage: CheckStage,
    outcome: ExecutionOutcome,
    plan_text: Option<String>,
) -> CompatibilityVerdict {
    let error_text = outcome
        .error_text
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    let hint = hint_from_error(&error_text).map(str::to_string);
    CompatibilityVerdict::unsupported(statement, stage, error_text, hint, plan_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockExecutionService;
    use rstest::rstest;

    mod hint_from_error {
        use super::*;

        #[rstest]
        #[case("ORA-00600: feature not supported", Some(HINT_FEATURE_GAP))]
        #[case("ORA-00900: Not Supported yet", Some(HINT_FEATURE_GAP))]
        #[case("ORA-00900: You have an error in your SQL syntax error near 'CONNECT BY'", Some(HINT_PROPRIETARY_SYNTAX))]
        #[case("ORA-01031: insufficient privileges", Some(HINT_PRIVILEGE_MISMATCH))]
        #[case("Permission denied for user app", Some(HINT_PRIVILEGE_MISMATCH))]
        #[case("ORA-00942: table or view does not exist", Some(HINT_MISSING_OBJECT))]
        #[case("ORA-01722: invalid number", None)]
        #[case("", None)]
        fn follows_rule_table(#[case] error_text: &str, #[case] expected: Option<&str>) {
            assert_eq!(hint_from_error(error_text), expected);
        }

        #[test]
        fn first_matching_rule_wins() {
            let text = "syntax error: feature not supported; table or view does not exist";

            assert_eq!(hint_from_error(text), Some(HINT_FEATURE_GAP));
        }

        #[test]
        fn missing_object_error_maps_to_missing_object_hint() {
            assert_eq!(
                hint_from_error("ORA-00942: table or view does not exist"),
                Some(HINT_MISSING_OBJECT)
            );
        }
    }

    mod classify {
        use super::*;

        fn classifier(mock: MockExecutionService) -> CompatibilityClassifier {
            CompatibilityClassifier::new(Arc::new(mock))
        }

        #[tokio::test]
        async fn failing_explain_never_executes() {
            for execute_after_explain in [false, true] {
                let mut mock = MockExecutionService::new();
                mock.expect_explain().times(1).returning(|sql| {
                    Ok(ExecutionOutcome::failure(
                        sql,
                        "ORA-00942: table or view does not exist",
                        2.0,
                    ))
                });
                mock.expect_execute().never();

                let verdict = classifier(mock)
                    .classify("SELECT * FROM orders", execute_after_explain)
                    .await
                    .unwrap();

                assert!(!verdict.supported);
                assert_eq!(verdict.stage, CheckStage::Explain);
                assert_eq!(verdict.hint.as_deref(), Some(HINT_MISSING_OBJECT));
                assert!(verdict.plan_text.is_none());
            }
        }

        #[tokio::test]
        async fn explain_only_success_carries_plan() {
            let mut mock = MockExecutionService::new();
            mock.expect_explain()
                .returning(|sql| Ok(ExecutionOutcome::success(sql, 1.0).with_plan("TABLE SCAN")));
            mock.expect_execute().never();

            let verdict = classifier(mock).classify("SELECT 1 FROM dual", false).await.unwrap();

            assert!(verdict.supported);
            assert_eq!(verdict.stage, CheckStage::Explain);
            assert_eq!(verdict.plan_text.as_deref(), Some("TABLE SCAN"));
            assert!(verdict.error_text.is_none());
        }

        #[tokio::test]
        async fn successful_execute_reports_execute_stage() {
            let mut mock = MockExecutionService::new();
            mock.expect_explain()
                .returning(|sql| Ok(ExecutionOutcome::success(sql, 1.0).with_plan("PLAN")));
            mock.expect_execute()
                .times(1)
                .returning(|sql, _, _| Ok(ExecutionOutcome::success(sql, 4.0)));

            let verdict = classifier(mock).classify("SELECT 1 FROM dual", true).await.unwrap();

            assert!(verdict.supported);
            assert_eq!(verdict.stage, CheckStage::Execute);
            assert_eq!(verdict.plan_text.as_deref(), Some("PLAN"));
        }

        #[tokio::test]
        async fn failed_execute_keeps_plan_from_explain() {
            let mut mock = MockExecutionService::new();
            mock.expect_explain()
                .returning(|sql| Ok(ExecutionOutcome::success(sql, 1.0).with_plan("PLAN")));
            mock.expect_execute().returning(|sql, _, _| {
                Ok(ExecutionOutcome::failure(
                    sql,
                    "ORA-01031: insufficient privileges",
                    3.0,
                ))
            });

            let verdict = classifier(mock).classify("DELETE FROM audit_log", true).await.unwrap();

            assert!(!verdict.supported);
            assert_eq!(verdict.stage, CheckStage::Execute);
            assert_eq!(verdict.hint.as_deref(), Some(HINT_PRIVILEGE_MISMATCH));
            assert_eq!(verdict.plan_text.as_deref(), Some("PLAN"));
        }

        #[tokio::test]
        async fn unmatched_error_has_no_hint() {
            let mut mock = MockExecutionService::new();
            mock.expect_explain().returning(|sql| {
                Ok(ExecutionOutcome::failure(sql, "ORA-01722: invalid number", 1.0))
            });

            let verdict = classifier(mock).classify("SELECT 'a' + 1 FROM dual", false).await.unwrap();

            assert!(!verdict.supported);
            assert!(verdict.error_text.is_some());
            assert!(verdict.hint.is_none());
        }

        #[tokio::test]
        async fn setup_failure_propagates() {
            let mut mock = MockExecutionService::new();
            mock.expect_explain()
                .returning(|_| Err(ExecutionError::CommandNotFound("obclient".to_string())));

            let result = classifier(mock).classify("SELECT 1 FROM dual", false).await;

            assert!(matches!(result, Err(ExecutionError::CommandNotFound(_))));
        }

        #[tokio::test]
        async fn explain_timeout_is_an_explain_stage_verdict() {
            let mut mock = MockExecutionService::new();
            mock.expect_explain()
                .returning(|_| Err(ExecutionError::Timeout { secs: 60 }));
            mock.expect_execute().never();

            let verdict = classifier(mock).classify("SELECT slow FROM dual", true).await.unwrap();

            assert!(!verdict.supported);
            assert_eq!(verdict.stage, CheckStage::Explain);
            assert_eq!(verdict.error_text.as_deref(), Some("Operation timed out after 60s"));
        }

        #[tokio::test]
        async fn execute_io_failure_keeps_plan() {
            let mut mock = MockExecutionService::new();
            mock.expect_explain()
                .returning(|sql| Ok(ExecutionOutcome::success(sql, 1.0).with_plan("PLAN")));
            mock.expect_execute()
                .returning(|_, _, _| Err(ExecutionError::Io("broken pipe".to_string())));

            let verdict = classifier(mock).classify("SELECT 1 FROM dual", true).await.unwrap();

            assert!(!verdict.supported);
            assert_eq!(verdict.stage, CheckStage::Execute);
            assert_eq!(verdict.error_text.as_deref(), Some("IO error: broken pipe"));
            assert_eq!(verdict.plan_text.as_deref(), Some("PLAN"));
        }
    }
}

//! Human-readable and JSON renderings of evaluation results.

use std::fmt::Write as _;

use serde::Serialize;

use obreplay_domain::{BenchmarkSummary, CompatibilityVerdict, ReplayMode, ReplayReport};

pub fn format_compatibility(verdict: &CompatibilityVerdict) -> String {
    let mut parts = vec![
        format!("SQL: {}", verdict.statement),
        format!("Stage: {}", verdict.stage),
        format!(
            "Supported: {}",
            if verdict.supported { "YES" } else { "NO" }
        ),
    ];
    if let Some(error) = non_blank(verdict.error_text.as_deref()) {
        parts.push(format!("Error: {}", error));
    }
    if let Some(hint) = &verdict.hint {
        parts.push(format!("Hint: {}", hint));
    }
    if let Some(plan) = non_blank(verdict.plan_text.as_deref()) {
        parts.push(format!("Plan:\n{}", plan));
    }
    parts.join("\n")
}

pub fn format_benchmark(summary: &BenchmarkSummary) -> String {
    let mut parts = vec![
        format!("SQL: {}", summary.statement),
        format!("Iterations: {}", summary.iteration_count),
        format!("Concurrency: {}", summary.concurrency),
        format!("Avg: {:.2} ms", summary.average_ms),
        format!("P95: {:.2} ms", summary.p95_ms),
        format!(
            "Successes: {} Failures: {}",
            summary.success_count, summary.failure_count
        ),
    ];
    if let (Some(baseline), Some(delta)) = (summary.baseline_ms, summary.baseline_delta_ms()) {
        parts.push(format!(
            "Source baseline: {:.2} ms (delta: {:+.2} ms)",
            baseline, delta
        ));
    }
    if !summary.error_texts.is_empty() {
        parts.push(format!("Errors: {}", summary.error_texts.join("; ")));
    }
    parts.join("\n")
}

pub fn format_replay(report: &ReplayReport, mode: ReplayMode) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Statements: {}", report.statements.len());

    match mode {
        ReplayMode::Compat => {
            let _ = writeln!(
                out,
                "Compatibility ({} supported, {} unsupported):",
                report.supported_count(),
                report.unsupported_count()
            );
            for (idx, verdict) in report.compatibility_results.iter().enumerate() {
                let status = if verdict.supported { "OK" } else { "FAIL" };
                let _ = writeln!(out, "{}. [{}] {}", idx + 1, status, verdict.statement);
                if let Some(error) = &verdict.error_text {
                    let _ = writeln!(out, "   error: {}", error.trim());
                }
                if let Some(hint) = &verdict.hint {
                    let _ = writeln!(out, "   hint: {}", hint);
                }
            }
        }
        ReplayMode::Perf => {
            let _ = writeln!(out, "Performance:");
            for (idx, summary) in report.benchmark_results.iter().enumerate() {
                let _ = write!(
                    out,
                    "{}. avg={:.2} ms p95={:.2} ms success={} fail={}",
                    idx + 1,
                    summary.average_ms,
                    summary.p95_ms,
                    summary.success_count,
                    summary.failure_count
                );
                if let Some(delta) = summary.baseline_delta_ms() {
                    let _ = write!(out, " delta={:+.2} ms", delta);
                }
                let _ = writeln!(out, " sql={}", summary.statement);
                if !summary.error_texts.is_empty() {
                    let _ = writeln!(out, "   errors: {}", summary.error_texts.join("; "));
                }
            }
        }
    }

    if let Some(output) = report
        .external_tool_output
        .as_deref()
        .filter(|o| !o.is_empty())
    {
        let _ = writeln!(out, "Analysis tool output:");
        let _ = writeln!(out, "{}", output.trim_end());
    }
    out
}

/// Pretty-printed JSON; non-ASCII text is kept as-is.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use obreplay_domain::CheckStage;

    fn summary() -> BenchmarkSummary {
        BenchmarkSummary {
            statement: "SELECT * FROM orders".to_string(),
            iteration_count: 4,
            concurrency: 2,
            average_ms: 12.5,
            p95_ms: 20.25,
            success_count: 3,
            failure_count: 1,
            sample_latencies_ms: vec![5.0, 10.0, 15.0, 20.0],
            error_texts: vec!["ORA-00060: deadlock".to_string()],
            baseline_ms: Some(10.0),
        }
    }

    mod format_compatibility {
        use super::*;

        #[test]
        fn unsupported_lists_error_and_hint() {
            let verdict = CompatibilityVerdict::unsupported(
                "SELECT * FROM orders",
                CheckStage::Explain,
                "ORA-00942: table or view does not exist\n",
                Some("create it".to_string()),
                None,
            );

            assert_eq!(
                format_compatibility(&verdict),
                "SQL: SELECT * FROM orders\nStage: explain\nSupported: NO\n\
                 Error: ORA-00942: table or view does not exist\nHint: create it"
            );
        }

        #[test]
        fn supported_includes_plan() {
            let verdict = CompatibilityVerdict::supported(
                "SELECT 1 FROM dual",
                CheckStage::Execute,
                Some("EXPRESSION\n".to_string()),
            );

            let text = format_compatibility(&verdict);

            assert!(text.contains("Stage: execute"));
            assert!(text.contains("Supported: YES"));
            assert!(text.ends_with("Plan:\nEXPRESSION"));
        }
    }

    mod format_benchmark {
        use super::*;

        #[test]
        fn shows_signed_delta_and_errors() {
            let text = format_benchmark(&summary());

            assert!(text.contains("Avg: 12.50 ms"));
            assert!(text.contains("P95: 20.25 ms"));
            assert!(text.contains("Successes: 3 Failures: 1"));
            assert!(text.contains("Source baseline: 10.00 ms (delta: +2.50 ms)"));
            assert!(text.ends_with("Errors: ORA-00060: deadlock"));
        }

        #[test]
        fn omits_baseline_when_unknown() {
            let mut summary = summary();
            summary.baseline_ms = None;

            assert!(!format_benchmark(&summary).contains("baseline"));
        }
    }

    mod format_replay {
        use super::*;

        #[test]
        fn compat_numbers_each_verdict() {
            let report = ReplayReport {
                statements: vec!["SELECT 1".to_string(), "SELECT * FROM orders".to_string()],
                compatibility_results: vec![
                    CompatibilityVerdict::supported("SELECT 1", CheckStage::Explain, None),
                    CompatibilityVerdict::unsupported(
                        "SELECT * FROM orders",
                        CheckStage::Explain,
                        "ORA-00942: table or view does not exist",
                        Some("create it".to_string()),
                        None,
                    ),
                ],
                external_tool_output: Some("done\n".to_string()),
                ..Default::default()
            };

            let text = format_replay(&report, ReplayMode::Compat);

            assert!(text.starts_with("Statements: 2\n"));
            assert!(text.contains("1. [OK] SELECT 1\n"));
            assert!(text.contains("2. [FAIL] SELECT * FROM orders\n"));
            assert!(text.contains("   hint: create it\n"));
            assert!(text.ends_with("Analysis tool output:\ndone\n"));
        }

        #[test]
        fn perf_prints_summary_line() {
            let report = ReplayReport {
                statements: vec!["SELECT * FROM orders".to_string()],
                benchmark_results: vec![summary()],
                ..Default::default()
            };

            let text = format_replay(&report, ReplayMode::Perf);

            assert!(text.contains(
                "1. avg=12.50 ms p95=20.25 ms success=3 fail=1 delta=+2.50 ms sql=SELECT * FROM orders\n"
            ));
            assert!(text.contains("   errors: ORA-00060: deadlock\n"));
        }
    }

    mod to_json {
        use super::*;

        #[test]
        fn keeps_non_ascii_and_field_names() {
            let report = ReplayReport {
                statements: vec!["SELECT '订单' FROM dual".to_string()],
                ..Default::default()
            };

            let json = to_json(&report).unwrap();

            assert!(json.contains("SELECT '订单' FROM dual"));
            assert!(json.contains("\"compatibility_results\": []"));
            assert!(json.contains("\"external_tool_output\": null"));
        }
    }
}

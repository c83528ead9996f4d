use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::benchmark::BenchmarkSummary;
use crate::verdict::CompatibilityVerdict;

/// What a replay evaluates for each statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    /// EXPLAIN only
    #[default]
    Compat,
    /// Timed executions on the target
    Perf,
}

impl fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayMode::Compat => write!(f, "compat"),
            ReplayMode::Perf => write!(f, "perf"),
        }
    }
}

impl FromStr for ReplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compat" => Ok(ReplayMode::Compat),
            "perf" => Ok(ReplayMode::Perf),
            _ => Err(format!("Unknown replay mode: {}", s)),
        }
    }
}

/// Everything one replay produced, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayReport {
    pub statements: Vec<String>,
    pub compatibility_results: Vec<CompatibilityVerdict>,
    pub benchmark_results: Vec<BenchmarkSummary>,
    pub external_tool_output: Option<String>,
    pub baselines: BTreeMap<String, f64>,
}

impl ReplayReport {
    pub fn supported_count(&self) -> usize {
        self.compatibility_results
            .iter()
            .filter(|v| v.supported)
            .count()
    }

    pub fn unsupported_count(&self) -> usize {
        self.compatibility_results.len() - self.supported_count()
    }

    pub fn failed_execution_count(&self) -> usize {
        self.benchmark_results.iter().map(|b| b.failure_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::CheckStage;

    #[test]
    fn mode_from_str_is_case_insensitive() {
        assert_eq!(ReplayMode::from_str("PERF").unwrap(), ReplayMode::Perf);
        assert_eq!(ReplayMode::from_str("compat").unwrap(), ReplayMode::Compat);
        assert!(ReplayMode::from_str("load").is_err());
    }

    #[test]
    fn counts_split_supported_and_unsupported() {
        let report = ReplayReport {
            compatibility_results: vec![
                CompatibilityVerdict::supported("SELECT 1", CheckStage::Explain, None),
                CompatibilityVerdict::unsupported(
                    "SELECT * FROM orders",
                    CheckStage::Explain,
                    "ORA-00942: table or view does not exist",
                    None,
                    None,
                ),
            ],
            ..Default::default()
        };

        assert_eq!(report.supported_count(), 1);
        assert_eq!(report.unsupported_count(), 1);
    }
}

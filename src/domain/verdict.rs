use std::fmt;

use serde::Serialize;

/// Which step produced a compatibility verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStage {
    Explain,
    Execute,
}

impl fmt::Display for CheckStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStage::Explain => write!(f, "explain"),
            CheckStage::Execute => write!(f, "execute"),
        }
    }
}

/// Whether a statement plans (and optionally runs) on the target engine.
///
/// An unsupported verdict always carries the engine's error text. The hint is
/// derived from that text only and is absent when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityVerdict {
    pub statement: String,
    pub supported: bool,
    pub stage: CheckStage,
    pub error_text: Option<String>,
    pub hint: Option<String>,
    pub plan_text: Option<String>,
}

impl CompatibilityVerdict {
    pub fn supported(
        statement: impl Into<String>,
        stage: CheckStage,
        plan_text: Option<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            supported: true,
            stage,
            error_text: None,
            hint: None,
            plan_text,
        }
    }

    pub fn unsupported(
        statement: impl Into<String>,
        stage: CheckStage,
        error_text: impl Into<String>,
        hint: Option<String>,
        plan_text: Option<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            supported: false,
            stage,
            error_text: Some(error_text.into()),
            hint,
            plan_text,
        }
    }
}

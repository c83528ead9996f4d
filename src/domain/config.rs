use std::path::PathBuf;

use crate::connection::{SourceProfile, TargetProfile};

/// Settings for the external assessment tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OmaSettings {
    pub start_script: Option<PathBuf>,
    pub report_root: Option<PathBuf>,
}

/// Fully resolved configuration, passed by value into adapter constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub source: SourceProfile,
    pub target: TargetProfile,
    /// Schemas the capture command filters on when asked to respect config
    pub capture_schemas: Vec<String>,
    pub oma: OmaSettings,
}

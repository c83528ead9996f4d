mod capture_name;
mod source_profile;
mod target_mode;
mod target_profile;

pub use capture_name::{CaptureName, CaptureNameError};
pub use source_profile::{SourceEndpoint, SourceProfile};
pub use target_mode::TargetMode;
pub use target_profile::TargetProfile;

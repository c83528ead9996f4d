pub mod cli;
pub mod commands;
pub mod error;

pub use obreplay_app as app;
pub use obreplay_domain as domain;
pub use obreplay_infra as infra;

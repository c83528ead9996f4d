pub mod capture_log;
pub mod oceanbase;
pub mod oma;
pub mod oracle;
pub mod oracle_catalog;
pub mod process;

pub use capture_log::JsonlCaptureWriter;
pub use oceanbase::ObClientAdapter;
pub use oma::{OmaCli, OmaMode, OmaRequest, OmaSourceType};
pub use oracle::SqlPlusAdapter;
pub use oracle_catalog::OracleCatalog;

//! Configuration structures for bundling operations.
//!
//! - [`ReleaseSettings`] - cross-compilation flags and project layout
//! - [`ImportSettings`] - Yocto artifact lookup and work directory

mod import;
mod release;

pub use import::{DEFAULT_APP_NAME, ImportSettings, default_work_dir};
pub use release::{CONFIG_FILE_NAME, ReleaseSettings};

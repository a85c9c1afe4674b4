//! Bundle building and update packaging.
//!
//! # Overview
//!
//! Two independent entry points end in the same packager:
//!
//! - [`ReleaseBuilder`] compiles a fresh bundle with the cross-compilation
//!   tool, stamps its codename and packages it.
//! - [`import_yocto_artifact`] unpacks a Yocto tar artifact, reads the
//!   codename of the bundle inside and packages it.
//!
//! [`package_bundle_as_update`] zips a bundle directory into
//! `<output_dir>/<codename>.zip`, replacing an earlier archive of the same
//! name.
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA-256 of the produced archive
//! - [`codename`] - codename file reading, writing and source extraction
//! - [`importer`] - Yocto artifact import
//! - [`packager`] - bundle to update archive
//! - [`release`] - cross-compiled release build
//! - [`settings`] - release and import configuration

pub mod checksum;
pub mod codename;
pub mod importer;
pub mod packager;
pub mod release;
pub mod settings;

pub use codename::{extract_codename, read_codename_file, stamp_codename};
pub use importer::{YoctoImport, import_yocto_artifact};
pub use packager::{UpdateArchive, package_bundle_as_update};
pub use release::ReleaseBuilder;
pub use settings::{ImportSettings, ReleaseSettings};

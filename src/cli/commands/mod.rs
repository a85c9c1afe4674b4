//! Command execution functions for bundler subcommands.
//!
//! Each subcommand resolves its paths against the current directory and
//! hands them to the matching pipeline in [`crate::bundler`].

mod build_release;
mod import_yocto;
mod package;
mod stamp_codename;

pub use build_release::build_release;
pub use import_yocto::import_yocto;
pub use package::package;
pub use stamp_codename::stamp_codename;

use super::{Command, RuntimeConfig};
use crate::error::Result;

/// Runs `command` to completion.
pub async fn execute(command: &Command, config: &RuntimeConfig) -> Result<()> {
    match command {
        Command::ImportYocto(args) => import_yocto(args, config).await.map(drop),
        Command::BuildRelease(args) => build_release(args, config).await.map(drop),
        Command::Package(args) => package(args, config).await.map(drop),
        Command::StampCodename(args) => stamp_codename(args).await,
    }
}

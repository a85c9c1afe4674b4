//! `stamp-codename` subcommand.

use crate::bundler;
use crate::cli::args::{StampCodenameArgs, absolute};
use crate::error::Result;

/// Writes the codename file into a bundle directory.
pub async fn stamp_codename(args: &StampCodenameArgs) -> Result<()> {
    let bundle_dir = absolute(&args.bundle_dir)?;
    bundler::stamp_codename(&bundle_dir, &args.codename).await?;
    Ok(())
}

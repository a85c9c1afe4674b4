//! Version codename handling.
//!
//! A bundle carries its version as the sole content of a `codename` file.
//! The codename also names the update archive, so it has to be usable as a
//! file name.

use crate::error::{BundlerError, Context, ErrorExt, Result};
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the codename marker inside a bundle.
pub const CODENAME_FILE: &str = "codename";

/// Dart constant holding the codename in the application sources.
pub const CODENAME_CONSTANT: &str = "kVersionCodename";

/// Rejects codenames that cannot name an archive file.
pub fn validate_codename(codename: &str) -> Result<()> {
    let reason = if codename.trim().is_empty() {
        Some("codename is empty")
    } else if codename.contains(['\n', '\r']) {
        Some("codename spans more than one line")
    } else if codename.contains(['/', '\\', '\0']) {
        Some("codename contains a path separator")
    } else if codename == "." || codename == ".." {
        Some("codename is a relative path component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BundlerError::InvalidCodename {
            codename: codename.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Reads a codename file, stripping the trailing newline.
///
/// Fails with [`BundlerError::CodenameNotFound`] when the file is missing.
pub async fn read_codename_file(path: &Path) -> Result<String> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(BundlerError::CodenameNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e).fs_context("reading codename file", path),
    };

    let codename = content.trim_end_matches(['\n', '\r']).to_string();
    validate_codename(&codename)?;
    Ok(codename)
}

/// Writes `codename` as the sole content of `<bundle_dir>/codename`.
///
/// Returns the path of the written file.
pub async fn stamp_codename(bundle_dir: &Path, codename: &str) -> Result<PathBuf> {
    validate_codename(codename)?;
    let path = bundle_dir.join(CODENAME_FILE);
    tokio::fs::write(&path, codename)
        .await
        .fs_context("writing codename file", &path)?;
    log::info!("Stamped codename {} into {}", codename, path.display());
    Ok(path)
}

/// Extracts the `kVersionCodename` literal from a Dart source file.
pub async fn extract_codename(source_file: &Path) -> Result<String> {
    let source = tokio::fs::read_to_string(source_file)
        .await
        .fs_context("reading codename source", source_file)?;

    let codename = parse_codename_literal(&source)?.context(format!(
        "no {} literal found in {}",
        CODENAME_CONSTANT,
        source_file.display()
    ))?;
    validate_codename(&codename)?;
    Ok(codename)
}

/// Finds the string literal assigned to `kVersionCodename` in Dart source.
///
/// Accepts single or double quotes and any declaration prefix
/// (`const`, `final`, `const String`).
pub fn parse_codename_literal(source: &str) -> Result<Option<String>> {
    let pattern = Regex::new(&format!(
        r#"\b{CODENAME_CONSTANT}\s*=\s*(?:"([^"\r\n]*)"|'([^'\r\n]*)')"#
    ))
    .context("building codename pattern")?;

    Ok(pattern.captures(source).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }))
}

//! Zip creation and tar extraction.
//!
//! Both functions are blocking; callers on the async runtime wrap them in
//! `spawn_blocking`.

use crate::error::{BundlerError, ErrorExt, Result};
use flate2::read::GzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Compression of a tar artifact, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    /// Uncompressed tar
    Plain,
    /// `1f 8b`
    Gzip,
    /// `BZh`
    Bzip2,
    /// `fd 37 7a 58 5a 00`
    Xz,
    /// `28 b5 2f fd`
    Zstd,
}

impl TarCompression {
    const MAGIC_LEN: u64 = 6;

    /// Classifies the first bytes of an archive.
    pub fn from_magic(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if bytes.starts_with(b"BZh") {
            Self::Bzip2
        } else if bytes.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Self::Xz
        } else if bytes.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            Self::Zstd
        } else {
            Self::Plain
        }
    }

    /// Reads the leading bytes of `archive` and classifies them.
    pub fn detect(archive: &Path) -> Result<Self> {
        let file = File::open(archive).fs_context("opening tar artifact", archive)?;
        let mut magic = Vec::new();
        file.take(Self::MAGIC_LEN)
            .read_to_end(&mut magic)
            .fs_context("reading tar artifact", archive)?;
        Ok(Self::from_magic(&magic))
    }

    /// Whether [`extract_tar`] unpacks this format in-process.
    ///
    /// The other formats are left to the system `tar`.
    pub fn is_native(self) -> bool {
        matches!(self, Self::Plain | Self::Gzip)
    }
}

impl fmt::Display for TarCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "uncompressed",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// Recursively zips the contents of `source_dir` into `archive`.
///
/// Entry names are relative to `source_dir`, so the archive root mirrors the
/// directory. Symlinks are followed; a symlink whose target is missing is
/// skipped with a warning, as `zip -r` does. Unix permission bits are kept
/// so the bundle executable stays executable after extraction. If `archive`
/// lives inside `source_dir` it is not included in itself.
///
/// Returns the number of file entries written.
pub fn zip_directory(source_dir: &Path, archive: &Path) -> Result<usize> {
    let file = File::create(archive).fs_context("creating archive", archive)?;
    let mut writer = ZipWriter::new(file);

    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(source_dir)
        .follow_links(true)
        .min_depth(1)
    {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) if is_dangling_link(&e) => {
                if let Some(path) = e.path() {
                    log::warn!("Skipping dangling symlink {}", path.display());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    entries.sort_by(|a, b| a.path().cmp(b.path()));

    let mut files = 0;
    for entry in entries {
        let path = entry.path();
        if path == archive {
            continue;
        }

        let name = entry_name(path.strip_prefix(source_dir)?);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(unix_mode(&entry));

        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else {
            writer.start_file(name, options)?;
            let mut src = File::open(path).fs_context("opening bundle file", path)?;
            io::copy(&mut src, &mut writer).fs_context("archiving bundle file", path)?;
            files += 1;
        }
    }

    writer.finish()?;
    Ok(files)
}

fn is_dangling_link(err: &walkdir::Error) -> bool {
    let not_found = err
        .io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
    not_found
        && err.path().is_some_and(|p| {
            std::fs::symlink_metadata(p).is_ok_and(|m| m.file_type().is_symlink())
        })
}

/// Extracts a plain or gzip-compressed tar archive into `dest`, creating
/// `dest` if needed.
///
/// Other compressions are rejected; see [`TarCompression::is_native`].
/// Entries that would escape `dest` are rejected by the tar reader.
pub fn extract_tar(archive: &Path, dest: &Path) -> Result<()> {
    let compression = TarCompression::detect(archive)?;
    let file = File::open(archive).fs_context("opening tar artifact", archive)?;

    let reader: Box<dyn Read> = match compression {
        TarCompression::Plain => Box::new(BufReader::new(file)),
        TarCompression::Gzip => {
            log::debug!("{} is gzip-compressed", archive.display());
            Box::new(GzDecoder::new(BufReader::new(file)))
        }
        other => {
            return Err(BundlerError::GenericError(format!(
                "{} is {}-compressed and cannot be unpacked in-process",
                archive.display(),
                other
            )));
        }
    };

    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.unpack(dest).fs_context("unpacking tar artifact", archive)?;
    Ok(())
}

fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn unix_mode(entry: &walkdir::DirEntry) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    match entry.metadata() {
        Ok(meta) => meta.permissions().mode() & 0o7777,
        Err(_) if entry.file_type().is_dir() => 0o755,
        Err(_) => 0o644,
    }
}

#[cfg(not(unix))]
fn unix_mode(entry: &walkdir::DirEntry) -> u32 {
    if entry.file_type().is_dir() { 0o755 } else { 0o644 }
}

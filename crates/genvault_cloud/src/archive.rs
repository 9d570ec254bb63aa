//! Version archives.
//!
//! A version travels to the remote tier as one gzip-compressed tarball
//! holding `manifest.json` and the `source/` tree. The diff artifact stays
//! local; it can always be recomputed from two archives.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use genvault_error::{CloudError, CloudErrorKind, GenvaultResult};
use genvault_storage::layout::{MANIFEST_FILE, SOURCE_DIR};
use std::path::{Path, PathBuf};

/// Compress a version directory into an in-memory `.tar.gz`.
///
/// # Errors
///
/// Returns `Archive` if the manifest or `source/` tree is missing or
/// cannot be read.
#[tracing::instrument(fields(dir = %version_dir.display()))]
pub async fn pack_version(version_dir: &Path) -> GenvaultResult<Vec<u8>> {
    let dir = version_dir.to_path_buf();
    let bytes = tokio::task::spawn_blocking(move || pack_blocking(&dir))
        .await
        .map_err(|e| CloudError::new(CloudErrorKind::Archive(format!("task join error: {e}"))))??;
    tracing::debug!(bytes = bytes.len(), "Packed version archive");
    Ok(bytes)
}

/// Extract an archive produced by [`pack_version`] into `destination`.
///
/// Returns the path of the extracted `source/` tree.
///
/// # Errors
///
/// Returns `Archive` if the bytes are not a valid archive or lack a
/// `source/` tree.
#[tracing::instrument(skip(archive), fields(bytes = archive.len(), dest = %destination.display()))]
pub async fn unpack_version(archive: Vec<u8>, destination: &Path) -> GenvaultResult<PathBuf> {
    let dest = destination.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_blocking(&archive, &dest))
        .await
        .map_err(|e| CloudError::new(CloudErrorKind::Archive(format!("task join error: {e}"))))?
}

fn archive_error(context: &str, e: impl std::fmt::Display) -> CloudError {
    CloudError::new(CloudErrorKind::Archive(format!("{context}: {e}")))
}

fn pack_blocking(version_dir: &Path) -> GenvaultResult<Vec<u8>> {
    let manifest = version_dir.join(MANIFEST_FILE);
    let source = version_dir.join(SOURCE_DIR);
    if !manifest.is_file() || !source.is_dir() {
        return Err(archive_error(
            "incomplete version directory",
            version_dir.display(),
        )
        .into());
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_path_with_name(&manifest, MANIFEST_FILE)
        .map_err(|e| archive_error("append manifest", e))?;
    builder
        .append_dir_all(SOURCE_DIR, &source)
        .map_err(|e| archive_error("append source tree", e))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| archive_error("finish tar stream", e))?;
    let bytes = encoder
        .finish()
        .map_err(|e| archive_error("finish gzip stream", e))?;
    Ok(bytes)
}

fn unpack_blocking(archive: &[u8], destination: &Path) -> GenvaultResult<PathBuf> {
    std::fs::create_dir_all(destination)
        .map_err(|e| archive_error("create destination", e))?;

    let mut tarball = tar::Archive::new(GzDecoder::new(archive));
    tarball
        .unpack(destination)
        .map_err(|e| archive_error("extract", e))?;

    let source = destination.join(SOURCE_DIR);
    if !source.is_dir() {
        return Err(archive_error("archive has no source tree", destination.display()).into());
    }
    Ok(source)
}

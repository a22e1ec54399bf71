//! OCI layer archive unpacking.
//!
//! Unpacks gzip-compressed tar layer blobs into a directory.

use flate2::read::GzDecoder;
use rootprep_core::error::{ProvisionError, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use tar::Archive;

/// Unpack a single gzip-compressed tar layer into `target_dir`.
///
/// `target_dir` is created if needed. Entries that would escape
/// `target_dir` are skipped by the tar reader.
///
/// # Errors
///
/// Returns [`ProvisionError::Io`], keeping the underlying error kind, if:
/// - The archive doesn't exist or can't be opened
/// - Decompression or extraction fails
/// - The target directory cannot be created
pub fn unpack_layer(archive_path: &Path, target_dir: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| {
        with_context(
            e,
            format!("failed to open layer archive {}", archive_path.display()),
        )
    })?;

    std::fs::create_dir_all(target_dir).map_err(|e| {
        with_context(
            e,
            format!("failed to create target directory {}", target_dir.display()),
        )
    })?;

    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive.unpack(target_dir).map_err(|e| {
        with_context(
            e,
            format!(
                "failed to unpack {} into {}",
                archive_path.display(),
                target_dir.display()
            ),
        )
    })?;

    tracing::debug!(
        archive = %archive_path.display(),
        target = %target_dir.display(),
        "Unpacked OCI layer"
    );

    Ok(())
}

fn with_context(e: io::Error, context: String) -> ProvisionError {
    ProvisionError::Io(io::Error::new(e.kind(), format!("{}: {}", context, e)))
}

/// Write a gzip-compressed tar holding `files` to `path`.
#[cfg(test)]
pub(crate) fn write_test_layer(path: &Path, files: &[(&str, &[u8])]) {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::Builder;

    let file = File::create(path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();

        builder.append_data(&mut header, name, *content).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}

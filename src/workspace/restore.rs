//! Regenerates checked-in build files from their `.in` templates.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::walk::{walk_workspace, BUILD_FILE_NAMES};

const TEMPLATE_SUFFIX: &str = ".in";

/// Prefix of the scratch file written next to the destination.
pub const SCRATCH_PREFIX: &str = ".tmp";

/// The header stamped on top of every restored file.
pub fn generated_header(template_name: &str, program: &str) -> String {
    format!("# This file was generated from {template_name}\n# by {program}\n# DO NOT EDIT\n\n")
}

/// Write `dest` as the generated header followed by the bytes of `src`.
///
/// The content goes to a temporary file next to `dest` which is renamed over
/// it only after every byte is flushed, so `dest` is never left half-written.
/// Any error means `dest` should not be trusted.
pub fn restore_file(src: &Path, dest: &Path, program: &str) -> Result<()> {
    let mut reader =
        File::open(src).with_context(|| format!("failed to open {}", src.display()))?;

    let dest_dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Same mode a plain create would give: 0o666 less the umask.
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let tmp = builder
        .tempfile_in(dest_dir)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    // An existing file keeps its mode.
    if let Ok(existing) = std::fs::metadata(dest) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .with_context(|| format!("failed to set permissions on {}", dest.display()))?;
    }

    let template_name = src.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let mut writer = BufWriter::new(tmp);
    writer
        .write_all(generated_header(&template_name, program).as_bytes())
        .with_context(|| format!("failed to write {}", dest.display()))?;
    io::copy(&mut reader, &mut writer)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;

    let tmp = writer
        .into_inner()
        .map_err(io::IntoInnerError::into_error)
        .with_context(|| format!("failed to flush {}", dest.display()))?;
    tmp.as_file().sync_all().with_context(|| format!("failed to sync {}", dest.display()))?;
    tmp.persist(dest).with_context(|| format!("failed to replace {}", dest.display()))?;

    Ok(())
}

/// Restore every `BUILD.bazel.in` and `BUILD.in` template found under `root`.
///
/// A template that fails to restore is logged and does not stop the others.
/// Returns the number of files restored.
pub fn restore_build_files_in_repo(root: &Path, program: &str) -> Result<usize> {
    let mut restored = 0;
    walk_workspace(root, |entry| {
        for file in &entry.files {
            let Some(base) = file.strip_suffix(TEMPLATE_SUFFIX) else {
                continue;
            };
            if !BUILD_FILE_NAMES.contains(&base) {
                continue;
            }
            let src = entry.dir.join(file);
            match restore_file(&src, &entry.dir.join(base), program) {
                Ok(()) => restored += 1,
                Err(err) => tracing::warn!("{err:#}"),
            }
        }
    })?;
    tracing::debug!("restored {restored} build file(s) under {}", root.display());
    Ok(restored)
}

/// Restore the build file templates of a single directory.
///
/// `BUILD.bazel.in` is checked before `BUILD.in`; missing templates are
/// skipped silently. Returns the number of files restored.
pub fn restore_build_files_in_dir(dir: &Path, program: &str) -> usize {
    let mut restored = 0;
    for base in BUILD_FILE_NAMES {
        let src = dir.join(format!("{base}{TEMPLATE_SUFFIX}"));
        if !src.is_file() {
            continue;
        }
        match restore_file(&src, &dir.join(base), program) {
            Ok(()) => restored += 1,
            Err(err) => tracing::warn!("{err:#}"),
        }
    }
    restored
}

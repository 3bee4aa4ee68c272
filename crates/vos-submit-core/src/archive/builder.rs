use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, trace};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{member_name, ArchiveMember, ArchiveSummary, ExtensionFilter};
use crate::error::{Result, SubmitError};

/// Files at or above this size need ZIP64 headers.
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Write every non-excluded file under `walk_root` into a fresh deflate
/// archive at `target`, naming members relative to `source_root`.
///
/// The archive is assembled in a temporary file next to `target` and renamed
/// over it once complete. On error the temporary file is removed and
/// `target` is left as it was; a truncated archive is never published.
pub fn build_archive(
    source_root: &Path,
    walk_root: &Path,
    target: &Path,
    filter: &ExtensionFilter,
) -> Result<ArchiveSummary> {
    if !walk_root.starts_with(source_root) {
        return Err(SubmitError::InvalidConfig(format!(
            "{} is not inside source root {}",
            walk_root.display(),
            source_root.display()
        )));
    }

    let target_dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let wrap = |source: SubmitError| SubmitError::ArchiveWrite {
        target: target.to_path_buf(),
        source: Box::new(source),
    };

    fs::create_dir_all(&target_dir).map_err(|e| wrap(e.into()))?;
    let mut tmp = NamedTempFile::new_in(&target_dir).map_err(|e| wrap(e.into()))?;
    let tmp_path = tmp.path().to_path_buf();

    let (members, skipped, bytes) = write_members(
        source_root,
        walk_root,
        tmp.as_file_mut(),
        filter,
        &[tmp_path.as_path(), target],
    )
    .map_err(wrap)?;

    tmp.persist(target).map_err(|e| wrap(e.error.into()))?;
    let sha256 = file_sha256(target).map_err(|e| wrap(e.into()))?;

    debug!(
        target = %target.display(),
        members,
        skipped,
        bytes,
        "Archive written"
    );

    Ok(ArchiveSummary {
        target: target.to_path_buf(),
        members,
        skipped,
        bytes,
        sha256,
    })
}

/// Every file under `walk_root` that belongs in the archive, in walk order.
///
/// Returns the members and the number of files the filter left out.
/// Entries are visited sorted by file name so repeated runs agree.
pub fn collect_members(
    source_root: &Path,
    walk_root: &Path,
    filter: &ExtensionFilter,
    ignore: &[&Path],
) -> Result<(Vec<ArchiveMember>, usize)> {
    let mut members = Vec::new();
    let mut skipped = 0;

    for entry in WalkDir::new(walk_root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if ignore.iter().any(|p| *p == path) {
            continue;
        }

        // Lossy is enough to read the extension; included names are checked
        // strictly by `member_name`.
        let file_name = entry.file_name().to_string_lossy();
        if filter.is_excluded(&file_name) {
            trace!(path = %path.display(), "Excluded by extension");
            skipped += 1;
            continue;
        }

        let name = member_name(source_root, path)?;
        members.push(ArchiveMember {
            path: path.to_path_buf(),
            name,
        });
    }

    Ok((members, skipped))
}

fn write_members(
    source_root: &Path,
    walk_root: &Path,
    out: &mut File,
    filter: &ExtensionFilter,
    ignore: &[&Path],
) -> Result<(usize, usize, u64)> {
    let (members, skipped) = collect_members(source_root, walk_root, filter, ignore)?;

    let mut zip = ZipWriter::new(BufWriter::new(out));
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut bytes = 0u64;

    for member in &members {
        let mut file = File::open(&member.path)?;
        let len = file.metadata()?.len();
        zip.start_file(member.name.as_str(), base.large_file(len >= ZIP64_THRESHOLD))?;
        bytes += io::copy(&mut file, &mut zip)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;

    Ok((members.len(), skipped, bytes))
}

fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

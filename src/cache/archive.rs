//! Gzip-compressed tar archives of build products
//!
//! Entries carry zeroed timestamps and owners so identical trees produce
//! identical archives. Symlinks (framework `Versions/Current`) are kept as
//! links.

use crate::error::{CacheError, CacheResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tar::{Builder, EntryType, Header};
use tracing::debug;
use walkdir::WalkDir;

/// Archive `source` into a new file at `destination`
///
/// A file becomes a single entry named after it; a directory is stored
/// with paths relative to itself. The destination must not exist yet.
pub fn archive(source: &Path, destination: &Path) -> CacheResult<()> {
    if destination.exists() {
        return Err(CacheError::ArtifactExists(destination.to_path_buf()));
    }
    let metadata = fs::metadata(source)
        .map_err(|_| CacheError::ArtifactSourceMissing(source.to_path_buf()))?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CacheError::io(format!("creating {}", parent.display()), e))?;
    }

    let context = || format!("archiving {} to {}", source.display(), destination.display());
    let file = File::create_new(destination).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => CacheError::ArtifactExists(destination.to_path_buf()),
        _ => CacheError::io(context(), e),
    })?;

    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let written = if metadata.is_dir() {
        append_tree(&mut builder, source)
    } else {
        let name = source.file_name().map(Path::new).unwrap_or(source);
        append_file(&mut builder, source, name, &metadata)
    };

    let finished = written.and_then(|()| builder.into_inner()?.finish().map(|_| ()));
    if let Err(e) = finished {
        // Never leave a truncated archive behind under a valid key
        let _ = fs::remove_file(destination);
        return Err(CacheError::io(context(), e));
    }

    debug!("Archived {} to {}", source.display(), destination.display());
    Ok(())
}

/// Extract the archive at `source` into `destination`, creating it if needed
pub fn unarchive(source: &Path, destination: &Path) -> CacheResult<()> {
    let file = File::open(source)
        .map_err(|e| CacheError::io(format!("opening archive {}", source.display()), e))?;
    fs::create_dir_all(destination)
        .map_err(|e| CacheError::io(format!("creating {}", destination.display()), e))?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive.unpack(destination).map_err(|e| {
        CacheError::io(
            format!("unpacking {} into {}", source.display(), destination.display()),
            e,
        )
    })?;

    debug!("Unpacked {} into {}", source.display(), destination.display());
    Ok(())
}

fn append_tree<W: io::Write>(builder: &mut Builder<W>, root: &Path) -> io::Result<()> {
    for entry in WalkDir::new(root).sort_by(|a, b| a.path().cmp(b.path())) {
        let entry = entry?;
        let path = entry.path();
        if path == root {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let metadata = fs::symlink_metadata(path)?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            let mut header = header(EntryType::Directory, 0o755, 0);
            builder.append_data(&mut header, relative, io::empty())?;
        } else if file_type.is_symlink() {
            let mut header = header(EntryType::Symlink, 0o777, 0);
            header.set_link_name(fs::read_link(path)?)?;
            builder.append_data(&mut header, relative, io::empty())?;
        } else if file_type.is_file() {
            append_file(builder, path, relative, &metadata)?;
        }
    }
    Ok(())
}

fn append_file<W: io::Write>(
    builder: &mut Builder<W>,
    path: &Path,
    name: &Path,
    metadata: &fs::Metadata,
) -> io::Result<()> {
    let mut header = header(EntryType::Regular, file_mode(metadata), metadata.len());
    builder.append_data(&mut header, name, File::open(path)?)
}

fn header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        0o755
    } else {
        0o644
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> u32 {
    0o644
}

use std::io::{self, Write};
use std::path::Path;

/// Write `data` to `path` through a temporary file in the same directory,
/// then rename it into place. Readers see either the old or the new
/// content, never a partial write.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    write_atomic_with(path, data, |_| Ok(()))
}

/// [`write_atomic`] with a hook run after the temporary file is written
/// and synced, before the rename. An error from the hook aborts the write
/// and removes the temporary file.
pub(crate) fn write_atomic_with<F>(path: &Path, data: &[u8], before_rename: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new().prefix(".tmp-").tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    before_rename(tmp.path())?;

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

/// Collects all files below `root`, recursively, sorted by path so that the order is the
/// same every time. Entries that can't be read are logged and skipped, but `root` itself
/// must be a readable directory. Symlinks to files are listed, symlinked directories
/// are not descended into.
pub fn all_files_recursive(root: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let root = root.as_ref();
    // NOTE: read it once to get a proper error for the root, walkdir only yields it as an
    // entry error
    fs::read_dir(root)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            // NOTE: `Path::is_file` follows symlinks, `entry.file_type()` does not
            Ok(entry) if entry.path().is_file() => files.push(entry.into_path()),
            Ok(_) => (),
            Err(e) => log::warn!("Skipping an unreadable entry: {e}"),
        }
    }

    // NOTE: walkdir sorts per directory, this makes the order global by full path
    files.sort();
    Ok(files)
}

/// Creates the directory at path, and its parents, if it doesn't already exist.
pub fn ensure_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' exists but is not a directory", dir.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

/// Try to read the file, return None if it doesn't exist
pub fn read_optional_file(path: impl AsRef<Path>) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
        Ok(s) => Ok(Some(s)),
    }
}

//! Enumeration of candidate email files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Every non-directory entry under `base`, in file-name order.
///
/// The `exclude` directory (typically the output directory, when it sits
/// inside `base`) is not descended into.
pub fn email_files<'a>(
    base: &Path,
    exclude: Option<&'a Path>,
) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + 'a {
    WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| exclude != Some(entry.path()))
        .filter_map(|item| match item {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) => Some(Ok(entry.into_path())),
            Err(e) => Some(Err(e)),
        })
}

/// `dir` spelled as a path under `base`, if it lies inside `base`.
///
/// Both paths are resolved on disk first, so `./mail/out` and `mail/../mail/out`
/// are recognized as the same directory. The result shares `base`'s prefix, so
/// it compares equal to the entries [`email_files`] produces.
pub fn nested_dir(base: &Path, dir: &Path) -> Option<PathBuf> {
    let canonical_base = std::fs::canonicalize(base).ok()?;
    let canonical_dir = std::fs::canonicalize(dir).ok()?;
    let relative = canonical_dir.strip_prefix(&canonical_base).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(base.join(relative))
}

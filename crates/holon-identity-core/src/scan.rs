use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::error::IdentityError;
use crate::frontmatter::parse_frontmatter;
use crate::identity::Identity;
use crate::{HOLON_DIR_NAME, HOLON_FILE_NAME};

/// A parsed identity together with the `HOLON.md` it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedIdentity {
    pub identity: Identity,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanProgress {
    pub scanned_files: usize,
    pub holons_found: usize,
}

/// Why an entry was left out of a scan.
#[derive(Debug)]
pub enum SkipReason {
    Walk(walkdir::Error),
    Read(std::io::Error),
    Decode(IdentityError),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Walk(err) => write!(f, "walk error: {err}"),
            Self::Read(err) => write!(f, "read error: {err}"),
            Self::Decode(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Report progress after every `progress_every` files; 0 reports only at the end.
    pub progress_every: usize,
    /// Leave dot-directories below the root unvisited, except `.holon`.
    pub skip_hidden_dirs: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { progress_every: 0, skip_hidden_dirs: true }
    }
}

/// Receives scan results as they are discovered.
pub trait ScanObserver {
    fn on_found(&mut self, holon: LocatedIdentity);

    fn on_progress(&mut self, _progress: ScanProgress) {}

    /// Called for every entry the scan could not use. The scan always continues.
    fn on_skip(&mut self, path: &Path, reason: &SkipReason) {
        tracing::debug!(path = %path.display(), %reason, "skipping entry during holon scan");
    }
}

struct FnObserver<'a, F> {
    on_found: F,
    on_progress: Option<&'a mut dyn FnMut(ScanProgress)>,
}

impl<F> ScanObserver for FnObserver<'_, F>
where
    F: FnMut(LocatedIdentity),
{
    fn on_found(&mut self, holon: LocatedIdentity) {
        (self.on_found)(holon);
    }

    fn on_progress(&mut self, progress: ScanProgress) {
        if let Some(on_progress) = self.on_progress.as_mut() {
            on_progress(progress);
        }
    }
}

/// Walk `root` depth-first, emitting every parsable `HOLON.md` through the
/// observer as soon as it is read.
///
/// Unreadable entries and corrupt identity files are reported to
/// [`ScanObserver::on_skip`] and never abort the walk. Returns the final
/// progress snapshot, which is also delivered to the observer.
///
/// # Errors
/// Returns [`IdentityError::Io`] when `root` does not exist or cannot be read.
pub fn scan_with_observer<O>(
    root: &Path,
    options: &ScanOptions,
    observer: &mut O,
) -> Result<ScanProgress, IdentityError>
where
    O: ScanObserver + ?Sized,
{
    fs::metadata(root).map_err(|err| IdentityError::io("cannot scan", root, err))?;

    let skip_hidden_dirs = options.skip_hidden_dirs;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(skip_hidden_dirs && is_hidden_dir(entry)));

    let mut progress = ScanProgress::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(IdentityError::io("cannot scan", root, err.into()));
            }
            Err(err) => {
                let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                observer.on_skip(&path, &SkipReason::Walk(err));
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        progress.scanned_files += 1;
        if options.progress_every > 0 && progress.scanned_files % options.progress_every == 0 {
            observer.on_progress(progress);
        }

        if entry.file_name() != HOLON_FILE_NAME {
            continue;
        }

        let Some(identity) = read_identity(entry.path(), observer) else {
            continue;
        };
        progress.holons_found += 1;
        observer.on_found(LocatedIdentity { identity, path: entry.into_path() });
    }

    observer.on_progress(progress);
    Ok(progress)
}

/// Closure form of [`scan_with_observer`] with the default hidden-directory rule.
///
/// # Errors
/// Returns [`IdentityError::Io`] when `root` does not exist or cannot be read.
pub fn scan_all_with_paths<F>(
    root: &Path,
    progress_every: usize,
    on_found: F,
    on_progress: Option<&mut dyn FnMut(ScanProgress)>,
) -> Result<ScanProgress, IdentityError>
where
    F: FnMut(LocatedIdentity),
{
    let options = ScanOptions { progress_every, ..ScanOptions::default() };
    let mut observer = FnObserver { on_found, on_progress };
    scan_with_observer(root, &options, &mut observer)
}

/// Every identity under `root`, with the path each was read from.
///
/// # Errors
/// Returns [`IdentityError::Io`] when `root` does not exist or cannot be read.
pub fn find_all_with_paths(root: &Path) -> Result<Vec<LocatedIdentity>, IdentityError> {
    let mut holons = Vec::new();
    scan_all_with_paths(root, 0, |holon| holons.push(holon), None)?;
    Ok(holons)
}

/// Every identity under `root`.
///
/// # Errors
/// Returns [`IdentityError::Io`] when `root` does not exist or cannot be read.
pub fn find_all(root: &Path) -> Result<Vec<Identity>, IdentityError> {
    Ok(find_all_with_paths(root)?.into_iter().map(|holon| holon.identity).collect())
}

pub(crate) fn read_identity<O>(path: &Path, observer: &mut O) -> Option<Identity>
where
    O: ScanObserver + ?Sized,
{
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            observer.on_skip(path, &SkipReason::Read(err));
            return None;
        }
    };

    match parse_frontmatter(&data) {
        Ok((identity, _body)) => Some(identity),
        Err(err) => {
            observer.on_skip(path, &SkipReason::Decode(err));
            None
        }
    }
}

// The root itself is always visited, whatever its name.
fn is_hidden_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let Some(name) = entry.file_name().to_str() else {
        return false;
    };
    name.starts_with('.') && name != "." && name != HOLON_DIR_NAME
}

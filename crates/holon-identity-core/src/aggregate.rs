use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::scan::{scan_all_with_paths, LocatedIdentity, ScanProgress};
use crate::HOLON_DIR_NAME;

/// Conventional subdirectory holding a project's own holons.
const LOCAL_HOLONS_DIR: &str = "holons";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Cached,
}

impl Origin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cached => "cached",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HolonEntry {
    pub identity: Identity,
    pub origin: Origin,
    /// Directory of the `HOLON.md`, relative to the requested root.
    pub relative_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Global cache scanned after the local roots; `None` skips it.
    pub cache_dir: Option<PathBuf>,
    pub progress_every: usize,
}

impl ListOptions {
    #[must_use]
    pub fn with_default_cache(progress_every: usize) -> Self {
        Self { cache_dir: default_cache_dir(), progress_every }
    }
}

/// `~/.holon/cache`, or `None` when the home directory is unknown.
#[must_use]
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HOLON_DIR_NAME).join("cache"))
}

/// List the holons visible from `root`: `<root>/holons`, then `<root>` itself,
/// then the cache directory.
///
/// The two local roots share one de-duplication set keyed by uuid (or by path
/// when the uuid is empty) and are labelled [`Origin::Local`]. Cache entries
/// are labelled [`Origin::Cached`] and are not de-duplicated against local
/// ones. A root that cannot be scanned contributes nothing. Progress is
/// reported with the label of the root being scanned (`local`, `root`,
/// `cache`). Returns the number of entries emitted.
pub fn list_holons<F, P>(
    root: &Path,
    options: &ListOptions,
    mut on_entry: F,
    mut on_progress: P,
) -> usize
where
    F: FnMut(HolonEntry),
    P: FnMut(&str, ScanProgress),
{
    let mut local_seen = HashSet::new();
    let mut emitted = 0;

    let local_roots = [(root.join(LOCAL_HOLONS_DIR), "local"), (root.to_path_buf(), "root")];
    for (scan_root, label) in &local_roots {
        emitted += scan_root_into(
            RootScan { root, scan_root, label, origin: Origin::Local },
            options.progress_every,
            Some(&mut local_seen),
            &mut on_entry,
            &mut on_progress,
        );
    }

    if let Some(cache_dir) = options.cache_dir.as_deref() {
        emitted += scan_root_into(
            RootScan { root, scan_root: cache_dir, label: "cache", origin: Origin::Cached },
            options.progress_every,
            None,
            &mut on_entry,
            &mut on_progress,
        );
    }

    emitted
}

/// Collecting form of [`list_holons`].
#[must_use]
pub fn collect_holons(root: &Path, options: &ListOptions) -> Vec<HolonEntry> {
    let mut entries = Vec::new();
    list_holons(root, options, |entry| entries.push(entry), |_, _| {});
    entries
}

/// Directory containing `holon_path`, relative to `root`; `.` for the root
/// itself.
///
/// The path is computed lexically, so a directory outside `root` comes back
/// with leading `..` components (a cache entry listed from a project reads like
/// `../../.holon/cache/<name>`). When no lexical relation exists, as with one
/// absolute and one relative path, the directory is returned unchanged.
#[must_use]
pub fn relative_holon_dir(root: &Path, holon_path: &Path) -> String {
    let dir = holon_path.parent().unwrap_or(holon_path);
    match lexical_relative(root, dir) {
        Some(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Some(relative) => relative.display().to_string(),
        None => dir.display().to_string(),
    }
}

fn lexical_relative(base: &Path, path: &Path) -> Option<PathBuf> {
    if base.is_absolute() != path.is_absolute() {
        return None;
    }
    let base = base.components().filter(|part| *part != Component::CurDir).collect::<Vec<_>>();
    let path = path.components().filter(|part| *part != Component::CurDir).collect::<Vec<_>>();
    let shared = base.iter().zip(&path).take_while(|(left, right)| left == right).count();

    // `..` left in the base cannot be undone without touching the filesystem.
    if base[shared..].contains(&Component::ParentDir) {
        return None;
    }

    let mut relative = PathBuf::new();
    for _ in &base[shared..] {
        relative.push("..");
    }
    for part in &path[shared..] {
        relative.push(part);
    }
    Some(relative)
}

struct RootScan<'a> {
    root: &'a Path,
    scan_root: &'a Path,
    label: &'a str,
    origin: Origin,
}

fn scan_root_into<F, P>(
    scan: RootScan<'_>,
    progress_every: usize,
    mut seen: Option<&mut HashSet<String>>,
    on_entry: &mut F,
    on_progress: &mut P,
) -> usize
where
    F: FnMut(HolonEntry),
    P: FnMut(&str, ScanProgress),
{
    let mut emitted = 0;
    let mut report = |progress: ScanProgress| on_progress(scan.label, progress);

    let result = scan_all_with_paths(
        scan.scan_root,
        progress_every,
        |holon: LocatedIdentity| {
            if let Some(seen) = seen.as_deref_mut() {
                if !seen.insert(dedup_key(&holon)) {
                    return;
                }
            }
            on_entry(HolonEntry {
                relative_path: relative_holon_dir(scan.root, &holon.path),
                identity: holon.identity,
                origin: scan.origin,
            });
            emitted += 1;
        },
        Some(&mut report),
    );

    if let Err(err) = result {
        tracing::debug!(label = scan.label, %err, "skipping holon root");
    }
    emitted
}

fn dedup_key(holon: &LocatedIdentity) -> String {
    if holon.identity.uuid.is_empty() {
        holon.path.to_string_lossy().into_owned()
    } else {
        holon.identity.uuid.clone()
    }
}

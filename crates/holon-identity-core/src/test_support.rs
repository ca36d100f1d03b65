use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{render_holon_md, Identity, HOLON_FILE_NAME};

pub(crate) fn temp_root() -> TempDir {
    tempfile::tempdir().unwrap_or_else(|err| panic!("failed to create temp dir: {err}"))
}

pub(crate) fn identity_with_uuid(uuid: &str) -> Identity {
    Identity {
        uuid: uuid.to_string(),
        given_name: "Fixture".to_string(),
        family_name: format!("Holon {uuid}"),
        motto: "Exist for the test.".to_string(),
        composer: "tester".to_string(),
        born: "2026-01-01".to_string(),
        generated_by: "sophia-who".to_string(),
        lang: "rust".to_string(),
        ..Identity::default()
    }
}

/// Write a `HOLON.md` for `uuid` under `root/rel_dir` and return its path.
pub(crate) fn write_holon(root: &Path, rel_dir: &str, uuid: &str) -> PathBuf {
    write_raw(root, rel_dir, &render_holon_md(&identity_with_uuid(uuid)))
}

pub(crate) fn write_raw(root: &Path, rel_dir: &str, content: &str) -> PathBuf {
    let dir = root.join(rel_dir);
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create {}: {err}", dir.display()));
    let path = dir.join(HOLON_FILE_NAME);
    fs::write(&path, content)
        .unwrap_or_else(|err| panic!("failed to write {}: {err}", path.display()));
    path
}

pub(crate) fn touch(root: &Path, rel_path: &str) {
    let path = root.join(rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|err| panic!("failed to create {}: {err}", parent.display()));
    }
    fs::write(&path, "filler")
        .unwrap_or_else(|err| panic!("failed to write {}: {err}", path.display()));
}

/// A `HOLON.md` symlink pointing at nothing, so reading it fails.
#[cfg(unix)]
pub(crate) fn dangling_holon_link(root: &Path, rel_dir: &str) -> PathBuf {
    let dir = root.join(rel_dir);
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create {}: {err}", dir.display()));
    let link = dir.join(HOLON_FILE_NAME);
    std::os::unix::fs::symlink(dir.join("missing-target.md"), &link)
        .unwrap_or_else(|err| panic!("failed to link {}: {err}", link.display()));
    link
}

/// Directory with its permissions removed; restored on drop so the temp dir
/// can be cleaned up.
#[cfg(unix)]
pub(crate) struct LockedDir {
    pub(crate) path: PathBuf,
}

#[cfg(unix)]
impl Drop for LockedDir {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;

        let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o755));
    }
}

/// Create `root/rel_dir` holding a valid holon and make it unreadable.
/// Returns `None` when the process can read it anyway (running as root).
#[cfg(unix)]
pub(crate) fn locked_dir(root: &Path, rel_dir: &str) -> Option<LockedDir> {
    use std::os::unix::fs::PermissionsExt;

    let path = root.join(rel_dir);
    write_holon(root, rel_dir, "locked-away");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000))
        .unwrap_or_else(|err| panic!("failed to lock {}: {err}", path.display()));
    let locked = LockedDir { path };
    if fs::read_dir(&locked.path).is_ok() {
        return None;
    }
    Some(locked)
}

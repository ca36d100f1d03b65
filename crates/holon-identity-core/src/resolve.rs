use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::IdentityError;
use crate::scan::{read_identity, LocatedIdentity, ScanObserver};
use crate::HOLON_FILE_NAME;

// Lookups only care about the match; skipped entries go to the default log hook.
struct SkipLogger;

impl ScanObserver for SkipLogger {
    fn on_found(&mut self, _holon: LocatedIdentity) {}
}

/// Locate the `HOLON.md` whose uuid equals `target` or starts with it.
///
/// Unlike bulk scans this descends into hidden directories. The walk runs in
/// lexical order and stops at the first match, so an ambiguous prefix resolves
/// to the first record in that order.
///
/// # Errors
/// Returns [`IdentityError::NotFound`] when no record matches and
/// [`IdentityError::Io`] when `root` does not exist or cannot be read.
pub fn find_by_uuid(root: &Path, target: &str) -> Result<PathBuf, IdentityError> {
    fs::metadata(root).map_err(|err| IdentityError::io("cannot search", root, err))?;

    let mut skipped = SkipLogger;
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(IdentityError::io("cannot search", root, err.into()));
            }
            Err(err) => {
                tracing::debug!(%err, "skipping entry during holon lookup");
                continue;
            }
        };

        if entry.file_type().is_dir() || entry.file_name() != HOLON_FILE_NAME {
            continue;
        }

        let Some(identity) = read_identity(entry.path(), &mut skipped) else {
            continue;
        };

        if identity.uuid == target || identity.uuid.starts_with(target) {
            return Ok(entry.into_path());
        }
    }

    Err(IdentityError::NotFound(format!("holon not found: {target}")))
}

//! Holon identity records: the `HOLON.md` model, its frontmatter codec, and
//! the discovery subsystem that finds, resolves, and aggregates identity files
//! across a directory tree.

mod aggregate;
mod error;
mod frontmatter;
mod identity;
mod resolve;
mod scan;
#[cfg(test)]
mod test_support;

pub use aggregate::{
    collect_holons, default_cache_dir, list_holons, relative_holon_dir, HolonEntry, ListOptions,
    Origin,
};
pub use error::IdentityError;
pub use frontmatter::{parse_frontmatter, render_holon_md, write_holon_md};
pub use identity::{Clade, Identity, ReproductionMode, Status, GENERATED_BY};
pub use resolve::find_by_uuid;
pub use scan::{
    find_all, find_all_with_paths, scan_all_with_paths, scan_with_observer, LocatedIdentity,
    ScanObserver, ScanOptions, ScanProgress, SkipReason,
};

/// File name every holon identity is stored under.
pub const HOLON_FILE_NAME: &str = "HOLON.md";

/// Hidden directory that local holons and the global cache live under.
pub const HOLON_DIR_NAME: &str = ".holon";

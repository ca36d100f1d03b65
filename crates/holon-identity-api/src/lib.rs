use std::fs;
use std::path::{Path, PathBuf};

use holon_identity_core::{
    collect_holons, find_all_with_paths, find_by_uuid, parse_frontmatter, relative_holon_dir,
    write_holon_md, Clade, HolonEntry, Identity, IdentityError, ListOptions, Origin,
    ReproductionMode, HOLON_DIR_NAME, HOLON_FILE_NAME,
};
use serde::{Deserialize, Serialize};

pub const API_CONTRACT_VERSION: &str = "api.v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateIdentityRequest {
    pub given_name: String,
    pub family_name: String,
    pub motto: String,
    pub composer: String,
    #[serde(default)]
    pub clade: Option<Clade>,
    #[serde(default)]
    pub reproduction: Option<ReproductionMode>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateIdentityResponse {
    pub identity: Identity,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowIdentityRequest {
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowIdentityResponse {
    pub identity: Identity,
    pub file_path: PathBuf,
    pub raw_content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListIdentitiesRequest {
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    /// Also scan `<root>/holons` and the global cache, as the CLI listing does.
    #[serde(default)]
    pub include_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListIdentitiesResponse {
    pub entries: Vec<HolonEntry>,
}

/// The create/show/list facade shared by the CLI and the HTTP service.
///
/// Every relative path a caller hands in is resolved against `root`.
#[derive(Debug, Clone)]
pub struct HolonIdentityApi {
    root: PathBuf,
    cache_dir: Option<PathBuf>,
}

impl HolonIdentityApi {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root, cache_dir: None }
    }

    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Mint a new identity and write its `HOLON.md`.
    ///
    /// Without an explicit output directory the file lands in
    /// `<root>/.holon/<given>-<family>/`.
    ///
    /// # Errors
    /// Returns [`IdentityError::InvalidArgument`] when a required name field is
    /// blank, and [`IdentityError::Io`] when the directory or file cannot be written.
    pub fn create_identity(
        &self,
        input: CreateIdentityRequest,
    ) -> Result<CreateIdentityResponse, IdentityError> {
        for (field, value) in [
            ("given_name", &input.given_name),
            ("family_name", &input.family_name),
            ("motto", &input.motto),
            ("composer", &input.composer),
        ] {
            if value.trim().is_empty() {
                return Err(IdentityError::InvalidArgument(format!("{field} is required")));
            }
        }

        let mut identity = Identity::new();
        identity.given_name = input.given_name;
        identity.family_name = input.family_name;
        identity.motto = input.motto;
        identity.composer = input.composer;
        if let Some(clade) = input.clade {
            identity.clade = clade.as_str().to_string();
        }
        if let Some(mode) = input.reproduction {
            identity.reproduction = mode.as_str().to_string();
        }
        if let Some(lang) = input.lang.filter(|lang| !lang.trim().is_empty()) {
            identity.lang = lang;
        }
        identity.aliases = input.aliases;

        let output_dir = match input.output_dir.filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => self.resolve(&dir),
            None => self.root.join(HOLON_DIR_NAME).join(identity.slug()),
        };
        fs::create_dir_all(&output_dir)
            .map_err(|err| IdentityError::io("cannot create directory", &output_dir, err))?;

        let file_path = output_dir.join(HOLON_FILE_NAME);
        write_holon_md(&identity, &file_path)?;

        Ok(CreateIdentityResponse { identity, file_path })
    }

    /// Load one identity by full uuid or uuid prefix, together with the raw file.
    ///
    /// # Errors
    /// Returns [`IdentityError::InvalidArgument`] for a blank uuid,
    /// [`IdentityError::NotFound`] when nothing matches, and read or parse
    /// errors for the matched file.
    pub fn show_identity(
        &self,
        input: &ShowIdentityRequest,
    ) -> Result<ShowIdentityResponse, IdentityError> {
        let target = input.uuid.trim();
        if target.is_empty() {
            return Err(IdentityError::InvalidArgument("uuid is required".to_string()));
        }

        let file_path = find_by_uuid(&self.root, target)?;
        let data =
            fs::read(&file_path).map_err(|err| IdentityError::io("cannot read", &file_path, err))?;
        let (identity, _body) = parse_frontmatter(&data)?;

        Ok(ShowIdentityResponse {
            identity,
            file_path,
            raw_content: String::from_utf8_lossy(&data).into_owned(),
        })
    }

    /// List identities under a root directory; an absent or blank `root_dir`
    /// means the facade root.
    ///
    /// A plain request scans that single root and labels every entry `local`.
    /// With `include_cache` the request follows the CLI listing instead:
    /// `<root>/holons`, `<root>`, then the cache directory.
    ///
    /// # Errors
    /// Returns [`IdentityError::Io`] when a single-root scan cannot read its root.
    pub fn list_identities(
        &self,
        input: &ListIdentitiesRequest,
    ) -> Result<ListIdentitiesResponse, IdentityError> {
        let root_dir = match input.root_dir.as_deref() {
            Some(dir) if !dir.to_string_lossy().trim().is_empty() => self.resolve(dir),
            _ => self.root.clone(),
        };

        if input.include_cache {
            let options = ListOptions { cache_dir: self.cache_dir.clone(), progress_every: 0 };
            return Ok(ListIdentitiesResponse { entries: collect_holons(&root_dir, &options) });
        }

        let entries = find_all_with_paths(&root_dir)?
            .into_iter()
            .map(|holon| HolonEntry {
                relative_path: relative_holon_dir(&root_dir, &holon.path),
                identity: holon.identity,
                origin: Origin::Local,
            })
            .collect();
        Ok(ListIdentitiesResponse { entries })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

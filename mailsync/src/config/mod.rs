//! # Configuration
//!
//! Module dedicated to the synchronization configuration. It tells
//! where synchronization metadata (UID mapping files, lock files) is
//! stored, and how many concurrent sessions each repository accepts.

mod error;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use shellexpand_utils::shellexpand_path;
use tracing::debug;

#[doc(inline)]
pub use self::error::{Error, Result};
use crate::task::{self, PermitRegistry};

/// The default number of concurrent sessions of a repository.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1;

/// The synchronization configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct SyncConfig {
    /// The metadata directory.
    ///
    /// Defaults to `mailsync` in the user data directory. Path is
    /// shell-expanded, which means environment variables and tilde
    /// `~` are replaced by their values.
    #[cfg_attr(feature = "derive", serde(default))]
    pub metadata_dir: Option<PathBuf>,

    /// The repositories configuration, by repository name.
    #[cfg_attr(feature = "derive", serde(default))]
    pub repositories: BTreeMap<String, RepositoryConfig>,
}

/// The repository configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct RepositoryConfig {
    /// The maximum number of sessions opened at the same time.
    #[cfg_attr(feature = "derive", serde(default))]
    pub max_connections: Option<usize>,
}

impl SyncConfig {
    pub fn find_default_metadata_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("mailsync"))
    }

    /// Return the shell-expanded metadata directory.
    pub fn get_metadata_dir(&self) -> Result<PathBuf> {
        self.metadata_dir
            .as_ref()
            .map(shellexpand_path)
            .or_else(Self::find_default_metadata_dir)
            .ok_or(Error::GetMetadataDirError)
    }

    /// Return the metadata directory of the given repository, creating
    /// it if needed.
    pub fn repository_dir(&self, repository: &str) -> Result<PathBuf> {
        let dir = self
            .get_metadata_dir()?
            .join(format!("Repository-{repository}"));
        create_private_dir(&dir)?;
        Ok(dir)
    }

    /// Return the directory holding UID mapping files of the given
    /// repository, creating it if needed.
    pub fn uid_mapping_dir(&self, repository: &str) -> Result<PathBuf> {
        let dir = self.repository_dir(repository)?.join("UIDMapping");
        create_private_dir(&dir)?;
        Ok(dir)
    }

    /// Return the maximum number of concurrent sessions of the given
    /// repository.
    pub fn max_connections(&self, repository: &str) -> usize {
        self.repositories
            .get(repository)
            .and_then(|config| config.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    /// Initialize permits of the given repository.
    pub fn init_permits(&self, registry: &PermitRegistry, repository: &str) -> task::Result<bool> {
        registry.init(repository, self.max_connections(repository))
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);

    builder
        .create(dir)
        .map_err(|err| Error::CreateMetadataDirError(err, dir.to_owned()))?;

    debug!("ensured metadata directory {dir:?}");

    Ok(())
}

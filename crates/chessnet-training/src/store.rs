//! Network files on disk.
//!
//! Each network lives in its own pretty-printed JSON file named
//! `{prefix}{name}.{extension}`, or `{prefix}{name} ({copy_index}).{extension}` when
//! its copy index is not zero. Names are not unique, so saving a new network without
//! overwrite bumps its copy index until the file name is free.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chessnet_network::{Network, NetworkError, schema::SerializedNetwork};

use crate::config::StoreConfig;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("failed to access network directory {}", path.display())]
    Directory { path: PathBuf, source: io::Error },
    #[display("failed to read network file {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("failed to parse network file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("failed to encode network for {}", path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("invalid network in {}", path.display())]
    Invalid { path: PathBuf, source: NetworkError },
    #[display("failed to write network file {}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[display("failed to delete network file {}", path.display())]
    Delete { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone)]
pub struct PopulationStore {
    config: StoreConfig,
}

impl PopulationStore {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    #[must_use]
    pub fn path_of(&self, network: &Network) -> PathBuf {
        let StoreConfig {
            directory,
            prefix,
            extension,
        } = &self.config;
        let name = network.name();
        let file_name = match network.copy_index() {
            0 => format!("{prefix}{name}.{extension}"),
            copy => format!("{prefix}{name} ({copy}).{extension}"),
        };
        directory.join(file_name)
    }

    fn is_network_file(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let suffix = format!(".{}", self.config.extension);
        file_name.starts_with(&self.config.prefix) && file_name.ends_with(&suffix)
    }

    /// Loads every network file of the directory, in file-name order.
    ///
    /// A missing directory is created and yields an empty population.
    pub fn list_all(&self) -> Result<Vec<Network>, StoreError> {
        let directory = self.directory();
        if !directory.is_dir() {
            log::warn!(
                "network directory {} does not exist; creating an empty one",
                directory.display()
            );
            fs::create_dir_all(directory).map_err(|source| StoreError::Directory {
                path: directory.to_owned(),
                source,
            })?;
            return Ok(vec![]);
        }

        let to_error = |source| StoreError::Directory {
            path: directory.to_owned(),
            source,
        };
        let mut paths = vec![];
        for entry in fs::read_dir(directory).map_err(to_error)? {
            let path = entry.map_err(to_error)?.path();
            if path.is_file() && self.is_network_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| Self::load(path)).collect()
    }

    pub fn load(path: &Path) -> Result<Network, StoreError> {
        let text = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_owned(),
            source,
        })?;
        let serialized: SerializedNetwork =
            serde_json::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.to_owned(),
                source,
            })?;
        Network::try_from(serialized).map_err(|source| StoreError::Invalid {
            path: path.to_owned(),
            source,
        })
    }

    /// Writes `network` and returns its path.
    ///
    /// Without `overwrite`, the copy index is incremented until no file exists at the
    /// derived path.
    pub fn save(&self, network: &mut Network, overwrite: bool) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(self.directory()).map_err(|source| StoreError::Directory {
            path: self.directory().to_owned(),
            source,
        })?;

        let mut path = self.path_of(network);
        if !overwrite {
            while path.exists() {
                network.set_copy_index(network.copy_index() + 1);
                path = self.path_of(network);
            }
        }

        let json = serde_json::to_string_pretty(&SerializedNetwork::from(&*network))
            .map_err(|source| StoreError::Encode {
                path: path.clone(),
                source,
            })?;
        fs::write(&path, json).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Removes the network's file. A missing file is not an error.
    pub fn delete(&self, network: &Network) -> Result<(), StoreError> {
        let path = self.path_of(network);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Delete { path, source }),
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing configuration files for the authorization
//! subsystem

use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;
use std::num::NonZeroU32;

/// Tunables for the authorization subsystem
///
/// All fields have defaults, so an empty config file is valid.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// page size used when the coordinator scans the authorization store
    /// internally (e.g., resolving a full-selection handover)
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: NonZeroU32,

    /// largest page size a caller may request when listing authorizations
    #[serde(default = "default_max_page_size")]
    pub max_page_size: NonZeroU32,
}

fn default_scan_batch_size() -> NonZeroU32 {
    NonZeroU32::new(100).unwrap()
}

fn default_max_page_size() -> NonZeroU32 {
    NonZeroU32::new(1000).unwrap()
}

impl Default for AuthConfig {
    fn default() -> AuthConfig {
        AuthConfig {
            scan_batch_size: default_scan_batch_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl AuthConfig {
    /// Load an `AuthConfig` from the given TOML file
    pub fn from_file(path: &Utf8Path) -> Result<AuthConfig, LoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.to_owned(), err })?;
        let config = toml::from_str(&contents)
            .map_err(|err| LoadError::Parse { path: path.to_owned(), err })?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("error reading \"{path}\"")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("error parsing \"{path}\"")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
}

//! Object key derivation
//!
//! Local files are identified remotely by their path relative to the sync
//! root, joined with forward slashes regardless of the host platform.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Slash-separated path of a local entry relative to the sync root
///
/// This is the identity shared by local files and remote objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativeKey(String);

impl RelativeKey {
    /// Derive the key of `path`, which must live below `root`
    pub fn from_root(root: &Path, path: &Path) -> Result<Self> {
        let relative = path.strip_prefix(root).map_err(|_| {
            Error::InvalidPath(format!(
                "{} is not inside {}",
                path.display(),
                root.display()
            ))
        })?;

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        Error::InvalidPath(format!("{} is not valid UTF-8", path.display()))
                    })?;
                    parts.push(part);
                }
                Component::CurDir => {}
                _ => {
                    return Err(Error::InvalidPath(format!(
                        "{} cannot be expressed as an object key",
                        path.display()
                    )));
                }
            }
        }

        if parts.is_empty() {
            return Err(Error::InvalidPath(format!(
                "{} is the sync root itself",
                path.display()
            )));
        }

        Ok(Self(parts.join("/")))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelativeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rewrite an object key as a CDN path with a leading slash
pub fn cdn_path(key: &str) -> String {
    if key.starts_with('/') {
        key.to_string()
    } else {
        format!("/{key}")
    }
}

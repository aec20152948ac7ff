// Host volumes: root directories a container-side path may be resolved against

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// A named host directory the scanner and log sizer resolve daemon paths against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostVolume {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VolumeParseError {
    #[error("invalid volume `{0}`, expected <name>:<path>")]
    MissingSeparator(String),
    #[error("volume `{0}` has an empty name")]
    EmptyName(String),
    #[error("volume `{0}` has an empty path")]
    EmptyPath(String),
}

impl HostVolume {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parse a comma-separated list, e.g. `root:/hostroot,data:/mnt/data`.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, VolumeParseError> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for HostVolume {
    type Err = VolumeParseError;

    /// Parse `<name>:<path>`. Only the first `:` separates; the path may contain more.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = s
            .split_once(':')
            .ok_or_else(|| VolumeParseError::MissingSeparator(s.to_string()))?;
        if name.trim().is_empty() {
            return Err(VolumeParseError::EmptyName(s.to_string()));
        }
        if path.trim().is_empty() {
            return Err(VolumeParseError::EmptyPath(s.to_string()));
        }
        Ok(Self::new(name.trim(), path.trim()))
    }
}

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Object storage backend kinds
///
/// `Disabled` is a valid, explicit "no object storage" setting: a facade built
/// from it constructs fine and rejects every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    S3Like,
    Local,
    Disabled,
}

/// Returned when a backend kind string names no known backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object storage type: {0:?}")]
pub struct InvalidBackendKind(pub String);

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::S3Like => "s3-like",
            BackendKind::Local => "local",
            BackendKind::Disabled => "disabled",
        }
    }
}

impl FromStr for BackendKind {
    type Err = InvalidBackendKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3-like" | "s3_like" | "s3" => Ok(BackendKind::S3Like),
            "local" => Ok(BackendKind::Local),
            "disabled" | "none" => Ok(BackendKind::Disabled),
            _ => Err(InvalidBackendKind(s.to_string())),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Serialize for BackendKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BackendKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

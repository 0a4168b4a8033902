//! Configuration module
//!
//! [`StorageConfig`] describes one object storage target: which backend to use
//! and the connection parameters it needs. Values are assembled once (from the
//! environment, a deserialized document, or the constructors below) and are
//! read-only afterwards; nothing hands out `&mut` access.

use std::env;
use std::fmt;

use serde::Deserialize;

use crate::storage_types::BackendKind;

/// Object storage backend configuration
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    kind: BackendKind,
    /// Bucket name for `s3-like`, root directory for `local`.
    #[serde(default)]
    path: String,
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    secret_key: String,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    cdn_endpoint: String,
    #[serde(default)]
    cdn_secure: bool,
}

impl StorageConfig {
    /// Local filesystem storage rooted at `root`.
    pub fn local(root: impl Into<String>) -> Self {
        StorageConfig {
            kind: BackendKind::Local,
            path: root.into(),
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            secure: false,
            cdn_endpoint: String::new(),
            cdn_secure: false,
        }
    }

    /// S3-compatible storage. The CDN host defaults to the API endpoint;
    /// override it with [`StorageConfig::with_cdn`].
    pub fn s3_like(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        StorageConfig {
            kind: BackendKind::S3Like,
            path: bucket.into(),
            cdn_endpoint: endpoint.clone(),
            endpoint,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            secure: false,
            cdn_secure: false,
        }
    }

    /// No object storage configured.
    pub fn disabled() -> Self {
        StorageConfig {
            kind: BackendKind::Disabled,
            ..StorageConfig::local(String::new())
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_cdn(mut self, cdn_endpoint: impl Into<String>, cdn_secure: bool) -> Self {
        self.cdn_endpoint = cdn_endpoint.into();
        self.cdn_secure = cdn_secure;
        self
    }

    /// Load configuration from `OBJECT_STORAGE_*` environment variables
    /// (after reading `.env` if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`StorageConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match lookup("OBJECT_STORAGE_TYPE") {
            Some(raw) if !raw.trim().is_empty() => raw.parse::<BackendKind>()?,
            _ => BackendKind::Disabled,
        };

        let endpoint = lookup("OBJECT_STORAGE_ENDPOINT").unwrap_or_default();
        let secure = parse_bool("OBJECT_STORAGE_SECURE", lookup("OBJECT_STORAGE_SECURE"))?
            .unwrap_or(false);
        let cdn_endpoint = lookup("OBJECT_STORAGE_CDN_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| endpoint.clone());
        let cdn_secure = parse_bool(
            "OBJECT_STORAGE_CDN_SECURE",
            lookup("OBJECT_STORAGE_CDN_SECURE"),
        )?
        .unwrap_or(secure);

        Ok(StorageConfig {
            kind,
            path: lookup("OBJECT_STORAGE_PATH").unwrap_or_default(),
            endpoint,
            access_key: lookup("OBJECT_STORAGE_ACCESS_KEY").unwrap_or_default(),
            secret_key: lookup("OBJECT_STORAGE_SECRET_KEY").unwrap_or_default(),
            secure,
            cdn_endpoint,
            cdn_secure,
        })
    }

    /// Check that the fields required by the selected backend are present.
    /// Performs no I/O.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.kind {
            BackendKind::S3Like => {
                let required = [
                    ("OBJECT_STORAGE_ENDPOINT", &self.endpoint),
                    ("OBJECT_STORAGE_PATH (bucket)", &self.path),
                    ("OBJECT_STORAGE_ACCESS_KEY", &self.access_key),
                    ("OBJECT_STORAGE_SECRET_KEY", &self.secret_key),
                ];
                let missing: Vec<&str> = required
                    .iter()
                    .filter(|(_, value)| value.trim().is_empty())
                    .map(|(name, _)| *name)
                    .collect();
                if !missing.is_empty() {
                    return Err(anyhow::anyhow!(
                        "s3-like object storage requires: {}",
                        missing.join(", ")
                    ));
                }
            }
            BackendKind::Local => {
                if self.path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "local object storage requires OBJECT_STORAGE_PATH"
                    ));
                }
            }
            BackendKind::Disabled => {}
        }
        Ok(())
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn cdn_endpoint(&self) -> &str {
        &self.cdn_endpoint
    }

    pub fn cdn_secure(&self) -> bool {
        self.cdn_secure
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("secure", &self.secure)
            .field("cdn_endpoint", &self.cdn_endpoint)
            .field("cdn_secure", &self.cdn_secure)
            .finish()
    }
}

fn parse_bool(name: &str, value: Option<String>) -> Result<Option<bool>, anyhow::Error> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        other => Err(anyhow::anyhow!("{} must be a boolean, got {:?}", name, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn missing_type_is_disabled() {
        let config = StorageConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.kind(), BackendKind::Disabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_type_is_rejected() {
        let err = StorageConfig::from_lookup(lookup_from(&[("OBJECT_STORAGE_TYPE", "tape")]))
            .unwrap_err();
        assert!(err.to_string().contains("tape"));
    }

    #[test]
    fn s3_like_from_env_defaults_cdn_to_endpoint() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            ("OBJECT_STORAGE_TYPE", "s3-like"),
            ("OBJECT_STORAGE_ENDPOINT", "minio.internal:9000"),
            ("OBJECT_STORAGE_PATH", "mybucket"),
            ("OBJECT_STORAGE_ACCESS_KEY", "AKID"),
            ("OBJECT_STORAGE_SECRET_KEY", "secret"),
            ("OBJECT_STORAGE_SECURE", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.kind(), BackendKind::S3Like);
        assert_eq!(config.path(), "mybucket");
        assert_eq!(config.cdn_endpoint(), "minio.internal:9000");
        assert!(config.secure());
        assert!(config.cdn_secure());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_cdn_settings_win() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            ("OBJECT_STORAGE_TYPE", "s3-like"),
            ("OBJECT_STORAGE_ENDPOINT", "minio.internal:9000"),
            ("OBJECT_STORAGE_SECURE", "false"),
            ("OBJECT_STORAGE_CDN_ENDPOINT", "cdn.example.com"),
            ("OBJECT_STORAGE_CDN_SECURE", "1"),
        ]))
        .unwrap();

        assert_eq!(config.cdn_endpoint(), "cdn.example.com");
        assert!(!config.secure());
        assert!(config.cdn_secure());
    }

    #[test]
    fn bad_boolean_is_an_error() {
        let result = StorageConfig::from_lookup(lookup_from(&[
            ("OBJECT_STORAGE_TYPE", "local"),
            ("OBJECT_STORAGE_SECURE", "sometimes"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn validate_reports_missing_s3_fields() {
        let config = StorageConfig::s3_like("minio:9000", "", "AKID", "");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bucket"));
        assert!(err.contains("OBJECT_STORAGE_SECRET_KEY"));
        assert!(!err.contains("OBJECT_STORAGE_ACCESS_KEY"));
    }

    #[test]
    fn validate_local_requires_path() {
        assert!(StorageConfig::local("").validate().is_err());
        assert!(StorageConfig::local("/tmp/store").validate().is_ok());
    }

    #[test]
    fn deserializes_type_field() {
        let config: StorageConfig = serde_json::from_str(
            r#"{
                "type": "s3-like",
                "path": "mybucket",
                "endpoint": "s3.internal",
                "access_key": "AKID",
                "secret_key": "secret",
                "secure": true,
                "cdn_endpoint": "cdn.example.com",
                "cdn_secure": true
            }"#,
        )
        .unwrap();

        assert_eq!(
            config,
            StorageConfig::s3_like("s3.internal", "mybucket", "AKID", "secret")
                .with_secure(true)
                .with_cdn("cdn.example.com", true)
        );
    }

    #[test]
    fn deserialize_rejects_unknown_type() {
        let result = serde_json::from_str::<StorageConfig>(r#"{"type": "ipfs"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = StorageConfig::s3_like("s3.internal", "b", "AKID", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("AKID"));
    }
}

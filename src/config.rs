//! Configuration types for the SOAP client.
//!
//! Two layers live here: the option sets the builder accumulates
//! ([`HttpOptions`], [`TlsOptions`], [`SoapOptions`]) and the YAML file
//! configuration ([`ClientConfig`]) that feeds the builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// HTTP transport settings used for the WSDL fetch and engine calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    /// Maximum redirects to follow (0 = none)
    pub max_redirects: u32,
    /// Request timeout in seconds, 0 for none
    pub timeout_secs: u64,
    /// Client certificate (PEM identity)
    pub client_cert: Option<PathBuf>,
    /// Passphrase for the client certificate
    pub client_cert_passphrase: Option<String>,
    /// Extra raw header line, e.g. `Authorization: Basic ...`
    pub header: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            max_redirects: 0,
            timeout_secs: 5,
            client_cert: None,
            client_cert_passphrase: None,
            header: None,
        }
    }
}

impl HttpOptions {
    /// Split the raw header line into name and value.
    pub fn header_pair(&self) -> Option<(&str, &str)> {
        let line = self.header.as_deref()?;
        let (name, value) = line.split_once(':')?;
        Some((name.trim(), value.trim()))
    }
}

/// TLS verification policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub verify_peer: bool,
    pub verify_peer_name: bool,
    /// Local certificate presented to the server
    pub local_cert: Option<PathBuf>,
    /// Passphrase of the local certificate
    pub passphrase: Option<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify_peer: true,
            verify_peer_name: true,
            local_cert: None,
            passphrase: None,
        }
    }
}

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    #[serde(rename = "1.1")]
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    #[serde(rename = "1.2")]
    Soap12,
}

impl SoapVersion {
    /// Map the numeric selector used by `set_version` (1 or 2).
    pub fn from_number(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Soap11),
            2 => Some(Self::Soap12),
            _ => None,
        }
    }

    /// Content-Type for requests of this version.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Soap11 => "text/xml; charset=utf-8",
            Self::Soap12 => "application/soap+xml; charset=utf-8",
        }
    }
}

/// WSDL cache mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    None,
    /// File cache with TTL and entry limit
    FileTtl { ttl_secs: u64, max_entries: usize },
}

impl CacheMode {
    /// Whether WSDL documents go through the file cache.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// SOAP protocol options handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoapOptions {
    pub cache_mode: CacheMode,
    /// Accept compressed responses
    pub compression: bool,
    pub version: Option<SoapVersion>,
    pub user_agent: Option<String>,
    pub credentials: Option<Credentials>,
}

/// File configuration for the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WSDL URL
    pub wsdl: Option<String>,

    /// HTTP transport settings
    pub http: HttpConfig,

    /// TLS settings
    pub tls: TlsConfig,

    /// SOAP protocol settings
    pub soap: SoapConfig,

    /// WSDL cache settings
    pub cache: CacheConfig,
}

impl ClientConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds, 0 for none
    pub timeout_secs: u64,

    /// Maximum redirects to follow
    pub max_redirects: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = HttpOptions::default();
        Self {
            timeout_secs: defaults.timeout_secs,
            max_redirects: defaults.max_redirects,
        }
    }
}

/// TLS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Verify the peer certificate and name
    pub verify_peer: bool,

    /// Client certificate (PEM with private key)
    pub client_certificate: Option<PathBuf>,

    /// Client certificate passphrase
    pub passphrase: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify_peer: true,
            client_certificate: None,
            passphrase: None,
        }
    }
}

/// SOAP protocol settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapConfig {
    pub version: Option<SoapVersion>,

    /// Accept compressed responses
    pub compression: bool,

    pub user_agent: Option<String>,

    pub login: Option<String>,

    pub password: Option<String>,
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self {
            version: None,
            compression: true,
            user_agent: None,
            login: None,
            password: None,
        }
    }
}

/// WSDL cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Cache entry lifetime in seconds
    pub ttl_secs: u64,

    /// Entry limit hint for the engine
    pub max_entries: usize,

    /// Cache directory (platform temp dir if unset)
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: crate::cache::SOAP_CACHE_TTL,
            max_entries: crate::cache::SOAP_CACHE_LIMIT,
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let http = HttpOptions::default();
        assert_eq!(http.max_redirects, 0);
        assert_eq!(http.timeout_secs, 5);
        assert!(http.client_cert.is_none());

        let tls = TlsOptions::default();
        assert!(tls.verify_peer);
        assert!(tls.verify_peer_name);

        assert_eq!(SoapOptions::default().cache_mode, CacheMode::None);
    }

    #[test]
    fn test_header_pair() {
        let http = HttpOptions {
            header: Some("Authorization: Basic dTpw".to_string()),
            ..Default::default()
        };
        assert_eq!(http.header_pair(), Some(("Authorization", "Basic dTpw")));

        let http = HttpOptions {
            header: Some("garbage".to_string()),
            ..Default::default()
        };
        assert_eq!(http.header_pair(), None);
    }

    #[test]
    fn test_version_from_number() {
        assert_eq!(SoapVersion::from_number(1), Some(SoapVersion::Soap11));
        assert_eq!(SoapVersion::from_number(2), Some(SoapVersion::Soap12));
        assert_eq!(SoapVersion::from_number(3), None);
        assert_eq!(SoapVersion::from_number(0), None);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            login: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.wsdl.is_none());
        assert!(config.tls.verify_peer);
        assert!(config.soap.compression);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 31_104_000);
        assert_eq!(config.cache.max_entries, 100);
    }

    #[test]
    fn test_config_serialization() {
        let config = ClientConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = ClientConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.http.timeout_secs, config.http.timeout_secs);
        assert_eq!(parsed.cache.max_entries, config.cache.max_entries);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
wsdl: "https://example.org/service?wsdl"
http:
  timeout_secs: 30
  max_redirects: 2
tls:
  verify_peer: false
soap:
  version: "1.2"
  user_agent: billing-sync/1.0
  login: alice
  password: secret
cache:
  enabled: true
  ttl_secs: 3600
"#;
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.wsdl.as_deref(), Some("https://example.org/service?wsdl"));
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.max_redirects, 2);
        assert!(!config.tls.verify_peer);
        assert_eq!(config.soap.version, Some(SoapVersion::Soap12));
        assert!(config.soap.compression);
        assert_eq!(config.soap.login.as_deref(), Some("alice"));
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.max_entries, 100);
    }

    #[test]
    fn test_config_rejects_unknown_version() {
        let yaml = "soap:\n  version: \"3.0\"\n";
        assert!(ClientConfig::from_yaml_str(yaml).is_err());
    }
}

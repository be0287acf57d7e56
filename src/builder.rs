//! Fluent builder for SOAP clients.
//!
//! Setters validate eagerly and mutate in place. The terminal
//! [`ClientBuilder::build`] resolves the WSDL through the file cache (or the
//! network), writes it back to the cache and connects the engine to the
//! cached file.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{WsdlCache, WsdlCacheHints, SOAP_CACHE_LIMIT, SOAP_CACHE_TTL};
use crate::config::{
    CacheMode, ClientConfig, Credentials, HttpOptions, SoapOptions, SoapVersion, TlsOptions,
};
use crate::engine::{DefaultEngine, EngineOptions, SoapClient, SoapEngine};
use crate::error::{ClientError, Result};
use crate::transport::TransportContext;

/// Builder for a SOAP client bound to one WSDL source.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    wsdl_source: String,
    host: String,
    http_options: HttpOptions,
    tls_options: TlsOptions,
    soap_options: SoapOptions,
    /// Raw value given to `set_cache`/`enable_cache`, 0 when disabled
    cache_discriminator: i64,
    cache_dir: Option<PathBuf>,
}

impl ClientBuilder {
    /// Create a builder for `wsdl_source`, which must be an absolute URL
    /// with a host.
    pub fn new(wsdl_source: impl Into<String>, accept_compression: bool) -> Result<Self> {
        let wsdl_source = wsdl_source.into();
        let url = Url::parse(&wsdl_source).map_err(|e| {
            ClientError::InvalidArgument(format!("Bad wsdl url {:?}: {}", wsdl_source, e))
        })?;
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => {
                return Err(ClientError::InvalidArgument(format!(
                    "Bad wsdl url {:?}: missing host",
                    wsdl_source
                )))
            }
        };

        Ok(Self {
            wsdl_source,
            host,
            http_options: HttpOptions::default(),
            tls_options: TlsOptions::default(),
            soap_options: SoapOptions {
                compression: accept_compression,
                ..Default::default()
            },
            cache_discriminator: 0,
            cache_dir: None,
        })
    }

    /// Create a builder from file configuration, applying every section
    /// through the regular setters.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let wsdl = config
            .wsdl
            .as_deref()
            .ok_or_else(|| ClientError::Config("wsdl url is not set".to_string()))?;

        let mut builder = Self::new(wsdl, config.soap.compression)?;
        builder
            .with_timeout(config.http.timeout_secs)
            .with_max_redirects(config.http.max_redirects)
            .verify_peer(config.tls.verify_peer);

        if let Some(cert) = &config.tls.client_certificate {
            let passphrase = config.tls.passphrase.as_deref().unwrap_or("");
            builder.set_client_certificate(cert, passphrase, None)?;
        }
        if let Some(version) = config.soap.version {
            builder.with_version(version);
        }
        if let Some(agent) = &config.soap.user_agent {
            builder.set_user_agent(agent.as_str());
        }
        if config.soap.login.is_some() || config.soap.password.is_some() {
            builder.set_credentials(
                config.soap.login.as_deref().unwrap_or(""),
                config.soap.password.as_deref().unwrap_or(""),
            )?;
        }
        if config.cache.enabled {
            builder.enable_cache(config.cache.ttl_secs, config.cache.max_entries);
        }
        if let Some(dir) = &config.cache.dir {
            builder.with_cache_dir(dir);
        }

        Ok(builder)
    }

    pub fn wsdl_source(&self) -> &str {
        &self.wsdl_source
    }

    pub fn http_options(&self) -> &HttpOptions {
        &self.http_options
    }

    pub fn tls_options(&self) -> &TlsOptions {
        &self.tls_options
    }

    pub fn soap_options(&self) -> &SoapOptions {
        &self.soap_options
    }

    /// Set both peer and peer-name verification.
    pub fn verify_peer(&mut self, enabled: bool) -> &mut Self {
        self.tls_options.verify_peer = enabled;
        self.tls_options.verify_peer_name = enabled;
        self
    }

    /// Select the protocol version by number: 1 for SOAP 1.1, 2 for SOAP
    /// 1.2. Other values are ignored.
    pub fn set_version(&mut self, version: i64) -> &mut Self {
        if let Some(version) = SoapVersion::from_number(version) {
            self.soap_options.version = Some(version);
        }
        self
    }

    pub fn with_version(&mut self, version: SoapVersion) -> &mut Self {
        self.soap_options.version = Some(version);
        self
    }

    pub fn set_user_agent(&mut self, agent: impl Into<String>) -> &mut Self {
        self.soap_options.user_agent = Some(agent.into());
        self
    }

    /// Set Basic credentials for both the SOAP engine and the raw HTTP
    /// transport.
    pub fn set_credentials(&mut self, login: &str, password: &str) -> Result<&mut Self> {
        if login.is_empty() {
            return Err(ClientError::InvalidArgument(
                "Empty login passed to auth method".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(ClientError::InvalidArgument(
                "Empty password passed to auth method".to_string(),
            ));
        }

        self.soap_options.credentials = Some(Credentials {
            login: login.to_string(),
            password: password.to_string(),
        });
        self.http_options.header = Some(basic_auth_header(login, password));
        Ok(self)
    }

    /// Enable or disable the WSDL cache.
    ///
    /// Only whether `ttl` is zero matters, so negative values enable the
    /// cache too. An enabled cache always uses the
    /// 360 day TTL and the 100 entry limit. Use
    /// [`enable_cache`](Self::enable_cache) to pick the TTL.
    pub fn set_cache(&mut self, ttl: i64) -> &mut Self {
        if ttl == 0 {
            self.soap_options.cache_mode = CacheMode::None;
        } else {
            self.soap_options.cache_mode = CacheMode::FileTtl {
                ttl_secs: SOAP_CACHE_TTL,
                max_entries: SOAP_CACHE_LIMIT,
            };
        }
        self.cache_discriminator = ttl;
        self
    }

    /// Enable the WSDL cache with an explicit TTL and entry limit hint.
    /// A zero TTL disables caching.
    pub fn enable_cache(&mut self, ttl_secs: u64, max_entries: usize) -> &mut Self {
        if ttl_secs == 0 {
            self.soap_options.cache_mode = CacheMode::None;
            self.cache_discriminator = 0;
        } else {
            self.soap_options.cache_mode = CacheMode::FileTtl {
                ttl_secs,
                max_entries,
            };
            self.cache_discriminator = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        }
        self
    }

    /// Present a client certificate. `verify_peer`, when given, also
    /// updates the verification flags.
    pub fn set_client_certificate(
        &mut self,
        path: impl AsRef<Path>,
        passphrase: &str,
        verify_peer: Option<bool>,
    ) -> Result<&mut Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || !is_readable_file(path) {
            return Err(ClientError::InvalidArgument(format!(
                "Certificate is not readable: {}",
                path.display()
            )));
        }

        self.tls_options.local_cert = Some(path.to_path_buf());
        self.http_options.client_cert = Some(path.to_path_buf());

        if !passphrase.is_empty() {
            self.tls_options.passphrase = Some(passphrase.to_string());
            self.http_options.client_cert_passphrase = Some(passphrase.to_string());
        }

        if let Some(verify) = verify_peer {
            self.verify_peer(verify);
        }

        Ok(self)
    }

    /// Directory for cache files. Defaults to the platform temp directory.
    pub fn with_cache_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Request timeout in seconds. Zero disables the timeout.
    pub fn with_timeout(&mut self, timeout_secs: u64) -> &mut Self {
        self.http_options.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_redirects(&mut self, max_redirects: u32) -> &mut Self {
        self.http_options.max_redirects = max_redirects;
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Cache file location for this WSDL source.
    pub fn cache_path(&self) -> PathBuf {
        self.cache().path().to_path_buf()
    }

    pub fn cache_hints(&self) -> WsdlCacheHints {
        WsdlCacheHints::from_mode(&self.soap_options.cache_mode, self.cache_discriminator)
    }

    /// Transport context for the WSDL fetch and the engine.
    pub fn transport_context(&self) -> TransportContext {
        TransportContext::new(
            self.http_options.clone(),
            self.tls_options.clone(),
            self.cache_hints(),
        )
    }

    fn cache(&self) -> WsdlCache {
        WsdlCache::new(&self.cache_dir(), &self.host, &self.wsdl_source)
    }

    /// Build a client with the default engine.
    pub async fn build(&self) -> Result<SoapClient> {
        self.build_with(&DefaultEngine).await
    }

    /// Resolve the WSDL, persist it to the cache and connect `engine` to the
    /// cached file.
    pub async fn build_with<E: SoapEngine>(&self, engine: &E) -> Result<E::Handle> {
        let context = self.transport_context();
        let cache = self.cache();

        let cached = match self.soap_options.cache_mode {
            CacheMode::FileTtl { ttl_secs, .. } => cache.read_fresh(ttl_secs).map_err(|e| {
                warn!(path = %cache.path().display(), error = %e, "Failed to read WSDL cache");
                ClientError::FetchFailed(format!(
                    "cannot read cache file {}: {}",
                    cache.path().display(),
                    e
                ))
            })?,
            CacheMode::None => None,
        };

        let wsdl = match cached {
            Some(bytes) => {
                debug!(path = %cache.path().display(), bytes = bytes.len(), "WSDL cache hit");
                bytes
            }
            None => {
                debug!(
                    url = %self.wsdl_source,
                    cache_enabled = self.soap_options.cache_mode.is_enabled(),
                    "WSDL cache miss"
                );
                context.fetch_wsdl(&self.wsdl_source).await?
            }
        };

        if wsdl.is_empty() {
            warn!(url = %self.wsdl_source, "Empty WSDL document");
            return Err(ClientError::FetchFailed(format!(
                "empty WSDL document for {}",
                self.wsdl_source
            )));
        }

        cache.persist(wsdl).await.inspect_err(|e| {
            warn!(error = %e, "Failed to persist WSDL cache");
        })?;

        let options = EngineOptions {
            soap: self.soap_options.clone(),
            stream_context: context,
        };
        let handle = engine.connect(cache.path(), options)?;

        info!(
            url = %self.wsdl_source,
            cache_path = %cache.path().display(),
            "SOAP client built"
        );

        Ok(handle)
    }
}

/// `Authorization` header line for Basic credentials.
pub fn basic_auth_header(login: &str, password: &str) -> String {
    format!(
        "Authorization: Basic {}",
        STANDARD.encode(format!("{}:{}", login, password))
    )
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && std::fs::File::open(path).is_ok()
}

//! SOAP client builder for Zentinel
//!
//! Assembles HTTP transport options, TLS verification policy and SOAP
//! protocol options, resolves the WSDL document through a local file cache
//! and hands back a client handle from a SOAP engine.
//!
//! # Features
//!
//! - Fluent builder with eager validation (URL, credentials, certificate)
//! - Read-through WSDL file cache with locked write-back
//! - Timeout, redirect limit, TLS policy and client identity for the fetch
//! - HTTP Basic credentials for both the transport and the engine
//! - YAML file configuration
//!
//! # Example
//!
//! ```ignore
//! use zentinel_soap_client::ClientBuilder;
//!
//! let mut builder = ClientBuilder::new("https://example.org/stock?wsdl", true)?;
//! builder.set_credentials("alice", "secret")?.set_cache(1).set_version(2);
//!
//! let client = builder.build().await?;
//! for operation in client.operations() {
//!     println!("{}", operation);
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod transport;

pub use builder::ClientBuilder;
pub use config::{CacheMode, ClientConfig, SoapVersion};
pub use engine::{DefaultEngine, EngineOptions, SoapClient, SoapEngine};
pub use error::{ClientError, Result};
pub use transport::TransportContext;

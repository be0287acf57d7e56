//! SOAP engine seam and the default engine.
//!
//! The builder hands the cached WSDL path and the accumulated options to a
//! [`SoapEngine`]. The default engine inspects the WSDL with quick-xml for
//! endpoints and operation names and posts caller-built envelopes; it does
//! not build or parse envelopes itself.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{SoapOptions, SoapVersion};
use crate::error::{ClientError, Result};
use crate::transport::TransportContext;

/// WSDL binding namespace for SOAP 1.1 addresses.
pub const WSDL_SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
/// WSDL binding namespace for SOAP 1.2 addresses.
pub const WSDL_SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// Options passed to an engine when connecting.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub soap: SoapOptions,
    /// Transport settings for the engine's own requests
    pub stream_context: TransportContext,
}

/// Something that turns a local WSDL document into a client handle.
pub trait SoapEngine {
    type Handle;

    fn connect(&self, wsdl: &Path, options: EngineOptions) -> Result<Self::Handle>;
}

/// Service endpoint declared in the WSDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub location: String,
    pub version: SoapVersion,
}

/// Summary of a WSDL document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsdlInfo {
    pub target_namespace: Option<String>,
    pub service_name: Option<String>,
    /// Operation names from all port types, in document order
    pub operations: Vec<String>,
    pub endpoints: Vec<Endpoint>,
}

/// Inspect a WSDL 1.1 document.
pub fn inspect_wsdl(data: &[u8]) -> Result<WsdlInfo> {
    let xml_str = std::str::from_utf8(data)
        .map_err(|e| ClientError::Engine(format!("WSDL is not valid UTF-8: {}", e)))?;

    let mut reader = Reader::from_str(xml_str);
    reader.config_mut().trim_text(true);

    let mut info = WsdlInfo::default();
    let mut prefixes: HashMap<String, String> = HashMap::new();
    let mut seen_root = false;
    let mut in_port_type = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ClientError::Engine(format!("WSDL parse error: {}", e)))?;

        let (element, is_empty) = match event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"portType" {
                    in_port_type = false;
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let local_name = local_name_str(&element);

        if !seen_root {
            if local_name != "definitions" {
                return Err(ClientError::Engine(format!(
                    "expected WSDL definitions root, found <{}>",
                    local_name
                )));
            }
            seen_root = true;
            collect_namespace_prefixes(&element, &mut prefixes);
            info.target_namespace = attribute(&element, "targetNamespace");
        } else {
            match local_name.as_str() {
                "portType" if !is_empty => in_port_type = true,
                "operation" if in_port_type => {
                    if let Some(name) = attribute(&element, "name") {
                        if !info.operations.contains(&name) {
                            info.operations.push(name);
                        }
                    }
                }
                "service" if info.service_name.is_none() => {
                    info.service_name = attribute(&element, "name");
                }
                "address" => {
                    if let Some(location) = attribute(&element, "location") {
                        let version = address_version(&element, &prefixes);
                        info.endpoints.push(Endpoint { location, version });
                    }
                }
                _ => {}
            }
        }
    }

    if !seen_root {
        return Err(ClientError::Engine("WSDL document is empty".to_string()));
    }

    Ok(info)
}

/// Extract local name from element.
fn local_name_str(e: &BytesStart<'_>) -> String {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref()).unwrap_or("").to_string()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key.as_bytes())
        .and_then(|attr| std::str::from_utf8(&attr.value).ok().map(String::from))
}

/// Record `xmlns:prefix="uri"` declarations.
fn collect_namespace_prefixes(e: &BytesStart<'_>, prefixes: &mut HashMap<String, String>) {
    for attr in e.attributes().flatten() {
        let key = std::str::from_utf8(attr.key.as_ref()).unwrap_or("");
        if let Some(prefix) = key.strip_prefix("xmlns:") {
            if let Ok(value) = std::str::from_utf8(&attr.value) {
                prefixes.insert(prefix.to_string(), value.to_string());
            }
        }
    }
}

/// SOAP version of an `<address>` element, from its namespace.
fn address_version(e: &BytesStart<'_>, root_prefixes: &HashMap<String, String>) -> SoapVersion {
    let mut prefixes = root_prefixes.clone();
    collect_namespace_prefixes(e, &mut prefixes);

    let name_bytes = e.name();
    let name = std::str::from_utf8(name_bytes.as_ref()).unwrap_or("");
    let namespace = match name.split_once(':') {
        Some((prefix, _)) => prefixes.get(prefix).cloned(),
        None => attribute(e, "xmlns"),
    };

    match namespace.as_deref() {
        Some(WSDL_SOAP12_NS) => SoapVersion::Soap12,
        _ => SoapVersion::Soap11,
    }
}

/// Engine used by [`ClientBuilder::build`](crate::ClientBuilder::build).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEngine;

impl SoapEngine for DefaultEngine {
    type Handle = SoapClient;

    fn connect(&self, wsdl: &Path, options: EngineOptions) -> Result<SoapClient> {
        let data = std::fs::read(wsdl)?;
        let info = inspect_wsdl(&data)?;

        let mut builder = options.stream_context.client_builder()?.gzip(options.soap.compression);
        if let Some(agent) = &options.soap.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to create HTTP client: {}", e)))?;

        debug!(
            wsdl = %wsdl.display(),
            operations = info.operations.len(),
            endpoints = info.endpoints.len(),
            "SOAP engine connected"
        );

        Ok(SoapClient {
            wsdl_path: wsdl.to_path_buf(),
            info,
            options,
            http,
        })
    }
}

/// Response to a raw SOAP call.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: u16,
    pub body: String,
}

impl SoapResponse {
    /// SOAP faults are delivered with HTTP 500.
    pub fn is_fault(&self) -> bool {
        self.status == 500
    }
}

/// Client handle returned by the default engine.
#[derive(Debug, Clone)]
pub struct SoapClient {
    wsdl_path: PathBuf,
    info: WsdlInfo,
    options: EngineOptions,
    http: reqwest::Client,
}

impl SoapClient {
    /// Local WSDL file the client was built from.
    pub fn wsdl_path(&self) -> &Path {
        &self.wsdl_path
    }

    pub fn info(&self) -> &WsdlInfo {
        &self.info
    }

    pub fn operations(&self) -> &[String] {
        &self.info.operations
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Protocol version used for calls: configured, else the first
    /// endpoint's, else SOAP 1.1.
    pub fn version(&self) -> SoapVersion {
        self.options
            .soap
            .version
            .or_else(|| self.info.endpoints.first().map(|e| e.version))
            .unwrap_or(SoapVersion::Soap11)
    }

    /// Endpoint matching [`version`](Self::version), else the first one.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        let version = self.version();
        self.info
            .endpoints
            .iter()
            .find(|e| e.version == version)
            .or_else(|| self.info.endpoints.first())
    }

    /// Post a caller-built envelope for `action` to the service endpoint.
    pub async fn call(&self, action: &str, envelope: &str) -> Result<SoapResponse> {
        let endpoint = self
            .endpoint()
            .ok_or_else(|| ClientError::Engine("WSDL declares no service endpoint".to_string()))?;

        let version = self.version();
        let mut request = self.http.post(&endpoint.location).body(envelope.to_string());
        request = match version {
            SoapVersion::Soap11 => request
                .header(reqwest::header::CONTENT_TYPE, version.content_type())
                .header("SOAPAction", format!("\"{}\"", action)),
            SoapVersion::Soap12 => request.header(
                reqwest::header::CONTENT_TYPE,
                format!("{}; action=\"{}\"", version.content_type(), action),
            ),
        };
        if let Some(creds) = &self.options.soap.credentials {
            request = request.basic_auth(&creds.login, Some(&creds.password));
        }

        debug!(endpoint = %endpoint.location, action = %action, "Sending SOAP request");

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Engine(format!("SOAP request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Engine(format!("failed to read SOAP response: {}", e)))?;

        if !(200..300).contains(&status) && status != 500 {
            return Err(ClientError::Engine(format!(
                "SOAP endpoint returned status {}",
                status
            )));
        }

        Ok(SoapResponse { status, body })
    }
}

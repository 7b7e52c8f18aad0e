//! ICE Credential Provider.
//!
//! Mints STUN/TURN server descriptors on demand from an external
//! traversal service and normalizes vendor-specific field names (a
//! provider may answer with a singular `url` string instead of the
//! canonical `urls` array) into the shape the WebRTC stack expects.

use std::time::Duration;

use failure::Fail;
use serde::{Deserialize, Serialize};

use crate::conf::Ice as IceConf;

/// Canonical ICE server descriptor, as returned by `GET /ice` and as fed
/// into every admitted peer's `RTCConfiguration`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Vendor-idiosyncratic wire shape: some traversal services answer with
/// `url` (singular, string or array) rather than the canonical `urls`.
#[derive(Deserialize)]
struct RawIceServer {
    #[serde(default)]
    urls: Option<UrlsField>,
    #[serde(default)]
    url: Option<UrlsField>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    credential: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlsField {
    One(String),
    Many(Vec<String>),
}

impl From<UrlsField> for Vec<String> {
    fn from(f: UrlsField) -> Self {
        match f {
            UrlsField::One(s) => vec![s],
            UrlsField::Many(v) => v,
        }
    }
}

impl From<RawIceServer> for IceServer {
    fn from(raw: RawIceServer) -> Self {
        let urls = raw
            .urls
            .or(raw.url)
            .map(Vec::from)
            .unwrap_or_default();
        Self {
            urls,
            username: raw.username,
            credential: raw.credential,
        }
    }
}

#[derive(Debug, Fail)]
pub enum IceError {
    #[fail(display = "ICE traversal service request failed: {}", _0)]
    Request(String),

    #[fail(display = "ICE traversal service returned malformed JSON: {}", _0)]
    Malformed(String),
}

/// Default pair of public STUN servers used when no traversal service is
/// configured, matching `original_source/server.py`'s hardcoded
/// `ICE_SERVERS` literal.
fn default_ice_servers() -> Vec<IceServer> {
    vec![
        IceServer {
            urls: vec!["stun:stun.l.google.com:19302".to_owned()],
            username: None,
            credential: None,
        },
        IceServer {
            urls: vec!["stun:global.stun.twilio.com:3478".to_owned()],
            username: None,
            credential: None,
        },
    ]
}

/// Capability interface for fetching ICE server descriptors. Mirrors the
/// shape `medea-coturn-telnet-client` and similar external-collaborator
/// crates take in the teacher's workspace: a small async trait, so the
/// signalling layer never has to know whether credentials come from an
/// HTTP traversal service, a static config list, or a test double.
#[async_trait::async_trait]
pub trait IceCredentialProvider: Send + Sync {
    async fn fetch(&self) -> Result<Vec<IceServer>, IceError>;
}

/// HTTP-backed [`IceCredentialProvider`]. Caching policy is left to the
/// traversal service's own `Cache-Control`/TTL semantics; we refetch on
/// every call for simplicity, so every admission gets a freshly fetched
/// set of credentials rather than one cached for the process lifetime.
pub struct HttpIceCredentialProvider {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpIceCredentialProvider {
    #[must_use]
    pub fn new(conf: &IceConf) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(conf.fetch_timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: conf.traversal_service_url.clone(),
        }
    }

    #[must_use]
    pub fn with_timeout(url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url,
        }
    }
}

#[async_trait::async_trait]
impl IceCredentialProvider for HttpIceCredentialProvider {
    async fn fetch(&self) -> Result<Vec<IceServer>, IceError> {
        let url = match &self.url {
            Some(url) => url,
            None => return Ok(default_ice_servers()),
        };

        let raw: Vec<RawIceServer> = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IceError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| IceError::Malformed(e.to_string()))?;

        Ok(raw.into_iter().map(IceServer::from).collect())
    }
}

//! Transmission RPC client.
//!
//! Adds torrents to a Transmission daemon over its JSON RPC interface.
//! The daemon protects the RPC endpoint with a session id that must be echoed
//! in every request. A request without a valid session id is answered with
//! HTTP 409 carrying the current id, after which the request is sent again once.
//!
//! Documentation:
//! <https://github.com/transmission/transmission/blob/main/docs/rpc-spec.md>

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use colored::Colorize;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::torrent::TorrentSource;

/// RPC endpoint path on the daemon.
pub const RPC_PATH: &str = "/transmission/rpc";

/// Header carrying the session id.
pub const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Default timeout for RPC requests.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

const METHOD_TORRENT_ADD: &str = "torrent-add";

/// Session id negotiation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoToken,
    HasToken(String),
}

/// HTTP basic auth credentials for the RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Outcome of a successful `torrent-add` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddResult {
    /// Torrent was added. Contains the name reported by the daemon.
    Added { name: Option<String> },
    /// Torrent already exists in the daemon.
    Duplicate { name: Option<String> },
    /// Response arguments were empty.
    NoResponse,
    /// Response arguments did not contain a known result.
    Accepted,
}

/// RPC failures. All of these are fatal for the add.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Session id still rejected after retry (HTTP 409)")]
    ConflictExhausted,

    #[error("HTTP 409 response without a session id header")]
    MissingSessionId,

    #[error("HTTP {status}")]
    Http { status: StatusCode },

    #[error("Connection error: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Transmission error: {0}")]
    Daemon(String),

    #[error("Failed to read torrent file {}: {source}", path.display())]
    ReadTorrent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transmission RPC session.
#[derive(Debug)]
pub struct TransmissionClient {
    client: Client,
    url: String,
    credentials: Option<Credentials>,
    state: SessionState,
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, T> {
    method: &'a str,
    arguments: T,
}

/// Arguments for the `torrent-add` method.
#[derive(Debug, Default, Serialize)]
struct TorrentAddArguments {
    paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metainfo: Option<String>,
    #[serde(rename = "download-dir", skip_serializing_if = "Option::is_none")]
    download_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

impl Credentials {
    /// Create credentials if both the username and password are non-empty.
    #[must_use]
    pub fn from_parts(username: &str, password: &str) -> Option<Self> {
        if username.is_empty() || password.is_empty() {
            None
        } else {
            Some(Self {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
    }
}

impl TransmissionClient {
    /// Create a client for the daemon at `host:port`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(host: &str, port: u16, credentials: Option<Credentials>) -> Result<Self, RpcError> {
        Self::with_url(format!("http://{host}:{port}{RPC_PATH}"), credentials, DEFAULT_RPC_TIMEOUT)
    }

    /// Create a client for the given full RPC url.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_url(
        url: impl Into<String>,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RpcError::Connection)?;

        Ok(Self {
            client,
            url: url.into(),
            credentials,
            state: SessionState::NoToken,
            verbose: false,
        })
    }

    /// Print session negotiation details.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Add a torrent, optionally into the given download directory.
    ///
    /// Magnet links are sent as `filename`, torrent files as base64 encoded `metainfo`.
    /// The torrent is always added unpaused.
    ///
    /// # Errors
    /// Returns an error if the torrent file cannot be read or the RPC call fails.
    pub async fn add_torrent(
        &mut self,
        source: &TorrentSource,
        download_dir: Option<&str>,
    ) -> Result<AddResult, RpcError> {
        let mut arguments = TorrentAddArguments {
            paused: false,
            download_dir: download_dir.map(ToString::to_string),
            ..Default::default()
        };

        match source {
            TorrentSource::Magnet(uri) => arguments.filename = Some(uri.clone()),
            TorrentSource::FileReference(path) => arguments.metainfo = Some(read_metainfo(path).await?),
        }

        let response = self.call(METHOD_TORRENT_ADD, arguments).await?;
        classify_add_response(response)
    }

    /// Send an RPC method call, negotiating the session id if needed.
    async fn call<T: Serialize>(&mut self, method: &str, arguments: T) -> Result<RpcResponse, RpcError> {
        let body = serde_json::to_vec(&RpcRequest { method, arguments }).map_err(RpcError::Encode)?;

        let mut response = self.post(&body).await?;
        if response.status() == StatusCode::CONFLICT {
            self.capture_session_id(&response)?;
            response = self.post(&body).await?;
            if response.status() == StatusCode::CONFLICT {
                return Err(RpcError::ConflictExhausted);
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http { status });
        }

        let text = response.text().await.map_err(RpcError::Connection)?;
        serde_json::from_str(&text).map_err(|error| RpcError::Decode(error.to_string()))
    }

    /// Store the session id from a 409 response.
    fn capture_session_id(&mut self, response: &Response) -> Result<(), RpcError> {
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(RpcError::MissingSessionId)?;

        if self.verbose {
            println!("  {} {}", "Session id:".dimmed(), session_id);
        }
        self.state = SessionState::HasToken(session_id.to_string());
        Ok(())
    }

    async fn post(&self, body: &[u8]) -> Result<Response, RpcError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());

        if let SessionState::HasToken(ref session_id) = self.state {
            request = request.header(SESSION_ID_HEADER, session_id);
        }

        if let Some(ref credentials) = self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        request.send().await.map_err(RpcError::Connection)
    }
}

/// Read a torrent file and encode it as base64.
async fn read_metainfo(path: &Path) -> Result<String, RpcError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| RpcError::ReadTorrent {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BASE64.encode(bytes))
}

/// Map the `torrent-add` response to a result.
fn classify_add_response(response: RpcResponse) -> Result<AddResult, RpcError> {
    let arguments = response.arguments.unwrap_or_default();

    if let Some(torrent) = arguments.get("torrent-added") {
        return Ok(AddResult::Added {
            name: torrent_name(torrent),
        });
    }

    if let Some(torrent) = arguments.get("torrent-duplicate") {
        return Ok(AddResult::Duplicate {
            name: torrent_name(torrent),
        });
    }

    if let Some(result) = response.result
        && result != "success"
    {
        return Err(RpcError::Daemon(result));
    }

    if arguments.is_empty() {
        Ok(AddResult::NoResponse)
    } else {
        Ok(AddResult::Accepted)
    }
}

fn torrent_name(torrent: &Value) -> Option<String> {
    torrent.get("name").and_then(Value::as_str).map(ToString::to_string)
}

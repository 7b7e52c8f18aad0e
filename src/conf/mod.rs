//! Application configuration, assembled from a TOML file layered with
//! environment variables (`AVIARY_*`), in the shape a `config`-crate-based
//! media server conventionally loads it.

use std::time::Duration;

use failure::Fail;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Top-level configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Conf {
    pub server: Server,
    pub ice: Ice,
    pub log: Log,
    pub auth: Auth,
}

/// HTTP/WebSocket server settings.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    #[default = "0.0.0.0"]
    pub bind_ip: String,

    #[default(8080)]
    pub bind_port: u16,

    /// How long an admitted peer's connection may go without answering a
    /// protocol-level WebSocket ping before its session is torn down as
    /// if the transport had disconnected. Never applies before
    /// admission — a peer still waiting for admin approval has no
    /// server-side timeout.
    #[default(Duration::from_secs(15))]
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Interval at which WebSocket ping frames are sent to every
    /// connected peer.
    #[default(Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,

    /// Directory served verbatim at `GET /`; kept so the binary serves a
    /// client out of the box.
    #[default = "static"]
    pub static_files_dir: String,
}

impl Server {
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.bind_port)
    }
}

/// ICE Credential Provider settings.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Ice {
    /// URL of the external traversal service to fetch ICE server
    /// descriptors from. When unset, a default pair of public STUN
    /// servers is returned instead (matching `original_source`'s
    /// hardcoded `ICE_SERVERS`).
    pub traversal_service_url: Option<String>,

    #[default(Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

/// Logging settings.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Log {
    /// One of `trace`, `debug`, `info`, `warn`, `error`, `off`.
    #[default = "info"]
    pub level: String,

    /// Emit newline-delimited JSON instead of the human-readable terminal
    /// format. Production deployments behind a log collector want this;
    /// local development wants the terminal decorator.
    #[default(false)]
    pub json: bool,
}

/// JWT authentication settings.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Auth {
    /// HS256 signing secret used to verify the `role` claim of the
    /// `token` query parameter on `GET /ws/{room_id}`. Empty by default,
    /// which means every token fails validation and every peer without
    /// an explicit `AVIARY_AUTH__SECRET` is treated as a plain [`User`]
    /// (`original_source/server.py`'s fail-open behavior).
    ///
    /// [`User`]: aviary_client_api_proto::Role::User
    #[default = ""]
    pub secret: String,
}

/// Failed to load configuration from file or environment.
#[derive(Debug, Fail)]
#[fail(display = "failed to load configuration: {}", _0)]
pub struct ConfError(String);

impl Conf {
    /// Loads configuration, layering (in increasing priority):
    /// built-in defaults, an optional `config_path` TOML file, and
    /// `AVIARY_*`-prefixed environment variables.
    pub fn parse(config_path: Option<&str>) -> Result<Self, ConfError> {
        let mut cfg = config::Config::new();
        cfg.merge(config::Config::try_from(&Conf::default()).map_err(
            |e| ConfError(e.to_string()),
        )?)
        .map_err(|e| ConfError(e.to_string()))?;

        if let Some(path) = config_path {
            cfg.merge(config::File::with_name(path))
                .map_err(|e| ConfError(e.to_string()))?;
        }

        cfg.merge(config::Environment::with_prefix("AVIARY").separator("__"))
            .map_err(|e| ConfError(e.to_string()))?;

        cfg.try_into().map_err(|e| ConfError(e.to_string()))
    }
}

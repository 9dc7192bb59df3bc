// ── Runtime session configuration ──
//
// Describes *how* to reach a dashboard server. Never touches disk: the
// TUI builds a `SessionConfig` from the on-disk profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use pulseboard_api::endpoint::{DEFAULT_RECORDS_PATH, DEFAULT_STREAM_PATH};
use pulseboard_api::{ReconnectConfig, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::highlight::DEFAULT_HIGHLIGHT_TTL;
use crate::store::DEFAULT_FEED_CAPACITY;

/// Records shown per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// TLS verification strategy for the record listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Configuration for one dashboard session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Page origin, e.g. `https://dash.example.com`. The push-feed scheme
    /// is derived from it.
    pub origin: Url,
    pub stream_path: String,
    pub records_path: String,
    /// Sent as the `Cookie` header on both the listing and the upgrade.
    pub session_cookie: Option<SecretString>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub page_size: usize,
    pub feed_capacity: usize,
    pub highlight_ttl: Duration,
    /// Re-send `subscribe` after a reconnect while realtime is active.
    pub resubscribe_on_reconnect: bool,
    pub reconnect: ReconnectConfig,
}

impl SessionConfig {
    /// Defaults for everything except the origin.
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            stream_path: DEFAULT_STREAM_PATH.into(),
            records_path: DEFAULT_RECORDS_PATH.into(),
            session_cookie: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            highlight_ttl: DEFAULT_HIGHLIGHT_TTL,
            resubscribe_on_reconnect: true,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Transport settings shared by the listing client and the websocket.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
            session_cookie: self.session_cookie.clone(),
        }
    }
}

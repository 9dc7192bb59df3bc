//! Configuration for the pulseboard dashboard.
//!
//! TOML profiles, session-cookie resolution (env + plaintext), and
//! translation to `pulseboard_core::SessionConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulseboard_core::{DEFAULT_PAGE_SIZE, SessionConfig, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,

    /// How long an updated row stays highlighted, e.g. `"5s"`.
    #[serde(default = "default_highlight_ttl")]
    pub highlight_ttl: String,

    #[serde(default = "default_true")]
    pub resubscribe_on_reconnect: bool,

    /// Record fields shown as table columns, in order.
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            page_size: default_page_size(),
            feed_capacity: default_feed_capacity(),
            highlight_ttl: default_highlight_ttl(),
            resubscribe_on_reconnect: true,
            columns: default_columns(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_feed_capacity() -> usize {
    500
}
fn default_highlight_ttl() -> String {
    "5s".into()
}
fn default_true() -> bool {
    true
}
fn default_columns() -> Vec<String> {
    ["id", "instrument", "quantity", "initial_price"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// A named server profile. Unset fields fall back to [`Defaults`].
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Page origin (e.g., "https://dash.example.com").
    pub origin: String,

    /// Push-feed path. Defaults to `/data/stream/`.
    pub stream_path: Option<String>,

    /// Record listing path. Defaults to `/api/data/`.
    pub records_path: Option<String>,

    /// Session cookie (plaintext, e.g. "sessionid=abc") -- prefer env var.
    pub session_cookie: Option<String>,

    /// Environment variable name containing the session cookie.
    pub session_cookie_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,
    pub timeout: Option<u64>,
    pub page_size: Option<usize>,
    pub feed_capacity: Option<usize>,
    pub highlight_ttl: Option<String>,
    pub resubscribe_on_reconnect: Option<bool>,
    pub columns: Option<Vec<String>>,
}

impl Profile {
    /// Table columns for this profile.
    pub fn columns(&self, defaults: &Defaults) -> Vec<String> {
        self.columns
            .clone()
            .unwrap_or_else(|| defaults.columns.clone())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pulseboard", "pulseboard").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pulseboard");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file. A missing file yields defaults.
///
/// `PULSEBOARD_` variables override file values; `__` separates nested
/// keys (`PULSEBOARD_DEFAULTS__PAGE_SIZE=100`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PULSEBOARD_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Translation ─────────────────────────────────────────────────────

/// Resolve the session cookie: profile's env var first, then plaintext.
pub fn resolve_session_cookie(profile: &Profile) -> Option<SecretString> {
    if let Some(val) = profile
        .session_cookie_env
        .as_ref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Some(SecretString::from(val));
    }
    profile.session_cookie.clone().map(SecretString::from)
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
        field: "highlight_ttl".into(),
        reason: format!("'{raw}': {e}"),
    })
}

/// Build a `SessionConfig` from a profile and the global defaults.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let origin: url::Url = profile
        .origin
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "origin".into(),
            reason: format!("invalid URL: {}", profile.origin),
        })?;

    let mut config = SessionConfig::new(origin);

    if let Some(ref path) = profile.stream_path {
        config.stream_path.clone_from(path);
    }
    if let Some(ref path) = profile.records_path {
        config.records_path.clone_from(path);
    }
    config.session_cookie = resolve_session_cookie(profile);

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.page_size = profile.page_size.unwrap_or(defaults.page_size);
    config.feed_capacity = profile.feed_capacity.unwrap_or(defaults.feed_capacity);
    config.highlight_ttl = parse_ttl(
        profile
            .highlight_ttl
            .as_deref()
            .unwrap_or(&defaults.highlight_ttl),
    )?;
    config.resubscribe_on_reconnect = profile
        .resubscribe_on_reconnect
        .unwrap_or(defaults.resubscribe_on_reconnect);

    if config.page_size == 0 {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.defaults.highlight_ttl, "5s");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profile_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "prod"

[defaults]
page_size = 25

[profiles.prod]
origin = "https://dash.example.com"
highlight_ttl = "2s 500ms"
session_cookie = "sessionid=abc"
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "prod");

        let session = profile_to_session_config(profile, &cfg.defaults).unwrap();
        assert_eq!(session.origin.as_str(), "https://dash.example.com/");
        assert_eq!(session.page_size, 25);
        assert_eq!(session.highlight_ttl, Duration::from_millis(2_500));
        assert_eq!(session.stream_path, "/data/stream/");
        assert_eq!(session.tls, TlsVerification::SystemDefaults);
        assert_eq!(
            session.session_cookie.unwrap().expose_secret(),
            "sessionid=abc"
        );
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn bad_origin_is_rejected() {
        let profile = Profile {
            origin: "not a url".into(),
            ..Profile::default()
        };
        let err = profile_to_session_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "origin"));
    }

    #[test]
    fn bad_ttl_is_rejected() {
        let profile = Profile {
            origin: "http://localhost:8000".into(),
            highlight_ttl: Some("soon".into()),
            ..Profile::default()
        };
        let err = profile_to_session_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "highlight_ttl"));
    }

    #[test]
    fn insecure_selects_danger_mode() {
        let profile = Profile {
            origin: "https://localhost".into(),
            insecure: Some(true),
            ..Profile::default()
        };
        let session = profile_to_session_config(&profile, &Defaults::default()).unwrap();
        assert_eq!(session.tls, TlsVerification::DangerAcceptInvalid);
    }
}

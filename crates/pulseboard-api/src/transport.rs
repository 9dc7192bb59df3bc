// Shared transport configuration for building reqwest::Client instances.
//
// The record listing client and the websocket upgrade share TLS, timeout
// and session-cookie settings through this module.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed development servers).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    /// Session cookie sent verbatim as the `Cookie` header (e.g. `sessionid=abc`).
    pub session_cookie: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            session_cookie: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The session cookie, when present, is installed as a default header
    /// so every request carries it.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("pulseboard/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(value) = self.cookie_header()? {
            let mut headers = HeaderMap::new();
            headers.insert(COOKIE, value);
            builder = builder.default_headers(headers);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// The session cookie as a sensitive header value, if configured.
    pub fn cookie_header(&self) -> Result<Option<HeaderValue>, Error> {
        let Some(cookie) = self.session_cookie.as_ref() else {
            return Ok(None);
        };
        let mut value = HeaderValue::from_str(cookie.expose_secret())
            .map_err(|e| Error::InvalidHeader(format!("session cookie: {e}")))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    /// Attach a session cookie.
    pub fn with_session_cookie(mut self, cookie: SecretString) -> Self {
        self.session_cookie = Some(cookie);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_is_absent_by_default() {
        let config = TransportConfig::default();
        assert!(config.cookie_header().unwrap().is_none());
    }

    #[test]
    fn cookie_header_is_marked_sensitive() {
        let config = TransportConfig::default()
            .with_session_cookie(SecretString::from("sessionid=abc123".to_string()));
        let value = config.cookie_header().unwrap().unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "sessionid=abc123");
    }

    #[test]
    fn cookie_with_newline_is_rejected() {
        let config = TransportConfig::default()
            .with_session_cookie(SecretString::from("bad\nvalue".to_string()));
        assert!(config.cookie_header().is_err());
    }
}

// Endpoint derivation from the dashboard origin.
//
// The push feed lives on the same host as the record listing; only the
// scheme changes. A secure origin always yields a secure websocket.

use url::Url;

use crate::error::Error;

/// Default path of the push-feed websocket.
pub const DEFAULT_STREAM_PATH: &str = "/data/stream/";

/// Default path of the record listing endpoint.
pub const DEFAULT_RECORDS_PATH: &str = "/api/data/";

/// Derive the websocket URL for `path` on the host of `origin`.
///
/// `https` maps to `wss` and `http` maps to `ws`. Host and port are kept;
/// any path, query or fragment on the origin is replaced.
pub fn stream_url(origin: &Url, path: &str) -> Result<Url, Error> {
    let scheme = match origin.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(Error::UnsupportedScheme {
                scheme: other.to_owned(),
            });
        }
    };

    let mut url = rooted(origin, path);
    url.set_scheme(scheme).map_err(|()| Error::UnsupportedScheme {
        scheme: origin.scheme().to_owned(),
    })?;
    Ok(url)
}

/// Derive the record listing URL for `path` on `origin`.
pub fn records_url(origin: &Url, path: &str) -> Result<Url, Error> {
    match origin.scheme() {
        "https" | "http" => Ok(rooted(origin, path)),
        other => Err(Error::UnsupportedScheme {
            scheme: other.to_owned(),
        }),
    }
}

fn rooted(origin: &Url, path: &str) -> Url {
    let mut url = origin.clone();
    if path.starts_with('/') {
        url.set_path(path);
    } else {
        url.set_path(&format!("/{path}"));
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}

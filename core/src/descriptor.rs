//! Connection string parsing.
//!
//! A connection string looks like
//! `https://edge-config.vercel.com/ecfg-1?token=token-1[&version=1]`. It is
//! split once into a [`ConnectionDescriptor`]; the token is moved out of the
//! URL so request URLs built from the descriptor never carry it.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::EdgeConfigError;

/// API version sent with every request when the connection string names none.
pub const DEFAULT_VERSION: &str = "1";

/// Parsed, immutable form of a connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    base: Url,
    id: String,
    version: String,
    token: String,
}

impl ConnectionDescriptor {
    /// Parse a connection string, failing with
    /// [`EdgeConfigError::NoConnectionString`] when it is absent, empty, not
    /// an http(s) URL with a host, has no store id segment, or has no
    /// non-empty `token` parameter.
    pub fn parse(connection_string: Option<&str>) -> Result<Self, EdgeConfigError> {
        let raw = connection_string
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(EdgeConfigError::NoConnectionString)?;

        let url = Url::parse(raw).map_err(|_| EdgeConfigError::NoConnectionString)?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(EdgeConfigError::NoConnectionString);
        }

        let mut token = None;
        let mut version = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "token" => token = Some(value.into_owned()),
                "version" => version = Some(value.into_owned()),
                _ => {}
            }
        }
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(EdgeConfigError::NoConnectionString)?;
        let version = version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let id = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .ok_or(EdgeConfigError::NoConnectionString)?
            .to_string();

        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);
        let path = base.path().trim_end_matches('/').to_string();
        base.set_path(&path);

        Ok(Self {
            base,
            id,
            version,
            token,
        })
    }

    /// Scheme, host and store path, without token or trailing slash.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `{base_url}/{segments...}?version={version}`, each segment
    /// percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs with a host always accept path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut().append_pair("version", &self.version);
        url
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = EdgeConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("base_url", &self.base_url())
            .field("id", &self.id)
            .field("version", &self.version)
            .field("token", &"<redacted>")
            .finish()
    }
}

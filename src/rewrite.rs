//! Origin URL to proxy URL rewriting.
//!
//! Two modes are supported:
//! - **Plain**: the origin path is replaced by
//!   `/<token>/<user>/<password>/<index>/<basename>`. The track index is the
//!   lookup key for the track route, so no per-track table is kept.
//! - **Xtream**: the origin path is kept and the origin credentials embedded
//!   in it are swapped for the proxy-facing ones. Matching is done per
//!   decoded path segment, so credentials are found however the origin
//!   chose to encode them.

use crate::config::Config;
use crate::error::RewriteError;
use url::Url;

/// Anti-collision path segment used when `CUSTOM_ID` is not set.
pub const DEFAULT_ANTI_COLLISION_TOKEN: &str = "a6d7e846";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewriteMode {
    Plain,
    Xtream,
}

/// Rewrites origin URIs into proxy-facing URIs.
///
/// Every value that ends up in a rewritten URL is resolved once in
/// [`UrlRewriter::new`] and stays constant afterwards.
#[derive(Clone, Debug)]
pub struct UrlRewriter {
    scheme: &'static str,
    hostname: String,
    advertised_port: u16,
    endpoint_prefix: String,
    anti_collision_token: String,
    /// Escaped proxy-facing credentials
    user: String,
    password: String,
    /// Raw origin-facing credentials, compared against decoded segments
    xtream_user: String,
    xtream_password: String,
}

impl UrlRewriter {
    pub fn new(config: &Config) -> Self {
        Self {
            scheme: if config.https { "https" } else { "http" },
            hostname: config.hostname.clone(),
            advertised_port: config.advertised_port,
            endpoint_prefix: endpoint_prefix(&config.custom_endpoint),
            anti_collision_token: anti_collision_token(&config.custom_id),
            user: path_escape(&config.user),
            password: path_escape(&config.password),
            xtream_user: config.xtream_user.clone(),
            xtream_password: config.xtream_password.clone(),
        }
    }

    /// Path segment placed in front of every plain-mode track URL.
    pub fn anti_collision_token(&self) -> &str {
        &self.anti_collision_token
    }

    /// `""` or `/<custom endpoint>`.
    pub fn endpoint_prefix(&self) -> &str {
        &self.endpoint_prefix
    }

    pub fn rewrite(
        &self,
        origin_uri: &str,
        track_index: usize,
        mode: RewriteMode,
    ) -> Result<String, RewriteError> {
        let origin = Url::parse(origin_uri).map_err(|source| RewriteError::MalformedUri {
            uri: origin_uri.to_string(),
            source,
        })?;

        // `Url::path` is already percent-encoded
        let uri_path = match mode {
            RewriteMode::Xtream => match origin.path_segments() {
                Some(segments) => segments.fold(String::new(), |mut path, segment| {
                    path.push('/');
                    path.push_str(self.substitute_credential(segment));
                    path
                }),
                None => origin.path().to_string(),
            },
            RewriteMode::Plain => {
                let mut path = format!(
                    "/{}/{}/{}/{}",
                    self.anti_collision_token, self.user, self.password, track_index
                );
                let base = basename(origin.path());
                if !base.is_empty() {
                    path.push('/');
                    path.push_str(base);
                }
                path
            }
        };

        let composed = format!(
            "{}://{}{}:{}{}{}",
            self.scheme,
            userinfo(&origin),
            self.hostname,
            self.advertised_port,
            self.endpoint_prefix,
            uri_path
        );

        Url::parse(&composed).map_err(|source| RewriteError::ComposeFailure {
            uri: composed.clone(),
            source,
        })?;

        Ok(composed)
    }

    /// Swap an origin credential segment for its proxy-facing counterpart.
    ///
    /// Segments that match neither credential are returned in their original
    /// encoding.
    fn substitute_credential<'a>(&'a self, segment: &'a str) -> &'a str {
        let decoded = match urlencoding::decode(segment) {
            Ok(decoded) => decoded,
            Err(_) => return segment,
        };
        if !self.xtream_user.is_empty() && decoded == self.xtream_user {
            self.user.as_str()
        } else if !self.xtream_password.is_empty() && decoded == self.xtream_password {
            self.password.as_str()
        } else {
            segment
        }
    }
}

/// Escape a value for use as a single URL path segment.
pub fn path_escape(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn endpoint_prefix(custom_endpoint: &str) -> String {
    let trimmed = custom_endpoint.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn anti_collision_token(custom_id: &str) -> String {
    match custom_id.trim_matches('/') {
        "" => DEFAULT_ANTI_COLLISION_TOKEN.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Last non-empty segment of a URL path.
fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Origin userinfo as `user[:password]@`, or empty.
fn userinfo(url: &Url) -> String {
    match (url.username(), url.password()) {
        ("", None) => String::new(),
        (user, None) => format!("{}@", user),
        (user, Some(password)) => format!("{}:{}@", user, password),
    }
}

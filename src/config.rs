use crate::error::ProxyError;
use std::env;
use std::path::PathBuf;

/// Default name of the proxied M3U file as served to clients.
pub const DEFAULT_M3U_FILE_NAME: &str = "iptv.m3u";

/// Default on-disk directory for cached HLS segments.
pub const DEFAULT_DOWNLOAD_DIR: &str = "hlsdownloads";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Port the HTTP listener binds to
    pub port: u16,
    /// Port written into rewritten URLs (differs from `port` behind a NAT or reverse proxy)
    pub advertised_port: u16,
    /// Hostname written into rewritten URLs
    pub hostname: String,
    /// Advertise `https` instead of `http` in rewritten URLs
    pub https: bool,
    pub is_dev: bool,
    /// Proxy-facing credentials
    pub user: String,
    pub password: String,
    /// Origin-facing Xtream credentials
    pub xtream_user: String,
    pub xtream_password: String,
    /// Xtream server base URL; Xtream routes are disabled when empty
    pub xtream_base_url: String,
    /// Remote playlist address (URL or local path); empty means no M3U playlist
    pub m3u_url: String,
    /// Route under which the proxied M3U file is served
    pub m3u_file_name: String,
    /// Optional path segment every route and rewritten URL is nested under
    pub custom_endpoint: String,
    /// Optional replacement for the default anti-collision token
    pub custom_id: String,
    /// Where the proxied M3U file is written at startup
    pub proxied_m3u_path: PathBuf,
    /// Cache directory for downloaded HLS segments
    pub download_dir: PathBuf,
    /// Upper bound on concurrent segment downloads per playlist (0 = unbounded)
    pub max_concurrent_downloads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            advertised_port: 8080,
            hostname: "localhost".to_string(),
            https: false,
            is_dev: true,
            user: "usertest".to_string(),
            password: "passwordtest".to_string(),
            xtream_user: String::new(),
            xtream_password: String::new(),
            xtream_base_url: String::new(),
            m3u_url: String::new(),
            m3u_file_name: DEFAULT_M3U_FILE_NAME.to_string(),
            custom_endpoint: String::new(),
            custom_id: String::new(),
            proxied_m3u_path: default_proxied_m3u_path(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            max_concurrent_downloads: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode `PROXY_HOSTNAME` defaults to localhost. In PROD mode it is required.
    pub fn from_env() -> Result<Self, ProxyError> {
        let defaults = Config::default();

        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port: u16 = parse_var("PORT", defaults.port)?;

        // Advertised port follows the listen port unless set explicitly
        let advertised_port: u16 = parse_var("ADVERTISED_PORT", port)?;

        let hostname = if is_dev {
            env::var("PROXY_HOSTNAME").unwrap_or(defaults.hostname)
        } else {
            env::var("PROXY_HOSTNAME").map_err(|_| {
                ProxyError::Config("PROXY_HOSTNAME is required in production".into())
            })?
        };

        let https = parse_var("HTTPS", false)?;

        let max_concurrent_downloads = parse_var("MAX_CONCURRENT_DOWNLOADS", 0)?;

        let proxied_m3u_path = env::var("PROXIED_M3U_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.proxied_m3u_path);

        let download_dir = env::var("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.download_dir);

        Ok(Config {
            port,
            advertised_port,
            hostname,
            https,
            is_dev,
            user: env::var("PROXY_USER").unwrap_or(defaults.user),
            password: env::var("PROXY_PASSWORD").unwrap_or(defaults.password),
            xtream_user: env::var("XTREAM_USER").unwrap_or_default(),
            xtream_password: env::var("XTREAM_PASSWORD").unwrap_or_default(),
            xtream_base_url: env::var("XTREAM_BASE_URL").unwrap_or_default(),
            m3u_url: env::var("M3U_URL").unwrap_or_default(),
            m3u_file_name: env::var("M3U_FILE_NAME").unwrap_or(defaults.m3u_file_name),
            custom_endpoint: env::var("CUSTOM_ENDPOINT").unwrap_or_default(),
            custom_id: env::var("CUSTOM_ID").unwrap_or_default(),
            proxied_m3u_path,
            download_dir,
            max_concurrent_downloads,
        })
    }

    pub fn xtream_enabled(&self) -> bool {
        !self.xtream_base_url.is_empty()
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, ProxyError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ProxyError::Config(format!("invalid {}={:?}: {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}

fn default_proxied_m3u_path() -> PathBuf {
    env::temp_dir().join(format!("{}.iptv-proxy.m3u", uuid::Uuid::new_v4()))
}

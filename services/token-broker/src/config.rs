//! Configuration types and loading
//!
//! Config precedence: CLI `--config` > CONFIG_PATH env > default path (the
//! default is only loaded when the file exists). Environment variables
//! overlay the file: PORT, APP_ENV, WXO_API_KEY, WXO_INSTANCE_URL. The API
//! key is never stored in the TOML directly to avoid leaking secrets — it
//! comes from the WXO_API_KEY env var or an api_key_file path.
//!
//! A missing API key or instance URL is not a load error: both are
//! validated per request by the broker so the operator gets an actionable
//! HTTP error instead of a crash loop.

use common::Secret;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Default config file path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "wxo-token-broker.toml";

/// Root configuration, constructed once at startup and shared with every
/// handler. Never re-read from ambient process state inside a request.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub wxo: WxoConfig,
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default)]
    pub mode: Mode,
    /// HTML document served at `/`, resolved against the working directory
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
}

/// Watson Orchestrate connection settings
#[derive(Debug, Default, Deserialize)]
pub struct WxoConfig {
    #[serde(skip)]
    pub api_key: Option<Secret<String>>,
    /// Path to a file containing the API key (alternative to WXO_API_KEY)
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
    pub instance_url: Option<String>,
}

/// Deployment mode. Development unlocks the config-check probe and error
/// detail in internal-error responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    /// Anything other than the literal `development` is production.
    pub fn from_env_value(value: &str) -> Self {
        if value == "development" {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000)
}

fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            mode: Mode::default(),
            index_file: default_index_file(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then overlay
    /// environment variables.
    ///
    /// API key resolution order:
    /// 1. WXO_API_KEY env var
    /// 2. api_key_file path from config
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str::<Config>(&contents)?
            }
            None => Config::default(),
        };

        if let Ok(port) = std::env::var("PORT") {
            let parsed: u16 = port.trim().parse().map_err(|_| {
                common::Error::Config(format!("PORT is not a valid port number: {port}"))
            })?;
            config.server.listen_addr.set_port(parsed);
        }

        if let Ok(mode) = std::env::var("APP_ENV") {
            config.server.mode = Mode::from_env_value(mode.trim());
        }

        if let Ok(key) = std::env::var("WXO_API_KEY") {
            config.wxo.api_key = Some(Secret::new(key));
        } else if let Some(ref key_file) = config.wxo.api_key_file {
            let key = std::fs::read_to_string(key_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read api_key_file {}: {e}",
                    key_file.display()
                ))
            })?;
            let key = key.trim().to_owned();
            if !key.is_empty() {
                config.wxo.api_key = Some(Secret::new(key));
            }
        }

        if let Ok(url) = std::env::var("WXO_INSTANCE_URL") {
            config.wxo.instance_url = Some(url);
        }

        Ok(config)
    }

    /// Resolve the config file path from CLI arg or CONFIG_PATH env var.
    /// Returns None when neither is given and the default file is absent.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        default.exists().then_some(default)
    }

    pub fn has_api_key(&self) -> bool {
        self.wxo
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose().is_empty())
    }

    /// Length of the configured key, for the config-check probe. The value
    /// itself never leaves the process.
    pub fn api_key_len(&self) -> usize {
        self.wxo.api_key.as_ref().map_or(0, |key| key.expose().len())
    }

    pub fn has_instance_url(&self) -> bool {
        self.wxo
            .instance_url
            .as_deref()
            .is_some_and(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables,
    /// preventing data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const WXO_ENV_VARS: &[&str] = &["PORT", "APP_ENV", "WXO_API_KEY", "WXO_INSTANCE_URL"];

    /// SAFETY: callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn clear_env() {
        for key in WXO_ENV_VARS {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn defaults_when_no_file_and_no_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let config = Config::load(None).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.server.mode, Mode::Production);
        assert_eq!(config.server.index_file, PathBuf::from("index.html"));
        assert!(config.wxo.api_key.is_none());
        assert!(config.wxo.instance_url.is_none());
    }

    #[test]
    fn env_vars_overlay_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            set_env("PORT", "8099");
            set_env("APP_ENV", "development");
            set_env("WXO_API_KEY", "env-key");
            set_env("WXO_INSTANCE_URL", "https://wxo.example/instances/i1");
        }

        let config = Config::load(None).unwrap();
        unsafe { clear_env() };

        assert_eq!(config.server.listen_addr.port(), 8099);
        assert_eq!(config.server.mode, Mode::Development);
        assert_eq!(config.wxo.api_key.unwrap().expose(), "env-key");
        assert_eq!(
            config.wxo.instance_url.as_deref(),
            Some("https://wxo.example/instances/i1")
        );
    }

    #[test]
    fn invalid_port_is_a_load_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            set_env("PORT", "not-a-port");
        }

        let err = Config::load(None).unwrap_err();
        unsafe { clear_env() };

        assert!(
            err.to_string().contains("PORT"),
            "error should name the variable, got: {err}"
        );
    }

    #[test]
    fn non_development_app_env_means_production() {
        assert_eq!(Mode::from_env_value("development"), Mode::Development);
        assert_eq!(Mode::from_env_value("dev"), Mode::Production);
        assert_eq!(Mode::from_env_value("staging"), Mode::Production);
        assert_eq!(Mode::from_env_value(""), Mode::Production);
    }

    #[test]
    fn file_values_parse_and_env_key_wins_over_key_file() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(key_file, "file-key").unwrap();

        let mut config_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            config_file,
            r#"
[server]
listen_addr = "127.0.0.1:4000"
mode = "development"

[wxo]
instance_url = "https://wxo.example/instances/i2"
api_key_file = "{}"
"#,
            key_file.path().display()
        )
        .unwrap();

        unsafe {
            clear_env();
            set_env("WXO_API_KEY", "env-key");
        }
        let config = Config::load(Some(config_file.path())).unwrap();
        unsafe { clear_env() };

        assert_eq!(config.server.listen_addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.server.mode, Mode::Development);
        assert_eq!(
            config.wxo.instance_url.as_deref(),
            Some("https://wxo.example/instances/i2")
        );
        assert_eq!(config.wxo.api_key.unwrap().expose(), "env-key");
    }

    #[test]
    fn api_key_file_is_read_and_trimmed() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(key_file, "  file-key  ").unwrap();

        let mut config_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            config_file,
            r#"
[wxo]
api_key_file = "{}"
"#,
            key_file.path().display()
        )
        .unwrap();

        unsafe { clear_env() };
        let config = Config::load(Some(config_file.path())).unwrap();

        assert_eq!(config.wxo.api_key.unwrap().expose(), "file-key");
    }

    #[test]
    fn explicitly_requested_missing_file_is_an_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe { clear_env() };

        let err = Config::load(Some(Path::new("/nonexistent/broker.toml"))).unwrap_err();
        assert!(matches!(err, common::Error::Io(_)), "got: {err}");
    }

    #[test]
    fn presence_helpers_treat_empty_as_absent() {
        let mut config = Config::default();
        assert!(!config.has_api_key());
        assert!(!config.has_instance_url());
        assert_eq!(config.api_key_len(), 0);

        config.wxo.api_key = Some(Secret::new(String::new()));
        config.wxo.instance_url = Some(String::new());
        assert!(!config.has_api_key());
        assert!(!config.has_instance_url());

        config.wxo.api_key = Some(Secret::new("1234567890".into()));
        config.wxo.instance_url = Some("https://wxo.example".into());
        assert!(config.has_api_key());
        assert_eq!(config.api_key_len(), 10);
        assert!(config.has_instance_url());
    }

    #[test]
    fn resolve_path_prefers_cli() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            set_env("CONFIG_PATH", "/tmp/from-env.toml");
        }
        let path = Config::resolve_path(Some("/tmp/from-cli.toml"));
        unsafe { std::env::remove_var("CONFIG_PATH") };
        assert_eq!(path, Some(PathBuf::from("/tmp/from-cli.toml")));
    }

    #[test]
    fn resolve_path_none_when_default_absent() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_env();
            std::env::remove_var("CONFIG_PATH");
        }
        assert_eq!(Config::resolve_path(None), None);
    }
}

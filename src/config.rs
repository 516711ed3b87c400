//! Startup configuration: environment-driven, validated before the server
//! starts, and passed explicitly into the components that need it. The
//! inference credential lives here and nowhere else.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Foliar";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Vision model queried when `FOLIAR_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Loopback only; this is a single-user tool, not a network service.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8420";

pub fn default_log_filter() -> String {
    "foliar=info,tower_http=warn".into()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("FOLIAR_API_KEY is not set — provide an API key for the inference endpoint")]
    MissingApiKey,

    #[error("FOLIAR_ADDR is not a valid socket address: {0}")]
    InvalidBindAddr(String),

    #[error("Cannot determine home directory")]
    NoHomeDir,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Credential for the vision-language inference endpoint.
    pub api_key: String,
    /// Named model version sent with every inference request.
    pub model: String,
    /// Root of on-disk state (images + feedback log live beneath it).
    pub data_dir: PathBuf,
    /// Address the form server binds to.
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("FOLIAR_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let model =
            std::env::var("FOLIAR_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let data_dir = match std::env::var("FOLIAR_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_data_dir()?,
        };

        let addr_str =
            std::env::var("FOLIAR_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = addr_str
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(addr_str))?;

        Ok(Self {
            api_key,
            model,
            data_dir,
            bind_addr,
        })
    }

    /// Directory holding acquired and normalized leaf images.
    pub fn content_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Directory holding the feedback log.
    pub fn feedback_dir(&self) -> PathBuf {
        self.data_dir.join("feedback")
    }

    /// The append-only feedback CSV file.
    pub fn feedback_path(&self) -> PathBuf {
        self.feedback_dir().join("feedback_data.csv")
    }

    /// Create the content and feedback directories if absent.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.content_dir())?;
        std::fs::create_dir_all(self.feedback_dir())?;
        Ok(())
    }
}

/// ~/Foliar/ on all platforms (user-visible, easy to find and back up).
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

use std::path::PathBuf;

/// Spotify capabilities requested at login, space-delimited as the
/// authorize endpoint expects.
pub const SCOPE: &str =
    "user-top-read user-read-recently-played user-read-private user-read-email";

const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const DEFAULT_API_URL: &str = "https://api.spotify.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SSTAT_CLIENT_ID is not set")]
    MissingClientId,

    #[error("SSTAT_REDIRECT_URI is not set")]
    MissingRedirectUri,

    #[error("SSTAT_TOKEN_STORE must be \"memory\" or \"file\", got {0:?}")]
    UnknownStoreBackend(String),

    #[error("could not determine a config directory for the file token store")]
    NoConfigDir,
}

/// Which backing the token store uses. Picked once at startup; nothing
/// downstream ever branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Spotify application client id.
    pub client_id: String,
    /// Redirect URI registered with the Spotify application.
    pub redirect_uri: String,
    /// Base URL of the accounts service (authorize + token endpoints).
    pub accounts_url: String,
    /// Base URL of the resource API (identity endpoint).
    pub api_url: String,
    pub store_backend: StoreBackend,
}

impl Config {
    /// Load configuration from the environment. Missing client id or
    /// redirect URI is fatal; the server cannot start a login flow
    /// without them.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id =
            std::env::var("SSTAT_CLIENT_ID").map_err(|_| ConfigError::MissingClientId)?;
        let redirect_uri =
            std::env::var("SSTAT_REDIRECT_URI").map_err(|_| ConfigError::MissingRedirectUri)?;

        let accounts_url = std::env::var("SSTAT_ACCOUNTS_URL")
            .unwrap_or_else(|_| DEFAULT_ACCOUNTS_URL.to_string());
        let api_url =
            std::env::var("SSTAT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let store_backend = match std::env::var("SSTAT_TOKEN_STORE").as_deref() {
            Err(_) | Ok("memory") => StoreBackend::Memory,
            Ok("file") => StoreBackend::File(default_token_dir()?),
            Ok(other) => return Err(ConfigError::UnknownStoreBackend(other.to_string())),
        };

        Ok(Config {
            client_id,
            redirect_uri,
            accounts_url,
            api_url,
            store_backend,
        })
    }
}

/// Default directory for the durable token store: ~/.config/sstat/tokens
fn default_token_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("sstat").join("tokens"))
        .ok_or(ConfigError::NoConfigDir)
}

use std::path::PathBuf;

use color_eyre::eyre::{Context, OptionExt, Result, eyre};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Path to the sqlite database file
    database: String,
    #[serde(default)]
    spotify: Option<SpotifyConfig>,
    #[serde(default)]
    server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI registered with the Spotify application, used by
    /// `account link` to exchange the authorization code.
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Shared secret the scheduler must present to trigger a rescue run
    pub rescue_secret: String,
}

const DEFAULT_CONFIG: &str = r#"# playlist-rescuer configuration
database = "~/.local/share/playlist-rescuer/rescuer.db"

[spotify]
client_id = ""
client_secret = ""
redirect_uri = "http://localhost:3000/callback"

[server]
rescue_secret = ""
"#;

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("playlist-rescuer").join("config.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or_eyre("Config file not found")?;

        Self::from_file(&config_path)
    }

    /// Write a default config file if none exists, returning its path
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::config_path().ok_or_eyre("No config directory available")?;
        if config_path.exists() {
            return Err(eyre!(
                "Config file already exists: {}",
                config_path.display()
            ));
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }
        std::fs::write(&config_path, DEFAULT_CONFIG).context(format!(
            "Failed to write config file: {}",
            config_path.display()
        ))?;
        Ok(config_path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if path.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&path[2..]);
            }
        }
        PathBuf::from(path)
    }

    /// Get expanded database path
    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }

    /// Get Spotify application credentials, falling back to the environment
    pub fn spotify_config(&self) -> Result<SpotifyConfig> {
        if let Some(ref spotify) = self.spotify {
            if !spotify.client_id.is_empty() && !spotify.client_secret.is_empty() {
                return Ok(spotify.clone());
            }
        }

        // Try environment variables as fallback
        let client_id = std::env::var("SPOTIFY_CLIENT_ID")
            .context("Spotify client id not configured (config [spotify] or SPOTIFY_CLIENT_ID)")?;
        let client_secret = std::env::var("SPOTIFY_CLIENT_SECRET").context(
            "Spotify client secret not configured (config [spotify] or SPOTIFY_CLIENT_SECRET)",
        )?;
        let redirect_uri = self
            .spotify
            .as_ref()
            .map(|s| s.redirect_uri.clone())
            .or_else(|| std::env::var("SPOTIFY_REDIRECT_URI").ok())
            .unwrap_or_else(|| "http://localhost:3000/callback".to_string());

        Ok(SpotifyConfig {
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// Get the rescue trigger secret, falling back to the environment
    pub fn rescue_secret(&self) -> Result<String> {
        if let Some(ref server) = self.server {
            if !server.rescue_secret.is_empty() {
                return Ok(server.rescue_secret.clone());
            }
        }

        std::env::var("RESCUE_SECRET")
            .context("Rescue secret not configured (config [server] or RESCUE_SECRET)")
    }
}

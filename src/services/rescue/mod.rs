mod run;
mod token;

pub use run::RescueService;
pub use token::ensure_valid_access;

use crate::spotify::SpotifyApiError;

/// Refresh cadence of a collection. Stored as its uppercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RescueMode {
    Daily,
    Weekly,
    Monthly,
}

impl RescueMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RescueMode::Daily => "DAILY",
            RescueMode::Weekly => "WEEKLY",
            RescueMode::Monthly => "MONTHLY",
        }
    }
}

impl std::fmt::Display for RescueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown rescue mode: {0}")]
pub struct UnknownRescueMode(String);

impl std::str::FromStr for RescueMode {
    type Err = UnknownRescueMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(RescueMode::Daily),
            "WEEKLY" => Ok(RescueMode::Weekly),
            "MONTHLY" => Ok(RescueMode::Monthly),
            _ => Err(UnknownRescueMode(s.to_string())),
        }
    }
}

/// Classified failures of the rescue path.
///
/// `CredentialRefreshFailed` is fatal for every collection of the owning
/// account in the current run; the other variants are fatal only for the
/// collection that raised them. None of them abort the run.
#[derive(Debug, thiserror::Error)]
pub enum RescueError {
    #[error("Failed to refresh credentials: {0}")]
    CredentialRefreshFailed(#[source] SpotifyApiError),
    #[error("Playlist not found: {playlist_id}")]
    PlaylistNotFound { playlist_id: String },
    #[error("Spotify request failed: {0}")]
    Transport(#[source] SpotifyApiError),
    #[error("Ledger write failed after remote append: {0}")]
    LedgerWriteFailed(#[source] sea_orm::DbErr),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl From<SpotifyApiError> for RescueError {
    fn from(err: SpotifyApiError) -> Self {
        match err {
            SpotifyApiError::PlaylistNotFound { playlist_id } => {
                RescueError::PlaylistNotFound { playlist_id }
            }
            other => RescueError::Transport(other),
        }
    }
}

/// Outcome counters for one rescue run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RescueReport {
    pub collections_processed: u32,
    pub collections_failed: u32,
    pub owners_skipped: u32,
    pub tracks_delivered: u64,
    /// Collections whose tracks reached the destination playlist but were not
    /// recorded in the ledger; they may be delivered again next run.
    pub ledger_write_failures: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for mode in [RescueMode::Daily, RescueMode::Weekly, RescueMode::Monthly] {
            assert_eq!(mode.as_str().parse::<RescueMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!("daily".parse::<RescueMode>().unwrap(), RescueMode::Daily);
    }

    #[test]
    fn test_mode_parse_rejects_unknown() {
        assert!("YEARLY".parse::<RescueMode>().is_err());
    }
}

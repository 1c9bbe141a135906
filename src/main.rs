mod config;
mod database;
mod entities;
mod http_server;
mod logging;
mod ports;
mod services;
mod spotify;
#[cfg(test)]
mod test_utils;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::config::Config;
use crate::database::Database;
use crate::http_server::state::AppState;
use crate::logging::setup_logging;
use crate::services::accounts::AccountService;
use crate::services::collections::CollectionService;
use crate::services::rescue::{RescueMode, RescueService};
use crate::spotify::web::SpotifyWebApi;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLAYLIST_RESCUER_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level (default: info)
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "PLAYLIST_RESCUER_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server exposing the scheduled rescue trigger
    Serve {
        /// The port to run the server on
        #[arg(short, long, default_value = "3000", env = "PLAYLIST_RESCUER_HTTP_PORT")]
        port: u16,
    },
    /// Run one rescue pass for the given cadence
    Rescue {
        /// Which collections to process
        #[arg(short, long, value_enum)]
        mode: RescueMode,
    },
    /// Manage linked Spotify accounts
    #[command(subcommand)]
    Account(AccountCommands),
    /// Manage collected playlists
    #[command(subcommand)]
    Collection(CollectionCommands),
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum AccountCommands {
    /// Link a Spotify account via the authorization-code flow
    Link,
    /// List linked accounts
    List,
}

#[derive(Subcommand, Debug)]
enum CollectionCommands {
    /// Start collecting a playlist
    Add {
        /// Account id that owns the collection
        #[arg(short, long)]
        account: i64,

        /// Playlist id, spotify: URI, or share URL
        #[arg(short, long)]
        identifier: String,

        /// Refresh cadence
        #[arg(short, long, value_enum, default_value = "weekly")]
        mode: RescueMode,
    },
    /// Remove a collection
    Remove {
        /// Collection id to remove
        #[arg(long)]
        id: i64,

        /// Also unfollow the rescue playlist
        #[arg(long)]
        unfollow: bool,
    },
    /// List collections
    List,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("playlist-rescuer starting");

    if let Commands::Config(ref command) = args.command {
        return handle_config_command(command);
    }

    log::debug!("Loading configuration");
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    let db = Arc::new(Database::open(&config.database_path()).await?);

    match args.command {
        Commands::Serve { port } => {
            let spotify = SpotifyWebApi::new(config.spotify_config()?);
            let state = Arc::new(AppState {
                db,
                spotify,
                rescue_secret: config.rescue_secret()?,
            });
            http_server::app::start(port, state).await?;
        }
        Commands::Rescue { mode } => {
            let spotify = SpotifyWebApi::new(config.spotify_config()?);
            let service = RescueService::new(db, spotify);
            let report = service.run(mode).await?;
            println!(
                "{} collections processed, {} tracks delivered, {} collections failed, {} owners skipped",
                report.collections_processed,
                report.tracks_delivered,
                report.collections_failed,
                report.owners_skipped
            );
        }
        Commands::Account(AccountCommands::Link) => {
            let spotify = SpotifyWebApi::new(config.spotify_config()?);
            println!(
                "Open this URL in your browser and authorize the application:\n\n  {}\n",
                spotify.authorize_url()
            );
            print!("Paste the 'code' parameter from the redirect URL: ");
            std::io::stdout().flush()?;
            let mut code = String::new();
            std::io::stdin()
                .read_line(&mut code)
                .wrap_err("Failed to read authorization code")?;

            let service = AccountService::new(db, spotify);
            let account = service.link_account(code.trim()).await?;
            println!(
                "Linked account {} ({})",
                account.user_id,
                account.display_name.unwrap_or_default()
            );
        }
        Commands::Account(AccountCommands::List) => {
            let spotify = SpotifyWebApi::new(config.spotify_config()?);
            let service = AccountService::new(db, spotify);
            for account in service.list_accounts().await? {
                println!(
                    "{}\t{}\t{}",
                    account.id,
                    account.user_id,
                    account.display_name.unwrap_or_default()
                );
            }
        }
        Commands::Collection(command) => {
            let spotify = SpotifyWebApi::new(config.spotify_config()?);
            let service = CollectionService::new(db, spotify);
            match command {
                CollectionCommands::Add {
                    account,
                    identifier,
                    mode,
                } => {
                    let collection = service.add_collection(account, &identifier, mode).await?;
                    println!("Collection {} added ({})", collection.id, collection.mode);
                }
                CollectionCommands::Remove { id, unfollow } => {
                    service.remove_collection(id, unfollow).await?;
                    println!("Collection {} removed", id);
                }
                CollectionCommands::List => {
                    for (collection, playlist) in service.list_collections().await? {
                        let added = chrono::DateTime::from_timestamp(collection.created_at, 0)
                            .map(|added| added.format("%Y-%m-%d").to_string())
                            .unwrap_or_default();
                        println!(
                            "{}\t{}\t{}\t{}\t{}",
                            collection.id,
                            playlist.name,
                            collection.mode,
                            if collection.collecting {
                                "collecting"
                            } else {
                                "paused"
                            },
                            added
                        );
                    }
                }
            }
        }
        Commands::Config(_) => unreachable!("handled above"),
    }

    Ok(())
}

fn handle_config_command(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::CreateDefault => {
            let path = Config::create_default()?;
            println!("Created config file: {}", path.display());
        }
        ConfigCommands::Path => {
            let path = Config::config_path()
                .ok_or_else(|| color_eyre::eyre::eyre!("No config directory available"))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

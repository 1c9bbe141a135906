use std::sync::Arc;

use crate::database::Database;
use crate::spotify::web::SpotifyWebApi;

pub struct AppState {
    pub db: Arc<Database>,
    pub spotify: SpotifyWebApi,
    /// Shared secret the scheduler presents on the trigger endpoint
    pub rescue_secret: String,
}

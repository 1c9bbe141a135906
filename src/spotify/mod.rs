pub mod auth;
pub mod client;
pub mod identifier;
pub mod types;
pub mod web;

pub use client::{SpotifyApiError, SpotifyTokens};

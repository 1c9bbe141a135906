pub mod account;
pub mod collected_track;
pub mod collection;
pub mod playlist;

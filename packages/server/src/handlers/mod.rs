pub mod auth;
pub mod listing;
pub mod media;

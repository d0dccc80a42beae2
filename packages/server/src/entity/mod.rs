pub mod admin;
pub mod listing;

pub mod config;
pub mod images;
pub mod listing_status;
pub mod slug;
pub mod storage;

pub use listing_status::ListingStatus;

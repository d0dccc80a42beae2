//! Listing workflows and directory queries on top of the `umkm` table.

pub mod directory;
pub mod service;
pub mod slugs;

pub use directory::{DirectoryStats, ListingFilter, SortField, SortOrder};
pub use service::{DeletedListing, ListingService};
pub use slugs::DbSlugLookup;

//! Listing image handling: upload rules, object naming, the per-form
//! [`ImageSession`] and the `images_text` column codec.

mod codec;
mod progress;
mod session;
mod upload;

pub use codec::{all_images, parse_images, serialize_images};
pub use progress::Progress;
pub use session::{
    CommitError, CommitOptions, CommittedImages, ImageSession, ImageSlot, placeholder_reference,
    remove_queued,
};
pub use upload::{
    ImageError, ImageNamespace, ImageRules, ImageUpload, object_name, validate_upload,
};

use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::progress::Progress;
use super::upload::{
    ImageError, ImageNamespace, ImageRules, ImageUpload, object_name, validate_upload,
};
use crate::storage::ObjectStore;

/// Characters left as-is when substituting a listing name into the placeholder URL.
const NAME_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Content of one image slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    /// Reference to an image that is already stored.
    Stored(String),
    /// A validated local file waiting to be uploaded.
    Pending(ImageUpload),
}

impl ImageSlot {
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Stored(reference) => Some(reference),
            Self::Pending(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("A main image is required")]
    MissingMainImage,
}

#[derive(Debug, Clone, Copy)]
pub struct CommitOptions<'a> {
    /// Used for the placeholder reference when the main upload fails.
    pub listing_name: &'a str,
    /// Template containing `{name}`.
    pub placeholder_url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedImages {
    pub main_image: String,
    pub additional_images: Vec<String>,
    /// Queued references that are gone from the store.
    pub removed: Vec<String>,
    /// File names of uploads that did not make it.
    pub failed_uploads: Vec<String>,
    /// Whether `main_image` is the placeholder.
    pub main_is_placeholder: bool,
}

/// Image state of one listing form.
///
/// Transitions take the session by value and return the next state; nothing
/// touches the object store until [`ImageSession::commit`].
#[derive(Debug, Clone)]
pub struct ImageSession {
    rules: ImageRules,
    main: Option<ImageSlot>,
    additional: Vec<ImageSlot>,
    deletion_queue: Vec<String>,
}

impl ImageSession {
    pub fn new(rules: ImageRules) -> Self {
        Self {
            rules,
            main: None,
            additional: Vec::new(),
            deletion_queue: Vec::new(),
        }
    }

    /// Seed a session with the references of a stored listing.
    pub fn from_listing(rules: ImageRules, main_image: &str, additional: &[String]) -> Self {
        let main = Some(main_image.trim())
            .filter(|m| !m.is_empty())
            .map(|m| ImageSlot::Stored(m.to_string()));
        let additional = additional
            .iter()
            .filter(|r| !r.trim().is_empty())
            .map(|r| ImageSlot::Stored(r.clone()))
            .collect();

        Self {
            rules,
            main,
            additional,
            deletion_queue: Vec::new(),
        }
    }

    pub fn main(&self) -> Option<&ImageSlot> {
        self.main.as_ref()
    }

    pub fn additional(&self) -> &[ImageSlot] {
        &self.additional
    }

    pub fn deletion_queue(&self) -> &[String] {
        &self.deletion_queue
    }

    /// Put a new file in the main slot. A stored main image it replaces is queued for deletion.
    pub fn select_main(mut self, upload: ImageUpload) -> Result<Self, ImageError> {
        validate_upload(&upload, &self.rules)?;
        let previous = self.main.take();
        self.queue(previous);
        self.main = Some(ImageSlot::Pending(upload));
        Ok(self)
    }

    pub fn remove_main(mut self) -> Self {
        let previous = self.main.take();
        self.queue(previous);
        self
    }

    pub fn add_additional(mut self, upload: ImageUpload) -> Result<Self, ImageError> {
        validate_upload(&upload, &self.rules)?;
        self.additional.push(ImageSlot::Pending(upload));
        Ok(self)
    }

    pub fn remove_additional(mut self, index: usize) -> Result<Self, ImageError> {
        if index >= self.additional.len() {
            return Err(ImageError::NoSuchIndex(index));
        }
        let slot = self.additional.remove(index);
        self.queue(Some(slot));
        Ok(self)
    }

    /// Drop a stored reference from whichever slot holds it.
    pub fn remove_existing(mut self, reference: &str) -> Result<Self, ImageError> {
        if self.main.as_ref().and_then(ImageSlot::reference) == Some(reference) {
            return Ok(self.remove_main());
        }
        let index = self
            .additional
            .iter()
            .position(|slot| slot.reference() == Some(reference))
            .ok_or_else(|| ImageError::UnknownReference(reference.to_string()))?;
        self.remove_additional(index)
    }

    fn queue(&mut self, slot: Option<ImageSlot>) {
        if let Some(ImageSlot::Stored(reference)) = slot {
            if !self.deletion_queue.contains(&reference) {
                self.deletion_queue.push(reference);
            }
        }
    }

    /// Apply the session to the object store.
    ///
    /// Queued references are removed first, then the main file is uploaded,
    /// then additional files one at a time. Removal and additional upload
    /// failures are logged and skipped; a failed main upload falls back to
    /// the placeholder. Only a missing main image is an error, and it is
    /// raised before any I/O.
    pub async fn commit(
        self,
        store: &dyn ObjectStore,
        options: &CommitOptions<'_>,
        progress: &mut Progress,
    ) -> Result<CommittedImages, CommitError> {
        let Some(main) = self.main else {
            return Err(CommitError::MissingMainImage);
        };
        progress.report(5);

        let removed = remove_queued(store, &self.deletion_queue).await;
        progress.report(20);

        let mut failed_uploads = Vec::new();
        let mut main_is_placeholder = false;
        let main_image = match main {
            ImageSlot::Stored(reference) => reference,
            ImageSlot::Pending(upload) => {
                match upload_one(store, ImageNamespace::Main, &upload).await {
                    Some(url) => url,
                    None => {
                        failed_uploads.push(upload.file_name);
                        main_is_placeholder = true;
                        placeholder_reference(options)
                    }
                }
            }
        };
        progress.report(40);

        let pending_count = self
            .additional
            .iter()
            .filter(|slot| matches!(slot, ImageSlot::Pending(_)))
            .count();
        let mut kept = Vec::new();
        let mut uploaded = Vec::new();
        let mut done = 0usize;
        for slot in self.additional {
            match slot {
                ImageSlot::Stored(reference) => kept.push(reference),
                ImageSlot::Pending(upload) => {
                    match upload_one(store, ImageNamespace::Additional, &upload).await {
                        Some(url) => uploaded.push(url),
                        None => failed_uploads.push(upload.file_name),
                    }
                    done += 1;
                    progress.report((40 + 50 * done / pending_count) as u8);
                }
            }
        }
        kept.extend(uploaded);
        progress.report(90);

        info!(
            main_is_placeholder,
            additional = kept.len(),
            removed = removed.len(),
            failed = failed_uploads.len(),
            "Committed listing images"
        );

        Ok(CommittedImages {
            main_image,
            additional_images: kept,
            removed,
            failed_uploads,
            main_is_placeholder,
        })
    }
}

/// Placeholder reference for a listing without a usable main image.
pub fn placeholder_reference(options: &CommitOptions<'_>) -> String {
    let name = utf8_percent_encode(options.listing_name.trim(), NAME_COMPONENT).to_string();
    options.placeholder_url.replace("{name}", &name)
}

async fn upload_one(
    store: &dyn ObjectStore,
    namespace: ImageNamespace,
    upload: &ImageUpload,
) -> Option<String> {
    let path = object_name(namespace, upload, Utc::now());
    match store.upload(&path, &upload.data, &upload.content_type).await {
        Ok(stored) => Some(stored.url),
        Err(e) => {
            warn!(path = %path, file = %upload.file_name, error = %e, "Image upload failed");
            None
        }
    }
}

/// Best-effort removal of stored references. Returns the references that are gone.
pub async fn remove_queued(store: &dyn ObjectStore, references: &[String]) -> Vec<String> {
    let mut owned = Vec::with_capacity(references.len());
    for reference in references {
        match store.object_path(reference) {
            Some(path) => owned.push((reference, path)),
            None => debug!(reference = %reference, "Skipping reference outside the object store"),
        }
    }
    if owned.is_empty() {
        return Vec::new();
    }

    let paths: Vec<String> = owned.iter().map(|(_, path)| path.clone()).collect();
    let outcomes = store.remove(&paths).await;
    owned
        .into_iter()
        .zip(outcomes)
        .filter(|(_, outcome)| outcome.result.is_ok())
        .map(|((reference, _), _)| reference.clone())
        .collect()
}

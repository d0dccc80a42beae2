use chrono::Utc;
use common::ListingStatus;
use common::config::ImageConfig;
use common::images::{
    CommitError, CommitOptions, CommittedImages, ImageRules, ImageSession, Progress, all_images,
    parse_images, remove_queued, serialize_images,
};
use common::slug::SlugResolver;
use common::storage::ObjectStore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use tracing::{info, instrument, warn};

use super::slugs::DbSlugLookup;
use crate::entity::listing;
use crate::error::AppError;
use crate::models::listing::{ListingForm, validate_listing_patch, validate_new_listing};
use crate::state::AppState;

/// Outcome of deleting a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedListing {
    pub id: i32,
    /// References that were removed from the object store.
    pub removed_images: Vec<String>,
}

/// Create, edit, publish and delete listings together with their images.
pub struct ListingService<'a, C: ConnectionTrait> {
    conn: &'a C,
    store: &'a dyn ObjectStore,
    images: &'a ImageConfig,
    slugs: SlugResolver,
}

impl<'a> ListingService<'a, DatabaseConnection> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            &state.db,
            state.object_store.as_ref(),
            &state.config.images,
            SlugResolver::new(state.config.slug.max_attempts),
        )
    }
}

impl<'a, C: ConnectionTrait> ListingService<'a, C> {
    pub fn new(
        conn: &'a C,
        store: &'a dyn ObjectStore,
        images: &'a ImageConfig,
        slugs: SlugResolver,
    ) -> Self {
        Self {
            conn,
            store,
            images,
            slugs,
        }
    }

    fn rules(&self) -> ImageRules {
        ImageRules::from(self.images)
    }

    fn commit_options<'n>(&'n self, listing_name: &'n str) -> CommitOptions<'n> {
        CommitOptions {
            listing_name,
            placeholder_url: &self.images.placeholder_url,
        }
    }

    pub async fn find(&self, id: i32) -> Result<listing::Model, AppError> {
        listing::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Listing {id} not found")))
    }

    /// Look up a listing by slug, hiding anything that is not active.
    pub async fn find_public_by_slug(&self, slug: &str) -> Result<listing::Model, AppError> {
        listing::Entity::find()
            .filter(listing::Column::Slug.eq(slug))
            .filter(listing::Column::Status.eq(ListingStatus::Active))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Listing '{slug}' not found")))
    }

    pub async fn preview_slug(&self, name: &str, exclude_id: Option<i32>) -> Result<String, AppError> {
        let lookup = DbSlugLookup::new(self.conn);
        Ok(self.slugs.resolve_unique(&lookup, name, exclude_id).await?)
    }

    #[instrument(skip(self, form, progress), fields(name = form.name.as_deref().unwrap_or_default()))]
    pub async fn create(
        &self,
        form: ListingForm,
        progress: &mut Progress,
    ) -> Result<listing::Model, AppError> {
        let fields = validate_new_listing(&form)?;

        let mut session = ImageSession::new(self.rules());
        if let Some(main) = form.main_image {
            session = session.select_main(main)?;
        }
        for upload in form.additional_images {
            session = session.add_additional(upload)?;
        }
        if session.main().is_none() {
            return Err(CommitError::MissingMainImage.into());
        }

        let slug = self.preview_slug(&fields.slug_source, None).await?;
        let committed = session
            .commit(self.store, &self.commit_options(&fields.name), progress)
            .await?;

        let now = Utc::now();
        let inserted = listing::ActiveModel {
            name: Set(fields.name),
            slug: Set(slug.clone()),
            category: Set(fields.category),
            description: Set(fields.description),
            full_description: Set(fields.full_description),
            phone: Set(fields.phone),
            address: Set(fields.address),
            main_image: Set(committed.main_image.clone()),
            images_text: Set(serialize_images(&committed.additional_images)),
            status: Set(fields.status),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await;

        match inserted {
            Ok(model) => {
                progress.report(100);
                info!(listing_id = model.id, slug = %model.slug, failed_uploads = committed.failed_uploads.len(), "Listing created");
                Ok(model)
            }
            Err(e) => {
                self.discard_uploads(&committed, &[]).await;
                Err(persist_error(e, &slug))
            }
        }
    }

    #[instrument(skip(self, form, progress), fields(listing_id = id))]
    pub async fn update(
        &self,
        id: i32,
        form: ListingForm,
        progress: &mut Progress,
    ) -> Result<listing::Model, AppError> {
        let existing = self.find(id).await?;
        let patch = validate_listing_patch(&form)?;

        let stored_additional = parse_images(existing.images_text.as_deref());
        let mut session =
            ImageSession::from_listing(self.rules(), &existing.main_image, &stored_additional);
        for reference in &form.remove_images {
            session = session.remove_existing(reference)?;
        }
        if form.remove_main_image {
            session = session.remove_main();
        }
        if let Some(main) = form.main_image {
            session = session.select_main(main)?;
        }
        for upload in form.additional_images {
            session = session.add_additional(upload)?;
        }
        if session.main().is_none() {
            return Err(CommitError::MissingMainImage.into());
        }

        let slug = match (&patch.slug, &patch.name) {
            (Some(explicit), _) => self.preview_slug(explicit, Some(id)).await?,
            (None, Some(name)) if *name != existing.name => {
                self.preview_slug(name, Some(id)).await?
            }
            _ => existing.slug.clone(),
        };

        let name = patch.name.clone().unwrap_or_else(|| existing.name.clone());
        let committed = session
            .commit(self.store, &self.commit_options(&name), progress)
            .await?;

        let previous = all_images(&existing.main_image, &stored_additional);
        let mut active: listing::ActiveModel = existing.into();
        active.name = Set(name);
        active.slug = Set(slug.clone());
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(full_description) = patch.full_description {
            active.full_description = Set(full_description);
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        active.main_image = Set(committed.main_image.clone());
        active.images_text = Set(serialize_images(&committed.additional_images));
        active.updated_at = Set(Utc::now());

        match active.update(self.conn).await {
            Ok(model) => {
                progress.report(100);
                info!(slug = %model.slug, removed = committed.removed.len(), failed_uploads = committed.failed_uploads.len(), "Listing updated");
                Ok(model)
            }
            Err(e) => {
                self.discard_uploads(&committed, &previous).await;
                Err(persist_error(e, &slug))
            }
        }
    }

    /// Set the status, or flip visibility when `status` is `None`.
    #[instrument(skip(self), fields(listing_id = id))]
    pub async fn set_status(
        &self,
        id: i32,
        status: Option<ListingStatus>,
    ) -> Result<listing::Model, AppError> {
        let existing = self.find(id).await?;
        let next = status.unwrap_or_else(|| existing.status.toggled());

        let mut active: listing::ActiveModel = existing.into();
        active.status = Set(next);
        active.updated_at = Set(Utc::now());
        let model = active.update(self.conn).await?;

        info!(status = next.as_str(), "Listing status changed");
        Ok(model)
    }

    /// Delete the row, then remove its images from the object store.
    #[instrument(skip(self), fields(listing_id = id))]
    pub async fn delete(&self, id: i32) -> Result<DeletedListing, AppError> {
        let existing = self.find(id).await?;
        listing::Entity::delete_by_id(id).exec(self.conn).await?;

        let references = all_images(
            &existing.main_image,
            &parse_images(existing.images_text.as_deref()),
        );
        let removed_images = remove_queued(self.store, &references).await;
        if removed_images.len() < references.len() {
            warn!(
                slug = %existing.slug,
                kept = references.len() - removed_images.len(),
                "Some listing images were not removed"
            );
        }

        info!(slug = %existing.slug, removed = removed_images.len(), "Listing deleted");
        Ok(DeletedListing { id, removed_images })
    }

    /// Remove objects uploaded by a commit whose record never got saved.
    async fn discard_uploads(&self, committed: &CommittedImages, previous: &[String]) {
        let fresh = fresh_references(committed, previous);
        if fresh.is_empty() {
            return;
        }
        let removed = remove_queued(self.store, &fresh).await;
        warn!(
            uploaded = fresh.len(),
            removed = removed.len(),
            "Discarded uploads of an unsaved listing"
        );
    }
}

/// References in `committed` that did not exist before the commit.
fn fresh_references(committed: &CommittedImages, previous: &[String]) -> Vec<String> {
    let main = (!committed.main_is_placeholder).then_some(&committed.main_image);
    main.into_iter()
        .chain(&committed.additional_images)
        .filter(|r| !previous.contains(r))
        .cloned()
        .collect()
}

fn persist_error(err: DbErr, slug: &str) -> AppError {
    persist_failure(err.sql_err(), &err.to_string(), slug)
}

/// A unique violation means another save took the slug first.
fn persist_failure(sql_err: Option<SqlErr>, detail: &str, slug: &str) -> AppError {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("Slug '{slug}' is already taken"))
        }
        _ => AppError::PersistFailed(format!("Failed to save listing: {detail}")),
    }
}

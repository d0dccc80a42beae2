use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use common::ListingStatus;
use common::images::{ImageUpload, Progress};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::listing::{DirectoryStats, ListingFilter, ListingService, directory};
use crate::models::listing::{
    AdminListingQuery, CATEGORY_SUGGESTIONS, CategoriesResponse, DeleteListingResponse,
    ListingForm, ListingListResponse, ListingResponse, PublicListingQuery, SlugPreviewQuery,
    SlugPreviewResponse, StatsResponse, StatusUpdateRequest,
};
use crate::state::AppState;

/// Room for one main image plus a handful of additional ones.
pub fn listing_upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(64 * 1024 * 1024) // 64 MB
}

#[utoipa::path(
    get,
    path = "/listings",
    tag = "Listings",
    operation_id = "listPublicListings",
    summary = "Browse the public directory",
    description = "Active listings only, newest first. `search` matches name, description and category case-insensitively.",
    params(PublicListingQuery),
    responses(
        (status = 200, description = "One page of listings", body = ListingListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_public(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PublicListingQuery>,
) -> Result<Json<ListingListResponse>, AppError> {
    let filter = ListingFilter::public(query);
    let (rows, pagination) = directory::list(&state.db, &filter).await?;

    Ok(Json(ListingListResponse {
        data: rows.into_iter().map(ListingResponse::from).collect(),
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/listings/{slug}",
    tag = "Listings",
    operation_id = "getPublicListing",
    summary = "Get an active listing by slug",
    params(("slug" = String, Path, description = "Listing slug")),
    responses(
        (status = 200, description = "Listing detail", body = ListingResponse),
        (status = 404, description = "No active listing with this slug (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(slug = %slug))]
pub async fn get_public(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ListingResponse>, AppError> {
    let model = ListingService::from_state(&state)
        .find_public_by_slug(&slug)
        .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Listings",
    operation_id = "listCategories",
    summary = "Categories in use",
    description = "Distinct categories of active listings, alphabetically, plus the fixed suggestion set used by forms.",
    responses((status = 200, description = "Categories", body = CategoriesResponse)),
)]
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<CategoriesResponse>, AppError> {
    let categories = directory::categories(&state.db, Some(ListingStatus::Active)).await?;

    Ok(Json(CategoriesResponse {
        categories,
        suggestions: CATEGORY_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/admin/listings",
    tag = "Admin Listings",
    operation_id = "listAdminListings",
    summary = "List listings in every status",
    params(AdminListingQuery),
    responses(
        (status = 200, description = "One page of listings", body = ListingListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _admin, query))]
pub async fn list_admin(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AdminListingQuery>,
) -> Result<Json<ListingListResponse>, AppError> {
    let filter = ListingFilter::admin(query)?;
    let (rows, pagination) = directory::list(&state.db, &filter).await?;

    Ok(Json(ListingListResponse {
        data: rows.into_iter().map(ListingResponse::from).collect(),
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/listings/stats",
    tag = "Admin Listings",
    operation_id = "listingStats",
    summary = "Dashboard counters",
    description = "Totals per status and per category across all listings.",
    responses(
        (status = 200, description = "Counters", body = StatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _admin))]
pub async fn stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    Ok(Json(DirectoryStats::collect(&state.db).await?.into()))
}

#[utoipa::path(
    get,
    path = "/admin/listings/slug",
    tag = "Admin Listings",
    operation_id = "previewSlug",
    summary = "Preview the slug a name would get",
    params(SlugPreviewQuery),
    responses(
        (status = 200, description = "Free slug", body = SlugPreviewResponse),
        (status = 400, description = "Name has no slug characters (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "No free slug left (CONFLICT)", body = ErrorBody),
        (status = 503, description = "Uniqueness could not be checked (SLUG_UNVERIFIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _admin, query), fields(name = %query.name))]
pub async fn slug_preview(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SlugPreviewQuery>,
) -> Result<Json<SlugPreviewResponse>, AppError> {
    let slug = ListingService::from_state(&state)
        .preview_slug(&query.name, query.exclude_id)
        .await?;
    Ok(Json(SlugPreviewResponse { slug }))
}

#[utoipa::path(
    post,
    path = "/admin/listings",
    tag = "Admin Listings",
    operation_id = "createListing",
    summary = "Create a listing",
    description = "Multipart form with text fields `name`, `slug`, `category`, `description`, \
        `full_description`, `phone`, `address`, `status` and files `main_image` (required) and \
        `additional_images` (repeatable). A failed main upload stores a placeholder reference; \
        failed additional uploads are skipped.",
    request_body(content_type = "multipart/form-data", description = "Listing fields and images"),
    responses(
        (status = 201, description = "Listing created", body = ListingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Slug taken (CONFLICT)", body = ErrorBody),
        (status = 500, description = "The record could not be saved (PERSIST_FAILED)", body = ErrorBody),
        (status = 503, description = "Uniqueness could not be checked (SLUG_UNVERIFIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, admin, multipart), fields(admin_id = admin.admin_id))]
pub async fn create(
    admin: AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ListingResponse>), AppError> {
    let form = read_listing_form(multipart).await?;
    let mut progress = progress_log(form.name.clone().unwrap_or_default());

    let model = ListingService::from_state(&state)
        .create(form, &mut progress)
        .await?;
    Ok((StatusCode::CREATED, Json(model.into())))
}

#[utoipa::path(
    get,
    path = "/admin/listings/{id}",
    tag = "Admin Listings",
    operation_id = "getListing",
    summary = "Get a listing in any status",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing detail", body = ListingResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Listing not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _admin))]
pub async fn get_listing(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ListingResponse>, AppError> {
    let model = ListingService::from_state(&state).find(id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    put,
    path = "/admin/listings/{id}",
    tag = "Admin Listings",
    operation_id = "updateListing",
    summary = "Edit a listing",
    description = "Same fields as create, all optional. `remove_images` (repeatable) drops stored \
        references, `remove_main_image=true` clears the main slot, and new files replace or extend \
        the images. The listing must still have a main image afterwards.",
    params(("id" = i32, Path, description = "Listing ID")),
    request_body(content_type = "multipart/form-data", description = "Changed fields and images"),
    responses(
        (status = 200, description = "Listing updated", body = ListingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Listing not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slug taken (CONFLICT)", body = ErrorBody),
        (status = 500, description = "The record could not be saved (PERSIST_FAILED)", body = ErrorBody),
        (status = 503, description = "Uniqueness could not be checked (SLUG_UNVERIFIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, admin, multipart), fields(admin_id = admin.admin_id))]
pub async fn update(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ListingResponse>, AppError> {
    let form = read_listing_form(multipart).await?;
    let mut progress = progress_log(format!("#{id}"));

    let model = ListingService::from_state(&state)
        .update(id, form, &mut progress)
        .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/admin/listings/{id}/status",
    tag = "Admin Listings",
    operation_id = "setListingStatus",
    summary = "Change or toggle the status",
    description = "With `status` the listing is moved to it; with an empty body active and inactive swap.",
    params(("id" = i32, Path, description = "Listing ID")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = ListingResponse),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Listing not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _admin, payload))]
pub async fn set_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<StatusUpdateRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    let model = ListingService::from_state(&state)
        .set_status(id, payload.status)
        .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/listings/{id}",
    tag = "Admin Listings",
    operation_id = "deleteListing",
    summary = "Delete a listing and its images",
    description = "The row is removed first; image removal is best-effort.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing deleted", body = DeleteListingResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Listing not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _admin))]
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteListingResponse>, AppError> {
    let deleted = ListingService::from_state(&state).delete(id).await?;
    Ok(Json(DeleteListingResponse {
        id: deleted.id,
        removed_images: deleted.removed_images.len(),
    }))
}

/// Collect the text and file fields of a listing form.
async fn read_listing_form(mut multipart: Multipart) -> Result<ListingForm, AppError> {
    let mut form = ListingForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "main_image" | "additional_images" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_owned);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;
                // Browsers send an empty part for an untouched file input.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                let upload = ImageUpload::new(file_name, content_type.as_deref(), data.to_vec());
                if name == "main_image" {
                    form.main_image = Some(upload);
                } else {
                    form.additional_images.push(upload);
                }
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;
                apply_text_field(&mut form, &name, text)?;
            }
        }
    }

    Ok(form)
}

fn apply_text_field(form: &mut ListingForm, name: &str, text: String) -> Result<(), AppError> {
    match name {
        "name" => form.name = Some(text),
        "slug" => form.slug = Some(text),
        "category" => form.category = Some(text),
        "description" => form.description = Some(text),
        "full_description" => form.full_description = Some(text),
        "phone" => form.phone = Some(text),
        "address" => form.address = Some(text),
        "status" if !text.trim().is_empty() => {
            form.status = Some(
                text.trim()
                    .parse::<ListingStatus>()
                    .map_err(|e| AppError::Validation(e.to_string()))?,
            );
        }
        "remove_images" if !text.trim().is_empty() => form.remove_images.push(text),
        "remove_main_image" => form.remove_main_image = text.trim().eq_ignore_ascii_case("true"),
        _ => {} // Ignore unknown fields.
    }
    Ok(())
}

/// Progress sink that traces each step of a save.
fn progress_log(listing: String) -> Progress {
    let (progress, rx) = Progress::channel();
    tokio::spawn(trace_progress(listing, rx));
    progress
}

/// Log every step until the sender goes away. Returns the last percentage seen.
async fn trace_progress(listing: String, mut rx: UnboundedReceiver<u8>) -> u8 {
    let mut last = 0;
    while let Some(percent) = rx.recv().await {
        last = percent;
        debug!(listing = %listing, percent, "Listing save progress");
    }
    if last < 100 {
        warn!(listing = %listing, percent = last, "Listing save stopped before completion");
    }
    last
}

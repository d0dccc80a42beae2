use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use common::ListingStatus;
use common::images::{ImageUpload, all_images, parse_images};
use common::slug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::listing;
use crate::error::AppError;
use crate::models::shared::{Pagination, optional_text, require_text, validate_max_chars};

pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Categories offered in the admin form; any other non-empty value is accepted too.
pub const CATEGORY_SUGGESTIONS: &[&str] = &[
    "Kuliner",
    "Kerajinan",
    "Jasa",
    "Pertanian",
    "Fashion",
    "Lainnya",
];

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+62|62|0)8[1-9][0-9]{6,9}$").expect("failed to create the phone pattern")
});

/// Listing as returned by the API.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ListingResponse {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = "warung-sate-pak-budi")]
    pub slug: String,
    #[schema(example = "Warung Sate Pak Budi")]
    pub name: String,
    #[schema(example = "Kuliner")]
    pub category: String,
    pub description: String,
    pub full_description: Option<String>,
    #[schema(example = "081234567890")]
    pub phone: Option<String>,
    /// Phone grouped for display, e.g. `0812-3456-7890`.
    #[schema(example = "0812-3456-7890")]
    pub formatted_phone: Option<String>,
    pub address: Option<String>,
    pub main_image: String,
    pub additional_images: Vec<String>,
    /// `main_image` followed by `additional_images`, blanks removed.
    pub all_images: Vec<String>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<listing::Model> for ListingResponse {
    fn from(m: listing::Model) -> Self {
        let additional_images = parse_images(m.images_text.as_deref());
        let all_images = all_images(&m.main_image, &additional_images);
        Self {
            id: m.id,
            slug: m.slug,
            name: m.name,
            category: m.category,
            description: m.description,
            full_description: m.full_description,
            formatted_phone: m.phone.as_deref().map(format_phone),
            phone: m.phone,
            address: m.address,
            main_image: m.main_image,
            additional_images,
            all_images,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ListingListResponse {
    pub data: Vec<ListingResponse>,
    pub pagination: Pagination,
}

/// Query parameters of the public directory.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicListingQuery {
    /// Case-insensitive substring over name, description and category.
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u64>,
    /// 1-100, default 10.
    pub per_page: Option<u64>,
}

/// Query parameters of the admin directory.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminListingQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    #[param(value_type = Option<String>, example = "Active")]
    pub status: Option<ListingStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// `created_at` (default), `updated_at` or `name`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

/// Body of `PATCH /admin/listings/{id}/status`. Without `status` the listing is toggled.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct StatusUpdateRequest {
    pub status: Option<ListingStatus>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlugPreviewQuery {
    /// Name (or slug) to derive the slug from.
    pub name: String,
    /// Listing whose own slug does not count as taken.
    pub exclude_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SlugPreviewResponse {
    #[schema(example = "warung-sate-1")]
    pub slug: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub pending: u64,
    pub by_category: BTreeMap<String, u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoriesResponse {
    /// Categories in use by visible listings.
    pub categories: Vec<String>,
    /// Fixed suggestion set for forms.
    pub suggestions: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteListingResponse {
    pub id: i32,
    /// Number of image objects removed from storage.
    pub removed_images: usize,
}

/// Raw contents of a listing multipart form.
#[derive(Debug, Default)]
pub struct ListingForm {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub full_description: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<ListingStatus>,
    pub main_image: Option<ImageUpload>,
    pub additional_images: Vec<ImageUpload>,
    /// Stored references to drop from the listing.
    pub remove_images: Vec<String>,
    pub remove_main_image: bool,
}

/// Validated text fields of a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListingFields {
    pub name: String,
    /// Source for the slug: an explicit slug if given, otherwise the name.
    pub slug_source: String,
    pub category: String,
    pub description: String,
    pub full_description: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: ListingStatus,
}

/// Validated text changes to an existing listing. `None` leaves a field unchanged;
/// for nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub full_description: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub status: Option<ListingStatus>,
}

pub fn validate_new_listing(form: &ListingForm) -> Result<NewListingFields, AppError> {
    let name = require_text(form.name.as_deref(), "Name")?;
    let category = require_text(form.category.as_deref(), "Category")?;
    let description = require_text(form.description.as_deref(), "Description")?;
    validate_max_chars(&description, DESCRIPTION_MAX_CHARS, "Description")?;

    let slug_source = match optional_text(form.slug.as_deref()) {
        Some(explicit) => validate_explicit_slug(&explicit)?,
        None => name.clone(),
    };

    Ok(NewListingFields {
        name,
        slug_source,
        category,
        description,
        full_description: optional_text(form.full_description.as_deref()),
        phone: validate_phone(form.phone.as_deref())?,
        address: optional_text(form.address.as_deref()),
        status: form.status.unwrap_or_default(),
    })
}

pub fn validate_listing_patch(form: &ListingForm) -> Result<ListingPatch, AppError> {
    let name = form
        .name
        .as_deref()
        .map(|v| require_text(Some(v), "Name"))
        .transpose()?;
    let category = form
        .category
        .as_deref()
        .map(|v| require_text(Some(v), "Category"))
        .transpose()?;
    let description = form
        .description
        .as_deref()
        .map(|v| require_text(Some(v), "Description"))
        .transpose()?;
    if let Some(description) = &description {
        validate_max_chars(description, DESCRIPTION_MAX_CHARS, "Description")?;
    }
    let slug = optional_text(form.slug.as_deref())
        .map(|s| validate_explicit_slug(&s))
        .transpose()?;
    let phone = match form.phone.as_deref() {
        Some(raw) => Some(validate_phone(Some(raw))?),
        None => None,
    };

    Ok(ListingPatch {
        name,
        slug,
        category,
        description,
        full_description: form.full_description.as_deref().map(|v| optional_text(Some(v))),
        phone,
        address: form.address.as_deref().map(|v| optional_text(Some(v))),
        status: form.status,
    })
}

fn validate_explicit_slug(raw: &str) -> Result<String, AppError> {
    let normalized = slug::normalize(raw);
    if !slug::is_valid_slug(&normalized) {
        return Err(AppError::Validation(format!(
            "Slug '{raw}' must contain 3-255 letters, digits or hyphens"
        )));
    }
    Ok(normalized)
}

/// Validate an Indonesian mobile number; whitespace is ignored and blank means "no phone".
pub fn validate_phone(raw: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(compact) = raw
        .map(|p| p.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|p| !p.is_empty())
    else {
        return Ok(None);
    };
    if !PHONE_RE.is_match(&compact) {
        return Err(AppError::Validation(format!(
            "Phone '{compact}' is not a valid Indonesian mobile number"
        )));
    }
    Ok(Some(compact))
}

/// Group a stored phone number for display; unknown shapes are returned unchanged.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let group = |rest: &str| {
        let (a, rest) = rest.split_at(rest.len().min(4));
        let (b, c) = rest.split_at(rest.len().min(4));
        if c.is_empty() {
            format!("{a}-{b}")
        } else {
            format!("{a}-{b}-{c}")
        }
    };

    if digits.starts_with('0') {
        group(&digits)
    } else if let Some(rest) = digits.strip_prefix("62") {
        format!("+62 {}", group(rest))
    } else if digits.starts_with('8') {
        format!("0{}", group(&digits))
    } else {
        phone.to_string()
    }
}

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

pub const MIN_SLUG_LEN: usize = 3;
pub const MAX_SLUG_LEN: usize = 255;

/// Combining diacritical marks stripped after NFD decomposition.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036f}';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("Slug '{0}' must be 3-255 characters of lowercase letters, digits, and single hyphens")]
    Invalid(String),

    #[error("No free slug for '{base}' after {attempts} attempts")]
    Exhausted { base: String, attempts: u32 },

    #[error("Slug uniqueness could not be verified: {0}")]
    Unverified(String),
}

/// Derive a URL-safe slug from a display name.
///
/// Lowercases, strips diacritics, drops everything outside `[a-z0-9\s-]`,
/// turns whitespace runs into single hyphens and trims hyphens at both ends.
pub fn normalize(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name
        .to_lowercase()
        .nfd()
        .filter(|c| !COMBINING_MARKS.contains(c))
    {
        let c = if c.is_whitespace() { '-' } else { c };
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            continue;
        }
        if c == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(c);
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Check the stored slug format: `^[a-z0-9]+(?:-[a-z0-9]+)*$`, 3-255 characters.
pub fn is_valid_slug(slug: &str) -> bool {
    (MIN_SLUG_LEN..=MAX_SLUG_LEN).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
}

/// Answers "which record owns this slug?" against the listing collection.
#[async_trait]
pub trait SlugLookup: Send + Sync {
    type Id: PartialEq + Send + Sync + fmt::Debug;
    type Error: fmt::Display + Send;

    async fn slug_owner(&self, slug: &str) -> Result<Option<Self::Id>, Self::Error>;
}

/// Finds a free slug by probing `base`, `base-1`, `base-2`, ...
#[derive(Debug, Clone, Copy)]
pub struct SlugResolver {
    max_attempts: u32,
}

impl SlugResolver {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Return a slug for `name` that no record other than `exclude` owns.
    pub async fn resolve_unique<L: SlugLookup>(
        &self,
        lookup: &L,
        name: &str,
        exclude: Option<L::Id>,
    ) -> Result<String, SlugError> {
        let base = base_slug(name)?;

        for attempt in 0..self.max_attempts {
            let candidate = if attempt == 0 {
                base.clone()
            } else {
                with_suffix(&base, attempt)
            };

            let owner = lookup.slug_owner(&candidate).await.map_err(|e| {
                warn!(slug = %candidate, error = %e, "Slug lookup failed");
                SlugError::Unverified(e.to_string())
            })?;

            match owner {
                None => return Ok(candidate),
                Some(id) if exclude.as_ref() == Some(&id) => return Ok(candidate),
                Some(id) => debug!(slug = %candidate, owner = ?id, "Slug taken"),
            }
        }

        Err(SlugError::Exhausted {
            base,
            attempts: self.max_attempts,
        })
    }
}

impl Default for SlugResolver {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Normalize and cap a name so that suffixed candidates still fit the column.
fn base_slug(name: &str) -> Result<String, SlugError> {
    let mut base = normalize(name);
    // Room for "-" plus up to 10 suffix digits.
    let cap = MAX_SLUG_LEN - 11;
    if base.len() > cap {
        base.truncate(cap);
        while base.ends_with('-') {
            base.pop();
        }
    }
    if !is_valid_slug(&base) {
        return Err(SlugError::Invalid(base));
    }
    Ok(base)
}

fn with_suffix(base: &str, n: u32) -> String {
    format!("{base}-{n}")
}

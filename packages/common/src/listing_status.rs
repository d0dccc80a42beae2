use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication status of a listing.
///
/// Persisted as an integer: `0` inactive, `1` active, `2` pending review.
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "i32", db_type = "Integer")
)]
#[serde(rename_all = "PascalCase")]
pub enum ListingStatus {
    /// Hidden from the public directory.
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 0))]
    #[serde(alias = "Nonaktif")]
    Inactive,
    /// Visible in the public directory.
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 1))]
    #[serde(alias = "Aktif")]
    Active,
    /// Submitted but not yet reviewed.
    #[cfg_attr(feature = "sea-orm", sea_orm(num_value = 2))]
    Pending,
}

impl ListingStatus {
    /// All possible status values.
    pub const ALL: &'static [ListingStatus] = &[Self::Active, Self::Inactive, Self::Pending];

    /// Returns true if the listing should appear on public pages.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Integer code stored in the `status` column.
    pub fn code(&self) -> i32 {
        match self {
            Self::Inactive => 0,
            Self::Active => 1,
            Self::Pending => 2,
        }
    }

    /// Look up a status by its stored integer code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Inactive),
            1 => Some(Self::Active),
            2 => Some(Self::Pending),
            _ => None,
        }
    }

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Pending => "Pending",
        }
    }

    /// The opposite visibility, used by the admin toggle. Pending becomes active.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive | Self::Pending => Self::Active,
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ListingStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            ListingStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ListingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Active" | "active" | "Aktif" | "1" => Ok(Self::Active),
            "Inactive" | "inactive" | "Nonaktif" | "0" => Ok(Self::Inactive),
            "Pending" | "pending" | "2" => Ok(Self::Pending),
            other => Err(ParseStatusError {
                invalid: other.to_string(),
            }),
        }
    }
}

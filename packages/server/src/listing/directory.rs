use std::collections::BTreeMap;
use std::str::FromStr;

use common::ListingStatus;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;

use crate::entity::listing;
use crate::error::AppError;
use crate::models::listing::{AdminListingQuery, PublicListingQuery, StatsResponse};
use crate::models::shared::{Pagination, escape_like};

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;
/// Highest page whose offset still fits in a `u64` at any page size.
pub const MAX_PAGE: u64 = u64::MAX / MAX_PER_PAGE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
}

impl SortField {
    fn column(self) -> listing::Column {
        match self {
            Self::CreatedAt => listing::Column::CreatedAt,
            Self::UpdatedAt => listing::Column::UpdatedAt,
            Self::Name => listing::Column::Name,
        }
    }
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "name" => Ok(Self::Name),
            _ => Err(AppError::Validation(
                "sort_by must be one of: created_at, updated_at, name".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation("sort_order must be asc or desc".into())),
        }
    }
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Search, filter and paging parameters for one directory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<ListingStatus>,
    pub page: u64,
    pub per_page: u64,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            status: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl ListingFilter {
    /// Visitors only ever see active listings, newest first.
    pub fn public(query: PublicListingQuery) -> Self {
        Self {
            search: query.search,
            category: query.category,
            status: Some(ListingStatus::Active),
            ..Self::default()
        }
        .paged(query.page, query.per_page)
    }

    pub fn admin(query: AdminListingQuery) -> Result<Self, AppError> {
        let sort_by = query
            .sort_by
            .as_deref()
            .map(SortField::from_str)
            .transpose()?
            .unwrap_or_default();
        let sort_order = query
            .sort_order
            .as_deref()
            .map(SortOrder::from_str)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            search: query.search,
            category: query.category,
            status: query.status,
            sort_by,
            sort_order,
            ..Self::default()
        }
        .paged(query.page, query.per_page))
    }

    fn paged(mut self, page: Option<u64>, per_page: Option<u64>) -> Self {
        self.page = page.unwrap_or(1).clamp(1, MAX_PAGE);
        self.per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        self
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s).to_lowercase()))
    }

    /// The WHERE clause for this filter.
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(pattern) = self.search_term() {
            let like = |col: listing::Column| {
                Expr::expr(Func::lower(Expr::col(col)))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            cond = cond.add(
                Condition::any()
                    .add(like(listing::Column::Name))
                    .add(like(listing::Column::Description))
                    .add(like(listing::Column::Category)),
            );
        }

        if let Some(category) = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            cond = cond.add(listing::Column::Category.eq(category));
        }

        if let Some(status) = self.status {
            cond = cond.add(listing::Column::Status.eq(status));
        }

        cond
    }

    /// Rows skipped before the current page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn select(&self) -> Select<listing::Entity> {
        listing::Entity::find()
            .filter(self.condition())
            .order_by(self.sort_by.column(), self.sort_order.into())
            .order_by_desc(listing::Column::Id)
    }
}

/// Run a directory query: one page of listings plus pagination metadata.
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: &ListingFilter,
) -> Result<(Vec<listing::Model>, Pagination), DbErr> {
    let total = listing::Entity::find()
        .filter(filter.condition())
        .count(conn)
        .await?;

    let data = filter
        .select()
        .offset(Some(filter.offset()))
        .limit(Some(filter.per_page))
        .all(conn)
        .await?;

    Ok((data, Pagination::new(filter.page, filter.per_page, total)))
}

/// Distinct categories, alphabetically. `status` narrows to listings in that status.
pub async fn categories<C: ConnectionTrait>(
    conn: &C,
    status: Option<ListingStatus>,
) -> Result<Vec<String>, DbErr> {
    let mut select = listing::Entity::find()
        .select_only()
        .column(listing::Column::Category)
        .distinct();
    if let Some(status) = status {
        select = select.filter(listing::Column::Status.eq(status));
    }
    select
        .order_by_asc(listing::Column::Category)
        .into_tuple::<String>()
        .all(conn)
        .await
}

/// Display counters computed by scanning listings in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub pending: u64,
    pub by_category: BTreeMap<String, u64>,
}

impl DirectoryStats {
    pub fn from_listings<'a>(rows: impl IntoIterator<Item = (ListingStatus, &'a str)>) -> Self {
        let mut stats = Self::default();
        for (status, category) in rows {
            stats.total += 1;
            match status {
                ListingStatus::Active => stats.active += 1,
                ListingStatus::Inactive => stats.inactive += 1,
                ListingStatus::Pending => stats.pending += 1,
            }
            *stats.by_category.entry(category.to_string()).or_default() += 1;
        }
        stats
    }

    /// Fetch status and category of every listing and count them.
    pub async fn collect<C: ConnectionTrait>(conn: &C) -> Result<Self, DbErr> {
        let rows: Vec<(ListingStatus, String)> = listing::Entity::find()
            .select_only()
            .column(listing::Column::Status)
            .column(listing::Column::Category)
            .into_tuple()
            .all(conn)
            .await?;

        Ok(Self::from_listings(
            rows.iter().map(|(status, category)| (*status, category.as_str())),
        ))
    }
}

impl From<DirectoryStats> for StatsResponse {
    fn from(s: DirectoryStats) -> Self {
        Self {
            total: s.total,
            active: s.active,
            inactive: s.inactive,
            pending: s.pending,
            by_category: s.by_category,
        }
    }
}

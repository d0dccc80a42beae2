use async_trait::async_trait;
use common::slug::SlugLookup;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::listing;

/// Slug ownership lookups against the `umkm` table.
pub struct DbSlugLookup<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DbSlugLookup<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C: ConnectionTrait> SlugLookup for DbSlugLookup<'_, C> {
    type Id = i32;
    type Error = DbErr;

    async fn slug_owner(&self, slug: &str) -> Result<Option<i32>, DbErr> {
        listing::Entity::find()
            .select_only()
            .column(listing::Column::Id)
            .filter(listing::Column::Slug.eq(slug))
            .into_tuple::<i32>()
            .one(self.conn)
            .await
    }
}

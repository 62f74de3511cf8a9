use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::{
    entities::release,
    error::{AppError, AppResult},
    models::{NewRelease, Release},
    query::{Pageable, ReleaseFilter},
};

/// Row-level access to the `release` table.
#[derive(Clone)]
pub struct ReleaseRepository {
    db: DatabaseConnection,
}

impl ReleaseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Release>> {
        let row = release::Entity::find_by_id(id).one(&self.db).await?;
        row.map(to_release).transpose()
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Release>> {
        let row = release::Entity::find()
            .filter(release::Column::Name.eq(name))
            .one(&self.db)
            .await?;
        row.map(to_release).transpose()
    }

    pub async fn find_page(
        &self,
        filter: &ReleaseFilter,
        pageable: &Pageable,
    ) -> AppResult<Vec<Release>> {
        let mut select = release::Entity::find().filter(filter.condition());
        for order in &pageable.sort {
            select = select.order_by(order.property.column(), order.direction.order());
        }

        let rows = select
            .order_by_asc(release::Column::Id)
            .offset(pageable.offset())
            .limit(pageable.size)
            .all(&self.db)
            .await?;

        rows.into_iter().map(to_release).collect()
    }

    pub async fn insert(&self, new: NewRelease, now: i64) -> AppResult<Release> {
        let name = new.name.clone();
        let model = release::ActiveModel {
            id: Default::default(),
            name: Set(new.name),
            description: Set(new.description),
            status: Set(new.status.as_str().to_string()),
            release_date: Set(new.release_date.to_string()),
            created_at: Set(now),
            last_updated_at: Set(now),
        };

        let row = model.insert(&self.db).await.map_err(|err| name_conflict(err, &name))?;
        to_release(row)
    }

    /// Writes every mutable column of `release`; `created_at` is never touched.
    pub async fn update(&self, release: Release, now: i64) -> AppResult<Release> {
        let model = release::ActiveModel {
            id: Unchanged(release.id),
            name: Set(release.name.clone()),
            description: Set(release.description),
            status: Set(release.status.as_str().to_string()),
            release_date: Set(release.release_date.to_string()),
            created_at: Default::default(),
            last_updated_at: Set(now.max(release.created_at.as_second())),
        };

        let row = model.update(&self.db).await.map_err(|err| match err {
            DbErr::RecordNotUpdated => {
                AppError::NotFound(format!("Release not found with id:{}", release.id))
            },
            err => name_conflict(err, &release.name),
        })?;
        to_release(row)
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = release::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> AppResult<u64> {
        Ok(release::Entity::find().count(&self.db).await?)
    }
}

fn to_release(row: release::Model) -> AppResult<Release> {
    Ok(Release::try_from(row)?)
}

fn name_conflict(err: DbErr, name: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::AlreadyExists(format!("Release already exists with the name:{name}"))
        },
        _ => err.into(),
    }
}

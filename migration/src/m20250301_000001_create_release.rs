use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Release::Table)
                    .if_not_exists()
                    .col(pk_auto(Release::Id))
                    .col(string_len_uniq(Release::Name, 100))
                    .col(string_len(Release::Description, 500))
                    .col(string(Release::Status))
                    .col(string(Release::ReleaseDate))
                    .col(big_integer(Release::CreatedAt))
                    .col(big_integer(Release::LastUpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_release_release_date")
                    .table(Release::Table)
                    .col(Release::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Release::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Release {
    Table,
    Id,
    Name,
    Description,
    Status,
    ReleaseDate,
    CreatedAt,
    LastUpdatedAt,
}

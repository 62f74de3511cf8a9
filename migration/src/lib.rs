pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_release;
mod m20250315_000001_add_release_filter_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_release::Migration),
            Box::new(m20250315_000001_add_release_filter_indexes::Migration),
        ]
    }
}

pub use sea_orm_migration::prelude::*;

mod m20260810_000001_create_provenance;
mod m20260810_000002_create_deposits;
mod m20260810_000003_create_tracks;
mod m20260810_000004_create_stats;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260810_000001_create_provenance::Migration),
            Box::new(m20260810_000002_create_deposits::Migration),
            Box::new(m20260810_000003_create_tracks::Migration),
            Box::new(m20260810_000004_create_stats::Migration),
        ]
    }
}

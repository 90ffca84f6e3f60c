use std::sync::Arc;

use escrow_indexer::config::IndexerConfig;
use escrow_indexer::dispatcher::Dispatcher;
use escrow_indexer::events::ChainEvent;
use escrow_indexer::payee::NullPayeeReader;
use escrow_indexer::store::pg::PgLedgerStore;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,escrow_indexer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = IndexerConfig::from_env().expect("invalid configuration");

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let store = Arc::new(PgLedgerStore::new(db));
    let dispatcher = Dispatcher::new(store, Arc::new(NullPayeeReader), config.min_viable_unit);

    // Decoded events arrive as one JSON object per line on stdin; upstream
    // log decoding and chain connectivity live outside this process.
    let (tx, rx) = mpsc::channel::<ChainEvent>(256);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ChainEvent>(&line) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::error!("[feed] undecodable event: {}", e),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("[feed] read error: {}", e);
                    break;
                }
            }
        }
    });

    tracing::info!("Indexing chain {} from stdin feed", config.chain_id);
    if let Err(e) = dispatcher.run(rx).await {
        tracing::error!("Indexer halted: {}", e);
        std::process::exit(1);
    }
    reader.await.expect("feed reader panicked");
}

use std::sync::Arc;

use carebook_api::{
    config::{ApiConfig, StorageBackend},
    seed::seed_demo_accounts,
    ApiState,
};
use carebook_core::{
    clock::SystemClock,
    store::{AccountStore, AppointmentStore, ProviderDirectory},
};
use carebook_db::{
    create_pool,
    memory::{InMemoryAccountStore, InMemoryAppointmentStore, InMemoryProviderDirectory},
    repositories::{
        account::PgAccountStore, appointment::PgAppointmentStore, provider::PgProviderDirectory,
    },
    schema::initialize_database,
    seed::demo_providers,
};
use color_eyre::eyre::{eyre, Result};
use dotenv::dotenv;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;
    carebook_api::init_tracing(config.log_level)?;

    let (store, directory, accounts): (
        Arc<dyn AppointmentStore>,
        Arc<dyn ProviderDirectory>,
        Arc<dyn AccountStore>,
    ) = match config.storage {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| eyre!("DATABASE_URL is required for the postgres backend"))?;

            // Create database connection pool
            let db_pool = create_pool(database_url).await?;

            // Initialize database schema
            initialize_database(&db_pool).await?;

            let directory = PgProviderDirectory::new(db_pool.clone());
            if config.seed_demo {
                for provider in demo_providers() {
                    directory.upsert(&provider).await?;
                }
            }

            (
                Arc::new(PgAppointmentStore::new(db_pool.clone())),
                Arc::new(directory),
                Arc::new(PgAccountStore::new(db_pool)),
            )
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            let providers = if config.seed_demo {
                demo_providers()
            } else {
                Vec::new()
            };

            (
                Arc::new(InMemoryAppointmentStore::new()),
                Arc::new(InMemoryProviderDirectory::with_providers(providers)),
                Arc::new(InMemoryAccountStore::new()),
            )
        }
    };

    if config.seed_demo {
        seed_demo_accounts(accounts.as_ref()).await?;
    }

    let state = Arc::new(ApiState::new(store, directory, accounts, Arc::new(SystemClock)));

    // Start API server
    carebook_api::start_server(config, state).await?;

    Ok(())
}

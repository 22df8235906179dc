//! Loads the demo accounts through the `AccountStore` boundary.

use carebook_core::{errors::CareError, store::AccountStore};
use carebook_db::seed::{demo_accounts, DEMO_PASSWORD};
use eyre::Result;
use tracing::{debug, info};

use crate::middleware::auth::hash_password;

/// Inserts every demo account that does not exist yet; returns how many were added.
pub async fn seed_demo_accounts(accounts: &dyn AccountStore) -> Result<usize> {
    let password_hash = hash_password(DEMO_PASSWORD)?;
    let mut added = 0;

    for account in demo_accounts(&password_hash) {
        match accounts.insert_account(&account).await {
            Ok(()) => added += 1,
            Err(CareError::Conflict(_)) => {
                debug!(email = %account.email, "demo account already present");
            }
            Err(e) => return Err(eyre::eyre!("failed to seed {}: {}", account.email, e)),
        }
    }

    info!("Seeded {} demo accounts", added);
    Ok(added)
}

use async_trait::async_trait;
use carebook_core::{
    errors::{CareError, CareResult},
    models::principal::{Account, Principal},
    store::AccountStore,
};
use eyre::Result;
use sqlx::{Pool, Postgres};

use crate::{db_error, models::DbAccount, DbPool};

pub async fn get_account_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<DbAccount>> {
    let account = sqlx::query_as::<_, DbAccount>(
        r#"
        SELECT id, email, role, display_name, password_hash, created_at
        FROM accounts
        WHERE lower(email) = lower($1)
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

pub async fn create_account(pool: &Pool<Postgres>, account: &Account) -> CareResult<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO accounts (id, email, role, display_name, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&account.principal.id)
    .bind(&account.email)
    .bind(account.principal.role.as_str())
    .bind(&account.principal.display_name)
    .bind(&account.password_hash)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(CareError::Conflict(
            format!("account {} already exists", account.email),
        )),
        Err(e) => Err(db_error(e)),
    }
}

pub async fn create_session(pool: &Pool<Postgres>, token: &str, account_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (token, account_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(token)
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_session_account(pool: &Pool<Postgres>, token: &str) -> Result<Option<DbAccount>> {
    let account = sqlx::query_as::<_, DbAccount>(
        r#"
        SELECT a.id, a.email, a.role, a.display_name, a.password_hash, a.created_at
        FROM accounts a
        JOIN sessions s ON a.id = s.account_id
        WHERE s.token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

pub async fn delete_session(pool: &Pool<Postgres>, token: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE token = $1
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;

    Ok(())
}

/// `AccountStore` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: DbPool,
}

impl PgAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> CareResult<Option<Account>> {
        let row = get_account_by_email(&self.pool, email).await?;
        Ok(row.map(Account::try_from).transpose()?)
    }

    async fn insert_account(&self, account: &Account) -> CareResult<()> {
        create_account(&self.pool, account).await
    }

    async fn store_token(&self, token: &str, principal_id: &str) -> CareResult<()> {
        Ok(create_session(&self.pool, token, principal_id).await?)
    }

    async fn resolve_token(&self, token: &str) -> CareResult<Option<Principal>> {
        let row = get_session_account(&self.pool, token).await?;
        Ok(row.map(|a| a.principal()).transpose()?)
    }

    async fn revoke_token(&self, token: &str) -> CareResult<()> {
        Ok(delete_session(&self.pool, token).await?)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use carebook_core::{
    errors::CareResult,
    models::provider::Provider,
    store::ProviderDirectory,
};
use eyre::Result;
use sqlx::{Pool, Postgres};

use crate::{
    models::{DbConsultationOption, DbProvider},
    DbPool,
};

pub async fn get_provider_by_id(pool: &Pool<Postgres>, id: &str) -> Result<Option<Provider>> {
    tracing::debug!("Getting provider by id: {}", id);

    let provider = sqlx::query_as::<_, DbProvider>(
        r#"
        SELECT id, name, specialization, work_start, work_end, created_at
        FROM providers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(provider) = provider else {
        tracing::debug!("Provider not found: id={}", id);
        return Ok(None);
    };

    let options = sqlx::query_as::<_, DbConsultationOption>(
        r#"
        SELECT provider_id, kind, fee, duration_minutes
        FROM provider_consultation_types
        WHERE provider_id = $1
        ORDER BY kind ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    provider.into_provider(options).map(Some)
}

pub async fn list_providers(pool: &Pool<Postgres>) -> Result<Vec<Provider>> {
    let providers = sqlx::query_as::<_, DbProvider>(
        r#"
        SELECT id, name, specialization, work_start, work_end, created_at
        FROM providers
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, DbConsultationOption>(
        r#"
        SELECT provider_id, kind, fee, duration_minutes
        FROM provider_consultation_types
        ORDER BY kind ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut by_provider: HashMap<String, Vec<DbConsultationOption>> = HashMap::new();
    for option in options {
        by_provider
            .entry(option.provider_id.clone())
            .or_default()
            .push(option);
    }

    providers
        .into_iter()
        .map(|p| {
            let options = by_provider.remove(&p.id).unwrap_or_default();
            p.into_provider(options)
        })
        .collect()
}

/// Inserts or replaces a provider and its consultation options.
pub async fn upsert_provider(pool: &Pool<Postgres>, provider: &Provider) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO providers (id, name, specialization, work_start, work_end)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id)
        DO UPDATE SET name = $2, specialization = $3, work_start = $4, work_end = $5
        "#,
    )
    .bind(&provider.id)
    .bind(&provider.name)
    .bind(&provider.specialization)
    .bind(provider.working_hours.start)
    .bind(provider.working_hours.end)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM provider_consultation_types WHERE provider_id = $1")
        .bind(&provider.id)
        .execute(&mut *tx)
        .await?;

    for option in &provider.consultation_types {
        sqlx::query(
            r#"
            INSERT INTO provider_consultation_types (provider_id, kind, fee, duration_minutes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&provider.id)
        .bind(option.kind.as_str())
        .bind(option.fee)
        .bind(option.duration_minutes as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!("Provider upserted: id={}", provider.id);
    Ok(())
}

/// `ProviderDirectory` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgProviderDirectory {
    pool: DbPool,
}

impl PgProviderDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, provider: &Provider) -> Result<()> {
        upsert_provider(&self.pool, provider).await
    }
}

#[async_trait]
impl ProviderDirectory for PgProviderDirectory {
    async fn get(&self, provider_id: &str) -> CareResult<Option<Provider>> {
        Ok(get_provider_by_id(&self.pool, provider_id).await?)
    }

    async fn list(&self) -> CareResult<Vec<Provider>> {
        Ok(list_providers(&self.pool).await?)
    }
}

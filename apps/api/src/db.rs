use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};

use crate::template::latex::{COVER_LETTER_DOCUMENT, RESUME_PREAMBLE};

/// Current database schema version
const SCHEMA_VERSION: i32 = 1;

pub const RESUME_TEMPLATE_ID: i32 = 1;
pub const COVER_LETTER_TEMPLATE_ID: i32 = 2;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies every pending migration, each in its own transaction.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version: i32 =
        sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(version) FROM _migrations")
            .fetch_one(pool)
            .await?
            .unwrap_or(0);

    info!(current_version, target_version = SCHEMA_VERSION, "Checking database migrations");

    for version in (current_version + 1)..=SCHEMA_VERSION {
        let mut tx = pool.begin().await?;
        run_migration(&mut tx, version).await?;
        tx.commit().await?;
    }

    Ok(())
}

async fn run_migration(tx: &mut Transaction<'_, Postgres>, version: i32) -> Result<(), sqlx::Error> {
    let (name, sql) = match version {
        1 => ("initial_schema", MIGRATION_V1),
        _ => {
            warn!("Unknown migration version: {}", version);
            return Ok(());
        }
    };

    info!("Applying migration v{}: {}", version, name);

    for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement.trim()).execute(&mut **tx).await?;
    }

    if version == 1 {
        seed_templates(tx).await?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2)")
        .bind(version)
        .bind(name)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Default preambles. Bound as parameters; their text is LaTeX, not SQL.
async fn seed_templates(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    for (id, name, preamble) in [
        (RESUME_TEMPLATE_ID, "resume", RESUME_PREAMBLE),
        (COVER_LETTER_TEMPLATE_ID, "cover_letter", COVER_LETTER_DOCUMENT),
    ] {
        sqlx::query(
            "INSERT INTO document_templates (id, name, preamble) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .bind(preamble)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('document_templates', 'id'), \
         (SELECT MAX(id) FROM document_templates))",
    )
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Migration v1: templates and generated résumés
const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS document_templates (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    preamble TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS resumes (
    id BIGSERIAL PRIMARY KEY,
    company_name TEXT NOT NULL,
    job_title TEXT NOT NULL,
    job_description TEXT NOT NULL,
    sections JSONB NOT NULL,
    resume_tex TEXT NOT NULL,
    resume_pdf BYTEA NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    temperature REAL NOT NULL,
    cover_letter TEXT,
    cover_letter_pdf BYTEA,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_resumes_created_at ON resumes (created_at DESC)
"#;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

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

/// Creates the schema on startup if it does not exist yet.
///
/// `skill_aliases.alias` is the primary key: it is the database-level guarantee
/// that no two skills ever share an alias, even under concurrent approvals.
/// `applied_updates` is the idempotence guard for `apply_update` — one row per
/// PendingUpdate id that has mutated the catalog.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS skills (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            skill_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            learning_resources TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS skill_aliases (
            alias TEXT PRIMARY KEY,
            display TEXT NOT NULL,
            skill_id UUID NOT NULL REFERENCES skills(id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            salary_low BIGINT NOT NULL DEFAULT 0,
            salary_high BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS role_requirements (
            role_id UUID NOT NULL REFERENCES roles(id),
            skill_id UUID NOT NULL REFERENCES skills(id),
            weight DOUBLE PRECISION NOT NULL,
            position INT NOT NULL DEFAULT 0,
            PRIMARY KEY (role_id, skill_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS pending_updates (
            id UUID PRIMARY KEY,
            kind TEXT NOT NULL,
            payload JSONB NOT NULL,
            confidence DOUBLE PRECISION NOT NULL DEFAULT 0,
            discovery_reason TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            resolved_at TIMESTAMPTZ,
            resolved_by TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS applied_updates (
            update_id UUID PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS skill_market_stats (
            skill_id UUID PRIMARY KEY REFERENCES skills(id),
            mention_frequency DOUBLE PRECISION NOT NULL DEFAULT 0,
            last_seen TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS resume_analyses (
            id UUID PRIMARY KEY,
            filename TEXT NOT NULL,
            user_skills TEXT[] NOT NULL,
            career_matches JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ];

    for ddl in statements {
        sqlx::query(ddl).execute(pool).await?;
    }

    info!("Database schema ready");
    Ok(())
}

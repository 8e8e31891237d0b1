//! Application state

use std::sync::Arc;

use shared::models::Role;
use sqlx::PgPool;

use crate::BoxError;
use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;
use crate::db;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Loaded configuration (secrets, URLs, session lifetime)
    pub config: Arc<Config>,
    /// Rate limiter for login routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Connect, migrate and bootstrap
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let state = Self::with_pool(pool, config);
        state.bootstrap_superadmin().await?;
        Ok(state)
    }

    /// Build state around an existing pool (tests)
    pub fn with_pool(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Create the configured superadmin if the portal has none yet.
    async fn bootstrap_superadmin(&self) -> Result<(), BoxError> {
        let Some((email, password)) = &self.config.bootstrap_superadmin else {
            return Ok(());
        };

        if db::users::count_by_role(&self.pool, Role::Superadmin)
            .await
            .map_err(|e| format!("count superadmins: {e:?}"))?
            > 0 {
            return Ok(());
        }

        let hashed = crate::util::hash_password(password).map_err(|e| e.to_string())?;
        let user = db::users::create(
            &self.pool,
            &shared::util::normalize_email(email),
            &hashed,
            "Superadmin",
            Role::Superadmin,
            None,
        )
        .await
        .map_err(|e| format!("bootstrap superadmin: {e:?}"))?;

        tracing::info!(user_id = user.id, email = %user.email, "Bootstrap superadmin created");
        Ok(())
    }
}

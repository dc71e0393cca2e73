use crate::error::AppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Subscription tier of an account. Anything other than `None` means
/// unlimited usage; transitions away from `None` only happen through a
/// confirmed payment (see the subscription handlers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    None,
    Monthly,
    Yearly,
    Lifetime,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
        }
    }

    /// Parse a stored value. Unknown values downgrade to `None` (the safe
    /// direction: the account keeps only its free tier) with a warning.
    pub fn parse(value: &str) -> Self {
        match value {
            "none" => Self::None,
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            "lifetime" => Self::Lifetime,
            other => {
                tracing::warn!(value = other, "Unknown subscription state in database");
                Self::None
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A user account as read by the entitlement policy and the handlers
#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub id: String,
    pub email: Option<String>,
    pub subscription_state: SubscriptionState,
    pub calculations_used: i64,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for UserAccount {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let state: String = row.try_get("subscription_state")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            subscription_state: SubscriptionState::parse(&state),
            calculations_used: row.try_get("calculations_used")?,
            stripe_customer_id: row.try_get("stripe_customer_id")?,
            stripe_subscription_id: row.try_get("stripe_subscription_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account and its first API token. Returns the account and
    /// the plaintext token; only the token's SHA-256 hash is stored.
    pub async fn create_account(
        &self,
        email: Option<String>,
    ) -> Result<(UserAccount, String), AppError> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        let token = format!("cp_{}", Uuid::new_v4().simple());
        let token_hash = format!("{:x}", Sha256::digest(token.as_bytes()));
        let token_prefix = token.chars().take(8).collect::<String>();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, subscription_state, calculations_used, created_at, updated_at)
            VALUES (?, ?, 'none', 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::InvalidRequest("Email is already registered".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO api_tokens (token_hash, token_prefix, user_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&token_hash)
        .bind(&token_prefix)
        .bind(&id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let account = UserAccount {
            id,
            email,
            subscription_state: SubscriptionState::None,
            calculations_used: 0,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: now,
            updated_at: now,
        };

        Ok((account, token))
    }

    pub async fn get_account(&self, id: &str) -> Result<Option<UserAccount>, AppError> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, email, subscription_state, calculations_used,
                   stripe_customer_id, stripe_subscription_id, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Resolve an API token hash to its user id, if the token is valid
    pub async fn user_id_for_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<String>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT user_id
            FROM api_tokens
            WHERE token_hash = ? AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("user_id")))
    }

    /// Consume one free-tier calculation credit.
    ///
    /// A single atomic UPDATE rather than read-modify-write, so concurrent
    /// requests for the same user cannot lose increments.
    pub async fn increment_calculations_used(&self, id: &str) -> Result<(), AppError> {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET calculations_used = calculations_used + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    /// Applied by the payment boundary on confirmed purchase; the
    /// entitlement policy only ever reads the result.
    pub async fn set_subscription_state(
        &self,
        id: &str,
        state: SubscriptionState,
    ) -> Result<(), AppError> {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET subscription_state = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    pub async fn set_stripe_customer_id(
        &self,
        id: &str,
        customer_id: &str,
    ) -> Result<(), AppError> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query("UPDATE users SET stripe_customer_id = ?, updated_at = ? WHERE id = ?")
            .bind(customer_id)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_stripe_subscription_id(
        &self,
        id: &str,
        subscription_id: &str,
    ) -> Result<(), AppError> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query("UPDATE users SET stripe_subscription_id = ?, updated_at = ? WHERE id = ?")
            .bind(subscription_id)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    crate::MIGRATOR.run(&pool).await.unwrap();
    pool
}

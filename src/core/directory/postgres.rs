use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;

use super::{CallRecord, CallerProfile, ClientStore, DirectoryError, DirectoryResult};

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    phone_number: String,
    name: String,
    instructions: Option<String>,
}

/// Client store in PostgreSQL.
///
/// Reads profiles from `clients(phone_number, name, instructions)` and
/// writes announced calls to `calls(call_sid, account_sid, recipient,
/// caller, created_at)`.
#[derive(Clone)]
pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    pub async fn connect(database_url: &str) -> DirectoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| DirectoryError::Store(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    async fn find_by_phone(&self, phone_number: &str) -> DirectoryResult<Option<CallerProfile>> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT phone_number, name, instructions FROM clients WHERE phone_number = $1",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DirectoryError::Store(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        // A profile without instructions cannot personalize the agent
        match row.instructions {
            Some(instructions) if !instructions.trim().is_empty() => Ok(Some(CallerProfile {
                phone_number: row.phone_number,
                name: row.name,
                instructions,
            })),
            _ => {
                warn!(client = %row.name, "Client profile has no instructions");
                Ok(None)
            }
        }
    }

    async fn record_call(&self, record: &CallRecord) -> DirectoryResult<()> {
        sqlx::query(
            "INSERT INTO calls (call_sid, account_sid, recipient, caller, created_at) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (call_sid) DO NOTHING",
        )
        .bind(&record.call_sid)
        .bind(&record.account_sid)
        .bind(&record.recipient)
        .bind(&record.caller)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DirectoryError::Store(e.to_string()))?;
        Ok(())
    }
}

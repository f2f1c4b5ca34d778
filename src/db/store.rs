use crate::db::models::{Connection, DuePin, OauthState, Pin, PinStatus, Project};
use crate::db::schema::SQLITE_INIT;
use crate::error::BeamError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

/// Open the database (creating the file if needed) and initialize the schema.
pub async fn connect(database_url: &str) -> Result<Store, BeamError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)
        .map_err(sqlx::Error::from)?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    let store = Store::new(pool);
    store.init_schema().await?;
    Ok(store)
}

const PIN_COLUMNS: &str = "p.id, p.tenant_id, p.project_id, p.article_id, p.image_path, \
     p.title, p.description, p.alt_text, p.alternate_url, p.board_id, \
     p.status, p.previous_status, p.scheduled_at, p.published_at, \
     p.external_pin_id, p.external_pin_url, p.error_message";

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), BeamError> {
        // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ---- pins -----------------------------------------------------------

    /// Pins eligible for the scheduled dispatcher: metadata ready, due, not
    /// yet published externally. Joined with the project's connection id and
    /// the source article URL (link fallback).
    pub async fn due_pins(&self, now: DateTime<Utc>) -> Result<Vec<DuePin>, BeamError> {
        let sql = format!(
            r#"SELECT {PIN_COLUMNS}, pr.connection_id AS connection_id, a.url AS article_url
               FROM pins p
               JOIN projects pr ON pr.id = p.project_id
               LEFT JOIN articles a ON a.id = p.article_id
               WHERE p.status = 'metadata_created'
                 AND p.scheduled_at IS NOT NULL
                 AND p.scheduled_at <= ?
                 AND p.external_pin_id IS NULL
               ORDER BY p.scheduled_at, p.id"#
        );
        let rows = sqlx::query(&sql)
            .bind(now.to_rfc3339())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_due_pin).collect()
    }

    /// The manual-publish selection: the caller's own pins, joined the same
    /// way as the scheduled path so both run the identical per-pin routine.
    pub async fn pins_for_tenant(
        &self,
        pin_ids: &[String],
        tenant_id: &str,
    ) -> Result<Vec<DuePin>, BeamError> {
        if pin_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; pin_ids.len()].join(", ");
        let sql = format!(
            r#"SELECT {PIN_COLUMNS}, pr.connection_id AS connection_id, a.url AS article_url
               FROM pins p
               JOIN projects pr ON pr.id = p.project_id
               LEFT JOIN articles a ON a.id = p.article_id
               WHERE p.id IN ({placeholders}) AND p.tenant_id = ?
               ORDER BY p.id"#
        );
        let mut query = sqlx::query(&sql);
        for id in pin_ids {
            query = query.bind(id);
        }
        let rows = query.bind(tenant_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_due_pin).collect()
    }

    pub async fn pin_by_id(
        &self,
        pin_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Pin>, BeamError> {
        let sql = format!("SELECT {PIN_COLUMNS} FROM pins p WHERE p.id = ? AND p.tenant_id = ?");
        let row = sqlx::query(&sql)
            .bind(pin_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_pin).transpose()
    }

    /// Atomic publish claim. The WHERE clause re-evaluates the race-sensitive
    /// half of the eligibility predicate so a scheduled run and a manual
    /// publish cannot both take the same pin.
    pub async fn claim_for_publish(&self, pin_id: &str) -> Result<bool, BeamError> {
        let result = sqlx::query(
            r#"UPDATE pins
               SET status = 'publishing', updated_at = ?
               WHERE id = ? AND status = 'metadata_created' AND external_pin_id IS NULL"#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(pin_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Conditional completion of a claimed pin.
    pub async fn complete_publish(
        &self,
        pin_id: &str,
        external_pin_id: &str,
        external_pin_url: &str,
        published_at: DateTime<Utc>,
    ) -> Result<bool, BeamError> {
        let result = sqlx::query(
            r#"UPDATE pins
               SET status = 'published',
                   published_at = ?,
                   external_pin_id = ?,
                   external_pin_url = ?,
                   error_message = NULL,
                   updated_at = ?
               WHERE id = ? AND status = 'publishing'"#,
        )
        .bind(published_at.to_rfc3339())
        .bind(external_pin_id)
        .bind(external_pin_url)
        .bind(Utc::now().to_rfc3339())
        .bind(pin_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Conditional failure of a claimed pin. `previous_status` records where
    /// the manual reset action should return it to.
    pub async fn fail_publish(&self, pin_id: &str, message: &str) -> Result<bool, BeamError> {
        let result = sqlx::query(
            r#"UPDATE pins
               SET status = 'error',
                   error_message = ?,
                   previous_status = 'metadata_created',
                   updated_at = ?
               WHERE id = ? AND status = 'publishing'"#,
        )
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .bind(pin_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Failure for a pin that never got claimed (no connection, vault
    /// unavailable). Guarded on the unclaimed status.
    pub async fn fail_unclaimed(&self, pin_id: &str, message: &str) -> Result<bool, BeamError> {
        let result = sqlx::query(
            r#"UPDATE pins
               SET status = 'error',
                   error_message = ?,
                   previous_status = 'metadata_created',
                   updated_at = ?
               WHERE id = ? AND status = 'metadata_created'"#,
        )
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .bind(pin_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Explicit user recovery: error → previous_status, in one statement.
    pub async fn reset_pin(&self, pin_id: &str, tenant_id: &str) -> Result<bool, BeamError> {
        let result = sqlx::query(
            r#"UPDATE pins
               SET status = COALESCE(previous_status, 'draft'),
                   previous_status = NULL,
                   error_message = NULL,
                   updated_at = ?
               WHERE id = ? AND tenant_id = ? AND status = 'error'"#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(pin_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- projects -------------------------------------------------------

    pub async fn project_for_tenant(
        &self,
        project_id: &str,
        tenant_id: &str,
    ) -> Result<Option<Project>, BeamError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, connection_id FROM projects WHERE id = ? AND tenant_id = ?",
        )
        .bind(project_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| Project {
            id: r.get("id"),
            tenant_id: r.get("tenant_id"),
            connection_id: r.get("connection_id"),
        }))
    }

    pub async fn link_project_connection(
        &self,
        project_id: &str,
        connection_id: &str,
    ) -> Result<(), BeamError> {
        sqlx::query("UPDATE projects SET connection_id = ? WHERE id = ?")
            .bind(connection_id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn unlink_project_connection(&self, project_id: &str) -> Result<(), BeamError> {
        sqlx::query("UPDATE projects SET connection_id = NULL WHERE id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_projects_for_connection(
        &self,
        connection_id: &str,
    ) -> Result<i64, BeamError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM projects WHERE connection_id = ?")
                .bind(connection_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0)
    }

    // ---- connections ----------------------------------------------------

    /// Upsert keyed on `(tenant_id, account_id)`. A re-authorization of an
    /// existing account refreshes its metadata and reactivates it; a new
    /// account gets a freshly minted connection id. Returns the row either
    /// way.
    pub async fn upsert_connection(
        &self,
        tenant_id: &str,
        account_id: &str,
        username: Option<&str>,
        scope: Option<&str>,
        token_expires_at: DateTime<Utc>,
    ) -> Result<Connection, BeamError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO connections (
                id, tenant_id, account_id, username, scope,
                token_expires_at, is_active, last_error, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 1, NULL, ?, ?)
            ON CONFLICT(tenant_id, account_id) DO UPDATE SET
                username=excluded.username,
                scope=excluded.scope,
                token_expires_at=excluded.token_expires_at,
                is_active=1,
                last_error=NULL,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(tenant_id)
        .bind(account_id)
        .bind(username)
        .bind(scope)
        .bind(token_expires_at.to_rfc3339())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"SELECT id, tenant_id, account_id, username, scope,
               token_expires_at, is_active, last_error
               FROM connections WHERE tenant_id = ? AND account_id = ?"#,
        )
        .bind(tenant_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_connection(row)
    }

    pub async fn connection_by_id(&self, id: &str) -> Result<Option<Connection>, BeamError> {
        let row = sqlx::query(
            r#"SELECT id, tenant_id, account_id, username, scope,
               token_expires_at, is_active, last_error
               FROM connections WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_connection).transpose()
    }

    /// Active connections whose tokens expire inside the lookahead window.
    pub async fn connections_expiring_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Connection>, BeamError> {
        let rows = sqlx::query(
            r#"SELECT id, tenant_id, account_id, username, scope,
               token_expires_at, is_active, last_error
               FROM connections
               WHERE is_active = 1 AND token_expires_at <= ?
               ORDER BY token_expires_at"#,
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_connection).collect()
    }

    pub async fn update_connection_expiry(
        &self,
        id: &str,
        token_expires_at: DateTime<Utc>,
    ) -> Result<(), BeamError> {
        sqlx::query(
            r#"UPDATE connections
               SET token_expires_at = ?, last_error = NULL, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(token_expires_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_connection_inactive(
        &self,
        id: &str,
        last_error: &str,
    ) -> Result<(), BeamError> {
        sqlx::query(
            r#"UPDATE connections
               SET is_active = 0, last_error = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(last_error)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_connection(&self, id: &str) -> Result<(), BeamError> {
        sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- oauth states ---------------------------------------------------

    pub async fn insert_oauth_state(&self, record: &OauthState) -> Result<(), BeamError> {
        sqlx::query(
            r#"INSERT INTO oauth_states (
                state, verifier, project_id, tenant_id, user_id, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&record.state)
        .bind(&record.verifier)
        .bind(&record.project_id)
        .bind(&record.tenant_id)
        .bind(&record.user_id)
        .bind(record.created_at.to_rfc3339())
        .bind(record.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn oauth_state(&self, state: &str) -> Result<Option<OauthState>, BeamError> {
        let row = sqlx::query(
            r#"SELECT state, verifier, project_id, tenant_id, user_id, created_at, expires_at
               FROM oauth_states WHERE state = ?"#,
        )
        .bind(state)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_oauth_state).transpose()
    }

    pub async fn delete_oauth_state(&self, state: &str) -> Result<bool, BeamError> {
        let result = sqlx::query("DELETE FROM oauth_states WHERE state = ?")
            .bind(state)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired_oauth_states(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, BeamError> {
        let result = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= ?")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ---- row mapping ----------------------------------------------------

    fn row_to_pin(row: SqliteRow) -> Result<Pin, BeamError> {
        let status_str: String = row.try_get("status")?;
        let status = status_str
            .parse::<PinStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        let previous_status = row
            .try_get::<Option<String>, _>("previous_status")?
            .map(|s| s.parse::<PinStatus>().map_err(|e| sqlx::Error::Decode(e.into())))
            .transpose()?;

        Ok(Pin {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            project_id: row.try_get("project_id")?,
            article_id: row.try_get("article_id")?,
            image_path: row.try_get("image_path")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            alt_text: row.try_get("alt_text")?,
            alternate_url: row.try_get("alternate_url")?,
            board_id: row.try_get("board_id")?,
            status,
            previous_status,
            scheduled_at: Self::opt_datetime(&row, "scheduled_at")?,
            published_at: Self::opt_datetime(&row, "published_at")?,
            external_pin_id: row.try_get("external_pin_id")?,
            external_pin_url: row.try_get("external_pin_url")?,
            error_message: row.try_get("error_message")?,
        })
    }

    fn row_to_due_pin(row: SqliteRow) -> Result<DuePin, BeamError> {
        let connection_id: Option<String> = row.try_get("connection_id")?;
        let article_url: Option<String> = row.try_get("article_url")?;
        let pin = Self::row_to_pin(row)?;
        Ok(DuePin {
            pin,
            connection_id,
            article_url,
        })
    }

    fn row_to_connection(row: SqliteRow) -> Result<Connection, BeamError> {
        let is_active: i64 = row.try_get("is_active")?;
        Ok(Connection {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            account_id: row.try_get("account_id")?,
            username: row.try_get("username")?,
            scope: row.try_get("scope")?,
            token_expires_at: Self::datetime(&row, "token_expires_at")?,
            is_active: is_active != 0,
            last_error: row.try_get("last_error")?,
        })
    }

    fn row_to_oauth_state(row: SqliteRow) -> Result<OauthState, BeamError> {
        Ok(OauthState {
            state: row.try_get("state")?,
            verifier: row.try_get("verifier")?,
            project_id: row.try_get("project_id")?,
            tenant_id: row.try_get("tenant_id")?,
            user_id: row.try_get("user_id")?,
            created_at: Self::datetime(&row, "created_at")?,
            expires_at: Self::datetime(&row, "expires_at")?,
        })
    }

    fn datetime(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, BeamError> {
        let raw: String = row.try_get(column)?;
        let parsed = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);
        Ok(parsed)
    }

    fn opt_datetime(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, BeamError> {
        let raw: Option<String> = row.try_get(column)?;
        match raw {
            Some(s) => {
                let parsed = DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
                    .with_timezone(&Utc);
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }
}

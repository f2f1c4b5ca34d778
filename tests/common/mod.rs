#![allow(dead_code)]

use pinbeam::db::{Store, connect};
use sqlx::Row;
use tempfile::TempDir;

/// Fresh file-backed SQLite store; the TempDir keeps the file alive for the
/// duration of the test.
pub async fn temp_store(tag: &str) -> (Store, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let db_path = dir.path().join(format!("pinbeam-{tag}.sqlite"));
    let store = connect(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("open temp database");
    (store, dir)
}

pub async fn seed_project(store: &Store, id: &str, tenant_id: &str, connection_id: Option<&str>) {
    sqlx::query("INSERT INTO projects (id, tenant_id, connection_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(tenant_id)
        .bind(connection_id)
        .execute(store.pool())
        .await
        .expect("seed project");
}

pub async fn seed_article(store: &Store, id: &str, project_id: &str, url: &str) {
    sqlx::query("INSERT INTO articles (id, project_id, url) VALUES (?, ?, ?)")
        .bind(id)
        .bind(project_id)
        .bind(url)
        .execute(store.pool())
        .await
        .expect("seed article");
}

pub async fn seed_connection(
    store: &Store,
    id: &str,
    tenant_id: &str,
    account_id: &str,
    token_expires_at: &str,
    is_active: bool,
) {
    sqlx::query(
        r#"INSERT INTO connections
           (id, tenant_id, account_id, username, scope, token_expires_at, is_active,
            last_error, created_at, updated_at)
           VALUES (?, ?, ?, 'seeded', 'pins:write', ?, ?, NULL,
                   '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00')"#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(account_id)
    .bind(token_expires_at)
    .bind(if is_active { 1 } else { 0 })
    .execute(store.pool())
    .await
    .expect("seed connection");
}

pub struct PinSeed {
    pub id: String,
    pub tenant_id: String,
    pub project_id: String,
    pub article_id: Option<String>,
    pub image_path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub alternate_url: Option<String>,
    pub board_id: Option<String>,
    pub status: String,
    pub scheduled_at: Option<String>,
    pub published_at: Option<String>,
    pub external_pin_id: Option<String>,
}

impl Default for PinSeed {
    fn default() -> Self {
        Self {
            id: "p1".to_string(),
            tenant_id: "t1".to_string(),
            project_id: "pr1".to_string(),
            article_id: None,
            image_path: "t/p1.jpg".to_string(),
            title: Some("Seeded pin".to_string()),
            description: None,
            alt_text: None,
            alternate_url: None,
            board_id: Some("b1".to_string()),
            status: "metadata_created".to_string(),
            scheduled_at: Some("2024-01-01T00:00:00+00:00".to_string()),
            published_at: None,
            external_pin_id: None,
        }
    }
}

pub async fn seed_pin(store: &Store, seed: &PinSeed) {
    sqlx::query(
        r#"INSERT INTO pins
           (id, tenant_id, project_id, article_id, image_path, title, description,
            alt_text, alternate_url, board_id, status, previous_status, scheduled_at,
            published_at, external_pin_id, external_pin_url, error_message,
            created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, NULL, NULL,
                   '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00')"#,
    )
    .bind(&seed.id)
    .bind(&seed.tenant_id)
    .bind(&seed.project_id)
    .bind(&seed.article_id)
    .bind(&seed.image_path)
    .bind(&seed.title)
    .bind(&seed.description)
    .bind(&seed.alt_text)
    .bind(&seed.alternate_url)
    .bind(&seed.board_id)
    .bind(&seed.status)
    .bind(&seed.scheduled_at)
    .bind(&seed.published_at)
    .bind(&seed.external_pin_id)
    .execute(store.pool())
    .await
    .expect("seed pin");
}

#[derive(Debug)]
pub struct PinRow {
    pub status: String,
    pub previous_status: Option<String>,
    pub published_at: Option<String>,
    pub external_pin_id: Option<String>,
    pub external_pin_url: Option<String>,
    pub error_message: Option<String>,
}

pub async fn pin_row(store: &Store, id: &str) -> PinRow {
    let row = sqlx::query(
        r#"SELECT status, previous_status, published_at, external_pin_id,
           external_pin_url, error_message FROM pins WHERE id = ?"#,
    )
    .bind(id)
    .fetch_one(store.pool())
    .await
    .expect("fetch pin row");
    PinRow {
        status: row.get("status"),
        previous_status: row.get("previous_status"),
        published_at: row.get("published_at"),
        external_pin_id: row.get("external_pin_id"),
        external_pin_url: row.get("external_pin_url"),
        error_message: row.get("error_message"),
    }
}

#[derive(Debug)]
pub struct ConnectionRow {
    pub is_active: bool,
    pub last_error: Option<String>,
    pub token_expires_at: String,
}

pub async fn connection_row(store: &Store, id: &str) -> ConnectionRow {
    let row = sqlx::query(
        "SELECT is_active, last_error, token_expires_at FROM connections WHERE id = ?",
    )
    .bind(id)
    .fetch_one(store.pool())
    .await
    .expect("fetch connection row");
    let is_active: i64 = row.get("is_active");
    ConnectionRow {
        is_active: is_active != 0,
        last_error: row.get("last_error"),
        token_expires_at: row.get("token_expires_at"),
    }
}

pub async fn connection_count(store: &Store, id: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM connections WHERE id = ?")
        .bind(id)
        .fetch_one(store.pool())
        .await
        .expect("count connections");
    row.0
}

pub async fn oauth_state_count(store: &Store) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM oauth_states")
        .fetch_one(store.pool())
        .await
        .expect("count oauth states");
    row.0
}

pub async fn first_oauth_state(store: &Store) -> (String, String) {
    let row = sqlx::query("SELECT state, verifier FROM oauth_states LIMIT 1")
        .fetch_one(store.pool())
        .await
        .expect("fetch oauth state");
    (row.get("state"), row.get("verifier"))
}

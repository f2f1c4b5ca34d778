//! SQL DDL for initializing the publishing datastore.
//! SQLite-first design; can be adapted for other RDBMS.

/// Timestamps are RFC3339 TEXT. Tenant, project, pin and article ids are
/// opaque TEXT owned by the upstream app; connection ids are UUIDs minted
/// here. Raw OAuth tokens never land in any of these tables.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS connections (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    account_id TEXT NOT NULL,
    username TEXT NULL,
    scope TEXT NULL,
    token_expires_at TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_error TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(tenant_id, account_id)
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    connection_id TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_connection_id ON projects(connection_id);

CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    url TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pins (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    article_id TEXT NULL,
    image_path TEXT NOT NULL,
    title TEXT NULL,
    description TEXT NULL,
    alt_text TEXT NULL,
    alternate_url TEXT NULL,
    board_id TEXT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    previous_status TEXT NULL,
    scheduled_at TEXT NULL,
    published_at TEXT NULL,
    external_pin_id TEXT NULL,
    external_pin_url TEXT NULL,
    error_message TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pins_status_scheduled_at ON pins(status, scheduled_at);
CREATE INDEX IF NOT EXISTS idx_pins_tenant_id ON pins(tenant_id);

CREATE TABLE IF NOT EXISTS oauth_states (
    state TEXT PRIMARY KEY,
    verifier TEXT NOT NULL,
    project_id TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_connections_expiry ON connections(token_expires_at);
"#;

use super::Backend;

const POSTGRES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        account_key VARCHAR(255) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS people (
        id BIGSERIAL PRIMARY KEY,
        client_id BIGINT NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS people_client_id_idx ON people (client_id)",
    "CREATE INDEX IF NOT EXISTS clients_account_key_idx ON clients (account_key)",
];

const SQLITE: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        account_key VARCHAR(255) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS people_client_id_idx ON people (client_id)",
    "CREATE INDEX IF NOT EXISTS clients_account_key_idx ON clients (account_key)",
];

/// DDL for the membership tables, in creation order
pub fn statements(backend: Backend) -> &'static [&'static str] {
    match backend {
        Backend::Postgres => POSTGRES,
        Backend::Sqlite => SQLITE,
    }
}

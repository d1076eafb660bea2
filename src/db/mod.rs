use std::future::Future;

use anyhow::{Result, bail};
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{AnyPool, Executor};
use tracing::{error, info};

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{Client, ClientId, Person, PersonId};
use crate::validate::{is_email, sanitize_email, sanitize_text_field};

mod schema;

/// SQLSTATE raised by Postgres for a foreign key violation
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
/// SQLITE_CONSTRAINT_FOREIGNKEY extended result code
const SQLITE_FOREIGN_KEY_VIOLATION: &str = "787";

/// Database engine behind the connection URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            bail!("Unsupported database URL (expected postgres:// or sqlite:)")
        }
    }
}

/// Persistence operations for clients and people
pub trait MembershipStore: Send + Sync {
    /// Create the `clients` and `people` tables if they are missing
    fn initialize_schema(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn insert_client(
        &self,
        name: &str,
        email: &str,
        account_key: &str,
    ) -> impl Future<Output = Result<ClientId, StoreError>> + Send;

    /// Insert a person under `client_id`; fails with `UnknownClient` when
    /// that client does not exist
    fn insert_person(
        &self,
        name: &str,
        email: &str,
        client_id: ClientId,
    ) -> impl Future<Output = Result<PersonId, StoreError>> + Send;

    fn list_clients(&self) -> impl Future<Output = Result<Vec<Client>, StoreError>> + Send;

    fn list_people_by_client(
        &self,
        client_id: ClientId,
    ) -> impl Future<Output = Result<Vec<Person>, StoreError>> + Send;

    fn find_client_by_account_key(
        &self,
        account_key: &str,
    ) -> impl Future<Output = Result<Option<Client>, StoreError>> + Send;

    fn get_client(
        &self,
        id: ClientId,
    ) -> impl Future<Output = Result<Option<Client>, StoreError>> + Send;
}

/// Database connection pool
pub struct Database {
    pool: AnyPool,
    backend: Backend,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        Self::connect(config.database_url()).await
    }

    pub async fn connect(url: &str) -> Result<Self> {
        install_default_drivers();
        let backend = Backend::from_url(url)?;

        let mut options = AnyPoolOptions::new().max_connections(5);

        if backend == Backend::Sqlite {
            // An in-memory database lives only as long as its connection
            if url.contains(":memory:") {
                options = options
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None);
            }

            options = options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("PRAGMA foreign_keys = ON").await?;
                    Ok(())
                })
            });
        }

        let pool = options.connect(url).await?;

        Ok(Self { pool, backend })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    async fn create_tables(&self) -> Result<(), sqlx::Error> {
        for statement in schema::statements(self.backend) {
            sqlx::query(statement).execute(self.get_pool()).await?;
        }
        Ok(())
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_foreign_key_violation()
                || matches!(
                    db_err.code().as_deref(),
                    Some(PG_FOREIGN_KEY_VIOLATION) | Some(SQLITE_FOREIGN_KEY_VIOLATION)
                )
        }
        _ => false,
    }
}

impl MembershipStore for Database {
    async fn initialize_schema(&self) -> Result<(), StoreError> {
        match self.create_tables().await {
            Ok(()) => {
                info!("Membership tables ready ({:?})", self.backend);
                Ok(())
            }
            Err(e) => {
                error!("Could not create membership tables: {}", e);
                Err(StoreError::Database(e))
            }
        }
    }

    async fn insert_client(
        &self,
        name: &str,
        email: &str,
        account_key: &str,
    ) -> Result<ClientId, StoreError> {
        if !is_email(email) {
            return Err(StoreError::InvalidEmail);
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO clients (name, email, account_key)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(sanitize_text_field(name))
        .bind(sanitize_email(email))
        .bind(sanitize_text_field(account_key))
        .fetch_one(self.get_pool())
        .await
        .map_err(|e| {
            error!("Could not insert client: {}", e);
            StoreError::Database(e)
        })?;

        info!(client_id = id, "Client inserted");
        Ok(id)
    }

    async fn insert_person(
        &self,
        name: &str,
        email: &str,
        client_id: ClientId,
    ) -> Result<PersonId, StoreError> {
        if !is_email(email) {
            return Err(StoreError::InvalidEmail);
        }

        // The people.client_id foreign key rejects unknown clients in the
        // same statement as the insert
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO people (client_id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(sanitize_text_field(name))
        .bind(sanitize_email(email))
        .fetch_one(self.get_pool())
        .await;

        match result {
            Ok(id) => {
                info!(person_id = id, client_id, "Person inserted");
                Ok(id)
            }
            Err(e) if is_foreign_key_violation(&e) => Err(StoreError::UnknownClient(client_id)),
            Err(e) => {
                error!("Could not insert person: {}", e);
                Err(StoreError::Database(e))
            }
        }
    }

    async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, name, email, account_key FROM clients ORDER BY id ASC",
        )
        .fetch_all(self.get_pool())
        .await
        .map_err(|e| {
            error!("Could not list clients: {}", e);
            StoreError::Database(e)
        })?;

        Ok(clients)
    }

    async fn list_people_by_client(&self, client_id: ClientId) -> Result<Vec<Person>, StoreError> {
        let people = sqlx::query_as::<_, Person>(
            "SELECT id, client_id, name, email FROM people WHERE client_id = $1 ORDER BY id ASC",
        )
        .bind(client_id)
        .fetch_all(self.get_pool())
        .await
        .map_err(|e| {
            error!("Could not list people for client {}: {}", client_id, e);
            StoreError::Database(e)
        })?;

        Ok(people)
    }

    async fn find_client_by_account_key(
        &self,
        account_key: &str,
    ) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, name, email, account_key FROM clients WHERE account_key = $1 ORDER BY id ASC",
        )
        .bind(account_key)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, name, email, account_key FROM clients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }
}

/// Initialize the database connection pool and make sure the tables exist.
///
/// A schema failure is logged but does not stop startup.
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;
    info!("Connected to {:?} database", db.backend());

    if db.initialize_schema().await.is_err() {
        error!("Continuing without a verified schema");
    }

    Ok(db)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::keys::KeyScheme;

    #[test]
    fn backend_from_url() {
        assert_eq!(Backend::from_url("postgres://u@h/db").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_url("postgresql://u@h/db").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert!(Backend::from_url("mysql://u@h/db").is_err());
    }

    #[tokio::test]
    async fn init_survives_a_read_only_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("members.db");
        std::fs::File::create(&path).unwrap();

        let config = Config {
            database_url: format!("sqlite://{}?mode=ro", path.display()),
            secret_key: None,
            account_key_scheme: KeyScheme::default(),
        };

        let db = init(&config).await.unwrap();
        assert!(matches!(
            db.initialize_schema().await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let db = memory_db().await;
        db.initialize_schema().await.unwrap();
        assert_eq!(count(&db, "clients").await, 0);
    }

    #[tokio::test]
    async fn inserted_client_is_listed() {
        let db = memory_db().await;

        let id = db.insert_client("Acme", "a@x.com", "key-1").await.unwrap();
        assert!(id > 0);

        let clients = db.list_clients().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, id);
        assert_eq!(clients[0].name, "Acme");
        assert_eq!(clients[0].email, "a@x.com");
        assert_eq!(clients[0].account_key, "key-1");
    }

    #[tokio::test]
    async fn clients_are_listed_in_insertion_order() {
        let db = memory_db().await;

        let first = db.insert_client("Zeta", "z@x.com", "k1").await.unwrap();
        let second = db.insert_client("Alpha", "a@x.com", "k2").await.unwrap();

        let ids: Vec<_> = db.list_clients().await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn insert_client_sanitizes_fields() {
        let db = memory_db().await;

        let id = db
            .insert_client("  <b>Acme</b>   Corp ", " a@x.com ", "key")
            .await;
        // Surrounding whitespace makes the raw address invalid
        assert!(matches!(id, Err(StoreError::InvalidEmail)));

        db.insert_client("  <b>Acme</b>   Corp ", "a@x.com", " key ")
            .await
            .unwrap();
        let client = &db.list_clients().await.unwrap()[0];
        assert_eq!(client.name, "Acme Corp");
        assert_eq!(client.account_key, "key");
    }

    #[tokio::test]
    async fn malformed_email_writes_nothing() {
        let db = memory_db().await;

        let err = db.insert_client("Acme", "not-an-email", "k").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidEmail));
        assert_eq!(count(&db, "clients").await, 0);

        let client_id = db.insert_client("Acme", "a@x.com", "k").await.unwrap();
        let err = db.insert_person("Bob", "bob@", client_id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidEmail));
        assert_eq!(count(&db, "people").await, 0);
    }

    #[tokio::test]
    async fn person_for_unknown_client_is_rejected() {
        let db = memory_db().await;

        let err = db.insert_person("Bob", "b@x.com", 9999).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownClient(9999)));
        assert_eq!(count(&db, "people").await, 0);
    }

    #[tokio::test]
    async fn people_are_listed_per_client() {
        let db = memory_db().await;

        let acme = db.insert_client("Acme", "a@x.com", "k1").await.unwrap();
        let globex = db.insert_client("Globex", "g@x.com", "k2").await.unwrap();

        let bob = db.insert_person("Bob", "b@x.com", acme).await.unwrap();
        db.insert_person("Gina", "gina@x.com", globex).await.unwrap();

        let people = db.list_people_by_client(acme).await.unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].id, bob);
        assert_eq!(people[0].client_id, acme);
        assert_eq!(people[0].name, "Bob");
        assert_eq!(people[0].email, "b@x.com");
    }

    #[tokio::test]
    async fn client_without_people_lists_empty() {
        let db = memory_db().await;
        let id = db.insert_client("Acme", "a@x.com", "k").await.unwrap();

        assert!(db.list_people_by_client(id).await.unwrap().is_empty());
        assert!(db.list_people_by_client(4242).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_clients_lists_empty() {
        let db = memory_db().await;
        assert!(db.list_clients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_account_key() {
        let db = memory_db().await;
        let id = db.insert_client("Acme", "a@x.com", "secret-key").await.unwrap();

        let found = db.find_client_by_account_key("secret-key").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(id));

        assert!(db.find_client_by_account_key("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_client_by_id() {
        let db = memory_db().await;
        let id = db.insert_client("Acme", "a@x.com", "k").await.unwrap();

        assert_eq!(db.get_client(id).await.unwrap().unwrap().name, "Acme");
        assert!(db.get_client(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_client_cascades_to_people() {
        let db = memory_db().await;
        let id = db.insert_client("Acme", "a@x.com", "k").await.unwrap();
        db.insert_person("Bob", "b@x.com", id).await.unwrap();
        db.insert_person("Ann", "ann@x.com", id).await.unwrap();

        sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(db.get_pool())
            .await
            .unwrap();

        assert_eq!(count(&db, "people").await, 0);
    }
}

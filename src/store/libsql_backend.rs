//! libSQL backend for the durable tier.
//!
//! Rows live in a single `kv(key, value)` table. libsql is async while
//! [`KeyValueStore`] is not, so the connection is owned by a dedicated
//! thread running a current-thread runtime. Callers send a request over a
//! tokio channel and block on the reply.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;

use libsql::{Connection, Database, params};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::StoreError;

use super::traits::KeyValueStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

type Reply<T> = std_mpsc::Sender<Result<T, StoreError>>;

enum Request {
    Get {
        key: String,
        reply: Reply<Option<String>>,
    },
    Set {
        key: String,
        value: String,
        reply: Reply<()>,
    },
    Remove {
        key: String,
        reply: Reply<()>,
    },
}

/// Durable key-value store on a local libSQL database.
///
/// The store thread exits once the last handle is dropped.
#[derive(Debug)]
pub struct LibSqlStore {
    path: PathBuf,
    tx: mpsc::UnboundedSender<Request>,
}

impl LibSqlStore {
    /// Open (or create) a local database file and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::spawn(path)
    }

    /// Create an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::spawn(PathBuf::from(":memory:"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn spawn(path: PathBuf) -> Result<Self, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let db_path = path.clone();

        thread::Builder::new()
            .name("lead-funnel-store".to_string())
            .spawn(move || serve(db_path, rx, ready_tx))?;

        ready_rx.recv().map_err(|_| StoreError::Closed)??;
        info!(path = %path.display(), "Database opened");
        Ok(Self { path, tx })
    }

    fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Result<T, StoreError> {
        let (reply, response) = std_mpsc::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| StoreError::Closed)?;
        response.recv().map_err(|_| StoreError::Closed)?
    }
}

impl KeyValueStore for LibSqlStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.request(|reply| Request::Get {
            key: key.to_string(),
            reply,
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.request(|reply| Request::Set {
            key: key.to_string(),
            value: value.to_string(),
            reply,
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.request(|reply| Request::Remove {
            key: key.to_string(),
            reply,
        })
    }
}

// ── Store thread ────────────────────────────────────────────────────

fn serve(path: PathBuf, mut rx: mpsc::UnboundedReceiver<Request>, ready: Reply<()>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };

    runtime.block_on(async move {
        // The database handle must outlive the connection.
        let (_db, conn) = match connect(&path).await {
            Ok(opened) => {
                let _ = ready.send(Ok(()));
                opened
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        while let Some(request) = rx.recv().await {
            match request {
                Request::Get { key, reply } => {
                    let _ = reply.send(get(&conn, key).await);
                }
                Request::Set { key, value, reply } => {
                    let _ = reply.send(set(&conn, key, value).await);
                }
                Request::Remove { key, reply } => {
                    let _ = reply.send(remove(&conn, key).await);
                }
            }
        }
        debug!(path = %path.display(), "Store thread finished");
    });
}

async fn connect(path: &Path) -> Result<(Database, Connection), StoreError> {
    let db = libsql::Builder::new_local(path)
        .build()
        .await
        .map_err(|e| StoreError::Database(format!("Failed to open libSQL database: {e}")))?;

    let conn = db
        .connect()
        .map_err(|e| StoreError::Database(format!("Failed to create connection: {e}")))?;

    conn.execute(SCHEMA, ())
        .await
        .map_err(|e| StoreError::Database(format!("Failed to create kv table: {e}")))?;

    Ok((db, conn))
}

async fn get(conn: &Connection, key: String) -> Result<Option<String>, StoreError> {
    let mut rows = conn
        .query("SELECT value FROM kv WHERE key = ?1", params![key])
        .await
        .map_err(|e| StoreError::Database(format!("get: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => row
            .get::<String>(0)
            .map(Some)
            .map_err(|e| StoreError::Database(format!("get row parse: {e}"))),
        Ok(None) => Ok(None),
        Err(e) => Err(StoreError::Database(format!("get: {e}"))),
    }
}

async fn set(conn: &Connection, key: String, value: String) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .await
    .map_err(|e| StoreError::Database(format!("set: {e}")))?;
    Ok(())
}

async fn remove(conn: &Connection, key: String) -> Result<(), StoreError> {
    conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
        .await
        .map_err(|e| StoreError::Database(format!("remove: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_overwrite_remove() {
        let store = LibSqlStore::open_in_memory().unwrap();
        assert_eq!(store.get("lead_id").unwrap(), None);

        store.set("lead_id", "abc").unwrap();
        store.set("lead_id", "def").unwrap();
        assert_eq!(store.get("lead_id").unwrap().as_deref(), Some("def"));
        assert!(store.contains("lead_id").unwrap());

        store.remove("lead_id").unwrap();
        store.remove("lead_id").unwrap();
        assert_eq!(store.get("lead_id").unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/store.db");

        {
            let store = LibSqlStore::open(&path).unwrap();
            store.set("lead_id", "abc").unwrap();
            store.set("current_step", "3").unwrap();
            store.remove("current_step").unwrap();
        }

        let reopened = LibSqlStore::open(&path).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(reopened.get("lead_id").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("current_step").unwrap(), None);
    }

    #[test]
    fn json_values_round_trip_verbatim() {
        let store = LibSqlStore::open_in_memory().unwrap();
        let blob = r#"{"first_name":"José","primary_goal":"protesis"}"#;
        store.set("form_data", blob).unwrap();
        assert_eq!(store.get("form_data").unwrap().as_deref(), Some(blob));
    }

    #[test]
    fn not_a_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        std::fs::write(&path, "this is not sqlite, just some text padding it out").unwrap();

        let result = LibSqlStore::open(&path).and_then(|s| s.get("lead_id"));
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn usable_from_async_context() {
        let store = LibSqlStore::open_in_memory().unwrap();
        store.set("session_id", "s-1").unwrap();
        assert_eq!(store.get("session_id").unwrap().as_deref(), Some("s-1"));
    }
}

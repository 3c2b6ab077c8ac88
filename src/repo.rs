use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("store unavailable: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait PinRepo: Send + Sync {
    /// Create-if-absent. Returns the pin key whether or not a row was written.
    async fn create_pin(&self, new: NewPin) -> RepoResult<String>;
    async fn get_pin(&self, key: &str) -> RepoResult<Pin>;
    /// Pins ordered by `created_ts` descending, ties by key ascending.
    async fn query_pins(&self, query: &PinQuery) -> RepoResult<Vec<Pin>>;

    async fn query_all(&self, limit: usize) -> RepoResult<Vec<Pin>> {
        self.query_pins(&PinQuery::all().limit(limit)).await
    }

    async fn query_by_author(&self, author_id: &str, limit: usize) -> RepoResult<Vec<Pin>> {
        self.query_pins(&PinQuery::by_author(author_id).limit(limit)).await
    }
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, username: &str) -> RepoResult<Option<User>>;
    /// Create-if-absent. `Ok(false)` when the username is already taken.
    async fn create_user(&self, new: NewUser) -> RepoResult<bool>;
}

pub trait Repo: PinRepo + UserRepo {}

impl<T> Repo for T where T: PinRepo + UserRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};
    use tracing::{info, warn};

    fn newest_first(a: &Pin, b: &Pin) -> std::cmp::Ordering {
        b.created_ts.cmp(&a.created_ts).then_with(|| a.key.cmp(&b.key))
    }

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        pins: HashMap<String, Pin>,
        users: HashMap<String, User>,
    }

    impl State {
        fn restore_keys(mut self) -> Self {
            for (key, pin) in self.pins.iter_mut() {
                pin.key = key.clone();
            }
            self
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        /// Memory only; nothing survives the process.
        pub fn new() -> Self {
            Self::default()
        }

        /// Loads `<dir>/state.json` if present and rewrites it after every write.
        pub fn with_snapshot_dir(dir: impl AsRef<Path>) -> Self {
            let path = dir.as_ref().join("state.json");
            let state = Self::load_state_from(&path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(path)),
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!(path = %path.display(), pins = s.pins.len(), "loaded snapshot");
                        s.restore_keys()
                    }
                    Err(e) => {
                        warn!(path = %path.display(), "failed to parse snapshot: {e}; starting empty");
                        State::default()
                    }
                },
                Err(e) => {
                    info!(path = %path.display(), "no snapshot ({e}); starting empty");
                    State::default()
                }
            }
        }

        /// Writes `state` to the snapshot file. Callers hold the write lock so
        /// snapshots land in the same order as the writes they capture.
        fn persist(&self, state: &State) -> RepoResult<()> {
            let Some(path) = self.snapshot_path.as_deref() else { return Ok(()) };
            let bytes = serde_json::to_vec_pretty(state).map_err(|e| RepoError::Internal(e.to_string()))?;
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(|e| RepoError::Internal(e.to_string()))?;
            }
            std::fs::write(path, bytes).map_err(|e| RepoError::Internal(e.to_string()))
        }

        fn read(&self) -> RepoResult<std::sync::RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<std::sync::RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    #[async_trait]
    impl PinRepo for InMemRepo {
        async fn create_pin(&self, new: NewPin) -> RepoResult<String> {
            let key = new.key();
            let mut s = self.write()?;
            if s.pins.contains_key(&key) {
                return Ok(key);
            }
            s.pins.insert(key.clone(), new.into_pin());
            if let Err(e) = self.persist(&s) {
                // not durable, so a redelivery must retry the write
                s.pins.remove(&key);
                return Err(e);
            }
            Ok(key)
        }

        async fn get_pin(&self, key: &str) -> RepoResult<Pin> {
            let s = self.read()?;
            s.pins.get(key).cloned().ok_or(RepoError::NotFound)
        }

        async fn query_pins(&self, query: &PinQuery) -> RepoResult<Vec<Pin>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.pins.values()
                .filter(|p| query.matches(p))
                .cloned()
                .collect();
            v.sort_by(newest_first);
            v.truncate(query.limit);
            Ok(v)
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn get_user(&self, username: &str) -> RepoResult<Option<User>> {
            let s = self.read()?;
            Ok(s.users.get(username).cloned())
        }

        async fn create_user(&self, new: NewUser) -> RepoResult<bool> {
            let mut s = self.write()?;
            if s.users.contains_key(&new.username) {
                return Ok(false);
            }
            let user = User { username: new.username.clone(), password_hash: new.password_hash, created_at: Utc::now() };
            let username = new.username;
            s.users.insert(username.clone(), user);
            if let Err(e) = self.persist(&s) {
                s.users.remove(&username);
                return Err(e);
            }
            Ok(true)
        }
    }
}

/// Column order of the `pins` table as bound by the Postgres backend.
#[cfg_attr(not(feature = "postgres-store"), allow(dead_code))]
const PIN_COLUMNS: &str = "key, text, author_id, pinner_id, channel_id, pinned_ts, created_ts, ts, attachments";
#[cfg_attr(not(feature = "postgres-store"), allow(dead_code))]
const USER_COLUMNS: &str = "username, password_hash, created_at";

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::types::Json;
    use sqlx::{Pool, Postgres};

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> RepoResult<()> {
            sqlx::migrate!("./migrations")
                .run(&self.pool)
                .await
                .map_err(|e| RepoError::Internal(e.to_string()))
        }
    }

    fn internal(e: sqlx::Error) -> RepoError {
        RepoError::Internal(e.to_string())
    }

    #[derive(sqlx::FromRow)]
    struct PinRow {
        key: String,
        text: String,
        author_id: String,
        pinner_id: String,
        channel_id: String,
        pinned_ts: i64,
        created_ts: i64,
        ts: String,
        attachments: Json<Vec<Attachment>>,
    }

    impl From<PinRow> for Pin {
        fn from(r: PinRow) -> Self {
            Pin {
                key: r.key,
                text: r.text,
                author_id: r.author_id,
                pinner_id: r.pinner_id,
                channel_id: r.channel_id,
                pinned_ts: r.pinned_ts,
                created_ts: r.created_ts,
                ts: r.ts,
                attachments: r.attachments.0,
            }
        }
    }

    #[async_trait]
    impl PinRepo for PgRepo {
        async fn create_pin(&self, new: NewPin) -> RepoResult<String> {
            let key = new.key();
            // The primary key makes concurrent redeliveries collapse into one row.
            sqlx::query(&format!(
                "INSERT INTO pins ({PIN_COLUMNS}) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9) ON CONFLICT (key) DO NOTHING"
            ))
            .bind(&key)
            .bind(&new.text)
            .bind(&new.author_id)
            .bind(&new.pinner_id)
            .bind(&new.channel_id)
            .bind(new.pinned_ts)
            .bind(new.created_ts)
            .bind(&new.ts)
            .bind(Json(&new.attachments))
            .execute(&self.pool).await.map_err(internal)?;
            Ok(key)
        }

        async fn get_pin(&self, key: &str) -> RepoResult<Pin> {
            let row = sqlx::query_as::<_, PinRow>(&format!("SELECT {PIN_COLUMNS} FROM pins WHERE key = $1"))
                .bind(key)
                .fetch_optional(&self.pool).await.map_err(internal)?;
            row.map(Pin::from).ok_or(RepoError::NotFound)
        }

        async fn query_pins(&self, query: &PinQuery) -> RepoResult<Vec<Pin>> {
            let rows = sqlx::query_as::<_, PinRow>(&format!(
                "SELECT {PIN_COLUMNS} FROM pins \
                 WHERE ($1::text IS NULL OR author_id = $1) \
                 ORDER BY created_ts DESC, key ASC LIMIT $2"
            ))
            .bind(query.author_id.as_deref())
            .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool).await.map_err(internal)?;
            Ok(rows.into_iter().map(Pin::from).collect())
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn get_user(&self, username: &str) -> RepoResult<Option<User>> {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool).await.map_err(internal)
        }

        async fn create_user(&self, new: NewUser) -> RepoResult<bool> {
            let res = sqlx::query("INSERT INTO users (username, password_hash) VALUES ($1,$2) ON CONFLICT (username) DO NOTHING")
                .bind(&new.username)
                .bind(&new.password_hash)
                .execute(&self.pool).await.map_err(internal)?;
            Ok(res.rows_affected() == 1)
        }
    }
}

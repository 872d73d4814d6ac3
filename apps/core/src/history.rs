use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection};

/// Weight of one use recorded under exactly the typed query.
pub const EXACT_USE_WEIGHT: i64 = 10;
/// Weight of one use recorded under a longer query the typed text is a prefix of.
pub const PREFIX_USE_WEIGHT: i64 = 5;
pub const MAX_USAGE_SCORE: i32 = 200;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare history dir '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Usage history consumed by ranking.
///
/// `calc_usage_score` must never decrease as uses of a pair accumulate and
/// must stay within `0..=MAX_USAGE_SCORE`.
pub trait UsageHistory: Send + Sync {
    fn calc_usage_score(&self, query: &str, identifier: &str) -> Result<i32, HistoryError>;
    fn save(&self, query: &str, identifier: &str) -> Result<(), HistoryError>;
    fn remove(&self, identifier: &str) -> Result<(), HistoryError>;
}

pub struct SqliteHistory {
    db: Mutex<Connection>,
}

impl SqliteHistory {
    pub fn open_memory() -> Result<Self, HistoryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn open_file(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens `<data_dir>/history/<provider>.sqlite3`.
    pub fn open_for_provider(data_dir: &Path, provider: &str) -> Result<Self, HistoryError> {
        Self::open_file(&data_dir.join("history").join(format!("{provider}.sqlite3")))
    }

    fn from_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS usage (
                query TEXT NOT NULL,
                identifier TEXT NOT NULL,
                uses INTEGER NOT NULL,
                PRIMARY KEY (query, identifier)
            )",
            [],
        )?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn uses(&self, query: &str, identifier: &str) -> Result<i64, HistoryError> {
        let db = self.db.lock();
        let uses: Option<i64> = db.query_row(
            "SELECT SUM(uses) FROM usage WHERE query = ?1 AND identifier = ?2",
            params![query, identifier],
            |row| row.get(0),
        )?;
        Ok(uses.unwrap_or(0))
    }
}

impl UsageHistory for SqliteHistory {
    // An empty query scores the identifier's total use count. Otherwise exact
    // query uses count double compared to uses under longer queries that
    // start with the typed text.
    fn calc_usage_score(&self, query: &str, identifier: &str) -> Result<i32, HistoryError> {
        let db = self.db.lock();

        let weighted: i64 = if query.is_empty() {
            let total: Option<i64> = db.query_row(
                "SELECT SUM(uses) FROM usage WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )?;
            total.unwrap_or(0) * EXACT_USE_WEIGHT
        } else {
            let (exact, extended): (Option<i64>, Option<i64>) = db.query_row(
                "SELECT
                    SUM(CASE WHEN query = ?2 THEN uses ELSE 0 END),
                    SUM(CASE WHEN query <> ?2 AND substr(query, 1, length(?2)) = ?2 THEN uses ELSE 0 END)
                 FROM usage WHERE identifier = ?1",
                params![identifier, query],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            exact.unwrap_or(0) * EXACT_USE_WEIGHT + extended.unwrap_or(0) * PREFIX_USE_WEIGHT
        };

        Ok(weighted.clamp(0, MAX_USAGE_SCORE as i64) as i32)
    }

    fn save(&self, query: &str, identifier: &str) -> Result<(), HistoryError> {
        let db = self.db.lock();
        db.execute(
            "INSERT INTO usage (query, identifier, uses) VALUES (?1, ?2, 1)
             ON CONFLICT(query, identifier) DO UPDATE SET uses = uses + 1",
            params![query, identifier],
        )?;
        Ok(())
    }

    fn remove(&self, identifier: &str) -> Result<(), HistoryError> {
        let db = self.db.lock();
        db.execute("DELETE FROM usage WHERE identifier = ?1", params![identifier])?;
        Ok(())
    }
}

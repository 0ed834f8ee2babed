use crate::config::Config;
use crate::model::{Bookmark, BookmarkItem, User};
use anyhow::Result;
use libsql::{Builder, Connection};
use std::path::Path;
use tokio::sync::Mutex;

const SYSTEM_MIGRATIONS: &[(&str, &str)] = &[(
    "system/000_migrations_table.sql",
    include_str!("migrations/system/000_migrations_table.sql"),
)];

const MIGRATIONS: &[(&str, &str)] = &[("001_schema.sql", include_str!("migrations/001_schema.sql"))];

pub struct Database {
    conn: Connection,
    // libsql connections cannot nest interactive transactions; every writer
    // that opens BEGIN..COMMIT must hold this lock. Syncs for different
    // users therefore queue briefly behind each other rather than
    // interleave; SQLite allows one writer at a time anyway, and the wait
    // is bounded by the replace itself being short-lived.
    tx_lock: Mutex<()>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());
        Self::open(&path.to_string_lossy()).await
    }

    /// Opens (or creates) the database at `path` and brings the schema up
    /// to date. `":memory:"` works and is what the tests use.
    pub async fn open(path: &str) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // cascade delete of bookmarks needs foreign keys on, and a locked
        // database should fail after a bounded wait rather than hang
        conn.query("PRAGMA foreign_keys = ON", ()).await?;
        conn.query("PRAGMA busy_timeout = 5000", ()).await?;

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        Ok(Database {
            conn,
            tx_lock: Mutex::new(()),
        })
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            // before the system migration runs the table does not exist yet
            Err(e) if e.to_string().contains("no such table") => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        let record = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(record, libsql::params![name]).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Credential store
    // ------------------------------------------------------------------

    pub async fn create_user(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let query = r#"
            INSERT INTO users (name, username, email, password_hash)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, username, email, password_hash, created_at
        "#;
        let mut rows = self
            .conn
            .query(query, libsql::params![name, username, email, password_hash])
            .await?;

        if let Some(row) = rows.next().await? {
            Self::row_to_user(&row)
        } else {
            anyhow::bail!("insert into users returned no row")
        }
    }

    /// Looks a user up by username or email in one go.
    pub async fn find_user_by_identifier(&self, login: &str) -> Result<Option<User>> {
        let query = r#"
            SELECT id, name, username, email, password_hash, created_at
            FROM users
            WHERE username = ? OR email = ?
            LIMIT 1
        "#;
        let mut rows = self.conn.query(query, libsql::params![login, login]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn user_exists(&self, user_id: i64) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM users WHERE id = ?", libsql::params![user_id])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    fn row_to_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            username: row.get(2)?,
            email: row.get(3)?,
            password_hash: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    // ------------------------------------------------------------------
    // Bookmark store
    // ------------------------------------------------------------------

    /// Atomic full-replace of a user's bookmark set: delete everything the
    /// user owns, then insert the submitted items. Within-batch duplicate
    /// urls collapse via `ON CONFLICT(user_id, url) DO NOTHING`, so the
    /// first occurrence wins; any other constraint violation fails the
    /// insert. Any failure rolls the whole thing back and leaves the prior
    /// set untouched.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn replace_bookmarks(&self, user_id: i64, items: &[BookmarkItem]) -> Result<u64> {
        let _guard = self.tx_lock.lock().await;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let result = self.replace_bookmarks_internal(user_id, items).await;

        match result {
            Ok(inserted) => {
                self.conn.execute("COMMIT", ()).await?;
                Ok(inserted)
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn replace_bookmarks_internal(&self, user_id: i64, items: &[BookmarkItem]) -> Result<u64> {
        self.conn
            .execute("DELETE FROM bookmarks WHERE user_id = ?", libsql::params![user_id])
            .await?;

        // the conflict-skip must be scoped to the (user_id, url) uniqueness
        // constraint; OR IGNORE would also swallow CHECK and FK violations
        // and commit a partial batch
        let query = r#"
            INSERT INTO bookmarks (user_id, title, url)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, url) DO NOTHING
        "#;

        let mut inserted = 0;
        for item in items {
            inserted += self
                .conn
                .execute(query, libsql::params![user_id, item.title.as_str(), item.url.as_str()])
                .await?;
        }

        Ok(inserted)
    }

    pub async fn bookmarks_for_user(&self, user_id: i64) -> Result<Vec<Bookmark>> {
        let query = r#"
            SELECT id, user_id, title, url, created_at
            FROM bookmarks
            WHERE user_id = ?
            ORDER BY id
        "#;
        let mut rows = self.conn.query(query, libsql::params![user_id]).await?;

        let mut bookmarks = vec![];
        while let Some(row) = rows.next().await? {
            bookmarks.push(Bookmark {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                url: row.get(3)?,
                created_at: row.get(4)?,
            });
        }

        Ok(bookmarks)
    }
}

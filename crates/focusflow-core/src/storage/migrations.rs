//! Schema migrations.
//!
//! Versioned through the `schema_version` table and applied sequentially
//! whenever a database opens. Every step is idempotent, so re-running the
//! chain against an up-to-date file is harmless.

use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    create_schema_version_table(conn)?;
    let version = schema_version(conn);
    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id      INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

pub(crate) fn schema_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
        row.get(0)
    })
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_version (id, version) VALUES (1, ?1)
         ON CONFLICT (id) DO UPDATE SET version = ?1",
        [version],
    )?;
    Ok(())
}

/// v1: base tables.
fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL,
            coins         INTEGER NOT NULL DEFAULT 0,
            level         INTEGER NOT NULL DEFAULT 1,
            island_theme  INTEGER NOT NULL DEFAULT 1,
            focus_minutes INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS focus_sessions (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          INTEGER NOT NULL REFERENCES users (id),
            category         TEXT NOT NULL,
            started_at       TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            status           TEXT NOT NULL,
            coins_earned     INTEGER NOT NULL DEFAULT 0,
            distractions     INTEGER NOT NULL DEFAULT 0,
            kind             TEXT NOT NULL,
            difficulty       TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS virtual_assets (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            price       INTEGER NOT NULL,
            kind        TEXT NOT NULL,
            icon        TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE IF NOT EXISTS user_inventory (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id  INTEGER NOT NULL REFERENCES users (id),
            asset_id INTEGER NOT NULL REFERENCES virtual_assets (id),
            quantity INTEGER NOT NULL DEFAULT 1,
            placed   INTEGER NOT NULL DEFAULT 0,
            pos_x    REAL,
            pos_y    REAL,
            UNIQUE (user_id, asset_id)
        );
        CREATE TABLE IF NOT EXISTS app_whitelist (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER NOT NULL REFERENCES users (id),
            package_name TEXT NOT NULL,
            app_name     TEXT NOT NULL,
            category     TEXT NOT NULL,
            UNIQUE (user_id, package_name)
        );",
    )?;
    set_schema_version(conn, 1)
}

/// v2: indexes for the hot lookup paths (stats and whitelist checks).
fn migrate_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_sessions_user_status
             ON focus_sessions (user_id, status);
        CREATE INDEX IF NOT EXISTS idx_sessions_started_at
             ON focus_sessions (started_at);
        CREATE INDEX IF NOT EXISTS idx_inventory_user
             ON user_inventory (user_id);
        CREATE INDEX IF NOT EXISTS idx_whitelist_user
             ON app_whitelist (user_id, package_name);",
    )?;
    set_schema_version(conn, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_migrates_to_latest() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(schema_version(&conn), 2);

        // every table is present and writable
        conn.execute("INSERT INTO users (username) VALUES ('test')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO virtual_assets (name, price, kind) VALUES ('Tree', 10, 'Flora')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute("INSERT INTO users (username) VALUES ('keep')", [])
            .unwrap();

        migrate(&conn).unwrap();
        assert_eq!(schema_version(&conn), 2);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}

use rusqlite::{Connection, Result};

pub fn init_db(conn: &Connection) -> Result<()> {
    create_usage_table(conn)?;
    create_activity_table(conn)?;
    Ok(())
}

fn create_usage_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS daily_usage (
            user_id         TEXT NOT NULL,
            usage_date      TEXT NOT NULL,
            emails_sent     INTEGER NOT NULL DEFAULT 0,
            tickets_created INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, usage_date)
        );",
    )
}

fn create_activity_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS activity_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            event_type  TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_activity_user
            ON activity_log(user_id, created_at DESC);",
    )
}

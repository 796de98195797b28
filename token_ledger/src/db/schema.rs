//! Ledger schema, applied idempotently on startup.

/// Schema statements; every statement is `IF NOT EXISTS`
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS integrations (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    company_id  TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS players (
    integration_id  TEXT NOT NULL REFERENCES integrations (id),
    player_id       TEXT NOT NULL,
    alias           TEXT,
    created_at      TEXT NOT NULL,
    PRIMARY KEY (integration_id, player_id)
);

CREATE TABLE IF NOT EXISTS player_aliases (
    integration_id  TEXT NOT NULL,
    player_id       TEXT NOT NULL,
    alias           TEXT NOT NULL,
    PRIMARY KEY (integration_id, player_id, alias),
    FOREIGN KEY (integration_id, player_id) REFERENCES players (integration_id, player_id)
);

CREATE TABLE IF NOT EXISTS balances (
    integration_id  TEXT NOT NULL,
    player_id       TEXT NOT NULL,
    token           TEXT NOT NULL,
    amount          INTEGER NOT NULL DEFAULT 0 CHECK (amount >= 0),
    PRIMARY KEY (integration_id, player_id, token),
    FOREIGN KEY (integration_id, player_id) REFERENCES players (integration_id, player_id)
);

CREATE TABLE IF NOT EXISTS ledger_entries (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    integration_id  TEXT NOT NULL,
    player_id       TEXT NOT NULL,
    token           TEXT NOT NULL,
    amount          INTEGER NOT NULL,
    balance_after   INTEGER NOT NULL CHECK (balance_after >= 0),
    direction       TEXT NOT NULL CHECK (direction IN ('credit', 'debit')),
    memo            TEXT NOT NULL DEFAULT '',
    metadata        TEXT NOT NULL DEFAULT '{}',
    created_at      TEXT NOT NULL,
    FOREIGN KEY (integration_id, player_id) REFERENCES players (integration_id, player_id)
);

CREATE INDEX IF NOT EXISTS idx_ledger_entries_player
    ON ledger_entries (integration_id, player_id, id);
"#;

/// Columns added after the first release, as `(table, column, definition)`.
/// Applied with `ALTER TABLE` when a database created earlier lacks them.
pub const ADDED_COLUMNS: &[(&str, &str, &str)] = &[(
    "ledger_entries",
    "metadata",
    "TEXT NOT NULL DEFAULT '{}'",
)];

//! SQL schema for the lexnav SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS statutes (
    id          INTEGER PRIMARY KEY,
    slug        TEXT NOT NULL UNIQUE,
    title       TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'published',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Structural containers. order_index is shared with statute_provisions.
CREATE TABLE IF NOT EXISTS statute_divisions (
    id                  INTEGER PRIMARY KEY,
    statute_id          INTEGER NOT NULL REFERENCES statutes(id) ON DELETE CASCADE,
    slug                TEXT NOT NULL,
    parent_division_id  INTEGER REFERENCES statute_divisions(id) ON DELETE CASCADE,
    division_type       TEXT NOT NULL,
    division_number     TEXT,
    division_title      TEXT NOT NULL,
    division_subtitle   TEXT,
    content             TEXT,
    sort_order          INTEGER NOT NULL DEFAULT 0,
    level               INTEGER NOT NULL DEFAULT 1,
    status              TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'repealed' | 'amended'
    order_index         INTEGER,
    effective_date      TEXT,                            -- YYYY-MM-DD
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (statute_id, slug)
);

-- Textual units. division_id NULL means statute-level.
CREATE TABLE IF NOT EXISTS statute_provisions (
    id                   INTEGER PRIMARY KEY,
    statute_id           INTEGER NOT NULL REFERENCES statutes(id) ON DELETE CASCADE,
    slug                 TEXT NOT NULL,
    division_id          INTEGER REFERENCES statute_divisions(id) ON DELETE CASCADE,
    parent_provision_id  INTEGER REFERENCES statute_provisions(id) ON DELETE CASCADE,
    provision_type       TEXT NOT NULL,
    provision_number     TEXT,
    provision_title      TEXT,
    provision_text       TEXT,
    marginal_note        TEXT,
    interpretation_note  TEXT,
    sort_order           INTEGER NOT NULL DEFAULT 0,
    level                INTEGER NOT NULL DEFAULT 1,
    status               TEXT NOT NULL DEFAULT 'active',
    order_index          INTEGER,
    effective_date       TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    UNIQUE (statute_id, slug)
);

CREATE INDEX IF NOT EXISTS idx_divisions_order   ON statute_divisions(statute_id, order_index, status);
CREATE INDEX IF NOT EXISTS idx_divisions_parent  ON statute_divisions(parent_division_id);
CREATE INDEX IF NOT EXISTS idx_provisions_order  ON statute_provisions(statute_id, order_index, status);
CREATE INDEX IF NOT EXISTS idx_provisions_division ON statute_provisions(division_id);
CREATE INDEX IF NOT EXISTS idx_provisions_parent ON statute_provisions(parent_provision_id);

PRAGMA user_version = 1;
";

//! Database schema and migrations for Cabinet.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users and profiles
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL,
    password    TEXT NOT NULL,           -- Argon2 hash
    email       TEXT,
    role        TEXT NOT NULL DEFAULT 'member',  -- 'member', 'admin'
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    last_login  TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1
);

CREATE UNIQUE INDEX idx_users_username_nocase ON users(username COLLATE NOCASE);
CREATE INDEX idx_users_role ON users(role);

CREATE TABLE profiles (
    user_id      INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    display_name TEXT NOT NULL,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: folder hierarchy
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    parent_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Root folders have a NULL parent; IFNULL folds them into one sibling group.
CREATE UNIQUE INDEX idx_folders_sibling_name
    ON folders(owner_id, IFNULL(parent_id, 0), name);
CREATE INDEX idx_folders_parent_id ON folders(parent_id);
"#,
    // v3: file records
    r#"
CREATE TABLE files (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    owner_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    folder_id    INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    stored_path  TEXT NOT NULL,
    size         INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_owner_folder ON files(owner_id, folder_id);
CREATE INDEX idx_files_created_at ON files(created_at);
"#,
];

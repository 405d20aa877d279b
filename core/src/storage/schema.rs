//! Catalog schema and connection pragmas

pub const PRAGMAS: &str = r#"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;
    PRAGMA synchronous = NORMAL;
"#;

pub const CREATE_FILES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS files (
        fileId TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        client_path TEXT,
        server_path TEXT,
        mimeType TEXT,
        status TEXT NOT NULL DEFAULT 'stored',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_files_created ON files(created_at);
    CREATE INDEX IF NOT EXISTS idx_files_status ON files(status);
"#;

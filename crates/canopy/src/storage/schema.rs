//! `SQLite` schema definitions for canopy.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the trees table.
pub const CREATE_TREES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    botanical_name TEXT NOT NULL,
    x REAL NOT NULL,
    y REAL NOT NULL,
    canopy_dia_m REAL NOT NULL,
    co2_sequestered_kg REAL NOT NULL,
    height_m REAL,
    record_hash TEXT NOT NULL,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on `record_hash` for deduplication.
pub const CREATE_TREE_HASH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trees_hash ON trees(record_hash)
";

/// SQL statement to create an index on `botanical_name` for filtering.
pub const CREATE_TREE_SPECIES_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trees_species ON trees(botanical_name)
";

/// SQL statement to create the road segments table.
pub const CREATE_SEGMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS segments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    segment_id INTEGER NOT NULL UNIQUE,
    geometry TEXT NOT NULL,
    speed_kmh REAL
)
";

/// SQL statement to create the segment scores table.
pub const CREATE_SCORES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS segment_scores (
    segment_id INTEGER PRIMARY KEY,
    canopy_area_sq_m REAL NOT NULL,
    co2_total_kg REAL NOT NULL,
    species_count INTEGER NOT NULL,
    s_canopy REAL NOT NULL,
    s_co2 REAL NOT NULL,
    s_bio REAL NOT NULL,
    s_canopy_norm REAL NOT NULL,
    s_co2_norm REAL NOT NULL,
    s_bio_norm REAL NOT NULL,
    static_eqs REAL NOT NULL,
    serenity REAL NOT NULL
)
";

/// SQL statement to create an index on `static_eqs` for top-N queries.
pub const CREATE_SCORE_EQS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_scores_eqs ON segment_scores(static_eqs DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_TREES_TABLE,
    CREATE_TREE_HASH_INDEX,
    CREATE_TREE_SPECIES_INDEX,
    CREATE_SEGMENTS_TABLE,
    CREATE_SCORES_TABLE,
    CREATE_SCORE_EQS_INDEX,
    CREATE_METADATA_TABLE,
];

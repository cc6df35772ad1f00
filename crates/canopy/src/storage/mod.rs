//! Storage layer for canopy.
//!
//! This module provides `SQLite`-based persistent storage for tree
//! inventories, road networks, and computed segment scores, including
//! deduplication of re-submitted trees.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geometry::{Crs, Point, Polyline};
use crate::network::RoadSegment;
use crate::scoring::SegmentScores;
use crate::survey::{SurveySource, TreeRecord};

/// Metadata key holding the CRS of the ingested tree inventory.
const TREES_CRS_KEY: &str = "trees_crs";

/// Metadata key holding the CRS of the ingested road network.
const ROADS_CRS_KEY: &str = "roads_crs";

/// Which composite score to rank segments by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreRank {
    /// Static environmental quality score (vehicular).
    StaticEqs,
    /// Serenity score (pedestrian).
    Serenity,
}

/// Result of a bulk tree ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Records newly inserted.
    pub inserted: usize,
    /// Records skipped because an identical tree already exists.
    pub deduplicated: usize,
}

/// Storage engine for canopy data.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Tree insertion with deduplication
/// - Road segment upserts keyed by the dataset's segment id
/// - Persisted environmental scores with top-N queries
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Trees ===

    /// Insert a tree record.
    ///
    /// Returns the assigned ID, or `None` if the record was deduplicated
    /// (i.e., an identical tree already exists).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_tree(&self, tree: &TreeRecord) -> Result<Option<i64>> {
        if self.tree_exists_by_hash(&tree.record_hash)? {
            debug!(
                "Skipping duplicate tree with hash {}",
                &tree.record_hash[..16]
            );
            return Ok(None);
        }

        self.conn.execute(
            r"
            INSERT INTO trees
                (timestamp, botanical_name, x, y, canopy_dia_m,
                 co2_sequestered_kg, height_m, record_hash, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                tree.timestamp.to_rfc3339(),
                tree.botanical_name,
                tree.location.x,
                tree.location.y,
                tree.canopy_dia_m,
                tree.co2_sequestered_kg,
                tree.height_m,
                tree.record_hash,
                tree.source.to_string(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted tree with id {}", id);
        Ok(Some(id))
    }

    /// Insert many tree records, deduplicating as we go.
    ///
    /// The whole batch is one transaction: a failure inserts nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if any database operation fails.
    pub fn insert_trees(&self, trees: &[TreeRecord]) -> Result<IngestSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = IngestSummary {
            inserted: 0,
            deduplicated: 0,
        };
        for tree in trees {
            if self.insert_tree(tree)?.is_some() {
                summary.inserted += 1;
            } else {
                summary.deduplicated += 1;
            }
        }
        tx.commit()?;
        info!(
            inserted = summary.inserted,
            deduplicated = summary.deduplicated,
            "tree ingest finished"
        );
        Ok(summary)
    }

    /// Check if a tree with the given hash already exists.
    fn tree_exists_by_hash(&self, hash: &str) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM trees WHERE record_hash = ?1",
            [hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get all trees.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn trees(&self) -> Result<Vec<TreeRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, timestamp, botanical_name, x, y, canopy_dia_m,
                   co2_sequestered_kg, height_m, record_hash, source
            FROM trees ORDER BY id
            ",
        )?;
        let trees = stmt
            .query_map([], Self::row_to_tree)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trees)
    }

    /// Get trees of a given species.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn trees_by_species(&self, botanical_name: &str, limit: usize) -> Result<Vec<TreeRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, timestamp, botanical_name, x, y, canopy_dia_m,
                   co2_sequestered_kg, height_m, record_hash, source
            FROM trees WHERE botanical_name = ?1
            ORDER BY id LIMIT ?2
            ",
        )?;
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let trees = stmt
            .query_map(params![botanical_name, limit_i64], Self::row_to_tree)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trees)
    }

    /// Count stored trees.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn tree_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trees", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a tree by ID.
    ///
    /// Returns `true` if a tree was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_tree(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM trees WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Segments ===

    /// Insert or replace a road segment, keyed by its dataset segment id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_segment(&self, segment: &RoadSegment) -> Result<()> {
        let geometry = serde_json::to_string(&segment.geometry)?;
        self.conn.execute(
            r"
            INSERT INTO segments (segment_id, geometry, speed_kmh)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(segment_id) DO UPDATE SET
                geometry = excluded.geometry,
                speed_kmh = excluded.speed_kmh
            ",
            params![segment.segment_id, geometry, segment.speed_kmh],
        )?;
        Ok(())
    }

    /// Upsert a whole road dataset. Returns the number of segments written.
    ///
    /// # Errors
    ///
    /// Returns an error if any database operation fails.
    pub fn upsert_segments(&self, segments: &[RoadSegment]) -> Result<usize> {
        for segment in segments {
            self.upsert_segment(segment)?;
        }
        info!(segments = segments.len(), "road ingest finished");
        Ok(segments.len())
    }

    /// Get all road segments.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn segments(&self) -> Result<Vec<RoadSegment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, segment_id, geometry, speed_kmh FROM segments ORDER BY segment_id",
        )?;
        let segments = stmt
            .query_map([], Self::row_to_segment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(segments)
    }

    /// Count stored segments.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn segment_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM segments", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Scores ===

    /// Replace all persisted segment scores with a fresh scoring run.
    ///
    /// Delete and inserts run in one transaction, so a failure mid-write
    /// leaves the previous run intact.
    ///
    /// # Errors
    ///
    /// Returns an error if any database operation fails.
    pub fn save_scores(&self, scores: &[SegmentScores]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM segment_scores", [])?;
        for s in scores {
            tx.execute(
                r"
                INSERT INTO segment_scores
                    (segment_id, canopy_area_sq_m, co2_total_kg, species_count,
                     s_canopy, s_co2, s_bio,
                     s_canopy_norm, s_co2_norm, s_bio_norm,
                     static_eqs, serenity)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ",
                params![
                    s.segment_id,
                    s.canopy_area_sq_m,
                    s.co2_total_kg,
                    i64::try_from(s.species_count).unwrap_or(i64::MAX),
                    s.s_canopy,
                    s.s_co2,
                    s.s_bio,
                    s.s_canopy_norm,
                    s.s_co2_norm,
                    s.s_bio_norm,
                    s.static_eqs,
                    s.serenity,
                ],
            )?;
        }
        tx.commit()?;
        info!(segments = scores.len(), "segment scores saved");
        Ok(())
    }

    /// Get all persisted segment scores.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn scores(&self) -> Result<Vec<SegmentScores>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT segment_id, canopy_area_sq_m, co2_total_kg, species_count,
                   s_canopy, s_co2, s_bio,
                   s_canopy_norm, s_co2_norm, s_bio_norm,
                   static_eqs, serenity
            FROM segment_scores ORDER BY segment_id
            ",
        )?;
        let scores = stmt
            .query_map([], Self::row_to_scores)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(scores)
    }

    /// Get the scores for specific segment ids, erroring on unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSegment`] for ids with no persisted score.
    pub fn scores_for(&self, segment_ids: &[i64]) -> Result<Vec<SegmentScores>> {
        let mut out = Vec::with_capacity(segment_ids.len());
        for &id in segment_ids {
            let score = self
                .conn
                .query_row(
                    r"
                    SELECT segment_id, canopy_area_sq_m, co2_total_kg, species_count,
                           s_canopy, s_co2, s_bio,
                           s_canopy_norm, s_co2_norm, s_bio_norm,
                           static_eqs, serenity
                    FROM segment_scores WHERE segment_id = ?1
                    ",
                    [id],
                    Self::row_to_scores,
                )
                .optional()?
                .ok_or(Error::UnknownSegment(id))?;
            out.push(score);
        }
        Ok(out)
    }

    /// The top-N segments ranked by a composite score, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn top_segments(&self, limit: usize, rank: ScoreRank) -> Result<Vec<SegmentScores>> {
        let sql = match rank {
            ScoreRank::StaticEqs => {
                r"
                SELECT segment_id, canopy_area_sq_m, co2_total_kg, species_count,
                       s_canopy, s_co2, s_bio,
                       s_canopy_norm, s_co2_norm, s_bio_norm,
                       static_eqs, serenity
                FROM segment_scores ORDER BY static_eqs DESC LIMIT ?1
                "
            }
            ScoreRank::Serenity => {
                r"
                SELECT segment_id, canopy_area_sq_m, co2_total_kg, species_count,
                       s_canopy, s_co2, s_bio,
                       s_canopy_norm, s_co2_norm, s_bio_norm,
                       static_eqs, serenity
                FROM segment_scores ORDER BY serenity DESC LIMIT ?1
                "
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let scores = stmt
            .query_map([limit_i64], Self::row_to_scores)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(scores)
    }

    // === Metadata ===

    /// Record the CRS of the ingested tree inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_trees_crs(&self, crs: &Crs) -> Result<()> {
        self.set_metadata(TREES_CRS_KEY, crs.as_str())
    }

    /// Record the CRS of the ingested road network.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_roads_crs(&self, crs: &Crs) -> Result<()> {
        self.set_metadata(ROADS_CRS_KEY, crs.as_str())
    }

    /// The CRS of the ingested tree inventory, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn trees_crs(&self) -> Result<Option<Crs>> {
        Ok(self.get_metadata(TREES_CRS_KEY)?.map(Crs::new))
    }

    /// The CRS of the ingested road network, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn roads_crs(&self) -> Result<Option<Crs>> {
        Ok(self.get_metadata(ROADS_CRS_KEY)?.map(Crs::new))
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    // === Stats ===

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let tree_count = self.tree_count()?;
        let segment_count = self.segment_count()?;
        let scored_segments: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM segment_scores", [], |row| row.get(0))?;
        let species_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT botanical_name) FROM trees",
            [],
            |row| row.get(0),
        )?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM trees ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let newest_record = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        // Get database file size
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            tree_count,
            segment_count,
            scored_segments,
            species_count,
            newest_record,
            db_size_bytes,
        })
    }

    // === Row conversions ===

    /// Convert a database row to a `TreeRecord`.
    fn row_to_tree(row: &rusqlite::Row) -> rusqlite::Result<TreeRecord> {
        let id: i64 = row.get(0)?;
        let timestamp_str: String = row.get(1)?;
        let botanical_name: String = row.get(2)?;
        let x: f64 = row.get(3)?;
        let y: f64 = row.get(4)?;
        let canopy_dia_m: f64 = row.get(5)?;
        let co2_sequestered_kg: f64 = row.get(6)?;
        let height_m: Option<f64> = row.get(7)?;
        let record_hash: String = row.get(8)?;
        let source_str: String = row.get(9)?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        let source = match source_str.as_str() {
            "inventory" => SurveySource::Inventory,
            "photo_survey" => SurveySource::PhotoSurvey,
            "import" => SurveySource::Import,
            _ => {
                warn!("Unknown survey source: {}, defaulting to import", source_str);
                SurveySource::Import
            }
        };

        Ok(TreeRecord {
            id: Some(id),
            timestamp,
            botanical_name,
            location: Point::new(x, y),
            canopy_dia_m,
            co2_sequestered_kg,
            height_m,
            record_hash,
            source,
        })
    }

    /// Convert a database row to a `RoadSegment`.
    fn row_to_segment(row: &rusqlite::Row) -> rusqlite::Result<RoadSegment> {
        let id: i64 = row.get(0)?;
        let segment_id: i64 = row.get(1)?;
        let geometry_json: String = row.get(2)?;
        let speed_kmh: Option<f64> = row.get(3)?;

        let geometry: Polyline = serde_json::from_str(&geometry_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(RoadSegment {
            id: Some(id),
            segment_id,
            geometry,
            speed_kmh,
        })
    }

    /// Convert a database row to `SegmentScores`.
    fn row_to_scores(row: &rusqlite::Row) -> rusqlite::Result<SegmentScores> {
        let species_count: i64 = row.get(3)?;
        Ok(SegmentScores {
            segment_id: row.get(0)?,
            canopy_area_sq_m: row.get(1)?,
            co2_total_kg: row.get(2)?,
            species_count: u64::try_from(species_count).unwrap_or(0),
            s_canopy: row.get(4)?,
            s_co2: row.get(5)?,
            s_bio: row.get(6)?,
            s_canopy_norm: row.get(7)?,
            s_co2_norm: row.get(8)?,
            s_bio_norm: row.get(9)?,
            static_eqs: row.get(10)?,
            serenity: row.get(11)?,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Total number of trees stored.
    pub tree_count: i64,
    /// Total number of road segments stored.
    pub segment_count: i64,
    /// Number of segments with persisted scores.
    pub scored_segments: i64,
    /// Number of distinct species in the inventory.
    pub species_count: i64,
    /// Timestamp of the newest tree record.
    pub newest_record: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn create_test_tree(name: &str, x: f64) -> TreeRecord {
        TreeRecord::new(
            name.to_string(),
            Point::new(x, 0.0),
            10.0,
            50.0,
            SurveySource::Inventory,
        )
    }

    fn create_test_segment(segment_id: i64) -> RoadSegment {
        let line = Polyline::new(vec![
            Point::new(0.0, f64::from(i32::try_from(segment_id).unwrap())),
            Point::new(100.0, f64::from(i32::try_from(segment_id).unwrap())),
        ])
        .unwrap();
        RoadSegment::new(segment_id, line, None)
    }

    fn zero_scores(segment_id: i64, static_eqs: f64, serenity: f64) -> SegmentScores {
        SegmentScores {
            segment_id,
            canopy_area_sq_m: 0.0,
            co2_total_kg: 0.0,
            species_count: 0,
            s_canopy: 0.0,
            s_co2: 0.0,
            s_bio: 0.0,
            s_canopy_norm: 0.0,
            s_co2_norm: 0.0,
            s_bio_norm: 0.0,
            static_eqs,
            serenity,
        }
    }

    #[test]
    fn test_open_in_memory() {
        assert!(Storage::open_in_memory().is_ok());
    }

    #[test]
    fn test_insert_and_fetch_tree() {
        let storage = create_test_storage();
        let tree = create_test_tree("Ficus religiosa", 25.0);

        let id = storage.insert_tree(&tree).unwrap();
        assert!(id.is_some());

        let trees = storage.trees().unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].botanical_name, "Ficus religiosa");
        assert_eq!(trees[0].id, id);
        assert_eq!(trees[0].source, SurveySource::Inventory);
    }

    #[test]
    fn test_insert_tree_deduplication() {
        let storage = create_test_storage();
        let tree = create_test_tree("Ficus religiosa", 25.0);

        let id1 = storage.insert_tree(&tree).unwrap();
        let id2 = storage.insert_tree(&tree).unwrap();

        assert!(id1.is_some());
        assert!(id2.is_none()); // Deduplicated
        assert_eq!(storage.tree_count().unwrap(), 1);
    }

    #[test]
    fn test_insert_trees_summary() {
        let storage = create_test_storage();
        let trees = vec![
            create_test_tree("Ficus religiosa", 25.0),
            create_test_tree("Azadirachta indica", 75.0),
            create_test_tree("Ficus religiosa", 25.0), // duplicate
        ];

        let summary = storage.insert_trees(&trees).unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.deduplicated, 1);
    }

    #[test]
    fn test_insert_trees_failure_inserts_nothing() {
        let storage = create_test_storage();
        // NaN binds as NULL, violating NOT NULL on the second row.
        let mut bad = create_test_tree("Azadirachta indica", 75.0);
        bad.canopy_dia_m = f64::NAN;
        let trees = vec![create_test_tree("Ficus religiosa", 25.0), bad];

        assert!(storage.insert_trees(&trees).is_err());
        assert_eq!(storage.tree_count().unwrap(), 0);
    }

    #[test]
    fn test_trees_by_species() {
        let storage = create_test_storage();
        storage
            .insert_tree(&create_test_tree("Ficus religiosa", 25.0))
            .unwrap();
        storage
            .insert_tree(&create_test_tree("Ficus religiosa", 30.0))
            .unwrap();
        storage
            .insert_tree(&create_test_tree("Azadirachta indica", 75.0))
            .unwrap();

        let ficus = storage.trees_by_species("Ficus religiosa", 10).unwrap();
        assert_eq!(ficus.len(), 2);

        let none = storage.trees_by_species("Mangifera indica", 10).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_tree_round_trips_optional_height() {
        let storage = create_test_storage();
        let mut tree = create_test_tree("Neem", 10.0);
        tree.height_m = Some(12.5);
        storage.insert_tree(&tree).unwrap();

        let trees = storage.trees().unwrap();
        assert_eq!(trees[0].height_m, Some(12.5));
    }

    #[test]
    fn test_delete_tree() {
        let storage = create_test_storage();
        let id = storage
            .insert_tree(&create_test_tree("Neem", 10.0))
            .unwrap()
            .unwrap();

        assert!(storage.delete_tree(id).unwrap());
        assert!(!storage.delete_tree(id).unwrap());
        assert_eq!(storage.tree_count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_segment_replaces_by_segment_id() {
        let storage = create_test_storage();
        storage.upsert_segment(&create_test_segment(1)).unwrap();

        // Re-ingesting the same segment id replaces, not duplicates.
        let mut updated = create_test_segment(1);
        updated.speed_kmh = Some(40.0);
        storage.upsert_segment(&updated).unwrap();

        assert_eq!(storage.segment_count().unwrap(), 1);
        let segments = storage.segments().unwrap();
        assert_eq!(segments[0].speed_kmh, Some(40.0));
    }

    #[test]
    fn test_segments_round_trip_geometry() {
        let storage = create_test_storage();
        let segment = create_test_segment(7);
        storage.upsert_segment(&segment).unwrap();

        let segments = storage.segments().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].segment_id, 7);
        assert!((segments[0].length_m() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_upsert_segments_bulk() {
        let storage = create_test_storage();
        let segments = vec![create_test_segment(1), create_test_segment(2)];
        let written = storage.upsert_segments(&segments).unwrap();
        assert_eq!(written, 2);
        assert_eq!(storage.segment_count().unwrap(), 2);
    }

    #[test]
    fn test_save_and_fetch_scores() {
        let storage = create_test_storage();
        let scores = vec![zero_scores(1, 0.8, 0.7), zero_scores(2, 0.3, 0.4)];
        storage.save_scores(&scores).unwrap();

        let fetched = storage.scores().unwrap();
        assert_eq!(fetched.len(), 2);
        assert!((fetched[0].static_eqs - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_save_scores_replaces_previous_run() {
        let storage = create_test_storage();
        storage.save_scores(&[zero_scores(1, 0.8, 0.7)]).unwrap();
        storage.save_scores(&[zero_scores(2, 0.5, 0.5)]).unwrap();

        let fetched = storage.scores().unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].segment_id, 2);
    }

    #[test]
    fn test_save_scores_failure_keeps_previous_run() {
        let storage = create_test_storage();
        storage.save_scores(&[zero_scores(1, 0.8, 0.7)]).unwrap();

        // NaN binds as NULL and violates the NOT NULL constraint on the
        // second row, after the first row already went in.
        let bad = vec![zero_scores(2, 0.5, 0.5), zero_scores(3, f64::NAN, 0.5)];
        assert!(storage.save_scores(&bad).is_err());

        // The failed rewrite rolled back wholesale: the old run is intact
        // and no partial rows from the new one remain.
        let fetched = storage.scores().unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].segment_id, 1);
    }

    #[test]
    fn test_scores_for_unknown_segment() {
        let storage = create_test_storage();
        storage.save_scores(&[zero_scores(1, 0.8, 0.7)]).unwrap();

        let result = storage.scores_for(&[1, 99]);
        assert!(matches!(result, Err(Error::UnknownSegment(99))));
    }

    #[test]
    fn test_top_segments_by_eqs_and_serenity() {
        let storage = create_test_storage();
        storage
            .save_scores(&[
                zero_scores(1, 0.9, 0.2),
                zero_scores(2, 0.5, 0.8),
                zero_scores(3, 0.1, 0.5),
            ])
            .unwrap();

        let by_eqs = storage.top_segments(2, ScoreRank::StaticEqs).unwrap();
        assert_eq!(by_eqs.len(), 2);
        assert_eq!(by_eqs[0].segment_id, 1);
        assert_eq!(by_eqs[1].segment_id, 2);

        let by_serenity = storage.top_segments(2, ScoreRank::Serenity).unwrap();
        assert_eq!(by_serenity[0].segment_id, 2);
        assert_eq!(by_serenity[1].segment_id, 3);
    }

    #[test]
    fn test_crs_metadata_round_trip() {
        let storage = create_test_storage();
        assert!(storage.trees_crs().unwrap().is_none());

        storage.set_trees_crs(&Crs::new("EPSG:32643")).unwrap();
        storage.set_roads_crs(&Crs::new("EPSG:32643")).unwrap();

        assert_eq!(storage.trees_crs().unwrap(), Some(Crs::new("EPSG:32643")));
        assert_eq!(storage.roads_crs().unwrap(), Some(Crs::new("EPSG:32643")));

        // Re-setting overwrites.
        storage.set_trees_crs(&Crs::new("EPSG:4326")).unwrap();
        assert_eq!(storage.trees_crs().unwrap(), Some(Crs::new("EPSG:4326")));
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.tree_count, 0);
        assert_eq!(stats.segment_count, 0);
        assert_eq!(stats.scored_segments, 0);
        assert_eq!(stats.species_count, 0);
        assert!(stats.newest_record.is_none());
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        storage
            .insert_tree(&create_test_tree("Ficus religiosa", 25.0))
            .unwrap();
        storage
            .insert_tree(&create_test_tree("Azadirachta indica", 75.0))
            .unwrap();
        storage.upsert_segment(&create_test_segment(1)).unwrap();
        storage.save_scores(&[zero_scores(1, 0.5, 0.5)]).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.tree_count, 2);
        assert_eq!(stats.segment_count, 1);
        assert_eq!(stats.scored_segments, 1);
        assert_eq!(stats.species_count, 2);
        assert!(stats.newest_record.is_some());
    }

    #[test]
    fn test_open_file_based() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("canopy_test_{}.db", std::process::id()));

        let storage = Storage::open(&db_path).unwrap();
        storage
            .insert_tree(&create_test_tree("Neem", 1.0))
            .unwrap();
        assert_eq!(storage.tree_count().unwrap(), 1);
        assert_eq!(storage.path(), db_path);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = std::env::temp_dir();
        let nested_path = temp_dir.join(format!(
            "canopy_test_{}/nested/db.sqlite",
            std::process::id()
        ));

        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent.parent().unwrap());
        }
    }

    #[test]
    fn test_ingest_summary_serialize() {
        let summary = IngestSummary {
            inserted: 5,
            deduplicated: 2,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("inserted"));
        assert!(json.contains("deduplicated"));
    }
}

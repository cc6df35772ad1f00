//! Environmental scoring of road segments.
//!
//! Each road segment gets raw and normalized scores describing the tree
//! canopy around it:
//!
//! - `s_canopy`: canopy area of nearby trees over the buffer area
//! - `s_co2`: CO2 sequestered by nearby trees per meter of road
//! - `s_bio`: log-scaled count of distinct species nearby
//!
//! Raw scores are normalized by percentile rank, then combined into two
//! composites: the static environmental quality score (EQS) used for
//! vehicular routing, and the serenity score used for pedestrian routing.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ScoringConfig;
use crate::error::{Error, Result};
use crate::geometry::Crs;
use crate::network::RoadSegment;
use crate::survey::TreeRecord;

/// Raw aggregates and scores for one road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentScores {
    /// The segment these scores belong to.
    pub segment_id: i64,
    /// Summed canopy area of trees within the buffer, in square meters.
    pub canopy_area_sq_m: f64,
    /// Summed CO2 sequestered by trees within the buffer, in kilograms.
    pub co2_total_kg: f64,
    /// Number of distinct botanical names within the buffer.
    pub species_count: u64,
    /// Raw canopy cover score: canopy area / buffer area.
    pub s_canopy: f64,
    /// Raw CO2 score: total kg / segment length in meters.
    pub s_co2: f64,
    /// Raw biodiversity score: ln(1 + species count).
    pub s_bio: f64,
    /// Percentile-normalized canopy score in [0, 1].
    pub s_canopy_norm: f64,
    /// Percentile-normalized CO2 score in [0, 1].
    pub s_co2_norm: f64,
    /// Percentile-normalized biodiversity score in [0, 1].
    pub s_bio_norm: f64,
    /// Static environmental quality score for vehicular routing.
    pub static_eqs: f64,
    /// Serenity score for pedestrian and recreational routing.
    pub serenity: f64,
}

/// Check that the tree and road datasets share a projected CRS.
///
/// Re-projection is out of scope, so a mismatch is a hard error rather
/// than a quiet guess. A dataset whose CRS was never recorded passes;
/// the configured default applied at ingest time.
///
/// # Errors
///
/// Returns [`Error::CrsMismatch`] when both datasets carry a CRS and
/// they differ.
pub fn ensure_matching_crs(trees: Option<&Crs>, roads: Option<&Crs>) -> Result<()> {
    if let (Some(trees), Some(roads)) = (trees, roads) {
        if trees != roads {
            return Err(Error::CrsMismatch {
                roads: roads.to_string(),
                trees: trees.to_string(),
            });
        }
    }
    Ok(())
}

/// Compute environmental scores for every segment.
///
/// Trees and segments must already be in the same projected CRS; the
/// caller is responsible for checking (see [`ensure_matching_crs`]).
/// Segments with no trees inside their buffer score zero on all raw
/// components but still participate in normalization.
#[must_use]
pub fn score_segments(
    segments: &[RoadSegment],
    trees: &[TreeRecord],
    config: &ScoringConfig,
) -> Vec<SegmentScores> {
    let buffer = config.buffer_meters;
    info!(
        segments = segments.len(),
        trees = trees.len(),
        buffer_m = buffer,
        "scoring road segments"
    );

    // Buffer join and per-segment aggregation, parallel over segments.
    let mut scores: Vec<SegmentScores> = segments
        .par_iter()
        .map(|segment| aggregate_segment(segment, trees, buffer))
        .collect();

    // Percentile-rank normalization across the whole network.
    let canopy_norm = percentile_ranks(&scores.iter().map(|s| s.s_canopy).collect::<Vec<_>>());
    let co2_norm = percentile_ranks(&scores.iter().map(|s| s.s_co2).collect::<Vec<_>>());
    let bio_norm = percentile_ranks(&scores.iter().map(|s| s.s_bio).collect::<Vec<_>>());

    for (i, score) in scores.iter_mut().enumerate() {
        score.s_canopy_norm = canopy_norm[i];
        score.s_co2_norm = co2_norm[i];
        score.s_bio_norm = bio_norm[i];
        score.static_eqs = config.eqs_canopy_weight * score.s_canopy_norm
            + config.eqs_co2_weight * score.s_co2_norm
            + config.eqs_bio_weight * score.s_bio_norm;
        score.serenity = config.serenity_canopy_weight * score.s_canopy_norm
            + config.serenity_bio_weight * score.s_bio_norm;
        debug!(
            segment_id = score.segment_id,
            static_eqs = score.static_eqs,
            serenity = score.serenity,
            "segment scored"
        );
    }

    scores
}

/// Aggregate the trees within one segment's buffer into raw scores.
#[allow(clippy::cast_precision_loss)]
fn aggregate_segment(segment: &RoadSegment, trees: &[TreeRecord], buffer: f64) -> SegmentScores {
    let mut canopy_area = 0.0;
    let mut co2_total = 0.0;
    let mut species: HashSet<&str> = HashSet::new();

    for tree in trees {
        if segment.distance_to(&tree.location) <= buffer {
            canopy_area += tree.canopy_area_sq_m();
            co2_total += tree.co2_sequestered_kg;
            species.insert(tree.botanical_name.as_str());
        }
    }

    let length_m = segment.length_m();
    let buffer_area = segment.geometry.buffer_area(buffer);
    let species_count = species.len() as u64;

    SegmentScores {
        segment_id: segment.segment_id,
        canopy_area_sq_m: canopy_area,
        co2_total_kg: co2_total,
        species_count,
        s_canopy: if buffer_area > 0.0 {
            canopy_area / buffer_area
        } else {
            0.0
        },
        s_co2: if length_m > 0.0 {
            co2_total / length_m
        } else {
            0.0
        },
        // ln(1 + n) keeps single-species segments from dominating.
        s_bio: (species_count as f64).ln_1p(),
        s_canopy_norm: 0.0,
        s_co2_norm: 0.0,
        s_bio_norm: 0.0,
        static_eqs: 0.0,
        serenity: 0.0,
    }
}

/// Percentile ranks in (0, 1], averaging ties.
///
/// Matches pandas `rank(pct=True)`: each value's rank is the average
/// ordinal rank of its tie group, divided by the number of values.
/// Tie groups are exact equality; a value strictly above another must
/// never share its group, or ranks can exceed 1.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let n_f = n as f64;
    values
        .iter()
        .map(|&v| {
            let less = values.iter().filter(|&&o| o < v).count();
            let equal = values.iter().filter(|&&o| o == v).count();
            let avg_rank = less as f64 + (equal as f64 + 1.0) / 2.0;
            avg_rank / n_f
        })
        .collect()
}

//! Eco-routing over the ingested road network.
//!
//! Segments become edges of an undirected graph whose nodes are their
//! millimeter-quantized endpoints. Each edge is weighted by the segment's
//! holistic cost, so Dijkstra finds the route with the lowest combined
//! distance, emissions, and (negated) environmental reward.

pub mod emission;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::network::RoadSegment;
use crate::scoring::SegmentScores;

pub use emission::{analyze_route, emission_factor_g_per_km, CostBreakdown};

/// Assumed pedestrian speed in km/h.
const WALKING_SPEED_KMH: f64 = 5.0;

/// What the route optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteProfile {
    /// Vehicular routing: rewards static EQS, pays emissions.
    #[default]
    Vehicle,
    /// Pedestrian routing: rewards serenity, no emissions term.
    Pedestrian,
}

impl std::fmt::Display for RouteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vehicle => write!(f, "vehicle"),
            Self::Pedestrian => write!(f, "pedestrian"),
        }
    }
}

/// A computed route with its holistic cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Segment ids in traversal order.
    pub segment_ids: Vec<i64>,
    /// Total length in kilometers.
    pub length_km: f64,
    /// Estimated travel time in minutes.
    pub time_min: f64,
    /// The profile the route was computed for.
    pub profile: RouteProfile,
    /// Cost components of the route.
    pub breakdown: CostBreakdown,
}

/// The routable road network: segments, their scores, and the graph.
#[derive(Debug)]
pub struct RoadNetwork {
    segments: Vec<RoadSegment>,
    scores: HashMap<i64, SegmentScores>,
    config: RoutingConfig,
    /// adjacency[node] = (segment index, neighbor node)
    adjacency: Vec<Vec<(usize, usize)>>,
    /// endpoints[segment index] = (node a, node b)
    endpoints: Vec<(usize, usize)>,
}

impl RoadNetwork {
    /// Build the network graph from segments and their scores.
    ///
    /// Segments sharing a (quantized) endpoint become adjacent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyNetwork`] when no segments are given and
    /// [`Error::NotScored`] when no scores are given.
    pub fn new(
        segments: Vec<RoadSegment>,
        scores: Vec<SegmentScores>,
        config: RoutingConfig,
    ) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::EmptyNetwork);
        }
        if scores.is_empty() {
            return Err(Error::NotScored);
        }

        let scores: HashMap<i64, SegmentScores> =
            scores.into_iter().map(|s| (s.segment_id, s)).collect();

        let mut node_ids: HashMap<(i64, i64), usize> = HashMap::new();
        let mut adjacency: Vec<Vec<(usize, usize)>> = Vec::new();
        let mut endpoints = Vec::with_capacity(segments.len());

        for (idx, segment) in segments.iter().enumerate() {
            let (ka, kb) = segment.endpoint_keys();
            let a = *node_ids.entry(ka).or_insert_with(|| {
                adjacency.push(Vec::new());
                adjacency.len() - 1
            });
            let b = *node_ids.entry(kb).or_insert_with(|| {
                adjacency.push(Vec::new());
                adjacency.len() - 1
            });
            adjacency[a].push((idx, b));
            adjacency[b].push((idx, a));
            endpoints.push((a, b));

            if !scores.contains_key(&segment.segment_id) {
                warn!(
                    segment_id = segment.segment_id,
                    "segment has no environmental score; treating as zero"
                );
            }
        }

        info!(
            segments = segments.len(),
            nodes = adjacency.len(),
            "road network graph built"
        );

        Ok(Self {
            segments,
            scores,
            config,
            adjacency,
            endpoints,
        })
    }

    /// Number of segments in the network.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The environmental score a profile rewards, zero when unscored.
    fn eco_score(&self, segment: &RoadSegment, profile: RouteProfile) -> f64 {
        self.scores
            .get(&segment.segment_id)
            .map_or(0.0, |s| match profile {
                RouteProfile::Vehicle => s.static_eqs,
                RouteProfile::Pedestrian => s.serenity,
            })
    }

    /// Traversal speed for a segment under a profile, in km/h.
    fn segment_speed(&self, segment: &RoadSegment, profile: RouteProfile) -> f64 {
        match profile {
            RouteProfile::Vehicle => segment
                .speed_kmh
                .unwrap_or(self.config.default_speed_kmh)
                .max(emission::MIN_SPEED_KMH),
            RouteProfile::Pedestrian => WALKING_SPEED_KMH,
        }
    }

    /// Holistic cost of traversing one segment.
    ///
    /// Because the reward weight is validated to be below the distance
    /// weight and scores are in [0, 1], the cost is always positive, so
    /// Dijkstra's non-negativity requirement holds.
    fn edge_cost(&self, segment_idx: usize, profile: RouteProfile) -> f64 {
        let segment = &self.segments[segment_idx];
        let len_km = segment.length_km();
        let eco = self.eco_score(segment, profile);
        let reward = self.config.eco_weight * eco * len_km;
        let distance_cost = self.config.distance_weight * len_km;

        match profile {
            RouteProfile::Vehicle => {
                let speed = self.segment_speed(segment, profile);
                let emissions_kg =
                    emission_factor_g_per_km(speed, &self.config) * len_km / 1000.0;
                distance_cost + self.config.emissions_weight * emissions_kg - reward
            }
            RouteProfile::Pedestrian => distance_cost - reward,
        }
    }

    /// Index of the segment nearest to a point.
    fn nearest_segment(&self, p: &Point) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (idx, segment) in self.segments.iter().enumerate() {
            let d = segment.distance_to(p);
            if d < best_dist {
                best_dist = d;
                best = idx;
            }
        }
        best
    }

    /// Find the lowest-holistic-cost route between two points.
    ///
    /// The points are snapped to their nearest segments; the search runs
    /// from the endpoint of the start segment closest to `from` to the
    /// endpoint of the goal segment closest to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RouteNotFound`] when the snapped endpoints are
    /// not connected.
    pub fn find_route(&self, from: Point, to: Point, profile: RouteProfile) -> Result<Route> {
        let from_idx = self.nearest_segment(&from);
        let to_idx = self.nearest_segment(&to);
        debug!(
            from_segment = self.segments[from_idx].segment_id,
            to_segment = self.segments[to_idx].segment_id,
            %profile,
            "routing"
        );

        if from_idx == to_idx {
            return Ok(self.assemble_route(vec![from_idx], profile));
        }

        let source = self.closer_endpoint(from_idx, &from);
        let target = self.closer_endpoint(to_idx, &to);
        if source == target {
            // The snapped segments meet at a shared intersection.
            return Ok(self.assemble_route(vec![from_idx, to_idx], profile));
        }

        let path = self.dijkstra(source, target, profile).ok_or_else(|| {
            Error::RouteNotFound {
                from: self.segments[from_idx].segment_id,
                to: self.segments[to_idx].segment_id,
            }
        })?;

        Ok(self.assemble_route(path, profile))
    }

    /// The endpoint node of a segment closer to a point.
    fn closer_endpoint(&self, segment_idx: usize, p: &Point) -> usize {
        let segment = &self.segments[segment_idx];
        let (a, b) = self.endpoints[segment_idx];
        let da = segment.geometry.start().distance(p);
        let db = segment.geometry.end().distance(p);
        if da <= db {
            a
        } else {
            b
        }
    }

    /// Dijkstra from `source` to `target`; returns the segment indexes
    /// of the path, or `None` when the nodes are disconnected.
    fn dijkstra(&self, source: usize, target: usize, profile: RouteProfile) -> Option<Vec<usize>> {
        let n = self.adjacency.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<(usize, usize)>> = vec![None; n]; // (segment, node)
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(State {
            cost: 0.0,
            node: source,
        });

        while let Some(State { cost, node }) = heap.pop() {
            if node == target {
                break;
            }
            if cost > dist[node] {
                continue;
            }
            for &(segment_idx, next) in &self.adjacency[node] {
                let next_cost = cost + self.edge_cost(segment_idx, profile);
                if next_cost < dist[next] {
                    dist[next] = next_cost;
                    prev[next] = Some((segment_idx, node));
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
            }
        }

        if dist[target].is_infinite() {
            return None;
        }

        // Walk back from the target.
        let mut path = Vec::new();
        let mut node = target;
        while let Some((segment_idx, parent)) = prev[node] {
            path.push(segment_idx);
            node = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Build the final `Route` from a list of segment indexes.
    fn assemble_route(&self, path: Vec<usize>, profile: RouteProfile) -> Route {
        let mut length_km = 0.0;
        let mut time_min = 0.0;
        let mut eco_scores = Vec::with_capacity(path.len());
        let mut segment_ids = Vec::with_capacity(path.len());

        for &idx in &path {
            let segment = &self.segments[idx];
            let len_km = segment.length_km();
            length_km += len_km;
            time_min += len_km / self.segment_speed(segment, profile) * 60.0;
            eco_scores.push(self.eco_score(segment, profile));
            segment_ids.push(segment.segment_id);
        }

        let breakdown = match profile {
            RouteProfile::Vehicle => {
                analyze_route(&eco_scores, length_km, time_min, &self.config)
            }
            RouteProfile::Pedestrian => pedestrian_breakdown(&eco_scores, length_km, &self.config),
        };

        Route {
            segment_ids,
            length_km,
            time_min,
            profile,
            breakdown,
        }
    }
}

/// Holistic cost for a walked route: no emissions term.
fn pedestrian_breakdown(
    eco_scores: &[f64],
    length_km: f64,
    config: &RoutingConfig,
) -> CostBreakdown {
    #[allow(clippy::cast_precision_loss)]
    let avg_eco_score = if eco_scores.is_empty() {
        0.0
    } else {
        eco_scores.iter().sum::<f64>() / eco_scores.len() as f64
    };
    let distance_cost = config.distance_weight * length_km;
    let environmental_reward = config.eco_weight * avg_eco_score * length_km;

    CostBreakdown {
        holistic_cost: distance_cost - environmental_reward,
        avg_eco_score,
        avg_speed_kmh: WALKING_SPEED_KMH,
        total_emissions_kg: 0.0,
        distance_cost,
        emissions_cost: 0.0,
        environmental_reward,
    }
}

/// Priority-queue entry; ordered so the heap pops the cheapest node first.
#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    cost: f64,
    node: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; costs are finite by construction.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

//! Vehicle emission model and holistic route cost.
//!
//! The emission factor is a U-shaped heuristic over average speed: high
//! emissions at low speed (congestion) and at high speed (aerodynamic
//! drag), with a minimum at moderate cruising speeds.

use serde::{Deserialize, Serialize};

use crate::config::RoutingConfig;

/// Minimum speed used by the emission model, in km/h.
///
/// Speeds below this are clamped up so the congestion term stays finite.
pub const MIN_SPEED_KMH: f64 = 1.0;

/// Heuristic vehicle emission factor in grams of CO2 per kilometer.
///
/// `k1 + k2/v + k3*v^2` with the speed clamped to at least
/// [`MIN_SPEED_KMH`].
#[must_use]
pub fn emission_factor_g_per_km(speed_kmh: f64, config: &RoutingConfig) -> f64 {
    let v = speed_kmh.max(MIN_SPEED_KMH);
    let congestion_term = config.emission_k2 / v;
    let drag_term = config.emission_k3 * v * v;
    config.emission_k1 + congestion_term + drag_term
}

/// The holistic cost of a route, with its components.
///
/// Lower is better. The cost rewards green segments and penalizes
/// distance and emissions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Total holistic cost: distance + emissions - reward.
    pub holistic_cost: f64,
    /// Mean environmental score of the route's segments.
    pub avg_eco_score: f64,
    /// Average speed over the route in km/h.
    pub avg_speed_kmh: f64,
    /// Total emissions over the route in kilograms.
    pub total_emissions_kg: f64,
    /// Weighted distance component.
    pub distance_cost: f64,
    /// Weighted emissions component.
    pub emissions_cost: f64,
    /// Weighted environmental reward (subtracted).
    pub environmental_reward: f64,
}

/// Analyze a route's holistic cost from its aggregate properties.
///
/// `eco_scores` are the environmental scores of the segments making up
/// the route (static EQS for vehicles). The reward is scaled by route
/// length, so a green detour can beat a short grey route.
#[must_use]
pub fn analyze_route(
    eco_scores: &[f64],
    route_length_km: f64,
    route_time_min: f64,
    config: &RoutingConfig,
) -> CostBreakdown {
    let avg_speed_kmh = if route_time_min > 0.0 {
        route_length_km / (route_time_min / 60.0)
    } else {
        0.0
    };
    let emissions_g_per_km = emission_factor_g_per_km(avg_speed_kmh, config);
    let total_emissions_kg = emissions_g_per_km * route_length_km / 1000.0;

    let distance_cost = config.distance_weight * route_length_km;
    let emissions_cost = config.emissions_weight * total_emissions_kg;

    #[allow(clippy::cast_precision_loss)]
    let avg_eco_score = if eco_scores.is_empty() {
        0.0
    } else {
        eco_scores.iter().sum::<f64>() / eco_scores.len() as f64
    };
    let environmental_reward = config.eco_weight * avg_eco_score * route_length_km;

    CostBreakdown {
        holistic_cost: distance_cost + emissions_cost - environmental_reward,
        avg_eco_score,
        avg_speed_kmh,
        total_emissions_kg,
        distance_cost,
        emissions_cost,
        environmental_reward,
    }
}

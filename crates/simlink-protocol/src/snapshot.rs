//! Simulation snapshot data model
//!
//! Mirrors the backend's JSON feed (camelCase field names). A snapshot is a
//! point-in-time capture of the simulated world; it is never mutated after
//! construction, each inbound frame produces a fresh value.

use serde::{Deserialize, Serialize};

/// A moving entity in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    /// World position as `[x, y]`.
    pub position: [f64; 2],
    /// Heading in degrees.
    pub heading: f64,
    pub speed: f64,
    /// Vehicle category (passenger, bus, ...).
    #[serde(default)]
    pub kind: String,
}

/// A signal controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLight {
    pub id: String,
    /// Discrete signal state string (e.g. "GrYr").
    pub state: String,
    /// Index of the active phase in the running program.
    pub phase: u32,
    /// Name of the running signal program.
    #[serde(default)]
    pub program: String,
}

/// Aggregate flow summary for the monitored intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficFlow {
    /// Per-direction queue lengths.
    pub queues: Vec<u32>,
    /// Currently active phase index.
    pub phase: u32,
    /// Simulation time of the measurement.
    pub timestamp: f64,
}

/// Aggregate environmental summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    /// PM2.5 concentration in µg/m³.
    pub pm25: f64,
    /// Simulation time of the measurement.
    pub timestamp: f64,
}

/// The latest decoded state of the simulated world.
///
/// Entity lists may be absent from a frame; they decode as empty rather than
/// failing the whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSnapshot {
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLight>,
    pub traffic_flow: TrafficFlow,
    pub air_quality: AirQuality,
    /// Scalar feedback score from the control policy, when one is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_decodes_camel_case_fields() {
        let json = r#"{
            "vehicles": [
                {"id": "v1", "position": [10.5, -3.0], "heading": 90.0, "speed": 13.9, "kind": "passenger"}
            ],
            "trafficLights": [
                {"id": "tl0", "state": "GrYr", "phase": 2, "program": "adaptive"}
            ],
            "trafficFlow": {"queues": [3, 5], "phase": 0, "timestamp": 120.0},
            "airQuality": {"pm25": 12.4, "timestamp": 120.0},
            "reward": -0.5
        }"#;

        let snapshot: SimulationSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.vehicles.len(), 1);
        assert_eq!(snapshot.vehicles[0].position, [10.5, -3.0]);
        assert_eq!(snapshot.traffic_lights[0].phase, 2);
        assert_eq!(snapshot.traffic_flow.queues, vec![3, 5]);
        assert_eq!(snapshot.air_quality.pm25, 12.4);
        assert_eq!(snapshot.reward, Some(-0.5));
    }

    #[test]
    fn snapshot_tolerates_missing_entity_lists() {
        let json = r#"{
            "trafficFlow": {"queues": [0, 0], "phase": 1, "timestamp": 5.0},
            "airQuality": {"pm25": 8.1, "timestamp": 5.0}
        }"#;

        let snapshot: SimulationSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.vehicles.is_empty());
        assert!(snapshot.traffic_lights.is_empty());
        assert_eq!(snapshot.reward, None);
    }

    #[test]
    fn snapshot_rejects_missing_flow_summary() {
        let json = r#"{"airQuality": {"pm25": 8.1, "timestamp": 5.0}}"#;
        assert!(serde_json::from_str::<SimulationSnapshot>(json).is_err());
    }
}

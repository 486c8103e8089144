//! Wire-frame fixtures

use serde_json::json;

/// A well-formed `state-update` frame with the given flow and air readings.
pub fn snapshot_frame(queues: &[u32], phase: u32, pm25: f64, timestamp: u64) -> String {
    json!({
        "type": "state-update",
        "data": {
            "vehicles": [],
            "trafficLights": [],
            "trafficFlow": {"queues": queues, "phase": phase, "timestamp": timestamp as f64},
            "airQuality": {"pm25": pm25, "timestamp": timestamp as f64},
        },
        "timestamp": timestamp,
    })
    .to_string()
}

/// An `error` frame carrying a backend-reported message.
pub fn error_frame(message: &str) -> String {
    json!({
        "type": "error",
        "data": {"message": message},
        "timestamp": 0,
    })
    .to_string()
}

/// A `connection` status notice.
pub fn connection_frame(status: &str, client_id: &str) -> String {
    json!({
        "type": "connection",
        "data": {"status": status, "clientId": client_id},
        "timestamp": 0,
    })
    .to_string()
}

//! Push feed wire format
//!
//! One frame is one partial snapshot of fleet state. Fields decode
//! independently: a field that fails to decode becomes a contained merge
//! fault while the rest of the frame still applies.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use muster_core::fleet::{Detection, DroneInstance, Field, RoutePlan, TelemetrySample, Waypoint};
use muster_core::reconcile::{FleetUpdate, MergeFault};
use muster_core::waypoint::fill_positional_names;

/// A raw push frame as sent by the backend
///
/// Every field is kept as untyped JSON until [`decode`] so that one
/// malformed field cannot reject the whole frame.
///
/// [`decode`]: FeedFrame::decode
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedFrame {
    pub drones: Option<Value>,
    pub detections: Option<Value>,
    pub route_plan: Option<Value>,
    pub waypoints: Option<Value>,
    pub ai_advice: Option<Value>,
    pub telemetry: Option<Value>,
}

fn decode_field<T: DeserializeOwned>(
    value: Value,
    field: Field,
    faults: &mut Vec<MergeFault>,
) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            faults.push(MergeFault {
                field,
                reason: err.to_string(),
            });
            None
        }
    }
}

impl FeedFrame {
    /// Parse one frame from the wire
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Decode every present field into a typed update
    ///
    /// Waypoints must already carry ids; missing names are filled by
    /// position, so decoding the same frame twice yields identical values.
    pub fn decode(self) -> (FleetUpdate, Vec<MergeFault>) {
        let mut update = FleetUpdate::default();
        let mut faults = Vec::new();

        if let Some(value) = self.drones {
            if let Some(drones) =
                decode_field::<Vec<DroneInstance>>(value, Field::Drones, &mut faults)
            {
                update = update.with_drones(drones);
            }
        }
        if let Some(value) = self.detections {
            if let Some(detections) =
                decode_field::<Vec<Detection>>(value, Field::Detections, &mut faults)
            {
                update = update.with_detections(detections);
            }
        }
        if let Some(value) = self.route_plan {
            if let Some(route_plan) =
                decode_field::<RoutePlan>(value, Field::RoutePlan, &mut faults)
            {
                update = update.with_route_plan(route_plan);
            }
        }
        if let Some(value) = self.waypoints {
            if let Some(mut waypoints) =
                decode_field::<Vec<Waypoint>>(value, Field::Waypoints, &mut faults)
            {
                fill_positional_names(&mut waypoints);
                update = update.with_waypoints(waypoints);
            }
        }
        if let Some(value) = self.ai_advice {
            if let Some(advice) = decode_field::<String>(value, Field::Advice, &mut faults) {
                update = update.with_advice(advice);
            }
        }
        if let Some(value) = self.telemetry {
            if let Some(telemetry) =
                decode_field::<TelemetrySample>(value, Field::Telemetry, &mut faults)
            {
                update = update.with_telemetry(telemetry);
            }
        }

        (update, faults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_frame_decodes_every_field() {
        let text = json!({
            "drones": [{"id": "d1", "name": "D1", "status": "ready", "battery": 92.0}],
            "detections": [{"label": "kangaroo", "confidence": 0.87}],
            "routePlan": {"waypoints": [{"lat": -31.9, "lon": 115.8}], "distance_km": 1.5},
            "waypoints": [{"id": "wp-1", "lat": -31.9, "lon": 115.8}],
            "aiAdvice": "Hold position",
            "telemetry": {"heading": 270.0, "battery": 76.0}
        })
        .to_string();

        let (update, faults) = FeedFrame::parse(&text).unwrap().decode();
        assert!(faults.is_empty());
        assert_eq!(update.drones.as_ref().unwrap().len(), 1);
        assert_eq!(update.detections.as_ref().unwrap().len(), 1);
        assert!(update.route_plan.is_some());
        assert_eq!(update.advice.as_deref(), Some("Hold position"));
        assert_eq!(update.telemetry.as_ref().unwrap().heading, Some(270.0));

        let waypoints = update.waypoints.unwrap();
        assert_eq!(waypoints[0].id, "wp-1");
        assert_eq!(waypoints[0].name, "Waypoint 1");
        assert_eq!(waypoints[0].alt, 100.0);
    }

    #[test]
    fn test_bad_field_is_isolated_from_its_siblings() {
        let text = json!({
            "drones": [{"id": "d1", "name": "D1", "status": "ready"}],
            "detections": 42
        })
        .to_string();

        let (update, faults) = FeedFrame::parse(&text).unwrap().decode();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].field, Field::Detections);
        assert!(update.drones.is_some());
        assert!(update.detections.is_none());
    }

    #[test]
    fn test_waypoint_without_an_id_is_a_fault() {
        let text = json!({
            "waypoints": [{"lat": -31.9, "lon": 115.8}],
            "aiAdvice": "still applies"
        })
        .to_string();

        let (update, faults) = FeedFrame::parse(&text).unwrap().decode();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].field, Field::Waypoints);
        assert!(update.waypoints.is_none());
        assert_eq!(update.advice.as_deref(), Some("still applies"));
    }

    #[test]
    fn test_decoding_the_same_frame_twice_is_deterministic() {
        let text = json!({
            "waypoints": [
                {"id": "a", "lat": 1.0, "lon": 2.0},
                {"id": "b", "lat": 3.0, "lon": 4.0, "name": "Gate"}
            ]
        })
        .to_string();

        let (first, _) = FeedFrame::parse(&text).unwrap().decode();
        let (second, _) = FeedFrame::parse(&text).unwrap().decode();
        assert_eq!(first, second);

        let waypoints = first.waypoints.unwrap();
        assert_eq!(waypoints[0].name, "Waypoint 1");
        assert_eq!(waypoints[1].name, "Gate");
    }

    #[test]
    fn test_empty_frame_is_an_empty_update() {
        let (update, faults) = FeedFrame::parse("{}").unwrap().decode();
        assert!(faults.is_empty());
        assert_eq!(update, FleetUpdate::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let frame = FeedFrame::parse(r#"{"aiAdvice": "ok", "experimental": true}"#).unwrap();
        let (update, faults) = frame.decode();
        assert!(faults.is_empty());
        assert_eq!(update.advice.as_deref(), Some("ok"));
    }
}

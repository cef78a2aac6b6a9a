//! Fixed prompt texts and the structured reply schema

use serde_json::json;

/// General object analysis
pub const GENERAL_ANALYSIS: &str = "You are a security monitoring assistant reviewing a single \
frame from a surveillance camera. Identify every notable object, person or vehicle. For each one \
give a short name, a confidence between 0 and 1, and a bounding box [yMin, xMin, yMax, xMax] with \
coordinates normalized to 0-1. Then give a one-sentence security assessment of the scene and a \
short recommended action for the operator. If nothing notable is visible return an empty objects \
list.";

/// Elevated law-enforcement lookout
pub const LAW_ENFORCEMENT_LOOKOUT: &str = "You are supporting a law-enforcement lookout and are \
reviewing a single frame from a surveillance camera. Prioritise persons, faces, vehicles, licence \
plates, weapons, carried items and any behaviour that could indicate a crime in progress. For each \
finding give a short descriptive name, a confidence between 0 and 1, and a bounding box \
[yMin, xMin, yMax, xMax] with coordinates normalized to 0-1. Then give a one-sentence threat \
assessment and the recommended action for responding officers. If nothing relevant is visible \
return an empty objects list.";

/// Local-capture prompt for the lookout flag
pub fn capture_prompt(lookout: bool) -> &'static str {
    if lookout {
        LAW_ENFORCEMENT_LOOKOUT
    } else {
        GENERAL_ANALYSIS
    }
}

/// Situational prompt for a stream camera's location
pub fn location_prompt(location: &str) -> String {
    format!(
        "Give a situational security briefing for the monitored location \"{}\". Cover the \
         activity an operator should expect there, the main risks, and what to watch for right \
         now. Answer in plain text, under 120 words.",
        location
    )
}

/// Situational prompt for the station's own coordinates
pub fn coordinates_prompt(latitude: f64, longitude: f64) -> String {
    format!(
        "The monitoring station is at latitude {:.5}, longitude {:.5}. Describe the likely \
         surroundings and give a situational security briefing for this area: expected activity, \
         main risks, and what to watch for. Answer in plain text, under 120 words.",
        latitude, longitude
    )
}

/// System instruction for the long-lived conversation session
pub const SESSION_INSTRUCTION: &str = "You are the assistant of a multi-camera security \
monitoring station. Answer operator questions and situational briefing requests concisely and \
factually. Earlier briefings in this conversation describe the monitored locations.";

/// Schema hint sent with local-capture requests
pub fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "assessment": { "type": "STRING" },
            "action": { "type": "STRING" },
            "objects": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "confidence": { "type": "NUMBER" },
                        "box": { "type": "ARRAY", "items": { "type": "NUMBER" } }
                    },
                    "required": ["name", "confidence", "box"]
                }
            }
        },
        "required": ["assessment", "action", "objects"]
    })
}

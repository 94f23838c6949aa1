//! Maneuver classification and instruction formatting.
//!
//! Routing engines describe maneuvers as a `type` string with an
//! optional `modifier` ("turn" + "left"). Both the classifier and the
//! formatter key on `type-modifier` first, then bare `type`, and fall
//! back to a generic continue. Engines introduce new codes over time,
//! so an unrecognized maneuver must never be an error.

use serde::{Deserialize, Serialize};

/// Classification of a single maneuver point along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManeuverKind {
    TurnSharpLeft,
    TurnLeft,
    TurnSlightLeft,
    TurnSharpRight,
    TurnRight,
    TurnSlightRight,
    Straight,
    UTurn,
    Roundabout,
    Arrive,
    Depart,
    /// Unrecognized maneuver code
    Other,
}

impl ManeuverKind {
    /// Classify a raw engine maneuver code.
    pub fn parse(raw_type: &str, modifier: Option<&str>) -> Self {
        match (raw_type, modifier) {
            ("turn", Some("sharp left")) => ManeuverKind::TurnSharpLeft,
            ("turn", Some("left")) => ManeuverKind::TurnLeft,
            ("turn", Some("slight left")) => ManeuverKind::TurnSlightLeft,
            ("turn", Some("sharp right")) => ManeuverKind::TurnSharpRight,
            ("turn", Some("right")) => ManeuverKind::TurnRight,
            ("turn", Some("slight right")) => ManeuverKind::TurnSlightRight,
            ("turn", Some("straight")) => ManeuverKind::Straight,
            ("turn" | "continue", Some("uturn")) => ManeuverKind::UTurn,
            ("uturn", _) => ManeuverKind::UTurn,
            ("straight", _) | ("continue", _) | ("new name", _) => ManeuverKind::Straight,
            ("roundabout", _) | ("rotary", _) => ManeuverKind::Roundabout,
            ("arrive", _) => ManeuverKind::Arrive,
            ("depart", _) => ManeuverKind::Depart,
            _ => ManeuverKind::Other,
        }
    }
}

/// Map a raw maneuver to a human-readable instruction.
///
/// # Example
/// ```
/// use route_navigator::format_instruction;
///
/// assert_eq!(format_instruction("turn", Some("left")), "Turn left");
/// assert_eq!(format_instruction("some-new-code", None), "Continue");
/// ```
pub fn format_instruction(raw_type: &str, modifier: Option<&str>) -> String {
    let keyed = modifier
        .map(|m| format!("{}-{}", raw_type, m.replace(' ', "-")))
        .unwrap_or_else(|| raw_type.to_string());

    instruction_for_key(&keyed)
        .or_else(|| instruction_for_key(raw_type))
        .unwrap_or("Continue")
        .to_string()
}

fn instruction_for_key(key: &str) -> Option<&'static str> {
    let text = match key {
        "turn-sharp-left" => "Turn sharply left",
        "turn-left" => "Turn left",
        "turn-slight-left" => "Turn slightly left",
        "turn-sharp-right" => "Turn sharply right",
        "turn-right" => "Turn right",
        "turn-slight-right" => "Turn slightly right",
        "turn-straight" | "straight" | "continue" | "new name" => "Continue straight",
        "turn-uturn" | "continue-uturn" | "uturn" => "Make a U-turn",
        "roundabout" | "rotary" => "Enter the roundabout",
        "arrive" => "You have arrived at your destination",
        "depart" => "Head straight ahead",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_table() {
        assert_eq!(format_instruction("turn", Some("sharp left")), "Turn sharply left");
        assert_eq!(format_instruction("turn", Some("left")), "Turn left");
        assert_eq!(format_instruction("turn", Some("slight left")), "Turn slightly left");
        assert_eq!(format_instruction("turn", Some("sharp right")), "Turn sharply right");
        assert_eq!(format_instruction("turn", Some("right")), "Turn right");
        assert_eq!(format_instruction("turn", Some("slight right")), "Turn slightly right");
    }

    #[test]
    fn test_non_turn_codes() {
        assert_eq!(format_instruction("straight", None), "Continue straight");
        assert_eq!(format_instruction("uturn", None), "Make a U-turn");
        assert_eq!(format_instruction("roundabout", Some("right")), "Enter the roundabout");
        assert_eq!(
            format_instruction("arrive", None),
            "You have arrived at your destination"
        );
        assert_eq!(format_instruction("depart", None), "Head straight ahead");
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(format_instruction("merge", Some("slight left")), "Continue");
        assert_eq!(format_instruction("", None), "Continue");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ManeuverKind::parse("turn", Some("left")), ManeuverKind::TurnLeft);
        assert_eq!(ManeuverKind::parse("depart", None), ManeuverKind::Depart);
        assert_eq!(ManeuverKind::parse("arrive", Some("straight")), ManeuverKind::Arrive);
        assert_eq!(ManeuverKind::parse("rotary", None), ManeuverKind::Roundabout);
        assert_eq!(ManeuverKind::parse("continue", Some("uturn")), ManeuverKind::UTurn);
        assert_eq!(ManeuverKind::parse("new name", Some("straight")), ManeuverKind::Straight);
        assert_eq!(ManeuverKind::parse("merge", Some("left")), ManeuverKind::Other);
    }
}

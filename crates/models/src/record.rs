use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event category tag identifying a live event in the upstream feed.
pub const LIVE_EVENT_TYPE: &str = "EV";

/// Source tag stamped on records when none is configured.
pub const DEFAULT_SOURCE: &str = "bookiesapi";

/// Wall-clock format used for `updated_at`.
pub const INGESTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Normalized snapshot of one live match at one point in time.
///
/// Serializes with the upstream's abbreviated keys plus the hub-derived
/// `source`, `updated_at` and `match_title`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "NA")]
    pub name: String,
    #[serde(rename = "CT")]
    pub country: String,
    #[serde(rename = "CC")]
    pub league: String,
    #[serde(rename = "T1")]
    pub team1: String,
    #[serde(rename = "T2")]
    pub team2: String,
    #[serde(rename = "SS")]
    pub score: String,
    #[serde(rename = "TM")]
    pub minute: String,
    #[serde(rename = "TU")]
    pub source_update_time: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub source: String,
    #[serde(rename = "updated_at", with = "wall_clock")]
    pub ingested_at: NaiveDateTime,
    #[serde(rename = "match_title")]
    pub display_title: String,
}

impl MatchRecord {
    /// Projects one upstream event object into a record.
    ///
    /// Returns `None` when the event is not a live event (`type != "EV"`) or
    /// carries no usable name. Every other string field falls back to `""`
    /// when missing or not a string.
    pub fn from_event(
        event: &Map<String, Value>,
        source: &str,
        ingested_at: NaiveDateTime,
    ) -> Option<Self> {
        if event.get("type").and_then(Value::as_str) != Some(LIVE_EVENT_TYPE) {
            return None;
        }

        let name = match event.get("NA").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return None,
        };

        let team1 = field(event, "T1");
        let team2 = field(event, "T2");

        Some(Self {
            id: field(event, "ID"),
            name,
            country: field(event, "CT"),
            league: field(event, "CC"),
            display_title: display_title(&team1, &team2),
            team1,
            team2,
            score: field(event, "SS"),
            minute: field(event, "TM"),
            source_update_time: field(event, "TU"),
            record_type: LIVE_EVENT_TYPE.to_string(),
            source: source.to_string(),
            ingested_at,
        })
    }
}

/// `"{team1} vs {team2}"`, verbatim even when either side is empty.
pub fn display_title(team1: &str, team2: &str) -> String {
    format!("{team1} vs {team2}")
}

fn field(event: &Map<String, Value>, key: &str) -> String {
    event
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

mod wall_clock {
    use super::INGESTED_AT_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(INGESTED_AT_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, INGESTED_AT_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ingested() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(18, 30, 5)
            .unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_full_event_projection() {
        let event = object(json!({
            "type": "EV", "NA": "Arsenal v Chelsea", "ID": "1234",
            "CT": "England", "CC": "Premier League", "T1": "Arsenal",
            "T2": "Chelsea", "SS": "1-0", "TM": "37", "TU": "20240309183000"
        }));

        let record = MatchRecord::from_event(&event, DEFAULT_SOURCE, ingested()).unwrap();

        assert_eq!(record.id, "1234");
        assert_eq!(record.name, "Arsenal v Chelsea");
        assert_eq!(record.country, "England");
        assert_eq!(record.league, "Premier League");
        assert_eq!(record.score, "1-0");
        assert_eq!(record.minute, "37");
        assert_eq!(record.source_update_time, "20240309183000");
        assert_eq!(record.record_type, "EV");
        assert_eq!(record.source, "bookiesapi");
        assert_eq!(record.display_title, "Arsenal vs Chelsea");
    }

    #[test]
    fn test_missing_and_non_string_fields_become_empty() {
        let event = object(json!({"type": "EV", "NA": "X", "SS": 3, "TM": null}));

        let record = MatchRecord::from_event(&event, DEFAULT_SOURCE, ingested()).unwrap();

        assert_eq!(record.id, "");
        assert_eq!(record.score, "");
        assert_eq!(record.minute, "");
        assert_eq!(record.display_title, " vs ");
    }

    #[test]
    fn test_non_live_events_are_rejected() {
        for event in [
            json!({"type": "CT", "NA": "Competition"}),
            json!({"NA": "No type"}),
            json!({"type": "ev", "NA": "Lowercase"}),
            json!({"type": "EV"}),
            json!({"type": "EV", "NA": null}),
            json!({"type": "EV", "NA": ""}),
            json!({"type": "EV", "NA": 42}),
        ] {
            assert!(MatchRecord::from_event(&object(event.clone()), DEFAULT_SOURCE, ingested()).is_none(), "{event}");
        }
    }

    #[test]
    fn test_wire_shape() {
        let event = object(json!({"type": "EV", "NA": "X", "T1": "A", "T2": "B"}));
        let record = MatchRecord::from_event(&event, "feed-a", ingested()).unwrap();

        let wire = serde_json::to_value(&record).unwrap();

        assert_eq!(wire["NA"], "X");
        assert_eq!(wire["type"], "EV");
        assert_eq!(wire["source"], "feed-a");
        assert_eq!(wire["updated_at"], "2024-03-09 18:30:05");
        assert_eq!(wire["match_title"], "A vs B");

        let back: MatchRecord = serde_json::from_value(wire).unwrap();
        assert_eq!(back, record);
    }

    proptest::proptest! {
        #[test]
        fn prop_display_title_is_verbatim(team1 in ".*", team2 in ".*") {
            let event = object(json!({"type": "EV", "NA": "N", "T1": team1.clone(), "T2": team2.clone()}));
            let record = MatchRecord::from_event(&event, DEFAULT_SOURCE, ingested()).unwrap();
            proptest::prop_assert_eq!(record.display_title, format!("{} vs {}", team1, team2));
        }
    }
}

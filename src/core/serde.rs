use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Serializes Duration as seconds
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.as_secs_f64().serialize(serializer)
}

/// Deserializes Duration from seconds
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| serde::de::Error::custom(format!("invalid duration {}: {}", secs, e)))
}

/// Serializes a UTC timestamp as ISO-8601 with millisecond precision
pub fn serialize_timestamp<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    crate::util::iso_timestamp(time).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_serialization() {
        #[derive(Serialize, Deserialize)]
        struct Test {
            #[serde(serialize_with = "serialize_duration")]
            #[serde(deserialize_with = "deserialize_duration")]
            delay: Duration,
        }

        let original = Test {
            delay: Duration::from_millis(2500),
        };

        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(serialized, r#"{"delay":2.5}"#);

        let deserialized: Test = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.delay, original.delay);

        assert!(serde_json::from_str::<Test>(r#"{"delay":-1.0}"#).is_err());
        assert!(serde_json::from_str::<Test>(r#"{"delay":1e30}"#).is_err());
    }

    #[test]
    fn test_timestamp_serialization() {
        #[derive(Serialize)]
        struct Test {
            #[serde(serialize_with = "serialize_timestamp")]
            timestamp: DateTime<Utc>,
        }

        let original = Test {
            timestamp: Utc.with_ymd_and_hms(2018, 1, 19, 15, 37, 1).unwrap(),
        };

        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(serialized, r#"{"timestamp":"2018-01-19T15:37:01.000Z"}"#);
    }
}

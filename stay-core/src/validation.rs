use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use stay_shared::Baggage;

use crate::CoreResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub room_id: String,
    pub number_of_guests: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub is_valid: bool,
    /// Human readable, in the order the directory service checked them.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reasons: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The room directory's availability check.
#[async_trait]
pub trait ValidationClient: Send + Sync {
    /// Ask whether the room exists, fits the guests and is free for the range.
    async fn validate_booking(
        &self,
        request: &ValidationRequest,
        baggage: &Baggage,
    ) -> CoreResult<ValidationResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_reasons_decode_as_empty() {
        let resp: ValidationResponse =
            serde_json::from_str(r#"{"isValid":true,"reasons":null}"#).unwrap();
        assert!(resp.is_valid);
        assert!(resp.reasons.is_empty());

        let resp: ValidationResponse = serde_json::from_str(r#"{"isValid":true}"#).unwrap();
        assert!(resp.reasons.is_empty());
    }

    #[test]
    fn test_reason_order_is_kept() {
        let resp: ValidationResponse = serde_json::from_str(
            r#"{"isValid":false,"reasons":["Room does not exist","Number of guests must be greater than 0"]}"#,
        )
        .unwrap();
        assert_eq!(
            resp.reasons,
            vec!["Room does not exist", "Number of guests must be greater than 0"]
        );
    }
}

//! Data models for decoded vehicles, scraped parts and API payloads

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded vehicle attributes, keyed by the decoder's variable name.
///
/// Only non-empty values are ever stored.
pub type VehicleInfo = BTreeMap<String, String>;

/// A single spare-part search result row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
}

/// One seller's quote for an article. Absent fields serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub price: Option<String>,
    pub availability: Option<String>,
    pub warehouse: Option<String>,
    pub delivery_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub vin: String,
    pub vehicle_info: VehicleInfo,
    pub parts: Vec<PartListing>,
    pub total_parts: usize,
    pub timestamp: DateTime<Utc>,
}

impl SearchResult {
    /// Assembles the result, stamping it with the current time.
    pub fn new(vin: String, vehicle_info: VehicleInfo, parts: Vec<PartListing>) -> Self {
        Self {
            vin,
            vehicle_info,
            total_parts: parts.len(),
            parts,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailResult {
    pub article: String,
    pub offers: Vec<Offer>,
}

/// Success envelope of the decode endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DecodedVin {
    pub vin: String,
    pub vehicle_info: VehicleInfo,
    pub decoded: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub authenticated: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_omits_absent_fields() {
        let listing = PartListing {
            price: Some("1 200 ₽".to_string()),
            ..PartListing::default()
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json, serde_json::json!({ "price": "1 200 ₽" }));
    }

    #[test]
    fn offer_keeps_absent_fields_as_null() {
        let offer = Offer {
            warehouse: Some("Москва".to_string()),
            ..Offer::default()
        };
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["price"], serde_json::Value::Null);
        assert_eq!(json["warehouse"], "Москва");
    }

    #[test]
    fn search_result_counts_parts() {
        let result = SearchResult::new(
            "1HGCM82633A004352".to_string(),
            VehicleInfo::new(),
            vec![PartListing::default(), PartListing::default()],
        );
        assert_eq!(result.total_parts, 2);
    }

    #[test]
    fn search_result_serializes_timestamp_as_rfc3339() {
        let result = SearchResult::new("1HGCM82633A004352".to_string(), VehicleInfo::new(), vec![]);
        let json = serde_json::to_value(&result).unwrap();

        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert_eq!(json["parts"], serde_json::json!([]));
    }
}

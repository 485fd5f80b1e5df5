//! VIN decoding through a public registry web service.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ParserError, Result};
use crate::models::VehicleInfo;

pub const VIN_LENGTH: usize = 17;
pub const DECODE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct DecodeResponse {
    #[serde(rename = "Results", default)]
    results: Vec<DecodeEntry>,
}

/// One `{Variable, Value}` pair of the decode payload
#[derive(Debug, Clone, Deserialize)]
pub struct DecodeEntry {
    #[serde(rename = "Variable")]
    pub variable: Option<String>,
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

/// Keeps every pair whose value is non-empty.
pub fn vehicle_info_from_results(results: Vec<DecodeEntry>) -> VehicleInfo {
    results
        .into_iter()
        .filter_map(|entry| match (entry.variable, entry.value) {
            (Some(variable), Some(value)) if !value.is_empty() => Some((variable, value)),
            _ => None,
        })
        .collect()
}

/// Checks the VIN length without touching the network.
pub fn validate_vin(vin: &str) -> Result<()> {
    if vin.is_empty() || vin.chars().count() != VIN_LENGTH {
        return Err(ParserError::InvalidVinFormat {
            vin: vin.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct VinDecoder {
    client: Client,
    url_pattern: String,
}

impl VinDecoder {
    /// `url_pattern` must contain a `{vin}` placeholder.
    pub fn new(client: Client, url_pattern: impl Into<String>) -> Self {
        Self {
            client,
            url_pattern: url_pattern.into(),
        }
    }

    pub async fn decode(&self, vin: &str) -> Result<VehicleInfo> {
        validate_vin(vin)?;

        let url = self.url_pattern.replace("{vin}", &urlencoding::encode(vin));
        debug!("Decoding VIN {} via {}", vin, url);

        let response = self.client.get(&url).timeout(DECODE_TIMEOUT).send().await?;

        if !response.status().is_success() {
            warn!("VIN decode for {} failed: {}", vin, response.status());
            return Err(ParserError::Upstream {
                status: response.status().as_u16(),
            });
        }

        let payload: DecodeResponse = response.json().await?;
        let vehicle_info = vehicle_info_from_results(payload.results);

        debug!("Decoded {} attributes for {}", vehicle_info.len(), vin);
        Ok(vehicle_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_excluded() {
        let payload: DecodeResponse = serde_json::from_str(
            r#"{"Results": [
                {"Variable": "Make", "Value": "Toyota"},
                {"Variable": "Model", "Value": ""},
                {"Variable": "Trim", "Value": null},
                {"Variable": null, "Value": "orphan"}
            ]}"#,
        )
        .unwrap();

        let info = vehicle_info_from_results(payload.results);

        assert_eq!(info.len(), 1);
        assert_eq!(info.get("Make").map(String::as_str), Some("Toyota"));
    }

    #[test]
    fn missing_results_list_decodes_to_nothing() {
        let payload: DecodeResponse = serde_json::from_str(r#"{"Count": 0}"#).unwrap();
        assert!(vehicle_info_from_results(payload.results).is_empty());
    }

    #[test]
    fn vin_length_is_checked_in_characters() {
        assert!(validate_vin("1HGCM82633A004352").is_ok());
        assert!(validate_vin("").is_err());
        assert!(validate_vin("1HGCM82633A00435").is_err());
        assert!(validate_vin("1HGCM82633A0043520").is_err());
        assert!(validate_vin("ЖHGCM82633A004352").is_ok());
    }

    #[tokio::test]
    async fn invalid_vin_never_reaches_the_network() {
        // Port 9 (discard) would surface as a transport error if contacted.
        let decoder = VinDecoder::new(Client::new(), "http://127.0.0.1:9/decode/{vin}");

        match decoder.decode("SHORT").await {
            Err(ParserError::InvalidVinFormat { vin }) => assert_eq!(vin, "SHORT"),
            other => panic!("expected InvalidVinFormat, got {other:?}"),
        }
    }
}

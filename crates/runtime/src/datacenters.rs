//! GTM datacenter list
//!
//! CSV with a header row:
//! `nickname,city,stateOrProvince,country,latitude,longitude,servers`
//! where `servers` is a `;`-separated address list.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use edgeprov_core::GtmSettings;

/// One datacenter to create or reuse.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpec {
    /// `YYMMnn` id used in logs until the real id is known
    pub tmp_id: String,
    pub nickname: String,
    pub city: String,
    pub state_or_province: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub servers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow {
    nickname: String,
    city: String,
    state_or_province: String,
    country: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    servers: String,
}

/// A datacenter resolved to its GTM id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficTarget {
    pub datacenter_id: u64,
    pub nickname: String,
    pub servers: Vec<String>,
    pub reused: bool,
}

/// Parses the datacenter CSV; `today` supplies the temporary id prefix.
pub fn parse_datacenters(text: &str, today: NaiveDate) -> Result<Vec<DatacenterSpec>, String> {
    let prefix = format!("{:02}{:02}", today.year() % 100, today.month());
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(index, row)| -> Result<DatacenterSpec, String> {
            let row = row.map_err(|e| format!("row {}: {e}", index + 1))?;
            let servers = row
                .servers
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            Ok(DatacenterSpec {
                tmp_id: format!("{prefix}{:02}", index + 1),
                nickname: row.nickname,
                city: row.city,
                state_or_province: row.state_or_province,
                country: row.country,
                latitude: row.latitude,
                longitude: row.longitude,
                servers,
            })
        })
        .collect()
}

/// Body of the GTM property PUT: one liveness test and an even weight split.
pub fn gtm_property_payload(settings: &GtmSettings<'_>, targets: &[TrafficTarget]) -> Value {
    let weight = if targets.is_empty() {
        0
    } else {
        100 / targets.len()
    };

    json!({
        "name": settings.property_name,
        "type": settings.property_type,
        "dynamicTTL": 60,
        "handoutMode": "normal",
        "handoutLimit": 1,
        "ipv6": false,
        "scoreAggregationType": "worst",
        "livenessTests": [{
            "name": "Liveness",
            "hostHeader": settings.liveness_host_header,
            "testObject": settings.liveness_test_object,
            "testObjectPort": 443,
            "testObjectProtocol": "HTTPS",
            "testInterval": 60,
            "testTimeout": 10,
            "httpMethod": "GET",
            "httpHeaders": [{"name": "Host", "value": settings.liveness_host_header}],
        }],
        "trafficTargets": targets
            .iter()
            .map(|t| json!({
                "datacenterId": t.datacenter_id,
                "enabled": true,
                "servers": t.servers,
                "weight": weight,
            }))
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
nickname,city,stateOrProvince,country,latitude,longitude,servers
east, New York ,NY,US,40.71,-74.01,192.0.2.1; 192.0.2.2;
west,San Francisco,CA,US,37.77,-122.42,198.51.100.7
";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn test_parse_datacenters() {
        let dcs = parse_datacenters(CSV, today()).unwrap();
        assert_eq!(dcs.len(), 2);
        assert_eq!(dcs[0].tmp_id, "250301");
        assert_eq!(dcs[1].tmp_id, "250302");
        assert_eq!(dcs[0].city, "New York");
        assert_eq!(dcs[0].servers, vec!["192.0.2.1", "192.0.2.2"]);
        assert_eq!(dcs[1].servers, vec!["198.51.100.7"]);
        assert_eq!(dcs[1].longitude, -122.42);
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        let text = "nickname,city,stateOrProvince,country,latitude,longitude,servers\nx,c,s,US,north,1,a\n";
        let err = parse_datacenters(text, today()).unwrap_err();
        assert!(err.starts_with("row 1"));
    }

    #[test]
    fn test_property_payload_splits_weight() {
        let settings = GtmSettings {
            domain: "d",
            property_name: "origin",
            property_type: "performance",
            liveness_host_header: "origin.example.com",
            liveness_test_object: "/health",
            datacenter_details: "dcs.csv",
        };
        let targets: Vec<TrafficTarget> = (1..=3)
            .map(|id| TrafficTarget {
                datacenter_id: id,
                nickname: format!("dc{id}"),
                servers: vec![format!("192.0.2.{id}")],
                reused: false,
            })
            .collect();

        let payload = gtm_property_payload(&settings, &targets);
        assert_eq!(payload["name"], json!("origin"));
        assert_eq!(payload["trafficTargets"][2]["weight"], json!(33));
        assert_eq!(payload["trafficTargets"][0]["servers"], json!(["192.0.2.1"]));
        assert_eq!(payload["livenessTests"][0]["httpHeaders"][0]["value"], json!("origin.example.com"));
    }
}

use serde::{Deserialize, Serialize};

/// A named area inside a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub zone_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_level: Option<String>,
}

/// A physical venue with its zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub site_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

impl Site {
    /// Minimal site, mostly for tests and embedding.
    pub fn new(site_id: impl Into<String>, name: impl Into<String>, zones: Vec<Zone>) -> Self {
        Self {
            site_id: site_id.into(),
            name: name.into(),
            city: None,
            country: None,
            timezone: None,
            zones,
        }
    }
}

impl Zone {
    pub fn new(zone_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            name: name.into(),
            security_level: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_with_wire_casing() {
        let mut site = Site::new("s1", "Mall", vec![Zone::new("z1", "Lobby")]);
        site.zones[0].security_level = Some("high".into());
        assert_eq!(
            serde_json::to_value(&site).unwrap(),
            serde_json::json!({
                "siteId": "s1",
                "name": "Mall",
                "zones": [{ "zoneId": "z1", "name": "Lobby", "securityLevel": "high" }]
            })
        );
    }
}

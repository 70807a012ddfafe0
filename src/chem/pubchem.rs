//! Name → SMILES lookup against PubChem PUG REST.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use super::AdapterError;

pub const DEFAULT_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Property keys PubChem has used for SMILES over time, most specific first.
const SMILES_KEYS: &[&str] = &[
    "IsomericSMILES",
    "SMILES",
    "CanonicalSMILES",
    "ConnectivitySMILES",
];

#[derive(Debug, Clone)]
pub struct PubChemResolver {
    client: reqwest::Client,
    base_url: String,
}

impl PubChemResolver {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent("chem-agent/0.1")
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AdapterError::Lookup(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!(
            "{}/compound/name/{}/property/IsomericSMILES,CanonicalSMILES/JSON",
            self.base_url,
            urlencoding::encode(name.trim())
        )
    }

    /// SMILES for a compound name, or `None` when PubChem does not know it.
    pub async fn smiles_for_name(&self, name: &str) -> Result<Option<String>, AdapterError> {
        let url = self.url_for(name);
        tracing::debug!("PubChem lookup: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Lookup(e.to_string()))?;
        let status = response.status();
        // PubChem answers unknown names with 404 and a fault body.
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AdapterError::Lookup(format!("PubChem HTTP error: {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Lookup(e.to_string()))?;
        Ok(smiles_from_response(&body))
    }
}

/// Pull the first SMILES string out of a PUG REST property table.
pub fn smiles_from_response(body: &Value) -> Option<String> {
    let first = body
        .get("PropertyTable")?
        .get("Properties")?
        .as_array()?
        .first()?;
    SMILES_KEYS
        .iter()
        .filter_map(|key| first.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_isomeric_smiles_first() {
        let body = json!({
            "PropertyTable": {
                "Properties": [
                    {"CID": 243, "CanonicalSMILES": "C1=CC=C(C=C1)C(=O)O", "IsomericSMILES": "C1=CC=C(C=C1)C(=O)O"}
                ]
            }
        });
        assert_eq!(
            smiles_from_response(&body).as_deref(),
            Some("C1=CC=C(C=C1)C(=O)O")
        );
    }

    #[test]
    fn accepts_newer_connectivity_key() {
        let body = json!({
            "PropertyTable": {"Properties": [{"CID": 702, "ConnectivitySMILES": "CCO"}]}
        });
        assert_eq!(smiles_from_response(&body).as_deref(), Some("CCO"));
    }

    #[test]
    fn fault_body_has_no_smiles() {
        let body = json!({"Fault": {"Code": "PUGREST.NotFound", "Message": "No CID found"}});
        assert_eq!(smiles_from_response(&body), None);
        assert_eq!(
            smiles_from_response(&json!({"PropertyTable": {"Properties": []}})),
            None
        );
    }

    #[test]
    fn name_is_url_encoded() {
        let resolver = PubChemResolver::new("https://example.org/rest/pug/").unwrap();
        assert_eq!(
            resolver.url_for("benzoic acid"),
            "https://example.org/rest/pug/compound/name/benzoic%20acid/property/IsomericSMILES,CanonicalSMILES/JSON"
        );
    }
}

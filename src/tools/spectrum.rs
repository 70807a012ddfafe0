//! spectrum_tool actions.

use serde_json::{json, Map, Value};

use super::{ExecutionError, ToolResult};
use crate::agent::protocol::{extract_payload, strip_reasoning};
use crate::agent::{build_candidate_prompt, build_candidate_request};
use crate::chem::Cheminformatics;
use crate::llm::Generator;
use crate::verifier::{verify_candidates, Nucleus};

/// Upper bound on proposed candidates taken from the generator.
const MAX_PROPOSALS: usize = 10;

pub(super) struct PeakRequest<'a> {
    pub peaks: &'a [f64],
    pub hint: Option<&'a str>,
    pub candidates: Option<&'a [String]>,
    pub nucleus: Nucleus,
}

/// SMILES list from a proposal reply: a JSON array, fenced or bare, of
/// strings or `{"smiles": ...}` objects.
fn parse_candidate_list(reply: &str) -> Option<Vec<String>> {
    let cleaned = strip_reasoning(reply);
    let payload = extract_payload(&cleaned).unwrap_or_else(|| cleaned.trim());
    let Value::Array(items) = serde_json::from_str::<Value>(payload).ok()? else {
        return None;
    };
    let list: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(obj) => obj
                .get("smiles")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .take(MAX_PROPOSALS)
        .collect();
    Some(list)
}

pub(super) async fn analyze_peaks(
    chem: &dyn Cheminformatics,
    generator: &dyn Generator,
    request: PeakRequest<'_>,
    context: &str,
) -> Result<ToolResult, ExecutionError> {
    let PeakRequest {
        peaks,
        hint,
        candidates,
        nucleus,
    } = request;

    if peaks.is_empty() {
        return Ok(ToolResult::failure(
            "No peak positions were given; include the observed shifts in \"peaks\".",
            "empty peak list",
        ));
    }

    let candidates: Vec<String> = match candidates {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => {
            let reply = generator
                .generate(
                    &build_candidate_prompt(nucleus),
                    &build_candidate_request(peaks, hint, nucleus, context),
                )
                .await
                .map_err(|e| ExecutionError::Generator(e.to_string()))?;
            match parse_candidate_list(&reply) {
                Some(list) if !list.is_empty() => {
                    tracing::debug!("Generator proposed {} candidates", list.len());
                    list
                }
                _ => {
                    return Ok(ToolResult::failure(
                        "No candidate structures could be read from the proposal.",
                        "no candidates proposed",
                    ))
                }
            }
        }
    };

    let verification = verify_candidates(chem, &candidates, peaks, nucleus)
        .await
        .map_err(|source| ExecutionError::Adapter {
            action: "analyze_peaks",
            source,
        })?;

    let mut data = Map::new();
    data.insert("candidates".to_string(), json!(candidates));
    data.insert("verification".to_string(), json!(verification));
    let table = verification.to_table();

    let result = if verification.ranked.is_empty() {
        ToolResult::failure(
            format!("None of the candidate structures could be parsed.\n\n{}", table),
            "no parsable candidates",
        )
        .with_data(data)
    } else if verification.best.is_none() {
        ToolResult::failure(table, "no candidate is consistent with the peak count").with_data(data)
    } else {
        ToolResult::success(table, data)
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::chem::LocalChemistry;

    struct Proposer(&'static str);

    #[async_trait]
    impl Generator for Proposer {
        async fn generate(&self, _prompt: &str, context: &str) -> anyhow::Result<String> {
            assert!(context.contains("170.5"));
            Ok(self.0.to_string())
        }
    }

    const PEAKS: [f64; 5] = [170.5, 130.2, 128.9, 128.9, 125.4];

    fn request(candidates: Option<&[String]>) -> PeakRequest<'_> {
        PeakRequest {
            peaks: &PEAKS,
            hint: Some("aromatic acid"),
            candidates,
            nucleus: Nucleus::C13,
        }
    }

    #[test]
    fn candidate_lists_in_various_shapes() {
        assert_eq!(
            parse_candidate_list("```json\n[\"CCO\", \"CC\"]\n```"),
            Some(vec!["CCO".to_string(), "CC".to_string()])
        );
        assert_eq!(
            parse_candidate_list("<think>hmm</think>[{\"smiles\": \"c1ccccc1\"}]"),
            Some(vec!["c1ccccc1".to_string()])
        );
        assert_eq!(parse_candidate_list("I think it is benzoic acid."), None);
    }

    #[tokio::test]
    async fn proposed_candidates_are_verified() {
        let chem = LocalChemistry::new(400, 400, None);
        let generator = Proposer(r#"["OC(=O)c1ccccc1", "CCCCCCCCCC(=O)O"]"#);
        let result = analyze_peaks(&chem, &generator, request(None), "question")
            .await
            .unwrap();
        assert!(result.succeeded);
        assert!(result.text.contains("Best candidate"));
        let data = result.structured_data.unwrap();
        assert_eq!(data["verification"]["best"]["score"], json!(100.0));
    }

    #[tokio::test]
    async fn inconsistent_candidates_are_a_soft_failure() {
        let chem = LocalChemistry::new(400, 400, None);
        let given = vec!["C".to_string()];
        let result = analyze_peaks(&chem, &Proposer("[]"), request(Some(&given)), "")
            .await
            .unwrap();
        assert!(!result.succeeded);
        assert!(result.structured_data.is_some());
        assert!(result.text.contains("No candidate is consistent"));
    }

    #[tokio::test]
    async fn empty_peak_list() {
        let chem = LocalChemistry::new(400, 400, None);
        let req = PeakRequest {
            peaks: &[],
            hint: None,
            candidates: None,
            nucleus: Nucleus::C13,
        };
        let result = analyze_peaks(&chem, &Proposer("[]"), req, "").await.unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.error.as_deref(), Some("empty peak list"));
    }
}

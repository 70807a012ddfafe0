//! chemistry_tool actions.

use serde_json::{json, Map, Value};

use super::{ExecutionError, ToolResult};
use crate::chem::{AdapterError, CanonicalStructure, Cheminformatics, EmbedError, EmbedStrategy};

/// Resolve or produce the soft "unresolved" failure.
async fn resolve(
    chem: &dyn Cheminformatics,
    molecule: &str,
    action: &'static str,
) -> Result<Result<CanonicalStructure, ToolResult>, ExecutionError> {
    match chem.resolve(molecule).await {
        Ok(Some(structure)) => Ok(Ok(structure)),
        Ok(None) => Ok(Err(ToolResult::failure(
            format!(
                "Could not resolve '{}' to a structure. Check the SMILES string or use a common compound name.",
                molecule
            ),
            format!("unresolved molecule: {}", molecule),
        ))),
        Err(source) => Err(ExecutionError::Adapter { action, source }),
    }
}

fn base_data(structure: &CanonicalStructure) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("smiles".to_string(), json!(structure.smiles));
    data.insert("source".to_string(), json!(structure.source));
    data
}

pub(super) async fn calculate_properties(
    chem: &dyn Cheminformatics,
    molecule: &str,
) -> Result<ToolResult, ExecutionError> {
    let structure = match resolve(chem, molecule, "calculate_properties").await? {
        Ok(s) => s,
        Err(failure) => return Ok(failure),
    };

    let properties = chem.properties(&structure);
    let text = format!(
        "Properties of {} (canonical SMILES {}):\n\n{}",
        molecule.trim(),
        structure.smiles,
        properties.to_table()
    );
    let mut data = base_data(&structure);
    data.insert("properties".to_string(), json!(properties));
    Ok(ToolResult::success(text, data))
}

pub(super) async fn generate_structure_image(
    chem: &dyn Cheminformatics,
    molecule: &str,
) -> Result<ToolResult, ExecutionError> {
    let structure = match resolve(chem, molecule, "generate_structure_image").await? {
        Ok(s) => s,
        Err(failure) => return Ok(failure),
    };

    let image = chem
        .render_2d(&structure)
        .await
        .map_err(|source| ExecutionError::Adapter {
            action: "generate_structure_image",
            source,
        })?;

    let properties = chem.properties(&structure);
    let mut data = base_data(&structure);
    data.insert("image".to_string(), json!(image.to_data_url()));
    data.insert("mime".to_string(), json!(image.mime));
    data.insert("properties".to_string(), json!(properties));

    let text = format!(
        "Generated a 2D structure image of {} ({}, {:.4} g/mol).",
        structure.smiles, properties.formula, properties.molecular_weight
    );
    Ok(ToolResult::success(text, data))
}

pub(super) async fn generate_3d_structure(
    chem: &dyn Cheminformatics,
    molecule: &str,
) -> Result<ToolResult, ExecutionError> {
    let structure = match resolve(chem, molecule, "generate_3d_structure").await? {
        Ok(s) => s,
        Err(failure) => return Ok(failure),
    };

    let embedded = match chem.embed_3d(&structure, EmbedStrategy::Standard).await {
        Err(AdapterError::Embed(EmbedError::Failed { deviation, .. })) => {
            tracing::warn!(
                "Standard embedding of {} failed (deviation {:.3}), retrying relaxed",
                structure.smiles,
                deviation
            );
            chem.embed_3d(&structure, EmbedStrategy::Relaxed).await
        }
        other => other,
    };

    let block = match embedded {
        Ok(block) => block,
        // The molecule itself cannot be embedded; let the generator explain.
        Err(AdapterError::Embed(err)) => {
            return Ok(ToolResult::failure(
                format!("Could not build a 3D structure for {}.", structure.smiles),
                err.to_string(),
            )
            .with_data(base_data(&structure)));
        }
        Err(source) => {
            return Err(ExecutionError::Adapter {
                action: "generate_3d_structure",
                source,
            })
        }
    };

    let text = format!(
        "Generated a 3D structure of {} with {} atoms including hydrogens ({} embedding, seed {}).",
        structure.smiles, block.atom_count, block.strategy, block.seed
    );
    let mut data = base_data(&structure);
    data.insert("molblock".to_string(), json!(block.block));
    data.insert("strategy".to_string(), json!(block.strategy));
    data.insert("seed".to_string(), json!(block.seed));
    data.insert("energy".to_string(), json!(block.energy));
    Ok(ToolResult::success(text, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::chem::{ImageBytes, LocalChemistry, PropertySet, StructureBlock};

    /// Standard embedding always fails; relaxed succeeds when `relaxed_ok`.
    struct StubbornEmbedder {
        local: LocalChemistry,
        relaxed_ok: bool,
        attempts: Mutex<Vec<EmbedStrategy>>,
    }

    impl StubbornEmbedder {
        fn new(relaxed_ok: bool) -> Self {
            Self {
                local: LocalChemistry::new(100, 100, Some(2)),
                relaxed_ok,
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Cheminformatics for StubbornEmbedder {
        async fn resolve(
            &self,
            identifier: &str,
        ) -> Result<Option<CanonicalStructure>, AdapterError> {
            self.local.resolve(identifier).await
        }

        fn properties(&self, structure: &CanonicalStructure) -> PropertySet {
            self.local.properties(structure)
        }

        async fn render_2d(&self, structure: &CanonicalStructure) -> Result<ImageBytes, AdapterError> {
            self.local.render_2d(structure).await
        }

        async fn embed_3d(
            &self,
            _: &CanonicalStructure,
            strategy: EmbedStrategy,
        ) -> Result<StructureBlock, AdapterError> {
            self.attempts.lock().unwrap().push(strategy);
            if strategy == EmbedStrategy::Relaxed && self.relaxed_ok {
                return Ok(StructureBlock {
                    block: "stub\n  M  END\n".to_string(),
                    strategy,
                    seed: 2,
                    energy: 0.5,
                    atom_count: 9,
                });
            }
            Err(AdapterError::Embed(EmbedError::Failed {
                strategy,
                deviation: 0.8,
            }))
        }
    }

    #[tokio::test]
    async fn standard_failure_falls_back_to_relaxed() {
        let chem = StubbornEmbedder::new(true);
        let result = generate_3d_structure(&chem, "CCO").await.unwrap();
        assert!(result.succeeded, "{:?}", result.error);
        let data = result.structured_data.unwrap();
        assert_eq!(data["strategy"], json!("relaxed"));
        assert_eq!(
            *chem.attempts.lock().unwrap(),
            vec![EmbedStrategy::Standard, EmbedStrategy::Relaxed]
        );
    }

    #[tokio::test]
    async fn relaxed_failure_is_a_soft_failure() {
        let chem = StubbornEmbedder::new(false);
        let result = generate_3d_structure(&chem, "CCO").await.unwrap();
        assert!(!result.succeeded);
        assert!(result.error.as_deref().unwrap().contains("relaxed embedding did not converge"));
        let data = result.structured_data.unwrap();
        let expected = chem.local.resolve("CCO").await.unwrap().unwrap().smiles;
        assert_eq!(data["smiles"], json!(expected));
        assert!(!data.contains_key("molblock"));
    }

    fn chem() -> LocalChemistry {
        LocalChemistry::new(400, 400, Some(9))
    }

    #[tokio::test]
    async fn properties_table_for_benzoic_acid() {
        let result = calculate_properties(&chem(), "OC(=O)c1ccccc1").await.unwrap();
        assert!(result.succeeded);
        assert!(result.text.contains("C7H6O2"));
        let data = result.structured_data.unwrap();
        assert_eq!(data["properties"]["h_bond_donors"], json!(1));
    }

    #[tokio::test]
    async fn unresolved_identifier() {
        let result = calculate_properties(&chem(), "xyzabc123").await.unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.error.as_deref(), Some("unresolved molecule: xyzabc123"));
        assert!(result.structured_data.is_none());
    }

    #[tokio::test]
    async fn three_d_block_in_structured_data() {
        let result = generate_3d_structure(&chem(), "CCO").await.unwrap();
        assert!(result.succeeded, "{:?}", result.error);
        let data = result.structured_data.unwrap();
        assert!(data["molblock"].as_str().unwrap().contains("M  END"));
        assert_eq!(data["seed"], json!(9));
    }
}

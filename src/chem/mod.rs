//! Cheminformatics adapter.
//!
//! Molecule identifiers (SMILES, or compound names when a PubChem resolver is
//! configured) become a [`CanonicalStructure`] that the tools can compute
//! properties for, depict in 2D or embed in 3D. The toolkit underneath is a
//! small SMILES graph library in this module tree.

mod crippen;
pub mod depict;
pub mod embed;
mod forcefield;
pub mod molecule;
pub mod properties;
pub mod pubchem;
pub mod smiles;
pub mod symmetry;

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Serialize;
use thiserror::Error;

pub use embed::{EmbedError, EmbedStrategy, StructureBlock};
pub use molecule::{Element, Molecule};
pub use properties::PropertySet;
pub use pubchem::PubChemResolver;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("name lookup failed: {0}")]
    Lookup(String),

    #[error("PubChem returned an unusable structure for '{name}': {reason}")]
    InvalidStructure { name: String, reason: String },

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("chemistry worker failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for AdapterError {
    fn from(err: tokio::task::JoinError) -> Self {
        AdapterError::Worker(err.to_string())
    }
}

/// Where a structure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureSource {
    Smiles,
    PubchemName,
}

/// A resolved molecule with its canonical SMILES.
#[derive(Debug, Clone)]
pub struct CanonicalStructure {
    pub smiles: String,
    pub molecule: Arc<Molecule>,
    pub source: StructureSource,
}

impl CanonicalStructure {
    pub fn from_molecule(molecule: Molecule, source: StructureSource) -> Self {
        Self {
            smiles: smiles::to_canonical(&molecule),
            molecule: Arc::new(molecule),
            source,
        }
    }
}

/// Rendered image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBytes {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageBytes {
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Structure resolution and computation used by the chemistry tools.
#[async_trait]
pub trait Cheminformatics: Send + Sync {
    /// Resolve an identifier. `Ok(None)` means nothing matched.
    async fn resolve(&self, identifier: &str) -> Result<Option<CanonicalStructure>, AdapterError>;

    fn properties(&self, structure: &CanonicalStructure) -> PropertySet;

    async fn render_2d(&self, structure: &CanonicalStructure) -> Result<ImageBytes, AdapterError>;

    async fn embed_3d(
        &self,
        structure: &CanonicalStructure,
        strategy: EmbedStrategy,
    ) -> Result<StructureBlock, AdapterError>;
}

/// Identifiers that could plausibly be compound names rather than broken
/// SMILES.
fn looks_like_name(identifier: &str) -> bool {
    identifier.chars().any(|c| c.is_ascii_alphabetic())
        && identifier
            .chars()
            .all(|c| c.is_alphanumeric() || " -,'()[]".contains(c))
}

/// In-process implementation on top of the SMILES toolkit.
pub struct LocalChemistry {
    names: Option<PubChemResolver>,
    image_width: u32,
    image_height: u32,
    /// Fixed embedding seed; a fresh random seed per call when unset.
    seed: Option<u64>,
}

impl LocalChemistry {
    pub fn new(image_width: u32, image_height: u32, seed: Option<u64>) -> Self {
        Self {
            names: None,
            image_width,
            image_height,
            seed,
        }
    }

    pub fn with_name_resolver(mut self, resolver: PubChemResolver) -> Self {
        self.names = Some(resolver);
        self
    }
}

#[async_trait]
impl Cheminformatics for LocalChemistry {
    async fn resolve(&self, identifier: &str) -> Result<Option<CanonicalStructure>, AdapterError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        let parse_error = match smiles::parse(identifier) {
            Ok(mol) => {
                return Ok(Some(CanonicalStructure::from_molecule(
                    mol,
                    StructureSource::Smiles,
                )))
            }
            Err(e) => e,
        };

        let Some(names) = &self.names else {
            tracing::debug!("'{}' is not valid SMILES: {}", identifier, parse_error);
            return Ok(None);
        };
        if !looks_like_name(identifier) {
            return Ok(None);
        }

        let Some(found) = names.smiles_for_name(identifier).await? else {
            tracing::info!("PubChem has no compound named '{}'", identifier);
            return Ok(None);
        };
        let mol = smiles::parse(&found).map_err(|e| AdapterError::InvalidStructure {
            name: identifier.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!("Resolved '{}' via PubChem to {}", identifier, found);
        Ok(Some(CanonicalStructure::from_molecule(
            mol,
            StructureSource::PubchemName,
        )))
    }

    fn properties(&self, structure: &CanonicalStructure) -> PropertySet {
        PropertySet::compute(&structure.molecule)
    }

    async fn render_2d(&self, structure: &CanonicalStructure) -> Result<ImageBytes, AdapterError> {
        let mol = Arc::clone(&structure.molecule);
        let (width, height) = (self.image_width, self.image_height);
        let svg = tokio::task::spawn_blocking(move || depict::depict_svg(&mol, width, height)).await?;
        Ok(ImageBytes {
            mime: "image/svg+xml",
            bytes: svg.into_bytes(),
        })
    }

    async fn embed_3d(
        &self,
        structure: &CanonicalStructure,
        strategy: EmbedStrategy,
    ) -> Result<StructureBlock, AdapterError> {
        let mol = Arc::clone(&structure.molecule);
        let title = structure.smiles.clone();
        let seed = self.seed.unwrap_or_else(rand::random);
        let block =
            tokio::task::spawn_blocking(move || embed::embed(&mol, strategy, seed, &title)).await??;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> LocalChemistry {
        LocalChemistry::new(300, 200, Some(11))
    }

    #[tokio::test]
    async fn resolves_smiles_to_canonical_form() {
        let chem = local();
        let a = chem.resolve("OC(=O)c1ccccc1").await.unwrap().unwrap();
        let b = chem.resolve(" c1ccc(cc1)C(O)=O ").await.unwrap().unwrap();
        assert_eq!(a.smiles, b.smiles);
        assert_eq!(a.source, StructureSource::Smiles);
    }

    #[tokio::test]
    async fn garbage_without_resolver_is_unresolved() {
        let chem = local();
        assert!(chem.resolve("xyzabc123").await.unwrap().is_none());
        assert!(chem.resolve("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn render_produces_svg_data_url() {
        let chem = local();
        let s = chem.resolve("CCO").await.unwrap().unwrap();
        let image = chem.render_2d(&s).await.unwrap();
        assert_eq!(image.mime, "image/svg+xml");
        assert!(String::from_utf8_lossy(&image.bytes).contains("width=\"300\""));
        assert!(image.to_data_url().starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn embed_uses_configured_seed() {
        let chem = local();
        let block = tokio_test::block_on(async {
            let s = chem.resolve("CCO").await.unwrap().unwrap();
            chem.embed_3d(&s, EmbedStrategy::Standard).await.unwrap()
        });
        assert_eq!(block.seed, 11);
        assert!(block.block.contains("V2000"));
    }

    #[test]
    fn name_detection() {
        assert!(looks_like_name("benzoic acid"));
        assert!(looks_like_name("2-methylpropan-1-ol"));
        assert!(!looks_like_name("C1CC=1)"));
        assert!(!looks_like_name("12345"));
    }
}

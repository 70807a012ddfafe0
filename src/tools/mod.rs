//! Tool invocations and their dispatch.
//!
//! The generator asks for tools by embedding JSON objects such as
//! `{"tool":"chemistry_tool","action":"calculate_properties","molecule":"CCO"}`.
//! Each known `(tool, action)` pair is a variant of [`ToolInvocation`], so an
//! unknown combination can never reach the dispatcher.

mod chemistry;
mod spectrum;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::chem::{AdapterError, Cheminformatics};
use crate::llm::Generator;
use crate::verifier::Nucleus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ChemistryTool,
    SpectrumTool,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::ChemistryTool => "chemistry_tool",
            ToolKind::SpectrumTool => "spectrum_tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ChemistryAction {
    #[serde(rename = "calculate_properties")]
    CalculateProperties {
        #[serde(alias = "smiles")]
        molecule: String,
    },
    #[serde(rename = "generate_structure_image")]
    GenerateStructureImage {
        #[serde(alias = "smiles")]
        molecule: String,
    },
    #[serde(rename = "generate_3d_structure")]
    Generate3dStructure {
        #[serde(alias = "smiles")]
        molecule: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SpectrumAction {
    #[serde(rename = "analyze_peaks")]
    AnalyzePeaks {
        peaks: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        candidates: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nucleus: Option<Nucleus>,
    },
}

/// One validated tool request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool")]
pub enum ToolInvocation {
    #[serde(rename = "chemistry_tool")]
    Chemistry(ChemistryAction),
    #[serde(rename = "spectrum_tool")]
    Spectrum(SpectrumAction),
}

impl ToolInvocation {
    pub fn tool(&self) -> ToolKind {
        match self {
            ToolInvocation::Chemistry(_) => ToolKind::ChemistryTool,
            ToolInvocation::Spectrum(_) => ToolKind::SpectrumTool,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            ToolInvocation::Chemistry(ChemistryAction::CalculateProperties { .. }) => {
                "calculate_properties"
            }
            ToolInvocation::Chemistry(ChemistryAction::GenerateStructureImage { .. }) => {
                "generate_structure_image"
            }
            ToolInvocation::Chemistry(ChemistryAction::Generate3dStructure { .. }) => {
                "generate_3d_structure"
            }
            ToolInvocation::Spectrum(SpectrumAction::AnalyzePeaks { .. }) => "analyze_peaks",
        }
    }

    /// Parameters as they appear on the wire, without `tool` and `action`.
    pub fn parameters(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("tool");
                map.remove("action");
                map
            }
            _ => Map::new(),
        }
    }

    /// `tool/action`, for logs and result headers.
    pub fn label(&self) -> String {
        format!("{}/{}", self.tool().as_str(), self.action())
    }
}

/// Prompt-facing description of one action.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub tool: ToolKind,
    pub action: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

/// Every action the dispatcher understands.
pub fn catalog() -> &'static [ToolSpec] {
    const CATALOG: &[ToolSpec] = &[
        ToolSpec {
            tool: ToolKind::ChemistryTool,
            action: "calculate_properties",
            description: "Molecular formula, molecular weight, logP, H-bond donors/acceptors, TPSA, rotatable bonds and ring count for a molecule given as SMILES or a compound name.",
            example: r#"{"tool": "chemistry_tool", "action": "calculate_properties", "molecule": "CC(=O)Oc1ccccc1C(=O)O"}"#,
        },
        ToolSpec {
            tool: ToolKind::ChemistryTool,
            action: "generate_structure_image",
            description: "Render a 2D structure drawing of the molecule for the user.",
            example: r#"{"tool": "chemistry_tool", "action": "generate_structure_image", "molecule": "c1ccccc1O"}"#,
        },
        ToolSpec {
            tool: ToolKind::ChemistryTool,
            action: "generate_3d_structure",
            description: "Build a 3D conformer with hydrogens and return it as a MOL block.",
            example: r#"{"tool": "chemistry_tool", "action": "generate_3d_structure", "molecule": "CCO"}"#,
        },
        ToolSpec {
            tool: ToolKind::SpectrumTool,
            action: "analyze_peaks",
            description: "Check candidate structures against observed NMR peak positions by counting symmetry-distinct environments. Optional: \"candidates\" (SMILES list), \"nucleus\" (13C, 1H, 19F, 31P, 15N; default 13C).",
            example: r#"{"tool": "spectrum_tool", "action": "analyze_peaks", "peaks": [170.5, 133.8, 130.2, 129.4, 128.5], "hint": "white solid, C7H6O2"}"#,
        },
    ];
    CATALOG
}

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub succeeded: bool,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(text: impl Into<String>, structured_data: Map<String, Value>) -> Self {
        Self {
            succeeded: true,
            text: text.into(),
            structured_data: Some(structured_data),
            error: None,
        }
    }

    /// A failure the generator can react to; the loop keeps going.
    pub fn failure(text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            text: text.into(),
            structured_data: None,
            error: Some(error.into()),
        }
    }

    pub fn with_data(mut self, structured_data: Map<String, Value>) -> Self {
        self.structured_data = Some(structured_data);
        self
    }
}

/// A failure that ends the turn.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{action} failed: {source}")]
    Adapter {
        action: &'static str,
        #[source]
        source: AdapterError,
    },

    #[error("candidate proposal failed: {0}")]
    Generator(String),
}

/// A tool result plus the text appended to the generator's context.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub result: ToolResult,
    pub context_delta: String,
}

/// Routes invocations to the chemistry adapter and the verifier.
pub struct ToolDispatcher {
    chemistry: Arc<dyn Cheminformatics>,
    generator: Arc<dyn Generator>,
}

impl ToolDispatcher {
    pub fn new(chemistry: Arc<dyn Cheminformatics>, generator: Arc<dyn Generator>) -> Self {
        Self {
            chemistry,
            generator,
        }
    }

    pub async fn dispatch(
        &self,
        invocation: &ToolInvocation,
        context: &str,
    ) -> Result<Dispatch, ExecutionError> {
        tracing::info!("Dispatching {}", invocation.label());
        let chem = self.chemistry.as_ref();

        let (result, note) = match invocation {
            ToolInvocation::Chemistry(ChemistryAction::CalculateProperties { molecule }) => {
                (chemistry::calculate_properties(chem, molecule).await?, None)
            }
            ToolInvocation::Chemistry(ChemistryAction::GenerateStructureImage { molecule }) => {
                let result = chemistry::generate_structure_image(chem, molecule).await?;
                let note = result.succeeded.then_some(
                    "The structure image is shown to the user. Do not call generate_structure_image again in this turn.",
                );
                (result, note)
            }
            ToolInvocation::Chemistry(ChemistryAction::Generate3dStructure { molecule }) => {
                (chemistry::generate_3d_structure(chem, molecule).await?, None)
            }
            ToolInvocation::Spectrum(SpectrumAction::AnalyzePeaks {
                peaks,
                hint,
                candidates,
                nucleus,
            }) => {
                let request = spectrum::PeakRequest {
                    peaks,
                    hint: hint.as_deref(),
                    candidates: candidates.as_deref(),
                    nucleus: nucleus.unwrap_or_default(),
                };
                (
                    spectrum::analyze_peaks(chem, self.generator.as_ref(), request, context)
                        .await?,
                    None,
                )
            }
        };

        if let Some(error) = &result.error {
            tracing::warn!("{} did not succeed: {}", invocation.label(), error);
        }

        Ok(Dispatch {
            context_delta: context_delta(invocation, &result, note),
            result,
        })
    }
}

fn context_delta(invocation: &ToolInvocation, result: &ToolResult, note: Option<&str>) -> String {
    let status = if result.succeeded { "ok" } else { "failed" };
    let mut delta = format!("[Tool result: {} ({})]\n{}", invocation.label(), status, result.text);
    if let Some(error) = &result.error {
        delta.push_str(&format!("\nError: {}", error));
    }
    if let Some(note) = note {
        delta.push('\n');
        delta.push_str(note);
    }
    delta
}

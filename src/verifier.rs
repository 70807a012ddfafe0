//! Candidate structure verification against observed spectral peaks.
//!
//! Each candidate's expected number of distinct signals is the number of
//! symmetry classes among the observed nucleus' atoms. Candidates whose
//! count is within [`TOLERANCE`] of the observed peak count are consistent;
//! the score is `100 - difference`, floored at zero.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chem::molecule::{Element, Molecule};
use crate::chem::symmetry::count_classes;
use crate::chem::{AdapterError, Cheminformatics};

/// Largest signal-count difference still considered consistent.
pub const TOLERANCE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Nucleus {
    #[default]
    #[serde(rename = "13C")]
    C13,
    #[serde(rename = "1H")]
    H1,
    #[serde(rename = "19F")]
    F19,
    #[serde(rename = "31P")]
    P31,
    #[serde(rename = "15N")]
    N15,
}

impl Nucleus {
    pub fn as_str(self) -> &'static str {
        match self {
            Nucleus::C13 => "13C",
            Nucleus::H1 => "1H",
            Nucleus::F19 => "19F",
            Nucleus::P31 => "31P",
            Nucleus::N15 => "15N",
        }
    }

    fn element(self) -> Element {
        match self {
            Nucleus::C13 => Element::C,
            Nucleus::H1 => Element::H,
            Nucleus::F19 => Element::F,
            Nucleus::P31 => Element::P,
            Nucleus::N15 => Element::N,
        }
    }
}

impl fmt::Display for Nucleus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Nucleus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "13C" | "C13" | "C" => Ok(Nucleus::C13),
            "1H" | "H1" | "H" => Ok(Nucleus::H1),
            "19F" | "F19" | "F" => Ok(Nucleus::F19),
            "31P" | "P31" | "P" => Ok(Nucleus::P31),
            "15N" | "N15" | "N" => Ok(Nucleus::N15),
            other => Err(format!("unsupported nucleus: {}", other)),
        }
    }
}

/// One candidate scored against the observed peaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStructure {
    /// Canonical SMILES.
    pub identifier: String,
    pub predicted_signal_count: usize,
    pub observed_peak_count: usize,
    pub difference: usize,
    pub consistent: bool,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub identifier: String,
    pub reason: String,
}

/// Outcome of verifying a set of candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub nucleus: Nucleus,
    pub observed_peak_count: usize,
    /// Best consistent candidate, if any.
    pub best: Option<CandidateStructure>,
    /// Every evaluated candidate, score descending, proposal order on ties.
    pub ranked: Vec<CandidateStructure>,
    pub rejected: Vec<RejectedCandidate>,
}

/// Distinct signals the molecule should show for a nucleus. For 1H this is
/// the number of hydrogen-bearing heavy-atom environments.
pub fn predicted_signal_count(mol: &Molecule, nucleus: Nucleus) -> usize {
    match nucleus {
        Nucleus::H1 => count_classes(mol, |i| {
            let atom = mol.atom(i);
            atom.element != Element::H && atom.hydrogens > 0
        }),
        other => {
            let element = other.element();
            count_classes(mol, |i| mol.atom(i).element == element)
        }
    }
}

pub fn evaluate(
    identifier: &str,
    mol: &Molecule,
    observed_peaks: &[f64],
    nucleus: Nucleus,
) -> CandidateStructure {
    let predicted = predicted_signal_count(mol, nucleus);
    let observed = observed_peaks.len();
    let difference = predicted.abs_diff(observed);
    CandidateStructure {
        identifier: identifier.to_string(),
        predicted_signal_count: predicted,
        observed_peak_count: observed,
        difference,
        consistent: difference <= TOLERANCE,
        score: (100.0 - difference as f64).max(0.0),
    }
}

/// Score resolved candidates, given as `(canonical SMILES, graph)` in
/// proposal order.
pub fn verify(
    candidates: &[(String, Arc<Molecule>)],
    observed_peaks: &[f64],
    nucleus: Nucleus,
) -> Verification {
    let mut ranked: Vec<CandidateStructure> = candidates
        .iter()
        .map(|(id, mol)| evaluate(id, mol, observed_peaks, nucleus))
        .collect();
    // Stable: equal scores keep proposal order.
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    let best = ranked.iter().find(|c| c.consistent).cloned();

    Verification {
        nucleus,
        observed_peak_count: observed_peaks.len(),
        best,
        ranked,
        rejected: Vec::new(),
    }
}

/// Resolve candidate identifiers through the adapter and verify them.
/// Unresolvable identifiers, and identifiers whose lookup failed, are listed
/// as rejected. Fails only when lookups failed and nothing resolved.
pub async fn verify_candidates(
    adapter: &dyn Cheminformatics,
    identifiers: &[String],
    observed_peaks: &[f64],
    nucleus: Nucleus,
) -> Result<Verification, AdapterError> {
    let mut resolved = Vec::new();
    let mut rejected = Vec::new();
    let mut first_error = None;
    for id in identifiers {
        match adapter.resolve(id).await {
            Ok(Some(structure)) => resolved.push((structure.smiles, structure.molecule)),
            Ok(None) => {
                tracing::debug!("Rejecting candidate '{}': could not be resolved", id);
                rejected.push(RejectedCandidate {
                    identifier: id.clone(),
                    reason: "could not be parsed as a structure".to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Rejecting candidate '{}': {}", id, e);
                rejected.push(RejectedCandidate {
                    identifier: id.clone(),
                    reason: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }
    if resolved.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    let peaks = observed_peaks.to_vec();
    let mut verification =
        tokio::task::spawn_blocking(move || verify(&resolved, &peaks, nucleus)).await?;
    verification.rejected = rejected;
    Ok(verification)
}

impl Verification {
    /// Markdown report for the generator's context.
    pub fn to_table(&self) -> String {
        let mut out = format!(
            "Observed {} {} peaks (tolerance ±{} signals).\n\n",
            self.observed_peak_count, self.nucleus, TOLERANCE
        );
        if !self.ranked.is_empty() {
            out.push_str("| Candidate | Predicted signals | Difference | Consistent | Score |\n");
            out.push_str("|---|---|---|---|---|\n");
            for c in &self.ranked {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    c.identifier,
                    c.predicted_signal_count,
                    c.difference,
                    if c.consistent { "yes" } else { "no" },
                    c.score
                ));
            }
        }
        for r in &self.rejected {
            out.push_str(&format!("Rejected {}: {}\n", r.identifier, r.reason));
        }
        match &self.best {
            Some(best) => out.push_str(&format!(
                "\nBest candidate: {} (score {}).",
                best.identifier, best.score
            )),
            None => out.push_str("\nNo candidate is consistent with the observed peaks."),
        }
        out
    }
}

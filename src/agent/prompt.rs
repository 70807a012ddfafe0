//! Prompt templates for the agent.

use crate::tools::catalog;
use crate::verifier::{Nucleus, TOLERANCE};

/// Build the system prompt with tool definitions.
pub fn build_system_prompt() -> String {
    let tool_descriptions = catalog()
        .iter()
        .map(|t| {
            format!(
                "- **{} / {}**: {}\n  Example: `{}`",
                t.tool.as_str(),
                t.action,
                t.description,
                t.example
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a professional chemistry assistant with expertise in organic, inorganic, physical and analytical chemistry.

## Your Capabilities

You can call the following tools:
{tool_descriptions}

## Calling Tools

To call a tool, reply with a ```json code block holding one tool object, or an array of tool objects to run several in order. The system runs them and shows you the results. Molecules are given as SMILES strings or common compound names.

## Rules and Guidelines

1. **Be accurate** - Use the tools for numbers (weights, formulas, counts) instead of estimating them.

2. **Use the context** - Base the answer on the provided reference material. If it is not enough, say so and add general chemistry knowledge.

3. **Explain** - Give the underlying principles, formulas and equations where they help.

4. **Safety** - Mention relevant safety precautions when the question involves experiments or hazardous chemicals.

5. **Finish in prose** - When you have what you need, answer in plain text without any JSON."#,
        tool_descriptions = tool_descriptions
    )
}

/// Build the user prompt, with or without retrieved reference material.
pub fn build_user_prompt(question: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            r#"Answer the user's question using the following chemistry reference material.

Reference material:
{context}

Question:
{question}

Give an accurate, detailed answer based on the reference material. If it does not fully answer the question, say so and add what you know."#
        ),
        None => format!(
            r#"Answer the following chemistry question:

{question}

Give an accurate, detailed answer, including the relevant principles, formulas and examples."#
        ),
    }
}

/// Instructions for proposing candidate structures for a peak list.
pub fn build_candidate_prompt(nucleus: Nucleus) -> String {
    format!(
        r#"You are an expert in NMR structure elucidation. Given observed {nucleus} chemical shifts and optional hints, propose up to 5 plausible candidate structures.

Reply with only a JSON array of SMILES strings, most likely first, for example ["OC(=O)c1ccccc1", "COC(=O)c1ccccc1"]. Symmetry-equivalent atoms give one signal, so the number of distinct environments should be within {TOLERANCE} of the number of peaks."#
    )
}

/// The proposal request: peaks, hint, and the conversation so far.
pub fn build_candidate_request(
    peaks: &[f64],
    hint: Option<&str>,
    nucleus: Nucleus,
    context: &str,
) -> String {
    let shifts = peaks
        .iter()
        .map(|p| format!("{p}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut request = format!("Observed {nucleus} peaks ({} total, ppm): {shifts}", peaks.len());
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        request.push_str(&format!("\nHint: {hint}"));
    }
    let context = context.trim();
    if !context.is_empty() {
        // Keep the tail; the newest results matter most.
        let tail: String = {
            let chars: Vec<char> = context.chars().collect();
            let start = chars.len().saturating_sub(2000);
            chars[start..].iter().collect()
        };
        request.push_str(&format!("\n\nConversation so far:\n{tail}"));
    }
    request
}

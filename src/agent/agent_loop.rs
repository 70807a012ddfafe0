//! Core agent loop implementation.
//!
//! One conversational turn alternates between generation and tool dispatch:
//!
//! ```text
//! AWAITING_GENERATION --tool calls--> DISPATCHING --ok--> AWAITING_GENERATION
//!         |                                |
//!         +-- no calls / parse error /     +-- execution error --> done
//!             cap reached --> done
//! ```
//!
//! The state of a turn lives in [`LoopState`], which is consumed into a
//! [`LoopOutcome`] once the loop stops.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::chem::{Cheminformatics, LocalChemistry, PubChemResolver};
use crate::config::Config;
use crate::llm::{Generator, OpenAiCompatClient};
use crate::tools::{ToolDispatcher, ToolInvocation, ToolResult};

use super::prompt::{build_system_prompt, build_user_prompt};
use super::protocol::{parse_tool_calls, strip_payload, strip_reasoning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    NoToolCall,
    ErrorParsing,
    ErrorExecuting,
    CapReached,
}

/// One dispatched round.
#[derive(Debug, Clone, Serialize)]
pub struct AgentTurn {
    pub index: usize,
    pub generator_text: String,
    pub invocations: Vec<ToolInvocation>,
    pub results: Vec<ToolResult>,
}

/// What a finished turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct LoopOutcome {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub answer: String,
    pub termination_reason: TerminationReason,
    pub turns: Vec<AgentTurn>,
    /// Structured tool output keyed `"<turn>.<position>.<action>"`.
    pub artifacts: Map<String, Value>,
}

/// Per-turn loop state.
#[derive(Debug)]
pub struct LoopState {
    turns: Vec<AgentTurn>,
    iteration_cap: usize,
    context: String,
    previous_text: Option<String>,
    artifacts: Map<String, Value>,
}

impl LoopState {
    fn new(iteration_cap: usize, context: String) -> Self {
        Self {
            turns: Vec::new(),
            iteration_cap,
            context,
            previous_text: None,
            artifacts: Map::new(),
        }
    }

    fn cap_reached(&self) -> bool {
        self.turns.len() >= self.iteration_cap
    }

    fn record(&mut self, turn: AgentTurn) {
        for (pos, (invocation, result)) in turn.invocations.iter().zip(&turn.results).enumerate() {
            if let Some(data) = &result.structured_data {
                self.artifacts.insert(
                    format!("{}.{}.{}", turn.index, pos, invocation.action()),
                    Value::Object(data.clone()),
                );
            }
        }
        self.turns.push(turn);
    }

    fn append_round(&mut self, generator_text: &str, deltas: &[String]) {
        self.context.push_str("\n\n## Assistant\n");
        self.context.push_str(generator_text);
        self.context.push_str("\n\n## Tool results\n");
        self.context.push_str(&deltas.join("\n\n"));
        self.context.push_str(
            "\n\nUse these results to answer the question, or call another tool if something is still missing.",
        );
        self.previous_text = Some(generator_text.to_string());
    }

    fn finish(self, answer: String, reason: TerminationReason) -> LoopOutcome {
        tracing::info!(
            "Turn finished: {:?} after {} tool round(s)",
            reason,
            self.turns.len()
        );
        LoopOutcome {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            answer,
            termination_reason: reason,
            turns: self.turns,
            artifacts: self.artifacts,
        }
    }
}

/// The chemistry agent.
pub struct Agent {
    generator: Arc<dyn Generator>,
    dispatcher: ToolDispatcher,
    iteration_cap: usize,
}

impl Agent {
    /// Create an agent from configuration: an OpenAI-compatible generator
    /// and the local chemistry toolkit.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let generator: Arc<dyn Generator> = Arc::new(OpenAiCompatClient::from_config(config)?);
        let mut chemistry =
            LocalChemistry::new(config.image_width, config.image_height, config.embed_seed);
        if config.resolve_names {
            chemistry = chemistry.with_name_resolver(PubChemResolver::new(&config.pubchem_base_url)?);
        }
        Ok(Self::with_parts(
            generator,
            Arc::new(chemistry),
            config.max_tool_iterations,
        ))
    }

    pub fn with_parts(
        generator: Arc<dyn Generator>,
        chemistry: Arc<dyn Cheminformatics>,
        iteration_cap: usize,
    ) -> Self {
        Self {
            dispatcher: ToolDispatcher::new(chemistry, Arc::clone(&generator)),
            generator,
            iteration_cap,
        }
    }

    /// Answer one question, calling tools as the generator asks for them.
    ///
    /// Fails only when the generator itself cannot be reached; tool and
    /// protocol failures end the turn with the matching
    /// [`TerminationReason`].
    pub async fn run_turn(
        &self,
        question: &str,
        retrieved_context: Option<&str>,
    ) -> anyhow::Result<LoopOutcome> {
        let system_prompt = build_system_prompt();
        let mut state = LoopState::new(
            self.iteration_cap,
            build_user_prompt(question, retrieved_context),
        );

        loop {
            let round = state.turns.len() + 1;
            tracing::debug!("Agent round {}", round);

            let raw = self.generator.generate(&system_prompt, &state.context).await?;
            let text = strip_reasoning(&raw);
            tracing::debug!("Generator said: {}", truncate_for_log(&text, 500));

            let invocations = match parse_tool_calls(&text) {
                Ok(invocations) => invocations,
                Err(e) => {
                    tracing::warn!("Round {}: could not parse tool calls: {}", round, e);
                    let answer = state.previous_text.clone().unwrap_or(text);
                    return Ok(state.finish(answer, TerminationReason::ErrorParsing));
                }
            };

            if invocations.is_empty() {
                return Ok(state.finish(text, TerminationReason::NoToolCall));
            }
            if state.cap_reached() {
                tracing::warn!(
                    "Tool round cap of {} reached with {} pending call(s)",
                    self.iteration_cap,
                    invocations.len()
                );
                return Ok(state.finish(text, TerminationReason::CapReached));
            }

            let mut results = Vec::with_capacity(invocations.len());
            let mut deltas = Vec::with_capacity(invocations.len());
            for (pos, invocation) in invocations.iter().enumerate() {
                match self.dispatcher.dispatch(invocation, &state.context).await {
                    Ok(dispatch) => {
                        tracing::debug!(
                            "{} -> {}",
                            invocation.label(),
                            truncate_for_log(&dispatch.result.text, 300)
                        );
                        results.push(dispatch.result);
                        deltas.push(dispatch.context_delta);
                    }
                    Err(e) => {
                        tracing::error!("Round {}: {} failed: {}", round, invocation.label(), e);
                        results.push(ToolResult::failure(
                            format!("{} could not be completed.", invocation.label()),
                            e.to_string(),
                        ));
                        for skipped in &invocations[pos + 1..] {
                            results.push(ToolResult::failure(
                                format!("{} was skipped after an earlier failure.", skipped.label()),
                                "skipped",
                            ));
                        }
                        let answer = execution_failure_answer(&text, invocation, &results[..pos]);
                        state.record(AgentTurn {
                            index: round,
                            generator_text: text,
                            invocations: invocations.clone(),
                            results,
                        });
                        return Ok(state.finish(answer, TerminationReason::ErrorExecuting));
                    }
                }
            }

            state.append_round(&text, &deltas);
            state.record(AgentTurn {
                index: round,
                generator_text: text,
                invocations,
                results,
            });
        }
    }
}

/// Prose of the failing round, a short failure line, and whatever the
/// earlier invocations of the round produced.
fn execution_failure_answer(
    generator_text: &str,
    failed: &ToolInvocation,
    completed: &[ToolResult],
) -> String {
    let mut parts = Vec::new();
    let prose = strip_payload(generator_text);
    if !prose.is_empty() {
        parts.push(prose);
    }
    parts.push(format!(
        "Sorry, the {} step could not be completed, so this answer may be incomplete.",
        failed.action()
    ));
    for result in completed {
        parts.push(result.text.clone());
    }
    parts.join("\n\n")
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}... [truncated]", &s[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::chem::{
        AdapterError, CanonicalStructure, EmbedStrategy, ImageBytes, PropertySet, StructureBlock,
    };

    /// Replays canned replies and records the context of every call.
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<String>>,
        repeat_last: Option<String>,
        contexts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                repeat_last: None,
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn forever(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::new()),
                repeat_last: Some(reply.to_string()),
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn contexts(&self) -> Vec<String> {
            self.contexts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str, context: &str) -> anyhow::Result<String> {
            self.contexts.lock().unwrap().push(context.to_string());
            let next = self.replies.lock().unwrap().pop_front();
            next.or_else(|| self.repeat_last.clone())
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    /// Resolves everything, then fails every computation.
    struct BrokenChemistry;

    #[async_trait]
    impl Cheminformatics for BrokenChemistry {
        async fn resolve(
            &self,
            identifier: &str,
        ) -> Result<Option<CanonicalStructure>, AdapterError> {
            if identifier == "offline" {
                return Err(AdapterError::Lookup("network unreachable".to_string()));
            }
            LocalChemistry::new(100, 100, Some(1)).resolve(identifier).await
        }

        fn properties(&self, structure: &CanonicalStructure) -> PropertySet {
            PropertySet::compute(&structure.molecule)
        }

        async fn render_2d(&self, _: &CanonicalStructure) -> Result<ImageBytes, AdapterError> {
            Err(AdapterError::Worker("renderer crashed".to_string()))
        }

        async fn embed_3d(
            &self,
            _: &CanonicalStructure,
            _: EmbedStrategy,
        ) -> Result<StructureBlock, AdapterError> {
            Err(AdapterError::Worker("embedder crashed".to_string()))
        }
    }

    fn agent(generator: Arc<ScriptedGenerator>, cap: usize) -> Agent {
        Agent::with_parts(
            generator,
            Arc::new(LocalChemistry::new(200, 200, Some(3))),
            cap,
        )
    }

    const PROPS_CALL: &str = "```json\n{\"tool\": \"chemistry_tool\", \"action\": \"calculate_properties\", \"molecule\": \"OC(=O)c1ccccc1\"}\n```";

    #[tokio::test]
    async fn plain_answer_ends_without_tools() {
        let generator = ScriptedGenerator::new(&["Water boils at 100 °C at 1 atm."]);
        let outcome = agent(generator, 3).run_turn("Boiling point of water?", None).await.unwrap();
        assert_eq!(outcome.termination_reason, TerminationReason::NoToolCall);
        assert_eq!(outcome.answer, "Water boils at 100 °C at 1 atm.");
        assert!(outcome.turns.is_empty());
    }

    #[tokio::test]
    async fn tool_round_then_answer() {
        let generator = ScriptedGenerator::new(&[PROPS_CALL, "Benzoic acid weighs 122.12 g/mol."]);
        let outcome = agent(generator.clone(), 3)
            .run_turn("Molecular weight of benzoic acid?", Some("Benzoic acid is C7H6O2."))
            .await
            .unwrap();
        assert_eq!(outcome.termination_reason, TerminationReason::NoToolCall);
        assert_eq!(outcome.turns.len(), 1);
        assert_eq!(outcome.turns[0].results.len(), 1);
        assert!(outcome.turns[0].results[0].succeeded);
        assert!(outcome.artifacts.contains_key("1.0.calculate_properties"));

        let contexts = generator.contexts();
        assert!(contexts[0].contains("Benzoic acid is C7H6O2."));
        assert!(contexts[1].contains("C7H6O2"));
        assert!(contexts[1].contains("[Tool result: chemistry_tool/calculate_properties (ok)]"));
    }

    #[tokio::test]
    async fn cap_bounds_dispatch_rounds() {
        for cap in 1..=4 {
            let generator = ScriptedGenerator::forever(PROPS_CALL);
            let outcome = agent(generator.clone(), cap).run_turn("loop", None).await.unwrap();
            assert_eq!(outcome.termination_reason, TerminationReason::CapReached);
            assert_eq!(outcome.turns.len(), cap);
            assert_eq!(outcome.answer, PROPS_CALL);
            assert_eq!(generator.contexts().len(), cap + 1);
        }
    }

    #[tokio::test]
    async fn unterminated_json_returns_text_unchanged() {
        let reply = "{\"tool\": \"chemistry_tool\", \"action\": \"calculate_properties\", \"molecule\": \"CCO\"";
        let outcome = agent(ScriptedGenerator::new(&[reply]), 3)
            .run_turn("Ethanol?", None)
            .await
            .unwrap();
        assert_eq!(outcome.termination_reason, TerminationReason::ErrorParsing);
        assert_eq!(outcome.answer, reply);
        assert!(outcome.turns.is_empty());
    }

    #[tokio::test]
    async fn parse_error_after_a_round_keeps_previous_text() {
        let generator = ScriptedGenerator::new(&[PROPS_CALL, "```json\n[{\"tool\": "]);
        let outcome = agent(generator, 3).run_turn("q", None).await.unwrap();
        assert_eq!(outcome.termination_reason, TerminationReason::ErrorParsing);
        assert_eq!(outcome.answer, PROPS_CALL);
        assert_eq!(outcome.turns.len(), 1);
    }

    #[tokio::test]
    async fn unresolved_molecule_continues_the_loop() {
        let call = r#"{"tool": "chemistry_tool", "action": "calculate_properties", "molecule": "xyzabc123"}"#;
        let generator = ScriptedGenerator::new(&[call, "I could not identify that molecule."]);
        let outcome = agent(generator.clone(), 3).run_turn("Properties of xyzabc123?", None).await.unwrap();

        assert_eq!(outcome.termination_reason, TerminationReason::NoToolCall);
        let result = &outcome.turns[0].results[0];
        assert!(!result.succeeded);
        assert!(result.error.is_some());
        assert!(generator.contexts()[1].contains("(failed)"));
        assert_eq!(outcome.answer, "I could not identify that molecule.");
    }

    #[tokio::test]
    async fn execution_error_ends_turn_with_partial_results() {
        let batch = r#"Let me draw it.
```json
[
  {"tool": "chemistry_tool", "action": "calculate_properties", "molecule": "CCO"},
  {"tool": "chemistry_tool", "action": "generate_structure_image", "molecule": "CCO"},
  {"tool": "chemistry_tool", "action": "generate_3d_structure", "molecule": "CCO"}
]
```"#;
        let generator = ScriptedGenerator::new(&[batch]);
        let agent = Agent::with_parts(generator, Arc::new(BrokenChemistry), 3);
        let outcome = agent.run_turn("Draw ethanol", None).await.unwrap();

        assert_eq!(outcome.termination_reason, TerminationReason::ErrorExecuting);
        let turn = &outcome.turns[0];
        assert_eq!(turn.invocations.len(), turn.results.len());
        assert!(turn.results[0].succeeded);
        assert!(!turn.results[1].succeeded);
        assert_eq!(turn.results[2].error.as_deref(), Some("skipped"));

        assert!(outcome.answer.starts_with("Let me draw it."));
        assert!(outcome.answer.contains("generate_structure_image step could not be completed"));
        assert!(outcome.answer.contains("C2H6O"));
        assert!(!outcome.answer.contains("renderer crashed"));
    }

    #[tokio::test]
    async fn reasoning_is_not_part_of_the_answer() {
        let generator = ScriptedGenerator::new(&["<think>Maybe call a tool?</think>\nNaCl is table salt."]);
        let outcome = agent(generator, 3).run_turn("What is NaCl?", None).await.unwrap();
        assert_eq!(outcome.answer, "NaCl is table salt.");
    }

    #[tokio::test]
    async fn outcome_serializes_with_snake_case_reason() {
        let generator = ScriptedGenerator::new(&["done"]);
        let outcome = agent(generator, 3).run_turn("q", None).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["termination_reason"], "no_tool_call");
        assert_eq!(json["answer"], "done");
    }

    #[test]
    fn truncate_for_log_respects_char_boundaries() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ααααα", 2), "αα... [truncated]");
    }
}

//! Agent module - the tool-calling loop around the generator.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build context with system prompt, question and retrieved material
//! 2. Call the generator
//! 3. If the reply embeds tool calls, dispatch them and append the results
//! 4. Repeat until the reply has no tool call, something fails, or the
//!    round cap is reached

mod agent_loop;
mod prompt;
pub mod protocol;

pub use agent_loop::{Agent, AgentTurn, LoopOutcome, LoopState, TerminationReason};
pub use prompt::{
    build_candidate_prompt, build_candidate_request, build_system_prompt, build_user_prompt,
};

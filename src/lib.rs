//! # Chem Agent
//!
//! A chemistry question-answering agent that calls domain tools mid-answer.
//!
//! This library provides:
//! - A tool-calling agent loop bounded by a round cap
//! - A parser for tool calls embedded as JSON in generator text
//! - Chemistry tools: properties, 2D depiction, 3D embedding
//! - Spectral peak analysis that checks candidate structures by symmetry
//! - An OpenAI-compatible chat completion client
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Build context with system prompt, question and retrieved material
//! 2. Call the generator and parse any embedded tool calls
//! 3. Dispatch them in order and append the results to the context
//! 4. Repeat until the generator answers in prose, a step fails, or the cap is hit
//!
//! ## Example
//!
//! ```rust,ignore
//! use chem_agent::{agent::Agent, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(&config)?;
//! let outcome = agent.run_turn("What is the molecular weight of aspirin?", None).await?;
//! println!("{}", outcome.answer);
//! ```

pub mod agent;
pub mod chem;
pub mod config;
pub mod llm;
pub mod tools;
pub mod verifier;

pub use config::Config;

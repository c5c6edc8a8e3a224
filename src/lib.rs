//! soulresearch library
//!
//! Wires the research agent to its concrete collaborators (Chromium, the
//! semantic page analyzer and a structured-generation backend) behind the
//! `soulresearch` command line.

pub mod cli;
pub mod config;
pub mod llm;

pub use config::{AppConfig, LlmSettings, Provider};
pub use llm::build_generator;

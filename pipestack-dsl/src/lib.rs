//! PIPESTACK DSL - Stack Configuration Compiler & Template Synthesizer
//!
//! This crate turns a declarative stack file into a CloudFormation template
//! for a DynamoDB stream → EventBridge Pipe → SQS FIFO routing stack.
//!
//! Architecture:
//! ```text
//! Stack file (.toml / .yaml)
//!     ↓
//! Config Parser (serde → StackConfig)
//!     ↓
//! Compiler (validate + resource graph)
//!     ↓
//! CompiledStack (typed resources, grants, diagnostics)
//!     ↓
//! Synthesizer (ordered Template → JSON / YAML)
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod synth;

// Re-export key types for convenience
pub use compiler::*;
pub use config::*;
pub use error::*;
pub use synth::{synthesize, Output, Resource, SynthError, SynthResult, Template};

use std::path::Path;

/// Compile and synthesize a configuration in one step.
pub fn synthesize_config(config: &StackConfig) -> PipestackResult<Template> {
    let stack = StackCompiler::compile(config)?;
    Ok(synthesize(&stack)?)
}

/// Load, compile and synthesize a stack file.
pub fn synthesize_path(path: &Path) -> PipestackResult<Template> {
    let config = StackConfig::from_path(path)?;
    synthesize_config(&config)
}

//! Stack configuration (TOML / YAML stack files)

mod parser;

pub use parser::*;

//! Fuzz target for stack-file loading and compilation
//!
//! Run with: cargo +nightly fuzz run stack_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use pipestack_dsl::{synthesize, StackCompiler, StackConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(config) = StackConfig::from_toml_str(input) {
            // Whatever compiles must synthesize.
            if let Ok(stack) = StackCompiler::compile(&config) {
                synthesize(&stack).expect("compiled stack must synthesize");
            }
        }
    }
});

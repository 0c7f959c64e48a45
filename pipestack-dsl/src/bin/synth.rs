/// Stack Synthesizer - Renders a stack file as a CloudFormation template
///
/// Usage: cargo run --bin pipestack-synth [stack.toml|stack.yaml] [--format json|yaml]
///
/// Without a stack file the reference stack is synthesized. The template goes
/// to stdout; logs (filtered by RUST_LOG) go to stderr.

use pipestack_dsl::{synthesize, StackCompiler, StackConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

enum Format {
    Json,
    Yaml,
}

fn usage() -> ! {
    eprintln!("Usage: pipestack-synth [stack.toml|stack.yaml] [--format json|yaml]");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  RUST_LOG=debug cargo run --bin pipestack-synth stacks/orders.yaml --format json");
    std::process::exit(2);
}

fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pipestack_dsl=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let mut path: Option<PathBuf> = None;
    let mut format = Format::Json;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--format" => {
                format = match args.next().as_deref() {
                    Some("json") => Format::Json,
                    Some("yaml") => Format::Yaml,
                    _ => usage(),
                }
            }
            "-h" | "--help" => usage(),
            other if path.is_none() && !other.starts_with('-') => path = Some(PathBuf::from(other)),
            _ => usage(),
        }
    }

    let config = match &path {
        Some(path) => match StackConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("no stack file given, using the reference stack");
            StackConfig::reference()
        }
    };

    let stack = match StackCompiler::compile(&config) {
        Ok(stack) => stack,
        Err(e) => {
            eprintln!("❌ Compile error: {}", e);
            std::process::exit(1);
        }
    };

    let rendered = synthesize(&stack).and_then(|template| match format {
        Format::Json => template.to_json_string(),
        Format::Yaml => template.to_yaml_string(),
    });
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("❌ Synthesis error: {}", e);
            std::process::exit(1);
        }
    }
}

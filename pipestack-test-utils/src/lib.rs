//! Pipestack Test Utilities
//!
//! Shared test infrastructure for the pipestack workspace:
//! - Proptest generators for change events and stack configurations
//! - Fixtures for the reference stack and sample events
//! - Assertions over synthesized templates

// Re-export core types for convenience
pub use pipestack_core::{
    AttributeMap, AttributeValue, ChangeEvent, EventName, FieldPath, KeyAttributeType, LogLevel,
    QueueMessage, StartingPosition, StreamRecord, StreamViewType,
};
pub use pipestack_dsl::{
    CompiledStack, PipestackError, PipestackResult, StackCompiler, StackConfig, Template,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for events and stack variations.

    use super::*;
    use pipestack_dsl::DeadLetterConfig;
    use proptest::prelude::*;

    /// Event ids as the stream issues them: 32 lowercase hex digits.
    pub fn arb_event_id() -> impl Strategy<Value = String> {
        "[0-9a-f]{32}"
    }

    /// Key values a FIFO queue accepts as a group id.
    pub fn arb_key_value() -> impl Strategy<Value = String> {
        "[!-~]{1,128}"
    }

    pub fn arb_event_name() -> impl Strategy<Value = EventName> {
        prop_oneof![
            Just(EventName::Insert),
            Just(EventName::Modify),
            Just(EventName::Remove),
        ]
    }

    pub fn arb_starting_position() -> impl Strategy<Value = StartingPosition> {
        prop_oneof![
            Just(StartingPosition::Latest),
            Just(StartingPosition::TrimHorizon),
        ]
    }

    /// A change event on the reference table (`id` string key).
    pub fn arb_change_event() -> impl Strategy<Value = ChangeEvent> {
        (arb_event_id(), arb_event_name(), arb_key_value(), any::<u32>())
            .prop_map(|(event_id, event_name, key, sequence)| {
                fixtures::change_event(&event_id, event_name, &key, &sequence.to_string())
            })
    }

    /// Valid variations of the reference stack.
    pub fn arb_stack_config() -> impl Strategy<Value = StackConfig> {
        (
            arb_starting_position(),
            0u32..=10_000,
            proptest::option::of(1u32..=10_000),
            proptest::option::of(0u32..=300),
            any::<bool>(),
        )
            .prop_map(|(position, retries, batch_size, window, with_dlq)| {
                let mut config = StackConfig::reference();
                config.pipe.source.starting_position = position;
                config.pipe.source.maximum_retry_attempts = retries;
                config.pipe.source.batch_size = batch_size;
                config.pipe.source.maximum_batching_window_seconds = window;
                config.pipe.source.dead_letter = with_dlq.then(DeadLetterConfig::default);
                config
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// A NEW_AND_OLD_IMAGES event on the reference table.
    pub fn change_event(event_id: &str, event_name: EventName, key: &str, sequence: &str) -> ChangeEvent {
        let keys: AttributeMap = [("id".to_string(), AttributeValue::S(key.to_string()))]
            .into_iter()
            .collect();
        let image = |status: &str| {
            let mut image = keys.clone();
            image.insert("status".to_string(), AttributeValue::S(status.to_string()));
            image
        };
        ChangeEvent {
            event_id: event_id.to_string(),
            event_name,
            event_version: "1.1".to_string(),
            event_source: "aws:dynamodb".to_string(),
            aws_region: "eu-west-1".to_string(),
            dynamodb: StreamRecord {
                approximate_creation_date_time: Some(1_700_000_000),
                keys: keys.clone(),
                new_image: (event_name != EventName::Remove).then(|| image("shipped")),
                old_image: (event_name != EventName::Insert).then(|| image("packed")),
                sequence_number: sequence.to_string(),
                size_bytes: 26,
                stream_view_type: StreamViewType::NewAndOldImages,
                extra: Default::default(),
            },
            event_source_arn: "arn:aws:dynamodb:eu-west-1:123456789012:table/Table/stream/2024-01-01T00:00:00.000"
                .to_string(),
            extra: Default::default(),
        }
    }

    /// The modification of item `42` under event `E1`.
    pub fn sample_event() -> ChangeEvent {
        change_event("E1", EventName::Modify, "42", "111")
    }

    /// The reference stack, compiled.
    pub fn reference_stack() -> CompiledStack {
        match StackCompiler::compile(&StackConfig::reference()) {
            Ok(stack) => stack,
            Err(e) => panic!("reference stack must compile: {}", e),
        }
    }

    /// The reference stack, synthesized.
    pub fn reference_template() -> Template {
        match pipestack_dsl::synthesize_config(&StackConfig::reference()) {
            Ok(template) => template,
            Err(e) => panic!("reference stack must synthesize: {}", e),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over synthesized templates.

    use super::*;
    use serde_json::Value;

    /// Assert that a PipestackResult is a Compile error.
    #[track_caller]
    pub fn assert_compile_error<T: std::fmt::Debug>(result: &PipestackResult<T>) {
        match result {
            Err(PipestackError::Compile(_)) => {}
            other => panic!("Expected Compile error, got: {:?}", other),
        }
    }

    /// Assert that every resource appears after everything it references or depends on.
    #[track_caller]
    pub fn assert_dependency_order(template: &Template) {
        let ids: Vec<&str> = template.resource_ids().collect();
        for (position, (id, resource)) in template.resources.iter().enumerate() {
            let upstream = resource
                .referenced_ids()
                .into_iter()
                .chain(resource.depends_on.iter().cloned());
            for dep in upstream {
                let dep_position = ids
                    .iter()
                    .position(|candidate| *candidate == dep)
                    .unwrap_or_else(|| panic!("{} references undeclared {}", id, dep));
                assert!(
                    dep_position < position,
                    "{} appears before its dependency {}",
                    id,
                    dep
                );
            }
        }
    }

    /// Leaf paths where two JSON documents differ.
    pub fn differing_leaves(a: &Value, b: &Value) -> Vec<String> {
        let mut out = Vec::new();
        diff(a, b, String::new(), &mut out);
        out
    }

    fn diff(a: &Value, b: &Value, at: String, out: &mut Vec<String>) {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => {
                let keys: std::collections::BTreeSet<&String> = x.keys().chain(y.keys()).collect();
                for key in keys {
                    match (x.get(key), y.get(key)) {
                        (Some(l), Some(r)) => diff(l, r, format!("{}/{}", at, key), out),
                        _ => out.push(format!("{}/{}", at, key)),
                    }
                }
            }
            (Value::Array(x), Value::Array(y)) if x.len() == y.len() => {
                for (i, (l, r)) in x.iter().zip(y).enumerate() {
                    diff(l, r, format!("{}/{}", at, i), out);
                }
            }
            _ if a != b => out.push(at),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_event_shape() {
        let event = fixtures::sample_event();
        assert_eq!(event.key_str("id"), Some("42"));
        let value = event.to_json().unwrap();
        assert_eq!(value["dynamodb"]["Keys"]["id"]["S"], "42");
        assert_eq!(value["eventName"], "MODIFY");
    }

    #[test]
    fn test_differing_leaves() {
        let a = json!({ "x": { "y": 1, "z": [1, 2] } });
        let b = json!({ "x": { "y": 2, "z": [1, 2] } });
        assert_eq!(assertions::differing_leaves(&a, &b), vec!["/x/y".to_string()]);
        assert!(assertions::differing_leaves(&a, &a).is_empty());
    }

    #[test]
    fn test_reference_template_is_ordered() {
        assertions::assert_dependency_order(&fixtures::reference_template());
    }
}

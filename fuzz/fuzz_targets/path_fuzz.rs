//! Fuzz target for the field-path parser
//!
//! Any UTF-8 input must parse or fail with a positioned syntax error, and
//! every parsed path must print back to a string that parses to itself.
//!
//! Run with: cargo +nightly fuzz run path_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use pipestack_core::{EventSchema, FieldPath, KeyAttributeType, PathError, StreamViewType};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match FieldPath::parse(input) {
            Ok(path) => {
                let printed = path.to_string();
                let reparsed = FieldPath::parse(&printed).expect("printed path must parse");
                assert_eq!(reparsed, path);

                // Schema checking must not panic either.
                let schema = EventSchema::new(StreamViewType::NewAndOldImages)
                    .with_key("id", KeyAttributeType::String);
                let _ = schema.check(&path);
            }
            Err(PathError::Syntax { column, message }) => {
                assert!(column >= 1, "Error column should be >= 1");
                assert!(column <= input.chars().count() + 1);
                assert!(!message.is_empty(), "Error message should not be empty");
            }
            Err(other) => panic!("parser returned a non-syntax error: {:?}", other),
        }
    }
});

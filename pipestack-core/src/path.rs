//! Typed field-path expressions over change events
//!
//! Paths use the JSONPath subset the pipe service accepts for dynamic
//! parameters: a `$` root followed by `.name`, `['name']` or `[index]`
//! segments. Parsing produces a `FieldPath`; `EventSchema` then checks the
//! path against the fixed change-event shape before anything is deployed.

use crate::{KeyAttributeType, PathError, StreamViewType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

// ============================================================================
// AST
// ============================================================================

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// A parsed path expression rooted at the event document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Convenience constructor for a path made only of field names.
    pub fn fields(names: &[&str]) -> Self {
        Self::new(
            names
                .iter()
                .map(|name| Segment::Field((*name).to_string()))
                .collect(),
        )
    }

    pub fn parse(source: &str) -> Result<Self, PathError> {
        PathParser::new(source).parse()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `$` on its own selects the whole event.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk the path through a JSON document.
    pub fn evaluate<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Field(name) => current.as_object()?.get(name),
                Segment::Index(index) => current.as_array()?.get(*index),
            })
    }

    /// Walk the path and require a string at the end of it.
    pub fn resolve_str<'v>(&self, value: &'v Value) -> Result<&'v str, PathError> {
        match self.evaluate(value) {
            None | Some(Value::Null) => Err(PathError::Missing {
                path: self.to_string(),
            }),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(PathError::NotString {
                path: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) if !name.is_empty() && name.chars().all(is_ident_char) => {
                    write!(f, ".{}", name)?
                }
                Segment::Field(name) => {
                    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
                    write!(f, "['{}']", escaped)?
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// ============================================================================
// PARSER
// ============================================================================

struct PathParser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> PathParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn parse(mut self) -> Result<FieldPath, PathError> {
        match self.chars.next() {
            Some((_, '$')) => {}
            Some((offset, c)) => {
                return Err(self.error(offset, format!("expected '$', found '{}'", c)))
            }
            None => return Err(self.error(0, "empty path")),
        }

        let mut segments = Vec::new();
        while let Some((offset, c)) = self.chars.next() {
            match c {
                '.' => segments.push(Segment::Field(self.identifier(offset)?)),
                '[' => segments.push(self.bracket(offset)?),
                other => {
                    return Err(self.error(offset, format!("unexpected character '{}'", other)))
                }
            }
        }

        Ok(FieldPath { segments })
    }

    fn identifier(&mut self, dot: usize) -> Result<String, PathError> {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !is_ident_char(c) {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        if name.is_empty() {
            return Err(self.error(dot + 1, "expected field name after '.'"));
        }
        Ok(name)
    }

    fn bracket(&mut self, open: usize) -> Result<Segment, PathError> {
        match self.chars.peek().copied() {
            Some((_, quote @ ('\'' | '"'))) => {
                self.chars.next();
                let mut name = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, '\\')) => match self.chars.next() {
                            Some((_, escaped)) => name.push(escaped),
                            None => return Err(self.error(self.source.len(), "unterminated escape")),
                        },
                        Some((_, c)) => name.push(c),
                        None => return Err(self.error(open, "unterminated quoted field name")),
                    }
                }
                self.expect_close(open)?;
                Ok(Segment::Field(name))
            }
            Some((_, c)) if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = self.chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    self.chars.next();
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| self.error(open + 1, "index out of range"))?;
                self.expect_close(open)?;
                Ok(Segment::Index(index))
            }
            Some((offset, c)) => Err(self.error(
                offset,
                format!("expected quoted name or index, found '{}'", c),
            )),
            None => Err(self.error(open, "unterminated '['")),
        }
    }

    fn expect_close(&mut self, open: usize) -> Result<(), PathError> {
        match self.chars.next() {
            Some((_, ']')) => Ok(()),
            Some((offset, c)) => Err(self.error(offset, format!("expected ']', found '{}'", c))),
            None => Err(self.error(open, "unterminated '['")),
        }
    }

    /// Columns are 1-based and counted in characters.
    fn error(&self, byte_offset: usize, message: impl Into<String>) -> PathError {
        let end = byte_offset.min(self.source.len());
        PathError::Syntax {
            column: self.source[..end].chars().count() + 1,
            message: message.into(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// JSON kind a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Bool,
    Object,
    List,
}

/// The change-event shape for one source table.
///
/// Key attributes and the stream view type decide which `Keys`, `NewImage`
/// and `OldImage` paths are valid.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSchema {
    key_attributes: Vec<(String, KeyAttributeType)>,
    stream_view: StreamViewType,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Event,
    Record,
    Keys,
    /// An attribute map (`NewImage`, `OldImage` or a nested `M`)
    Image,
    KeyAttribute(KeyAttributeType),
    Attribute,
    List,
    Set,
    Scalar(ValueKind),
}

impl Node {
    fn kind(self) -> ValueKind {
        match self {
            Node::List | Node::Set => ValueKind::List,
            Node::Scalar(kind) => kind,
            _ => ValueKind::Object,
        }
    }
}

impl EventSchema {
    pub fn new(stream_view: StreamViewType) -> Self {
        Self {
            key_attributes: Vec::new(),
            stream_view,
        }
    }

    pub fn with_key(mut self, name: impl Into<String>, attribute_type: KeyAttributeType) -> Self {
        self.key_attributes.push((name.into(), attribute_type));
        self
    }

    pub fn stream_view(&self) -> StreamViewType {
        self.stream_view
    }

    fn key_type(&self, name: &str) -> Option<KeyAttributeType> {
        self.key_attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, attribute_type)| *attribute_type)
    }

    /// Check a path against the event shape and report what it selects.
    pub fn check(&self, path: &FieldPath) -> Result<ValueKind, PathError> {
        let unknown = |field: &str| PathError::UnknownField {
            path: path.to_string(),
            field: field.to_string(),
        };

        let mut node = Node::Event;
        for segment in path.segments() {
            node = match (node, segment) {
                (Node::Scalar(_), _) => {
                    return Err(PathError::ScalarDescent {
                        path: path.to_string(),
                    })
                }
                (Node::Event, Segment::Field(field)) => match field.as_str() {
                    "eventID" | "eventName" | "eventVersion" | "eventSource" | "awsRegion"
                    | "eventSourceARN" => Node::Scalar(ValueKind::String),
                    "dynamodb" => Node::Record,
                    other => return Err(unknown(other)),
                },
                (Node::Record, Segment::Field(field)) => match field.as_str() {
                    "ApproximateCreationDateTime" | "SizeBytes" => Node::Scalar(ValueKind::Number),
                    "SequenceNumber" | "StreamViewType" => Node::Scalar(ValueKind::String),
                    "Keys" => Node::Keys,
                    "NewImage" if self.stream_view.includes_new_image() => Node::Image,
                    "OldImage" if self.stream_view.includes_old_image() => Node::Image,
                    image @ ("NewImage" | "OldImage") => {
                        return Err(PathError::ImageNotCaptured {
                            path: path.to_string(),
                            image: image.to_string(),
                            view: self.stream_view,
                        })
                    }
                    other => return Err(unknown(other)),
                },
                (Node::Keys, Segment::Field(name)) => match self.key_type(name) {
                    Some(attribute_type) => Node::KeyAttribute(attribute_type),
                    None => {
                        return Err(PathError::UnknownKeyAttribute { name: name.clone() })
                    }
                },
                (Node::KeyAttribute(expected), Segment::Field(descriptor)) => {
                    match KeyAttributeType::from_descriptor(descriptor) {
                        Some(found) if found == expected => Node::Scalar(ValueKind::String),
                        _ => {
                            let name = match path.segments().get(2) {
                                Some(Segment::Field(name)) => name.clone(),
                                _ => String::new(),
                            };
                            return Err(PathError::KeyTypeMismatch {
                                name,
                                expected,
                                found: descriptor.clone(),
                            });
                        }
                    }
                }
                (Node::Image, Segment::Field(_)) => Node::Attribute,
                (Node::Attribute, Segment::Field(descriptor)) => match descriptor.as_str() {
                    "S" | "N" | "B" => Node::Scalar(ValueKind::String),
                    "BOOL" | "NULL" => Node::Scalar(ValueKind::Bool),
                    "M" => Node::Image,
                    "L" => Node::List,
                    "SS" | "NS" | "BS" => Node::Set,
                    other => return Err(unknown(other)),
                },
                (Node::List, Segment::Index(_)) => Node::Attribute,
                (Node::Set, Segment::Index(_)) => Node::Scalar(ValueKind::String),
                (Node::List | Node::Set, Segment::Field(field)) => return Err(unknown(field)),
                (_, Segment::Index(_)) => {
                    return Err(PathError::NotIndexable {
                        path: path.to_string(),
                    })
                }
            };
        }

        Ok(node.kind())
    }

    /// Require the path to select a string scalar.
    pub fn check_string(&self, path: &FieldPath) -> Result<(), PathError> {
        match self.check(path)? {
            ValueKind::String => Ok(()),
            _ => Err(PathError::NotString {
                path: path.to_string(),
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema() -> EventSchema {
        EventSchema::new(StreamViewType::NewAndOldImages).with_key("id", KeyAttributeType::String)
    }

    #[test]
    fn test_parse_dotted_path() {
        let path = FieldPath::parse("$.dynamodb.Keys.id.S").unwrap();
        assert_eq!(path, FieldPath::fields(&["dynamodb", "Keys", "id", "S"]));
        assert_eq!(path.to_string(), "$.dynamodb.Keys.id.S");
    }

    #[test]
    fn test_parse_bracket_segments() {
        let path = FieldPath::parse("$.dynamodb.NewImage['first name'].L[2].S").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Field("dynamodb".into()),
                Segment::Field("NewImage".into()),
                Segment::Field("first name".into()),
                Segment::Field("L".into()),
                Segment::Index(2),
                Segment::Field("S".into()),
            ]
        );
        assert_eq!(
            path.to_string(),
            "$.dynamodb.NewImage['first name'].L[2].S"
        );
    }

    #[test]
    fn test_empty_field_name_round_trips() {
        let path = FieldPath::fields(&["dynamodb", ""]);
        assert_eq!(path.to_string(), "$.dynamodb['']");
        assert_eq!(FieldPath::parse("$.dynamodb['']").unwrap(), path);
    }

    #[test]
    fn test_parse_root() {
        assert!(FieldPath::parse("$").unwrap().is_root());
    }

    #[test]
    fn test_parse_errors_carry_columns() {
        let cases = [
            ("", 1),
            ("eventID", 1),
            ("$.", 3),
            ("$..a", 3),
            ("$.a b", 4),
            ("$['a'", 2),
            ("$[x]", 3),
            ("$[1", 2),
        ];
        for (source, expected) in cases {
            match FieldPath::parse(source) {
                Err(PathError::Syntax { column, .. }) => {
                    assert_eq!(column, expected, "column for {:?}", source)
                }
                other => panic!("expected syntax error for {:?}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_serde_as_string() {
        let path: FieldPath = serde_json::from_str("\"$.eventID\"").unwrap();
        assert_eq!(path, FieldPath::fields(&["eventID"]));
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"$.eventID\"");
        assert!(serde_json::from_str::<FieldPath>("\"eventID\"").is_err());
    }

    #[test]
    fn test_evaluate() {
        let doc = json!({
            "eventID": "E1",
            "dynamodb": { "Keys": { "id": { "S": "42" } }, "SizeBytes": 12 }
        });
        let group = FieldPath::parse("$.dynamodb.Keys.id.S").unwrap();
        assert_eq!(group.resolve_str(&doc).unwrap(), "42");
        let size = FieldPath::parse("$.dynamodb.SizeBytes").unwrap();
        assert!(matches!(size.resolve_str(&doc), Err(PathError::NotString { .. })));
        let missing = FieldPath::parse("$.dynamodb.NewImage.foo.S").unwrap();
        assert!(matches!(missing.resolve_str(&doc), Err(PathError::Missing { .. })));
    }

    #[test]
    fn test_schema_accepts_reference_paths() {
        let schema = schema();
        schema
            .check_string(&FieldPath::parse("$.eventID").unwrap())
            .unwrap();
        schema
            .check_string(&FieldPath::parse("$.dynamodb.Keys.id.S").unwrap())
            .unwrap();
        assert_eq!(
            schema
                .check(&FieldPath::parse("$.dynamodb.NewImage.tags.SS[0]").unwrap())
                .unwrap(),
            ValueKind::String
        );
    }

    #[test]
    fn test_schema_rejects_unknown_and_mistyped_paths() {
        let schema = schema();
        let check = |p: &str| schema.check_string(&FieldPath::parse(p).unwrap());

        assert!(matches!(check("$.eventId"), Err(PathError::UnknownField { .. })));
        assert!(matches!(
            check("$.dynamodb.Keys.pk.S"),
            Err(PathError::UnknownKeyAttribute { .. })
        ));
        match check("$.dynamodb.Keys.id.N") {
            Err(PathError::KeyTypeMismatch { name, found, .. }) => {
                assert_eq!(name, "id");
                assert_eq!(found, "N");
            }
            other => panic!("expected key type mismatch, got {:?}", other),
        }
        assert!(matches!(check("$.dynamodb.SizeBytes"), Err(PathError::NotString { .. })));
        assert!(matches!(check("$.dynamodb.Keys"), Err(PathError::NotString { .. })));
        assert!(matches!(check("$.eventID.S"), Err(PathError::ScalarDescent { .. })));
        assert!(matches!(check("$.dynamodb[0]"), Err(PathError::NotIndexable { .. })));
    }

    #[test]
    fn test_schema_respects_stream_view() {
        let keys_only =
            EventSchema::new(StreamViewType::KeysOnly).with_key("id", KeyAttributeType::String);
        let err = keys_only
            .check_string(&FieldPath::parse("$.dynamodb.NewImage.id.S").unwrap())
            .unwrap_err();
        assert!(matches!(err, PathError::ImageNotCaptured { .. }));

        let new_only =
            EventSchema::new(StreamViewType::NewImage).with_key("id", KeyAttributeType::String);
        assert!(new_only
            .check_string(&FieldPath::parse("$.dynamodb.NewImage.id.S").unwrap())
            .is_ok());
        assert!(new_only
            .check_string(&FieldPath::parse("$.dynamodb.OldImage.id.S").unwrap())
            .is_err());
    }

    fn arb_segment() -> impl Strategy<Value = Segment> {
        prop_oneof![
            "[A-Za-z_][A-Za-z0-9_-]{0,8}".prop_map(Segment::Field),
            "[ a-z.'\\\\]{0,6}".prop_map(Segment::Field),
            (0usize..1000).prop_map(Segment::Index),
        ]
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(segments in prop::collection::vec(arb_segment(), 0..6)) {
            let path = FieldPath::new(segments);
            let reparsed = FieldPath::parse(&path.to_string()).unwrap();
            prop_assert_eq!(reparsed, path);
        }

        #[test]
        fn prop_parse_never_panics(source in "\\PC{0,24}") {
            let _ = FieldPath::parse(&source);
        }
    }
}

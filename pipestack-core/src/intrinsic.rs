//! Cross-resource references resolved by the provisioning engine

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A value that only exists once the referenced resource has been created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Intrinsic {
    /// `{"Ref": logical_id}`
    Ref(String),
    /// `{"Fn::GetAtt": [logical_id, attribute]}`
    GetAtt { logical_id: String, attribute: String },
}

impl Intrinsic {
    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Intrinsic::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    /// The resource this reference creates an implicit dependency on.
    pub fn logical_id(&self) -> &str {
        match self {
            Intrinsic::Ref(id) => id,
            Intrinsic::GetAtt { logical_id, .. } => logical_id,
        }
    }
}

impl Serialize for Intrinsic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Intrinsic::Ref(id) => map.serialize_entry("Ref", id)?,
            Intrinsic::GetAtt {
                logical_id,
                attribute,
            } => map.serialize_entry("Fn::GetAtt", &[logical_id, attribute])?,
        }
        map.end()
    }
}

/// Resource element of a policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceArn {
    /// `"*"`, used only where the action cannot be scoped
    Any,
    Arn(Intrinsic),
}

impl ResourceArn {
    pub fn referenced_id(&self) -> Option<&str> {
        match self {
            ResourceArn::Any => None,
            ResourceArn::Arn(intrinsic) => Some(intrinsic.logical_id()),
        }
    }
}

impl Serialize for ResourceArn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResourceArn::Any => serializer.serialize_str("*"),
            ResourceArn::Arn(intrinsic) => intrinsic.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intrinsic_json() {
        let get_att = Intrinsic::get_att("TableCD117FA1", "StreamArn");
        assert_eq!(
            serde_json::to_value(&get_att).unwrap(),
            json!({ "Fn::GetAtt": ["TableCD117FA1", "StreamArn"] })
        );
        let reference = Intrinsic::Ref("Queue4A7E3555".into());
        assert_eq!(
            serde_json::to_value(&reference).unwrap(),
            json!({ "Ref": "Queue4A7E3555" })
        );
        assert_eq!(reference.logical_id(), "Queue4A7E3555");
    }

    #[test]
    fn test_resource_arn_wildcard() {
        assert_eq!(serde_json::to_value(ResourceArn::Any).unwrap(), json!("*"));
        assert_eq!(ResourceArn::Any.referenced_id(), None);
    }
}

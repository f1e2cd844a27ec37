//! Wire representation of view nodes.
//!
//! Every field is optional so that a patch can tell "absent" apart from
//! "present but empty". `error: null` deserializes to `Some(Value::Null)`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ModelChild>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_handlers: Option<BTreeMap<String, EventTarget>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<ExternalSource>,
}

impl Model {
    pub fn element(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: Some(tag_name.into()),
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children
            .get_or_insert_with(Vec::new)
            .push(ModelChild::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Model) -> Self {
        self.children
            .get_or_insert_with(Vec::new)
            .push(ModelChild::Node(child));
        self
    }

    pub fn with_event(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.event_handlers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), EventTarget::new(target));
        self
    }

    pub fn with_error(mut self, error: impl Into<Value>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_import_source(mut self, source: ExternalSource) -> Self {
        self.import_source = Some(source);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelChild {
    Text(String),
    Node(Model),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTarget {
    pub target: String,
    #[serde(default)]
    pub prevent_default: bool,
    #[serde(default)]
    pub stop_propagation: bool,
}

impl EventTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            prevent_default: false,
            stop_propagation: false,
        }
    }
}

/// Descriptor for a node whose view comes from externally loaded component code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSource {
    /// Bundle location or registry key, depending on `source_type`.
    pub source: String,
    #[serde(default)]
    pub source_type: SourceType,
    /// Component name inside the bundle. Falls back to the node's tag name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
    #[serde(default)]
    pub unmount_before_update: bool,
}

impl ExternalSource {
    pub fn named(key: impl Into<String>) -> Self {
        Self {
            source: key.into(),
            source_type: SourceType::Name,
            name: None,
            config: None,
            fallback: None,
            unmount_before_update: false,
        }
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn unmounting_before_update(mut self) -> Self {
        self.unmount_before_update = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    #[default]
    #[serde(rename = "NAME")]
    Name,
    #[serde(rename = "URL")]
    Url,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fallback {
    Text(String),
    Model(Box<Model>),
}

/// JavaScript-style truthiness, which is what the remote side means by
/// "error is set".
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn deserialize_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(key) => Ok(Some(key)),
        Value::Number(key) => Ok(Some(key.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "key must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Model {
        serde_json::from_value(value).expect("decode model")
    }

    #[test]
    fn absent_and_null_error_are_distinct() {
        assert_eq!(parse(json!({"tagName": "div"})).error, None);
        assert_eq!(
            parse(json!({"tagName": "div", "error": null})).error,
            Some(Value::Null)
        );
        assert_eq!(
            parse(json!({"error": false})).error,
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn numeric_keys_become_strings() {
        assert_eq!(parse(json!({"key": 7})).key.as_deref(), Some("7"));
        assert_eq!(parse(json!({"key": "a"})).key.as_deref(), Some("a"));
        assert!(serde_json::from_value::<Model>(json!({"key": [1]})).is_err());
    }

    #[test]
    fn children_mix_text_and_nodes() {
        let model = parse(json!({"children": ["a", {"tagName": "b"}]}));
        assert_eq!(
            model.children,
            Some(vec![
                ModelChild::Text("a".to_string()),
                ModelChild::Node(Model::element("b")),
            ])
        );
    }

    #[test]
    fn import_source_defaults() {
        let model = parse(json!({
            "tagName": "Chart",
            "importSource": {"source": "charts", "fallback": "loading..."}
        }));
        let source = model.import_source.expect("import source");
        assert_eq!(source.source_type, SourceType::Name);
        assert!(!source.unmount_before_update);
        assert_eq!(source.fallback, Some(Fallback::Text("loading...".to_string())));
    }

    #[test]
    fn structured_fallback_decodes_as_model() {
        let model = parse(json!({
            "importSource": {
                "source": "https://cdn.example/x.js",
                "sourceType": "URL",
                "fallback": {"tagName": "em", "children": ["wait"]}
            }
        }));
        let source = model.import_source.expect("import source");
        assert_eq!(source.source_type, SourceType::Url);
        match source.fallback {
            Some(Fallback::Model(fallback)) => {
                assert_eq!(fallback.tag_name.as_deref(), Some("em"));
            }
            other => panic!("expected structured fallback, got {other:?}"),
        }
    }

    #[test]
    fn truthiness_follows_remote_semantics() {
        assert!(is_truthy(&json!("boom")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&Value::Null));
    }
}

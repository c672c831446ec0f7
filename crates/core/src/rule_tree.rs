//! Rule tree data model
//!
//! Typed view of the vendor's property-rules document:
//! - `PropertyRules`: the envelope (`rules`, `ruleFormat`, `etag`, ...)
//! - `RuleTree`: a named node with ordered behaviors and children
//! - `Behavior`: a named directive with an ordered options map
//! - `Variable`: a user variable declared on the root node
//!
//! Fields the tool does not interpret (criteria, comments, uuids, ...) are kept
//! in `extra` so a fetched document round-trips without losing data.

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered option mapping of a behavior.
pub type OptionMap = IndexMap<String, OptionValue>;

/// Vendor fields carried through untouched.
pub type ExtraFields = IndexMap<String, Value>;

/// A behavior option value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum OptionValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<OptionValue>),
    Map(OptionMap),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OptionMap> {
        match self {
            OptionValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[OptionValue]> {
        match self {
            OptionValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => OptionValue::Null,
            Value::Bool(b) => OptionValue::Bool(b),
            Value::Number(n) => OptionValue::Number(n),
            Value::String(s) => OptionValue::String(s),
            Value::Array(items) => {
                OptionValue::List(items.into_iter().map(OptionValue::from).collect())
            }
            Value::Object(map) => OptionValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, OptionValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<OptionValue> for Value {
    fn from(value: OptionValue) -> Self {
        match value {
            OptionValue::Null => Value::Null,
            OptionValue::Bool(b) => Value::Bool(b),
            OptionValue::Number(n) => Value::Number(n),
            OptionValue::String(s) => Value::String(s),
            OptionValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            OptionValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Number(v.into())
    }
}

impl From<u16> for OptionValue {
    fn from(v: u16) -> Self {
        OptionValue::Number(v.into())
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::String(v.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::String(v)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(items: Vec<T>) -> Self {
        OptionValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<OptionMap> for OptionValue {
    fn from(map: OptionMap) -> Self {
        OptionValue::Map(map)
    }
}

/// A named configuration directive attached to a rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Behavior {
    pub name: String,
    #[serde(default)]
    pub options: OptionMap,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Behavior {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// A user variable declared on the root rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub sensitive: bool,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: description.into(),
            hidden: false,
            sensitive: false,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let content = Option::<String>::deserialize(deserializer)?;
    Ok(content.unwrap_or_default())
}

/// A node of the rule tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleTree {
    pub name: String,
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
    #[serde(default)]
    pub children: Vec<RuleTree>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl RuleTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn with_child(mut self, child: RuleTree) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Whether any behavior on this node (not descendants) has the given name.
    pub fn has_behavior(&self, name: &str) -> bool {
        self.behaviors.iter().any(|b| b.name == name)
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// The property-rules document exchanged with the control plane.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyRules {
    pub rules: RuleTree,
    #[serde(rename = "ruleFormat", default, skip_serializing_if = "Option::is_none")]
    pub rule_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl PropertyRules {
    pub fn new(rules: RuleTree) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    /// Document carrying only the `rules` subtree, as accepted for upload.
    pub fn upload_body(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            rule_format: None,
            etag: None,
            extra: ExtraFields::new(),
        }
    }
}

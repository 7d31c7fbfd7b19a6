//! Workflow node types and configurations.
//!
//! Nodes are the steps of an email automation. Each node has:
//! - An ID assigned by the editing canvas
//! - A position on the canvas
//! - A label shown on the canvas
//! - Configuration specific to its kind
//!
//! On the wire a node is `{ id, type, position, data }` where `data` is
//! `{ label, config, .. }`. `config` holds the kind-specific settings and any
//! other field of `data` is carried through untouched.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use ulid::Ulid;

/// Identifier of a node within a workflow graph.
///
/// IDs are chosen by the caller; [`NodeId::generate`] produces fresh ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wraps a caller-supplied identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier of the form `<kind>-<ulid>`.
    #[must_use]
    pub fn generate(kind: NodeKind) -> Self {
        Self(format!("{}-{}", kind.as_str(), Ulid::new().to_string().to_lowercase()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A point on the editing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the point halfway between `self` and `other`.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// The fixed vocabulary of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point that starts the automation.
    Trigger,
    /// Sends an email built from a template.
    Email,
    /// Waits for a fixed duration.
    Delay,
    /// Branches on a contact attribute.
    Condition,
    /// Performs a side effect such as tagging a contact.
    Action,
    /// Terminates a path.
    End,
}

impl NodeKind {
    /// All kinds in palette order.
    pub const ALL: [Self; 6] = [
        Self::Trigger,
        Self::Email,
        Self::Delay,
        Self::Condition,
        Self::Action,
        Self::End,
    ];

    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Email => "email",
            Self::Delay => "delay",
            Self::Condition => "condition",
            Self::Action => "action",
            Self::End => "end",
        }
    }

    /// Returns the label the palette gives new nodes of this kind.
    #[must_use]
    pub const fn default_label(&self) -> &'static str {
        match self {
            Self::Trigger => "Trigger",
            Self::Email => "Email",
            Self::Delay => "Delay",
            Self::Condition => "Condition",
            Self::Action => "Action",
            Self::End => "End",
        }
    }

    /// Returns the default configuration for a new node of this kind.
    #[must_use]
    pub fn default_config(&self) -> NodeConfig {
        match self {
            Self::Trigger => NodeConfig::Trigger(TriggerNodeConfig::default()),
            Self::Email => NodeConfig::Email(EmailNodeConfig::default()),
            Self::Delay => NodeConfig::Delay(DelayNodeConfig::default()),
            Self::Condition => NodeConfig::Condition(ConditionNodeConfig::default()),
            Self::Action => NodeConfig::Action(ActionNodeConfig::default()),
            Self::End => NodeConfig::End(EndNodeConfig::default()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON object holding fields this crate does not interpret.
pub type Extra = serde_json::Map<String, JsonValue>;

/// Configuration for trigger nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerNodeConfig {
    /// The contact event that starts the workflow (e.g. `user_signup`).
    pub trigger_type: String,
    /// Additional filters on the event.
    pub conditions: Vec<JsonValue>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for TriggerNodeConfig {
    fn default() -> Self {
        Self {
            trigger_type: "user_signup".to_string(),
            conditions: Vec::new(),
            extra: Extra::new(),
        }
    }
}

/// Configuration for email nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailNodeConfig {
    /// Recipient expression.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Name of the rendered template, if one has been picked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for EmailNodeConfig {
    fn default() -> Self {
        Self {
            to: "{{user.email}}".to_string(),
            subject: String::new(),
            template: None,
            extra: Extra::new(),
        }
    }
}

/// Unit for delay durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Minutes,
    Hours,
    #[default]
    Days,
    Weeks,
}

/// Configuration for delay nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayNodeConfig {
    /// Number of units to wait.
    pub delay: u32,
    /// Unit of `delay`.
    pub delay_unit: DelayUnit,
    #[serde(flatten)]
    pub extra: Extra,
}

impl DelayNodeConfig {
    #[must_use]
    pub fn new(delay: u32, delay_unit: DelayUnit) -> Self {
        Self {
            delay,
            delay_unit,
            extra: Extra::new(),
        }
    }

    /// Returns the configured wait as a duration.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        let amount = i64::from(self.delay);
        match self.delay_unit {
            DelayUnit::Minutes => TimeDelta::minutes(amount),
            DelayUnit::Hours => TimeDelta::hours(amount),
            DelayUnit::Days => TimeDelta::days(amount),
            DelayUnit::Weeks => TimeDelta::weeks(amount),
        }
    }
}

impl Default for DelayNodeConfig {
    fn default() -> Self {
        Self::new(1, DelayUnit::Days)
    }
}

/// Comparison used by condition nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// Configuration for condition nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionNodeConfig {
    /// Contact attribute to inspect (e.g. `user.plan`).
    pub field: String,
    pub operator: ConditionOperator,
    /// Value to compare against.
    pub value: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Configuration for action nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionNodeConfig {
    /// The action to perform (e.g. `add_tag`).
    pub action: String,
    /// Action-specific parameters.
    #[serde(skip_serializing_if = "JsonValue::is_null")]
    pub parameters: JsonValue,
    #[serde(flatten)]
    pub extra: Extra,
}

/// End nodes have no settings of their own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndNodeConfig {
    #[serde(flatten)]
    pub extra: Extra,
}

/// Configuration for a node, varying by kind.
///
/// On the wire this is the `config` object inside a node's `data`. Fields
/// the kind does not know are kept in each variant's `extra` map.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Trigger(TriggerNodeConfig),
    Email(EmailNodeConfig),
    Delay(DelayNodeConfig),
    Condition(ConditionNodeConfig),
    Action(ActionNodeConfig),
    End(EndNodeConfig),
}

impl NodeConfig {
    /// Returns the kind of node this configuration belongs to.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Trigger(_) => NodeKind::Trigger,
            Self::Email(_) => NodeKind::Email,
            Self::Delay(_) => NodeKind::Delay,
            Self::Condition(_) => NodeKind::Condition,
            Self::Action(_) => NodeKind::Action,
            Self::End(_) => NodeKind::End,
        }
    }

    /// Decodes the configuration for `kind` from a `config` object.
    ///
    /// `null` yields the kind's defaults, as do missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` does not match the kind's configuration
    /// shape.
    pub fn from_value(kind: NodeKind, value: JsonValue) -> Result<Self, serde_json::Error> {
        let value = if value.is_null() {
            JsonValue::Object(Extra::new())
        } else {
            value
        };

        Ok(match kind {
            NodeKind::Trigger => Self::Trigger(serde_json::from_value(value)?),
            NodeKind::Email => Self::Email(serde_json::from_value(value)?),
            NodeKind::Delay => Self::Delay(serde_json::from_value(value)?),
            NodeKind::Condition => Self::Condition(serde_json::from_value(value)?),
            NodeKind::Action => Self::Action(serde_json::from_value(value)?),
            NodeKind::End => Self::End(serde_json::from_value(value)?),
        })
    }

    /// Encodes the configuration as its `config` object.
    #[must_use]
    pub fn to_value(&self) -> JsonValue {
        let value = match self {
            Self::Trigger(c) => serde_json::to_value(c),
            Self::Email(c) => serde_json::to_value(c),
            Self::Delay(c) => serde_json::to_value(c),
            Self::Condition(c) => serde_json::to_value(c),
            Self::Action(c) => serde_json::to_value(c),
            Self::End(c) => serde_json::to_value(c),
        };
        value.unwrap_or_else(|_| JsonValue::Object(Extra::new()))
    }
}

/// A decoded `data` object: `{ label, config, ..extra }`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub label: Option<String>,
    pub config: NodeConfig,
    /// Every field besides `label` and `config`, kept as received.
    pub extra: Extra,
}

#[derive(Deserialize)]
struct RawNodeData {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    config: JsonValue,
    #[serde(flatten)]
    extra: Extra,
}

impl NodeData {
    /// Decodes a node's `data` object for `kind`. `null` is an empty object.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not an object, `label` is not a string,
    /// or `config` does not match the kind's configuration shape.
    pub fn decode(kind: NodeKind, data: JsonValue) -> Result<Self, serde_json::Error> {
        let raw: RawNodeData = if data.is_null() {
            serde_json::from_value(JsonValue::Object(Extra::new()))?
        } else {
            serde_json::from_value(data)?
        };
        Ok(Self {
            label: raw.label,
            config: NodeConfig::from_value(kind, raw.config)?,
            extra: raw.extra,
        })
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

impl From<NodeConfig> for NodeData {
    fn from(config: NodeConfig) -> Self {
        Self {
            label: None,
            config,
            extra: Extra::new(),
        }
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord", into = "NodeRecord")]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// Top-left corner on the canvas.
    pub position: Position,
    /// Human-readable label shown on the canvas.
    pub label: String,
    /// Node configuration (determines the kind).
    pub config: NodeConfig,
    /// Fields of `data` besides `label` and `config`, such as `templateId`.
    pub extra: Extra,
}

impl Node {
    /// Creates a node with the default configuration for `kind`.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            label: kind.default_label().to_string(),
            config: kind.default_config(),
            extra: Extra::new(),
        }
    }

    /// Creates a node with an explicit configuration.
    #[must_use]
    pub fn with_config(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        config: NodeConfig,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            label: label.into(),
            config,
            extra: Extra::new(),
        }
    }

    /// Builds a node from a decoded `data` object. A missing label falls back
    /// to the kind's default.
    #[must_use]
    pub fn from_data(id: impl Into<NodeId>, data: NodeData, position: Position) -> Self {
        let label = data
            .label
            .unwrap_or_else(|| data.config.kind().default_label().to_string());
        Self {
            id: id.into(),
            position,
            label,
            config: data.config,
            extra: data.extra,
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets a field of `data` outside the label and configuration.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns the kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    /// Returns the ID of the email template record an email node sends.
    #[must_use]
    pub fn template_id(&self) -> Option<&str> {
        match self.config {
            NodeConfig::Email(_) => self.extra.get("templateId").and_then(JsonValue::as_str),
            _ => None,
        }
    }

    /// Returns the `data` object this node is stored as.
    #[must_use]
    pub fn data(&self) -> JsonValue {
        let mut data = self.extra.clone();
        data.insert("config".to_string(), self.config.to_value());
        data.insert("label".to_string(), JsonValue::String(self.label.clone()));
        JsonValue::Object(data)
    }
}

/// Wire form of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: JsonValue,
}

/// Error decoding a node's `data` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDataError {
    pub node_id: NodeId,
    pub kind: NodeKind,
    pub reason: String,
}

impl fmt::Display for NodeDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid data for {} node {}: {}",
            self.kind, self.node_id, self.reason
        )
    }
}

impl std::error::Error for NodeDataError {}

impl TryFrom<NodeRecord> for Node {
    type Error = NodeDataError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        let data = NodeData::decode(record.kind, record.data).map_err(|e| NodeDataError {
            node_id: record.id.clone(),
            kind: record.kind,
            reason: e.to_string(),
        })?;
        Ok(Self::from_data(record.id, data, record.position))
    }
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        Self {
            kind: node.kind(),
            data: node.data(),
            id: node.id,
            position: node.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_ids_carry_kind_prefix() {
        let id = NodeId::generate(NodeKind::Email);
        assert!(id.as_str().starts_with("email-"));
        assert_ne!(id, NodeId::generate(NodeKind::Email));
    }

    #[test]
    fn midpoint_halves_both_axes() {
        let a = Position::new(0.0, 100.0);
        let b = Position::new(200.0, 300.0);
        assert_eq!(a.midpoint(&b), Position::new(100.0, 200.0));
    }

    #[test]
    fn new_node_uses_kind_defaults() {
        let node = Node::new("d1", NodeKind::Delay, Position::default());
        assert_eq!(node.label, "Delay");
        assert_eq!(node.kind(), NodeKind::Delay);
        assert_eq!(
            node.config,
            NodeConfig::Delay(DelayNodeConfig::new(1, DelayUnit::Days))
        );
        assert!(node.extra.is_empty());
    }

    #[test]
    fn decodes_wire_node_with_label_and_config() {
        let node: Node = serde_json::from_value(json!({
            "id": "2",
            "type": "email",
            "position": { "x": 300.0, "y": 100.0 },
            "data": {
                "label": "Welcome Email",
                "templateId": "1",
                "config": { "subject": "Hi", "template": "welcome-template" }
            }
        }))
        .expect("decode");

        assert_eq!(node.id, NodeId::from("2"));
        assert_eq!(node.label, "Welcome Email");
        assert_eq!(node.position, Position::new(300.0, 100.0));
        assert_eq!(node.template_id(), Some("1"));
        match node.config {
            NodeConfig::Email(config) => {
                assert_eq!(config.template.as_deref(), Some("welcome-template"));
                assert_eq!(config.subject, "Hi");
                assert_eq!(config.to, "{{user.email}}");
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    /// The node payloads of the demo workflow shipped with the original
    /// database seed.
    fn seeded_nodes() -> Vec<JsonValue> {
        vec![
            json!({
                "id": "1", "type": "trigger", "position": { "x": 100.0, "y": 100.0 },
                "data": {
                    "label": "Start",
                    "event": "user_signup",
                    "config": { "triggerType": "user_signup", "conditions": [] }
                }
            }),
            json!({
                "id": "2", "type": "email", "position": { "x": 300.0, "y": 100.0 },
                "data": {
                    "label": "Welcome Email",
                    "templateId": "1",
                    "config": {
                        "to": "{{user.email}}",
                        "subject": "Welcome to our platform!",
                        "template": "welcome-template"
                    }
                }
            }),
            json!({
                "id": "3", "type": "delay", "position": { "x": 500.0, "y": 100.0 },
                "data": { "label": "Wait 2 days", "config": { "delay": 2, "delayUnit": "days" } }
            }),
            json!({
                "id": "4", "type": "email", "position": { "x": 700.0, "y": 100.0 },
                "data": {
                    "label": "Follow-up Email",
                    "templateId": "2",
                    "config": {
                        "to": "{{user.email}}",
                        "subject": "How are you enjoying our platform?",
                        "template": "followup-template"
                    }
                }
            }),
            json!({
                "id": "5", "type": "end", "position": { "x": 900.0, "y": 100.0 },
                "data": { "label": "End", "config": {} }
            }),
        ]
    }

    #[test]
    fn seeded_nodes_survive_decode_and_encode_unchanged() {
        for stored in seeded_nodes() {
            let node: Node = serde_json::from_value(stored.clone()).expect("decode");
            let saved = serde_json::to_value(&node).expect("encode");
            assert_eq!(saved, stored);
        }
    }

    #[test]
    fn seeded_delay_keeps_its_duration() {
        let stored = seeded_nodes().swap_remove(2);
        let node: Node = serde_json::from_value(stored).expect("decode");
        match &node.config {
            NodeConfig::Delay(config) => assert_eq!(config.duration(), TimeDelta::days(2)),
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn unknown_config_fields_are_carried_through() {
        let stored = json!({
            "id": "c", "type": "condition", "position": { "x": 0.0, "y": 0.0 },
            "data": {
                "label": "Paid?",
                "color": "amber",
                "config": { "field": "user.plan", "value": "pro", "caseSensitive": false }
            }
        });
        let node: Node = serde_json::from_value(stored).expect("decode");
        assert_eq!(node.extra.get("color"), Some(&json!("amber")));

        let saved = serde_json::to_value(&node).expect("encode");
        assert_eq!(saved["data"]["color"], "amber");
        assert_eq!(saved["data"]["config"]["caseSensitive"], false);
        assert_eq!(saved["data"]["config"]["operator"], "equals");
    }

    #[test]
    fn missing_label_falls_back_to_kind_label() {
        let node: Node = serde_json::from_value(json!({
            "id": "e",
            "type": "end",
            "position": { "x": 0.0, "y": 0.0 }
        }))
        .expect("decode");
        assert_eq!(node.label, "End");
        assert_eq!(node.kind(), NodeKind::End);
    }

    #[test]
    fn rejects_data_of_wrong_shape() {
        let result: Result<Node, _> = serde_json::from_value(json!({
            "id": "d",
            "type": "delay",
            "data": { "label": "Wait", "config": { "delay": "two" } }
        }));
        assert!(result.is_err());

        let result: Result<Node, _> = serde_json::from_value(json!({
            "id": "d",
            "type": "delay",
            "data": ["not", "an", "object"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let result: Result<Node, _> = serde_json::from_value(json!({
            "id": "x",
            "type": "webhook",
            "data": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn encodes_label_next_to_config() {
        let node = Node::with_config(
            "t1",
            "User Signup",
            NodeConfig::Trigger(TriggerNodeConfig::default()),
            Position::new(250.0, 50.0),
        );
        let value = serde_json::to_value(&node).expect("encode");
        assert_eq!(value["type"], "trigger");
        assert_eq!(value["data"]["label"], "User Signup");
        assert_eq!(value["data"]["config"]["triggerType"], "user_signup");
        assert_eq!(value["position"]["x"], 250.0);
    }

    #[test]
    fn template_id_only_applies_to_email_nodes() {
        let delay = Node::new("d", NodeKind::Delay, Position::default()).with_extra("templateId", "1");
        assert_eq!(delay.template_id(), None);

        let email = Node::new("e", NodeKind::Email, Position::default()).with_extra("templateId", "1");
        assert_eq!(email.template_id(), Some("1"));
    }

    #[test]
    fn delay_duration_respects_unit() {
        let config = DelayNodeConfig::new(2, DelayUnit::Days);
        assert_eq!(config.duration(), TimeDelta::hours(48));
        assert_eq!(
            DelayNodeConfig::new(3, DelayUnit::Weeks).duration(),
            TimeDelta::days(21)
        );
    }
}

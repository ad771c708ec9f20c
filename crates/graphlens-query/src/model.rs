//! Property-graph snapshot types.
//!
//! These mirror the shapes the state container hands out: nodes and edges with
//! an optional label, an optional type and a flat map of scalar properties.
//! The engine never mutates them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Identity
// ============================================================================

/// Node or edge identity: either an integer or a string.
///
/// Equality is strict, so `EntityId::Int(1) != EntityId::Str("1")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

pub type NodeId = EntityId;
pub type EdgeId = EntityId;

impl EntityId {
    /// The id as a JSON value, for operator evaluation.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

// ============================================================================
// Nodes and edges
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            node_type: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
            edge_type: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether this edge touches `id` at either endpoint.
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }
}

/// A read-only `{nodes, edges}` view handed over by the state container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

// ============================================================================
// Entities (node-or-edge)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Edge,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Node(Node),
    Edge(Edge),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Edge(_) => EntityKind::Edge,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Self::Node(n) => &n.id,
            Self::Edge(e) => &e.id,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Node(n) => n.label.as_deref(),
            Self::Edge(e) => e.label.as_deref(),
        }
    }

    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Self::Node(n) => n.node_type.as_deref(),
            Self::Edge(e) => e.edge_type.as_deref(),
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        match self {
            Self::Node(n) => &n.properties,
            Self::Edge(e) => &e.properties,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(n) => Some(n),
            Self::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Self::Node(_) => None,
            Self::Edge(e) => Some(e),
        }
    }

    /// Resolve a named field for criteria matching.
    ///
    /// `id`, `label`, `type`, `source` and `target` address the entity itself;
    /// any other name addresses `properties[name]`. Missing fields are `None`.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id().to_value()),
            "label" => self.label().map(|s| Value::String(s.to_string())),
            "type" => self.entity_type().map(|s| Value::String(s.to_string())),
            "source" => self.as_edge().map(|e| e.source.to_value()),
            "target" => self.as_edge().map(|e| e.target.to_value()),
            other => self.properties().get(other).cloned(),
        }
    }
}

impl From<Node> for Entity {
    fn from(n: Node) -> Self {
        Self::Node(n)
    }
}

impl From<Edge> for Entity {
    fn from(e: Edge) -> Self {
        Self::Edge(e)
    }
}

/// Stringify a JSON value the way the UI layer displays it.
///
/// Strings are taken verbatim (no quotes); everything else uses its JSON form.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

//! Multi-criteria node/edge filtering with edge cascade.
//!
//! A [`FilterConfig`] holds independent criteria for nodes and for edges.
//! Within one entity's criteria every present field must match; absent fields
//! impose nothing. With `cascadeEdges` (the default) surviving edges are then
//! restricted to those whose endpoints both survived the node pass.
//!
//! Degree-based criteria (`connections`, `degree`) count edges of the input
//! edge list, before any filtering. Re-filtering a cascaded result is a no-op
//! for every criterion except these and `custom`: dropped edges lower the
//! degrees seen by a second pass.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::index::extract_searchable_text;
use crate::model::{Edge, Entity, Node, NodeId};
use crate::operator::{apply_operator, Operator, ValueMatch};
use crate::traversal::{DegreeKind, DegreeTable};

// ============================================================================
// Custom predicates
// ============================================================================

/// A caller-supplied predicate, applied as-is.
///
/// Predicates are not serializable: exported configs drop them and imported
/// configs never carry one, so an imported `custom` value always matches.
pub struct Predicate<T>(Arc<dyn Fn(&T) -> bool + Send + Sync>);

impl<T> Predicate<T> {
    pub fn new(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn test(&self, item: &T) -> bool {
        (self.0)(item)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

impl<T> PartialEq for Predicate<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// Text criteria
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextMode {
    Equals,
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

/// `mode` may also be spelled `operator`, as in property criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextFilter {
    pub value: String,
    #[serde(default, alias = "operator")]
    pub mode: TextMode,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// A bare string means case-insensitive `contains`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextCriterion {
    Plain(String),
    Filter(TextFilter),
}

impl TextCriterion {
    pub fn contains(value: impl Into<String>) -> Self {
        Self::Plain(value.into())
    }

    pub fn with_mode(value: impl Into<String>, mode: TextMode, case_sensitive: bool) -> Self {
        Self::Filter(TextFilter {
            value: value.into(),
            mode,
            case_sensitive,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        let (value, mode, case_sensitive) = match self {
            Self::Plain(value) => (value.as_str(), TextMode::Contains, false),
            Self::Filter(f) => (f.value.as_str(), f.mode, f.case_sensitive),
        };
        let fold = |s: &str| {
            if case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };
        match mode {
            TextMode::Equals => fold(text) == fold(value),
            TextMode::Contains => fold(text).contains(&fold(value)),
            TextMode::StartsWith => fold(text).starts_with(&fold(value)),
            TextMode::EndsWith => fold(text).ends_with(&fold(value)),
            TextMode::Regex => regex_matches(value, text, case_sensitive),
        }
    }
}

fn regex_matches(pattern: &str, text: &str, case_sensitive: bool) -> bool {
    match RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(re) => re.is_match(text),
        Err(err) => {
            tracing::debug!(pattern, error = %err, "invalid text filter regex");
            false
        }
    }
}

// ============================================================================
// Criteria
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeFilter {
    #[serde(rename = "type", default)]
    pub kind: DegreeKind,
    pub operator: Operator,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeCriteria {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<ValueMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<TextCriterion>,
    /// Matched against the node's full searchable text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextCriterion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ValueMatch>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ValueMatch>,
    /// Total degree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<ValueMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<DegreeFilter>,
    #[serde(skip)]
    pub custom: Option<Predicate<Node>>,
}

impl NodeCriteria {
    fn needs_degrees(&self) -> bool {
        self.connections.is_some() || self.degree.is_some()
    }

    fn matches(&self, node: &Node, degrees: Option<&DegreeTable<'_>>) -> bool {
        if let Some(want) = &self.node_type {
            if !want.matches(&optional_str(node.node_type.as_deref())) {
                return false;
            }
        }
        if let Some(label) = &self.label {
            if !label.matches(node.label.as_deref().unwrap_or_default()) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if !text.matches(&extract_searchable_text(&Entity::Node(node.clone()))) {
                return false;
            }
        }
        if let Some(want) = &self.id {
            if !want.matches(&node.id.to_value()) {
                return false;
            }
        }
        if !properties_match(&self.properties, &node.properties) {
            return false;
        }
        if let Some(degrees) = degrees {
            if let Some(want) = &self.connections {
                let total = degrees.degree(&node.id, DegreeKind::Total);
                if !want.matches(&Value::from(total)) {
                    return false;
                }
            }
            if let Some(filter) = &self.degree {
                let count = degrees.degree(&node.id, filter.kind);
                if !apply_operator(&Value::from(count), &filter.value, &filter.operator) {
                    return false;
                }
            }
        }
        if let Some(custom) = &self.custom {
            if !custom.test(node) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeCriteria {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<ValueMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<TextCriterion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ValueMatch>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ValueMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ValueMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ValueMatch>,
    #[serde(skip)]
    pub custom: Option<Predicate<Edge>>,
}

impl EdgeCriteria {
    fn matches(&self, edge: &Edge) -> bool {
        if let Some(want) = &self.edge_type {
            if !want.matches(&optional_str(edge.edge_type.as_deref())) {
                return false;
            }
        }
        if let Some(label) = &self.label {
            if !label.matches(edge.label.as_deref().unwrap_or_default()) {
                return false;
            }
        }
        if let Some(want) = &self.id {
            if !want.matches(&edge.id.to_value()) {
                return false;
            }
        }
        if !properties_match(&self.properties, &edge.properties) {
            return false;
        }
        if let Some(want) = &self.source {
            if !want.matches(&edge.source.to_value()) {
                return false;
            }
        }
        if let Some(want) = &self.target {
            if !want.matches(&edge.target.to_value()) {
                return false;
            }
        }
        if let Some(custom) = &self.custom {
            if !custom.test(edge) {
                return false;
            }
        }
        true
    }
}

fn optional_str(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

/// Every criteria key must be present on the item and match.
fn properties_match(criteria: &BTreeMap<String, ValueMatch>, props: &BTreeMap<String, Value>) -> bool {
    criteria
        .iter()
        .all(|(key, want)| props.get(key).is_some_and(|v| want.matches(v)))
}

// ============================================================================
// Config and evaluation
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<NodeCriteria>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<EdgeCriteria>,
    /// Unset means `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade_edges: Option<bool>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(mut self, criteria: NodeCriteria) -> Self {
        self.nodes = Some(criteria);
        self
    }

    pub fn with_edges(mut self, criteria: EdgeCriteria) -> Self {
        self.edges = Some(criteria);
        self
    }

    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade_edges = Some(cascade);
        self
    }

    pub fn cascades(&self) -> bool {
        self.cascade_edges.unwrap_or(true)
    }

    /// Shallow merge: top-level parts present in `update` replace ours.
    pub fn merge(&mut self, update: FilterConfig) {
        if update.nodes.is_some() {
            self.nodes = update.nodes;
        }
        if update.edges.is_some() {
            self.edges = update.edges;
        }
        if update.cascade_edges.is_some() {
            self.cascade_edges = update.cascade_edges;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStats {
    pub nodes_in: usize,
    pub nodes_out: usize,
    pub edges_in: usize,
    pub edges_out: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: FilterStats,
}

impl FilterResult {
    /// The input passed through untouched.
    pub fn unfiltered(nodes: &[Node], edges: &[Edge]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
            stats: FilterStats {
                nodes_in: nodes.len(),
                nodes_out: nodes.len(),
                edges_in: edges.len(),
                edges_out: edges.len(),
            },
        }
    }
}

pub fn apply_filters(nodes: &[Node], edges: &[Edge], config: &FilterConfig) -> FilterResult {
    let degrees = config
        .nodes
        .as_ref()
        .filter(|c| c.needs_degrees())
        .map(|_| DegreeTable::build(edges));

    let kept_nodes: Vec<Node> = match &config.nodes {
        Some(criteria) => nodes
            .iter()
            .filter(|n| criteria.matches(n, degrees.as_ref()))
            .cloned()
            .collect(),
        None => nodes.to_vec(),
    };

    let mut kept_edges: Vec<Edge> = match &config.edges {
        Some(criteria) => edges.iter().filter(|e| criteria.matches(e)).cloned().collect(),
        None => edges.to_vec(),
    };

    if config.cascades() {
        let surviving: AHashSet<&NodeId> = kept_nodes.iter().map(|n| &n.id).collect();
        kept_edges.retain(|e| surviving.contains(&e.source) && surviving.contains(&e.target));
    }

    let stats = FilterStats {
        nodes_in: nodes.len(),
        nodes_out: kept_nodes.len(),
        edges_in: edges.len(),
        edges_out: kept_edges.len(),
    };
    tracing::debug!(
        nodes_in = stats.nodes_in,
        nodes_out = stats.nodes_out,
        edges_in = stats.edges_in,
        edges_out = stats.edges_out,
        "filter pass"
    );

    FilterResult {
        nodes: kept_nodes,
        edges: kept_edges,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;
    use serde_json::json;

    fn id(n: i64) -> EntityId {
        EntityId::Int(n)
    }

    fn graph() -> (Vec<Node>, Vec<Edge>) {
        let nodes = vec![
            Node::new(id(1))
                .with_label("NAS Device")
                .with_type("hardware")
                .with_property("bays", 4),
            Node::new(id(2)).with_label("RAID").with_type("concept"),
            Node::new(id(3))
                .with_label("Storage")
                .with_type("concept")
                .with_property("bays", 0),
        ];
        let edges = vec![
            Edge::new("e1", id(1), id(2)).with_type("uses"),
            Edge::new("e2", id(1), id(3)).with_type("provides"),
        ];
        (nodes, edges)
    }

    fn node_ids(result: &FilterResult) -> Vec<EntityId> {
        result.nodes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn type_filter_cascades_onto_edges() {
        let (nodes, edges) = graph();
        let config = FilterConfig::new().with_nodes(NodeCriteria {
            node_type: Some(ValueMatch::literal("concept")),
            ..NodeCriteria::default()
        });

        let result = apply_filters(&nodes, &edges, &config);
        assert_eq!(node_ids(&result), vec![id(2), id(3)]);
        assert!(result.edges.is_empty());

        let no_cascade = apply_filters(&nodes, &edges, &config.clone().with_cascade(false));
        assert_eq!(no_cascade.edges.len(), 2);
    }

    #[test]
    fn empty_config_keeps_everything() {
        let (nodes, edges) = graph();
        let result = apply_filters(&nodes, &edges, &FilterConfig::new());
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.edges.len(), 2);
        assert_eq!(result.stats.edges_out, 2);
    }

    #[test]
    fn label_modes() {
        assert!(TextCriterion::contains("device").matches("NAS Device"));
        assert!(!TextCriterion::with_mode("device", TextMode::Contains, true).matches("NAS Device"));
        assert!(TextCriterion::with_mode("nas device", TextMode::Equals, false).matches("NAS Device"));
        assert!(TextCriterion::with_mode("nas", TextMode::StartsWith, false).matches("NAS Device"));
        assert!(TextCriterion::with_mode("ICE", TextMode::EndsWith, false).matches("NAS Device"));
        assert!(TextCriterion::with_mode("^n.s", TextMode::Regex, false).matches("NAS Device"));
        assert!(!TextCriterion::with_mode("^n.s", TextMode::Regex, true).matches("NAS Device"));
    }

    #[test]
    fn properties_are_conjunctive_and_required() {
        let (nodes, edges) = graph();
        let mut properties = BTreeMap::new();
        properties.insert("bays".to_string(), ValueMatch::op("gt", 0));
        let config = FilterConfig::new().with_nodes(NodeCriteria {
            properties,
            ..NodeCriteria::default()
        });
        let result = apply_filters(&nodes, &edges, &config);
        assert_eq!(node_ids(&result), vec![id(1)]);
    }

    #[test]
    fn degree_criteria_use_input_edges() {
        let (nodes, edges) = graph();
        let config = FilterConfig::new().with_nodes(NodeCriteria {
            connections: Some(ValueMatch::literal(2)),
            ..NodeCriteria::default()
        });
        assert_eq!(node_ids(&apply_filters(&nodes, &edges, &config)), vec![id(1)]);

        let config = FilterConfig::new().with_nodes(NodeCriteria {
            degree: Some(DegreeFilter {
                kind: DegreeKind::In,
                operator: Operator::Eq,
                value: json!(1),
            }),
            ..NodeCriteria::default()
        });
        assert_eq!(node_ids(&apply_filters(&nodes, &edges, &config)), vec![id(2), id(3)]);
    }

    #[test]
    fn degree_criteria_are_not_a_fixed_point() {
        let (nodes, edges) = graph();
        let config = FilterConfig::new().with_nodes(NodeCriteria {
            connections: Some(ValueMatch::literal(2)),
            ..NodeCriteria::default()
        });
        let once = apply_filters(&nodes, &edges, &config);
        assert_eq!(node_ids(&once), vec![id(1)]);
        assert!(once.edges.is_empty());

        let twice = apply_filters(&once.nodes, &once.edges, &config);
        assert!(twice.nodes.is_empty());
    }

    #[test]
    fn label_operator_form_deserializes() {
        let (nodes, mut edges) = graph();
        edges[0].label = Some("mirrors".to_string());
        edges[1].label = Some("serves".to_string());

        let config: FilterConfig = serde_json::from_value(json!({
            "nodes": {"label": {"operator": "equals", "value": "nas"}}
        }))
        .unwrap();
        assert!(apply_filters(&nodes, &edges, &config).nodes.is_empty());

        let config: FilterConfig = serde_json::from_value(json!({
            "nodes": {"label": {"operator": "startsWith", "value": "NAS", "caseSensitive": true}}
        }))
        .unwrap();
        assert_eq!(node_ids(&apply_filters(&nodes, &edges, &config)), vec![id(1)]);

        let config: FilterConfig = serde_json::from_value(json!({
            "edges": {"label": {"operator": "endsWith", "value": "rors"}}
        }))
        .unwrap();
        let result = apply_filters(&nodes, &edges, &config);
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].id, EntityId::from("e1"));
    }

    #[test]
    fn label_filter_rejects_unknown_keys_and_modes() {
        let unknown = serde_json::from_value::<FilterConfig>(json!({
            "nodes": {"label": {"op": "equals", "value": "nas"}}
        }));
        assert!(unknown.is_err());

        let numeric = serde_json::from_value::<FilterConfig>(json!({
            "edges": {"label": {"operator": "gt", "value": "a"}}
        }));
        assert!(numeric.is_err());
    }

    #[test]
    fn edge_criteria() {
        let (nodes, edges) = graph();
        let config = FilterConfig::new().with_edges(EdgeCriteria {
            edge_type: Some(ValueMatch::one_of(["uses"])),
            source: Some(ValueMatch::literal(1)),
            ..EdgeCriteria::default()
        });
        let result = apply_filters(&nodes, &edges, &config);
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].id, EntityId::from("e1"));
        assert_eq!(result.nodes.len(), 3);
    }

    #[test]
    fn custom_predicates_apply_as_is() {
        let (nodes, edges) = graph();
        let config = FilterConfig::new().with_nodes(NodeCriteria {
            custom: Some(Predicate::new(|n: &Node| n.id != EntityId::Int(3))),
            ..NodeCriteria::default()
        });
        let result = apply_filters(&nodes, &edges, &config);
        assert_eq!(node_ids(&result), vec![id(1), id(2)]);
        assert_eq!(result.edges.len(), 1);
    }

    #[test]
    fn deserialized_custom_values_are_ignored() {
        let config: FilterConfig = serde_json::from_value(json!({
            "nodes": {"type": ["concept", "hardware"], "custom": "not a function"},
            "cascadeEdges": false
        }))
        .unwrap();
        assert!(config.nodes.as_ref().unwrap().custom.is_none());
        assert!(!config.cascades());

        let (nodes, edges) = graph();
        assert_eq!(apply_filters(&nodes, &edges, &config).nodes.len(), 3);
    }

    #[test]
    fn merge_replaces_present_parts_only() {
        let mut base = FilterConfig::new()
            .with_nodes(NodeCriteria {
                node_type: Some(ValueMatch::literal("concept")),
                ..NodeCriteria::default()
            })
            .with_cascade(false);
        base.merge(FilterConfig::new().with_edges(EdgeCriteria::default()));
        assert!(base.nodes.is_some());
        assert!(base.edges.is_some());
        assert!(!base.cascades());
    }
}

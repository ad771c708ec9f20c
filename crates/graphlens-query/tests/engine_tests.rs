use graphlens_query::{
    Direction, EdgeCriteria, EngineConfig, EntityId, EntityKind, FilterConfig, GraphSnapshot,
    NodeCriteria, QueryEngine, SearchCriteria, SearchOptions, TraversalOptions, ValueMatch,
};
use serde_json::json;

fn nas_snapshot() -> GraphSnapshot {
    serde_json::from_value(json!({
        "nodes": [
            {"id": 1, "label": "NAS Device", "type": "hardware"},
            {"id": 2, "label": "RAID", "type": "concept"},
            {"id": 3, "label": "Storage", "type": "concept"}
        ],
        "edges": [
            {"id": "e1", "source": 1, "target": 2, "type": "uses"},
            {"id": "e2", "source": 1, "target": 3, "type": "provides"}
        ]
    }))
    .unwrap()
}

fn engine() -> QueryEngine {
    let mut engine = QueryEngine::new(EngineConfig::default());
    engine.build_index(nas_snapshot());
    engine
}

#[test]
fn end_to_end_nas_graph() {
    let mut engine = engine();

    let results = engine.search("nas");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, EntityKind::Node);
    assert_eq!(results[0].entity.id(), &EntityId::Int(1));
    assert!(results[0].score > 0.0);

    let neighbors = engine.find_connected_nodes(&EntityId::Int(1), &TraversalOptions::new(Some(1), Direction::Out));
    let ids: Vec<_> = neighbors.iter().map(|n| n.id.clone()).collect();
    assert_eq!(ids, vec![EntityId::Int(2), EntityId::Int(3)]);

    assert_eq!(
        engine.find_path(&EntityId::Int(2), &EntityId::Int(3), None),
        Some(vec![EntityId::Int(2), EntityId::Int(1), EntityId::Int(3)])
    );

    let concepts = engine.apply_filters(&FilterConfig::new().with_nodes(NodeCriteria {
        node_type: Some(ValueMatch::literal("concept")),
        ..NodeCriteria::default()
    }));
    assert_eq!(concepts.nodes.len(), 2);
    assert!(concepts.edges.is_empty());
    assert_eq!(concepts.stats.edges_in, 2);
}

#[test]
fn edge_filters_without_cascade_keep_all_nodes() {
    let engine = engine();
    let config: FilterConfig = serde_json::from_value(json!({
        "edges": {"type": {"operator": "ne", "value": "uses"}},
        "cascadeEdges": false
    }))
    .unwrap();
    let result = engine.apply_filters(&config);
    assert_eq!(result.nodes.len(), 3);
    assert_eq!(result.edges.len(), 1);
    assert_eq!(result.edges[0].id, EntityId::from("e2"));

    let typed = engine.apply_filters(&FilterConfig::new().with_edges(EdgeCriteria {
        target: Some(ValueMatch::one_of([2, 3])),
        ..EdgeCriteria::default()
    }));
    assert_eq!(typed.edges.len(), 2);
}

#[test]
fn criteria_search_from_json() {
    let engine = engine();
    let criteria: SearchCriteria = serde_json::from_value(json!({
        "kind": "node",
        "fields": {"label": {"operator": "startsWith", "value": "st"}}
    }))
    .unwrap();
    let found = engine.search_by_criteria(&criteria);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].label(), Some("Storage"));
}

#[test]
fn suggestions_and_history() {
    let mut engine = engine();
    assert_eq!(engine.get_suggestions("con", 5), vec!["concept"]);
    assert!(engine.get_suggestions("", 5).is_empty());

    let options = SearchOptions {
        exact_match: true,
        ..SearchOptions::default()
    };
    engine.text_search("raid", &options);
    engine.text_search("nas", &options);
    engine.text_search("raid", &options);
    assert_eq!(engine.history(), vec!["raid", "nas"]);
    engine.clear_history();
    assert!(engine.history().is_empty());
}

#[test]
fn filter_set_lifecycle() {
    let mut engine = engine();
    engine
        .create_filter_set(
            "concepts",
            FilterConfig::new().with_nodes(NodeCriteria {
                node_type: Some(ValueMatch::literal("concept")),
                ..NodeCriteria::default()
            }),
        )
        .unwrap();
    engine
        .create_filter_set(
            "raid",
            FilterConfig::new().with_nodes(NodeCriteria {
                id: Some(ValueMatch::literal(2)),
                ..NodeCriteria::default()
            }),
        )
        .unwrap();
    assert_eq!(engine.apply_all_active_filters().nodes.len(), 1);

    let exported = engine.export_filter_sets().unwrap();
    engine.clear_filter_sets().unwrap();
    assert_eq!(engine.apply_all_active_filters().nodes.len(), 3);

    assert_eq!(engine.import_filter_sets(&exported).unwrap(), 2);
    assert_eq!(engine.apply_all_active_filters().nodes.len(), 1);
    assert_eq!(engine.stats().active_filter_sets, 2);
    assert_eq!(engine.filter_history().len(), 4);
}

use graphlens_query::{
    apply_filters, fuzzy_match, relevance_score, Edge, EntityId, FilterConfig, Node, NodeCriteria,
    SearchHistory, ValueMatch,
};
use proptest::prelude::*;

const TYPES: [&str; 3] = ["hardware", "concept", "service"];

fn subsequence_strategy() -> impl Strategy<Value = (String, String)> {
    "[a-z ]{0,24}".prop_flat_map(|text| {
        let len = text.chars().count();
        (Just(text), prop::collection::vec(any::<bool>(), len))
    })
    .prop_map(|(text, mask)| {
        let sub: String = text
            .chars()
            .zip(mask)
            .filter_map(|(c, keep)| keep.then_some(c))
            .collect();
        (text, sub)
    })
}

fn typed_graph_strategy() -> impl Strategy<Value = (Vec<Node>, Vec<Edge>)> {
    (
        prop::collection::vec(0usize..TYPES.len(), 1..10),
        prop::collection::vec((0usize..10, 0usize..10), 0..20),
    )
        .prop_map(|(types, pairs)| {
            let n = types.len();
            let nodes: Vec<Node> = types
                .into_iter()
                .enumerate()
                .map(|(i, t)| Node::new(EntityId::Int(i as i64)).with_type(TYPES[t]))
                .collect();
            let edges = pairs
                .into_iter()
                .enumerate()
                .map(|(i, (a, b))| {
                    Edge::new(format!("e{i}"), EntityId::Int((a % n) as i64), EntityId::Int((b % n) as i64))
                })
                .collect();
            (nodes, edges)
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn every_subsequence_fuzzy_matches((text, sub) in subsequence_strategy()) {
        prop_assert!(fuzzy_match(&text, &sub));
    }

    #[test]
    fn scores_are_never_negative(text in "[a-z ]{0,40}", query in "[a-z]{1,6}") {
        prop_assert!(relevance_score(&text, &query) >= 0.0);
    }

    #[test]
    fn equal_length_scores_rank_exact_prefix_substring(query in "[a-m]{1,6}", filler in "[n-z]{1,8}") {
        let tail: String = filler.chars().skip(1).collect();
        let exact = format!("{query} {tail}");
        let prefix = format!("{query}{filler}");
        let inner = format!("{filler}{query}");
        prop_assert_eq!(exact.len(), prefix.len());
        prop_assert_eq!(prefix.len(), inner.len());

        let exact_score = relevance_score(&exact, &query);
        let prefix_score = relevance_score(&prefix, &query);
        let inner_score = relevance_score(&inner, &query);
        prop_assert!(exact_score >= prefix_score, "{} < {}", exact_score, prefix_score);
        prop_assert!(prefix_score >= inner_score, "{} < {}", prefix_score, inner_score);
    }

    #[test]
    fn cascading_type_filter_is_idempotent((nodes, edges) in typed_graph_strategy(), t in 0usize..TYPES.len()) {
        let config = FilterConfig::new().with_nodes(NodeCriteria {
            node_type: Some(ValueMatch::literal(TYPES[t])),
            ..NodeCriteria::default()
        });
        let once = apply_filters(&nodes, &edges, &config);
        let twice = apply_filters(&once.nodes, &once.edges, &config);
        prop_assert_eq!(&once.nodes, &twice.nodes);
        prop_assert_eq!(&once.edges, &twice.edges);
        for e in &once.edges {
            prop_assert!(once.nodes.iter().any(|n| n.id == e.source));
            prop_assert!(once.nodes.iter().any(|n| n.id == e.target));
        }
    }

    #[test]
    fn history_stays_distinct_and_bounded(queries in prop::collection::vec("[a-c]{0,2}", 0..80)) {
        let mut history = SearchHistory::with_limit(5);
        for q in &queries {
            history.add(q);
        }
        let entries = history.to_vec();
        prop_assert!(entries.len() <= 5);
        let mut sorted = entries.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), entries.len());
        if let Some(last) = queries.iter().rev().find(|q| !q.is_empty()) {
            prop_assert_eq!(entries.first(), Some(last));
        }
    }
}

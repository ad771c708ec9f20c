//! Text and JSON output for CLI results.

use anyhow::Result;
use colored::Colorize;
use graphlens_query::{
    EngineStats, Entity, FilterHistoryEntry, FilterResult, FilterSets, Node, NodeId,
    SavedSearches, SearchResult,
};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn node_line(node: &Node) -> String {
    let label = node.label.as_deref().unwrap_or("-");
    let ty = node.node_type.as_deref().unwrap_or("-");
    format!("{} {} {}", node.id.to_string().bold(), label, format!("[{ty}]").dimmed())
}

fn entity_line(entity: &Entity) -> String {
    match entity {
        Entity::Node(node) => format!("{} {}", "node".cyan(), node_line(node)),
        Entity::Edge(edge) => format!(
            "{} {} {} {} {} {}",
            "edge".magenta(),
            edge.id.to_string().bold(),
            edge.source,
            "→".cyan(),
            edge.target,
            edge.label.as_deref().or(edge.edge_type.as_deref()).unwrap_or("").dimmed(),
        ),
    }
}

fn none_found(what: &str) {
    println!("{}", format!("no {what}").yellow());
}

pub fn search_results(results: &[SearchResult], json: bool) -> Result<()> {
    if json {
        return print_json(results);
    }
    if results.is_empty() {
        none_found("matches");
    }
    for result in results {
        println!("{:>7.1}  {}", result.score, entity_line(&result.entity));
    }
    Ok(())
}

pub fn entities(entities: &[Entity], json: bool) -> Result<()> {
    if json {
        return print_json(entities);
    }
    if entities.is_empty() {
        none_found("matches");
    }
    for entity in entities {
        println!("{}", entity_line(entity));
    }
    Ok(())
}

pub fn nodes(nodes: &[Node], json: bool) -> Result<()> {
    if json {
        return print_json(nodes);
    }
    if nodes.is_empty() {
        none_found("connected nodes");
    }
    for node in nodes {
        println!("{}", node_line(node));
    }
    Ok(())
}

pub fn path(path: Option<&[NodeId]>, json: bool) -> Result<()> {
    if json {
        return print_json(&path);
    }
    match path {
        Some(ids) => {
            let hops: Vec<String> = ids.iter().map(ToString::to_string).collect();
            println!("{} ({} hops)", hops.join(&format!(" {} ", "→".cyan())), ids.len() - 1);
        }
        None => none_found("path"),
    }
    Ok(())
}

pub fn filter_result(result: &FilterResult, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }
    let s = result.stats;
    println!(
        "{} nodes {}/{}, edges {}/{}",
        "kept".green().bold(),
        s.nodes_out,
        s.nodes_in,
        s.edges_out,
        s.edges_in
    );
    for node in &result.nodes {
        println!("  {}", node_line(node));
    }
    for edge in &result.edges {
        println!("  {}", entity_line(&Entity::Edge(edge.clone())));
    }
    Ok(())
}

pub fn words(words: &[String], json: bool) -> Result<()> {
    if json {
        return print_json(words);
    }
    for word in words {
        println!("{word}");
    }
    Ok(())
}

pub fn stats(stats: &EngineStats, json: bool) -> Result<()> {
    if json {
        return print_json(stats);
    }
    println!("{}", "Index".bold());
    println!("  nodes:   {} ({} indexed)", stats.nodes, stats.index.nodes);
    println!("  edges:   {} ({} indexed)", stats.edges, stats.index.edges);
    println!("{}", "Session".bold());
    println!(
        "  filter sets:    {} ({} active)",
        stats.filter_sets, stats.active_filter_sets
    );
    println!("  saved searches: {}", stats.saved_searches);
    println!("  history:        {}", stats.history);
    Ok(())
}

pub fn filter_sets(sets: &FilterSets, json: bool) -> Result<()> {
    if json {
        let map: std::collections::BTreeMap<_, _> = sets.iter().collect();
        return print_json(&map);
    }
    if sets.is_empty() {
        none_found("filter sets");
    }
    for (name, set) in sets.iter() {
        let state = if set.active { "on ".green() } else { "off".yellow() };
        println!("{} {} {}", state, name.bold(), set.created.to_rfc3339().dimmed());
    }
    Ok(())
}

pub fn filter_history(entries: &[FilterHistoryEntry], json: bool) -> Result<()> {
    if json {
        return print_json(entries);
    }
    for entry in entries {
        println!(
            "{} {:?} {}",
            entry.timestamp.to_rfc3339().dimmed(),
            entry.action,
            entry.name.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub fn saved_searches(saved: &SavedSearches, json: bool) -> Result<()> {
    if json {
        let map: std::collections::BTreeMap<_, _> = saved.iter().collect();
        return print_json(&map);
    }
    if saved.is_empty() {
        none_found("saved searches");
    }
    for (name, search) in saved.iter() {
        let last = search
            .last_run
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never run".to_string());
        println!("{} {:?} {}", name.bold(), search.query, last.dimmed());
    }
    Ok(())
}

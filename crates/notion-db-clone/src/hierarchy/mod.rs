//! Parent/child hierarchy reconstruction.
//!
//! Relation fields are dropped by the flat copy. When the source database
//! relates to itself through a recognized "children" or "parent" field, this
//! phase rebuilds those links in the copy:
//!
//! 1. [`detect_hierarchy_fields`] finds the self-referential fields.
//! 2. [`analyze`] re-reads both databases, collects parent→child edges and
//!    maps source row ids onto the copied rows.
//! 3. [`HierarchyApplier`] appends each child to its parent's relation field.

mod apply;

pub use apply::{plan_batches, ApplyStats, HierarchyApplier};

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::config::CloneConfig;
use crate::core::{same_id, FieldKind, Row, Schema};
use crate::error::Result;
use crate::source::Paginator;

/// Self-referential relation fields of a source schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyFields {
    /// Fields listing this row's children.
    pub children: Vec<String>,
    /// Fields listing this row's parent(s).
    pub parents: Vec<String>,
}

impl HierarchyFields {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.parents.is_empty()
    }
}

/// A parent→child link between two source rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub parent: String,
    pub child: String,
}

impl Edge {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/// Output of [`analyze`].
#[derive(Debug, Clone, Default)]
pub struct HierarchyPlan {
    /// Parent→child edges in source ids, first occurrence order.
    pub edges: Vec<Edge>,
    /// Source row id to target row id.
    pub id_map: HashMap<String, String>,
    /// Mappings that came from title matching rather than creation results.
    pub matched_by_title: usize,
    /// Source rows with no counterpart in the target.
    pub unmatched: usize,
}

/// Find recognized relation fields that point back at `source_database_id`.
///
/// A relation whose configuration names no database is accepted on its name
/// alone.
pub fn detect_hierarchy_fields(
    source_database_id: &str,
    schema: &Schema,
    config: &CloneConfig,
) -> HierarchyFields {
    let mut fields = HierarchyFields::default();

    for (name, definition) in schema.iter() {
        if definition.kind != FieldKind::Relation {
            continue;
        }
        let self_referential = definition
            .relation_database_id()
            .map_or(true, |target| same_id(target, source_database_id));
        if !self_referential {
            continue;
        }

        if config.children_field_names.iter().any(|n| n == name) {
            fields.children.push(name.to_string());
        } else if config.parent_field_names.iter().any(|n| n == name) {
            fields.parents.push(name.to_string());
        }
    }

    fields
}

/// Collect parent→child edges from source rows.
///
/// Children fields yield (row, related) and parent fields yield
/// (related, row). An edge seen through both directions is kept once.
pub fn collect_edges(rows: &[Row], fields: &HierarchyFields) -> Vec<Edge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for row in rows {
        for name in &fields.children {
            for related in row.relation_ids(name) {
                let edge = Edge::new(row.id.clone(), related);
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }
        for name in &fields.parents {
            for related in row.relation_ids(name) {
                let edge = Edge::new(related, row.id.clone());
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }
    }

    edges
}

/// Map source rows onto target rows.
///
/// `captured` (from row creation) wins; remaining source rows are matched by
/// identity key against the first target row carrying the same title.
/// Returns the map plus the number of title matches and unmatched rows.
pub fn match_rows(
    source_rows: &[Row],
    target_rows: &[Row],
    captured: &HashMap<String, String>,
) -> (HashMap<String, String>, usize, usize) {
    let mut by_title: HashMap<String, &str> = HashMap::new();
    for row in target_rows {
        if let Some(key) = row.identity_key() {
            by_title.entry(key).or_insert(row.id.as_str());
        }
    }

    let mut id_map = HashMap::new();
    let mut matched_by_title = 0;
    let mut unmatched = 0;

    for row in source_rows {
        if let Some(target) = captured.get(&row.id) {
            id_map.insert(row.id.clone(), target.clone());
            continue;
        }
        match row.identity_key().and_then(|key| by_title.get(&key).copied()) {
            Some(target) => {
                matched_by_title += 1;
                id_map.insert(row.id.clone(), target.to_string());
            }
            None => unmatched += 1,
        }
    }

    (id_map, matched_by_title, unmatched)
}

/// Build the hierarchy plan for a finished flat copy.
///
/// Both databases are re-read in full through `paginator`.
pub async fn analyze(
    paginator: &Paginator,
    source_database_id: &str,
    target_database_id: &str,
    fields: &HierarchyFields,
    captured: &HashMap<String, String>,
) -> Result<HierarchyPlan> {
    let source_rows = paginator.fetch_all(source_database_id).await?;
    let target_rows = paginator.fetch_all(target_database_id).await?;
    debug!(
        "Hierarchy analysis: {} source rows, {} target rows",
        source_rows.len(),
        target_rows.len()
    );

    let edges = collect_edges(&source_rows, fields);
    let (id_map, matched_by_title, unmatched) = match_rows(&source_rows, &target_rows, captured);

    info!(
        "Found {} hierarchy edges; {} rows mapped ({} by title, {} unmatched)",
        edges.len(),
        id_map.len(),
        matched_by_title,
        unmatched
    );

    Ok(HierarchyPlan {
        edges,
        id_map,
        matched_by_title,
        unmatched,
    })
}

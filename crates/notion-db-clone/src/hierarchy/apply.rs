//! Writes hierarchy edges into the copied database.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{Edge, HierarchyPlan};
use crate::core::{DatabaseApi, PropertyValue, RowValues};
use crate::error::{Error, Result};

/// Counts from applying a hierarchy plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Edges written to the target.
    pub applied: usize,
    /// Edges with an endpoint that has no target counterpart.
    pub skipped: usize,
    /// Edges whose read or write failed.
    pub failed: usize,
}

/// Split translated edges into batches of at most `size`, no parent twice in
/// one batch.
///
/// Edge order is kept except that an edge whose parent already appears in the
/// current batch waits for a later one.
pub fn plan_batches(edges: Vec<Edge>, size: usize) -> Vec<Vec<Edge>> {
    let size = size.max(1);
    let mut pending = edges;
    let mut batches = Vec::new();

    while !pending.is_empty() {
        let mut batch = Vec::with_capacity(size);
        let mut parents = HashSet::new();
        let mut deferred = Vec::new();

        for edge in pending {
            if batch.len() < size && parents.insert(edge.parent.clone()) {
                batch.push(edge);
            } else {
                deferred.push(edge);
            }
        }

        batches.push(batch);
        pending = deferred;
    }

    batches
}

/// Appends children to their parents' relation field in the target.
pub struct HierarchyApplier {
    api: Arc<dyn DatabaseApi>,
    batch_size: usize,
    field_name: String,
}

impl HierarchyApplier {
    pub fn new(api: Arc<dyn DatabaseApi>, batch_size: usize, field_name: impl Into<String>) -> Self {
        Self {
            api,
            batch_size: batch_size.max(1),
            field_name: field_name.into(),
        }
    }

    /// Apply every edge of `plan`, batch after batch.
    ///
    /// Never fails as a whole; each edge is counted as applied, skipped or
    /// failed.
    pub async fn apply(&self, plan: &HierarchyPlan) -> ApplyStats {
        let mut stats = ApplyStats::default();
        let mut translated = Vec::with_capacity(plan.edges.len());

        for edge in &plan.edges {
            match (plan.id_map.get(&edge.parent), plan.id_map.get(&edge.child)) {
                (Some(parent), Some(child)) => translated.push(Edge::new(parent.clone(), child.clone())),
                _ => {
                    warn!(
                        "Skipping hierarchy link {} -> {}: row not found in copy",
                        edge.parent, edge.child
                    );
                    stats.skipped += 1;
                }
            }
        }

        let batches = plan_batches(translated, self.batch_size);
        let total = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            let results = join_all(batch.iter().map(|edge| self.link(edge))).await;
            for (edge, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => stats.applied += 1,
                    Err(e) => {
                        warn!(
                            "Failed to link {} under {}: {}",
                            edge.child, edge.parent, e
                        );
                        stats.failed += 1;
                    }
                }
            }
            debug!("Hierarchy batch {}/{} done", index + 1, total);
        }

        info!(
            "Hierarchy: {} applied, {} skipped, {} failed",
            stats.applied, stats.skipped, stats.failed
        );
        stats
    }

    /// Read-modify-write of one parent's relation list.
    async fn link(&self, edge: &Edge) -> Result<()> {
        let parent = self.api.retrieve_row(&edge.parent).await?;
        if parent
            .values
            .get(&self.field_name)
            .is_some_and(|value| value.has_more)
        {
            return Err(Error::clone_failed(format!(
                "{:?} on {} was read incomplete, not overwriting it",
                self.field_name, edge.parent
            )));
        }
        let mut ids = parent.relation_ids(&self.field_name);
        ids.push(edge.child.clone());

        let mut values = RowValues::new();
        values.insert(self.field_name.clone(), PropertyValue::relation(ids.as_slice()));
        self.api.update_row(&edge.parent, &values).await
    }
}

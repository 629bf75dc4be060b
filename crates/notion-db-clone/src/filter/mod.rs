//! Rules deciding which fields survive a clone.
//!
//! Two filters share one rename table:
//!
//! - [`filter_schema`] shapes the schema of the new database
//! - [`filter_row_values`] shapes each row's values before creation
//!
//! The row filter drops more kinds than the schema filter: computed and
//! system-maintained values can exist as columns in the new database, but the
//! service refuses them in create requests.

mod row;
mod schema;

pub use row::{filter_row_values, is_row_droppable};
pub use schema::{dropped_fields, filter_schema, is_schema_droppable, move_done_option_first};

use std::collections::HashSet;

use crate::config::{default_rename_rules, Placement, RenameRule};
use crate::core::FieldMap;

/// Lookup table for rename-and-reposition rules.
#[derive(Debug, Clone)]
pub struct RenameTable {
    rules: Vec<RenameRule>,
}

impl RenameTable {
    pub fn new(rules: Vec<RenameRule>) -> Self {
        Self { rules }
    }

    /// Rule for a source field name, if any.
    pub fn rule_for(&self, field: &str) -> Option<&RenameRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    /// Target name for a source field name.
    pub fn target_name(&self, field: &str) -> String {
        self.rule_for(field)
            .map(RenameRule::target_name)
            .unwrap_or_else(|| field.to_string())
    }
}

impl Default for RenameTable {
    fn default() -> Self {
        Self::new(default_rename_rules())
    }
}

/// A source entry and the name it is stored under in the target.
pub(crate) struct Placed<'a, T> {
    pub source: &'a str,
    pub target: String,
    pub value: &'a T,
}

/// Target layout of a field map.
pub(crate) struct Arrangement<'a, T> {
    /// Surviving entries in target order.
    pub placed: Vec<Placed<'a, T>>,
    /// Pass-through names shadowed by a renamed field.
    pub collided: Vec<&'a str>,
}

/// Lay out the entries of `fields` that `keep` accepts.
///
/// Front-renamed entries come first, then pass-through entries, then
/// back-renamed entries. A pass-through entry whose name equals the target of
/// a renamed entry is left out; the renamed entry wins.
pub(crate) fn arrange<'a, T>(
    fields: &'a FieldMap<T>,
    renames: &RenameTable,
    mut keep: impl FnMut(&str, &T) -> bool,
) -> Arrangement<'a, T> {
    let mut front = Vec::new();
    let mut back = Vec::new();
    let mut pass_through = Vec::new();

    for (name, value) in fields.iter() {
        if !keep(name, value) {
            continue;
        }
        match renames.rule_for(name) {
            Some(rule) => {
                let placed = Placed {
                    source: name,
                    target: rule.target_name(),
                    value,
                };
                match rule.placement {
                    Placement::Front => front.push(placed),
                    Placement::Back => back.push(placed),
                }
            }
            None => pass_through.push(Placed {
                source: name,
                target: name.to_string(),
                value,
            }),
        }
    }

    let renamed: HashSet<String> = front
        .iter()
        .chain(back.iter())
        .map(|p| p.target.clone())
        .collect();

    let mut collided = Vec::new();
    let mut placed = front;
    for entry in pass_through {
        if renamed.contains(&entry.target) {
            collided.push(entry.source);
        } else {
            placed.push(entry);
        }
    }
    placed.extend(back);

    Arrangement { placed, collided }
}

//! Schema filter: source schema to a schema the target can be created with.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use super::{arrange, RenameTable};
use crate::core::{FieldDefinition, FieldKind, Schema};

/// Kinds removed from the target schema.
///
/// Relations point at rows of other databases (or of the source itself) and
/// rollups are computed through relations.
pub fn is_schema_droppable(kind: &FieldKind) -> bool {
    matches!(kind, FieldKind::Relation | FieldKind::Rollup)
}

/// Produce the target schema.
///
/// Relation and rollup fields are dropped, fields named in `renames` get their
/// prefix and move to the front or back, and every select field with a "Done"
/// option lists it first. Pass-through fields keep their relative order.
pub fn filter_schema(source: &Schema, renames: &RenameTable) -> Schema {
    let arrangement = arrange(source, renames, |name, definition| {
        let keep = !is_schema_droppable(&definition.kind);
        if !keep {
            debug!("Dropping {} field {:?} from schema", definition.kind, name);
        }
        keep
    });

    for name in &arrangement.collided {
        warn!(
            "Field {:?} collides with a renamed field and is not copied",
            name
        );
    }

    let mut target = Schema::new();
    for placed in arrangement.placed {
        if placed.source != placed.target {
            debug!("Renaming field {:?} to {:?}", placed.source, placed.target);
        }
        let mut definition = placed.value.clone();
        if definition.kind == FieldKind::Select && move_done_option_first(&mut definition) {
            debug!("Moved \"Done\" option first in {:?}", placed.source);
        }
        target.insert(placed.target, definition);
    }

    target
}

/// Source field names that [`filter_schema`] leaves out, in source order.
pub fn dropped_fields(source: &Schema, renames: &RenameTable) -> Vec<String> {
    let arrangement = arrange(source, renames, |_, definition| {
        !is_schema_droppable(&definition.kind)
    });
    let kept: HashSet<&str> = arrangement.placed.iter().map(|p| p.source).collect();

    source
        .names()
        .into_iter()
        .filter(|name| !kept.contains(name))
        .map(str::to_string)
        .collect()
}

/// Move an option named "Done" (any case) to the head of the option list.
///
/// Returns true when the list changed. Other options keep their order.
pub fn move_done_option_first(definition: &mut FieldDefinition) -> bool {
    let Some(options) = definition.options_mut() else {
        return false;
    };

    let position = options.iter().position(|option| {
        option
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| name.eq_ignore_ascii_case("done"))
    });

    match position {
        Some(idx) if idx > 0 => {
            let done = options.remove(idx);
            options.insert(0, done);
            true
        }
        _ => false,
    }
}

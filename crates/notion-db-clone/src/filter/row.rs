//! Row filter: source row values to values accepted by the create endpoint.

use tracing::trace;

use super::{arrange, RenameTable};
use crate::core::{FieldKind, RowValues};

/// Kinds whose values are never sent when creating a row.
pub fn is_row_droppable(kind: &FieldKind) -> bool {
    matches!(
        kind,
        FieldKind::Relation
            | FieldKind::Rollup
            | FieldKind::Formula
            | FieldKind::CreatedBy
            | FieldKind::LastEditedBy
            | FieldKind::CreatedTime
            | FieldKind::LastEditedTime
    )
}

/// Produce the values to create a row with.
///
/// Filtering looks only at each value's own kind; renamed fields get the same
/// target names [`filter_schema`](super::filter_schema) gives them, and a
/// value shadowed by a renamed field is left out as it is in the schema.
pub fn filter_row_values(values: &RowValues, renames: &RenameTable) -> RowValues {
    let arrangement = arrange(values, renames, |name, value| {
        let keep = !is_row_droppable(&value.kind);
        if !keep {
            trace!("Skipping {} value {:?}", value.kind, name);
        }
        keep
    });

    let mut filtered = RowValues::new();
    for placed in arrangement.placed {
        filtered.insert(placed.target, placed.value.clone());
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PropertyValue;
    use serde_json::json;

    fn all_kinds_row() -> RowValues {
        let mut values = RowValues::new();
        values.insert("Name", PropertyValue::title("Alpha"));
        values.insert("Notes", PropertyValue::rich_text("hello"));
        values.insert("Done", PropertyValue::new(FieldKind::Checkbox, json!(true)));
        values.insert(
            "Status",
            PropertyValue::new(FieldKind::Select, json!({ "name": "Done" })),
        );
        values.insert("Related", PropertyValue::relation(&["abc"]));
        values.insert("Total", PropertyValue::new(FieldKind::Rollup, json!({})));
        values.insert("Score", PropertyValue::new(FieldKind::Formula, json!({})));
        values.insert("Author", PropertyValue::new(FieldKind::CreatedBy, json!({})));
        values.insert(
            "Last Edited By",
            PropertyValue::new(FieldKind::LastEditedBy, json!({})),
        );
        values.insert(
            "Created",
            PropertyValue::new(FieldKind::CreatedTime, json!("2024-01-01T00:00:00Z")),
        );
        values.insert(
            "Edited",
            PropertyValue::new(FieldKind::LastEditedTime, json!("2024-01-02T00:00:00Z")),
        );
        values
    }

    #[test]
    fn test_drops_computed_and_system_values() {
        let filtered = filter_row_values(&all_kinds_row(), &RenameTable::default());
        for (_, value) in filtered.iter() {
            assert!(!is_row_droppable(&value.kind));
        }
        assert_eq!(filtered.names(), vec!["1. Done", "Name", "Notes", "Status"]);
    }

    #[test]
    fn test_values_pass_through_unchanged() {
        let source = all_kinds_row();
        let filtered = filter_row_values(&source, &RenameTable::default());
        assert_eq!(filtered.get("Name"), source.get("Name"));
        assert_eq!(filtered.get("1. Done"), source.get("Done"));
    }

    #[test]
    fn test_renamed_value_wins_collision() {
        let mut values = RowValues::new();
        values.insert("Done", PropertyValue::new(FieldKind::Checkbox, json!(true)));
        values.insert("1. Done", PropertyValue::rich_text("stale"));
        values.insert("Name", PropertyValue::title("Alpha"));

        let filtered = filter_row_values(&values, &RenameTable::default());

        assert_eq!(filtered.names(), vec!["1. Done", "Name"]);
        assert_eq!(filtered.get("1. Done").unwrap().kind, FieldKind::Checkbox);
    }

    #[test]
    fn test_row_and_schema_agree_on_collision() {
        use crate::core::{FieldDefinition, Schema};
        use crate::filter::filter_schema;

        let mut schema = Schema::new();
        schema.insert("1. Done", FieldDefinition::new(FieldKind::RichText));
        schema.insert("Done", FieldDefinition::new(FieldKind::Checkbox));
        let mut values = RowValues::new();
        values.insert("1. Done", PropertyValue::rich_text("stale"));
        values.insert("Done", PropertyValue::new(FieldKind::Checkbox, json!(false)));

        let renames = RenameTable::default();
        let schema = filter_schema(&schema, &renames);
        let row = filter_row_values(&values, &renames);

        for (name, value) in row.iter() {
            assert_eq!(schema.get(name).unwrap().kind, value.kind);
        }
    }

    #[test]
    fn test_empty_row() {
        let filtered = filter_row_values(&RowValues::new(), &RenameTable::default());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_unknown_kind_passes_through() {
        let mut values = RowValues::new();
        values.insert(
            "Ticket",
            PropertyValue::new(FieldKind::from("unique_id"), json!({ "number": 7 })),
        );
        let filtered = filter_row_values(&values, &RenameTable::default());
        assert_eq!(filtered.len(), 1);
    }
}

//! Clone orchestrator - coordinates the clone workflow.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::{canonical_id, DatabaseApi, FieldDefinition, Schema};
use crate::error::Result;
use crate::filter::{dropped_fields, filter_schema, RenameTable};
use crate::hierarchy::{self, detect_hierarchy_fields, HierarchyApplier, HierarchyFields};
use crate::notion::NotionClient;
use crate::source::Paginator;
use crate::transfer::Replicator;

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Title of the new database; "Copy of <source title>" when absent.
    pub new_name: Option<String>,

    /// Rebuild parent/child links after the flat copy.
    pub restore_hierarchy: bool,
}

/// Outcome of the hierarchy phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HierarchyReport {
    /// Source fields the edges were read from.
    pub fields: Vec<String>,
    pub edges: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub matched_by_title: usize,
    pub unmatched: usize,

    /// Set when the phase stopped before applying edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a clone run.
#[derive(Debug, Clone, Serialize)]
pub struct CloneResult {
    /// Unique run identifier.
    pub run_id: String,

    /// "completed" or "completed_with_errors".
    pub status: String,

    pub source_database_id: String,
    pub new_database_id: String,
    pub title: String,

    pub copied_row_count: usize,
    pub failed_row_count: usize,

    /// Source ids of rows that failed to copy.
    pub failed_rows: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<HierarchyReport>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl CloneResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A field as shown by [`Cloner::plan`].
#[derive(Debug, Clone, Serialize)]
pub struct PlannedField {
    pub name: String,
    pub kind: String,
}

/// What a clone would produce, without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct ClonePlan {
    pub source_database_id: String,
    pub source_title: String,
    pub source_fields: Vec<PlannedField>,
    pub target_fields: Vec<PlannedField>,
    pub dropped_fields: Vec<String>,
    pub hierarchy_fields: Vec<String>,
}

impl ClonePlan {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Clone orchestrator.
pub struct Cloner {
    config: Config,
    api: Arc<dyn DatabaseApi>,
}

impl Cloner {
    /// Create a cloner over an existing API client.
    pub fn new(api: Arc<dyn DatabaseApi>, config: Config) -> Self {
        Self { config, api }
    }

    /// Create a cloner talking to Notion with the configured credentials.
    pub fn connect(config: Config) -> Result<Self> {
        let client = NotionClient::new(&config.api)?;
        Ok(Self::new(Arc::new(client), config))
    }

    fn renames(&self) -> RenameTable {
        RenameTable::new(self.config.clone.rename_rules.clone())
    }

    fn paginator(&self) -> Paginator {
        Paginator::new(self.api.clone(), self.config.clone.page_size)
    }

    /// Clone `source_database_id` into a new database under `parent_page_id`.
    ///
    /// Both ids may be hyphenated or compact; requests use the canonical form.
    /// Schema retrieval and database creation failures are fatal. Row and
    /// hierarchy failures are counted in the result.
    pub async fn clone_database(
        &self,
        source_database_id: &str,
        parent_page_id: &str,
        options: CloneOptions,
    ) -> Result<CloneResult> {
        let source_database_id = canonical_id(source_database_id, "source_database_id")?;
        let parent_page_id = canonical_id(parent_page_id, "parent_page_id")?;
        let source_database_id = source_database_id.as_str();
        let parent_page_id = parent_page_id.as_str();

        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting clone run: {}", run_id);

        // Phase 1: schema
        info!("Phase 1: Reading schema of {}", source_database_id);
        let source = self
            .api
            .retrieve_schema(source_database_id)
            .await
            .map_err(|e| {
                error!("Could not read source schema: {}", e);
                e
            })?;
        let renames = self.renames();
        let target_schema = filter_schema(&source.schema, &renames);
        info!(
            "Source {:?} has {} fields, {} kept",
            source.title,
            source.schema.len(),
            target_schema.len()
        );

        // Phase 2: target database
        let title = options
            .new_name
            .clone()
            .unwrap_or_else(|| format!("Copy of {}", source.title));
        info!("Phase 2: Creating database {:?}", title);
        let replicator = Replicator::new(
            self.api.clone(),
            self.config.clone.row_batch_size,
            renames,
        );
        let new_database_id = replicator
            .create_database(parent_page_id, &title, &target_schema)
            .await
            .map_err(|e| {
                error!("Could not create target database: {}", e);
                e
            })?;
        info!("Created database {}", new_database_id);

        // Phase 3: rows
        info!("Phase 3: Copying rows");
        let paginator = self.paginator();
        let rows = paginator.fetch_all(source_database_id).await?;
        info!("Fetched {} rows from source", rows.len());
        let stats = replicator.replicate_rows(&new_database_id, &rows).await;

        // Phase 4: hierarchy
        let hierarchy = if options.restore_hierarchy {
            let fields = detect_hierarchy_fields(
                source_database_id,
                &source.schema,
                &self.config.clone,
            );
            if fields.is_empty() {
                info!("No self-referential hierarchy fields found, skipping");
                None
            } else {
                info!("Phase 4: Restoring hierarchy");
                Some(
                    self.restore_hierarchy(
                        &paginator,
                        source_database_id,
                        &new_database_id,
                        &fields,
                        &stats.id_map,
                    )
                    .await,
                )
            }
        } else {
            None
        };

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let hierarchy_clean = hierarchy
            .as_ref()
            .map_or(true, |h| h.failed == 0 && h.error.is_none());
        let status = if stats.failed == 0 && hierarchy_clean {
            "completed"
        } else {
            "completed_with_errors"
        };

        info!(
            "Clone {}: {} rows copied, {} failed in {:.1}s",
            status, stats.copied, stats.failed, duration_seconds
        );

        Ok(CloneResult {
            run_id,
            status: status.to_string(),
            source_database_id: source_database_id.to_string(),
            new_database_id,
            title,
            copied_row_count: stats.copied,
            failed_row_count: stats.failed,
            failed_rows: stats.failures.into_iter().map(|f| f.source_row_id).collect(),
            hierarchy,
            started_at,
            completed_at,
            duration_seconds,
        })
    }

    /// Add the relation field to the copy, then analyze and apply edges.
    ///
    /// Failures before the apply step end the phase and are reported, not
    /// returned; the flat copy stands either way.
    async fn restore_hierarchy(
        &self,
        paginator: &Paginator,
        source_database_id: &str,
        target_database_id: &str,
        fields: &HierarchyFields,
        captured: &std::collections::HashMap<String, String>,
    ) -> HierarchyReport {
        let field_name = &self.config.clone.hierarchy_field_name;
        let mut report = HierarchyReport {
            fields: fields
                .children
                .iter()
                .chain(&fields.parents)
                .cloned()
                .collect(),
            ..Default::default()
        };

        let mut addition = Schema::new();
        addition.insert(
            field_name.clone(),
            FieldDefinition::relation(target_database_id),
        );
        if let Err(e) = self.api.update_schema(target_database_id, &addition).await {
            warn!("Could not add {:?} to the copy: {}", field_name, e);
            report.error = Some(e.to_string());
            return report;
        }

        let plan = match hierarchy::analyze(
            paginator,
            source_database_id,
            target_database_id,
            fields,
            captured,
        )
        .await
        {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Hierarchy analysis failed: {}", e);
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.edges = plan.edges.len();
        report.matched_by_title = plan.matched_by_title;
        report.unmatched = plan.unmatched;

        let applier = HierarchyApplier::new(
            self.api.clone(),
            self.config.clone.hierarchy_batch_size,
            field_name.clone(),
        );
        let stats = applier.apply(&plan).await;
        report.applied = stats.applied;
        report.skipped = stats.skipped;
        report.failed = stats.failed;
        report
    }

    /// Describe what a clone of `source_database_id` would create.
    pub async fn plan(&self, source_database_id: &str) -> Result<ClonePlan> {
        let source_database_id = canonical_id(source_database_id, "source_database_id")?;
        let source_database_id = source_database_id.as_str();

        let source = self.api.retrieve_schema(source_database_id).await?;
        let target = filter_schema(&source.schema, &self.renames());
        let hierarchy = detect_hierarchy_fields(source_database_id, &source.schema, &self.config.clone);

        let listed = |schema: &Schema| -> Vec<PlannedField> {
            schema
                .iter()
                .map(|(name, definition)| PlannedField {
                    name: name.to_string(),
                    kind: definition.kind.to_string(),
                })
                .collect()
        };

        let dropped_fields = dropped_fields(&source.schema, &self.renames());

        Ok(ClonePlan {
            source_database_id: source_database_id.to_string(),
            source_title: source.title.clone(),
            source_fields: listed(&source.schema),
            target_fields: listed(&target),
            dropped_fields,
            hierarchy_fields: hierarchy.children.into_iter().chain(hierarchy.parents).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldKind, PropertyValue, Row, RowValues};
    use crate::error::Error;
    use crate::testing::MockApi;
    use serde_json::json;

    const SOURCE: &str = "12345678-1234-1234-1234-123456789012";
    const PARENT: &str = "abcdefabcdefabcdefabcdefabcdefab";
    const PARENT_CANONICAL: &str = "abcdefab-cdef-abcd-efab-cdefabcdefab";

    fn task_schema() -> Schema {
        let mut schema = Schema::new();
        schema.insert("Name", FieldDefinition::new(FieldKind::Title));
        schema.insert(
            "Status",
            FieldDefinition::select(&["To Do", "In Progress", "Done"]),
        );
        schema.insert(
            "Related",
            FieldDefinition::relation("99999999-9999-9999-9999-999999999999"),
        );
        schema
    }

    fn task(id: &str, title: &str) -> Row {
        let mut values = RowValues::new();
        values.insert("Name", PropertyValue::title(title));
        values.insert(
            "Status",
            PropertyValue::new(FieldKind::Select, json!({ "name": "To Do" })),
        );
        values.insert("Related", PropertyValue::relation(&["elsewhere"]));
        Row::new(id, values)
    }

    fn cloner(api: &Arc<MockApi>) -> Cloner {
        Cloner::new(api.clone(), Config::default())
    }

    #[tokio::test]
    async fn test_clone_end_to_end() {
        let api = Arc::new(MockApi::new());
        api.add_database(
            SOURCE,
            "Tasks",
            task_schema(),
            vec![task("r1", "A"), task("r2", "B"), task("r3", "C")],
        );

        let result = cloner(&api)
            .clone_database(SOURCE, PARENT, CloneOptions::default())
            .await
            .unwrap();

        assert_eq!(result.copied_row_count, 3);
        assert_eq!(result.failed_row_count, 0);
        assert_eq!(result.status, "completed");
        assert_eq!(result.title, "Copy of Tasks");
        assert!(result.hierarchy.is_none());

        let created = api.database(&result.new_database_id).unwrap();
        assert_eq!(created.parent_id, PARENT_CANONICAL);
        assert_eq!(created.schema.names(), vec!["Name", "Status"]);
        assert_eq!(
            created.schema.get("Status").unwrap().option_names(),
            vec!["Done", "To Do", "In Progress"]
        );
        for row in api.rows_of(&result.new_database_id) {
            assert!(!row.values.contains("Related"));
        }
    }

    #[tokio::test]
    async fn test_clone_uses_new_name() {
        let api = Arc::new(MockApi::new());
        api.add_database(SOURCE, "Tasks", task_schema(), Vec::new());

        let result = cloner(&api)
            .clone_database(
                SOURCE,
                PARENT,
                CloneOptions {
                    new_name: Some("Archive".to_string()),
                    restore_hierarchy: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.title, "Archive");
        assert_eq!(api.database(&result.new_database_id).unwrap().title, "Archive");
        assert_eq!(result.copied_row_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected_before_any_call() {
        let api = Arc::new(MockApi::new());
        let err = cloner(&api)
            .clone_database("invalid-id", PARENT, CloneOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref param, .. } if param == "source_database_id"));

        let err = cloner(&api)
            .clone_database(SOURCE, "nope", CloneOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref param, .. } if param == "parent_page_id"));
        assert!(api.created_databases().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let api = Arc::new(MockApi::new());
        let err = cloner(&api)
            .clone_database(SOURCE, PARENT, CloneOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(api.created_databases().is_empty());
    }

    #[tokio::test]
    async fn test_row_failures_reported() {
        let api = Arc::new(MockApi::new().failing_every_nth_create(2));
        let rows = (0..4).map(|i| task(&format!("r{}", i), "T")).collect();
        api.add_database(SOURCE, "Tasks", task_schema(), rows);

        let result = cloner(&api)
            .clone_database(SOURCE, PARENT, CloneOptions::default())
            .await
            .unwrap();

        assert_eq!(result.copied_row_count, 2);
        assert_eq!(result.failed_row_count, 2);
        assert_eq!(result.failed_rows, vec!["r1", "r3"]);
        assert_eq!(result.status, "completed_with_errors");
    }

    fn tree_schema() -> Schema {
        let mut schema = Schema::new();
        schema.insert("Name", FieldDefinition::new(FieldKind::Title));
        schema.insert("Sub-items", FieldDefinition::relation(SOURCE));
        schema.insert("Parent item", FieldDefinition::relation(SOURCE));
        schema
    }

    fn node(id: &str, title: &str, children: &[&str], parents: &[&str]) -> Row {
        let mut values = RowValues::new();
        values.insert("Name", PropertyValue::title(title));
        values.insert("Sub-items", PropertyValue::relation(children));
        values.insert("Parent item", PropertyValue::relation(parents));
        Row::new(id, values)
    }

    #[tokio::test]
    async fn test_restores_hierarchy() {
        let api = Arc::new(MockApi::new());
        api.add_database(
            SOURCE,
            "Tree",
            tree_schema(),
            vec![
                node("root", "Root", &["a", "b"], &[]),
                node("a", "A", &[], &["root"]),
                node("b", "B", &[], &["root"]),
            ],
        );

        let result = cloner(&api)
            .clone_database(
                SOURCE,
                PARENT,
                CloneOptions {
                    new_name: None,
                    restore_hierarchy: true,
                },
            )
            .await
            .unwrap();

        let report = result.hierarchy.unwrap();
        assert_eq!(report.fields, vec!["Sub-items", "Parent item"]);
        assert_eq!(report.edges, 2);
        assert_eq!(report.applied, 2);
        assert_eq!(report.matched_by_title, 0);

        let db = api.database(&result.new_database_id).unwrap();
        assert_eq!(
            db.schema.get("Sub-items").unwrap().relation_database_id(),
            Some(result.new_database_id.as_str())
        );

        let copies = api.rows_of(&result.new_database_id);
        let root = copies
            .iter()
            .find(|r| r.identity_key().as_deref() == Some("Root"))
            .unwrap();
        let children: Vec<_> = root
            .relation_ids("Sub-items")
            .iter()
            .filter_map(|id| api.row(id))
            .filter_map(|r| r.identity_key())
            .collect();
        assert_eq!(children, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_hierarchy_skipped_without_recognized_fields() {
        let api = Arc::new(MockApi::new());
        api.add_database(SOURCE, "Tasks", task_schema(), vec![task("r1", "A")]);

        let result = cloner(&api)
            .clone_database(
                SOURCE,
                PARENT,
                CloneOptions {
                    new_name: None,
                    restore_hierarchy: true,
                },
            )
            .await
            .unwrap();

        assert!(result.hierarchy.is_none());
        let db = api.database(&result.new_database_id).unwrap();
        assert!(!db.schema.contains("Sub-items"));
    }

    #[tokio::test]
    async fn test_plan_lists_dropped_fields() {
        let api = Arc::new(MockApi::new());
        let mut schema = task_schema();
        schema.insert("Done", FieldDefinition::new(FieldKind::Checkbox));
        api.add_database(SOURCE, "Tasks", schema, Vec::new());

        let plan = cloner(&api).plan(SOURCE).await.unwrap();

        assert_eq!(plan.source_title, "Tasks");
        assert_eq!(plan.dropped_fields, vec!["Related"]);
        let targets: Vec<_> = plan.target_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(targets, vec!["1. Done", "Name", "Status"]);
        assert!(plan.hierarchy_fields.is_empty());
        assert!(api.created_databases().is_empty());
    }

    #[tokio::test]
    async fn test_compact_source_id_is_canonicalized() {
        let api = Arc::new(MockApi::new());
        api.add_database(SOURCE, "Tasks", task_schema(), vec![task("r1", "A")]);

        let result = cloner(&api)
            .clone_database(
                "12345678123412341234123456789012",
                PARENT,
                CloneOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.source_database_id, SOURCE);
        assert_eq!(result.copied_row_count, 1);
    }

    #[tokio::test]
    async fn test_plan_reports_collision_loser_as_dropped() {
        let api = Arc::new(MockApi::new());
        let mut schema = Schema::new();
        schema.insert("1. Done", FieldDefinition::new(FieldKind::RichText));
        schema.insert("Name", FieldDefinition::new(FieldKind::Title));
        schema.insert("Done", FieldDefinition::new(FieldKind::Checkbox));
        api.add_database(SOURCE, "Tasks", schema, Vec::new());

        let plan = cloner(&api).plan(SOURCE).await.unwrap();

        assert_eq!(plan.dropped_fields, vec!["1. Done"]);
        let kinds: Vec<_> = plan
            .target_fields
            .iter()
            .map(|f| (f.name.as_str(), f.kind.as_str()))
            .collect();
        assert_eq!(kinds, vec![("1. Done", "checkbox"), ("Name", "title")]);
    }

    #[test]
    fn test_result_json() {
        let now = Utc::now();
        let result = CloneResult {
            run_id: "run".to_string(),
            status: "completed".to_string(),
            source_database_id: SOURCE.to_string(),
            new_database_id: "new".to_string(),
            title: "Copy of Tasks".to_string(),
            copied_row_count: 3,
            failed_row_count: 0,
            failed_rows: Vec::new(),
            hierarchy: None,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
        };
        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(value["copied_row_count"], 3);
        assert!(value.get("hierarchy").is_none());
    }
}

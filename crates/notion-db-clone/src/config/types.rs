//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Largest page size the query endpoint accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Default Notion API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// Notion-Version header sent with every request.
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service connection.
    #[serde(default)]
    pub api: ApiConfig,

    /// Clone behavior.
    #[serde(default)]
    pub clone: CloneConfig,
}

/// Remote service (Notion API) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Integration token. Falls back to `NOTION_TOKEN` when empty.
    #[serde(default)]
    pub token: String,

    /// API base URL (default: https://api.notion.com/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Notion-Version header (default: 2022-06-28).
    #[serde(default = "default_api_version")]
    pub version: String,

    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_base_url(),
            version: default_api_version(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Clone behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneConfig {
    /// Rows created concurrently per batch (default: 10).
    #[serde(default = "default_row_batch_size")]
    pub row_batch_size: usize,

    /// Hierarchy edges applied concurrently per batch (default: 5).
    #[serde(default = "default_hierarchy_batch_size")]
    pub hierarchy_batch_size: usize,

    /// Rows requested per query page (default and maximum: 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Fields renamed with a prefix and moved to the front or back.
    #[serde(default = "default_rename_rules")]
    pub rename_rules: Vec<RenameRule>,

    /// Relation field names meaning "this row's children".
    #[serde(default = "default_children_field_names")]
    pub children_field_names: Vec<String>,

    /// Relation field names meaning "this row's parent".
    #[serde(default = "default_parent_field_names")]
    pub parent_field_names: Vec<String>,

    /// Name of the relation field added to the target for the hierarchy.
    #[serde(default = "default_hierarchy_field_name")]
    pub hierarchy_field_name: String,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            row_batch_size: default_row_batch_size(),
            hierarchy_batch_size: default_hierarchy_batch_size(),
            page_size: default_page_size(),
            rename_rules: default_rename_rules(),
            children_field_names: default_children_field_names(),
            parent_field_names: default_parent_field_names(),
            hierarchy_field_name: default_hierarchy_field_name(),
        }
    }
}

/// Where a renamed field is reinserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Before every pass-through field.
    Front,
    /// After every pass-through field.
    Back,
}

/// Rename-and-reposition rule for a field with an exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    /// Source field name, matched exactly.
    pub field: String,
    /// Prefix prepended to form the target name.
    pub prefix: String,
    pub placement: Placement,
}

impl RenameRule {
    pub fn new(field: &str, prefix: &str, placement: Placement) -> Self {
        Self {
            field: field.to_string(),
            prefix: prefix.to_string(),
            placement,
        }
    }

    /// Name of the field in the target database.
    pub fn target_name(&self) -> String {
        format!("{}{}", self.prefix, self.field)
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_row_batch_size() -> usize {
    10
}

fn default_hierarchy_batch_size() -> usize {
    5
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

pub fn default_rename_rules() -> Vec<RenameRule> {
    vec![
        RenameRule::new("Done", "1. ", Placement::Front),
        RenameRule::new("Last Edited By", "z. ", Placement::Back),
    ]
}

fn default_children_field_names() -> Vec<String> {
    ["Sub-items", "Sub-item", "Children", "Child items", "Subtasks", "Sub-tasks"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_parent_field_names() -> Vec<String> {
    ["Parent item", "Parent", "Parent task"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_hierarchy_field_name() -> String {
    "Sub-items".to_string()
}

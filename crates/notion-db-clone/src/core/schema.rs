//! Schema and row types for Notion databases.
//!
//! Notion encodes both property definitions and property values as objects
//! tagged by a `type` discriminator, with the kind-specific payload stored
//! under a key of the same name:
//!
//! ```json
//! { "id": "abc", "type": "select", "select": { "options": [ ... ] } }
//! ```
//!
//! These types keep the discriminator as a typed [`FieldKind`] and carry the
//! payload opaquely, so kinds this crate does not know about still round-trip.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Property kind discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Status,
    Checkbox,
    Date,
    Url,
    Email,
    PhoneNumber,
    People,
    Files,
    Relation,
    Rollup,
    Formula,
    CreatedBy,
    LastEditedBy,
    CreatedTime,
    LastEditedTime,
    /// Any kind the service added after this crate was written.
    Other(String),
}

impl FieldKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Title => "title",
            FieldKind::RichText => "rich_text",
            FieldKind::Number => "number",
            FieldKind::Select => "select",
            FieldKind::MultiSelect => "multi_select",
            FieldKind::Status => "status",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::Url => "url",
            FieldKind::Email => "email",
            FieldKind::PhoneNumber => "phone_number",
            FieldKind::People => "people",
            FieldKind::Files => "files",
            FieldKind::Relation => "relation",
            FieldKind::Rollup => "rollup",
            FieldKind::Formula => "formula",
            FieldKind::CreatedBy => "created_by",
            FieldKind::LastEditedBy => "last_edited_by",
            FieldKind::CreatedTime => "created_time",
            FieldKind::LastEditedTime => "last_edited_time",
            FieldKind::Other(name) => name,
        }
    }
}

impl From<&str> for FieldKind {
    fn from(s: &str) -> Self {
        match s {
            "title" => FieldKind::Title,
            "rich_text" => FieldKind::RichText,
            "number" => FieldKind::Number,
            "select" => FieldKind::Select,
            "multi_select" => FieldKind::MultiSelect,
            "status" => FieldKind::Status,
            "checkbox" => FieldKind::Checkbox,
            "date" => FieldKind::Date,
            "url" => FieldKind::Url,
            "email" => FieldKind::Email,
            "phone_number" => FieldKind::PhoneNumber,
            "people" => FieldKind::People,
            "files" => FieldKind::Files,
            "relation" => FieldKind::Relation,
            "rollup" => FieldKind::Rollup,
            "formula" => FieldKind::Formula,
            "created_by" => FieldKind::CreatedBy,
            "last_edited_by" => FieldKind::LastEditedBy,
            "created_time" => FieldKind::CreatedTime,
            "last_edited_time" => FieldKind::LastEditedTime,
            other => FieldKind::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldKind {
    fn from(s: String) -> Self {
        FieldKind::from(s.as_str())
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered map from field name to `T`.
///
/// Names are unique; inserting an existing name replaces the value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for FieldMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> FieldMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace. Returns the previous value for `name`, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl<T> IntoIterator for FieldMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T> FromIterator<(String, T)> for FieldMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Field (property) definition of a database.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub kind: FieldKind,
    /// Service-assigned property id; never sent back on create.
    pub id: Option<String>,
    /// Kind-specific configuration (the object stored under the kind key).
    pub config: Value,
}

impl FieldDefinition {
    /// Definition with an empty configuration.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            id: None,
            config: json!({}),
        }
    }

    /// Select definition with the given option names.
    pub fn select<S: AsRef<str>>(options: &[S]) -> Self {
        let options: Vec<Value> = options
            .iter()
            .map(|name| json!({ "name": name.as_ref() }))
            .collect();
        Self {
            kind: FieldKind::Select,
            id: None,
            config: json!({ "options": options }),
        }
    }

    /// Single-property relation pointing at `database_id`.
    pub fn relation(database_id: &str) -> Self {
        Self {
            kind: FieldKind::Relation,
            id: None,
            config: json!({
                "database_id": database_id,
                "type": "single_property",
                "single_property": {},
            }),
        }
    }

    /// Parse one entry of a database's `properties` object.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when the entry has no `type` discriminator.
    pub fn from_api(name: &str, value: &Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::validation("schema", format!("field {:?} has no type", name))
            })?;

        Ok(Self {
            kind: FieldKind::from(kind),
            id: value.get("id").and_then(Value::as_str).map(str::to_string),
            config: value.get(kind).cloned().unwrap_or_else(|| json!({})),
        })
    }

    /// Payload accepted by the create/update database endpoints.
    ///
    /// Option ids are stripped from select-like configurations; the service
    /// assigns fresh ids in the new database.
    pub fn to_api(&self) -> Value {
        let mut config = self.config.clone();
        if matches!(self.kind, FieldKind::Select | FieldKind::MultiSelect) {
            if let Some(options) = config.get_mut("options").and_then(Value::as_array_mut) {
                for option in options.iter_mut() {
                    if let Some(obj) = option.as_object_mut() {
                        obj.remove("id");
                    }
                }
            }
        }
        let mut payload = Map::new();
        payload.insert(self.kind.as_str().to_string(), config);
        Value::Object(payload)
    }

    /// Names of the select options, in order.
    pub fn option_names(&self) -> Vec<&str> {
        self.config
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|o| o.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mutable access to the option list, if this configuration has one.
    pub fn options_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.config.get_mut("options").and_then(Value::as_array_mut)
    }

    /// Database a relation field points at.
    pub fn relation_database_id(&self) -> Option<&str> {
        if self.kind != FieldKind::Relation {
            return None;
        }
        self.config.get("database_id").and_then(Value::as_str)
    }
}

/// Ordered field definitions of a database.
pub type Schema = FieldMap<FieldDefinition>;

impl FieldMap<FieldDefinition> {
    /// Parse the `properties` object of a database.
    pub fn from_api(properties: &Value) -> Result<Self> {
        let object = properties
            .as_object()
            .ok_or_else(|| Error::validation("schema", "properties must be an object"))?;

        let mut schema = Schema::new();
        for (name, value) in object {
            schema.insert(name.clone(), FieldDefinition::from_api(name, value)?);
        }
        Ok(schema)
    }

    /// `properties` payload for the create/update database endpoints.
    pub fn to_api(&self) -> Value {
        let mut object = Map::new();
        for (name, definition) in self.iter() {
            object.insert(name.to_string(), definition.to_api());
        }
        Value::Object(object)
    }
}

/// Retrieved database: title plus schema.
#[derive(Debug, Clone)]
pub struct DatabaseSchema {
    pub id: String,
    pub title: String,
    pub schema: Schema,
}

impl DatabaseSchema {
    /// Parse a database object returned by the service.
    pub fn from_api(value: &Value) -> Result<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let title = value
            .get("title")
            .and_then(Value::as_array)
            .map(|runs| plain_text(runs))
            .unwrap_or_default();
        let schema = Schema::from_api(value.get("properties").unwrap_or(&Value::Null))?;

        Ok(Self { id, title, schema })
    }
}

/// One property value of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub kind: FieldKind,
    /// The value stored under the kind key.
    pub value: Value,
    /// Property id as reported by the service.
    pub id: Option<String>,
    /// The service returned only the first part of the value (relations
    /// longer than 25 references on page reads).
    pub has_more: bool,
}

impl PropertyValue {
    pub fn new(kind: FieldKind, value: Value) -> Self {
        Self {
            kind,
            value,
            id: None,
            has_more: false,
        }
    }

    /// Title value with a single plain-text run.
    pub fn title(text: &str) -> Self {
        Self::new(FieldKind::Title, json!([text_run(text)]))
    }

    /// Rich-text value with a single plain-text run.
    pub fn rich_text(text: &str) -> Self {
        Self::new(FieldKind::RichText, json!([text_run(text)]))
    }

    /// Relation value referencing `ids` in order.
    pub fn relation<S: AsRef<str>>(ids: &[S]) -> Self {
        let refs: Vec<Value> = ids.iter().map(|id| json!({ "id": id.as_ref() })).collect();
        Self::new(FieldKind::Relation, Value::Array(refs))
    }

    /// Parse one entry of a page's `properties` object.
    pub fn from_api(name: &str, value: &Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::validation("row", format!("property {:?} has no type", name))
            })?;

        Ok(Self {
            kind: FieldKind::from(kind),
            value: value.get(kind).cloned().unwrap_or(Value::Null),
            id: value.get("id").and_then(Value::as_str).map(str::to_string),
            has_more: value.get("has_more").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn to_api(&self) -> Value {
        let mut payload = Map::new();
        payload.insert(self.kind.as_str().to_string(), self.value.clone());
        Value::Object(payload)
    }

    /// Row ids referenced by a relation value.
    pub fn relation_ids(&self) -> Vec<String> {
        if self.kind != FieldKind::Relation {
            return Vec::new();
        }
        self.value
            .as_array()
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| r.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Property values of a row, in the order the service returned them.
pub type RowValues = FieldMap<PropertyValue>;

impl FieldMap<PropertyValue> {
    pub fn from_api(properties: &Value) -> Result<Self> {
        let mut values = RowValues::new();
        if let Some(object) = properties.as_object() {
            for (name, value) in object {
                values.insert(name.clone(), PropertyValue::from_api(name, value)?);
            }
        }
        Ok(values)
    }

    pub fn to_api(&self) -> Value {
        let mut object = Map::new();
        for (name, value) in self.iter() {
            object.insert(name.to_string(), value.to_api());
        }
        Value::Object(object)
    }
}

/// A database row (a Notion page whose parent is a database).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub values: RowValues,
}

impl Row {
    pub fn new(id: impl Into<String>, values: RowValues) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    pub fn from_api(value: &Value) -> Result<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("row", "page object has no id"))?;
        let values = RowValues::from_api(value.get("properties").unwrap_or(&Value::Null))?;
        Ok(Self::new(id, values))
    }

    /// Heuristic matching key: the first plain-text run of the title field.
    ///
    /// Not unique; two rows with the same title produce the same key.
    pub fn identity_key(&self) -> Option<String> {
        let (_, title) = self
            .values
            .iter()
            .find(|(_, v)| v.kind == FieldKind::Title)?;
        let first = title.value.as_array()?.first()?;
        first
            .get("plain_text")
            .and_then(Value::as_str)
            .or_else(|| {
                first
                    .get("text")
                    .and_then(|t| t.get("content"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
    }

    /// Ids referenced by the relation field `name`, empty if absent.
    pub fn relation_ids(&self, name: &str) -> Vec<String> {
        self.values
            .get(name)
            .map(PropertyValue::relation_ids)
            .unwrap_or_default()
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub rows: Vec<Row>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

fn text_run(text: &str) -> Value {
    json!({
        "type": "text",
        "text": { "content": text },
        "plain_text": text,
    })
}

fn plain_text(runs: &[Value]) -> String {
    runs.iter()
        .filter_map(|r| r.get("plain_text").and_then(Value::as_str))
        .collect()
}

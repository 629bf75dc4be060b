//! Notion HTTP client implementing [`DatabaseApi`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, trace, warn};

use crate::config::{ApiConfig, MAX_PAGE_SIZE};
use crate::core::{
    DatabaseApi, DatabaseSchema, FieldKind, PropertyValue, QueryPage, Row, RowValues, Schema,
};
use crate::error::{Error, Result};

/// Result of [`NotionClient::health_check`].
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Name of the integration's bot user, when the service reports one.
    pub user: Option<String>,
    pub latency: Duration,
}

/// Client for the Notion REST API.
pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    version: String,
}

impl NotionClient {
    /// Create a client from API configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when no token is configured.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(Error::Config(
                "api.token is required (or set NOTION_TOKEN)".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Notion client: url={}, version={}",
            config.base_url, config.version
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            version: config.version.clone(),
        })
    }

    /// Check the token against the current-user endpoint.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let start = Instant::now();
        let body = self.send(Method::GET, "/users/me", None).await?;
        let latency = start.elapsed();

        let user = body
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        info!("Notion health check passed in {}ms", latency.as_millis());
        Ok(HealthStatus { user, latency })
    }

    async fn send(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        trace!("{} {}", method, url);

        let mut req = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);
        debug!("{} {} failed with {}: {}", method, endpoint, status, message);
        Err(classify(status, endpoint, message))
    }

    /// Read every reference of a relation property, following cursors
    /// past the 25 references a page read includes.
    async fn relation_items(&self, row_id: &str, property_id: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut endpoint = format!(
                "/pages/{}/properties/{}?page_size={}",
                row_id, property_id, MAX_PAGE_SIZE
            );
            if let Some(ref c) = cursor {
                endpoint.push_str("&start_cursor=");
                endpoint.push_str(c);
            }
            let body = self.send(Method::GET, &endpoint, None).await?;

            let results = body
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    Error::clone_failed(format!("{}: property item list has no results", endpoint))
                })?;
            ids.extend(results.iter().filter_map(|item| {
                item.pointer("/relation/id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }));

            let has_more = body.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = body
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            match (has_more, &cursor) {
                (true, Some(_)) => continue,
                (true, None) => {
                    return Err(Error::clone_failed(format!(
                        "{}: relation has more references but no cursor",
                        endpoint
                    )))
                }
                (false, _) => return Ok(ids),
            }
        }
    }
}

/// Map an HTTP failure onto the error taxonomy.
fn classify(status: StatusCode, endpoint: &str, message: String) -> Error {
    match status {
        StatusCode::BAD_REQUEST => Error::validation("request", message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        StatusCode::NOT_FOUND => Error::NotFound(format!("{}: {}", endpoint, message)),
        _ => Error::clone_failed(format!("{} returned {}: {}", endpoint, status, message)),
    }
}

fn text_title(title: &str) -> Value {
    json!([{ "type": "text", "text": { "content": title } }])
}

fn object_id(body: &Value) -> Result<String> {
    body.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::clone_failed("response has no id"))
}

#[async_trait]
impl DatabaseApi for NotionClient {
    async fn retrieve_schema(&self, database_id: &str) -> Result<DatabaseSchema> {
        let body = self
            .send(Method::GET, &format!("/databases/{}", database_id), None)
            .await?;
        DatabaseSchema::from_api(&body)
    }

    async fn create_database(
        &self,
        parent_id: &str,
        title: &str,
        schema: &Schema,
    ) -> Result<String> {
        let payload = json!({
            "parent": { "type": "page_id", "page_id": parent_id },
            "title": text_title(title),
            "properties": schema.to_api(),
        });
        let body = self.send(Method::POST, "/databases", Some(payload)).await?;
        object_id(&body)
    }

    async fn update_schema(&self, database_id: &str, fields_to_add: &Schema) -> Result<()> {
        let payload = json!({ "properties": fields_to_add.to_api() });
        self.send(
            Method::PATCH,
            &format!("/databases/{}", database_id),
            Some(payload),
        )
        .await?;
        Ok(())
    }

    async fn query_rows(
        &self,
        database_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<QueryPage> {
        let mut payload = json!({ "page_size": page_size });
        if let Some(cursor) = cursor {
            payload["start_cursor"] = json!(cursor);
        }
        let body = self
            .send(
                Method::POST,
                &format!("/databases/{}/query", database_id),
                Some(payload),
            )
            .await?;

        let rows = body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().map(Row::from_api).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        Ok(QueryPage {
            rows,
            has_more: body.get("has_more").and_then(Value::as_bool).unwrap_or(false),
            next_cursor: body
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    async fn create_row(&self, database_id: &str, values: &RowValues) -> Result<String> {
        let payload = json!({
            "parent": { "database_id": database_id },
            "properties": values.to_api(),
        });
        let body = self.send(Method::POST, "/pages", Some(payload)).await?;
        object_id(&body)
    }

    async fn retrieve_row(&self, row_id: &str) -> Result<Row> {
        let body = self
            .send(Method::GET, &format!("/pages/{}", row_id), None)
            .await?;
        let mut row = Row::from_api(&body)?;

        for (name, value) in row.values.iter_mut() {
            if !value.has_more || value.kind != FieldKind::Relation {
                continue;
            }
            let Some(property_id) = value.id.clone() else {
                warn!("Relation {:?} on {} is truncated and has no property id", name, row_id);
                continue;
            };
            let ids = self.relation_items(row_id, &property_id).await?;
            debug!("Paged {} references for {:?} on {}", ids.len(), name, row_id);
            value.value = PropertyValue::relation(ids.as_slice()).value;
            value.has_more = false;
        }
        Ok(row)
    }

    async fn update_row(&self, row_id: &str, values: &RowValues) -> Result<()> {
        let payload = json!({ "properties": values.to_api() });
        self.send(Method::PATCH, &format!("/pages/{}", row_id), Some(payload))
            .await?;
        Ok(())
    }
}

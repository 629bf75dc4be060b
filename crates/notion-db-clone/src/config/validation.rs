//! Configuration validation.

use super::{Config, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // API validation
    if config.api.token.trim().is_empty() {
        return Err(Error::Config(
            "api.token is required (or set NOTION_TOKEN)".into(),
        ));
    }
    if config.api.base_url.is_empty() {
        return Err(Error::Config("api.base_url is required".into()));
    }
    if config.api.version.is_empty() {
        return Err(Error::Config("api.version is required".into()));
    }
    if config.api.timeout_seconds == 0 {
        return Err(Error::Config(
            "api.timeout_seconds must be at least 1".into(),
        ));
    }

    // Clone validation
    if config.clone.row_batch_size == 0 {
        return Err(Error::Config(
            "clone.row_batch_size must be at least 1".into(),
        ));
    }
    if config.clone.hierarchy_batch_size == 0 {
        return Err(Error::Config(
            "clone.hierarchy_batch_size must be at least 1".into(),
        ));
    }
    if config.clone.page_size == 0 || config.clone.page_size > MAX_PAGE_SIZE {
        return Err(Error::Config(format!(
            "clone.page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.clone.page_size
        )));
    }
    if config.clone.hierarchy_field_name.is_empty() {
        return Err(Error::Config(
            "clone.hierarchy_field_name cannot be empty".into(),
        ));
    }

    let mut seen = HashSet::new();
    for rule in &config.clone.rename_rules {
        if rule.prefix.is_empty() {
            return Err(Error::Config(format!(
                "rename rule for {:?} has an empty prefix",
                rule.field
            )));
        }
        if !seen.insert(rule.field.as_str()) {
            return Err(Error::Config(format!(
                "duplicate rename rule for {:?}",
                rule.field
            )));
        }
    }

    Ok(())
}

// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration for an exchange instance

use crate::alias::AliasTable;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default data attribute suffix
pub const DEFAULT_TARGET_ATTR: &str = "exchange";

/// Exchange configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Data attribute suffix; elements are looked up by `data-<target_attr>`
    pub target_attr: String,
    /// Aliases available to rule conditions
    pub media_queries: AliasTable,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            target_attr: DEFAULT_TARGET_ATTR.to_string(),
            media_queries: AliasTable::default(),
        }
    }
}

impl ExchangeConfig {
    /// Create a builder starting from the defaults
    pub fn builder() -> ExchangeConfigBuilder {
        ExchangeConfigBuilder::new()
    }

    /// Full attribute name carrying the rule list
    pub fn attribute_name(&self) -> String {
        format!("data-{}", self.target_attr)
    }

    /// Merge caller-supplied options into this configuration.
    ///
    /// Only known keys are applied. Anything invalid is skipped, leaving the
    /// prior value in place, and returned so the caller can report it.
    pub fn apply_options(&mut self, options: &Value) -> Vec<ConfigurationError> {
        let Some(map) = options.as_object() else {
            let err = ConfigurationError::NotAnObject {
                actual: json_type_name(options).to_string(),
            };
            log::warn!("Ignoring options: {err}");
            return vec![err];
        };

        let mut errors = Vec::new();
        for (key, value) in map {
            let outcome = match key.as_str() {
                "target_attr" => self.apply_target_attr(value),
                "media_queries" => self.apply_media_queries(value),
                other => {
                    log::debug!("Ignoring unknown option '{other}'");
                    Ok(())
                }
            };
            if let Err(err) = outcome {
                log::warn!("Ignoring option: {err}");
                errors.push(err);
            }
        }
        errors
    }

    fn apply_target_attr(&mut self, value: &Value) -> Result<(), ConfigurationError> {
        match value.as_str() {
            Some(attr) if !attr.trim().is_empty() => {
                self.target_attr = attr.trim().to_string();
                Ok(())
            }
            _ => Err(ConfigurationError::InvalidOption {
                key: "target_attr".to_string(),
                expected: "a non-empty string".to_string(),
            }),
        }
    }

    fn apply_media_queries(&mut self, value: &Value) -> Result<(), ConfigurationError> {
        let table: AliasTable =
            serde_json::from_value(value.clone()).map_err(|_| ConfigurationError::InvalidOption {
                key: "media_queries".to_string(),
                expected: "an object of alias names to condition strings".to_string(),
            })?;
        self.media_queries = table;
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Builder for [`ExchangeConfig`] with fluent API
pub struct ExchangeConfigBuilder {
    config: ExchangeConfig,
}

impl ExchangeConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: ExchangeConfig::default(),
        }
    }

    /// Set the data attribute suffix
    pub fn with_target_attr(mut self, target_attr: impl Into<String>) -> Self {
        self.config.target_attr = target_attr.into();
        self
    }

    /// Replace the alias table
    pub fn with_media_queries(mut self, media_queries: AliasTable) -> Self {
        self.config.media_queries = media_queries;
        self
    }

    /// Add or override a single alias
    pub fn with_alias(mut self, alias: impl Into<String>, condition: impl Into<String>) -> Self {
        self.config.media_queries.insert(alias, condition);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ExchangeConfig {
        self.config
    }
}

impl Default for ExchangeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

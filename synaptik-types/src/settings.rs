//! Prompt execution settings
// Copyright 2025 Synaptik Contributors
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


use serde::{Deserialize, Serialize};

/// Provider-agnostic knobs for a single completion request.
///
/// Connectors map these onto their own wire fields and ignore the ones
/// the provider does not support.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptExecutionSettings {
    /// Model override; falls back to the connector's configured model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// End-user tag forwarded to providers that accept one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl PromptExecutionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let settings = PromptExecutionSettings::new()
            .with_model_id("gpt-4o-mini")
            .with_max_tokens(256)
            .with_temperature(0.2);

        assert_eq!(settings.model_id.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(settings.max_tokens, Some(256));
        assert_eq!(settings.temperature, Some(0.2));
        assert!(settings.top_p.is_none());
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let settings = PromptExecutionSettings::new().with_max_tokens(10);
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json, serde_json::json!({ "max_tokens": 10 }));
    }
}

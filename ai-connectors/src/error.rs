//! Error types for AI connectors
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


use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "onnx")]
    #[error("ONNX runtime error: {0}")]
    Onnx(String),
}

impl ConnectorError {
    /// Translate a non-2xx provider status plus body into the matching variant
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => ConnectorError::Auth(message),
            429 => ConnectorError::RateLimit(message),
            code => ConnectorError::Api {
                status: code,
                message,
            },
        }
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_translation() {
        let err = ConnectorError::from_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "bad key".to_string(),
        );
        assert!(matches!(err, ConnectorError::Auth(_)));

        let err = ConnectorError::from_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down".to_string(),
        );
        assert!(matches!(err, ConnectorError::RateLimit(_)));

        let err =
            ConnectorError::from_status(reqwest::StatusCode::BAD_REQUEST, "nope".to_string());
        assert!(matches!(err, ConnectorError::Api { status: 400, .. }));
    }
}

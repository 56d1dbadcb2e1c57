use serde::Serialize;

use crate::error::{NaasError, Result};

/// One entry of the `/` endpoint index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSummary {
    pub route: String,
    pub methods: Vec<String>,
}

impl EndpointSummary {
    pub fn new(route: &str, methods: &[&str]) -> Self {
        Self {
            route: route.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// JSON bodies that never change after startup, serialized once.
#[derive(Debug, Clone)]
pub struct PreSerialized {
    pub endpoint_index: String,
    pub languages: String,
}

impl PreSerialized {
    pub fn new(endpoints: &[EndpointSummary], languages: &[String]) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(NaasError::Configuration("No endpoints were found".to_string()));
        }

        Ok(Self {
            endpoint_index: to_json(endpoints)?,
            languages: to_json(languages)?,
        })
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| NaasError::Configuration(format!("Failed to serialize response: {}", e)))
}

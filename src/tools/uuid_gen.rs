//! UUID v4 generator tool.

use serde_json::Value;
use tracing::info;

use crate::error::ToolError;

use super::{JsonMap, Tool};

/// Generates random RFC 4122 version 4 UUIDs.
///
/// Takes no arguments; returns `{"uuid": "<36-character string>"}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGen;

impl UuidGen {
    /// Creates a new UUID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates one random UUID v4 string.
    #[must_use]
    pub fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl Tool for UuidGen {
    fn name(&self) -> &str {
        "generate_uuid"
    }

    fn description(&self) -> &str {
        "Generates a random UUID v4 string"
    }

    fn execute(&self, _args: &JsonMap) -> Result<JsonMap, ToolError> {
        let uuid = self.generate();
        info!(uuid = %uuid, "Generated UUID");

        let mut result = JsonMap::new();
        result.insert("uuid".to_string(), Value::String(uuid));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_rfc4122_shape() {
        let tool = UuidGen::new();
        let result = tool.execute(&JsonMap::new()).unwrap();

        let uuid = result["uuid"].as_str().unwrap();
        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid.chars().filter(|&c| c == '-').count(), 4);
        // Version nibble is 4 for random UUIDs.
        assert_eq!(&uuid[14..15], "4");
    }

    #[test]
    fn sequential_calls_differ() {
        let tool = UuidGen::new();
        let a = tool.execute(&JsonMap::new()).unwrap();
        let b = tool.execute(&JsonMap::new()).unwrap();
        assert_ne!(a["uuid"], b["uuid"]);
    }

    #[test]
    fn ignores_unexpected_arguments() {
        let tool = UuidGen::new();
        let mut args = JsonMap::new();
        args.insert("count".to_string(), Value::from(5));

        let result = tool.execute(&args).unwrap();
        assert!(result.contains_key("uuid"));
    }
}

//! Tool abstraction, registry and directory.
//!
//! A [`Tool`] is a named capability with a synchronous execute operation
//! taking a string-keyed argument bag and returning a string-keyed result
//! bag. Tools are constructed once at startup via the [`ToolRegistry`] and
//! held immutably in a [`ToolDirectory`] for the process lifetime; all
//! transports share the directory through an `Arc` without locking because
//! it never mutates after construction.

mod uuid_gen;

pub use uuid_gen::UuidGen;

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::ToolError;

/// A string-keyed JSON object, the argument and result shape for tools.
pub type JsonMap = serde_json::Map<String, Value>;

/// An invokable named capability.
///
/// Implementations must be cheap to call and complete quickly: tool
/// execution is synchronous and is not cancelled mid-flight on shutdown.
pub trait Tool: Send + Sync {
    /// Unique tool name, stable for the process lifetime.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Executes the tool with the given argument bag.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Execution`] when the tool reports a failure.
    fn execute(&self, args: &JsonMap) -> Result<JsonMap, ToolError>;
}

/// Environment snapshot handed to tool builders.
///
/// Builders use this to decide whether their dependencies are satisfied
/// (API keys, endpoints, and the like).
pub type BuilderConfig = HashMap<String, String>;

/// A function that constructs a tool, or declines when its dependencies
/// are not available.
pub type ToolBuilder = Box<dyn Fn(&BuilderConfig) -> Result<Box<dyn Tool>, ToolError> + Send + Sync>;

/// Registry of tool builders, populated with the built-in tools.
///
/// Each builder is bound to its own registration entry, so every
/// constructed tool closes over exactly its own state.
pub struct ToolRegistry {
    builders: Vec<(String, ToolBuilder)>,
}

impl ToolRegistry {
    /// Creates a registry with all built-in tools registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            builders: Vec::new(),
        };
        registry.register_builtin_tools();
        registry
    }

    /// Registers the built-in tool builders.
    fn register_builtin_tools(&mut self) {
        // UUID generator needs no configuration.
        self.register("uuid_gen", Box::new(|_config| Ok(Box::new(UuidGen::new()))));
    }

    /// Adds a tool builder under the given registry key.
    pub fn register(&mut self, name: impl Into<String>, builder: ToolBuilder) {
        self.builders.push((name.into(), builder));
    }

    /// Returns the registry keys of all registered builders.
    #[must_use]
    pub fn available(&self) -> Vec<&str> {
        self.builders.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Constructs every tool whose dependencies are satisfied.
    ///
    /// Builders that fail are skipped with a warning; the overall call only
    /// fails when no tool at all could be constructed.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NoToolsAvailable`] when every builder failed.
    pub fn create_all_available(
        &self,
        config: &BuilderConfig,
    ) -> Result<Vec<Box<dyn Tool>>, ToolError> {
        let mut tools = Vec::new();
        let mut failures = Vec::new();

        for (name, builder) in &self.builders {
            match builder(config) {
                Ok(tool) => {
                    info!(registry_key = %name, tool = %tool.name(), "Created tool");
                    tools.push(tool);
                }
                Err(e) => {
                    warn!(registry_key = %name, reason = %e, "Skipping tool");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }

        if tools.is_empty() {
            return Err(ToolError::NoToolsAvailable {
                details: failures.join("; "),
            });
        }

        Ok(tools)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable mapping from tool name to tool instance.
///
/// Built exactly once at startup; concurrent reads from all transports are
/// safe because the map never changes afterwards. Duplicate names resolve
/// to the last registration.
pub struct ToolDirectory {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolDirectory {
    /// Builds the directory from a registry, using the process environment
    /// as builder configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NoToolsAvailable`] when no tool could be built.
    pub fn from_registry(registry: &ToolRegistry) -> Result<Self, ToolError> {
        let config: BuilderConfig = std::env::vars().collect();
        let tools = registry.create_all_available(&config)?;
        Ok(Self::from_tools(tools))
    }

    /// Builds the directory from already-constructed tools.
    #[must_use]
    pub fn from_tools(tools: Vec<Box<dyn Tool>>) -> Self {
        let mut map: HashMap<String, Box<dyn Tool>> = HashMap::new();
        for tool in tools {
            map.insert(tool.name().to_string(), tool);
        }
        info!(count = map.len(), "Registered tools");
        Self { tools: map }
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Executes the named tool with the given argument bag.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unknown names and forwards the
    /// tool's own [`ToolError::Execution`] on failure.
    pub fn execute(&self, name: &str, args: &JsonMap) -> Result<JsonMap, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })?;

        match tool.execute(args) {
            Ok(result) => {
                info!(tool = %name, "Tool executed successfully");
                Ok(result)
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                Err(e)
            }
        }
    }

    /// Returns tool name -> description, sorted by name.
    #[must_use]
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    /// Iterates over the registered tools, sorted by name.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &dyn Tool> {
        let mut tools: Vec<&dyn Tool> = self.tools.values().map(AsRef::as_ref).collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools.into_iter()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

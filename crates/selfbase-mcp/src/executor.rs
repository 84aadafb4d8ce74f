//! Tool execution engine.
//!
//! This module handles the actual execution of MCP tools:
//! - Validating arguments against the tool's input schema
//! - Dispatching to the handler for the tool
//! - Formatting results and failures as tool content

use crate::error::ToolError;
use crate::handlers;
use crate::protocol::{ToolContent, ToolDefinition};
use selfbase_branching::Branching;
use selfbase_core::SelfbaseConfig;
use selfbase_gateway::SqlGateway;
use selfbase_services::Services;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the execution was successful.
    pub success: bool,
    /// The result content.
    pub content: Vec<ToolContent>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Create a successful result; the value is rendered as pretty JSON text.
    pub fn success_json(value: Value) -> Self {
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self {
            success: true,
            content: vec![ToolContent::Text { text }],
            error: None,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        let msg = message.into();
        Self {
            success: false,
            content: vec![ToolContent::Text { text: msg.clone() }],
            error: Some(msg),
        }
    }
}

/// Runs tools against the backend. Cheap to clone.
#[derive(Clone)]
pub struct ToolExecutor {
    pub(crate) gateway: Arc<dyn SqlGateway>,
    pub(crate) branching: Branching,
    pub(crate) services: Services,
    pub(crate) public_url: String,
    pub(crate) anon_key: Option<String>,
}

impl ToolExecutor {
    pub fn new(config: &SelfbaseConfig, gateway: Arc<dyn SqlGateway>, services: Services) -> Self {
        Self {
            branching: Branching::new(gateway.clone()),
            gateway,
            services,
            public_url: config.public_url().to_string(),
            anon_key: config.anon_key(),
        }
    }

    /// Execute a tool call. Failures come back as error results, never panics
    /// or protocol errors.
    pub async fn execute(&self, tool: &ToolDefinition, arguments: Value) -> ExecutionResult {
        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };

        if let Err(e) = validate_arguments(tool, &arguments) {
            tracing::debug!(tool = %tool.name, error = %e, "Rejected tool arguments");
            return ExecutionResult::error(e);
        }

        let project_id = arguments
            .get("project_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let span = tracing::info_span!("tool", tool = %tool.name, project_id = %project_id);

        let result = self.dispatch(&tool.name, arguments).instrument(span.clone()).await;
        span.in_scope(|| match result {
            Ok(value) => {
                tracing::info!("Tool call succeeded");
                ExecutionResult::success_json(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Tool call failed");
                ExecutionResult::error(e.to_string())
            }
        })
    }

    async fn dispatch(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        use handlers::*;

        match name {
            "list_branches" => branching::list_branches(self, args).await,
            "create_branch" => branching::create_branch(self, args).await,
            "delete_branch" => branching::delete_branch(self, args).await,
            "merge_branch" => branching::merge_branch(self, args).await,
            "reset_branch" => branching::reset_branch(self, args).await,
            "rebase_branch" => branching::rebase_branch(self, args).await,

            "execute_sql" => database::execute_sql(self, args).await,
            "list_tables" => database::list_tables(self, args).await,
            "list_extensions" => database::list_extensions(self, args).await,
            "list_migrations" => database::list_migrations(self, args).await,
            "apply_migration" => database::apply_migration(self, args).await,

            "list_buckets" => storage::list_buckets(self, args).await,
            "get_bucket" => storage::get_bucket(self, args).await,
            "create_bucket" => storage::create_bucket(self, args).await,
            "update_bucket" => storage::update_bucket(self, args).await,
            "delete_bucket" => storage::delete_bucket(self, args).await,
            "empty_bucket" => storage::empty_bucket(self, args).await,
            "list_objects" => storage::list_objects(self, args).await,
            "delete_objects" => storage::delete_objects(self, args).await,

            "list_users" => auth::list_users(self, args).await,
            "get_user" => auth::get_user(self, args).await,
            "create_user" => auth::create_user(self, args).await,
            "delete_user" => auth::delete_user(self, args).await,

            "list_edge_functions" => functions::list_edge_functions(self, args).await,
            "get_edge_function" => functions::get_edge_function(self, args).await,
            "deploy_edge_function" => functions::deploy_edge_function(self, args).await,
            "delete_edge_function" => functions::delete_edge_function(self, args).await,
            "invoke_edge_function" => functions::invoke_edge_function(self, args).await,

            "get_health" => operations::get_health(self, args).await,
            "get_project_url" => operations::get_project_url(self, args).await,
            "get_anon_key" => operations::get_anon_key(self, args).await,

            other => Err(ToolError::Validation(format!("no handler for tool {}", other))),
        }
    }
}

/// Validate arguments against the tool's input schema.
fn validate_arguments(tool: &ToolDefinition, arguments: &Value) -> Result<(), String> {
    let schema = &tool.input_schema;
    let Some(args) = arguments.as_object() else {
        return Err("Arguments must be an object".to_string());
    };

    // Check required fields
    if let Some(required) = schema["required"].as_array() {
        for field in required.iter().filter_map(Value::as_str) {
            if args.get(field).is_none_or(Value::is_null) {
                return Err(format!("Missing required field: {}", field));
            }
        }
    }

    let Some(props) = schema["properties"].as_object() else {
        return Ok(());
    };

    if schema["additionalProperties"] == Value::Bool(false) {
        if let Some(unknown) = args.keys().find(|k| !props.contains_key(*k)) {
            return Err(format!("Unknown field: {}", unknown));
        }
    }

    for (field, prop_schema) in props {
        let Some(value) = args.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        // Check enum
        if let Some(allowed) = prop_schema["enum"].as_array() {
            if !allowed.contains(value) {
                return Err(format!(
                    "Invalid value for '{}': {}. Allowed: {}",
                    field,
                    value,
                    Value::Array(allowed.clone())
                ));
            }
        }

        // Check type
        if let Some(expected_type) = prop_schema["type"].as_str() {
            if !check_type(value, expected_type) {
                return Err(format!(
                    "Invalid type for '{}': expected {}, got {}",
                    field, expected_type, value
                ));
            }
        }

        // Check min/max
        if let (Some(min), Some(v)) = (prop_schema["minimum"].as_f64(), value.as_f64()) {
            if v < min {
                return Err(format!("Value for '{}' must be at least {}", field, min));
            }
        }
        if let (Some(max), Some(v)) = (prop_schema["maximum"].as_f64(), value.as_f64()) {
            if v > max {
                return Err(format!("Value for '{}' must be at most {}", field, max));
            }
        }

        // Check string length
        if let Some(s) = value.as_str() {
            let len = s.chars().count() as u64;
            if let Some(min_len) = prop_schema["minLength"].as_u64() {
                if len < min_len || s.trim().is_empty() {
                    return Err(format!("Value for '{}' must not be empty", field));
                }
            }
            if let Some(max_len) = prop_schema["maxLength"].as_u64() {
                if len > max_len {
                    return Err(format!(
                        "Value for '{}' must be at most {} characters",
                        field, max_len
                    ));
                }
            }
        }

        // Check array length
        if let (Some(min_items), Some(items)) = (prop_schema["minItems"].as_u64(), value.as_array()) {
            if (items.len() as u64) < min_items {
                return Err(format!(
                    "'{}' must contain at least {} item(s)",
                    field, min_items
                ));
            }
        }

        // Check pattern
        if let (Some(pattern), Some(s)) = (prop_schema["pattern"].as_str(), value.as_str()) {
            if let Ok(re) = regex::Regex::new(pattern) {
                if !re.is_match(s) {
                    return Err(format!(
                        "Value for '{}' does not match pattern: {}",
                        field, pattern
                    ));
                }
            }
        }
    }

    Ok(())
}

fn check_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::test_support::executor_with;
    use selfbase_gateway::testing::ScriptedGateway;
    use serde_json::json;

    fn tool(name: &str) -> ToolDefinition {
        catalog::registry().get(name).unwrap().clone()
    }

    fn text(result: &ExecutionResult) -> &str {
        match &result.content[0] {
            ToolContent::Text { text } => text,
        }
    }

    #[test]
    fn test_validate_required_and_empty() {
        let create = tool("create_branch");
        assert!(validate_arguments(&create, &json!({"project_id": "p", "name": "x"})).is_ok());
        assert_eq!(
            validate_arguments(&create, &json!({"name": "x"})).unwrap_err(),
            "Missing required field: project_id"
        );
        assert!(validate_arguments(&create, &json!({"project_id": "", "name": "x"})).is_err());
        assert!(validate_arguments(&create, &json!({"project_id": "p", "name": "  "})).is_err());
        assert!(validate_arguments(&create, &json!({"project_id": "p", "name": null})).is_err());
    }

    #[test]
    fn test_validate_types_enums_patterns() {
        let sql = tool("execute_sql");
        assert!(
            validate_arguments(&sql, &json!({"project_id": "p", "query": "select 1", "read_only": "yes"}))
                .unwrap_err()
                .starts_with("Invalid type for 'read_only'")
        );

        let invoke = tool("invoke_edge_function");
        assert!(validate_arguments(&invoke, &json!({"project_id": "p", "name": "hello", "method": "TRACE"})).is_err());
        assert!(
            validate_arguments(&invoke, &json!({"project_id": "p", "name": "../x"}))
                .unwrap_err()
                .contains("does not match pattern")
        );

        let objects = tool("list_objects");
        assert!(validate_arguments(&objects, &json!({"project_id": "p", "bucket": "b", "limit": 0})).is_err());
        assert!(validate_arguments(&objects, &json!({"project_id": "p", "bucket": "b", "limit": 1001})).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_fields() {
        let list = tool("list_branches");
        assert_eq!(
            validate_arguments(&list, &json!({"project_id": "p", "branch": "x"})).unwrap_err(),
            "Unknown field: branch"
        );
        assert!(validate_arguments(&list, &json!([])).is_err());
    }

    #[tokio::test]
    async fn test_validation_failure_issues_no_sql() {
        let gateway = Arc::new(ScriptedGateway::new());
        let executor = executor_with(gateway.clone());

        let result = executor.execute(&tool("delete_branch"), json!({"project_id": "p"})).await;
        assert!(!result.success);
        assert_eq!(text(&result), "Missing required field: branch_name");
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_renders_pretty_json() {
        let gateway = Arc::new(ScriptedGateway::new().on(
            "information_schema.schemata",
            vec![json!({"schema_name": "public"})],
        ));
        let executor = executor_with(gateway);

        let result = executor.execute(&tool("list_branches"), json!({"project_id": "p"})).await;
        assert!(result.success);
        let parsed: Value = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(parsed[0]["schema_name"], "public");
        assert!(text(&result).contains('\n'));
    }

    #[tokio::test]
    async fn test_null_arguments_treated_as_empty() {
        let executor = executor_with(Arc::new(ScriptedGateway::new()));
        let result = executor.execute(&tool("list_branches"), Value::Null).await;
        assert_eq!(text(&result), "Missing required field: project_id");
    }
}

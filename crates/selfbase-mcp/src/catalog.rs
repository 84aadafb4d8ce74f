//! The static tool catalog.
//!
//! Every tool takes a `project_id`. It is injected here so individual
//! definitions only list their own parameters.

use crate::protocol::{ToolAnnotations, ToolDefinition};
use crate::tools::ToolRegistry;
use serde_json::{Map, Value, json};

/// Pattern accepted for edge function names.
pub const FUNCTION_NAME_PATTERN: &str = "^[A-Za-z0-9_-]+$";

enum Kind {
    ReadOnly,
    Write { idempotent: bool },
    Destructive,
}

impl Kind {
    fn annotations(&self) -> ToolAnnotations {
        match self {
            Kind::ReadOnly => ToolAnnotations {
                read_only: Some(true),
                destructive: None,
                idempotent: Some(true),
            },
            Kind::Write { idempotent } => ToolAnnotations {
                read_only: Some(false),
                destructive: Some(false),
                idempotent: Some(*idempotent),
            },
            Kind::Destructive => ToolAnnotations {
                read_only: Some(false),
                destructive: Some(true),
                idempotent: Some(false),
            },
        }
    }
}

fn tool(name: &str, description: &str, kind: Kind, properties: Value, required: &[&str]) -> ToolDefinition {
    let mut props = Map::new();
    props.insert(
        "project_id".to_string(),
        json!({
            "type": "string",
            "minLength": 1,
            "description": "Project identifier"
        }),
    );
    if let Value::Object(extra) = properties {
        props.extend(extra);
    }

    let mut required_fields = vec![Value::from("project_id")];
    required_fields.extend(required.iter().map(|r| Value::from(*r)));

    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: json!({
            "type": "object",
            "properties": props,
            "required": required_fields,
            "additionalProperties": false
        }),
        annotations: Some(kind.annotations()),
    }
}

fn branching_tools() -> Vec<ToolDefinition> {
    vec![
        tool(
            "list_branches",
            "List branches. Each branch is a database schema; 'public' is the default branch.",
            Kind::ReadOnly,
            json!({}),
            &[],
        ),
        tool(
            "create_branch",
            "Create a branch by cloning the table structure (not the data) of a parent branch. \
             The name is mapped to a schema by replacing characters outside [A-Za-z0-9_] with '_'. \
             Reports the outcome for every parent table.",
            Kind::Write { idempotent: true },
            json!({
                "name": {"type": "string", "minLength": 1, "maxLength": 63, "description": "Branch name"},
                "parent_branch": {"type": "string", "minLength": 1, "description": "Branch to clone from (default: public)"}
            }),
            &["name"],
        ),
        tool(
            "delete_branch",
            "Drop a branch schema and everything in it. The default branch 'public' cannot be deleted.",
            Kind::Destructive,
            json!({
                "branch_name": {"type": "string", "minLength": 1, "description": "Branch to delete"}
            }),
            &["branch_name"],
        ),
        tool(
            "merge_branch",
            "Report migrations recorded on the source branch that the target branch lacks. \
             Nothing is applied to the target; migrations_applied lists the missing versions.",
            Kind::ReadOnly,
            json!({
                "source_branch": {"type": "string", "minLength": 1},
                "target_branch": {"type": "string", "minLength": 1, "description": "Default: public"}
            }),
            &["source_branch"],
        ),
        tool(
            "reset_branch",
            "With migration_version, delete migration records newer than that version (schema objects \
             are left as they are). Without it, drop and recreate the branch schema empty; refused for 'public'.",
            Kind::Destructive,
            json!({
                "branch_name": {"type": "string", "minLength": 1},
                "migration_version": {"type": "string", "minLength": 1}
            }),
            &["branch_name"],
        ),
        tool(
            "rebase_branch",
            "Record on the branch every migration version the target branch has and the branch lacks. \
             Bookkeeping only: migration SQL is not replayed.",
            Kind::Write { idempotent: true },
            json!({
                "branch_name": {"type": "string", "minLength": 1},
                "target_branch": {"type": "string", "minLength": 1, "description": "Default: public"}
            }),
            &["branch_name"],
        ),
    ]
}

fn database_tools() -> Vec<ToolDefinition> {
    vec![
        tool(
            "execute_sql",
            "Execute raw SQL and return the resulting rows. With read_only, anything but plain \
             queries is refused, as are calls to built-in side-effecting functions (set_config, \
             nextval, advisory locks...). The check is syntactic: user-defined functions that \
             write are not detected.",
            Kind::Destructive,
            json!({
                "query": {"type": "string", "minLength": 1},
                "read_only": {"type": "boolean", "default": false}
            }),
            &["query"],
        ),
        tool(
            "list_tables",
            "List tables with estimated row and column counts.",
            Kind::ReadOnly,
            json!({
                "schemas": {
                    "type": "array",
                    "items": {"type": "string"},
                    "default": ["public"]
                }
            }),
            &[],
        ),
        tool(
            "list_extensions",
            "List installed database extensions.",
            Kind::ReadOnly,
            json!({}),
            &[],
        ),
        tool(
            "list_migrations",
            "List the migrations recorded on a branch.",
            Kind::ReadOnly,
            json!({
                "branch": {"type": "string", "minLength": 1, "description": "Default: public"}
            }),
            &[],
        ),
        tool(
            "apply_migration",
            "Run migration SQL on a branch and record it in the branch's migration ledger.",
            Kind::Write { idempotent: false },
            json!({
                "name": {"type": "string", "minLength": 1, "description": "Migration name in snake_case"},
                "query": {"type": "string", "minLength": 1},
                "branch": {"type": "string", "minLength": 1, "description": "Default: public"}
            }),
            &["name", "query"],
        ),
    ]
}

fn storage_tools() -> Vec<ToolDefinition> {
    let bucket_id = json!({"id": {"type": "string", "minLength": 1, "description": "Bucket id"}});
    vec![
        tool("list_buckets", "List storage buckets.", Kind::ReadOnly, json!({}), &[]),
        tool("get_bucket", "Get a storage bucket.", Kind::ReadOnly, bucket_id.clone(), &["id"]),
        tool(
            "create_bucket",
            "Create a storage bucket.",
            Kind::Write { idempotent: false },
            json!({
                "name": {"type": "string", "minLength": 1},
                "public": {"type": "boolean", "default": false},
                "file_size_limit": {"type": "integer", "minimum": 0},
                "allowed_mime_types": {"type": "array", "items": {"type": "string"}}
            }),
            &["name"],
        ),
        tool(
            "update_bucket",
            "Change a bucket's visibility or upload limits.",
            Kind::Write { idempotent: true },
            json!({
                "id": {"type": "string", "minLength": 1},
                "public": {"type": "boolean"},
                "file_size_limit": {"type": "integer", "minimum": 0},
                "allowed_mime_types": {"type": "array", "items": {"type": "string"}}
            }),
            &["id"],
        ),
        tool(
            "delete_bucket",
            "Delete an empty storage bucket.",
            Kind::Destructive,
            bucket_id.clone(),
            &["id"],
        ),
        tool(
            "empty_bucket",
            "Delete every object in a storage bucket.",
            Kind::Destructive,
            bucket_id,
            &["id"],
        ),
        tool(
            "list_objects",
            "List objects in a bucket under a prefix.",
            Kind::ReadOnly,
            json!({
                "bucket": {"type": "string", "minLength": 1},
                "prefix": {"type": "string", "default": ""},
                "limit": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 100},
                "offset": {"type": "integer", "minimum": 0, "default": 0}
            }),
            &["bucket"],
        ),
        tool(
            "delete_objects",
            "Delete objects from a bucket by path.",
            Kind::Destructive,
            json!({
                "bucket": {"type": "string", "minLength": 1},
                "paths": {"type": "array", "items": {"type": "string"}, "minItems": 1}
            }),
            &["bucket", "paths"],
        ),
    ]
}

fn auth_tools() -> Vec<ToolDefinition> {
    let user_id = json!({"user_id": {"type": "string", "minLength": 1, "description": "User UUID"}});
    vec![
        tool(
            "list_users",
            "List auth users, one page at a time.",
            Kind::ReadOnly,
            json!({
                "page": {"type": "integer", "minimum": 1, "default": 1},
                "per_page": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 50}
            }),
            &[],
        ),
        tool("get_user", "Get an auth user.", Kind::ReadOnly, user_id.clone(), &["user_id"]),
        tool(
            "create_user",
            "Create an auth user. The email is confirmed unless email_confirm is false.",
            Kind::Write { idempotent: false },
            json!({
                "email": {"type": "string", "minLength": 3},
                "password": {"type": "string"},
                "email_confirm": {"type": "boolean", "default": true},
                "user_metadata": {"type": "object"}
            }),
            &["email"],
        ),
        tool("delete_user", "Delete an auth user.", Kind::Destructive, user_id, &["user_id"]),
    ]
}

fn function_tools() -> Vec<ToolDefinition> {
    let name = json!({"type": "string", "minLength": 1, "pattern": FUNCTION_NAME_PATTERN});
    vec![
        tool(
            "list_edge_functions",
            "List deployed edge functions.",
            Kind::ReadOnly,
            json!({}),
            &[],
        ),
        tool(
            "get_edge_function",
            "Get the source of an edge function.",
            Kind::ReadOnly,
            json!({"name": name}),
            &["name"],
        ),
        tool(
            "deploy_edge_function",
            "Deploy (create or replace) an edge function from its entrypoint source.",
            Kind::Write { idempotent: true },
            json!({
                "name": name,
                "source": {"type": "string", "minLength": 1, "description": "TypeScript entrypoint source"}
            }),
            &["name", "source"],
        ),
        tool(
            "delete_edge_function",
            "Delete an edge function.",
            Kind::Destructive,
            json!({"name": name}),
            &["name"],
        ),
        tool(
            "invoke_edge_function",
            "Invoke an edge function and return its status and response body.",
            Kind::Write { idempotent: false },
            json!({
                "name": name,
                "method": {"type": "string", "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"], "default": "POST"},
                "body": {}
            }),
            &["name"],
        ),
    ]
}

fn operations_tools() -> Vec<ToolDefinition> {
    vec![
        tool(
            "get_health",
            "Probe the database, auth, storage and REST services.",
            Kind::ReadOnly,
            json!({}),
            &[],
        ),
        tool(
            "get_project_url",
            "Get the project's public API URL.",
            Kind::ReadOnly,
            json!({}),
            &[],
        ),
        tool(
            "get_anon_key",
            "Get the project's anonymous API key.",
            Kind::ReadOnly,
            json!({}),
            &[],
        ),
    ]
}

/// Every tool definition.
pub fn all_tools() -> Vec<ToolDefinition> {
    let mut tools = branching_tools();
    tools.extend(database_tools());
    tools.extend(storage_tools());
    tools.extend(auth_tools());
    tools.extend(function_tools());
    tools.extend(operations_tools());
    tools
}

/// A registry holding the full catalog.
pub fn registry() -> ToolRegistry {
    all_tools().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let tools = all_tools();
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(registry().len(), tools.len());
    }

    #[test]
    fn test_every_tool_requires_project_id() {
        for tool in all_tools() {
            let required = tool.input_schema["required"].as_array().unwrap();
            assert_eq!(required[0], "project_id", "{}", tool.name);
            assert_eq!(
                tool.input_schema["properties"]["project_id"]["minLength"], 1,
                "{}",
                tool.name
            );
        }
    }

    #[test]
    fn test_branching_tools_present() {
        let registry = registry();
        for name in [
            "list_branches",
            "create_branch",
            "delete_branch",
            "merge_branch",
            "reset_branch",
            "rebase_branch",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
        let delete = registry.get("delete_branch").unwrap();
        assert_eq!(delete.annotations.as_ref().unwrap().destructive, Some(true));
        let merge = registry.get("merge_branch").unwrap();
        assert_eq!(merge.annotations.as_ref().unwrap().read_only, Some(true));
    }

    #[test]
    fn test_required_fields_are_declared() {
        for tool in all_tools() {
            let props = tool.input_schema["properties"].as_object().unwrap();
            for field in tool.input_schema["required"].as_array().unwrap() {
                assert!(
                    props.contains_key(field.as_str().unwrap()),
                    "{} requires undeclared {}",
                    tool.name,
                    field
                );
            }
        }
    }
}

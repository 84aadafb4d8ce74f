//! Edge function tools.

use super::{ToolResult, parse_args, to_json};
use crate::executor::ToolExecutor;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct NameParams {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeployParams {
    name: String,
    source: String,
}

#[derive(Debug, Deserialize)]
struct InvokeParams {
    name: String,
    #[serde(default = "default_method")]
    method: String,
    body: Option<Value>,
}

fn default_method() -> String {
    "POST".to_string()
}

pub(crate) async fn list_edge_functions(exec: &ToolExecutor, _args: Value) -> ToolResult {
    to_json(&exec.services.functions.list().await?)
}

pub(crate) async fn get_edge_function(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: NameParams = parse_args(args)?;
    to_json(&exec.services.functions.get(&params.name).await?)
}

pub(crate) async fn deploy_edge_function(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: DeployParams = parse_args(args)?;
    to_json(&exec.services.functions.deploy(&params.name, &params.source).await?)
}

pub(crate) async fn delete_edge_function(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: NameParams = parse_args(args)?;
    exec.services.functions.delete(&params.name).await?;
    Ok(json!({ "deleted": params.name }))
}

pub(crate) async fn invoke_edge_function(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: InvokeParams = parse_args(args)?;
    let result = exec
        .services
        .functions
        .invoke(&params.name, &params.method, params.body.as_ref())
        .await?;
    to_json(&result)
}

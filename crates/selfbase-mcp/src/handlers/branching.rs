//! Branch tools.

use super::{ToolResult, parse_args, to_json};
use crate::executor::ToolExecutor;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct CreateBranchParams {
    name: String,
    parent_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchNameParams {
    branch_name: String,
}

#[derive(Debug, Deserialize)]
struct MergeBranchParams {
    source_branch: String,
    target_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResetBranchParams {
    branch_name: String,
    migration_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RebaseBranchParams {
    branch_name: String,
    target_branch: Option<String>,
}

pub(crate) async fn list_branches(exec: &ToolExecutor, _args: Value) -> ToolResult {
    to_json(&exec.branching.repository.list().await?)
}

pub(crate) async fn create_branch(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: CreateBranchParams = parse_args(args)?;
    let created = exec
        .branching
        .repository
        .create(&params.name, params.parent_branch.as_deref())
        .await?;
    to_json(&created)
}

pub(crate) async fn delete_branch(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: BranchNameParams = parse_args(args)?;
    let schema = exec.branching.repository.delete(&params.branch_name).await?;
    Ok(json!({ "deleted": schema }))
}

pub(crate) async fn merge_branch(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: MergeBranchParams = parse_args(args)?;
    let merged = exec
        .branching
        .reconciler
        .merge(&params.source_branch, params.target_branch.as_deref())
        .await?;
    to_json(&merged)
}

pub(crate) async fn reset_branch(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: ResetBranchParams = parse_args(args)?;
    let reset = exec
        .branching
        .reconciler
        .reset(&params.branch_name, params.migration_version.as_deref())
        .await?;
    to_json(&reset)
}

pub(crate) async fn rebase_branch(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: RebaseBranchParams = parse_args(args)?;
    let rebased = exec
        .branching
        .reconciler
        .rebase(&params.branch_name, params.target_branch.as_deref())
        .await?;
    to_json(&rebased)
}

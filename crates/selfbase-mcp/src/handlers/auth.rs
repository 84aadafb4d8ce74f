//! Auth admin tools.

use super::{ToolResult, parse_args};
use crate::executor::ToolExecutor;
use selfbase_services::NewUser;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ListUsersParams {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
struct UserIdParams {
    user_id: String,
}

pub(crate) async fn list_users(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: ListUsersParams = parse_args(args)?;
    Ok(exec.services.auth.list_users(params.page, params.per_page).await?)
}

pub(crate) async fn get_user(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: UserIdParams = parse_args(args)?;
    Ok(exec.services.auth.get_user(&params.user_id).await?)
}

pub(crate) async fn create_user(exec: &ToolExecutor, args: Value) -> ToolResult {
    let user: NewUser = parse_args(args)?;
    Ok(exec.services.auth.create_user(&user).await?)
}

pub(crate) async fn delete_user(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: UserIdParams = parse_args(args)?;
    Ok(exec.services.auth.delete_user(&params.user_id).await?)
}

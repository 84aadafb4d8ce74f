//! Storage tools.

use super::{ToolResult, parse_args};
use crate::executor::ToolExecutor;
use selfbase_services::{BucketUpdate, NewBucket, ObjectListing};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct BucketIdParams {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateBucketParams {
    id: String,
    #[serde(flatten)]
    update: BucketUpdate,
}

#[derive(Debug, Deserialize)]
struct ListObjectsParams {
    bucket: String,
    prefix: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DeleteObjectsParams {
    bucket: String,
    paths: Vec<String>,
}

pub(crate) async fn list_buckets(exec: &ToolExecutor, _args: Value) -> ToolResult {
    Ok(exec.services.storage.list_buckets().await?)
}

pub(crate) async fn get_bucket(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: BucketIdParams = parse_args(args)?;
    Ok(exec.services.storage.get_bucket(&params.id).await?)
}

pub(crate) async fn create_bucket(exec: &ToolExecutor, args: Value) -> ToolResult {
    let bucket: NewBucket = parse_args(args)?;
    Ok(exec.services.storage.create_bucket(&bucket).await?)
}

pub(crate) async fn update_bucket(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: UpdateBucketParams = parse_args(args)?;
    Ok(exec
        .services
        .storage
        .update_bucket(&params.id, &params.update)
        .await?)
}

pub(crate) async fn delete_bucket(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: BucketIdParams = parse_args(args)?;
    Ok(exec.services.storage.delete_bucket(&params.id).await?)
}

pub(crate) async fn empty_bucket(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: BucketIdParams = parse_args(args)?;
    Ok(exec.services.storage.empty_bucket(&params.id).await?)
}

pub(crate) async fn list_objects(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: ListObjectsParams = parse_args(args)?;
    let defaults = ObjectListing::default();
    let listing = ObjectListing {
        prefix: params.prefix.unwrap_or(defaults.prefix),
        limit: params.limit.unwrap_or(defaults.limit),
        offset: params.offset.unwrap_or(defaults.offset),
    };
    Ok(exec
        .services
        .storage
        .list_objects(&params.bucket, &listing)
        .await?)
}

pub(crate) async fn delete_objects(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: DeleteObjectsParams = parse_args(args)?;
    Ok(exec
        .services
        .storage
        .delete_objects(&params.bucket, &params.paths)
        .await?)
}

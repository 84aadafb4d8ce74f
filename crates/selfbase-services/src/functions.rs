//! Edge functions.
//!
//! A self-hosted deployment serves functions from a directory mounted into
//! the edge runtime, one sub-directory per function. Deploying writes the
//! entrypoint file and the runtime picks it up on the next request;
//! invoking goes through the API gateway at `/functions/v1/<name>`.

use crate::client::{ApiClient, decode_body};
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use reqwest::Method;
use selfbase_core::FunctionsConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// The runtime's router service lives next to user functions and must not be
/// replaced or removed.
pub const MAIN_FUNCTION: &str = "main";

const MAX_NAME_LEN: usize = 128;

/// A deployed function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFunction {
    pub name: String,
    pub entrypoint: String,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A function's entrypoint source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSource {
    pub name: String,
    pub entrypoint: String,
    pub source: String,
}

/// Response of an invocation. The function's own status is data, not an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResult {
    pub status: u16,
    pub body: Value,
}

/// Function names must be non-empty `[A-Za-z0-9_-]+`.
pub fn validate_function_name(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::Validation(
            "function name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ServiceError::Validation(format!(
            "function name exceeds {} characters",
            MAX_NAME_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ServiceError::Validation(format!(
            "invalid function name '{}': only letters, digits, '_' and '-' are allowed",
            name
        )));
    }
    Ok(())
}

fn validate_mutable(name: &str) -> Result<(), ServiceError> {
    validate_function_name(name)?;
    if name == MAIN_FUNCTION {
        return Err(ServiceError::Validation(format!(
            "'{}' is the runtime's router function and cannot be modified",
            MAIN_FUNCTION
        )));
    }
    Ok(())
}

/// Edge function management: local function directory plus HTTP invocation.
#[derive(Debug, Clone)]
pub struct EdgeFunctions {
    directory: PathBuf,
    entrypoint: String,
    api: ApiClient,
}

impl EdgeFunctions {
    pub fn new(config: &FunctionsConfig, api: ApiClient) -> Self {
        Self {
            directory: config.directory.clone(),
            entrypoint: config.entrypoint.clone(),
            api,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn function_dir(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    fn entrypoint_path(&self, name: &str) -> PathBuf {
        self.function_dir(name).join(&self.entrypoint)
    }

    /// Functions with an entrypoint, ordered by name. A missing functions
    /// directory lists as empty.
    pub async fn list(&self) -> Result<Vec<EdgeFunction>, ServiceError> {
        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut functions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_function_name(&name).is_err() {
                continue;
            }
            if let Some(function) = self.describe(&name).await? {
                functions.push(function);
            }
        }
        functions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(functions)
    }

    async fn describe(&self, name: &str) -> Result<Option<EdgeFunction>, ServiceError> {
        match fs::metadata(self.entrypoint_path(name)).await {
            Ok(meta) if meta.is_file() => Ok(Some(EdgeFunction {
                name: name.to_string(),
                entrypoint: self.entrypoint.clone(),
                size_bytes: meta.len(),
                updated_at: meta.modified().ok().map(DateTime::<Utc>::from),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, name: &str) -> Result<FunctionSource, ServiceError> {
        validate_function_name(name)?;
        let source = match fs::read_to_string(self.entrypoint_path(name)).await {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(format!("edge function '{}'", name)));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(FunctionSource {
            name: name.to_string(),
            entrypoint: self.entrypoint.clone(),
            source,
        })
    }

    /// Write (or overwrite) a function's entrypoint.
    pub async fn deploy(&self, name: &str, source: &str) -> Result<EdgeFunction, ServiceError> {
        validate_mutable(name)?;
        if source.trim().is_empty() {
            return Err(ServiceError::Validation("source must not be empty".to_string()));
        }

        fs::create_dir_all(self.function_dir(name)).await?;
        fs::write(self.entrypoint_path(name), source).await?;
        info!(function = %name, bytes = source.len(), "Deployed edge function");

        self.describe(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("edge function '{}'", name)))
    }

    /// Remove a function directory and everything in it.
    pub async fn delete(&self, name: &str) -> Result<(), ServiceError> {
        validate_mutable(name)?;
        match fs::remove_dir_all(self.function_dir(name)).await {
            Ok(()) => {
                info!(function = %name, "Deleted edge function");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ServiceError::NotFound(format!("edge function '{}'", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Call a function through the API gateway.
    pub async fn invoke(
        &self,
        name: &str,
        method: &str,
        body: Option<&Value>,
    ) -> Result<InvokeResult, ServiceError> {
        validate_function_name(name)?;
        let method = parse_method(method)?;
        if method == Method::GET && body.is_some() {
            return Err(ServiceError::Validation(
                "GET invocations cannot carry a body".to_string(),
            ));
        }

        let (status, text) = self
            .api
            .send(method, &format!("/functions/v1/{}", name), body)
            .await?;
        Ok(InvokeResult {
            status: status.as_u16(),
            body: decode_body(&text),
        })
    }
}

fn parse_method(method: &str) -> Result<Method, ServiceError> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => Err(ServiceError::Validation(format!(
            "unsupported method '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Recorder, api_for};
    use axum::http::StatusCode;
    use serde_json::json;
    use tempfile::TempDir;

    fn functions(dir: &Path, base: &str) -> EdgeFunctions {
        EdgeFunctions::new(
            &FunctionsConfig {
                directory: dir.to_path_buf(),
                entrypoint: "index.ts".into(),
            },
            api_for(base),
        )
    }

    #[test]
    fn test_validate_function_name() {
        assert!(validate_function_name("hello-world_2").is_ok());
        assert!(validate_function_name("").is_err());
        assert!(validate_function_name("../etc").is_err());
        assert!(validate_function_name("a/b").is_err());
        assert!(validate_function_name("with space").is_err());
        assert!(validate_function_name(&"x".repeat(129)).is_err());
    }

    #[tokio::test]
    async fn test_deploy_list_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = functions(dir.path(), "http://127.0.0.1:9");

        let deployed = store
            .deploy("hello", "Deno.serve(() => new Response('hi'))")
            .await
            .unwrap();
        assert_eq!(deployed.name, "hello");
        assert!(deployed.size_bytes > 0);
        assert!(dir.path().join("hello/index.ts").is_file());

        // Directories without an entrypoint are not functions.
        std::fs::create_dir(dir.path().join("scratch")).unwrap();
        store.deploy("another", "export {}").await.unwrap();
        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["another", "hello"]);

        let source = store.get("hello").await.unwrap();
        assert!(source.source.contains("Response('hi')"));

        store.delete("hello").await.unwrap();
        assert!(!dir.path().join("hello").exists());
        assert!(matches!(store.get("hello").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(store.delete("hello").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_directory_lists_empty() {
        let dir = TempDir::new().unwrap();
        let store = functions(&dir.path().join("absent"), "http://127.0.0.1:9");
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_main_function_is_protected() {
        let dir = TempDir::new().unwrap();
        let store = functions(dir.path(), "http://127.0.0.1:9");
        assert!(store.deploy("main", "export {}").await.unwrap_err().is_validation());
        assert!(store.delete("main").await.unwrap_err().is_validation());
        assert!(store.deploy("../main", "export {}").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_invoke_posts_through_gateway() {
        let recorder = Recorder::new(StatusCode::ACCEPTED, json!({"greeting": "hi"}));
        let base = recorder.spawn().await;
        let dir = TempDir::new().unwrap();
        let store = functions(dir.path(), &base);

        let result = store
            .invoke("hello", "post", Some(&json!({"name": "ada"})))
            .await
            .unwrap();
        assert_eq!(result.status, 202);
        assert_eq!(result.body["greeting"], "hi");

        let request = recorder.last();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/functions/v1/hello");
        assert_eq!(request.body["name"], "ada");
        assert_eq!(request.authorization.as_deref(), Some("Bearer test-key"));

        assert!(store.invoke("hello", "TRACE", None).await.unwrap_err().is_validation());
        assert!(
            store
                .invoke("hello", "GET", Some(&json!({})))
                .await
                .unwrap_err()
                .is_validation()
        );
        assert_eq!(recorder.count(), 1);
    }

    #[tokio::test]
    async fn test_invoke_reports_function_errors_as_data() {
        let recorder = Recorder::new(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}));
        let base = recorder.spawn().await;
        let dir = TempDir::new().unwrap();

        let result = functions(dir.path(), &base)
            .invoke("hello", "POST", None)
            .await
            .unwrap();
        assert_eq!(result.status, 500);
        assert_eq!(result.body["error"], "boom");
    }
}

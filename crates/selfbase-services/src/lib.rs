//! # selfbase-services
//!
//! Clients for the platform services that sit behind the API gateway:
//! object storage, the identity service's admin API, edge functions and
//! deployment health. All HTTP traffic shares one [`ApiClient`] carrying the
//! service role key.

pub mod auth;
pub mod client;
pub mod error;
pub mod functions;
pub mod health;
pub mod storage;

use selfbase_core::SelfbaseConfig;
use selfbase_gateway::SqlGateway;
use std::sync::Arc;

pub use auth::{AuthAdminClient, NewUser};
pub use client::ApiClient;
pub use error::ServiceError;
pub use functions::{EdgeFunction, EdgeFunctions, FunctionSource, InvokeResult};
pub use health::{HealthChecker, HealthReport, ServiceHealth};
pub use storage::{BucketUpdate, NewBucket, ObjectListing, StorageClient};

/// Every service client, built once from configuration.
#[derive(Clone)]
pub struct Services {
    pub storage: StorageClient,
    pub auth: AuthAdminClient,
    pub functions: EdgeFunctions,
    pub health: HealthChecker,
}

impl Services {
    pub fn new(config: &SelfbaseConfig, http: reqwest::Client, gateway: Arc<dyn SqlGateway>) -> Self {
        let api = ApiClient::from_config(config, http);
        Self {
            storage: StorageClient::new(api.clone()),
            auth: AuthAdminClient::new(api.clone()),
            functions: EdgeFunctions::new(&config.functions, api.clone()),
            health: HealthChecker::new(gateway, api),
        }
    }
}

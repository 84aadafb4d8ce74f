//! # selfbase-branching
//!
//! Schema-based branching. A branch is a Postgres schema; creating one clones
//! the table shapes of its parent (`LIKE ... INCLUDING ALL`, no data). Each
//! branch may carry a `schema_migrations` ledger, and the reconciler compares
//! ledgers between branches.
//!
//! ```text
//!   BranchRepository    list / create / delete  (schemas)
//!   MigrationLedger     per-schema schema_migrations access
//!   BranchReconciler    merge / reset / rebase  (ledger diffs)
//!          │
//!          ▼
//!     SqlGateway
//! ```
//!
//! Nothing here is transactional. Concurrent operations on the same branch
//! interleave at statement level.

pub mod branch;
pub mod error;
pub mod ledger;
pub mod reconciler;
pub mod repository;

use selfbase_gateway::SqlGateway;
use std::sync::Arc;

pub use branch::{Branch, BranchCreation, CopyStatus, TableCopyOutcome, schema_name_for};
pub use error::BranchError;
pub use ledger::{LEDGER_TABLE, LedgerEntry, MigrationLedger};
pub use reconciler::{
    BranchReconciler, InsertStatus, LedgerInsertOutcome, MergeResult, RebaseResult, ResetMode,
    ResetResult,
};
pub use repository::BranchRepository;

/// The three branching components, sharing one gateway.
#[derive(Clone)]
pub struct Branching {
    pub repository: BranchRepository,
    pub ledger: MigrationLedger,
    pub reconciler: BranchReconciler,
}

impl Branching {
    pub fn new(gateway: Arc<dyn SqlGateway>) -> Self {
        Self {
            repository: BranchRepository::new(gateway.clone()),
            ledger: MigrationLedger::new(gateway.clone()),
            reconciler: BranchReconciler::new(gateway),
        }
    }
}

use async_trait::async_trait;
use code_exec::Entitlement;

use crate::error::StoreError;
use crate::page::{Page, PageRequest};
use crate::record::{
    CallerIdentity, ExecutionId, ExecutionRecord, NewExecution, Snippet, SnippetId, StarRecord,
};

/// Append-only history of execution attempts.
///
/// ## Authorization
///
/// `append` re-validates the caller's entitlement against the record's
/// language; a client-side check is never trusted. Writes without an identity
/// fail with [`StoreError::Unauthenticated`].
///
/// ## Ordering
///
/// Reads return records newest first by `(created_at, id)`. Ids increase with
/// insertion order, so the order is total even when timestamps collide.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a terminal execution attempt and return its id.
    async fn append(
        &self,
        identity: Option<&CallerIdentity>,
        execution: NewExecution,
    ) -> Result<ExecutionId, StoreError>;

    /// One page of a user's history.
    async fn list_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<ExecutionRecord>, StoreError>;

    /// A user's complete history.
    async fn all_by_user(&self, user_id: &str) -> Result<Vec<ExecutionRecord>, StoreError>;
}

/// Subscription records, written by sign-in and payment flows
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn get_entitlement(&self, user_id: &str) -> Result<Option<Entitlement>, StoreError>;

    /// Create a free-tier record on first sign-in; existing records are kept.
    async fn ensure_user(&self, user_id: &str) -> Result<Entitlement, StoreError>;

    /// Mark the user as Pro. Upgrading twice keeps the first `pro_since`.
    async fn upgrade_to_pro(
        &self,
        user_id: &str,
        customer_id: &str,
        order_id: &str,
    ) -> Result<Entitlement, StoreError>;
}

#[async_trait]
pub trait StarStore: Send + Sync {
    async fn stars_by_user(&self, user_id: &str) -> Result<Vec<StarRecord>, StoreError>;
}

#[async_trait]
pub trait SnippetLookup: Send + Sync {
    /// `None` when the snippet no longer exists
    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>, StoreError>;
}

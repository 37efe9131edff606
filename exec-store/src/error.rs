/// Errors returned by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No caller identity was attached to a write.
    #[error("not authenticated")]
    Unauthenticated,

    /// The caller's entitlement does not cover the record's language.
    #[error("entitlement required for language: {language}")]
    EntitlementDenied { language: String },

    /// A record that violates the persisted-outcome invariant.
    #[error("invalid execution record: {0}")]
    InvalidRecord(String),

    /// Cursor that was not produced by this store.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A backend-specific failure (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

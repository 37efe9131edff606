use code_exec::{
    Authorization, CancellationToken, EntitlementGate, ExecutionOrchestrator, ExecutionOutcome,
};
use exec_store::{
    CallerIdentity, EntitlementStore, ExecutionId, ExecutionStore, NewExecution, StoreError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Entitlement required for language: {language}")]
    EntitlementDenied { language: String },
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Outcome of a submission plus the id it was stored under, if any
#[derive(Debug, Clone)]
pub struct RunReceipt {
    pub outcome: ExecutionOutcome,
    pub execution_id: Option<ExecutionId>,
}

/// Gate, run and persist one submission.
///
/// The gate runs before any network call. The store checks the entitlement a
/// second time on append.
pub struct RunPipeline {
    gate: EntitlementGate,
    orchestrator: ExecutionOrchestrator,
    executions: Arc<dyn ExecutionStore>,
    entitlements: Arc<dyn EntitlementStore>,
}

impl RunPipeline {
    pub fn new(
        gate: EntitlementGate,
        orchestrator: ExecutionOrchestrator,
        executions: Arc<dyn ExecutionStore>,
        entitlements: Arc<dyn EntitlementStore>,
    ) -> Self {
        Self {
            gate,
            orchestrator,
            executions,
            entitlements,
        }
    }

    pub async fn submit(
        &self,
        identity: Option<&CallerIdentity>,
        language: &str,
        code: &str,
    ) -> Result<RunReceipt, PipelineError> {
        self.submit_with_cancel(identity, language, code, &CancellationToken::new())
            .await
    }

    pub async fn submit_with_cancel(
        &self,
        identity: Option<&CallerIdentity>,
        language: &str,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<RunReceipt, PipelineError> {
        let identity = identity.ok_or(PipelineError::Unauthenticated)?;

        let entitlement = self.entitlements.get_entitlement(&identity.subject).await?;
        if let Authorization::Denied { reason } = self.gate.authorize(language, entitlement.as_ref())
        {
            info!(user_id = %identity.subject, language, reason, "Run denied");
            return Err(PipelineError::EntitlementDenied {
                language: language.to_string(),
            });
        }

        let outcome = self
            .orchestrator
            .run_with_cancel(language, code, cancel)
            .await;

        if !outcome.is_persistable() {
            debug!(user_id = %identity.subject, "Input error, nothing recorded");
            return Ok(RunReceipt {
                outcome,
                execution_id: None,
            });
        }

        let execution_id = self
            .executions
            .append(Some(identity), NewExecution::from_outcome(language, &outcome))
            .await?;

        Ok(RunReceipt {
            outcome,
            execution_id: Some(execution_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use code_exec::{
        Error, ExecutionStatus, LanguageTable, RuntimeClient, RuntimeRequest, RuntimeResponse,
        CANCELLED_ERROR,
    };
    use exec_store::InMemoryStore;

    /// Runtime that never answers
    struct StalledRuntime;

    #[async_trait]
    impl RuntimeClient for StalledRuntime {
        async fn execute(&self, _request: &RuntimeRequest) -> Result<RuntimeResponse, Error> {
            std::future::pending().await
        }
    }

    async fn pipeline() -> (RunPipeline, Arc<InMemoryStore>) {
        let gate = EntitlementGate::default();
        let store = Arc::new(InMemoryStore::new(gate));
        store.ensure_user("u1").await.unwrap();
        let orchestrator =
            ExecutionOrchestrator::new(Arc::new(StalledRuntime), LanguageTable::default());
        (
            RunPipeline::new(gate, orchestrator, store.clone(), store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn test_missing_identity_is_rejected() {
        let (pipeline, _store) = pipeline().await;
        let result = pipeline.submit(None, "javascript", "1").await;
        assert!(matches!(result, Err(PipelineError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_unknown_user_gets_free_tier_only() {
        let (pipeline, _store) = pipeline().await;
        let stranger = CallerIdentity::new("stranger");
        let result = pipeline.submit(Some(&stranger), "go", "package main").await;
        assert!(matches!(
            result,
            Err(PipelineError::EntitlementDenied { language }) if language == "go"
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run_is_recorded() {
        let (pipeline, store) = pipeline().await;
        let identity = CallerIdentity::new("u1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let receipt = pipeline
            .submit_with_cancel(Some(&identity), "javascript", "while(true){}", &cancel)
            .await
            .unwrap();

        assert_eq!(receipt.outcome.status, ExecutionStatus::Cancelled);
        assert!(receipt.execution_id.is_some());
        let records = store.all_by_user("u1").await.unwrap();
        assert_eq!(records[0].error.as_deref(), Some(CANCELLED_ERROR));
    }
}

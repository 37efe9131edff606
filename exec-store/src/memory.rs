use async_trait::async_trait;
use code_exec::{Authorization, Entitlement, EntitlementGate};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::page::{paginate, Page, PageRequest};
use crate::record::{
    CallerIdentity, ExecutionId, ExecutionRecord, NewExecution, Snippet, SnippetId, StarRecord,
};
use crate::traits::{EntitlementStore, ExecutionStore, SnippetLookup, StarStore};

#[derive(Default)]
struct State {
    next_execution_id: u64,
    next_snippet_id: u64,
    executions: HashMap<String, Vec<ExecutionRecord>>,
    entitlements: HashMap<String, Entitlement>,
    snippets: BTreeMap<SnippetId, Snippet>,
    stars: HashSet<StarRecord>,
}

/// Process-local backend for every store trait.
///
/// All state sits behind one `RwLock`, so a caller always observes its own
/// completed writes.
pub struct InMemoryStore {
    gate: EntitlementGate,
    clock: Arc<dyn Clock>,
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new(gate: EntitlementGate) -> Self {
        Self::with_clock(gate, Arc::new(SystemClock))
    }

    pub fn with_clock(gate: EntitlementGate, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate,
            clock,
            state: RwLock::new(State::default()),
        }
    }

    pub async fn create_snippet(
        &self,
        user_id: &str,
        title: &str,
        language: &str,
        code: &str,
    ) -> SnippetId {
        let mut state = self.state.write().await;
        state.next_snippet_id += 1;
        let id = SnippetId(state.next_snippet_id);
        state.snippets.insert(
            id,
            Snippet {
                id,
                user_id: user_id.to_string(),
                title: title.to_string(),
                language: language.to_string(),
                code: code.to_string(),
            },
        );
        id
    }

    /// Remove a snippet together with its stars
    pub async fn delete_snippet(&self, id: SnippetId) -> bool {
        let mut state = self.state.write().await;
        state.stars.retain(|star| star.snippet_id != id);
        state.snippets.remove(&id).is_some()
    }

    /// Star the snippet if not starred yet, otherwise unstar it.
    /// Returns whether the snippet is starred afterwards.
    pub async fn toggle_star(&self, user_id: &str, snippet_id: SnippetId) -> bool {
        let star = StarRecord {
            user_id: user_id.to_string(),
            snippet_id,
        };
        let mut state = self.state.write().await;
        if state.stars.remove(&star) {
            false
        } else {
            state.stars.insert(star);
            true
        }
    }
}

#[async_trait]
impl ExecutionStore for InMemoryStore {
    async fn append(
        &self,
        identity: Option<&CallerIdentity>,
        execution: NewExecution,
    ) -> Result<ExecutionId, StoreError> {
        let identity = identity.ok_or(StoreError::Unauthenticated)?;

        if execution.output.is_none() && execution.error.is_none() {
            return Err(StoreError::InvalidRecord(
                "either output or error must be set".to_string(),
            ));
        }
        if execution.error.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(StoreError::InvalidRecord(
                "error text must not be blank".to_string(),
            ));
        }

        let mut state = self.state.write().await;

        let entitlement = state.entitlements.get(&identity.subject);
        if let Authorization::Denied { reason } =
            self.gate.authorize(&execution.language, entitlement)
        {
            warn!(
                user_id = %identity.subject,
                language = %execution.language,
                reason,
                "Rejected execution record"
            );
            return Err(StoreError::EntitlementDenied {
                language: execution.language,
            });
        }

        state.next_execution_id += 1;
        let id = ExecutionId(state.next_execution_id);
        let record = ExecutionRecord {
            id,
            user_id: identity.subject.clone(),
            language: execution.language,
            code: execution.code,
            output: execution.output,
            error: execution.error,
            created_at: self.clock.now(),
        };

        debug!(%id, user_id = %record.user_id, language = %record.language, "Appended execution");
        state
            .executions
            .entry(identity.subject.clone())
            .or_default()
            .push(record);

        Ok(id)
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<ExecutionRecord>, StoreError> {
        let records = self.all_by_user(user_id).await?;
        Ok(paginate(records, &page))
    }

    async fn all_by_user(&self, user_id: &str) -> Result<Vec<ExecutionRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records = state.executions.get(user_id).cloned().unwrap_or_default();
        records.sort_by_key(|record| std::cmp::Reverse(record.sort_key()));
        Ok(records)
    }
}

#[async_trait]
impl EntitlementStore for InMemoryStore {
    async fn get_entitlement(&self, user_id: &str) -> Result<Option<Entitlement>, StoreError> {
        Ok(self.state.read().await.entitlements.get(user_id).cloned())
    }

    async fn ensure_user(&self, user_id: &str) -> Result<Entitlement, StoreError> {
        let mut state = self.state.write().await;
        let entitlement = state
            .entitlements
            .entry(user_id.to_string())
            .or_insert_with(|| {
                info!(user_id, "Created free-tier entitlement");
                Entitlement::free(user_id)
            });
        Ok(entitlement.clone())
    }

    async fn upgrade_to_pro(
        &self,
        user_id: &str,
        customer_id: &str,
        order_id: &str,
    ) -> Result<Entitlement, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let entitlement = state
            .entitlements
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;

        if !entitlement.is_pro {
            entitlement.is_pro = true;
            entitlement.pro_since = Some(now);
            entitlement.customer_id = Some(customer_id.to_string());
            entitlement.order_id = Some(order_id.to_string());
            info!(user_id, "Upgraded to pro");
        }
        Ok(entitlement.clone())
    }
}

#[async_trait]
impl StarStore for InMemoryStore {
    async fn stars_by_user(&self, user_id: &str) -> Result<Vec<StarRecord>, StoreError> {
        let state = self.state.read().await;
        let mut stars: Vec<StarRecord> = state
            .stars
            .iter()
            .filter(|star| star.user_id == user_id)
            .cloned()
            .collect();
        stars.sort_by_key(|star| star.snippet_id);
        Ok(stars)
    }
}

#[async_trait]
impl SnippetLookup for InMemoryStore {
    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>, StoreError> {
        Ok(self.state.read().await.snippets.get(&id).cloned())
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::Stream;
use serde_json::Value;
use tokio::sync::broadcast;

use super::locks::IdLocks;
use super::{NewPrompt, Prompt, PromptId, PromptUpdate, PROMPTS_PATH, prompt_path};
use crate::changes::{self, ChangeType, PromptChange};
use crate::error::{Operation, StoreError};
use crate::transport::{Method, Transport, TransportError};

const CHANGES_CAPACITY: usize = 64;

/// Read-only view of the store's status fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    /// True while at least one `list()` call is in flight.
    pub loading: bool,
    /// Failure message of the last attempted operation, if it failed.
    pub error: Option<String>,
}

#[derive(Default)]
struct State {
    prompts: Vec<Prompt>,
    lists_in_flight: usize,
    error: Option<String>,
}

/// Client-side mirror of the remote prompt collection.
///
/// Every operation makes exactly one transport call and only touches local
/// state after that call succeeds. The state lock is never held across an
/// await, so readers always see a reconciled collection.
pub struct PromptStore {
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
    id_locks: IdLocks,
    changes_tx: broadcast::Sender<PromptChange>,
}

impl PromptStore {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (changes_tx, _) = broadcast::channel(CHANGES_CAPACITY);
        Self {
            transport,
            state: Mutex::new(State::default()),
            id_locks: IdLocks::new(),
            changes_tx,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Reads ───────────────────────────────────────────────────

    /// Snapshot of the collection in server order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.state().prompts.clone()
    }

    pub fn get(&self, id: PromptId) -> Option<Prompt> {
        self.state().prompts.iter().find(|p| p.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().prompts.is_empty()
    }

    pub fn status(&self) -> Status {
        let state = self.state();
        Status {
            loading: state.lists_in_flight > 0,
            error: state.error.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state().lists_in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PromptChange> {
        self.changes_tx.subscribe()
    }

    /// Change events as a stream, starting from now.
    pub fn changes(&self) -> impl Stream<Item = PromptChange> + use<> {
        changes::into_stream(self.changes_tx.subscribe())
    }

    // ── Operations ──────────────────────────────────────────────

    /// Replace the collection with the server's list.
    ///
    /// Failures are recorded in `error` and otherwise swallowed.
    pub async fn list(&self) {
        let _loading = self.begin_list();

        let result = self
            .transport
            .request(Method::Get, PROMPTS_PATH, None)
            .await
            .and_then(|body| Ok(serde_json::from_value::<Vec<Prompt>>(body)?));

        match result {
            Ok(prompts) => {
                let count = prompts.len();
                self.state().prompts = prompts;
                tracing::info!(count, "Loaded prompts");
                self.notify(ChangeType::Reloaded, None);
            }
            Err(e) => {
                self.fail(StoreError::new(Operation::List, e));
            }
        }
    }

    /// Create a prompt and append the server's copy to the collection, or
    /// replace the entry in place if a concurrent list already brought it in.
    pub async fn create(&self, data: NewPrompt) -> Result<Prompt, StoreError> {
        self.clear_error();

        let body = serde_json::to_value(&data)
            .map_err(|e| self.fail(StoreError::new(Operation::Create, e)))?;
        let prompt = self
            .call(Operation::Create, Method::Post, PROMPTS_PATH, Some(body))
            .await?;

        {
            // A list reconciled while the POST was in flight may already hold this id.
            let mut state = self.state();
            match state.prompts.iter_mut().find(|p| p.id == prompt.id) {
                Some(slot) => *slot = prompt.clone(),
                None => state.prompts.push(prompt.clone()),
            }
        }
        tracing::info!(prompt_id = prompt.id, key = %prompt.key, "Created prompt");
        self.notify(ChangeType::Created, Some(prompt.id));
        Ok(prompt)
    }

    /// Send a partial update and swap the server's copy in place.
    ///
    /// If `id` is no longer in the local collection the response is dropped
    /// without inserting anything; the server's copy is still returned.
    pub async fn update(&self, id: PromptId, updates: PromptUpdate) -> Result<Prompt, StoreError> {
        let _guard = self.id_locks.acquire(id).await;
        self.clear_error();

        let body = serde_json::to_value(&updates)
            .map_err(|e| self.fail(StoreError::new(Operation::Update, e)))?;
        let prompt = self
            .call(Operation::Update, Method::Put, &prompt_path(id), Some(body))
            .await?;

        let replaced = {
            let mut state = self.state();
            match state.prompts.iter_mut().find(|p| p.id == id) {
                Some(slot) => {
                    *slot = prompt.clone();
                    true
                }
                None => false,
            }
        };

        if replaced {
            tracing::info!(prompt_id = id, "Updated prompt");
            self.notify(ChangeType::Updated, Some(id));
        } else {
            tracing::debug!(prompt_id = id, "Updated prompt not in local collection, response discarded");
        }
        Ok(prompt)
    }

    /// Delete on the server, then drop every local entry with that id.
    pub async fn delete(&self, id: PromptId) -> Result<(), StoreError> {
        let _guard = self.id_locks.acquire(id).await;
        self.clear_error();

        self.transport
            .request(Method::Delete, &prompt_path(id), None)
            .await
            .map_err(|e| self.fail(StoreError::new(Operation::Delete, e)))?;

        let removed = {
            let mut state = self.state();
            let before = state.prompts.len();
            state.prompts.retain(|p| p.id != id);
            before - state.prompts.len()
        };

        tracing::info!(prompt_id = id, removed, "Deleted prompt");
        if removed > 0 {
            self.notify(ChangeType::Deleted, Some(id));
        }
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────

    async fn call(
        &self,
        operation: Operation,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Prompt, StoreError> {
        self.transport
            .request(method, path, body)
            .await
            .and_then(|value| Ok(serde_json::from_value::<Prompt>(value)?))
            .map_err(|e: TransportError| self.fail(StoreError::new(operation, e)))
    }

    fn begin_list(&self) -> LoadingGuard<'_> {
        let mut state = self.state();
        state.lists_in_flight += 1;
        state.error = None;
        LoadingGuard { store: self }
    }

    fn clear_error(&self) {
        self.state().error = None;
    }

    /// Record the generic message, log the cause, hand the error back.
    fn fail(&self, err: StoreError) -> StoreError {
        tracing::error!(operation = %err.operation, error = %err.source, "{err}");
        self.state().error = Some(err.to_string());
        err
    }

    fn notify(&self, change_type: ChangeType, prompt_id: Option<PromptId>) {
        // No subscribers is fine.
        let _ = self.changes_tx.send(PromptChange::new(change_type, prompt_id));
    }
}

/// Clears this call's share of `loading` on every exit path, including the
/// list future being dropped mid-flight.
struct LoadingGuard<'a> {
    store: &'a PromptStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.store.state();
        state.lists_in_flight = state.lists_in_flight.saturating_sub(1);
    }
}

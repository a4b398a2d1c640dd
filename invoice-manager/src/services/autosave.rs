//! Debounced background saving of documents that are being edited.
//!
//! Each open document gets one session task. Edits reset a single-shot
//! timer; when it expires the latest draft is written with a bounded number
//! of retries. The outcome is published as a [`SaveStatus`] that callers can
//! poll without blocking.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use service_core::error::AppError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;
use validator::Validate;

use super::documents::{DocumentService, PendingSave, SavedDocument};
use super::metrics::record_autosave;
use crate::models::DocumentDraft;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct AutoSaveConfig {
    pub debounce: Duration,
    pub max_attempts: u32,
    /// First retry delay; later ones grow exponentially.
    pub retry_interval: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2000),
            max_attempts: 3,
            retry_interval: Duration::from_millis(250),
        }
    }
}

/// Result of the most recent auto-save of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Pending,
    Saving,
    Saved {
        saved_at: DateTime<Utc>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
        attempts: u32,
        failed_at: DateTime<Utc>,
    },
}

enum SessionCommand {
    Edit(Box<DocumentDraft>),
    CancelPending(oneshot::Sender<()>),
}

struct EditSession {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SaveStatus>,
}

#[derive(Clone)]
pub struct AutoSaveScheduler {
    documents: DocumentService,
    sessions: Arc<DashMap<Uuid, EditSession>>,
    config: AutoSaveConfig,
}

impl AutoSaveScheduler {
    pub fn new(documents: DocumentService, config: AutoSaveConfig) -> Self {
        Self {
            documents,
            sessions: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Record a change to a persisted document and (re)arm its timer.
    ///
    /// Drafts that could never be saved are rejected up front; a missing
    /// client name is accepted here and skipped when the timer fires.
    pub async fn track(&self, id: Uuid, draft: DocumentDraft) -> Result<SaveStatus, AppError> {
        let mut draft = draft.normalized();
        draft.id = Some(id);

        if let Err(errors) = draft.validate() {
            if errors.errors().keys().any(|field| **field != *"client") {
                return Err(AppError::ValidationError(errors));
            }
        }

        let commands = self
            .sessions
            .entry(id)
            .or_insert_with(|| self.open(id))
            .commands
            .clone();

        if commands
            .send(SessionCommand::Edit(Box::new(draft)))
            .await
            .is_err()
        {
            self.sessions.remove(&id);
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Auto-save session for {} is closed",
                id
            )));
        }

        Ok(SaveStatus::Pending)
    }

    /// Status of the document's session, if one is open.
    pub fn status(&self, id: Uuid) -> Option<SaveStatus> {
        self.sessions
            .get(&id)
            .map(|session| session.status.borrow().clone())
    }

    /// Drop the pending auto-save, waiting for an in-flight one to finish.
    pub async fn cancel_pending(&self, id: Uuid) {
        let commands = match self.sessions.get(&id) {
            Some(session) => session.commands.clone(),
            None => return,
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if commands
            .send(SessionCommand::CancelPending(ack_tx))
            .await
            .is_ok()
        {
            let _ = ack_rx.await;
        }
    }

    /// End the session; an unexpired timer is discarded without saving.
    pub fn close(&self, id: Uuid) -> bool {
        // Dropping the sender ends the session task.
        self.sessions.remove(&id).is_some()
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn open(&self, id: Uuid) -> EditSession {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);

        let task = SessionTask {
            id,
            documents: self.documents.clone(),
            config: self.config,
            commands: commands_rx,
            status: status_tx,
        };
        tokio::spawn(
            task.run()
                .instrument(tracing::info_span!("autosave_session", document_id = %id)),
        );
        debug!(document_id = %id, "Auto-save session opened");

        EditSession {
            commands: commands_tx,
            status: status_rx,
        }
    }
}

struct SessionTask {
    id: Uuid,
    documents: DocumentService,
    config: AutoSaveConfig,
    commands: mpsc::Receiver<SessionCommand>,
    status: watch::Sender<SaveStatus>,
}

impl SessionTask {
    async fn run(mut self) {
        let mut pending: Option<DocumentDraft> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Edit(draft)) => {
                        pending = Some(*draft);
                        deadline = Some(Instant::now() + self.config.debounce);
                        self.status.send_replace(SaveStatus::Pending);
                    }
                    Some(SessionCommand::CancelPending(ack)) => {
                        if pending.take().is_some() {
                            deadline = None;
                            self.status.send_replace(SaveStatus::Idle);
                            debug!("Pending auto-save cancelled");
                        }
                        let _ = ack.send(());
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    if let Some(draft) = pending.take() {
                        self.save(draft).await;
                    }
                }
            }
        }

        if pending.is_some() {
            debug!("Session closed with an unsaved edit");
        }
    }

    async fn save(&self, draft: DocumentDraft) {
        let draft = draft.normalized();
        if let Err(errors) = draft.validate() {
            let reason = if draft.client.name.is_empty() {
                "Client name is required".to_string()
            } else {
                errors.to_string()
            };
            record_autosave("skipped");
            debug!(reason = %reason, "Auto-save skipped");
            self.status.send_replace(SaveStatus::Skipped { reason });
            return;
        }

        self.status.send_replace(SaveStatus::Saving);
        let save = PendingSave::from_draft(self.id, &draft);

        let (result, attempts) = self.persist_with_retry(&save).await;

        match result {
            Ok(saved) => {
                record_autosave("saved");
                info!(
                    attempts,
                    total = %saved.document.total,
                    "Document auto-saved"
                );
                self.status.send_replace(SaveStatus::Saved {
                    saved_at: saved.document.updated_utc,
                });
            }
            Err(e) => {
                record_autosave("failed");
                error!(attempts, error = %e, "Auto-save failed");
                self.status.send_replace(SaveStatus::Failed {
                    error: e.to_string(),
                    attempts,
                    failed_at: Utc::now(),
                });
            }
        }
    }

    async fn persist_with_retry(
        &self,
        save: &PendingSave,
    ) -> (Result<SavedDocument, AppError>, u32) {
        let policy = ExponentialBackoff {
            current_interval: self.config.retry_interval,
            initial_interval: self.config.retry_interval,
            max_interval: self.config.retry_interval * 8,
            // Bounded by attempts, not wall time.
            max_elapsed_time: None,
            ..Default::default()
        };

        let attempts = AtomicU32::new(0);
        let max_attempts = self.config.max_attempts.max(1);
        let documents = &self.documents;
        let counter = &attempts;

        let result = backoff::future::retry(policy, || async move {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            documents.persist(save).await.map_err(|e| match e {
                AppError::NotFound(_) => backoff::Error::permanent(e),
                _ if attempt >= max_attempts => backoff::Error::permanent(e),
                _ => {
                    record_autosave("retried");
                    warn!(attempt, error = %e, "Auto-save attempt failed, retrying");
                    backoff::Error::transient(e)
                }
            })
        })
        .await;

        (result, attempts.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Client, CompanySettings, Document, DocumentFields, DocumentKind, LineItem,
        LineItemInput, NewClient, NewLineItem, SettingsUpdate,
    };
    use crate::services::{MemoryStore, Store};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    /// Memory store that counts document updates and can fail the first few.
    struct CountingStore {
        inner: MemoryStore,
        updates: AtomicU32,
        failures_left: AtomicU32,
    }

    impl CountingStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                updates: AtomicU32::new(0),
                failures_left: AtomicU32::new(failures),
            }
        }

        fn updates(&self) -> u32 {
            self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Store for CountingStore {
        async fn health_check(&self) -> Result<(), AppError> {
            self.inner.health_check().await
        }
        async fn get_or_create_settings(&self) -> Result<CompanySettings, AppError> {
            self.inner.get_or_create_settings().await
        }
        async fn update_settings(&self, u: &SettingsUpdate) -> Result<CompanySettings, AppError> {
            self.inner.update_settings(u).await
        }
        async fn set_logo_url(&self, url: Option<&str>) -> Result<CompanySettings, AppError> {
            self.inner.set_logo_url(url).await
        }
        async fn set_custom_units(&self, units: &[String]) -> Result<CompanySettings, AppError> {
            self.inner.set_custom_units(units).await
        }
        async fn increment_counter(&self, kind: DocumentKind) -> Result<u32, AppError> {
            self.inner.increment_counter(kind).await
        }
        async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
            self.inner.list_clients().await
        }
        async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
            self.inner.get_client(id).await
        }
        async fn insert_client(&self, input: &NewClient) -> Result<Client, AppError> {
            self.inner.insert_client(input).await
        }
        async fn delete_client(&self, id: Uuid) -> Result<bool, AppError> {
            self.inner.delete_client(id).await
        }
        async fn list_documents(&self) -> Result<Vec<Document>, AppError> {
            self.inner.list_documents().await
        }
        async fn get_document(&self, id: Uuid) -> Result<Option<Document>, AppError> {
            self.inner.get_document(id).await
        }
        async fn insert_document(&self, f: &DocumentFields) -> Result<Document, AppError> {
            self.inner.insert_document(f).await
        }
        async fn update_document(
            &self,
            id: Uuid,
            f: &DocumentFields,
        ) -> Result<Option<Document>, AppError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(AppError::DatabaseError(anyhow::anyhow!("connection reset")));
            }
            self.inner.update_document(id, f).await
        }
        async fn delete_document(&self, id: Uuid) -> Result<bool, AppError> {
            self.inner.delete_document(id).await
        }
        async fn get_line_items(&self, id: Uuid) -> Result<Vec<LineItem>, AppError> {
            self.inner.get_line_items(id).await
        }
        async fn replace_line_items(
            &self,
            id: Uuid,
            items: &[NewLineItem],
        ) -> Result<Vec<LineItem>, AppError> {
            self.inner.replace_line_items(id, items).await
        }
        async fn delete_line_items(&self, id: Uuid) -> Result<u64, AppError> {
            self.inner.delete_line_items(id).await
        }
    }

    struct Fixture {
        store: Arc<CountingStore>,
        scheduler: AutoSaveScheduler,
        id: Uuid,
        draft: DocumentDraft,
    }

    async fn fixture(failures: u32) -> Fixture {
        let store = Arc::new(CountingStore::new(failures));
        let documents = DocumentService::new(store.clone());
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let mut draft = documents
            .new_draft(DocumentKind::Invoice, today)
            .await
            .unwrap();
        draft.client.name = "Acme".to_string();
        let saved = documents.create(draft, today).await.unwrap();
        let id = saved.document.id;
        let draft = documents.load_draft(id).await.unwrap();

        let scheduler = AutoSaveScheduler::new(
            documents,
            AutoSaveConfig {
                debounce: Duration::from_secs(2),
                max_attempts: 3,
                retry_interval: Duration::from_millis(100),
            },
        );

        Fixture {
            store,
            scheduler,
            id,
            draft,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_produce_one_write_with_final_state() {
        let f = fixture(0).await;

        for i in 0..5 {
            let mut draft = f.draft.clone();
            draft.notes = Some(format!("edit {}", i));
            draft.line_items = vec![LineItemInput {
                description: "Hours".to_string(),
                quantity: Decimal::from(i + 1),
                rate: Decimal::from(10),
                ..LineItemInput::default()
            }];
            f.scheduler.track(f.id, draft).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        assert_eq!(f.store.updates(), 0);
        assert_eq!(f.scheduler.status(f.id), Some(SaveStatus::Pending));

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(f.store.updates(), 1);
        let saved = f.store.get_document(f.id).await.unwrap().unwrap();
        assert_eq!(saved.notes.as_deref(), Some("edit 4"));
        assert_eq!(saved.subtotal, Decimal::from(50));
        assert!(matches!(
            f.scheduler.status(f.id),
            Some(SaveStatus::Saved { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_client_name_is_skipped() {
        let f = fixture(0).await;
        let mut draft = f.draft.clone();
        draft.client.name = String::new();

        f.scheduler.track(f.id, draft).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(f.store.updates(), 0);
        assert!(matches!(
            f.scheduler.status(f.id),
            Some(SaveStatus::Skipped { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn drafts_without_lines_or_with_bad_tax_are_rejected() {
        let f = fixture(0).await;

        let mut no_lines = f.draft.clone();
        no_lines.line_items.clear();
        let mut bad_tax = f.draft.clone();
        bad_tax.tax_rate = Decimal::from(500);

        for draft in [no_lines, bad_tax] {
            assert!(matches!(
                f.scheduler.track(f.id, draft).await,
                Err(AppError::ValidationError(_))
            ));
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(f.store.updates(), 0);
        assert_eq!(f.scheduler.status(f.id), None);
        let stored = f.store.get_document(f.id).await.unwrap().unwrap();
        assert_eq!(stored.tax_rate, Decimal::TEN);
        assert_eq!(f.store.get_line_items(f.id).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_client_name_with_bad_lines_is_still_rejected() {
        let f = fixture(0).await;
        let mut draft = f.draft.clone();
        draft.client.name = "  ".to_string();
        draft.line_items.clear();

        assert!(f.scheduler.track(f.id, draft).await.is_err());
        assert_eq!(f.scheduler.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let f = fixture(2).await;

        f.scheduler.track(f.id, f.draft.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(f.store.updates(), 3);
        assert!(matches!(
            f.scheduler.status(f.id),
            Some(SaveStatus::Saved { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_is_reported_after_max_attempts() {
        let f = fixture(10).await;

        f.scheduler.track(f.id, f.draft.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(f.store.updates(), 3);
        match f.scheduler.status(f.id) {
            Some(SaveStatus::Failed { attempts, error, .. }) => {
                assert_eq!(attempts, 3);
                assert!(error.contains("connection reset"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closing_discards_the_pending_save() {
        let f = fixture(0).await;

        f.scheduler.track(f.id, f.draft.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(f.scheduler.close(f.id));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(f.store.updates(), 0);
        assert_eq!(f.scheduler.status(f.id), None);
        assert_eq!(f.scheduler.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_stops_the_timer() {
        let f = fixture(0).await;

        f.scheduler.track(f.id, f.draft.clone()).await.unwrap();
        f.scheduler.cancel_pending(f.id).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(f.store.updates(), 0);
        assert_eq!(f.scheduler.status(f.id), Some(SaveStatus::Idle));
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::crypto::PayloadCipher;
use crate::intake::service::ApplicationIntakeService;
use crate::notify::{NotificationError, NotificationPayload, Notifier};
use crate::storage::{Collection, MemoryStore, StoreError, TemporaryStore};

pub(super) fn submission() -> Value {
    json!({
        "personalInfo": {
            "firstName": "Amina",
            "lastName": "Odhiambo",
            "email": "amina@example.org",
            "phone": "+254 712 345 678"
        },
        "loanDetails": { "amount": 2500, "purpose": "Inventory restock", "termMonths": 12, "currency": "KES" },
        "businessInfo": { "businessName": "Amina Textiles", "businessType": "retail" },
        "documents": [
            {
                "documentType": "national_id",
                "fileUrl": "/uploads/national_id_1700000000000_abc123xyz.pdf",
                "fileName": "id.pdf",
                "fileType": "application/pdf"
            }
        ],
        "locale": "en"
    })
}

pub(super) fn missing_email_submission() -> Value {
    let mut submission = submission();
    submission["personalInfo"]
        .as_object_mut()
        .expect("personal info object")
        .remove("email");
    submission
}

pub(super) fn cipher() -> Arc<PayloadCipher> {
    Arc::new(PayloadCipher::from_secret("intake-test-secret").expect("secret accepted"))
}

/// Memory store that counts calls per collection and can be told to fail writes.
#[derive(Default)]
pub(super) struct CountingStore {
    inner: MemoryStore,
    puts: Mutex<HashMap<Collection, usize>>,
    gets: AtomicUsize,
    deletes: AtomicUsize,
    failing_puts: Mutex<Vec<Collection>>,
}

impl CountingStore {
    pub(super) fn failing_on(collections: &[Collection]) -> Self {
        let store = Self::default();
        store
            .failing_puts
            .lock()
            .expect("store mutex poisoned")
            .extend_from_slice(collections);
        store
    }

    pub(super) fn puts(&self, collection: Collection) -> usize {
        self.puts
            .lock()
            .expect("store mutex poisoned")
            .get(&collection)
            .copied()
            .unwrap_or(0)
    }

    pub(super) fn total_calls(&self) -> usize {
        let puts: usize = self.puts.lock().expect("store mutex poisoned").values().sum();
        puts + self.gets.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }

    pub(super) fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub(super) fn memory(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl TemporaryStore for CountingStore {
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let failing = {
            *self
                .puts
                .lock()
                .expect("store mutex poisoned")
                .entry(collection)
                .or_default() += 1;
            self.failing_puts
                .lock()
                .expect("store mutex poisoned")
                .contains(&collection)
        };
        if failing {
            return Err(StoreError::Unavailable("cache offline".to_string()));
        }
        self.inner.put(collection, id, value, ttl).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(collection, id).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(collection, id).await
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    admin: Mutex<Vec<NotificationPayload>>,
    confirmations: Mutex<Vec<NotificationPayload>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(super) fn admin_calls(&self) -> Vec<NotificationPayload> {
        self.admin.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn confirmation_calls(&self) -> Vec<NotificationPayload> {
        self.confirmations
            .lock()
            .expect("notifier mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn admin_notification(
        &self,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        self.admin
            .lock()
            .expect("notifier mutex poisoned")
            .push(payload.clone());
        if self.fail {
            return Err(NotificationError::Rejected {
                endpoint: "/api/email/admin-notification".to_string(),
                status: 500,
            });
        }
        Ok(())
    }

    async fn application_confirmation(
        &self,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        self.confirmations
            .lock()
            .expect("notifier mutex poisoned")
            .push(payload.clone());
        if self.fail {
            return Err(NotificationError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

pub(super) type TestService = ApplicationIntakeService<CountingStore, RecordingNotifier>;

pub(super) fn build_service() -> (TestService, Arc<CountingStore>, Arc<RecordingNotifier>) {
    build_service_with(CountingStore::default(), RecordingNotifier::default())
}

pub(super) fn build_service_with(
    store: CountingStore,
    notifier: RecordingNotifier,
) -> (TestService, Arc<CountingStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let service = ApplicationIntakeService::new(store.clone(), notifier.clone(), cipher());
    (service, store, notifier)
}

pub(super) fn is_generated_id(prefix: &str, id: &str) -> bool {
    let parts: Vec<&str> = id.split('_').collect();
    parts.len() == 3
        && parts[0] == prefix
        && !parts[1].is_empty()
        && parts[1].bytes().all(|b| b.is_ascii_digit())
        && !parts[2].is_empty()
        && parts[2].bytes().all(|b| b.is_ascii_alphanumeric())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

//! Test doubles for the application ports

use crate::ports::form::{
    FieldClassifier, FieldError, FieldExtractor, FieldSource, Filler, PrefilledChecker,
};
use crate::ports::metrics_recorder::{MetricsError, MetricsRecorder};
use crate::ports::provider::{ProviderClient, ProviderError, ProviderFactory, ProviderInitError};
use crate::ports::settings_store::{SettingsError, SettingsStore};
use async_trait::async_trait;
use docfiller_domain::{
    AnswerPayload, FieldHandle, FieldType, FieldValue, Prompt, ProviderId, RawAnswer, RunMetrics,
};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

// ==================== Settings ====================

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn insert(&self, key: &str, value: Value) {
        self.values.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SettingsError::Io(std::io::Error::other("read-only store")));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SettingsError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

// ==================== Providers ====================

type Responder = Box<dyn Fn(&Prompt, FieldType) -> Option<Result<Value, ProviderError>> + Send + Sync>;

/// Scripted provider; a responder returning `None` never answers
pub struct MockProvider {
    id: ProviderId,
    responder: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockProvider {
    pub fn with_fn(
        id: &str,
        responder: impl Fn(&Prompt, FieldType) -> Option<Result<Value, ProviderError>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.parse().unwrap(),
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answer(id: &str, value: Value) -> Self {
        Self::with_fn(id, move |_, _| Some(Ok(value.clone())))
    }

    pub fn text(id: &str, text: &str) -> Self {
        Self::answer(id, json!(text))
    }

    pub fn failing(id: &str) -> Self {
        Self::with_fn(id, |_, _| {
            Some(Err(ProviderError::RequestFailed("boom".to_string())))
        })
    }

    pub fn hanging(id: &str) -> Self {
        Self::with_fn(id, |_, _| None)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn provider(&self) -> &ProviderId {
        &self.id
    }

    async fn invoke(
        &self,
        prompt: &Prompt,
        field_type: FieldType,
    ) -> Result<RawAnswer, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match (self.responder)(prompt, field_type) {
            Some(result) => result.map(RawAnswer::new),
            None => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct MockFactory {
    providers: HashMap<ProviderId, Arc<MockProvider>>,
    broken: HashSet<ProviderId>,
    created: AtomicUsize,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, provider: MockProvider) -> Self {
        self.with_shared(Arc::new(provider))
    }

    pub fn with_shared(mut self, provider: Arc<MockProvider>) -> Self {
        self.providers.insert(provider.id.clone(), provider);
        self
    }

    /// Provider whose configuration check fails
    pub fn broken(mut self, id: &str) -> Self {
        self.broken.insert(id.parse().unwrap());
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for MockFactory {
    fn create(&self, provider: &ProviderId) -> Result<Arc<dyn ProviderClient>, ProviderInitError> {
        if self.broken.contains(provider) {
            return Err(ProviderInitError::MissingApiKey {
                provider: provider.clone(),
                env_var: "TEST_API_KEY".to_string(),
            });
        }
        match self.providers.get(provider) {
            Some(client) => {
                self.created.fetch_add(1, Ordering::SeqCst);
                Ok(client.clone())
            }
            None => Err(ProviderInitError::Construction {
                provider: provider.clone(),
                message: "unknown provider".to_string(),
            }),
        }
    }
}

// ==================== Metrics ====================

#[derive(Default)]
pub struct MemoryMetrics {
    pub records: Mutex<Vec<RunMetrics>>,
    pub fail: bool,
}

impl MemoryMetrics {
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn recorded(&self) -> Vec<RunMetrics> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsRecorder for MemoryMetrics {
    async fn record(&self, metrics: &RunMetrics) -> Result<(), MetricsError> {
        if self.fail {
            return Err(MetricsError::Io(std::io::Error::other("disk full")));
        }
        self.records.lock().unwrap().push(metrics.clone());
        Ok(())
    }
}

// ==================== Form ====================

pub struct ScriptedField {
    pub field_type: Option<FieldType>,
    pub value: FieldValue,
    pub prefilled: bool,
    pub extract_fails: bool,
}

impl ScriptedField {
    pub fn text(id: &str, title: &str) -> Self {
        Self {
            field_type: Some(FieldType::Text),
            value: FieldValue::new(FieldHandle::new(id), title),
            prefilled: false,
            extract_fails: false,
        }
    }

    pub fn of_type(field_type: FieldType, value: FieldValue) -> Self {
        Self {
            field_type: Some(field_type),
            value,
            prefilled: false,
            extract_fails: false,
        }
    }

    pub fn unclassifiable(mut self) -> Self {
        self.field_type = None;
        self
    }

    pub fn prefilled(mut self) -> Self {
        self.prefilled = true;
        self
    }

    pub fn broken(mut self) -> Self {
        self.extract_fails = true;
        self
    }
}

#[derive(Default)]
pub struct ScriptedForm {
    pub fields: Vec<ScriptedField>,
    pub source_fails: bool,
    pub refuse_fill: bool,
    pub source_calls: AtomicUsize,
    pub filled: Mutex<Vec<(String, AnswerPayload)>>,
    pub marked: Mutex<Vec<String>>,
}

impl ScriptedForm {
    pub fn new(fields: Vec<ScriptedField>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    fn field(&self, handle: &FieldHandle) -> Option<&ScriptedField> {
        self.fields.iter().find(|f| &f.value.handle == handle)
    }

    pub fn filled(&self) -> Vec<(String, AnswerPayload)> {
        self.filled.lock().unwrap().clone()
    }

    pub fn marked(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldSource for ScriptedForm {
    async fn extract_fields(&self) -> Result<Vec<FieldHandle>, FieldError> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        if self.source_fails {
            return Err(FieldError::Other("page gone".to_string()));
        }
        Ok(self.fields.iter().map(|f| f.value.handle.clone()).collect())
    }
}

#[async_trait]
impl FieldClassifier for ScriptedForm {
    async fn classify(&self, handle: &FieldHandle) -> Option<FieldType> {
        self.field(handle).and_then(|f| f.field_type)
    }
}

#[async_trait]
impl FieldExtractor for ScriptedForm {
    async fn extract(
        &self,
        handle: &FieldHandle,
        _field_type: FieldType,
    ) -> Result<FieldValue, FieldError> {
        match self.field(handle) {
            Some(f) if f.extract_fails => Err(FieldError::Extraction {
                handle: handle.to_string(),
                message: "detached node".to_string(),
            }),
            Some(f) => Ok(f.value.clone()),
            None => Err(FieldError::NotFound(handle.to_string())),
        }
    }
}

#[async_trait]
impl PrefilledChecker for ScriptedForm {
    async fn is_already_answered(&self, _field_type: FieldType, field: &FieldValue) -> bool {
        self.field(&field.handle).is_some_and(|f| f.prefilled)
    }
}

#[async_trait]
impl Filler for ScriptedForm {
    async fn fill(
        &self,
        _field_type: FieldType,
        field: &FieldValue,
        answer: &AnswerPayload,
    ) -> Result<bool, FieldError> {
        if self.refuse_fill {
            return Ok(false);
        }
        self.filled
            .lock()
            .unwrap()
            .push((field.handle.to_string(), answer.clone()));
        Ok(true)
    }

    async fn mark_skipped(&self, field: &FieldValue) {
        self.marked.lock().unwrap().push(field.handle.to_string());
    }
}

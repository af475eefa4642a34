//! Fill form use case
//!
//! Drives one form-filling run:
//!
//! ```text
//! Idle -> Initializing -> ProfileResolution -> PerQuestionLoop -> Finalizing -> Idle
//! ```
//!
//! Fields are processed strictly one after another. A failure while handling
//! one field is logged and the run moves on; only a configuration problem
//! stops a run before any field is touched.

use crate::config::FillOptions;
use crate::engine::{ConsensusEngine, ConsensusError, EngineContext};
use crate::ports::form::{
    FieldClassifier, FieldError, FieldExtractor, FieldSource, Filler, PrefilledChecker,
    PromptBuilder, TemplatePromptBuilder,
};
use crate::ports::metrics_recorder::MetricsRecorder;
use crate::ports::progress::{NoProgress, PipelineProgress, SkipReason};
use crate::ports::provider::{ProviderClient, ProviderInitError};
use crate::use_cases::magic_prompt::GenerateMagicPromptUseCase;
use docfiller_domain::util::preview;
use docfiller_domain::{
    AnswerPayload, AnswerValidator, FieldHandle, FieldType, FieldValue, Prompt, ProfileCatalog,
    RunMetrics, RunPhase,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that end a run
#[derive(Error, Debug)]
pub enum FillFormError {
    #[error("Misconfigured providers: {}", describe_issues(.0))]
    Configuration(Vec<ProviderInitError>),

    #[error("No provider has a positive weight")]
    NoActiveProviders,

    #[error("Could not list form fields: {0}")]
    FieldSource(#[source] FieldError),

    #[error("Run cancelled")]
    Cancelled,
}

impl FillFormError {
    /// Providers named by a configuration error
    pub fn misconfigured_providers(&self) -> Vec<String> {
        match self {
            FillFormError::Configuration(issues) => {
                issues.iter().map(|e| e.provider().to_string()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn describe_issues(issues: &[ProviderInitError]) -> String {
    issues
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The host collaborators a run works against
#[derive(Clone)]
pub struct FormCollaborators {
    pub source: Arc<dyn FieldSource>,
    pub classifier: Arc<dyn FieldClassifier>,
    pub extractor: Arc<dyn FieldExtractor>,
    pub prefilled: Arc<dyn PrefilledChecker>,
    pub prompts: Arc<dyn PromptBuilder>,
    pub filler: Arc<dyn Filler>,
}

impl FormCollaborators {
    /// Use one host object for every role, with the built-in prompt templates
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: FieldSource + FieldClassifier + FieldExtractor + PrefilledChecker + Filler + 'static,
    {
        Self {
            source: host.clone(),
            classifier: host.clone(),
            extractor: host.clone(),
            prefilled: host.clone(),
            prompts: Arc::new(TemplatePromptBuilder),
            filler: host,
        }
    }

    pub fn with_prompt_builder(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }
}

/// What happened to one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldStatus {
    Skipped(SkipReason),
    /// No valid answer came back
    Unanswered,
    /// The answer did not fit the field
    Rejected,
    Filled(AnswerPayload),
    /// The filler declined to write the answer
    NotWritten,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub handle: FieldHandle,
    pub field_type: Option<FieldType>,
    pub status: FieldStatus,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub metrics: RunMetrics,
    pub fields: Vec<FieldOutcome>,
    /// Phases entered, in order
    pub phases: Vec<RunPhase>,
}

impl RunReport {
    pub fn filled(&self) -> impl Iterator<Item = (&FieldOutcome, &AnswerPayload)> {
        self.fields.iter().filter_map(|o| match &o.status {
            FieldStatus::Filled(answer) => Some((o, answer)),
            _ => None,
        })
    }
}

/// Who answers the fields of a run
enum Answerer {
    Consensus(Arc<ConsensusEngine>),
    Single(Arc<dyn ProviderClient>),
}

enum FieldFailure {
    Field(FieldError),
    Engine(ConsensusError),
}

impl From<FieldError> for FieldFailure {
    fn from(e: FieldError) -> Self {
        FieldFailure::Field(e)
    }
}

struct PhaseTracker<'a> {
    current: RunPhase,
    history: Vec<RunPhase>,
    progress: &'a dyn PipelineProgress,
}

impl<'a> PhaseTracker<'a> {
    fn new(progress: &'a dyn PipelineProgress) -> Self {
        Self {
            current: RunPhase::Idle,
            history: vec![RunPhase::Idle],
            progress,
        }
    }

    fn enter(&mut self, next: RunPhase) {
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal phase transition {} -> {}",
            self.current,
            next
        );
        debug!("Phase: {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
        self.progress.on_phase(next);
    }
}

/// Use case for filling one form
pub struct FillFormUseCase {
    engines: Arc<EngineContext>,
    metrics: Arc<dyn MetricsRecorder>,
    options: Option<FillOptions>,
    validator: AnswerValidator,
    cancellation_token: Option<CancellationToken>,
}

impl FillFormUseCase {
    pub fn new(engines: Arc<EngineContext>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            engines,
            metrics,
            options: None,
            validator: AnswerValidator::new(),
            cancellation_token: None,
        }
    }

    /// Use these options instead of reading them from settings
    pub fn with_options(mut self, options: FillOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, form: &FormCollaborators) -> Result<RunReport, FillFormError> {
        self.execute_with_progress(form, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        form: &FormCollaborators,
        progress: &dyn PipelineProgress,
    ) -> Result<RunReport, FillFormError> {
        let mut phases = PhaseTracker::new(progress);

        // ==================== Initializing ====================
        phases.enter(RunPhase::Initializing);
        let options = self.resolve_options().await;
        let answerer = match self.initialize(&options).await {
            Ok(answerer) => answerer,
            Err(e) => {
                error!("{}", e);
                phases.enter(RunPhase::Finalizing);
                phases.enter(RunPhase::Idle);
                return Err(e);
            }
        };

        // ==================== ProfileResolution ====================
        phases.enter(RunPhase::ProfileResolution);
        let handles = match form.source.extract_fields().await {
            Ok(handles) => handles,
            Err(e) => {
                error!("Could not list form fields: {}", e);
                phases.enter(RunPhase::Finalizing);
                phases.enter(RunPhase::Idle);
                return Err(FillFormError::FieldSource(e));
            }
        };
        info!("Filling form with {} fields", handles.len());
        let mut metrics = RunMetrics::start(handles.len());
        progress.on_run_start(handles.len());

        let system_prompt = self
            .resolve_system_prompt(&options, form, &handles, &answerer)
            .await;

        // ==================== PerQuestionLoop ====================
        phases.enter(RunPhase::PerQuestionLoop);
        let mut outcomes = Vec::with_capacity(handles.len());
        let mut cancelled = false;

        for handle in &handles {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }

            let mut field_type = None;
            let status = match self
                .process_field(
                    handle,
                    form,
                    &answerer,
                    system_prompt.as_deref(),
                    &options,
                    &mut metrics,
                    &mut field_type,
                    progress,
                )
                .await
            {
                Ok(status) => status,
                Err(FieldFailure::Engine(ConsensusError::Cancelled)) => {
                    cancelled = true;
                    break;
                }
                Err(FieldFailure::Engine(e)) => {
                    warn!("Field {} failed: {}", handle, e);
                    progress.on_field_failed(handle, &e.to_string());
                    FieldStatus::Failed(e.to_string())
                }
                Err(FieldFailure::Field(e)) => {
                    warn!("Field {} failed: {}", handle, e);
                    progress.on_field_failed(handle, &e.to_string());
                    FieldStatus::Failed(e.to_string())
                }
            };

            outcomes.push(FieldOutcome {
                handle: handle.clone(),
                field_type,
                status,
            });
        }

        // ==================== Finalizing ====================
        phases.enter(RunPhase::Finalizing);
        metrics.finish(options.model_label());
        if let Err(e) = self.metrics.record(&metrics).await {
            warn!("Could not persist run metrics: {}", e);
        }
        info!(
            "Run finished: {} of {} fields filled ({} attempted) in {:.1}s",
            metrics.successful,
            metrics.total_questions,
            metrics.to_be_filled,
            metrics.duration_seconds()
        );
        progress.on_run_finished(&metrics);
        phases.enter(RunPhase::Idle);

        if cancelled {
            info!("Run cancelled after {} fields", outcomes.len());
            return Err(FillFormError::Cancelled);
        }

        Ok(RunReport {
            metrics,
            fields: outcomes,
            phases: phases.history,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(|t| t.is_cancelled())
    }

    async fn resolve_options(&self) -> FillOptions {
        if let Some(options) = &self.options {
            return options.clone();
        }
        let settings = self.engines.settings();
        match settings.fill_options().await {
            Ok(options) => options,
            Err(e) => {
                warn!("Could not read settings, using defaults: {}", e);
                settings.defaults().clone()
            }
        }
    }

    /// Build the answering side and check its configuration
    async fn initialize(&self, options: &FillOptions) -> Result<Answerer, FillFormError> {
        let factory = self.engines.factory();

        if options.consensus {
            let engine = self.engines.acquire().await;
            let active = engine.active_providers().await;
            if active.is_empty() {
                return Err(FillFormError::NoActiveProviders);
            }

            let issues: Vec<ProviderInitError> =
                active.iter().filter_map(|p| factory.check(p).err()).collect();
            if !issues.is_empty() {
                return Err(FillFormError::Configuration(issues));
            }

            info!("Consensus enabled across {} providers", active.len());
            Ok(Answerer::Consensus(engine))
        } else {
            let client = factory
                .create(&options.provider)
                .map_err(|e| FillFormError::Configuration(vec![e]))?;
            info!("Answering with {}", options.provider);
            Ok(Answerer::Single(client))
        }
    }

    /// System prompt of the selected profile, generated first for magic
    /// profiles. Generation failures keep the stored prompt.
    async fn resolve_system_prompt(
        &self,
        options: &FillOptions,
        form: &FormCollaborators,
        handles: &[FieldHandle],
        answerer: &Answerer,
    ) -> Option<String> {
        let settings = self.engines.settings();
        let catalog = match settings.load_profiles().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Could not load profiles, using the default: {}", e);
                ProfileCatalog::builtin()
            }
        };
        let (key, profile) = catalog.resolve(options.profile_key.as_deref());
        let (key, mut profile) = (key.to_string(), profile.clone());
        debug!("Answering profile: {} ({})", profile.name, key);

        if profile.is_magic && options.magic_prompt {
            let mut titles = Vec::new();
            for handle in handles {
                let Some(field_type) = form.classifier.classify(handle).await else {
                    continue;
                };
                match form.extractor.extract(handle, field_type).await {
                    Ok(field) => titles.push(field.title),
                    Err(e) => debug!("Leaving field {} out of the magic prompt: {}", handle, e),
                }
            }

            let client = match answerer {
                Answerer::Single(client) => Some(Arc::clone(client)),
                Answerer::Consensus(engine) => engine.lead_client().await,
            };

            match client {
                Some(client) => {
                    match GenerateMagicPromptUseCase::execute(client.as_ref(), &titles).await {
                        Ok(generated) => {
                            profile.system_prompt = generated.system_prompt;
                            if let Err(e) = settings.save_custom_profile(&key, profile.clone()).await
                            {
                                warn!("Could not save generated prompt: {}", e);
                            }
                        }
                        Err(e) => warn!("Magic prompt generation failed, keeping stored prompt: {}", e),
                    }
                }
                None => warn!("No provider available for magic prompt generation"),
            }
        }

        if profile.system_prompt.trim().is_empty() {
            let builtin = ProfileCatalog::builtin();
            let (_, fallback) = builtin.resolve(None);
            return Some(fallback.system_prompt.clone());
        }
        Some(profile.system_prompt)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_field(
        &self,
        handle: &FieldHandle,
        form: &FormCollaborators,
        answerer: &Answerer,
        system_prompt: Option<&str>,
        options: &FillOptions,
        metrics: &mut RunMetrics,
        field_type_out: &mut Option<FieldType>,
        progress: &dyn PipelineProgress,
    ) -> Result<FieldStatus, FieldFailure> {
        let Some(field_type) = form.classifier.classify(handle).await else {
            debug!("Skipping unclassifiable field {}", handle);
            progress.on_field_skipped(handle, SkipReason::Unclassifiable);
            return Ok(FieldStatus::Skipped(SkipReason::Unclassifiable));
        };
        *field_type_out = Some(field_type);

        let field = form.extractor.extract(handle, field_type).await?;
        debug!(
            "Field {} ({}): {}",
            handle,
            field_type,
            preview(&field.title, 80)
        );

        if options.skip_marked && form.prefilled.is_already_answered(field_type, &field).await {
            if options.dim_skipped {
                form.filler.mark_skipped(&field).await;
            }
            info!("Skipping already answered field {}", handle);
            progress.on_field_skipped(handle, SkipReason::AlreadyAnswered);
            return Ok(FieldStatus::Skipped(SkipReason::AlreadyAnswered));
        }

        metrics.increment_to_be_filled();

        let mut prompt = Prompt::new(form.prompts.build_prompt(field_type, &field));
        if let Some(system) = system_prompt {
            prompt = prompt.with_system(system);
        }

        let answer = match answerer {
            Answerer::Consensus(engine) => {
                let result = match &self.cancellation_token {
                    Some(token) => {
                        engine
                            .generate_and_validate_with_cancel(&prompt, &field, field_type, token)
                            .await
                    }
                    None => engine.generate_and_validate(&prompt, &field, field_type).await,
                }
                .map_err(FieldFailure::Engine)?;

                for latency in &result.latencies {
                    metrics.record_response_time(*latency);
                }
                result.into_answer()
            }
            Answerer::Single(client) => {
                self.invoke_single(client.as_ref(), &prompt, &field, field_type, metrics)
                    .await?
            }
        };

        progress.on_field_answered(handle, field_type, answer.is_some());

        let Some(answer) = answer else {
            info!("No answer for field {}", handle);
            return Ok(FieldStatus::Unanswered);
        };

        if !self.validator.validate(field_type, &field, &answer) {
            warn!("Answer for field {} does not fit the field", handle);
            return Ok(FieldStatus::Rejected);
        }

        let written = form.filler.fill(field_type, &field, &answer).await?;
        progress.on_field_filled(handle, written);
        if written {
            metrics.increment_successful();
            info!("Filled field {}", handle);
            Ok(FieldStatus::Filled(answer))
        } else {
            warn!("Filler did not write field {}", handle);
            Ok(FieldStatus::NotWritten)
        }
    }

    async fn invoke_single(
        &self,
        client: &dyn ProviderClient,
        prompt: &Prompt,
        field: &FieldValue,
        field_type: FieldType,
        metrics: &mut RunMetrics,
    ) -> Result<Option<AnswerPayload>, FieldFailure> {
        let started = Instant::now();
        let result = if let Some(token) = &self.cancellation_token {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(FieldFailure::Engine(ConsensusError::Cancelled));
                }
                result = client.invoke(prompt, field_type) => result,
            }
        } else {
            client.invoke(prompt, field_type).await
        };

        match result {
            Ok(raw) => {
                metrics.record_response_time(started.elapsed().as_secs_f64());
                let answer = self.validator.accept(field_type, field, &raw);
                if answer.is_none() {
                    debug!(
                        "Provider {} answer rejected: {}",
                        client.provider(),
                        preview(&raw.value().to_string(), 120)
                    );
                }
                Ok(answer)
            }
            Err(e) => {
                warn!("Provider {} failed: {}", client.provider(), e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Settings, keys};
    use crate::testing::{
        MemoryMetrics, MemoryStore, MockFactory, MockProvider, ScriptedField, ScriptedForm,
    };
    use docfiller_domain::{OptionChoice, ProviderId, WeightTable};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    struct Harness {
        store: Arc<MemoryStore>,
        metrics: Arc<MemoryMetrics>,
        engines: Arc<EngineContext>,
    }

    impl Harness {
        fn new(factory: MockFactory, weights: WeightTable) -> Self {
            Self::with_metrics(factory, weights, MemoryMetrics::default())
        }

        fn with_metrics(factory: MockFactory, weights: WeightTable, metrics: MemoryMetrics) -> Self {
            let store = Arc::new(MemoryStore::default());
            let engines = Arc::new(EngineContext::new(
                Arc::new(factory),
                Settings::new(store.clone()),
                weights,
            ));
            Self {
                store,
                metrics: Arc::new(metrics),
                engines,
            }
        }

        fn use_case(&self) -> FillFormUseCase {
            FillFormUseCase::new(self.engines.clone(), self.metrics.clone())
        }
    }

    fn single(provider: MockProvider) -> (Arc<MockProvider>, Harness) {
        let provider = Arc::new(provider);
        let harness = Harness::new(
            MockFactory::new().with_shared(provider.clone()),
            WeightTable::new(),
        );
        (provider, harness)
    }

    fn five_fields() -> Vec<ScriptedField> {
        (1..=5)
            .map(|i| ScriptedField::text(&format!("f{}", i), &format!("Question {}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_field_failure_does_not_abort_run() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Ada"));
        let mut fields = five_fields();
        fields[2] = ScriptedField::text("f3", "Question 3").broken();
        let form = Arc::new(ScriptedForm::new(fields));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form.clone()))
            .await
            .unwrap();

        assert_eq!(report.metrics.total_questions, 5);
        assert_eq!(report.metrics.to_be_filled, 4);
        assert_eq!(report.metrics.successful, 4);
        assert!(matches!(report.fields[2].status, FieldStatus::Failed(_)));
        assert_eq!(provider.calls(), 4);

        let filled: Vec<_> = form.filled().into_iter().map(|(id, _)| id).collect();
        assert_eq!(filled, vec!["f1", "f2", "f4", "f5"]);
        assert_eq!(harness.metrics.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_already_answered_field_is_skipped() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Ada"));
        let form = Arc::new(ScriptedForm::new(vec![
            ScriptedField::text("f1", "Name").prefilled(),
            ScriptedField::text("f2", "City"),
        ]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form.clone()))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(report.metrics.to_be_filled, 1);
        assert_eq!(
            report.fields[0].status,
            FieldStatus::Skipped(SkipReason::AlreadyAnswered)
        );
        assert_eq!(form.marked(), vec!["f1"]);
    }

    #[tokio::test]
    async fn test_skip_without_dimming() {
        let (_, harness) = single(MockProvider::text("gpt-5", "Ada"));
        harness.store.insert(keys::DIM_SKIPPED, json!(false));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Name").prefilled()]));

        harness
            .use_case()
            .execute(&FormCollaborators::from_host(form.clone()))
            .await
            .unwrap();

        assert!(form.marked().is_empty());
    }

    #[tokio::test]
    async fn test_answered_field_is_refilled_when_skipping_is_off() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Ada"));
        harness.store.insert(keys::SKIP_MARKED, json!(false));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Name").prefilled()]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(report.metrics.successful, 1);
    }

    #[tokio::test]
    async fn test_unclassifiable_field_is_skipped() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Ada"));
        let form = Arc::new(ScriptedForm::new(vec![
            ScriptedField::text("f1", "Captcha").unclassifiable(),
        ]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 0);
        assert_eq!(report.metrics.to_be_filled, 0);
        assert_eq!(
            report.fields[0].status,
            FieldStatus::Skipped(SkipReason::Unclassifiable)
        );
        assert_eq!(report.fields[0].field_type, None);
    }

    #[tokio::test]
    async fn test_invalid_answer_counts_as_attempted() {
        let provider = MockProvider::answer("gpt-5", json!({"optionText": "Purple"}));
        let (_, harness) = single(provider);
        let field = FieldValue::new(FieldHandle::new("f1"), "Colour").with_options(["Red", "Blue"]);
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::of_type(
            FieldType::MultipleChoice,
            field,
        )]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form.clone()))
            .await
            .unwrap();

        assert_eq!(report.fields[0].status, FieldStatus::Unanswered);
        assert_eq!(report.metrics.to_be_filled, 1);
        assert_eq!(report.metrics.successful, 0);
        assert!(form.filled().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_leaves_field_unanswered() {
        let (_, harness) = single(MockProvider::failing("gpt-5"));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Name")]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        assert_eq!(report.fields[0].status, FieldStatus::Unanswered);
        assert!(report.metrics.response_times.is_empty());
    }

    #[tokio::test]
    async fn test_refused_fill_is_not_successful() {
        let (_, harness) = single(MockProvider::text("gpt-5", "Ada"));
        let mut form = ScriptedForm::new(vec![ScriptedField::text("f1", "Name")]);
        form.refuse_fill = true;

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(Arc::new(form)))
            .await
            .unwrap();

        assert_eq!(report.fields[0].status, FieldStatus::NotWritten);
        assert_eq!(report.metrics.successful, 0);
    }

    #[tokio::test]
    async fn test_misconfigured_provider_stops_before_any_field() {
        let harness = Harness::new(MockFactory::new().broken("gpt-5"), WeightTable::new());
        let form = Arc::new(ScriptedForm::new(five_fields()));

        let err = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form.clone()))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, FillFormError::Configuration(_)));
        assert_eq!(err.misconfigured_providers(), vec!["gpt-5"]);
        assert_eq!(form.source_calls.load(Ordering::SeqCst), 0);
        assert!(form.filled().is_empty());
        assert!(harness.metrics.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_consensus_misconfiguration_lists_every_provider() {
        let factory = MockFactory::new()
            .broken("gemini")
            .broken("mistral")
            .with(MockProvider::text("gpt-5", "x"));
        let harness = Harness::new(
            factory,
            WeightTable::uniform([ProviderId::Gpt5, ProviderId::Gemini, ProviderId::Mistral]),
        );
        let form = Arc::new(ScriptedForm::new(five_fields()));

        let err = harness
            .use_case()
            .with_options(FillOptions::default().with_consensus(true))
            .execute(&FormCollaborators::from_host(form))
            .await
            .err()
            .unwrap();

        assert_eq!(err.misconfigured_providers(), vec!["gemini", "mistral"]);
    }

    #[tokio::test]
    async fn test_consensus_run() {
        let field = FieldValue::new(FieldHandle::new("f1"), "Colour").with_options(["Red", "Blue"]);
        let red = json!({"optionText": "Red", "isOther": false});
        let blue = json!({"optionText": "Blue", "isOther": false});
        let factory = MockFactory::new()
            .with(MockProvider::answer("gpt-5", red.clone()))
            .with(MockProvider::answer("gemini", blue))
            .with(MockProvider::answer("mistral", red));
        let harness = Harness::new(
            factory,
            WeightTable::uniform([ProviderId::Gpt5, ProviderId::Gemini, ProviderId::Mistral]),
        );
        harness.store.insert(keys::CONSENSUS, json!(true));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::of_type(
            FieldType::MultipleChoice,
            field,
        )]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form.clone()))
            .await
            .unwrap();

        let expected = AnswerPayload::SingleOption(OptionChoice::Listed("Red".into()));
        assert_eq!(report.fields[0].status, FieldStatus::Filled(expected.clone()));
        assert_eq!(form.filled(), vec![("f1".to_string(), expected)]);
        assert_eq!(report.metrics.response_times.len(), 3);
        assert_eq!(report.metrics.model.as_deref(), Some("consensus"));
    }

    #[tokio::test]
    async fn test_phases_in_order() {
        let (_, harness) = single(MockProvider::text("gpt-5", "Ada"));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Name")]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        assert_eq!(
            report.phases,
            vec![
                RunPhase::Idle,
                RunPhase::Initializing,
                RunPhase::ProfileResolution,
                RunPhase::PerQuestionLoop,
                RunPhase::Finalizing,
                RunPhase::Idle,
            ]
        );
        assert_eq!(report.metrics.model.as_deref(), Some("gpt-5"));
    }

    #[tokio::test]
    async fn test_system_prompt_comes_from_selected_profile() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Ada"));
        harness.store.insert(
            keys::CUSTOM_PROFILES,
            json!({"terse": {"name": "Terse", "system_prompt": "One word only.", "is_custom": true}}),
        );
        harness.store.insert(keys::SELECTED_PROFILE, json!("terse"));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Name")]));

        harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        assert_eq!(
            provider.prompts()[0].system.as_deref(),
            Some("One word only.")
        );
    }

    #[tokio::test]
    async fn test_magic_profile_generates_and_persists_prompt() {
        let provider = MockProvider::with_fn("gpt-5", |prompt, _| {
            if prompt.body.contains("subject_context") {
                Some(Ok(json!({
                    "subject_context": "geography",
                    "expertise_level": "expert",
                    "system_prompt": "You are a geographer."
                })))
            } else {
                Some(Ok(json!("Paris")))
            }
        });
        let (provider, harness) = single(provider);
        harness.store.insert(
            keys::CUSTOM_PROFILES,
            json!({"auto": {"name": "Auto", "system_prompt": "", "is_custom": true, "is_magic": true}}),
        );
        harness.store.insert(keys::SELECTED_PROFILE, json!("auto"));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text(
            "f1",
            "Capital of France?",
        )]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        assert_eq!(report.metrics.successful, 1);
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].body.contains("Capital of France?"));
        assert_eq!(prompts[1].system.as_deref(), Some("You are a geographer."));

        let stored = harness.store.value(keys::CUSTOM_PROFILES).unwrap();
        assert_eq!(stored["auto"]["system_prompt"], "You are a geographer.");
        assert_eq!(stored["auto"]["is_magic"], true);
    }

    #[tokio::test]
    async fn test_magic_failure_keeps_previous_prompt() {
        let provider = MockProvider::with_fn("gpt-5", |prompt, _| {
            if prompt.body.contains("subject_context") {
                Some(Err(crate::ports::provider::ProviderError::Timeout))
            } else {
                Some(Ok(json!("Paris")))
            }
        });
        let (provider, harness) = single(provider);
        harness.store.insert(
            keys::CUSTOM_PROFILES,
            json!({"auto": {"name": "Auto", "system_prompt": "Stored prompt", "is_magic": true, "is_custom": true}}),
        );
        harness.store.insert(keys::SELECTED_PROFILE, json!("auto"));
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Capital?")]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        assert_eq!(report.metrics.successful, 1);
        assert_eq!(
            provider.prompts().last().unwrap().system.as_deref(),
            Some("Stored prompt")
        );
    }

    #[tokio::test]
    async fn test_magic_prompt_can_be_disabled() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Paris"));
        harness.store.insert(
            keys::CUSTOM_PROFILES,
            json!({"auto": {"name": "Auto", "system_prompt": "", "is_magic": true, "is_custom": true}}),
        );
        let mut options = FillOptions::default().with_profile("auto");
        options.magic_prompt = false;
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Capital?")]));

        harness
            .use_case()
            .with_options(options)
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();

        // Only the field prompt, with the default system prompt as fallback
        assert_eq!(provider.calls(), 1);
        assert!(provider.prompts()[0].system.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_run_flushes_metrics() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Ada"));
        let token = CancellationToken::new();
        token.cancel();
        let form = Arc::new(ScriptedForm::new(five_fields()));

        let err = harness
            .use_case()
            .with_cancellation(token)
            .execute(&FormCollaborators::from_host(form))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, FillFormError::Cancelled));
        assert_eq!(provider.calls(), 0);
        assert_eq!(harness.metrics.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_metrics_failure_does_not_fail_run() {
        let provider = Arc::new(MockProvider::text("gpt-5", "Ada"));
        let harness = Harness::with_metrics(
            MockFactory::new().with_shared(provider),
            WeightTable::new(),
            MemoryMetrics::failing(),
        );
        let form = Arc::new(ScriptedForm::new(vec![ScriptedField::text("f1", "Name")]));

        let report = harness
            .use_case()
            .execute(&FormCollaborators::from_host(form))
            .await
            .unwrap();
        assert_eq!(report.metrics.successful, 1);
    }

    #[tokio::test]
    async fn test_field_source_failure_ends_run() {
        let (provider, harness) = single(MockProvider::text("gpt-5", "Ada"));
        let mut form = ScriptedForm::new(five_fields());
        form.source_fails = true;

        let err = harness
            .use_case()
            .execute(&FormCollaborators::from_host(Arc::new(form)))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, FillFormError::FieldSource(_)));
        assert_eq!(provider.calls(), 0);
        assert!(harness.metrics.recorded().is_empty());
    }
}

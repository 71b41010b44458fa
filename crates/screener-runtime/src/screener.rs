//! Resume screening pipeline.
//!
//! One file goes through three stages:
//! 1. Normalize to a single image (blocking thread)
//! 2. One model call with the image and the evaluation prompt
//! 3. Decode the reply into an [`EvaluationRecord`]
//!
//! A batch fans files out with bounded concurrency. Failures stay with the
//! file that caused them: every submitted file gets exactly one
//! [`FileEvaluation`], in submission order.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use screener_core::{
    decode_response_with, DecodeError, DecodeOptions, DecodeStrategy, EvaluationRecord,
    NormalizeError, NormalizedDocument, Normalizer, PageRasterizer, ResumeFile,
};

use crate::config::{ConfigError, ScreenerConfig};
use crate::prompts::{build_evaluation_prompt, SYSTEM_PROMPT};
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};

/// Errors from evaluating a single file.
#[derive(Error, Debug)]
pub enum ScreenError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// What happened to one submitted file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Evaluated { record: EvaluationRecord },
    Failed { reason: String },
}

/// Result for one submitted file.
#[derive(Debug, Clone, Serialize)]
pub struct FileEvaluation {
    /// Position in the submitted batch
    pub index: usize,

    pub file_name: String,

    #[serde(flatten)]
    pub outcome: FileOutcome,
}

impl FileEvaluation {
    pub fn record(&self) -> Option<&EvaluationRecord> {
        match &self.outcome {
            FileOutcome::Evaluated { record } => Some(record),
            FileOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.record().is_some()
    }
}

/// Evaluates resumes against a job description.
pub struct Screener {
    provider: Arc<dyn LlmProvider>,
    normalizer: Normalizer,
    completion: CompletionConfig,
    response_format: DecodeStrategy,
    decode_options: DecodeOptions,
    max_concurrency: usize,
    save_dir: Option<PathBuf>,
}

impl Screener {
    /// Create a screener with a pdfium-backed normalizer.
    pub fn new(provider: Arc<dyn LlmProvider>, config: ScreenerConfig) -> Result<Self, ScreenError> {
        ScreenerBuilder::new().provider(provider).config(config).build()
    }

    pub fn builder() -> ScreenerBuilder {
        ScreenerBuilder::new()
    }

    /// Evaluate one resume.
    ///
    /// The model is called exactly once. There is no retry.
    pub async fn evaluate_file(
        &self,
        file: &ResumeFile,
        job_description: &str,
    ) -> Result<EvaluationRecord, ScreenError> {
        let document = self.normalize(file).await?;
        tracing::debug!(
            file = %file.name,
            pages = document.page_count,
            width = document.width,
            height = document.height,
            "Normalized resume"
        );

        if let Some(dir) = &self.save_dir {
            save_copy(&document, dir, &file.name);
        }

        let prompt = build_evaluation_prompt(job_description, self.response_format);
        tracing::debug!(
            file = %file.name,
            prompt_tokens = self.provider.estimate_tokens(&prompt),
            "Calling model"
        );
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user_with_image(prompt, document.mime, document.bytes),
        ];

        let response = self.provider.complete(messages, &self.completion).await?;
        tracing::debug!(
            file = %file.name,
            provider = self.provider.name(),
            model = %response.model,
            tokens = response.usage.total(),
            "Model responded"
        );

        decode_response_with(&response.content, self.decode_options).map_err(|e| {
            tracing::debug!(file = %file.name, raw = %e.raw(), "Undecodable model response");
            ScreenError::Decode(e)
        })
    }

    /// Fail fast when the provider reports it cannot serve requests.
    pub async fn check_provider(&self) -> Result<(), ScreenError> {
        if self.provider.health_check().await {
            Ok(())
        } else {
            Err(ScreenError::ProviderNotConfigured(format!(
                "{} provider is not ready",
                self.provider.name()
            )))
        }
    }

    /// Evaluate a batch of resumes.
    ///
    /// Returns one entry per input file in input order, whatever order the
    /// calls complete in. At most `max_concurrency` files are in flight.
    pub async fn screen(
        &self,
        files: Vec<ResumeFile>,
        job_description: &str,
    ) -> Vec<FileEvaluation> {
        tracing::info!(
            files = files.len(),
            concurrency = self.max_concurrency,
            "Screening resumes"
        );

        let mut results: Vec<FileEvaluation> = stream::iter(files.into_iter().enumerate())
            .map(|(index, file)| async move {
                let outcome = match self.evaluate_file(&file, job_description).await {
                    Ok(record) => {
                        tracing::info!(file = %file.name, candidate = %record.candidate_name, "Evaluated resume");
                        FileOutcome::Evaluated { record }
                    }
                    Err(e) => {
                        tracing::warn!(file = %file.name, error = %e, "Resume evaluation failed");
                        FileOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                FileEvaluation {
                    index,
                    file_name: file.name,
                    outcome,
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        results.sort_by_key(|r| r.index);
        results
    }

    async fn normalize(&self, file: &ResumeFile) -> Result<NormalizedDocument, ScreenError> {
        let normalizer = self.normalizer.clone();
        let file = file.clone();
        tokio::task::spawn_blocking(move || normalizer.normalize(&file))
            .await
            .map_err(|e| ScreenError::Task(e.to_string()))?
            .map_err(ScreenError::from)
    }
}

/// Saving the normalized image is a debugging aid; a failure is logged, not raised.
fn save_copy(document: &NormalizedDocument, dir: &Path, file_name: &str) {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("resume");
    match document.save_to(dir, stem) {
        Ok(path) => tracing::debug!(path = %path.display(), "Saved normalized image"),
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Could not save normalized image"),
    }
}

/// Builder for [`Screener`].
pub struct ScreenerBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: ScreenerConfig,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    save_dir: Option<PathBuf>,
}

impl ScreenerBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: ScreenerConfig::default(),
            rasterizer: None,
            save_dir: None,
        }
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: ScreenerConfig) -> Self {
        self.config = config;
        self
    }

    /// Render PDFs with something other than pdfium.
    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Keep a copy of every normalized image in `dir`.
    pub fn save_normalized(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Screener, ScreenError> {
        let provider = self
            .provider
            .ok_or_else(|| ScreenError::ProviderNotConfigured("No provider set".to_string()))?;
        self.config.validate()?;

        let normalizer = match self.rasterizer {
            Some(r) => Normalizer::new(r),
            None => Normalizer::with_pdfium(),
        }
        .with_dpi(self.config.render_dpi)
        .with_page_gap(self.config.page_gap);

        Ok(Screener {
            provider,
            normalizer,
            completion: self.config.completion_config(),
            response_format: self.config.response_format,
            decode_options: self.config.decode_options(),
            max_concurrency: self.config.max_concurrency,
            save_dir: self.save_dir,
        })
    }
}

impl Default for ScreenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

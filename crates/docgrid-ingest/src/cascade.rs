//! Cascading extraction: try backends in order until one produces acceptable text.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use docgrid_core::ExtractionUnit;

use crate::backends::{BackendRegistry, ExtractionInput};
use crate::policy::BackendKind;

/// Text of the single unit returned when no backend succeeds.
pub const ALL_FAILED_TEXT: &str = "Error: Unable to extract text from this PDF. The file might be password-protected, corrupted, or contain only images.";

/// Lifecycle of one backend attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    NotAttempted,
    Attempting,
    Succeeded,
    EmptyResult,
    ErrorResult,
}

/// Acceptance test for a backend's output.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    /// Minimum trimmed characters summed over all units of a PDF.
    pub min_chars: usize,
    /// Same floor for documents that are not PDFs.
    pub min_plain_chars: usize,
    /// Upper bound on mean whitespace-token length. Garbled decodings produce
    /// long runs without spaces.
    pub max_avg_token_len: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_chars: 100,
            min_plain_chars: 1,
            max_avg_token_len: 15.0,
        }
    }
}

impl QualityGate {
    /// Checks output of a PDF backend.
    pub fn accepts(&self, units: &[ExtractionUnit]) -> bool {
        self.check(units, self.min_chars)
    }

    /// Picks the floor by document type. Short text files are still valid.
    pub fn accepts_for(&self, units: &[ExtractionUnit], is_pdf: bool) -> bool {
        let floor = if is_pdf { self.min_chars } else { self.min_plain_chars };
        self.check(units, floor)
    }

    fn check(&self, units: &[ExtractionUnit], floor: usize) -> bool {
        let total: usize = units.iter().map(|u| u.text.trim().chars().count()).sum();
        if total < floor.max(1) {
            return false;
        }

        let (tokens, chars) = units
            .iter()
            .flat_map(|u| u.text.split_whitespace())
            .fold((0usize, 0usize), |(n, len), tok| (n + 1, len + tok.chars().count()));
        tokens > 0 && (chars as f64 / tokens as f64) <= self.max_avg_token_len
    }
}

/// Result of a cascade run. `method` is `None` when everything failed.
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub units: Vec<ExtractionUnit>,
    pub method: Option<BackendKind>,
    pub attempts: Vec<(BackendKind, AttemptState)>,
}

impl CascadeOutcome {
    pub fn succeeded(&self) -> bool {
        self.method.is_some()
    }
}

/// Drives an ordered backend list with one runner. Never fails.
#[derive(Debug, Clone)]
pub struct CascadeRunner {
    registry: BackendRegistry,
    gate: QualityGate,
}

impl CascadeRunner {
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            gate: QualityGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub async fn run(&self, input: &ExtractionInput, order: &[BackendKind]) -> CascadeOutcome {
        let mut attempts: Vec<(BackendKind, AttemptState)> = order
            .iter()
            .map(|kind| (*kind, AttemptState::NotAttempted))
            .collect();
        let doc = &input.document;

        for (idx, kind) in order.iter().enumerate() {
            attempts[idx].1 = AttemptState::Attempting;

            let Some(backend) = self.registry.get(*kind) else {
                warn!("Extraction backend {} is not registered, skipping", kind);
                attempts[idx].1 = AttemptState::ErrorResult;
                continue;
            };
            if !backend.supports(&doc.extension) {
                debug!("Backend {} does not read .{} files", kind, doc.extension);
                attempts[idx].1 = AttemptState::EmptyResult;
                continue;
            }

            debug!("Trying {} on {}", kind, doc.filename);
            let result = AssertUnwindSafe(backend.extract(input)).catch_unwind().await;
            let units = match result {
                Ok(Ok(units)) => units,
                Ok(Err(e)) => {
                    warn!("Backend {} failed on {}: {}", kind, doc.filename, e);
                    attempts[idx].1 = AttemptState::ErrorResult;
                    continue;
                }
                Err(_) => {
                    warn!("Backend {} panicked on {}", kind, doc.filename);
                    attempts[idx].1 = AttemptState::ErrorResult;
                    continue;
                }
            };

            if !self.gate.accepts_for(&units, doc.is_pdf()) {
                debug!(
                    "Backend {} returned {} units that failed the quality gate",
                    kind,
                    units.len()
                );
                attempts[idx].1 = AttemptState::EmptyResult;
                continue;
            }

            attempts[idx].1 = AttemptState::Succeeded;
            info!(
                "Extracted {} units from {} with {}",
                units.len(),
                doc.filename,
                kind
            );
            return CascadeOutcome {
                units: tag_units(units, doc.id.as_str(), *kind),
                method: Some(*kind),
                attempts,
            };
        }

        warn!(
            "All {} extraction backends failed for {}",
            order.len(),
            doc.filename
        );
        let mut placeholder = ExtractionUnit::placeholder(ALL_FAILED_TEXT, "All extraction methods failed");
        placeholder.metadata.source = doc.id.clone();
        CascadeOutcome {
            units: vec![placeholder],
            method: None,
            attempts,
        }
    }
}

fn tag_units(mut units: Vec<ExtractionUnit>, source: &str, kind: BackendKind) -> Vec<ExtractionUnit> {
    let total_pages = units.iter().map(|u| u.page).max().unwrap_or(0).max(units.len());
    for unit in &mut units {
        unit.metadata.source = source.to_string();
        unit.metadata.total_pages = total_pages;
        unit.metadata.extraction_method = kind.as_str().to_string();
    }
    units
}

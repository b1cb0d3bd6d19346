//! Budgeted projection of a frozen bundle into advisor-facing context.
//!
//! Per artifact: bound, strip markup, decode, redact, segment, score.
//! Then one selection pass ranks chunks and artifacts and enforces every
//! cap in [`CompactionBudget`]. Anything left out is named in
//! `provenance` with a reason.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sieve_policy::{CompactionBudget, CompactionConfig};
use sieve_types::{
    ArtifactId, ArtifactKind, ChunkRef, EvidenceId, EvidenceSlot, FactorContribution, FrozenBundle,
    TextArtifact, Verdict,
};
use tracing::debug;

use crate::decode::{self, STEP_STRIP_MARKUP};
use crate::redact::redact_text;
use crate::relevance::score_chunk;
use crate::segment::segment;

/// Why something was left out of (or cut inside) the compacted context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceReason {
    /// Raw artifact text cut to `max_raw_chars` before decoding.
    RawTruncated,
    /// Chunk ranked below the per-artifact snippet cap.
    SnippetCap,
    /// Artifact ranked below the artifact cap.
    ArtifactCap,
    /// Chunk or artifact cut to fit a character budget.
    BudgetExceeded,
    /// Signal ref beyond the signal-ref cap.
    SignalRefCap,
    /// Nothing left to chunk after decoding.
    EmptyArtifact,
}

impl ProvenanceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceReason::RawTruncated => "raw_truncated",
            ProvenanceReason::SnippetCap => "snippet_cap",
            ProvenanceReason::ArtifactCap => "artifact_cap",
            ProvenanceReason::BudgetExceeded => "budget_exceeded",
            ProvenanceReason::SignalRefCap => "signal_ref_cap",
            ProvenanceReason::EmptyArtifact => "empty_artifact",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Artifact id, chunk reference or evidence id the entry is about.
    pub subject: String,
    pub reason: ProvenanceReason,
    pub detail: String,
}

impl ProvenanceEntry {
    fn new(subject: impl Into<String>, reason: ProvenanceReason, detail: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            reason,
            detail: detail.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub reference: ChunkRef,
    /// Char offset into the processed artifact text.
    pub offset: usize,
    pub text: String,
    pub score: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompactedArtifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub risk: f64,
    /// Breakdown contribution attributed to the artifact's slot.
    pub contribution: f64,
    pub decode_chain: Vec<String>,
    /// Selected chunks in reading order.
    pub chunks: Vec<Chunk>,
}

impl CompactedArtifact {
    fn best_score(&self) -> u32 {
        self.chunks.iter().map(|c| c.score).max().unwrap_or(0)
    }

    fn chars(&self) -> usize {
        self.chunks.iter().map(|c| c.text.chars().count()).sum()
    }
}

/// Redacted one-line summary of a piece of evidence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRef {
    pub id: EvidenceId,
    pub summary: String,
}

/// Everything the advisor is allowed to see.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompactedContext {
    /// Deterministic verdict the context was compacted for.
    pub severity: Verdict,
    /// Selected artifacts, highest ranked first.
    pub artifacts: Vec<CompactedArtifact>,
    pub signal_refs: Vec<SignalRef>,
    pub provenance: Vec<ProvenanceEntry>,
    /// Set when the verdict is malicious, no chunk survived, and either text
    /// candidates were all dropped or no signal ref is left.
    pub evidence_insufficient: bool,
    pub total_chars: usize,
}

impl CompactedContext {
    fn empty(severity: Verdict, provenance: Vec<ProvenanceEntry>) -> Self {
        Self {
            severity,
            artifacts: Vec::new(),
            signal_refs: Vec::new(),
            provenance,
            evidence_insufficient: false,
            total_chars: 0,
        }
    }

    /// Chunk references and signal-ref ids present in this context.
    pub fn known_refs(&self) -> BTreeSet<String> {
        let chunks = self
            .artifacts
            .iter()
            .flat_map(|a| a.chunks.iter().map(|c| c.reference.as_str().to_string()));
        let signals = self.signal_refs.iter().map(|s| s.id.as_str().to_string());
        chunks.chain(signals).collect()
    }

    pub fn contains_reference(&self, reference: &str) -> bool {
        self.artifacts
            .iter()
            .any(|a| a.chunks.iter().any(|c| c.reference.as_str() == reference))
            || self.signal_refs.iter().any(|s| s.id.as_str() == reference)
    }

    pub fn chunk_count(&self) -> usize {
        self.artifacts.iter().map(|a| a.chunks.len()).sum()
    }

    /// Re-run selection over the already-selected content.
    ///
    /// Provenance is carried over. With the same budget the result equals
    /// `self`.
    pub fn recompact(&self, config: &CompactionConfig) -> CompactedContext {
        let mut next = CompactedContext::empty(self.severity, self.provenance.clone());
        next.select(self.artifacts.clone(), self.signal_refs.clone(), &config.budget);
        next
    }

    fn record(&mut self, entry: ProvenanceEntry) {
        self.provenance.push(entry);
    }

    fn select(
        &mut self,
        mut artifacts: Vec<CompactedArtifact>,
        signal_refs: Vec<SignalRef>,
        budget: &CompactionBudget,
    ) {
        let had_candidates = !artifacts.is_empty();

        // Top-K chunks per artifact.
        for artifact in &mut artifacts {
            artifact.chunks.sort_by(chunk_priority);
            let keep = artifact.chunks.len().min(budget.max_snippets_per_artifact);
            for chunk in artifact.chunks.split_off(keep) {
                self.record(ProvenanceEntry::new(
                    chunk.reference.as_str(),
                    ProvenanceReason::SnippetCap,
                    format!(
                        "score={} beyond top {}",
                        chunk.score, budget.max_snippets_per_artifact
                    ),
                ));
            }
            for chunk in &mut artifact.chunks {
                let len = chunk.text.chars().count();
                if len > budget.max_snippet_chars {
                    chunk.text = truncate_chars(&chunk.text, budget.max_snippet_chars);
                    self.record(ProvenanceEntry::new(
                        chunk.reference.as_str(),
                        ProvenanceReason::BudgetExceeded,
                        format!("truncated {len} to {} chars", budget.max_snippet_chars),
                    ));
                }
            }
            artifact.chunks.sort_by_key(|c| c.offset);
        }

        // Top-M artifacts.
        artifacts.sort_by(artifact_rank);
        let keep = artifacts.len().min(budget.max_artifacts);
        for (rank, artifact) in artifacts.split_off(keep).into_iter().enumerate() {
            self.record(ProvenanceEntry::new(
                EvidenceId::artifact(&artifact.id).as_str(),
                ProvenanceReason::ArtifactCap,
                format!("rank {} beyond top {}", keep + rank + 1, budget.max_artifacts),
            ));
        }

        // Total size: lowest-ranked artifacts go first, the top one is trimmed.
        while total_chars(&artifacts) > budget.max_total_chars && artifacts.len() > 1 {
            if let Some(dropped) = artifacts.pop() {
                self.record(ProvenanceEntry::new(
                    EvidenceId::artifact(&dropped.id).as_str(),
                    ProvenanceReason::BudgetExceeded,
                    format!(
                        "dropped {} chunks ({} chars) over total {}",
                        dropped.chunks.len(),
                        dropped.chars(),
                        budget.max_total_chars
                    ),
                ));
            }
        }
        if total_chars(&artifacts) > budget.max_total_chars {
            if let Some(top) = artifacts.first_mut() {
                let entries = trim_to_budget(top, budget.max_total_chars);
                self.provenance.extend(entries);
            }
        }

        self.total_chars = total_chars(&artifacts);
        let no_chunks = artifacts.iter().all(|a| a.chunks.is_empty());
        self.artifacts = artifacts;

        let cap = budget.max_signal_refs;
        for overflow in signal_refs.iter().skip(cap) {
            self.record(ProvenanceEntry::new(
                overflow.id.as_str(),
                ProvenanceReason::SignalRefCap,
                format!("beyond {cap} signal refs"),
            ));
        }
        self.signal_refs = signal_refs.into_iter().take(cap).collect();

        // A message that never carried text is not insufficient while signal
        // refs still back the verdict.
        self.evidence_insufficient = self.severity == Verdict::Malicious
            && no_chunks
            && (had_candidates || self.signal_refs.is_empty());
    }
}

fn total_chars(artifacts: &[CompactedArtifact]) -> usize {
    artifacts.iter().map(CompactedArtifact::chars).sum()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Score descending, then offset ascending.
fn chunk_priority(a: &Chunk, b: &Chunk) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.offset.cmp(&b.offset))
}

/// Risk, contribution and best chunk score descending, then id ascending.
fn artifact_rank(a: &CompactedArtifact, b: &CompactedArtifact) -> Ordering {
    b.risk
        .total_cmp(&a.risk)
        .then_with(|| b.contribution.total_cmp(&a.contribution))
        .then_with(|| b.best_score().cmp(&a.best_score()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Keep the highest-priority chunks of `artifact` within `max_chars`.
///
/// The first chunk that does not fit is truncated into the remaining room,
/// so at least one chunk always survives.
fn trim_to_budget(artifact: &mut CompactedArtifact, max_chars: usize) -> Vec<ProvenanceEntry> {
    let mut entries = Vec::new();
    let mut chunks = std::mem::take(&mut artifact.chunks);
    chunks.sort_by(chunk_priority);

    let mut remaining = max_chars;
    let mut kept: Vec<Chunk> = Vec::new();
    for mut chunk in chunks {
        let len = chunk.text.chars().count();
        if len <= remaining {
            remaining -= len;
            kept.push(chunk);
        } else if remaining > 0 {
            chunk.text = truncate_chars(&chunk.text, remaining);
            entries.push(ProvenanceEntry::new(
                chunk.reference.as_str(),
                ProvenanceReason::BudgetExceeded,
                format!("truncated {len} to {remaining} chars"),
            ));
            remaining = 0;
            kept.push(chunk);
        } else {
            entries.push(ProvenanceEntry::new(
                chunk.reference.as_str(),
                ProvenanceReason::BudgetExceeded,
                format!("dropped {len} chars over total {max_chars}"),
            ));
        }
    }
    kept.sort_by_key(|c| c.offset);
    artifact.chunks = kept;
    entries
}

fn kind_slot(kind: ArtifactKind) -> EvidenceSlot {
    match kind {
        ArtifactKind::Body => EvidenceSlot::ContentIntent,
        ArtifactKind::Attachment => EvidenceSlot::AttachmentScan,
        ArtifactKind::FetchedPage => EvidenceSlot::UrlChain,
    }
}

/// Sum of breakdown contributions whose evidence lives in `slot`.
fn slot_contribution(slot: EvidenceSlot, breakdown: &[FactorContribution]) -> f64 {
    breakdown
        .iter()
        .filter(|f| {
            f.evidence
                .as_ref()
                .is_some_and(|id| id.as_str().starts_with(slot.as_str()))
        })
        .map(|f| f.contribution)
        .sum()
}

/// Steps 1 to 6 for one artifact. `None` when nothing is left to chunk.
fn prepare_artifact(
    artifact: &TextArtifact,
    breakdown: &[FactorContribution],
    config: &CompactionConfig,
    provenance: &mut Vec<ProvenanceEntry>,
) -> Option<CompactedArtifact> {
    let budget = &config.budget;
    let subject = EvidenceId::artifact(&artifact.id);

    let raw_len = artifact.text.chars().count();
    let mut text = if raw_len > budget.max_raw_chars {
        provenance.push(ProvenanceEntry::new(
            subject.as_str(),
            ProvenanceReason::RawTruncated,
            format!("kept {} of {raw_len} chars", budget.max_raw_chars),
        ));
        truncate_chars(&artifact.text, budget.max_raw_chars)
    } else {
        artifact.text.clone()
    };

    let mut chain = Vec::new();
    if artifact.markup || artifact.kind == ArtifactKind::FetchedPage {
        text = decode::strip_markup(&text);
        chain.push(STEP_STRIP_MARKUP.to_string());
    }

    let decoded = decode::decode_layers(
        &text,
        budget.max_decode_rounds,
        budget.max_base64_depth,
        budget.max_raw_chars,
    );
    chain.extend(decoded.chain);

    let redacted = redact_text(&decoded.text);
    let chunks: Vec<Chunk> = segment(&redacted, budget.max_snippet_chars)
        .into_iter()
        .map(|seg| Chunk {
            reference: ChunkRef::new(&artifact.id, seg.offset),
            offset: seg.offset,
            score: score_chunk(&seg.text, &config.relevance),
            text: seg.text,
        })
        .collect();

    if chunks.is_empty() {
        provenance.push(ProvenanceEntry::new(
            subject.as_str(),
            ProvenanceReason::EmptyArtifact,
            "no text left after decoding",
        ));
        return None;
    }

    Some(CompactedArtifact {
        id: artifact.id.clone(),
        kind: artifact.kind,
        risk: artifact.risk,
        contribution: slot_contribution(kind_slot(artifact.kind), breakdown),
        decode_chain: chain,
        chunks,
    })
}

/// Redacted summaries with breakdown evidence first, then bundle order.
fn candidate_signal_refs(bundle: &FrozenBundle, breakdown: &[FactorContribution]) -> Vec<SignalRef> {
    let described = bundle.describe();
    let mut ordered: Vec<SignalRef> = Vec::with_capacity(described.len());
    let mut seen: BTreeSet<EvidenceId> = BTreeSet::new();

    let prioritized = breakdown.iter().filter_map(|f| f.evidence.as_ref());
    for id in prioritized {
        if seen.contains(id) {
            continue;
        }
        if let Some((_, summary)) = described.iter().find(|(known, _)| known == id) {
            seen.insert(id.clone());
            ordered.push(SignalRef {
                id: id.clone(),
                summary: redact_text(summary),
            });
        }
    }
    for (id, summary) in &described {
        if seen.insert(id.clone()) {
            ordered.push(SignalRef {
                id: id.clone(),
                summary: redact_text(summary),
            });
        }
    }
    ordered
}

/// Project a frozen bundle into a bounded, redacted context.
///
/// `breakdown` is the fused score breakdown; it biases artifact ranking and
/// signal-ref order. Output is identical for identical inputs.
pub fn compact(
    bundle: &FrozenBundle,
    breakdown: &[FactorContribution],
    severity: Verdict,
    config: &CompactionConfig,
) -> CompactedContext {
    let mut provenance = Vec::new();
    let candidates: Vec<CompactedArtifact> = bundle
        .artifacts()
        .into_iter()
        .filter_map(|artifact| prepare_artifact(artifact, breakdown, config, &mut provenance))
        .collect();
    let signal_refs = candidate_signal_refs(bundle, breakdown);

    let mut context = CompactedContext::empty(severity, provenance);
    context.select(candidates, signal_refs, &config.budget);

    debug!(
        artifacts = context.artifacts.len(),
        chunks = context.chunk_count(),
        signal_refs = context.signal_refs.len(),
        total_chars = context.total_chars,
        provenance = context.provenance.len(),
        evidence_insufficient = context.evidence_insufficient,
        "evidence compacted"
    );
    context
}

// src/reconcile.rs

//! Duplicate person cleanup.
//!
//! Person records carry no unique email, so retries during registration can
//! leave several rows for one participant. A pass groups them by email, keeps
//! the oldest row, moves what it can from the others onto it and deletes them.
//! Every candidate is handled on its own: a failed step is recorded in the
//! report and the pass moves on.

use std::fmt;

use uuid::Uuid;

use crate::{
    error::StoreError,
    models::person::{EssayField, PersonFieldsUpdate, PersonRecord},
    store::FunnelStore,
};

/// Order in which merge candidates are applied to the canonical record.
/// Decides which candidate's essay wins when several have one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeOrder {
    /// Ascending creation time: the earliest duplicate's essay wins.
    #[default]
    OldestFirst,
    /// Descending creation time: the latest duplicate's essay wins.
    NewestFirst,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub order: MergeOrder,
}

/// Steps of a merge that can fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    LoadGroup,
    FindCanonicalScore,
    ReassignScores,
    MergeEssays,
    DeleteCandidate,
}

impl fmt::Display for MergeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeStep::LoadGroup => "load group",
            MergeStep::FindCanonicalScore => "find canonical score",
            MergeStep::ReassignScores => "reassign scores",
            MergeStep::MergeEssays => "merge essays",
            MergeStep::DeleteCandidate => "delete candidate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: MergeStep,
    pub message: String,
}

impl StepFailure {
    fn new(step: MergeStep, err: StoreError) -> Self {
        Self {
            step,
            message: err.to_string(),
        }
    }
}

/// What happened to the candidate's score rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreAction {
    /// Rows were re-pointed at the canonical record.
    Reassigned { rows: u64 },
    /// The canonical record had no score and neither did the candidate.
    NothingToMove,
    /// The canonical record already had a score; any candidate score is left
    /// pointing at the deleted candidate.
    CanonicalHasScore { score_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMerged {
    pub candidate_id: Uuid,
    pub score: ScoreAction,
    pub merged_fields: Vec<EssayField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub candidate_id: Uuid,
    pub failures: Vec<StepFailure>,
    /// Whether the candidate row was removed despite the failures.
    pub deleted: bool,
}

pub type CandidateResult = Result<CandidateMerged, CandidateFailure>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Merged {
        canonical_id: Uuid,
        candidates: Vec<CandidateResult>,
    },
    /// Fewer than two records were left by the time the group was loaded.
    Vanished,
    LoadFailed(StepFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub email: String,
    pub outcome: GroupOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub groups: Vec<GroupReport>,
}

impl ReconcileReport {
    pub fn candidates(&self) -> impl Iterator<Item = &CandidateResult> {
        self.groups.iter().flat_map(|g| match &g.outcome {
            GroupOutcome::Merged { candidates, .. } => candidates.as_slice(),
            _ => &[][..],
        })
    }

    pub fn merged_count(&self) -> usize {
        self.candidates().filter(|c| c.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.candidates().filter(|c| c.is_err()).count()
    }

    pub fn failed_groups(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::LoadFailed(_)))
            .count()
    }

    /// True when every group loaded and every candidate merged cleanly.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0 && self.failed_groups() == 0
    }
}

/// Runs one cleanup pass over `store`.
///
/// Only a failure to discover duplicate emails aborts the pass; everything
/// after that is recorded in the returned report.
pub async fn reconcile(
    store: &dyn FunnelStore,
    options: &ReconcileOptions,
) -> Result<ReconcileReport, StoreError> {
    tracing::info!("Searching for duplicate emails...");
    let emails = store.list_duplicate_emails().await.map_err(|e| {
        tracing::error!("Error finding duplicate emails: {}", e);
        e
    })?;

    if emails.is_empty() {
        tracing::info!("No duplicate emails found.");
        return Ok(ReconcileReport::default());
    }
    tracing::info!("Found {} duplicate email(s) to process.", emails.len());

    let mut report = ReconcileReport::default();
    for email in emails {
        let outcome = reconcile_group(store, &email, options).await;
        report.groups.push(GroupReport { email, outcome });
    }

    tracing::info!(
        groups = report.groups.len(),
        merged = report.merged_count(),
        failed = report.failed_count(),
        failed_groups = report.failed_groups(),
        "Cleanup pass finished"
    );
    Ok(report)
}

async fn reconcile_group(store: &dyn FunnelStore, email: &str, options: &ReconcileOptions) -> GroupOutcome {
    tracing::info!(email, "Processing duplicates");

    let mut persons = match store.find_persons_by_email(email).await {
        Ok(persons) => persons,
        Err(e) => {
            tracing::error!(email, "Error fetching persons: {}", e);
            return GroupOutcome::LoadFailed(StepFailure::new(MergeStep::LoadGroup, e));
        }
    };

    if persons.len() <= 1 {
        tracing::info!(email, "No duplicates left for email");
        return GroupOutcome::Vanished;
    }

    // The store returns oldest first; the canonical record is always the oldest.
    let mut canonical = persons.remove(0);
    if options.order == MergeOrder::NewestFirst {
        persons.reverse();
    }

    tracing::info!(
        canonical = %canonical.id,
        created_at = %canonical.created_at,
        duplicates = persons.len(),
        "Keeping oldest record"
    );

    let mut candidates = Vec::with_capacity(persons.len());
    for candidate in &persons {
        candidates.push(merge_candidate(store, &mut canonical, candidate).await);
    }

    GroupOutcome::Merged {
        canonical_id: canonical.id,
        candidates,
    }
}

async fn merge_candidate(
    store: &dyn FunnelStore,
    canonical: &mut PersonRecord,
    candidate: &PersonRecord,
) -> CandidateResult {
    tracing::info!(candidate = %candidate.id, canonical = %canonical.id, "Merging duplicate");
    let mut failures = Vec::new();

    // A failed lookup is treated like a missing score: try the move anyway.
    let existing = match store.find_score_by_person(canonical.id).await {
        Ok(existing) => existing,
        Err(e) => {
            tracing::error!(canonical = %canonical.id, "Error checking existing score: {}", e);
            failures.push(StepFailure::new(MergeStep::FindCanonicalScore, e));
            None
        }
    };

    let score = match existing {
        Some(score) => {
            tracing::info!(
                canonical = %canonical.id,
                score = %score.id,
                "Canonical record already has a score record, skipping update"
            );
            Some(ScoreAction::CanonicalHasScore { score_id: score.id })
        }
        None => match store.reassign_score_owner(candidate.id, canonical.id).await {
            Ok(0) => Some(ScoreAction::NothingToMove),
            Ok(rows) => {
                tracing::info!(from = %candidate.id, to = %canonical.id, rows, "Moved score records");
                Some(ScoreAction::Reassigned { rows })
            }
            Err(e) => {
                tracing::error!(candidate = %candidate.id, "Error updating scores: {}", e);
                failures.push(StepFailure::new(MergeStep::ReassignScores, e));
                None
            }
        },
    };

    let merged_fields = match merge_essays(store, canonical, candidate).await {
        Ok(fields) => fields,
        Err(e) => {
            tracing::error!(canonical = %canonical.id, "Error merging essay answers: {}", e);
            failures.push(StepFailure::new(MergeStep::MergeEssays, e));
            Vec::new()
        }
    };

    let deleted = match store.delete_person(candidate.id).await {
        Ok(()) => {
            tracing::info!(candidate = %candidate.id, "Deleted duplicate record");
            true
        }
        Err(e) => {
            tracing::error!(candidate = %candidate.id, "Error deleting duplicate: {}", e);
            failures.push(StepFailure::new(MergeStep::DeleteCandidate, e));
            false
        }
    };

    match score {
        Some(score) if failures.is_empty() => Ok(CandidateMerged {
            candidate_id: candidate.id,
            score,
            merged_fields,
        }),
        _ => Err(CandidateFailure {
            candidate_id: candidate.id,
            failures,
            deleted,
        }),
    }
}

/// Copies essays the canonical record lacks from `candidate`. On success the
/// local canonical copy is updated too, so a later candidate cannot replace
/// a value merged from an earlier one.
async fn merge_essays(
    store: &dyn FunnelStore,
    canonical: &mut PersonRecord,
    candidate: &PersonRecord,
) -> Result<Vec<EssayField>, StoreError> {
    let mut update = PersonFieldsUpdate::default();
    for field in EssayField::ALL {
        if canonical.essay(field).is_some() {
            continue;
        }
        if let Some(value) = candidate.essay(field) {
            update.set(field, value.to_string());
        }
    }

    if update.is_empty() {
        return Ok(Vec::new());
    }

    store.update_person_fields(canonical.id, &update).await?;

    let fields = update.fields();
    for field in &fields {
        if let Some(value) = update.get(*field) {
            tracing::info!(from = %candidate.id, field = field.key(), "Merged essay answer");
            canonical.set_essay(*field, value.to_string());
        }
    }
    Ok(fields)
}

//! Turns stage outcomes into the caller-facing result.

use crate::models::{
    ResolutionResult, ResolvedField, StageOutcome, StageOutcomes, StreetSuggestion,
};

fn field<T>(outcome: &StageOutcome<T>, name: impl Fn(&T) -> String) -> ResolvedField {
    match outcome {
        StageOutcome::Resolved(resolution) => ResolvedField {
            code: Some(resolution.code.clone()),
            name: Some(name(&resolution.value)),
            match_kind: resolution.match_kind,
            fallback: resolution.fallback,
            ambiguous: resolution.ambiguous,
            adapter_error: None,
        },
        StageOutcome::AdapterFailed(reason) => ResolvedField {
            adapter_error: Some(reason.clone()),
            ..ResolvedField::unresolved()
        },
        StageOutcome::Unresolved | StageOutcome::Skipped => ResolvedField::unresolved(),
    }
}

/// Map each stage outcome onto its result field. Never fails: a stage that
/// did not resolve leaves its code empty.
pub fn assemble(outcomes: &StageOutcomes) -> ResolutionResult {
    ResolutionResult {
        voivodeship: field(&outcomes.voivodeship, |u| u.name.clone()),
        county: field(&outcomes.county, |u| u.name.clone()),
        municipality: field(&outcomes.municipality, |u| u.name.clone()),
        locality: field(&outcomes.locality, |l| l.name.clone()),
        street: field(&outcomes.street, |s| s.full_name()),
        street_suggestions: outcomes
            .street_suggestions
            .iter()
            .map(StreetSuggestion::from)
            .collect(),
    }
}

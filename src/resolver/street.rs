//! Street stage: exact-only matching inside a resolved locality.

use tracing::{debug, warn};

use crate::models::{MatchKind, Resolution, StageOutcome, Street};
use crate::normalize::street_key;

/// Match `target` against the streets of one locality.
///
/// Returns the outcome and, when nothing matched, the full candidate list as
/// suggestions.
pub(crate) fn match_street(
    streets: Vec<Street>,
    target: &str,
) -> (StageOutcome<Street>, Vec<Street>) {
    let key = street_key(target);
    let matches: Vec<usize> = streets
        .iter()
        .enumerate()
        .filter(|(_, s)| s.spellings().iter().any(|name| street_key(name) == key))
        .map(|(idx, _)| idx)
        .collect();

    let Some(&first) = matches.first() else {
        debug!(
            stage = "street",
            street = target,
            "No exact street match among {} candidates",
            streets.len()
        );
        return (StageOutcome::Unresolved, streets);
    };
    let winner = &streets[first];

    let ambiguous = matches.len() > 1;
    if ambiguous {
        let codes: Vec<&str> = matches.iter().map(|&i| streets[i].code.as_str()).collect();
        warn!(
            stage = "street",
            candidate = %winner.full_name(),
            "Ambiguous street match, taking the first of {:?}",
            codes
        );
    }

    match winner.validated_code() {
        Ok(code) => (
            StageOutcome::Resolved(Resolution {
                code: code.to_string(),
                value: winner.clone(),
                match_kind: MatchKind::Exact,
                fallback: false,
                ambiguous,
            }),
            Vec::new(),
        ),
        Err(e) => {
            warn!(stage = "street", candidate = %winner.full_name(), "{}", e);
            (StageOutcome::Unresolved, Vec::new())
        }
    }
}

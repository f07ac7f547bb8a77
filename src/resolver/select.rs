//! Bucket classification and tie-break for name-matched candidates.

use crate::models::MatchKind;
use crate::normalize::normalize;

/// Comparison keys for one stage.
///
/// Primary keys are the stage's own name (plus alternates); secondary keys
/// are names that may coincide with it, such as a municipality named after
/// its seat locality. Within a bucket, primary hits beat secondary hits.
#[derive(Debug, Clone, Default)]
pub(crate) struct Targets {
    primary: Vec<String>,
    secondary: Vec<String>,
}

impl Targets {
    /// Keys are expected to be normalised already; blanks and duplicates
    /// are dropped.
    pub(crate) fn new(primary: Vec<String>, secondary: Vec<String>) -> Self {
        let mut keys = Self::default();
        for key in primary {
            push_key(&mut keys.primary, key);
        }
        for key in secondary {
            if !keys.primary.contains(&key) {
                push_key(&mut keys.secondary, key);
            }
        }
        keys
    }

    pub(crate) fn single(raw: &str) -> Self {
        Self::new(vec![normalize(raw)], Vec::new())
    }
}

fn push_key(keys: &mut Vec<String>, key: String) {
    if !key.is_empty() && !keys.contains(&key) {
        keys.push(key);
    }
}

/// Match of a normalised candidate name against a set of keys.
pub(crate) fn classify(candidate: &str, keys: &[String]) -> MatchKind {
    if keys.iter().any(|k| k == candidate) {
        return MatchKind::Exact;
    }
    if !candidate.is_empty()
        && keys
            .iter()
            .any(|k| k.contains(candidate) || candidate.contains(k.as_str()))
    {
        return MatchKind::Partial;
    }
    MatchKind::StructuralOnly
}

/// Candidates left after the bucket and key tie-breaks, in input order.
#[derive(Debug)]
pub(crate) struct Selection<'a, T> {
    pub match_kind: MatchKind,
    pub tied: Vec<&'a T>,
}

impl<'a, T> Selection<'a, T> {
    pub(crate) fn first(&self) -> &'a T {
        self.tied[0]
    }

    pub(crate) fn is_tied(&self) -> bool {
        self.tied.len() > 1
    }
}

/// Pick the strongest bucket (exact, then partial, then structural-only)
/// and, within it, prefer candidates that matched a primary key.
///
/// Returns `None` only when there are no candidates.
pub(crate) fn select<'a, T>(
    candidates: &'a [T],
    name: impl Fn(&T) -> &str,
    targets: &Targets,
) -> Option<Selection<'a, T>> {
    let scored: Vec<(&T, MatchKind, bool)> = candidates
        .iter()
        .map(|c| {
            let key = normalize(name(c));
            let primary = classify(&key, &targets.primary);
            let secondary = classify(&key, &targets.secondary);
            let kind = primary.min(secondary);
            (c, kind, primary == kind)
        })
        .collect();

    let best = scored.iter().map(|(_, kind, _)| *kind).min()?;
    let in_bucket: Vec<_> = scored
        .into_iter()
        .filter(|(_, kind, _)| *kind == best)
        .collect();

    let prefer_primary = in_bucket.iter().any(|(_, _, primary)| *primary);
    let tied = in_bucket
        .into_iter()
        .filter(|(_, _, primary)| *primary || !prefer_primary)
        .map(|(c, _, _)| c)
        .collect();

    Some(Selection {
        match_kind: best,
        tied,
    })
}

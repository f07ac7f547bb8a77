//! Stage outcomes and the assembled resolution result.

use serde::{Deserialize, Serialize};

use super::admin::AdministrativeUnit;
use super::locality::{Locality, Street};

/// How a stage's winning candidate matched the target name.
///
/// Variants are ordered from strongest to weakest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Normalised names are equal
    Exact,
    /// One normalised name contains the other
    Partial,
    /// Only the hierarchy filter matched
    StructuralOnly,
    Unresolved,
}

/// A winning candidate together with how it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub value: T,
    /// Validated code of `value`
    pub code: String,
    pub match_kind: MatchKind,
    /// Chosen through a fallback path (e.g. outside the resolved municipality)
    pub fallback: bool,
    /// Several candidates tied and the first one was taken
    pub ambiguous: bool,
}

/// Outcome of a single resolution stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Resolved(Resolution<T>),
    /// Nothing usable was found
    Unresolved,
    /// The registry failed; only recorded for non-fatal stages
    AdapterFailed(String),
    /// Not attempted (an earlier stage did not resolve, or not requested)
    Skipped,
}

impl<T> StageOutcome<T> {
    pub fn resolved(&self) -> Option<&Resolution<T>> {
        match self {
            StageOutcome::Resolved(resolution) => Some(resolution),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, StageOutcome::Resolved(_))
    }
}

/// Everything the resolver produced for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcomes {
    pub voivodeship: StageOutcome<AdministrativeUnit>,
    pub county: StageOutcome<AdministrativeUnit>,
    pub municipality: StageOutcome<AdministrativeUnit>,
    pub locality: StageOutcome<Locality>,
    pub street: StageOutcome<Street>,
    /// Street candidates offered when the street stage did not resolve
    pub street_suggestions: Vec<Street>,
}

impl Default for StageOutcomes {
    fn default() -> Self {
        Self {
            voivodeship: StageOutcome::Skipped,
            county: StageOutcome::Skipped,
            municipality: StageOutcome::Skipped,
            locality: StageOutcome::Skipped,
            street: StageOutcome::Skipped,
            street_suggestions: Vec::new(),
        }
    }
}

/// One field of the result: a code (if any) annotated with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Official registry name of the matched unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub match_kind: MatchKind,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ambiguous: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_error: Option<String>,
}

impl ResolvedField {
    pub fn unresolved() -> Self {
        Self {
            code: None,
            name: None,
            match_kind: MatchKind::Unresolved,
            fallback: false,
            ambiguous: false,
            adapter_error: None,
        }
    }
}

/// A street offered to the caller when the requested one was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetSuggestion {
    pub code: String,
    pub feature_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_as_of: Option<String>,
}

impl From<&Street> for StreetSuggestion {
    fn from(street: &Street) -> Self {
        Self {
            code: street.code.clone(),
            feature_type: street.feature_type.clone(),
            name: street.name(),
            valid_as_of: street.valid_as_of.clone(),
        }
    }
}

/// TERC/SIMC/ULIC codes for one query. Read-only once assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// 2 digits
    pub voivodeship: ResolvedField,
    /// 4 digits
    pub county: ResolvedField,
    /// 7 digits
    pub municipality: ResolvedField,
    /// SIMC, 7 digits
    pub locality: ResolvedField,
    /// ULIC, 5 digits
    pub street: ResolvedField,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub street_suggestions: Vec<StreetSuggestion>,
}

impl ResolutionResult {
    pub fn voivodeship_code(&self) -> Option<&str> {
        self.voivodeship.code.as_deref()
    }

    pub fn county_code(&self) -> Option<&str> {
        self.county.code.as_deref()
    }

    pub fn municipality_code(&self) -> Option<&str> {
        self.municipality.code.as_deref()
    }

    pub fn locality_code(&self) -> Option<&str> {
        self.locality.code.as_deref()
    }

    pub fn street_code(&self) -> Option<&str> {
        self.street.code.as_deref()
    }
}

//! Hierarchical resolver: voivodeship -> county -> municipality -> locality
//! -> street, each stage scoped by the codes resolved before it.

mod select;
mod street;

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

use self::select::{select, Selection, Targets};
use self::street::match_street;
use crate::error::RegistryError;
use crate::models::{
    AddressRecord, AdministrativeUnit, Locality, MatchKind, MunicipalityCode, Resolution, Stage,
    StageOutcome, StageOutcomes, Street,
};
use crate::normalize::{municipality_alternate, normalize};
use crate::registry::RegistryAdapter;

/// Names to resolve, as they appear in the postal-code table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTarget {
    pub voivodeship: String,
    pub county: String,
    pub municipality: String,
    pub locality: String,
    pub street: Option<String>,
}

impl ResolutionTarget {
    pub fn from_record(record: &AddressRecord, street: Option<&str>) -> Self {
        Self {
            voivodeship: record.voivodeship.clone(),
            county: record.county.clone(),
            municipality: record.municipality.clone(),
            locality: record.locality.clone(),
            street: street
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

/// Walks the registry hierarchy for one target at a time.
///
/// Holds no per-query state; one instance serves concurrent queries.
#[derive(Clone)]
pub struct HierarchicalResolver {
    registry: Arc<dyn RegistryAdapter>,
}

impl HierarchicalResolver {
    pub fn new(registry: Arc<dyn RegistryAdapter>) -> Self {
        Self { registry }
    }

    pub fn backend(&self) -> &'static str {
        self.registry.backend()
    }

    /// Resolve `target` against the registry as of `as_of`.
    ///
    /// Registry failures up to the municipality stage abort the query.
    /// Locality and street failures are recorded on their stage instead.
    pub async fn resolve(
        &self,
        target: &ResolutionTarget,
        as_of: NaiveDate,
    ) -> Result<StageOutcomes, RegistryError> {
        let mut outcomes = StageOutcomes::default();

        let voivodeships = self.registry.list_voivodeships(as_of).await?;
        outcomes.voivodeship = resolve_unit(
            Stage::Voivodeship,
            &voivodeships,
            &Targets::single(&target.voivodeship),
        );
        let Some(voivodeship) = resolved_unit(&outcomes.voivodeship) else {
            return Ok(outcomes);
        };

        let counties = self
            .registry
            .list_counties(&voivodeship.voivodeship, as_of)
            .await?;
        outcomes.county = resolve_unit(
            Stage::County,
            &counties,
            &Targets::single(&target.county),
        );
        let Some(county) = resolved_unit(&outcomes.county) else {
            return Ok(outcomes);
        };
        let county_segment = county.county.clone().unwrap_or_default();

        let municipalities = self
            .registry
            .list_municipalities(&voivodeship.voivodeship, &county_segment, as_of)
            .await?;
        outcomes.municipality = self
            .resolve_municipality(municipalities, target, as_of)
            .await;
        let Some(municipality) = outcomes
            .municipality
            .resolved()
            .and_then(|r| MunicipalityCode::try_from(&r.value).ok())
        else {
            return Ok(outcomes);
        };

        outcomes.locality = self.resolve_locality(&municipality, target, as_of).await;

        let Some(street) = target.street.as_deref() else {
            return Ok(outcomes);
        };
        if !outcomes.locality.is_resolved() {
            return Ok(outcomes);
        }

        let streets = match self.streets_of_locality(&outcomes, as_of).await {
            Ok(streets) => streets,
            Err(e) => {
                warn!(stage = "street", "Registry failed: {}", e);
                outcomes.street = StageOutcome::AdapterFailed(e.to_string());
                return Ok(outcomes);
            }
        };

        let (outcome, suggestions) = match_street(streets, street);
        outcomes.street = outcome;
        outcomes.street_suggestions = suggestions;
        Ok(outcomes)
    }

    /// Streets of the resolved locality. Empty when the locality did not
    /// resolve or the registry reports that it has none.
    pub async fn streets_of_locality(
        &self,
        outcomes: &StageOutcomes,
        as_of: NaiveDate,
    ) -> Result<Vec<Street>, RegistryError> {
        let (Some(municipality), Some(locality)) =
            (outcomes.municipality.resolved(), outcomes.locality.resolved())
        else {
            return Ok(Vec::new());
        };

        // A locality found outside the resolved municipality keeps its
        // streets under its own municipality code.
        let owner = match locality.value.municipality_code.parse::<MunicipalityCode>() {
            Ok(code) => code,
            Err(_) => match MunicipalityCode::try_from(&municipality.value) {
                Ok(code) => code,
                Err(_) => return Ok(Vec::new()),
            },
        };

        match self
            .registry
            .list_streets_for_locality(&owner, &locality.code, as_of)
            .await
        {
            Ok(streets) => Ok(streets),
            Err(RegistryError::NoStreetsFound { locality: code }) => {
                debug!(stage = "street", "No streets registered for {}", code);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_municipality(
        &self,
        candidates: Vec<AdministrativeUnit>,
        target: &ResolutionTarget,
        as_of: NaiveDate,
    ) -> StageOutcome<AdministrativeUnit> {
        let total = candidates.len();
        let candidates: Vec<AdministrativeUnit> = candidates
            .into_iter()
            .filter(AdministrativeUnit::has_numeric_kind)
            .collect();
        if candidates.len() < total {
            debug!(
                stage = "municipality",
                "Excluded {} candidates without a kind digit",
                total - candidates.len()
            );
        }

        let targets = Targets::new(
            vec![
                normalize(&target.municipality),
                municipality_alternate(&target.municipality),
            ],
            vec![normalize(&target.locality)],
        );
        let Some(selection) = select(&candidates, |u| u.name.as_str(), &targets) else {
            debug!(stage = "municipality", "No candidates");
            return StageOutcome::Unresolved;
        };

        if !selection.is_tied() {
            return finish_unit(
                Stage::Municipality,
                selection.first(),
                selection.match_kind,
                false,
            );
        }

        let hint = self
            .kind_hint(&target.locality, &selection.tied, as_of)
            .await;
        if let Some(hint) = hint.as_deref() {
            let hinted: Vec<&AdministrativeUnit> = selection
                .tied
                .iter()
                .copied()
                .filter(|u| u.kind.as_deref() == Some(hint))
                .collect();
            if let Some(&winner) = hinted.first() {
                debug!(
                    stage = "municipality",
                    candidate = %winner.name,
                    "Kind hint {} picked {}",
                    hint,
                    winner.raw_code()
                );
                return finish_unit(
                    Stage::Municipality,
                    winner,
                    selection.match_kind,
                    hinted.len() > 1,
                );
            }
        }

        warn_ambiguous(Stage::Municipality, &selection);
        finish_unit(
            Stage::Municipality,
            selection.first(),
            selection.match_kind,
            true,
        )
    }

    /// Kind digit of the tied candidate the locality belongs to, looked up
    /// by searching the locality name. Hits outside the tied candidates are
    /// ignored.
    async fn kind_hint(
        &self,
        locality: &str,
        tied: &[&AdministrativeUnit],
        as_of: NaiveDate,
    ) -> Option<String> {
        if locality.trim().is_empty() {
            return None;
        }
        let hits = match self.registry.search_localities_by_name(locality, as_of).await {
            Ok(hits) => hits,
            Err(e) => {
                debug!(stage = "municipality", "Kind hint lookup failed: {}", e);
                return None;
            }
        };

        let key = normalize(locality);
        let codes: Vec<String> = tied.iter().filter_map(|u| u.code().ok()).collect();
        let named: Vec<&Locality> = hits.iter().filter(|l| normalize(&l.name) == key).collect();

        // Full code first, then WOJ+POW+GMI when the kind digits disagree
        if let Some(hit) = named
            .iter()
            .find(|l| codes.contains(&l.municipality_code))
        {
            return hit.kind_hint.clone();
        }
        named
            .iter()
            .filter(|l| {
                let prefix = l.municipality_code.get(..6);
                prefix.is_some() && codes.iter().any(|c| c.get(..6) == prefix)
            })
            .find_map(|l| l.kind_hint.clone())
    }

    /// Exact locality name inside the municipality, then a locality named
    /// like the municipality, then the exact name anywhere in the registry.
    async fn resolve_locality(
        &self,
        municipality: &MunicipalityCode,
        target: &ResolutionTarget,
        as_of: NaiveDate,
    ) -> StageOutcome<Locality> {
        let key = normalize(&target.locality);
        let municipality_code = municipality.to_string();

        match self
            .registry
            .list_localities_in_municipality(municipality, as_of)
            .await
        {
            Ok(localities) => {
                let found = named_like(&localities, &[key.clone()]);
                if !found.is_empty() {
                    return finish_locality(&found, false);
                }

                let seat_keys = [
                    normalize(&target.municipality),
                    municipality_alternate(&target.municipality),
                ];
                let seat = named_like(&localities, &seat_keys);
                if let Some(first) = seat.first() {
                    info!(
                        stage = "locality",
                        candidate = %first.name,
                        code = %first.code,
                        "Locality '{}' not in municipality {}, using the municipality seat",
                        target.locality,
                        municipality_code
                    );
                    return finish_locality(&seat, true);
                }
            }
            Err(e) => {
                warn!(
                    stage = "locality",
                    "Listing localities of {} failed, searching by name: {}",
                    municipality_code,
                    e
                );
            }
        }

        let hits = match self
            .registry
            .search_localities_by_name(&target.locality, as_of)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(stage = "locality", "Registry failed: {}", e);
                return StageOutcome::AdapterFailed(e.to_string());
            }
        };
        let named = named_like(&hits, &[key]);

        let inside: Vec<&Locality> = named
            .iter()
            .copied()
            .filter(|l| l.municipality_code == municipality_code)
            .collect();
        if !inside.is_empty() {
            return finish_locality(&inside, false);
        }

        let Some(first) = named.first() else {
            debug!(stage = "locality", locality = %target.locality, "No locality found");
            return StageOutcome::Unresolved;
        };
        info!(
            stage = "locality",
            candidate = %first.name,
            code = %first.code,
            "Locality not in municipality {}, using match from {}",
            municipality_code,
            first.municipality_code
        );
        finish_locality(&named, true)
    }
}

/// Localities whose normalised name equals one of `keys`, in response order.
fn named_like<'a>(localities: &'a [Locality], keys: &[String]) -> Vec<&'a Locality> {
    localities
        .iter()
        .filter(|l| {
            let name = normalize(&l.name);
            keys.iter().any(|k| !k.is_empty() && *k == name)
        })
        .collect()
}

fn resolved_unit(outcome: &StageOutcome<AdministrativeUnit>) -> Option<AdministrativeUnit> {
    outcome.resolved().map(|r| r.value.clone())
}

fn resolve_unit(
    stage: Stage,
    candidates: &[AdministrativeUnit],
    targets: &Targets,
) -> StageOutcome<AdministrativeUnit> {
    let Some(selection) = select(candidates, |u| u.name.as_str(), targets) else {
        debug!(stage = %stage, "No candidates");
        return StageOutcome::Unresolved;
    };
    let ambiguous = selection.is_tied();
    if ambiguous {
        warn_ambiguous(stage, &selection);
    }
    finish_unit(stage, selection.first(), selection.match_kind, ambiguous)
}

fn warn_ambiguous(stage: Stage, selection: &Selection<'_, AdministrativeUnit>) {
    let codes: Vec<String> = selection.tied.iter().map(|u| u.raw_code()).collect();
    warn!(
        stage = %stage,
        candidate = %selection.first().name,
        "Ambiguous match, taking the first of {:?}",
        codes
    );
}

/// Validate the winner's code and wrap it up.
fn finish_unit(
    stage: Stage,
    winner: &AdministrativeUnit,
    match_kind: MatchKind,
    ambiguous: bool,
) -> StageOutcome<AdministrativeUnit> {
    let code = match winner.code() {
        Ok(code) => code,
        Err(e) => {
            warn!(stage = %stage, candidate = %winner.name, "{}", e);
            return StageOutcome::Unresolved;
        }
    };

    match match_kind {
        MatchKind::Partial => warn!(
            stage = %stage,
            candidate = %winner.name,
            code = %code,
            "Inexact (partial) name match"
        ),
        MatchKind::StructuralOnly => warn!(
            stage = %stage,
            candidate = %winner.name,
            code = %code,
            "No name match, taking the first unit in scope"
        ),
        _ => {}
    }

    StageOutcome::Resolved(Resolution {
        value: winner.clone(),
        code,
        match_kind,
        fallback: false,
        ambiguous,
    })
}

/// Take the first of `candidates`, flagging a tie.
fn finish_locality(candidates: &[&Locality], fallback: bool) -> StageOutcome<Locality> {
    let Some(&winner) = candidates.first() else {
        return StageOutcome::Unresolved;
    };

    let ambiguous = candidates.len() > 1;
    if ambiguous {
        let codes: Vec<&str> = candidates.iter().map(|l| l.code.as_str()).collect();
        warn!(
            stage = "locality",
            candidate = %winner.name,
            "Ambiguous match, taking the first of {:?}",
            codes
        );
    }

    match winner.validated_code() {
        Ok(code) => StageOutcome::Resolved(Resolution {
            code: code.to_string(),
            value: winner.clone(),
            match_kind: MatchKind::Exact,
            fallback,
            ambiguous,
        }),
        Err(e) => {
            warn!(stage = "locality", candidate = %winner.name, "{}", e);
            StageOutcome::Unresolved
        }
    }
}

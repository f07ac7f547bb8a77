//! Locality (SIMC) and street (ULIC) records.

use serde::{Deserialize, Serialize};

use super::admin::{is_code, MalformedCode, Stage};

/// A locality from SIMC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    /// SYM, 7 digits
    pub code: String,

    /// Registry name (NAZWA)
    pub name: String,

    /// Full 7-digit code of the municipality the locality belongs to
    pub municipality_code: String,

    /// Kind digit of the owning municipality (RODZ_GMI); tells the urban and
    /// rural parts of a municipality apart
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind_hint: Option<String>,

    /// SYMPOD, the parent locality for parts of a locality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_as_of: Option<String>,
}

impl Locality {
    pub fn new(code: &str, name: &str, municipality_code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            municipality_code: municipality_code.to_string(),
            kind_hint: municipality_code.get(6..7).map(String::from),
            parent_code: None,
            valid_as_of: None,
        }
    }

    pub fn validated_code(&self) -> Result<&str, MalformedCode> {
        if is_code(&self.code, 7) {
            Ok(&self.code)
        } else {
            Err(MalformedCode {
                stage: Stage::Locality,
                raw: self.code.clone(),
            })
        }
    }
}

/// A street from ULIC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Street {
    /// SYM_UL, 5 digits
    pub code: String,

    /// SYM of the locality
    pub locality_code: String,

    /// Full 7-digit municipality code
    pub municipality_code: String,

    /// CECHA, e.g. "ul.", "al.", "pl."
    pub feature_type: String,

    /// NAZWA_1
    pub name_1: String,

    /// NAZWA_2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_2: Option<String>,

    /// STAN_NA
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_as_of: Option<String>,

    /// Set when no locality in the snapshot matches `locality_code`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub orphan: bool,
}

impl Street {
    /// Street name without the feature type: NAZWA_1 followed by NAZWA_2.
    pub fn name(&self) -> String {
        join_words([Some(self.name_1.as_str()), self.name_2.as_deref()])
    }

    /// Street name with the feature type, e.g. "ul. Kwiatowa".
    pub fn full_name(&self) -> String {
        join_words([
            Some(self.feature_type.as_str()),
            Some(self.name_1.as_str()),
            self.name_2.as_deref(),
        ])
    }

    /// Every spelling this street may be asked for under: with and without
    /// the feature type, and with both orders of the two name parts.
    pub fn spellings(&self) -> Vec<String> {
        let mut names = vec![self.name()];
        if let Some(second) = self.name_2.as_deref().filter(|s| !s.trim().is_empty()) {
            names.push(join_words([Some(second), Some(self.name_1.as_str())]));
        }

        let mut spellings = Vec::with_capacity(names.len() * 2);
        for name in names {
            if !self.feature_type.trim().is_empty() {
                spellings.push(join_words([Some(self.feature_type.as_str()), Some(&name)]));
            }
            spellings.push(name);
        }
        spellings
    }

    pub fn validated_code(&self) -> Result<&str, MalformedCode> {
        if is_code(&self.code, 5) {
            Ok(&self.code)
        } else {
            Err(MalformedCode {
                stage: Stage::Street,
                raw: self.code.clone(),
            })
        }
    }
}

fn join_words<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

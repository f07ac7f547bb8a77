//! Address-side inputs: postal codes, reference rows and queries.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::ResolveError;

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}-[0-9]{3}$").expect("postal code pattern"));

/// Polish postal code in `DD-DDD` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let trimmed = raw.trim();
        if POSTAL_CODE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ResolveError::InvalidPostalCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

/// One row of the postal-code reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub postal_code: PostalCode,

    /// Clean locality name (the parenthesised part of the raw name, if any)
    pub locality: String,

    /// MIEJSCOWOŚĆ as found in the table
    pub raw_locality: String,

    pub voivodeship: String,
    pub county: String,
    pub municipality: String,

    /// ULICA: street the postal code is limited to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,

    /// NUMERY: house number ranges, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numbers: Option<String>,
}

impl AddressRecord {
    /// Names of the administrative columns that are blank.
    pub fn missing_names(&self) -> Vec<&'static str> {
        [
            ("voivodeship", &self.voivodeship),
            ("county", &self.county),
            ("municipality", &self.municipality),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// A caller's query: postal code, locality and an optional street.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressQuery {
    pub postal_code: String,
    pub locality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
}

impl AddressQuery {
    pub fn new(postal_code: &str, locality: &str, street: Option<&str>) -> Self {
        Self {
            postal_code: postal_code.trim().to_string(),
            locality: locality.trim().to_string(),
            street: street
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_code_format() {
        assert_eq!(PostalCode::parse(" 00-001 ").unwrap().as_str(), "00-001");
        assert!(PostalCode::parse("00001").is_err());
        assert!(PostalCode::parse("0-0001").is_err());
        assert!(PostalCode::parse("ab-cde").is_err());
        // Non-ASCII digits
        assert!(PostalCode::parse("٠٠-٠٠١").is_err());
        assert!(PostalCode::parse("００-００１").is_err());
    }

    #[test]
    fn test_query_drops_blank_street() {
        let q = AddressQuery::new("00-001", " Warszawa ", Some("  "));
        assert_eq!(q.locality, "Warszawa");
        assert!(q.street.is_none());
    }
}

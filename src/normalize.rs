//! Name normalisation for comparing reference-table names with registry names.
//!
//! Names coming from the postal-code table carry administrative prefixes
//! ("gmina", "powiat", "m. st."), parenthesised notes and trailing qualifiers
//! that the registry does not use. [`normalize`] reduces both sides to the
//! same comparison key.

use regex::Regex;
use std::sync::LazyLock;

static KIND_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(województwo|powiat|gmina|gm\.?|miasto|m\.\s?st\.|obszar wiejski)\s+")
        .expect("kind prefix pattern")
});
static PARENTHESISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("parenthesis pattern"));
static TRAILING_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-.*$").expect("qualifier pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static GM_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gm(\.\s*|\s+)").expect("gm prefix pattern"));
static FEATURE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\p{L}{1,5}\.)\s*").expect("street feature pattern")
});

/// Canonical comparison key for an administrative name.
///
/// Total and idempotent: blank input yields an empty string.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_once(raw);
    // A pass can expose another prefix ("(x) powiat y", "powiat powiat y");
    // passes after the first only ever remove text, so this terminates.
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let name = raw.trim().to_lowercase();
    let name = KIND_PREFIX.replace(&name, "");
    let name = strip_parenthesised(&name);
    let name = TRAILING_QUALIFIER.replace(&name, "");
    let name = WHITESPACE.replace_all(name.trim(), " ");
    name.trim().replace("m.st. ", "")
}

/// Remove parenthesised notes, innermost first so nested ones go whole.
fn strip_parenthesised(name: &str) -> String {
    let mut current = name.to_string();
    while PARENTHESISED.is_match(&current) {
        current = PARENTHESISED.replace_all(&current, "").into_owned();
    }
    current
}

/// Alternate municipality key: the normalised name without a leading
/// "gm."/"gm" token, which the registry omits where the postal table has it.
pub fn municipality_alternate(raw: &str) -> String {
    let normalized = normalize(raw);
    GM_PREFIX.replace(&normalized, "").trim().to_string()
}

/// Comparison key for a street: case-insensitive, whitespace collapsed, with
/// a space after a leading feature abbreviation ("ul.Kwiatowa").
pub fn street_key(raw: &str) -> String {
    let name = raw.trim().to_lowercase();
    let name = FEATURE_PREFIX.replace(&name, "$1 ");
    WHITESPACE.replace_all(name.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_kind_prefixes() {
        assert_eq!(normalize("województwo Mazowieckie"), "mazowieckie");
        assert_eq!(normalize("Mazowieckie"), "mazowieckie");
        assert_eq!(normalize("powiat nowodworski"), "nowodworski");
        assert_eq!(normalize("Gmina Zakroczym"), "zakroczym");
        assert_eq!(normalize("gm. Zakroczym"), "zakroczym");
        assert_eq!(normalize("Miasto Bolesławiec"), "bolesławiec");
        assert_eq!(normalize("m. st. Warszawa"), "warszawa");
        assert_eq!(normalize("M.st. Warszawa"), "warszawa");
        assert_eq!(normalize("obszar wiejski Zakroczym"), "zakroczym");
    }

    #[test]
    fn test_prefix_requires_whitespace() {
        assert_eq!(normalize("Powiatowa"), "powiatowa");
        assert_eq!(normalize("Gminna Wola"), "gminna wola");
    }

    #[test]
    fn test_removes_notes_and_qualifiers() {
        assert_eq!(normalize("Wólka (Wólka Pietrusza Wola)"), "wólka");
        assert_eq!(normalize("Zakroczym - obszar wiejski"), "zakroczym");
        assert_eq!(normalize("  Nowy   Dwór  Mazowiecki "), "nowy dwór mazowiecki");
        assert_eq!(normalize("Bielsko-Biała"), "bielsko-biała");
    }

    #[test]
    fn test_nested_parentheses() {
        assert_eq!(normalize("Kolonia (Stara (dawna) Wieś)"), "kolonia");
        assert_eq!(normalize("a (b (c) d) e"), "a e");
        // Unbalanced text is left alone
        assert_eq!(normalize("Kolonia (Stara"), "kolonia (stara");
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("()"), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "województwo Mazowieckie",
            "powiat powiat nowodworski",
            "(dawniej) gmina Zakroczym",
            "Wólka (Wólka Pietrusza Wola)",
            "m.st. m. st. Warszawa",
            "Zakroczym - miasto (część)",
            "  GM.   Zakroczym  ",
            "miasto",
            "gm. m.st. Warszawa",
            "Stare   Miasto  -  Północ",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_municipality_alternate() {
        assert_eq!(municipality_alternate("gm.Zakroczym"), "zakroczym");
        assert_eq!(municipality_alternate("gm. Zakroczym"), "zakroczym");
        assert_eq!(municipality_alternate("Gmach"), "gmach");
    }

    #[test]
    fn test_street_key() {
        assert_eq!(street_key("ul.Kwiatowa"), "ul. kwiatowa");
        assert_eq!(street_key("  UL.   Kwiatowa  Boczna"), "ul. kwiatowa boczna");
        assert_eq!(street_key("Kwiatowa"), "kwiatowa");
    }
}

//! Country/region name to ISO 3166-1 alpha-2 code lookup.
//!
//! Providers that localise results take a region code; it is derived from the
//! free-text location by matching known country names as whole words.

use std::sync::LazyLock;

use regex::Regex;

/// Longer names come first so "northern ireland" wins over "ireland".
const REGION_NAMES: &[(&str, &str)] = &[
    ("northern ireland", "GB"),
    ("united kingdom", "GB"),
    ("great britain", "GB"),
    ("united states", "US"),
    ("new zealand", "NZ"),
    ("netherlands", "NL"),
    ("australia", "AU"),
    ("scotland", "GB"),
    ("england", "GB"),
    ("germany", "DE"),
    ("belgium", "BE"),
    ("ireland", "IE"),
    ("canada", "CA"),
    ("france", "FR"),
    ("wales", "GB"),
    ("spain", "ES"),
    ("italy", "IT"),
    ("usa", "US"),
    ("uk", "GB"),
    ("gb", "GB"),
];

static REGION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    REGION_NAMES
        .iter()
        .filter_map(|(name, code)| {
            let pattern = format!(r"\b{}\b", regex::escape(name));
            Regex::new(&pattern).ok().map(|re| (re, *code))
        })
        .collect()
});

/// Region code for the first known country name found in `location`, if any.
#[must_use]
pub fn match_region_code(location: &str) -> Option<&'static str> {
    let lowered = location.to_lowercase();
    REGION_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(&lowered))
        .map(|(_, code)| *code)
}

/// Region code for `location`, falling back to `home_region`.
#[must_use]
pub fn region_code_for<'a>(location: &str, home_region: &'a str) -> &'a str {
    match_region_code(location).unwrap_or(home_region)
}

/// `true` if `part` is on its own a name for the United Kingdom.
pub(crate) fn is_uk_alias(part: &str) -> bool {
    matches!(
        part,
        "uk" | "gb" | "united kingdom" | "great britain" | "england" | "scotland" | "wales"
    )
}

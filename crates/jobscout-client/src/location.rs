//! United States detection for free-text job locations.

const US_STATE_NAMES: &[&str] = &[
    "alabama", "alaska", "arizona", "arkansas", "california", "colorado", "connecticut",
    "delaware", "florida", "georgia", "hawaii", "idaho", "illinois", "indiana", "iowa",
    "kansas", "kentucky", "louisiana", "maine", "maryland", "massachusetts", "michigan",
    "minnesota", "mississippi", "missouri", "montana", "nebraska", "nevada", "new hampshire",
    "new jersey", "new mexico", "new york", "north carolina", "north dakota", "ohio",
    "oklahoma", "oregon", "pennsylvania", "rhode island", "south carolina", "south dakota",
    "tennessee", "texas", "utah", "vermont", "virginia", "washington", "west virginia",
    "wisconsin", "wyoming", "district of columbia", "d.c.",
];

const US_COUNTRY_NAMES: &[&str] = &["united states", "usa", "u.s.a", "u.s."];

const US_STATE_ABBREVIATIONS: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

/// Whether a location string looks like it is in the United States.
///
/// State and country names match case-insensitively as whole words, so
/// "Jerusalem" does not read as "usa". Two-letter state codes only match as
/// whole upper-case tokens, so "Toronto, ON" and "Berlin" stay non-US while
/// "Austin, TX" is US.
pub fn is_us_location(location: &str) -> bool {
    let lower = location.to_lowercase();
    if US_STATE_NAMES
        .iter()
        .chain(US_COUNTRY_NAMES)
        .any(|name| contains_word(&lower, name))
    {
        return true;
    }

    location
        .split(|c: char| !c.is_ascii_alphabetic())
        .any(|token| US_STATE_ABBREVIATIONS.contains(&token))
}

/// `word` occurs in `text` with no letter or digit directly on either side.
fn contains_word(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

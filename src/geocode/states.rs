// file: src/geocode/states.rs
// description: US state abbreviation expansion used as a geocoding retry
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // ", NY" followed by whitespace or end of input
    static ref STATE_SUFFIX: Regex =
        Regex::new(r", ([A-Z]{2})(?:\s|$)").expect("STATE_SUFFIX regex is valid");
}

const STATE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    ("DC", "District of Columbia"),
];

pub fn state_name(abbreviation: &str) -> Option<&'static str> {
    STATE_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == abbreviation)
        .map(|(_, name)| *name)
}

/// Rewrites `"Austin, TX 78701"` as `"Austin, Texas 78701"`. Returns `None`
/// when the location carries no recognisable state abbreviation.
pub fn expand_state_abbreviation(location: &str) -> Option<String> {
    let captures = STATE_SUFFIX.captures(location)?;
    let abbreviation = captures.get(1)?;
    let full_name = state_name(abbreviation.as_str())?;

    let mut expanded = String::with_capacity(location.len() + full_name.len());
    expanded.push_str(&location[..abbreviation.start()]);
    expanded.push_str(full_name);
    expanded.push_str(&location[abbreviation.end()..]);
    Some(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_trailing_abbreviation() {
        assert_eq!(
            expand_state_abbreviation("Boise, ID").as_deref(),
            Some("Boise, Idaho")
        );
    }

    #[test]
    fn test_expand_abbreviation_before_zip() {
        assert_eq!(
            expand_state_abbreviation("123 Main St, Austin, TX 78701").as_deref(),
            Some("123 Main St, Austin, Texas 78701")
        );
    }

    #[test]
    fn test_expand_only_rewrites_matched_abbreviation() {
        assert_eq!(
            expand_state_abbreviation("12 Elm St, CAMDEN HILLS, Camden, ME").as_deref(),
            Some("12 Elm St, CAMDEN HILLS, Camden, Maine")
        );
        assert_eq!(
            expand_state_abbreviation("4 Oak Ln, MEADOWS, Bangor, ME 04401").as_deref(),
            Some("4 Oak Ln, MEADOWS, Bangor, Maine 04401")
        );
    }

    #[test]
    fn test_unknown_or_missing_abbreviation() {
        assert_eq!(expand_state_abbreviation("Toronto, ON"), None);
        assert_eq!(expand_state_abbreviation("Portland Oregon"), None);
        assert_eq!(expand_state_abbreviation("Miami, FLA"), None);
    }

    #[test]
    fn test_state_name_lookup() {
        assert_eq!(state_name("DC"), Some("District of Columbia"));
        assert_eq!(state_name("ZZ"), None);
    }
}

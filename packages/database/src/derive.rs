//! Derived columns computed from feed fields at write time.
//!
//! All local-time derivations use the single configured time zone so that
//! hour and date buckets stay comparable across the whole store.

use chrono::{DateTime, Timelike as _, Utc};
use chrono_tz::Tz;

/// Separators that split an intersection into its member streets.
const INTERSECTION_SEPARATORS: &[&str] = &["/", "&", " AND "];

/// Tokens that follow a house number in block-style addresses
/// (`"2600 BLOCK OF 8TH AVE S"`).
const BLOCK_TOKENS: &[&str] = &["BLOCK", "BLK"];

/// Derives the street grouping token from a free-text location.
///
/// Intersections keep only their first member; a leading house-number
/// token (digits, optionally a `-` range) is stripped along with any
/// `BLOCK OF` that follows it. Whitespace is collapsed. A location that is
/// nothing but a number is kept as-is rather than discarded.
#[must_use]
pub fn street(location: Option<&str>) -> Option<String> {
    let location = location?.trim();

    // ASCII uppercasing keeps byte offsets, so indices apply to `location`.
    let upper = location.to_ascii_uppercase();
    let first_member = INTERSECTION_SEPARATORS
        .iter()
        .filter_map(|sep| upper.find(sep))
        .min()
        .map_or(location, |idx| &location[..idx]);

    let tokens: Vec<&str> = first_member.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let mut rest = tokens.as_slice();
    if let [first, tail @ ..] = rest
        && is_house_number(first)
        && !tail.is_empty()
    {
        rest = tail;
        if let [block, tail @ ..] = rest
            && BLOCK_TOKENS.iter().any(|b| block.eq_ignore_ascii_case(b))
            && !tail.is_empty()
        {
            rest = tail;
            if let [of, tail @ ..] = rest
                && of.eq_ignore_ascii_case("OF")
                && !tail.is_empty()
            {
                rest = tail;
            }
        }
    }

    Some(rest.join(" "))
}

fn is_house_number(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '-')
}

/// Local hour-of-day (0-23) of `at` in `tz`.
#[must_use]
pub fn hour_bucket(at: DateTime<Utc>, tz: &Tz) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let hour = at.with_timezone(tz).hour() as u8;
    hour
}

/// Local calendar date (`YYYY-MM-DD`) of `at` in `tz`.
#[must_use]
pub fn local_date(at: DateTime<Utc>, tz: &Tz) -> String {
    at.with_timezone(tz).date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn strips_house_number() {
        assert_eq!(street(Some("2600 8TH AVE S")).as_deref(), Some("8TH AVE S"));
    }

    #[test]
    fn keeps_first_member_of_intersection() {
        assert_eq!(
            street(Some("CHARLOTTE AVE / 28TH AVE N")).as_deref(),
            Some("CHARLOTTE AVE")
        );
        assert_eq!(
            street(Some("BROADWAY & 5TH AVE")).as_deref(),
            Some("BROADWAY")
        );
        assert_eq!(
            street(Some("100 MAIN ST/ELM ST")).as_deref(),
            Some("MAIN ST")
        );
    }

    #[test]
    fn word_separator_ignores_case() {
        assert_eq!(
            street(Some("Main St and Elm St")).as_deref(),
            Some("Main St")
        );
        assert_eq!(
            street(Some("CHARLOTTE AVE And 28TH AVE N")).as_deref(),
            Some("CHARLOTTE AVE")
        );
        assert_eq!(street(Some("ANDERSON RD")).as_deref(), Some("ANDERSON RD"));
    }

    #[test]
    fn strips_block_prefix() {
        assert_eq!(
            street(Some("2600 BLOCK OF 8TH AVE S")).as_deref(),
            Some("8TH AVE S")
        );
        assert_eq!(street(Some("100-198 BLK MAIN ST")).as_deref(), Some("MAIN ST"));
    }

    #[test]
    fn numbered_street_without_house_number_is_kept() {
        assert_eq!(street(Some("8TH AVE S")).as_deref(), Some("8TH AVE S"));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(
            street(Some("  2600   8TH  AVE S ")).as_deref(),
            Some("8TH AVE S")
        );
    }

    #[test]
    fn degenerate_locations() {
        assert_eq!(street(None), None);
        assert_eq!(street(Some("   ")), None);
        assert_eq!(street(Some("123")).as_deref(), Some("123"));
    }

    #[test]
    fn buckets_use_local_time() {
        let tz: Tz = "America/Chicago".parse().unwrap();
        // 2024-01-15 03:30 UTC is 2024-01-14 21:30 CST.
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 3, 30, 0).unwrap();
        assert_eq!(hour_bucket(at, &tz), 21);
        assert_eq!(local_date(at, &tz), "2024-01-14");
    }

    #[test]
    fn buckets_follow_daylight_saving() {
        let tz: Tz = "America/Chicago".parse().unwrap();
        // 2024-07-15 03:30 UTC is 2024-07-14 22:30 CDT.
        let at = Utc.with_ymd_and_hms(2024, 7, 15, 3, 30, 0).unwrap();
        assert_eq!(hour_bucket(at, &tz), 22);
        assert_eq!(local_date(at, &tz), "2024-07-14");
    }
}

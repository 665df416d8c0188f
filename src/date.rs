use chrono::{
    format::{self, Parsed, StrftimeItems},
    NaiveDateTime,
};

/// Leading token of the `originalCreationDate` column, e.g. `Monday`.
const WEEKDAY_FORMAT: &str = "%A";

/// Layout of the rest of the column once any trailing zone is gone,
/// e.g. `January 2,2023 3:45 PM`.
const CATALOG_DATE_FORMAT: &str = "%B %d,%Y %I:%M %p";

/// Layout exiftool expects for DateTimeOriginal/CreateDate and friends.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BadDate {
    #[error("empty date")]
    Empty,
    #[error("unrecognised date `{input}`: {source}")]
    Unparseable {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
}

fn is_zone_abbreviation(token: &str) -> bool {
    token.chars().count() <= 5
        && token.chars().all(char::is_alphabetic)
        && !token.eq_ignore_ascii_case("am")
        && !token.eq_ignore_ascii_case("pm")
}

/// Convert a catalog date into an exif timestamp string.
///
/// A trailing zone abbreviation (`PST`, `BST`, ...) is dropped rather than
/// converted: the wall-clock time is what ends up in the file. The weekday must
/// be a weekday name but is not checked against the date.
pub fn parse_catalog_date(input: &str) -> Result<String, BadDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BadDate::Empty);
    }
    let unparseable = |source| BadDate::Unparseable {
        input: trimmed.to_owned(),
        source,
    };

    let mut tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.last().is_some_and(|last| is_zone_abbreviation(last)) {
        tokens.pop();
    }
    let (weekday, rest) = match tokens.split_first() {
        Some((weekday, rest)) => (*weekday, rest.join(" ")),
        None => ("", String::new()),
    };

    format::parse(&mut Parsed::new(), weekday, StrftimeItems::new(WEEKDAY_FORMAT))
        .map_err(unparseable)?;
    let date_time =
        NaiveDateTime::parse_from_str(&rest, CATALOG_DATE_FORMAT).map_err(unparseable)?;

    Ok(date_time.format(EXIF_DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_is_dropped() {
        assert_eq!(
            parse_catalog_date("Monday January 2,2023 3:45 PM PST").unwrap(),
            "2023:01:02 15:45:00"
        );
    }

    #[test]
    fn test_without_zone() {
        assert_eq!(
            parse_catalog_date("Tuesday March 5,2024 10:15 AM").unwrap(),
            "2024:03:05 10:15:00"
        );
    }

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!(
            parse_catalog_date("Sunday December 31,2023 12:05 AM GMT").unwrap(),
            "2023:12:31 00:05:00"
        );
        assert_eq!(
            parse_catalog_date("  Saturday July 4,2020 12:00 PM AKDT  ").unwrap(),
            "2020:07:04 12:00:00"
        );
    }

    #[test]
    fn test_empty_is_bad() {
        assert_eq!(parse_catalog_date(""), Err(BadDate::Empty));
        assert_eq!(parse_catalog_date("   \t"), Err(BadDate::Empty));
    }

    #[test]
    fn test_garbage_is_bad() {
        assert!(matches!(
            parse_catalog_date("not a date at all"),
            Err(BadDate::Unparseable { .. })
        ));
        assert!(matches!(
            parse_catalog_date("PST"),
            Err(BadDate::Unparseable { .. })
        ));
        assert!(matches!(
            parse_catalog_date("2023-01-02T15:45:00Z"),
            Err(BadDate::Unparseable { .. })
        ));
    }

    #[test]
    fn test_weekday_is_not_checked_against_date() {
        // 2024-03-05 was a Tuesday
        assert_eq!(
            parse_catalog_date("Monday March 5,2024 10:15 AM PST").unwrap(),
            "2024:03:05 10:15:00"
        );
        assert_eq!(
            parse_catalog_date("sun March 5,2024 10:15 AM").unwrap(),
            "2024:03:05 10:15:00"
        );
    }

    #[test]
    fn test_weekday_must_be_a_weekday_name() {
        assert!(matches!(
            parse_catalog_date("Funday March 5,2024 10:15 AM"),
            Err(BadDate::Unparseable { .. })
        ));
        assert!(matches!(
            parse_catalog_date("March 5,2024 10:15 AM"),
            Err(BadDate::Unparseable { .. })
        ));
    }

    #[test]
    fn test_impossible_day_is_bad() {
        assert!(matches!(
            parse_catalog_date("Friday February 30,2024 1:00 PM"),
            Err(BadDate::Unparseable { .. })
        ));
    }

    #[test]
    fn test_long_zone_name_is_kept_and_rejected() {
        // only short abbreviations are stripped
        assert!(parse_catalog_date("Monday January 2,2023 3:45 PM Pacific").is_err());
    }
}

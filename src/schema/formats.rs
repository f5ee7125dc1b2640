//! String format checks for `format` keywords

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

use super::types::Format;

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
static HOSTNAME: OnceLock<Option<Regex>> = OnceLock::new();
static URI: OnceLock<Option<Regex>> = OnceLock::new();
static UUID: OnceLock<Option<Regex>> = OnceLock::new();

/// Matches against a lazily compiled format regex.
fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

/// Checks whether a string satisfies a format.
pub fn conforms(format: Format, value: &str) -> bool {
    match format {
        Format::Email => matches(
            &EMAIL,
            r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$",
            value,
        ),
        Format::DateTime => DateTime::parse_from_rfc3339(value).is_ok(),
        Format::Date => {
            value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        }
        Format::Uuid => matches(
            &UUID,
            r"(?i)^(?:urn:uuid:)?[0-9a-f]{8}-(?:[0-9a-f]{4}-){3}[0-9a-f]{12}$",
            value,
        ),
        Format::Uri => matches(&URI, r"(?i)^[a-z][a-z0-9+.-]*:[^\s]*$", value),
        Format::Ipv4 => value.parse::<Ipv4Addr>().is_ok(),
        Format::Hostname => {
            value.len() <= 253
                && matches(
                    &HOSTNAME,
                    r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$",
                    value,
                )
        }
    }
}

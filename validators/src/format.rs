//! String format checkers for the `format` keyword.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(z|[+-]\d{2}(?::?\d{2})?)?$").expect("static regex must compile")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("static regex must compile")
});
static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("static regex must compile")
});
static URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:[^\s]*$").expect("static regex must compile"));
static URI_REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s]*$").expect("static regex must compile"));
static URI_TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[^\x00-\x20{}]|\{[^\x00-\x20{}]+\})*$").expect("static regex must compile"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:https?|ftp)://[^\s/$.?#][^\s]*$").expect("static regex must compile"));
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:urn:uuid:)?[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("static regex must compile")
});
static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("static regex must compile"));
static JSON_POINTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:/(?:[^~/]|~0|~1)*)*$").expect("static regex must compile"));
static RELATIVE_JSON_POINTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)$").expect("static regex must compile")
});

/// Formats understood by [`check_format`].
pub const KNOWN_FORMATS: &[&str] = &[
    "date",
    "time",
    "date-time",
    "email",
    "hostname",
    "ipv4",
    "ipv6",
    "uri",
    "uri-reference",
    "uri-template",
    "url",
    "uuid",
    "color",
    "json-pointer",
    "relative-json-pointer",
    "regex",
];

/// Checks `text` against a named format. Returns `None` for formats this
/// crate does not know.
///
/// # Examples
///
/// ```
/// use form_schema_validators::check_format;
///
/// assert_eq!(check_format("date", "2024-02-29"), Some(true));
/// assert_eq!(check_format("date", "2023-02-29"), Some(false));
/// assert_eq!(check_format("ipv4", "10.0.0.256"), Some(false));
/// assert_eq!(check_format("zip-code", "12345"), None);
/// ```
pub fn check_format(format: &str, text: &str) -> Option<bool> {
    let valid = match format {
        "date" => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
        "time" => is_time(text),
        "date-time" => DateTime::parse_from_rfc3339(text).is_ok(),
        "email" => EMAIL_RE.is_match(text),
        "hostname" => text.len() <= 253 && HOSTNAME_RE.is_match(text),
        "ipv4" => text.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => text.parse::<Ipv6Addr>().is_ok(),
        "uri" => URI_RE.is_match(text),
        "uri-reference" => URI_REFERENCE_RE.is_match(text),
        "uri-template" => URI_TEMPLATE_RE.is_match(text),
        "url" => URL_RE.is_match(text),
        "uuid" => UUID_RE.is_match(text),
        "color" => COLOR_RE.is_match(text),
        "json-pointer" => JSON_POINTER_RE.is_match(text),
        "relative-json-pointer" => RELATIVE_JSON_POINTER_RE.is_match(text),
        "regex" => Regex::new(text).is_ok(),
        _ => return None,
    };
    Some(valid)
}

fn is_time(text: &str) -> bool {
    let Some(captures) = TIME_RE.captures(text) else {
        return false;
    };
    let field = |index: usize| captures.get(index).and_then(|m| m.as_str().parse::<u32>().ok());
    let (Some(hour), Some(minute), Some(second)) = (field(1), field(2), field(3)) else {
        return false;
    };
    // leap seconds are written as :60
    let second = second.min(59);
    NaiveTime::from_hms_opt(hour, minute, second).is_some()
}

//! Validator combinators.
//!
//! A combinator evaluates its members without inversion first, then decides
//! its own verdict. A failing `allOf`/`anyOf` reports the members that
//! failed, or the inverted records of the passing members when it fails
//! under inversion. A failing `oneOf` reports both. When a failure has no
//! member record to report, a non-empty value gets an
//! [`ErrorRecord::Matched`] marker and an empty value passes: every member
//! accepts empty values either way.
//!
//! The focus validators follow the same rule, so a property that is absent,
//! or a value of another container type, fails them under inversion.

use serde_json::Value;

use crate::error::ErrorRecord;
use crate::validator::Validator;
use crate::value::is_empty;

fn active(validators: &[Validator]) -> Vec<Validator> {
    validators.iter().filter(|validator| !validator.is_null()).cloned().collect()
}

/// Splits members into the records of failing members and the members
/// that passed.
fn evaluate<'a>(members: &'a [Validator], value: Option<&Value>) -> (Vec<ErrorRecord>, Vec<&'a Validator>) {
    let mut failures = Vec::new();
    let mut passing = Vec::new();
    for member in members {
        match member.check(value, false) {
            Some(record) => failures.push(record),
            None => passing.push(member),
        }
    }
    (failures, passing)
}

fn inverted_records(passing: &[&Validator], value: Option<&Value>) -> Vec<ErrorRecord> {
    passing.iter().filter_map(|member| member.check(value, true)).collect()
}

/// Failure of `label` with nothing finer to report. Empty values pass.
pub(crate) fn matched(label: &str, value: Option<&Value>) -> Option<ErrorRecord> {
    (!is_empty(value)).then(|| ErrorRecord::Matched(label.to_string()))
}

pub(crate) fn verdict<W>(
    label: &str,
    value: Option<&Value>,
    valid: bool,
    invert: bool,
    records: Vec<ErrorRecord>,
    wrap: W,
) -> Option<ErrorRecord>
where
    W: FnOnce(Vec<ErrorRecord>) -> ErrorRecord,
{
    if valid != invert {
        None
    } else if records.is_empty() {
        matched(label, value)
    } else {
        Some(wrap(records))
    }
}

/// Valid when every member is valid.
///
/// # Examples
///
/// ```
/// use form_schema_validators::{all_of, max_length, min_length};
/// use serde_json::json;
///
/// let validator = all_of(vec![min_length(2), max_length(4)]);
/// assert!(validator.is_valid(&json!("abc")));
/// assert!(!validator.is_valid(&json!("abcde")));
/// ```
pub fn all_of(validators: Vec<Validator>) -> Validator {
    let members = active(&validators);
    match members.len() {
        0 => return Validator::null(),
        1 => return members.into_iter().next().unwrap_or_default(),
        _ => {}
    }
    Validator::new("allOf", move |value, invert| {
        let (failures, passing) = evaluate(&members, value);
        let valid = failures.is_empty();
        let records = if valid { inverted_records(&passing, value) } else { failures };
        verdict("allOf", value, valid, invert, records, ErrorRecord::AllOf)
    })
}

/// Valid when at least one member is valid. A null member accepts
/// everything, and so does the combinator.
pub fn any_of(validators: Vec<Validator>) -> Validator {
    if validators.is_empty() || validators.iter().any(Validator::is_null) {
        return Validator::null();
    }
    let members = validators;
    Validator::new("anyOf", move |value, invert| {
        let (failures, passing) = evaluate(&members, value);
        let valid = !passing.is_empty();
        let records = if valid { inverted_records(&passing, value) } else { failures };
        verdict("anyOf", value, valid, invert, records, ErrorRecord::AnyOf)
    })
}

/// Valid when exactly one member is valid. Null members count as passing.
///
/// # Examples
///
/// ```
/// use form_schema_validators::{max_length, min_length, one_of, pattern};
/// use serde_json::json;
///
/// let validator = one_of(vec![min_length(1), max_length(5), pattern("^z", false)]);
/// // "abc" satisfies both length rules
/// assert!(!validator.is_valid(&json!("abc")));
/// // "abcdefg" satisfies only minLength
/// assert!(validator.is_valid(&json!("abcdefg")));
/// ```
pub fn one_of(validators: Vec<Validator>) -> Validator {
    let members = active(&validators);
    let unconditional = validators.len() - members.len();
    if members.is_empty() && unconditional <= 1 {
        return Validator::null();
    }
    Validator::new("oneOf", move |value, invert| {
        let (failures, passing) = evaluate(&members, value);
        let valid = passing.len() + unconditional == 1;
        let mut records = failures;
        records.extend(inverted_records(&passing, value));
        verdict("oneOf", value, valid, invert, records, ErrorRecord::OneOf)
    })
}

/// Valid when `validator` is not. The member's own record is reported.
/// `not` of the null validator rejects every non-empty value.
pub fn not(validator: Validator) -> Validator {
    if validator.is_null() {
        return validator.negate();
    }
    Validator::new("not", move |value, invert| validator.check(value, !invert))
}

/// Applies `validator` to one property of an object value. The property is
/// passed as absent when the object lacks it; non-object values pass.
pub fn at_property(property: impl Into<String>, validator: Validator) -> Validator {
    if validator.is_null() {
        return validator;
    }
    let property = property.into();
    Validator::new("properties", move |value, invert| {
        let focus = |invert: bool| {
            let child = value?.as_object()?.get(&property);
            validator.check(child, invert).map(|error| ErrorRecord::Property {
                property: property.clone(),
                error: Box::new(error),
            })
        };
        match (focus(false), invert) {
            (None, false) | (Some(_), true) => None,
            (Some(failure), false) => Some(failure),
            (None, true) => focus(true).or_else(|| matched("properties", value)),
        }
    })
}

/// Applies `validator` to one position of an array value (a tuple slot).
/// Missing positions are passed as absent; non-array values pass.
pub fn at_index(index: usize, validator: Validator) -> Validator {
    if validator.is_null() {
        return validator;
    }
    Validator::new("items", move |value, invert| {
        let focus = |invert: bool| {
            let item = value?.as_array()?.get(index);
            validator.check(item, invert).map(|error| ErrorRecord::Item {
                index,
                error: Box::new(error),
            })
        };
        match (focus(false), invert) {
            (None, false) | (Some(_), true) => None,
            (Some(failure), false) => Some(failure),
            (None, true) => focus(true).or_else(|| matched("items", value)),
        }
    })
}

/// Applies `validator` to every item of an array value, starting at
/// position `from` (so it can follow a tuple as `additionalItems`).
pub fn every_item(from: usize, validator: Validator) -> Validator {
    if validator.is_null() {
        return validator;
    }
    Validator::new("items", move |value, invert| {
        let Some(items) = value.and_then(Value::as_array) else {
            return verdict("items", value, true, invert, Vec::new(), ErrorRecord::AllOf);
        };
        let check = |invert: bool| -> Vec<ErrorRecord> {
            items
                .iter()
                .enumerate()
                .skip(from)
                .filter_map(|(index, item)| {
                    validator.check(Some(item), invert).map(|error| ErrorRecord::Item {
                        index,
                        error: Box::new(error),
                    })
                })
                .collect()
        };
        let failures = check(false);
        let valid = failures.is_empty();
        let records = if valid { check(true) } else { failures };
        verdict("items", value, valid, invert, records, ErrorRecord::AllOf)
    })
}

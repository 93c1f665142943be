//! Validators for form controls.
//!
//! Each JSON Schema keyword a control can carry has a factory here
//! ([`min_length`], [`pattern`], [`dependencies`], ...) returning a
//! [`Validator`]. Validators compose with [`all_of`], [`any_of`],
//! [`one_of`] and [`not`], and [`schema_validator`] compiles a whole schema
//! node at once.
//!
//! A validator returns `None` for a valid value and an [`ErrorRecord`]
//! otherwise. Empty values (see [`is_empty`]) are valid for everything but
//! [`required`], so optional controls stay quiet until the user types.
//!
//! # Example
//!
//! ```
//! use form_schema_validators::*;
//! use serde_json::json;
//!
//! let zip = all_of(vec![required(true), pattern(r"\d{5}", true)]);
//! assert!(zip.is_valid(&json!("12345")));
//!
//! let record = zip.validate(Some(&json!("1234"))).unwrap();
//! assert_eq!(
//!     serde_json::to_value(&record).unwrap(),
//!     json!({ "allOf": [{ "pattern": { "requiredPattern": r"\d{5}", "currentValue": "1234" } }] })
//! );
//! ```

mod combinators;
mod compile;
mod error;
mod factory;
mod format;
mod validator;
mod value;

pub use combinators::{all_of, any_of, at_index, at_property, every_item, not, one_of};
pub use compile::schema_validator;
pub use error::{DependencyError, ErrorRecord};
pub use factory::{
    const_value, contains, dependencies, enum_values, exclusive_maximum, exclusive_minimum, format, from_keyword,
    max_items, max_length, max_properties, maximum, min_items, min_length, min_properties, minimum, multiple_of,
    pattern, required, type_of, unique_items,
};
pub use format::{KNOWN_FORMATS, check_format};
pub use validator::Validator;
pub use value::{has_value, is_empty, is_type, loose_equal};

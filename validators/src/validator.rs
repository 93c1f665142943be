use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::combinators::matched;
use crate::error::ErrorRecord;

type CheckFn = dyn Fn(Option<&Value>, bool) -> Option<ErrorRecord> + Send + Sync;

/// A compiled validation rule.
///
/// Calling [`check`](Self::check) with `invert = false` returns `None` when
/// the value is valid and an [`ErrorRecord`] otherwise. With `invert = true`
/// the verdict is flipped, which is how `not` is evaluated. Absent and empty
/// values are accepted either way (except by `required`). For any other value
/// exactly one of the two calls fails, unless the validator is
/// [`Validator::null`].
///
/// Validators are immutable and cheap to clone.
#[derive(Clone)]
pub struct Validator {
    label: &'static str,
    noop: bool,
    check: Arc<CheckFn>,
}

impl Validator {
    /// Wraps a check function. `label` names the keyword for debugging.
    pub fn new<F>(label: &'static str, check: F) -> Self
    where
        F: Fn(Option<&Value>, bool) -> Option<ErrorRecord> + Send + Sync + 'static,
    {
        Self {
            label,
            noop: false,
            check: Arc::new(check),
        }
    }

    /// A validator that accepts everything, inverted or not.
    pub fn null() -> Self {
        Self {
            label: "null",
            noop: true,
            check: Arc::new(|_, _| None),
        }
    }

    /// Returns `true` for [`Validator::null`].
    pub fn is_null(&self) -> bool {
        self.noop
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Runs the check, optionally inverted.
    pub fn check(&self, value: Option<&Value>, invert: bool) -> Option<ErrorRecord> {
        (self.check)(value, invert)
    }

    /// Runs the check without inversion.
    pub fn validate(&self, value: Option<&Value>) -> Option<ErrorRecord> {
        self.check(value, false)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(Some(value)).is_none()
    }

    /// A validator with the verdict of `self` flipped. The negation of
    /// [`Validator::null`] rejects every non-empty value.
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_validators::max_length;
    /// use serde_json::json;
    ///
    /// let at_least_four = max_length(3).negate();
    /// assert!(at_least_four.is_valid(&json!("long")));
    /// assert!(!at_least_four.is_valid(&json!("abc")));
    /// assert!(at_least_four.validate(None).is_none());
    /// ```
    pub fn negate(self) -> Self {
        if self.noop {
            return Self::new("not", |value, invert| if invert { None } else { matched("not", value) });
        }
        let label = self.label;
        Self::new(label, move |value, invert| self.check(value, !invert))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("label", &self.label)
            .field("null", &self.noop)
            .finish_non_exhaustive()
    }
}

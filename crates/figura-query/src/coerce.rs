//! Type coercion seam.
//!
//! Coercion is a collaborator, not a hard-wired step: the registry carries a
//! [`Coerce`] implementation and the argument resolver calls through it. The
//! shipped [`StrictCoercer`] does plain JSON type checks with no lossy
//! conversions; embedders with richer validation swap in their own.

use serde_json::Value;

use figura_schema::Validator;

use crate::error::ValidationError;

/// Turns a raw caller-supplied value into the typed value bound to SQL.
pub trait Coerce: Send + Sync {
    /// `array` is the declared arrayness of the argument: array arguments
    /// accept a list (coerced element-wise) or a single scalar; scalar
    /// arguments reject lists.
    fn coerce(
        &self,
        name: &str,
        validator: Validator,
        array: bool,
        raw: &Value,
    ) -> Result<Value, ValidationError>;
}

/// Default coercion: strict JSON type checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictCoercer;

impl Coerce for StrictCoercer {
    fn coerce(
        &self,
        name: &str,
        validator: Validator,
        array: bool,
        raw: &Value,
    ) -> Result<Value, ValidationError> {
        match raw {
            Value::Array(items) if array => items
                .iter()
                .map(|item| check_scalar(name, validator, item))
                .collect::<Result<Vec<Value>, ValidationError>>()
                .map(Value::Array),
            Value::Array(_) => Err(mismatch(name, validator)),
            scalar => check_scalar(name, validator, scalar),
        }
    }
}

fn check_scalar(name: &str, validator: Validator, value: &Value) -> Result<Value, ValidationError> {
    let ok = match validator {
        Validator::Any => true,
        Validator::String => value.is_string(),
        Validator::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
        Validator::Number => value.is_number(),
        Validator::Boolean => value.is_boolean(),
    };
    if ok {
        Ok(value.clone())
    } else {
        Err(mismatch(name, validator))
    }
}

fn mismatch(name: &str, validator: Validator) -> ValidationError {
    ValidationError::TypeMismatch {
        name: name.to_string(),
        expected: validator.token(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_check_against_their_token() {
        let c = StrictCoercer;
        assert_eq!(
            c.coerce("a", Validator::String, false, &json!("hi")).unwrap(),
            json!("hi")
        );
        assert_eq!(c.coerce("a", Validator::Integer, false, &json!(3)).unwrap(), json!(3));
        assert!(c.coerce("a", Validator::Integer, false, &json!("3")).is_err());
        assert!(c.coerce("a", Validator::String, false, &json!(3)).is_err());
        assert!(c.coerce("a", Validator::Boolean, false, &json!(1)).is_err());
    }

    #[test]
    fn array_arguments_coerce_element_wise() {
        let c = StrictCoercer;
        let coerced = c
            .coerce("a", Validator::String, true, &json!(["this", "that"]))
            .unwrap();
        assert_eq!(coerced, json!(["this", "that"]));

        let err = c
            .coerce("a", Validator::String, true, &json!(["this", 3]))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn array_arguments_accept_a_bare_scalar() {
        let c = StrictCoercer;
        assert_eq!(c.coerce("a", Validator::Integer, true, &json!(1)).unwrap(), json!(1));
    }

    #[test]
    fn scalar_arguments_reject_lists() {
        let c = StrictCoercer;
        assert!(c.coerce("r", Validator::String, false, &json!(["x"])).is_err());
    }
}

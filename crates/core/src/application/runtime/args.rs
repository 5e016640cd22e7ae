// Call arguments - typed access to the JSON object passed with a call

use crate::domain::{ProductKind, UserId};
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub(crate) struct Args<'a> {
    function: &'a str,
    fields: Map<String, Value>,
}

impl<'a> Args<'a> {
    /// `null` is accepted as an empty argument list
    pub(crate) fn new(function: &'a str, args: Value) -> Result<Self> {
        let fields = match args {
            Value::Null => Map::new(),
            Value::Object(fields) => fields,
            other => {
                return Err(AppError::Validation(format!(
                    "{}: arguments must be a JSON object, got {}",
                    function, other
                )))
            }
        };
        Ok(Self { function, fields })
    }

    fn invalid(&self, key: &str, reason: impl std::fmt::Display) -> AppError {
        AppError::Validation(format!("{}: invalid argument {}: {}", self.function, key, reason))
    }

    pub(crate) fn value<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.optional(key)?.ok_or_else(|| {
            AppError::Validation(format!("{}: missing argument {}", self.function, key))
        })
    }

    pub(crate) fn optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| self.invalid(key, e)),
        }
    }

    pub(crate) fn or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.optional(key)?.unwrap_or(default))
    }

    pub(crate) fn string(&self, key: &str) -> Result<String> {
        self.value(key)
    }

    pub(crate) fn user(&self) -> Result<UserId> {
        self.value("user")
    }

    /// Product kind flags given as their numeric bit set
    pub(crate) fn kinds(&self, key: &str) -> Result<ProductKind> {
        let bits: u32 = self.value(key)?;
        ProductKind::from_bits(bits).ok_or_else(|| self.invalid(key, "unknown product kind bits"))
    }

    /// Title id as a number or a hex string (`"0x1A2B3C4D"` or `"1A2B3C4D"`)
    pub(crate) fn title_id(&self, key: &str) -> Result<u32> {
        match self.value::<Value>(key)? {
            Value::String(hex) => {
                let digits = hex.trim().trim_start_matches("0x").trim_start_matches("0X");
                u32::from_str_radix(digits, 16).map_err(|e| self.invalid(key, e))
            }
            other => serde_json::from_value(other).map_err(|e| self.invalid(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_and_invalid_arguments() {
        let args = Args::new("f", json!({"user": "x", "count": 3})).unwrap();
        assert!(args.user().is_err());
        assert!(args.string("missing").is_err());
        assert_eq!(args.value::<i64>("count").unwrap(), 3);
        assert_eq!(args.or("absent", 7_i64).unwrap(), 7);
        assert!(Args::new("f", json!([1, 2])).is_err());
        assert!(Args::new("f", Value::Null).is_ok());
    }

    #[test]
    fn test_title_id_forms() {
        let args = Args::new("f", json!({"a": "0x0000FFFF", "b": "ffff", "c": 65535, "d": "zz"}))
            .unwrap();
        assert_eq!(args.title_id("a").unwrap(), 0xFFFF);
        assert_eq!(args.title_id("b").unwrap(), 0xFFFF);
        assert_eq!(args.title_id("c").unwrap(), 0xFFFF);
        assert!(args.title_id("d").is_err());
    }

    #[test]
    fn test_kinds_reject_unknown_bits() {
        let args = Args::new("f", json!({"ok": 3, "bad": 64})).unwrap();
        assert_eq!(
            args.kinds("ok").unwrap(),
            ProductKind::CONSUMABLE | ProductKind::DURABLE
        );
        assert!(args.kinds("bad").is_err());
    }
}

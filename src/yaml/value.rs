//! Typed coercion of scalar values.
//!
//! A [`ValueHolder`] wraps an optional scalar [`Value`] and converts it to
//! the requested type on demand. Every accessor has a default-taking form
//! that never fails: absent values, collections and impossible conversions
//! all yield the default.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use fyaml::{Number, Value};
use rust_decimal::Decimal;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Decoded binary payload (base64 text or `!!binary` scalar).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

/// Conversion from a stored scalar to a typed value.
pub trait FromScalar: Sized {
    /// Returns `None` when the value cannot be represented as `Self`.
    fn from_scalar(value: &Value) -> Option<Self>;
}

/// Strip scalar tags, keep the payload.
fn untagged(value: &Value) -> &Value {
    match value {
        Value::Tagged(t) => untagged(&t.value),
        other => other,
    }
}

/// String rendering of a scalar, `None` for null and collections.
fn scalar_text(value: &Value) -> Option<String> {
    match untagged(value) {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(Number::Int(i)) => Some(i.to_string()),
        Value::Number(Number::UInt(u)) => Some(u.to_string()),
        Value::Number(Number::Float(f)) => Some(f.to_string()),
        _ => None,
    }
}

fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    match s {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => s.parse::<f64>().ok(),
    }
}

fn as_i128(value: &Value) -> Option<i128> {
    match untagged(value) {
        Value::Number(Number::Int(i)) => Some(*i as i128),
        Value::Number(Number::UInt(u)) => Some(*u as i128),
        Value::Number(Number::Float(f)) => float_to_i128(*f),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i128>()
                .ok()
                .or_else(|| parse_float(s).and_then(float_to_i128))
        }
        _ => None,
    }
}

fn float_to_i128(f: f64) -> Option<i128> {
    // Bounds chosen so the truncated value always fits.
    if f.is_finite() && f > -1.7e38 && f < 1.7e38 {
        Some(f.trunc() as i128)
    } else {
        None
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match untagged(value) {
        Value::Number(Number::Int(i)) => Some(*i as f64),
        Value::Number(Number::UInt(u)) => Some(*u as f64),
        Value::Number(Number::Float(f)) => Some(*f),
        Value::String(s) => parse_float(s),
        _ => None,
    }
}

impl FromScalar for String {
    fn from_scalar(value: &Value) -> Option<Self> {
        scalar_text(value)
    }
}

impl FromScalar for i32 {
    fn from_scalar(value: &Value) -> Option<Self> {
        as_i128(value).and_then(|v| i32::try_from(v).ok())
    }
}

impl FromScalar for i64 {
    fn from_scalar(value: &Value) -> Option<Self> {
        as_i128(value).and_then(|v| i64::try_from(v).ok())
    }
}

impl FromScalar for i128 {
    fn from_scalar(value: &Value) -> Option<Self> {
        as_i128(value)
    }
}

impl FromScalar for f64 {
    fn from_scalar(value: &Value) -> Option<Self> {
        as_f64(value)
    }
}

impl FromScalar for f32 {
    fn from_scalar(value: &Value) -> Option<Self> {
        as_f64(value).map(|f| f as f32)
    }
}

impl FromScalar for Decimal {
    fn from_scalar(value: &Value) -> Option<Self> {
        match untagged(value) {
            Value::Number(Number::Int(i)) => Some(Decimal::from(*i)),
            Value::Number(Number::UInt(u)) => Some(Decimal::from(*u)),
            Value::Number(Number::Float(f)) => Decimal::try_from(*f).ok(),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<Decimal>()
                    .ok()
                    .or_else(|| Decimal::from_scientific(s).ok())
            }
            _ => None,
        }
    }
}

impl FromScalar for bool {
    fn from_scalar(value: &Value) -> Option<Self> {
        match untagged(value) {
            Value::Bool(b) => Some(*b),
            Value::Number(Number::Int(i)) => Some(*i != 0),
            Value::Number(Number::UInt(u)) => Some(*u != 0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromScalar for Vec<u8> {
    fn from_scalar(value: &Value) -> Option<Self> {
        scalar_text(value).map(String::into_bytes)
    }
}

impl FromScalar for Blob {
    fn from_scalar(value: &Value) -> Option<Self> {
        let text = match untagged(value) {
            Value::String(s) => s,
            _ => return None,
        };
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).ok().map(Blob)
    }
}

impl FromScalar for OffsetDateTime {
    fn from_scalar(value: &Value) -> Option<Self> {
        match untagged(value) {
            Value::Number(Number::Int(secs)) => OffsetDateTime::from_unix_timestamp(*secs).ok(),
            Value::Number(Number::UInt(secs)) => i64::try_from(*secs)
                .ok()
                .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok()),
            Value::String(s) => {
                let s = s.trim();
                if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
                    return Some(dt);
                }
                Date::parse(s, format_description!("[year]-[month]-[day]"))
                    .ok()
                    .map(|d| d.midnight().assume_utc())
            }
            _ => None,
        }
    }
}

/// Typed view over an optional scalar value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueHolder {
    value: Option<Value>,
}

impl ValueHolder {
    pub fn new(value: Option<Value>) -> Self {
        Self { value }
    }

    pub fn empty() -> Self {
        Self { value: None }
    }

    /// The stored value, if any.
    pub fn raw(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// True when nothing usable is stored (absent or null).
    pub fn is_empty(&self) -> bool {
        matches!(self.value.as_ref().map(untagged), None | Some(Value::Null))
    }

    pub fn get<T: FromScalar>(&self) -> Option<T> {
        self.value.as_ref().and_then(T::from_scalar)
    }

    pub fn get_or<T: FromScalar>(&self, default: T) -> T {
        self.get().unwrap_or(default)
    }

    pub fn string_or(&self, default: &str) -> String {
        self.get().unwrap_or_else(|| default.to_string())
    }

    pub fn int_or(&self, default: i32) -> i32 {
        self.get_or(default)
    }

    pub fn long_or(&self, default: i64) -> i64 {
        self.get_or(default)
    }

    pub fn big_int_or(&self, default: i128) -> i128 {
        self.get_or(default)
    }

    pub fn double_or(&self, default: f64) -> f64 {
        self.get_or(default)
    }

    pub fn float_or(&self, default: f32) -> f32 {
        self.get_or(default)
    }

    pub fn decimal_or(&self, default: Decimal) -> Decimal {
        self.get_or(default)
    }

    pub fn bytes_or(&self, default: Vec<u8>) -> Vec<u8> {
        self.get_or(default)
    }

    pub fn date_or(&self, default: OffsetDateTime) -> OffsetDateTime {
        self.get_or(default)
    }

    pub fn blob_or(&self, default: Blob) -> Blob {
        self.get_or(default)
    }

    pub fn bool_or(&self, default: bool) -> bool {
        self.get_or(default)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fyaml::TaggedValue;
    use std::str::FromStr;
    use time::macros::datetime;

    fn holder(value: Value) -> ValueHolder {
        ValueHolder::new(Some(value))
    }

    fn s(text: &str) -> ValueHolder {
        holder(Value::String(text.to_string()))
    }

    #[test]
    fn test_empty_holder_returns_defaults() {
        let h = ValueHolder::empty();
        assert!(h.is_empty());
        assert_eq!(h.string_or("dflt"), "dflt");
        assert_eq!(h.int_or(7), 7);
        assert!(h.bool_or(true));
        assert_eq!(h.get::<f64>(), None);
    }

    #[test]
    fn test_null_is_absent() {
        let h = holder(Value::Null);
        assert!(h.is_empty());
        assert_eq!(h.string_or("x"), "x");
        assert_eq!(h.long_or(-1), -1);
    }

    #[test]
    fn test_collections_are_not_scalars() {
        let h = holder(Value::Sequence(vec![Value::Bool(true)]));
        assert_eq!(h.string_or("d"), "d");
        assert!(!h.bool_or(false));
        let h = holder(Value::Mapping(Default::default()));
        assert_eq!(h.int_or(3), 3);
    }

    #[test]
    fn test_string_from_scalars() {
        assert_eq!(holder(Value::Number(Number::Int(-4))).string_or(""), "-4");
        assert_eq!(holder(Value::Bool(false)).string_or(""), "false");
        assert_eq!(s("plain").string_or(""), "plain");
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(holder(Value::Number(Number::Int(42))).int_or(0), 42);
        assert_eq!(holder(Value::Number(Number::UInt(42))).int_or(0), 42);
        assert_eq!(s(" 12 ").int_or(0), 12);
        // lossy: floats truncate toward zero
        assert_eq!(holder(Value::Number(Number::Float(3.9))).int_or(0), 3);
        assert_eq!(s("-2.5").int_or(0), -2);
    }

    #[test]
    fn test_int_coercion_failures() {
        assert_eq!(s("twelve").int_or(9), 9);
        assert_eq!(holder(Value::Number(Number::Int(i64::MAX))).int_or(9), 9);
        assert_eq!(holder(Value::Number(Number::Float(f64::NAN))).int_or(9), 9);
        assert_eq!(holder(Value::Bool(true)).int_or(9), 9);
    }

    #[test]
    fn test_long_and_big_int() {
        assert_eq!(
            holder(Value::Number(Number::Int(i64::MAX))).long_or(0),
            i64::MAX
        );
        assert_eq!(holder(Value::Number(Number::UInt(u64::MAX))).long_or(5), 5);
        assert_eq!(
            holder(Value::Number(Number::UInt(u64::MAX))).big_int_or(0),
            u64::MAX as i128
        );
        assert_eq!(
            s("170141183460469231731687303715884105727").big_int_or(0),
            i128::MAX
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(holder(Value::Number(Number::Int(2))).double_or(0.0), 2.0);
        assert_eq!(s("1.25").float_or(0.0), 1.25f32);
        assert_eq!(s(".inf").double_or(0.0), f64::INFINITY);
        assert!(s(".nan").double_or(0.0).is_nan());
        assert_eq!(s("abc").double_or(0.5), 0.5);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(
            s("10.25").decimal_or(Decimal::ZERO),
            Decimal::from_str("10.25").unwrap()
        );
        assert_eq!(
            s("1.5e2").decimal_or(Decimal::ZERO),
            Decimal::from_str("150").unwrap()
        );
        assert_eq!(
            holder(Value::Number(Number::Int(3))).decimal_or(Decimal::ZERO),
            Decimal::from(3)
        );
        assert_eq!(s("nope").decimal_or(Decimal::ONE), Decimal::ONE);
    }

    #[test]
    fn test_bool() {
        assert!(s("Yes").bool_or(false));
        assert!(s("on").bool_or(false));
        assert!(!s("OFF").bool_or(true));
        assert!(holder(Value::Number(Number::Int(2))).bool_or(false));
        assert!(!holder(Value::Number(Number::Int(0))).bool_or(true));
        assert!(s("maybe").bool_or(true));
        assert!(!s("maybe").bool_or(false));
    }

    #[test]
    fn test_bytes() {
        assert_eq!(s("abc").bytes_or(vec![]), b"abc".to_vec());
        assert_eq!(
            holder(Value::Number(Number::Int(12))).bytes_or(vec![]),
            b"12".to_vec()
        );
    }

    #[test]
    fn test_blob() {
        assert_eq!(s("aGVsbG8=").blob_or(Blob::default()).0, b"hello".to_vec());
        assert_eq!(
            s("aGVs\n bG8=").blob_or(Blob::default()).as_bytes(),
            b"hello"
        );
        assert_eq!(s("%%%").blob_or(Blob(vec![1])), Blob(vec![1]));
    }

    #[test]
    fn test_tagged_scalar_is_unwrapped() {
        let h = holder(Value::Tagged(Box::new(TaggedValue {
            tag: "tag:yaml.org,2002:binary".to_string(),
            value: Value::String("aGk=".to_string()),
        })));
        assert_eq!(h.blob_or(Blob::default()).into_inner(), b"hi".to_vec());
        assert_eq!(h.string_or(""), "aGk=");
    }

    #[test]
    fn test_dates() {
        let dflt = datetime!(2000-01-01 0:00 UTC);
        assert_eq!(
            s("2024-05-06T07:08:09Z").date_or(dflt),
            datetime!(2024-05-06 7:08:09 UTC)
        );
        assert_eq!(s("2024-05-06").date_or(dflt), datetime!(2024-05-06 0:00 UTC));
        assert_eq!(
            holder(Value::Number(Number::Int(0))).date_or(dflt),
            datetime!(1970-01-01 0:00 UTC)
        );
        assert_eq!(s("yesterday").date_or(dflt), dflt);
    }
}

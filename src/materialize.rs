//! The structural-decoder boundary: canonical string/null maps into typed
//! records via serde.
//!
//! When a target record shape is supplied the column decoder hands every
//! cell over as a string-or-null JSON value; final type coercion happens
//! here. Weak typing (on by default) lets `"42"` populate an integer field
//! and `"1"` a boolean, matching what loosely-typed drivers deliver. A
//! decode hook can rewrite individual column values before
//! deserialization. Each row populates a fresh record; the first failing
//! row aborts the whole call.

use std::fmt;
use std::sync::Arc;

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::SqlFetchError;

/// Per-column rewrite applied before deserialization. Receives the column
/// name and its string-or-null value; returns the value to decode.
pub type DecodeHook =
    Arc<dyn Fn(&str, JsonValue) -> Result<JsonValue, SqlFetchError> + Send + Sync>;

/// Configuration for the structural decoder.
#[derive(Clone)]
pub struct DecodeConfig {
    /// Coerce strings/numbers/bools into each other as the target field
    /// demands. Enabled by default.
    pub weak_typing: bool,
    /// Optional per-column rewrite.
    pub hook: Option<DecodeHook>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            weak_typing: true,
            hook: None,
        }
    }
}

impl fmt::Debug for DecodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeConfig")
            .field("weak_typing", &self.weak_typing)
            .field("hook", &self.hook.as_ref().map(|_| "..."))
            .finish()
    }
}

impl DecodeConfig {
    /// Exact-type decoding with no coercions.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            weak_typing: false,
            hook: None,
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: DecodeHook) -> Self {
        self.hook = Some(hook);
        self
    }
}

/// Populate one record from one row's string-or-null map.
///
/// # Errors
///
/// Returns [`SqlFetchError::Structural`] when the hook or deserialization
/// rejects the row.
pub(crate) fn materialize<T: DeserializeOwned>(
    mut fields: JsonMap<String, JsonValue>,
    config: &DecodeConfig,
) -> Result<T, SqlFetchError> {
    if let Some(hook) = &config.hook {
        let mut rewritten = JsonMap::with_capacity(fields.len());
        for (name, value) in std::mem::take(&mut fields) {
            let value = hook(&name, value)?;
            rewritten.insert(name, value);
        }
        fields = rewritten;
    }
    let value = JsonValue::Object(fields);
    let decoded = if config.weak_typing {
        T::deserialize(WeakValue(value))
    } else {
        T::deserialize(value)
    };
    decoded.map_err(|e| SqlFetchError::Structural(e.to_string()))
}

/// A `serde_json::Value` deserializer with weak-typing coercions layered
/// over the typed entry points. Anything it does not coerce is delegated
/// to the value's own deserializer.
struct WeakValue(JsonValue);

type JsonError = serde_json::Error;

impl<'de> IntoDeserializer<'de, JsonError> for WeakValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! weak_integer {
    ($method:ident, $visit:ident, $ty:ty, $delegate:ident) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
            match self.0 {
                JsonValue::String(s) => {
                    let parsed: $ty = s.trim().parse().map_err(|_| {
                        de::Error::custom(format!(
                            "cannot coerce '{s}' into {}",
                            stringify!($ty)
                        ))
                    })?;
                    visitor.$visit(parsed)
                }
                JsonValue::Bool(b) => visitor.$visit(if b { 1 } else { 0 }),
                JsonValue::Null => visitor.$visit(0),
                other => other.$delegate(visitor),
            }
        }
    };
}

macro_rules! weak_float {
    ($method:ident, $visit:ident, $ty:ty, $delegate:ident) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
            match self.0 {
                JsonValue::String(s) => {
                    let parsed: $ty = s.trim().parse().map_err(|_| {
                        de::Error::custom(format!(
                            "cannot coerce '{s}' into {}",
                            stringify!($ty)
                        ))
                    })?;
                    visitor.$visit(parsed)
                }
                JsonValue::Bool(b) => visitor.$visit(if b { 1.0 } else { 0.0 }),
                JsonValue::Null => visitor.$visit(0.0),
                other => other.$delegate(visitor),
            }
        }
    };
}

impl<'de> Deserializer<'de> for WeakValue {
    type Error = JsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        self.0.deserialize_any(visitor)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.0 {
            JsonValue::String(s) => match s.trim() {
                "true" | "TRUE" | "True" | "1" => visitor.visit_bool(true),
                "false" | "FALSE" | "False" | "0" | "" => visitor.visit_bool(false),
                other => Err(de::Error::custom(format!(
                    "cannot coerce '{other}' into a bool"
                ))),
            },
            JsonValue::Number(n) => visitor.visit_bool(n.as_f64().is_some_and(|f| f != 0.0)),
            JsonValue::Null => visitor.visit_bool(false),
            other => other.deserialize_bool(visitor),
        }
    }

    weak_integer!(deserialize_i8, visit_i8, i8, deserialize_i8);
    weak_integer!(deserialize_i16, visit_i16, i16, deserialize_i16);
    weak_integer!(deserialize_i32, visit_i32, i32, deserialize_i32);
    weak_integer!(deserialize_i64, visit_i64, i64, deserialize_i64);
    weak_integer!(deserialize_u8, visit_u8, u8, deserialize_u8);
    weak_integer!(deserialize_u16, visit_u16, u16, deserialize_u16);
    weak_integer!(deserialize_u32, visit_u32, u32, deserialize_u32);
    weak_integer!(deserialize_u64, visit_u64, u64, deserialize_u64);

    weak_float!(deserialize_f32, visit_f32, f32, deserialize_f32);
    weak_float!(deserialize_f64, visit_f64, f64, deserialize_f64);

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.0 {
            JsonValue::String(s) => visitor.visit_string(s),
            JsonValue::Number(n) => visitor.visit_string(n.to_string()),
            JsonValue::Bool(b) => visitor.visit_string(b.to_string()),
            JsonValue::Null => visitor.visit_string(String::new()),
            other => other.deserialize_string(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.0 {
            JsonValue::Null => visitor.visit_none(),
            value => visitor.visit_some(WeakValue(value)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.0 {
            JsonValue::Array(items) => {
                SeqDeserializer::new(items.into_iter().map(WeakValue)).deserialize_any(visitor)
            }
            other => other.deserialize_seq(visitor),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, JsonError> {
        match self.0 {
            JsonValue::Object(map) => {
                let access =
                    MapDeserializer::new(map.into_iter().map(|(key, value)| (key, WeakValue(value))));
                visitor.visit_map(access)
            }
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, JsonError> {
        match self.0 {
            JsonValue::String(s) => visitor.visit_enum(s.into_deserializer()),
            other => other.deserialize_enum(name, variants, visitor),
        }
    }

    serde::forward_to_deserialize_any! {
        char bytes byte_buf unit unit_struct tuple tuple_struct identifier
        ignored_any
    }
}

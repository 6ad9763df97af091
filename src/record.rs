//! Field binding between templates and application records.
//!
//! A [`Record`] exposes named fields as [`Value`]s and named hooks the codec
//! may run. Its [`RecordSpec`] carries the template, the checksum identity,
//! hook bindings and value representations. Concrete structs usually get their
//! `Record` impl from the [`record!`](crate::record!) macro; [`MapRecord`]
//! covers records whose field set is only known at runtime.

use crate::checksum;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Failure to read, write or call into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{record} has no field '{field}'")]
    NoSuchField { record: String, field: String },
    #[error("field '{field}': cannot convert {value} to {expected}")]
    TypeCoercion {
        field: String,
        value: String,
        expected: &'static str,
    },
    #[error("{record} has no hook '{hook}'")]
    NoSuchHook { record: String, hook: String },
    #[error("field '{0}' is not a sequence")]
    NotASequence(String),
    #[error("field '{0}' holds a sequence where a single value is expected")]
    NotAScalar(String),
}

/// A value an application type can bind to a template.
pub trait Record {
    fn spec(&self) -> RecordSpec;

    fn read_field(&self, name: &str) -> Result<Value, FieldError>;

    fn write_field(&mut self, name: &str, value: Value) -> Result<(), FieldError>;

    /// Run hook `hook`; `Ok(false)` means the hook rejected the record.
    fn invoke_hook(&mut self, hook: &str) -> Result<bool, FieldError> {
        Err(FieldError::NoSuchHook {
            record: self.spec().name,
            hook: hook.to_string(),
        })
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn spec(&self) -> RecordSpec {
        (**self).spec()
    }

    fn read_field(&self, name: &str) -> Result<Value, FieldError> {
        (**self).read_field(name)
    }

    fn write_field(&mut self, name: &str, value: Value) -> Result<(), FieldError> {
        (**self).write_field(name, value)
    }

    fn invoke_hook(&mut self, hook: &str) -> Result<bool, FieldError> {
        (**self).invoke_hook(hook)
    }
}

/// Codec metadata attached to a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    pub name: String,
    pub template: Option<String>,
    pub checksum: String,
    pub type_hook: Option<String>,
    pub field_hooks: HashMap<String, String>,
    pub representations: HashMap<String, Representation>,
}

impl Default for RecordSpec {
    fn default() -> Self {
        RecordSpec::new("")
    }
}

impl RecordSpec {
    pub fn new<S: Into<String>>(name: S) -> Self {
        RecordSpec {
            name: name.into(),
            template: None,
            checksum: checksum::XOR.to_string(),
            type_hook: None,
            field_hooks: HashMap::new(),
            representations: HashMap::new(),
        }
    }

    pub fn template<S: Into<String>>(mut self, source: S) -> Self {
        self.template = Some(source.into());
        self
    }

    pub fn checksum<S: Into<String>>(mut self, id: S) -> Self {
        self.checksum = id.into();
        self
    }

    /// Hook run before serializing and after a successful parse.
    pub fn type_hook<S: Into<String>>(mut self, hook: S) -> Self {
        self.type_hook = Some(hook.into());
        self
    }

    /// Hook run before `field` is read and after it is written.
    pub fn field_hook<F: Into<String>, H: Into<String>>(mut self, field: F, hook: H) -> Self {
        self.field_hooks.insert(field.into(), hook.into());
        self
    }

    pub fn represent<F: Into<String>>(mut self, field: F, representation: Representation) -> Self {
        self.representations.insert(field.into(), representation);
        self
    }

    pub fn hook_for(&self, field: &str) -> Option<&str> {
        self.field_hooks.get(field).map(String::as_str)
    }

    pub fn representation(&self, field: &str) -> Option<&Representation> {
        self.representations.get(field)
    }
}

/// Substitution table between runtime text and wire text for one field.
///
/// The default entry, when set, answers for anything no other entry matches:
/// its wire text on encode, its runtime text on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Representation {
    entries: Vec<(String, String)>,
    default: Option<(String, String)>,
}

impl Representation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry<R: Into<String>, W: Into<String>>(mut self, runtime: R, wire: W) -> Self {
        self.entries.push((runtime.into(), wire.into()));
        self
    }

    pub fn default_entry<R: Into<String>, W: Into<String>>(mut self, runtime: R, wire: W) -> Self {
        self.default = Some((runtime.into(), wire.into()));
        self
    }

    fn all(&self) -> impl Iterator<Item = &(String, String)> {
        self.entries.iter().chain(self.default.iter())
    }

    /// Wire text for `runtime`.
    pub fn encode<'a>(&'a self, runtime: &'a str) -> &'a str {
        self.all()
            .find(|(r, _)| r == runtime)
            .or(self.default.as_ref())
            .map_or(runtime, |(_, w)| w.as_str())
    }

    /// Runtime text for `wire`.
    pub fn decode<'a>(&'a self, wire: &'a str) -> &'a str {
        self.all()
            .find(|(_, w)| w == wire)
            .or(self.default.as_ref())
            .map_or(wire, |(r, _)| r.as_str())
    }
}

/// Conversion between a native field type and [`Value`].
///
/// Scalars read `Null` as their default so a field can always be restored.
pub trait FieldValue: Sized {
    fn to_value(&self) -> Value;

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError>;
}

fn coercion(field: &str, value: &Value, expected: &'static str) -> FieldError {
    FieldError::TypeCoercion {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Ok(String::new()),
            Value::List(_) => Err(FieldError::NotAScalar(field.to_string())),
        }
    }
}

impl FieldValue for char {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match &value {
            Value::Null => Ok('\0'),
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(coercion(field, &value, "char")),
                }
            }
            Value::List(_) => Err(FieldError::NotAScalar(field.to_string())),
        }
    }
}

macro_rules! parsed_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Text(self.to_string())
                }

                fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
                    match &value {
                        Value::Null => Ok(<$ty>::default()),
                        Value::Text(s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|_| coercion(field, &value, stringify!($ty))),
                        Value::List(_) => Err(FieldError::NotAScalar(field.to_string())),
                    }
                }
            }
        )*
    };
}

parsed_field_value!(bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(field, other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .into_iter()
                .map(|item| T::from_value(field, item))
                .collect(),
            Value::Text(_) => Err(FieldError::NotASequence(field.to_string())),
        }
    }
}

/// Implement [`Record`] for a struct whose fields implement [`FieldValue`].
///
/// ```
/// use wiretext::{record, RecordSpec};
///
/// #[derive(Default)]
/// struct Greeting {
///     name: String,
/// }
///
/// impl Greeting {
///     fn shout(&mut self) -> bool {
///         self.name = self.name.to_uppercase();
///         true
///     }
/// }
///
/// record!(Greeting => RecordSpec::new("Greeting").template("hello-{name}").field_hook("name", "shout");
///     fields { name }
///     hooks { "shout" => shout }
/// );
/// ```
#[macro_export]
macro_rules! record {
    (
        $ty:ty => $spec:expr;
        fields { $($field:ident),* $(,)? }
        $(hooks { $($hook:literal => $method:ident),* $(,)? })?
    ) => {
        impl $crate::Record for $ty {
            fn spec(&self) -> $crate::RecordSpec {
                $spec
            }

            fn read_field(
                &self,
                name: &str,
            ) -> ::std::result::Result<$crate::Value, $crate::FieldError> {
                match name {
                    $(stringify!($field) => Ok($crate::FieldValue::to_value(&self.$field)),)*
                    _ => Err($crate::FieldError::NoSuchField {
                        record: stringify!($ty).to_string(),
                        field: name.to_string(),
                    }),
                }
            }

            fn write_field(
                &mut self,
                name: &str,
                value: $crate::Value,
            ) -> ::std::result::Result<(), $crate::FieldError> {
                match name {
                    $(stringify!($field) => {
                        self.$field = $crate::FieldValue::from_value(name, value)?;
                        Ok(())
                    })*
                    _ => {
                        let _ = value;
                        Err($crate::FieldError::NoSuchField {
                            record: stringify!($ty).to_string(),
                            field: name.to_string(),
                        })
                    }
                }
            }

            fn invoke_hook(&mut self, hook: &str) -> ::std::result::Result<bool, $crate::FieldError> {
                match hook {
                    $($($hook => Ok(self.$method()),)*)?
                    _ => Err($crate::FieldError::NoSuchHook {
                        record: stringify!($ty).to_string(),
                        hook: hook.to_string(),
                    }),
                }
            }
        }
    };
}

pub type MapHook = fn(&mut BTreeMap<String, Value>) -> bool;

/// A record backed by a name → value map.
///
/// Every field exists; one that was never written reads as `Null`.
#[derive(Clone, Default)]
pub struct MapRecord {
    spec: RecordSpec,
    values: BTreeMap<String, Value>,
    hooks: HashMap<String, MapHook>,
}

impl MapRecord {
    pub fn new(spec: RecordSpec) -> Self {
        MapRecord {
            spec,
            values: BTreeMap::new(),
            hooks: HashMap::new(),
        }
    }

    pub fn with<S: Into<String>, V: Into<Value>>(mut self, field: S, value: V) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn with_hook<S: Into<String>>(mut self, name: S, hook: MapHook) -> Self {
        self.hooks.insert(name.into(), hook);
        self
    }

    pub fn set<S: Into<String>, V: Into<Value>>(&mut self, field: S, value: V) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field).filter(|v| !v.is_null())
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl fmt::Debug for MapRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<_> = self.hooks.keys().collect();
        hooks.sort();
        f.debug_struct("MapRecord")
            .field("spec", &self.spec.name)
            .field("values", &self.values)
            .field("hooks", &hooks)
            .finish()
    }
}

impl Record for MapRecord {
    fn spec(&self) -> RecordSpec {
        self.spec.clone()
    }

    fn read_field(&self, name: &str) -> Result<Value, FieldError> {
        Ok(self.values.get(name).cloned().unwrap_or_default())
    }

    fn write_field(&mut self, name: &str, value: Value) -> Result<(), FieldError> {
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    fn invoke_hook(&mut self, hook: &str) -> Result<bool, FieldError> {
        match self.hooks.get(hook) {
            Some(f) => Ok(f(&mut self.values)),
            None => Err(FieldError::NoSuchHook {
                record: self.spec.name.clone(),
                hook: hook.to_string(),
            }),
        }
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }
}

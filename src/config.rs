//! Layered configuration sources and typed section binding.
//!
//! Keys are `:`-separated paths (`AcmeServiceSettings:UserUrl`) and match
//! without regard to ASCII case. Sources are consulted last-added first, so a
//! later source overrides an earlier one. Environment and in-memory values stay
//! the exact text they were given until a bound field asks for a type.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};

use serde::de::value::MapDeserializer;
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Separator between section and key.
pub const KEY_DELIMITER: &str = ":";

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    /// Borrow as text, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Textual form, as it would appear in an environment variable.
    pub fn to_text(&self) -> String {
        match self {
            ConfigValue::String(s) => s.clone(),
            ConfigValue::Integer(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::Boolean(b) => b.to_string(),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by full key path
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available key paths
    fn keys(&self) -> Vec<String>;
}

/// In-memory key/value source.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text value, kept verbatim like an environment variable.
    pub fn with(mut self, key: impl Into<String>, value: &str) -> Self {
        self.values.insert(key.into(), ConfigValue::String(value.to_string()));
        self
    }
}

impl ConfigSource for MemoryConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Environment variable source.
///
/// With prefix `ACME`, the variable `ACME_AcmeServiceSettings__UserUrl`
/// provides key `AcmeServiceSettings:UserUrl`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable_prefix(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}_"),
            None => String::new(),
        }
    }

    fn variable_for(&self, key: &str) -> String {
        format!("{}{}", self.variable_prefix(), key.replace(KEY_DELIMITER, "__"))
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.variable_for(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        let prefix = self.variable_prefix();
        env::vars()
            .filter_map(|(name, _)| {
                name.strip_prefix(&prefix)
                    .map(|rest| rest.replace("__", KEY_DELIMITER))
            })
            .collect()
    }
}

/// JSON document source (`appsettings.json` layout).
///
/// Nested objects flatten into `:`-separated keys; arrays are not supported.
#[derive(Debug)]
pub struct JsonConfigSource {
    path: PathBuf,
    values: HashMap<String, ConfigValue>,
}

impl JsonConfigSource {
    /// Loads and flattens a JSON file.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Source`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigurationError::Source {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_str_at(&content, path)
    }

    /// Loads the file if it exists, `Ok(None)` otherwise.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigurationError> {
        if path.as_ref().exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Parses JSON text directly.
    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        Self::from_str_at(content, PathBuf::from("<inline>"))
    }

    fn from_str_at(content: &str, path: PathBuf) -> Result<Self, ConfigurationError> {
        let doc: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ConfigurationError::Source {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let mut values = HashMap::new();
        flatten("", &doc, &mut values);
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut HashMap<String, ConfigValue>) {
    let join = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{prefix}{KEY_DELIMITER}{k}")
        }
    };
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                flatten(&join(k), v, out);
            }
        }
        serde_json::Value::Bool(b) => {
            out.insert(prefix.to_string(), ConfigValue::Boolean(*b));
        }
        serde_json::Value::Number(n) => {
            let v = match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or_default()),
            };
            out.insert(prefix.to_string(), v);
        }
        serde_json::Value::String(s) => {
            out.insert(prefix.to_string(), ConfigValue::String(s.clone()));
        }
        serde_json::Value::Null | serde_json::Value::Array(_) => {}
    }
}

impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Ordered stack of configuration sources.
///
/// # Examples
///
/// ```
/// use acme_order::config::{Configuration, MemoryConfigSource};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// #[serde(rename_all = "PascalCase")]
/// struct Limits { max_items: i64 }
///
/// let config = Configuration::new()
///     .add_source(MemoryConfigSource::new().with("Limits:MaxItems", "10"))
///     .add_source(MemoryConfigSource::new().with("Limits:MaxItems", "25"));
///
/// let limits: Limits = config.bind("Limits").unwrap();
/// assert_eq!(limits.max_items, 25);
/// ```
#[derive(Debug, Default)]
pub struct Configuration {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source; it overrides all sources added before it.
    pub fn add_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// The standard layering: optional JSON file, then `ACME_` environment variables.
    pub fn standard(json_path: impl AsRef<Path>, env_prefix: &str) -> Result<Self, ConfigurationError> {
        let mut config = Self::new();
        if let Some(json) = JsonConfigSource::load_optional(json_path.as_ref())? {
            tracing::debug!(path = %json.path().display(), "loaded configuration file");
            config = config.add_source(json);
        }
        Ok(config.add_source(EnvironmentConfigSource::with_prefix(env_prefix)))
    }

    /// Highest-priority value for `key`, matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.sources.iter().rev().find_map(|source| {
            source.get(key).or_else(|| {
                source
                    .keys()
                    .into_iter()
                    .find(|k| k.eq_ignore_ascii_case(key))
                    .and_then(|k| source.get(&k))
            })
        })
    }

    /// String value for `key`; numbers and booleans are rendered as text.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_text())
    }

    /// Every key under `section`, relative to it, with its winning value.
    ///
    /// Keys that differ only in ASCII case are the same key; the spelling of
    /// the winning source is kept.
    pub fn section(&self, section: &str) -> BTreeMap<String, ConfigValue> {
        let mut winners: BTreeMap<String, (String, ConfigValue)> = BTreeMap::new();
        for source in &self.sources {
            for key in source.keys() {
                if let Some(rest) = strip_section(&key, section) {
                    if let Some(value) = source.get(&key) {
                        winners.insert(rest.to_ascii_lowercase(), (rest.to_string(), value));
                    }
                }
            }
        }
        winners.into_values().collect()
    }

    /// Deserializes `section` into `T`.
    ///
    /// Nested keys (`Section:Inner:Key`) become nested structs. A missing
    /// section binds as an empty one, so `T`'s serde defaults apply. Each
    /// value is converted from its text only as far as the target field
    /// requires, so `"007"` binds to a `String` field as `"007"` and to a
    /// `u16` field as `7`. Field names match without regard to ASCII case.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidSection`] when the values do not fit `T`.
    pub fn bind<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigurationError> {
        let mut root = BTreeMap::new();
        for (key, value) in self.section(section) {
            Node::insert(&mut root, &key, value.to_text());
        }
        T::deserialize(Node::Section(root)).map_err(|e| ConfigurationError::InvalidSection {
            section: section.to_string(),
            message: e.to_string(),
        })
    }
}

fn strip_section<'k>(key: &'k str, section: &str) -> Option<&'k str> {
    let head = key.get(..section.len())?;
    let rest = key[section.len()..].strip_prefix(KEY_DELIMITER)?;
    head.eq_ignore_ascii_case(section).then_some(rest)
}

/// A bound section: text leaves under case-insensitive keys.
enum Node {
    Text(String),
    Section(BTreeMap<String, Node>),
}

impl Node {
    fn insert(map: &mut BTreeMap<String, Node>, path: &str, value: String) {
        let (head, rest) = match path.split_once(KEY_DELIMITER) {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let key = map
            .keys()
            .find(|k| k.eq_ignore_ascii_case(head))
            .cloned()
            .unwrap_or_else(|| head.to_string());
        match rest {
            None => {
                map.insert(key, Node::Text(value));
            }
            Some(rest) => {
                let child = map.entry(key).or_insert_with(|| Node::Section(BTreeMap::new()));
                if let Node::Text(_) = child {
                    *child = Node::Section(BTreeMap::new());
                }
                if let Node::Section(inner) = child {
                    Node::insert(inner, rest, value);
                }
            }
        }
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for Node {
    type Deserializer = Node;

    fn into_deserializer(self) -> Node {
        self
    }
}

macro_rules! by_node {
    ($($method:ident($($arg:ident: $ty:ty),*)),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value, Self::Error> {
            match self {
                Node::Text(text) => Text(text).$method($($arg,)* visitor),
                Node::Section(map) => visitor.visit_map(MapDeserializer::new(map.into_iter())),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Node {
    type Error = serde_json::Error;

    by_node! {
        deserialize_any(),
        deserialize_bool(),
        deserialize_i8(),
        deserialize_i16(),
        deserialize_i32(),
        deserialize_i64(),
        deserialize_u8(),
        deserialize_u16(),
        deserialize_u32(),
        deserialize_u64(),
        deserialize_f32(),
        deserialize_f64(),
        deserialize_char(),
        deserialize_str(),
        deserialize_string(),
        deserialize_bytes(),
        deserialize_byte_buf(),
        deserialize_unit(),
        deserialize_unit_struct(name: &'static str),
        deserialize_seq(),
        deserialize_tuple(len: usize),
        deserialize_tuple_struct(name: &'static str, len: usize),
        deserialize_map(),
        deserialize_enum(name: &'static str, variants: &'static [&'static str]),
        deserialize_identifier(),
        deserialize_ignored_any(),
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Node::Text(text) => Text(text).deserialize_option(visitor),
            section => visitor.visit_some(section),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self {
            Node::Text(text) => Text(text).deserialize_struct(name, fields, visitor),
            Node::Section(map) => {
                let entries = map.into_iter().map(|(key, value)| {
                    let key = fields
                        .iter()
                        .find(|field| field.eq_ignore_ascii_case(&key))
                        .map(|field| field.to_string())
                        .unwrap_or(key);
                    (key, value)
                });
                visitor.visit_map(MapDeserializer::new(entries))
            }
        }
    }
}

/// A raw text leaf, parsed only when the target type asks for it.
struct Text(String);

macro_rules! parse_text {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0.trim().parse::<$ty>() {
                Ok(value) => visitor.$visit(value),
                Err(_) => Err(<serde_json::Error as de::Error>::invalid_value(
                    Unexpected::Str(&self.0),
                    &visitor,
                )),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Text {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_string(self.0)
    }

    parse_text! {
        deserialize_bool => visit_bool(bool),
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        if self.0.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_enum(IntoDeserializer::<serde_json::Error>::into_deserializer(self.0))
    }

    serde::forward_to_deserialize_any! {
        char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

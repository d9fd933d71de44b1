//! Read-only configuration document with dot-path access.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// A JSON configuration document, or a node inside one.
///
/// Paths use dots between segments; numeric segments index into arrays, so
/// `resources.db.hosts.0` is the first entry of the `hosts` array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    value: Value,
}

impl Configuration {
    /// Wrap an already parsed value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Parse a JSON document from bytes.
    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        serde_json::from_slice(bytes)
            .map(Self::new)
            .map_err(|source| ConfigError::Parse {
                origin: "bytes".to_string(),
                source,
            })
    }

    /// Parse a JSON document from a reader.
    pub fn from_reader(reader: impl Read) -> ConfigResult<Self> {
        serde_json::from_reader(reader)
            .map(Self::new)
            .map_err(|source| ConfigError::Parse {
                origin: "reader".to_string(),
                source,
            })
    }

    /// Read and parse a JSON file.
    pub async fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_slice(&bytes)
            .map(Self::new)
            .map_err(|source| ConfigError::Parse {
                origin: path.display().to_string(),
                source,
            })
    }

    /// The underlying JSON value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume into the underlying JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    // -----------------------------------------------------------------------
    // Path access
    // -----------------------------------------------------------------------

    /// The node at `path`, if any. An empty path is the whole document.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Configuration> {
        self.lookup(path).ok().cloned().map(Self::new)
    }

    /// Whether anything exists at `path`.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    /// Deserialize the node at `path` into `T`.
    pub fn scan<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        let value = self.lookup(path)?;
        T::deserialize(value).map_err(|e| {
            ConfigError::type_error(e.to_string(), path, std::any::type_name::<T>())
        })
    }

    /// Deserialize the node at `path`, or return `default` when it is absent
    /// or has the wrong shape.
    pub fn scan_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.scan(path).unwrap_or(default)
    }

    /// String at `path`, or `default`.
    #[must_use]
    pub fn string_or(&self, path: &str, default: &str) -> String {
        self.get(path)
            .and_then(|node| node.as_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Integer at `path`, or `default`.
    #[must_use]
    pub fn i64_or(&self, path: &str, default: i64) -> i64 {
        self.get(path).and_then(|node| node.as_i64()).unwrap_or(default)
    }

    /// Float at `path`, or `default`.
    #[must_use]
    pub fn f64_or(&self, path: &str, default: f64) -> f64 {
        self.get(path).and_then(|node| node.as_f64()).unwrap_or(default)
    }

    /// Boolean at `path`, or `default`.
    #[must_use]
    pub fn bool_or(&self, path: &str, default: bool) -> bool {
        self.get(path).and_then(|node| node.as_bool()).unwrap_or(default)
    }

    /// Duration at `path`, or `default`.
    #[must_use]
    pub fn duration_or(&self, path: &str, default: Duration) -> Duration {
        self.get(path)
            .and_then(|node| node.as_duration())
            .unwrap_or(default)
    }

    // -----------------------------------------------------------------------
    // Typed views of this node
    // -----------------------------------------------------------------------

    /// Borrow a string node.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Render a scalar node as a string. Null, arrays and objects give `None`.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        scalar_string(&self.value)
    }

    /// Integer node, or a string holding one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match &self.value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric node, or a string holding one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean node, or the strings `"true"` and `"false"`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Duration written in humantime syntax, e.g. `"1m30s"` or `"250ms"`.
    #[must_use]
    pub fn as_duration(&self) -> Option<Duration> {
        humantime::parse_duration(self.value.as_str()?.trim()).ok()
    }

    /// Object node as a map of child nodes.
    #[must_use]
    pub fn as_map(&self) -> Option<BTreeMap<String, Configuration>> {
        let object = self.value.as_object()?;
        Some(
            object
                .iter()
                .map(|(key, value)| (key.clone(), Self::new(value.clone())))
                .collect(),
        )
    }

    /// Array node as a list of child nodes.
    #[must_use]
    pub fn as_array(&self) -> Option<Vec<Configuration>> {
        let array = self.value.as_array()?;
        Some(array.iter().cloned().map(Self::new).collect())
    }

    /// Object node as query pairs, e.g. driver parameters.
    ///
    /// Scalar values are rendered as strings; empty strings, nulls and nested
    /// values are skipped.
    #[must_use]
    pub fn as_query_pairs(&self) -> Option<Vec<(String, String)>> {
        let object = self.value.as_object()?;
        Some(
            object
                .iter()
                .filter_map(|(key, value)| {
                    let rendered = scalar_string(value)?;
                    (!rendered.is_empty()).then(|| (key.clone(), rendered))
                })
                .collect(),
        )
    }

    /// Walk `path` segment by segment without copying.
    fn lookup(&self, path: &str) -> ConfigResult<&Value> {
        if path.is_empty() {
            return Ok(&self.value);
        }

        let mut current = &self.value;
        for part in path.split('.') {
            current = match current {
                Value::Object(obj) => obj.get(part).ok_or_else(|| {
                    ConfigError::path_error(format!("key '{part}' not found"), path)
                })?,
                Value::Array(arr) => {
                    let index: usize = part.parse().map_err(|_| {
                        ConfigError::path_error(format!("invalid array index '{part}'"), path)
                    })?;
                    arr.get(index).ok_or_else(|| {
                        ConfigError::path_error(
                            format!("array index {index} out of bounds (size: {})", arr.len()),
                            path,
                        )
                    })?
                }
                other => {
                    return Err(ConfigError::path_error(
                        format!("cannot index into {} with '{part}'", json_type_name(other)),
                        path,
                    ));
                }
            };
        }
        Ok(current)
    }
}

impl FromStr for Configuration {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        serde_json::from_str(s)
            .map(Self::new)
            .map_err(|source| ConfigError::Parse {
                origin: "string".to_string(),
                source,
            })
    }
}

impl From<Value> for Configuration {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Human-readable type name for a JSON value
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn sample() -> Configuration {
        Configuration::new(json!({
            "name": "app",
            "port": 8080,
            "ratio": "0.25",
            "debug": "true",
            "timeout": "1m30s",
            "hosts": ["a.local", "b.local"],
            "params": {"charset": "utf8", "empty": "", "retries": 3, "nested": {"x": 1}},
            "nothing": null
        }))
    }

    #[test]
    fn dot_paths_reach_nested_and_array_nodes() {
        let cfg = sample();
        assert_eq!(cfg.get("hosts.1").unwrap().as_str(), Some("b.local"));
        assert_eq!(cfg.get("params.nested.x").unwrap().as_i64(), Some(1));
        assert!(cfg.exists("nothing"));
        assert!(!cfg.exists("hosts.2"));
        assert!(!cfg.exists("name.first"));
        assert_eq!(cfg.get("").unwrap(), cfg);
    }

    #[test]
    fn scan_deserializes_and_reports_errors() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Params {
            charset: String,
            retries: u32,
        }

        let cfg = sample();
        let params: Params = cfg.scan("params").unwrap();
        assert_eq!(
            params,
            Params {
                charset: "utf8".into(),
                retries: 3
            }
        );

        assert!(cfg.scan::<u16>("missing").unwrap_err().is_not_found());
        assert!(matches!(
            cfg.scan::<u16>("name"),
            Err(ConfigError::Type { .. })
        ));
        assert_eq!(cfg.scan_or("missing", 7u16), 7);
    }

    #[rstest]
    #[case("port", Some(8080))]
    #[case("ratio", None)]
    #[case("name", None)]
    #[case("missing", None)]
    fn integer_lookup(#[case] path: &str, #[case] expected: Option<i64>) {
        assert_eq!(sample().get(path).and_then(|c| c.as_i64()), expected);
    }

    #[test]
    fn scalars_are_read_from_strings() {
        let cfg = sample();
        assert_eq!(cfg.f64_or("ratio", 1.0), 0.25);
        assert!(cfg.bool_or("debug", false));
        assert_eq!(cfg.string_or("port", "0"), "8080");
        assert_eq!(cfg.duration_or("timeout", Duration::ZERO), Duration::from_secs(90));
        assert_eq!(cfg.i64_or("missing", -1), -1);
        assert_eq!(cfg.string_or("nothing", "fallback"), "fallback");
    }

    #[test]
    fn shorthands_fall_back_on_wrong_shape() {
        let cfg = sample();
        assert_eq!(cfg.i64_or("name", 5), 5);
        assert_eq!(cfg.f64_or("hosts", 2.5), 2.5);
        assert!(!cfg.bool_or("params", false));
        assert_eq!(cfg.duration_or("port", Duration::from_secs(3)), Duration::from_secs(3));
        assert_eq!(cfg.string_or("params", "none"), "none");
    }

    #[test]
    fn collections_and_query_pairs() {
        let cfg = sample();
        let hosts = cfg.get("hosts").unwrap().as_array().unwrap();
        assert_eq!(hosts.len(), 2);

        let params = cfg.get("params").unwrap();
        assert_eq!(params.as_map().unwrap().len(), 4);
        assert_eq!(
            params.as_query_pairs().unwrap(),
            vec![
                ("charset".to_string(), "utf8".to_string()),
                ("retries".to_string(), "3".to_string()),
            ]
        );
        assert!(cfg.get("name").unwrap().as_query_pairs().is_none());
    }

    #[test]
    fn parse_errors_carry_origin() {
        let err = "{ not json".parse::<Configuration>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref origin, .. } if origin == "string"));
        assert!(Configuration::from_slice(b"[1, 2]").is_ok());
        assert!(Configuration::from_reader(&b"{\"a\": 1}"[..]).is_ok());
    }
}

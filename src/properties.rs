//! The configuration source for component configuration points.
//!
//! Values come, in order of precedence, from programmatic overrides
//! registered on the builder, from the properties file (default
//! [CONFIG_FILE]), and finally from the default declared on the
//! configuration point itself. The file format is plain text: UTF-8, one
//! `key=value` pair per line, `#` comment lines and blank lines ignored. A
//! missing file is not an error.

use crate::error::{ConfigError, ErrorPtr};
use fxhash::FxHashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Name of the default configuration file.
pub const CONFIG_FILE: &str = "settings.properties";

/// An immutable set of string properties loaded from a configuration file.
#[derive(Clone, Debug, Default)]
pub struct Properties {
    values: FxHashMap<String, String>,
}

impl Properties {
    /// Loads properties from the given file. A missing file yields the empty
    /// set; any other read failure is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("no configuration file '{}' found", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut values = FxHashMap::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // a line without a separator is a key with an empty value
            let (key, value) = line.split_once('=').unwrap_or((line, ""));
            values.insert(key.trim().to_string(), value.trim().to_string());
        }

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Error, Debug)]
#[error("{message}")]
struct InvalidConfigValue {
    message: String,
}

fn invalid_value(message: String) -> ErrorPtr {
    Arc::new(InvalidConfigValue { message })
}

/// Coercion of a raw property string into the declared type of a
/// configuration point. Implementations exist for the supported scalar
/// kinds; `Option<V>` lifts any of them for fields without a natural
/// default.
pub trait FromConfigValue: Sized + Send + Sync + 'static {
    fn from_config_value(raw: &str) -> Result<Self, ErrorPtr>;
}

/// Case-insensitive permissive parse: anything other than `true` is `false`.
impl FromConfigValue for bool {
    fn from_config_value(raw: &str) -> Result<Self, ErrorPtr> {
        Ok(raw.eq_ignore_ascii_case("true"))
    }
}

macro_rules! numeric_from_config_value {
    ($($kind:ty),*) => {
        $(
            impl FromConfigValue for $kind {
                fn from_config_value(raw: &str) -> Result<Self, ErrorPtr> {
                    raw.parse::<$kind>()
                        .map_err(|error| Arc::new(error) as ErrorPtr)
                }
            }
        )*
    };
}

numeric_from_config_value!(i8, i16, i32, i64, f32, f64);

impl FromConfigValue for char {
    fn from_config_value(raw: &str) -> Result<Self, ErrorPtr> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(value), None) => Ok(value),
            _ => Err(invalid_value(format!(
                "value '{raw}' is not exactly one character"
            ))),
        }
    }
}

impl FromConfigValue for String {
    fn from_config_value(raw: &str) -> Result<Self, ErrorPtr> {
        Ok(raw.to_string())
    }
}

impl FromConfigValue for PathBuf {
    fn from_config_value(raw: &str) -> Result<Self, ErrorPtr> {
        Ok(PathBuf::from(raw))
    }
}

impl FromConfigValue for Url {
    fn from_config_value(raw: &str) -> Result<Self, ErrorPtr> {
        Url::parse(raw).map_err(|error| Arc::new(error) as ErrorPtr)
    }
}

impl<V: FromConfigValue> FromConfigValue for Option<V> {
    fn from_config_value(raw: &str) -> Result<Self, ErrorPtr> {
        V::from_config_value(raw).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use crate::properties::{FromConfigValue, Properties};
    use std::path::PathBuf;
    use url::Url;

    #[test]
    fn should_parse_properties_text() {
        let properties = Properties::parse(
            "# a comment\n\
             port = 3306\n\
             \n\
             name=primary\n\
             flag\n",
        );

        assert_eq!(properties.get("port"), Some("3306"));
        assert_eq!(properties.get("name"), Some("primary"));
        assert_eq!(properties.get("flag"), Some(""));
        assert_eq!(properties.get("missing"), None);
        assert_eq!(properties.len(), 3);
    }

    #[test]
    fn should_load_missing_file_as_empty() {
        let properties = Properties::load("no-such-settings.properties".as_ref()).unwrap();
        assert!(properties.is_empty());
    }

    #[test]
    fn should_parse_booleans_permissively() {
        assert!(bool::from_config_value("true").unwrap());
        assert!(bool::from_config_value("TRUE").unwrap());
        assert!(!bool::from_config_value("false").unwrap());
        assert!(!bool::from_config_value("yes").unwrap());
        assert!(!bool::from_config_value("").unwrap());
    }

    #[test]
    fn should_parse_numbers() {
        assert_eq!(i8::from_config_value("-7").unwrap(), -7);
        assert_eq!(i16::from_config_value("1024").unwrap(), 1024);
        assert_eq!(i32::from_config_value("3306").unwrap(), 3306);
        assert_eq!(i64::from_config_value("123456789012").unwrap(), 123456789012);
        assert_eq!(f32::from_config_value("0.5").unwrap(), 0.5);
        assert_eq!(f64::from_config_value("2.25").unwrap(), 2.25);

        assert!(i32::from_config_value("oops").is_err());
        assert!(f64::from_config_value("oops").is_err());
    }

    #[test]
    fn should_parse_single_characters() {
        assert_eq!(char::from_config_value("x").unwrap(), 'x');
        assert!(char::from_config_value("").is_err());
        assert!(char::from_config_value("xy").is_err());
    }

    #[test]
    fn should_parse_paths_and_urls() {
        assert_eq!(
            PathBuf::from_config_value("/tmp/data").unwrap(),
            PathBuf::from("/tmp/data")
        );

        assert_eq!(
            Url::from_config_value("https://example.com/").unwrap(),
            Url::parse("https://example.com/").unwrap()
        );
        assert!(Url::from_config_value("not a url").is_err());
    }

    #[test]
    fn should_lift_options() {
        assert_eq!(Option::<i32>::from_config_value("42").unwrap(), Some(42));
        assert!(Option::<i32>::from_config_value("oops").is_err());
    }
}

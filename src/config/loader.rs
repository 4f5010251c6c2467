//! Configuration loading from the environment and disk.
//!
//! One merged TOML document is built per bootstrap: environment variables
//! first, then the optional config file on top. The service configuration and
//! every user section deserialize from that same document.
//!
//! Environment variables use the upper-cased service name as prefix and a
//! double underscore as nesting separator, e.g. `MY_SVC__HTTP__ADDRESS`.
//! Their values are kept as text until a section is deserialized, and are then
//! typed after the field they fill: the section's defaults tell a string from
//! a number, and a list field splits on commas. Keys the defaults do not
//! know are parsed as TOML scalars or arrays, else kept as strings.

use std::any::type_name;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use toml::{Table, Value};

use crate::config::schema::ServiceConfig;
use crate::config::validation::validate_config;
use crate::config::ConfigError;
use crate::error::BoxError;
use crate::observability::logging::Logger;
use crate::provider::Provider;

/// Separator between nesting levels in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

/// Environment prefix for a service, including the trailing separator.
pub fn env_prefix(name: &str) -> String {
    format!(
        "{}{}",
        name.to_uppercase().replace(['-', '.', ' '], "_"),
        ENV_SEPARATOR
    )
}

/// A user configuration section, loaded from the same document as the
/// service configuration and registered as a provider.
pub trait ConfigSection:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    /// Runs after deserialization, before the section becomes a provider.
    fn post_load(&mut self, logger: &Logger) -> Result<(), BoxError> {
        let _ = logger;
        Ok(())
    }
}

impl ConfigSection for ServiceConfig {}

/// The layered configuration sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Raw environment values, all strings.
    env: Table,
    file: Table,
}

impl ConfigSource {
    /// Read the process environment, then the file at `path` if given.
    pub fn load(name: &str, path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut source = Self::from_env(name, std::env::vars());

        if let Some(path) = path {
            tracing::info!(name = %name, path = %path.display(), "loading config from file");
            source.merge_file(path)?;
        }

        Ok(source)
    }

    /// Collect `(key, value)` pairs carrying the service prefix.
    pub fn from_env<I>(name: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = env_prefix(name);
        let mut env = Table::new();

        for (key, raw) in vars {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };

            let path: Vec<String> = rest
                .split(ENV_SEPARATOR)
                .filter(|segment| !segment.is_empty())
                .map(str::to_lowercase)
                .collect();

            insert_path(&mut env, &path, Value::String(raw));
        }

        Self {
            env,
            file: Table::new(),
        }
    }

    /// Merge a TOML file over the current document. File values win.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table: Table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        merge(&mut self.file, table);
        Ok(())
    }

    /// The merged document without any field types to go by.
    pub fn document(&self) -> Table {
        self.document_for(&Table::new())
    }

    /// Deserialize `T` from the whole document. Unknown keys are ignored.
    pub fn section<T>(&self) -> Result<T, ConfigError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let schema = match Value::try_from(T::default()) {
            Ok(Value::Table(schema)) => schema,
            Ok(_) => Table::new(),
            Err(source) => {
                return Err(ConfigError::Serialize {
                    section: type_name::<T>(),
                    source,
                })
            }
        };

        Value::Table(self.document_for(&schema))
            .try_into()
            .map_err(|source| ConfigError::Deserialize {
                section: type_name::<T>(),
                source,
            })
    }

    /// Deserialize and validate the service configuration.
    pub fn service_config(&self) -> Result<ServiceConfig, ConfigError> {
        let config: ServiceConfig = self.section()?;
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn document_for(&self, schema: &Table) -> Table {
        let mut document = coerce_env(&self.env, Some(schema));
        merge(&mut document, self.file.clone());
        document
    }
}

fn insert_path(table: &mut Table, path: &[String], value: Value) {
    match path {
        [] => {}
        [key] => {
            table.insert(key.clone(), value);
        }
        [key, rest @ ..] => {
            let entry = table
                .entry(key.clone())
                .or_insert(Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            if let Value::Table(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Type raw environment values after the matching entries of `schema`.
fn coerce_env(env: &Table, schema: Option<&Table>) -> Table {
    env.iter()
        .map(|(key, value)| {
            let hint = schema.and_then(|schema| schema.get(key));
            let typed = match value {
                Value::Table(child) => Value::Table(coerce_env(child, hint.and_then(Value::as_table))),
                Value::String(raw) => typed_env_value(raw, hint),
                other => other.clone(),
            };
            (key.clone(), typed)
        })
        .collect()
}

/// Values that do not parse as the expected type stay strings, so the
/// deserializer names the offending field.
fn typed_env_value(raw: &str, hint: Option<&Value>) -> Value {
    let text = || Value::String(raw.to_string());

    match hint {
        Some(Value::String(_)) => text(),
        Some(Value::Integer(_)) => raw.trim().parse().map(Value::Integer).unwrap_or_else(|_| text()),
        Some(Value::Float(_)) => raw.trim().parse().map(Value::Float).unwrap_or_else(|_| text()),
        Some(Value::Boolean(_)) => parse_bool(raw).map(Value::Boolean).unwrap_or_else(text),
        Some(Value::Array(items)) => parse_env_list(raw, items.first()),
        Some(Value::Table(_) | Value::Datetime(_)) | None => guess_env_value(raw),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// A TOML array literal, or a comma-separated list.
fn parse_env_list(raw: &str, element: Option<&Value>) -> Value {
    if raw.trim_start().starts_with('[') {
        if let array @ Value::Array(_) = guess_env_value(raw) {
            return array;
        }
    }

    Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| typed_env_value(item, element))
            .collect(),
    )
}

/// Scalars and arrays are parsed as TOML; anything else stays a string.
fn guess_env_value(raw: &str) -> Value {
    let parsed = toml::from_str::<Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("value"));

    match parsed {
        Some(value @ (Value::Boolean(_) | Value::Integer(_) | Value::Float(_) | Value::Array(_))) => {
            value
        }
        _ => Value::String(raw.to_string()),
    }
}

fn merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        if let Value::Table(incoming) = value {
            if let Some(Value::Table(existing)) = base.get_mut(&key) {
                merge(existing, incoming);
                continue;
            }
            base.insert(key, Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// A loaded section ready for registration.
pub(crate) struct LoadedSection {
    pub provider: Provider,
    /// JSON form for `--print-config`, absent when it cannot be rendered.
    pub rendered: Option<serde_json::Value>,
}

/// Object-safe view of a [`ConfigSection`] type.
pub(crate) trait DynSection: Send + Sync {
    fn name(&self) -> &'static str;
    fn defaults(&self) -> Result<Value, ConfigError>;
    fn load(&self, source: &ConfigSource, logger: &Logger) -> Result<LoadedSection, ConfigError>;
}

pub(crate) struct Section<T>(PhantomData<fn() -> T>);

impl<T: ConfigSection> Section<T> {
    pub(crate) fn boxed() -> Box<dyn DynSection> {
        Box::new(Section::<T>(PhantomData))
    }
}

impl<T: ConfigSection> DynSection for Section<T> {
    fn name(&self) -> &'static str {
        type_name::<T>()
    }

    fn defaults(&self) -> Result<Value, ConfigError> {
        Value::try_from(T::default()).map_err(|source| ConfigError::Serialize {
            section: self.name(),
            source,
        })
    }

    fn load(&self, source: &ConfigSource, logger: &Logger) -> Result<LoadedSection, ConfigError> {
        let mut section: T = source.section()?;

        section
            .post_load(logger)
            .map_err(|source| ConfigError::PostLoad {
                section: self.name(),
                source,
            })?;

        let rendered = match serde_json::to_value(&section) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                logger.warn(format_args!("cannot render {}: {e}", self.name()));
                None
            }
        };
        logger.debug(format_args!("loaded {}", self.name()));

        Ok(LoadedSection {
            provider: Provider::new(section),
            rendered,
        })
    }
}

/// Render the accepted environment variables with their types and defaults.
pub(crate) fn usage(name: &str, sections: &[Box<dyn DynSection>]) -> Result<String, ConfigError> {
    let prefix = env_prefix(name);
    let mut rows = vec![[
        "KEY".to_string(),
        "TYPE".to_string(),
        "DEFAULT".to_string(),
    ]];

    flatten(&prefix, &Section::<ServiceConfig>(PhantomData).defaults()?, &mut rows);
    for section in sections {
        flatten(&prefix, &section.defaults()?, &mut rows);
    }

    let mut widths = [0usize; 3];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for [key, kind, default] in &rows {
        out.push_str(&format!(
            "{key:<kw$}    {kind:<tw$}    {default}\n",
            kw = widths[0],
            tw = widths[1],
        ));
    }

    Ok(out)
}

fn flatten(key: &str, value: &Value, rows: &mut Vec<[String; 3]>) {
    match value {
        Value::Table(table) => {
            for (child, value) in table {
                let child_key = if key.ends_with(ENV_SEPARATOR) {
                    format!("{key}{}", child.to_uppercase())
                } else {
                    format!("{key}{ENV_SEPARATOR}{}", child.to_uppercase())
                };
                flatten(&child_key, value, rows);
            }
        }
        other => rows.push([
            key.to_string(),
            other.type_str().to_string(),
            other.to_string(),
        ]),
    }
}

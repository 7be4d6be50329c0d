//! TOML format handler
//!
//! Documents are held as JSON values so merge/prune is shared with JSON.
//! TOML has no null, so nulls are dropped on the way out; datetimes come in
//! as their string form.

use serde_json::{Number, Value};

use super::{with_trailing_newline, ConfigFormat, ConfigObject, FormatError, FormatResult};

const NAME: &str = "toml";

/// TOML documents
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlFormat;

impl ConfigFormat for TomlFormat {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> FormatResult<ConfigObject> {
        if content.trim().is_empty() {
            return Ok(ConfigObject::new());
        }

        let table: toml::Table = toml::from_str(content).map_err(|e| FormatError::Parse {
            format: NAME,
            message: e.message().to_string(),
        })?;

        table_to_object(table)
    }

    fn serialize(&self, obj: &ConfigObject) -> FormatResult<String> {
        let table = object_to_table(obj)?;
        let text = toml::to_string(&table).map_err(|e| FormatError::Serialize {
            format: NAME,
            message: e.to_string(),
        })?;
        Ok(with_trailing_newline(text))
    }
}

fn table_to_object(table: toml::Table) -> FormatResult<ConfigObject> {
    table
        .into_iter()
        .map(|(key, value)| Ok((key, toml_to_json(value)?)))
        .collect()
}

fn toml_to_json(value: toml::Value) -> FormatResult<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => {
            Value::Number(Number::from_f64(f).ok_or_else(|| FormatError::InvalidFormat {
                format: NAME,
                message: format!("non-finite float {f} cannot be represented"),
            })?)
        }
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<FormatResult<_>>()?,
        ),
        toml::Value::Table(table) => Value::Object(table_to_object(table)?),
    })
}

fn object_to_table(obj: &ConfigObject) -> FormatResult<toml::Table> {
    let mut table = toml::Table::new();
    for (key, value) in obj {
        if let Some(value) = json_to_toml(value)? {
            table.insert(key.clone(), value);
        }
    }
    Ok(table)
}

fn json_to_toml(value: &Value) -> FormatResult<Option<toml::Value>> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(toml::Value::Boolean(*b)),
        Value::Number(n) => Some(number_to_toml(n)?),
        Value::String(s) => Some(toml::Value::String(s.clone())),
        Value::Array(items) => {
            let mut array = Vec::with_capacity(items.len());
            for item in items {
                array.extend(json_to_toml(item)?);
            }
            Some(toml::Value::Array(array))
        }
        Value::Object(map) => Some(toml::Value::Table(object_to_table(map)?)),
    })
}

/// TOML integers are i64; larger unsigned values have no exact form
fn number_to_toml(n: &Number) -> FormatResult<toml::Value> {
    if let Some(i) = n.as_i64() {
        return Ok(toml::Value::Integer(i));
    }
    match (n.is_u64(), n.as_f64()) {
        (false, Some(f)) => Ok(toml::Value::Float(f)),
        _ => Err(FormatError::InvalidFormat {
            format: NAME,
            message: format!("integer {n} is out of range for TOML"),
        }),
    }
}

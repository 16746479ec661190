use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", self.render_to_string(value)?);
        Ok(())
    }

    pub fn render_to_string<T: Serialize>(&self, value: &T) -> Result<String> {
        let json_value = serde_json::to_value(value)?;

        let rendered = match self.format {
            OutputFormat::Table => match Self::render_table(&json_value) {
                Some(table) => table,
                None => serde_json::to_string_pretty(&json_value)?,
            },
            OutputFormat::Json => serde_json::to_string_pretty(&json_value)?,
            OutputFormat::Yaml => serde_yaml::to_string(&json_value)?,
        };

        Ok(rendered)
    }

    /// Two-column Field/Value table for a single record.
    fn render_table(value: &Value) -> Option<String> {
        let rows = Self::coerce_record(value)?;

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (field, value) in rows {
            builder.push_record([field, value]);
        }

        Some(builder.build().with(Style::rounded()).to_string())
    }

    /// Flatten an object into rows; nested objects contribute one row per key.
    fn coerce_record(value: &Value) -> Option<Vec<(String, String)>> {
        let obj = match value {
            Value::Object(obj) if !obj.is_empty() => obj,
            _ => return None,
        };

        let mut rows = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            match val {
                Value::Object(nested) => {
                    for (nested_key, nested_val) in nested {
                        rows.push((nested_key.clone(), Self::value_to_string(nested_val)));
                    }
                }
                other => rows.push((key.clone(), Self::value_to_string(other))),
            }
        }

        Some(rows)
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

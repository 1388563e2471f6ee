//! Output rendering: JSON, YAML and tables, with optional JMESPath filtering
//!
//! Tables understand the shape of ARM payloads: list responses arrive as a
//! `{"value": [...], "nextLink": ...}` envelope, and most interesting fields
//! of a resource sit one level down in `properties`.

use anyhow::{Context, Result};
use comfy_table::Table;
use jpx_core::Runtime;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Arrays longer than this are summarized in table cells
const INLINE_ARRAY_LIMIT: usize = 3;

fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| Runtime::builder().with_all_extensions().build())
}

/// Backtick literal in a JMESPath expression, escapes included
fn literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Static pattern; compiling it cannot fail
    PATTERN.get_or_init(|| Regex::new(r"`((?:[^`\\]|\\.)*)`").unwrap())
}

/// JMESPath literals must be JSON; `` `westeurope` `` becomes `` `"westeurope"` ``
fn quote_literal(literal: &str) -> Cow<'_, str> {
    let trimmed = literal.trim();
    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return Cow::Borrowed(literal);
    }
    Cow::Owned(Value::String(trimmed.to_string()).to_string())
}

fn normalize_query(query: &str) -> String {
    literal_pattern()
        .replace_all(query, |caps: &Captures| format!("`{}`", quote_literal(&caps[1])))
        .into_owned()
}

/// Apply an optional JMESPath query to a value
pub fn apply_query(value: Value, query: Option<&str>) -> Result<Value> {
    let Some(query) = query else {
        return Ok(value);
    };
    let expr = runtime()
        .compile(&normalize_query(query))
        .with_context(|| format!("Invalid JMESPath expression: {}", query))?;
    expr.search(&value).context("JMESPath query failed")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl OutputFormat {
    /// Resolve the CLI choice; `auto` falls back to `auto_default`
    pub fn resolve(format: crate::cli::OutputFormat, auto_default: OutputFormat) -> Self {
        match format {
            crate::cli::OutputFormat::Auto => auto_default,
            crate::cli::OutputFormat::Json => OutputFormat::Json,
            crate::cli::OutputFormat::Yaml => OutputFormat::Yaml,
            crate::cli::OutputFormat::Table => OutputFormat::Table,
        }
    }
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat, query: Option<&str>) -> Result<()> {
    let value = apply_query(serde_json::to_value(data)?, query)?;

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&value)?,
        OutputFormat::Table => render_table(&value),
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Render a value as a table
///
/// A list of resources gets one row per resource, a single resource one row
/// per field. Scalars print as-is.
fn render_table(value: &Value) -> String {
    match list_items(value) {
        Some([]) => "No resources found.".to_string(),
        Some(items) if items.iter().all(Value::is_object) => {
            let rows: Vec<Map<String, Value>> = items
                .iter()
                .filter_map(Value::as_object)
                .map(flatten_resource)
                .collect();

            // Union of columns, in order of first appearance
            let mut columns: Vec<&String> = Vec::new();
            for row in &rows {
                for key in row.keys() {
                    if !columns.contains(&key) {
                        columns.push(key);
                    }
                }
            }

            let mut table = Table::new();
            table.set_header(columns.iter().map(|c| c.as_str()));
            for row in &rows {
                table.add_row(
                    columns
                        .iter()
                        .map(|c| row.get(*c).map(format_cell).unwrap_or_default()),
                );
            }
            table.to_string()
        }
        Some(items) => {
            let mut table = Table::new();
            table.set_header(["Value"]);
            for item in items {
                table.add_row([format_cell(item)]);
            }
            table.to_string()
        }
        None => match value {
            Value::Object(resource) => {
                let mut table = Table::new();
                table.set_header(["Field", "Value"]);
                for (key, val) in flatten_resource(resource) {
                    table.add_row([key, format_cell(&val)]);
                }
                table.to_string()
            }
            other => format_cell(other),
        },
    }
}

/// Items of a bare array or of an ARM list envelope
fn list_items(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(obj) => match obj.get("value") {
            Some(Value::Array(items)) if obj.keys().all(|k| k == "value" || k == "nextLink") => {
                Some(items)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Lift `properties.*` next to the top-level fields
///
/// Top-level fields win on a name clash. `sku` collapses to its name.
fn flatten_resource(resource: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (key, value) in resource {
        match (key.as_str(), value) {
            ("properties", Value::Object(properties)) => {
                for (pkey, pvalue) in properties {
                    if !resource.contains_key(pkey) {
                        flat.insert(pkey.clone(), pvalue.clone());
                    }
                }
            }
            ("sku", Value::Object(sku)) if sku.contains_key("name") => {
                flat.insert(key.clone(), sku["name"].clone());
            }
            _ => {
                flat.insert(key.clone(), value.clone());
            }
        }
    }
    flat
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items)
            if items.len() <= INLINE_ARRAY_LIMIT && items.iter().all(is_scalar) =>
        {
            items.iter().map(format_cell).collect::<Vec<_>>().join(", ")
        }
        Value::Array(items) => format!("[{} items]", items.len()),
        // Tags and similar string maps read fine inline
        Value::Object(obj) if obj.values().all(Value::is_string) => obj
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_quotes_bare_literals() {
        assert_eq!(
            normalize_query(r#"[?kind==`StorageV2` && location==`eastus`]"#),
            r#"[?kind==`"StorageV2"` && location==`"eastus"`]"#
        );
    }

    #[test]
    fn test_normalize_keeps_json_literals() {
        for query in [
            r#"[?name==`"foo"`]"#,
            r#"[?count==`123`]"#,
            r#"[?enabled==`true`]"#,
            r#"`[1, 2, 3]`"#,
        ] {
            assert_eq!(normalize_query(query), query);
        }
    }

    #[test]
    fn test_apply_query_filters_values() {
        let accounts = json!([
            {"name": "a1", "location": "westeurope"},
            {"name": "a2", "location": "eastus"},
        ]);
        let names = apply_query(accounts, Some("[?location==`westeurope`].name")).unwrap();
        assert_eq!(names, json!(["a1"]));
    }

    #[test]
    fn test_apply_query_rejects_invalid_expression() {
        let err = apply_query(json!({}), Some("[?")).unwrap_err();
        assert!(err.to_string().contains("Invalid JMESPath"));
    }

    #[test]
    fn test_table_unwraps_list_envelope() {
        let rendered = render_table(&json!({
            "value": [
                {"name": "vnet1", "location": "westeurope",
                 "properties": {"provisioningState": "Succeeded"}},
                {"name": "vnet2", "location": "eastus", "tags": {"env": "dev"}},
            ],
            "nextLink": null
        }));
        assert!(rendered.contains("provisioningState"));
        assert!(rendered.contains("vnet2"));
        assert!(rendered.contains("env=dev"));
    }

    #[test]
    fn test_table_for_empty_list() {
        assert_eq!(render_table(&json!({"value": []})), "No resources found.");
    }

    #[test]
    fn test_flatten_resource_lifts_properties() {
        let flat = flatten_resource(
            json!({
                "name": "acct",
                "sku": {"name": "Standard_LRS", "tier": "Standard"},
                "properties": {"name": "shadowed", "accessTier": "Hot"}
            })
            .as_object()
            .unwrap(),
        );
        assert_eq!(flat["name"], "acct");
        assert_eq!(flat["sku"], "Standard_LRS");
        assert_eq!(flat["accessTier"], "Hot");
        assert!(!flat.contains_key("properties"));
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&Value::Null), "-");
        assert_eq!(format_cell(&json!(["10.0.0.0/16"])), "10.0.0.0/16");
        assert_eq!(format_cell(&json!([1, 2, 3, 4])), "[4 items]");
        assert_eq!(format_cell(&json!({"a": {"b": 1}})), "{1 fields}");
    }

    #[test]
    fn test_resolve_auto_uses_default() {
        assert_eq!(
            OutputFormat::resolve(crate::cli::OutputFormat::Auto, OutputFormat::Table),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::resolve(crate::cli::OutputFormat::Yaml, OutputFormat::Table),
            OutputFormat::Yaml
        );
    }
}

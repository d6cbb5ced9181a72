//! Output formatting: table or JSON.
//!
//! Table uses `tabled` row types; JSON serializes the original data.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use hadash_core::{CatalogEntry, DisplaySensor};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Row types ────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct SensorRow<'a> {
    #[tabled(rename = "ENTITY")]
    pub key: &'a str,
    #[tabled(rename = "NAME")]
    pub title: &'a str,
    #[tabled(rename = "STATE")]
    pub state: &'a str,
    #[tabled(rename = "TYPE")]
    pub kind: &'a str,
}

impl<'a> From<&'a DisplaySensor> for SensorRow<'a> {
    fn from(s: &'a DisplaySensor) -> Self {
        Self {
            key: &s.key,
            title: &s.title,
            state: &s.state,
            kind: &s.kind,
        }
    }
}

#[derive(Tabled)]
pub struct CatalogRow<'a> {
    #[tabled(rename = "ENTITY")]
    pub key: &'a str,
    #[tabled(rename = "NAME")]
    pub title: &'a str,
}

impl<'a> From<&'a CatalogEntry> for CatalogRow<'a> {
    fn from(e: &'a CatalogEntry) -> Self {
        Self {
            key: &e.key,
            title: &e.title,
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list in the chosen format.
pub fn render_list<'a, T, R>(format: OutputFormat, data: &'a [T]) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled + From<&'a T>,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(R::from).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
    }
}

/// Render a single item; `detail` supplies the table form.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
    }
}

/// Print the rendered output to stdout.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    if rows.is_empty() {
        return String::from("(none)");
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let text = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sensors() -> Vec<DisplaySensor> {
        vec![DisplaySensor {
            key: "sensor.humidity".into(),
            title: "Humidity".into(),
            state: "42%".into(),
            kind: "sensor".into(),
        }]
    }

    #[test]
    fn table_has_headers_and_values() {
        let out = render_list::<_, SensorRow<'_>>(OutputFormat::Table, &sensors()).unwrap();
        assert!(out.contains("ENTITY"));
        assert!(out.contains("42%"));
    }

    #[test]
    fn compact_json_keeps_wire_field_names() {
        let out = render_list::<_, SensorRow<'_>>(OutputFormat::JsonCompact, &sensors()).unwrap();
        assert_eq!(
            out,
            r#"[{"key":"sensor.humidity","title":"Humidity","state":"42%","type":"sensor"}]"#
        );
    }

    #[test]
    fn empty_table_says_none() {
        let out = render_list::<CatalogEntry, CatalogRow<'_>>(OutputFormat::Table, &[]).unwrap();
        assert_eq!(out, "(none)");
    }
}

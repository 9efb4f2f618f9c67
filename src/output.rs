//! Rendering of filled rows.
//!
//! Three formats are supported: a padded table, raw space separated lines and
//! JSON. Empty cells render as empty strings (table, raw) or `null` (JSON).

use std::io::{self, Write};

use clap::ValueEnum;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::column::{CellValue, Column, JsonType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Raw,
    Json,
}

pub type Row = Vec<Option<CellValue>>;

/// Renders rows for a fixed column list.
#[derive(Debug, Clone)]
pub struct Renderer {
    format: OutputFormat,
    columns: Vec<Column>,
    noheadings: bool,
    notruncate: bool,
    /// Terminal width the table should fit in, if known.
    width: Option<usize>,
}

impl Renderer {
    pub fn new(format: OutputFormat, columns: &[Column]) -> Self {
        Self {
            format,
            columns: columns.to_vec(),
            noheadings: false,
            notruncate: false,
            width: None,
        }
    }

    pub fn noheadings(mut self, noheadings: bool) -> Self {
        self.noheadings = noheadings;
        self
    }

    pub fn notruncate(mut self, notruncate: bool) -> Self {
        self.notruncate = notruncate;
        self
    }

    pub fn width(mut self, width: Option<usize>) -> Self {
        self.width = width;
        self
    }

    pub fn render<W: Write>(&self, rows: &[Row], out: &mut W) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => self.render_table(rows, out),
            OutputFormat::Raw => self.render_raw(rows, out),
            OutputFormat::Json => self.render_json(rows, out),
        }
    }

    fn headings(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Column widths, shrinking truncatable columns to fit `self.width`.
    fn widths(&self, cells: &[Vec<String>]) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let header = if self.noheadings { 0 } else { col.name().len() };
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(header)
            })
            .collect();

        let Some(limit) = self.width.filter(|_| !self.notruncate) else {
            return widths;
        };
        let total = |w: &[usize]| w.iter().sum::<usize>() + w.len().saturating_sub(1);
        for (i, col) in self.columns.iter().enumerate().rev() {
            let excess = total(&widths).saturating_sub(limit);
            if excess == 0 {
                break;
            }
            if col.info().truncate {
                let floor = col.name().len();
                widths[i] = widths[i].saturating_sub(excess).max(floor);
            }
        }
        widths
    }

    fn render_table<W: Write>(&self, rows: &[Row], out: &mut W) -> io::Result<()> {
        let cells: Vec<Vec<String>> = rows.iter().map(|r| cell_strings(r)).collect();
        let widths = self.widths(&cells);

        if !self.noheadings {
            self.write_table_line(&self.headings(), &widths, out)?;
        }
        for row in &cells {
            self.write_table_line(row, &widths, out)?;
        }
        Ok(())
    }

    fn write_table_line<W: Write>(
        &self,
        cells: &[String],
        widths: &[usize],
        out: &mut W,
    ) -> io::Result<()> {
        let last = cells.len().saturating_sub(1);
        let mut line = String::new();
        for (i, (cell, col)) in cells.iter().zip(&self.columns).enumerate() {
            let width = widths[i];
            let cell: String = cell.chars().take(width).collect();
            if i > 0 {
                line.push(' ');
            }
            if col.json_type() == JsonType::Number {
                line.push_str(&format!("{:>width$}", cell, width = width));
            } else if i == last {
                line.push_str(&cell);
            } else {
                line.push_str(&format!("{:<width$}", cell, width = width));
            }
        }
        writeln!(out, "{}", line.trim_end())
    }

    fn render_raw<W: Write>(&self, rows: &[Row], out: &mut W) -> io::Result<()> {
        if !self.noheadings {
            writeln!(out, "{}", self.headings().join(" "))?;
        }
        for row in rows {
            let line: Vec<String> = cell_strings(row).iter().map(|c| raw_escape(c)).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        Ok(())
    }

    fn render_json<W: Write>(&self, rows: &[Row], out: &mut W) -> io::Result<()> {
        let doc = JsonDocument {
            columns: &self.columns,
            rows,
        };
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)
    }
}

fn cell_strings(row: &[Option<CellValue>]) -> Vec<String> {
    row.iter()
        .map(|c| c.as_ref().map(ToString::to_string).unwrap_or_default())
        .collect()
}

/// Hex-escapes characters that would break the field separation.
pub fn raw_escape(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    for c in cell.chars() {
        if c.is_whitespace() || c == '\\' || c.is_control() {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("\\x{:02x}", b));
            }
        } else {
            out.push(c);
        }
    }
    out
}

struct JsonDocument<'a> {
    columns: &'a [Column],
    rows: &'a [Row],
}

struct JsonRow<'a> {
    columns: &'a [Column],
    cells: &'a [Option<CellValue>],
}

struct JsonRows<'a>(&'a JsonDocument<'a>);

impl Serialize for JsonDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("lsfd", &JsonRows(self))?;
        map.end()
    }
}

impl Serialize for JsonRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in self.0.rows {
            seq.serialize_element(&JsonRow {
                columns: self.0.columns,
                cells: row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (col, cell) in self.columns.iter().zip(self.cells) {
            let key = col.name().to_lowercase();
            map.serialize_entry(&key, &cell.as_ref().map(CellValue::to_json))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            vec![
                Some("bash".into()),
                Some(CellValue::Num(1234)),
                Some("/dev/pts/0".into()),
            ],
            vec![Some("sshd".into()), Some(CellValue::Num(7)), None],
        ]
    }

    fn render(renderer: &Renderer, rows: &[Row]) -> String {
        let mut out = Vec::new();
        renderer.render(rows, &mut out).expect("write to vec");
        String::from_utf8(out).expect("utf-8 output")
    }

    // -------------------------------------------------------------------------
    // Tests for table output
    // -------------------------------------------------------------------------

    #[test]
    fn test_table_pads_and_right_aligns_numbers() {
        let columns = [Column::Command, Column::Pid, Column::Name];
        let out = render(&Renderer::new(OutputFormat::Table, &columns), &rows());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "COMMAND  PID NAME");
        assert_eq!(lines[1], "bash    1234 /dev/pts/0");
        assert_eq!(lines[2], "sshd       7");
    }

    #[test]
    fn test_table_noheadings() {
        let columns = [Column::Command, Column::Pid, Column::Name];
        let renderer = Renderer::new(OutputFormat::Table, &columns).noheadings(true);
        let out = render(&renderer, &rows());
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("bash"));
    }

    #[test]
    fn test_table_truncates_long_columns_to_width() {
        let columns = [Column::Command, Column::Pid, Column::Name];
        let narrow = Renderer::new(OutputFormat::Table, &columns).width(Some(14));
        let out = render(&narrow, &rows());
        assert_eq!(out.lines().nth(1), Some("bash    1234 /dev"));

        let untouched = narrow.notruncate(true);
        let out = render(&untouched, &rows());
        assert_eq!(out.lines().nth(1), Some("bash    1234 /dev/pts/0"));
    }

    // -------------------------------------------------------------------------
    // Tests for raw and JSON output
    // -------------------------------------------------------------------------

    #[test]
    fn test_raw_escapes_whitespace() {
        let columns = [Column::Command, Column::Name];
        let rows = vec![vec![Some("kworker".into()), Some("/tmp/a b".into())]];
        let out = render(&Renderer::new(OutputFormat::Raw, &columns), &rows);
        assert_eq!(out, "COMMAND NAME\nkworker /tmp/a\\x20b\n");
    }

    #[test]
    fn test_json_keeps_column_order_and_types() {
        let columns = [Column::Name, Column::Pid, Column::Deleted];
        let rows = vec![vec![Some("/tmp/x".into()), Some(CellValue::Num(3)), None]];
        let out = render(&Renderer::new(OutputFormat::Json, &columns), &rows);

        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        let row = &value["lsfd"][0];
        assert_eq!(row["name"], "/tmp/x");
        assert_eq!(row["pid"], 3);
        assert!(row["deleted"].is_null());

        let name_at = out.find("\"name\"").expect("name key");
        let pid_at = out.find("\"pid\"").expect("pid key");
        assert!(name_at < pid_at);
    }

    #[test]
    fn test_output_format_names() {
        let parsed: OutputFormat = serde_yaml::from_str("json").expect("known format");
        assert_eq!(parsed, OutputFormat::Json);
        assert!(serde_yaml::from_str::<OutputFormat>("xml").is_err());
    }
}

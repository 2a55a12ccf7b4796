//! Plain-text tables for the pretty output format.
//!
//! ```text
//! ID       │ NAME   │ STATE
//! ─────────┼────────┼───────
//! 1f0c…    │ my-key │ active
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use console::measure_text_width;

const COLUMN_SEPARATOR: &str = " │ ";
const RULE_JOINT: &str = "─┼─";

/// One table cell. Absent values render empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell(String);

impl Cell {
    /// Renders a timestamp as `YYYY-MM-DD HH:MM:SS`.
    #[must_use]
    pub fn time(value: Option<DateTime<Utc>>) -> Self {
        Self(
            value
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        )
    }

    /// Renders a list as comma separated values.
    #[must_use]
    pub fn list<T: fmt::Display>(values: &[T]) -> Self {
        Self(
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    /// The cell's text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for Cell {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl<T: fmt::Display> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        Self(value.map(|v| v.to_string()).unwrap_or_default())
    }
}

macro_rules! display_cells {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Cell {
            fn from(value: $ty) -> Self {
                Self(value.to_string())
            }
        })*
    };
}

display_cells!(bool, i64, u64, i32, u32, usize, f64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Row {
    Cells(Vec<Cell>),
    Separator,
}

/// A column/row table with an optional title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    title: Option<String>,
    header: Vec<String>,
    rows: Vec<Row>,
    auto_merge: Vec<usize>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a two-column table for `add_pair`.
    #[must_use]
    pub fn key_value() -> Self {
        Self::default()
    }

    /// Sets the title printed above the table.
    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the header row.
    pub fn set_header<I, S>(&mut self, header: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = header.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a row.
    pub fn add_row<I>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = Cell>,
    {
        self.rows.push(Row::Cells(cells.into_iter().collect()));
        self
    }

    /// Appends a key/value row.
    pub fn add_pair(&mut self, key: &str, value: impl Into<Cell>) -> &mut Self {
        self.rows
            .push(Row::Cells(vec![Cell::from(key), value.into()]));
        self
    }

    /// Appends a horizontal rule.
    pub fn add_separator(&mut self) -> &mut Self {
        self.rows.push(Row::Separator);
        self
    }

    /// Blanks cells of `column` equal to the cell above.
    pub fn enable_auto_merge(&mut self, column: usize) -> &mut Self {
        if !self.auto_merge.contains(&column) {
            self.auto_merge.push(column);
        }
        self
    }

    /// True if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| matches!(r, Row::Separator))
    }

    fn merged_rows(&self) -> Vec<Option<Vec<String>>> {
        let mut previous: Option<&Vec<Cell>> = None;
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match row {
                Row::Separator => {
                    previous = None;
                    out.push(None);
                }
                Row::Cells(cells) => {
                    let rendered = cells
                        .iter()
                        .enumerate()
                        .map(|(i, cell)| {
                            let same_as_above = self.auto_merge.contains(&i)
                                && previous.and_then(|p| p.get(i)) == Some(cell);
                            if same_as_above { String::new() } else { cell.0.clone() }
                        })
                        .collect();
                    previous = Some(cells);
                    out.push(Some(rendered));
                }
            }
        }
        out
    }

    /// Renders the table. The result ends with a newline.
    #[must_use]
    pub fn render(&self) -> String {
        let rows = self.merged_rows();
        let columns = rows
            .iter()
            .flatten()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0usize; columns];
        let all_cells = rows.iter().flatten().chain(std::iter::once(&self.header));
        for cells in all_cells {
            for (i, cell) in cells.iter().enumerate() {
                let width = cell.lines().map(measure_text_width).max().unwrap_or(0);
                widths[i] = widths[i].max(width);
            }
        }

        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push('\n');
        }
        if !self.header.is_empty() {
            push_cells(&mut out, &self.header, &widths);
            push_rule(&mut out, &widths);
        }
        for row in &rows {
            match row {
                Some(cells) => push_cells(&mut out, cells, &widths),
                None => push_rule(&mut out, &widths),
            }
        }
        out
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn push_cells(out: &mut String, cells: &[String], widths: &[usize]) {
    let height = cells.iter().map(|c| c.lines().count().max(1)).max().unwrap_or(1);
    for line_no in 0..height {
        let line = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let text = cells
                    .get(i)
                    .and_then(|c| c.lines().nth(line_no))
                    .unwrap_or("");
                let pad = width.saturating_sub(measure_text_width(text));
                format!("{text}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join(COLUMN_SEPARATOR);
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

fn push_rule(out: &mut String, widths: &[usize]) {
    let rule = widths
        .iter()
        .map(|w| "─".repeat(*w))
        .collect::<Vec<_>>()
        .join(RULE_JOINT);
    out.push_str(&rule);
    out.push('\n');
}

/// Renders several tables separated by blank lines.
#[must_use]
pub fn render_tables(tables: &[Table]) -> String {
    tables
        .iter()
        .map(Table::render)
        .collect::<Vec<_>>()
        .join("\n")
}

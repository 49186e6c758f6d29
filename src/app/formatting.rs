//! Output rendering for the CLI: framed tables, raw columns, JSON and CSV.

use crate::config::cli::OutputFormat;
use crate::utils::error::Result;
use crate::utils::filter::{lookup, lookup_str};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// A value paired with the text shown for it in tables.
///
/// JSON output keeps `original`; table output shows `formatted`; raw output
/// prints `original` (`NULL` when absent).
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedItem {
    pub original: Value,
    pub formatted: String,
}

impl FormattedItem {
    pub fn new(original: impl Into<Value>, formatted: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            formatted: formatted.into(),
        }
    }

    /// 以 JSON 值本身作為顯示文字
    pub fn from_value(original: Value) -> Self {
        match original {
            Value::Null => blank(),
            Value::String(s) => Self::new(s.clone(), s),
            other => {
                let formatted = other.to_string();
                Self {
                    original: other,
                    formatted,
                }
            }
        }
    }

    fn raw_text(&self) -> String {
        match &self.original {
            Value::Null => "NULL".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FormattedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

/// 表格儲存格：一般值或巢狀表格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Item(FormattedItem),
    Table(Box<Table>),
}

impl Cell {
    fn text(&self, format: OutputFormat) -> String {
        match (self, format) {
            (Cell::Item(item), OutputFormat::Raw) => item.raw_text(),
            (Cell::Item(item), _) => item.formatted.clone(),
            (Cell::Table(table), OutputFormat::Raw) => table.render_raw(),
            (Cell::Table(table), _) => table.render_framed(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Item(item) => item.original.clone(),
            Cell::Table(table) => table.to_json(),
        }
    }

    fn sort_key(&self) -> Option<&Value> {
        match self {
            Cell::Item(item) => Some(&item.original),
            Cell::Table(_) => None,
        }
    }
}

impl From<FormattedItem> for Cell {
    fn from(item: FormattedItem) -> Self {
        Cell::Item(item)
    }
}

impl From<Table> for Cell {
    fn from(table: Table) -> Self {
        Cell::Table(Box::new(table))
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        Cell::Item(FormattedItem::from_value(value))
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        Cell::Item(FormattedItem::from_value(value.clone()))
    }
}

impl From<Option<&Value>> for Cell {
    fn from(value: Option<&Value>) -> Self {
        value.map_or_else(|| Cell::Item(blank()), Cell::from)
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Item(FormattedItem::new(text, text))
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Item(FormattedItem::new(text.clone(), text))
    }
}

impl From<Option<&str>> for Cell {
    fn from(text: Option<&str>) -> Self {
        text.map_or_else(|| Cell::Item(blank()), Cell::from)
    }
}

impl From<Option<String>> for Cell {
    fn from(text: Option<String>) -> Self {
        text.map_or_else(|| Cell::Item(blank()), Cell::from)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Item(FormattedItem::new(n, n.to_string()))
    }
}

impl From<u64> for Cell {
    fn from(n: u64) -> Self {
        Cell::Item(FormattedItem::new(n, n.to_string()))
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Item(FormattedItem::new(b, b.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub title: Option<String>,
    pub sortby: Option<String>,
    align: HashMap<String, Align>,
    key_value: bool,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            title: None,
            sortby: None,
            align: HashMap::new(),
            key_value: false,
        }
    }

    /// 兩欄（name / value）表格，JSON 輸出時轉為物件
    pub fn key_value() -> Self {
        let mut table = Self::new(["name", "value"]);
        table.key_value = true;
        table.set_align("name", Align::Right);
        table.set_align("value", Align::Left);
        table
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn set_align(&mut self, column: &str, align: Align) {
        self.align.insert(column.to_string(), align);
    }

    pub fn add_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Value {
        if self.key_value {
            let mut object = Map::new();
            for row in &self.rows {
                if let [name, value, ..] = row.as_slice() {
                    object.insert(name.text(OutputFormat::Table), value.to_json());
                }
            }
            return Value::Object(object);
        }

        Value::Array(
            self.sorted_rows()
                .into_iter()
                .map(|row| {
                    Value::Object(
                        self.columns
                            .iter()
                            .zip(row.iter())
                            .map(|(column, cell)| (column.clone(), cell.to_json()))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    fn sorted_rows(&self) -> Vec<&Vec<Cell>> {
        let mut rows: Vec<&Vec<Cell>> = self.rows.iter().collect();
        let Some(index) = self
            .sortby
            .as_ref()
            .and_then(|column| self.columns.iter().position(|c| c == column))
        else {
            return rows;
        };
        rows.sort_by(|a, b| compare_cells(a.get(index), b.get(index)));
        rows
    }

    fn cell_lines(&self, format: OutputFormat) -> Vec<Vec<Vec<String>>> {
        self.sorted_rows()
            .into_iter()
            .map(|row| {
                (0..self.columns.len())
                    .map(|i| {
                        let text = row.get(i).map_or_else(|| "-".to_string(), |c| c.text(format));
                        text.lines().map(str::to_string).collect::<Vec<_>>()
                    })
                    .collect()
            })
            .collect()
    }

    fn widths(&self, rows: &[Vec<Vec<String>>], with_header: bool) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let header = if with_header { width_of(column) } else { 0 };
                rows.iter()
                    .flat_map(|row| row[i].iter())
                    .map(|line| width_of(line))
                    .chain(std::iter::once(header))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn align_of(&self, column: &str) -> Align {
        self.align.get(column).copied().unwrap_or(Align::Center)
    }

    /// `:` 與 `.` 組成的外框，僅在標題與表頭下方畫橫線
    pub fn render_framed(&self) -> String {
        let rows = self.cell_lines(OutputFormat::Table);
        let mut widths = self.widths(&rows, true);
        let inner: usize = widths.iter().map(|w| w + 2).sum::<usize>() + widths.len().saturating_sub(1);

        // 標題比欄位總寬還長時，把差額補在最後一欄
        if let Some(title) = &self.title {
            let needed = width_of(title) + 2;
            if needed > inner {
                if let Some(last) = widths.last_mut() {
                    *last += needed - inner;
                }
            }
        }
        let inner: usize = widths.iter().map(|w| w + 2).sum::<usize>() + widths.len().saturating_sub(1);

        let rule = format!(
            ":{}:",
            widths
                .iter()
                .map(|w| ".".repeat(w + 2))
                .collect::<Vec<_>>()
                .join(":")
        );

        let mut out = Vec::new();
        if let Some(title) = &self.title {
            out.push(format!(":{}:", ".".repeat(inner)));
            out.push(format!(":{}:", pad(title, inner, Align::Center)));
        }
        out.push(rule.clone());
        out.push(self.framed_line(
            &self.columns.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            &widths,
        ));
        out.push(rule.clone());

        for row in &rows {
            let height = row.iter().map(Vec::len).max().unwrap_or(1).max(1);
            for line in 0..height {
                let cells: Vec<&str> = row
                    .iter()
                    .map(|lines| lines.get(line).map(String::as_str).unwrap_or(""))
                    .collect();
                out.push(self.framed_line(&cells, &widths));
            }
        }
        out.push(rule);
        out.join("\n")
    }

    fn framed_line(&self, cells: &[&str], widths: &[usize]) -> String {
        let parts: Vec<String> = self
            .columns
            .iter()
            .zip(cells.iter().zip(widths))
            .map(|(column, (text, width))| format!(" {} ", pad(text, *width, self.align_of(column))))
            .collect();
        format!(":{}:", parts.join(":"))
    }

    /// 無外框、無表頭、靠左，欄位間以兩個空白分隔
    pub fn render_raw(&self) -> String {
        let rows = self.cell_lines(OutputFormat::Raw);
        let widths = self.widths(&rows, false);
        let mut out = Vec::new();
        for row in &rows {
            let height = row.iter().map(Vec::len).max().unwrap_or(1).max(1);
            for line in 0..height {
                let text: String = row
                    .iter()
                    .zip(&widths)
                    .map(|(lines, width)| {
                        format!("{}  ", pad(lines.get(line).map(String::as_str).unwrap_or(""), *width, Align::Left))
                    })
                    .collect();
                out.push(text.trim_end().to_string());
            }
        }
        out.join("\n")
    }

    pub fn render_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in self.sorted_rows() {
            let record: Vec<String> = (0..self.columns.len())
                .map(|i| match row.get(i) {
                    Some(Cell::Table(table)) => table.to_json().to_string(),
                    Some(cell) => cell.text(OutputFormat::Csv),
                    None => String::new(),
                })
                .collect();
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
    }
}

fn width_of(text: &str) -> usize {
    text.chars().count()
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text, width = width),
        Align::Right => format!("{:>width$}", text, width = width),
        Align::Center => format!("{:^width$}", text, width = width),
    }
}

fn compare_cells(a: Option<&Cell>, b: Option<&Cell>) -> Ordering {
    match (a.and_then(Cell::sort_key), b.and_then(Cell::sort_key)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => {
            let x = a.map(|c| c.text(OutputFormat::Table)).unwrap_or_default();
            let y = b.map(|c| c.text(OutputFormat::Table)).unwrap_or_default();
            x.cmp(&y)
        }
    }
}

/// Anything a command can hand to the environment for printing.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    Item(FormattedItem),
    Table(Table),
    Value(Value),
    Sequence(Vec<Output>),
}

impl From<Table> for Output {
    fn from(table: Table) -> Self {
        Output::Table(table)
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Output::Text(text)
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Output::Text(text.to_string())
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Value(value)
    }
}

impl From<FormattedItem> for Output {
    fn from(item: FormattedItem) -> Self {
        Output::Item(item)
    }
}

impl From<Vec<Table>> for Output {
    fn from(tables: Vec<Table>) -> Self {
        Output::Sequence(tables.into_iter().map(Output::Table).collect())
    }
}

impl Output {
    pub fn to_json(&self) -> Value {
        match self {
            Output::Text(text) => Value::String(text.clone()),
            Output::Item(item) => item.original.clone(),
            Output::Table(table) => table.to_json(),
            Output::Value(value) => value.clone(),
            Output::Sequence(items) => Value::Array(items.iter().map(Output::to_json).collect()),
        }
    }
}

pub fn format_output(output: &Output, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(to_json_pretty(&output.to_json())?),
        OutputFormat::Jsonraw => Ok(serde_json::to_string(&output.to_json())?),
        _ => format_text(output, format),
    }
}

fn format_text(output: &Output, format: OutputFormat) -> Result<String> {
    Ok(match output {
        Output::Text(text) => text.clone(),
        Output::Item(item) if format == OutputFormat::Raw => item.raw_text(),
        Output::Item(item) => item.formatted.clone(),
        Output::Table(table) => match format {
            OutputFormat::Raw => table.render_raw(),
            OutputFormat::Csv => table.render_csv()?,
            _ => table.render_framed(),
        },
        Output::Value(Value::String(s)) => s.clone(),
        Output::Value(value) => to_json_pretty(value)?,
        Output::Sequence(items) => items
            .iter()
            .map(|item| format_text(item, format))
            .collect::<Result<Vec<_>>>()?
            .join("\n"),
    })
}

/// 四個空白縮排的 JSON
fn to_json_pretty(value: &Value) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    serde::Serialize::serialize(value, &mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// 表格中以 `-` 顯示，raw 輸出為 `NULL`
pub fn blank() -> FormattedItem {
    FormattedItem::new(Value::Null, "-")
}

pub fn mb_to_gb(megabytes: i64) -> FormattedItem {
    FormattedItem::new(megabytes, format!("{}G", megabytes / 1024))
}

pub fn gb(gigabytes: i64) -> FormattedItem {
    FormattedItem::new(gigabytes * 1024, format!("{}G", gigabytes))
}

pub fn listing<I, S>(items: I, separator: &str) -> FormattedItem
where
    I: IntoIterator<Item = S>,
    S: fmt::Display,
{
    let items: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    let formatted = items.join(separator);
    FormattedItem::new(items, formatted)
}

pub fn transaction_status(transaction: Option<&Value>) -> FormattedItem {
    match transaction.and_then(|t| t.get("transactionStatus")) {
        Some(status) if !status.is_null() => FormattedItem::new(
            lookup(status, &["name"]).cloned().unwrap_or(Value::Null),
            lookup_str(status, &["friendlyName"]).unwrap_or("-"),
        ),
        _ => blank(),
    }
}

/// 進行中的交易（沒有則為空白）
pub fn active_txn(item: &Value) -> FormattedItem {
    transaction_status(item.get("activeTransaction"))
}

/// 任意 API 回傳值轉為表格；物件成為 name/value 表，物件陣列成為多欄表
pub fn iter_to_table(value: &Value) -> Output {
    match value {
        Value::Object(_) | Value::Array(_) => match value_to_cell(value) {
            Cell::Table(table) => Output::Table(*table),
            Cell::Item(item) => Output::Item(item),
        },
        other => Output::Item(FormattedItem::from_value(other.clone())),
    }
}

fn value_to_cell(value: &Value) -> Cell {
    match value {
        Value::Object(map) => {
            let mut table = Table::key_value();
            for (key, value) in map {
                table.add_row(vec![key.as_str().into(), value_to_cell(value)]);
            }
            table.into()
        }
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            let mut columns: Vec<String> = Vec::new();
            for item in items.iter().filter_map(Value::as_object) {
                for key in item.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            let mut table = Table::new(columns.clone());
            for item in items {
                table.add_row(
                    columns
                        .iter()
                        .map(|column| item.get(column).map_or_else(|| blank().into(), value_to_cell))
                        .collect(),
                );
            }
            table.into()
        }
        Value::Array(items) => {
            let formatted = items
                .iter()
                .map(|item| FormattedItem::from_value(item.clone()).formatted)
                .collect::<Vec<_>>()
                .join(",");
            FormattedItem::new(value.clone(), formatted).into()
        }
        other => other.into(),
    }
}

//! Column-oriented recording of simulation events.
//!
//! Every `info`-level tracing event becomes one row of the table named by
//! its target. Columns are created on first sight of a field; rows missing
//! a field are padded with a zero value.
//!
//! # Usage
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "incident", tick, perp_id, victim_id, homicide);
//!
//! // In a test:
//! instrument::install_subscriber_for(&["city", "incident"]);
//! // ... run ticks ...
//! let recorder = instrument::drain();
//! let incidents = &recorder.tables["incident"];
//! ```
//!
//! Agent-level targets (`drink_transition`, `mobility`) produce one row per
//! agent per tick; restrict recording to the targets an analysis needs.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Level, Metadata, Subscriber};

// === COLUMNS ===

/// One recorded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

/// A column of typed values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedColumn {
    /// Column of `value`'s type holding `pad` zero values.
    fn padded_for(value: &Value, pad: usize) -> Self {
        match value {
            Value::U64(_) => TypedColumn::U64(vec![0; pad]),
            Value::I64(_) => TypedColumn::I64(vec![0; pad]),
            Value::F64(_) => TypedColumn::F64(vec![0.0; pad]),
            Value::Bool(_) => TypedColumn::Bool(vec![false; pad]),
            Value::Str(_) => TypedColumn::Str(vec![String::new(); pad]),
        }
    }

    /// Append a value. Integers widen into signed and float columns so a
    /// field that is sometimes `-1` keeps one column; any other mismatch
    /// appends the column's zero value.
    fn push(&mut self, value: Value) {
        match (self, value) {
            (TypedColumn::U64(v), Value::U64(x)) => v.push(x),
            (TypedColumn::I64(v), Value::I64(x)) => v.push(x),
            (TypedColumn::I64(v), Value::U64(x)) => v.push(i64::try_from(x).unwrap_or(i64::MAX)),
            (TypedColumn::F64(v), Value::F64(x)) => v.push(x),
            (TypedColumn::F64(v), Value::U64(x)) => v.push(x as f64),
            (TypedColumn::F64(v), Value::I64(x)) => v.push(x as f64),
            (TypedColumn::Bool(v), Value::Bool(x)) => v.push(x),
            (TypedColumn::Str(v), Value::Str(x)) => v.push(x),
            (col, _) => col.pad_to(col.len() + 1),
        }
    }

    fn pad_to(&mut self, len: usize) {
        let missing = len.saturating_sub(self.len());
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedColumn::U64(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
            TypedColumn::Bool(v) => v.len(),
            TypedColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// === TABLES ===

/// Rows recorded under one target. Columns keep the order their fields
/// were first seen in.
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    pub columns: HashMap<String, TypedColumn>,
    pub order: Vec<String>,
    pub row_count: usize,
}

impl DynamicTable {
    /// Append one row of `(field, value)` pairs.
    pub fn push_row(&mut self, row: impl IntoIterator<Item = (String, Value)>) {
        for (name, value) in row {
            let pad = self.row_count;
            let col = self.columns.entry(name.clone()).or_insert_with(|| {
                self.order.push(name);
                TypedColumn::padded_for(&value, pad)
            });
            col.pad_to(pad);
            col.push(value);
        }
        self.row_count += 1;
        for col in self.columns.values_mut() {
            col.pad_to(self.row_count);
        }
    }

    pub fn column(&self, name: &str) -> Option<&TypedColumn> {
        self.columns.get(name)
    }
}

/// Collection of tables, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: BTreeMap<String, DynamicTable>,
}

impl Recorder {
    /// `(target, rows)` for every table.
    pub fn row_counts(&self) -> Vec<(&str, usize)> {
        self.tables
            .iter()
            .map(|(name, t)| (name.as_str(), t.row_count))
            .collect()
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
    /// Targets to record; `None` records every target
    static TARGETS: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

// === SUBSCRIBER ===

/// Collects an event's fields in declaration order.
#[derive(Default)]
struct RowVisitor {
    row: Vec<(String, Value)>,
}

impl Visit for RowVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.row.push((field.name().to_string(), Value::U64(value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.row.push((field.name().to_string(), Value::I64(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.row.push((field.name().to_string(), Value::F64(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.row.push((field.name().to_string(), Value::Bool(value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.row.push((field.name().to_string(), Value::Str(value.to_string())));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.row.push((field.name().to_string(), Value::Str(format!("{value:?}"))));
    }
}

fn wants(target: &str) -> bool {
    TARGETS.with(|t| {
        t.borrow()
            .as_ref()
            .is_none_or(|targets| targets.iter().any(|name| name == target))
    })
}

/// Tracing subscriber that turns `info` events into table rows. Spans are
/// ignored; `debug` diagnostics and warnings are not recorded.
pub struct DataFrameSubscriber;

impl Subscriber for DataFrameSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() == Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target();
        if !wants(target) {
            return;
        }
        let mut visitor = RowVisitor::default();
        event.record(&mut visitor);
        RECORDER.with(|r| {
            r.borrow_mut()
                .tables
                .entry(target.to_string())
                .or_default()
                .push_row(visitor.row);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the subscriber as the global default, recording every target
/// on this thread. Installing twice is harmless.
pub fn install_subscriber() {
    TARGETS.with(|t| *t.borrow_mut() = None);
    let _ = tracing::subscriber::set_global_default(DataFrameSubscriber);
}

/// Install the subscriber, recording only `targets` on this thread.
pub fn install_subscriber_for(targets: &[&str]) {
    TARGETS.with(|t| *t.borrow_mut() = Some(targets.iter().map(|s| s.to_string()).collect()));
    let _ = tracing::subscriber::set_global_default(DataFrameSubscriber);
}

/// Take all recorded tables, leaving the recorder empty.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

// === Polars Integration ===

use polars::prelude::*;

impl DynamicTable {
    /// Convert to a polars DataFrame, columns in first-seen order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .order
            .iter()
            .filter_map(|name| self.columns.get(name).map(|col| (name, col)))
            .map(|(name, col)| match col {
                TypedColumn::U64(v) => Column::new(name.into(), v),
                TypedColumn::I64(v) => Column::new(name.into(), v),
                TypedColumn::F64(v) => Column::new(name.into(), v),
                TypedColumn::Bool(v) => Column::new(name.into(), v),
                TypedColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

impl Recorder {
    /// Convert every table; tables that fail to convert are skipped.
    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

pub fn drain_to_dataframes() -> HashMap<String, DataFrame> {
    drain().to_dataframes()
}

fn io_error(e: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: e.into(),
        msg: None,
    }
}

/// Write each table to `{dir}/{target}.parquet`.
pub fn save_parquet(dfs: &mut HashMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    for (name, df) in dfs.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet"))).map_err(io_error)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

// === RUN DIRECTORIES ===

/// UTC `YYYYMMDD_HHMM` for a time.
fn timestamp_str(t: std::time::SystemTime) -> String {
    let secs = t
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let (days, rem) = (secs.div_euclid(86_400), secs.rem_euclid(86_400));

    // Civil date from days since 1970-01-01, 400-year eras starting in March
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{year:04}{month:02}{day:02}_{:02}{:02}",
        rem / 3600,
        (rem % 3600) / 60
    )
}

/// Keep alphanumerics, `-` and `_`; cap at 60 characters.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(60)
        .collect()
}

/// RAII guard for one recorded run.
///
/// Clears the thread-local recorder on creation. On drop, every table is
/// written to `{parent}/{YYYYMMDD_HHMM}_{name}/{target}.parquet`, followed
/// by an empty `_ready` file once all tables are on disk.
///
/// ```ignore
/// let mut rec = instrument::ScopedRecorder::new("data", "taxation_20pct");
/// for _ in 0..50 { world.run_tick(); }
/// let dfs = rec.get();
/// let city = &dfs["city"];
/// ```
pub struct ScopedRecorder {
    run_dir: PathBuf,
    run_name: String,
    dfs: Option<HashMap<String, DataFrame>>,
}

impl ScopedRecorder {
    /// Record every target.
    pub fn new(parent: impl Into<PathBuf>, name: &str) -> Self {
        let rec = Self::named(parent, name);
        install_subscriber();
        rec
    }

    /// Record only `targets`.
    pub fn with_targets(parent: impl Into<PathBuf>, name: &str, targets: &[&str]) -> Self {
        let rec = Self::named(parent, name);
        install_subscriber_for(targets);
        rec
    }

    fn named(parent: impl Into<PathBuf>, name: &str) -> Self {
        let run_name = format!(
            "{}_{}",
            timestamp_str(std::time::SystemTime::now()),
            sanitize(name)
        );
        clear();
        Self {
            run_dir: parent.into().join(&run_name),
            run_name,
            dfs: None,
        }
    }

    /// Drain the recorder on first call; later calls return the same frames.
    pub fn get(&mut self) -> &HashMap<String, DataFrame> {
        self.dfs.get_or_insert_with(drain_to_dataframes)
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for ScopedRecorder {
    fn drop(&mut self) {
        let mut dfs = self.dfs.take().unwrap_or_else(drain_to_dataframes);
        if dfs.is_empty() {
            return;
        }
        if let Err(e) = save_parquet(&mut dfs, &self.run_dir) {
            eprintln!("ScopedRecorder({}): failed to write parquet: {e}", self.run_name);
            return;
        }
        match std::fs::File::create(self.run_dir.join("_ready")) {
            Ok(_) => eprintln!(
                "ScopedRecorder: wrote {} tables to {}",
                dfs.len(),
                self.run_dir.display()
            ),
            Err(e) => eprintln!("ScopedRecorder({}): failed to write _ready: {e}", self.run_name),
        }
    }
}

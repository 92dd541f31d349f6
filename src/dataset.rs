//! Loading of the running workout history.
//!
//! The CSV is read once at startup into an immutable [`Dataset`]. Four
//! columns are interpreted (`Title`, `WorkoutDay`, `HeartRateAverage` and
//! `Pace`); every other column is kept as a plain [`Cell`] for the table
//! preview.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

pub const TITLE_COLUMN: &str = "Title";
pub const DATE_COLUMN: &str = "WorkoutDay";
pub const HEART_RATE_COLUMN: &str = "HeartRateAverage";
pub const PACE_COLUMN: &str = "Pace";

// `%.f` also matches when there is no fractional part.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
    InvalidDate {
        row: usize,
        value: String,
    },
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "failed to read workout data: {e}"),
            LoadError::Csv(e) => write!(f, "malformed workout CSV: {e}"),
            LoadError::MissingColumn(col) => write!(f, "missing required column `{col}`"),
            LoadError::InvalidDate { row, value } => {
                write!(f, "row {row}: cannot parse {DATE_COLUMN} `{value}`")
            }
            LoadError::InvalidNumber { row, column, value } => {
                write!(f, "row {row}: {column} `{value}` is not a number")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<csv::Error> for LoadError {
    fn from(e: csv::Error) -> Self {
        LoadError::Csv(e)
    }
}

/// A single scalar value from the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Cell {
    /// Interpret a raw CSV field as its natural scalar type.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Cell::Empty;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(raw.to_string()),
        }
    }

}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(dt) => f.write_str(&format_workout_day(*dt)),
        }
    }
}

/// Format a workout date, omitting the time when it is midnight.
pub fn format_workout_day(dt: NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parse a `WorkoutDay` value. Plain dates are taken as midnight.
pub fn parse_workout_day(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    // Offsets are normalised to UTC.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// One row of the workout history.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRecord {
    pub title: String,
    pub workout_day: NaiveDateTime,
    pub heart_rate_avg: Option<f64>,
    pub pace: Option<f64>,
    /// Every cell of the row, in column order.
    pub cells: Vec<Cell>,
}

/// Distinct workout titles in the order they first appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCatalog {
    types: Vec<String>,
}

impl TypeCatalog {
    fn from_records(records: &[WorkoutRecord]) -> Self {
        let mut seen = BTreeSet::new();
        let mut types = Vec::new();
        for r in records {
            if !r.title.is_empty() && seen.insert(r.title.as_str()) {
                types.push(r.title.clone());
            }
        }
        Self { types }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.types.iter().any(|t| t == title)
    }

    /// Index of `title` in first-seen order; used for stable series colors.
    pub fn position(&self, title: &str) -> Option<usize> {
        self.types.iter().position(|t| t == title)
    }

    pub fn to_set(&self) -> BTreeSet<String> {
        self.types.iter().cloned().collect()
    }
}

/// The immutable in-memory workout table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<WorkoutRecord>,
    catalog: TypeCatalog,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<WorkoutRecord>) -> Self {
        let catalog = TypeCatalog::from_records(&records);
        Self {
            columns,
            records,
            catalog,
        }
    }

    /// Load the dataset from a CSV file on disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Parse a CSV stream with a header row.
    ///
    /// Fails if any required column is absent, a `WorkoutDay` cannot be
    /// parsed, or a heart rate or pace is neither blank nor numeric.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, LoadError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let index_of = |name: &'static str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or(LoadError::MissingColumn(name))
        };
        let title_idx = index_of(TITLE_COLUMN)?;
        let date_idx = index_of(DATE_COLUMN)?;
        let hr_idx = index_of(HEART_RATE_COLUMN)?;
        let pace_idx = index_of(PACE_COLUMN)?;

        let mut records = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i + 1;
            let raw = result?;
            let field = |idx: usize| raw.get(idx).unwrap_or("");

            let day_raw = field(date_idx);
            let workout_day = parse_workout_day(day_raw).ok_or_else(|| LoadError::InvalidDate {
                row,
                value: day_raw.to_string(),
            })?;

            let mut cells: Vec<Cell> = (0..columns.len()).map(|c| Cell::parse(field(c))).collect();
            cells[date_idx] = Cell::Date(workout_day);
            // Titles stay text even when they look numeric.
            cells[title_idx] = match field(title_idx) {
                "" => Cell::Empty,
                t => Cell::Text(t.to_string()),
            };

            let heart_rate_avg = numeric(&cells[hr_idx], row, HEART_RATE_COLUMN)?;
            let pace = numeric(&cells[pace_idx], row, PACE_COLUMN)?;

            records.push(WorkoutRecord {
                title: field(title_idx).to_string(),
                workout_day,
                heart_rate_avg,
                pace,
                cells,
            });
        }

        Ok(Self::new(columns, records))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[WorkoutRecord] {
        &self.records
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn numeric(cell: &Cell, row: usize, column: &'static str) -> Result<Option<f64>, LoadError> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(v) => Ok(Some(*v)),
        other => Err(LoadError::InvalidNumber {
            row,
            column,
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "Title,WorkoutDay,HeartRateAverage,Pace,DistanceInMeters\n\
Tempo,2024-01-02,150,5.0,8000\n\
Base,2024-01-03,130,6.0,10000\n\
Tempo,2024-01-05,155,4.9,\n\
Intervals,2024-01-07,,4.2,6000\n";

    #[test]
    fn loads_records_and_passthrough_columns() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(
            ds.columns(),
            ["Title", "WorkoutDay", "HeartRateAverage", "Pace", "DistanceInMeters"]
        );
        let first = &ds.records()[0];
        assert_eq!(first.title, "Tempo");
        assert_eq!(
            first.workout_day,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(first.heart_rate_avg, Some(150.0));
        assert_eq!(first.pace, Some(5.0));
        assert_eq!(first.cells[4], Cell::Number(8000.0));
        assert_eq!(ds.records()[2].cells[4], Cell::Empty);
        assert_eq!(ds.records()[3].heart_rate_avg, None);
    }

    #[test]
    fn catalog_is_first_seen_and_distinct() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.catalog().as_slice(), ["Tempo", "Base", "Intervals"]);
        assert_eq!(ds.catalog().position("Base"), Some(1));
        assert!(!ds.catalog().contains("Fartlek"));
    }

    #[test]
    fn missing_date_column_is_fatal() {
        let data = "Title,HeartRateAverage,Pace\nTempo,150,5.0\n";
        let err = Dataset::from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(DATE_COLUMN)));
        assert_eq!(err.to_string(), "missing required column `WorkoutDay`");
    }

    #[test]
    fn unparseable_date_reports_row() {
        let data = "Title,WorkoutDay,HeartRateAverage,Pace\n\
Tempo,2024-01-02,150,5.0\n\
Base,yesterday,130,6.0\n";
        match Dataset::from_reader(data.as_bytes()) {
            Err(LoadError::InvalidDate { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_heart_rate_is_fatal() {
        let data = "Title,WorkoutDay,HeartRateAverage,Pace\nTempo,2024-01-02,fast,5.0\n";
        let err = Dataset::from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidNumber {
                row: 1,
                column: HEART_RATE_COLUMN,
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::load(dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let ds = Dataset::load(file.path()).unwrap();
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn parse_workout_day_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_workout_day("2024-03-09").unwrap().date(), expected);
        assert_eq!(parse_workout_day("03/09/2024").unwrap().date(), expected);
        let dt = parse_workout_day("2024-03-09 06:30:00").unwrap();
        assert_eq!(format_workout_day(dt), "2024-03-09 06:30:00");
        assert_eq!(
            format_workout_day(parse_workout_day("2024-03-09T00:00:00").unwrap()),
            "2024-03-09"
        );
        assert!(parse_workout_day("March 9").is_none());
    }

    #[test]
    fn parse_workout_day_iso_variants() {
        let six = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        assert_eq!(parse_workout_day("2024-01-02 06:00:00.000"), Some(six));
        assert_eq!(
            parse_workout_day("2024-01-02T06:00:00.250").map(|d| d.nanosecond()),
            Some(250_000_000)
        );
        assert_eq!(parse_workout_day("2024-01-02T06:00"), Some(six));
        assert_eq!(parse_workout_day("2024-01-02T06:00:00Z"), Some(six));
        assert_eq!(parse_workout_day("2024-01-02T08:00:00+02:00"), Some(six));
        assert_eq!(parse_workout_day("2024/01/02").map(|d| d.date()), Some(six.date()));
    }

    #[test]
    fn load_accepts_timestamped_export() {
        let data = "Title,WorkoutDay,HeartRateAverage,Pace\n\
Base,2024-01-02T06:00:00Z,131,6.1\n\
Tempo,2024-01-03 07:15:00.000,150,5.0\n";
        let ds = Dataset::from_reader(data.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(format_workout_day(ds.records()[1].workout_day), "2024-01-03 07:15:00");
    }

    #[test]
    fn cell_parse_natural_types() {
        assert_eq!(Cell::parse(" "), Cell::Empty);
        assert_eq!(Cell::parse("12.5"), Cell::Number(12.5));
        assert_eq!(Cell::parse("easy run"), Cell::Text("easy run".into()));
        assert_eq!(Cell::parse("NaN"), Cell::Text("NaN".into()));
        assert_eq!(Cell::Number(150.0).to_string(), "150");
    }
}

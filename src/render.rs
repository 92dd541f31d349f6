//! Chart descriptions produced from the workout dataset.
//!
//! Every function here is a pure transformation of a borrowed [`Dataset`]
//! into a [`ChartSpec`]. The UI layer decides how to draw the result.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::analysis::histogram_bins;
use crate::dataset::{
    DATE_COLUMN, Dataset, HEART_RATE_COLUMN, PACE_COLUMN, TITLE_COLUMN, TypeCatalog,
    WorkoutRecord,
};

/// Label used when no workout type is selected.
pub const ALL_TYPES: &str = "All Types";

/// Default number of heart rate histogram bins.
pub const DEFAULT_HISTOGRAM_BINS: usize = 40;

/// Plotly's default qualitative palette.
const PALETTE: [Rgba; 10] = [
    Rgba::rgb(0x63, 0x6E, 0xFA),
    Rgba::rgb(0xEF, 0x55, 0x3B),
    Rgba::rgb(0x00, 0xCC, 0x96),
    Rgba::rgb(0xAB, 0x63, 0xFA),
    Rgba::rgb(0xFF, 0xA1, 0x5A),
    Rgba::rgb(0x19, 0xD3, 0xF3),
    Rgba::rgb(0xFF, 0x66, 0x92),
    Rgba::rgb(0xB6, 0xE8, 0x80),
    Rgba::rgb(0xFF, 0x97, 0xFF),
    Rgba::rgb(0xFE, 0xCB, 0x52),
];

const HISTOGRAM_COLOR: Rgba = Rgba {
    r: 102,
    g: 103,
    b: 171,
    a: 0.8,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `0.0..=1.0`.
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Color assigned to the `index`-th workout type.
    pub fn for_series(index: usize) -> Self {
        PALETTE[index % PALETTE.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Scatter,
    /// Bars whose x value is the bin center and y value the count.
    Histogram { bins: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    Numeric,
    /// X values are fractional days since the common era, see [`date_to_x`].
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Source column in the dataset.
    pub field: String,
    pub label: String,
    pub scale: Scale,
}

impl Axis {
    fn numeric(field: &str) -> Self {
        Self {
            field: field.to_string(),
            label: field.to_string(),
            scale: Scale::Numeric,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub color: Rgba,
    pub points: Vec<[f64; 2]>,
}

/// A framework independent description of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    /// Field the series are grouped by, if any.
    pub color_by: Option<String>,
    pub series: Vec<Series>,
    /// Number of dataset rows that matched the filter, including rows that
    /// could not be plotted because of blank values.
    pub row_count: usize,
}

impl ChartSpec {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    pub fn points(&self) -> impl Iterator<Item = &[f64; 2]> {
        self.series.iter().flat_map(|s| s.points.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

/// Current values of the two interactive controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    /// Dropdown value; `None` means every type.
    pub workout_type: Option<String>,
    /// Multi-select value.
    pub selected_types: BTreeSet<String>,
}

impl ControlState {
    /// Initial state: nothing picked in the dropdown, every type selected.
    pub fn new(catalog: &TypeCatalog) -> Self {
        Self {
            workout_type: None,
            selected_types: catalog.to_set(),
        }
    }
}

/// Convert a timestamp to a plot coordinate in days.
pub fn date_to_x(dt: NaiveDateTime) -> f64 {
    dt.date().num_days_from_ce() as f64 + dt.num_seconds_from_midnight() as f64 / 86_400.0
}

/// Inverse of [`date_to_x`], truncated to the calendar day.
pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    if !x.is_finite() {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(x.floor() as i32)
}

/// Scatter of pace against average heart rate, optionally limited to a
/// single workout type.
///
/// `None` and the empty string both select every row. A type that does not
/// occur in the data yields an empty chart.
pub fn render_by_type(dataset: &Dataset, selected: Option<&str>) -> ChartSpec {
    let selected = selected.filter(|t| !t.is_empty());
    let label = selected.unwrap_or(ALL_TYPES);
    log::debug!("Rendering pace/heart rate scatter for {label}");
    if let Some(t) = selected.filter(|t| !dataset.catalog().contains(t)) {
        log::debug!("Workout type {t} does not occur in the data");
    }
    let rows: Vec<&WorkoutRecord> = dataset
        .records()
        .iter()
        .filter(|r| selected.is_none_or(|t| r.title == t))
        .collect();
    ChartSpec {
        kind: ChartKind::Scatter,
        title: Some(format!("Running type is {label}")),
        x: Axis::numeric(PACE_COLUMN),
        y: Axis::numeric(HEART_RATE_COLUMN),
        color_by: Some(TITLE_COLUMN.to_string()),
        series: group_by_title(dataset, &rows, |r| Some([r.pace?, r.heart_rate_avg?])),
        row_count: rows.len(),
    }
}

/// Scatter of workout date against average heart rate for every row whose
/// title is in `selected`.
pub fn render_by_types(dataset: &Dataset, selected: &BTreeSet<String>) -> ChartSpec {
    log::debug!("Rendering training calendar for {} types", selected.len());
    let rows: Vec<&WorkoutRecord> = dataset
        .records()
        .iter()
        .filter(|r| selected.contains(&r.title))
        .collect();
    ChartSpec {
        kind: ChartKind::Scatter,
        title: None,
        x: Axis {
            field: DATE_COLUMN.to_string(),
            label: DATE_COLUMN.to_string(),
            scale: Scale::Date,
        },
        y: Axis::numeric(HEART_RATE_COLUMN),
        color_by: Some(TITLE_COLUMN.to_string()),
        series: group_by_title(dataset, &rows, |r| {
            Some([date_to_x(r.workout_day), r.heart_rate_avg?])
        }),
        row_count: rows.len(),
    }
}

/// Histogram of average heart rate across the whole dataset.
pub fn heart_rate_histogram(dataset: &Dataset, bins: usize) -> ChartSpec {
    let values: Vec<f64> = dataset
        .records()
        .iter()
        .filter_map(|r| r.heart_rate_avg)
        .collect();
    let points = histogram_bins(&values, bins)
        .into_iter()
        .map(|b| [b.center(), b.count as f64])
        .collect();
    ChartSpec {
        kind: ChartKind::Histogram { bins },
        title: None,
        x: Axis::numeric(HEART_RATE_COLUMN),
        y: Axis {
            field: String::new(),
            label: "count".to_string(),
            scale: Scale::Numeric,
        },
        color_by: None,
        series: vec![Series {
            name: HEART_RATE_COLUMN.to_string(),
            color: HISTOGRAM_COLOR,
            points,
        }],
        row_count: values.len(),
    }
}

/// Group rows into one series per title, ordered by catalog position.
///
/// Rows for which `point` returns `None` are left out of the series.
fn group_by_title<F>(dataset: &Dataset, rows: &[&WorkoutRecord], point: F) -> Vec<Series>
where
    F: Fn(&WorkoutRecord) -> Option<[f64; 2]>,
{
    let catalog = dataset.catalog();
    let mut series: Vec<Series> = Vec::new();
    for &r in rows {
        let Some(p) = point(r) else { continue };
        match series.iter_mut().find(|s| s.name == r.title) {
            Some(s) => s.points.push(p),
            None => series.push(Series {
                name: r.title.clone(),
                color: Rgba::for_series(catalog.position(&r.title).unwrap_or(catalog.len())),
                points: vec![p],
            }),
        }
    }
    series.sort_by_key(|s| catalog.position(&s.name).unwrap_or(usize::MAX));
    series
}

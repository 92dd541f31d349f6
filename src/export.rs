use crate::dataset::{Cell, Dataset};
use crate::render::ChartSpec;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(std::io::Error::other)
}

pub fn save_chart_json<P: AsRef<Path>>(path: P, spec: &ChartSpec) -> std::io::Result<()> {
    write_json(spec, path)
}

/// Write the header and the given dataset rows, in order, as CSV.
pub fn write_rows_csv(writer: impl Write, dataset: &Dataset, rows: &[usize]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(dataset.columns())?;
    for &i in rows {
        if let Some(r) = dataset.records().get(i) {
            wtr.write_record(r.cells.iter().map(|c| c.to_string()))?;
        }
    }
    wtr.flush().map_err(Into::into)
}

pub fn save_rows_csv<P: AsRef<Path>>(path: P, dataset: &Dataset, rows: &[usize]) -> csv::Result<()> {
    write_rows_csv(std::fs::File::create(path)?, dataset, rows)
}

fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(v) => serde_json::Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Cell::Text(_) | Cell::Date(_) => Value::String(cell.to_string()),
    }
}

/// Rows as JSON objects keyed by column name.
pub fn rows_to_json(dataset: &Dataset, rows: &[usize]) -> Vec<Map<String, Value>> {
    rows.iter()
        .filter_map(|&i| dataset.records().get(i))
        .map(|r| {
            dataset
                .columns()
                .iter()
                .zip(&r.cells)
                .map(|(col, cell)| (col.clone(), cell_value(cell)))
                .collect()
        })
        .collect()
}

pub fn save_rows_json<P: AsRef<Path>>(
    path: P,
    dataset: &Dataset,
    rows: &[usize],
) -> std::io::Result<()> {
    write_json(&rows_to_json(dataset, rows), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_by_type;

    const DATA: &str = "Title,WorkoutDay,HeartRateAverage,Pace,Notes\n\
Tempo,2024-05-01,150,5.0,\"windy, cold\"\n\
Base,2024-05-02,,6.0,\n";

    fn dataset() -> Dataset {
        Dataset::from_reader(DATA.as_bytes()).unwrap()
    }

    #[test]
    fn csv_keeps_headers_and_row_order() {
        let ds = dataset();
        let mut out = Vec::new();
        write_rows_csv(&mut out, &ds, &[1, 0]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Title,WorkoutDay,HeartRateAverage,Pace,Notes\n\
Base,2024-05-02,,6,\n\
Tempo,2024-05-01,150,5,\"windy, cold\"\n"
        );
    }

    #[test]
    fn json_rows_use_natural_types() {
        let ds = dataset();
        let rows = rows_to_json(&ds, &[0, 1, 7]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Title"], Value::String("Tempo".into()));
        assert_eq!(rows[0]["WorkoutDay"], Value::String("2024-05-01".into()));
        assert_eq!(rows[0]["HeartRateAverage"], serde_json::json!(150.0));
        assert_eq!(rows[1]["HeartRateAverage"], Value::Null);
    }

    #[test]
    fn chart_json_round_trips() {
        let ds = dataset();
        let spec = render_by_type(&ds, Some("Tempo"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hr_pace.json");
        save_chart_json(&path, &spec).unwrap();
        let loaded: ChartSpec =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, spec);
    }

    #[test]
    fn save_rows_to_files() {
        let ds = dataset();
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("rows.csv");
        save_rows_csv(&csv_path, &ds, &[0]).unwrap();
        let written = Dataset::load(&csv_path).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written.records()[0].title, "Tempo");

        let json_path = dir.path().join("rows.json");
        save_rows_json(&json_path, &ds, &[0, 1]).unwrap();
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }
}

use crate::{
    analysis::{heart_rate_range, workouts_per_type},
    dataset::Dataset,
    layout::{GraphId, PAGE_TITLE},
    plotting::format_axis_value,
    render::{
        ChartKind, ChartSpec, ControlState, heart_rate_histogram, render_by_type, render_by_types,
    },
};
use maud::{Markup, html};
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (800, 400);

trait FormatOption {
    fn fmt_opt(self) -> String;
}

impl FormatOption for Option<f64> {
    fn fmt_opt(self) -> String {
        self.map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".into())
    }
}

/// A chart section of the report. `file` is `None` when rendering failed.
struct ChartSection {
    heading: String,
    file: Option<String>,
}

/// Write an HTML report next to one PNG per dashboard chart.
///
/// Charts reflect `controls` at the time of export. A chart that cannot be
/// rendered is replaced by a placeholder.
pub fn export_html_report<P: AsRef<Path>>(
    path: P,
    dataset: &Dataset,
    controls: &ControlState,
    histogram_bins: usize,
) -> std::io::Result<()> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".into());
    let charts = [
        (
            GraphId::HrPace,
            render_by_type(dataset, controls.workout_type.as_deref()),
        ),
        (
            GraphId::HrScatter,
            render_by_types(dataset, &controls.selected_types),
        ),
        (GraphId::HrHist, heart_rate_histogram(dataset, histogram_bins)),
    ];
    let mut sections = Vec::new();
    for (id, spec) in &charts {
        let file_name = format!("{stem}_{}.png", id.key());
        let file = match draw_chart_png(spec, &path.with_file_name(&file_name)) {
            Ok(()) => Some(file_name),
            Err(e) => {
                log::warn!("Failed to generate {} chart: {e}", id.key());
                None
            }
        };
        sections.push(ChartSection {
            heading: chart_heading(*id, spec),
            file,
        });
    }
    let markup = build_html(dataset, &sections);
    std::fs::write(path, markup.into_string())?;
    log::info!("Wrote report to {}", path.display());
    Ok(())
}

fn chart_heading(id: GraphId, spec: &ChartSpec) -> String {
    match (id, &spec.title) {
        (_, Some(title)) => title.clone(),
        (GraphId::HrScatter, None) => "Training Calendar".into(),
        (GraphId::HrHist, None) => "Heart Rate Distribution".into(),
        (GraphId::HrPace, None) => "Pace vs Heart Rate".into(),
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad)..(hi + pad)
}

fn draw_chart_png(spec: &ChartSpec, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_range, y_range) = match spec.kind {
        ChartKind::Scatter => (
            padded_range(spec.points().map(|p| p[0])),
            padded_range(spec.points().map(|p| p[1])),
        ),
        ChartKind::Histogram { .. } => {
            let max = spec.points().map(|p| p[1]).fold(0.0, f64::max);
            (padded_range(spec.points().map(|p| p[0])), 0.0..max.max(1.0))
        }
    };
    let caption = spec.title.clone().unwrap_or_default();
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(x_range, y_range)?;
    let x_scale = spec.x.scale;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(spec.x.label.as_str())
        .y_desc(spec.y.label.as_str())
        .x_label_formatter(&|x| format_axis_value(x_scale, *x))
        .draw()?;

    match spec.kind {
        ChartKind::Scatter => {
            for s in &spec.series {
                let color = RGBAColor(s.color.r, s.color.g, s.color.b, s.color.a as f64);
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(move |p| Circle::new((p[0], p[1]), 3, color.filled())),
                    )?
                    .label(s.name.as_str())
                    .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
            }
            if !spec.is_empty() {
                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()?;
            }
        }
        ChartKind::Histogram { .. } => {
            for s in &spec.series {
                let color = RGBAColor(s.color.r, s.color.g, s.color.b, s.color.a as f64);
                let half = match s.points.as_slice() {
                    [a, b, ..] => (b[0] - a[0]).abs() / 2.0,
                    _ => 0.5,
                };
                chart.draw_series(s.points.iter().map(move |p| {
                    Rectangle::new([(p[0] - half, 0.0), (p[0] + half, p[1])], color.filled())
                }))?;
            }
        }
    }
    root.present()?;
    Ok(())
}

fn build_html(dataset: &Dataset, charts: &[ChartSection]) -> Markup {
    let range = heart_rate_range(dataset);
    let per_type = workouts_per_type(dataset);
    html! {
        html {
            head { meta charset="utf-8"; title { (PAGE_TITLE) } }
            body {
                h1 { (PAGE_TITLE) }
                h2 { "Heart Rate Info" }
                ul {
                    li { "Min value: " (range.map(|r| r.0).fmt_opt()) }
                    li { "Max value: " (range.map(|r| r.1).fmt_opt()) }
                }
                h2 { "Workouts by Type" }
                table border="1" {
                    tr { th { "Type" } th { "Workouts" } }
                    @for (title, count) in &per_type {
                        tr { td { (title) } td { (count) } }
                    }
                    tr { th { "Total" } td { (dataset.len()) } }
                }
                @for chart in charts {
                    h2 { (chart.heading) }
                    @match &chart.file {
                        Some(file) => { img src=(file); }
                        None => { p { "Chart unavailable" } }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "Title,WorkoutDay,HeartRateAverage,Pace\n\
Tempo,2024-05-01,150,5.0\n\
Base,2024-05-02,130,6.0\n\
Base,2024-05-04,,6.2\n";

    fn dataset() -> Dataset {
        Dataset::from_reader(DATA.as_bytes()).unwrap()
    }

    #[test]
    fn format_option_for_option_f64() {
        let none: Option<f64> = None;
        assert_eq!(none.fmt_opt(), "-");
        assert_eq!(Some(129.96_f64).fmt_opt(), "130.0");
    }

    #[test]
    fn build_html_renders_summary() {
        let ds = dataset();
        let charts = vec![ChartSection {
            heading: "Running type is All Types".into(),
            file: Some("report_hr_pace.png".into()),
        }];
        let output = build_html(&ds, &charts).into_string();
        assert!(output.contains("Min value: 130.0"));
        assert!(output.contains("Max value: 150.0"));
        assert!(output.contains("<td>Base</td><td>2</td>"));
        assert!(output.contains("<td>3</td>"));
        assert!(output.contains("<img src=\"report_hr_pace.png\">"));
    }

    #[test]
    fn build_html_handles_missing_chart() {
        let ds = Dataset::from_reader("Title,WorkoutDay,HeartRateAverage,Pace\n".as_bytes()).unwrap();
        let charts = vec![ChartSection {
            heading: "Training Calendar".into(),
            file: None,
        }];
        let output = build_html(&ds, &charts).into_string();
        assert!(output.contains("Min value: -"));
        assert!(output.contains("Chart unavailable"));
        assert!(!output.contains("<img"));
    }

    #[test]
    fn headings_fall_back_per_graph() {
        let ds = dataset();
        let calendar = render_by_types(&ds, &ds.catalog().to_set());
        assert_eq!(chart_heading(GraphId::HrScatter, &calendar), "Training Calendar");
        let pace = render_by_type(&ds, Some("Base"));
        assert_eq!(chart_heading(GraphId::HrPace, &pace), "Running type is Base");
    }

    #[test]
    fn padded_range_handles_degenerate_input() {
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(padded_range([5.0].into_iter()), 4.0..6.0);
        let r = padded_range([0.0, 10.0].into_iter());
        assert!((r.start + 0.5).abs() < 1e-9 && (r.end - 10.5).abs() < 1e-9);
    }

    #[test]
    fn export_writes_report_and_charts() {
        let ds = dataset();
        let controls = ControlState::new(ds.catalog());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly.html");
        export_html_report(&path, &ds, &controls, 10).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        for key in ["hr_pace", "hr_scatter", "hr_hist"] {
            let file = format!("weekly_{key}.png");
            let meta = std::fs::metadata(dir.path().join(&file)).unwrap();
            assert!(meta.len() > 0, "{file} is empty");
            assert!(html.contains(&format!("<img src=\"{file}\">")));
        }
        assert!(!html.contains("Chart unavailable"));
        assert!(html.contains("Running type is All Types"));
    }
}

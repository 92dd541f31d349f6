use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, MarkerShape, Plot, PlotPoints, Points};

use crate::render::{ChartKind, ChartSpec, Rgba, Scale, x_to_date};

/// Size used for scatter markers.
const MARKER_RADIUS: f32 = 3.0;

pub fn color32(c: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, (c.a.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Format an axis value according to its scale.
pub fn format_axis_value(scale: Scale, value: f64) -> String {
    match scale {
        Scale::Date => x_to_date(value)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| format!("{value:.0}")),
        Scale::Numeric => {
            if value.fract() == 0.0 {
                format!("{value:.0}")
            } else {
                format!("{value:.2}")
            }
        }
    }
}

/// One marker cloud per series of a scatter spec.
pub fn scatter_points(spec: &ChartSpec) -> Vec<Points> {
    spec.series
        .iter()
        .map(|s| {
            Points::new(PlotPoints::from(s.points.clone()))
                .name(&s.name)
                .color(color32(s.color))
                .shape(MarkerShape::Circle)
                .filled(true)
                .radius(MARKER_RADIUS)
        })
        .collect()
}

/// Bars of a histogram spec; adjacent bins touch.
pub fn histogram_bars(spec: &ChartSpec) -> Vec<Bar> {
    let mut bars = Vec::new();
    for s in &spec.series {
        let width = match s.points.as_slice() {
            [a, b, ..] => (b[0] - a[0]).abs(),
            _ => 1.0,
        };
        let fill = color32(s.color);
        bars.extend(
            s.points
                .iter()
                .map(|p| Bar::new(p[0], p[1]).width(width).fill(fill)),
        );
    }
    bars
}

/// Draw `spec` into `ui` using egui_plot.
pub fn draw_chart(
    ui: &mut egui::Ui,
    id: &str,
    spec: &ChartSpec,
    width: f32,
    height: f32,
) -> egui_plot::PlotResponse<()> {
    if let Some(title) = &spec.title {
        ui.label(egui::RichText::new(title).strong());
    }
    let x_scale = spec.x.scale;
    let y_scale = spec.y.scale;
    let x_label = spec.x.label.clone();
    let y_label = spec.y.label.clone();
    Plot::new(id)
        .width(width)
        .height(height)
        .x_axis_label(spec.x.label.clone())
        .y_axis_label(spec.y.label.clone())
        .x_axis_formatter(move |mark, _chars, _| format_axis_value(x_scale, mark.value))
        .y_axis_formatter(move |mark, _chars, _| format_axis_value(y_scale, mark.value))
        .label_formatter(move |name, value| {
            let point = format!(
                "{x_label}: {}\n{y_label}: {}",
                format_axis_value(x_scale, value.x),
                format_axis_value(y_scale, value.y)
            );
            if name.is_empty() {
                point
            } else {
                format!("{name}\n{point}")
            }
        })
        .legend(Legend::default())
        .show(ui, |plot_ui| match spec.kind {
            ChartKind::Scatter => {
                for points in scatter_points(spec) {
                    plot_ui.points(points);
                }
            }
            ChartKind::Histogram { .. } => {
                let name = spec.series.first().map(|s| s.name.clone()).unwrap_or_default();
                let color = spec
                    .series
                    .first()
                    .map(|s| color32(s.color))
                    .unwrap_or(Color32::GRAY);
                plot_ui.bar_chart(BarChart::new(histogram_bars(spec)).name(name).color(color));
            }
        })
}

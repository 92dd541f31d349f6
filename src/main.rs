//! Main application logic and persistent user settings.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use egui_extras::{Column, TableBuilder};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

mod analysis;
use analysis::{format_load_message, heart_rate_range};
mod dataset;
use dataset::Dataset;
mod export;
use export::{save_chart_json, save_rows_csv, save_rows_json};
mod layout;
use layout::{ControlId, GraphId, Node, WORKOUT_TYPE_OPTIONS};
mod plotting;
use plotting::draw_chart;
mod render;
use render::{
    ChartSpec, ControlState, DEFAULT_HISTOGRAM_BINS, heart_rate_histogram, render_by_type,
    render_by_types,
};
mod report;
use report::export_html_report;
mod table;
use table::{DEFAULT_PAGE_SIZE, SortDirection, SortState, TableView};

/// Environment variable overriding the data file location.
const DATA_ENV: &str = "RUNNING_DATA_CSV";
const DEFAULT_DATA_FILE: &str = "running_data.csv";

/// Determine which CSV to load.
///
/// `RUNNING_DATA_CSV` takes precedence over the path stored in the settings,
/// which in turn overrides `running_data.csv` in the working directory.
fn resolve_data_path(settings_path: Option<&str>) -> PathBuf {
    std::env::var_os(DATA_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| settings_path.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
}

fn default_plot_width() -> f32 {
    700.0
}

fn default_plot_height() -> f32 {
    350.0
}

fn default_histogram_bins() -> usize {
    DEFAULT_HISTOGRAM_BINS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

/// Persistent configuration for the dashboard.
///
/// Stored as JSON in the platform config directory. Every field has a serde
/// default so older or partial files still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    #[serde(default)]
    data_file: Option<String>,
    #[serde(default = "default_plot_width")]
    plot_width: f32,
    #[serde(default = "default_plot_height")]
    plot_height: f32,
    #[serde(default = "default_histogram_bins")]
    histogram_bins: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
    #[serde(default = "default_true")]
    show_histogram: bool,
    #[serde(default = "default_true")]
    show_table: bool,
    #[serde(default)]
    table_sort: Option<SortState>,
}

impl Settings {
    const FILE: &'static str = "running_dashboard_settings.json";

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable.
    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring invalid settings {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(data) = serde_json::to_string_pretty(self) {
                let _ = std::fs::write(path, data);
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: None,
            plot_width: default_plot_width(),
            plot_height: default_plot_height(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            page_size: DEFAULT_PAGE_SIZE,
            show_histogram: true,
            show_table: true,
            table_sort: None,
        }
    }
}

struct MyApp {
    dataset: Arc<Dataset>,
    layout: Arc<Node>,
    controls: ControlState,
    hr_pace: ChartSpec,
    hr_scatter: ChartSpec,
    hr_hist: ChartSpec,
    heart_rate: Option<(f64, f64)>,
    table: TableView,
    settings: Settings,
    settings_dirty: bool,
    show_settings: bool,
    status: String,
}

impl MyApp {
    fn new(dataset: Arc<Dataset>, settings: Settings, status: String) -> Self {
        let controls = ControlState::new(dataset.catalog());
        let hr_pace = render_by_type(&dataset, controls.workout_type.as_deref());
        let hr_scatter = render_by_types(&dataset, &controls.selected_types);
        let hr_hist = heart_rate_histogram(&dataset, settings.histogram_bins.max(1));
        let heart_rate = heart_rate_range(&dataset);
        let mut table = TableView::new(dataset.columns().len(), settings.page_size);
        table.sort = settings
            .table_sort
            .filter(|s| s.column < dataset.columns().len());
        Self {
            dataset,
            layout: Arc::new(layout::dashboard_layout()),
            controls,
            hr_pace,
            hr_scatter,
            hr_hist,
            heart_rate,
            table,
            settings,
            settings_dirty: false,
            show_settings: false,
            status,
        }
    }

    /// Dropdown changed: re-render the pace/heart rate scatter.
    fn set_workout_type(&mut self, value: Option<String>) {
        if self.controls.workout_type == value {
            return;
        }
        self.controls.workout_type = value;
        self.hr_pace = render_by_type(&self.dataset, self.controls.workout_type.as_deref());
    }

    /// Multi-select changed: re-render the training calendar.
    fn set_type_selected(&mut self, title: &str, selected: bool) {
        let changed = if selected {
            self.controls.selected_types.insert(title.to_string())
        } else {
            self.controls.selected_types.remove(title)
        };
        if changed {
            self.hr_scatter = render_by_types(&self.dataset, &self.controls.selected_types);
        }
    }

    fn select_all_types(&mut self, all: bool) {
        self.controls.selected_types = if all {
            self.dataset.catalog().to_set()
        } else {
            Default::default()
        };
        self.hr_scatter = render_by_types(&self.dataset, &self.controls.selected_types);
    }

    fn set_histogram_bins(&mut self, bins: usize) {
        let bins = bins.max(1);
        if bins != self.settings.histogram_bins {
            self.settings.histogram_bins = bins;
            self.settings_dirty = true;
        }
        if self.hr_hist.kind != (render::ChartKind::Histogram { bins }) {
            self.hr_hist = heart_rate_histogram(&self.dataset, bins);
        }
    }

    fn chart(&self, id: GraphId) -> &ChartSpec {
        match id {
            GraphId::HrPace => &self.hr_pace,
            GraphId::HrScatter => &self.hr_scatter,
            GraphId::HrHist => &self.hr_hist,
        }
    }

    fn sync_settings_from_app(&mut self) {
        self.settings.table_sort = self.table.sort;
        self.settings.page_size = self.table.page_size;
    }

    fn draw_node(&mut self, ui: &mut egui::Ui, node: &Node) {
        match node {
            Node::Heading { level, text } => {
                let size = match level {
                    1 => 28.0,
                    2 => 22.0,
                    _ => 17.0,
                };
                ui.label(egui::RichText::new(*text).size(size).strong());
            }
            Node::Break => ui.add_space(ui.spacing().item_spacing.y * 2.0),
            Node::Row(children) => {
                ui.horizontal_top(|ui| {
                    for child in children {
                        ui.vertical(|ui| self.draw_node(ui, child));
                    }
                });
            }
            Node::Block { framed, children } => {
                if *framed {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_width(350.0);
                        ui.set_min_height(350.0);
                        ui.vertical(|ui| {
                            for child in children {
                                self.draw_node(ui, child);
                            }
                        });
                    });
                } else {
                    ui.vertical(|ui| {
                        for child in children {
                            self.draw_node(ui, child);
                        }
                    });
                }
            }
            Node::Control(id) => self.draw_control(ui, *id),
            Node::Graph(id) => self.draw_graph(ui, *id),
            Node::HeartRateInfo => self.draw_heart_rate_info(ui),
            Node::DataTable => self.draw_table(ui),
        }
    }

    fn draw_control(&mut self, ui: &mut egui::Ui, id: ControlId) {
        match id {
            ControlId::WorkoutType => {
                let mut value = self.controls.workout_type.clone();
                ui.horizontal(|ui| {
                    egui::ComboBox::from_id_source(id.key())
                        .width(200.0)
                        .selected_text(value.clone().unwrap_or_else(|| "Select...".into()))
                        .show_ui(ui, |ui| {
                            for opt in WORKOUT_TYPE_OPTIONS {
                                ui.selectable_value(&mut value, Some(opt.to_string()), opt);
                            }
                        });
                    if value.is_some() && ui.small_button("\u{2716}").on_hover_text("Clear").clicked() {
                        value = None;
                    }
                });
                self.set_workout_type(value);
            }
            ControlId::TypeFilter => {
                if self.dataset.catalog().is_empty() {
                    ui.label("No workout types in the data");
                    return;
                }
                let catalog = self.dataset.catalog().as_slice().to_vec();
                let mut toggled: Vec<(String, bool)> = Vec::new();
                let mut select_all = None;
                ui.horizontal_wrapped(|ui| {
                    for title in &catalog {
                        let mut sel = self.controls.selected_types.contains(title);
                        if ui.checkbox(&mut sel, title.as_str()).changed() {
                            toggled.push((title.clone(), sel));
                        }
                    }
                    ui.separator();
                    if ui.button("All").clicked() {
                        select_all = Some(true);
                    }
                    if ui.button("None").clicked() {
                        select_all = Some(false);
                    }
                });
                for (title, sel) in toggled {
                    self.set_type_selected(&title, sel);
                }
                if let Some(all) = select_all {
                    self.select_all_types(all);
                }
            }
        }
    }

    fn draw_graph(&mut self, ui: &mut egui::Ui, id: GraphId) {
        if id == GraphId::HrHist && !self.settings.show_histogram {
            return;
        }
        let (width, height) = (self.settings.plot_width, self.settings.plot_height);
        ui.vertical(|ui| {
            draw_chart(ui, id.key(), self.chart(id), width, height);
        });
    }

    fn draw_heart_rate_info(&self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.label("Maximum and Minimum values of heart rate:");
            match self.heart_rate {
                Some((min, max)) => {
                    ui.label(format!("\u{2022} Min value: {min}"));
                    ui.label(format!("\u{2022} Max value: {max}"));
                }
                None => {
                    ui.label("\u{2022} No heart rate data");
                }
            }
        });
    }

    fn sort_button(ui: &mut egui::Ui, label: &str, column: usize, table: &mut TableView) {
        let arrow = match table.sort {
            Some(SortState {
                column: c,
                direction: SortDirection::Ascending,
            }) if c == column => " \u{25B2}",
            Some(SortState {
                column: c,
                direction: SortDirection::Descending,
            }) if c == column => " \u{25BC}",
            _ => "",
        };
        if ui.button(format!("{label}{arrow}")).clicked() {
            table.toggle_sort(column);
        }
    }

    fn draw_table(&mut self, ui: &mut egui::Ui) {
        if !self.settings.show_table {
            return;
        }
        let dataset = Arc::clone(&self.dataset);
        let total = self.table.filtered_rows(&dataset).len();
        let rows = self.table.visible_rows(&dataset);
        let columns = dataset.columns();
        let row_height = ui.text_style_height(&egui::TextStyle::Body);
        let mut filters = self.table.filters.clone();
        let table = &mut self.table;

        ui.push_id("data_table", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .vscroll(false)
                .columns(Column::auto().at_least(70.0), columns.len())
                .header(row_height * 2.6, |mut header| {
                    for (i, name) in columns.iter().enumerate() {
                        header.col(|ui| {
                            ui.vertical(|ui| {
                                MyApp::sort_button(ui, name, i, table);
                                ui.add(
                                    egui::TextEdit::singleline(&mut filters[i])
                                        .hint_text("filter data...")
                                        .desired_width(70.0),
                                );
                            });
                        });
                    }
                })
                .body(|mut body| {
                    for &i in &rows {
                        let record = &dataset.records()[i];
                        body.row(row_height, |mut row| {
                            for cell in &record.cells {
                                row.col(|ui| {
                                    ui.label(cell.to_string());
                                });
                            }
                        });
                    }
                });
        });
        for (i, query) in filters.into_iter().enumerate() {
            self.table.set_filter(i, query);
        }

        ui.horizontal(|ui| {
            if ui.button("\u{25C0}").clicked() {
                self.table.prev_page();
            }
            ui.label(format!(
                "{} / {}",
                self.table.page + 1,
                self.table.page_count(total)
            ));
            if ui.button("\u{25B6}").clicked() {
                self.table.next_page(total);
            }
            ui.label(format!("{total} rows"));
        });
    }

    fn export_chart(&self, id: GraphId) {
        if let Some(path) = FileDialog::new()
            .set_file_name(format!("{}.json", id.key()))
            .add_filter("JSON", &["json"])
            .save_file()
        {
            match save_chart_json(&path, self.chart(id)) {
                Ok(()) => info!("Exported {} to {}", id.key(), path.display()),
                Err(e) => log::error!("Failed to export chart: {e}"),
            }
        }
    }

    fn export_rows(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .add_filter("JSON", &["json"])
            .save_file()
        {
            let rows = self.table.filtered_rows(&self.dataset);
            let result = match path
                .extension()
                .and_then(|e| e.to_str())
                .map(|s| s.to_lowercase())
            {
                Some(ext) if ext == "json" => save_rows_json(&path, &self.dataset, &rows)
                    .map_err(|e| e.to_string()),
                _ => save_rows_csv(&path, &self.dataset, &rows).map_err(|e| e.to_string()),
            };
            match result {
                Ok(()) => {
                    self.status = format!("Exported {} rows to {}", rows.len(), file_label(&path));
                    info!("{}", self.status);
                }
                Err(e) => log::error!("Failed to export rows: {e}"),
            }
        }
    }

    fn export_report(&mut self) {
        if let Some(path) = FileDialog::new()
            .set_file_name("running_report.html")
            .add_filter("HTML", &["html"])
            .save_file()
        {
            match export_html_report(
                &path,
                &self.dataset,
                &self.controls,
                self.settings.histogram_bins,
            ) {
                Ok(()) => self.status = format!("Report written to {}", file_label(&path)),
                Err(e) => log::error!("Failed to export report: {e}"),
            }
        }
    }

    fn draw_settings(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        let mut bins = self.settings.histogram_bins;
        egui::Window::new("Settings")
            .open(&mut open)
            .show(ctx, |ui| {
                let s = &mut self.settings;
                let mut changed = false;
                changed |= ui
                    .add(egui::Slider::new(&mut s.plot_width, 300.0..=1400.0).text("Plot width"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut s.plot_height, 150.0..=900.0).text("Plot height"))
                    .changed();
                ui.horizontal(|ui| {
                    ui.label("Histogram bins:");
                    ui.add(egui::DragValue::new(&mut bins).clamp_range(1..=200));
                });
                ui.horizontal(|ui| {
                    ui.label("Rows per page:");
                    if ui
                        .add(egui::DragValue::new(&mut self.table.page_size).clamp_range(1..=100))
                        .changed()
                    {
                        changed = true;
                    }
                });
                changed |= ui.checkbox(&mut s.show_histogram, "Show histogram").changed();
                changed |= ui.checkbox(&mut s.show_table, "Show data table").changed();
                if changed {
                    self.settings_dirty = true;
                }
            });
        self.show_settings = open;
        self.set_histogram_bins(bins);
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Settings").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                    ui.separator();
                    for id in [GraphId::HrPace, GraphId::HrScatter, GraphId::HrHist] {
                        if ui.button(format!("Export {} Chart", id.key())).clicked() {
                            self.export_chart(id);
                            ui.close_menu();
                        }
                    }
                    if ui.button("Export Table Rows").clicked() {
                        self.export_rows();
                        ui.close_menu();
                    }
                    if ui.button("Export HTML Report").clicked() {
                        self.export_report();
                        ui.close_menu();
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                let layout = Arc::clone(&self.layout);
                self.draw_node(ui, &layout);
            });
        });

        if self.show_settings {
            self.draw_settings(ctx);
        }

        if self.settings_dirty {
            self.sync_settings_from_app();
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.sync_settings_from_app();
        self.settings.save();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let settings = Settings::load();
    let path = resolve_data_path(settings.data_file.as_deref());
    let dataset = match Dataset::load(&path) {
        Ok(ds) => Arc::new(ds),
        Err(e) => {
            log::error!("Cannot start without workout data from {}: {e}", path.display());
            return Err(e.into());
        }
    };
    if dataset.is_empty() {
        log::warn!("{} contains no workouts", path.display());
    }
    let status = format_load_message(dataset.len(), dataset.catalog().len(), &file_label(&path));
    info!("{status}");

    let app = MyApp::new(dataset, settings, status);
    eframe::run_native(
        layout::PAGE_TITLE,
        NativeOptions::default(),
        Box::new(move |_cc| Box::new(app)),
    )?;
    Ok(())
}

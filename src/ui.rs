use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::{Color32, Context, FontFamily, FontId, Margin, RichText, Stroke, Vec2, Visuals};
use egui_extras::{Column, TableBuilder};
use egui_plot::{GridMark, Legend, Line, LineStyle, Plot, PlotPoints, Points};

use crate::chart::{self, ChartController, ChartViewMode, ModeAvailability};
use crate::config::AppConfig;
use crate::export::{ExportError, ExportFormat};
use crate::grid::{column_title, format_cell, page_window, GridController, PageSize};
use crate::model::{ChartSeries, Dataset, ResultSet};
use crate::query::{analyze_query, Presentation, QueryOrchestrator, Settlement, PRESET_QUERIES};
use crate::service::{AnalyticsService, ServiceError};
use crate::startup::{HealthBadge, Startup};
use crate::storage::{RecentQueries, SlotStore};
use crate::tasks::{FetchReason, TaskOutcome, TaskRunner};
use crate::toast::{ToastKind, Toasts, LONG_LIFETIME, SHORT_LIFETIME};
use crate::upload::upload_success_message;

const ACCENT: Color32 = Color32::from_rgb(0, 123, 255);
const MUTED: Color32 = Color32::from_rgb(108, 117, 125);
const SUCCESS: Color32 = Color32::from_rgb(40, 167, 69);
const DANGER: Color32 = Color32::from_rgb(220, 53, 69);
const WARNING: Color32 = Color32::from_rgb(255, 193, 7);

const WORKER_FAILED_MESSAGE: &str = "Could not start the request. Please try again.";

const SERIES_PALETTE: [Color32; 6] = [
    Color32::from_rgb(0, 123, 255),
    Color32::from_rgb(40, 167, 69),
    Color32::from_rgb(255, 193, 7),
    Color32::from_rgb(220, 53, 69),
    Color32::from_rgb(111, 66, 193),
    Color32::from_rgb(23, 162, 184),
];

pub fn set_custom_style(ctx: &Context) {
    let mut visuals = Visuals::light();

    visuals.panel_fill = Color32::from_rgb(248, 249, 250);
    visuals.window_fill = Color32::WHITE;
    visuals.extreme_bg_color = Color32::WHITE;
    visuals.faint_bg_color = Color32::from_rgb(241, 243, 245);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(233, 236, 239);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, Color32::from_rgb(206, 212, 218));

    visuals.widgets.hovered.bg_fill = Color32::from_rgb(222, 235, 255);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);

    visuals.widgets.active.bg_fill = Color32::from_rgb(204, 229, 255);
    visuals.widgets.active.bg_stroke = Stroke::new(2.0, ACCENT);

    visuals.selection.bg_fill = Color32::from_rgb(0, 123, 255);
    visuals.selection.stroke = Stroke::new(1.0, Color32::WHITE);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(12);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.spacing.indent = 16.0;

    style.text_styles.insert(
        egui::TextStyle::Body,
        FontId::new(14.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Heading,
        FontId::new(20.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Button,
        FontId::new(14.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Monospace,
        FontId::new(13.0, FontFamily::Monospace),
    );

    ctx.set_style(style);
}

/// Owned snapshot of what the results area shows this frame.
enum ResultsView {
    Idle,
    Loading,
    Suggestions(Vec<String>),
    Results(Arc<ResultSet>),
    NoResults,
}

pub struct AnalyticsApp {
    config: AppConfig,
    store: SlotStore,
    tasks: TaskRunner,
    startup: Startup,
    orchestrator: QueryOrchestrator,

    // Per-result view controllers, rebuilt for every applied result
    grid: Option<GridController>,
    chart: ChartController,
    result_generation: u64,

    // Inputs
    query_text: String,
    upload_path: String,

    // Busy flags
    uploading: bool,
    downloading_sample: bool,
    exporting: bool,

    toasts: Toasts,
}

impl AnalyticsApp {
    pub fn new(config: AppConfig, service: Arc<dyn AnalyticsService>, store: SlotStore) -> Self {
        let recent = RecentQueries::load(&store);
        let mut app = Self {
            config,
            store,
            tasks: TaskRunner::new(service),
            startup: Startup::default(),
            orchestrator: QueryOrchestrator::new(recent),
            grid: None,
            chart: ChartController::default(),
            result_generation: 0,
            query_text: String::new(),
            upload_path: String::new(),
            uploading: false,
            downloading_sample: false,
            exporting: false,
            toasts: Toasts::default(),
        };

        if let Err(e) = app.tasks.health(FetchReason::Startup) {
            app.startup.apply_health(Err(worker_error(&e)));
        }
        if let Err(e) = app.tasks.areas(FetchReason::Startup) {
            app.startup.apply_areas(Err(worker_error(&e)));
        }
        app
    }

    fn submit(&mut self, text: String) {
        if let Some(ticket) = self.orchestrator.submit(&text) {
            self.grid = None;
            if let Err(e) = self.tasks.query(ticket.clone()) {
                self.orchestrator.settle(&ticket, Err(worker_error(&e)));
            }
        }
        self.query_text = text;
    }

    fn start_upload(&mut self) {
        self.uploading = true;
        self.toasts
            .push(ToastKind::Info, "Processing file...", SHORT_LIFETIME);
        if self.tasks.upload(self.upload_path.trim().into()).is_err() {
            self.uploading = false;
            self.toasts
                .push(ToastKind::Error, WORKER_FAILED_MESSAGE, LONG_LIFETIME);
        }
    }

    fn start_sample(&mut self) {
        self.downloading_sample = true;
        if self.tasks.sample(&self.config.download_dir()).is_err() {
            self.downloading_sample = false;
            self.toasts
                .push(ToastKind::Error, WORKER_FAILED_MESSAGE, LONG_LIFETIME);
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let Some(grid) = self.grid.as_mut() else {
            return;
        };
        let rows = grid.export_rows();
        self.exporting = true;
        if self.tasks.export(rows, format, &self.config.download_dir()).is_err() {
            self.exporting = false;
            self.toasts
                .push(ToastKind::Error, WORKER_FAILED_MESSAGE, SHORT_LIFETIME);
        }
    }

    fn handle_outcomes(&mut self) {
        for outcome in self.tasks.drain() {
            self.apply(outcome);
        }
    }

    fn apply(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Query(ticket, result) => {
                if self.orchestrator.settle(&ticket, result) == Settlement::Succeeded {
                    if let Err(e) = self.orchestrator.recent().save(&self.store) {
                        log::warn!("could not save recent queries: {}", e);
                    }
                    self.result_generation += 1;
                    self.chart = ChartController::default();
                    self.grid = self.orchestrator.result().cloned().map(GridController::new);
                }
            }
            TaskOutcome::Health(FetchReason::Startup, result) => self.startup.apply_health(result),
            TaskOutcome::Health(FetchReason::AfterUpload, result) => match result {
                Ok(status) => self.startup.apply_health(Ok(status)),
                Err(e) => log::warn!("refreshing health after upload failed: {}", e),
            },
            TaskOutcome::Areas(FetchReason::Startup, result) => self.startup.apply_areas(result),
            TaskOutcome::Areas(FetchReason::AfterUpload, result) => match result {
                Ok(areas) => self.startup.apply_areas(Ok(areas)),
                Err(e) => log::warn!("reloading areas after upload failed: {}", e),
            },
            TaskOutcome::Upload(result) => {
                self.uploading = false;
                match result {
                    Ok(receipt) => {
                        self.toasts.push(
                            ToastKind::Success,
                            upload_success_message(receipt.areas.len()),
                            LONG_LIFETIME,
                        );
                        // Refresh failures only get logged; the known areas stay.
                        let _ = self.tasks.areas(FetchReason::AfterUpload);
                        let _ = self.tasks.health(FetchReason::AfterUpload);
                        self.orchestrator.reset();
                        self.grid = None;
                        self.chart = ChartController::default();
                    }
                    Err(e) => {
                        log::warn!("upload failed: {}", e);
                        self.toasts
                            .push(ToastKind::Error, e.upload_message(), LONG_LIFETIME);
                    }
                }
            }
            TaskOutcome::Sample(result) => {
                self.downloading_sample = false;
                match result {
                    Ok(path) => self.toasts.push(
                        ToastKind::Success,
                        format!("Sample dataset saved to {}", path.display()),
                        LONG_LIFETIME,
                    ),
                    Err(e) => {
                        log::warn!("sample download failed: {}", e);
                        self.toasts.push(
                            ToastKind::Error,
                            "Failed to download sample file",
                            LONG_LIFETIME,
                        );
                    }
                }
            }
            TaskOutcome::Export(format, result) => {
                self.exporting = false;
                match result {
                    Ok(path) => self.toasts.push(
                        ToastKind::Success,
                        format!("{} file saved to {}", format.label(), path.display()),
                        SHORT_LIFETIME,
                    ),
                    Err(ExportError::NoData) => {
                        self.toasts
                            .push(ToastKind::Error, "No data to download", SHORT_LIFETIME)
                    }
                    Err(e) => {
                        log::warn!("{} export failed: {}", format.label(), e);
                        self.toasts.push(ToastKind::Error, e.to_string(), SHORT_LIFETIME);
                    }
                }
            }
        }
    }

    fn results_view(&self) -> ResultsView {
        match self.orchestrator.presentation() {
            Presentation::Idle => ResultsView::Idle,
            Presentation::Loading => ResultsView::Loading,
            Presentation::Suggestions(s) => ResultsView::Suggestions(s.to_vec()),
            Presentation::NoResults => ResultsView::NoResults,
            Presentation::Results(_) => match self.orchestrator.result() {
                Some(result) => ResultsView::Results(Arc::clone(result)),
                None => ResultsView::Idle,
            },
        }
    }

    // ── Panels ──────────────────────────────────────────────────────

    fn header(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.heading(
                RichText::new("🏠 Real Estate Analytics")
                    .color(ACCENT)
                    .strong()
                    .size(22.0),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let badge = self.startup.badge();
                let color = match badge {
                    HealthBadge::Loaded(_) => SUCCESS,
                    HealthBadge::NoData => WARNING,
                    HealthBadge::Unknown => MUTED,
                };
                ui.label(RichText::new(badge.text()).color(color).strong());
                if !self.startup.is_complete() {
                    ui.spinner();
                }
            });
        });
        ui.add_space(4.0);
    }

    fn banners(&mut self, ui: &mut egui::Ui) {
        if let Some(warning) = self.startup.warning().map(str::to_string) {
            let dismissed = banner(ui, &warning, WARNING);
            if dismissed {
                self.startup.dismiss_warning();
            }
        }
        if let Some(message) = self.orchestrator.error_banner().map(str::to_string) {
            if banner(ui, &message, DANGER) {
                self.orchestrator.dismiss_error();
            }
        }
    }

    fn upload_card(&mut self, ui: &mut egui::Ui) {
        ui.label(RichText::new("📁 Upload Dataset").strong());
        ui.add(
            egui::TextEdit::singleline(&mut self.upload_path)
                .hint_text("Path to .xlsx or .xls file")
                .desired_width(f32::INFINITY),
        );
        ui.horizontal(|ui| {
            let can_upload = !self.uploading && !self.upload_path.trim().is_empty();
            if ui.add_enabled(can_upload, egui::Button::new("Upload")).clicked() {
                self.start_upload();
            }
            if ui
                .add_enabled(!self.downloading_sample, egui::Button::new("📥 Sample Dataset"))
                .clicked()
            {
                self.start_sample();
            }
            if self.uploading || self.downloading_sample {
                ui.spinner();
            }
        });
        ui.label(
            RichText::new("Required columns: Year, Area, Price, Demand")
                .small()
                .color(MUTED),
        );
    }

    fn query_panel(&mut self, ui: &mut egui::Ui) {
        let mut submit: Option<String> = None;

        ui.label(RichText::new("💬 Ask a Question").strong());
        ui.add(
            egui::TextEdit::multiline(&mut self.query_text)
                .hint_text("e.g. Analyze Wakad")
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );

        let loading = self.orchestrator.is_loading();
        let can_submit = !loading && !self.query_text.trim().is_empty();
        ui.horizontal(|ui| {
            let label = if loading { "Analyzing..." } else { "🔍 Analyze" };
            if ui
                .add_enabled(
                    can_submit,
                    egui::Button::new(RichText::new(label).strong()).min_size(Vec2::new(120.0, 30.0)),
                )
                .on_disabled_hover_text("Enter a query first")
                .clicked()
            {
                submit = Some(self.query_text.clone());
            }
            if loading {
                ui.spinner();
            }
        });

        ui.add_space(8.0);
        ui.label(RichText::new("Try these").small().color(MUTED));
        for preset in PRESET_QUERIES {
            if ui.link(preset).clicked() {
                submit = Some(preset.to_string());
            }
        }

        if !self.orchestrator.recent().is_empty() {
            ui.add_space(8.0);
            ui.label(RichText::new("Recent").small().color(MUTED));
            for query in self.orchestrator.recent().items() {
                if ui.link(format!("🕘 {}", query)).clicked() {
                    submit = Some(query.clone());
                }
            }
        }

        let (areas, more) = self.startup.area_badges();
        if !areas.is_empty() {
            ui.add_space(8.0);
            ui.label(RichText::new("Available areas").small().color(MUTED));
            ui.horizontal_wrapped(|ui| {
                for area in areas {
                    if ui.small_button(area).clicked() {
                        submit = Some(analyze_query(area));
                    }
                }
                if more > 0 {
                    ui.label(RichText::new(format!("+{} more", more)).small().color(MUTED));
                }
            });
        }

        if let Some(text) = submit {
            self.submit(text);
        }
    }

    fn results(&mut self, ui: &mut egui::Ui) {
        match self.results_view() {
            ResultsView::Idle => placeholder(
                ui,
                "📊",
                "Ready to analyze",
                "Ask a question or pick an area to see trends",
            ),
            ResultsView::Loading => {
                ui.vertical_centered(|ui| {
                    ui.add_space(80.0);
                    ui.spinner();
                    ui.label(RichText::new("Analyzing your query...").color(MUTED));
                });
            }
            ResultsView::NoResults => {
                placeholder(ui, "🔍", "No results found", "Try a different area or question")
            }
            ResultsView::Suggestions(suggestions) => {
                let mut picked = None;
                ui.label(
                    RichText::new("⚠ No exact matches found. Did you mean:")
                        .color(WARNING)
                        .strong(),
                );
                ui.horizontal_wrapped(|ui| {
                    for s in &suggestions {
                        if ui.button(s).clicked() {
                            picked = Some(analyze_query(s));
                        }
                    }
                });
                if let Some(query) = picked {
                    self.submit(query);
                }
            }
            ResultsView::Results(result) => {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if let Some(summary) = result.summary() {
                        card(ui, |ui| {
                            ui.label(RichText::new("📝 Summary").strong());
                            ui.label(summary);
                        });
                    }
                    if let Some(series) = result.chart() {
                        card(ui, |ui| self.chart_card(ui, series));
                    }
                    if !result.table.is_empty() {
                        card(ui, |ui| self.data_table(ui));
                    }
                });
            }
        }
    }

    fn chart_card(&mut self, ui: &mut egui::Ui, series: &ChartSeries) {
        let availability = ModeAvailability::of(series);
        let mut new_mode = None;

        ui.horizontal(|ui| {
            ui.label(RichText::new("📈 Trends").strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                for mode in ChartViewMode::ALL.iter().rev() {
                    let selected = self.chart.mode() == *mode;
                    let hint = availability.hint(*mode);
                    let clicked = ui
                        .add_enabled_ui(availability.is_enabled(*mode), |ui| {
                            ui.selectable_label(selected, mode.label())
                        })
                        .inner
                        .on_hover_text(hint)
                        .on_disabled_hover_text(hint)
                        .clicked();
                    if clicked {
                        new_mode = Some(*mode);
                    }
                }
            });
        });
        if let Some(mode) = new_mode {
            self.chart.set_mode(mode);
        }

        let projection = self.chart.project(series);
        ui.label(RichText::new(projection.title()).color(ACCENT));

        let labels = projection.series.labels.clone();
        let tick_labels = labels.clone();
        let value_format = projection.value_format;

        Plot::new(("trend_chart", self.result_generation, self.chart.instance()))
            .height(320.0)
            .legend(Legend::default())
            .x_axis_label("Year")
            .y_axis_label(projection.mode.y_axis_title())
            .allow_scroll(false)
            .x_axis_formatter(move |mark: GridMark, _range| label_at(&tick_labels, mark.value))
            .y_axis_formatter(move |mark: GridMark, _range| value_format.tick(mark.value))
            .label_formatter(move |name, point| {
                if name.is_empty() {
                    return String::new();
                }
                format!(
                    "{}\n{}",
                    label_at(&labels, point.x),
                    chart::tooltip(name, point.y)
                )
            })
            .show(ui, |plot_ui| {
                for (i, dataset) in projection.series.datasets.iter().enumerate() {
                    let color = series_color(dataset, i);
                    for segment in segments(dataset) {
                        if segment.len() == 1 {
                            plot_ui.points(
                                Points::new(dataset.label.clone(), PlotPoints::from(segment))
                                    .color(color)
                                    .radius(3.0),
                            );
                            continue;
                        }
                        let mut line = Line::new(dataset.label.clone(), PlotPoints::from(segment))
                            .color(color)
                            .width(2.0);
                        if let Some(&dash) = dataset.border_dash.first() {
                            line = line.style(LineStyle::Dashed {
                                length: dash.max(1.0) * 2.0,
                            });
                        }
                        plot_ui.line(line);
                    }
                }
            });

        ui.label(RichText::new(projection.footer()).small().color(MUTED));
    }

    fn data_table(&mut self, ui: &mut egui::Ui) {
        let mut export_format = None;
        let exporting = self.exporting;
        let Some(grid) = self.grid.as_mut() else {
            return;
        };

        let view = grid.view();
        let columns = grid.columns().to_vec();
        let total_rows = grid.result().total_rows();
        let row_count = grid.rows().len();

        ui.horizontal(|ui| {
            ui.label(RichText::new("📋 Data").strong());
            ui.label(
                RichText::new(format!("{} of {} records", view.total_filtered(), total_rows))
                    .small()
                    .color(MUTED),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                for format in [ExportFormat::Spreadsheet, ExportFormat::Csv] {
                    if ui
                        .add_enabled(!exporting, egui::Button::new(format!("⬇ {}", format.label())))
                        .clicked()
                    {
                        export_format = Some(format);
                    }
                }
                if exporting {
                    ui.spinner();
                }
            });
        });

        let mut new_size = None;
        ui.horizontal(|ui| {
            let mut search = grid.state().search().to_string();
            if ui
                .add(
                    egui::TextEdit::singleline(&mut search)
                        .hint_text("Search table...")
                        .desired_width(220.0),
                )
                .changed()
            {
                grid.set_search(&search);
            }

            let current = grid.state().page_size();
            egui::ComboBox::from_id_salt("page_size")
                .selected_text(current.label())
                .show_ui(ui, |ui| {
                    for size in PageSize::ALL {
                        if ui.selectable_label(current == size, size.label()).clicked() {
                            new_size = Some(size);
                        }
                    }
                });
        });
        if let Some(size) = new_size {
            grid.set_page_size(size);
        }

        // Search or page size may have changed above
        let view = grid.view();
        let mut sort_clicked: Option<String> = None;

        {
            let rows = view.visible_rows(grid.rows());
            let mut table = TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center));
            for _ in &columns {
                table = table.column(Column::auto().at_least(90.0).clip(true));
            }

            let markers: Vec<&'static str> = columns.iter().map(|c| grid.sort_marker(c)).collect();
            table
                .header(28.0, |mut header| {
                    for (column, marker) in columns.iter().zip(&markers) {
                        header.col(|ui| {
                            let text = RichText::new(format!("{} {}", column_title(column), marker))
                                .strong();
                            if ui.add(egui::Button::new(text).frame(false)).clicked() {
                                sort_clicked = Some(column.clone());
                            }
                        });
                    }
                })
                .body(|body| {
                    body.rows(24.0, rows.len(), |mut row| {
                        let record = rows[row.index()];
                        for column in &columns {
                            row.col(|ui| {
                                ui.label(format_cell(column, record.get(column)));
                            });
                        }
                    });
                });
        }

        if let Some(column) = sort_clicked {
            grid.sort_by(&column);
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            let (start, end) = view.showing();
            let mut footer = format!(
                "Showing {} to {} of {} entries",
                start,
                end,
                view.total_filtered()
            );
            if !grid.state().search().is_empty() {
                footer.push_str(&format!(" (filtered from {} total entries)", row_count));
            }
            ui.label(RichText::new(footer).small().color(MUTED));

            if view.total_pages > 1 {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mut target = None;
                    let current = view.page;
                    let last = view.total_pages;

                    // Right-to-left: added in reverse visual order
                    if ui.add_enabled(current < last, egui::Button::new("»")).clicked() {
                        target = Some(last);
                    }
                    if ui.add_enabled(current < last, egui::Button::new("›")).clicked() {
                        target = Some(current + 1);
                    }
                    for page in page_window(current, last).rev() {
                        if ui.selectable_label(page == current, page.to_string()).clicked() {
                            target = Some(page);
                        }
                    }
                    if ui.add_enabled(current > 1, egui::Button::new("‹")).clicked() {
                        target = Some(current - 1);
                    }
                    if ui.add_enabled(current > 1, egui::Button::new("«")).clicked() {
                        target = Some(1);
                    }

                    if let Some(page) = target {
                        grid.go_to_page(page);
                    }
                });
            }
        });

        if let Some(format) = export_format {
            self.export(format);
        }
    }

    fn toasts(&mut self, ctx: &Context) {
        let mut dismissed = None;
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .show(ctx, |ui| {
                for (i, toast) in self.toasts.items().iter().enumerate() {
                    let color = match toast.kind {
                        ToastKind::Success => SUCCESS,
                        ToastKind::Error => DANGER,
                        ToastKind::Info => ACCENT,
                    };
                    egui::Frame::popup(ui.style())
                        .stroke(Stroke::new(1.5, color))
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(RichText::new(&toast.message).color(color));
                                if ui.small_button("✖").clicked() {
                                    dismissed = Some(i);
                                }
                            });
                        });
                    ui.add_space(4.0);
                }
            });
        if let Some(i) = dismissed {
            self.toasts.dismiss(i);
        }
    }
}

impl eframe::App for AnalyticsApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_outcomes();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            self.header(ui);
        });

        egui::SidePanel::left("controls")
            .min_width(280.0)
            .max_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    card(ui, |ui| self.upload_card(ui));
                    card(ui, |ui| self.query_panel(ui));
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.banners(ui);
            self.results(ui);
        });

        self.toasts(ctx);

        if let Some(next) = self.toasts.prune(Instant::now()) {
            ctx.request_repaint_after(next);
        }
        if self.tasks.busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

// ── Widgets and helpers ─────────────────────────────────────────────

fn card<R>(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui) -> R) -> R {
    let inner = egui::Frame::group(ui.style())
        .fill(Color32::WHITE)
        .inner_margin(Margin::same(10))
        .show(ui, add_contents)
        .inner;
    ui.add_space(8.0);
    inner
}

/// Returns true when the close button was clicked.
fn banner(ui: &mut egui::Ui, message: &str, color: Color32) -> bool {
    let mut closed = false;
    egui::Frame::group(ui.style())
        .stroke(Stroke::new(1.5, color))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(message).color(color));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    closed = ui.small_button("✖").clicked();
                });
            });
        });
    ui.add_space(6.0);
    closed
}

fn placeholder(ui: &mut egui::Ui, icon: &str, title: &str, hint: &str) {
    ui.vertical_centered(|ui| {
        ui.add_space(80.0);
        ui.label(RichText::new(icon).size(60.0).color(MUTED));
        ui.add_space(10.0);
        ui.label(RichText::new(title).size(20.0).strong());
        ui.label(RichText::new(hint).color(MUTED));
    });
}

fn series_color(dataset: &Dataset, index: usize) -> Color32 {
    dataset
        .border_color
        .as_deref()
        .and_then(|hex| Color32::from_hex(hex).ok())
        .unwrap_or(SERIES_PALETTE[index % SERIES_PALETTE.len()])
}

fn worker_error(err: &std::io::Error) -> ServiceError {
    ServiceError::Network(format!("could not start worker: {}", err))
}

/// Splits a dataset at missing points so gaps are not bridged.
fn segments(dataset: &Dataset) -> Vec<Vec<[f64; 2]>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, value) in dataset.data.iter().enumerate() {
        match value {
            Some(v) => current.push([i as f64, *v]),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn label_at(labels: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

//! Chart projection: which datasets of a fetched series are shown for a
//! view mode, and how their values are labelled.

use crate::format;
use crate::model::{ChartSeries, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChartViewMode {
    #[default]
    Both,
    Price,
    Demand,
}

impl ChartViewMode {
    pub const ALL: [ChartViewMode; 3] = [
        ChartViewMode::Both,
        ChartViewMode::Price,
        ChartViewMode::Demand,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartViewMode::Both => "Both",
            ChartViewMode::Price => "Price",
            ChartViewMode::Demand => "Demand",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartViewMode::Both => "Price & Demand",
            ChartViewMode::Price => "Price Analysis",
            ChartViewMode::Demand => "Demand Analysis",
        }
    }

    pub fn y_axis_title(self) -> &'static str {
        match self {
            ChartViewMode::Both => "Value",
            ChartViewMode::Price => "Price (₹)",
            ChartViewMode::Demand => "Demand Score (1-10)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Price,
    Demand,
    Other,
}

impl SeriesKind {
    pub fn of(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("price") {
            SeriesKind::Price
        } else if label.contains("demand") {
            SeriesKind::Demand
        } else {
            SeriesKind::Other
        }
    }
}

fn is_price_like(d: &Dataset) -> bool {
    d.label.to_lowercase().contains("price")
}

fn is_demand_like(d: &Dataset) -> bool {
    d.label.to_lowercase().contains("demand")
}

/// How y-axis ticks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    Currency,
    Score,
    Plain,
}

impl ValueFormat {
    pub fn tick(self, value: f64) -> String {
        match self {
            ValueFormat::Currency => format::currency(value),
            ValueFormat::Score | ValueFormat::Plain => format::one_decimal(value),
        }
    }
}

/// Hover text for one point of a dataset.
pub fn tooltip(label: &str, value: f64) -> String {
    let prefix = if label.is_empty() {
        String::new()
    } else {
        format!("{}: ", label)
    };
    match SeriesKind::of(label) {
        SeriesKind::Price => format!("{}{}", prefix, format::currency(value)),
        SeriesKind::Demand => format!("{}{:.1}/10", prefix, value),
        SeriesKind::Other => format!("{}{:.1}", prefix, value),
    }
}

/// Which mode buttons are usable for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeAvailability {
    pub has_price: bool,
    pub has_demand: bool,
}

impl ModeAvailability {
    pub fn of(series: &ChartSeries) -> Self {
        Self {
            has_price: series.datasets.iter().any(is_price_like),
            has_demand: series.datasets.iter().any(is_demand_like),
        }
    }

    pub fn is_enabled(&self, mode: ChartViewMode) -> bool {
        match mode {
            ChartViewMode::Both => self.has_price && self.has_demand,
            ChartViewMode::Price => self.has_price,
            ChartViewMode::Demand => self.has_demand,
        }
    }

    pub fn hint(&self, mode: ChartViewMode) -> &'static str {
        match (mode, self.is_enabled(mode)) {
            (ChartViewMode::Both, false) => "Both price and demand data needed",
            (ChartViewMode::Both, true) => "Show both price and demand",
            (ChartViewMode::Price, false) => "No price data available",
            (ChartViewMode::Price, true) => "Show price trends only",
            (ChartViewMode::Demand, false) => "No demand data available",
            (ChartViewMode::Demand, true) => "Show demand trends only",
        }
    }
}

/// A view-mode projection of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartProjection {
    pub mode: ChartViewMode,
    pub series: ChartSeries,
    /// The mode matched nothing and the full dataset list is shown instead.
    pub fell_back: bool,
    pub value_format: ValueFormat,
}

pub fn project(series: &ChartSeries, mode: ChartViewMode) -> ChartProjection {
    let keep: fn(&Dataset) -> bool = match mode {
        ChartViewMode::Both => |_| true,
        ChartViewMode::Price => is_price_like,
        ChartViewMode::Demand => is_demand_like,
    };

    let mut datasets: Vec<Dataset> = series.datasets.iter().filter(|d| keep(d)).cloned().collect();
    let fell_back = datasets.is_empty() && !series.datasets.is_empty();
    if fell_back {
        datasets = series.datasets.clone();
    }

    let value_format = match mode {
        ChartViewMode::Price => ValueFormat::Currency,
        ChartViewMode::Demand => ValueFormat::Score,
        ChartViewMode::Both => match (
            datasets.iter().any(is_price_like),
            datasets.iter().any(is_demand_like),
        ) {
            (true, false) => ValueFormat::Currency,
            (false, true) => ValueFormat::Score,
            _ => ValueFormat::Plain,
        },
    };

    ChartProjection {
        mode,
        series: ChartSeries {
            labels: series.labels.clone(),
            datasets,
        },
        fell_back,
        value_format,
    }
}

impl ChartProjection {
    pub fn title(&self) -> String {
        format!("Real Estate Trends - {}", self.mode.title())
    }

    pub fn footer(&self) -> String {
        let n = self.series.datasets.len();
        format!("Showing {} dataset{}", n, if n == 1 { "" } else { "s" })
    }
}

/// Owns the view mode of one chart instance.
///
/// Every mode change bumps the instance number; the renderer keys its plot
/// on it so no scale or legend state survives a mode switch.
#[derive(Debug, Default)]
pub struct ChartController {
    mode: ChartViewMode,
    instance: u64,
}

impl ChartController {
    pub fn mode(&self) -> ChartViewMode {
        self.mode
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn set_mode(&mut self, mode: ChartViewMode) {
        if self.mode != mode {
            self.mode = mode;
            self.instance += 1;
        }
    }

    pub fn project(&self, series: &ChartSeries) -> ChartProjection {
        project(series, self.mode)
    }
}

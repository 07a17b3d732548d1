//! In-memory data grid over a fetched result table.
//!
//! The visible view is a pure function of `(rows, ViewState)`: filter by a
//! case-insensitive search term, stable direction-aware sort on one field,
//! then slice out the current page. [`GridController`] owns the view state
//! for one result set and memoizes the filter+sort step on its inputs.

use std::cmp::Ordering;
use std::ops::{Range, RangeInclusive};
use std::sync::Arc;

use serde_json::Value;

use crate::format;
use crate::model::{value_text, Record, ResultSet};

const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    Ten,
    #[default]
    TwentyFive,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::TwentyFive,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    pub fn rows(self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }

    pub fn label(self) -> String {
        format!("{} per page", self.rows())
    }
}

/// Search, sort and pagination parameters of one grid instance.
///
/// Setters reset the page to 1 whenever the search term, sort or page size
/// changes, so a page that may no longer exist is never kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    search: String,
    sort_field: String,
    sort_direction: SortDirection,
    page: usize,
    page_size: PageSize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort_field: "year".to_string(),
            sort_direction: SortDirection::Descending,
            page: 1,
            page_size: PageSize::default(),
        }
    }
}

impl ViewState {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort_field(&self) -> &str {
        &self.sort_field
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn set_search(&mut self, term: &str) {
        if self.search != term {
            self.search = term.to_string();
            self.page = 1;
        }
    }

    /// Same column twice flips the direction; a new column starts ascending.
    pub fn sort_by(&mut self, field: &str) {
        if self.sort_field == field {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_field = field.to_string();
            self.sort_direction = SortDirection::Ascending;
        }
        self.page = 1;
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        if self.page_size != size {
            self.page_size = size;
            self.page = 1;
        }
    }

    /// Moves to `page`, clamped to `[1, total_pages]`.
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) {
        self.page = page.clamp(1, total_pages.max(1));
    }
}

/// Derived view of the grid: filtered+sorted order and the current page slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    /// Indices into the source rows, filtered and sorted.
    pub order: Vec<usize>,
    pub total_pages: usize,
    pub page: usize,
    /// Range into `order` covered by the current page.
    pub page_range: Range<usize>,
}

impl GridView {
    pub fn total_filtered(&self) -> usize {
        self.order.len()
    }

    pub fn visible_rows<'a>(&self, rows: &'a [Record]) -> Vec<&'a Record> {
        self.order[self.page_range.clone()]
            .iter()
            .map(|&i| &rows[i])
            .collect()
    }

    /// Every filtered+sorted row, independent of the page.
    pub fn filtered_rows<'a>(&self, rows: &'a [Record]) -> Vec<&'a Record> {
        self.order.iter().map(|&i| &rows[i]).collect()
    }

    /// "Showing X to Y of Z entries" bounds, 1-based.
    pub fn showing(&self) -> (usize, usize) {
        if self.page_range.is_empty() {
            (0, 0)
        } else {
            (self.page_range.start + 1, self.page_range.end)
        }
    }
}

/// Filter, sort and paginate in one pass.
pub fn compute_view(rows: &[Record], state: &ViewState) -> GridView {
    let order = filter_and_sort(rows, &state.search, &state.sort_field, state.sort_direction);
    paginate(order, state)
}

pub fn filter_and_sort(
    rows: &[Record],
    search: &str,
    sort_field: &str,
    direction: SortDirection,
) -> Vec<usize> {
    let needle = search.to_lowercase();
    let mut order: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| needle.is_empty() || row_matches(row, &needle))
        .map(|(i, _)| i)
        .collect();

    // Stable sort with the comparator itself reversed, so ties keep source order in both directions.
    order.sort_by(|&a, &b| {
        let ord = compare_values(rows[a].get(sort_field), rows[b].get(sort_field));
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });

    order
}

fn paginate(order: Vec<usize>, state: &ViewState) -> GridView {
    let size = state.page_size.rows();
    let total_pages = order.len().div_ceil(size);

    if total_pages == 0 {
        return GridView {
            order,
            total_pages,
            page: 1,
            page_range: 0..0,
        };
    }

    let page = state.page.clamp(1, total_pages);
    let start = (page - 1) * size;
    let end = (start + size).min(order.len());

    GridView {
        order,
        total_pages,
        page,
        page_range: start..end,
    }
}

fn row_matches(row: &Record, needle: &str) -> bool {
    row.values()
        .filter(|v| !v.is_null())
        .any(|v| value_text(v).to_lowercase().contains(needle))
}

/// Numbers compare numerically; anything else compares as lowercase text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    if let (Some(Value::Number(x)), Some(Value::Number(y))) = (a, b) {
        if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
            return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        }
    }

    let text = |v: Option<&Value>| v.map(value_text).unwrap_or_default().to_lowercase();
    text(a).cmp(&text(b))
}

/// Page numbers to show: at most five, centered on `current` away from the edges.
pub fn page_window(current: usize, total_pages: usize) -> RangeInclusive<usize> {
    if total_pages <= PAGE_WINDOW {
        return 1..=total_pages.max(1);
    }

    let start = if current <= 3 {
        1
    } else if current >= total_pages - 2 {
        total_pages - PAGE_WINDOW + 1
    } else {
        current - 2
    };
    start..=start + PAGE_WINDOW - 1
}

/// Display text for a cell, keyed on the column name.
pub fn format_cell(column: &str, value: Option<&Value>) -> String {
    match (column, value) {
        ("price", Some(Value::Number(n))) => n
            .as_f64()
            .map(format::currency)
            .unwrap_or_else(|| n.to_string()),
        ("demand", Some(Value::Number(n))) => n
            .as_f64()
            .map(format::one_decimal)
            .unwrap_or_else(|| n.to_string()),
        (_, Some(v)) => value_text(v),
        (_, None) => String::new(),
    }
}

/// Header text: first underscore becomes a space, words capitalized.
pub fn column_title(column: &str) -> String {
    column
        .replacen('_', " ", 1)
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortKey {
    search: String,
    field: String,
    direction: SortDirection,
}

/// Owns the view state of one grid instance over one result set.
pub struct GridController {
    result: Arc<ResultSet>,
    columns: Vec<String>,
    state: ViewState,
    cached: Option<(SortKey, Vec<usize>)>,
}

impl GridController {
    pub fn new(result: Arc<ResultSet>) -> Self {
        let columns = result.columns();
        Self {
            result,
            columns,
            state: ViewState::default(),
            cached: None,
        }
    }

    pub fn result(&self) -> &ResultSet {
        &self.result
    }

    pub fn rows(&self) -> &[Record] {
        &self.result.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn set_search(&mut self, term: &str) {
        self.state.set_search(term);
    }

    pub fn sort_by(&mut self, column: &str) {
        self.state.sort_by(column);
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        self.state.set_page_size(size);
    }

    pub fn go_to_page(&mut self, page: usize) {
        let total = self.view().total_pages;
        self.state.go_to_page(page, total);
    }

    /// Sort indicator for a header.
    pub fn sort_marker(&self, column: &str) -> &'static str {
        if self.state.sort_field == column {
            self.state.sort_direction.arrow()
        } else {
            "↕"
        }
    }

    pub fn view(&mut self) -> GridView {
        let key = SortKey {
            search: self.state.search.clone(),
            field: self.state.sort_field.clone(),
            direction: self.state.sort_direction,
        };

        let order = match &self.cached {
            Some((cached_key, order)) if *cached_key == key => order.clone(),
            _ => {
                let order = filter_and_sort(
                    &self.result.table,
                    &key.search,
                    &key.field,
                    key.direction,
                );
                log::debug!(
                    "grid recomputed: {} of {} rows match {:?}",
                    order.len(),
                    self.result.table.len(),
                    key.search
                );
                self.cached = Some((key, order.clone()));
                order
            }
        };

        paginate(order, &self.state)
    }

    /// Snapshot of the filtered+sorted rows for export.
    pub fn export_rows(&mut self) -> Vec<Record> {
        let view = self.view();
        view.filtered_rows(&self.result.table)
            .into_iter()
            .cloned()
            .collect()
    }
}

//! Sort, filter and pagination state for the data table preview.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::dataset::{Cell, Dataset, parse_workout_day};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: usize,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

/// A parsed per-column filter expression.
#[derive(Debug, Clone, PartialEq)]
enum ColumnFilter {
    Contains(String),
    Compare(Op, Operand),
}

impl ColumnFilter {
    fn parse(query: &str) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        // Two-character operators first so `>=` is not read as `>`.
        let ops = [
            (">=", Op::Ge),
            ("<=", Op::Le),
            ("!=", Op::Ne),
            (">", Op::Gt),
            ("<", Op::Lt),
            ("=", Op::Eq),
        ];
        for (prefix, op) in ops {
            if let Some(rest) = query.strip_prefix(prefix) {
                let rest = rest.trim();
                let operand = if let Ok(v) = rest.parse::<f64>() {
                    Operand::Number(v)
                } else if let Some(dt) = parse_workout_day(rest) {
                    Operand::Date(dt)
                } else {
                    Operand::Text(rest.to_lowercase())
                };
                return Some(ColumnFilter::Compare(op, operand));
            }
        }
        Some(ColumnFilter::Contains(query.to_lowercase()))
    }

    fn matches(&self, cell: &Cell) -> bool {
        match self {
            ColumnFilter::Contains(q) => cell.to_string().to_lowercase().contains(q),
            ColumnFilter::Compare(op, operand) => {
                let ord = match (operand, cell) {
                    (Operand::Number(v), Cell::Number(c)) => c.partial_cmp(v),
                    (Operand::Date(d), Cell::Date(c)) => Some(c.cmp(d)),
                    (Operand::Text(t), Cell::Text(c)) => Some(c.to_lowercase().cmp(t)),
                    _ => None,
                };
                match ord {
                    Some(ord) => match op {
                        Op::Gt => ord == Ordering::Greater,
                        Op::Ge => ord != Ordering::Less,
                        Op::Lt => ord == Ordering::Less,
                        Op::Le => ord != Ordering::Greater,
                        Op::Eq => ord == Ordering::Equal,
                        Op::Ne => ord != Ordering::Equal,
                    },
                    // Incomparable cells only satisfy "not equal".
                    None => *op == Op::Ne,
                }
            }
        }
    }
}

/// Compare two cells for sorting. Blanks always go last.
fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Empty, Cell::Empty) => Ordering::Equal,
        (Cell::Empty, _) => Ordering::Greater,
        (_, Cell::Empty) => Ordering::Less,
        (Cell::Number(x), Cell::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Cell::Date(x), Cell::Date(y)) => x.cmp(y),
        (Cell::Number(_), _) => Ordering::Less,
        (_, Cell::Number(_)) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// View state of the table preview.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub sort: Option<SortState>,
    /// Raw filter query per column, indexed like [`Dataset::columns`].
    pub filters: Vec<String>,
    pub page: usize,
    pub page_size: usize,
}

impl TableView {
    pub fn new(columns: usize, page_size: usize) -> Self {
        Self {
            sort: None,
            filters: vec![String::new(); columns],
            page: 0,
            page_size: page_size.max(1),
        }
    }

    /// Advance the sort of `column`: ascending, then descending, then off.
    pub fn toggle_sort(&mut self, column: usize) {
        self.sort = match self.sort {
            Some(SortState {
                column: c,
                direction: SortDirection::Ascending,
            }) if c == column => Some(SortState {
                column,
                direction: SortDirection::Descending,
            }),
            Some(SortState {
                column: c,
                direction: SortDirection::Descending,
            }) if c == column => None,
            _ => Some(SortState {
                column,
                direction: SortDirection::Ascending,
            }),
        };
    }

    /// Indices of every row passing the filters, in display order.
    pub fn filtered_rows(&self, dataset: &Dataset) -> Vec<usize> {
        let filters: Vec<(usize, ColumnFilter)> = self
            .filters
            .iter()
            .enumerate()
            .filter_map(|(i, q)| ColumnFilter::parse(q).map(|f| (i, f)))
            .collect();
        let records = dataset.records();
        let mut rows: Vec<usize> = (0..records.len())
            .filter(|&i| {
                filters.iter().all(|(col, f)| {
                    records[i]
                        .cells
                        .get(*col)
                        .map(|c| f.matches(c))
                        .unwrap_or(false)
                })
            })
            .collect();
        if let Some(sort) = self.sort {
            let empty = Cell::Empty;
            rows.sort_by(|&a, &b| {
                let ca = records[a].cells.get(sort.column).unwrap_or(&empty);
                let cb = records[b].cells.get(sort.column).unwrap_or(&empty);
                let ord = compare_cells(ca, cb);
                match (sort.direction, ca, cb) {
                    // Keep blanks at the bottom in both directions.
                    (SortDirection::Descending, Cell::Empty, _) | (SortDirection::Descending, _, Cell::Empty) => ord,
                    (SortDirection::Descending, _, _) => ord.reverse(),
                    _ => ord,
                }
            });
        }
        rows
    }

    pub fn page_count(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.page_size).max(1)
    }

    /// Rows of the current page. The page index is clamped to the last page.
    pub fn visible_rows(&mut self, dataset: &Dataset) -> Vec<usize> {
        let rows = self.filtered_rows(dataset);
        self.page = self.page.min(self.page_count(rows.len()) - 1);
        rows.into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    pub fn set_filter(&mut self, column: usize, query: String) {
        if let Some(f) = self.filters.get_mut(column) {
            if *f != query {
                *f = query;
                self.page = 0;
            }
        }
    }

    pub fn next_page(&mut self, total_rows: usize) {
        if self.page + 1 < self.page_count(total_rows) {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }
}

//! Column width resolution.
//!
//! Widths here are content widths: padding and separators are accounted for
//! separately through [`Overhead`] and show up only in [`WidthPlan::outer`].

use tracing::{debug, warn};

use crate::config::WidthConfig;
use crate::width::{widest_line, WidthCache};

/// Space a rendered table spends on things other than cell content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overhead {
    /// Widest left+right padding per column.
    pub padding: Vec<usize>,
    pub column_separator: usize,
    pub left_border: usize,
    pub right_border: usize,
}

impl Overhead {
    fn chrome(&self, hidden: &[bool]) -> usize {
        let visible: Vec<usize> = (0..hidden.len()).filter(|&col| !hidden[col]).collect();
        let padding: usize = visible
            .iter()
            .map(|&col| self.padding.get(col).copied().unwrap_or(0))
            .sum();
        self.left_border
            + self.right_border
            + padding
            + self.column_separator * visible.len().saturating_sub(1)
    }
}

/// Raised when the configured budget cannot hold the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    BudgetTooSmall { required: usize, available: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidthPlan {
    /// Content width per column; 0 for hidden columns.
    pub widths: Vec<usize>,
    /// Content width plus the column's widest padding.
    pub outer: Vec<usize>,
    pub hidden: Vec<bool>,
    pub advisory: Option<Advisory>,
}

impl WidthPlan {
    /// Plan for explicitly supplied widths, with no sampling.
    pub fn fixed(widths: &[usize], overhead: &Overhead) -> Self {
        let outer = widths
            .iter()
            .enumerate()
            .map(|(col, width)| width + overhead.padding.get(col).copied().unwrap_or(0))
            .collect();
        Self {
            widths: widths.to_vec(),
            outer,
            hidden: vec![false; widths.len()],
            advisory: None,
        }
    }

    pub fn columns(&self) -> usize {
        self.widths.len()
    }

    /// Indices of the columns that are actually drawn.
    pub fn visible(&self) -> Vec<usize> {
        (0..self.widths.len())
            .filter(|&col| !self.hidden[col])
            .collect()
    }
}

/// Widest unwrapped line per column across all sample rows.
pub fn natural_widths(samples: &[Vec<String>], columns: usize, cache: &WidthCache) -> Vec<usize> {
    let mut widths = vec![0; columns];
    for row in samples {
        for (idx, cell) in row.iter().enumerate().take(columns) {
            widths[idx] = widths[idx].max(widest_line(cell, cache));
        }
    }
    widths
}

fn column_is_empty(samples: &[Vec<String>], col: usize) -> bool {
    samples.iter().all(|row| {
        row.get(col)
            .map(|cell| crate::ansi::strip(cell).trim().is_empty())
            .unwrap_or(true)
    })
}

pub fn resolve(
    samples: &[Vec<String>],
    columns: usize,
    config: &WidthConfig,
    overhead: &Overhead,
    cache: &WidthCache,
) -> WidthPlan {
    let natural = natural_widths(samples, columns, cache);
    let mut widths = vec![0; columns];
    let mut hidden = vec![false; columns];
    let mut floors = vec![0; columns];
    let mut flexible = Vec::new();
    for col in 0..columns {
        if let Some(fixed) = config.fixed.get(col).copied().flatten() {
            widths[col] = fixed;
            continue;
        }
        if config.auto_hide && column_is_empty(samples, col) {
            hidden[col] = true;
            continue;
        }
        let mut width = natural[col];
        if let Some(cap) = config.max.get(col).copied().flatten() {
            width = width.min(cap);
        }
        floors[col] = floor(config.min_column, natural[col]);
        widths[col] = width.max(floors[col]);
        flexible.push(col);
    }

    let advisory = match config.total {
        Some(total) => fit_to_total(
            &mut widths,
            &flexible,
            &hidden,
            total,
            &floors,
            overhead,
        ),
        None => None,
    };
    if let Some(Advisory::BudgetTooSmall {
        required,
        available,
    }) = advisory
    {
        warn!(
            required,
            available, "table width budget cannot be met; using natural widths"
        );
    }

    let outer = widths
        .iter()
        .enumerate()
        .map(|(col, width)| {
            if hidden[col] {
                0
            } else {
                width + overhead.padding.get(col).copied().unwrap_or(0)
            }
        })
        .collect();
    debug!(?widths, ?hidden, "resolved column widths");
    WidthPlan {
        widths,
        outer,
        hidden,
        advisory,
    }
}

/// Narrowest a flexible column may become. A column with content keeps at
/// least one glyph even when `min_column` is 0.
fn floor(min_column: usize, natural: usize) -> usize {
    if natural > 0 {
        min_column.max(1)
    } else {
        min_column
    }
}

fn fit_to_total(
    widths: &mut [usize],
    flexible: &[usize],
    hidden: &[bool],
    total: usize,
    floors: &[usize],
    overhead: &Overhead,
) -> Option<Advisory> {
    let chrome = overhead.chrome(hidden);
    let fixed_sum: usize = (0..widths.len())
        .filter(|col| !hidden[*col] && !flexible.contains(col))
        .map(|col| widths[col])
        .sum();
    let flex_sum: usize = flexible.iter().map(|&col| widths[col]).sum();
    if chrome + fixed_sum + flex_sum <= total {
        return None;
    }
    let required = chrome + fixed_sum + flexible.iter().map(|&col| floors[col]).sum::<usize>();
    if required > total || flex_sum == 0 {
        return Some(Advisory::BudgetTooSmall {
            required,
            available: total,
        });
    }
    let budget = total - chrome - fixed_sum;
    let natural: Vec<usize> = flexible.iter().map(|&col| widths[col]).collect();
    for &col in flexible {
        let scaled = widths[col] * budget / flex_sum;
        widths[col] = scaled.max(floors[col]);
    }
    adjust_widths(widths, flexible, &natural, budget, floors);
    None
}

/// Nudges the flexible columns until they sum to exactly `target`.
///
/// Excess comes off the widest column first; leftover goes to the leftmost
/// columns still narrower than their natural width, one column at a time.
fn adjust_widths(
    widths: &mut [usize],
    flexible: &[usize],
    natural: &[usize],
    target: usize,
    floors: &[usize],
) {
    let mut total: usize = flexible.iter().map(|&col| widths[col]).sum();
    while total > target {
        let Some(&col) = flexible
            .iter()
            .filter(|&&col| widths[col] > floors[col])
            .max_by_key(|&&col| widths[col])
        else {
            break;
        };
        widths[col] -= 1;
        total -= 1;
    }
    while total < target {
        let mut grew = false;
        for (idx, &col) in flexible.iter().enumerate() {
            if total == target {
                break;
            }
            if widths[col] < natural[idx] {
                widths[col] += 1;
                total += 1;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
}

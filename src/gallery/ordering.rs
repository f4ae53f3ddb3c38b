//! Display-order maintenance and cursor pagination.
//!
//! Every write path keeps `display_order` dense: after an insert, delete or
//! reorder the collection occupies positions `0..n` exactly once each. The
//! public listing paginates on the same key, so a cursor is simply the last
//! `display_order` the client has seen.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    #[error("At least one image ID is required")]
    Empty,

    #[error("Duplicate image IDs are not allowed: {0:?}")]
    DuplicateIds(Vec<i64>),

    #[error("Image IDs not found: {0:?}")]
    UnknownIds(Vec<i64>),

    #[error("Limit must be between 1 and {max}")]
    InvalidLimit { max: i64 },
}

/// New position for a single image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: i64,
    pub display_order: i32,
}

/// Compute positions for the whole collection from a (possibly partial) reorder request.
///
/// Requested ids come first in the order given; the rest keep their current
/// relative order behind them.
pub fn plan_reorder(requested: &[i64], current: &[i64]) -> Result<Vec<Placement>, OrderingError> {
    if requested.is_empty() {
        return Err(OrderingError::Empty);
    }

    let mut seen = HashSet::with_capacity(requested.len());
    let mut duplicates = Vec::new();
    for id in requested {
        if !seen.insert(*id) && !duplicates.contains(id) {
            duplicates.push(*id);
        }
    }
    if !duplicates.is_empty() {
        return Err(OrderingError::DuplicateIds(duplicates));
    }

    let existing: HashSet<i64> = current.iter().copied().collect();
    let unknown: Vec<i64> = requested
        .iter()
        .copied()
        .filter(|id| !existing.contains(id))
        .collect();
    if !unknown.is_empty() {
        return Err(OrderingError::UnknownIds(unknown));
    }

    let final_order = requested
        .iter()
        .copied()
        .chain(current.iter().copied().filter(|id| !seen.contains(id)));

    Ok(number_from_zero(final_order))
}

/// Renumber an already ordered id list densely from zero.
pub fn compact(current: &[i64]) -> Vec<Placement> {
    number_from_zero(current.iter().copied())
}

/// Positions for `count` newly appended images.
pub fn append_positions(existing_max: Option<i32>, count: usize) -> Vec<i32> {
    let start = existing_max.map_or(0, |max| max + 1);
    (0..count as i32).map(|offset| start + offset).collect()
}

fn number_from_zero(ids: impl Iterator<Item = i64>) -> Vec<Placement> {
    ids.enumerate()
        .map(|(position, id)| Placement {
            id,
            display_order: position as i32,
        })
        .collect()
}

/// Validated pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub cursor: Option<i32>,
}

impl PageRequest {
    pub fn new(limit: i64, cursor: Option<i32>, max_limit: i64) -> Result<Self, OrderingError> {
        if limit < 1 || limit > max_limit {
            return Err(OrderingError::InvalidLimit { max: max_limit });
        }
        Ok(Self { limit, cursor })
    }

    /// Rows to fetch so that the presence of a following page is known
    pub fn fetch_limit(&self) -> i64 {
        self.limit + 1
    }
}

/// Anything that can be paginated by display order
pub trait Ordered {
    fn display_order(&self) -> i32;
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<i32>,
    pub has_more: bool,
    pub total_count: i64,
}

impl<T: Ordered> Page<T> {
    /// Build a page from up to `limit + 1` rows sorted by display order.
    pub fn from_overfetch(mut rows: Vec<T>, limit: i64, total_count: i64) -> Self {
        let limit = limit.max(0) as usize;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let next_cursor = if has_more {
            rows.last().map(Ordered::display_order)
        } else {
            None
        };

        Self {
            items: rows,
            next_cursor,
            has_more,
            total_count,
        }
    }
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
            total_count: self.total_count,
        }
    }
}

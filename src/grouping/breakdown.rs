// Category breakdown of per-function statistics
//
// Sums reduced (instructions, stalls) pairs per semantic category and derives
// whole-percent shares of the grand total. Shares are apportioned by largest
// remainder so that they add up to exactly 100.

use super::CategoryMap;
use crate::error::Result;
use crate::stats::{FunctionStat, ReducedPair};
use crate::trace::OrderedMap;
use serde::Serialize;
use std::fmt;

/// Summed statistic of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub stat: ReducedPair,
}

/// Rounded percentage share of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub percentage: u64,
}

impl fmt::Display for CategoryShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}%", self.category, self.percentage)
    }
}

/// Sort rows by descending total, keeping input order for ties
pub fn sort_by_total_desc<T>(rows: &mut [T], total: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| total(b).total_cmp(&total(a)));
}

/// Per-category sums, sorted by descending total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBreakdown {
    categories: Vec<CategoryTotal>,
    grand_total: f64,
    /// Whole-percent share per category, empty when the total is zero
    shares: Vec<u64>,
}

impl GroupBreakdown {
    /// Group function statistics by category
    ///
    /// Category input order is the order in which categories are first met
    /// while walking `stats`.
    ///
    /// # Errors
    /// `UnknownCategory` if a function is missing from `map`.
    pub fn build(stats: &[FunctionStat], map: &CategoryMap) -> Result<Self> {
        let mut sums: OrderedMap<ReducedPair> = OrderedMap::new();
        for stat in stats {
            let category = map.category_of(&stat.function)?;
            *sums.get_or_default(category) += stat.stat;
        }

        let mut categories: Vec<CategoryTotal> = sums
            .iter()
            .map(|(category, stat)| CategoryTotal {
                category: category.to_string(),
                stat: *stat,
            })
            .collect();
        sort_by_total_desc(&mut categories, |c| c.stat.total());

        let grand_total = categories.iter().map(|c| c.stat.total()).sum();
        let shares = apportion(&categories, grand_total);
        Ok(Self {
            categories,
            grand_total,
            shares,
        })
    }

    /// Absolute sums for every category, including those that round to 0%
    pub fn categories(&self) -> &[CategoryTotal] {
        &self.categories
    }

    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }

    /// Whole-percent share of `category`, `None` if it is unknown or the total is zero
    pub fn percentage_of(&self, category: &str) -> Option<u64> {
        self.categories
            .iter()
            .position(|c| c.category == category)
            .and_then(|idx| self.shares.get(idx).copied())
    }

    /// Percentage table: categories whose share is 0% are left out
    pub fn percentages(&self) -> Vec<CategoryShare> {
        self.categories
            .iter()
            .zip(&self.shares)
            .filter(|(_, share)| **share != 0)
            .map(|(c, share)| CategoryShare {
                category: c.category.clone(),
                percentage: *share,
            })
            .collect()
    }
}

/// Largest-remainder apportionment of 100 points over `categories`
///
/// Every share is the floor of its exact percentage; the points left over go
/// to the largest fractional remainders, ties in row order. Shares sum to
/// exactly 100 and each is within one point of its exact value.
fn apportion(categories: &[CategoryTotal], grand_total: f64) -> Vec<u64> {
    if grand_total <= 0.0 {
        return Vec::new();
    }

    let exact: Vec<f64> = categories
        .iter()
        .map(|c| c.stat.total() / grand_total * 100.0)
        .collect();
    let mut shares: Vec<u64> = exact.iter().map(|e| e.floor().max(0.0) as u64).collect();

    let assigned: u64 = shares.iter().sum();
    let leftover = (100u64.saturating_sub(assigned) as usize).min(shares.len());

    let mut order: Vec<usize> = (0..shares.len()).collect();
    sort_by_total_desc(&mut order, |&idx| exact[idx] - exact[idx].floor());
    for &idx in order.iter().take(leftover) {
        shares[idx] += 1;
    }
    shares
}

// SPDX-License-Identifier: AGPL-3.0

use serde::Serialize;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Exact covered/total ratio
///
/// Rates are summed numerator and denominator separately, so grouping
/// methods into classes or packages in any order yields the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rate {
    pub covered: u64,
    pub total: u64,
}

impl Rate {
    pub fn new(covered: u64, total: u64) -> Self {
        Self { covered, total }
    }

    /// Ratio as a float; an empty scope counts as fully covered
    pub fn value(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.covered as f64 / self.total as f64
        }
    }

    /// Ratio scaled to 1/10000, rounded half up
    pub fn basis_points(&self) -> u64 {
        if self.total == 0 {
            return 10_000;
        }
        let covered = u128::from(self.covered);
        let total = u128::from(self.total);
        ((covered * 20_000 + total) / (2 * total)) as u64
    }

    /// Percentage with two decimals, for summaries
    pub fn percent(&self) -> String {
        let bp = self.basis_points();
        format!("{}.{:02}", bp / 100, bp % 100)
    }
}

/// Four decimal places, e.g. `0.5000`
impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bp = self.basis_points();
        write!(f, "{}.{:04}", bp / 10_000, bp % 10_000)
    }
}

impl Add for Rate {
    type Output = Rate;

    fn add(self, other: Rate) -> Rate {
        Rate::new(self.covered + other.covered, self.total + other.total)
    }
}

impl AddAssign for Rate {
    fn add_assign(&mut self, other: Rate) {
        *self = *self + other;
    }
}

impl Sum for Rate {
    fn sum<I: Iterator<Item = Rate>>(iter: I) -> Rate {
        iter.fold(Rate::default(), Add::add)
    }
}

//! Clock-period accounting.

use core::fmt;

/// A count of CPU clock periods (T-states).
///
/// Timing is accounted per whole instruction: each executed operation adds
/// its clock-period cost, and the host converts the total to wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u32> for Ticks {
    fn from(count: u32) -> Self {
        Self(u64::from(count))
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T", self.0)
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::AddAssign<u32> for Ticks {
    fn add_assign(&mut self, rhs: u32) {
        self.0 += u64::from(rhs);
    }
}

impl core::iter::Sum for Ticks {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, t| acc + t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_instruction_costs() {
        let mut total = Ticks::ZERO;
        total += 4u32;
        total += Ticks::new(7);
        assert_eq!(total.get(), 11);
        assert_eq!(total.to_string(), "11T");
    }

    #[test]
    fn sums_iterators() {
        let total: Ticks = [4u32, 10, 21].into_iter().map(Ticks::from).sum();
        assert_eq!(total, Ticks::new(35));
    }
}

//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    /// Returns true if the value lies strictly inside the interval.
    pub fn contains_strict(&self, value: T) -> bool {
        value > self.min && value < self.max
    }
}

impl<T: Float> Interval<T> {
    /// Creates an interval with the given centre and radius.
    pub fn disc(centre: T, radius: T) -> Self {
        Self {
            min: centre - radius,
            max: centre + radius,
        }
    }

    /// Grows the interval by `amount` at both ends.
    pub fn expand(&self, amount: T) -> Self {
        Self {
            min: self.min - amount,
            max: self.max + amount,
        }
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

#[cfg(test)]
mod test {
    use super::Interval;

    #[test]
    fn disc_contains_its_edges() {
        let i = Interval::disc(10.0, 2.5);
        assert!(i.contains(7.5));
        assert!(i.contains(12.5));
        assert!(!i.contains_strict(12.5));
        assert!(!i.contains(12.6));
    }

    #[test]
    fn expand_grows_both_ends() {
        let i = Interval::new(0.0, 480.0).expand(50.0);
        assert_eq!(i, Interval::new(-50.0, 530.0));
    }
}

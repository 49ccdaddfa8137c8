//! Integer-degree angles and the fine angle grid.

use crate::util::math::{circular_distance_deg, wrap_deg};
use crate::util::{DiceMatchError, DiceMatchResult};
use std::fmt;

/// Angle in whole degrees, always normalized into `[0, 360)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Angle(u16);

impl Angle {
    pub const ZERO: Angle = Angle(0);

    /// Wraps any integer degree value onto the circle.
    pub fn new(deg: i32) -> Self {
        Self(wrap_deg(deg))
    }

    /// Returns the angle in degrees, in `[0, 360)`.
    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Circular distance: the shorter of the two ways round, in `[0, 180]`.
    pub fn distance(self, other: Angle) -> u16 {
        circular_distance_deg(self.0, other.0)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Fine angle grid `{0, step, 2*step, ...} < 360`, in ascending order.
#[derive(Clone, Debug)]
pub struct AngleGrid {
    step_deg: u16,
    angles: Vec<Angle>,
}

impl AngleGrid {
    /// Creates a grid with a step in `1..360` degrees.
    pub fn new(step_deg: u16) -> DiceMatchResult<Self> {
        if step_deg == 0 {
            return Err(DiceMatchError::InvalidConfig {
                reason: "angle step must be > 0",
            });
        }
        if step_deg >= 360 {
            return Err(DiceMatchError::InvalidConfig {
                reason: "angle step must be < 360",
            });
        }
        let angles = (0..360u16)
            .step_by(usize::from(step_deg))
            .map(Angle)
            .collect();
        Ok(Self { step_deg, angles })
    }

    /// Returns the number of angles in the grid.
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    /// Always false; a valid grid holds at least angle 0.
    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Returns the grid step in degrees.
    pub fn step_deg(&self) -> u16 {
        self.step_deg
    }

    /// All grid angles in ascending order.
    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    /// Index of `angle` if it lies exactly on the grid.
    pub fn index_of(&self, angle: Angle) -> Option<usize> {
        (angle.0 % self.step_deg == 0).then_some(usize::from(angle.0 / self.step_deg))
    }

    /// Grid angles that are exact multiples of `coarse_step_deg`.
    pub fn coarse_subset(&self, coarse_step_deg: u16) -> Vec<Angle> {
        if coarse_step_deg == 0 {
            return Vec::new();
        }
        self.angles
            .iter()
            .copied()
            .filter(|a| a.0 % coarse_step_deg == 0)
            .collect()
    }

    /// Grid angles within `half_range_deg` of `center` by circular distance,
    /// in ascending degree order.
    pub fn within(&self, center: Angle, half_range_deg: u16) -> Vec<Angle> {
        self.angles
            .iter()
            .copied()
            .filter(|a| a.distance(center) <= half_range_deg)
            .collect()
    }

    /// Grid angle nearest to `angle`; ties keep the lower angle.
    pub fn nearest(&self, angle: Angle) -> Angle {
        let mut best = Angle::ZERO;
        let mut best_dist = u16::MAX;
        for &candidate in &self.angles {
            let dist = candidate.distance(angle);
            if dist < best_dist {
                best_dist = dist;
                best = candidate;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::{Angle, AngleGrid};

    #[test]
    fn grid_rejects_bad_steps() {
        assert!(AngleGrid::new(0).is_err());
        assert!(AngleGrid::new(360).is_err());
    }

    #[test]
    fn uneven_step_stops_below_full_turn() {
        let grid = AngleGrid::new(7).unwrap();
        assert_eq!(grid.len(), 52);
        assert_eq!(grid.angles().last().unwrap().degrees(), 357);
    }

    #[test]
    fn index_of_requires_exact_grid_point() {
        let grid = AngleGrid::new(10).unwrap();
        assert_eq!(grid.index_of(Angle::new(40)), Some(4));
        assert_eq!(grid.index_of(Angle::new(45)), None);
    }

    #[test]
    fn nearest_wraps_around_zero() {
        let grid = AngleGrid::new(90).unwrap();
        assert_eq!(grid.nearest(Angle::new(350)), Angle::ZERO);
        assert_eq!(grid.nearest(Angle::new(-91)), Angle::new(270));
    }
}

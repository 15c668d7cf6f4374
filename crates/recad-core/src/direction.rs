// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::RecadError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which tail of the score distribution counts as anomalous.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Low scores are anomalous; a threshold flags `score < threshold`.
    Lower,
    /// High scores are anomalous; a threshold flags `score > threshold`.
    #[default]
    Upper,
}

impl Direction {
    /// Picks the segment representative: the score that must be crossed
    /// before any member of the segment is flagged.
    pub fn representative(self, current: f64, candidate: f64) -> f64 {
        match self {
            Self::Lower => {
                if candidate < current {
                    candidate
                } else {
                    current
                }
            }
            Self::Upper => {
                if candidate > current {
                    candidate
                } else {
                    current
                }
            }
        }
    }

    /// Sweep order: ascending for `Lower`, descending for `Upper`.
    pub fn sweep_cmp(self, left: f64, right: f64) -> Ordering {
        match self {
            Self::Lower => left.total_cmp(&right),
            Self::Upper => right.total_cmp(&left),
        }
    }

    /// Flags a single score against a threshold chosen by the sweep.
    ///
    /// Strict: a score equal to the threshold stays normal.
    pub fn flags(self, score: f64, threshold: f64) -> bool {
        match self {
            Self::Lower => score < threshold,
            Self::Upper => score > threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = RecadError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "lower" => Ok(Self::Lower),
            "upper" => Ok(Self::Upper),
            _ => Err(RecadError::invalid_input(format!(
                "invalid direction '{raw}'; expected one of: lower, upper"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Direction;
    use std::cmp::Ordering;

    #[test]
    fn representative_tracks_the_hardest_point() {
        assert_eq!(Direction::Lower.representative(3.0, 1.0), 1.0);
        assert_eq!(Direction::Lower.representative(1.0, 3.0), 1.0);
        assert_eq!(Direction::Upper.representative(3.0, 10.0), 10.0);
        assert_eq!(Direction::Upper.representative(10.0, 4.0), 10.0);
    }

    #[test]
    fn sweep_order_flips_with_direction() {
        assert_eq!(Direction::Lower.sweep_cmp(1.0, 2.0), Ordering::Less);
        assert_eq!(Direction::Upper.sweep_cmp(1.0, 2.0), Ordering::Greater);
        assert_eq!(Direction::Upper.sweep_cmp(2.0, 2.0), Ordering::Equal);
    }

    #[test]
    fn flags_are_strict_at_the_threshold() {
        assert!(!Direction::Upper.flags(5.0, 5.0));
        assert!(Direction::Upper.flags(5.1, 5.0));
        assert!(!Direction::Upper.flags(4.9, 5.0));
        assert!(!Direction::Lower.flags(5.0, 5.0));
        assert!(Direction::Lower.flags(4.9, 5.0));
        assert!(!Direction::Lower.flags(5.1, 5.0));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("UPPER".parse::<Direction>(), Ok(Direction::Upper));
        assert_eq!("lower".parse::<Direction>(), Ok(Direction::Lower));
        let err = "sideways".parse::<Direction>().expect_err("unknown direction");
        assert!(err.to_string().contains("expected one of: lower, upper"));
    }
}

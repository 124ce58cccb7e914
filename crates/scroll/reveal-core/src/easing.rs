//! Named easing curves.
//!
//! Identifiers follow the `family.direction` form used by web animation
//! libraries (`power2.out`, `sine.inOut`). `powerN` raises progress to the
//! power `N + 1`; a bare family name means `.out`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RevealError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    InOut,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ease {
    Linear,
    /// Polynomial ease of degree `power + 1` (power in 1..=4).
    Power(u8, Direction),
    Sine(Direction),
}

impl Default for Ease {
    fn default() -> Self {
        Ease::Power(1, Direction::Out)
    }
}

#[inline]
fn poly_in(t: f32, degree: i32) -> f32 {
    t.powi(degree)
}

impl Ease {
    /// Map linear progress in [0, 1] to eased progress. Input is clamped.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power(p, dir) => {
                let degree = i32::from(p) + 1;
                match dir {
                    Direction::In => poly_in(t, degree),
                    Direction::Out => 1.0 - poly_in(1.0 - t, degree),
                    Direction::InOut => {
                        if t < 0.5 {
                            poly_in(t * 2.0, degree) / 2.0
                        } else {
                            1.0 - poly_in((1.0 - t) * 2.0, degree) / 2.0
                        }
                    }
                }
            }
            Ease::Sine(dir) => {
                use std::f32::consts::FRAC_PI_2;
                match dir {
                    Direction::In => 1.0 - (t * FRAC_PI_2).cos(),
                    Direction::Out => (t * FRAC_PI_2).sin(),
                    Direction::InOut => -((std::f32::consts::PI * t).cos() - 1.0) / 2.0,
                }
            }
        }
    }
}

fn parse_direction(s: &str) -> Option<Direction> {
    match s {
        "in" => Some(Direction::In),
        "out" => Some(Direction::Out),
        "inOut" | "inout" => Some(Direction::InOut),
        _ => None,
    }
}

impl FromStr for Ease {
    type Err = RevealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || RevealError::UnknownEasing { name: s.to_string() };
        let trimmed = s.trim();
        if trimmed == "none" || trimmed == "linear" {
            return Ok(Ease::Linear);
        }
        let (family, dir) = match trimmed.split_once('.') {
            Some((f, d)) => (f, parse_direction(d).ok_or_else(unknown)?),
            None => (trimmed, Direction::Out),
        };
        match family {
            "sine" => Ok(Ease::Sine(dir)),
            "power1" => Ok(Ease::Power(1, dir)),
            "power2" => Ok(Ease::Power(2, dir)),
            "power3" => Ok(Ease::Power(3, dir)),
            "power4" => Ok(Ease::Power(4, dir)),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = |d: &Direction| match d {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inOut",
        };
        match self {
            Ease::Linear => write!(f, "none"),
            Ease::Power(p, d) => write!(f, "power{}.{}", p, dir(d)),
            Ease::Sine(d) => write!(f, "sine.{}", dir(d)),
        }
    }
}

impl Serialize for Ease {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ease {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

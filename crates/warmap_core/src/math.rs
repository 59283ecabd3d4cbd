//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation scalars (manpower, organization, fill ratios, cooperation,
//! elapsed milliseconds) are fixed-point so that two runs from the same seed
//! agree bit for bit.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// One half, exact in `I32F32`.
pub const HALF: Fixed = Fixed::from_bits(1 << 31);

/// Fixed-point 2D vector, used for region centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for maps with fixed-point values, stored as raw bits.
pub mod fixed_map_serde {
    use std::collections::BTreeMap;

    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize every value as its raw bit representation.
    pub fn serialize<K, S>(map: &BTreeMap<K, Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize + Ord,
        S: Serializer,
    {
        let bits: BTreeMap<&K, i64> = map.iter().map(|(k, v)| (k, v.to_bits())).collect();
        bits.serialize(serializer)
    }

    /// Deserialize a map whose values are raw bit representations.
    pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, Fixed>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        D: Deserializer<'de>,
    {
        let bits = BTreeMap::<K, i64>::deserialize(deserializer)?;
        Ok(bits
            .into_iter()
            .map(|(k, v)| (k, Fixed::from_bits(v)))
            .collect())
    }
}

/// Serde support for human-edited fixed-point values.
///
/// Config files carry decimals (`0.25`) rather than raw bits. Conversion
/// happens once at load time, so the simulation itself never touches floats.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal, saturating at the range.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if value.is_nan() {
            return Err(serde::de::Error::custom("NaN is not a valid fixed-point value"));
        }
        Ok(Fixed::saturating_from_num(value))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Arithmetic mean of a set of points, `None` when empty.
    #[must_use]
    pub fn centroid(points: impl IntoIterator<Item = Self>) -> Option<Self> {
        let mut sum_x = Fixed::ZERO;
        let mut sum_y = Fixed::ZERO;
        let mut count = 0i32;
        for p in points {
            sum_x = sum_x.saturating_add(p.x);
            sum_y = sum_y.saturating_add(p.y);
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = Fixed::from_num(count);
        Some(Self::new(sum_x / n, sum_y / n))
    }

    /// Monotone stand-in for `atan2` in the range `[0, 4)`.
    ///
    /// Orders directions around the origin the same way a real angle does
    /// (counter-clockwise from +x) without trigonometry. Returns `None` for
    /// the zero vector.
    #[must_use]
    pub fn pseudo_angle(self) -> Option<Fixed> {
        let ax = self.x.abs();
        let ay = self.y.abs();
        let sum = ax + ay;
        if sum == Fixed::ZERO {
            return None;
        }
        let p = self.y / sum;
        let two = Fixed::from_num(2);
        let four = Fixed::from_num(4);
        let angle = if self.x >= Fixed::ZERO {
            if p >= Fixed::ZERO {
                p
            } else {
                four + p
            }
        } else {
            two - p
        };
        Some(angle)
    }
}

/// Circular distance between two pseudo-angles in `[0, 4)`.
#[must_use]
pub fn pseudo_angle_gap(a: Fixed, b: Fixed) -> Fixed {
    let four = Fixed::from_num(4);
    let d = (a - b).abs();
    if d > Fixed::from_num(2) {
        four - d
    } else {
        d
    }
}

/// Clamp a value into `[0, 1]`.
#[must_use]
pub fn clamp_unit(value: Fixed) -> Fixed {
    value.clamp(Fixed::ZERO, Fixed::ONE)
}

/// `numerator / denominator` as a fixed-point ratio, zero when the
/// denominator is zero.
///
/// Rounded to nearest, as decimal config values are, so a count sitting
/// exactly on a configured threshold compares equal to it.
#[must_use]
pub fn ratio(numerator: u32, denominator: u32) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    let den = u128::from(denominator);
    let bits = ((u128::from(numerator) << Fixed::FRAC_NBITS) + den / 2) / den;
    Fixed::from_bits(i64::try_from(bits).unwrap_or(i64::MAX))
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_half_is_exact() {
        assert_eq!(HALF + HALF, Fixed::ONE);
    }

    #[test]
    fn test_pseudo_angle_orders_quadrants() {
        let east = Vec2Fixed::from_ints(1, 0).pseudo_angle().unwrap();
        let north = Vec2Fixed::from_ints(0, 1).pseudo_angle().unwrap();
        let west = Vec2Fixed::from_ints(-1, 0).pseudo_angle().unwrap();
        let south = Vec2Fixed::from_ints(0, -1).pseudo_angle().unwrap();
        assert!(east < north);
        assert!(north < west);
        assert!(west < south);
        assert!(south < Fixed::from_num(4));
        assert_eq!(Vec2Fixed::ZERO.pseudo_angle(), None);
    }

    #[test]
    fn test_pseudo_angle_gap_wraps() {
        let a = Fixed::from_num(0.25);
        let b = Fixed::from_num(3.75);
        assert_eq!(pseudo_angle_gap(a, b), Fixed::from_num(0.5));
    }

    #[test]
    fn test_centroid() {
        let c = Vec2Fixed::centroid([Vec2Fixed::from_ints(0, 0), Vec2Fixed::from_ints(4, 2)]);
        assert_eq!(c, Some(Vec2Fixed::from_ints(2, 1)));
        assert_eq!(Vec2Fixed::centroid(std::iter::empty()), None);
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_ratio_handles_zero_denominator() {
        assert_eq!(ratio(3, 0), Fixed::ZERO);
        assert_eq!(ratio(1, 2), HALF);
    }

    #[test]
    fn test_ratio_matches_decimal_conversion() {
        assert_eq!(ratio(3, 5), Fixed::from_num(0.6));
        assert_eq!(ratio(13, 10), Fixed::from_num(1.3));
        assert_eq!(ratio(1, 3), Fixed::from_num(1.0 / 3.0));
        assert_eq!(ratio(u32::MAX, 1), Fixed::from_num(u32::MAX));
    }
}

#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Mask of the `bits` least significant bits
#[inline]
fn mask(bits: u32) -> u64 {
    match bits {
        0 => 0,
        1..64 => (1 << bits) - 1,
        _ => u64::MAX,
    }
}

/// Two's complement carrier of `value` in `bits` bits
///
/// The result is the non-negative integer whose `bits` least significant bits
/// are the two's complement representation of `value`.
/// Applying it again with the same `bits` is a no-op.
///
/// ```
/// # use cla_biquad::*;
/// assert_eq!(twos_complement(-1, 4), 0xf);
/// assert_eq!(twos_complement(0x1234, 8), 0x34);
/// assert_eq!(twos_complement(twos_complement(-5, 6) as _, 6), twos_complement(-5, 6));
/// ```
pub fn twos_complement(value: i64, bits: u32) -> u64 {
    value as u64 & mask(bits)
}

/// Interpret the `bits` least significant bits of `value` as a signed integer
///
/// ```
/// # use cla_biquad::*;
/// assert_eq!(sign_extend(0xf, 4), -1);
/// assert_eq!(sign_extend(0x7, 4), 7);
/// ```
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    match bits {
        0 => 0,
        1..64 => ((value << (64 - bits)) as i64) >> (64 - bits),
        _ => value as i64,
    }
}

/// Signed fixed point format `Q<int_bits>.<frac_bits>`
///
/// `int_bits` includes the sign bit. The total width `int_bits + frac_bits`
/// must be in `1..=64`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Format {
    /// Integer bits, including the sign bit
    pub int_bits: u32,
    /// Fractional bits
    pub frac_bits: u32,
}

impl Default for Format {
    fn default() -> Self {
        Self::Q4_14
    }
}

impl Format {
    /// Hardware coefficient format
    pub const Q4_14: Self = Self::new(4, 14);

    /// Create a new format
    pub const fn new(int_bits: u32, frac_bits: u32) -> Self {
        Self {
            int_bits,
            frac_bits,
        }
    }

    /// Total width in bits, saturating
    pub const fn bits(&self) -> u32 {
        self.int_bits.saturating_add(self.frac_bits)
    }

    /// The same format with `extra` additional fractional guard bits
    ///
    /// ```
    /// # use cla_biquad::*;
    /// assert_eq!(Format::Q4_14.guard(2), Format::new(4, 16));
    /// ```
    pub const fn guard(&self, extra: u32) -> Self {
        Self::new(self.int_bits, self.frac_bits.saturating_add(extra))
    }

    fn width(&self) -> Result<u32, Error> {
        match self.bits() {
            bits @ 1..=64 => Ok(bits),
            bits => Err(Error::Width { bits }),
        }
    }

    /// Scale of one least significant bit: `2**frac_bits`
    pub fn scale(&self) -> f64 {
        2.0f64.powi(self.frac_bits as _)
    }

    /// Magnitude bound of the unscaled value: `2**(int_bits - 1)`
    ///
    /// The bound is exclusive on the positive side and inclusive on the negative side.
    pub fn limit(&self) -> f64 {
        2.0f64.powi(self.int_bits.saturating_sub(1) as _)
    }

    /// Whether `value` can be encoded without overflow
    ///
    /// ```
    /// # use cla_biquad::*;
    /// assert!(Format::Q4_14.contains(-8.0));
    /// assert!(!Format::Q4_14.contains(8.0));
    /// ```
    pub fn contains(&self, value: f64) -> bool {
        let limit = self.limit();
        -limit <= value && value < limit
    }

    /// Encode a real value
    ///
    /// Scales by `2**frac_bits`, truncates towards negative infinity
    /// and returns the two's complement carrier.
    ///
    /// # Errors
    /// * [`Error::Range`] if the value does not fit the signed integer part
    ///   and `allow_overflow` is false. With `allow_overflow` the result wraps.
    /// * [`Error::Width`] for unsupported formats.
    pub fn encode(&self, value: f64, allow_overflow: bool) -> Result<u64, Error> {
        let bits = self.width()?;
        if !allow_overflow && !self.contains(value) {
            return Err(Error::Range {
                value,
                int_bits: self.int_bits,
                frac_bits: self.frac_bits,
            });
        }
        // Saturating float cast, wrapping integer truncation
        let scaled = (value * self.scale()).floor() as i128;
        Ok(scaled as u64 & mask(bits))
    }

    /// Decode a carrier into a real value
    ///
    /// # Errors
    /// * [`Error::Encoded`] if `encoded` is negative or has bits set above the format width.
    /// * [`Error::Width`] for unsupported formats.
    pub fn decode(&self, encoded: i64, signed: bool) -> Result<f64, Error> {
        let bits = self.width()?;
        if encoded < 0 || (bits < 64 && encoded >> bits != 0) {
            return Err(Error::Encoded { encoded, bits });
        }
        let value = if signed {
            sign_extend(encoded as _, bits)
        } else {
            encoded
        };
        Ok(value as f64 / self.scale())
    }

    /// Quantize to a signed integer in units of the least significant bit
    ///
    /// This is the floor truncation of [`Format::encode()`] without overflow,
    /// sign extended back into an `i64`.
    ///
    /// ```
    /// # use cla_biquad::*;
    /// assert_eq!(Format::Q4_14.quantize(-0.5), Ok(-8192));
    /// assert_eq!(Format::Q4_14.quantize(1.0 / 3.0), Ok(5461));
    /// ```
    pub fn quantize(&self, value: f64) -> Result<i64, Error> {
        Ok(sign_extend(self.encode(value, false)?, self.bits()))
    }
}

/// Encode `value` as a `Q<int_bits>.<frac_bits>` two's complement carrier
///
/// See [`Format::encode()`].
///
/// ```
/// # use cla_biquad::*;
/// assert_eq!(to_fixed_point(1.5, 4, 14, false), Ok(3 << 13));
/// assert_eq!(to_fixed_point(-8.0, 4, 14, false), Ok(1 << 17));
/// assert!(to_fixed_point(8.0, 4, 14, false).is_err());
/// ```
pub fn to_fixed_point(
    value: f64,
    int_bits: u32,
    frac_bits: u32,
    allow_overflow: bool,
) -> Result<u64, Error> {
    Format::new(int_bits, frac_bits).encode(value, allow_overflow)
}

/// Decode a `Q<int_bits>.<frac_bits>` carrier
///
/// See [`Format::decode()`].
///
/// ```
/// # use cla_biquad::*;
/// assert_eq!(from_fixed_point(1 << 17, 4, 14, true), Ok(-8.0));
/// assert_eq!(from_fixed_point(1 << 17, 4, 14, false), Ok(8.0));
/// assert!(from_fixed_point(-1, 4, 14, true).is_err());
/// ```
pub fn from_fixed_point(
    encoded: i64,
    int_bits: u32,
    frac_bits: u32,
    signed: bool,
) -> Result<f64, Error> {
    Format::new(int_bits, frac_bits).decode(encoded, signed)
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn encode_q4_14() {
        assert_eq!(to_fixed_point(0.0, 4, 14, false), Ok(0));
        assert_eq!(to_fixed_point(-0.5, 4, 14, false), Ok((1 << 18) - 8192));
        // floor, not round
        assert_eq!(to_fixed_point(-1e-9, 4, 14, false), Ok((1 << 18) - 1));
        assert_eq!(to_fixed_point(1.0 - 1e-9, 4, 14, false), Ok((1 << 14) - 1));
        assert_eq!(to_fixed_point(7.99, 4, 14, false), Ok(130908));
    }

    #[test]
    fn encode_bounds() {
        assert_eq!(
            to_fixed_point(8.0, 4, 14, false),
            Err(Error::Range {
                value: 8.0,
                int_bits: 4,
                frac_bits: 14
            })
        );
        assert!(to_fixed_point(-8.0 - 1e-9, 4, 14, false).is_err());
        assert!(to_fixed_point(f64::NAN, 4, 14, false).is_err());
        // zero integer bits still admit [-1, 1[
        assert_eq!(to_fixed_point(-1.0, 0, 8, false), Ok(0));
        assert!(to_fixed_point(1.0, 0, 8, false).is_err());
        assert_eq!(
            to_fixed_point(0.5, 40, 40, false),
            Err(Error::Width { bits: 80 })
        );
        assert_eq!(
            to_fixed_point(0.5, u32::MAX, 1, false),
            Err(Error::Width { bits: u32::MAX })
        );
        assert_eq!(
            from_fixed_point(1, 1, u32::MAX, true),
            Err(Error::Width { bits: u32::MAX })
        );
        assert_eq!(
            Format::Q4_14.guard(u32::MAX).quantize(0.5),
            Err(Error::Width { bits: u32::MAX })
        );
    }

    #[test]
    fn encode_wraps() {
        // 9.5 wraps to 9.5 - 16
        let e = to_fixed_point(9.5, 4, 14, true).unwrap();
        assert_eq!(e, 155648);
        assert_eq!(from_fixed_point(e as _, 4, 14, true), Ok(-6.5));
        let e = to_fixed_point(-100.25, 4, 14, true).unwrap();
        assert_eq!(from_fixed_point(e as _, 4, 14, true), Ok(-100.25 + 96.0));
    }

    #[test]
    fn decode_bounds() {
        assert_eq!(from_fixed_point((1 << 18) - 1, 4, 14, true), Ok(-1.0 / 16384.0));
        assert_eq!(from_fixed_point((1 << 17) - 1, 4, 14, true), Ok(8.0 - 1.0 / 16384.0));
        assert_eq!(
            from_fixed_point(1 << 18, 4, 14, true),
            Err(Error::Encoded {
                encoded: 1 << 18,
                bits: 18
            })
        );
        assert!(from_fixed_point(1 << 18, 4, 14, false).is_err());
        assert!(from_fixed_point(-1, 4, 14, false).is_err());
        assert_eq!(from_fixed_point(i64::MAX, 32, 32, false), Ok(i64::MAX as f64 / 2.0f64.powi(32)));
    }

    #[test]
    fn boundary_asymmetry() {
        // The largest positive carrier decodes fine but its value is not encodable
        // with one integer bit less than the format provides.
        let max = from_fixed_point((1 << 17) - 1, 4, 14, true).unwrap();
        assert!(to_fixed_point(max, 4, 14, false).is_ok());
        assert!(to_fixed_point(max + 1.0 / 16384.0, 4, 14, false).is_err());
        // Unsigned decode covers values encode rejects.
        let big = from_fixed_point(1 << 17, 4, 14, false).unwrap();
        assert!(to_fixed_point(big, 4, 14, false).is_err());
    }

    #[test]
    fn quantize() {
        let q = Format::Q4_14.guard(2);
        assert_eq!(q.quantize(1.0), Ok(1 << 16));
        assert_eq!(q.quantize(-7.0), Ok(-7 << 16));
        assert!(q.quantize(8.5).is_err());
    }

    #[quickcheck]
    fn roundtrip(x: i32, int_bits: u8, frac_bits: u8) -> bool {
        let format = Format::new(1 + int_bits as u32 % 24, frac_bits as u32 % 32);
        let value = x as f64 / (1 << 16) as f64;
        if !format.contains(value) {
            return true;
        }
        let lsb = format.scale().recip();
        let e = format.encode(value, false).unwrap();
        let back = format.decode(e as _, true).unwrap();
        back <= value && value - back < lsb
    }

    #[quickcheck]
    fn twos_complement_idempotent(x: i64, bits: u8) -> bool {
        let bits = bits as u32 % 65;
        let once = twos_complement(x, bits);
        twos_complement(once as _, bits) == once
    }

    #[quickcheck]
    fn sign_extend_inverts(x: i32, bits: u8) -> bool {
        let bits = 32 + bits as u32 % 33;
        sign_extend(twos_complement(x as _, bits), bits) == x as i64
    }
}

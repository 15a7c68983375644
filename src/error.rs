/// Configuration errors
///
/// These are raised synchronously where the violation is detected and are not
/// recoverable: they indicate a bad pole, a bad parallelism factor, or a
/// stream that does not match the hardware block structure.
///
/// Wraparound inside the simulated integer pipeline is never an error.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Value does not fit the signed integer part of the format
    #[error("value {value} out of range for Q{int_bits}.{frac_bits}")]
    Range {
        /// Offending real value
        value: f64,
        /// Integer bits, including sign
        int_bits: u32,
        /// Fractional bits
        frac_bits: u32,
    },
    /// Encoded carrier is negative or wider than the format
    #[error("encoded value {encoded} out of range for {bits} bits")]
    Encoded {
        /// Offending carrier
        encoded: i64,
        /// Total format width
        bits: u32,
    },
    /// Unsupported format width
    #[error("format width {bits} not in 1..=64")]
    Width {
        /// Total format width
        bits: u32,
    },
    /// A coefficient exceeds the hardware coefficient word
    #[error("coefficient {index} = {value} exceeds the coefficient word")]
    CoefficientRange {
        /// Index into the packed coefficient vector
        index: usize,
        /// Coefficient value
        value: f64,
    },
    /// The manual FIR path is not available
    #[error("manual FIR path is not supported")]
    UnsupportedMode,
    /// Parallelism below the minimum of three samples per clock
    #[error("{samples_per_clock} samples per clock, need at least 3")]
    Parallelism {
        /// Requested samples per clock
        samples_per_clock: usize,
    },
    /// Length does not match the cluster structure
    #[error("length {len} does not match {samples_per_clock} samples per clock")]
    Length {
        /// Offending length
        len: usize,
        /// Samples per clock
        samples_per_clock: usize,
    },
    /// Denominator has real poles
    #[error("denominator has no complex pole pair")]
    RealPoles,
    /// Pole magnitude outside of `[0, 1)`
    #[error("pole magnitude {magnitude} not in [0, 1)")]
    Magnitude {
        /// Offending magnitude
        magnitude: f64,
    },
}

use miniconf::Tree;
use serde::{Deserialize, Serialize};

use crate::{Coefficients, Error, Fir, Format, Lanes, Lookahead, Pole};

/// Look-ahead biquad settings
///
/// Runtime settings tree for a [`Lookahead`].
///
/// ```
/// use miniconf::Tree;
/// #[derive(Tree)]
/// struct Settings {
///     notch: cla_biquad::Config,
///     enable: bool,
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Tree, Serialize, Deserialize)]
pub struct Config {
    /// Pole radius
    ///
    /// `0 <= magnitude < 1`
    pub magnitude: f64,
    /// Pole angle
    ///
    /// Units: radians
    pub angle: f64,
    /// Samples per clock, at least 3
    pub samples_per_clock: usize,
    /// Coefficient integer bits, including sign
    pub int_bits: u32,
    /// Coefficient fractional bits
    ///
    /// The engine shifts assume 14.
    pub frac_bits: u32,
    /// Guard bits carried through the lane filters
    ///
    /// The coefficients are quantized with as many additional fractional bits.
    pub added_precision: u32,
    /// Zero the non-recursive lanes
    pub decimate: bool,
    /// Companion lane lag one coefficient, used without `decimate`
    pub a1: i64,
    /// Companion lane lag two coefficient, used without `decimate`
    pub a2: i64,
    /// FIR lane implementation
    #[tree(with=miniconf::leaf)]
    pub fir: Fir,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            magnitude: 0.0,
            angle: 0.0,
            samples_per_clock: 8,
            int_bits: 4,
            frac_bits: 14,
            added_precision: 0,
            decimate: true,
            a1: 0,
            a2: 0,
            fir: Fir::default(),
        }
    }
}

impl Config {
    /// The pole
    pub fn pole(&self) -> Pole {
        Pole::new(self.magnitude, self.angle)
    }

    /// Coefficient format including added precision
    pub fn format(&self) -> Format {
        Format::new(self.int_bits, self.frac_bits).guard(self.added_precision)
    }

    /// Derive and quantize the coefficients and build the engine
    ///
    /// ```
    /// # use cla_biquad::*;
    /// let config = Config {
    ///     magnitude: 0.95,
    ///     angle: 0.3,
    ///     ..Default::default()
    /// };
    /// let lookahead = config.build().unwrap();
    /// assert_eq!(lookahead.samples_per_clock(), 8);
    /// ```
    ///
    /// # Errors
    /// See [`Coefficients::new()`] and [`Coefficients::quantize()`].
    pub fn build(&self) -> Result<Lookahead, Error> {
        let coefficients =
            Coefficients::new(&self.pole(), self.samples_per_clock)?.quantize(self.format())?;
        let lanes = if self.decimate {
            Lanes::Decimate
        } else {
            Lanes::Companion {
                a1: self.a1,
                a2: self.a2,
            }
        };
        log::debug!("{self:?}: {:?}", coefficients.to_vec());
        Ok(Lookahead::new(coefficients)
            .with_added_precision(self.added_precision)
            .with_lanes(lanes)
            .with_fir(self.fir))
    }
}

use num_complex::Complex;
#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Pole of the notch in the z-plane
///
/// Only `cos(angle)` enters the coefficient derivation, so either pole of the
/// complex conjugate pair can be used.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Pole {
    /// Pole radius, `0 <= magnitude < 1`
    pub magnitude: f64,
    /// Pole angle in radians
    pub angle: f64,
}

impl Pole {
    /// Create a new pole from polar coordinates
    pub const fn new(magnitude: f64, angle: f64) -> Self {
        Self { magnitude, angle }
    }

    /// Check that the pole is stable
    ///
    /// ```
    /// # use cla_biquad::*;
    /// assert!(Pole::new(0.95, 0.3).check().is_ok());
    /// assert!(Pole::new(1.0, 0.3).check().is_err());
    /// ```
    pub fn check(&self) -> Result<(), Error> {
        if (0.0..1.0).contains(&self.magnitude) && self.angle.is_finite() {
            Ok(())
        } else {
            Err(Error::Magnitude {
                magnitude: self.magnitude,
            })
        }
    }

    /// Denominator `[1, -2 r cos(angle), r**2]` of the pole pair
    pub fn denominator(&self) -> [f64; 3] {
        [
            1.0,
            -2.0 * self.magnitude * self.angle.cos(),
            self.magnitude * self.magnitude,
        ]
    }

    /// Extract the pole of a second order section `[[b0, b1, b2], [a0, a1, a2]]`
    ///
    /// Returns the pole in the upper half plane.
    ///
    /// ```
    /// # use cla_biquad::*;
    /// let p = Pole::new(0.9, 1.2);
    /// let q = Pole::from_ba(&[[1.0, 0.0, 0.0], p.denominator()]).unwrap();
    /// assert!((q.magnitude - p.magnitude).abs() < 1e-12);
    /// assert!((q.angle - p.angle).abs() < 1e-12);
    /// ```
    ///
    /// # Errors
    /// [`Error::RealPoles`] if the denominator has no complex conjugate pole pair.
    pub fn from_ba(ba: &[[f64; 3]; 2]) -> Result<Self, Error> {
        let [a0, a1, a2] = ba[1];
        let (a1, a2) = (a1 / a0, a2 / a0);
        if !(a1 * a1 < 4.0 * a2) {
            return Err(Error::RealPoles);
        }
        let magnitude = a2.sqrt();
        Ok(Self::new(magnitude, (-a1 / (2.0 * magnitude)).acos()))
    }
}

impl From<Complex<f64>> for Pole {
    fn from(value: Complex<f64>) -> Self {
        Self::new(value.re.hypot(value.im), value.im.atan2(value.re))
    }
}

impl From<Pole> for Complex<f64> {
    fn from(value: Pole) -> Self {
        let (sin, cos) = value.angle.sin_cos();
        Complex::new(value.magnitude * cos, value.magnitude * sin)
    }
}

/// Second order IIR notch design
///
/// The classical notch with zeros on the unit circle at the notch frequency
/// and a pole pair at the same angle, pulled inside by the bandwidth.
/// This is the upstream design step that picks the [`Pole`].
///
/// ```
/// # use cla_biquad::*;
/// let pole = Notch::new(0.125, 5.0).pole().unwrap();
/// assert!(pole.check().is_ok());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Notch {
    /// Notch frequency in units of the sample rate, `0 < frequency < 0.5`
    pub frequency: f64,
    /// Quality factor: notch frequency over -3 dB bandwidth
    pub q: f64,
}

impl Notch {
    /// Create a new notch
    pub const fn new(frequency: f64, q: f64) -> Self {
        Self { frequency, q }
    }

    /// Transfer function `[[b0, b1, b2], [a0, a1, a2]]`
    pub fn ba(&self) -> [[f64; 3]; 2] {
        let w0 = core::f64::consts::TAU * self.frequency;
        // -3 dB bandwidth
        let beta = (0.5 * w0 / self.q).tan();
        let gain = (1.0 + beta).recip();
        let fcos = -2.0 * w0.cos();
        [
            [gain, gain * fcos, gain],
            [1.0, gain * fcos, 2.0 * gain - 1.0],
        ]
    }

    /// Pole of the notch
    pub fn pole(&self) -> Result<Pole, Error> {
        Pole::from_ba(&self.ba())
    }
}

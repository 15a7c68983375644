use alloc::vec::Vec;

#[allow(unused_imports)]
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::{Error, Format, Pole};

/// Chebyshev polynomial of the second kind `U_n(x)`
///
/// `U_n(cos(t)) = sin((n + 1) t)/sin(t)`
///
/// ```
/// # use cla_biquad::*;
/// assert_eq!(chebyshev_u(0, 0.3), 1.0);
/// assert_eq!(chebyshev_u(1, 0.3), 0.6);
/// assert_eq!(chebyshev_u(2, 0.5), 0.0);
/// ```
pub fn chebyshev_u(n: usize, x: f64) -> f64 {
    let (mut u0, mut u1) = (1.0, 2.0 * x);
    if n == 0 {
        return u0;
    }
    for _ in 1..n {
        (u0, u1) = (u1, 2.0 * x * u1 - u0);
    }
    u1
}

/// Clustered look-ahead biquad coefficients
///
/// With `N` samples per clock the single sample recursion
/// `y[n] = x[n] + 2 r cos(t) y[n-1] - r**2 y[n-2]` is unrolled such that only
/// lanes 0 and 1 of every cluster recur, and only on the state of the
/// cluster two clocks earlier:
///
/// * `f_fir`: `N - 2` FIR taps of the lane 0 ("f") pre-filter
/// * `g_fir`: `N - 1` FIR taps of the lane 1 ("g") pre-filter
/// * `cross`: `[D_FF, D_FG, E_GF, E_GG]`, the look-back taps of each lane on
///   itself (`D_FF`, `E_GG`) and the cross links between them (`D_FG`, `E_GF`)
/// * `update`: `[C0, C1, C2, C3]`, the two-state update matrix
///
/// The packed order `[f_fir.., g_fir.., D_FF, D_FG, E_GF, E_GG, C0, C1, C2, C3]`
/// is the interchange order of the simulation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients<T> {
    /// Lane 0 FIR taps
    pub f_fir: Vec<T>,
    /// Lane 1 FIR taps
    pub g_fir: Vec<T>,
    /// Look-back and cross-link coefficients `[D_FF, D_FG, E_GF, E_GG]`
    pub cross: [T; 4],
    /// Update matrix `[C0, C1, C2, C3]`
    pub update: [T; 4],
}

impl<T: Copy> Coefficients<T> {
    /// Samples per clock
    pub fn samples_per_clock(&self) -> usize {
        self.g_fir.len() + 1
    }

    /// Length of the packed coefficient vector: `2*N + 5`
    pub fn packed_len(samples_per_clock: usize) -> usize {
        samples_per_clock.saturating_mul(2).saturating_add(5)
    }

    /// `D_FF`: lane 0 look-back on itself
    pub fn d_ff(&self) -> T {
        self.cross[0]
    }

    /// `D_FG`: lane 1 into lane 0
    pub fn d_fg(&self) -> T {
        self.cross[1]
    }

    /// `E_GF`: lane 0 into lane 1
    pub fn e_gf(&self) -> T {
        self.cross[2]
    }

    /// `E_GG`: lane 1 look-back on itself
    pub fn e_gg(&self) -> T {
        self.cross[3]
    }

    /// Iterate over the coefficients in packed order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.f_fir
            .iter()
            .chain(self.g_fir.iter())
            .chain(self.cross.iter())
            .chain(self.update.iter())
            .copied()
    }

    /// Packed coefficient vector
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Unpack a coefficient vector
    ///
    /// ```
    /// # use cla_biquad::*;
    /// let c = Coefficients::new(&Pole::new(0.9, 0.5), 4).unwrap();
    /// assert_eq!(Coefficients::from_packed(&c.to_vec(), 4).unwrap(), c);
    /// ```
    ///
    /// # Errors
    /// * [`Error::Parallelism`] for fewer than three samples per clock.
    /// * [`Error::Length`] if the vector is not `2*N + 5` long.
    pub fn from_packed(packed: &[T], samples_per_clock: usize) -> Result<Self, Error> {
        let n = samples_per_clock;
        if n < 3 {
            return Err(Error::Parallelism {
                samples_per_clock: n,
            });
        }
        if packed.len() != Self::packed_len(n) {
            return Err(Error::Length {
                len: packed.len(),
                samples_per_clock: n,
            });
        }
        let (f_fir, rest) = packed.split_at(n - 2);
        let (g_fir, rest) = rest.split_at(n - 1);
        let (cross, update) = rest.split_at(4);
        Ok(Self {
            f_fir: f_fir.into(),
            g_fir: g_fir.into(),
            cross: [cross[0], cross[1], cross[2], cross[3]],
            update: [update[0], update[1], update[2], update[3]],
        })
    }
}

impl Coefficients<f64> {
    /// Derive the coefficients for a pole and a parallelism factor
    ///
    /// With `m = magnitude`, `U_k = chebyshev_u(k, cos(angle))` and `N = samples_per_clock`:
    ///
    /// * `f_fir[i] = m**(i+1) U_(i+1)`, `i < N - 2`
    /// * `g_fir[i] = m**(i+1) U_(i+1)`, `i < N - 1`
    /// * `D_FF = -m**N U_(N-2)`, `D_FG = m**(N-1) U_(N-1)`,
    ///   `E_GF = -m**(N+1) U_(N-1)`, `E_GG = m**N U_N`
    /// * `C0 = m**(2N) (U_(N-2)**2 - U_(N-1)**2)`,
    ///   `C1 = m**(2N-1) U_(N-1) (U_N - U_(N-2))`,
    ///   `C2 = m**(2N+1) U_(N-1) (U_(N-2) - U_N)`,
    ///   `C3 = m**(2N) (U_N**2 - U_(N-1)**2)`
    ///
    /// The update matrix is the square of the `N` step state transition:
    /// its eigenvalues are the pole pair raised to `2N`.
    ///
    /// ```
    /// # use cla_biquad::*;
    /// let c = Coefficients::new(&Pole::new(0.95, 0.3), 8).unwrap();
    /// assert_eq!(c.f_fir.len(), 6);
    /// assert_eq!(c.g_fir.len(), 7);
    /// ```
    ///
    /// # Errors
    /// * [`Error::Parallelism`] for fewer than three samples per clock.
    /// * [`Error::Magnitude`] for unstable poles.
    pub fn new(pole: &Pole, samples_per_clock: usize) -> Result<Self, Error> {
        let n = samples_per_clock;
        if n < 3 {
            return Err(Error::Parallelism {
                samples_per_clock: n,
            });
        }
        pole.check()?;
        let m = pole.magnitude;
        let x = pole.angle.cos();
        let mp = |k: usize| m.powi(k as _);
        let taps = |len: usize| -> Vec<f64> {
            (1..=len).map(|k| mp(k) * chebyshev_u(k, x)).collect()
        };
        let (u2, u1, u0) = (
            chebyshev_u(n - 2, x),
            chebyshev_u(n - 1, x),
            chebyshev_u(n, x),
        );
        let cross = [-mp(n) * u2, mp(n - 1) * u1, -mp(n + 1) * u1, mp(n) * u0];
        let update = [
            mp(2 * n) * (u2 * u2 - u1 * u1),
            mp(2 * n - 1) * (u1 * (u0 - u2)),
            mp(2 * n + 1) * (u1 * (u2 - u0)),
            mp(2 * n) * (u0 * u0 - u1 * u1),
        ];
        log::debug!("N={n} {pole:?}: cross {cross:?} update {update:?}");
        Ok(Self {
            f_fir: taps(n - 2),
            g_fir: taps(n - 1),
            cross,
            update,
        })
    }

    /// Quantize all coefficients to a fixed point format
    ///
    /// Floor truncation, as in [`Format::quantize()`].
    ///
    /// ```
    /// # use cla_biquad::*;
    /// let c = Coefficients::new(&Pole::new(0.95, 0.3), 4).unwrap();
    /// let q = c.quantize(Format::Q4_14).unwrap();
    /// assert_eq!(q.f_fir, [29739, 39194]);
    /// ```
    ///
    /// # Errors
    /// * [`Error::CoefficientRange`] for the first coefficient (in packed order)
    ///   that does not fit the integer part of the format.
    /// * [`Error::Width`] for unsupported formats.
    pub fn quantize(&self, format: Format) -> Result<Coefficients<i64>, Error> {
        let packed = self
            .iter()
            .enumerate()
            .map(|(index, value)| {
                format.quantize(value).map_err(|e| match e {
                    Error::Range { .. } => Error::CoefficientRange { index, value },
                    e => e,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Coefficients::from_packed(&packed, self.samples_per_clock())
    }
}

impl Coefficients<i64> {
    /// Check all coefficients against a signed coefficient word `-limit <= c < limit`
    ///
    /// # Errors
    /// [`Error::CoefficientRange`] for the first coefficient outside the word.
    pub fn check_word(&self, limit: i64) -> Result<(), Error> {
        match self
            .iter()
            .enumerate()
            .find(|(_, c)| *c >= limit || *c < -limit)
        {
            Some((index, c)) => Err(Error::CoefficientRange {
                index,
                value: c as _,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::isclose;

    #[test]
    fn chebyshev() {
        for t in [0.1f64, 0.3, 1.0, 2.5] {
            for n in 0..12 {
                let want = ((n + 1) as f64 * t).sin() / t.sin();
                assert!(isclose(chebyshev_u(n, t.cos()), want, 1e-12, 1e-12));
            }
        }
    }

    #[test]
    fn lengths() {
        let pole = Pole::new(0.95, 0.3);
        for n in [3, 4, 8, 16] {
            let c = Coefficients::new(&pole, n).unwrap();
            assert_eq!(c.f_fir.len(), n - 2);
            assert_eq!(c.g_fir.len(), n - 1);
            assert_eq!(c.samples_per_clock(), n);
            assert_eq!(c.to_vec().len(), Coefficients::<f64>::packed_len(n));
        }
        assert_eq!(
            Coefficients::new(&pole, 2),
            Err(Error::Parallelism {
                samples_per_clock: 2
            })
        );
        assert_eq!(
            Coefficients::from_packed(&[0i64; 20], 8),
            Err(Error::Length {
                len: 20,
                samples_per_clock: 8
            })
        );
    }

    #[test]
    fn quantized_q4_14() {
        let pole = Pole::new(0.95, 0.3);
        let c = Coefficients::new(&pole, 8)
            .unwrap()
            .quantize(Format::Q4_14)
            .unwrap();
        assert_eq!(
            c.to_vec(),
            [
                29739, 39194, 44303, 45044, 41777, 35179, // f
                29739, 39194, 44303, 45044, 41777, 35179, 26151, // g
                -31750, 26151, -23602, 15719, // D_FF, D_FG, E_GF, E_GG
                23852, -25587, 23092, -22591, // C
            ]
        );
        let c = Coefficients::new(&pole, 4)
            .unwrap()
            .quantize(Format::Q4_14)
            .unwrap();
        assert_eq!(
            c.to_vec(),
            [
                29739, 39194, 29739, 39194, 44303, -35373, 44303, -39984, 45044, -31750, 26151,
                -23602, 15719
            ]
        );
    }

    #[test]
    fn update_is_squared_transition() {
        for (m, t) in [(0.95, 0.3), (0.7, 2.0), (0.5, 1.0)] {
            for n in [3, 4, 8] {
                let c = Coefficients::new(&Pole::new(m, t), n).unwrap().update;
                let det = c[0] * c[3] - c[1] * c[2];
                let trace = c[0] + c[3];
                assert!(isclose(det, m.powi(4 * n as i32), 1e-9, 1e-15));
                assert!(isclose(
                    trace,
                    2.0 * m.powi(2 * n as i32) * (2.0 * n as f64 * t).cos(),
                    1e-9,
                    1e-12
                ));
            }
        }
    }

    #[test]
    fn continuous() {
        let c0 = Coefficients::new(&Pole::new(0.9, 0.7), 8).unwrap();
        let c1 = Coefficients::new(&Pole::new(0.9 + 1e-9, 0.7 - 1e-9), 8).unwrap();
        for (a, b) in c0.iter().zip(c1.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} {b}");
        }
    }

    #[test]
    fn out_of_range() {
        // U_n(1) = n + 1 grows past the Q4.14 integer range, first at E_GG
        let c = Coefficients::new(&Pole::new(0.999, 0.0), 8).unwrap();
        assert_eq!(
            c.quantize(Format::Q4_14),
            Err(Error::CoefficientRange {
                index: 16,
                value: c.e_gg()
            })
        );
        assert!(c.quantize(Format::new(6, 12)).is_ok());
        assert_eq!(
            c.quantize(Format::new(40, 40)),
            Err(Error::Width { bits: 80 })
        );
        let q = Coefficients::new(&Pole::new(0.95, 0.3), 8)
            .unwrap()
            .quantize(Format::Q4_14)
            .unwrap();
        assert_eq!(q.check_word(1 << 18), Ok(()));
        assert_eq!(
            q.check_word(1 << 15),
            Err(Error::CoefficientRange {
                index: 1,
                value: 39194.0
            })
        );
        assert_eq!(
            Coefficients::new(&Pole::new(1.0, 0.3), 8),
            Err(Error::Magnitude { magnitude: 1.0 })
        );
    }
}

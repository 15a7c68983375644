//! Floating point reference
use alloc::vec::Vec;

use crate::Pole;

/// Direct form all-pole recursion of a pole pair
///
/// `y[n] = x[n] + 2 r cos(angle) y[n-1] - r**2 y[n-2]`, at rest before `x[0]`.
///
/// The look-ahead lane 0 and 1 outputs of cluster `i` approximate `y[N*i + 1]`
/// and `y[N*i + 2]`.
///
/// ```
/// # use cla_biquad::*;
/// let y = reference::all_pole(&Pole::new(0.5, 0.0), &[1.0, 0.0, 0.0]);
/// assert_eq!(y, [1.0, 1.0, 0.75]);
/// ```
pub fn all_pole(pole: &Pole, x: &[f64]) -> Vec<f64> {
    let [_, a1, a2] = pole.denominator();
    let mut y1 = 0.0;
    let mut y2 = 0.0;
    x.iter()
        .map(|x| {
            let y0 = x - a1 * y1 - a2 * y2;
            (y2, y1) = (y1, y0);
            y0
        })
        .collect()
}

/// Impulse response of the all-pole recursion
pub fn impulse(pole: &Pole, len: usize) -> Vec<f64> {
    let mut x = alloc::vec![0.0; len];
    if let Some(x0) = x.first_mut() {
        *x0 = 1.0;
    }
    all_pole(pole, &x)
}

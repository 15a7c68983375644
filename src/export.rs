use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{Coefficients, Error, Format};

/// Quantize a transfer function `[[b0, b1, b2], [a0, a1, a2]]`
///
/// Floor truncation, as in [`Format::quantize()`].
///
/// ```
/// # use cla_biquad::*;
/// let ba = quantize_ba(&[[0.5, -0.25, 0.0], [1.0, 0.0, 0.0]], Format::Q4_14).unwrap();
/// assert_eq!(ba, [[8192, -4096, 0], [16384, 0, 0]]);
/// ```
pub fn quantize_ba(ba: &[[f64; 3]; 2], format: Format) -> Result<[[i64; 3]; 2], Error> {
    let mut q = [[0; 3]; 2];
    for (q, ba) in q.iter_mut().flatten().zip(ba.iter().flatten()) {
        *q = format.quantize(*ba)?;
    }
    Ok(q)
}

/// Coefficient interchange file
///
/// The hardware configuration loader consumes the quantized look-ahead coefficients
/// together with the originating transfer function in this order:
///
/// `b1, b0, C2, C3, C1, C0, a2, a1, D_FF, f_fir (reversed), E_GG, g_fir (reversed),
/// D_FG, E_GF, a0, a1, a2, b0, b1, b2`
///
/// [`Display`](core::fmt::Display) renders one decimal integer per line.
///
/// ```
/// # use cla_biquad::*;
/// let notch = Notch::new(0.125, 5.0);
/// let c = Coefficients::new(&notch.pole().unwrap(), 8).unwrap();
/// let file = CoefficientFile::new(
///     &c.quantize(Format::Q4_14).unwrap(),
///     &quantize_ba(&notch.ba(), Format::Q4_14).unwrap(),
/// );
/// assert_eq!(file.values().len(), 2 * 8 + 15);
/// assert_eq!(file.to_string().lines().count(), 2 * 8 + 15);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoefficientFile {
    values: Vec<i64>,
}

impl CoefficientFile {
    /// Arrange coefficients and transfer function
    pub fn new(coefficients: &Coefficients<i64>, ba: &[[i64; 3]; 2]) -> Self {
        let c = coefficients;
        let [[b0, b1, b2], [a0, a1, a2]] = *ba;
        let [c0, c1, c2, c3] = c.update;
        let mut values = Vec::with_capacity(c.f_fir.len() + c.g_fir.len() + 17);
        values.extend([b1, b0, c2, c3, c1, c0, a2, a1, c.d_ff()]);
        values.extend(c.f_fir.iter().rev());
        values.push(c.e_gg());
        values.extend(c.g_fir.iter().rev());
        values.extend([c.d_fg(), c.e_gf(), a0, a1, a2, b0, b1, b2]);
        Self { values }
    }

    /// The values in interchange order
    pub fn values(&self) -> &[i64] {
        &self.values
    }
}

impl fmt::Display for CoefficientFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in self.values.iter() {
            writeln!(f, "{v}")?;
        }
        Ok(())
    }
}

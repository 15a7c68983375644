use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::{Coefficients, Error};

/// FIR lane implementation
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Fir {
    /// Convolution of the coefficient taps with the pre-history extended stream
    #[default]
    Convolve,
    /// Tap-by-tap hardware multiplier model
    ///
    /// Not available: selecting it bounds checks the coefficients against
    /// the `±2**18` multiplier word and then fails with [`Error::UnsupportedMode`].
    Manual,
}

/// Treatment of the non-recursive lanes `2..N`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lanes {
    /// Lanes `2..N` are zero
    #[default]
    Decimate,
    /// Companion feedback on the raw input
    ///
    /// `lane[j] = x[j] - ((a1 * lane[j - 1]) >> s + (a2 * lane[j - 2]) >> s)` with
    /// `s = 14 + added_precision`. `a1` and `a2` are unrelated to the look-ahead
    /// recursion.
    Companion {
        /// Lag one feedback coefficient
        a1: i64,
        /// Lag two feedback coefficient
        a2: i64,
    },
}

/// Initial condition block: three rows of `N` integers
///
/// * Row 0: the `N` input samples preceding the stream.
/// * Row 1: recursive state `[y0, y1]` seeding cluster 0.
/// * Row 2: recursive state `[y0, y1]` seeding cluster 1.
///
/// The state is in fed-back units, i.e. the full precision accumulator shifted
/// right by `14 + added_precision`: a lane value `v` corresponds to
/// `v << (13 + added_precision)`. Only the first two entries of rows 1 and 2 are used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialConditions {
    /// The three rows
    pub rows: [Vec<i64>; 3],
}

impl InitialConditions {
    /// Filter at rest
    pub fn new(samples_per_clock: usize) -> Self {
        Self {
            rows: core::array::from_fn(|_| alloc::vec![0; samples_per_clock]),
        }
    }

    /// Pre-history and the recursive state of the two clusters preceding the stream
    ///
    /// `state[0]` seeds cluster 0, `state[1]` seeds cluster 1.
    /// The samples per clock are the length of `history`.
    pub fn chain(history: &[i64], state: &[[i64; 2]; 2]) -> Self {
        let mut ics = Self::new(history.len());
        ics.rows[0].copy_from_slice(history);
        for (row, s) in ics.rows[1..].iter_mut().zip(state) {
            for (r, s) in row.iter_mut().zip(s) {
                *r = *s;
            }
        }
        ics
    }

    /// Input samples preceding the stream
    pub fn history(&self) -> &[i64] {
        &self.rows[0]
    }

    /// Recursive state seeding cluster `index` (0 or 1)
    pub fn state(&self, index: usize) -> [i64; 2] {
        let row = &self.rows[1 + index];
        [
            row.first().copied().unwrap_or_default(),
            row.get(1).copied().unwrap_or_default(),
        ]
    }

    fn check(&self, samples_per_clock: usize) -> Result<(), Error> {
        match self.rows.iter().find(|r| r.len() != samples_per_clock) {
            Some(r) => Err(Error::Length {
                len: r.len(),
                samples_per_clock,
            }),
            None => Ok(()),
        }
    }
}

/// Internal values of one cluster
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cluster {
    /// Cluster index
    pub index: usize,
    /// Cross-linked lane 0 pre-filter output `F`
    pub f: i64,
    /// Cross-linked lane 1 pre-filter output `G`
    pub g: i64,
    /// Full precision accumulators `[y0, y1]`
    pub accumulator: [i64; 2],
    /// Truncated state fed back two clusters later
    pub state: [i64; 2],
    /// Lane 0 and lane 1 outputs
    pub output: [i64; 2],
}

/// Per-cluster observation sink
///
/// Called once per cluster, in order, after the cluster's outputs are computed.
pub trait Trace {
    /// Observe a cluster
    fn cluster(&mut self, cluster: &Cluster);
}

impl<F: FnMut(&Cluster)> Trace for F {
    fn cluster(&mut self, cluster: &Cluster) {
        self(cluster)
    }
}

/// Trace every cluster at `log::Level::Trace`
#[derive(Copy, Clone, Debug, Default)]
pub struct LogTrace;

impl Trace for LogTrace {
    fn cluster(&mut self, cluster: &Cluster) {
        log::trace!(
            "cluster {}: F={} G={} y={:?} s={:?} out={:?}",
            cluster.index,
            cluster.f,
            cluster.g,
            cluster.accumulator,
            cluster.state,
            cluster.output
        );
    }
}

/// Wrapping dot product of the taps with the samples ending at `at`, most recent first
fn tap(taps: &[i64], x: &[i64], at: usize) -> i64 {
    taps.iter()
        .zip(x[..=at].iter().rev())
        .fold(0, |a, (t, x)| a.wrapping_add(t.wrapping_mul(*x)))
}

/// Clustered look-ahead biquad simulation
///
/// Bit-exact model of an `N` samples per clock pipeline implementing the all-pole
/// recursion of a [`crate::Pole`]. Coefficients are integers in `Q4.(14 + added_precision)`.
/// Per cluster `i` of the input stream `x`, extended by the pre-history row of the
/// [`InitialConditions`]:
///
/// 1. Lane FIR: `f` is `f_fir` applied at lane 0, `g` is `g_fir` applied at lane 1.
/// 2. Cross-links: `F = f << s + D_FF f' + D_FG g'` and `G = g << s + E_GG g' + E_GF f'`
///    where `'` denotes the previous cluster and `s = 14 + added_precision`.
/// 3. Recursion on the state `p` of cluster `i - 2`:
///    `y0 = C0 p0 + C1 p1 + F >> 1`, `y1 = C2 p0 + C3 p1 + G >> 1`.
///    Lanes 0 and 1 are `y >> (27 + 2 added_precision)`, the fed-back state is `y >> s`.
/// 4. Lanes `2..N` according to [`Lanes`].
///
/// All arithmetic is wrapping `i64` with flooring shifts.
///
/// ```
/// # use cla_biquad::*;
/// let c = Coefficients::new(&Pole::new(0.95, 0.3), 8).unwrap();
/// let lookahead = Lookahead::new(c.quantize(Format::Q4_14).unwrap());
/// let mut x = [0; 64];
/// x[0] = 4096;
/// let y = lookahead.run(None, &x).unwrap();
/// assert_eq!(&y[..8], &[7434, 9798, 0, 0, 0, 0, 0, 0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lookahead {
    coefficients: Coefficients<i64>,
    added_precision: u32,
    lanes: Lanes,
    fir: Fir,
}

impl Lookahead {
    /// Create a new engine, decimating, without added precision
    pub fn new(coefficients: Coefficients<i64>) -> Self {
        Self {
            coefficients,
            added_precision: 0,
            lanes: Lanes::default(),
            fir: Fir::default(),
        }
    }

    /// Guard bits carried through the lane filters
    ///
    /// The coefficients must be quantized with the same number of additional fractional bits.
    pub fn with_added_precision(mut self, added_precision: u32) -> Self {
        self.added_precision = added_precision;
        self
    }

    /// Non-recursive lane treatment
    pub fn with_lanes(mut self, lanes: Lanes) -> Self {
        self.lanes = lanes;
        self
    }

    /// FIR lane implementation
    pub fn with_fir(mut self, fir: Fir) -> Self {
        self.fir = fir;
        self
    }

    /// Coefficients
    pub fn coefficients(&self) -> &Coefficients<i64> {
        &self.coefficients
    }

    /// Added precision
    pub fn added_precision(&self) -> u32 {
        self.added_precision
    }

    /// Samples per clock
    pub fn samples_per_clock(&self) -> usize {
        self.coefficients.samples_per_clock()
    }

    /// Fed-back state shift: `14 + added_precision`, saturating
    pub fn shift(&self) -> u32 {
        self.added_precision.saturating_add(14)
    }

    /// Output shift: `27 + 2*added_precision`, saturating
    pub fn output_shift(&self) -> u32 {
        self.added_precision.saturating_mul(2).saturating_add(27)
    }

    fn check(&self) -> Result<usize, Error> {
        let n = self.samples_per_clock();
        if n < 3 {
            return Err(Error::Parallelism {
                samples_per_clock: n,
            });
        }
        if self.coefficients.f_fir.len() != n - 2 {
            return Err(Error::Length {
                len: self.coefficients.f_fir.len(),
                samples_per_clock: n,
            });
        }
        if self.output_shift() >= 64 {
            return Err(Error::Width {
                bits: self.output_shift(),
            });
        }
        if self.fir == Fir::Manual {
            self.coefficients.check_word(1 << 18)?;
            return Err(Error::UnsupportedMode);
        }
        Ok(n)
    }

    /// Filter a stream
    ///
    /// `ics` defaults to the filter at rest.
    ///
    /// # Errors
    /// * [`Error::Length`] if the stream is not a whole number of clusters or the
    ///   initial conditions are not `3 x N`.
    /// * [`Error::CoefficientRange`] or [`Error::UnsupportedMode`] for [`Fir::Manual`].
    pub fn run(&self, ics: Option<&InitialConditions>, x: &[i64]) -> Result<Vec<i64>, Error> {
        self.run_traced(ics, x, &mut |_: &Cluster| {})
    }

    /// Filter a stream and observe each cluster
    ///
    /// ```
    /// # use cla_biquad::*;
    /// let c = Coefficients::new(&Pole::new(0.9, 1.0), 4).unwrap();
    /// let lookahead = Lookahead::new(c.quantize(Format::Q4_14).unwrap());
    /// let mut clusters = 0;
    /// lookahead
    ///     .run_traced(None, &[1, 2, 3, 4, 5, 6, 7, 8], &mut |_: &Cluster| clusters += 1)
    ///     .unwrap();
    /// assert_eq!(clusters, 2);
    /// ```
    pub fn run_traced<T: Trace + ?Sized>(
        &self,
        ics: Option<&InitialConditions>,
        x: &[i64],
        trace: &mut T,
    ) -> Result<Vec<i64>, Error> {
        self.process(ics, x, trace).map(|(y, _)| y)
    }

    /// Filter a stream segment and return the initial conditions for the next one
    ///
    /// The three row block only carries one cluster of pre-history. Chaining is
    /// exact if the second to last input cluster of the segment would not reach
    /// the lane filters of the next segment, e.g. if it is zero.
    pub fn run_chained(
        &self,
        ics: Option<&InitialConditions>,
        x: &[i64],
    ) -> Result<(Vec<i64>, InitialConditions), Error> {
        self.process(ics, x, &mut |_: &Cluster| {})
    }

    fn process<T: Trace + ?Sized>(
        &self,
        ics: Option<&InitialConditions>,
        x: &[i64],
        trace: &mut T,
    ) -> Result<(Vec<i64>, InitialConditions), Error> {
        let n = self.check()?;
        if x.len() % n != 0 {
            return Err(Error::Length {
                len: x.len(),
                samples_per_clock: n,
            });
        }
        let rest;
        let ics = match ics {
            Some(ics) => {
                ics.check(n)?;
                ics
            }
            None => {
                rest = InitialConditions::new(n);
                &rest
            }
        };

        let c = &self.coefficients;
        let shift = self.shift();
        let output_shift = self.output_shift();
        let one = 1i64 << shift;

        let mut ext = Vec::with_capacity(n + x.len());
        ext.extend_from_slice(ics.history());
        ext.extend_from_slice(x);

        // State of the two clusters preceding the stream, then one per cluster
        let mut state = Vec::with_capacity(2 + x.len() / n);
        state.push(ics.state(0));
        state.push(ics.state(1));

        let mut y = x.to_vec();
        let mut f0 = tap(&c.f_fir, &ext, 0);
        let mut g0 = tap(&c.g_fir, &ext, 1);
        for (index, lanes) in y.chunks_exact_mut(n).enumerate() {
            let at = (index + 1) * n;
            let f1 = tap(&c.f_fir, &ext, at);
            let g1 = tap(&c.g_fir, &ext, at + 1);
            let f = one
                .wrapping_mul(f1)
                .wrapping_add(c.d_ff().wrapping_mul(f0))
                .wrapping_add(c.d_fg().wrapping_mul(g0));
            let g = one
                .wrapping_mul(g1)
                .wrapping_add(c.e_gg().wrapping_mul(g0))
                .wrapping_add(c.e_gf().wrapping_mul(f0));
            (f0, g0) = (f1, g1);

            let [p0, p1] = state[index];
            let [c0, c1, c2, c3] = c.update;
            let accumulator = [
                c0.wrapping_mul(p0)
                    .wrapping_add(c1.wrapping_mul(p1))
                    .wrapping_add(f >> 1),
                c2.wrapping_mul(p0)
                    .wrapping_add(c3.wrapping_mul(p1))
                    .wrapping_add(g >> 1),
            ];
            let s = accumulator.map(|a| a >> shift);
            state.push(s);
            let output = accumulator.map(|a| a >> output_shift);
            lanes[..2].copy_from_slice(&output);

            match self.lanes {
                Lanes::Decimate => lanes[2..].fill(0),
                Lanes::Companion { a1, a2 } => {
                    for j in 2..n {
                        let fb = (a1.wrapping_mul(lanes[j - 1]) >> shift)
                            .wrapping_add(a2.wrapping_mul(lanes[j - 2]) >> shift);
                        lanes[j] = lanes[j].wrapping_sub(fb);
                    }
                }
            }

            trace.cluster(&Cluster {
                index,
                f,
                g,
                accumulator,
                state: s,
                output,
            });
        }

        let k = state.len();
        let next = InitialConditions::chain(&ext[ext.len() - n..], &[state[k - 2], state[k - 1]]);
        Ok((y, next))
    }
}

//! Bounded scalar minimization by golden section search with successive
//! parabolic interpolation.
//!
//! A parabolic step through the three best points seen so far is taken when it
//! lands strictly inside the bracket and moves less than half the step before
//! last. Otherwise a golden section step into the larger part of the bracket is
//! taken. The search stops when the bracket is small relative to the current
//! best point or the evaluation or iteration budget is spent.
use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `(3 - sqrt(5)) / 2`
const GOLDEN_SECTION: f64 = 0.3819660112501051;

/// Tolerances and budgets for [`BoundedMinimizer`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MinimizerConfig {
    pub max_evaluations: usize,
    pub max_iter: usize,
    /// Scales with the magnitude of the current best point
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
}

impl MinimizerConfig {
    pub fn max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn relative_tolerance(mut self, relative_tolerance: f64) -> Self {
        self.relative_tolerance = relative_tolerance;
        self
    }

    pub fn absolute_tolerance(mut self, absolute_tolerance: f64) -> Self {
        self.absolute_tolerance = absolute_tolerance;
        self
    }

    #[inline]
    fn tolerance_at(&self, x: f64) -> f64 {
        self.relative_tolerance * x.abs() + self.absolute_tolerance
    }
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 500,
            max_iter: 500,
            relative_tolerance: f64::EPSILON.sqrt(),
            absolute_tolerance: 1e-4 / 3.0,
        }
    }
}

/// Describe the outcome of [`BoundedMinimizer::minimize`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizerResult {
    /// The best point found, NaN if the bounds were inverted
    pub x: f64,
    /// The objective at `x`
    pub fx: f64,
    pub evaluations: usize,
    pub iterations: usize,
    /// Whether the bracket shrank below tolerance before the budget ran out
    pub converged: bool,
}

impl MinimizerResult {
    fn undefined() -> Self {
        Self {
            x: f64::NAN,
            fx: f64::NAN,
            evaluations: 0,
            iterations: 0,
            converged: false,
        }
    }
}

#[inline]
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// `sign(x)`, but treating zero as positive
#[inline]
fn direction(x: f64) -> f64 {
    sign(x) + if x == 0.0 { 1.0 } else { 0.0 }
}

/// A Brent-style minimizer for a function of one variable on a closed interval
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedMinimizer {
    pub config: MinimizerConfig,
}

impl BoundedMinimizer {
    pub fn new(config: MinimizerConfig) -> Self {
        Self { config }
    }

    /// Find a local minimum of `f` on `[lo, hi]`.
    ///
    /// When `lo > hi` nothing is evaluated and the returned point is NaN.
    /// Exhausting the budget returns the best point found so far.
    pub fn minimize<F: FnMut(f64) -> f64>(&self, mut f: F, lo: f64, hi: f64) -> MinimizerResult {
        if lo > hi {
            return MinimizerResult::undefined();
        }
        let config = &self.config;

        let mut a = lo;
        let mut b = hi;
        let mut v = a + GOLDEN_SECTION * (b - a);
        let mut w = v;
        let mut x = v;
        let mut d: f64 = 0.0;
        let mut e: f64 = 0.0;
        let mut fx = f(x);
        let mut fv = fx;
        let mut fw = fx;
        let mut evaluations = 1;
        let mut iterations = 0;

        let mut xm = 0.5 * (a + b);
        let mut tol1 = config.tolerance_at(x);
        let mut tol2 = 2.0 * tol1;

        while (x - xm).abs() > tol2 - 0.5 * (b - a) {
            let mut golden = true;
            if e.abs() > tol1 {
                golden = false;
                let mut r = (x - w) * (fx - fv);
                let mut q = (x - v) * (fx - fw);
                let mut p = (x - v) * q - (x - w) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                }
                q = q.abs();
                r = e;
                e = d;

                if p.abs() < (0.5 * q * r).abs() && p > q * (a - x) && p < q * (b - x) {
                    d = p / q;
                    let u = x + d;
                    if (u - a) < tol2 || (b - u) < tol2 {
                        d = tol1 * direction(xm - x);
                    }
                    trace!("Parabolic step to {u}");
                } else {
                    golden = true;
                }
            }
            if golden {
                e = if x >= xm { a - x } else { b - x };
                d = GOLDEN_SECTION * e;
            }

            let u = x + direction(d) * d.abs().max(tol1);
            let fu = f(u);
            evaluations += 1;
            iterations += 1;

            if fu <= fx {
                if u >= x {
                    a = x;
                } else {
                    b = x;
                }
                v = w;
                fv = fw;
                w = x;
                fw = fx;
                x = u;
                fx = fu;
            } else {
                if u < x {
                    a = u;
                } else {
                    b = u;
                }
                if fu <= fw || w == x {
                    v = w;
                    fv = fw;
                    w = u;
                    fw = fu;
                } else if fu <= fv || v == x || v == w {
                    v = u;
                    fv = fu;
                }
            }

            xm = 0.5 * (a + b);
            tol1 = config.tolerance_at(x);
            tol2 = 2.0 * tol1;

            if evaluations >= config.max_evaluations || iterations >= config.max_iter {
                trace!("Minimization budget exhausted at {x} after {iterations} iterations");
                return MinimizerResult {
                    x,
                    fx,
                    evaluations,
                    iterations,
                    converged: false,
                };
            }
        }

        MinimizerResult {
            x,
            fx,
            evaluations,
            iterations,
            converged: true,
        }
    }
}

/// Minimize `f` on `[lo, hi]` with the default [`MinimizerConfig`], returning
/// only the minimizing point
pub fn minimize_bounded<F: FnMut(f64) -> f64>(f: F, lo: f64, hi: f64) -> f64 {
    BoundedMinimizer::default().minimize(f, lo, hi).x
}

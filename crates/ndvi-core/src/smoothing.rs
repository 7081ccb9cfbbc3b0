// crates/ndvi-core/src/smoothing.rs

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

const PSEUDO_INVERSE_EPS: f64 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum SmoothingError {
    #[error("polyorder {polyorder} must be less than window_length {window_length}")]
    InvalidWindow {
        window_length: usize,
        polyorder: usize,
    },
    #[error("window_length {window_length} exceeds series length {len}")]
    WindowTooLong { window_length: usize, len: usize },
    #[error("least-squares fit failed: {0}")]
    Fit(&'static str),
}

/// Savitzky-Golay filter: each output is a least-squares polynomial of degree
/// `polyorder` fitted to `window_length` neighbouring samples and evaluated at the
/// window centre.
///
/// The first and last `window_length / 2` outputs come from a single polynomial fitted
/// to the first (last) `window_length` samples. For an even window the interior window
/// of output `i` starts at `i - (window_length - 1) / 2` and is evaluated half a sample
/// right of its middle. Any missing sample makes the outputs it feeds missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavitzkyGolay {
    window_length: usize,
    polyorder: usize,
}

impl SavitzkyGolay {
    pub fn new(window_length: usize, polyorder: usize) -> Result<Self, SmoothingError> {
        if window_length == 0 || polyorder >= window_length {
            return Err(SmoothingError::InvalidWindow {
                window_length,
                polyorder,
            });
        }
        Ok(Self {
            window_length,
            polyorder,
        })
    }

    /// Weights that evaluate the window's least-squares fit at `position`, measured in
    /// samples from the start of the window.
    pub fn coefficients(&self, position: f64) -> Result<Vec<f64>, SmoothingError> {
        let window = self.window_length;
        let terms = self.polyorder + 1;
        let centre = (window - 1) as f64 / 2.0;
        let scale = centre.max(1.0);

        let design = DMatrix::<f64>::from_fn(window, terms, |row, power| {
            ((row as f64 - centre) / scale).powi(power as i32)
        });
        let pseudo_inverse = design
            .pseudo_inverse(PSEUDO_INVERSE_EPS)
            .map_err(SmoothingError::Fit)?;

        let x = (position - centre) / scale;
        let basis = DVector::<f64>::from_fn(terms, |power, _| x.powi(power as i32));
        let weights = pseudo_inverse.transpose() * basis;
        Ok(weights.iter().copied().collect())
    }

    pub fn apply(&self, values: &[Option<f64>]) -> Result<Vec<Option<f64>>, SmoothingError> {
        let len = values.len();
        let window = self.window_length;
        if window > len {
            return Err(SmoothingError::WindowTooLong {
                window_length: window,
                len,
            });
        }

        let half = window / 2;
        let lead = (window - 1) / 2;
        let mut smoothed = vec![None; len];

        let centre_weights = self.coefficients((window - 1) as f64 / 2.0)?;
        for (idx, slot) in smoothed.iter_mut().enumerate().take(len - half).skip(half) {
            let start = idx - lead;
            *slot = weighted_sum(&centre_weights, &values[start..start + window]);
        }

        let head = &values[..window];
        let tail = &values[len - window..];
        for offset in 0..half {
            let weights = self.coefficients(offset as f64)?;
            smoothed[offset] = weighted_sum(&weights, head);

            let tail_position = window - half + offset;
            let weights = self.coefficients(tail_position as f64)?;
            smoothed[len - half + offset] = weighted_sum(&weights, tail);
        }

        Ok(smoothed)
    }
}

fn weighted_sum(weights: &[f64], window: &[Option<f64>]) -> Option<f64> {
    weights
        .iter()
        .zip(window)
        .try_fold(0.0, |acc, (weight, value)| value.map(|v| acc + weight * v))
}

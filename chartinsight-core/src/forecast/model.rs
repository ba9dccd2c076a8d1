//! ARIMA(1,1,0) with drift on log closes.
//!
//! With `y_t = ln(close_t)` and `d_t = y_t - y_{t-1}`:
//!
//! ```text
//! d_t = c + phi * d_{t-1} + e_t,   e_t ~ N(0, sigma^2)
//! ```
//!
//! `c` and `phi` come from ridge-regularised least squares on centred data,
//! `phi` is clamped to `[-max_ar, max_ar]`, and `sigma` is the residual
//! standard error. The h-step log forecast is the recursive conditional mean;
//! its variance is `sigma^2 * sum_{j<h} psi_j^2` with `psi_j = sum_{i<=j} phi^i`
//! (the integrated process). The price band is `exp(mean_log +/- z * sd)`,
//! which keeps `lower <= mean <= upper` by monotonicity of `exp`.

use statrs::distribution::{ContinuousCDF, Normal};

use super::{ForecastConfig, ForecastError, Forecaster, Projection};

/// Fitted parameters, exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArFit {
    pub drift: f64,
    pub phi: f64,
    pub sigma: f64,
    pub last_log: f64,
    pub last_diff: f64,
}

impl ArFit {
    /// Fit on raw closes.
    pub fn fit(closes: &[f64], config: &ForecastConfig) -> Result<Self, ForecastError> {
        let required = config.min_points.max(3);
        if closes.len() < required {
            return Err(ForecastError::ModelFit(format!(
                "need at least {required} closes, got {}",
                closes.len()
            )));
        }
        if closes.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(ForecastError::ModelFit(
                "closes must be finite and positive".to_string(),
            ));
        }

        let logs: Vec<f64> = closes.iter().map(|c| c.ln()).collect();
        let log_mean = logs.iter().sum::<f64>() / logs.len() as f64;
        let log_var = logs.iter().map(|y| (y - log_mean).powi(2)).sum::<f64>();
        if log_var <= f64::EPSILON * f64::EPSILON {
            return Err(ForecastError::ModelFit("zero variance series".to_string()));
        }

        let diffs: Vec<f64> = logs.windows(2).map(|w| w[1] - w[0]).collect();
        let x = &diffs[..diffs.len() - 1];
        let y = &diffs[1..];
        let m = y.len() as f64;

        let x_mean = x.iter().sum::<f64>() / m;
        let y_mean = y.iter().sum::<f64>() / m;
        let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
        let sxy: f64 = x
            .iter()
            .zip(y)
            .map(|(a, b)| (a - x_mean) * (b - y_mean))
            .sum();

        let denom = sxx + config.ridge * m;
        let phi = if denom > 0.0 { sxy / denom } else { 0.0 };
        let phi = phi.clamp(-config.max_ar, config.max_ar);
        let drift = y_mean - phi * x_mean;

        let sse: f64 = x
            .iter()
            .zip(y)
            .map(|(a, b)| (b - drift - phi * a).powi(2))
            .sum();
        let dof = (m - 2.0).max(1.0);
        let sigma = (sse / dof).sqrt();

        if !(phi.is_finite() && drift.is_finite() && sigma.is_finite()) {
            return Err(ForecastError::ModelFit(
                "non-finite model parameters".to_string(),
            ));
        }

        Ok(Self {
            drift,
            phi,
            sigma,
            last_log: logs[logs.len() - 1],
            last_diff: diffs[diffs.len() - 1],
        })
    }

    /// Project `horizon` steps with a `z`-scaled band.
    pub fn project(&self, horizon: usize, z: f64) -> Projection {
        let mut mean = Vec::with_capacity(horizon);
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);

        let mut level = self.last_log;
        let mut diff = self.last_diff;
        let mut phi_pow = 1.0;
        let mut psi = 0.0;
        let mut psi_sq_sum = 0.0;

        for _ in 0..horizon {
            diff = self.drift + self.phi * diff;
            level += diff;

            psi += phi_pow;
            phi_pow *= self.phi;
            psi_sq_sum += psi * psi;
            let sd = self.sigma * psi_sq_sum.sqrt();

            mean.push(level.exp());
            lower.push((level - z * sd).exp());
            upper.push((level + z * sd).exp());
        }

        Projection { mean, lower, upper }
    }
}

/// Two-sided standard-normal quantile for `confidence` in (0, 1).
pub fn z_score(confidence: f64) -> Result<f64, ForecastError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(ForecastError::ModelFit(format!(
            "confidence {confidence} outside (0, 1)"
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::ModelFit(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + confidence / 2.0))
}

/// Default [`Forecaster`].
#[derive(Debug, Clone, Default)]
pub struct ArimaForecaster {
    config: ForecastConfig,
}

impl ArimaForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }
}

impl Forecaster for ArimaForecaster {
    fn name(&self) -> &str {
        "arima(1,1,0)+drift"
    }

    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Projection, ForecastError> {
        let z = z_score(self.config.confidence)?;
        let fit = ArFit::fit(closes, &self.config)?;
        Ok(fit.project(horizon, z))
    }
}

//! Linear trend of glacier area over the tracked years.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaSample {
    pub year: i32,
    pub area_km2: f64,
}

impl AreaSample {
    pub const fn new(year: i32, area_km2: f64) -> Self {
        Self { year, area_km2 }
    }
}

/// Ordinary least squares line `area = slope * year + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit over `samples`. `None` with fewer than two samples or when every sample falls
    /// on the same year.
    pub fn fit(samples: &[AreaSample]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }

        // centre the years; raw 4-digit years squared lose precision in the sums
        let n = samples.len() as f64;
        let mean_x = samples.iter().map(|s| f64::from(s.year)).sum::<f64>() / n;
        let mean_y = samples.iter().map(|s| s.area_km2).sum::<f64>() / n;

        let (sxy, sxx) = samples.iter().fold((0.0, 0.0), |(sxy, sxx), s| {
            let dx = f64::from(s.year) - mean_x;
            (sxy + dx * (s.area_km2 - mean_y), sxx + dx * dx)
        });
        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn evaluate(&self, year: i32) -> f64 {
        self.slope * f64::from(year) + self.intercept
    }

    /// Fitted value at each sample's year, in sample order.
    pub fn fitted(&self, samples: &[AreaSample]) -> Vec<(i32, f64)> {
        samples
            .iter()
            .map(|s| (s.year, self.evaluate(s.year)))
            .collect()
    }
}

/// Percentage change of the fitted line between the first and last year present, rounded
/// to two decimals.
///
/// Returns `0.0` when no line can be fitted or when the fitted start value is zero.
pub fn percent_change(samples: &[AreaSample]) -> f64 {
    let Some(fit) = LinearFit::fit(samples) else {
        return 0.0;
    };
    let (Some(first), Some(last)) = (
        samples.iter().map(|s| s.year).min(),
        samples.iter().map(|s| s.year).max(),
    ) else {
        return 0.0;
    };

    let start = fit.evaluate(first);
    let end = fit.evaluate(last);
    if start.abs() <= f64::EPSILON {
        return 0.0;
    }
    round2((end - start) / start * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

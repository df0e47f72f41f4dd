//! The output analysis module provides the statistical summaries shared by
//! every monitor.  Observations are weighted - plain tallies carry a weight
//! of one, weighted tallies carry their explicit weight, and time-weighted
//! observations carry the simulated duration the value was held.  The
//! `Statistics` trait derives means, deviations, percentiles, and
//! histograms from any source of weighted observations, so plain, weighted,
//! time-weighted, and merged monitors all report through the same surface.

use std::collections::BTreeMap;

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::monitor::Value;
use crate::utils::errors::SimulationError;

fn sum<T: Float>(points: &[T]) -> T
where
    f64: Into<T>,
{
    points.iter().fold(0.0.into(), |sum, point| sum + *point)
}

/// This function calculates the weighted mean from a set of
/// `(value, weight)` points.  There is no mean when the total weight is zero.
fn weighted_mean<T: Float>(points: &[(T, T)]) -> Option<T>
where
    f64: Into<T>,
{
    let weights: Vec<T> = points.iter().map(|(_, weight)| *weight).collect();
    let total = sum(&weights);
    if total <= 0.0.into() {
        return None;
    }
    Some(
        points
            .iter()
            .fold(0.0.into(), |acc: T, (value, weight)| acc + *value * *weight)
            / total,
    )
}

/// This function calculates the weighted (population) variance, given a set
/// of `(value, weight)` points and their weighted mean.
fn weighted_variance<T: Float>(points: &[(T, T)], mean: &T) -> Option<T>
where
    f64: Into<T>,
{
    let weights: Vec<T> = points.iter().map(|(_, weight)| *weight).collect();
    let total = sum(&weights);
    if total <= 0.0.into() {
        return None;
    }
    Some(
        points.iter().fold(0.0.into(), |acc: T, (value, weight)| {
            acc + (*value - *mean).powi(2) * *weight
        }) / total,
    )
}

/// This function finds the smallest value where the cumulative weight
/// reaches `q` percent of the total weight.
fn weighted_percentile(points: &[(f64, f64)], q: f64) -> Option<f64> {
    let mut sorted: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(_, weight)| *weight > 0.0)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: f64 = sorted.iter().map(|(_, weight)| weight).sum();
    let target = q.max(0.0).min(100.0) / 100.0 * total;
    let mut cumulative = 0.0;
    for (value, weight) in sorted.iter() {
        cumulative += weight;
        if cumulative >= target {
            return Some(*value);
        }
    }
    sorted.last().map(|(value, _)| *value)
}

/// A histogram of weighted numeric observations, over `bins` equal-width
/// bins starting at `lower`.  Bin `i` covers `[lower + i*width, lower +
/// (i+1)*width)`.  Non-numeric observations are reported separately, as
/// weighted categories, and NaN observations as undefined weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    lower: f64,
    width: f64,
    bins: Vec<f64>,
    underflow: f64,
    overflow: f64,
    undefined: f64,
    categories: BTreeMap<String, f64>,
}

impl Histogram {
    fn build(
        observations: &[(Value, f64)],
        bins: usize,
        lower: f64,
        width: f64,
        ex0: bool,
    ) -> Result<Self, SimulationError> {
        // Also rejects NaN
        if !(width > 0.0) || !width.is_finite() || !lower.is_finite() {
            return Err(SimulationError::InvalidHistogram { lower, width });
        }
        let mut histogram = Histogram {
            lower,
            width,
            bins: vec![0.0; bins],
            underflow: 0.0,
            overflow: 0.0,
            undefined: 0.0,
            categories: BTreeMap::new(),
        };
        observations.iter().for_each(|(value, weight)| match value {
            Value::Number(x) if ex0 && *x == 0.0 => {}
            Value::Number(x) if x.is_nan() => histogram.undefined += weight,
            Value::Number(x) if *x < lower => histogram.underflow += weight,
            Value::Number(x) => {
                let index = ((x - lower) / width).floor() as usize;
                match histogram.bins.get_mut(index) {
                    Some(bin) => *bin += weight,
                    None => histogram.overflow += weight,
                }
            }
            Value::Text(text) => *histogram.categories.entry(text.clone()).or_insert(0.0) += weight,
        });
        Ok(histogram)
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// The lower (inclusive) and upper (exclusive) bounds of a bin.
    pub fn bin_bounds(&self, index: usize) -> (f64, f64) {
        let lower = self.lower + self.width * index as f64;
        (lower, lower + self.width)
    }

    /// Weight of the numeric observations below the first bin.
    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    /// Weight of the numeric observations at or above the last bin.
    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Weight of the NaN observations, which fall in no bin.
    pub fn undefined(&self) -> f64 {
        self.undefined
    }

    pub fn categories(&self) -> &BTreeMap<String, f64> {
        &self.categories
    }

    /// Total numeric weight, including underflow, overflow, and undefined.
    pub fn numeric_total(&self) -> f64 {
        self.bins.iter().sum::<f64>() + self.underflow + self.overflow + self.undefined
    }
}

/// The `Statistics` trait provides the statistical surface of a monitor.
/// Implementors only supply their weighted observations; every statistic is
/// derived from those.  The `ex0` flag excludes zero-valued numeric
/// observations from the statistic, without removing them from the monitor.
pub trait Statistics {
    /// Every recorded observation, in chronological order, with its weight.
    fn observations(&self) -> Vec<(Value, f64)>;

    /// The numeric observations, as `(value, weight)` pairs.
    fn numeric_observations(&self, ex0: bool) -> Vec<(f64, f64)> {
        self.observations()
            .into_iter()
            .filter_map(|(value, weight)| match value {
                Value::Number(x) if ex0 && x == 0.0 => None,
                Value::Number(x) => Some((x, weight)),
                Value::Text(_) => None,
            })
            .collect()
    }

    /// The numeric observation values, without weights.
    fn numeric_values(&self, ex0: bool) -> Vec<f64> {
        self.numeric_observations(ex0)
            .into_iter()
            .map(|(value, _)| value)
            .collect()
    }

    /// The number of observations, numeric and categorical.
    fn number_of_entries(&self, ex0: bool) -> usize {
        self.observations()
            .iter()
            .filter(|(value, _)| !(ex0 && value.is_zero()))
            .count()
    }

    /// The total weight of the observations.  For time-weighted monitors,
    /// this is the total monitored duration.
    fn weight(&self, ex0: bool) -> f64 {
        self.observations()
            .iter()
            .filter(|(value, _)| !(ex0 && value.is_zero()))
            .map(|(_, weight)| weight)
            .sum()
    }

    fn mean(&self, ex0: bool) -> Option<f64> {
        weighted_mean(&self.numeric_observations(ex0))
    }

    /// The (population) standard deviation.
    fn std(&self, ex0: bool) -> Option<f64> {
        let points = self.numeric_observations(ex0);
        let mean = weighted_mean(&points)?;
        weighted_variance(&points, &mean).map(f64::sqrt)
    }

    fn minimum(&self, ex0: bool) -> Option<f64> {
        self.numeric_values(ex0)
            .into_iter()
            .fold(None, |min, value| match min {
                Some(min) => Some(f64::min(min, value)),
                None => Some(value),
            })
    }

    fn maximum(&self, ex0: bool) -> Option<f64> {
        self.numeric_values(ex0)
            .into_iter()
            .fold(None, |max, value| match max {
                Some(max) => Some(f64::max(max, value)),
                None => Some(value),
            })
    }

    /// The weighted percentile `q`, in the range 0 to 100.
    fn percentile(&self, q: f64, ex0: bool) -> Option<f64> {
        weighted_percentile(&self.numeric_observations(ex0), q)
    }

    fn median(&self, ex0: bool) -> Option<f64> {
        self.percentile(50.0, ex0)
    }

    /// Fails on a bin width that is not positive, or bounds that are not
    /// finite.
    fn histogram(
        &self,
        bins: usize,
        lower: f64,
        width: f64,
        ex0: bool,
    ) -> Result<Histogram, SimulationError> {
        Histogram::build(&self.observations(), bins, lower, width, ex0)
    }

    /// The total weight per non-numeric observation value.
    fn categories(&self) -> BTreeMap<String, f64> {
        self.observations()
            .into_iter()
            .filter_map(|(value, weight)| match value {
                Value::Text(text) => Some((text, weight)),
                Value::Number(_) => None,
            })
            .fold(BTreeMap::new(), |mut categories, (text, weight)| {
                *categories.entry(text).or_insert(0.0) += weight;
                categories
            })
    }
}

//! The monitor module provides the statistics accumulators of the kernel.
//! A `Monitor` collects tallied observations, optionally weighted.  A
//! `TimestampMonitor` follows a value over simulated time, so its
//! statistics are time-weighted.  Merged views present several monitors as
//! one statistic surface, without copying or mutating the sources.
//!
//! Tallied values are numeric where possible - numbers, booleans, and
//! strings that parse as numbers - and categorical otherwise.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::output_analysis::Statistics;

pub mod merged;
pub mod timestamp;

pub use self::merged::{MergedMonitor, MergedTimestampMonitor};
pub use self::timestamp::{TimeWeighted, TimestampMonitor};

/// A tallied or stored value - numeric when it can be, categorical
/// otherwise.  Booleans are numeric (1 and 0), and text that parses as a
/// number is numeric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Number(f64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(value) => Value::from(value),
            Raw::Number(value) => Value::Number(value),
            Raw::Text(value) => Value::from(value),
        })
    }
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Number(_) => None,
            Value::Text(text) => Some(text),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Value::Number(x) if *x == 0.0)
    }

    /// Truthiness of a value - non-zero numbers and non-empty text.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(x) => *x != 0.0,
            Value::Text(text) => !text.is_empty(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{}", x),
            Value::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Number(if value { 1.0 } else { 0.0 })
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        match value.trim().parse::<f64>() {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(value.to_string()),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        match value.trim().parse::<f64>() {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sample {
    value: Value,
    weight: f64,
}

/// The `Monitor` collects a stream of tallied observations.  While the
/// monitor is off, tallies are discarded.  A weighted monitor takes an
/// explicit weight (or duration) per tally; otherwise each tally weighs 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    name: String,
    weighted: bool,
    monitoring: bool,
    samples: Vec<Sample>,
}

impl Monitor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            weighted: false,
            monitoring: true,
            samples: Vec::new(),
        }
    }

    /// A monitor for weighted observations, tallied with `tally_weighted`.
    pub fn weighted(name: &str) -> Self {
        Self {
            weighted: true,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// Record an observation with weight 1.
    pub fn tally<V: Into<Value>>(&mut self, value: V) {
        self.tally_weighted(value, 1.0);
    }

    /// Record an observation with an explicit weight.
    pub fn tally_weighted<V: Into<Value>>(&mut self, value: V, weight: f64) {
        if self.monitoring {
            self.samples.push(Sample {
                value: value.into(),
                weight,
            });
        }
    }

    /// Turn recording on or off.  Recorded history is kept either way.
    pub fn monitor(&mut self, monitoring: bool) {
        self.monitoring = monitoring;
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// The raw number of recorded samples, regardless of value.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The recorded values, in tally order.
    pub fn values(&self) -> Vec<&Value> {
        self.samples.iter().map(|sample| &sample.value).collect()
    }

    /// Discard all recorded samples.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Present this monitor and others as a single, combined monitor.
    pub fn merge<'a>(&'a self, others: &[&'a Monitor]) -> MergedMonitor<'a> {
        let mut sources = vec![self];
        sources.extend_from_slice(others);
        MergedMonitor::new(sources)
    }
}

impl Statistics for Monitor {
    fn observations(&self) -> Vec<(Value, f64)> {
        self.samples
            .iter()
            .map(|sample| (sample.value.clone(), sample.weight))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::from(" 1000 "), Value::Number(1000.0));
        assert_eq!(Value::from("1.2"), Value::Number(1.2));
        assert_eq!(Value::from(true), Value::Number(1.0));
        assert_eq!(Value::from("jan"), Value::Text(String::from("jan")));
        assert_eq!(Value::from(""), Value::Text(String::new()));
    }

    #[test]
    fn tallies_are_discarded_while_off() {
        let mut monitor = Monitor::new("m");
        monitor.tally(1);
        monitor.monitor(false);
        monitor.tally(2);
        monitor.monitor(true);
        monitor.tally(3);
        assert_eq!(monitor.len(), 2);
        assert_eq!(monitor.mean(false), Some(2.0));
    }

    #[test]
    fn ex0_excludes_zero_from_statistics_only() {
        let mut monitor = Monitor::new("m");
        for value in [10, 15, 20, 92, 0, 12, 0].iter() {
            monitor.tally(*value);
        }
        assert_eq!(monitor.len(), 7);
        assert_eq!(monitor.number_of_entries(false), 7);
        assert_eq!(monitor.number_of_entries(true), 5);
        assert_eq!(monitor.mean(true), Some(149.0 / 5.0));
        assert_eq!(monitor.mean(false), Some(149.0 / 7.0));
        assert_eq!(monitor.percentile(0.0, true), Some(10.0));
        assert_eq!(monitor.percentile(0.0, false), Some(0.0));
    }

    #[test]
    fn weighted_tallies() {
        let mut plain = Monitor::new("m");
        let mut weighted = Monitor::weighted("mw");
        for (value, count) in [(3, 1), (5, 2), (6, 2)].iter() {
            (0..*count).for_each(|_| plain.tally(*value));
            weighted.tally_weighted(*value, f64::from(*count));
        }
        assert_eq!(plain.mean(false), weighted.mean(false));
        assert_eq!(plain.std(false), weighted.std(false));
        assert_eq!(weighted.weight(false), 5.0);
        assert_eq!(weighted.len(), 3);
    }

    #[test]
    fn categorical_values_are_kept_apart() {
        let mut monitor = Monitor::new("m");
        for value in ["1", "jan", "a", "2", "jan"].iter() {
            monitor.tally(*value);
        }
        assert_eq!(monitor.mean(false), Some(1.5));
        assert_eq!(monitor.categories().get("jan"), Some(&2.0));
        assert_eq!(monitor.number_of_entries(false), 5);
    }
}

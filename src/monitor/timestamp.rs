use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::Value;
use crate::output_analysis::Statistics;
use crate::simulator::Environment;

/// An accessor sampled by a `TimestampMonitor` at every `sample` call.
pub type Getter = Rc<dyn Fn(&Environment) -> Value>;

#[derive(Clone, Serialize, Deserialize)]
struct Entry {
    time: f64,
    /// `None` marks the start of a period with monitoring switched off
    value: Option<Value>,
}

/// The `TimestampMonitor` follows a value over simulated time.  Every tally
/// records the new value and the time of the change, so the statistics are
/// weighted by the duration each value was held.  Periods with monitoring
/// switched off are excluded from the durations, but the value is still
/// followed, so switching monitoring back on resumes with the right value.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampMonitor {
    name: String,
    monitoring: bool,
    value: Value,
    entries: Vec<Entry>,
    #[serde(skip)]
    getter: Option<Getter>,
}

impl fmt::Debug for TimestampMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampMonitor")
            .field("name", &self.name)
            .field("monitoring", &self.monitoring)
            .field("value", &self.value)
            .field("entries", &self.entries.len())
            .field("getter", &self.getter.is_some())
            .finish()
    }
}

impl TimestampMonitor {
    pub fn new<V: Into<Value>>(name: &str, initial: V, now: f64) -> Self {
        let value = initial.into();
        Self {
            name: name.to_string(),
            monitoring: true,
            entries: vec![Entry {
                time: now,
                value: Some(value.clone()),
            }],
            value,
            getter: None,
        }
    }

    /// A monitor bound to an accessor, which is evaluated against the
    /// environment on creation and at every `sample` call.
    pub fn with_getter(name: &str, getter: Getter, env: &Environment) -> Self {
        let initial = getter(env);
        Self {
            getter: Some(getter),
            ..Self::new(name, initial, env.now())
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current value.
    pub fn get(&self) -> &Value {
        &self.value
    }

    /// Record a new value, effective from `now`.
    pub fn tally<V: Into<Value>>(&mut self, value: V, now: f64) {
        self.value = value.into();
        if self.monitoring {
            self.entries.push(Entry {
                time: now,
                value: Some(self.value.clone()),
            });
        }
    }

    /// Evaluate the bound accessor and record its result.  Monitors without
    /// an accessor record their current value again.
    pub fn sample(&mut self, env: &Environment) {
        let value = match &self.getter {
            Some(getter) => getter(env),
            None => self.value.clone(),
        };
        self.tally(value, env.now());
    }

    /// Switch monitoring on or off, from `now`.
    pub fn monitor(&mut self, monitoring: bool, now: f64) {
        if monitoring == self.monitoring {
            return;
        }
        self.monitoring = monitoring;
        self.entries.push(Entry {
            time: now,
            value: if monitoring {
                Some(self.value.clone())
            } else {
                None
            },
        });
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// The recorded values, with the time each was recorded.
    pub fn xt(&self) -> Vec<(Value, f64)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.value.clone().map(|value| (value, entry.time)))
            .collect()
    }

    /// The recorded values, with the duration each was held up to `now`.
    pub fn xduration(&self, now: f64) -> Vec<(Value, f64)> {
        self.segments(now)
            .into_iter()
            .map(|segment| (segment.value, segment.duration))
            .collect()
    }

    /// The total monitored duration up to `now`.
    pub fn duration(&self, now: f64, ex0: bool) -> f64 {
        self.view(now).weight(ex0)
    }

    /// A time-weighted statistics view, with the current value held up to
    /// `now`.
    pub fn view(&self, now: f64) -> TimeWeighted {
        TimeWeighted {
            segments: self.segments(now),
        }
    }

    pub(crate) fn segments(&self, now: f64) -> Vec<Segment> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let end = self
                    .entries
                    .get(index + 1)
                    .map_or(now, |next| next.time);
                entry.value.clone().map(|value| Segment {
                    start: entry.time,
                    duration: f64::max(end - entry.time, 0.0),
                    value,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Segment {
    pub(crate) start: f64,
    pub(crate) duration: f64,
    pub(crate) value: Value,
}

/// Time-weighted observations, as (value, duration) segments in
/// chronological order.
#[derive(Debug, Clone)]
pub struct TimeWeighted {
    pub(crate) segments: Vec<Segment>,
}

impl TimeWeighted {
    /// The start time of each segment, with its value and duration.
    pub fn segments(&self) -> Vec<(f64, &Value, f64)> {
        self.segments
            .iter()
            .map(|segment| (segment.start, &segment.value, segment.duration))
            .collect()
    }
}

impl Statistics for TimeWeighted {
    fn observations(&self) -> Vec<(Value, f64)> {
        self.segments
            .iter()
            .map(|segment| (segment.value.clone(), segment.duration))
            .collect()
    }
}

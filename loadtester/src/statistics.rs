use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Round trip times of every request reported under one name, in microseconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestStatistics {
    pub count: u64,
    pub failures: u64,
    pub min_rtt: u128,
    pub max_rtt: u128,
    pub total_rtt: u128,
}

impl Default for RequestStatistics {
    fn default() -> Self {
        Self {
            count: 0,
            failures: 0,
            min_rtt: u128::MAX,
            max_rtt: u128::MIN,
            total_rtt: 0,
        }
    }
}

impl RequestStatistics {
    pub fn record(&mut self, rtt: Duration, success: bool) {
        self.count += 1;
        if !success {
            self.failures += 1;
        }
        update_stats(
            rtt.as_micros(),
            &mut self.min_rtt,
            &mut self.max_rtt,
            &mut self.total_rtt,
        );
    }

    #[inline]
    #[must_use]
    pub fn mean_rtt(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_rtt as f64 / self.count as f64
    }
}

fn update_stats(cur: u128, min: &mut u128, max: &mut u128, total: &mut u128) {
    if cur < *min {
        *min = cur;
    }
    if cur > *max {
        *max = cur;
    }
    *total += cur;
}

/// Per-name aggregation of a single-user smoke run.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    entries: BTreeMap<String, RequestStatistics>,
}

impl Statistics {
    pub fn record(&mut self, name: &str, rtt: Duration, success: bool) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .record(rtt, success);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RequestStatistics> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequestStatistics)> {
        self.entries.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.entries.values().map(|stats| stats.count).sum()
    }

    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.entries.values().map(|stats| stats.failures).sum()
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results:")?;
        let width = self.entries.keys().map(String::len).max().unwrap_or(0);
        for (name, stats) in self.iter() {
            writeln!(
                f,
                "    {name:<width$} my s [min, mean, max] = [{}, {:.2}, {}] ({} requests, {} failed)",
                stats.min_rtt,
                stats.mean_rtt(),
                stats.max_rtt,
                stats.count,
                stats.failures,
            )?;
        }
        write!(
            f,
            "    total: {} requests, {} failed",
            self.total_requests(),
            self.total_failures()
        )
    }
}

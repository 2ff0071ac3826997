//! Prometheus metrics for the analysis service
//!
//! One registry per process, owned by [`AnalysisMetrics`] and shared through
//! `AppState`. A small rolling window of recent response times backs the
//! average-latency gauge.

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::AnalysisResult;

/// Samples kept for rolling averages
const MAX_SAMPLES: usize = 1000;

/// Bounded window of recent observations
#[derive(Debug)]
struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        }
    }
}

/// Metric families exported at `/metrics`
pub struct AnalysisMetrics {
    registry: Registry,
    requests: IntCounterVec,
    request_latency: HistogramVec,
    characters: Histogram,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    patterns: IntCounterVec,
    segments: IntCounter,
    validation_warnings: IntCounter,
    avg_response_ms: Gauge,
    response_times: Mutex<RollingWindow>,
}

impl AnalysisMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("rhyme_analysis_requests_total", "Total number of requests"),
            &["endpoint", "status"],
        )?;
        let request_latency = HistogramVec::new(
            HistogramOpts::new("rhyme_analysis_request_latency_seconds", "Request latency in seconds"),
            &["endpoint"],
        )?;
        let characters = Histogram::with_opts(
            HistogramOpts::new("rhyme_analysis_characters", "Number of characters analyzed")
                .buckets(vec![100.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0]),
        )?;
        let cache_hits = IntCounter::new("rhyme_analysis_cache_hits_total", "Total number of cache hits")?;
        let cache_misses =
            IntCounter::new("rhyme_analysis_cache_misses_total", "Total number of cache misses")?;
        let patterns = IntCounterVec::new(
            Opts::new("rhyme_analysis_patterns_total", "Number of patterns found by type"),
            &["pattern_type"],
        )?;
        let segments = IntCounter::new(
            "rhyme_analysis_segments_total",
            "Number of segments or words found",
        )?;
        let validation_warnings = IntCounter::new(
            "rhyme_analysis_validation_warnings_total",
            "Windows skipped because their payload was unusable",
        )?;
        let avg_response_ms = Gauge::new(
            "rhyme_analysis_avg_response_time_ms",
            "Mean analysis time over recent requests",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;
        registry.register(Box::new(characters.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(patterns.clone()))?;
        registry.register(Box::new(segments.clone()))?;
        registry.register(Box::new(validation_warnings.clone()))?;
        registry.register(Box::new(avg_response_ms.clone()))?;

        Ok(Self {
            registry,
            requests,
            request_latency,
            characters,
            cache_hits,
            cache_misses,
            patterns,
            segments,
            validation_warnings,
            avg_response_ms,
            response_times: Mutex::new(RollingWindow::new(MAX_SAMPLES)),
        })
    }

    pub fn record_request(&self, endpoint: &str, status: u16, elapsed_secs: f64) {
        self.requests
            .with_label_values(&[endpoint, &status.to_string()])
            .inc();
        self.request_latency
            .with_label_values(&[endpoint])
            .observe(elapsed_secs);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    /// Record a freshly computed analysis
    pub fn record_analysis(
        &self,
        scheme_id: &str,
        characters: usize,
        result: &AnalysisResult,
        warnings: usize,
        elapsed_ms: f64,
    ) {
        self.cache_misses.inc();
        self.characters.observe(characters as f64);
        self.patterns
            .with_label_values(&[scheme_id])
            .inc_by(result.group_count() as u64);
        self.segments.inc_by(result.item_count() as u64);
        self.validation_warnings.inc_by(warnings as u64);

        let mut times = self
            .response_times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        times.push(elapsed_ms);
        self.avg_response_ms.set(times.mean());
    }

    /// Prometheus text exposition of every registered family
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn content_type() -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatternGroup, ValidatedSegment};

    #[test]
    fn test_rolling_window_is_bounded() {
        let mut window = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 10.0] {
            window.push(v);
        }
        assert_eq!(window.samples.len(), 3);
        assert_eq!(window.mean(), 5.0);
        assert_eq!(RollingWindow::new(3).mean(), 0.0);
    }

    #[test]
    fn test_render_contains_recorded_values() {
        let metrics = AnalysisMetrics::new().unwrap();
        let result = AnalysisResult::Segments(vec![PatternGroup {
            id: "g".to_string(),
            description: "d".to_string(),
            segments: vec![ValidatedSegment {
                text: "ay".to_string(),
                parent_word: "day".to_string(),
                global_start: 1,
                global_end: 3,
                start_in_parent: 1,
                end_in_parent: 3,
            }],
        }]);

        metrics.record_request("/api/analyze", 200, 0.25);
        metrics.record_cache_hit();
        metrics.record_analysis("default", 120, &result, 1, 40.0);

        let text = metrics.render().unwrap();
        assert!(text.contains("rhyme_analysis_requests_total{endpoint=\"/api/analyze\",status=\"200\"} 1"));
        assert!(text.contains("rhyme_analysis_cache_hits_total 1"));
        assert!(text.contains("rhyme_analysis_cache_misses_total 1"));
        assert!(text.contains("rhyme_analysis_patterns_total{pattern_type=\"default\"} 1"));
        assert!(text.contains("rhyme_analysis_validation_warnings_total 1"));
        assert!(text.contains("rhyme_analysis_avg_response_time_ms 40"));
    }
}

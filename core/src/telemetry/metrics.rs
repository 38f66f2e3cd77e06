use std::sync::Mutex;

/// Batch counters shared between worker threads.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub processed: usize,
    pub errors: usize,
    pub low_confidence: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_processed(&self, low_confidence: bool) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
            if low_confidence {
                metrics.low_confidence += 1;
            }
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner.lock().map(|metrics| *metrics).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counters_accumulate_across_threads() {
        let recorder = Arc::new(MetricsRecorder::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let recorder = recorder.clone();
                thread::spawn(move || {
                    recorder.record_processed(i % 2 == 0);
                    if i == 3 {
                        recorder.record_error();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(
            recorder.snapshot(),
            Metrics {
                processed: 4,
                errors: 1,
                low_confidence: 2,
            }
        );
    }
}

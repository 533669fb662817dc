//! Progress reporting for long processing passes.

use log::info;

/// Push-style observer notified by the processor
///
/// Purely informational: nothing an observer does affects dispatch.
pub trait ProgressObserver {
    fn on_start(&mut self, _total: usize) {}

    /// Called after each event, with the number processed so far
    fn on_event(&mut self, processed: usize);

    fn on_finish(&mut self, _processed: usize) {}
}

/// Logs a line every `interval` events
#[derive(Debug, Clone)]
pub struct LogProgress {
    interval: usize,
    total: usize,
}

impl LogProgress {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            total: 0,
        }
    }

    fn percentage(&self, processed: usize) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            processed as f64 / self.total as f64 * 100.0
        }
    }
}

impl ProgressObserver for LogProgress {
    fn on_start(&mut self, total: usize) {
        self.total = total;
    }

    fn on_event(&mut self, processed: usize) {
        if processed % self.interval == 0 {
            info!(
                "Progress: {}/{} events ({:.1}%)",
                processed,
                self.total,
                self.percentage(processed)
            );
        }
    }

    fn on_finish(&mut self, processed: usize) {
        info!("Progress: done ({} events)", processed);
    }
}

/// Closures can be used as observers directly
impl<F: FnMut(usize)> ProgressObserver for F {
    fn on_event(&mut self, processed: usize) {
        self(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let mut progress = LogProgress::new(0);
        progress.on_start(200);
        assert_eq!(progress.percentage(50), 25.0);
        assert_eq!(progress.interval, 1);
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |n: usize| seen.push(n);
            observer.on_event(1);
            observer.on_event(2);
        }
        assert_eq!(seen, vec![1, 2]);
    }
}

//! Elapsed-time tracker for the charging-since indicator

use chrono::{DateTime, Utc};
use tokio::time::{Duration, Instant};

/// Tracks how long the station has been charging
#[derive(Debug, Clone, Default)]
pub struct ElapsedTimer {
    enabled: bool,
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
}

impl ElapsedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting; a running timer keeps its start point
    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.restart_clock();
        }
    }

    /// Stop counting and forget the start point
    pub fn disable(&mut self) {
        self.enabled = false;
        self.started = None;
        self.started_at = None;
    }

    /// Restart from zero without changing the enabled flag
    pub fn reset(&mut self) {
        if self.enabled {
            self.restart_clock();
        } else {
            self.started = None;
            self.started_at = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started.map(|s| s.elapsed())
    }

    /// Wall clock time the current run started
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    fn restart_clock(&mut self) {
        self.started = Some(Instant::now());
        self.started_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn counts_only_while_enabled() {
        let mut timer = ElapsedTimer::new();
        assert_eq!(timer.elapsed(), None);

        timer.reset();
        assert_eq!(timer.elapsed(), None);

        timer.enable();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(timer.elapsed(), Some(Duration::from_secs(30)));

        // enabling again keeps the start point
        timer.enable();
        assert_eq!(timer.elapsed(), Some(Duration::from_secs(30)));

        timer.reset();
        assert_eq!(timer.elapsed(), Some(Duration::ZERO));

        timer.disable();
        assert!(!timer.is_enabled());
        assert_eq!(timer.elapsed(), None);
        assert!(timer.started_at().is_none());
    }
}

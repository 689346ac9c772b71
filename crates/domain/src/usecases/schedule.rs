//! Cancellable periodic ticking for the recurring cycles

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// When the first tick of a recurring task fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstRun {
    Immediate,
    /// One full period after the ticker is created
    AfterPeriod,
}

/// Periodic ticker that stops handing out ticks once cancelled
pub struct Ticker {
    interval: Interval,
    cancel: CancellationToken,
}

impl Ticker {
    pub fn new(period: Duration, first: FirstRun, cancel: CancellationToken) -> Self {
        let period = period.max(Duration::from_millis(1));
        let start = match first {
            FirstRun::Immediate => Instant::now(),
            FirstRun::AfterPeriod => Instant::now() + period,
        };
        let mut interval = interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, cancel }
    }

    /// Wait for the next tick. Returns `false` once cancellation was requested,
    /// including when it races with a due tick.
    pub async fn next(&mut self) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.interval.tick() => !self.cancel.is_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_immediate_first_tick() {
        let start = Instant::now();
        let mut ticker = Ticker::new(
            Duration::from_secs(60),
            FirstRun::Immediate,
            CancellationToken::new(),
        );

        assert!(ticker.next().await);
        assert_eq!(start.elapsed(), Duration::ZERO);

        assert!(ticker.next().await);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_first_tick() {
        let start = Instant::now();
        let mut ticker = Ticker::new(
            Duration::from_secs(24 * 3600),
            FirstRun::AfterPeriod,
            CancellationToken::new(),
        );

        assert!(ticker.next().await);
        assert_eq!(start.elapsed(), Duration::from_secs(24 * 3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_waiting_ticker() {
        let cancel = CancellationToken::new();
        let mut ticker = Ticker::new(
            Duration::from_secs(3600),
            FirstRun::AfterPeriod,
            cancel.clone(),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        assert!(!ticker.next().await);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_ticker_never_ticks() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut ticker = Ticker::new(Duration::from_secs(1), FirstRun::Immediate, cancel);

        assert!(!ticker.next().await);
    }
}

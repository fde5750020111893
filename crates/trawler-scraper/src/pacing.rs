//! Randomized pacing between scraping steps.
//!
//! Every suspension the scraper makes to look less like a bot goes through
//! [`RateLimiter`]. Delays are drawn uniformly from `[min, min + spread)`
//! for the pacing point being crossed.

use crate::error::{Result, ScrapeError};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trawler_core::{DelayWindow, PacingConfig};

/// Points in the scraping loop where the scraper pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacingPoint {
    /// Before the first page of a search
    PreSearch,
    /// After a page loads, before reading its cards
    PageSettle,
    /// Before moving to the next page
    InterPage,
    /// Before each card is opened
    InterCard,
    /// Between two searches of the same run
    InterSearch,
}

impl fmt::Display for PacingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreSearch => "pre-search",
            Self::PageSettle => "page-settle",
            Self::InterPage => "inter-page",
            Self::InterCard => "inter-card",
            Self::InterSearch => "inter-search",
        };
        f.write_str(name)
    }
}

/// Source of the random offset added to a window's minimum.
pub trait JitterSource: Send + Sync {
    /// Return a value in `[0, spread_ms)`, or 0 when `spread_ms` is 0.
    fn offset_ms(&self, spread_ms: u64) -> u64;
}

/// Uniform jitter from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn offset_ms(&self, spread_ms: u64) -> u64 {
        if spread_ms == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..spread_ms)
    }
}

/// Constant jitter, clamped into the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub u64);

impl JitterSource for FixedJitter {
    fn offset_ms(&self, spread_ms: u64) -> u64 {
        self.0.min(spread_ms.saturating_sub(1))
    }
}

/// Draws pacing delays and suspends for them.
#[derive(Clone)]
pub struct RateLimiter {
    windows: PacingConfig,
    jitter: Arc<dyn JitterSource>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("windows", &self.windows)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Rate limiter with random jitter.
    pub fn new(windows: PacingConfig) -> Self {
        Self::with_jitter(windows, Arc::new(ThreadRngJitter))
    }

    /// Rate limiter with an explicit jitter source.
    pub fn with_jitter(windows: PacingConfig, jitter: Arc<dyn JitterSource>) -> Self {
        Self { windows, jitter }
    }

    /// Rate limiter that never waits.
    pub fn disabled() -> Self {
        Self::with_jitter(PacingConfig::zero(), Arc::new(FixedJitter(0)))
    }

    fn window(&self, point: PacingPoint) -> DelayWindow {
        match point {
            PacingPoint::PreSearch => self.windows.pre_search,
            PacingPoint::PageSettle => self.windows.page_settle,
            PacingPoint::InterPage => self.windows.inter_page,
            PacingPoint::InterCard => self.windows.inter_card,
            PacingPoint::InterSearch => self.windows.inter_search,
        }
    }

    /// Delay to apply at `point`.
    pub fn delay(&self, point: PacingPoint) -> Duration {
        let window = self.window(point);
        let offset = self.jitter.offset_ms(window.spread_ms);
        Duration::from_millis(window.min_ms.saturating_add(offset))
    }

    /// Suspend for the delay at `point`.
    ///
    /// # Errors
    /// Returns `ScrapeError::Cancelled` if `cancel` fires first.
    pub async fn pause(&self, point: PacingPoint, cancel: &CancellationToken) -> Result<()> {
        let delay = self.delay(point);
        tracing::trace!(%point, ?delay, "Pacing");
        sleep_or_cancel(delay, cancel).await
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub(crate) async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ScrapeError::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = cancel.cancelled() => Err(ScrapeError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> PacingConfig {
        PacingConfig {
            pre_search: DelayWindow::new(1000, 2000),
            page_settle: DelayWindow::new(2000, 3000),
            inter_page: DelayWindow::new(3000, 5000),
            inter_card: DelayWindow::new(500, 1500),
            inter_search: DelayWindow::new(5000, 10_000),
        }
    }

    #[test]
    fn test_random_delays_stay_in_window() {
        let limiter = RateLimiter::new(windows());
        for _ in 0..200 {
            let delay = limiter.delay(PacingPoint::InterCard);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay < Duration::from_millis(2000));

            let delay = limiter.delay(PacingPoint::InterSearch);
            assert!(delay >= Duration::from_millis(5000));
            assert!(delay < Duration::from_millis(15_000));
        }
    }

    #[test]
    fn test_fixed_jitter_is_deterministic() {
        let limiter = RateLimiter::with_jitter(windows(), Arc::new(FixedJitter(250)));
        assert_eq!(
            limiter.delay(PacingPoint::PreSearch),
            Duration::from_millis(1250)
        );
        assert_eq!(
            limiter.delay(PacingPoint::InterPage),
            Duration::from_millis(3250)
        );
    }

    #[test]
    fn test_fixed_jitter_clamped_to_spread() {
        let limiter = RateLimiter::with_jitter(windows(), Arc::new(FixedJitter(u64::MAX)));
        assert_eq!(
            limiter.delay(PacingPoint::InterCard),
            Duration::from_millis(1999)
        );
    }

    #[test]
    fn test_disabled_limiter_never_waits() {
        let limiter = RateLimiter::disabled();
        for point in [
            PacingPoint::PreSearch,
            PacingPoint::PageSettle,
            PacingPoint::InterPage,
            PacingPoint::InterCard,
            PacingPoint::InterSearch,
        ] {
            assert_eq!(limiter.delay(point), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_for_delay() {
        let limiter = RateLimiter::with_jitter(windows(), Arc::new(FixedJitter(0)));
        let cancel = CancellationToken::new();

        let start = tokio::time::Instant::now();
        limiter
            .pause(PacingPoint::PageSettle, &cancel)
            .await
            .expect("pause completes");
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_on_cancel() {
        let limiter = RateLimiter::with_jitter(windows(), Arc::new(FixedJitter(0)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = limiter.pause(PacingPoint::InterSearch, &cancel).await;
        assert!(matches!(result, Err(ScrapeError::Cancelled)));
    }
}

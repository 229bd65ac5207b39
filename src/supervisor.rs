//! Recovery supervisor: error accounting and restart policy wrapped
//! around the hardware watchdog.
//!
//! The main loop feeds it every tick and reports faults as they happen;
//! the supervisor decides when the fault rate justifies a restart.  All
//! methods take `now_ms` explicitly so the policy is testable with a
//! scripted clock.
//!
//! Two counters with different lifetimes: `error_count` is monotonic for
//! the life of the process, `consecutive_errors` decays to zero once a
//! cooldown window passes with no new faults.

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::drivers::system;
use crate::drivers::watchdog::Watchdog;

/// Verdict returned by [`Supervisor::register_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Fault recorded; keep running.
    Continue,
    /// The consecutive-error limit was hit and policy demands a restart.
    RestartNow,
}

pub struct Supervisor {
    watchdog: Watchdog,
    feed_interval_ms: u64,
    cooldown_ms: u64,
    max_consecutive: u32,
    restart_on_limit: bool,
    start_ms: u64,
    last_feed_ms: u64,
    error_count: u32,
    consecutive_errors: u32,
    last_error: String,
    last_error_ms: Option<u64>,
}

impl Supervisor {
    /// Arm the hardware watchdog and start the uptime clock.
    pub fn new(config: &SystemConfig, now_ms: u64) -> Self {
        Self {
            watchdog: Watchdog::new(config.hw_watchdog_timeout_secs),
            feed_interval_ms: u64::from(config.feed_interval_ms),
            cooldown_ms: u64::from(config.error_cooldown_ms),
            max_consecutive: config.max_consecutive_errors,
            restart_on_limit: config.restart_on_critical_error,
            start_ms: now_ms,
            last_feed_ms: now_ms,
            error_count: 0,
            consecutive_errors: 0,
            last_error: String::new(),
            last_error_ms: None,
        }
    }

    /// Reset the hardware timer, rate-limited so a hot loop does not
    /// hammer the register.  Also retires the consecutive-error counter
    /// once the cooldown window has passed without a new fault.
    pub fn feed(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.last_feed_ms) < self.feed_interval_ms {
            return;
        }

        self.watchdog.feed();
        self.last_feed_ms = now_ms;

        if self.consecutive_errors > 0 {
            if let Some(t) = self.last_error_ms {
                if now_ms.saturating_sub(t) > self.cooldown_ms {
                    info!(
                        "Watchdog: error cooldown complete, clearing {} consecutive errors",
                        self.consecutive_errors
                    );
                    self.consecutive_errors = 0;
                }
            }
        }
    }

    /// Record a fault.  Returns [`Recovery::RestartNow`] when the
    /// consecutive limit is hit and restart-on-error policy is enabled;
    /// the caller performs the restart so the acknowledgement path stays
    /// in one place.
    pub fn register_error(&mut self, message: &str, now_ms: u64) -> Recovery {
        self.error_count += 1;
        self.consecutive_errors += 1;
        self.last_error.clear();
        self.last_error.push_str(message);
        self.last_error_ms = Some(now_ms);

        warn!(
            "Watchdog: error registered: {message} (total: {}, consecutive: {})",
            self.error_count, self.consecutive_errors
        );

        if self.consecutive_errors >= self.max_consecutive && self.restart_on_limit {
            Recovery::RestartNow
        } else {
            Recovery::Continue
        }
    }

    /// Forgive the consecutive streak (the monotonic total is untouched).
    pub fn clear_errors(&mut self) {
        info!("Watchdog: clearing error count");
        self.consecutive_errors = 0;
    }

    /// Whether the consecutive streak has reached the restart limit.
    pub fn should_restart(&self) -> bool {
        self.consecutive_errors >= self.max_consecutive
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn uptime_secs(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms) / 1_000
    }

    /// Remove the loop task from hardware monitoring for an operation
    /// known to outlast the timeout.
    pub fn suspend(&self) {
        self.watchdog.suspend();
    }

    /// Re-add the loop task and force-feed so the elapsed suspend time
    /// cannot trip the timer on the next tick.
    pub fn resume(&mut self, now_ms: u64) {
        self.watchdog.resume();
        self.last_feed_ms = now_ms;
    }

    /// Log the diagnostic banner and reboot.  Never returns; the brief
    /// pause lets the log lines drain before the chip goes down.
    pub fn restart(&self, reason: &str, now_ms: u64) -> ! {
        error!("========================================");
        error!("Watchdog: SYSTEM RESTART INITIATED");
        error!("Watchdog: Reason: {reason}");
        error!("Watchdog: Uptime: {} seconds", self.uptime_secs(now_ms));
        error!("Watchdog: Total errors: {}", self.error_count);
        error!("Watchdog: Last error: {}", self.last_error_or_none());
        error!("========================================");

        std::thread::sleep(std::time::Duration::from_millis(1_000));
        system::restart()
    }

    fn last_error_or_none(&self) -> &str {
        if self.last_error.is_empty() {
            "None"
        } else {
            &self.last_error
        }
    }

    /// Multi-line stats block for the serial status screen.
    pub fn error_stats(&self, now_ms: u64) -> String {
        let mut stats = String::from("Error Statistics:\n");
        stats.push_str(&format!("  Total Errors: {}\n", self.error_count));
        stats.push_str(&format!(
            "  Consecutive Errors: {}\n",
            self.consecutive_errors
        ));
        stats.push_str(&format!("  Last Error: {}\n", self.last_error_or_none()));

        if let Some(t) = self.last_error_ms {
            let since_secs = now_ms.saturating_sub(t) / 1_000;
            stats.push_str(&format!("  Time Since Last Error: {since_secs} seconds\n"));
        }

        stats.push_str(&format!("  Uptime: {} seconds\n", self.uptime_secs(now_ms)));
        stats.push_str(&format!(
            "  HW Watchdog: {}\n",
            if self.watchdog.is_active() {
                "Enabled"
            } else {
                "Disabled"
            }
        ));
        stats.push_str(&format!(
            "  Task Watchdog: {}\n",
            if self.watchdog.is_active() {
                "Enabled"
            } else {
                "Disabled"
            }
        ));
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor_at(now_ms: u64) -> Supervisor {
        Supervisor::new(&SystemConfig::default(), now_ms)
    }

    #[test]
    fn errors_accumulate_on_both_counters() {
        let mut sup = supervisor_at(0);

        assert_eq!(sup.register_error("boom", 100), Recovery::Continue);
        assert_eq!(sup.register_error("boom again", 200), Recovery::Continue);

        assert_eq!(sup.error_count(), 2);
        assert_eq!(sup.consecutive_errors(), 2);
        assert_eq!(sup.last_error(), "boom again");
    }

    #[test]
    fn tenth_consecutive_error_demands_restart() {
        let mut sup = supervisor_at(0);

        for i in 0..9 {
            assert_eq!(sup.register_error("fault", 100 + i), Recovery::Continue);
        }
        assert_eq!(sup.register_error("fault", 200), Recovery::RestartNow);
        assert!(sup.should_restart());
    }

    #[test]
    fn restart_policy_off_still_flags_should_restart() {
        let config = SystemConfig {
            restart_on_critical_error: false,
            ..SystemConfig::default()
        };
        let mut sup = Supervisor::new(&config, 0);

        for _ in 0..10 {
            assert_eq!(sup.register_error("fault", 100), Recovery::Continue);
        }
        assert!(sup.should_restart(), "predicate is policy-independent");
    }

    #[test]
    fn feed_is_rate_limited() {
        let mut sup = supervisor_at(0);
        sup.register_error("fault", 100);

        // Too soon after the constructor's implicit feed, and within the
        // cooldown anyway: nothing clears.
        sup.feed(500);
        assert_eq!(sup.consecutive_errors(), 1);

        // Past the feed interval but still within the error cooldown.
        sup.feed(1_100);
        assert_eq!(sup.consecutive_errors(), 1);
    }

    #[test]
    fn cooldown_retires_consecutive_count() {
        let mut sup = supervisor_at(0);
        sup.register_error("fault", 100);

        sup.feed(5_200);
        assert_eq!(sup.consecutive_errors(), 0);
        assert_eq!(sup.error_count(), 1, "total never decays");
    }

    #[test]
    fn rate_limit_defers_cooldown_clear() {
        let mut sup = supervisor_at(0);
        sup.feed(1_000);
        sup.register_error("fault", 1_100);

        // 6.3s after the error (past cooldown), but only 900ms after the
        // last accepted feed, so the call is dropped whole.
        sup.feed(1_900);
        sup.register_error("fault two", 1_950);
        sup.feed(7_400);
        assert_eq!(sup.consecutive_errors(), 0);
    }

    #[test]
    fn clear_errors_spares_the_total() {
        let mut sup = supervisor_at(0);
        sup.register_error("one", 100);
        sup.register_error("two", 200);

        sup.clear_errors();

        assert_eq!(sup.consecutive_errors(), 0);
        assert_eq!(sup.error_count(), 2);
        assert!(!sup.should_restart());
    }

    #[test]
    fn uptime_tracks_from_construction() {
        let sup = supervisor_at(2_000);
        assert_eq!(sup.uptime_secs(12_000), 10);
    }

    #[test]
    fn stats_before_any_error() {
        let sup = supervisor_at(0);
        let stats = sup.error_stats(3_000);

        assert!(stats.contains("Total Errors: 0\n"));
        assert!(stats.contains("Last Error: None\n"));
        assert!(!stats.contains("Time Since Last Error"));
        assert!(stats.contains("Uptime: 3 seconds\n"));
    }

    #[test]
    fn stats_after_an_error() {
        let mut sup = supervisor_at(0);
        sup.register_error("Initial WiFi connection failed", 1_000);

        let stats = sup.error_stats(4_000);
        assert!(stats.contains("Total Errors: 1\n"));
        assert!(stats.contains("Last Error: Initial WiFi connection failed\n"));
        assert!(stats.contains("Time Since Last Error: 3 seconds\n"));
    }

    #[test]
    fn resume_counts_as_a_feed() {
        let mut sup = supervisor_at(0);
        sup.register_error("fault", 100);

        sup.resume(10_000);
        // last_feed moved to 10_000, so a feed at 10_500 is rate-limited
        // and the cooldown clear must wait for the next accepted feed.
        sup.feed(10_500);
        assert_eq!(sup.consecutive_errors(), 1);

        sup.feed(11_000);
        assert_eq!(sup.consecutive_errors(), 0);
    }
}

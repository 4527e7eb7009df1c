//! Statistics collector.
//!
//! Counts packets and bytes per role over a fixed window. At the end of each
//! window the running counters are published and reset, so the published
//! values are a per-window rate rather than a running total.
//!
//! The collector never looks at queue contents. The scheduler feeds it sizes
//! and elapsed time, and it can be driven on its own in tests.

use std::{fmt, time::Duration};

use crate::channel::Role;

/// Suffixes for successive powers of 1024.
const BYTE_SUFFIXES: [&str; 7] = ["b", "kB", "mb", "GB", "TB", "PB", "EB"];

/// Render a byte count with base-1024 units and one decimal place.
///
/// The scale is `floor(log_1024(|bytes|))` and the sign of `bytes` is kept.
///
/// ```
/// use lagsim_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 b");
/// assert_eq!(format_bytes(1536), "1.5 kB");
/// assert_eq!(format_bytes(-2048), "-2.0 kB");
/// ```
pub fn format_bytes(bytes: i64) -> String {
    if bytes == 0 {
        return format!("0 {}", BYTE_SUFFIXES[0]);
    }

    let magnitude = bytes.unsigned_abs();
    // Each suffix step is 10 bits.
    let place = ((u64::BITS - 1 - magnitude.leading_zeros()) / 10) as usize;
    #[allow(clippy::cast_precision_loss)]
    let scaled = magnitude as f64 / (1u64 << (10 * place)) as f64;
    let sign = if bytes < 0 { "-" } else { "" };

    format!("{sign}{scaled:.1} {}", BYTE_SUFFIXES[place])
}

/// Counters for one role over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleStats {
    /// Packets submitted for sending.
    pub sent_packets: u64,
    /// Payload bytes submitted for sending.
    pub sent_bytes: u64,
    /// Packets reported as received by the underlying transport.
    pub received_packets: u64,
    /// Payload bytes reported as received.
    pub received_bytes: u64,
}

impl RoleStats {
    /// Sent bytes rendered with [`format_bytes`].
    pub fn sent_bytes_display(&self) -> String {
        format_bytes(saturating_i64(self.sent_bytes))
    }

    /// Received bytes rendered with [`format_bytes`].
    pub fn received_bytes_display(&self) -> String {
        format_bytes(saturating_i64(self.received_bytes))
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Windowed sent/received counters for the client and server roles.
#[derive(Debug, Clone)]
pub struct Statistics {
    window: Duration,
    elapsed: Duration,
    running: [RoleStats; 2],
    published: [RoleStats; 2],
    windows_completed: u64,
}

impl Statistics {
    /// Create a collector publishing once per `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            elapsed: Duration::ZERO,
            running: [RoleStats::default(); 2],
            published: [RoleStats::default(); 2],
            windows_completed: 0,
        }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Change the window length. The current window keeps its elapsed time.
    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Count one outgoing packet of `len` bytes for `role`.
    pub fn record_sent(&mut self, role: Role, len: usize) {
        let stats = &mut self.running[role.index()];
        stats.sent_packets += 1;
        stats.sent_bytes = stats.sent_bytes.saturating_add(len as u64);
    }

    /// Count one inbound packet of `len` bytes for `role`.
    pub fn record_received(&mut self, role: Role, len: usize) {
        let stats = &mut self.running[role.index()];
        stats.received_packets += 1;
        stats.received_bytes = stats.received_bytes.saturating_add(len as u64);
    }

    /// Advance the window clock by `elapsed`.
    ///
    /// Returns `true` when the window closed and the running counters were
    /// published. The window restarts from zero; time past the boundary is
    /// not carried over.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(elapsed);
        if self.elapsed < self.window {
            return false;
        }

        self.elapsed = Duration::ZERO;
        self.published = std::mem::take(&mut self.running);
        self.windows_completed += 1;
        true
    }

    /// Published counters from the last completed window.
    pub fn last_window(&self, role: Role) -> RoleStats {
        self.published[role.index()]
    }

    /// Counters accumulated so far in the current window.
    pub fn current_window(&self, role: Role) -> RoleStats {
        self.running[role.index()]
    }

    /// Number of windows published since creation or the last reset.
    pub fn windows_completed(&self) -> u64 {
        self.windows_completed
    }

    /// Zero both running and published counters and restart the window.
    pub fn reset(&mut self) {
        *self = Self::new(self.window);
    }

    /// Overlay report for `role`'s last window.
    pub fn report(&self, role: Role) -> StatisticsReport {
        StatisticsReport { role, stats: self.last_window(role) }
    }
}

/// Human-readable rendering of one role's last window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsReport {
    /// Role the counters belong to.
    pub role: Role,
    /// Published counters.
    pub stats: RoleStats,
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Received Packets: {}/s", self.stats.received_packets)?;
        writeln!(f, "Received Bytes: {}/s", self.stats.received_bytes_display())?;
        writeln!(f, "Sent Packets: {}/s", self.stats.sent_packets)?;
        write!(f, "Sent Bytes: {}/s", self.stats.sent_bytes_display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_examples() {
        assert_eq!(format_bytes(0), "0 b");
        assert_eq!(format_bytes(1536), "1.5 kB");
        assert_eq!(format_bytes(-2048), "-2.0 kB");
    }

    #[test]
    fn format_bytes_scale_boundaries() {
        assert_eq!(format_bytes(1), "1.0 b");
        assert_eq!(format_bytes(1023), "1023.0 b");
        assert_eq!(format_bytes(1024), "1.0 kB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 mb");
        assert_eq!(format_bytes(1 << 30), "1.0 GB");
        assert_eq!(format_bytes(1 << 40), "1.0 TB");
        assert_eq!(format_bytes(1 << 50), "1.0 PB");
        assert_eq!(format_bytes(1 << 60), "1.0 EB");
    }

    #[test]
    fn format_bytes_extremes() {
        assert_eq!(format_bytes(i64::MAX), "8.0 EB");
        assert_eq!(format_bytes(i64::MIN), "-8.0 EB");
    }

    #[test]
    fn counters_are_per_role() {
        let mut stats = Statistics::new(Duration::from_secs(1));
        stats.record_sent(Role::Client, 100);
        stats.record_sent(Role::Client, 20);
        stats.record_received(Role::Server, 7);

        let client = stats.current_window(Role::Client);
        assert_eq!(client.sent_packets, 2);
        assert_eq!(client.sent_bytes, 120);
        assert_eq!(client.received_packets, 0);

        let server = stats.current_window(Role::Server);
        assert_eq!(server.received_packets, 1);
        assert_eq!(server.received_bytes, 7);
        assert_eq!(server.sent_packets, 0);
    }

    #[test]
    fn window_publishes_and_resets() {
        let mut stats = Statistics::new(Duration::from_secs(1));
        stats.record_sent(Role::Server, 10);

        assert!(!stats.advance(Duration::from_millis(600)));
        assert_eq!(stats.last_window(Role::Server), RoleStats::default());

        assert!(stats.advance(Duration::from_millis(400)));
        assert_eq!(stats.last_window(Role::Server).sent_bytes, 10);
        assert_eq!(stats.current_window(Role::Server), RoleStats::default());
        assert_eq!(stats.windows_completed(), 1);

        // Nothing recorded in the second window.
        assert!(stats.advance(Duration::from_secs(1)));
        assert_eq!(stats.last_window(Role::Server), RoleStats::default());
    }

    #[test]
    fn overshoot_is_not_carried() {
        let mut stats = Statistics::new(Duration::from_secs(1));
        assert!(stats.advance(Duration::from_millis(1900)));
        assert!(!stats.advance(Duration::from_millis(200)));
    }

    #[test]
    fn reset_clears_published() {
        let mut stats = Statistics::new(Duration::from_secs(1));
        stats.record_received(Role::Client, 5);
        stats.advance(Duration::from_secs(1));
        stats.record_received(Role::Client, 5);

        stats.reset();

        assert_eq!(stats.last_window(Role::Client), RoleStats::default());
        assert_eq!(stats.current_window(Role::Client), RoleStats::default());
        assert_eq!(stats.windows_completed(), 0);
    }

    #[test]
    fn report_renders_overlay() {
        let mut stats = Statistics::new(Duration::from_secs(1));
        for _ in 0..3 {
            stats.record_received(Role::Client, 512);
        }
        stats.record_sent(Role::Client, 2048);
        stats.advance(Duration::from_secs(1));

        insta::assert_snapshot!(stats.report(Role::Client).to_string(), @r"
        Received Packets: 3/s
        Received Bytes: 1.5 kB/s
        Sent Packets: 1/s
        Sent Bytes: 2.0 kB/s
        ");
    }
}

//! Per-operation byte and timing metrics.

use std::time::Duration;

/// Result of one request/response exchange.
///
/// `body` is `None` whenever the response could not be decoded (or was
/// streamed to a file instead of memory); `status` is empty when the
/// response carried nothing recognizable.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    /// Bytes written, framing included.
    pub bytes_sent: u64,

    /// Bytes received, framing included.
    pub bytes_recv: u64,

    /// Time spent in the send phase.
    pub send_elapsed: Duration,

    /// Time spent in the receive phase.
    pub recv_elapsed: Duration,

    /// Assembled response body, framing stripped.
    pub body: Option<String>,

    /// Operation status ("OK", "ERROR: <tag>", ...) or the session-id for
    /// the HELLO handshake.
    pub status: String,
}

impl Exchange {
    /// Format the metrics the way the operation reports print them.
    pub fn metrics_line(&self, human_readable: bool) -> String {
        if human_readable {
            format!(
                "sent:{:>10}Bytes, recv:{:>10}Bytes, rq:{:>10}, rs:{:>10}",
                format_count(self.bytes_sent),
                format_count(self.bytes_recv),
                format_duration(self.send_elapsed),
                format_duration(self.recv_elapsed),
            )
        } else {
            format!(
                "sent:{:>8} Bytes, recv:{:>8} Bytes, rq:{:>8.1} ms, rs:{:>8.1} ms",
                self.bytes_sent,
                self.bytes_recv,
                self.send_elapsed.as_secs_f64() * 1000.0,
                self.recv_elapsed.as_secs_f64() * 1000.0,
            )
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.metrics_line(false))
    }
}

/// Aggregate metrics across repeated exchanges, for loop summaries.
#[derive(Debug, Clone, Default)]
pub struct ExchangeTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub send_elapsed: Duration,
    pub recv_elapsed: Duration,
    pub count: u32,
}

impl ExchangeTotals {
    pub fn add(&mut self, exchange: &Exchange) {
        self.bytes_sent += exchange.bytes_sent;
        self.bytes_recv += exchange.bytes_recv;
        self.send_elapsed += exchange.send_elapsed;
        self.recv_elapsed += exchange.recv_elapsed;
        self.count += 1;
    }

    /// View the totals as one summary exchange.
    pub fn as_exchange(&self) -> Exchange {
        Exchange {
            bytes_sent: self.bytes_sent,
            bytes_recv: self.bytes_recv,
            send_elapsed: self.send_elapsed,
            recv_elapsed: self.recv_elapsed,
            body: None,
            status: String::new(),
        }
    }
}

/// Human-readable count, du-style with a factor of 1000.
pub fn format_count(value: u64) -> String {
    const UNITS: [char; 4] = ['k', 'M', 'G', 'T'];
    if value < 1000 {
        return format!("{value} ");
    }
    let mut scaled = value as f64;
    let mut unit = UNITS[0];
    for u in UNITS {
        scaled /= 1000.0;
        unit = u;
        if scaled < 1000.0 {
            break;
        }
    }
    format!("{scaled:.3} {unit}")
}

/// Human-readable duration: ms below a second, then s / m s / h m s.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        return format!("{:.3} ms ", secs * 1000.0);
    }
    let minutes = (secs / 60.0).floor() as u64;
    let rem = secs - (minutes as f64) * 60.0;
    if minutes == 0 {
        return format!("{rem:.2} s");
    }
    if minutes < 60 {
        return format!("{}m {}s", minutes, rem as u64);
    }
    let hours = minutes / 60;
    let minutes = minutes % 60;
    format!("{}h {}m {}s", hours, minutes, rem as u64)
}

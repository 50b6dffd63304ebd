use std::time::{Duration, Instant};
use tracing::debug;

/// Logs how long a CLI operation took when it goes out of scope.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        debug!("Starting: {}", label);
        Self { label, start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("Finished: {} (took {:.2?})", self.label, self.elapsed());
    }
}

/// Thousands separators: 306751 → "306,751".
pub fn fmt_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

/// Percentage with two decimals, as the analytics view shows it.
pub fn fmt_pct(v: f64) -> String {
    format!("{:.2}%", v)
}

/// Optional value for table cells.
pub fn or_dash<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "—".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(1_234_567), "1,234,567");
        assert_eq!(fmt_number(0), "0");
        assert_eq!(fmt_number(306_751), "306,751");
        assert_eq!(fmt_number(999), "999");
    }

    #[test]
    fn test_fmt_pct_and_dash() {
        assert_eq!(fmt_pct(140.0), "140.00%");
        assert_eq!(fmt_pct(-1.3), "-1.30%");
        assert_eq!(or_dash(Some(12.5)), "12.5");
        assert_eq!(or_dash::<f64>(None), "—");
    }
}

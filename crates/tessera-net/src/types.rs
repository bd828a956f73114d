use std::{collections::BTreeMap, time::Duration};

/// Request or response header set. Names are case-insensitive and stored
/// lowercased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    inner: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: AsRef<str>, V: Into<String>>(&mut self, name: K, value: V) {
        self.inner
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `(name, value)` pairs with lowercased names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Bounded byte span for an HTTP `Range` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub len: u64,
}

impl RangeSpec {
    /// `len` bytes starting at `start`. A zero `len` is raised to one byte;
    /// HTTP has no empty range.
    pub fn span(start: u64, len: u64) -> Self {
        Self {
            start,
            len: len.max(1),
        }
    }

    /// Last requested offset, inclusive, as HTTP counts it.
    pub fn last(&self) -> u64 {
        self.start.saturating_add(self.len.saturating_sub(1))
    }

    /// `bytes=start-last`.
    pub fn to_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.last())
    }
}

/// Exponential backoff for the retry layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), Duration::from_secs(5))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`. Attempt 0 has no delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(exp) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let factor = 1u32.checked_shl(exp).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Clone, Debug)]
pub struct NetOptions {
    /// Applies to the whole exchange, body included. Range bodies are bounded
    /// by the prefetch window, so this also caps a stalled transfer.
    pub request_timeout: Duration,
    /// Used by the probe only; range reads never retry.
    pub retry_policy: RetryPolicy,
    /// Max idle connections per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
            pool_max_idle_per_host: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::lower("content-length", "Content-Length")]
    #[case::upper("CONTENT-TYPE", "content-type")]
    #[case::mixed("Content-Disposition", "CONTENT-disposition")]
    fn test_headers_case_insensitive(#[case] stored: &str, #[case] looked_up: &str) {
        let mut headers = Headers::new();
        headers.insert(stored, "v");

        assert_eq!(headers.get(looked_up), Some("v"));
        let lowered = stored.to_ascii_lowercase();
        assert_eq!(headers.iter().next(), Some((lowered.as_str(), "v")));
    }

    #[test]
    fn test_headers_insert_replaces_same_name() {
        let headers: Headers = [("Accept", "a"), ("accept", "b"), ("X-Id", "1")]
            .into_iter()
            .collect();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("accept"), Some("b"));
        assert!(Headers::default().is_empty());
    }

    #[rstest]
    #[case::one_byte(7, 1, "bytes=7-7")]
    #[case::window(500, 262_144, "bytes=500-262643")]
    #[case::zero_len_is_one_byte(9, 0, "bytes=9-9")]
    fn test_range_spec_header(#[case] start: u64, #[case] len: u64, #[case] header: &str) {
        assert_eq!(RangeSpec::span(start, len).to_header_value(), header);
    }

    #[test]
    fn test_range_spec_last_saturates() {
        let range = RangeSpec::span(u64::MAX - 1, 10);
        assert_eq!(range.last(), u64::MAX);
        assert_eq!(range.len, 10);
    }

    #[rstest]
    #[case::none(0, Duration::ZERO)]
    #[case::first(1, Duration::from_millis(100))]
    #[case::doubled(3, Duration::from_millis(400))]
    #[case::capped(7, Duration::from_secs(5))]
    #[case::huge_attempt(u32::MAX, Duration::from_secs(5))]
    fn test_retry_delay(#[case] attempt: u32, #[case] expected: Duration) {
        assert_eq!(RetryPolicy::default().delay_for_attempt(attempt), expected);
    }

    #[test]
    fn test_retry_policy_none() {
        assert_eq!(RetryPolicy::none().max_retries, 0);
        assert_eq!(NetOptions::default().retry_policy, RetryPolicy::default());
    }
}

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::errors::StoreError;
use crate::state::kv::KvStore;

/// Key holding the signup total as a decimal string.
pub const COUNT_KEY: &str = "count";

/// Largest integer an `f64` represents exactly.
const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

/// A signup total as read from the store.
///
/// Stored values are parsed as numbers, so a fractional value written by
/// some other client survives a read unchanged. Integral values serialize
/// as JSON integers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Count(f64);

impl Count {
    pub const ZERO: Count = Count(0.0);

    pub fn new(value: f64) -> Self {
        Count(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn next(self) -> Self {
        Count(self.0 + 1.0)
    }

    /// Absent, unparsable, non-finite and negative values all read as zero.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Count::ZERO;
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return Count::ZERO;
        }

        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && n > 0.0 => Count(n),
            _ => Count::ZERO,
        }
    }

    fn as_exact_integer(self) -> Option<i64> {
        (self.0.fract() == 0.0 && self.0.abs() <= MAX_EXACT).then_some(self.0 as i64)
    }
}

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Count(value as f64)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_exact_integer() {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_exact_integer() {
            Some(n) => serializer.serialize_i64(n),
            None => serializer.serialize_f64(self.0),
        }
    }
}

/// Approximate signup counter.
///
/// `increment` is a plain read, add one, write sequence against the store.
/// Concurrent increments can lose updates or double count; the value is
/// only ever an approximation of the number of signups.
#[derive(Clone)]
pub struct ApproxCounter {
    store: Arc<dyn KvStore>,
}

impl ApproxCounter {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn read(&self) -> Result<Count, StoreError> {
        let raw = self.store.get(COUNT_KEY).await?;
        Ok(Count::parse(raw.as_deref()))
    }

    pub async fn write(&self, count: Count) -> Result<(), StoreError> {
        self.store.put(COUNT_KEY, count.to_string()).await
    }

    pub async fn increment(&self) -> Result<Count, StoreError> {
        let next = self.read().await?.next();
        self.write(next).await?;
        tracing::debug!("Signup counter now {}", next);
        Ok(next)
    }
}

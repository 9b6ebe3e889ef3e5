//! Price observation types and the persisted line format.
//!
//! A `PricePoint` is one observation as held by the price store: the price, when it
//! was observed, and the 24h deltas derived at write time. A `PriceSample` is the
//! bare `(timestamp, price)` projection that durable storage and history backfill
//! deal in. Samples are rendered one per line as `timestamp,price`.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::defaults::PRICE_PRECISION;
use crate::error::TrackerError;

/// One timestamped price observation plus its derived 24h deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    /// Quote value; `0.0` only as the "no data" sentinel.
    pub price: f64,
    /// Observation time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Percent change against the 24h reference.
    pub percent_change_24h: f64,
    /// Absolute change against the 24h reference.
    pub price_change_24h: f64,
}

impl PricePoint {
    /// Create a point observed now with the given deltas.
    pub fn now(price: f64, percent_change_24h: f64, price_change_24h: f64) -> Self {
        Self {
            price,
            timestamp: Utc::now(),
            percent_change_24h,
            price_change_24h,
        }
    }

    /// Zero-valued point returned for symbols without data.
    pub fn empty() -> Self {
        Self {
            price: 0.0,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            percent_change_24h: 0.0,
            price_change_24h: 0.0,
        }
    }

    /// `(timestamp, price)` projection used for persistence.
    pub fn sample(&self) -> PriceSample {
        PriceSample {
            timestamp: self.timestamp,
            price: self.price,
        }
    }
}

impl Default for PricePoint {
    fn default() -> Self {
        Self::empty()
    }
}

/// A bare `(timestamp, price)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    /// Observation time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Quote value.
    pub price: f64,
}

impl PriceSample {
    /// Create a new sample.
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Convert into a store point with zero deltas.
    ///
    /// Backfilled and reloaded points are not "current" snapshots, so they carry no
    /// derived change.
    pub fn into_point(self) -> PricePoint {
        PricePoint {
            price: self.price,
            timestamp: self.timestamp,
            percent_change_24h: 0.0,
            price_change_24h: 0.0,
        }
    }

    /// Render as a `timestamp,price` line (no trailing newline).
    ///
    /// Fractional seconds are written only as far as they are non-zero, down to
    /// nanoseconds, so `parse_line` gives back the same timestamp.
    pub fn to_line(&self) -> String {
        format!(
            "{},{:.*}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            PRICE_PRECISION,
            self.price
        )
    }

    /// Parse a `timestamp,price` line.
    ///
    /// The timestamp is RFC 3339, or a bare integer Unix epoch whose unit
    /// (seconds, milliseconds, nanoseconds) is inferred from its magnitude.
    pub fn parse_line(line: &str) -> Result<Self, TrackerError> {
        let (ts, price) = line
            .trim()
            .split_once(',')
            .ok_or_else(|| TrackerError::Format(format!("missing ',' in {line:?}")))?;

        let timestamp = parse_timestamp(ts.trim())?;
        let price: f64 = price
            .trim()
            .parse()
            .map_err(|e| TrackerError::Format(format!("bad price {price:?}: {e}")))?;
        if !price.is_finite() {
            return Err(TrackerError::Format(format!("non-finite price {price}")));
        }

        Ok(Self { timestamp, price })
    }
}

impl From<PricePoint> for PriceSample {
    fn from(point: PricePoint) -> Self {
        point.sample()
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TrackerError> {
    if let Ok(epoch) = raw.parse::<i64>() {
        let parsed = match epoch.unsigned_abs() {
            0..=99_999_999_999 => Utc.timestamp_opt(epoch, 0).single(),
            100_000_000_000..=99_999_999_999_999 => Utc.timestamp_millis_opt(epoch).single(),
            _ => Some(Utc.timestamp_nanos(epoch)),
        };
        return parsed.ok_or_else(|| TrackerError::Format(format!("epoch out of range: {raw}")));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TrackerError::Format(format!("bad timestamp {raw:?}: {e}")))
}

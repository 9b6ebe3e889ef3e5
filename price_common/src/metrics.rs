//! Derived 24h change metrics.
//!
//! The change of a fresh quote is measured against a reference price: ideally the
//! observation 24 hours (one full window) earlier. When the window is shorter than
//! that, [`ReferencePolicy`] decides whether to degrade to the oldest point on hand
//! or to report a neutral change.

use clap::ValueEnum;
use strum_macros::{Display, EnumString};

/// Absolute and percent change of a price against its 24h reference.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Change24h {
    /// `current - reference`.
    pub price_change: f64,
    /// `price_change / reference * 100`, or `0` when the reference is zero.
    pub percent_change: f64,
}

impl Change24h {
    /// Change of `current` against `reference`.
    ///
    /// Never yields NaN or infinity: a zero reference gives a zero percent change and
    /// any other non-finite intermediate collapses to zero.
    pub fn between(current: f64, reference: f64) -> Self {
        let price_change = finite_or_zero(current - reference);
        let percent_change = if reference == 0.0 {
            0.0
        } else {
            finite_or_zero(price_change / reference * 100.0)
        };
        Self {
            price_change,
            percent_change,
        }
    }

    /// 0% / 0 change, used on cold start.
    pub fn neutral() -> Self {
        Self::default()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Rule for picking the reference price out of a symbol's window.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Display, EnumString,
)]
#[clap(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ReferencePolicy {
    /// Use the oldest point available, however short the window is.
    #[default]
    OldestInWindow,
    /// Use the oldest point only once the window is full; neutral change before that.
    FullWindowOnly,
}

impl ReferencePolicy {
    /// Pick the reference price for `current`.
    ///
    /// - oldest: price of the oldest point in the window, if any.
    /// - len: number of points in the window.
    /// - capacity: window capacity.
    ///
    /// With no history the current price itself is the reference (neutral change).
    pub fn reference(&self, current: f64, oldest: Option<f64>, len: usize, capacity: usize) -> f64 {
        match (self, oldest) {
            (_, None) => current,
            (ReferencePolicy::OldestInWindow, Some(oldest)) => oldest,
            (ReferencePolicy::FullWindowOnly, Some(oldest)) if len >= capacity => oldest,
            (ReferencePolicy::FullWindowOnly, Some(_)) => current,
        }
    }

    /// Pick the reference and compute the change of `current` against it.
    pub fn change(&self, current: f64, oldest: Option<f64>, len: usize, capacity: usize) -> Change24h {
        Change24h::between(current, self.reference(current, oldest, len, capacity))
    }
}

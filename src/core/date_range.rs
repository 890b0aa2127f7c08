//! Date ranges and the degradation ladder for time-series queries.
//!
//! The backend answers too-large queries with a 500. Instead of failing,
//! the query is narrowed to the last 30 days and then the last 7 days.

use std::future::Future;

use chrono::{DateTime, Datelike, TimeDelta, Utc};

use crate::error::{ErrorKind, FortumError, Result};

/// Days covered by the default range, counted back from the first of the
/// current month.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// Fallback ranges tried after the requested one, in days.
pub const FALLBACK_DAYS: [i64; 2] = [30, 7];

/// Inclusive time window of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    #[must_use]
    pub const fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The `days` days ending at `now`.
    #[must_use]
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Self {
        Self {
            from: now - TimeDelta::days(days),
            to: now,
        }
    }

    /// Range used when the caller gives no bounds.
    ///
    /// Starts 90 days before the first day of the current month, at the
    /// current time of day, and ends at `now`.
    #[must_use]
    pub fn default_for(now: DateTime<Utc>) -> Self {
        let month_start = now.with_day(1).unwrap_or(now);
        Self {
            from: month_start - TimeDelta::days(DEFAULT_LOOKBACK_DAYS),
            to: now,
        }
    }

    /// Fill missing bounds from [`Self::default_for`].
    #[must_use]
    pub fn resolve(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let default = Self::default_for(now);
        Self {
            from: from.unwrap_or(default.from),
            to: to.unwrap_or(default.to),
        }
    }

    #[must_use]
    pub fn num_days(&self) -> i64 {
        (self.to - self.from).num_days()
    }
}

/// Run `fetch` over the requested range, narrowing on server errors.
///
/// The ladder is entered only when the requested range fails with
/// [`ErrorKind::TransientServer`]; any other error on it propagates
/// unchanged. Once entered, any failure of the 30-day tier moves on to
/// the 7-day tier.
///
/// # Errors
///
/// Returns the requested range's non-server error, or the error of the
/// 7-day tier.
pub async fn with_degradation<T, F, Fut>(
    requested: DateRange,
    now: DateTime<Utc>,
    mut fetch: F,
) -> Result<T>
where
    F: FnMut(DateRange) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let tiers = std::iter::once(requested)
        .chain(FALLBACK_DAYS.iter().map(|&days| DateRange::last_days(days, now)));

    let mut last_error = None;
    for (tier, range) in tiers.enumerate() {
        if let Some(err) = last_error.take() {
            tracing::warn!(
                tier,
                days = range.num_days(),
                error = %err,
                "Query failed, retrying with a shorter date range"
            );
        }
        match fetch(range).await {
            Err(err) if tier > 0 || err.kind() == ErrorKind::TransientServer => {
                last_error = Some(err);
            }
            other => return other,
        }
    }

    Err(last_error.unwrap_or_else(|| {
        FortumError::invalid_response("no date range tiers were attempted")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerErrorDetail;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    fn server_error() -> FortumError {
        FortumError::ServerError {
            detail: ServerErrorDetail::ReduceDateRange,
        }
    }

    #[test]
    fn default_range_starts_ninety_days_before_month_start() {
        let range = DateRange::default_for(now());
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 3, 3, 10, 30, 0).unwrap());
        assert_eq!(range.to, now());
    }

    #[test]
    fn resolve_keeps_given_bounds() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let range = DateRange::resolve(Some(from), None, now());
        assert_eq!(range.from, from);
        assert_eq!(range.to, now());
    }

    #[tokio::test]
    #[traced_test]
    async fn descends_ninety_thirty_seven() {
        let requested = DateRange::last_days(90, now());
        let seen = Mutex::new(Vec::new());

        let result: Result<&str> = with_degradation(requested, now(), |range| {
            seen.lock().unwrap().push(range.num_days());
            let days = range.num_days();
            async move {
                if days > 7 {
                    Err(server_error())
                } else {
                    Ok("data")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "data");
        assert_eq!(*seen.lock().unwrap(), vec![90, 30, 7]);
        assert!(logs_contain("retrying with a shorter date range"));
    }

    #[tokio::test]
    async fn success_on_first_tier_makes_one_call() {
        let calls = Mutex::new(0);
        let result = with_degradation(DateRange::default_for(now()), now(), |_| {
            *calls.lock().unwrap() += 1;
            async { Ok(1) }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn other_errors_propagate_immediately() {
        let calls = Mutex::new(0);
        let result: Result<()> = with_degradation(DateRange::default_for(now()), now(), |_| {
            *calls.lock().unwrap() += 1;
            async { Err(FortumError::Forbidden) }
        })
        .await;
        assert!(matches!(result, Err(FortumError::Forbidden)));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn last_tier_error_propagates() {
        let calls = Mutex::new(0);
        let result: Result<()> = with_degradation(DateRange::default_for(now()), now(), |_| {
            *calls.lock().unwrap() += 1;
            async { Err(server_error()) }
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::TransientServer);
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn any_error_on_thirty_day_tier_falls_through_to_seven_days() {
        let seen = Mutex::new(Vec::new());
        let result: Result<&str> = with_degradation(DateRange::default_for(now()), now(), |range| {
            let days = range.num_days();
            let n = {
                let mut seen = seen.lock().unwrap();
                seen.push(days);
                seen.len()
            };
            async move {
                match n {
                    1 => Err(server_error()),
                    2 => Err(FortumError::UnexpectedStatus {
                        status: 502,
                        body: "bad gateway".to_string(),
                    }),
                    _ => Ok("week"),
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "week");
        assert_eq!(&seen.lock().unwrap()[1..], &[30, 7]);
    }

    #[tokio::test]
    async fn seven_day_tier_error_is_returned_after_network_failure() {
        let calls = Mutex::new(0);
        let result: Result<()> = with_degradation(DateRange::default_for(now()), now(), |_| {
            let n = {
                let mut calls = calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            async move {
                match n {
                    1 => Err(server_error()),
                    2 => Err(FortumError::Network("reset".into())),
                    _ => Err(FortumError::Forbidden),
                }
            }
        })
        .await;
        assert!(matches!(result, Err(FortumError::Forbidden)));
        assert_eq!(*calls.lock().unwrap(), 3);
    }
}

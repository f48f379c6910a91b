//! Multi-feed timeline reconciliation.
//!
//! Each radar layer publishes on its own schedule. Assimilation needs every
//! layer at one instant, so the resolver intersects the per-layer timelines
//! and picks the common instant closest to the requested one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::client::WebdropsClient;
use crate::error::{Result, WebdropsError};
use crate::radar::RadarVariable;
use crate::time::{format_wire, parse_wire};

/// Elements of sorted `a` that are also in sorted `b`, in `a`'s order.
pub fn intersect(a: &[String], b: &[String]) -> Vec<String> {
    a.iter()
        .filter(|item| b.binary_search(*item).is_ok())
        .cloned()
        .collect()
}

/// Intersection of all sorted lists, in the order of the first.
pub fn intersect_all(lists: &[Vec<String>]) -> Vec<String> {
    match lists.split_first() {
        None => Vec::new(),
        Some((first, rest)) => rest
            .iter()
            .fold(first.clone(), |common, list| intersect(&common, list)),
    }
}

/// Pick the instant of `candidates` closest to `requested`.
///
/// An exact match is returned as soon as it is seen. Otherwise the first
/// candidate with the smallest distance wins; with sorted candidates that is
/// the earliest of two equidistant instants.
pub fn select_best_instant(
    requested: DateTime<Utc>,
    candidates: &[String],
) -> Result<Option<DateTime<Utc>>> {
    let mut best: Option<(DateTime<Utc>, i64)> = None;

    for candidate in candidates {
        let instant = parse_wire(candidate)?;
        if instant == requested {
            return Ok(Some(instant));
        }

        let distance = (instant - requested).num_seconds().abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((instant, distance)),
        }
    }

    Ok(best.map(|(instant, _)| instant))
}

/// Finds the best instant shared by a set of radar variables.
#[derive(Debug, Clone, Copy)]
pub struct TimelineResolver {
    pub window_before: Duration,
    pub window_after: Duration,
}

impl Default for TimelineResolver {
    fn default() -> Self {
        Self {
            window_before: Duration::from_secs(30 * 60),
            window_after: Duration::from_secs(30 * 60),
        }
    }
}

impl TimelineResolver {
    pub fn new(window_before: Duration, window_after: Duration) -> Self {
        Self {
            window_before,
            window_after,
        }
    }

    /// Resolve the instant nearest to `requested` at which every variable has data.
    #[instrument(skip(self, client, requested), fields(requested = %format_wire(&requested)))]
    pub async fn resolve(
        &self,
        client: &mut WebdropsClient,
        requested: DateTime<Utc>,
        variables: &[RadarVariable],
    ) -> Result<DateTime<Utc>> {
        if variables.is_empty() {
            return Err(WebdropsError::Config(
                "timeline resolution needs at least one variable".to_string(),
            ));
        }

        let from = requested - to_chrono(self.window_before)?;
        let to = requested + to_chrono(self.window_after)?;

        let mut timelines = Vec::with_capacity(variables.len());
        for variable in variables {
            let timeline = client.radar_timeline(*variable, from, to).await?;
            debug!(variable = %variable, instants = timeline.len(), "Fetched timeline");
            timelines.push(timeline);
        }

        let common = intersect_all(&timelines);
        let no_common = || WebdropsError::NoCommonInstant {
            requested: format_wire(&requested),
            variables: variables.iter().map(|v| v.to_string()).collect(),
        };
        if common.is_empty() {
            return Err(no_common());
        }

        let best = select_best_instant(requested, &common)?.ok_or_else(no_common)?;
        info!(
            best = %format_wire(&best),
            candidates = common.len(),
            "Resolved common radar instant"
        );
        Ok(best)
    }
}

fn to_chrono(d: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(d)
        .map_err(|e| WebdropsError::Config(format!("timeline window out of range: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_intersect_binary_search() {
        let a = list(&["202306011130", "202306011200", "202306011230"]);
        let b = list(&["202306011130", "202306011230", "202306011300"]);
        assert_eq!(intersect(&a, &b), list(&["202306011130", "202306011230"]));
        assert!(intersect(&a, &[]).is_empty());
    }

    #[test]
    fn test_intersect_all_is_order_independent() {
        let a = list(&["01", "02", "03", "05", "08"]);
        let b = list(&["02", "03", "04", "05"]);
        let c = list(&["00", "03", "05", "09"]);
        let expected = list(&["03", "05"]);

        let orders = [
            [&a, &b, &c],
            [&a, &c, &b],
            [&b, &a, &c],
            [&b, &c, &a],
            [&c, &a, &b],
            [&c, &b, &a],
        ];
        for order in orders {
            let lists: Vec<Vec<String>> = order.iter().map(|l| (*l).clone()).collect();
            let common = intersect_all(&lists);
            assert_eq!(common, expected);
            assert!(common.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_intersect_all_edge_cases() {
        assert!(intersect_all(&[]).is_empty());
        let only = list(&["1", "2"]);
        assert_eq!(intersect_all(&[only.clone()]), only);
    }

    #[test]
    fn test_exact_match_wins() {
        let candidates = list(&["202306011159", "202306011200", "202306011201"]);
        assert_eq!(
            select_best_instant(at(12, 0), &candidates).unwrap(),
            Some(at(12, 0))
        );
    }

    #[test]
    fn test_nearest_fallback() {
        let candidates = list(&["202306011150", "202306011202", "202306011240"]);
        assert_eq!(
            select_best_instant(at(12, 0), &candidates).unwrap(),
            Some(at(12, 2))
        );
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let candidates = list(&["202306011130", "202306011230"]);
        assert_eq!(
            select_best_instant(at(12, 0), &candidates).unwrap(),
            Some(at(11, 30))
        );
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(select_best_instant(at(12, 0), &[]).unwrap(), None);
    }

    #[test]
    fn test_malformed_candidate() {
        let candidates = list(&["2023-06-01 12:00"]);
        assert!(matches!(
            select_best_instant(at(12, 0), &candidates),
            Err(WebdropsError::Decode { .. })
        ));
    }
}

//! Pre-aggregated statistics payloads.
//!
//! The server computes these; the client only renders them. Every field is
//! optional and unknown keys are kept in `extra` so new server fields survive
//! a round trip untouched.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::ArchiveClock;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenreStat {
    pub genre: Option<String>,
    pub count: u32,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VenueStat {
    pub venue: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceStat {
    pub performance_title: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtistStat {
    pub artist: String,
    pub count: u32,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeekdayWeekendRatio {
    pub weekday_count: u32,
    pub weekday_percentage: Option<f64>,
    pub weekend_count: u32,
    pub weekend_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HalfYearComparison {
    pub first_half_count: u32,
    pub first_half_percentage: Option<f64>,
    pub second_half_count: u32,
    pub second_half_percentage: Option<f64>,
}

/// Yearly analytics for one user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_count_this_year: u32,
    pub year_over_year_change: Option<i64>,
    pub genre_statistics: Vec<GenreStat>,
    pub top_venues: Vec<VenueStat>,
    pub top_performances: Vec<PerformanceStat>,
    pub weekday_weekend_ratio: Option<WeekdayWeekendRatio>,
    pub half_year_comparison: Option<HalfYearComparison>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AggregateStats {
    /// The first `limit` venues, in server order.
    #[must_use]
    pub fn top_venues(&self, limit: usize) -> &[VenueStat] {
        &self.top_venues[..self.top_venues.len().min(limit)]
    }

    /// The first `limit` performances, in server order.
    #[must_use]
    pub fn top_performances(&self, limit: usize) -> &[PerformanceStat] {
        &self.top_performances[..self.top_performances.len().min(limit)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TicketHighlight {
    pub performance_title: String,
    pub view_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecialPoints {
    pub first_ticket: Option<TicketHighlight>,
    pub last_ticket: Option<TicketHighlight>,
    pub most_memorable_ticket: Option<TicketHighlight>,
}

/// Year-in-review summary for one user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YearSummary {
    pub total_count: u32,
    pub top_genres: Vec<GenreStat>,
    pub most_visited_venue: Option<String>,
    pub most_watched_performance: Option<String>,
    pub most_watched_artist: Option<String>,
    pub favorite_artists: Vec<ArtistStat>,
    pub consumption_type: Option<String>,
    pub special_points: Option<SpecialPoints>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The year selected on the statistics tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearCursor {
    year: i32,
}

impl YearCursor {
    #[must_use]
    pub const fn new(year: i32) -> Self {
        Self { year }
    }

    /// Start on the calendar year of `clock`'s "now".
    #[must_use]
    pub fn current(clock: &ArchiveClock) -> Self {
        Self::new(clock.now().year())
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn previous(self) -> Self {
        Self::new(self.year - 1)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.year + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_stats_keep_unknown_fields() {
        let json = serde_json::json!({
            "totalCountThisYear": 12,
            "yearOverYearChange": -3,
            "topVenues": [
                { "venue": "A", "count": 5 },
                { "venue": "B", "count": 4 },
            ],
            "monthlyTrend": [1, 2, 3],
        });
        let stats: AggregateStats = serde_json::from_value(json).expect("deserialize");
        assert_eq!(stats.total_count_this_year, 12);
        assert_eq!(stats.year_over_year_change, Some(-3));
        assert_eq!(stats.top_venues(1).len(), 1);
        assert_eq!(stats.top_venues(5).len(), 2);
        assert!(stats.extra.contains_key("monthlyTrend"));

        let back = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(back["monthlyTrend"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn year_summary_tolerates_sparse_payloads() {
        let summary: YearSummary = serde_json::from_value(serde_json::json!({
            "totalCount": 3,
            "specialPoints": {
                "firstTicket": { "performanceTitle": "Hamlet", "viewDate": "2024-01-02" }
            }
        }))
        .expect("deserialize");
        assert_eq!(summary.total_count, 3);
        let first = summary
            .special_points
            .and_then(|p| p.first_ticket)
            .expect("first ticket");
        assert_eq!(first.performance_title, "Hamlet");
        assert!(summary.top_genres.is_empty());
    }

    #[test]
    fn year_cursor_steps_by_one() {
        let cursor = YearCursor::new(2024);
        assert_eq!(cursor.previous().year(), 2023);
        assert_eq!(cursor.next().next().year(), 2026);
    }
}

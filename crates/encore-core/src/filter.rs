//! Time windows and the multi-field ticket predicate.
//!
//! Everything here is a pure function of its inputs and an [`ArchiveClock`]
//! snapshot. Calendar comparisons (month, year, date bounds) happen in the
//! clock's UTC offset. A ticket without a performance time is treated as
//! happening "now", so it falls inside every window.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use crate::config::ArchiveConfig;
use crate::error::ValidationError;
use crate::model::ticket::{GenreCode, ParseEnumError, Ticket};

/// "Now", fixed for one evaluation, plus the calendar it is read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveClock {
    now: DateTime<FixedOffset>,
    recent_days: u32,
}

impl ArchiveClock {
    pub const DEFAULT_RECENT_DAYS: u32 = 7;

    #[must_use]
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: now.with_timezone(&offset),
            recent_days: Self::DEFAULT_RECENT_DAYS,
        }
    }

    #[must_use]
    pub const fn with_recent_days(mut self, days: u32) -> Self {
        self.recent_days = days;
        self
    }

    /// Build a clock from the `[archive]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured offset is invalid.
    pub fn from_config(now: DateTime<Utc>, config: &ArchiveConfig) -> anyhow::Result<Self> {
        Ok(Self::new(now, config.offset()?).with_recent_days(config.recent_days))
    }

    #[must_use]
    pub const fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    #[must_use]
    pub fn now_utc(&self) -> DateTime<Utc> {
        self.now.with_timezone(&Utc)
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        *self.now.offset()
    }

    #[must_use]
    pub const fn recent_days(&self) -> u32 {
        self.recent_days
    }

    /// Start of the recent window, `None` when it reaches past the
    /// representable calendar.
    #[must_use]
    pub fn recent_since(&self) -> Option<DateTime<FixedOffset>> {
        Duration::try_days(i64::from(self.recent_days))
            .and_then(|span| self.now.checked_sub_signed(span))
    }

    /// Performance time of `ticket` in local time, "now" when missing.
    #[must_use]
    pub fn performed_local(&self, ticket: &Ticket) -> DateTime<FixedOffset> {
        ticket
            .performed_at
            .map_or(self.now, |at| at.with_timezone(&self.offset()))
    }

    #[must_use]
    pub fn local_date(&self, ticket: &Ticket) -> NaiveDate {
        self.performed_local(ticket).date_naive()
    }
}

/// History tab filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Recent,
    ThisMonth,
    ThisYear,
}

impl TimeWindow {
    /// Tab order.
    pub const ALL: [Self; 4] = [Self::All, Self::Recent, Self::ThisMonth, Self::ThisYear];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Recent => "recent",
            Self::ThisMonth => "thisMonth",
            Self::ThisYear => "thisYear",
        }
    }

    /// Tab label shown to users.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "전체",
            Self::Recent => "최근 7일",
            Self::ThisMonth => "이번 달",
            Self::ThisYear => "올해",
        }
    }

    #[must_use]
    pub fn matches(self, ticket: &Ticket, clock: &ArchiveClock) -> bool {
        let now = clock.now();
        let performed = clock.performed_local(ticket);
        match self {
            Self::All => true,
            Self::Recent => clock.recent_since().is_none_or(|since| performed >= since),
            Self::ThisMonth => performed.year() == now.year() && performed.month() == now.month(),
            Self::ThisYear => performed.year() == now.year(),
        }
    }

    /// Tickets inside this window, in input order.
    #[must_use]
    pub fn apply<'a>(self, tickets: &'a [Ticket], clock: &ArchiveClock) -> Vec<&'a Ticket> {
        tickets.iter().filter(|t| self.matches(t, clock)).collect()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "all" => Ok(Self::All),
            "recent" | "recent7d" | "week" => Ok(Self::Recent),
            "thismonth" | "month" => Ok(Self::ThisMonth),
            "thisyear" | "year" => Ok(Self::ThisYear),
            _ => Err(ParseEnumError {
                expected: "time window",
                got: s.to_string(),
            }),
        }
    }
}

/// One history tab with its live count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTab {
    pub window: TimeWindow,
    pub label: &'static str,
    pub count: usize,
    pub active: bool,
}

/// Counts for every tab. The active tab's count is taken from `active_list`,
/// the list actually being shown.
fn tabs_for(
    tickets: &[Ticket],
    active: TimeWindow,
    active_list: usize,
    clock: &ArchiveClock,
) -> Vec<WindowTab> {
    TimeWindow::ALL
        .into_iter()
        .map(|window| {
            let count = if window == active {
                active_list
            } else {
                tickets.iter().filter(|t| window.matches(t, clock)).count()
            };
            WindowTab {
                window,
                label: window.label(),
                count,
                active: window == active,
            }
        })
        .collect()
}

/// Tab badges for the history view.
#[must_use]
pub fn window_tabs(tickets: &[Ticket], active: TimeWindow, clock: &ArchiveClock) -> Vec<WindowTab> {
    let shown = active.apply(tickets, clock).len();
    tabs_for(tickets, active, shown, clock)
}

/// What the history tab renders: the filtered list, newest first, and the
/// tab badges computed from that same list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    pub window: TimeWindow,
    pub tickets: Vec<Ticket>,
    pub tabs: Vec<WindowTab>,
}

impl HistoryView {
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tabs
            .iter()
            .find(|tab| tab.active)
            .map_or(0, |tab| tab.count)
    }
}

#[must_use]
pub fn history_view(tickets: &[Ticket], window: TimeWindow, clock: &ArchiveClock) -> HistoryView {
    let mut shown: Vec<Ticket> = window.apply(tickets, clock).into_iter().cloned().collect();
    shown.sort_by_key(|t| std::cmp::Reverse(t.performed_or_epoch()));
    let tabs = tabs_for(tickets, window, shown.len(), clock);
    HistoryView {
        window,
        tickets: shown,
        tabs,
    }
}

/// Parse an inclusive date bound. Blank input means "no bound".
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDate`] for anything but `YYYY-MM-DD`.
pub fn parse_date_bound(raw: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))
}

/// Search options. Unset fields do not constrain; set fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    window: TimeWindow,
    title: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    genre: Option<GenreCode>,
    venue: Option<String>,
    artist: Option<String>,
}

impl FilterCriteria {
    #[must_use]
    pub fn builder() -> FilterCriteriaBuilder {
        FilterCriteriaBuilder::default()
    }

    #[must_use]
    pub const fn window(&self) -> TimeWindow {
        self.window
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub const fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    #[must_use]
    pub const fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    #[must_use]
    pub const fn genre(&self) -> Option<GenreCode> {
        self.genre
    }

    #[must_use]
    pub fn venue(&self) -> Option<&str> {
        self.venue.as_deref()
    }

    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    /// True when no field constrains anything.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn matches(&self, ticket: &Ticket, clock: &ArchiveClock) -> bool {
        if !self.window.matches(ticket, clock) {
            return false;
        }

        let date = clock.local_date(ticket);
        if self.start_date.is_some_and(|start| date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| date > end) {
            return false;
        }

        if let Some(code) = self.genre
            && ticket.display_genre() != code.genre()
        {
            return false;
        }

        if let Some(title) = &self.title
            && !ticket.title.contains(title.as_str())
        {
            return false;
        }
        if let Some(venue) = &self.venue
            && !ticket
                .venue
                .as_deref()
                .is_some_and(|v| v.contains(venue.as_str()))
        {
            return false;
        }
        if let Some(artist) = &self.artist
            && !ticket.artist.contains(artist.as_str())
        {
            return false;
        }
        true
    }

    /// Matching tickets in input order.
    #[must_use]
    pub fn apply<'a>(&self, tickets: &'a [Ticket], clock: &ArchiveClock) -> Vec<&'a Ticket> {
        tickets.iter().filter(|t| self.matches(t, clock)).collect()
    }
}

/// Builder for [`FilterCriteria`]. Blank strings are stored as unset.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteriaBuilder {
    inner: FilterCriteria,
}

fn non_blank(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl FilterCriteriaBuilder {
    #[must_use]
    pub const fn window(mut self, window: TimeWindow) -> Self {
        self.inner.window = window;
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.inner.title = non_blank(title);
        self
    }

    #[must_use]
    pub const fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.inner.start_date = date;
        self
    }

    #[must_use]
    pub const fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.inner.end_date = date;
        self
    }

    /// Parse both bounds from `YYYY-MM-DD` text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDate`] for a malformed bound.
    pub fn date_range(self, start: &str, end: &str) -> Result<Self, ValidationError> {
        let start = parse_date_bound(start)?;
        let end = parse_date_bound(end)?;
        Ok(self.start_date(start).end_date(end))
    }

    #[must_use]
    pub const fn genre(mut self, genre: Option<GenreCode>) -> Self {
        self.inner.genre = genre;
        self
    }

    #[must_use]
    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.inner.venue = non_blank(venue);
        self
    }

    #[must_use]
    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.inner.artist = non_blank(artist);
        self
    }

    #[must_use]
    pub fn build(self) -> FilterCriteria {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ticket::Genre;
    use chrono::TimeZone;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).expect("valid offset")
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("valid time")
    }

    /// 2024-06-15 12:00 KST.
    fn clock() -> ArchiveClock {
        ArchiveClock::new(utc(2024, 6, 15, 3), kst())
    }

    fn ticket(id: &str, at: Option<DateTime<Utc>>) -> Ticket {
        Ticket {
            id: id.into(),
            user_id: "u1".into(),
            title: format!("Show {id}"),
            performed_at: at,
            ..Ticket::default()
        }
    }

    fn sample() -> Vec<Ticket> {
        vec![
            ticket("old", Some(utc(2023, 12, 31, 10))),
            ticket("jan", Some(utc(2024, 1, 10, 10))),
            ticket("early-june", Some(utc(2024, 6, 2, 10))),
            ticket("last-week", Some(utc(2024, 6, 12, 10))),
            ticket("undated", None),
        ]
    }

    // === windows ===

    #[test]
    fn windows_select_expected_tickets() {
        let tickets = sample();
        let ids = |w: TimeWindow| -> Vec<String> {
            w.apply(&tickets, &clock()).iter().map(|t| t.id.clone()).collect()
        };
        assert_eq!(ids(TimeWindow::All).len(), 5);
        assert_eq!(ids(TimeWindow::Recent), vec!["last-week", "undated"]);
        assert_eq!(
            ids(TimeWindow::ThisMonth),
            vec!["early-june", "last-week", "undated"]
        );
        assert_eq!(
            ids(TimeWindow::ThisYear),
            vec!["jan", "early-june", "last-week", "undated"]
        );
    }

    #[test]
    fn month_boundary_uses_local_calendar() {
        // 2024-05-31 20:00 UTC is already June 1st in KST.
        let t = ticket("edge", Some(utc(2024, 5, 31, 20)));
        assert!(TimeWindow::ThisMonth.matches(&t, &clock()));
        let utc_clock =
            ArchiveClock::new(utc(2024, 6, 15, 3), FixedOffset::east_opt(0).expect("utc"));
        assert!(!TimeWindow::ThisMonth.matches(&t, &utc_clock));
    }

    #[test]
    fn recent_window_follows_configured_days() {
        let t = ticket("two-weeks", Some(utc(2024, 6, 3, 10)));
        assert!(!TimeWindow::Recent.matches(&t, &clock()));
        assert!(TimeWindow::Recent.matches(&t, &clock().with_recent_days(14)));
    }

    #[test]
    fn huge_recent_window_has_no_lower_bound() {
        let huge = clock().with_recent_days(u32::MAX);
        assert_eq!(huge.recent_since(), None);
        let ancient = ticket("ancient", Some(utc(1900, 1, 1, 0)));
        assert!(TimeWindow::Recent.matches(&ancient, &huge));
        assert!(TimeWindow::Recent.matches(&ticket("undated", None), &huge));
    }

    #[test]
    fn window_names_parse_with_aliases() {
        assert_eq!("thisMonth".parse::<TimeWindow>(), Ok(TimeWindow::ThisMonth));
        assert_eq!("this-year".parse::<TimeWindow>(), Ok(TimeWindow::ThisYear));
        assert_eq!("recent7d".parse::<TimeWindow>(), Ok(TimeWindow::Recent));
        assert!("fortnight".parse::<TimeWindow>().is_err());
        assert_eq!(TimeWindow::Recent.label(), "최근 7일");
    }

    // === history view ===

    #[test]
    fn history_is_newest_first_and_count_matches_list() {
        let view = history_view(&sample(), TimeWindow::ThisYear, &clock());
        let ids: Vec<&str> = view.tickets.iter().map(|t| t.id.as_str()).collect();
        // Undated sorts by epoch, so it lands last even though it is "now".
        assert_eq!(ids, vec!["last-week", "early-june", "jan", "undated"]);
        assert_eq!(view.active_count(), view.tickets.len());
    }

    #[test]
    fn tabs_badge_every_window() {
        let tabs = window_tabs(&sample(), TimeWindow::Recent, &clock());
        let counts: Vec<(TimeWindow, usize, bool)> =
            tabs.iter().map(|t| (t.window, t.count, t.active)).collect();
        assert_eq!(
            counts,
            vec![
                (TimeWindow::All, 5, false),
                (TimeWindow::Recent, 2, true),
                (TimeWindow::ThisMonth, 3, false),
                (TimeWindow::ThisYear, 4, false),
            ]
        );
    }

    // === criteria ===

    #[test]
    fn blank_builder_fields_are_unset() {
        let criteria = FilterCriteria::builder()
            .title("  ")
            .venue("")
            .artist("\t")
            .build();
        assert!(criteria.is_unconstrained());
        assert_eq!(criteria.title(), None);
    }

    #[test]
    fn date_bounds_are_inclusive_calendar_dates() {
        let criteria = FilterCriteria::builder()
            .date_range("2024-01-10", "2024-06-02")
            .expect("valid dates")
            .build();
        let tickets = sample();
        let ids: Vec<&str> = criteria
            .apply(&tickets, &clock())
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["jan", "early-june"]);
    }

    #[test]
    fn malformed_date_bound_is_a_validation_error() {
        let err = FilterCriteria::builder()
            .date_range("2024/01/10", "")
            .expect_err("bad date");
        assert_eq!(err, ValidationError::InvalidDate("2024/01/10".into()));
        assert_eq!(parse_date_bound(" "), Ok(None));
    }

    #[test]
    fn text_fields_are_case_sensitive_substrings_and_anded() {
        let t = Ticket {
            title: "Hamlet Live".into(),
            artist: "The Players".into(),
            venue: Some("Seoul Arts Center".into()),
            genre: Some(Genre::Theater),
            ..ticket("h", Some(utc(2024, 6, 1, 10)))
        };
        let matches = |c: FilterCriteria| c.matches(&t, &clock());

        assert!(matches(FilterCriteria::builder().title("Hamlet").build()));
        assert!(!matches(FilterCriteria::builder().title("hamlet").build()));
        assert!(matches(FilterCriteria::builder().venue("Arts").artist("Players").build()));
        assert!(!matches(FilterCriteria::builder().venue("Arts").artist("Band").build()));
        assert!(matches(FilterCriteria::builder().genre(Some(GenreCode::Play)).build()));
        assert!(matches(FilterCriteria::builder().genre(Some(GenreCode::Musical)).build()));
        assert!(!matches(FilterCriteria::builder().genre(Some(GenreCode::Band)).build()));
    }

    #[test]
    fn venue_filter_excludes_tickets_without_venue() {
        let t = ticket("no-venue", Some(utc(2024, 6, 1, 10)));
        let criteria = FilterCriteria::builder().venue("Hall").build();
        assert!(!criteria.matches(&t, &clock()));
    }
}

//! Remote search: query assembly and result mapping.
//!
//! Filtering and ordering happen on the server. This module builds the query
//! object from [`FilterCriteria`] and maps the backend's own row schema
//! (`performanceTitle`, `viewDate`, `isPublic`, ...) into canonical
//! [`Ticket`]s. Results keep the server's order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::config::ImageConfig;
use crate::error::CoreError;
use crate::filter::{ArchiveClock, FilterCriteria};
use crate::model::ticket::{Genre, GenreCode, Review, Ticket, Visibility};
use crate::service::{SearchService, settle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Query object sent to [`SearchService::search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<GenreCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_title: Option<String>,
    pub sort_by: String,
    pub sort_direction: SortDirection,
}

impl SearchQuery {
    /// Newest performances first, the only order the archive asks for.
    #[must_use]
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self {
            start_date: criteria.start_date(),
            end_date: criteria.end_date(),
            genre: criteria.genre(),
            venue: criteria.venue().map(str::to_string),
            artist: criteria.artist().map(str::to_string),
            performance_title: criteria.title().map(str::to_string),
            sort_by: "viewDate".to_string(),
            sort_direction: SortDirection::Desc,
        }
    }
}

/// Row id as sent by the backend: numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One search row in the backend's schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSearchResult {
    pub id: Option<RawId>,
    pub user_id: Option<String>,
    pub performance_title: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub venue: Option<String>,
    pub seat: Option<String>,
    pub view_date: Option<String>,
    pub genre: Option<String>,
    pub is_public: Option<bool>,
    pub image_url: Option<String>,
    pub poster_url: Option<String>,
    pub review_text: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Turns a raw image reference into a display-ready URL.
pub trait ImageResolver {
    /// `None` when the reference cannot be displayed.
    fn resolve(&self, raw: &str) -> Option<String>;
}

/// Joins relative image paths onto a base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixResolver {
    base_url: Option<String>,
}

impl PrefixResolver {
    #[must_use]
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.filter(|b| !b.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(config.base_url.clone())
    }
}

const ABSOLUTE_PREFIXES: [&str; 4] = ["http://", "https://", "data:", "file://"];

impl ImageResolver for PrefixResolver {
    fn resolve(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if ABSOLUTE_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            return Some(raw.to_string());
        }
        match &self.base_url {
            Some(base) => Some(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                raw.trim_start_matches('/')
            )),
            None => Some(raw.to_string()),
        }
    }
}

/// Parse a backend timestamp: RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS`, or a
/// bare `YYYY-MM-DD`. Naive forms are read in the clock's offset.
#[must_use]
pub fn parse_timestamp(raw: &str, clock: &ArchiveClock) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    clock
        .offset()
        .from_local_datetime(&naive)
        .single()
        .map(|at| at.with_timezone(&Utc))
}

fn timestamp_or_now(raw: Option<&str>, clock: &ArchiveClock) -> DateTime<Utc> {
    raw.and_then(|r| parse_timestamp(r, clock))
        .unwrap_or_else(|| clock.now_utc())
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Map one backend row into a canonical ticket.
///
/// Rows without a usable id are dropped (`None`). Missing timestamps become
/// "now"; images that fail to resolve are skipped.
#[must_use]
pub fn map_result(
    raw: &RawSearchResult,
    requester: &str,
    resolver: &impl ImageResolver,
    clock: &ArchiveClock,
) -> Option<Ticket> {
    let id = raw.id.as_ref().map(ToString::to_string).unwrap_or_default();
    if id.is_empty() {
        debug!(title = ?raw.performance_title, "skipping search row without id");
        return None;
    }

    let images = [raw.image_url.as_deref(), raw.poster_url.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(|url| resolver.resolve(url))
        .collect();

    let created_at = timestamp_or_now(raw.created_at.as_deref(), clock);
    let review = non_empty(raw.review_text.as_ref()).map(|text| Review {
        review_text: text.to_string(),
        created_at,
        updated_at: None,
    });

    Some(Ticket {
        id,
        user_id: non_empty(raw.user_id.as_ref()).unwrap_or(requester).to_string(),
        title: non_empty(raw.performance_title.as_ref())
            .or_else(|| non_empty(raw.title.as_ref()))
            .unwrap_or_default()
            .to_string(),
        artist: raw.artist.clone().unwrap_or_default(),
        venue: raw.venue.clone().filter(|v| !v.is_empty()),
        seat: raw.seat.clone().unwrap_or_default(),
        performed_at: Some(timestamp_or_now(raw.view_date.as_deref(), clock)),
        genre: non_empty(raw.genre.as_ref()).map(Genre::from_code),
        status: Visibility::from_public_flag(raw.is_public.unwrap_or(false)),
        images,
        review,
        like_count: 0,
        is_liked: false,
        created_at,
        updated_at: timestamp_or_now(raw.updated_at.as_deref(), clock),
    })
}

/// Map every row, keeping server order.
#[must_use]
pub fn map_results(
    rows: &[RawSearchResult],
    requester: &str,
    resolver: &impl ImageResolver,
    clock: &ArchiveClock,
) -> Vec<Ticket> {
    rows.iter()
        .filter_map(|row| map_result(row, requester, resolver, clock))
        .collect()
}

/// Run a remote search for `user_id` and map the rows.
///
/// A blank user id yields no results and no call.
///
/// # Errors
///
/// Returns [`CoreError::Remote`] when the search call fails.
pub async fn search_tickets<S, R>(
    service: &S,
    resolver: &R,
    user_id: &str,
    criteria: &FilterCriteria,
    clock: &ArchiveClock,
) -> Result<Vec<Ticket>, CoreError>
where
    S: SearchService,
    R: ImageResolver,
{
    if user_id.trim().is_empty() {
        debug!("search skipped: no user id");
        return Ok(Vec::new());
    }

    let query = SearchQuery::from_criteria(criteria);
    let rows = settle("search tickets", service.search(user_id, &query).await)
        .inspect_err(|err| warn!(error = %err, "ticket search failed"))?
        .unwrap_or_default();

    let tickets = map_results(&rows, user_id, resolver, clock);
    debug!(rows = rows.len(), mapped = tickets.len(), "search mapped");
    Ok(tickets)
}

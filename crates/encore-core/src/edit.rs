//! Edit staging buffer.
//!
//! An [`EditOverlay`] holds only the fields the user has touched in the
//! current edit session. Reading a field goes through
//! [`EditOverlay::effective_value`]: the overlay value when present, the
//! canonical value otherwise. A missing overlay entry always means "defer to
//! the base", never "clear".
//!
//! The base ticket is never modified here. [`EditOverlay::flatten`] builds a
//! separate candidate record at commit time and is the only place validation
//! happens.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, ValidationError};
use crate::model::ticket::{Genre, Review, Ticket, TicketPatch, Visibility};

/// Fields a user can edit on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TicketField {
    Title,
    Artist,
    Venue,
    Seat,
    PerformedAt,
    Genre,
    Status,
    Images,
    ReviewText,
    ReviewCreatedAt,
}

impl TicketField {
    pub const ALL: [Self; 10] = [
        Self::Title,
        Self::Artist,
        Self::Venue,
        Self::Seat,
        Self::PerformedAt,
        Self::Genre,
        Self::Status,
        Self::Images,
        Self::ReviewText,
        Self::ReviewCreatedAt,
    ];

    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Artist => "artist",
            Self::Venue => "venue",
            Self::Seat => "seat",
            Self::PerformedAt => "performedAt",
            Self::Genre => "genre",
            Self::Status => "status",
            Self::Images => "images",
            Self::ReviewText => "review.reviewText",
            Self::ReviewCreatedAt => "review.createdAt",
        }
    }
}

impl fmt::Display for TicketField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed value for one [`TicketField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Title(String),
    Artist(String),
    Venue(String),
    Seat(String),
    PerformedAt(DateTime<Utc>),
    Genre(Genre),
    Status(Visibility),
    Images(Vec<String>),
    ReviewText(String),
    ReviewCreatedAt(DateTime<Utc>),
}

impl FieldValue {
    #[must_use]
    pub const fn field(&self) -> TicketField {
        match self {
            Self::Title(_) => TicketField::Title,
            Self::Artist(_) => TicketField::Artist,
            Self::Venue(_) => TicketField::Venue,
            Self::Seat(_) => TicketField::Seat,
            Self::PerformedAt(_) => TicketField::PerformedAt,
            Self::Genre(_) => TicketField::Genre,
            Self::Status(_) => TicketField::Status,
            Self::Images(_) => TicketField::Images,
            Self::ReviewText(_) => TicketField::ReviewText,
            Self::ReviewCreatedAt(_) => TicketField::ReviewCreatedAt,
        }
    }

    /// Current value of `field` on a canonical ticket, `None` when the
    /// ticket has nothing there (no venue, no review, ...).
    #[must_use]
    pub fn read(ticket: &Ticket, field: TicketField) -> Option<Self> {
        match field {
            TicketField::Title => Some(Self::Title(ticket.title.clone())),
            TicketField::Artist => Some(Self::Artist(ticket.artist.clone())),
            TicketField::Venue => ticket.venue.clone().map(Self::Venue),
            TicketField::Seat => Some(Self::Seat(ticket.seat.clone())),
            TicketField::PerformedAt => ticket.performed_at.map(Self::PerformedAt),
            TicketField::Genre => ticket.genre.clone().map(Self::Genre),
            TicketField::Status => Some(Self::Status(ticket.status)),
            TicketField::Images => Some(Self::Images(ticket.images.clone())),
            TicketField::ReviewText => ticket
                .review
                .as_ref()
                .map(|r| Self::ReviewText(r.review_text.clone())),
            TicketField::ReviewCreatedAt => {
                ticket.review.as_ref().map(|r| Self::ReviewCreatedAt(r.created_at))
            }
        }
    }

    /// Write a plain field onto `ticket`. Review parts are assembled by
    /// [`EditOverlay::flatten`] instead.
    fn write_plain(self, ticket: &mut Ticket) {
        match self {
            Self::Title(v) => ticket.title = v,
            Self::Artist(v) => ticket.artist = v,
            Self::Venue(v) => ticket.venue = Some(v),
            Self::Seat(v) => ticket.seat = v,
            Self::PerformedAt(v) => ticket.performed_at = Some(v),
            Self::Genre(v) => ticket.genre = Some(v),
            Self::Status(v) => ticket.status = v,
            Self::Images(v) => ticket.images = v,
            Self::ReviewText(_) | Self::ReviewCreatedAt(_) => {}
        }
    }
}

/// What a commit does with review text the user cleared to blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyReviewPolicy {
    /// Blank text edited in this session removes the review.
    #[default]
    Drop,
    /// Blank text is saved as an empty review.
    Keep,
}

/// Uncommitted field changes over a canonical ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOverlay {
    values: BTreeMap<TicketField, FieldValue>,
}

impl EditOverlay {
    /// Start an edit session. The overlay starts empty regardless of the base.
    #[must_use]
    pub fn begin() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn contains(&self, field: TicketField) -> bool {
        self.values.contains_key(&field)
    }

    /// Fields touched in this session, in field order.
    pub fn touched(&self) -> impl Iterator<Item = TicketField> + '_ {
        self.values.keys().copied()
    }

    /// Overlay value if present, else the base value.
    #[must_use]
    pub fn effective_value(&self, field: TicketField, base: &Ticket) -> Option<FieldValue> {
        self.values
            .get(&field)
            .cloned()
            .or_else(|| FieldValue::read(base, field))
    }

    /// Stage a value, returning the updated overlay.
    #[must_use]
    pub fn with_field(mut self, value: FieldValue) -> Self {
        self.set(value);
        self
    }

    /// Stage a value in place. The base ticket is not involved.
    pub fn set(&mut self, value: FieldValue) {
        self.values.insert(value.field(), value);
    }

    /// Forget everything staged in this session.
    pub fn discard(&mut self) {
        self.values.clear();
    }

    /// Effective performance time, if either side has one.
    #[must_use]
    pub fn effective_performed_at(&self, base: &Ticket) -> Option<DateTime<Utc>> {
        match self.effective_value(TicketField::PerformedAt, base) {
            Some(FieldValue::PerformedAt(at)) => Some(at),
            _ => None,
        }
    }

    /// Change the calendar date, keeping the effective time of day.
    pub fn set_performed_date(&mut self, base: &Ticket, date: NaiveDate, offset: FixedOffset) {
        let current = self
            .effective_performed_at(base)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&offset);
        self.set_local_performed_at(date, current.time(), offset);
    }

    /// Change the time of day, keeping the effective calendar date.
    pub fn set_performed_time(&mut self, base: &Ticket, time: NaiveTime, offset: FixedOffset) {
        let current = self
            .effective_performed_at(base)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&offset);
        self.set_local_performed_at(current.date_naive(), time, offset);
    }

    fn set_local_performed_at(&mut self, date: NaiveDate, time: NaiveTime, offset: FixedOffset) {
        if let Some(local) = offset.from_local_datetime(&date.and_time(time)).single() {
            self.set(FieldValue::PerformedAt(local.with_timezone(&Utc)));
        }
    }

    /// Build the full candidate record for a commit.
    ///
    /// Every staged value is applied uniformly onto a copy of `base`. The
    /// review is rebuilt from the effective text: absent text omits the
    /// review, present text carries the effective `created_at` (or `now`)
    /// and `updated_at = now`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTitle`] when the effective title is
    /// blank after trimming. Nothing else is validated.
    pub fn flatten(
        &self,
        base: &Ticket,
        now: DateTime<Utc>,
        policy: EmptyReviewPolicy,
    ) -> Result<Ticket, CoreError> {
        let mut candidate = base.clone();
        for value in self.values.values() {
            value.clone().write_plain(&mut candidate);
        }

        if candidate.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        candidate.review = self.resolve_review(base, now, policy);
        Ok(candidate)
    }

    /// Flatten and express the candidate as an update payload.
    ///
    /// # Errors
    ///
    /// Same as [`EditOverlay::flatten`].
    pub fn to_patch(
        &self,
        base: &Ticket,
        now: DateTime<Utc>,
        policy: EmptyReviewPolicy,
    ) -> Result<(Ticket, TicketPatch), CoreError> {
        let candidate = self.flatten(base, now, policy)?;
        let patch = TicketPatch::from_candidate(&candidate);
        Ok((candidate, patch))
    }

    fn resolve_review(
        &self,
        base: &Ticket,
        now: DateTime<Utc>,
        policy: EmptyReviewPolicy,
    ) -> Option<Review> {
        let Some(FieldValue::ReviewText(text)) =
            self.effective_value(TicketField::ReviewText, base)
        else {
            return None;
        };

        let cleared_here = self.contains(TicketField::ReviewText) && text.trim().is_empty();
        if cleared_here && policy == EmptyReviewPolicy::Drop {
            return None;
        }

        let created_at = match self.effective_value(TicketField::ReviewCreatedAt, base) {
            Some(FieldValue::ReviewCreatedAt(at)) => at,
            _ => now,
        };

        Some(Review {
            review_text: text,
            created_at,
            updated_at: Some(now),
        })
    }
}

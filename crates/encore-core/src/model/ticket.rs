use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Who can see a ticket's review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        }
    }

    /// Map the boolean "is public" flag used by the search backend.
    #[must_use]
    pub const fn from_public_flag(is_public: bool) -> Self {
        if is_public { Self::Public } else { Self::Private }
    }
}

/// Display genre of a performance.
///
/// Serialized as its label. Labels outside the known set are kept verbatim
/// in [`Genre::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Genre {
    #[default]
    Band,
    Theater,
    Other(String),
}

impl Genre {
    pub const BAND_LABEL: &'static str = "밴드";
    pub const THEATER_LABEL: &'static str = "연극/뮤지컬";

    /// The label shown to users and stored on the ticket.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Band => Self::BAND_LABEL,
            Self::Theater => Self::THEATER_LABEL,
            Self::Other(label) => label,
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            Self::BAND_LABEL => Self::Band,
            Self::THEATER_LABEL => Self::Theater,
            other => Self::Other(other.to_string()),
        }
    }

    /// Translate a search-backend genre code into a display genre.
    ///
    /// Known codes go through the fixed lookup table; anything else passes
    /// through unchanged.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        code.parse::<GenreCode>()
            .map_or_else(|_| Self::from_label(code), GenreCode::genre)
    }
}

impl From<String> for Genre {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<Genre> for String {
    fn from(genre: Genre) -> Self {
        match genre {
            Genre::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Genre codes understood by the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenreCode {
    Band,
    Musical,
    Play,
}

impl GenreCode {
    pub const ALL: [Self; 3] = [Self::Band, Self::Musical, Self::Play];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Band => "BAND",
            Self::Musical => "MUSICAL",
            Self::Play => "PLAY",
        }
    }

    /// Display genre for this code. Musicals and plays share one label.
    #[must_use]
    pub const fn genre(self) -> Genre {
        match self {
            Self::Band => Genre::Band,
            Self::Musical | Self::Play => Genre::Theater,
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for GenreCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

impl FromStr for Visibility {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "PUBLIC" => Ok(Self::Public),
            "PRIVATE" => Ok(Self::Private),
            _ => Err(ParseEnumError {
                expected: "visibility",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for GenreCode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "BAND" => Ok(Self::Band),
            "MUSICAL" => Ok(Self::Musical),
            "PLAY" => Ok(Self::Play),
            _ => Err(ParseEnumError {
                expected: "genre code",
                got: s.to_string(),
            }),
        }
    }
}

/// A user's written review of a performance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Like status of a ticket as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementState {
    pub is_liked: bool,
    pub like_count: u32,
}

/// Canonical, server-owned record of one attended performance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    #[serde(alias = "user_id")]
    pub user_id: String,
    pub title: String,
    pub artist: String,
    pub venue: Option<String>,
    pub seat: String,
    pub performed_at: Option<DateTime<Utc>>,
    pub genre: Option<Genre>,
    pub status: Visibility,
    pub images: Vec<String>,
    pub review: Option<Review>,
    pub like_count: u32,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Performance time used for ordering; a missing time sorts as the epoch.
    #[must_use]
    pub fn performed_or_epoch(&self) -> DateTime<Utc> {
        self.performed_at.unwrap_or(DateTime::UNIX_EPOCH)
    }

    #[must_use]
    pub const fn engagement(&self) -> EngagementState {
        EngagementState {
            is_liked: self.is_liked,
            like_count: self.like_count,
        }
    }

    /// Replace both engagement fields with a server snapshot.
    pub fn set_engagement(&mut self, state: EngagementState) {
        self.is_liked = state.is_liked;
        self.like_count = state.like_count;
    }

    /// Genre for display; tickets without one show as a band performance.
    #[must_use]
    pub fn display_genre(&self) -> Genre {
        self.genre.clone().unwrap_or_default()
    }
}

/// Update payload for the mutation service.
///
/// `None` fields are left untouched by the server. `review` is tri-state:
/// `None` leaves it, `Some(None)` removes it, `Some(Some(_))` replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub review: Option<Option<Review>>,
}

/// Distinguish an explicit `null` (`Some(None)`) from a missing key (`None`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TicketPatch {
    /// Every editable field of `candidate`, as sent on commit.
    #[must_use]
    pub fn from_candidate(candidate: &Ticket) -> Self {
        Self {
            title: Some(candidate.title.clone()),
            artist: Some(candidate.artist.clone()),
            venue: candidate.venue.clone(),
            seat: Some(candidate.seat.clone()),
            performed_at: candidate.performed_at,
            genre: candidate.genre.clone(),
            status: Some(candidate.status),
            images: Some(candidate.images.clone()),
            review: Some(candidate.review.clone()),
        }
    }

    #[must_use]
    pub fn visibility(status: Visibility) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.venue.is_none()
            && self.seat.is_none()
            && self.performed_at.is_none()
            && self.genre.is_none()
            && self.status.is_none()
            && self.images.is_none()
            && self.review.is_none()
    }

    /// Apply this patch to a copy of `base`. Identity and engagement fields
    /// are never touched.
    #[must_use]
    pub fn apply_to(&self, base: &Ticket) -> Ticket {
        let mut next = base.clone();
        if let Some(title) = &self.title {
            next.title.clone_from(title);
        }
        if let Some(artist) = &self.artist {
            next.artist.clone_from(artist);
        }
        if let Some(venue) = &self.venue {
            next.venue = Some(venue.clone());
        }
        if let Some(seat) = &self.seat {
            next.seat.clone_from(seat);
        }
        if let Some(at) = self.performed_at {
            next.performed_at = Some(at);
        }
        if let Some(genre) = &self.genre {
            next.genre = Some(genre.clone());
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(images) = &self.images {
            next.images.clone_from(images);
        }
        if let Some(review) = &self.review {
            next.review.clone_from(review);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 19, 30, 0).single().expect("valid date")
    }

    #[test]
    fn genre_serializes_as_label() {
        let json = serde_json::to_string(&Genre::Theater).expect("serialize");
        assert_eq!(json, "\"연극/뮤지컬\"");
        let back: Genre = serde_json::from_str("\"밴드\"").expect("deserialize");
        assert_eq!(back, Genre::Band);
    }

    #[test]
    fn unknown_genre_labels_round_trip_verbatim() {
        let genre: Genre = serde_json::from_str("\"클래식\"").expect("deserialize");
        assert_eq!(genre, Genre::Other("클래식".into()));
        assert_eq!(serde_json::to_string(&genre).expect("serialize"), "\"클래식\"");
    }

    #[test]
    fn genre_codes_map_through_lookup_table() {
        assert_eq!(Genre::from_code("BAND"), Genre::Band);
        assert_eq!(Genre::from_code("MUSICAL"), Genre::Theater);
        assert_eq!(Genre::from_code("PLAY"), Genre::Theater);
        assert_eq!(Genre::from_code("OPERA"), Genre::Other("OPERA".into()));
    }

    #[test]
    fn genre_code_parse_is_case_insensitive() {
        assert_eq!("musical".parse::<GenreCode>(), Ok(GenreCode::Musical));
        let err = "jazz".parse::<GenreCode>().expect_err("unknown code");
        assert_eq!(err.to_string(), "invalid genre code: 'jazz'");
    }

    #[test]
    fn visibility_from_public_flag() {
        assert_eq!(Visibility::from_public_flag(true), Visibility::Public);
        assert_eq!(Visibility::from_public_flag(false), Visibility::Private);
        assert_eq!("public".parse::<Visibility>(), Ok(Visibility::Public));
    }

    #[test]
    fn ticket_accepts_snake_case_owner_alias() {
        let ticket: Ticket = serde_json::from_str(
            r#"{"id":"t1","user_id":"u1","title":"Hamlet","status":"PUBLIC","likeCount":3}"#,
        )
        .expect("deserialize");
        assert_eq!(ticket.user_id, "u1");
        assert_eq!(ticket.status, Visibility::Public);
        assert_eq!(ticket.like_count, 3);
        assert_eq!(ticket.performed_at, None);
        assert_eq!(ticket.performed_or_epoch(), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn patch_review_is_tri_state_on_the_wire() {
        let keep = TicketPatch::visibility(Visibility::Public);
        let json = serde_json::to_value(&keep).expect("serialize");
        assert_eq!(json, serde_json::json!({ "status": "PUBLIC" }));

        let remove = TicketPatch {
            review: Some(None),
            ..TicketPatch::default()
        };
        let json = serde_json::to_string(&remove).expect("serialize");
        assert_eq!(json, r#"{"review":null}"#);
        let back: TicketPatch = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.review, Some(None));

        let missing: TicketPatch = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(missing.review, None);
        assert!(missing.is_empty());
    }

    #[test]
    fn patch_apply_leaves_identity_and_engagement_alone() {
        let base = Ticket {
            id: "t1".into(),
            user_id: "u1".into(),
            title: "Hamlet".into(),
            like_count: 4,
            is_liked: true,
            review: Some(Review {
                review_text: "great".into(),
                created_at: at(2024, 1, 1),
                updated_at: None,
            }),
            ..Ticket::default()
        };
        let patch = TicketPatch {
            title: Some("Macbeth".into()),
            performed_at: Some(at(2024, 2, 1)),
            review: Some(None),
            ..TicketPatch::default()
        };
        let next = patch.apply_to(&base);
        assert_eq!(next.id, "t1");
        assert_eq!(next.title, "Macbeth");
        assert_eq!(next.performed_at, Some(at(2024, 2, 1)));
        assert_eq!(next.review, None);
        assert_eq!(next.engagement(), base.engagement());
    }

    #[test]
    fn candidate_patch_round_trips_through_apply() {
        let candidate = Ticket {
            id: "t9".into(),
            title: "Les Mis".into(),
            artist: "Ensemble".into(),
            venue: Some("Blue Square".into()),
            seat: "B12".into(),
            performed_at: Some(at(2024, 3, 9)),
            genre: Some(Genre::Theater),
            status: Visibility::Public,
            images: vec!["a.jpg".into()],
            ..Ticket::default()
        };
        let applied = TicketPatch::from_candidate(&candidate).apply_to(&Ticket {
            id: "t9".into(),
            ..Ticket::default()
        });
        assert_eq!(applied, candidate);
    }
}

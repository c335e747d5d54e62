//! `enc edit <id>`: stage field changes on a ticket and save them.
//!
//! Runs the same detail session the archive view uses: the flags become an
//! edit overlay, which is validated, flattened and sent as one update.

use super::{CommandContext, local_minutes};
use crate::output::{CliError, pretty_kv, pretty_section, render_mode};
use clap::Args;
use chrono::{NaiveDate, NaiveTime};
use encore_core::edit::{FieldValue, TicketField};
use encore_core::session::{DetailSession, SessionSettings};
use encore_core::{CoreError, Genre, Ticket, ValidationError, Visibility};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// Ticket ID.
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub artist: Option<String>,

    #[arg(long)]
    pub venue: Option<String>,

    #[arg(long)]
    pub seat: Option<String>,

    /// Genre code (BAND, MUSICAL, PLAY) or a display label.
    #[arg(long)]
    pub genre: Option<String>,

    /// Review text. An empty string clears the review.
    #[arg(long)]
    pub review: Option<String>,

    /// Performance date (YYYY-MM-DD); keeps the time of day.
    #[arg(long)]
    pub date: Option<String>,

    /// Performance time (HH:MM, 24-hour); keeps the date.
    #[arg(long)]
    pub time: Option<String>,

    /// Review visibility: public or private.
    #[arg(long)]
    pub status: Option<Visibility>,
}

impl EditArgs {
    /// Plain field edits, in flag order.
    fn field_values(&self) -> Vec<FieldValue> {
        let mut values = Vec::new();
        if let Some(ref title) = self.title {
            values.push(FieldValue::Title(title.clone()));
        }
        if let Some(ref artist) = self.artist {
            values.push(FieldValue::Artist(artist.clone()));
        }
        if let Some(ref venue) = self.venue {
            values.push(FieldValue::Venue(venue.clone()));
        }
        if let Some(ref seat) = self.seat {
            values.push(FieldValue::Seat(seat.clone()));
        }
        if let Some(ref genre) = self.genre {
            values.push(FieldValue::Genre(parse_genre(genre)));
        }
        if let Some(status) = self.status {
            values.push(FieldValue::Status(status));
        }
        if let Some(ref review) = self.review {
            values.push(FieldValue::ReviewText(review.clone()));
        }
        values
    }

    fn has_changes(&self) -> bool {
        !self.field_values().is_empty() || self.date.is_some() || self.time.is_some()
    }
}

fn parse_genre(raw: &str) -> Genre {
    Genre::from_code(raw.trim())
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.trim().to_string()))
}

fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidTime(raw.trim().to_string()))
}

/// Stage every flag on `session`.
fn stage(session: &mut DetailSession, args: &EditArgs) -> Result<(), CoreError> {
    session.begin_edit()?;
    for value in args.field_values() {
        session.edit(value)?;
    }
    if let Some(ref date) = args.date {
        session.set_performed_date(parse_date(date)?)?;
    }
    if let Some(ref time) = args.time {
        session.set_performed_time(parse_time(time)?)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct EditOutput {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    pub seat: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_at: Option<String>,
    pub genre: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub changed: Vec<String>,
}

impl EditOutput {
    fn new(ticket: &Ticket, changed: Vec<String>, ctx: &CommandContext) -> Self {
        Self {
            id: ticket.id.clone(),
            title: ticket.title.clone(),
            artist: ticket.artist.clone(),
            venue: ticket.venue.clone(),
            seat: ticket.seat.clone(),
            performed_at: ticket
                .performed_at
                .map(|at| local_minutes(at, ctx.clock.offset())),
            genre: ticket.display_genre().label().to_string(),
            status: ticket.status.to_string(),
            review: ticket.review.as_ref().map(|r| r.review_text.clone()),
            changed,
        }
    }
}

/// Execute `enc edit <id>`.
///
/// # Errors
///
/// Returns an error when nothing was asked to change, the ticket is not
/// the user's, a value fails validation, or the save is rejected.
pub async fn run_edit(args: &EditArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    if !args.has_changes() {
        return Err(super::reject(
            ctx.output,
            &CliError::new("nothing to change")
                .with_suggestion("pass at least one field flag, e.g. --seat B7"),
        ));
    }

    let owner = ctx.require_user()?;
    let mut archive = ctx.load_archive(owner).await?;
    let settings = SessionSettings::from_config(&ctx.config)?;
    let Some(mut session) = archive.open_detail(&args.id, settings) else {
        return Err(ctx.not_found(&args.id));
    };

    stage(&mut session, args).map_err(|err| ctx.core_error(&err))?;
    let changed: Vec<String> = session
        .overlay()
        .touched()
        .map(TicketField::as_str)
        .map(str::to_string)
        .collect();

    let saved = session
        .save(&ctx.store, ctx.clock.now_utc())
        .await
        .map_err(|err| ctx.core_error(&err))?;
    archive.apply_saved(&saved);

    let out = EditOutput::new(&saved, changed, ctx);
    render_mode(ctx.output, &out, render_edit_text, render_edit_pretty)
}

fn render_edit_text(out: &EditOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "saved {}: {}", out.id, out.changed.join(","))
}

fn render_edit_pretty(out: &EditOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Saved {}", out.id))?;
    pretty_kv(w, "title", &out.title)?;
    if !out.artist.is_empty() {
        pretty_kv(w, "artist", &out.artist)?;
    }
    if let Some(ref venue) = out.venue {
        pretty_kv(w, "venue", venue)?;
    }
    pretty_kv(w, "seat", &out.seat)?;
    pretty_kv(w, "when", out.performed_at.as_deref().unwrap_or("unknown"))?;
    pretty_kv(w, "genre", &out.genre)?;
    pretty_kv(w, "status", &out.status)?;
    if let Some(ref review) = out.review {
        pretty_kv(w, "review", review)?;
    }
    pretty_kv(w, "changed", out.changed.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_accepts_codes_and_labels() {
        assert_eq!(parse_genre("band"), Genre::Band);
        assert_eq!(parse_genre("PLAY"), Genre::Theater);
        assert_eq!(parse_genre(Genre::THEATER_LABEL), Genre::Theater);
        assert_eq!(parse_genre(" 클래식 "), Genre::Other("클래식".into()));
    }

    #[test]
    fn time_and_date_reject_other_formats() {
        assert_eq!(
            parse_time("8pm"),
            Err(ValidationError::InvalidTime("8pm".into()))
        );
        assert_eq!(
            parse_date("2024/06/01"),
            Err(ValidationError::InvalidDate("2024/06/01".into()))
        );
        assert_eq!(parse_time("20:30").ok(), NaiveTime::from_hms_opt(20, 30, 0));
    }

    #[test]
    fn no_flags_means_no_changes() {
        let args = EditArgs {
            id: "t1".into(),
            ..EditArgs::default()
        };
        assert!(!args.has_changes());

        let args = EditArgs {
            id: "t1".into(),
            time: Some("19:00".into()),
            ..EditArgs::default()
        };
        assert!(args.has_changes());
    }

    #[test]
    fn empty_review_flag_is_staged_as_blank_text() {
        let args = EditArgs {
            id: "t1".into(),
            review: Some(String::new()),
            ..EditArgs::default()
        };
        assert_eq!(args.field_values(), vec![FieldValue::ReviewText(String::new())]);
    }

    #[test]
    fn visitors_cannot_stage_edits() {
        let ticket = Ticket {
            id: "t1".into(),
            user_id: "owner".into(),
            title: "Hamlet".into(),
            ..Ticket::default()
        };
        let mut session = DetailSession::open(ticket, Some("visitor"));
        let args = EditArgs {
            id: "t1".into(),
            seat: Some("B7".into()),
            ..EditArgs::default()
        };
        assert!(matches!(
            stage(&mut session, &args),
            Err(CoreError::InvalidTransition { .. })
        ));
    }
}

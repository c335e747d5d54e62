pub mod edit;
pub mod history;
pub mod like;
pub mod search;
pub mod visits;

use crate::output::{CliError, OutputMode, pretty_kv, render_error};
use crate::store::JsonFileStore;
use chrono::{DateTime, FixedOffset, Utc};
use encore_core::archive::ArchiveView;
use encore_core::config::EncoreConfig;
use encore_core::error::ErrorCode;
use encore_core::filter::ArchiveClock;
use encore_core::{CoreError, Ticket};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};

/// Everything a command needs, resolved once in `main`.
pub struct CommandContext {
    pub output: OutputMode,
    pub config: EncoreConfig,
    pub store: JsonFileStore,
    pub user: Option<String>,
    pub clock: ArchiveClock,
}

impl CommandContext {
    /// The acting user, or a rendered error when none was given.
    pub fn require_user(&self) -> anyhow::Result<&str> {
        self.user
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                reject(
                    self.output,
                    &CliError::new("no user given")
                        .with_suggestion("pass --user <id> or set ENCORE_USER"),
                )
            })
    }

    /// Load `owner`'s archive from the ticket file.
    pub async fn load_archive(&self, owner: &str) -> anyhow::Result<ArchiveView> {
        let mut archive = ArchiveView::new(Some(owner), Vec::new(), &self.clock);
        if !archive.refresh(&self.store).await {
            return Err(reject(
                self.output,
                &CliError::from_code(ErrorCode::RemoteFailure, "could not load tickets"),
            ));
        }
        Ok(archive)
    }

    pub fn not_found(&self, id: &str) -> anyhow::Error {
        reject(
            self.output,
            &CliError::from_code(ErrorCode::TicketNotFound, format!("ticket '{id}' not found")),
        )
    }

    pub fn core_error(&self, err: &CoreError) -> anyhow::Error {
        reject(self.output, &CliError::from(err))
    }
}

/// Render `error` to stderr and turn it into the command's failure.
pub fn reject(output: OutputMode, error: &CliError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, error) {
        return render_err;
    }
    anyhow::anyhow!("{}", error.message)
}

/// One ticket as listed by `history` and `search`.
#[derive(Debug, Serialize)]
pub struct TicketRow {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_at: Option<String>,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    pub genre: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit: Option<usize>,
    pub like_count: u32,
}

impl TicketRow {
    pub fn new(ticket: &Ticket, ordinals: &HashMap<String, usize>, offset: FixedOffset) -> Self {
        Self {
            id: ticket.id.clone(),
            title: ticket.title.clone(),
            performed_at: ticket.performed_at.map(|at| local_minutes(at, offset)),
            artist: ticket.artist.clone(),
            venue: ticket.venue.clone(),
            genre: ticket.display_genre().label().to_string(),
            status: ticket.status.to_string(),
            visit: ordinals.get(&ticket.id).copied(),
            like_count: ticket.like_count,
        }
    }

    pub fn write_text(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            self.id,
            self.performed_at.as_deref().unwrap_or("-"),
            self.title,
            self.visit.map_or_else(|| "-".to_string(), |n| format!("#{n}")),
            self.like_count
        )
    }

    pub fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        match self.visit {
            Some(n) if n > 1 => writeln!(w, "{}  (visit #{n})", self.title)?,
            _ => writeln!(w, "{}", self.title)?,
        }
        pretty_kv(w, "id", &self.id)?;
        pretty_kv(w, "when", self.performed_at.as_deref().unwrap_or("unknown"))?;
        if !self.artist.is_empty() {
            pretty_kv(w, "artist", &self.artist)?;
        }
        if let Some(ref venue) = self.venue {
            pretty_kv(w, "venue", venue)?;
        }
        pretty_kv(w, "genre", &self.genre)?;
        pretty_kv(w, "likes", self.like_count.to_string())
    }
}

/// `YYYY-MM-DD HH:MM` in the archive's offset.
pub fn local_minutes(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string()
}

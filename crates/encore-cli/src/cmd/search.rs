//! `enc search`: filter the user's archive.

use super::{CommandContext, TicketRow};
use crate::output::{pretty_rule, pretty_section, render_mode};
use clap::Args;
use encore_core::{CoreError, GenreCode, ValidationError};
use encore_core::filter::{FilterCriteria, TimeWindow};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Title substring (case-sensitive).
    #[arg(long)]
    pub title: Option<String>,

    /// Venue substring.
    #[arg(long)]
    pub venue: Option<String>,

    /// Artist substring.
    #[arg(long)]
    pub artist: Option<String>,

    /// Genre code: BAND, MUSICAL or PLAY.
    #[arg(long)]
    pub genre: Option<GenreCode>,

    /// First performance date to include (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,

    /// Last performance date to include (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<String>,

    /// Restrict to a history window as well.
    #[arg(short, long)]
    pub window: Option<TimeWindow>,
}

impl SearchArgs {
    fn criteria(&self) -> Result<FilterCriteria, ValidationError> {
        let builder = FilterCriteria::builder()
            .window(self.window.unwrap_or_default())
            .title(self.title.clone().unwrap_or_default())
            .venue(self.venue.clone().unwrap_or_default())
            .artist(self.artist.clone().unwrap_or_default())
            .genre(self.genre)
            .date_range(
                self.from.as_deref().unwrap_or_default(),
                self.to.as_deref().unwrap_or_default(),
            )?;
        Ok(builder.build())
    }
}

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub count: usize,
    pub tickets: Vec<TicketRow>,
}

/// Execute `enc search`.
///
/// # Errors
///
/// Returns an error for malformed dates, a missing user, unreadable tickets
/// or output rendering failures.
pub async fn run_search(args: &SearchArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let criteria = args
        .criteria()
        .map_err(|err| ctx.core_error(&CoreError::from(err)))?;
    let owner = ctx.require_user()?;
    let archive = ctx.load_archive(owner).await?;
    let ordinals = archive.ordinals();
    let offset = ctx.clock.offset();

    let mut matched = criteria.apply(archive.tickets().as_slice(), &ctx.clock);
    matched.sort_by_key(|t| std::cmp::Reverse(t.performed_or_epoch()));
    let out = SearchOutput {
        count: matched.len(),
        tickets: matched
            .into_iter()
            .map(|t| TicketRow::new(t, &ordinals, offset))
            .collect(),
    };

    render_mode(ctx.output, &out, render_search_text, render_search_pretty)
}

fn render_search_text(out: &SearchOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for row in &out.tickets {
        row.write_text(w)?;
    }
    Ok(())
}

fn render_search_pretty(out: &SearchOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("{} matching tickets", out.count))?;
    for (i, row) in out.tickets.iter().enumerate() {
        if i > 0 {
            pretty_rule(w)?;
        }
        row.write_pretty(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn blank_flags_leave_criteria_unconstrained() {
        let args = SearchArgs {
            title: Some("  ".into()),
            ..SearchArgs::default()
        };
        assert!(args.criteria().expect("valid").is_unconstrained());
    }

    #[test]
    fn dates_become_inclusive_bounds() {
        let args = SearchArgs {
            from: Some("2024-01-01".into()),
            to: Some("2024-03-31".into()),
            genre: Some(GenreCode::Musical),
            ..SearchArgs::default()
        };
        let criteria = args.criteria().expect("valid");
        assert_eq!(criteria.start_date(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(criteria.end_date(), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(criteria.genre(), Some(GenreCode::Musical));
    }

    #[test]
    fn malformed_date_is_a_validation_error() {
        let args = SearchArgs {
            from: Some("01/02/2024".into()),
            ..SearchArgs::default()
        };
        assert_eq!(
            args.criteria().expect_err("must fail"),
            ValidationError::InvalidDate("01/02/2024".into())
        );
    }
}

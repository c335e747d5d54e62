//! `enc visits <id>`: where a ticket falls among visits to the same show.

use super::{CommandContext, local_minutes};
use crate::output::{pretty_kv, pretty_section, render_mode};
use clap::Args;
use encore_core::ordinal::{resolve_ordinal, visit_group};
use encore_core::service::TicketSource;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct VisitsArgs {
    /// Ticket ID.
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct VisitRow {
    pub ordinal: usize,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VisitsOutput {
    pub id: String,
    pub title: String,
    pub ordinal: Option<usize>,
    pub visits: Vec<VisitRow>,
}

/// Execute `enc visits <id>`.
///
/// # Errors
///
/// Returns an error when the ticket does not exist or output rendering fails.
pub async fn run_visits(args: &VisitsArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let Some(ticket) = ctx.store.get_by_id(&args.id).await? else {
        return Err(ctx.not_found(&args.id));
    };
    let collection = ctx.store.list(&ticket.user_id).await?;
    let offset = ctx.clock.offset();

    let out = VisitsOutput {
        id: ticket.id.clone(),
        title: ticket.title.clone(),
        ordinal: resolve_ordinal(&ticket, &collection),
        visits: visit_group(&ticket, &collection)
            .into_iter()
            .enumerate()
            .map(|(i, t)| VisitRow {
                ordinal: i + 1,
                id: t.id.clone(),
                performed_at: t.performed_at.map(|at| local_minutes(at, offset)),
            })
            .collect(),
    };

    render_mode(ctx.output, &out, render_visits_text, render_visits_pretty)
}

fn render_visits_text(out: &VisitsOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for visit in &out.visits {
        let marker = if visit.id == out.id { "*" } else { "" };
        writeln!(
            w,
            "{marker}{}\t{}\t{}",
            visit.ordinal,
            visit.id,
            visit.performed_at.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

fn render_visits_pretty(out: &VisitsOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &out.title)?;
    if let Some(n) = out.ordinal {
        pretty_kv(w, "visit", format!("#{n} of {}", out.visits.len()))?;
    }
    for visit in &out.visits {
        let marker = if visit.id == out.id { "→" } else { " " };
        writeln!(
            w,
            "{marker} #{:<3} {:<16} {}",
            visit.ordinal,
            visit.performed_at.as_deref().unwrap_or("unknown date"),
            visit.id
        )?;
    }
    Ok(())
}

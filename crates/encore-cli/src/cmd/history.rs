//! `enc history`: the archive's history tab.

use super::{CommandContext, TicketRow};
use crate::output::{pretty_rule, pretty_section, render_mode};
use clap::Args;
use encore_core::filter::TimeWindow;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Time window: all, recent, thisMonth, thisYear.
    #[arg(short, long, default_value = "all")]
    pub window: TimeWindow,
}

#[derive(Debug, Serialize)]
pub struct TabOutput {
    pub window: &'static str,
    pub label: &'static str,
    pub count: usize,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    pub window: &'static str,
    pub tabs: Vec<TabOutput>,
    pub tickets: Vec<TicketRow>,
}

/// Execute `enc history`.
///
/// # Errors
///
/// Returns an error when no user is given, the tickets cannot be loaded or
/// output rendering fails.
pub async fn run_history(args: &HistoryArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let owner = ctx.require_user()?;
    let mut archive = ctx.load_archive(owner).await?;
    archive.select_window(args.window);

    let view = archive.history(&ctx.clock);
    let ordinals = archive.ordinals();
    let offset = ctx.clock.offset();
    let out = HistoryOutput {
        window: view.window.as_str(),
        tabs: view
            .tabs
            .iter()
            .map(|tab| TabOutput {
                window: tab.window.as_str(),
                label: tab.label,
                count: tab.count,
                active: tab.active,
            })
            .collect(),
        tickets: view
            .tickets
            .iter()
            .map(|t| TicketRow::new(t, &ordinals, offset))
            .collect(),
    };

    render_mode(ctx.output, &out, render_history_text, render_history_pretty)
}

fn render_history_text(out: &HistoryOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let tabs: Vec<String> = out
        .tabs
        .iter()
        .map(|tab| {
            let marker = if tab.active { "*" } else { "" };
            format!("{marker}{}={}", tab.window, tab.count)
        })
        .collect();
    writeln!(w, "{}", tabs.join(" "))?;
    for row in &out.tickets {
        row.write_text(w)?;
    }
    Ok(())
}

fn render_history_pretty(out: &HistoryOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let tabs: Vec<String> = out
        .tabs
        .iter()
        .map(|tab| {
            if tab.active {
                format!("[{} {}]", tab.label, tab.count)
            } else {
                format!("{} {}", tab.label, tab.count)
            }
        })
        .collect();
    pretty_section(w, &tabs.join("  "))?;
    if out.tickets.is_empty() {
        writeln!(w, "No tickets in this window.")?;
    }
    for (i, row) in out.tickets.iter().enumerate() {
        if i > 0 {
            pretty_rule(w)?;
        }
        row.write_pretty(w)?;
    }
    Ok(())
}

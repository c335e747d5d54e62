//! `enc like <id>`: toggle the acting user's like on a ticket.

use super::CommandContext;
use crate::output::{CliError, pretty_kv, pretty_section, render_mode};
use clap::Args;
use encore_core::collection::LocalTicket;
use encore_core::engagement::EngagementMutator;
use encore_core::error::ErrorCode;
use encore_core::service::TicketSource;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct LikeArgs {
    /// Ticket ID.
    pub id: String,

    /// Also list who likes the ticket afterwards.
    #[arg(long)]
    pub who: bool,
}

#[derive(Debug, Serialize)]
pub struct LikeOutput {
    pub id: String,
    pub is_liked: bool,
    pub like_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by: Option<Vec<String>>,
}

/// Execute `enc like <id>`.
///
/// # Errors
///
/// Returns an error when no user is given, the ticket does not exist, the
/// toggle is refused, or output rendering fails.
pub async fn run_like(args: &LikeArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let user = ctx.require_user()?;
    let Some(ticket) = ctx.store.get_by_id(&args.id).await? else {
        return Err(ctx.not_found(&args.id));
    };

    let local = LocalTicket::new(ticket);
    let likes = EngagementMutator::from_config(&ctx.config.engagement);
    let Some(state) = likes.toggle_like(&ctx.store, &local, user).await else {
        return Err(super::reject(
            ctx.output,
            &CliError::from_code(ErrorCode::RemoteFailure, "like toggle failed"),
        ));
    };

    let liked_by = if args.who {
        let users = likes
            .liked_users(&ctx.store, &args.id, user)
            .await
            .map_err(|err| ctx.core_error(&err))?;
        Some(users)
    } else {
        None
    };

    let out = LikeOutput {
        id: args.id.clone(),
        is_liked: state.is_liked,
        like_count: state.like_count,
        liked_by,
    };
    render_mode(ctx.output, &out, render_like_text, render_like_pretty)
}

fn render_like_text(out: &LikeOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let verb = if out.is_liked { "liked" } else { "unliked" };
    writeln!(w, "{verb} {} ({})", out.id, out.like_count)?;
    if let Some(ref users) = out.liked_by {
        for user in users {
            writeln!(w, "{user}")?;
        }
    }
    Ok(())
}

fn render_like_pretty(out: &LikeOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let heart = if out.is_liked { "♥" } else { "♡" };
    pretty_section(w, &format!("{heart} {}", out.id))?;
    pretty_kv(w, "likes", out.like_count.to_string())?;
    if let Some(ref users) = out.liked_by {
        pretty_kv(w, "liked by", users.join(", "))?;
    }
    Ok(())
}

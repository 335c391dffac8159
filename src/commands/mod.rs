//! Command surface over the lifecycle engine
//!
//! Thin translation layer: every per-ticket command operates on the
//! ticket bound to the channel it was issued in and returns a short
//! acknowledgment line. All guard evaluation lives in the engine; this
//! module only routes and phrases.

use std::future::Future;

use crate::core::{ChannelId, Domain, UserId};
use crate::engine::{IndexCloseOutcome, LifecycleEngine};
use crate::error::Result;
use crate::integration::{ChannelHost, Notification};

/// A per-ticket command issued from inside a ticket channel
#[derive(Debug, Clone)]
pub enum TicketCommand {
    /// Take responsibility for the ticket
    Claim,
    /// Release a held claim
    Unclaim,
    /// Close the ticket, with an optional reason (recorded for support)
    Close {
        /// Close reason, recorded in the transcript
        reason: Option<String>,
    },
    /// Hand the claim to another staff member (trade only)
    Transfer {
        /// The new claimer
        to: UserId,
    },
    /// Rename the ticket channel
    Rename {
        /// New channel name
        name: String,
    },
    /// Grant an additional user access to the channel
    AddParticipant {
        /// The user to add
        user: UserId,
    },
}

/// Where and by whom a command was issued
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    /// The channel the command was issued in
    pub channel: ChannelId,
    /// The issuing user
    pub actor: UserId,
}

/// Routes a command to the engine and phrases the acknowledgment
///
/// `confirm` supplies the secondary confirmation future and is invoked
/// only when closing an index-service ticket; every other command
/// resolves without it.
pub async fn dispatch<F, Fut>(
    engine: &LifecycleEngine,
    ctx: CommandContext,
    command: TicketCommand,
    confirm: F,
) -> Result<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = bool> + Send,
{
    match command {
        TicketCommand::Claim => {
            engine.claim(ctx.channel, ctx.actor).await?;
            Ok("You claimed this ticket".to_string())
        },
        TicketCommand::Unclaim => {
            engine.unclaim(ctx.channel, ctx.actor).await?;
            Ok("Claim released".to_string())
        },
        TicketCommand::Close { reason } => {
            let domain = engine.ticket(ctx.channel)?.domain();
            if domain == Domain::IndexService {
                let outcome = engine
                    .close_index(ctx.channel, ctx.actor, reason.as_deref(), confirm())
                    .await?;
                Ok(match outcome {
                    IndexCloseOutcome::Closed => {
                        "Ticket closed; this channel will be removed shortly".to_string()
                    },
                    IndexCloseOutcome::Declined => "Close cancelled".to_string(),
                    IndexCloseOutcome::TimedOut => {
                        "Close confirmation timed out; the ticket stays open".to_string()
                    },
                })
            } else {
                engine.close(ctx.channel, ctx.actor, reason.as_deref()).await?;
                Ok("Ticket closed; this channel will be removed shortly".to_string())
            }
        },
        TicketCommand::Transfer { to } => {
            engine.transfer(ctx.channel, ctx.actor, to).await?;
            Ok("Ticket transferred".to_string())
        },
        TicketCommand::Rename { name } => {
            engine.rename(ctx.channel, ctx.actor, &name).await?;
            Ok(format!("Channel renamed to {name}"))
        },
        TicketCommand::AddParticipant { user } => {
            engine.add_participant(ctx.channel, ctx.actor, user).await?;
            Ok("User added to the ticket".to_string())
        },
    }
}

/// Static entry-panel text for a domain
#[must_use]
pub const fn panel_text(domain: Domain) -> &'static str {
    match domain {
        Domain::Trade => {
            "**Trade Tickets**\n\
             Open a ticket to have a staff member broker your trade.\n\
             Pick the tier matching the combined value of the trade:\n\
             Small, Big, or Massive."
        },
        Domain::Support => {
            "**Support Tickets**\n\
             Questions, scam reports, appeals, staff reports, trade \
             issues, or anything else. A staff member will be with you \
             shortly after you open a ticket."
        },
        Domain::IndexService => {
            "**Index Service**\n\
             Request an index build: Rainbow, Candy, Radioactive, \
             Yinyang, Galaxy, Gold, or Diamond. An indexer will claim \
             your ticket when available."
        },
    }
}

/// Posts a domain entry panel to the given channel
pub async fn post_panel(
    host: &dyn ChannelHost,
    domain: Domain,
    channel: ChannelId,
) -> Result<()> {
    host.send_notification(channel, Notification::text(panel_text(domain)))
        .await
}

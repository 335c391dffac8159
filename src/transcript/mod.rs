//! Transcript archival
//!
//! On close, the full ordered message history of a ticket's channel is
//! rendered into a deterministic plain-text record and handed to the
//! notification collaborator as an attachment plus a structured summary.
//! Archival is best-effort: a failure is reported to the caller (which
//! logs it and surfaces it to the operator channel) but never blocks the
//! close transition.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::core::{ChannelId, DomainData, Ticket, UserId};
use crate::error::{DeskError, Result};
use crate::integration::{name_or_id, ChannelHost, Message, Notification, Roster};

const RULE: &str = "------------------------------------------------------------";
const FOOTER: &str = "End of transcript";

/// Assembles and delivers ticket transcripts
pub struct TranscriptArchiver {
    host: Arc<dyn ChannelHost>,
    roster: Arc<dyn Roster>,
    transcript_channel: ChannelId,
}

impl TranscriptArchiver {
    /// Creates an archiver delivering to the given transcript channel
    pub fn new(
        host: Arc<dyn ChannelHost>,
        roster: Arc<dyn Roster>,
        transcript_channel: ChannelId,
    ) -> Self {
        Self {
            host,
            roster,
            transcript_channel,
        }
    }

    /// Fetches history, renders the transcript, and delivers it
    ///
    /// Returns the rendered text on success. Any failure along the way
    /// maps to [`DeskError::Archival`] with the failing step named.
    pub async fn archive(
        &self,
        ticket: &Ticket,
        closed_by: UserId,
        close_reason: Option<&str>,
        closed_at: DateTime<Utc>,
    ) -> Result<String> {
        let history = self
            .host
            .fetch_history(ticket.channel)
            .await
            .map_err(|e| DeskError::archival(format!("history fetch failed: {e}")))?;

        let owner_name = name_or_id(self.roster.as_ref(), ticket.owner);
        let claimer_name = ticket
            .claimed_by
            .map(|claimer| name_or_id(self.roster.as_ref(), claimer));
        let closer_name = name_or_id(self.roster.as_ref(), closed_by);

        let text = render_transcript(
            ticket,
            &history,
            &owner_name,
            claimer_name.as_deref(),
            &closer_name,
            close_reason,
            closed_at,
        );
        let summary = render_summary(
            ticket,
            history.len(),
            &owner_name,
            claimer_name.as_deref(),
            &closer_name,
            close_reason,
        );

        let filename = format!("transcript-{}.txt", ticket.channel);
        self.host
            .send_notification(
                self.transcript_channel,
                Notification::text(summary).with_attachment(filename, text.clone()),
            )
            .await
            .map_err(|e| DeskError::archival(format!("transcript dispatch failed: {e}")))?;

        Ok(text)
    }
}

/// Renders the plain-text transcript body
///
/// Deterministic given its inputs: metadata header, one line per message
/// with attachments and embeds summarized inline, fixed footer.
#[must_use]
pub fn render_transcript(
    ticket: &Ticket,
    history: &[Message],
    owner_name: &str,
    claimer_name: Option<&str>,
    closer_name: &str,
    close_reason: Option<&str>,
    closed_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ticket Transcript — channel {}", ticket.channel);
    let _ = writeln!(out, "Opened By   : {} ({})", owner_name, ticket.owner);
    let _ = writeln!(out, "Claimed By  : {}", claimer_name.unwrap_or("Unclaimed"));
    let _ = writeln!(out, "Closed By   : {closer_name}");
    let _ = writeln!(
        out,
        "Domain      : {} — {}",
        ticket.domain(),
        ticket.data.subtype_label()
    );
    match &ticket.data {
        DomainData::Trade { declared_value, .. } => {
            let _ = writeln!(out, "Trade Value : {declared_value}");
        },
        DomainData::Support { .. } => {
            let _ = writeln!(
                out,
                "Close Reason: {}",
                close_reason.unwrap_or("not given")
            );
        },
        DomainData::Index { platform_user, .. } => {
            let _ = writeln!(out, "Platform    : {platform_user}");
        },
    }
    let _ = writeln!(out, "Messages    : {}", history.len());
    let _ = writeln!(
        out,
        "Closed At   : {} UTC",
        closed_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    for message in history {
        let mut line = format!(
            "[{}] {} ({}): {}",
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            message.author_name,
            message.author,
            message.content
        );
        if !message.attachments.is_empty() {
            let _ = write!(line, " [Attachments: {}]", message.attachments.join(" | "));
        }
        if message.embed_count > 0 {
            let _ = write!(line, " [+{} embed(s)]", message.embed_count);
        }
        let _ = writeln!(out, "{line}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{FOOTER}");
    out
}

/// Renders the structured summary accompanying the attachment
fn render_summary(
    ticket: &Ticket,
    message_count: usize,
    owner_name: &str,
    claimer_name: Option<&str>,
    closer_name: &str,
    close_reason: Option<&str>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Transcript for channel {} ({} — {})",
        ticket.channel,
        ticket.domain(),
        ticket.data.subtype_label()
    );
    let _ = writeln!(out, "Opened by: {owner_name}");
    let _ = writeln!(out, "Claimed by: {}", claimer_name.unwrap_or("Unclaimed"));
    let _ = writeln!(out, "Closed by: {closer_name}");
    if let Some(reason) = close_reason {
        let _ = writeln!(out, "Close reason: {reason}");
    }
    let _ = write!(out, "Messages: {message_count}");
    out
}

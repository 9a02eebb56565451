//! Partner reports: counting, blocking and teardown.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::protocol::{LeaveReason, ParticipantId, ServerMessage};

use super::{CoordinatorState, Outbox, ReportOutcome};

/// Running report counts per reported participant.
///
/// Entries outlive the reported participant's connection; counts are kept for
/// the lifetime of the process.
#[derive(Debug, Default)]
pub struct ModerationLedger {
    report_counts: HashMap<ParticipantId, u64>,
    total_reports: u64,
}

impl ModerationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report and return the reported participant's new count.
    pub fn record_report(&mut self, reported: ParticipantId) -> u64 {
        self.total_reports = self.total_reports.saturating_add(1);
        let count = self.report_counts.entry(reported).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn report_count(&self, id: &ParticipantId) -> u64 {
        self.report_counts.get(id).copied().unwrap_or(0)
    }

    pub fn total_reports(&self) -> u64 {
        self.total_reports
    }
}

impl CoordinatorState {
    /// Report the current partner.
    ///
    /// The partner's count goes up, the reporter blocks them, and the room is
    /// torn down with reason `reported`. The reporter is not re-queued.
    /// Returns `None` when the reporter has no room.
    pub fn report(
        &mut self,
        reporter: &ParticipantId,
        now: DateTime<Utc>,
        out: &mut Outbox,
    ) -> Option<ReportOutcome> {
        let room_id = self.registry.room_of(reporter)?;
        let Some(reported) = self.rooms.get(&room_id).and_then(|room| room.partner_of(reporter)) else {
            warn!(participant_id = %reporter, room_id = %room_id, "Report against a room without partner");
            return None;
        };

        let report_count = self.ledger.record_report(reported);
        self.registry.block(reporter, reported);

        let closed = self.leave_room(reporter, LeaveReason::Reported, now, out)?;
        out.push(*reporter, ServerMessage::ReportConfirmed);

        info!(
            reporter = %reporter,
            reported = %reported,
            report_count,
            "Participant reported"
        );

        Some(ReportOutcome {
            reported,
            report_count,
            closed,
        })
    }
}

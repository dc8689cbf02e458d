//! Server selection.
//!
//! Stands in for the full "best master clock" algorithm: only the priority1
//! byte of Announce messages is evaluated, lower numeric value winning. The
//! selected server's priority is degraded by one notch on every scheduler
//! tick and restored by each of its Announces, so a server that falls silent
//! is eventually out-prioritized by a live backup. Servers should announce
//! at least every ten seconds (or leave guard space between priority values)
//! to keep the selection stable.
//!
//! Two servers sharing a priority1 value are not disambiguated; the first
//! one observed stays selected.

use crate::protocol::ClockId;

/// The currently tracked server.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SelectedServer {
    pub(crate) id: ClockId,
    /// Announced priority, degraded by aging.
    pub(crate) priority1: u8,
}

/// What an Announce did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnnounceOutcome {
    /// The selected server re-announced; its priority was restored.
    Refreshed,
    /// A better server took over the selection.
    Switched,
    /// The Announce lost against the current selection.
    Ignored,
}

#[derive(Debug, Default)]
pub(crate) struct ServerSelector {
    selected: Option<SelectedServer>,
}

impl ServerSelector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Evaluate an Announce. The first Announce always wins.
    pub(crate) fn on_announce(&mut self, sender: ClockId, priority1: u8) -> AnnounceOutcome {
        match &mut self.selected {
            Some(server) if server.id == sender => {
                // Restore the aged priority; the admin may also have
                // reconfigured it.
                server.priority1 = priority1;
                AnnounceOutcome::Refreshed
            }
            Some(server) if priority1 < server.priority1 => {
                *server = SelectedServer {
                    id: sender,
                    priority1,
                };
                AnnounceOutcome::Switched
            }
            Some(_) => AnnounceOutcome::Ignored,
            None => {
                self.selected = Some(SelectedServer {
                    id: sender,
                    priority1,
                });
                AnnounceOutcome::Switched
            }
        }
    }

    /// Aging step: degrade the selected server by one priority notch,
    /// saturating at the worst value.
    pub(crate) fn age(&mut self) {
        if let Some(server) = &mut self.selected {
            server.priority1 = server.priority1.saturating_add(1);
        }
    }

    pub(crate) fn selected(&self) -> Option<&SelectedServer> {
        self.selected.as_ref()
    }

    pub(crate) fn is_selected(&self, id: ClockId) -> bool {
        self.selected.as_ref().is_some_and(|server| server.id == id)
    }
}

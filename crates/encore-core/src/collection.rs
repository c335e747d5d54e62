//! Canonical ticket holders.
//!
//! [`TicketCollection`] is the list every derived view reads from.
//! [`LocalTicket`] is the snapshot a detail session renders and the
//! engagement mutator updates. Both only ever replace whole records.

use std::cell::RefCell;

use crate::model::ticket::{EngagementState, Ticket};

/// The user's canonical tickets in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketCollection {
    tickets: Vec<Ticket>,
}

impl TicketCollection {
    #[must_use]
    pub const fn new(tickets: Vec<Ticket>) -> Self {
        Self { tickets }
    }

    /// Prefer the freshly fetched list; fall back to the locally held one
    /// while the remote list is still empty.
    #[must_use]
    pub fn from_sources(remote: Vec<Ticket>, local: Vec<Ticket>) -> Self {
        if remote.is_empty() {
            Self::new(local)
        } else {
            Self::new(remote)
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    /// Swap in a new version of an existing record, in place.
    ///
    /// Returns `false` (and changes nothing) when no record has that id, so a
    /// late response cannot resurrect a removed ticket.
    pub fn replace(&mut self, ticket: Ticket) -> bool {
        match self.tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(slot) => {
                *slot = ticket;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Ticket> {
        let index = self.tickets.iter().position(|t| t.id == id)?;
        Some(self.tickets.remove(index))
    }

    /// Replace the whole list, e.g. after a re-fetch.
    pub fn reset(&mut self, tickets: Vec<Ticket>) {
        self.tickets = tickets;
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Ticket> {
        self.tickets
    }
}

impl From<Vec<Ticket>> for TicketCollection {
    fn from(tickets: Vec<Ticket>) -> Self {
        Self::new(tickets)
    }
}

/// The ticket snapshot held by an open detail view.
///
/// Shared (via `Rc`) between the session and any in-flight like toggles.
/// Borrows are never held across an `.await`.
#[derive(Debug)]
pub struct LocalTicket {
    inner: RefCell<Ticket>,
}

impl LocalTicket {
    #[must_use]
    pub const fn new(ticket: Ticket) -> Self {
        Self {
            inner: RefCell::new(ticket),
        }
    }

    #[must_use]
    pub fn id(&self) -> String {
        self.inner.borrow().id.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> Ticket {
        self.inner.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&Ticket) -> R) -> R {
        f(&self.inner.borrow())
    }

    #[must_use]
    pub fn engagement(&self) -> EngagementState {
        self.inner.borrow().engagement()
    }

    /// Replace the whole record at once; returns the previous one.
    pub fn replace(&self, ticket: Ticket) -> Ticket {
        self.inner.replace(ticket)
    }

    /// Apply a server engagement snapshot if this still holds `ticket_id`.
    pub fn apply_engagement(&self, ticket_id: &str, state: EngagementState) -> bool {
        let mut ticket = self.inner.borrow_mut();
        if ticket.id != ticket_id {
            return false;
        }
        ticket.set_engagement(state);
        true
    }
}

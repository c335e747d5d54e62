//! "Nth visit" ordinals.
//!
//! A visit group is every ticket sharing a title and an owner. Matching is
//! exact: case-sensitive and untrimmed. Within a group tickets are ordered
//! by performance time, oldest first, with a missing time sorting as the
//! Unix epoch. The sort is stable, so ties keep collection order and the
//! result is deterministic for a given collection.

use std::collections::HashMap;

use crate::model::ticket::Ticket;

/// Tickets sharing `ticket`'s title and owner, oldest first.
///
/// `ticket` itself is included only if it is part of `collection`.
#[must_use]
pub fn visit_group<'a>(ticket: &Ticket, collection: &'a [Ticket]) -> Vec<&'a Ticket> {
    let mut group: Vec<&Ticket> = collection
        .iter()
        .filter(|t| t.title == ticket.title && t.user_id == ticket.user_id)
        .collect();
    group.sort_by_key(|t| t.performed_or_epoch());
    group
}

/// 1-based position of `ticket` within its visit group, matched by id.
///
/// `None` when the ticket is not in `collection`.
#[must_use]
pub fn resolve_ordinal(ticket: &Ticket, collection: &[Ticket]) -> Option<usize> {
    visit_group(ticket, collection)
        .iter()
        .position(|t| t.id == ticket.id)
        .map(|index| index + 1)
}

/// Ordinal of every ticket in `collection`, keyed by id.
///
/// Gives the same answer as calling [`resolve_ordinal`] per ticket. When an
/// id appears more than once, its first occurrence in `collection` decides.
#[must_use]
pub fn visit_ordinals(collection: &[Ticket]) -> HashMap<String, usize> {
    let mut groups: HashMap<(&str, &str), Vec<&Ticket>> = HashMap::new();
    for ticket in collection {
        groups
            .entry(group_key(ticket))
            .or_default()
            .push(ticket);
    }

    let positions: HashMap<(&str, &str), HashMap<&str, usize>> = groups
        .into_iter()
        .map(|(key, mut group)| {
            group.sort_by_key(|t| t.performed_or_epoch());
            let mut by_id = HashMap::with_capacity(group.len());
            for (index, ticket) in group.into_iter().enumerate() {
                by_id.entry(ticket.id.as_str()).or_insert(index + 1);
            }
            (key, by_id)
        })
        .collect();

    let mut ordinals = HashMap::with_capacity(collection.len());
    for ticket in collection {
        let ordinal = positions
            .get(&group_key(ticket))
            .and_then(|by_id| by_id.get(ticket.id.as_str()));
        if let Some(&ordinal) = ordinal {
            ordinals.entry(ticket.id.clone()).or_insert(ordinal);
        }
    }
    ordinals
}

fn group_key(ticket: &Ticket) -> (&str, &str) {
    (ticket.title.as_str(), ticket.user_id.as_str())
}

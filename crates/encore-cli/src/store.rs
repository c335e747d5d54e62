//! File-backed ticket backend.
//!
//! The file is either a bare JSON array of tickets or a document
//! `{ "tickets": [...], "likes": { "<ticket id>": ["<user id>", ...] } }`.
//! Every successful mutation rewrites the whole file; the bare form is kept
//! for as long as nobody has liked anything.

use anyhow::{Context, Result};
use chrono::Utc;
use encore_core::service::{
    EngagementService, LikeToggle, LikedUsers, ServiceResponse, TicketMutations, TicketSource,
};
use encore_core::{Ticket, TicketPatch, Visibility};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    tickets: Vec<Ticket>,
    #[serde(default)]
    likes: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Bare(Vec<Ticket>),
    Document(StoreDocument),
}

impl From<OnDisk> for StoreDocument {
    fn from(value: OnDisk) -> Self {
        match value {
            OnDisk::Bare(tickets) => Self {
                tickets,
                likes: BTreeMap::new(),
            },
            OnDisk::Document(doc) => doc,
        }
    }
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: RefCell<StoreDocument>,
}

impl JsonFileStore {
    /// Read the ticket file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a ticket file.
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let on_disk: OnDisk = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let doc = StoreDocument::from(on_disk);
        debug!(path = %path.display(), tickets = doc.tickets.len(), "ticket file loaded");
        Ok(Self {
            path: path.to_path_buf(),
            doc: RefCell::new(doc),
        })
    }

    fn persist(&self) -> Result<()> {
        let doc = self.doc.borrow().clone();
        let on_disk = if doc.likes.values().all(Vec::is_empty) {
            OnDisk::Bare(doc.tickets)
        } else {
            OnDisk::Document(doc)
        };
        let json = serde_json::to_string_pretty(&on_disk)?;
        std::fs::write(&self.path, json + "\n")
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    fn find(&self, id: &str) -> Option<Ticket> {
        self.doc.borrow().tickets.iter().find(|t| t.id == id).cloned()
    }

    /// Run `f` on the stored ticket `id`, then persist.
    fn modify<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut StoreDocument, usize) -> R,
    ) -> Result<Option<R>> {
        let outcome = {
            let mut doc = self.doc.borrow_mut();
            let Some(index) = doc.tickets.iter().position(|t| t.id == id) else {
                return Ok(None);
            };
            f(&mut doc, index)
        };
        self.persist()?;
        Ok(Some(outcome))
    }
}

impl TicketSource for JsonFileStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Ticket>> {
        Ok(self
            .doc
            .borrow()
            .tickets
            .iter()
            .filter(|t| t.user_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Ticket>> {
        Ok(self.find(id))
    }
}

impl TicketMutations for JsonFileStore {
    async fn update(&self, id: &str, patch: &TicketPatch) -> Result<ServiceResponse<Ticket>> {
        let updated = self.modify(id, |doc, index| {
            let slot = &mut doc.tickets[index];
            let mut next = patch.apply_to(slot);
            next.updated_at = Utc::now();
            slot.clone_from(&next);
            next
        })?;
        Ok(updated.map_or_else(|| ServiceResponse::failed("ticket not found"), ServiceResponse::ok))
    }

    async fn delete(&self, id: &str) -> Result<ServiceResponse<()>> {
        let removed = self.modify(id, |doc, index| {
            doc.tickets.remove(index);
            doc.likes.remove(id);
        })?;
        Ok(removed.map_or_else(
            || ServiceResponse::failed("ticket not found"),
            |()| ServiceResponse::done(),
        ))
    }

    async fn set_visibility(&self, id: &str, status: Visibility) -> Result<ServiceResponse<()>> {
        let changed = self.modify(id, |doc, index| {
            doc.tickets[index].status = status;
        })?;
        Ok(changed.map_or_else(
            || ServiceResponse::failed("ticket not found"),
            |()| ServiceResponse::done(),
        ))
    }
}

impl EngagementService for JsonFileStore {
    async fn toggle_like(
        &self,
        ticket_id: &str,
        user_id: &str,
    ) -> Result<ServiceResponse<LikeToggle>> {
        let toggled = self.modify(ticket_id, |doc, index| {
            let likers = doc.likes.entry(ticket_id.to_string()).or_default();
            let is_liked = if let Some(pos) = likers.iter().position(|u| u == user_id) {
                likers.remove(pos);
                false
            } else {
                likers.push(user_id.to_string());
                true
            };
            let like_count = u32::try_from(likers.len()).unwrap_or(u32::MAX);
            doc.tickets[index].like_count = like_count;
            LikeToggle {
                is_liked,
                like_count,
            }
        })?;
        Ok(toggled.map_or_else(|| ServiceResponse::failed("ticket not found"), ServiceResponse::ok))
    }

    async fn liked_users(
        &self,
        ticket_id: &str,
        _user_id: &str,
    ) -> Result<ServiceResponse<LikedUsers>> {
        let doc = self.doc.borrow();
        if !doc.tickets.iter().any(|t| t.id == ticket_id) {
            return Ok(ServiceResponse::failed("ticket not found"));
        }
        let liked_user_ids = doc.likes.get(ticket_id).cloned().unwrap_or_default();
        Ok(ServiceResponse::ok(LikedUsers { liked_user_ids }))
    }
}

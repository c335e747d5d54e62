//! Ticket detail session.
//!
//! A [`DetailSession`] drives one open detail view: which face of the card is
//! showing, whether the user is editing, which transient popup is open, and
//! the commit/delete/visibility round trips. The canonical ticket lives in a
//! shared [`LocalTicket`] so like toggles can run while the user edits.
//!
//! ```text
//! Viewing --begin_edit--> Editing --save--> Saving --ok--> Closed
//!    ^                      |  ^              |
//!    +------cancel_edit-----+  +----failed----+
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use std::rc::Rc;
use tracing::{info, warn};

use crate::collection::LocalTicket;
use crate::config::EncoreConfig;
use crate::edit::{EditOverlay, EmptyReviewPolicy, FieldValue, TicketField};
use crate::engagement::EngagementMutator;
use crate::error::CoreError;
use crate::model::ticket::{Ticket, TicketPatch, Visibility};
use crate::ordinal::resolve_ordinal;
use crate::service::{EngagementService, TicketMutations, settle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Viewing,
    /// Editing, with the error from the last failed save if any.
    Editing { error: Option<CoreError> },
    Saving,
    Closed,
}

impl Phase {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Viewing => "viewing",
            Self::Editing { .. } => "editing",
            Self::Saving => "saving",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        matches!(self, Self::Editing { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Face {
    #[default]
    Front,
    Back,
}

impl Face {
    const fn flipped(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Transient UI. At most one is open at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Menu,
    DatePicker,
    TimePicker,
    GenrePicker,
    PrivacyPicker,
    LikedUsers(Vec<String>),
    ConfirmDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(CoreError),
}

/// Calendar and commit settings for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub offset: FixedOffset,
    pub empty_review: EmptyReviewPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
            empty_review: EmptyReviewPolicy::default(),
        }
    }
}

impl SessionSettings {
    /// # Errors
    ///
    /// Returns an error when `archive.utc_offset` is invalid.
    pub fn from_config(config: &EncoreConfig) -> anyhow::Result<Self> {
        Ok(Self {
            offset: config.archive.offset()?,
            empty_review: config.edit.empty_review,
        })
    }
}

#[derive(Debug)]
pub struct DetailSession {
    ticket: Rc<LocalTicket>,
    viewer_id: Option<String>,
    settings: SessionSettings,
    phase: Phase,
    face: Face,
    popup: Option<Popup>,
    overlay: EditOverlay,
    collapsed: bool,
    notice: Option<Notice>,
}

impl DetailSession {
    /// Open a detail view. Always starts viewing the front face with nothing
    /// staged and no popup.
    #[must_use]
    pub fn open(ticket: Ticket, viewer_id: Option<&str>) -> Self {
        Self {
            ticket: Rc::new(LocalTicket::new(ticket)),
            viewer_id: viewer_id.map(str::to_string),
            settings: SessionSettings::default(),
            phase: Phase::Viewing,
            face: Face::Front,
            popup: None,
            overlay: EditOverlay::begin(),
            collapsed: false,
            notice: None,
        }
    }

    #[must_use]
    pub const fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Show another (or the same) ticket, dropping all session state.
    pub fn reopen(&mut self, ticket: Ticket) {
        self.ticket.replace(ticket);
        self.reset_view(Phase::Viewing);
        self.collapsed = false;
        self.notice = None;
    }

    /// Close the view. Anything staged is discarded.
    pub fn close(&mut self) {
        self.reset_view(Phase::Closed);
    }

    fn reset_view(&mut self, phase: Phase) {
        self.phase = phase;
        self.face = Face::Front;
        self.popup = None;
        self.overlay.discard();
    }

    // --- accessors ---

    #[must_use]
    pub fn ticket(&self) -> Ticket {
        self.ticket.snapshot()
    }

    /// Shared handle for the engagement mutator.
    #[must_use]
    pub fn local_ticket(&self) -> Rc<LocalTicket> {
        Rc::clone(&self.ticket)
    }

    #[must_use]
    pub fn viewer_id(&self) -> Option<&str> {
        self.viewer_id.as_deref()
    }

    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub const fn face(&self) -> Face {
        self.face
    }

    #[must_use]
    pub const fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    #[must_use]
    pub const fn overlay(&self) -> &EditOverlay {
        &self.overlay
    }

    #[must_use]
    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub const fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Whether the viewer owns the ticket.
    #[must_use]
    pub fn is_mine(&self) -> bool {
        let Some(viewer) = self.viewer_id.as_deref().filter(|v| !v.is_empty()) else {
            return false;
        };
        self.ticket.with(|t| t.user_id == viewer)
    }

    /// Field value as currently shown: staged if touched, canonical otherwise.
    #[must_use]
    pub fn effective(&self, field: TicketField) -> Option<FieldValue> {
        self.ticket
            .with(|base| self.overlay.effective_value(field, base))
    }

    // --- card ---

    /// Mark the card as shrunk (e.g. by scrolling). A shrunk card does not flip.
    pub const fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    #[must_use]
    pub const fn can_flip(&self) -> bool {
        matches!(self.phase, Phase::Viewing) && !self.collapsed
    }

    /// Flip the card if allowed; returns whether it flipped.
    pub const fn tap_card(&mut self) -> bool {
        if !self.can_flip() {
            return false;
        }
        self.face = self.face.flipped();
        true
    }

    // --- popups ---

    const fn transition_error(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            from: self.phase.name(),
            action,
        }
    }

    /// Open a transient popup, replacing any open one.
    ///
    /// # Errors
    ///
    /// Pickers need an edit in progress; the menu, privacy picker and delete
    /// confirmation need an owner viewing the ticket.
    pub fn open_popup(&mut self, popup: Popup) -> Result<(), CoreError> {
        let allowed = match &popup {
            Popup::DatePicker | Popup::TimePicker | Popup::GenrePicker => self.phase.is_editing(),
            Popup::Menu | Popup::PrivacyPicker | Popup::ConfirmDelete => {
                matches!(self.phase, Phase::Viewing) && self.is_mine()
            }
            Popup::LikedUsers(_) => matches!(self.phase, Phase::Viewing | Phase::Editing { .. }),
        };
        if !allowed {
            return Err(self.transition_error("open popup"));
        }
        self.popup = Some(popup);
        Ok(())
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    // --- editing ---

    /// Start editing. Only the owner can edit, and only from `Viewing`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] otherwise.
    pub fn begin_edit(&mut self) -> Result<(), CoreError> {
        if !matches!(self.phase, Phase::Viewing) || !self.is_mine() {
            return Err(self.transition_error("edit"));
        }
        self.phase = Phase::Editing { error: None };
        self.face = Face::Back;
        self.popup = None;
        self.overlay = EditOverlay::begin();
        Ok(())
    }

    fn require_editing(&self, action: &'static str) -> Result<(), CoreError> {
        if self.phase.is_editing() {
            Ok(())
        } else {
            Err(self.transition_error(action))
        }
    }

    /// Stage one field value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] when not editing.
    pub fn edit(&mut self, value: FieldValue) -> Result<(), CoreError> {
        self.require_editing("change a field")?;
        if matches!(
            (&value, &self.popup),
            (FieldValue::Genre(_), Some(Popup::GenrePicker))
        ) {
            self.popup = None;
        }
        self.overlay.set(value);
        Ok(())
    }

    /// Pick a new calendar date, keeping the time of day.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] when not editing.
    pub fn set_performed_date(&mut self, date: NaiveDate) -> Result<(), CoreError> {
        self.require_editing("change the date")?;
        let offset = self.settings.offset;
        let base = self.ticket.snapshot();
        self.overlay.set_performed_date(&base, date, offset);
        if self.popup == Some(Popup::DatePicker) {
            self.popup = None;
        }
        Ok(())
    }

    /// Pick a new time of day, keeping the calendar date.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] when not editing.
    pub fn set_performed_time(&mut self, time: NaiveTime) -> Result<(), CoreError> {
        self.require_editing("change the time")?;
        let offset = self.settings.offset;
        let base = self.ticket.snapshot();
        self.overlay.set_performed_time(&base, time, offset);
        if self.popup == Some(Popup::TimePicker) {
            self.popup = None;
        }
        Ok(())
    }

    /// Drop staged changes and go back to the front face.
    pub fn cancel_edit(&mut self) {
        if self.phase.is_editing() {
            self.reset_view(Phase::Viewing);
        }
    }

    /// Commit staged changes.
    ///
    /// Validation failures stay in `Editing` without calling the backend.
    /// A failed update also stays in `Editing`, overlay intact, so the user
    /// can retry. On success the canonical record is replaced whole, the
    /// overlay is cleared and the session closes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`], [`CoreError::Remote`], or
    /// [`CoreError::InvalidTransition`] when not editing.
    pub async fn save<M>(&mut self, mutations: &M, now: DateTime<Utc>) -> Result<Ticket, CoreError>
    where
        M: TicketMutations,
    {
        self.require_editing("save")?;

        let base = self.ticket.snapshot();
        let flattened = self
            .overlay
            .to_patch(&base, now, self.settings.empty_review);
        let (candidate, patch) = match flattened {
            Ok(flat) => flat,
            Err(err) => {
                self.phase = Phase::Editing {
                    error: Some(err.clone()),
                };
                return Err(err);
            }
        };

        self.phase = Phase::Saving;
        self.popup = None;

        let reply = settle("update ticket", mutations.update(&base.id, &patch).await);
        match reply {
            Ok(returned) => {
                let mut saved = returned
                    .filter(|t| t.id == base.id)
                    .unwrap_or(candidate);
                // Likes may have landed while the update was in flight.
                saved.set_engagement(self.ticket.engagement());
                if self.ticket.id() == base.id {
                    self.ticket.replace(saved.clone());
                } else {
                    warn!(ticket = %base.id, "ticket swapped during save; keeping current record");
                }
                self.reset_view(Phase::Closed);
                info!(ticket = %saved.id, "ticket saved");
                Ok(saved)
            }
            Err(err) => {
                warn!(ticket = %base.id, error = %err, "save failed; keeping edits");
                self.phase = Phase::Editing {
                    error: Some(err.clone()),
                };
                Err(err)
            }
        }
    }

    // --- delete ---

    /// Ask for delete confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the owner is viewing.
    pub fn request_delete(&mut self) -> Result<(), CoreError> {
        self.open_popup(Popup::ConfirmDelete)
    }

    pub fn cancel_delete(&mut self) {
        if self.popup == Some(Popup::ConfirmDelete) {
            self.popup = None;
        }
    }

    /// Delete after confirmation. Returns the deleted id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] without a pending
    /// confirmation, or [`CoreError::Remote`] when the delete fails (the
    /// session stays open with an error notice).
    pub async fn confirm_delete<M>(&mut self, mutations: &M) -> Result<String, CoreError>
    where
        M: TicketMutations,
    {
        if self.popup != Some(Popup::ConfirmDelete) {
            return Err(self.transition_error("delete"));
        }
        self.popup = None;

        let id = self.ticket.id();
        match settle("delete ticket", mutations.delete(&id).await) {
            Ok(_) => {
                info!(ticket = %id, "ticket deleted");
                self.reset_view(Phase::Closed);
                Ok(id)
            }
            Err(err) => {
                warn!(ticket = %id, error = %err, "delete failed");
                self.notice = Some(Notice::Error(err.clone()));
                Err(err)
            }
        }
    }

    // --- visibility and likes ---

    /// Change who can see the ticket.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the owner is viewing,
    /// or [`CoreError::Remote`] when the change fails.
    pub async fn change_visibility<M>(
        &mut self,
        mutations: &M,
        status: Visibility,
    ) -> Result<(), CoreError>
    where
        M: TicketMutations,
    {
        if !matches!(self.phase, Phase::Viewing) || !self.is_mine() {
            return Err(self.transition_error("change visibility"));
        }

        let id = self.ticket.id();
        match settle("change visibility", mutations.set_visibility(&id, status).await) {
            Ok(_) => {
                let current = self.ticket.snapshot();
                if current.id == id {
                    self.ticket
                        .replace(TicketPatch::visibility(status).apply_to(&current));
                }
                if self.popup == Some(Popup::PrivacyPicker) {
                    self.popup = None;
                }
                self.notice = Some(Notice::Info(format!("visibility set to {status}")));
                Ok(())
            }
            Err(err) => {
                warn!(ticket = %id, error = %err, "visibility change failed");
                self.notice = Some(Notice::Error(err.clone()));
                Err(err)
            }
        }
    }

    /// Fetch who liked this ticket into the liked-users popup.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Remote`] when the lookup fails; an error notice
    /// is set as well.
    pub async fn show_liked_users<S>(
        &mut self,
        mutator: &EngagementMutator,
        service: &S,
    ) -> Result<(), CoreError>
    where
        S: EngagementService,
    {
        let id = self.ticket.id();
        let viewer = self.viewer_id.clone().unwrap_or_default();
        match mutator.liked_users(service, &id, &viewer).await {
            Ok(users) => self.open_popup(Popup::LikedUsers(users)),
            Err(err) => {
                self.notice = Some(Notice::Error(err.clone()));
                Err(err)
            }
        }
    }

    /// "Nth visit" badge. Hidden while an edit is in progress.
    #[must_use]
    pub fn visit_ordinal(&self, collection: &[Ticket]) -> Option<usize> {
        if !matches!(self.phase, Phase::Viewing) {
            return None;
        }
        self.ticket.with(|t| resolve_ordinal(t, collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::model::ticket::Genre;
    use crate::service::ServiceResponse;
    use chrono::TimeZone;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingMutations {
        fail: bool,
        updates: RefCell<Vec<(String, TicketPatch)>>,
        deletes: RefCell<Vec<String>>,
        swap_during_update: RefCell<Option<(Rc<LocalTicket>, Ticket)>>,
    }

    impl TicketMutations for RecordingMutations {
        async fn update(
            &self,
            id: &str,
            patch: &TicketPatch,
        ) -> anyhow::Result<ServiceResponse<Ticket>> {
            self.updates.borrow_mut().push((id.to_string(), patch.clone()));
            if let Some((local, other)) = self.swap_during_update.borrow_mut().take() {
                local.replace(other);
            }
            if self.fail {
                return Ok(ServiceResponse::failed("server busy"));
            }
            Ok(ServiceResponse {
                success: true,
                data: None,
                error: None,
            })
        }

        async fn delete(&self, id: &str) -> anyhow::Result<ServiceResponse<()>> {
            self.deletes.borrow_mut().push(id.to_string());
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(ServiceResponse::done())
        }

        async fn set_visibility(
            &self,
            _id: &str,
            _status: Visibility,
        ) -> anyhow::Result<ServiceResponse<()>> {
            if self.fail {
                return Ok(ServiceResponse::failed("forbidden"));
            }
            Ok(ServiceResponse::done())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
            .single()
            .expect("valid time")
    }

    fn ticket() -> Ticket {
        Ticket {
            id: "t1".into(),
            user_id: "owner".into(),
            title: "Hamlet".into(),
            like_count: 3,
            ..Ticket::default()
        }
    }

    fn owned() -> DetailSession {
        DetailSession::open(ticket(), Some("owner"))
    }

    #[test]
    fn open_starts_clean() {
        let session = owned();
        assert_eq!(session.phase(), &Phase::Viewing);
        assert_eq!(session.face(), Face::Front);
        assert_eq!(session.popup(), None);
        assert!(session.overlay().is_empty());
        assert!(session.is_mine());
    }

    #[test]
    fn flip_only_while_viewing_and_expanded() {
        let mut session = owned();
        assert!(session.tap_card());
        assert_eq!(session.face(), Face::Back);

        session.set_collapsed(true);
        assert!(!session.tap_card());
        session.set_collapsed(false);

        session.begin_edit().expect("owner can edit");
        assert!(!session.tap_card());
        assert_eq!(session.face(), Face::Back);
    }

    #[test]
    fn begin_edit_requires_ownership() {
        let mut visitor = DetailSession::open(ticket(), Some("someone"));
        let err = visitor.begin_edit().expect_err("not owner");
        assert_eq!(
            err,
            CoreError::InvalidTransition {
                from: "viewing",
                action: "edit"
            }
        );
        let mut anonymous = DetailSession::open(ticket(), None);
        assert!(anonymous.begin_edit().is_err());
    }

    #[test]
    fn begin_edit_forces_back_face_and_closes_popups() {
        let mut session = owned();
        session.open_popup(Popup::Menu).expect("menu");
        session.begin_edit().expect("edit");
        assert_eq!(session.face(), Face::Back);
        assert_eq!(session.popup(), None);
        assert!(session.phase().is_editing());
    }

    #[test]
    fn cancel_edit_discards_and_returns_to_front() {
        let mut session = owned();
        session.begin_edit().expect("edit");
        session
            .edit(FieldValue::Title("Macbeth".into()))
            .expect("stage");
        session.open_popup(Popup::GenrePicker).expect("picker");
        session.cancel_edit();
        assert_eq!(session.phase(), &Phase::Viewing);
        assert_eq!(session.face(), Face::Front);
        assert_eq!(session.popup(), None);
        assert!(session.overlay().is_empty());
        assert_eq!(session.ticket().title, "Hamlet");
    }

    #[test]
    fn pickers_need_an_edit_in_progress() {
        let mut session = owned();
        assert!(session.open_popup(Popup::DatePicker).is_err());
        session.begin_edit().expect("edit");
        session.open_popup(Popup::DatePicker).expect("picker");
        session
            .set_performed_date(NaiveDate::from_ymd_opt(2024, 5, 5).expect("date"))
            .expect("stage");
        assert_eq!(session.popup(), None);
        assert!(session.overlay().contains(TicketField::PerformedAt));
    }

    #[test]
    fn genre_pick_closes_the_picker() {
        let mut session = owned();
        session.begin_edit().expect("edit");
        session.open_popup(Popup::GenrePicker).expect("picker");
        session.edit(FieldValue::Genre(Genre::Theater)).expect("stage");
        assert_eq!(session.popup(), None);
        assert_eq!(
            session.effective(TicketField::Genre),
            Some(FieldValue::Genre(Genre::Theater))
        );
    }

    #[tokio::test]
    async fn save_success_replaces_canonical_and_closes() {
        let mutations = RecordingMutations::default();
        let mut session = owned();
        session.begin_edit().expect("edit");
        session
            .edit(FieldValue::Title("Macbeth".into()))
            .expect("stage");

        let saved = session.save(&mutations, now()).await.expect("saved");
        assert_eq!(saved.title, "Macbeth");
        assert_eq!(session.ticket().title, "Macbeth");
        assert_eq!(session.phase(), &Phase::Closed);
        assert!(session.overlay().is_empty());

        let updates = mutations.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "t1");
        assert_eq!(updates[0].1.title.as_deref(), Some("Macbeth"));
    }

    #[tokio::test]
    async fn save_leaves_a_swapped_ticket_alone() {
        let mutations = RecordingMutations::default();
        let mut session = owned();
        session.begin_edit().expect("edit");
        session
            .edit(FieldValue::Title("Macbeth".into()))
            .expect("stage");
        let other = Ticket {
            id: "t2".into(),
            title: "Othello".into(),
            ..ticket()
        };
        *mutations.swap_during_update.borrow_mut() = Some((session.local_ticket(), other));

        let saved = session.save(&mutations, now()).await.expect("saved");
        assert_eq!(saved.id, "t1");
        assert_eq!(saved.title, "Macbeth");
        assert_eq!(session.ticket().id, "t2");
        assert_eq!(session.ticket().title, "Othello");
        assert_eq!(session.phase(), &Phase::Closed);
    }

    #[tokio::test]
    async fn blank_title_never_reaches_the_backend() {
        let mutations = RecordingMutations::default();
        let mut session = owned();
        session.begin_edit().expect("edit");
        session.edit(FieldValue::Title("   ".into())).expect("stage");

        let err = session.save(&mutations, now()).await.expect_err("invalid");
        assert_eq!(err, CoreError::Validation(ValidationError::EmptyTitle));
        assert_eq!(
            session.phase(),
            &Phase::Editing {
                error: Some(CoreError::Validation(ValidationError::EmptyTitle))
            }
        );
        assert!(mutations.updates.borrow().is_empty());
        assert_eq!(session.ticket(), ticket());
    }

    #[tokio::test]
    async fn failed_save_keeps_edits_for_retry() {
        let mutations = RecordingMutations {
            fail: true,
            ..RecordingMutations::default()
        };
        let mut session = owned();
        session.begin_edit().expect("edit");
        session
            .edit(FieldValue::Title("Macbeth".into()))
            .expect("stage");

        let err = session.save(&mutations, now()).await.expect_err("remote");
        assert!(err.is_retryable());
        assert!(session.phase().is_editing());
        assert_eq!(
            session.effective(TicketField::Title),
            Some(FieldValue::Title("Macbeth".into()))
        );
        assert_eq!(session.ticket().title, "Hamlet");
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let mutations = RecordingMutations::default();
        let mut session = owned();
        assert!(session.confirm_delete(&mutations).await.is_err());
        assert!(mutations.deletes.borrow().is_empty());

        session.request_delete().expect("confirm dialog");
        session.cancel_delete();
        assert_eq!(session.popup(), None);

        session.request_delete().expect("confirm dialog");
        let id = session.confirm_delete(&mutations).await.expect("deleted");
        assert_eq!(id, "t1");
        assert_eq!(session.phase(), &Phase::Closed);
    }

    #[tokio::test]
    async fn failed_delete_keeps_session_open_with_notice() {
        let mutations = RecordingMutations {
            fail: true,
            ..RecordingMutations::default()
        };
        let mut session = owned();
        session.request_delete().expect("confirm dialog");
        assert!(session.confirm_delete(&mutations).await.is_err());
        assert_eq!(session.phase(), &Phase::Viewing);
        assert!(matches!(session.take_notice(), Some(Notice::Error(_))));
    }

    #[tokio::test]
    async fn visibility_change_updates_status() {
        let mutations = RecordingMutations::default();
        let mut session = owned();
        session.open_popup(Popup::PrivacyPicker).expect("picker");
        session
            .change_visibility(&mutations, Visibility::Public)
            .await
            .expect("changed");
        assert_eq!(session.ticket().status, Visibility::Public);
        assert_eq!(session.popup(), None);

        let failing = RecordingMutations {
            fail: true,
            ..RecordingMutations::default()
        };
        assert!(
            session
                .change_visibility(&failing, Visibility::Private)
                .await
                .is_err()
        );
        assert_eq!(session.ticket().status, Visibility::Public);
    }

    #[test]
    fn reopen_resets_everything() {
        let mut session = owned();
        session.begin_edit().expect("edit");
        session.edit(FieldValue::Seat("A1".into())).expect("stage");
        session.set_collapsed(true);

        let other = Ticket {
            id: "t2".into(),
            ..ticket()
        };
        session.reopen(other);
        assert_eq!(session.phase(), &Phase::Viewing);
        assert_eq!(session.face(), Face::Front);
        assert!(session.overlay().is_empty());
        assert!(!session.is_collapsed());
        assert_eq!(session.ticket().id, "t2");
    }

    #[test]
    fn ordinal_badge_hidden_while_editing() {
        let collection = vec![
            Ticket {
                id: "t0".into(),
                performed_at: Some(now() - chrono::Duration::days(30)),
                ..ticket()
            },
            Ticket {
                performed_at: Some(now()),
                ..ticket()
            },
        ];
        let mut session = DetailSession::open(collection[1].clone(), Some("owner"));
        assert_eq!(session.visit_ordinal(&collection), Some(2));
        session.begin_edit().expect("edit");
        assert_eq!(session.visit_ordinal(&collection), None);
    }
}

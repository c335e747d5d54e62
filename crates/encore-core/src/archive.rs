//! Archive page coordinator: history, search and statistics tabs over one
//! canonical ticket collection.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::collection::TicketCollection;
use crate::filter::{
    ArchiveClock, FilterCriteria, HistoryView, TimeWindow, WindowTab, history_view, window_tabs,
};
use crate::model::stats::{AggregateStats, YearCursor, YearSummary};
use crate::model::ticket::Ticket;
use crate::ordinal::visit_ordinals;
use crate::search::{ImageResolver, search_tickets};
use crate::service::{SearchService, StatisticsService, TicketSource, settle_data};
use crate::session::{DetailSession, SessionSettings};

#[derive(Debug, Clone)]
pub struct ArchiveView {
    owner_id: Option<String>,
    tickets: TicketCollection,
    window: TimeWindow,
    results: Vec<Ticket>,
    has_searched: bool,
    year: YearCursor,
    stats: Option<AggregateStats>,
    summary: Option<YearSummary>,
}

impl ArchiveView {
    /// Start from the locally held list; [`ArchiveView::refresh`] swaps in
    /// the remote one once it arrives.
    #[must_use]
    pub fn new(owner_id: Option<&str>, local: Vec<Ticket>, clock: &ArchiveClock) -> Self {
        Self {
            owner_id: owner_id.filter(|id| !id.is_empty()).map(str::to_string),
            tickets: TicketCollection::new(local),
            window: TimeWindow::All,
            results: Vec::new(),
            has_searched: false,
            year: YearCursor::current(clock),
            stats: None,
            summary: None,
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    #[must_use]
    pub const fn tickets(&self) -> &TicketCollection {
        &self.tickets
    }

    /// Re-fetch the owner's tickets. An empty remote list keeps the current
    /// one; a failed fetch keeps it too. Returns whether the fetch succeeded.
    pub async fn refresh<S>(&mut self, source: &S) -> bool
    where
        S: TicketSource,
    {
        let Some(owner) = self.owner_id.clone() else {
            debug!("refresh skipped: no owner");
            return false;
        };
        match source.list(&owner).await {
            Ok(remote) => {
                let local = std::mem::take(&mut self.tickets).into_vec();
                self.tickets = TicketCollection::from_sources(remote, local);
                debug!(count = self.tickets.len(), "archive refreshed");
                true
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "ticket fetch failed; keeping current list");
                false
            }
        }
    }

    // --- history tab ---

    #[must_use]
    pub const fn window(&self) -> TimeWindow {
        self.window
    }

    pub const fn select_window(&mut self, window: TimeWindow) {
        self.window = window;
    }

    #[must_use]
    pub fn history(&self, clock: &ArchiveClock) -> HistoryView {
        history_view(self.tickets.as_slice(), self.window, clock)
    }

    #[must_use]
    pub fn tabs(&self, clock: &ArchiveClock) -> Vec<WindowTab> {
        window_tabs(self.tickets.as_slice(), self.window, clock)
    }

    /// Visit ordinals for every ticket in the collection.
    #[must_use]
    pub fn ordinals(&self) -> HashMap<String, usize> {
        visit_ordinals(self.tickets.as_slice())
    }

    // --- search tab ---

    /// Run a remote search as the owner. Without an owner nothing happens;
    /// a failed search shows no results.
    pub async fn run_search<S, R>(
        &mut self,
        service: &S,
        resolver: &R,
        criteria: &FilterCriteria,
        clock: &ArchiveClock,
    ) -> &[Ticket]
    where
        S: SearchService,
        R: ImageResolver,
    {
        let Some(owner) = self.owner_id.clone() else {
            return &self.results;
        };
        self.has_searched = true;
        self.results = search_tickets(service, resolver, &owner, criteria, clock)
            .await
            .unwrap_or_default();
        &self.results
    }

    #[must_use]
    pub fn search_results(&self) -> &[Ticket] {
        &self.results
    }

    #[must_use]
    pub const fn has_searched(&self) -> bool {
        self.has_searched
    }

    pub fn clear_search(&mut self) {
        self.results.clear();
        self.has_searched = false;
    }

    // --- statistics tabs ---

    #[must_use]
    pub const fn year(&self) -> YearCursor {
        self.year
    }

    /// Step the statistics year. Loaded payloads belong to the old year and
    /// are dropped.
    pub fn previous_year(&mut self) {
        self.set_year(self.year.previous());
    }

    pub fn next_year(&mut self) {
        self.set_year(self.year.next());
    }

    fn set_year(&mut self, year: YearCursor) {
        self.year = year;
        self.stats = None;
        self.summary = None;
    }

    /// Load aggregate statistics for the selected year; `None` on failure.
    pub async fn load_statistics<S>(&mut self, service: &S) -> Option<&AggregateStats>
    where
        S: StatisticsService,
    {
        let owner = self.owner_id.clone()?;
        let year = self.year.year();
        let reply = service.statistics(&owner, year).await;
        self.stats = settle_data("load statistics", reply)
            .inspect_err(|err| warn!(year, error = %err, "statistics unavailable"))
            .ok();
        self.stats.as_ref()
    }

    /// Load the year-in-review summary for the selected year; `None` on failure.
    pub async fn load_year_in_review<S>(&mut self, service: &S) -> Option<&YearSummary>
    where
        S: StatisticsService,
    {
        let owner = self.owner_id.clone()?;
        let year = self.year.year();
        let reply = service.year_in_review(&owner, year).await;
        self.summary = settle_data("load year in review", reply)
            .inspect_err(|err| warn!(year, error = %err, "year in review unavailable"))
            .ok();
        self.summary.as_ref()
    }

    #[must_use]
    pub const fn statistics(&self) -> Option<&AggregateStats> {
        self.stats.as_ref()
    }

    #[must_use]
    pub const fn year_in_review(&self) -> Option<&YearSummary> {
        self.summary.as_ref()
    }

    // --- detail sessions ---

    /// Open a detail session for a ticket in the collection or the current
    /// search results.
    #[must_use]
    pub fn open_detail(&self, id: &str, settings: SessionSettings) -> Option<DetailSession> {
        let ticket = self
            .tickets
            .get(id)
            .or_else(|| self.results.iter().find(|t| t.id == id))?;
        Some(DetailSession::open(ticket.clone(), self.owner_id.as_deref()).with_settings(settings))
    }

    /// Take a saved ticket back into the lists that show it. Unknown ids
    /// are ignored.
    pub fn apply_saved(&mut self, ticket: &Ticket) -> bool {
        let mut in_results = false;
        if let Some(slot) = self.results.iter_mut().find(|t| t.id == ticket.id) {
            slot.clone_from(ticket);
            in_results = true;
        }
        self.tickets.replace(ticket.clone()) || in_results
    }

    /// Forget a deleted ticket everywhere.
    pub fn apply_deleted(&mut self, id: &str) -> bool {
        let before = self.results.len();
        self.results.retain(|t| t.id != id);
        self.tickets.remove(id).is_some() || self.results.len() != before
    }
}

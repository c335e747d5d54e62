//! Remote collaborator seams.
//!
//! Every backend call returns `anyhow::Result<ServiceResponse<T>>`: the outer
//! error is a transport failure, the envelope carries the server's own
//! `success` flag. [`settle`] folds both into [`CoreError::Remote`] at the
//! boundary so no transport error crosses into the coordinators.
//!
//! The traits use `async fn` directly. Everything runs on one UI event loop,
//! so the returned futures are not required to be `Send`.
#![allow(async_fn_in_trait)]

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::stats::{AggregateStats, YearSummary};
use crate::model::ticket::{Ticket, TicketPatch, Visibility};
use crate::search::{RawSearchResult, SearchQuery};

/// Error body attached to a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteErrorBody {
    pub message: Option<String>,
    pub code: Option<String>,
}

/// `{ success, data?, error? }` envelope returned by every backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteErrorBody>,
}

impl<T> ServiceResponse<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(RemoteErrorBody {
                message: Some(message.into()),
                code: None,
            }),
        }
    }

    /// Fold the envelope into a result. `success: false` becomes
    /// [`CoreError::Remote`]; a successful response may still carry no data.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Remote`] when `success` is false.
    pub fn into_result(self, operation: &'static str) -> Result<Option<T>, CoreError> {
        if self.success {
            return Ok(self.data);
        }
        let message = self
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "server reported failure".to_string());
        Err(CoreError::remote(operation, message))
    }
}

impl ServiceResponse<()> {
    #[must_use]
    pub const fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

/// Convert a collaborator result into the engine taxonomy.
///
/// # Errors
///
/// Returns [`CoreError::Remote`] for transport failures and `success: false`.
pub fn settle<T>(
    operation: &'static str,
    result: anyhow::Result<ServiceResponse<T>>,
) -> Result<Option<T>, CoreError> {
    match result {
        Ok(response) => response.into_result(operation),
        Err(err) => Err(CoreError::remote(operation, format!("{err:#}"))),
    }
}

/// Like [`settle`], but a successful response without data is also a failure.
///
/// # Errors
///
/// Returns [`CoreError::Remote`] for transport failures, `success: false`,
/// or a missing payload.
pub fn settle_data<T>(
    operation: &'static str,
    result: anyhow::Result<ServiceResponse<T>>,
) -> Result<T, CoreError> {
    settle(operation, result)?.ok_or_else(|| CoreError::remote(operation, "response had no data"))
}

/// Server answer to a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub is_liked: bool,
    pub like_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LikedUsers {
    pub liked_user_ids: Vec<String>,
}

/// Read access to a user's tickets.
pub trait TicketSource {
    async fn list(&self, owner_id: &str) -> anyhow::Result<Vec<Ticket>>;

    async fn get_by_id(&self, id: &str) -> anyhow::Result<Option<Ticket>>;
}

/// Writes against canonical tickets.
pub trait TicketMutations {
    /// Apply `patch`; the response carries the updated record when the
    /// server returns one.
    async fn update(&self, id: &str, patch: &TicketPatch)
    -> anyhow::Result<ServiceResponse<Ticket>>;

    async fn delete(&self, id: &str) -> anyhow::Result<ServiceResponse<()>>;

    async fn set_visibility(
        &self,
        id: &str,
        status: Visibility,
    ) -> anyhow::Result<ServiceResponse<()>>;
}

pub trait EngagementService {
    async fn toggle_like(
        &self,
        ticket_id: &str,
        user_id: &str,
    ) -> anyhow::Result<ServiceResponse<LikeToggle>>;

    async fn liked_users(
        &self,
        ticket_id: &str,
        user_id: &str,
    ) -> anyhow::Result<ServiceResponse<LikedUsers>>;
}

pub trait SearchService {
    async fn search(
        &self,
        user_id: &str,
        query: &SearchQuery,
    ) -> anyhow::Result<ServiceResponse<Vec<RawSearchResult>>>;
}

/// Pre-aggregated analytics. Payloads are rendered, never computed locally.
pub trait StatisticsService {
    async fn statistics(
        &self,
        user_id: &str,
        year: i32,
    ) -> anyhow::Result<ServiceResponse<AggregateStats>>;

    async fn year_in_review(
        &self,
        user_id: &str,
        year: i32,
    ) -> anyhow::Result<ServiceResponse<YearSummary>>;
}

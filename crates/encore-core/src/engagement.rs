//! Like/unlike against the engagement backend.
//!
//! The local like state is a cache of the server's answer. A toggle never
//! touches it before the server replies and never computes a delta: on
//! success both `is_liked` and `like_count` are replaced with the returned
//! snapshot, on failure nothing changes and the failure is only logged.
//!
//! Rapid repeated toggles race by default and the last response to arrive
//! wins. With [`TogglePolicy::Serialized`] toggles on the same ticket queue
//! behind a per-ticket async mutex instead, so responses land in issue order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::collection::LocalTicket;
use crate::config::EngagementConfig;
use crate::error::CoreError;
use crate::model::ticket::EngagementState;
use crate::service::{EngagementService, settle_data};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TogglePolicy {
    #[default]
    LastWriteWins,
    Serialized,
}

impl TogglePolicy {
    #[must_use]
    pub const fn from_config(config: &EngagementConfig) -> Self {
        if config.serialize_toggles {
            Self::Serialized
        } else {
            Self::LastWriteWins
        }
    }
}

#[derive(Debug, Default)]
pub struct EngagementMutator {
    policy: TogglePolicy,
    locks: RefCell<HashMap<String, Arc<Mutex<()>>>>,
}

impl EngagementMutator {
    #[must_use]
    pub fn new(policy: TogglePolicy) -> Self {
        Self {
            policy,
            locks: RefCell::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &EngagementConfig) -> Self {
        Self::new(TogglePolicy::from_config(config))
    }

    #[must_use]
    pub const fn policy(&self) -> TogglePolicy {
        self.policy
    }

    fn lock_for(&self, ticket_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .borrow_mut()
                .entry(ticket_id.to_string())
                .or_default(),
        )
    }

    /// Forget `ticket_id`'s lock once nobody holds or waits on it.
    fn release_lock(&self, ticket_id: &str) {
        let mut locks = self.locks.borrow_mut();
        if locks
            .get(ticket_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(ticket_id);
        }
    }

    /// Toggle the like on `local` as `user_id`.
    ///
    /// Returns the state applied to `local`, or `None` when the call failed
    /// or `local` was switched to another ticket before the answer came back.
    pub async fn toggle_like<S>(
        &self,
        service: &S,
        local: &LocalTicket,
        user_id: &str,
    ) -> Option<EngagementState>
    where
        S: EngagementService,
    {
        let ticket_id = local.id();
        if ticket_id.is_empty() || user_id.is_empty() {
            debug!(ticket = %ticket_id, "like toggle skipped: missing id");
            return None;
        }

        match self.policy {
            TogglePolicy::LastWriteWins => {
                Self::send_toggle(service, local, &ticket_id, user_id).await
            }
            TogglePolicy::Serialized => {
                let queued = self.lock_for(&ticket_id).lock_owned().await;
                let state = Self::send_toggle(service, local, &ticket_id, user_id).await;
                drop(queued);
                self.release_lock(&ticket_id);
                state
            }
        }
    }

    async fn send_toggle<S>(
        service: &S,
        local: &LocalTicket,
        ticket_id: &str,
        user_id: &str,
    ) -> Option<EngagementState>
    where
        S: EngagementService,
    {
        let reply = settle_data(
            "toggle like",
            service.toggle_like(ticket_id, user_id).await,
        );
        let toggle = match reply {
            Ok(toggle) => toggle,
            Err(err) => {
                warn!(ticket = %ticket_id, error = %err, "like toggle failed; keeping local state");
                return None;
            }
        };

        let state = EngagementState {
            is_liked: toggle.is_liked,
            like_count: toggle.like_count,
        };
        if local.apply_engagement(ticket_id, state) {
            debug!(
                ticket = %ticket_id,
                liked = state.is_liked,
                count = state.like_count,
                "like applied"
            );
            Some(state)
        } else {
            debug!(ticket = %ticket_id, "dropping like response for a ticket no longer shown");
            None
        }
    }

    /// Users who liked `ticket_id`, as seen by `user_id`.
    ///
    /// Missing identifiers give an empty list without calling the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Remote`] when the lookup fails.
    pub async fn liked_users<S>(
        &self,
        service: &S,
        ticket_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, CoreError>
    where
        S: EngagementService,
    {
        if ticket_id.is_empty() || user_id.is_empty() {
            return Ok(Vec::new());
        }
        let liked = settle_data(
            "list likes",
            service.liked_users(ticket_id, user_id).await,
        )?;
        Ok(liked.liked_user_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ticket::Ticket;
    use crate::service::{LikeToggle, LikedUsers, ServiceResponse};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tokio::sync::oneshot;
    use tokio::task::yield_now;

    type Reply = anyhow::Result<ServiceResponse<LikeToggle>>;

    /// Hands each call the next pending reply; the test decides when it lands.
    #[derive(Default)]
    struct ScriptedLikes {
        pending: RefCell<VecDeque<oneshot::Receiver<Reply>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedLikes {
        fn expect_call(&self) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().push_back(rx);
            tx
        }
    }

    impl EngagementService for ScriptedLikes {
        async fn toggle_like(&self, _ticket_id: &str, _user_id: &str) -> Reply {
            *self.calls.borrow_mut() += 1;
            let rx = self.pending.borrow_mut().pop_front().expect("unexpected call");
            rx.await.expect("reply sender dropped")
        }

        async fn liked_users(
            &self,
            _ticket_id: &str,
            _user_id: &str,
        ) -> anyhow::Result<ServiceResponse<LikedUsers>> {
            *self.calls.borrow_mut() += 1;
            Ok(ServiceResponse::ok(LikedUsers {
                liked_user_ids: vec!["u2".into(), "u3".into()],
            }))
        }
    }

    fn local(id: &str) -> LocalTicket {
        LocalTicket::new(Ticket {
            id: id.into(),
            like_count: 4,
            ..Ticket::default()
        })
    }

    fn snapshot(is_liked: bool, like_count: u32) -> Reply {
        Ok(ServiceResponse::ok(LikeToggle {
            is_liked,
            like_count,
        }))
    }

    async fn settle_turns() {
        for _ in 0..3 {
            yield_now().await;
        }
    }

    #[tokio::test]
    async fn success_replaces_state_verbatim() {
        let service = ScriptedLikes::default();
        let tx = service.expect_call();
        tx.send(snapshot(true, 10)).expect("send");

        let ticket = local("t1");
        let applied = EngagementMutator::default()
            .toggle_like(&service, &ticket, "u1")
            .await;
        // Server says 10 even though local was 4: no client-side arithmetic.
        let expected = EngagementState {
            is_liked: true,
            like_count: 10,
        };
        assert_eq!(applied, Some(expected));
        assert_eq!(ticket.engagement(), expected);
    }

    #[tokio::test]
    async fn failure_leaves_state_untouched() {
        let service = ScriptedLikes::default();
        let ticket = local("t1");
        let before = ticket.engagement();
        let mutator = EngagementMutator::default();

        service
            .expect_call()
            .send(Ok(ServiceResponse::failed("nope")))
            .expect("send");
        assert_eq!(mutator.toggle_like(&service, &ticket, "u1").await, None);

        service
            .expect_call()
            .send(Err(anyhow::anyhow!("timeout")))
            .expect("send");
        assert_eq!(mutator.toggle_like(&service, &ticket, "u1").await, None);

        assert_eq!(ticket.engagement(), before);
    }

    #[tokio::test]
    async fn missing_ids_skip_the_call() {
        let service = ScriptedLikes::default();
        let mutator = EngagementMutator::default();
        assert_eq!(mutator.toggle_like(&service, &local(""), "u1").await, None);
        assert_eq!(mutator.toggle_like(&service, &local("t1"), "").await, None);
        assert_eq!(mutator.liked_users(&service, "", "u1").await, Ok(Vec::new()));
        assert_eq!(*service.calls.borrow(), 0);
    }

    #[tokio::test]
    async fn stale_reply_is_not_applied_to_a_replaced_ticket() {
        let service = ScriptedLikes::default();
        let tx = service.expect_call();
        let ticket = Rc::new(local("t1"));
        let mutator = EngagementMutator::default();

        let toggle = mutator.toggle_like(&service, &ticket, "u1");
        let switch = async {
            settle_turns().await;
            ticket.replace(Ticket {
                id: "t2".into(),
                like_count: 1,
                ..Ticket::default()
            });
            tx.send(snapshot(true, 99)).expect("send");
        };
        let (applied, ()) = tokio::join!(toggle, switch);

        assert_eq!(applied, None);
        assert_eq!(ticket.id(), "t2");
        assert_eq!(ticket.engagement().like_count, 1);
    }

    /// Issue toggle A then toggle B; B's reply arrives first.
    async fn race(policy: TogglePolicy) -> EngagementState {
        let service = ScriptedLikes::default();
        let first_reply = service.expect_call();
        let second_reply = service.expect_call();
        let ticket = local("t1");
        let mutator = EngagementMutator::new(policy);

        let first = mutator.toggle_like(&service, &ticket, "u1");
        let second = async {
            yield_now().await;
            mutator.toggle_like(&service, &ticket, "u1").await
        };
        let replies = async {
            settle_turns().await;
            second_reply.send(snapshot(false, 4)).expect("send");
            settle_turns().await;
            first_reply.send(snapshot(true, 5)).expect("send");
        };
        tokio::join!(first, second, replies);
        assert!(mutator.locks.borrow().is_empty());
        ticket.engagement()
    }

    #[tokio::test]
    async fn racing_toggles_last_arrival_wins() {
        let state = race(TogglePolicy::LastWriteWins).await;
        assert_eq!(
            state,
            EngagementState {
                is_liked: true,
                like_count: 5
            }
        );
    }

    #[tokio::test]
    async fn serialized_toggles_land_in_issue_order() {
        let state = race(TogglePolicy::Serialized).await;
        assert_eq!(
            state,
            EngagementState {
                is_liked: false,
                like_count: 4
            }
        );
    }

    #[tokio::test]
    async fn liked_users_are_returned_from_the_server() {
        let service = ScriptedLikes::default();
        let users = EngagementMutator::default()
            .liked_users(&service, "t1", "u1")
            .await
            .expect("lookup");
        assert_eq!(users, vec!["u2", "u3"]);
    }

    #[test]
    fn policy_follows_config() {
        let serialized = EngagementConfig {
            serialize_toggles: true,
        };
        assert_eq!(TogglePolicy::from_config(&serialized), TogglePolicy::Serialized);
        assert_eq!(
            EngagementMutator::from_config(&EngagementConfig::default()).policy(),
            TogglePolicy::LastWriteWins
        );
    }
}

//! # Cluster member view.
//!
//! The events core needs only two things from cluster membership: a usable
//! member to talk to, and a way to report that a member stopped answering.
//! [`Cluster`] is that contract; [`MemberList`] is a small in-memory
//! implementation over a fixed list of base URLs.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default time a failed member sits out before it is tried again.
pub(crate) const DEFAULT_MEMBER_RETRY: Duration = Duration::from_secs(5);

/// Membership collaborator consumed by the transports and the REST client.
pub trait Cluster: Send + Sync + 'static {
    /// Base URL of a member believed healthy, or `None` if all are down.
    fn member(&self) -> Option<String>;

    /// Reports that `member` failed.
    fn mark_down(&self, member: &str);
}

#[derive(Debug)]
struct Member {
    endpoint: String,
    down_since: Option<Instant>,
}

impl Member {
    fn is_up(&self) -> bool {
        self.down_since.is_none()
    }
}

#[derive(Debug)]
struct State {
    members: Vec<Member>,
    active: usize,
}

/// Fixed member list with sticky selection.
///
/// `member()` keeps returning the active member until it is marked down, then
/// moves to the next healthy member in list order. A member marked down is
/// eligible again once `retry_after` has passed since it failed.
#[derive(Debug)]
pub struct MemberList {
    state: Mutex<State>,
    retry_after: Duration,
}

impl MemberList {
    /// Builds a list from base URLs; trailing slashes and blanks are dropped.
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let members = endpoints
            .into_iter()
            .map(|e| e.as_ref().trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .map(|endpoint| Member {
                endpoint,
                down_since: None,
            })
            .collect();
        Self {
            state: Mutex::new(State { members, active: 0 }),
            retry_after: DEFAULT_MEMBER_RETRY,
        }
    }

    /// Sets how long a failed member sits out before it is tried again.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Parses a comma separated list, e.g. `http://m1:8080,http://m2:8080`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Marks `member` healthy again.
    pub fn mark_up(&self, member: &str) {
        let mut state = self.state.lock();
        if let Some(m) = state.members.iter_mut().find(|m| m.endpoint == member) {
            m.down_since = None;
        }
    }

    /// Endpoints currently marked up.
    pub fn healthy(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .members
            .iter()
            .filter(|m| m.is_up())
            .map(|m| m.endpoint.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().members.is_empty()
    }
}

impl Cluster for MemberList {
    fn member(&self) -> Option<String> {
        let mut state = self.state.lock();
        for m in state.members.iter_mut() {
            if m.down_since.is_some_and(|since| since.elapsed() >= self.retry_after) {
                tracing::info!(member = %m.endpoint, "retrying cluster member");
                m.down_since = None;
            }
        }
        let count = state.members.len();
        let start = state.active;
        let index = (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&i| state.members[i].is_up())?;
        state.active = index;
        Some(state.members[index].endpoint.clone())
    }

    fn mark_down(&self, member: &str) {
        let mut state = self.state.lock();
        if let Some(m) = state.members.iter_mut().find(|m| m.endpoint == member) {
            if m.is_up() {
                tracing::warn!(member, "marking cluster member down");
                m.down_since = Some(Instant::now());
            }
        }
    }
}

//! Single-flight coordination of access-token renewal.
//!
//! A renewal *episode* starts when the first request sees a 401 and ends
//! when the reissue call resolves. Every other request that fails while
//! the episode is open subscribes to the same shared future instead of
//! issuing its own reissue call.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenewalError {
    #[error("reissue request failed: {0}")]
    Request(String),

    #[error("reissue response carried no usable credential")]
    MissingCredential,

    #[error("could not persist the new credential: {0}")]
    Storage(String),

    #[error("renewal was abandoned before it completed")]
    Abandoned,
}

pub type RenewalOutcome = Result<String, RenewalError>;

type EpisodeFuture = Shared<BoxFuture<'static, RenewalOutcome>>;

struct Episode {
    id: u64,
    sender: Option<oneshot::Sender<RenewalOutcome>>,
    outcome: EpisodeFuture,
}

#[derive(Default)]
struct State {
    episode: Option<Episode>,
    next_id: u64,
}

/// Owner of the renewal episode for one client instance.
#[derive(Default)]
pub struct TokenManager {
    state: Mutex<State>,
}

/// Result of [`TokenManager::join_or_begin`].
pub enum Renewal {
    /// Caller opened the episode and must perform the reissue call.
    Leader(RenewalTicket),
    /// An episode is already in flight; await it for the new credential.
    Follower(RenewalWaiter),
}

impl TokenManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is only a flag and a channel; a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_renewing(&self) -> bool {
        self.lock().episode.is_some()
    }

    /// Open a new episode. Returns `None` if one is already in flight.
    pub fn begin_renewal(self: &Arc<Self>) -> Option<RenewalTicket> {
        let mut state = self.lock();
        if state.episode.is_some() {
            return None;
        }
        Some(self.open_episode(&mut state))
    }

    /// Subscribe to the in-flight episode. Returns `None` if none is open.
    pub fn enqueue_waiter(&self) -> Option<RenewalWaiter> {
        let state = self.lock();
        state.episode.as_ref().map(|ep| RenewalWaiter {
            outcome: ep.outcome.clone(),
        })
    }

    /// Atomically follow the in-flight episode or open a new one.
    pub fn join_or_begin(self: &Arc<Self>) -> Renewal {
        let mut state = self.lock();
        if let Some(ep) = state.episode.as_ref() {
            return Renewal::Follower(RenewalWaiter {
                outcome: ep.outcome.clone(),
            });
        }
        Renewal::Leader(self.open_episode(&mut state))
    }

    /// Close the episode and release every waiter with the new credential.
    pub fn resolve_renewal(&self, ticket: RenewalTicket, credential: String) {
        ticket.complete(Ok(credential));
    }

    /// Close the episode and reject every waiter.
    pub fn fail_renewal(&self, ticket: RenewalTicket, error: RenewalError) {
        ticket.complete(Err(error));
    }

    fn open_episode(self: &Arc<Self>, state: &mut State) -> RenewalTicket {
        let (sender, receiver) = oneshot::channel::<RenewalOutcome>();
        let outcome = receiver
            .map(|received| received.unwrap_or(Err(RenewalError::Abandoned)))
            .boxed()
            .shared();

        state.next_id += 1;
        let id = state.next_id;
        state.episode = Some(Episode {
            id,
            sender: Some(sender),
            outcome,
        });
        debug!(episode = id, "Renewal episode opened");

        RenewalTicket {
            manager: Arc::clone(self),
            id,
            done: false,
        }
    }

    fn close(&self, id: u64, outcome: RenewalOutcome) {
        let sender = {
            let mut state = self.lock();
            if state.episode.as_ref().map(|ep| ep.id) != Some(id) {
                return;
            }
            state.episode.take().and_then(|mut ep| ep.sender.take())
        };
        debug!(episode = id, success = outcome.is_ok(), "Renewal episode closed");
        if let Some(sender) = sender {
            // Nobody listening is fine: no request queued behind this episode.
            let _ = sender.send(outcome);
        }
    }
}

/// Held by the request that opened an episode.
///
/// Dropping a ticket without completing it fails the episode with
/// [`RenewalError::Abandoned`], so waiters never hang.
pub struct RenewalTicket {
    manager: Arc<TokenManager>,
    id: u64,
    done: bool,
}

impl RenewalTicket {
    pub fn episode_id(&self) -> u64 {
        self.id
    }

    fn complete(mut self, outcome: RenewalOutcome) {
        self.done = true;
        self.manager.close(self.id, outcome);
    }
}

impl Drop for RenewalTicket {
    fn drop(&mut self) {
        if !self.done {
            self.manager.close(self.id, Err(RenewalError::Abandoned));
        }
    }
}

/// A subscription to an in-flight episode. Resolves to the new credential.
///
/// Dropping the waiter cancels the subscription; the replay it guarded
/// never runs.
pub struct RenewalWaiter {
    outcome: EpisodeFuture,
}

impl RenewalWaiter {
    pub async fn wait(self) -> RenewalOutcome {
        self.outcome.await
    }
}

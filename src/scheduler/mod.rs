//! This module drives a [`ReservationCache`] against a [`ReservationStore`]
//!
//! A [`Scheduler`] is the only owner of its cache. Intents and interactions are applied to the cache right away, in the order they are submitted,
//! and the remote calls they need are spawned as tokio tasks. Their completions come back over a channel, and are reconciled into the cache by the scheduler itself.
//!
//! A scheduler can be driven step by step (see [`Scheduler::submit`] and [`Scheduler::next_completion`]),
//! or run as a task of its own that is fed by a [`SchedulerHandle`] (see [`Scheduler::run`]).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::cache::{PendingCall, Reconciliation, ReservationCache};
use crate::config::DEFAULT_TIMEOUT;
use crate::editor::EditorSession;
use crate::error::{Error, Result};
use crate::id::ReservationId;
use crate::intent::Intent;
use crate::reservation::{EntryKey, Reservation};
use crate::traits::ReservationStore;
use crate::translator::{translate, Interaction, Translation};

pub mod feedback;
use feedback::{CacheEvent, Command, CommandReceiver, FeedbackSender};

/// The outcome of a spawned remote call
#[derive(Debug)]
enum Completion {
    Loaded(Result<Vec<Reservation>>),
    Created(PendingCall, Result<ReservationId>),
    /// An update or a deletion
    Done(PendingCall, Result<()>),
}


/// Owns a reservation cache, and issues the remote calls its mutations need
pub struct Scheduler<S: ReservationStore + 'static> {
    store: Arc<S>,
    cache: ReservationCache,
    /// Every remote call is bounded by this duration. A call that times out is a failed call
    timeout: Duration,
    /// Remote calls that have been spawned, but whose completion has not been reconciled yet
    outstanding: usize,
    completion_tx: mpsc::UnboundedSender<Completion>,
    /// Taken by [`Self::run`]
    completion_rx: Option<mpsc::UnboundedReceiver<Completion>>,
    feedback: Option<FeedbackSender>,
}

impl<S: ReservationStore + 'static> Scheduler<S> {
    /// Create a scheduler with an empty cache. Nothing is fetched before [`Self::load`] or [`Self::request_load`] are called
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Create a scheduler for a store that is used elsewhere as well
    pub fn from_shared(store: Arc<S>) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            store,
            cache: ReservationCache::new(),
            timeout: DEFAULT_TIMEOUT,
            outstanding: 0,
            completion_tx,
            completion_rx: Some(completion_rx),
            feedback: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Every event of [`Self::run`] will be sent to this channel
    pub fn with_feedback(mut self, feedback: FeedbackSender) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn cache(&self) -> &ReservationCache {
        &self.cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The number of remote calls that have not been reconciled yet
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Fetch every reservation, and replace the cache with them. On failure, the cache is left untouched
    pub async fn load(&mut self) -> Result<usize> {
        let listing = bounded(self.timeout, self.store.list_reservations()).await;
        match listing {
            Ok(reservations) => {
                self.cache.replace_all(reservations);
                Ok(self.cache.len())
            },
            Err(err) => {
                log::warn!("Unable to load reservations: {}", err);
                Err(err)
            },
        }
    }

    /// Same as [`Self::load`], but the listing is reconciled like any other completion
    pub fn request_load(&mut self) {
        let store = Arc::clone(&self.store);
        let timeout = self.timeout;
        self.spawn(async move {
            Completion::Loaded(bounded(timeout, store.list_reservations()).await)
        });
    }

    /// Applies an intent to the cache, and spawns the remote call it needs.
    ///
    /// Returns the key of the affected entry. An intent that cannot be applied (e.g. it targets an unknown reservation) changes nothing and issues no call.
    pub fn submit(&mut self, intent: Intent) -> Result<EntryKey> {
        log::debug!("Submitting {}", intent);
        let call = self.cache.apply(intent)?;
        let key = call.key().clone();
        self.spawn_call(call);
        Ok(key)
    }

    /// Translates a calendar widget interaction. Mutations are submitted right away, editor sessions are returned
    pub fn interact(&mut self, interaction: Interaction) -> Result<Option<EditorSession>> {
        match translate(&self.cache, interaction) {
            Translation::OpenEditor(session) => Ok(Some(session)),
            Translation::Mutate(intent) => self.submit(intent).map(|_| None),
            Translation::Nothing => Ok(None),
        }
    }

    /// Waits for the next remote call to complete, and reconciles it into the cache.
    ///
    /// Returns `None` when no call is outstanding.
    pub async fn next_completion(&mut self) -> Option<CacheEvent> {
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.completion_rx.as_mut()?.recv().await?;
        Some(self.reconcile(completion))
    }

    /// Waits until every outstanding remote call has been reconciled
    pub async fn settle(&mut self) -> Vec<CacheEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_completion().await {
            events.push(event);
        }
        events
    }

    /// Handles commands until every [`SchedulerHandle`](feedback::SchedulerHandle) has been dropped and every outstanding call has been reconciled.
    ///
    /// Every change is reported to the feedback channel (if any), followed by a [`CacheEvent::Render`]. Returns the final cache.
    pub async fn run(mut self, mut commands: CommandReceiver) -> ReservationCache {
        let mut completions = match self.completion_rx.take() {
            Some(rx) => rx,
            None => {
                log::error!("This scheduler has already been run");
                return self.cache;
            },
        };

        self.publish_render();
        let mut accepting = true;
        loop {
            if accepting == false && self.outstanding == 0 {
                break;
            }

            tokio::select! {
                command = commands.recv(), if accepting => {
                    match command {
                        None => {
                            log::debug!("Every handle has been dropped, waiting for {} remote calls", self.outstanding);
                            accepting = false;
                        },
                        Some(command) => self.execute(command),
                    }
                },
                Some(completion) = completions.recv() => {
                    let event = self.reconcile(completion);
                    self.publish(event);
                    self.publish_render();
                },
                else => break,
            }
        }
        self.cache
    }


    fn execute(&mut self, command: Command) {
        match command {
            Command::Reload => self.request_load(),
            Command::Submit(intent) => {
                match self.submit(intent.clone()) {
                    Ok(_) => self.publish_render(),
                    Err(error) => {
                        log::warn!("Unable to apply {}: {}", intent, error);
                        self.publish(CacheEvent::Rejected{ intent, error });
                    },
                }
            },
            Command::Interact(interaction) => {
                match translate(&self.cache, interaction) {
                    Translation::OpenEditor(session) => self.publish(CacheEvent::EditorOpened(session)),
                    Translation::Mutate(intent) => self.execute(Command::Submit(intent)),
                    Translation::Nothing => {},
                }
            },
        }
    }

    fn spawn_call(&mut self, call: PendingCall) {
        let store = Arc::clone(&self.store);
        let timeout = self.timeout;
        self.spawn(async move {
            match call {
                PendingCall::Create{ ref draft, .. } => {
                    let result = bounded(timeout, store.create_reservation(draft)).await;
                    Completion::Created(call, result)
                },
                PendingCall::Update{ ref id, ref fields, .. } => {
                    let result = bounded(timeout, store.update_reservation(id, fields)).await;
                    Completion::Done(call, result)
                },
                PendingCall::Delete{ ref id, .. } => {
                    let result = bounded(timeout, store.delete_reservation(id)).await;
                    Completion::Done(call, result)
                },
            }
        });
    }

    fn spawn<F>(&mut self, remote_call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.outstanding += 1;
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let completion = remote_call.await;
            if completion_tx.send(completion).is_err() {
                log::debug!("The scheduler has been dropped before a remote call completed");
            }
        });
    }

    fn reconcile(&mut self, completion: Completion) -> CacheEvent {
        self.outstanding = self.outstanding.saturating_sub(1);

        match completion {
            Completion::Loaded(Ok(reservations)) => {
                self.cache.replace_all(reservations);
                CacheEvent::Loaded{ count: self.cache.len() }
            },
            Completion::Loaded(Err(err)) => {
                log::warn!("Unable to load reservations: {}", err);
                CacheEvent::LoadFailed(err)
            },

            Completion::Created(call, Ok(id)) => {
                let key = call.key().clone();
                let outcome = match &call {
                    PendingCall::Create{ draft, .. } => self.cache.confirm_create(&key, id.clone(), draft),
                    _ => Reconciliation::Stale,
                };
                match outcome {
                    Reconciliation::Stale => CacheEvent::Stale{ key },
                    _ => CacheEvent::Created{ key, id },
                }
            },
            Completion::Created(call, Err(error)) => {
                let outcome = self.cache.fail_create(call.key());
                failure(call, error, outcome)
            },

            Completion::Done(call, Ok(())) => {
                let outcome = match &call {
                    PendingCall::Update{ key, seq, fields, .. } => self.cache.confirm_update(key, *seq, fields.clone()),
                    PendingCall::Delete{ key, .. } => self.cache.confirm_delete(key),
                    PendingCall::Create{ .. } => Reconciliation::Stale,
                };
                match (outcome, call) {
                    (Reconciliation::Stale, call) => CacheEvent::Stale{ key: call.key().clone() },
                    (_, PendingCall::Delete{ key, id, .. }) => CacheEvent::Deleted{ key, id },
                    (_, PendingCall::Update{ key, id, .. }) => CacheEvent::Updated{ key, id },
                    (_, call) => CacheEvent::Stale{ key: call.key().clone() },
                }
            },
            Completion::Done(call, Err(error)) => {
                let outcome = match &call {
                    PendingCall::Update{ key, seq, .. } => self.cache.fail_update(key, *seq),
                    PendingCall::Delete{ key, seq, .. } => self.cache.fail_delete(key, *seq),
                    PendingCall::Create{ key, .. } => self.cache.fail_create(key),
                };
                failure(call, error, outcome)
            },
        }
    }

    fn publish(&self, event: CacheEvent) {
        log::trace!("{}", event);
        if let Some(sender) = &self.feedback {
            if sender.send(event).is_err() {
                log::debug!("Nobody listens to the feedback channel anymore");
            }
        }
    }

    fn publish_render(&self) {
        if self.feedback.is_some() {
            self.publish(CacheEvent::Render(self.cache.rendered_events()));
        }
    }
}

/// A failed remote call is always reported, even when the cache had nothing left to roll back
fn failure(call: PendingCall, error: Error, outcome: Reconciliation) -> CacheEvent {
    let intent = call.to_intent();
    log::warn!("{} failed ({:?}): {}", intent, outcome, error);
    CacheEvent::MutationFailed{ intent, error }
}

async fn bounded<T, F>(timeout: Duration, remote_call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, remote_call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(Error::Timeout(timeout)),
    }
}

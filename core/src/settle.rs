//! Bridging transport events into a single-settlement future.
//!
//! # Design
//! A request moves through
//! `Idle -> Sending -> AwaitingResponse -> {Succeeded | FailedHttp | FailedTransport}`.
//! The driving task consumes the transport's events in arrival order,
//! aggregates the body and settles the request once. Whatever arrives
//! afterwards (late chunks, a second terminal event, an abort that lost the
//! race) finds the settlement already taken and is ignored.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use log::{debug, trace};
use tokio::sync::{oneshot, watch};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::aggregate::{decode, Aggregator};
use crate::error::QueryError;
use crate::http::{Headers, HttpResponse};
use crate::transport::{EventStream, TransportEvent};

/// Outcome of one request.
pub type Outcome = Result<HttpResponse, QueryError>;

/// A value that can be delivered exactly once.
#[derive(Debug)]
pub struct Settlement<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Settlement<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let settlement = Self {
            sender: Mutex::new(Some(tx)),
        };
        (settlement, rx)
    }

    /// Deliver `value` unless something already was. Returns whether this
    /// call settled.
    pub fn settle(&self, value: T) -> bool {
        self.settle_with(value, |_| {})
    }

    /// Like `settle`, running `on_settle` before the value is delivered.
    pub fn settle_with(&self, value: T, on_settle: impl FnOnce(&T)) -> bool {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.take() {
            Some(tx) => {
                on_settle(&value);
                // A dropped receiver means nobody is waiting; settled all the same.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    /// Run `f` only while nothing has been delivered, holding off settlement
    /// until it returns.
    pub fn while_pending(&self, f: impl FnOnce()) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.is_some() {
            f();
            true
        } else {
            false
        }
    }
}

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    AwaitingResponse,
    Succeeded,
    FailedHttp,
    FailedTransport,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Succeeded | Phase::FailedHttp | Phase::FailedTransport
        )
    }

    fn of(outcome: &Outcome) -> Phase {
        match outcome {
            Ok(_) => Phase::Succeeded,
            Err(err) if err.status().is_some() => Phase::FailedHttp,
            Err(_) => Phase::FailedTransport,
        }
    }
}

/// Shared between a request's driving task and its `Pending` handle.
#[derive(Debug)]
pub(crate) struct Bridge {
    id: Uuid,
    settlement: Settlement<Outcome>,
    phase: watch::Sender<Phase>,
}

impl Bridge {
    pub(crate) fn new(id: Uuid) -> (Self, oneshot::Receiver<Outcome>, watch::Receiver<Phase>) {
        let (settlement, outcome) = Settlement::new();
        let (phase, phase_rx) = watch::channel(Phase::Idle);
        let bridge = Self {
            id,
            settlement,
            phase,
        };
        (bridge, outcome, phase_rx)
    }

    pub(crate) fn enter(&self, phase: Phase) {
        self.settlement.while_pending(|| {
            trace!("{}: {:?}", self.id, phase);
            self.phase.send_replace(phase);
        });
    }

    /// Settle with `outcome`, turning responses with status >= 400 into
    /// rejections.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        let outcome = outcome.and_then(|response| {
            if response.is_success() {
                Ok(response)
            } else {
                Err(QueryError::Http(Box::new(response)))
            }
        });
        let settled = self.settlement.settle_with(outcome, |outcome| {
            let phase = Phase::of(outcome);
            match outcome {
                Ok(response) => debug!("{}: settled {:?} ({})", self.id, phase, response.status),
                Err(err) => debug!("{}: settled {:?} ({err})", self.id, phase),
            }
            self.phase.send_replace(phase);
        });
        if !settled {
            debug!("{}: already settled, ignoring outcome", self.id);
        }
        settled
    }

    /// Consume `events` until the exchange completes.
    ///
    /// A channel that closes before a terminal event counts as an abort.
    pub(crate) async fn collect(&self, mut events: EventStream) -> Outcome {
        let mut head: Option<(u16, Headers)> = None;
        let mut aggregator = Aggregator::new();

        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Head { status, headers } => {
                    self.enter(Phase::AwaitingResponse);
                    head = Some((status, headers));
                }
                TransportEvent::Chunk(chunk) => aggregator.push(chunk),
                TransportEvent::End => {
                    let Some((status, headers)) = head else {
                        return Err(QueryError::transport("response ended before its head"));
                    };
                    trace!("{}: {} byte body", self.id, aggregator.len());
                    return aggregator.finish(status, headers);
                }
                TransportEvent::Load {
                    status,
                    headers,
                    body,
                } => {
                    self.enter(Phase::AwaitingResponse);
                    return decode(status, headers, body);
                }
                TransportEvent::Error(err) => return Err(QueryError::Transport(err)),
                TransportEvent::Abort => return Err(QueryError::Aborted),
            }
        }
        Err(QueryError::Aborted)
    }
}

/// An in-flight request.
///
/// Resolves to the aggregated response when the status is below 400, and
/// rejects otherwise. Dropping it does not cancel the request; use
/// [`Pending::abort`].
#[derive(Debug)]
pub struct Pending {
    id: Uuid,
    outcome: oneshot::Receiver<Outcome>,
    phase: watch::Receiver<Phase>,
    bridge: Arc<Bridge>,
    task: AbortHandle,
}

impl Pending {
    pub(crate) fn new(
        bridge: Arc<Bridge>,
        outcome: oneshot::Receiver<Outcome>,
        phase: watch::Receiver<Phase>,
        task: AbortHandle,
    ) -> Self {
        Self {
            id: bridge.id,
            outcome,
            phase,
            bridge,
            task,
        }
    }

    /// Identifier used in this request's log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Cancel the request. If it has not settled yet it is rejected with
    /// `QueryError::Aborted`; otherwise nothing happens.
    pub fn abort(&self) {
        if self.bridge.settle(Err(QueryError::Aborted)) {
            self.task.abort();
        }
    }
}

impl Future for Pending {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(QueryError::Aborted)))
    }
}

//! The pending-request table.
//!
//! Every in-flight review request owns exactly one slot here, keyed by its
//! correlation id. The link's reader task appends inbound agent chunks; the
//! caller suspends on a [`VerdictWaiter`] until the slot resolves. A slot
//! resolves exactly once: by completion (all expected agents delivered a
//! verdict), by removal (timeout or caller cancellation), or by a
//! connection-level failure.
//!
//! All mutation happens under one mutex, held only for the duration of the
//! map operation itself. The lock is never held across an await point.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;

use conclave_core::{AgentVerdict, ConclaveError};

use crate::protocol::decision_from_narrative;

type SlotResult = Result<Vec<AgentVerdict>, ConclaveError>;

/// One in-flight request: per-agent narrative buffers, completed verdicts in
/// arrival order, and the waiter the caller suspends on.
struct PendingSlot {
    buffers: HashMap<String, String>,
    verdicts: Vec<AgentVerdict>,
    waiter: Option<oneshot::Sender<SlotResult>>,
}

impl PendingSlot {
    fn new(waiter: oneshot::Sender<SlotResult>) -> Self {
        Self {
            buffers: HashMap::new(),
            verdicts: Vec::new(),
            waiter: Some(waiter),
        }
    }
}

/// Receiver half of a pending request; resolves when the slot does.
#[derive(Debug)]
pub struct VerdictWaiter {
    rx: oneshot::Receiver<SlotResult>,
}

impl VerdictWaiter {
    /// Suspend until the slot resolves.
    ///
    /// # Errors
    ///
    /// Returns the error the slot was failed with, or
    /// [`ConclaveError::ConnectionLost`] if the table went away without
    /// resolving the slot.
    pub async fn recv(&mut self) -> SlotResult {
        match (&mut self.rx).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ConclaveError::ConnectionLost),
        }
    }

    /// Non-blocking check for a resolution that raced the deadline.
    pub fn try_recv(&mut self) -> Option<SlotResult> {
        self.rx.try_recv().ok()
    }
}

/// Maps in-flight request ids to their pending slots.
///
/// # Examples
///
/// ```
/// use conclave_gateway::CorrelationTable;
///
/// let table = CorrelationTable::new(3);
/// let _waiter = table.register("req-1").unwrap();
/// assert!(table.register("req-1").is_err());
/// ```
pub struct CorrelationTable {
    expected: usize,
    slots: Mutex<HashMap<String, PendingSlot>>,
}

impl CorrelationTable {
    /// Create a table expecting `expected` verdicts per request.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Number of verdicts a request needs to complete.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Register a new pending request and hand back its waiter.
    ///
    /// # Errors
    ///
    /// Returns [`ConclaveError::DuplicateId`] if the id already has a live
    /// slot; the newer registration fails, the existing slot is untouched.
    pub fn register(&self, id: &str) -> Result<VerdictWaiter, ConclaveError> {
        let mut slots = self.slots.lock().expect("correlation table poisoned");
        if slots.contains_key(id) {
            return Err(ConclaveError::DuplicateId(id.to_string()));
        }
        let (tx, rx) = oneshot::channel();
        slots.insert(id.to_string(), PendingSlot::new(tx));
        Ok(VerdictWaiter { rx })
    }

    /// Append an agent's narrative chunk to a pending request.
    ///
    /// A `completed` chunk finalizes that agent's verdict from its
    /// accumulated narrative. A later completed chunk from the same agent
    /// replaces the earlier verdict; the distinct-agent count never
    /// double-counts. When the last expected agent completes, the slot is
    /// removed and its waiter resolved. Returns whether the request is now
    /// complete.
    ///
    /// # Errors
    ///
    /// Returns [`ConclaveError::UnknownId`] if no slot exists for `id` —
    /// the caller decides whether that is a drop-and-log condition.
    pub fn append_chunk(
        &self,
        id: &str,
        agent: &str,
        content: &str,
        completed: bool,
    ) -> Result<bool, ConclaveError> {
        let mut slots = self.slots.lock().expect("correlation table poisoned");
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| ConclaveError::UnknownId(id.to_string()))?;

        let buffer = slot.buffers.entry(agent.to_string()).or_default();
        buffer.push_str(content);

        if !completed {
            return Ok(false);
        }

        let narrative = buffer.clone();
        let verdict = AgentVerdict {
            agent: agent.to_string(),
            decision: decision_from_narrative(&narrative),
            narrative,
        };
        match slot.verdicts.iter_mut().find(|v| v.agent == agent) {
            Some(existing) => *existing = verdict,
            None => slot.verdicts.push(verdict),
        }

        if slot.verdicts.len() < self.expected {
            return Ok(false);
        }

        let mut slot = slots.remove(id).expect("slot present");
        if let Some(waiter) = slot.waiter.take() {
            let _ = waiter.send(Ok(slot.verdicts));
        }
        Ok(true)
    }

    /// Detach a pending request, returning any verdicts collected so far.
    ///
    /// Idempotent: removing an id that is not present returns `None`.
    pub fn remove(&self, id: &str) -> Option<Vec<AgentVerdict>> {
        let mut slots = self.slots.lock().expect("correlation table poisoned");
        slots.remove(id).map(|slot| slot.verdicts)
    }

    /// Resolve one pending request with an error.
    ///
    /// Returns `false` if no slot exists for `id`.
    pub fn fail(&self, id: &str, err: ConclaveError) -> bool {
        let mut slots = self.slots.lock().expect("correlation table poisoned");
        match slots.remove(id) {
            Some(mut slot) => {
                if let Some(waiter) = slot.waiter.take() {
                    let _ = waiter.send(Err(err));
                }
                true
            }
            None => false,
        }
    }

    /// Resolve every pending request with a connection-level error.
    pub fn fail_all(&self, make_err: impl Fn() -> ConclaveError) {
        let mut slots = self.slots.lock().expect("correlation table poisoned");
        for (_, mut slot) in slots.drain() {
            if let Some(waiter) = slot.waiter.take() {
                let _ = waiter.send(Err(make_err()));
            }
        }
    }

    /// Number of requests currently in flight.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("correlation table poisoned").len()
    }

    /// Whether no requests are in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

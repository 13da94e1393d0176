//! Host discrete-event kernel
//!
//! The scheduler arms and withdraws timers through [`EventKernel`].
//! [`EventQueue`] is the in-process kernel used for headless runs: a time
//! ordered queue where events scheduled for the same time fire in the order
//! they were scheduled.

use log::{debug, error};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, HashMap};

use super::error::{InjectionError, InjectionResult};
use super::types::SimTime;

/// Handle to a pending timer, used to withdraw it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// A timer event delivered by the kernel
#[derive(Debug, Clone, PartialEq)]
pub struct TimerEvent {
    pub handle: TimerHandle,
    pub time: SimTime,
    pub name: String,
}

/// Timer and run-control primitives consumed from the host kernel
pub trait EventKernel {
    /// Current simulated time
    fn now(&self) -> SimTime;

    /// Schedule a named event at an absolute simulated time
    fn schedule_at(&mut self, time: SimTime, name: &str) -> InjectionResult<TimerHandle>;

    /// Withdraw a pending event. Returns false if it was not pending.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Terminate the run, dropping every pending event
    fn end_run(&mut self, reason: &str);
}

type QueueKey = (OrderedFloat<SimTime>, u64);

#[derive(Debug, Default)]
pub struct EventQueue {
    now: SimTime,
    queue: BTreeMap<QueueKey, TimerEvent>,
    keys: HashMap<TimerHandle, QueueKey>,
    next_handle: u64,
    termination: Option<String>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the earliest pending event and advance time to it
    pub fn pop_next(&mut self) -> Option<TimerEvent> {
        let (_, event) = self.queue.pop_first()?;
        self.keys.remove(&event.handle);
        self.now = event.time;
        Some(event)
    }

    /// Time of the earliest pending event
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.keys().next().map(|(time, _)| time.into_inner())
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.keys.contains_key(&handle)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination_reason(&self) -> Option<&str> {
        self.termination.as_deref()
    }
}

impl EventKernel for EventQueue {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_at(&mut self, time: SimTime, name: &str) -> InjectionResult<TimerHandle> {
        if self.termination.is_some() {
            return Err(InjectionError::RunTerminated);
        }
        if time.is_nan() || time < self.now {
            return Err(InjectionError::ScheduleInPast {
                time,
                now: self.now,
            });
        }

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let key = (OrderedFloat(time), handle.0);
        self.queue.insert(
            key,
            TimerEvent {
                handle,
                time,
                name: name.to_string(),
            },
        );
        self.keys.insert(handle, key);
        debug!("Scheduled '{}' at {:.3}s", name, time);
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.keys.remove(&handle) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    fn end_run(&mut self, reason: &str) {
        error!("Run terminated at {:.3}s: {}", self.now, reason);
        self.queue.clear();
        self.keys.clear();
        self.termination = Some(reason.to_string());
    }
}

//! Headless driver tying the event queue and the scheduler together

use log::{error, info};

use super::client::TrafficControlClient;
use super::config::InjectionConfig;
use super::error::{InjectionError, InjectionResult};
use super::kernel::{EventKernel, EventQueue, TimerEvent};
use super::scheduler::{InjectionOutcome, InjectionScheduler, SchedulerState};
use super::types::SimTime;

/// One simulation run: the kernel's event queue plus the injection scheduler
pub struct InjectionRun<C> {
    queue: EventQueue,
    scheduler: InjectionScheduler<C>,
}

impl<C: TrafficControlClient> InjectionRun<C> {
    pub fn new(client: C, config: InjectionConfig) -> InjectionResult<Self> {
        Ok(Self {
            queue: EventQueue::new(),
            scheduler: InjectionScheduler::new(client, config)?,
        })
    }

    pub fn scheduler(&self) -> &InjectionScheduler<C> {
        &self.scheduler
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Direct access to the event queue, e.g. to schedule foreign events
    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    /// Arm the scheduler
    ///
    /// Starting twice is refused without disturbing the run.
    pub fn start(&mut self) -> InjectionResult<()> {
        match self.scheduler.start(&mut self.queue) {
            Err(InjectionError::AlreadyStarted) => Err(InjectionError::AlreadyStarted),
            result => self.fail_on_error(result),
        }
    }

    /// Deliver the next pending event
    ///
    /// Returns `None` once no events are left. A fatal error terminates the
    /// run before it is returned.
    pub fn step(&mut self) -> InjectionResult<Option<(TimerEvent, Option<InjectionOutcome>)>> {
        let Some(event) = self.queue.pop_next() else {
            return Ok(None);
        };
        let result = self.scheduler.handle_event(&mut self.queue, &event);
        let outcome = self.fail_on_error(result)?;
        Ok(Some((event, outcome)))
    }

    /// Run until no events are left, starting the scheduler if needed
    pub fn run(&mut self) -> InjectionResult<()> {
        if self.scheduler.state() == SchedulerState::Idle {
            self.start()?;
        }
        while self.step()?.is_some() {}

        self.scheduler.stats().log_summary();
        Ok(())
    }

    /// Run every event due at or before `until`
    pub fn run_until(&mut self, until: SimTime) -> InjectionResult<()> {
        if self.scheduler.state() == SchedulerState::Idle {
            self.start()?;
        }
        while self.queue.peek_time().is_some_and(|time| time <= until) {
            self.step()?;
        }
        Ok(())
    }

    /// Tear down: withdraw any pending injection
    pub fn stop(&mut self) {
        self.scheduler.stop(&mut self.queue);
        info!("Injection stopped at {:.3}s", self.queue.now());
    }

    fn fail_on_error<T>(&mut self, result: InjectionResult<T>) -> InjectionResult<T> {
        if let Err(e) = &result {
            error!("Injection failed: {}", e);
            self.queue.end_run(&e.to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injection::error::Collection;
    use crate::injection::local_sim::LocalSimulator;

    fn config(quota: u32) -> InjectionConfig {
        InjectionConfig {
            seed: Some(5),
            ..InjectionConfig::new(quota, 3.0)
        }
    }

    #[test]
    fn test_run_exhausts_quota() {
        let sim = LocalSimulator::create_test_scenario().unwrap();
        let mut run = InjectionRun::new(sim, config(4)).unwrap();
        run.run().unwrap();

        assert_eq!(run.scheduler().state(), SchedulerState::Exhausted);
        assert_eq!(run.scheduler().client().vehicle_count(), 4);
        assert_eq!(run.queue().pending(), 0);
    }

    #[test]
    fn test_run_until_leaves_later_events_pending() {
        let sim = LocalSimulator::create_test_scenario().unwrap();
        let mut run = InjectionRun::new(sim, config(10)).unwrap();
        run.run_until(0.5).unwrap();
        assert_eq!(run.scheduler().remaining(), 10);
        assert_eq!(run.queue().pending(), 1);

        run.run_until(1.0).unwrap();
        let remaining = run.scheduler().remaining();
        assert!(remaining < 10);
        assert_eq!(run.scheduler().stats().cycles, 10 - remaining);
        assert_eq!(run.queue().pending(), 1);
        assert!(run.queue().peek_time().unwrap() > 1.0);
    }

    #[test]
    fn test_bootstrap_failure_terminates_run() {
        let mut sim = LocalSimulator::create_test_scenario().unwrap();
        sim.fail_queries_for(Collection::Lanes);
        let mut run = InjectionRun::new(sim, config(3)).unwrap();

        let err = run.run().unwrap_err();
        assert!(matches!(
            err,
            InjectionError::Bootstrap {
                collection: Collection::Lanes,
                ..
            }
        ));
        assert!(run.queue().is_terminated());
        assert_eq!(run.queue().pending(), 0);
        assert_eq!(run.scheduler().client().submissions().len(), 0);
        assert_eq!(run.scheduler().state(), SchedulerState::Failed);
    }

    #[test]
    fn test_foreign_event_terminates_run() {
        let sim = LocalSimulator::create_test_scenario().unwrap();
        let mut run = InjectionRun::new(sim, config(3)).unwrap();
        run.start().unwrap();
        run.queue_mut().schedule_at(0.5, "beacon").unwrap();

        assert!(matches!(run.step(), Err(InjectionError::UnknownEvent(_))));
        let reason = run.queue().termination_reason().unwrap();
        assert!(reason.contains("beacon"), "{}", reason);
        assert!(run.scheduler().state().is_terminal());
        assert_eq!(run.queue().pending(), 0);
        assert!(run.step().unwrap().is_none());
    }

    #[test]
    fn test_second_start_keeps_run_alive() {
        let sim = LocalSimulator::create_test_scenario().unwrap();
        let mut run = InjectionRun::new(sim, config(2)).unwrap();
        run.start().unwrap();

        assert!(matches!(run.start(), Err(InjectionError::AlreadyStarted)));
        assert!(!run.queue().is_terminated());
        assert_eq!(run.queue().pending(), 1);
        assert!(matches!(
            run.scheduler().state(),
            SchedulerState::Armed { .. }
        ));

        run.run().unwrap();
        assert_eq!(run.scheduler().state(), SchedulerState::Exhausted);
        assert_eq!(run.scheduler().client().vehicle_count(), 2);
    }

    #[test]
    fn test_stop_cancels_remaining_injections() {
        let sim = LocalSimulator::create_test_scenario().unwrap();
        let mut run = InjectionRun::new(sim, config(10)).unwrap();
        run.start().unwrap();
        run.step().unwrap();
        run.stop();

        assert_eq!(run.scheduler().state(), SchedulerState::Cancelled);
        assert_eq!(run.queue().pending(), 0);
        assert!(run.step().unwrap().is_none());
        assert_eq!(run.scheduler().client().submissions().len(), 1);
    }
}

//! Periodic vehicle injection
//!
//! The scheduler keeps exactly one self-event armed at a time. Every time it
//! fires, one vehicle is injected, the quota is decremented and the event is
//! re-armed after a random gap until the quota is used up.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::client::TrafficControlClient;
use super::config::InjectionConfig;
use super::error::{InjectionError, InjectionResult};
use super::kernel::{EventKernel, TimerEvent, TimerHandle};
use super::policy::{select_route, InsertionFailurePolicy, VehicleTypeSelector};
use super::stats::InjectionStats;
use super::topology::TopologyCache;
use super::types::{DepartLane, InjectionRequest, SimTime, ADD_VEHICLE_EVENT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerState {
    /// Not started yet
    Idle,
    /// Waiting for the next injection event
    Armed {
        handle: TimerHandle,
        fire_at: SimTime,
    },
    /// Running an injection cycle
    Firing,
    /// Quota used up
    Exhausted,
    /// Stopped from outside before the quota was used up
    Cancelled,
    /// Hit a fatal error; the run is over
    Failed,
}

impl SchedulerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SchedulerState::Exhausted | SchedulerState::Cancelled | SchedulerState::Failed
        )
    }
}

/// Result of one injection cycle
#[derive(Debug, Clone, PartialEq)]
pub enum InjectionOutcome {
    /// The simulator accepted the vehicle
    Injected(InjectionRequest),
    /// The simulator did not accept the vehicle and the failure was tolerated
    Failed(InjectionRequest),
}

pub struct InjectionScheduler<C> {
    client: C,
    topology: TopologyCache,
    config: InjectionConfig,
    state: SchedulerState,
    /// Vehicles still to inject
    remaining: u32,
    rng: StdRng,
    vehicle_types: VehicleTypeSelector,
    stats: InjectionStats,
}

impl<C: TrafficControlClient> InjectionScheduler<C> {
    pub fn new(client: C, config: InjectionConfig) -> InjectionResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            client,
            topology: TopologyCache::new(),
            vehicle_types: VehicleTypeSelector::new(config.vehicle_type_policy),
            remaining: config.quota,
            config,
            state: SchedulerState::Idle,
            rng,
            stats: InjectionStats::default(),
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    pub fn stats(&self) -> &InjectionStats {
        &self.stats
    }

    pub fn topology(&self) -> &TopologyCache {
        &self.topology
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Arm the first injection event, or finish straight away for a zero quota
    pub fn start(&mut self, kernel: &mut dyn EventKernel) -> InjectionResult<()> {
        if self.state != SchedulerState::Idle {
            return Err(InjectionError::AlreadyStarted);
        }

        self.remaining = self.config.quota;
        if self.remaining == 0 {
            info!("Vehicle quota is zero, nothing to inject");
            self.state = SchedulerState::Exhausted;
            return Ok(());
        }

        let fire_at = kernel.now() + self.config.initial_delay;
        if let Err(e) = self.arm(kernel, fire_at) {
            self.state = SchedulerState::Failed;
            return Err(e);
        }
        info!(
            "Injecting {} vehicles, first at {:.3}s",
            self.remaining, fire_at
        );
        Ok(())
    }

    /// Withdraw the pending event, if any. Safe to call repeatedly.
    pub fn stop(&mut self, kernel: &mut dyn EventKernel) {
        match self.state {
            SchedulerState::Armed { handle, .. } => {
                kernel.cancel(handle);
                info!(
                    "Injection cancelled with {} vehicles left",
                    self.remaining
                );
                self.state = SchedulerState::Cancelled;
            }
            SchedulerState::Idle | SchedulerState::Firing => {
                self.state = SchedulerState::Cancelled;
            }
            SchedulerState::Exhausted | SchedulerState::Cancelled | SchedulerState::Failed => {}
        }
    }

    /// Deliver a timer event to the scheduler
    ///
    /// Returns the outcome of the injection cycle it triggered, or `None` for
    /// an event that is no longer current. Any error leaves the scheduler
    /// `Failed` with nothing armed.
    pub fn handle_event(
        &mut self,
        kernel: &mut dyn EventKernel,
        event: &TimerEvent,
    ) -> InjectionResult<Option<InjectionOutcome>> {
        if event.name != ADD_VEHICLE_EVENT {
            self.fail(kernel);
            return Err(InjectionError::UnknownEvent(event.name.clone()));
        }

        match self.state {
            SchedulerState::Armed { handle, .. } if handle == event.handle => {
                let result = self.fire(kernel);
                if result.is_err() {
                    self.fail(kernel);
                }
                result.map(Some)
            }
            state => {
                debug!("Ignoring stale '{}' event in state {:?}", event.name, state);
                Ok(None)
            }
        }
    }

    fn fire(&mut self, kernel: &mut dyn EventKernel) -> InjectionResult<InjectionOutcome> {
        self.state = SchedulerState::Firing;
        let now = kernel.now();

        let outcome = self.inject(now)?;
        self.remaining -= 1;

        if self.remaining > 0 {
            let fire_at = now + self.next_offset();
            self.arm(kernel, fire_at)?;
        } else {
            info!("Vehicle quota used up at {:.3}s", now);
            self.state = SchedulerState::Exhausted;
        }
        Ok(outcome)
    }

    /// Withdraw any pending event and stop for good, unless already finished
    fn fail(&mut self, kernel: &mut dyn EventKernel) {
        match self.state {
            SchedulerState::Armed { handle, .. } => {
                kernel.cancel(handle);
            }
            SchedulerState::Exhausted | SchedulerState::Cancelled => return,
            SchedulerState::Idle | SchedulerState::Firing | SchedulerState::Failed => {}
        }
        self.state = SchedulerState::Failed;
    }

    fn arm(&mut self, kernel: &mut dyn EventKernel, fire_at: SimTime) -> InjectionResult<()> {
        let handle = kernel.schedule_at(fire_at, ADD_VEHICLE_EVENT)?;
        self.state = SchedulerState::Armed { handle, fire_at };
        Ok(())
    }

    /// Gap until the next injection, uniform over `[0, mean_inter_arrival)`
    fn next_offset(&mut self) -> SimTime {
        self.rng.random_range(0.0..self.config.mean_inter_arrival)
    }

    fn inject(&mut self, now: SimTime) -> InjectionResult<InjectionOutcome> {
        if !self.topology.is_loaded() {
            self.topology.ensure_loaded(&mut self.client)?;
            self.stats.bootstrap_time = Some(now);
            info!(
                "Topology loaded: {} roads, {} lanes, {} routes, {} junctions, {} vehicle types",
                self.topology.road_ids()?.len(),
                self.topology.lane_ids()?.len(),
                self.topology.route_ids()?.len(),
                self.topology.junction_ids()?.len(),
                self.topology.vehicle_type_ids()?.len()
            );
        }

        let route_id = select_route(
            self.topology.route_ids()?,
            self.config.route_randomize,
            &mut self.rng,
        )?;
        let depart_lane = DepartLane::from_randomize(self.config.lane_randomize);
        let vehicle_type = self
            .vehicle_types
            .select(self.topology.vehicle_type_ids()?, &mut self.rng)?;
        let vehicle_id = self.config.category.vehicle_id(self.remaining);

        let request = InjectionRequest::new(vehicle_id, vehicle_type, route_id, depart_lane);
        self.stats.cycles += 1;
        self.submit(request, now)
    }

    fn submit(
        &mut self,
        request: InjectionRequest,
        now: SimTime,
    ) -> InjectionResult<InjectionOutcome> {
        let policy = self.config.failure_policy;
        let max_submissions = policy.max_submissions();
        let mut last_error = None;

        for submission in 1..=max_submissions {
            if submission > 1 {
                self.stats.retries += 1;
            }
            self.stats.submissions += 1;

            match self.client.add_vehicle(&request) {
                Ok(true) => {
                    info!(
                        "Vehicle insertion SUCCESS at {:.3}s: {} ({}) on route {}",
                        now, request.vehicle_id, request.vehicle_type, request.route_id
                    );
                    self.stats.injected += 1;
                    self.stats.last_injection_time = Some(now);
                    return Ok(InjectionOutcome::Injected(request));
                }
                Ok(false) => {
                    warn!(
                        "Vehicle insertion FAILURE at {:.3}s: {} (attempt {}/{})",
                        now, request.vehicle_id, submission, max_submissions
                    );
                }
                Err(e) => {
                    warn!(
                        "Vehicle insertion FAILURE at {:.3}s: {} (attempt {}/{}): {:#}",
                        now, request.vehicle_id, submission, max_submissions, e
                    );
                    last_error = Some(e);
                }
            }
        }

        self.stats.failed += 1;
        match policy {
            InsertionFailurePolicy::Abort => Err(match last_error {
                Some(source) => InjectionError::InsertionFailed {
                    vehicle_id: request.vehicle_id,
                    source,
                },
                None => InjectionError::InsertionRejected(request.vehicle_id),
            }),
            InsertionFailurePolicy::Ignore | InsertionFailurePolicy::Retry { .. } => {
                Ok(InjectionOutcome::Failed(request))
            }
        }
    }
}

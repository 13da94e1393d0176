//! Periodic vehicle injection into an external traffic simulation
//!
//! The scheduler fires a self-event at random intervals, loads the road
//! network topology from the simulator on first use, and submits one
//! vehicle-creation command per event until its quota is used up. The
//! simulator and the event kernel are reached through traits; in-process
//! implementations of both are provided for headless runs and tests.

mod client;
mod config;
mod error;
mod kernel;
mod local_sim;
mod policy;
mod runner;
mod scheduler;
mod stats;
mod topology;
mod types;

// Re-export public types for external use
pub use client::TrafficControlClient;
pub use config::{
    quota_from_count, InjectionConfig, MapParameters, ParamValue, ParameterSource,
    DEFAULT_INITIAL_DELAY, PARAM_ARRIVAL_INTERVAL, PARAM_CATEGORY, PARAM_INITIAL_DELAY,
    PARAM_INSERT_RETRIES, PARAM_LANE_RANDOMIZE, PARAM_ON_INSERT_FAILURE, PARAM_QUOTA,
    PARAM_ROUTE_RANDOMIZE, PARAM_SEED, PARAM_VEHICLE_TYPE_INDEX, PARAM_VEHICLE_TYPE_POLICY,
};
pub use error::{Collection, InjectionError, InjectionResult};
pub use kernel::{EventKernel, EventQueue, TimerEvent, TimerHandle};
pub use local_sim::{LocalSimulator, RoadEdge};
pub use policy::{
    select_route, InsertionFailurePolicy, VehicleTypePolicy, VehicleTypeSelector,
    DEFAULT_INSERT_RETRIES, DEFAULT_VEHICLE_TYPE_INDEX,
};
pub use runner::InjectionRun;
pub use scheduler::{InjectionOutcome, InjectionScheduler, SchedulerState};
pub use stats::InjectionStats;
pub use topology::{Lane, LoadState, Road, Route, TopologyCache};
pub use types::{
    DepartLane, DepartPosition, DepartSpeed, DepartTime, InjectionRequest, JunctionId, LaneId,
    RoadId, RouteId, SimTime, VehicleCategory, VehicleId, VehicleTypeId, ADD_VEHICLE_EVENT,
    PEDESTRIAN_TYPE,
};

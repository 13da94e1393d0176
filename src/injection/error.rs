//! Errors raised by the injection controller

use std::fmt;

use super::types::VehicleId;

/// The five collections held by the topology cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Roads,
    Lanes,
    Routes,
    Junctions,
    VehicleTypes,
}

impl Collection {
    /// Bootstrap order; every collection depends only on the ones before it
    pub const LOAD_ORDER: [Collection; 5] = [
        Collection::Roads,
        Collection::Lanes,
        Collection::Routes,
        Collection::Junctions,
        Collection::VehicleTypes,
    ];
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Roads => "roads",
            Collection::Lanes => "lanes",
            Collection::Routes => "routes",
            Collection::Junctions => "junctions",
            Collection::VehicleTypes => "vehicle types",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    #[error("{0} queried before the topology was loaded")]
    NotLoaded(Collection),

    #[error("unknown {collection} id '{id}'")]
    NotFound { collection: Collection, id: String },

    #[error("failed to load {collection} from the simulator")]
    Bootstrap {
        collection: Collection,
        #[source]
        source: anyhow::Error,
    },

    #[error("lane '{lane}' belongs to road '{road}' which the simulator did not list")]
    UnknownRoad { lane: String, road: String },

    #[error("no routes known to the simulator, cannot pick a route")]
    NoRoutes,

    #[error("no vehicle types known to the simulator, cannot pick a vehicle type")]
    NoVehicleTypes,

    #[error("received unknown event '{0}'")]
    UnknownEvent(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{name}' is not a {expected}")]
    ParameterType { name: String, expected: &'static str },

    #[error("cannot schedule an event at {time}s, time is already {now}s")]
    ScheduleInPast { time: f64, now: f64 },

    #[error("the run has been terminated")]
    RunTerminated,

    #[error("the injection scheduler has already been started")]
    AlreadyStarted,

    #[error("simulator rejected vehicle '{0}'")]
    InsertionRejected(VehicleId),

    #[error("failed to submit vehicle '{vehicle_id}'")]
    InsertionFailed {
        vehicle_id: VehicleId,
        #[source]
        source: anyhow::Error,
    },
}

pub type InjectionResult<T> = std::result::Result<T, InjectionError>;

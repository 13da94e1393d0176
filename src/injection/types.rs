//! Core types for the injection controller
//!
//! Identifiers are the string ids reported by the external simulator,
//! wrapped for type safety.

use std::fmt;

/// Simulated time in seconds
pub type SimTime = f64;

/// Vehicle type the simulator reports for pedestrians; never injected
pub const PEDESTRIAN_TYPE: &str = "DEFAULT_PEDTYPE";

/// Name of the self-event that triggers one injection cycle
pub const ADD_VEHICLE_EVENT: &str = "addCar";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// A directed road segment (an "edge" in simulator terms)
    RoadId
);
string_id!(
    /// A drivable lane within a road
    LaneId
);
string_id!(
    /// An ordered path through roads
    RouteId
);
string_id!(
    /// An intersection node
    JunctionId
);
string_id!(
    /// A class of injectable vehicle
    VehicleTypeId
);
string_id!(
    /// Id under which an injected vehicle is known to the simulator
    VehicleId
);

/// Category of injected vehicles; its tag prefixes every generated vehicle id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleCategory {
    /// Regular traffic
    #[default]
    Genuine,
    /// Misbehaving vehicles used by attack scenarios
    Attacker,
}

impl VehicleCategory {
    pub fn tag(&self) -> &'static str {
        match self {
            VehicleCategory::Genuine => "genuine",
            VehicleCategory::Attacker => "attacker",
        }
    }

    /// Builds the id for the vehicle injected while `remaining` vehicles are left
    pub fn vehicle_id(&self, remaining: u32) -> VehicleId {
        VehicleId(format!("{}{}", self.tag(), remaining))
    }
}

/// When the vehicle enters the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartTime {
    Now,
}

/// Where on the start lane the vehicle is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartPosition {
    /// Default base position at the start of the lane
    Base,
}

/// Speed of the vehicle on insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartSpeed {
    /// Maximum speed allowed on the start lane
    Max,
}

/// Lane placement policy, resolved by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartLane {
    /// Any lane of the first road, chosen at random
    Random,
    /// The simulator's own best-fit heuristic
    Best,
}

impl DepartLane {
    pub fn from_randomize(randomize: bool) -> Self {
        if randomize {
            DepartLane::Random
        } else {
            DepartLane::Best
        }
    }
}

/// One vehicle-creation command
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionRequest {
    pub vehicle_id: VehicleId,
    pub vehicle_type: VehicleTypeId,
    pub route_id: RouteId,
    pub depart_time: DepartTime,
    pub depart_position: DepartPosition,
    pub depart_speed: DepartSpeed,
    pub depart_lane: DepartLane,
}

impl InjectionRequest {
    pub fn new(
        vehicle_id: VehicleId,
        vehicle_type: VehicleTypeId,
        route_id: RouteId,
        depart_lane: DepartLane,
    ) -> Self {
        Self {
            vehicle_id,
            vehicle_type,
            route_id,
            depart_time: DepartTime::Now,
            depart_position: DepartPosition::Base,
            depart_speed: DepartSpeed::Max,
            depart_lane,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_id_uses_category_tag() {
        assert_eq!(VehicleCategory::Genuine.vehicle_id(7).as_str(), "genuine7");
        assert_eq!(VehicleCategory::Attacker.vehicle_id(1).as_str(), "attacker1");
    }

    #[test]
    fn test_request_uses_fixed_emit_policies() {
        let request = InjectionRequest::new(
            "genuine1".into(),
            "CarType".into(),
            "Route_A".into(),
            DepartLane::from_randomize(false),
        );
        assert_eq!(request.depart_time, DepartTime::Now);
        assert_eq!(request.depart_position, DepartPosition::Base);
        assert_eq!(request.depart_speed, DepartSpeed::Max);
        assert_eq!(request.depart_lane, DepartLane::Best);
    }
}

//! Control-protocol client for the external traffic simulator
//!
//! The controller only talks to the simulator through this trait, so a
//! socket-backed client and the in-process [`LocalSimulator`] are
//! interchangeable.
//!
//! [`LocalSimulator`]: super::local_sim::LocalSimulator

use anyhow::Result;

use super::types::{InjectionRequest, JunctionId, LaneId, RoadId, RouteId, VehicleTypeId};

/// Queries and commands consumed from the simulator
pub trait TrafficControlClient {
    /// All road ids known to the simulator
    fn road_ids(&mut self) -> Result<Vec<RoadId>>;

    /// All lane ids known to the simulator
    fn lane_ids(&mut self) -> Result<Vec<LaneId>>;

    /// All route ids known to the simulator
    fn route_ids(&mut self) -> Result<Vec<RouteId>>;

    /// All junction ids known to the simulator
    fn junction_ids(&mut self) -> Result<Vec<JunctionId>>;

    /// All vehicle type ids known to the simulator, pedestrians included
    fn vehicle_type_ids(&mut self) -> Result<Vec<VehicleTypeId>>;

    /// The road a lane belongs to
    fn lane_road(&mut self, lane: &LaneId) -> Result<RoadId>;

    /// The ordered roads a route runs through
    fn route_roads(&mut self, route: &RouteId) -> Result<Vec<RoadId>>;

    /// Submit a vehicle-creation command
    ///
    /// Returns `Ok(false)` when the simulator refused the insertion and `Err`
    /// when the command could not be delivered at all.
    fn add_vehicle(&mut self, request: &InjectionRequest) -> Result<bool>;
}

impl<C: TrafficControlClient + ?Sized> TrafficControlClient for &mut C {
    fn road_ids(&mut self) -> Result<Vec<RoadId>> {
        (**self).road_ids()
    }

    fn lane_ids(&mut self) -> Result<Vec<LaneId>> {
        (**self).lane_ids()
    }

    fn route_ids(&mut self) -> Result<Vec<RouteId>> {
        (**self).route_ids()
    }

    fn junction_ids(&mut self) -> Result<Vec<JunctionId>> {
        (**self).junction_ids()
    }

    fn vehicle_type_ids(&mut self) -> Result<Vec<VehicleTypeId>> {
        (**self).vehicle_type_ids()
    }

    fn lane_road(&mut self, lane: &LaneId) -> Result<RoadId> {
        (**self).lane_road(lane)
    }

    fn route_roads(&mut self, route: &RouteId) -> Result<Vec<RoadId>> {
        (**self).route_roads(route)
    }

    fn add_vehicle(&mut self, request: &InjectionRequest) -> Result<bool> {
        (**self).add_vehicle(request)
    }
}

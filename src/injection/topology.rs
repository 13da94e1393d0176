//! Lazily loaded cache of the simulator's road network
//!
//! Every collection is fetched from the simulator at most once per run. The
//! load steps depend on each other (lanes need roads, routes need the lanes
//! of their first road), so they always run in [`Collection::LOAD_ORDER`].

use log::{debug, warn};
use std::collections::HashMap;

use super::client::TrafficControlClient;
use super::error::{Collection, InjectionError, InjectionResult};
use super::types::{JunctionId, LaneId, RoadId, RouteId, VehicleTypeId, PEDESTRIAN_TYPE};

/// Load progress of a single collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
}

/// A road and the lanes found on it
#[derive(Debug, Clone, PartialEq)]
pub struct Road {
    pub id: RoadId,
    pub lanes: Vec<LaneId>,
}

impl Road {
    fn new(id: RoadId) -> Self {
        Self {
            id,
            lanes: Vec::new(),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub id: LaneId,
    pub road: RoadId,
}

/// A route with the lanes a vehicle may start on
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub roads: Vec<RoadId>,
    /// Lanes of the first road in `roads`
    pub start_lanes: Vec<LaneId>,
}

/// Topology of the running scenario as reported by the simulator
#[derive(Debug, Default)]
pub struct TopologyCache {
    roads: HashMap<RoadId, Road>,
    road_ids: Vec<RoadId>,
    lanes: HashMap<LaneId, Lane>,
    lane_ids: Vec<LaneId>,
    routes: HashMap<RouteId, Route>,
    route_ids: Vec<RouteId>,
    junction_ids: Vec<JunctionId>,
    vehicle_type_ids: Vec<VehicleTypeId>,
    states: HashMap<Collection, LoadState>,
}

impl TopologyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, collection: Collection) -> LoadState {
        self.states.get(&collection).copied().unwrap_or_default()
    }

    /// True once every collection has been loaded
    pub fn is_loaded(&self) -> bool {
        Collection::LOAD_ORDER
            .iter()
            .all(|c| self.state(*c) == LoadState::Loaded)
    }

    /// Load every collection that has not been loaded yet
    pub fn ensure_loaded<C>(&mut self, client: &mut C) -> InjectionResult<()>
    where
        C: TrafficControlClient + ?Sized,
    {
        for collection in Collection::LOAD_ORDER {
            self.load(collection, client)?;
        }
        Ok(())
    }

    /// Load a single collection and whatever it depends on
    ///
    /// A collection that is already loaded is left untouched.
    pub fn load<C>(&mut self, collection: Collection, client: &mut C) -> InjectionResult<()>
    where
        C: TrafficControlClient + ?Sized,
    {
        if self.state(collection) != LoadState::NotLoaded {
            return Ok(());
        }

        match collection {
            Collection::Lanes => self.load(Collection::Roads, client)?,
            Collection::Routes => self.load(Collection::Lanes, client)?,
            _ => {}
        }

        self.states.insert(collection, LoadState::Loading);
        let result = match collection {
            Collection::Roads => self.load_roads(client),
            Collection::Lanes => self.load_lanes(client),
            Collection::Routes => self.load_routes(client),
            Collection::Junctions => self.load_junctions(client),
            Collection::VehicleTypes => self.load_vehicle_types(client),
        };

        match result {
            Ok(()) => {
                self.states.insert(collection, LoadState::Loaded);
                Ok(())
            }
            Err(e) => {
                self.states.insert(collection, LoadState::NotLoaded);
                Err(e)
            }
        }
    }

    fn load_roads<C>(&mut self, client: &mut C) -> InjectionResult<()>
    where
        C: TrafficControlClient + ?Sized,
    {
        let ids = client
            .road_ids()
            .map_err(|source| bootstrap_error(Collection::Roads, source))?;

        for id in ids {
            debug!("Got road: {}", id);
            if !self.roads.contains_key(&id) {
                self.road_ids.push(id.clone());
            }
            self.roads.insert(id.clone(), Road::new(id));
        }
        Ok(())
    }

    fn load_lanes<C>(&mut self, client: &mut C) -> InjectionResult<()>
    where
        C: TrafficControlClient + ?Sized,
    {
        let ids = client
            .lane_ids()
            .map_err(|source| bootstrap_error(Collection::Lanes, source))?;

        // Resolve everything before touching the roads so a failure leaves
        // them as they were
        let mut lanes = Vec::with_capacity(ids.len());
        for id in ids {
            let road = client
                .lane_road(&id)
                .map_err(|source| bootstrap_error(Collection::Lanes, source))?;
            if !self.roads.contains_key(&road) {
                return Err(InjectionError::UnknownRoad {
                    lane: id.0,
                    road: road.0,
                });
            }
            lanes.push(Lane { id, road });
        }

        for lane in lanes {
            debug!("Adding lane: {} on road {}", lane.id, lane.road);
            if let Some(road) = self.roads.get_mut(&lane.road) {
                road.lanes.push(lane.id.clone());
            }
            self.lane_ids.push(lane.id.clone());
            self.lanes.insert(lane.id.clone(), lane);
        }
        Ok(())
    }

    fn load_routes<C>(&mut self, client: &mut C) -> InjectionResult<()>
    where
        C: TrafficControlClient + ?Sized,
    {
        let ids = client
            .route_ids()
            .map_err(|source| bootstrap_error(Collection::Routes, source))?;

        let mut routes = Vec::with_capacity(ids.len());
        for id in ids {
            let roads = client
                .route_roads(&id)
                .map_err(|source| bootstrap_error(Collection::Routes, source))?;

            let start_lanes = match roads.first() {
                Some(first) => match self.roads.get(first) {
                    Some(road) => road.lanes.clone(),
                    None => {
                        warn!(
                            "Route {} starts on unlisted road {}, it has no start lanes",
                            id, first
                        );
                        Vec::new()
                    }
                },
                None => {
                    warn!("Route {} has no roads, it has no start lanes", id);
                    Vec::new()
                }
            };
            routes.push(Route {
                id,
                roads,
                start_lanes,
            });
        }

        for route in routes {
            debug!("Adding route: {}", route.id);
            self.route_ids.push(route.id.clone());
            self.routes.insert(route.id.clone(), route);
        }
        Ok(())
    }

    fn load_junctions<C>(&mut self, client: &mut C) -> InjectionResult<()>
    where
        C: TrafficControlClient + ?Sized,
    {
        let ids = client
            .junction_ids()
            .map_err(|source| bootstrap_error(Collection::Junctions, source))?;

        for id in &ids {
            debug!("Adding junction: {}", id);
        }
        self.junction_ids = ids;
        Ok(())
    }

    fn load_vehicle_types<C>(&mut self, client: &mut C) -> InjectionResult<()>
    where
        C: TrafficControlClient + ?Sized,
    {
        let ids = client
            .vehicle_type_ids()
            .map_err(|source| bootstrap_error(Collection::VehicleTypes, source))?;

        self.vehicle_type_ids = ids
            .into_iter()
            .filter(|id| id.as_str() != PEDESTRIAN_TYPE)
            .inspect(|id| debug!("Adding vehicle type: {}", id))
            .collect();
        Ok(())
    }

    fn require(&self, collection: Collection) -> InjectionResult<()> {
        if self.state(collection) == LoadState::Loaded {
            Ok(())
        } else {
            Err(InjectionError::NotLoaded(collection))
        }
    }

    pub fn road(&self, id: &RoadId) -> InjectionResult<&Road> {
        // Lane lists are only complete once lanes are loaded
        self.require(Collection::Lanes)?;
        self.roads.get(id).ok_or_else(|| not_found(Collection::Roads, id.as_str()))
    }

    pub fn lane(&self, id: &LaneId) -> InjectionResult<&Lane> {
        self.require(Collection::Lanes)?;
        self.lanes.get(id).ok_or_else(|| not_found(Collection::Lanes, id.as_str()))
    }

    pub fn route(&self, id: &RouteId) -> InjectionResult<&Route> {
        self.require(Collection::Routes)?;
        self.routes
            .get(id)
            .ok_or_else(|| not_found(Collection::Routes, id.as_str()))
    }

    /// Road ids in the order the simulator reported them
    pub fn road_ids(&self) -> InjectionResult<&[RoadId]> {
        self.require(Collection::Roads)?;
        Ok(&self.road_ids)
    }

    pub fn lane_ids(&self) -> InjectionResult<&[LaneId]> {
        self.require(Collection::Lanes)?;
        Ok(&self.lane_ids)
    }

    pub fn route_ids(&self) -> InjectionResult<&[RouteId]> {
        self.require(Collection::Routes)?;
        Ok(&self.route_ids)
    }

    pub fn junction_ids(&self) -> InjectionResult<&[JunctionId]> {
        self.require(Collection::Junctions)?;
        Ok(&self.junction_ids)
    }

    /// Vehicle type ids without the pedestrian type
    pub fn vehicle_type_ids(&self) -> InjectionResult<&[VehicleTypeId]> {
        self.require(Collection::VehicleTypes)?;
        Ok(&self.vehicle_type_ids)
    }
}

fn bootstrap_error(collection: Collection, source: anyhow::Error) -> InjectionError {
    InjectionError::Bootstrap { collection, source }
}

fn not_found(collection: Collection, id: &str) -> InjectionError {
    InjectionError::NotFound {
        collection,
        id: id.to_string(),
    }
}

//! In-process stand-in for the external traffic simulator
//!
//! Holds a road network graph and answers the same queries a real
//! control-protocol client would. Used by the headless binary and by tests,
//! which can also count queries and make queries or insertions fail.

use anyhow::{Context, Result};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

use super::client::TrafficControlClient;
use super::error::Collection;
use super::types::{
    InjectionRequest, JunctionId, LaneId, RoadId, RouteId, VehicleId, VehicleTypeId,
    PEDESTRIAN_TYPE,
};

/// Edge data for the road network graph
#[derive(Debug, Clone)]
pub struct RoadEdge {
    pub road_id: RoadId,
    pub length: f64,
}

#[derive(Debug, Default)]
pub struct LocalSimulator {
    /// Junctions as nodes, roads as edges
    graph: DiGraph<JunctionId, RoadEdge>,

    junction_to_node: HashMap<JunctionId, NodeIndex>,
    junction_ids: Vec<JunctionId>,

    road_ids: Vec<RoadId>,
    road_lanes: HashMap<RoadId, Vec<LaneId>>,

    lane_ids: Vec<LaneId>,
    lane_roads: HashMap<LaneId, RoadId>,

    route_ids: Vec<RouteId>,
    route_roads: HashMap<RouteId, Vec<RoadId>>,

    vehicle_type_ids: Vec<VehicleTypeId>,

    /// Vehicles the simulator accepted
    vehicles: HashMap<VehicleId, InjectionRequest>,
    /// Every request received, accepted or not, in order
    submissions: Vec<InjectionRequest>,

    query_counts: HashMap<Collection, usize>,
    failing: HashSet<Collection>,
    rejections_left: usize,
    delivery_failures_left: usize,
}

impl LocalSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a junction to the network graph
    pub fn add_junction(&mut self, id: impl Into<JunctionId>) -> NodeIndex {
        let id = id.into();
        if let Some(node) = self.junction_to_node.get(&id) {
            return *node;
        }
        let node = self.graph.add_node(id.clone());
        self.junction_to_node.insert(id.clone(), node);
        self.junction_ids.push(id);
        node
    }

    /// Adds a road with `lane_count` lanes named `<road>_<index>`
    pub fn add_road(
        &mut self,
        id: impl Into<RoadId>,
        from: impl Into<JunctionId>,
        to: impl Into<JunctionId>,
        lane_count: usize,
        length: f64,
    ) {
        let id = id.into();
        let lanes: Vec<LaneId> = (0..lane_count)
            .map(|index| LaneId(format!("{}_{}", id, index)))
            .collect();
        self.insert_road(id, from.into(), to.into(), lanes, length);
    }

    /// Adds a unit-length road with explicitly named lanes
    pub fn add_road_with_lanes(
        &mut self,
        id: impl Into<RoadId>,
        from: impl Into<JunctionId>,
        to: impl Into<JunctionId>,
        lanes: &[&str],
    ) {
        let lanes = lanes.iter().map(|lane| LaneId::from(*lane)).collect();
        self.insert_road(id.into(), from.into(), to.into(), lanes, 1.0);
    }

    fn insert_road(
        &mut self,
        id: RoadId,
        from: JunctionId,
        to: JunctionId,
        lanes: Vec<LaneId>,
        length: f64,
    ) {
        // Junctions are created on demand
        let from_node = self.add_junction(from);
        let to_node = self.add_junction(to);
        self.graph.add_edge(
            from_node,
            to_node,
            RoadEdge {
                road_id: id.clone(),
                length,
            },
        );

        for lane in &lanes {
            self.lane_ids.push(lane.clone());
            self.lane_roads.insert(lane.clone(), id.clone());
        }
        self.road_ids.push(id.clone());
        self.road_lanes.insert(id, lanes);
    }

    /// Adds a pair of opposite roads between two junctions
    pub fn add_two_way_road(
        &mut self,
        from: impl Into<JunctionId>,
        to: impl Into<JunctionId>,
        lane_count: usize,
        length: f64,
    ) {
        let from = from.into();
        let to = to.into();
        self.add_road(
            format!("{}to{}", from, to),
            from.clone(),
            to.clone(),
            lane_count,
            length,
        );
        self.add_road(format!("{}to{}", to, from), to, from, lane_count, length);
    }

    /// Adds a route through the given roads
    pub fn add_route(&mut self, id: impl Into<RouteId>, roads: &[&str]) {
        let id = id.into();
        let roads = roads.iter().map(|road| RoadId::from(*road)).collect();
        self.route_ids.push(id.clone());
        self.route_roads.insert(id, roads);
    }

    /// Adds a route along the shortest path between two junctions
    pub fn add_route_between(
        &mut self,
        id: impl Into<RouteId>,
        from: &JunctionId,
        to: &JunctionId,
    ) -> Result<()> {
        let id = id.into();
        let start = *self
            .junction_to_node
            .get(from)
            .with_context(|| format!("Junction {} not found", from))?;
        let end = *self
            .junction_to_node
            .get(to)
            .with_context(|| format!("Junction {} not found", to))?;

        let (_, nodes) = astar(
            &self.graph,
            start,
            |node| node == end,
            |edge| edge.weight().length,
            |_| 0.0, // Null heuristic = Dijkstra
        )
        .with_context(|| format!("No path from {} to {}", from, to))?;

        let mut roads = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            let edge = self
                .graph
                .find_edge(pair[0], pair[1])
                .context("Path step without a road")?;
            roads.push(self.graph[edge].road_id.clone());
        }

        self.route_ids.push(id.clone());
        self.route_roads.insert(id, roads);
        Ok(())
    }

    pub fn add_vehicle_type(&mut self, id: impl Into<VehicleTypeId>) {
        self.vehicle_type_ids.push(id.into());
    }

    /// Make every following query for `collection` fail
    pub fn fail_queries_for(&mut self, collection: Collection) {
        self.failing.insert(collection);
    }

    /// Refuse the next `count` insertions
    pub fn reject_next_insertions(&mut self, count: usize) {
        self.rejections_left = count;
    }

    /// Fail delivery of the next `count` vehicle-creation commands
    pub fn fail_next_deliveries(&mut self, count: usize) {
        self.delivery_failures_left = count;
    }

    /// Adds a lane owned by a road that is never listed
    pub fn add_lane_on_unlisted_road(
        &mut self,
        lane: impl Into<LaneId>,
        road: impl Into<RoadId>,
    ) {
        let lane = lane.into();
        self.lane_ids.push(lane.clone());
        self.lane_roads.insert(lane, road.into());
    }

    /// Number of enumeration queries answered for `collection`
    pub fn query_count(&self, collection: Collection) -> usize {
        self.query_counts.get(&collection).copied().unwrap_or(0)
    }

    pub fn submissions(&self) -> &[InjectionRequest] {
        &self.submissions
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&InjectionRequest> {
        self.vehicles.get(id)
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn road_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn junction_count(&self) -> usize {
        self.graph.node_count()
    }

    fn record_query(&mut self, collection: Collection) -> Result<()> {
        if self.failing.contains(&collection) {
            anyhow::bail!("simulator refused to list {}", collection);
        }
        *self.query_counts.entry(collection).or_default() += 1;
        Ok(())
    }

    fn accepts(&self, request: &InjectionRequest) -> bool {
        !self.vehicles.contains_key(&request.vehicle_id)
            && self.vehicle_type_ids.contains(&request.vehicle_type)
            && request.vehicle_type.as_str() != PEDESTRIAN_TYPE
            && self
                .route_roads
                .get(&request.route_id)
                .and_then(|roads| roads.first())
                .and_then(|first| self.road_lanes.get(first))
                .is_some_and(|lanes| !lanes.is_empty())
    }

    /// Create a 3x3 grid of junctions connected by two-lane, two-way roads,
    /// with routes across the grid
    pub fn create_test_scenario() -> Result<Self> {
        let mut sim = Self::new();
        let spacing = 200.0;

        let junction = |row: usize, col: usize| JunctionId(format!("J{}{}", row, col));
        for row in 0..3 {
            for col in 0..3 {
                sim.add_junction(junction(row, col));
            }
        }

        // Connect grid horizontally
        for row in 0..3 {
            for col in 0..2 {
                sim.add_two_way_road(junction(row, col), junction(row, col + 1), 2, spacing);
            }
        }

        // Connect grid vertically
        for row in 0..2 {
            for col in 0..3 {
                sim.add_two_way_road(junction(row, col), junction(row + 1, col), 2, spacing);
            }
        }

        sim.add_route_between("diagonal_se", &junction(0, 0), &junction(2, 2))?;
        sim.add_route_between("diagonal_nw", &junction(2, 2), &junction(0, 0))?;
        sim.add_route_between("top_east", &junction(0, 0), &junction(0, 2))?;
        sim.add_route_between("left_south", &junction(0, 0), &junction(2, 0))?;

        sim.add_vehicle_type("DEFAULT_VEHTYPE");
        sim.add_vehicle_type(PEDESTRIAN_TYPE);
        sim.add_vehicle_type("passenger");
        sim.add_vehicle_type("truck");

        Ok(sim)
    }
}

impl TrafficControlClient for LocalSimulator {
    fn road_ids(&mut self) -> Result<Vec<RoadId>> {
        self.record_query(Collection::Roads)?;
        Ok(self.road_ids.clone())
    }

    fn lane_ids(&mut self) -> Result<Vec<LaneId>> {
        self.record_query(Collection::Lanes)?;
        Ok(self.lane_ids.clone())
    }

    fn route_ids(&mut self) -> Result<Vec<RouteId>> {
        self.record_query(Collection::Routes)?;
        Ok(self.route_ids.clone())
    }

    fn junction_ids(&mut self) -> Result<Vec<JunctionId>> {
        self.record_query(Collection::Junctions)?;
        Ok(self.junction_ids.clone())
    }

    fn vehicle_type_ids(&mut self) -> Result<Vec<VehicleTypeId>> {
        self.record_query(Collection::VehicleTypes)?;
        Ok(self.vehicle_type_ids.clone())
    }

    fn lane_road(&mut self, lane: &LaneId) -> Result<RoadId> {
        self.lane_roads
            .get(lane)
            .cloned()
            .with_context(|| format!("Lane {} not found", lane))
    }

    fn route_roads(&mut self, route: &RouteId) -> Result<Vec<RoadId>> {
        self.route_roads
            .get(route)
            .cloned()
            .with_context(|| format!("Route {} not found", route))
    }

    fn add_vehicle(&mut self, request: &InjectionRequest) -> Result<bool> {
        self.submissions.push(request.clone());

        if self.delivery_failures_left > 0 {
            self.delivery_failures_left -= 1;
            anyhow::bail!("connection lost while adding {}", request.vehicle_id);
        }
        if self.rejections_left > 0 {
            self.rejections_left -= 1;
            return Ok(false);
        }
        if !self.accepts(request) {
            return Ok(false);
        }

        self.vehicles
            .insert(request.vehicle_id.clone(), request.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injection::types::DepartLane;

    #[test]
    fn test_lanes_are_named_after_their_road() {
        let mut sim = LocalSimulator::new();
        sim.add_road("E1", "A", "B", 2, 10.0);

        assert_eq!(sim.junction_count(), 2);
        assert_eq!(
            sim.lane_ids().unwrap(),
            vec![LaneId::from("E1_0"), LaneId::from("E1_1")]
        );
        assert_eq!(sim.lane_road(&"E1_1".into()).unwrap(), RoadId::from("E1"));
    }

    #[test]
    fn test_route_between_follows_shortest_path() {
        let mut sim = LocalSimulator::new();
        sim.add_road("AB", "A", "B", 1, 10.0);
        sim.add_road("BC", "B", "C", 1, 10.0);
        sim.add_road("AC", "A", "C", 1, 50.0);
        sim.add_route_between("r", &"A".into(), &"C".into()).unwrap();

        assert_eq!(
            sim.route_roads(&"r".into()).unwrap(),
            vec![RoadId::from("AB"), RoadId::from("BC")]
        );
    }

    #[test]
    fn test_route_between_unconnected_junctions_fails() {
        let mut sim = LocalSimulator::new();
        sim.add_road("AB", "A", "B", 1, 10.0);
        sim.add_junction("Z");

        assert!(sim.add_route_between("r", &"A".into(), &"Z".into()).is_err());
    }

    #[test]
    fn test_test_scenario_layout() {
        let mut sim = LocalSimulator::create_test_scenario().unwrap();

        assert_eq!(sim.junction_count(), 9);
        assert_eq!(sim.road_count(), 24);
        assert_eq!(sim.route_ids().unwrap().len(), 4);
        assert_eq!(
            sim.route_roads(&"diagonal_se".into()).unwrap().len(),
            4,
            "corner to corner takes four grid roads"
        );
    }

    #[test]
    fn test_duplicate_vehicle_is_rejected() {
        let mut sim = LocalSimulator::new();
        sim.add_road("AB", "A", "B", 1, 10.0);
        sim.add_route("r", &["AB"]);
        sim.add_vehicle_type("car");

        let request = InjectionRequest::new("v1".into(), "car".into(), "r".into(), DepartLane::Best);
        assert!(sim.add_vehicle(&request).unwrap());
        assert!(!sim.add_vehicle(&request).unwrap());
        assert_eq!(sim.submissions().len(), 2);
        assert_eq!(sim.vehicle_count(), 1);
    }

    #[test]
    fn test_unknown_route_or_type_is_rejected() {
        let mut sim = LocalSimulator::new();
        sim.add_road("AB", "A", "B", 1, 10.0);
        sim.add_route("r", &["AB"]);
        sim.add_vehicle_type("car");

        let bad_route =
            InjectionRequest::new("v1".into(), "car".into(), "nope".into(), DepartLane::Best);
        let bad_type =
            InjectionRequest::new("v2".into(), "bus".into(), "r".into(), DepartLane::Random);
        assert!(!sim.add_vehicle(&bad_route).unwrap());
        assert!(!sim.add_vehicle(&bad_type).unwrap());
        assert_eq!(sim.vehicle_count(), 0);
    }

    #[test]
    fn test_failing_queries_are_not_counted() {
        let mut sim = LocalSimulator::new();
        sim.fail_queries_for(Collection::Junctions);

        assert!(sim.junction_ids().is_err());
        assert_eq!(sim.query_count(Collection::Junctions), 0);
        assert!(sim.road_ids().is_ok());
        assert_eq!(sim.query_count(Collection::Roads), 1);
    }

    #[test]
    fn test_failed_delivery_is_an_error() {
        let mut sim = LocalSimulator::new();
        sim.add_road("AB", "A", "B", 1, 10.0);
        sim.add_route("r", &["AB"]);
        sim.add_vehicle_type("car");
        sim.fail_next_deliveries(1);

        let request =
            InjectionRequest::new("v1".into(), "car".into(), "r".into(), DepartLane::Best);
        assert!(sim.add_vehicle(&request).is_err());
        assert!(sim.add_vehicle(&request).unwrap());
        assert_eq!(sim.submissions().len(), 2);
        assert_eq!(sim.vehicle_count(), 1);
    }
}

//! Selection and failure-handling policies applied on every injection

use log::warn;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use super::error::{InjectionError, InjectionResult};
use super::types::{RouteId, VehicleTypeId};

/// Index used when no vehicle-type index is configured
pub const DEFAULT_VEHICLE_TYPE_INDEX: usize = 1;

/// Number of immediate retries used when none is configured
pub const DEFAULT_INSERT_RETRIES: u32 = 3;

/// How the vehicle type of each injected vehicle is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleTypePolicy {
    /// Always the type at this index of the known (non-pedestrian) types
    FixedIndex(usize),
    /// Uniformly at random among the known types
    Random,
    /// Cycle through the known types in order
    RoundRobin,
}

impl Default for VehicleTypePolicy {
    fn default() -> Self {
        VehicleTypePolicy::FixedIndex(DEFAULT_VEHICLE_TYPE_INDEX)
    }
}

/// What to do when the simulator does not accept a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertionFailurePolicy {
    /// Log, count and carry on; the quota is still used up
    #[default]
    Ignore,
    /// Resubmit up to `attempts` more times, then carry on
    Retry { attempts: u32 },
    /// Terminate the run
    Abort,
}

impl InsertionFailurePolicy {
    /// Submissions allowed for a single vehicle
    pub fn max_submissions(&self) -> u32 {
        match self {
            InsertionFailurePolicy::Retry { attempts } => attempts + 1,
            _ => 1,
        }
    }
}

/// Stateful vehicle-type chooser
#[derive(Debug, Clone)]
pub struct VehicleTypeSelector {
    policy: VehicleTypePolicy,
    next: usize,
    warned: bool,
}

impl VehicleTypeSelector {
    pub fn new(policy: VehicleTypePolicy) -> Self {
        Self {
            policy,
            next: 0,
            warned: false,
        }
    }

    pub fn policy(&self) -> VehicleTypePolicy {
        self.policy
    }

    /// Pick a vehicle type from `types`
    ///
    /// A fixed index past the end of the list falls back to the last type.
    pub fn select(
        &mut self,
        types: &[VehicleTypeId],
        rng: &mut StdRng,
    ) -> InjectionResult<VehicleTypeId> {
        if types.is_empty() {
            return Err(InjectionError::NoVehicleTypes);
        }

        let chosen = match self.policy {
            VehicleTypePolicy::FixedIndex(index) => match types.get(index) {
                Some(vehicle_type) => vehicle_type,
                None => {
                    let last = types.last().ok_or(InjectionError::NoVehicleTypes)?;
                    if !self.warned {
                        warn!(
                            "Vehicle type index {} out of range ({} types known), using '{}'",
                            index,
                            types.len(),
                            last
                        );
                        self.warned = true;
                    }
                    last
                }
            },
            VehicleTypePolicy::Random => types.choose(rng).ok_or(InjectionError::NoVehicleTypes)?,
            VehicleTypePolicy::RoundRobin => {
                let vehicle_type = &types[self.next % types.len()];
                self.next = self.next.wrapping_add(1);
                vehicle_type
            }
        };
        Ok(chosen.clone())
    }
}

/// Pick a route: uniformly at random when `randomize` is set, else the first one
pub fn select_route(
    routes: &[RouteId],
    randomize: bool,
    rng: &mut StdRng,
) -> InjectionResult<RouteId> {
    let route = if randomize {
        routes.choose(rng)
    } else {
        routes.first()
    };
    route.cloned().ok_or(InjectionError::NoRoutes)
}

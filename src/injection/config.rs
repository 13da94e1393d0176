//! Injection configuration
//!
//! The host kernel hands parameters over by name through a
//! [`ParameterSource`]; [`InjectionConfig::from_parameters`] turns them into a
//! validated configuration.

use std::collections::HashMap;

use super::error::{InjectionError, InjectionResult};
use super::policy::{
    InsertionFailurePolicy, VehicleTypePolicy, DEFAULT_INSERT_RETRIES, DEFAULT_VEHICLE_TYPE_INDEX,
};
use super::types::{SimTime, VehicleCategory};

/// Delay before the first injection
pub const DEFAULT_INITIAL_DELAY: SimTime = 1.0;

pub const PARAM_QUOTA: &str = "vehicle_quota";
pub const PARAM_ARRIVAL_INTERVAL: &str = "arrival_interval";
pub const PARAM_LANE_RANDOMIZE: &str = "lane_randomize";
pub const PARAM_ROUTE_RANDOMIZE: &str = "route_randomize";
pub const PARAM_INITIAL_DELAY: &str = "initial_delay";
pub const PARAM_SEED: &str = "seed";
pub const PARAM_VEHICLE_TYPE_POLICY: &str = "vehicle_type_policy";
pub const PARAM_VEHICLE_TYPE_INDEX: &str = "vehicle_type_index";
pub const PARAM_ON_INSERT_FAILURE: &str = "on_insert_failure";
pub const PARAM_INSERT_RETRIES: &str = "insert_retries";
pub const PARAM_CATEGORY: &str = "category";

/// A scalar parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    Text(String),
}

/// Named scalar parameters provided at startup
pub trait ParameterSource {
    fn get(&self, name: &str) -> Option<ParamValue>;

    fn int_param(&self, name: &str) -> InjectionResult<i64> {
        match self.required(name)? {
            ParamValue::Int(value) => Ok(value),
            _ => Err(type_error(name, "integer")),
        }
    }

    fn double_param(&self, name: &str) -> InjectionResult<f64> {
        match self.required(name)? {
            ParamValue::Double(value) => Ok(value),
            ParamValue::Int(value) => Ok(value as f64),
            _ => Err(type_error(name, "number")),
        }
    }

    fn bool_param(&self, name: &str) -> InjectionResult<bool> {
        match self.required(name)? {
            ParamValue::Bool(value) => Ok(value),
            _ => Err(type_error(name, "boolean")),
        }
    }

    fn text_param(&self, name: &str) -> InjectionResult<String> {
        match self.required(name)? {
            ParamValue::Text(value) => Ok(value),
            _ => Err(type_error(name, "string")),
        }
    }

    fn required(&self, name: &str) -> InjectionResult<ParamValue> {
        self.get(name)
            .ok_or_else(|| InjectionError::MissingParameter(name.to_string()))
    }

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

fn type_error(name: &str, expected: &'static str) -> InjectionError {
    InjectionError::ParameterType {
        name: name.to_string(),
        expected,
    }
}

/// Parameters held in memory
#[derive(Debug, Clone, Default)]
pub struct MapParameters {
    values: HashMap<String, ParamValue>,
}

impl MapParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: ParamValue) -> &mut Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }
}

impl ParameterSource for MapParameters {
    fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).cloned()
    }
}

/// Everything the scheduler needs to run
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionConfig {
    pub initial_delay: SimTime,
    /// Number of vehicles to inject
    pub quota: u32,
    /// Upper bound (exclusive) of the uniformly drawn gap between injections
    pub mean_inter_arrival: SimTime,
    pub lane_randomize: bool,
    pub route_randomize: bool,
    pub vehicle_type_policy: VehicleTypePolicy,
    pub failure_policy: InsertionFailurePolicy,
    pub category: VehicleCategory,
    /// Seed for reproducible runs; drawn from the OS when absent
    pub seed: Option<u64>,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            quota: 0,
            mean_inter_arrival: 1.0,
            lane_randomize: false,
            route_randomize: false,
            vehicle_type_policy: VehicleTypePolicy::default(),
            failure_policy: InsertionFailurePolicy::default(),
            category: VehicleCategory::default(),
            seed: None,
        }
    }
}

impl InjectionConfig {
    pub fn new(quota: u32, mean_inter_arrival: SimTime) -> Self {
        Self {
            quota,
            mean_inter_arrival,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> InjectionResult<()> {
        if !(self.mean_inter_arrival > 0.0 && self.mean_inter_arrival.is_finite()) {
            return Err(InjectionError::InvalidConfig(format!(
                "arrival interval must be positive, got {}",
                self.mean_inter_arrival
            )));
        }
        if !(self.initial_delay >= 0.0 && self.initial_delay.is_finite()) {
            return Err(InjectionError::InvalidConfig(format!(
                "initial delay must not be negative, got {}",
                self.initial_delay
            )));
        }
        if let InsertionFailurePolicy::Retry { attempts: 0 } = self.failure_policy {
            return Err(InjectionError::InvalidConfig(
                "retry policy needs at least one attempt".to_string(),
            ));
        }
        Ok(())
    }

    /// Build and validate a configuration from named parameters
    pub fn from_parameters(params: &dyn ParameterSource) -> InjectionResult<Self> {
        let mut config = Self {
            quota: quota_from_count(params.int_param(PARAM_QUOTA)?)?,
            mean_inter_arrival: params.double_param(PARAM_ARRIVAL_INTERVAL)?,
            lane_randomize: params.bool_param(PARAM_LANE_RANDOMIZE)?,
            route_randomize: params.bool_param(PARAM_ROUTE_RANDOMIZE)?,
            ..Self::default()
        };

        if params.has(PARAM_INITIAL_DELAY) {
            config.initial_delay = params.double_param(PARAM_INITIAL_DELAY)?;
        }
        if params.has(PARAM_SEED) {
            let seed = params.int_param(PARAM_SEED)?;
            config.seed = Some(u64::try_from(seed).map_err(|_| {
                InjectionError::InvalidConfig(format!("seed must not be negative, got {}", seed))
            })?);
        }
        if params.has(PARAM_CATEGORY) {
            config.category = parse_category(&params.text_param(PARAM_CATEGORY)?)?;
        }
        config.vehicle_type_policy = vehicle_type_policy_from(params)?;
        config.failure_policy = failure_policy_from(params)?;

        config.validate()?;
        Ok(config)
    }
}

/// Convert a configured vehicle count into a quota
pub fn quota_from_count(count: i64) -> InjectionResult<u32> {
    u32::try_from(count).map_err(|_| {
        InjectionError::InvalidConfig(format!(
            "vehicle quota must be a non-negative integer, got {}",
            count
        ))
    })
}

fn parse_category(name: &str) -> InjectionResult<VehicleCategory> {
    match name {
        "genuine" => Ok(VehicleCategory::Genuine),
        "attacker" => Ok(VehicleCategory::Attacker),
        other => Err(InjectionError::InvalidConfig(format!(
            "unknown vehicle category '{}'",
            other
        ))),
    }
}

fn vehicle_type_policy_from(params: &dyn ParameterSource) -> InjectionResult<VehicleTypePolicy> {
    let index = if params.has(PARAM_VEHICLE_TYPE_INDEX) {
        let index = params.int_param(PARAM_VEHICLE_TYPE_INDEX)?;
        usize::try_from(index).map_err(|_| {
            InjectionError::InvalidConfig(format!(
                "vehicle type index must not be negative, got {}",
                index
            ))
        })?
    } else {
        DEFAULT_VEHICLE_TYPE_INDEX
    };

    if !params.has(PARAM_VEHICLE_TYPE_POLICY) {
        return Ok(VehicleTypePolicy::FixedIndex(index));
    }
    match params.text_param(PARAM_VEHICLE_TYPE_POLICY)?.as_str() {
        "fixed" => Ok(VehicleTypePolicy::FixedIndex(index)),
        "random" => Ok(VehicleTypePolicy::Random),
        "round_robin" => Ok(VehicleTypePolicy::RoundRobin),
        other => Err(InjectionError::InvalidConfig(format!(
            "unknown vehicle type policy '{}'",
            other
        ))),
    }
}

fn failure_policy_from(params: &dyn ParameterSource) -> InjectionResult<InsertionFailurePolicy> {
    if !params.has(PARAM_ON_INSERT_FAILURE) {
        return Ok(InsertionFailurePolicy::default());
    }
    match params.text_param(PARAM_ON_INSERT_FAILURE)?.as_str() {
        "ignore" => Ok(InsertionFailurePolicy::Ignore),
        "abort" => Ok(InsertionFailurePolicy::Abort),
        "retry" => {
            let attempts = if params.has(PARAM_INSERT_RETRIES) {
                let attempts = params.int_param(PARAM_INSERT_RETRIES)?;
                u32::try_from(attempts).map_err(|_| {
                    InjectionError::InvalidConfig(format!(
                        "insert retries must not be negative, got {}",
                        attempts
                    ))
                })?
            } else {
                DEFAULT_INSERT_RETRIES
            };
            Ok(InsertionFailurePolicy::Retry { attempts })
        }
        other => Err(InjectionError::InvalidConfig(format!(
            "unknown insertion failure policy '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_params() -> MapParameters {
        MapParameters::new()
            .with(PARAM_QUOTA, ParamValue::Int(10))
            .with(PARAM_ARRIVAL_INTERVAL, ParamValue::Double(2.5))
            .with(PARAM_LANE_RANDOMIZE, ParamValue::Bool(true))
            .with(PARAM_ROUTE_RANDOMIZE, ParamValue::Bool(false))
    }

    #[test]
    fn test_required_parameters_with_defaults() {
        let config = InjectionConfig::from_parameters(&required_params()).unwrap();

        assert_eq!(config.quota, 10);
        assert_eq!(config.mean_inter_arrival, 2.5);
        assert!(config.lane_randomize);
        assert!(!config.route_randomize);
        assert_eq!(config.initial_delay, DEFAULT_INITIAL_DELAY);
        assert_eq!(config.vehicle_type_policy, VehicleTypePolicy::FixedIndex(1));
        assert_eq!(config.failure_policy, InsertionFailurePolicy::Ignore);
        assert_eq!(config.category, VehicleCategory::Genuine);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_negative_quota_is_rejected() {
        let params = required_params().with(PARAM_QUOTA, ParamValue::Int(-1));
        assert!(matches!(
            InjectionConfig::from_parameters(&params),
            Err(InjectionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_parameter_is_reported() {
        let mut params = MapParameters::new();
        params.set(PARAM_QUOTA, ParamValue::Int(3));

        match InjectionConfig::from_parameters(&params) {
            Err(InjectionError::MissingParameter(name)) => {
                assert_eq!(name, PARAM_ARRIVAL_INTERVAL)
            }
            other => panic!("expected missing parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_parameter_type_is_reported() {
        let params = required_params().with(PARAM_LANE_RANDOMIZE, ParamValue::Int(1));
        assert!(matches!(
            InjectionConfig::from_parameters(&params),
            Err(InjectionError::ParameterType { .. })
        ));
    }

    #[test]
    fn test_integer_interval_is_accepted() {
        let params = required_params().with(PARAM_ARRIVAL_INTERVAL, ParamValue::Int(4));
        let config = InjectionConfig::from_parameters(&params).unwrap();
        assert_eq!(config.mean_inter_arrival, 4.0);
    }

    #[test]
    fn test_non_positive_interval_is_rejected() {
        let params = required_params().with(PARAM_ARRIVAL_INTERVAL, ParamValue::Double(0.0));
        assert!(InjectionConfig::from_parameters(&params).is_err());
    }

    #[test]
    fn test_optional_policies() {
        let params = required_params()
            .with(PARAM_SEED, ParamValue::Int(42))
            .with(PARAM_INITIAL_DELAY, ParamValue::Double(0.5))
            .with(PARAM_VEHICLE_TYPE_POLICY, ParamValue::Text("round_robin".into()))
            .with(PARAM_ON_INSERT_FAILURE, ParamValue::Text("retry".into()))
            .with(PARAM_INSERT_RETRIES, ParamValue::Int(2))
            .with(PARAM_CATEGORY, ParamValue::Text("attacker".into()));
        let config = InjectionConfig::from_parameters(&params).unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.initial_delay, 0.5);
        assert_eq!(config.vehicle_type_policy, VehicleTypePolicy::RoundRobin);
        assert_eq!(
            config.failure_policy,
            InsertionFailurePolicy::Retry { attempts: 2 }
        );
        assert_eq!(config.category, VehicleCategory::Attacker);
    }

    #[test]
    fn test_fixed_policy_uses_configured_index() {
        let params = required_params()
            .with(PARAM_VEHICLE_TYPE_POLICY, ParamValue::Text("fixed".into()))
            .with(PARAM_VEHICLE_TYPE_INDEX, ParamValue::Int(0));
        let config = InjectionConfig::from_parameters(&params).unwrap();
        assert_eq!(config.vehicle_type_policy, VehicleTypePolicy::FixedIndex(0));
    }

    #[test]
    fn test_unknown_policy_name_is_rejected() {
        let params =
            required_params().with(PARAM_ON_INSERT_FAILURE, ParamValue::Text("panic".into()));
        assert!(InjectionConfig::from_parameters(&params).is_err());
    }
}

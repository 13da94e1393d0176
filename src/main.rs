use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;

use traffic_manager::injection::{
    InjectionConfig, InjectionRun, LocalSimulator, MapParameters, ParamValue, SchedulerState,
    PARAM_ARRIVAL_INTERVAL, PARAM_CATEGORY, PARAM_INITIAL_DELAY, PARAM_INSERT_RETRIES,
    PARAM_LANE_RANDOMIZE, PARAM_ON_INSERT_FAILURE, PARAM_QUOTA, PARAM_ROUTE_RANDOMIZE, PARAM_SEED,
    PARAM_VEHICLE_TYPE_INDEX, PARAM_VEHICLE_TYPE_POLICY,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VehicleTypeChoice {
    Fixed,
    Random,
    RoundRobin,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailureChoice {
    Ignore,
    Retry,
    Abort,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryChoice {
    Genuine,
    Attacker,
}

#[derive(Parser)]
#[command(name = "traffic_manager")]
#[command(about = "Inject vehicles into a traffic simulation at random intervals")]
struct Cli {
    /// Number of vehicles to inject
    #[arg(long, default_value = "10", allow_negative_numbers = true)]
    quota: i64,

    /// Upper bound of the random gap between injections, in seconds
    #[arg(long, default_value = "5.0")]
    arrival_interval: f64,

    /// Let the simulator place vehicles on a random lane instead of the best one
    #[arg(long)]
    lane_randomize: bool,

    /// Pick a random route for every vehicle instead of the first one
    #[arg(long)]
    route_randomize: bool,

    /// Time of the first injection, in seconds
    #[arg(long, default_value = "1.0")]
    initial_delay: f64,

    /// Seed for reproducible runs
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    seed: Option<i64>,

    #[arg(long, value_enum, default_value_t = VehicleTypeChoice::Fixed)]
    vehicle_type_policy: VehicleTypeChoice,

    /// Vehicle type index used by the fixed policy
    #[arg(long, default_value = "1")]
    vehicle_type_index: u32,

    /// What to do when the simulator refuses a vehicle
    #[arg(long, value_enum, default_value_t = FailureChoice::Ignore)]
    on_insert_failure: FailureChoice,

    /// Retries per vehicle with `--on-insert-failure retry`
    #[arg(long, default_value = "3")]
    insert_retries: u32,

    #[arg(long, value_enum, default_value_t = CategoryChoice::Genuine)]
    category: CategoryChoice,

    /// Stop injecting at this simulated time even if vehicles are left
    #[arg(long)]
    until: Option<f64>,
}

impl Cli {
    fn parameters(&self) -> MapParameters {
        let vehicle_type_policy = match self.vehicle_type_policy {
            VehicleTypeChoice::Fixed => "fixed",
            VehicleTypeChoice::Random => "random",
            VehicleTypeChoice::RoundRobin => "round_robin",
        };
        let on_insert_failure = match self.on_insert_failure {
            FailureChoice::Ignore => "ignore",
            FailureChoice::Retry => "retry",
            FailureChoice::Abort => "abort",
        };
        let category = match self.category {
            CategoryChoice::Genuine => "genuine",
            CategoryChoice::Attacker => "attacker",
        };

        let mut params = MapParameters::new();
        params
            .set(PARAM_QUOTA, ParamValue::Int(self.quota))
            .set(PARAM_ARRIVAL_INTERVAL, ParamValue::Double(self.arrival_interval))
            .set(PARAM_LANE_RANDOMIZE, ParamValue::Bool(self.lane_randomize))
            .set(PARAM_ROUTE_RANDOMIZE, ParamValue::Bool(self.route_randomize))
            .set(PARAM_INITIAL_DELAY, ParamValue::Double(self.initial_delay))
            .set(
                PARAM_VEHICLE_TYPE_POLICY,
                ParamValue::Text(vehicle_type_policy.to_string()),
            )
            .set(
                PARAM_VEHICLE_TYPE_INDEX,
                ParamValue::Int(i64::from(self.vehicle_type_index)),
            )
            .set(
                PARAM_ON_INSERT_FAILURE,
                ParamValue::Text(on_insert_failure.to_string()),
            )
            .set(
                PARAM_INSERT_RETRIES,
                ParamValue::Int(i64::from(self.insert_retries)),
            )
            .set(PARAM_CATEGORY, ParamValue::Text(category.to_string()));
        if let Some(seed) = self.seed {
            params.set(PARAM_SEED, ParamValue::Int(seed));
        }
        params
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn,traffic_manager=info"))
        .init();

    let cli = Cli::parse();
    let config = InjectionConfig::from_parameters(&cli.parameters())
        .context("Invalid injection parameters")?;

    println!("Running vehicle injection in headless mode...");
    println!(
        "Quota: {}, arrival interval: {}s, lane randomize: {}, route randomize: {}",
        config.quota, config.mean_inter_arrival, config.lane_randomize, config.route_randomize
    );
    println!();

    let sim = LocalSimulator::create_test_scenario().context("Failed to build test scenario")?;
    let mut run = InjectionRun::new(sim, config)?;

    match cli.until {
        Some(until) => {
            run.run_until(until)?;
            if run.scheduler().state() != SchedulerState::Exhausted {
                run.stop();
            }
            run.scheduler().stats().log_summary();
        }
        None => run.run()?,
    }

    print_summary(&run);
    Ok(())
}

fn print_summary(run: &InjectionRun<LocalSimulator>) {
    let scheduler = run.scheduler();
    let stats = scheduler.stats();

    println!("=== Injection Summary ===");
    println!("Time: {:.2}s", run.now());
    println!("State: {:?}", scheduler.state());
    println!(
        "Injected: {}, failed: {}, retries: {}, remaining: {}",
        stats.injected,
        stats.failed,
        stats.retries,
        scheduler.remaining()
    );
    println!(
        "Vehicles in simulator: {}",
        scheduler.client().vehicle_count()
    );
}

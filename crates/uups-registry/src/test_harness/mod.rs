//! Simulator and scenario harness used by the binary and the test suite

mod scenario;
mod simulator;

pub use scenario::{run_scenario, ScenarioReport, ScenarioStep, SCENARIO_VALUE};
pub use simulator::{
    run_simulator, SimulatedOperation, SimulatorConfig, SimulatorReport, SimulatorStats, Violation,
};

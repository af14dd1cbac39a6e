// ScenarioSleuth - app/mod.rs
//
// Application layer: run orchestration, scenario loading, result fan-in.
// Dependencies: core layer.
// Must NOT depend on: platform specifics.

pub mod controller;
pub mod coordinator;
pub mod scenario_loader;
pub mod sink;

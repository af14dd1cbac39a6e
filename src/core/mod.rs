// ScenarioSleuth - core/mod.rs
//
// Core business logic layer.
// Dependencies: standard library plus pure-logic crates (regex, serde, csv, walkdir).
// Must NOT depend on: app, platform.

pub mod discovery;
pub mod export;
pub mod matcher;
pub mod model;
pub mod scenario;

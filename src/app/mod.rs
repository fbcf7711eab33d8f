// Application layer: drives the coordinator with simulated workloads.

pub mod simulation;

pub use simulation::{Simulation, SimulationPlan, SimulationReport};

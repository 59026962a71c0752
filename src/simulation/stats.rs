//! Derived simulation statistics
//!
//! A view over the authoritative state, recomputed each tick. Nothing
//! here feeds back into the simulation.

/// Aggregate counters for the current simulation run
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Vehicles spawned since the last reset
    pub total_vehicles: usize,
    /// Vehicles that reached their target and left the canvas
    pub vehicles_passed: usize,
    /// Emergency vehicles spawned since the last reset
    pub emergency_vehicles: usize,
    /// Vehicles currently stopped at a light
    pub current_waiting: usize,
    pub rule_violations: usize,
    pub accidents: usize,
    /// Successful label predictions received from the advisor
    pub label_predictions: usize,
    /// Average wait across currently waiting vehicles, in milliseconds
    pub average_wait_ms: f32,
    /// 0-100 score: throughput minus violation and accident penalties
    pub efficiency: f32,
}

impl SimulationStats {
    pub fn new() -> Self {
        Self {
            efficiency: 100.0,
            ..Self::default()
        }
    }

    /// Recompute the derived efficiency score
    pub fn update_efficiency(&mut self) {
        let total = self.total_vehicles.max(1) as f32;
        let passed_ratio = self.vehicles_passed as f32 / total;
        let violation_penalty = self.rule_violations as f32 * 2.0;
        let accident_penalty = self.accidents as f32 * 10.0;
        self.efficiency = (passed_ratio * 100.0 - violation_penalty - accident_penalty)
            .clamp(0.0, 100.0);
    }
}

//! Intersection control and vehicle kinematics
//!
//! This module contains the whole simulation core: the vehicle store,
//! the four-light controller with its scheduling policy, the safety
//! monitor and the tick driver. It has no rendering or transport
//! dependencies; hosts drive it through `SimWorld::advance` and read
//! the snapshot accessors.

mod advisor;
mod lights;
mod safety;
mod scheduling;
mod stats;
mod types;
mod vehicle;
mod world;

pub use advisor::{
    determine_current_label, queue_variance, HeuristicLabelSource, LabelRequest, LabelSource,
    SchedulingAdvisor, TelemetryReporter, TelemetrySink, TrafficSample, LABEL_POLL_INTERVAL_MS,
    TELEMETRY_INTERVAL_MS,
};
pub use lights::{ApproachTraffic, LightController, TrafficLight};
pub use safety::{AccidentRecord, SafetyMonitor, ViolationKind, ViolationRecord};
pub use scheduling::{select_next, weights};
pub use stats::SimulationStats;
pub use types::{
    AccidentId, Direction, Layout, LightState, Movement, Position, SchedulingLabel, VehicleId,
    ACCIDENT_CLEAR_DELAY_MS, ARRIVAL_EPSILON, BRAKE_FACTOR, COLLISION_DISTANCE,
    EMERGENCY_GREEN_BONUS_MS, EMERGENCY_SPEED_FACTOR, FOLLOW_FACTOR, FOLLOW_MARGIN,
    GREEN_BONUS_PER_CAR_MS, GREEN_BONUS_PER_WEIGHT_MS, MAX_GREEN_MS, MAX_QUEUE_PER_DIRECTION,
    MIN_GREEN_MS, MIN_SPEED, PREEMPTION_RADIUS, SAFETY_DISTANCE, SPAWN_GAP, SPEED_LIMIT,
    YELLOW_TIME_MS,
};
pub use vehicle::{Vehicle, VehicleUpdateResult};
pub use world::{SimWorld, EMERGENCY_SPAWN_INTERVAL_MS, SPAWN_INTERVAL_MS};

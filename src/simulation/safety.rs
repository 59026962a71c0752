//! Safety monitor: violation detection, collision handling, braking
//!
//! Runs once per tick over the full vehicle list. Violations are sticky
//! per vehicle (at most one record each); braking and car-following
//! adjustments re-trigger every tick while vehicles remain close.
//!
//! Within a pair the near-collision braking applies before the
//! car-following cap, matching the scan order the rest of the system is
//! tuned against.

use log::{info, warn};

use super::lights::LightController;
use super::types::{
    AccidentId, Direction, Layout, LightState, Position, VehicleId, ACCIDENT_CLEAR_DELAY_MS,
    BRAKE_FACTOR, COLLISION_DISTANCE, FOLLOW_FACTOR, FOLLOW_MARGIN, MIN_SPEED, SAFETY_DISTANCE,
    SPEED_LIMIT,
};
use super::vehicle::Vehicle;

/// What rule a vehicle broke
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViolationKind {
    Speeding { speed: f32, limit: f32 },
    RedLight,
}

/// Immutable record of a single rule violation
#[derive(Debug, Clone)]
pub struct ViolationRecord {
    pub kind: ViolationKind,
    pub vehicle: VehicleId,
    pub direction: Direction,
    pub timestamp_ms: f32,
}

/// Immutable record of a collision between two vehicles
#[derive(Debug, Clone)]
pub struct AccidentRecord {
    pub id: AccidentId,
    pub vehicles: [VehicleId; 2],
    pub location: Position,
    pub directions: [Direction; 2],
    pub timestamp_ms: f32,
}

/// A wreck waiting for its clearance delay to elapse
#[derive(Debug, Clone)]
struct PendingClearance {
    accident: AccidentId,
    vehicles: [VehicleId; 2],
    clear_at_ms: f32,
}

/// Pairwise proximity and violation scanner
#[derive(Debug, Default)]
pub struct SafetyMonitor {
    violations: Vec<ViolationRecord>,
    accidents: Vec<AccidentRecord>,
    pending: Vec<PendingClearance>,
    next_accident_id: u64,
    speeding_count: usize,
    red_light_count: usize,
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn violations(&self) -> &[ViolationRecord] {
        &self.violations
    }

    pub fn accidents(&self) -> &[AccidentRecord] {
        &self.accidents
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn accident_count(&self) -> usize {
        self.accidents.len()
    }

    pub fn speeding_count(&self) -> usize {
        self.speeding_count
    }

    pub fn red_light_count(&self) -> usize {
        self.red_light_count
    }

    /// Whether any wreck is still waiting for clearance
    pub fn has_pending_clearance(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record speeding and red-light-running violations.
    ///
    /// `has_violated_rules` is sticky: an already-flagged vehicle is
    /// never recorded a second time, even if it is still speeding.
    /// Emergency vehicles are exempt from red-light detection (they are
    /// allowed through) but not from speeding detection.
    pub fn scan_violations(
        &mut self,
        vehicles: &mut [Vehicle],
        lights: &LightController,
        layout: &Layout,
        now_ms: f32,
    ) {
        for vehicle in vehicles.iter_mut() {
            if vehicle.has_violated_rules {
                continue;
            }

            if vehicle.speed > SPEED_LIMIT {
                vehicle.has_violated_rules = true;
                self.speeding_count += 1;
                self.violations.push(ViolationRecord {
                    kind: ViolationKind::Speeding {
                        speed: vehicle.speed,
                        limit: SPEED_LIMIT,
                    },
                    vehicle: vehicle.id,
                    direction: vehicle.direction,
                    timestamp_ms: now_ms,
                });
                warn!(
                    "Violation: vehicle {} speeding at {:.1} in {}",
                    vehicle.id.0, vehicle.speed, vehicle.direction
                );
                continue;
            }

            let light_state = lights.state_of(vehicle.direction);
            if light_state == LightState::Red
                && !vehicle.is_emergency
                && layout.in_intersection(&vehicle.position)
            {
                vehicle.has_violated_rules = true;
                self.red_light_count += 1;
                self.violations.push(ViolationRecord {
                    kind: ViolationKind::RedLight,
                    vehicle: vehicle.id,
                    direction: vehicle.direction,
                    timestamp_ms: now_ms,
                });
                warn!(
                    "Violation: vehicle {} ran a red light from {}",
                    vehicle.id.0, vehicle.direction
                );
            }
        }
    }

    /// Scan every unordered vehicle pair for near-collisions, actual
    /// collisions and unsafe following distance. O(n^2) in the active
    /// vehicle count, which spawn admission bounds at 10 per approach.
    ///
    /// Returns the accidents detected this tick; the caller applies the
    /// world-level effects (forced all-red).
    pub fn scan_pairs(&mut self, vehicles: &mut [Vehicle], now_ms: f32) -> Vec<AccidentRecord> {
        let mut new_accidents = Vec::new();

        for i in 0..vehicles.len() {
            for j in (i + 1)..vehicles.len() {
                let (head, tail) = vehicles.split_at_mut(j);
                let first = &mut head[i];
                let second = &mut tail[0];

                if first.wrecked || second.wrecked {
                    continue;
                }

                let distance = first.position.distance(&second.position);

                if distance < SAFETY_DISTANCE {
                    // Emergency braking, re-applied every tick while close
                    first.speed = (first.speed * BRAKE_FACTOR).max(MIN_SPEED);
                    second.speed = (second.speed * BRAKE_FACTOR).max(MIN_SPEED);

                    if distance < COLLISION_DISTANCE {
                        let record = self.record_accident(first, second, now_ms);
                        new_accidents.push(record);
                        continue;
                    }
                }

                // Rear-end prevention: the trailing vehicle is capped to
                // a fraction of the leader's speed
                if first.direction == second.direction
                    && first.is_ahead_of(second)
                    && distance < SAFETY_DISTANCE + FOLLOW_MARGIN
                {
                    second.speed = (first.speed * FOLLOW_FACTOR).max(MIN_SPEED);
                }
            }
        }

        new_accidents
    }

    fn record_accident(
        &mut self,
        first: &mut Vehicle,
        second: &mut Vehicle,
        now_ms: f32,
    ) -> AccidentRecord {
        first.wrecked = true;
        second.wrecked = true;
        first.speed = 0.0;
        second.speed = 0.0;

        let id = AccidentId(self.next_accident_id);
        self.next_accident_id += 1;

        let record = AccidentRecord {
            id,
            vehicles: [first.id, second.id],
            location: first.position.midpoint(&second.position),
            directions: [first.direction, second.direction],
            timestamp_ms: now_ms,
        };

        warn!(
            "Accident: vehicles {} ({}) and {} ({}) collided at the intersection",
            first.id.0, first.direction, second.id.0, second.direction
        );

        self.pending.push(PendingClearance {
            accident: id,
            vehicles: record.vehicles,
            clear_at_ms: now_ms + ACCIDENT_CLEAR_DELAY_MS,
        });
        self.accidents.push(record.clone());

        record
    }

    /// Drain clearances whose delay has elapsed. The caller removes the
    /// listed vehicles and restores the pre-accident green.
    pub fn due_clearances(&mut self, now_ms: f32) -> Vec<[VehicleId; 2]> {
        let mut cleared = Vec::new();
        self.pending.retain(|pending| {
            if now_ms >= pending.clear_at_ms {
                info!(
                    "Accident {} cleared, normal traffic flow resuming",
                    pending.accident.0
                );
                cleared.push(pending.vehicles);
                false
            } else {
                true
            }
        });
        cleared
    }

    /// Drop all records and pending clearances (full simulation reset)
    pub fn reset(&mut self) {
        self.violations.clear();
        self.accidents.clear();
        self.pending.clear();
        self.next_accident_id = 0;
        self.speeding_count = 0;
        self.red_light_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::Movement;

    fn vehicle_at(id: u64, direction: Direction, x: f32, y: f32, speed: f32) -> Vehicle {
        let layout = Layout::default();
        let mut vehicle = Vehicle::new(
            VehicleId(id),
            direction,
            Movement::Straight,
            speed,
            &layout,
            0.0,
        );
        vehicle.position = Position::new(x, y);
        vehicle
    }

    #[test]
    fn speeding_is_recorded_once() {
        let layout = Layout::default();
        let lights = LightController::new(&layout);
        let mut monitor = SafetyMonitor::new();
        let mut vehicles = vec![vehicle_at(1, Direction::North, 385.0, 500.0, SPEED_LIMIT + 1.0)];

        monitor.scan_violations(&mut vehicles, &lights, &layout, 0.0);
        monitor.scan_violations(&mut vehicles, &lights, &layout, 16.7);

        assert_eq!(monitor.violation_count(), 1);
        assert_eq!(monitor.speeding_count(), 1);
        assert!(vehicles[0].has_violated_rules);
    }

    #[test]
    fn red_light_running_requires_red_and_intersection() {
        let layout = Layout::default();
        let lights = LightController::new(&layout);
        let mut monitor = SafetyMonitor::new();

        // East's light starts red; one vehicle inside the box, one outside.
        let mut vehicles = vec![
            vehicle_at(1, Direction::East, 400.0, 285.0, 2.0),
            vehicle_at(2, Direction::East, 100.0, 285.0, 2.0),
        ];

        monitor.scan_violations(&mut vehicles, &lights, &layout, 0.0);

        assert_eq!(monitor.red_light_count(), 1);
        assert!(vehicles[0].has_violated_rules);
        assert!(!vehicles[1].has_violated_rules);
    }

    #[test]
    fn emergency_exempt_from_red_light_but_not_speeding() {
        let layout = Layout::default();
        let lights = LightController::new(&layout);
        let mut monitor = SafetyMonitor::new();

        let mut runner = vehicle_at(1, Direction::East, 400.0, 285.0, 2.0);
        runner.is_emergency = true;
        let mut speeder = vehicle_at(2, Direction::East, 100.0, 285.0, SPEED_LIMIT * 1.3);
        speeder.is_emergency = true;
        let mut vehicles = vec![runner, speeder];

        monitor.scan_violations(&mut vehicles, &lights, &layout, 0.0);

        assert_eq!(monitor.red_light_count(), 0);
        assert_eq!(monitor.speeding_count(), 1);
    }

    #[test]
    fn close_pair_brakes_sharply() {
        let mut monitor = SafetyMonitor::new();
        let mut vehicles = vec![
            vehicle_at(1, Direction::North, 385.0, 400.0, 3.0),
            vehicle_at(2, Direction::East, 390.0, 420.0, 2.0),
        ];

        let accidents = monitor.scan_pairs(&mut vehicles, 0.0);

        assert!(accidents.is_empty());
        assert!((vehicles[0].speed - 0.9).abs() < 1e-5);
        assert!((vehicles[1].speed - 0.6).abs() < 1e-5);
    }

    #[test]
    fn braking_never_drops_below_floor() {
        let mut monitor = SafetyMonitor::new();
        let mut vehicles = vec![
            vehicle_at(1, Direction::North, 385.0, 400.0, 0.2),
            vehicle_at(2, Direction::East, 390.0, 420.0, 0.2),
        ];

        monitor.scan_pairs(&mut vehicles, 0.0);

        assert_eq!(vehicles[0].speed, MIN_SPEED);
        assert_eq!(vehicles[1].speed, MIN_SPEED);
    }

    #[test]
    fn collision_wrecks_both_and_records_once() {
        let mut monitor = SafetyMonitor::new();
        let mut vehicles = vec![
            vehicle_at(1, Direction::North, 400.0, 300.0, 3.0),
            vehicle_at(2, Direction::East, 405.0, 305.0, 2.0),
        ];

        let accidents = monitor.scan_pairs(&mut vehicles, 100.0);
        assert_eq!(accidents.len(), 1);
        assert!(vehicles[0].wrecked && vehicles[1].wrecked);
        assert_eq!(vehicles[0].speed, 0.0);

        // A wrecked pair is skipped on later ticks: one record per episode.
        let again = monitor.scan_pairs(&mut vehicles, 116.7);
        assert!(again.is_empty());
        assert_eq!(monitor.accident_count(), 1);
    }

    #[test]
    fn clearance_waits_for_the_delay() {
        let mut monitor = SafetyMonitor::new();
        let mut vehicles = vec![
            vehicle_at(1, Direction::North, 400.0, 300.0, 3.0),
            vehicle_at(2, Direction::East, 405.0, 305.0, 2.0),
        ];
        monitor.scan_pairs(&mut vehicles, 0.0);

        assert!(monitor.due_clearances(ACCIDENT_CLEAR_DELAY_MS - 1.0).is_empty());
        let cleared = monitor.due_clearances(ACCIDENT_CLEAR_DELAY_MS);
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0], [VehicleId(1), VehicleId(2)]);
        assert!(!monitor.has_pending_clearance());
    }

    #[test]
    fn trailing_vehicle_capped_to_leader_speed() {
        let mut monitor = SafetyMonitor::new();
        // 30px apart: outside braking range, inside follow range.
        let mut vehicles = vec![
            vehicle_at(1, Direction::North, 385.0, 400.0, 2.0),
            vehicle_at(2, Direction::North, 385.0, 430.0, 3.0),
        ];

        monitor.scan_pairs(&mut vehicles, 0.0);

        assert!((vehicles[1].speed - 1.6).abs() < 1e-5);
        assert!((vehicles[0].speed - 2.0).abs() < 1e-5);
    }
}

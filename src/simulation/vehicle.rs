//! Vehicle records and per-tick kinematics
//!
//! A vehicle moves in a straight line toward its target point, stopping
//! in the approach window while its light is not green. The safety
//! monitor mutates speeds separately; this module only advances position.

use super::types::{
    Direction, Layout, LightState, Movement, Position, VehicleId, ARRIVAL_EPSILON,
};

/// Result of a vehicle update indicating what the store should do with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    /// Vehicle keeps moving (or waiting) next tick
    Continue,
    /// Vehicle reached its target and should be removed
    Arrived,
}

/// One car or emergency vehicle in transit
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub position: Position,
    pub target: Position,
    pub angle: f32,
    pub speed: f32,
    pub direction: Direction,
    pub movement: Movement,
    pub is_emergency: bool,
    /// Recomputed each tick from the light state and approach window
    pub stopped: bool,
    /// Set when this vehicle was part of a collision; wrecked vehicles
    /// hold position until the accident clearance removes them
    pub wrecked: bool,
    /// Sticky: once true it never resets except on full simulation reset
    pub has_violated_rules: bool,
    /// Accumulated time spent stopped, in milliseconds
    pub wait_time_ms: f32,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        direction: Direction,
        movement: Movement,
        speed: f32,
        layout: &Layout,
        spawn_offset: f32,
    ) -> Self {
        Self {
            id,
            position: layout.spawn_point(direction, spawn_offset),
            target: layout.target_point(direction, movement),
            angle: layout.heading(direction),
            speed,
            direction,
            movement,
            is_emergency: false,
            stopped: false,
            wrecked: false,
            has_violated_rules: false,
            wait_time_ms: 0.0,
        }
    }

    /// Whether this vehicle must hold at the stop line.
    ///
    /// Emergency vehicles never stop for lights; everyone else stops in
    /// the approach window whenever the light is not green (yellow
    /// included).
    pub fn should_stop(&self, light_state: LightState, layout: &Layout) -> bool {
        if light_state == LightState::Green {
            return false;
        }
        if self.is_emergency {
            return false;
        }
        layout.in_approach_window(self.direction, &self.position)
    }

    /// Advance one tick. Stopped vehicles accumulate wait time; moving
    /// vehicles step `speed` pixels toward the target.
    pub fn advance(
        &mut self,
        delta_ms: f32,
        light_state: LightState,
        layout: &Layout,
    ) -> VehicleUpdateResult {
        self.stopped = self.should_stop(light_state, layout);

        if self.stopped {
            self.wait_time_ms += delta_ms;
            return VehicleUpdateResult::Continue;
        }

        let dx = self.target.x - self.position.x;
        let dy = self.target.y - self.position.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance <= ARRIVAL_EPSILON {
            return VehicleUpdateResult::Arrived;
        }

        self.position.x += dx / distance * self.speed;
        self.position.y += dy / distance * self.speed;
        VehicleUpdateResult::Continue
    }

    /// Whether this vehicle is ahead of `other` on the shared approach,
    /// in the travel direction of that approach.
    pub fn is_ahead_of(&self, other: &Vehicle) -> bool {
        match self.direction {
            Direction::North => self.position.y < other.position.y,
            Direction::East => self.position.x > other.position.x,
            Direction::South => self.position.y > other.position.y,
            Direction::West => self.position.x < other.position.x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::SPEED_LIMIT;

    fn northbound(layout: &Layout) -> Vehicle {
        Vehicle::new(
            VehicleId(1),
            Direction::North,
            Movement::Straight,
            2.0,
            layout,
            0.0,
        )
    }

    #[test]
    fn moves_toward_target_when_green() {
        let layout = Layout::default();
        let mut vehicle = northbound(&layout);
        let start_y = vehicle.position.y;

        let result = vehicle.advance(16.7, LightState::Green, &layout);

        assert_eq!(result, VehicleUpdateResult::Continue);
        assert!(vehicle.position.y < start_y);
        assert!(!vehicle.stopped);
    }

    #[test]
    fn holds_in_approach_window_on_red() {
        let layout = Layout::default();
        let mut vehicle = northbound(&layout);
        vehicle.position = Position::new(385.0, 360.0);
        let held_at = vehicle.position;

        vehicle.advance(16.7, LightState::Red, &layout);

        assert!(vehicle.stopped);
        assert_eq!(vehicle.position, held_at);
        assert!(vehicle.wait_time_ms > 0.0);
    }

    #[test]
    fn yellow_also_stops_traffic() {
        let layout = Layout::default();
        let mut vehicle = northbound(&layout);
        vehicle.position = Position::new(385.0, 360.0);

        vehicle.advance(16.7, LightState::Yellow, &layout);

        assert!(vehicle.stopped);
    }

    #[test]
    fn emergency_ignores_red() {
        let layout = Layout::default();
        let mut vehicle = northbound(&layout);
        vehicle.is_emergency = true;
        vehicle.speed = SPEED_LIMIT * 1.3;
        vehicle.position = Position::new(385.0, 360.0);

        vehicle.advance(16.7, LightState::Red, &layout);

        assert!(!vehicle.stopped);
        assert!(vehicle.position.y < 360.0);
    }

    #[test]
    fn arrives_within_epsilon_of_target() {
        let layout = Layout::default();
        let mut vehicle = northbound(&layout);
        vehicle.position = Position::new(vehicle.target.x, vehicle.target.y + 4.0);

        let result = vehicle.advance(16.7, LightState::Green, &layout);

        assert_eq!(result, VehicleUpdateResult::Arrived);
    }

    #[test]
    fn ahead_ordering_follows_travel_direction() {
        let layout = Layout::default();
        let mut leader = northbound(&layout);
        let mut trailer = northbound(&layout);
        leader.position = Position::new(385.0, 400.0);
        trailer.position = Position::new(385.0, 450.0);

        assert!(leader.is_ahead_of(&trailer));
        assert!(!trailer.is_ahead_of(&leader));

        leader.direction = Direction::East;
        trailer.direction = Direction::East;
        leader.position = Position::new(200.0, 285.0);
        trailer.position = Position::new(150.0, 285.0);
        assert!(leader.is_ahead_of(&trailer));
    }
}

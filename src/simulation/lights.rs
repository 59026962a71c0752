//! Traffic light state machines and the controller that cycles them
//!
//! Four lights, one per approach. Exactly one is green at any instant,
//! except during a forced all-red (emergency preemption switch or
//! post-accident hold). A light goes green -> yellow -> red; the next
//! green is picked by the scheduling policy, never by a hardcoded cycle
//! unless the policy degenerates to one.

use log::{debug, info, warn};

use super::scheduling;
use super::types::{
    Direction, Layout, LightState, Position, SchedulingLabel, EMERGENCY_GREEN_BONUS_MS,
    GREEN_BONUS_PER_CAR_MS, GREEN_BONUS_PER_WEIGHT_MS, MAX_GREEN_MS, MIN_GREEN_MS, YELLOW_TIME_MS,
};

/// One of the four traffic lights
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub direction: Direction,
    /// Fixed screen anchor, consumed by the rendering collaborator
    pub anchor: Position,
    pub state: LightState,
    /// Elapsed time in the current yellow phase
    pub timer_ms: f32,
    /// Vehicles currently stopped on this approach, recomputed each tick
    pub car_count: usize,
    /// Scheduling bias from the advisor label, default 1.0
    pub ml_weight: f32,
}

impl TrafficLight {
    fn new(direction: Direction, anchor: Position) -> Self {
        Self {
            direction,
            anchor,
            state: LightState::Red,
            timer_ms: 0.0,
            car_count: 0,
            ml_weight: 1.0,
        }
    }
}

/// Per-tick traffic picture the controller schedules against
#[derive(Debug, Clone, Default)]
pub struct ApproachTraffic {
    /// Vehicles stopped per approach
    pub car_counts: [usize; 4],
    /// Whether an emergency vehicle is present per approach
    pub emergency_waiting: [bool; 4],
    /// Average wait of stopped vehicles per approach, in milliseconds
    pub avg_wait_ms: [f32; 4],
    /// Direction of an emergency vehicle inside the preemption radius
    pub preempting_emergency: Option<Direction>,
}

/// The four-light controller
#[derive(Debug, Clone)]
pub struct LightController {
    lights: [TrafficLight; 4],
    current_green: Direction,
    /// Elapsed time since the current direction went green
    phase_ms: f32,
}

impl LightController {
    pub fn new(layout: &Layout) -> Self {
        let mut lights =
            Direction::ALL.map(|direction| TrafficLight::new(direction, layout.light_anchor(direction)));
        lights[Direction::North.index()].state = LightState::Green;
        Self {
            lights,
            current_green: Direction::North,
            phase_ms: 0.0,
        }
    }

    pub fn lights(&self) -> &[TrafficLight; 4] {
        &self.lights
    }

    pub fn state_of(&self, direction: Direction) -> LightState {
        self.lights[direction.index()].state
    }

    /// The direction currently holding the green phase. Remains the
    /// authoritative green index even while an accident hold forces all
    /// lights red.
    pub fn current_green(&self) -> Direction {
        self.current_green
    }

    /// Number of lights currently showing green
    pub fn green_count(&self) -> usize {
        self.lights
            .iter()
            .filter(|l| l.state == LightState::Green)
            .count()
    }

    /// Advance the state machines by one tick.
    ///
    /// Emergency preemption is checked first and short-circuits the
    /// normal green/yellow transition logic.
    pub fn update(&mut self, delta_ms: f32, label: SchedulingLabel, traffic: &ApproachTraffic) {
        let weights = scheduling::weights(label, &traffic.car_counts);
        for light in &mut self.lights {
            let i = light.direction.index();
            light.car_count = traffic.car_counts[i];
            light.ml_weight = weights[i];
        }

        if let Some(direction) = traffic.preempting_emergency {
            if direction != self.current_green {
                warn!(
                    "Emergency override: switching to {} ahead of schedule",
                    direction
                );
                self.switch_to(direction);
                return;
            }
        }

        self.phase_ms += delta_ms;

        let green_duration = self.green_duration(traffic);
        let current = &mut self.lights[self.current_green.index()];

        match current.state {
            LightState::Green => {
                if self.phase_ms >= green_duration {
                    current.state = LightState::Yellow;
                    current.timer_ms = 0.0;
                    debug!("{} switching to yellow", current.direction);
                }
            }
            LightState::Yellow => {
                current.timer_ms += delta_ms;
                if current.timer_ms >= YELLOW_TIME_MS {
                    self.switch_to_next(traffic, &weights);
                }
            }
            // Accident hold; cleared through restore_green
            LightState::Red => {}
        }
    }

    /// Dynamic green time for the current approach: base minimum plus
    /// bonuses for queue length, scheduling weight, and a queued
    /// emergency vehicle, capped at the configured maximum.
    fn green_duration(&self, traffic: &ApproachTraffic) -> f32 {
        let i = self.current_green.index();
        let light = &self.lights[i];
        let emergency_bonus = if traffic.emergency_waiting[i] {
            EMERGENCY_GREEN_BONUS_MS
        } else {
            0.0
        };
        let duration = MIN_GREEN_MS
            + light.car_count as f32 * GREEN_BONUS_PER_CAR_MS
            + light.ml_weight * GREEN_BONUS_PER_WEIGHT_MS
            + emergency_bonus;
        duration.min(MAX_GREEN_MS)
    }

    /// Force an immediate green for `direction`, all others red
    fn switch_to(&mut self, direction: Direction) {
        for light in &mut self.lights {
            light.state = LightState::Red;
        }
        self.lights[direction.index()].state = LightState::Green;
        self.current_green = direction;
        self.phase_ms = 0.0;
        info!("{} light is now green", direction);
    }

    fn switch_to_next(&mut self, traffic: &ApproachTraffic, weights: &[f32; 4]) {
        self.lights[self.current_green.index()].state = LightState::Red;

        let next = scheduling::select_next(
            self.current_green,
            &traffic.car_counts,
            weights,
            &traffic.emergency_waiting,
            &traffic.avg_wait_ms,
        );

        self.current_green = next;
        self.lights[next.index()].state = LightState::Green;
        self.phase_ms = 0.0;

        let light = &self.lights[next.index()];
        info!(
            "Switched to {} ({} vehicles, weight {:.1})",
            next, light.car_count, light.ml_weight
        );
    }

    /// Safety clear after a collision: every light goes red while the
    /// wreck occupies the intersection. The green index is preserved so
    /// the pre-accident direction can be restored.
    pub fn force_all_red(&mut self) {
        for light in &mut self.lights {
            light.state = LightState::Red;
        }
    }

    /// Restore the pre-accident green direction after a clearance
    pub fn restore_green(&mut self) {
        self.lights[self.current_green.index()].state = LightState::Green;
    }

    /// Reinitialize to the start-of-simulation state: North green,
    /// everything else red, all timers and weights cleared.
    pub fn reset(&mut self) {
        for light in &mut self.lights {
            light.state = LightState::Red;
            light.timer_ms = 0.0;
            light.car_count = 0;
            light.ml_weight = 1.0;
        }
        self.current_green = Direction::North;
        self.lights[Direction::North.index()].state = LightState::Green;
        self.phase_ms = 0.0;
    }
}

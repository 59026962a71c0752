//! The simulation world: one owned aggregate tying the vehicle store,
//! light controller, safety monitor and collaborator ports together.
//!
//! `advance(delta_ms)` is the single entry point; any host loop (render
//! callback, fixed-tick harness, headless benchmark) can drive it. No
//! ambient globals, so multiple worlds can coexist and be tested in
//! isolation.

use anyhow::{bail, Result};
use log::{debug, info, warn};
use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;

use super::advisor::{
    determine_current_label, queue_variance, LabelRequest, LabelSource, SchedulingAdvisor,
    TelemetryReporter, TelemetrySink, TrafficSample,
};
use super::lights::{ApproachTraffic, LightController, TrafficLight};
use super::safety::{AccidentRecord, SafetyMonitor, ViolationRecord};
use super::stats::SimulationStats;
use super::types::{
    Direction, Layout, LightState, Movement, Position, VehicleId, EMERGENCY_SPEED_FACTOR,
    MAX_QUEUE_PER_DIRECTION, PREEMPTION_RADIUS, SPAWN_GAP, SPEED_LIMIT,
};
use super::vehicle::{Vehicle, VehicleUpdateResult};

/// Interval between automatic vehicle spawns
pub const SPAWN_INTERVAL_MS: f32 = 2000.0;

/// Interval between automatic emergency vehicle spawns
pub const EMERGENCY_SPAWN_INTERVAL_MS: f32 = 15_000.0;

/// The main simulation world
pub struct SimWorld {
    layout: Layout,
    vehicles: Vec<Vehicle>,
    lights: LightController,
    safety: SafetyMonitor,
    advisor: SchedulingAdvisor,
    telemetry: TelemetryReporter,
    stats: SimulationStats,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,

    running: bool,
    time_ms: f32,
    next_id: u64,
    last_spawn_ms: f32,
    last_emergency_spawn_ms: f32,
    /// Whether the world spawns traffic on its own timers
    auto_spawn: bool,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(rng: Option<StdRng>) -> Self {
        let layout = Layout::default();
        let lights = LightController::new(&layout);
        Self {
            layout,
            vehicles: Vec::new(),
            lights,
            safety: SafetyMonitor::new(),
            advisor: SchedulingAdvisor::new(None),
            telemetry: TelemetryReporter::new(None),
            stats: SimulationStats::new(),
            rng,
            running: false,
            time_ms: 0.0,
            next_id: 0,
            last_spawn_ms: 0.0,
            last_emergency_spawn_ms: 0.0,
            auto_spawn: true,
        }
    }

    pub fn new() -> Self {
        Self::new_internal(None)
    }

    /// Create a world with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(Some(StdRng::seed_from_u64(seed)))
    }

    /// Attach a scheduling-label source (the prediction collaborator)
    pub fn set_label_source(&mut self, source: Box<dyn LabelSource>) {
        self.advisor = SchedulingAdvisor::new(Some(source));
    }

    /// Attach a telemetry sink (the data-logging collaborator)
    pub fn set_telemetry_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.telemetry = TelemetryReporter::new(Some(sink));
    }

    /// Disable or enable the automatic spawn timers. Manual spawn
    /// commands keep working either way.
    pub fn set_auto_spawn(&mut self, enabled: bool) {
        self.auto_spawn = enabled;
    }

    // --- read surface consumed by rendering/collaborators ---

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Mutable access to a single vehicle, for hosts that adjust
    /// vehicles after spawning (scripted scenarios, manual overrides)
    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    /// Whether a wreck is still waiting for its clearance delay
    pub fn has_pending_accident(&self) -> bool {
        self.safety.has_pending_clearance()
    }

    pub fn lights(&self) -> &[TrafficLight; 4] {
        self.lights.lights()
    }

    pub fn light_state(&self, direction: Direction) -> LightState {
        self.lights.state_of(direction)
    }

    pub fn current_green(&self) -> Direction {
        self.lights.current_green()
    }

    pub fn green_count(&self) -> usize {
        self.lights.green_count()
    }

    pub fn violations(&self) -> &[ViolationRecord] {
        self.safety.violations()
    }

    pub fn accidents(&self) -> &[AccidentRecord] {
        self.safety.accidents()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn current_label(&self) -> super::types::SchedulingLabel {
        self.advisor.current_label()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time_ms(&self) -> f32 {
        self.time_ms
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Vehicles currently on the given approach
    pub fn queue_len(&self, direction: Direction) -> usize {
        self.vehicles
            .iter()
            .filter(|v| v.direction == direction)
            .count()
    }

    // --- lifecycle ---

    /// Begin accepting ticks. Idempotent.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        info!("Simulation started");
    }

    /// Stop accepting ticks. Idempotent; no further state changes occur
    /// until the next `start`.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        info!("Simulation stopped");
    }

    /// Full reinitialization: stops first, then clears every piece of
    /// state including sticky flags, record logs and the cached label.
    pub fn reset(&mut self) {
        self.stop();
        self.vehicles.clear();
        self.lights.reset();
        self.safety.reset();
        self.advisor.reset();
        self.telemetry.reset();
        self.stats = SimulationStats::new();
        self.time_ms = 0.0;
        self.next_id = 0;
        self.last_spawn_ms = 0.0;
        self.last_emergency_spawn_ms = 0.0;
        info!("Simulation reset");
    }

    // --- spawning ---

    /// Spawn a vehicle on the given approach.
    ///
    /// Admission control: an approach already holding the maximum number
    /// of vehicles rejects the spawn. Accepted spawns are placed behind
    /// the farthest queued vehicle so they never overlap existing
    /// traffic. `movement` defaults to a random choice.
    pub fn spawn_vehicle(
        &mut self,
        direction: Direction,
        movement: Option<Movement>,
    ) -> Result<VehicleId> {
        if self.queue_len(direction) >= MAX_QUEUE_PER_DIRECTION {
            bail!(
                "Cannot spawn vehicle: {} approach is full ({} vehicles)",
                direction,
                MAX_QUEUE_PER_DIRECTION
            );
        }

        let movement = match movement {
            Some(movement) => movement,
            None => *self
                .choose_random(&Movement::ALL)
                .unwrap_or(&Movement::Straight),
        };

        let offset = self.spawn_offset(direction);
        let speed = self
            .random_range(1.5..2.0f32)
            .clamp(0.5, SPEED_LIMIT);

        let id = VehicleId(self.next_id);
        self.next_id += 1;

        let vehicle = Vehicle::new(id, direction, movement, speed, &self.layout, offset);
        debug!(
            "Spawned vehicle {} from {} ({:?}), speed {:.1}",
            id.0, direction, movement, speed
        );
        self.vehicles.push(vehicle);
        self.stats.total_vehicles += 1;
        Ok(id)
    }

    /// Spawn an emergency vehicle: a regular spawn upgraded with the
    /// emergency flag and a speed boost past the limit (which is also
    /// what trips the speeding check).
    pub fn spawn_emergency_vehicle(&mut self, direction: Option<Direction>) -> Result<VehicleId> {
        let direction = match direction {
            Some(direction) => direction,
            None => *self
                .choose_random(&Direction::ALL)
                .unwrap_or(&Direction::North),
        };

        let id = self.spawn_vehicle(direction, None)?;
        if let Some(vehicle) = self.vehicles.iter_mut().find(|v| v.id == id) {
            vehicle.is_emergency = true;
            vehicle.speed = (vehicle.speed * EMERGENCY_SPEED_FACTOR)
                .min(SPEED_LIMIT * EMERGENCY_SPEED_FACTOR);
            warn!("Emergency vehicle approaching from {}", direction);
        }
        self.stats.emergency_vehicles += 1;
        Ok(id)
    }

    /// Offset behind the farthest queued vehicle on this approach
    fn spawn_offset(&self, direction: Direction) -> f32 {
        let mut max_depth: Option<f32> = None;
        for vehicle in self.vehicles.iter().filter(|v| v.direction == direction) {
            let depth = self.layout.offscreen_depth(direction, &vehicle.position);
            max_depth = Some(max_depth.map_or(depth, |d: f32| d.max(depth)));
        }
        match max_depth {
            Some(depth) => depth + SPAWN_GAP,
            None => 0.0,
        }
    }

    // --- tick driver ---

    /// Advance the simulation by one tick of `delta_ms` measured
    /// wall-time. No-op while stopped.
    ///
    /// Call order: collaborator refresh, safety checks, spawn timers,
    /// light update, vehicle update, accident clearances, stats.
    pub fn advance(&mut self, delta_ms: f32) {
        if !self.running {
            return;
        }
        self.time_ms += delta_ms;

        self.refresh_collaborators();

        self.safety.scan_violations(
            &mut self.vehicles,
            &self.lights,
            &self.layout,
            self.time_ms,
        );
        let new_accidents = self.safety.scan_pairs(&mut self.vehicles, self.time_ms);
        if !new_accidents.is_empty() {
            // Safety clear while the wreck occupies the intersection
            self.lights.force_all_red();
        }

        self.run_spawn_timers();

        let traffic = self.approach_traffic();
        self.lights
            .update(delta_ms, self.advisor.current_label(), &traffic);

        self.update_vehicles(delta_ms);

        for pair in self.safety.due_clearances(self.time_ms) {
            self.vehicles.retain(|v| !pair.contains(&v.id));
            self.lights.restore_green();
        }

        self.recompute_stats();
    }

    fn refresh_collaborators(&mut self) {
        if self.advisor.refresh_due(self.time_ms) {
            let request = LabelRequest {
                timestamp_ms: self.time_ms + 10_000.0,
                predicted_vehicles: self.vehicles.len() + self.random_range(0..5usize),
                emergency_expected: self.random_range(0.0..1.0f32) < 0.1,
            };
            self.advisor.refresh(self.time_ms, &request);
        }

        if self.telemetry.report_due(self.time_ms) {
            let counts = self.stopped_counts();
            let emergency_present = self.vehicles.iter().any(|v| v.is_emergency);
            let sample = TrafficSample {
                timestamp_ms: self.time_ms,
                vehicles_present: self.vehicles.len(),
                emergency_present,
                scheduling_label: determine_current_label(
                    self.vehicles.len(),
                    emergency_present,
                    queue_variance(&counts),
                ),
            };
            self.telemetry.submit(self.time_ms, &sample);
        }
    }

    fn run_spawn_timers(&mut self) {
        if !self.auto_spawn {
            return;
        }

        if self.time_ms - self.last_spawn_ms > SPAWN_INTERVAL_MS {
            self.last_spawn_ms = self.time_ms;
            let direction = *self
                .choose_random(&Direction::ALL)
                .unwrap_or(&Direction::North);
            if let Err(error) = self.spawn_vehicle(direction, None) {
                debug!("Auto-spawn rejected: {:#}", error);
            }
        }

        if self.time_ms - self.last_emergency_spawn_ms > EMERGENCY_SPAWN_INTERVAL_MS {
            self.last_emergency_spawn_ms = self.time_ms;
            if let Err(error) = self.spawn_emergency_vehicle(None) {
                debug!("Auto emergency spawn rejected: {:#}", error);
            }
        }
    }

    /// The per-approach traffic picture the light controller schedules
    /// against this tick
    fn approach_traffic(&self) -> ApproachTraffic {
        let mut traffic = ApproachTraffic {
            car_counts: self.stopped_counts(),
            ..Default::default()
        };

        let mut wait_totals = [0.0f32; 4];
        for vehicle in &self.vehicles {
            let i = vehicle.direction.index();
            if vehicle.stopped {
                wait_totals[i] += vehicle.wait_time_ms;
            }
            if vehicle.is_emergency && !vehicle.wrecked {
                traffic.emergency_waiting[i] = true;
                if traffic.preempting_emergency.is_none()
                    && self.layout.center_distance(&vehicle.position) < PREEMPTION_RADIUS
                {
                    traffic.preempting_emergency = Some(vehicle.direction);
                }
            }
        }
        for i in 0..4 {
            if traffic.car_counts[i] > 0 {
                traffic.avg_wait_ms[i] = wait_totals[i] / traffic.car_counts[i] as f32;
            }
        }

        traffic
    }

    fn stopped_counts(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for vehicle in self.vehicles.iter().filter(|v| v.stopped) {
            counts[vehicle.direction.index()] += 1;
        }
        counts
    }

    fn update_vehicles(&mut self, delta_ms: f32) {
        // Reverse iteration so arrivals can be removed in place
        for index in (0..self.vehicles.len()).rev() {
            if self.vehicles[index].wrecked {
                continue;
            }
            let light_state = self.lights.state_of(self.vehicles[index].direction);
            match self.vehicles[index].advance(delta_ms, light_state, &self.layout) {
                VehicleUpdateResult::Continue => {}
                VehicleUpdateResult::Arrived => {
                    let vehicle = self.vehicles.remove(index);
                    debug!("Vehicle {} passed through from {}", vehicle.id.0, vehicle.direction);
                    self.stats.vehicles_passed += 1;
                }
            }
        }
    }

    fn recompute_stats(&mut self) {
        let waiting: Vec<&Vehicle> = self.vehicles.iter().filter(|v| v.stopped).collect();
        self.stats.current_waiting = waiting.len();
        self.stats.average_wait_ms = if waiting.is_empty() {
            0.0
        } else {
            waiting.iter().map(|v| v.wait_time_ms).sum::<f32>() / waiting.len() as f32
        };
        self.stats.rule_violations = self.safety.violation_count();
        self.stats.accidents = self.safety.accident_count();
        self.stats.label_predictions = self.advisor.prediction_count();
        self.stats.update_efficiency();
    }

    // --- random helpers (seeded when available) ---

    fn random_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn choose_random<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }

    // --- terminal output ---

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Intersection Simulation Summary ===");
        println!("Time: {:.1}s, running: {}", self.time_ms / 1000.0, self.running);
        println!(
            "Green: {} | label: {}",
            self.current_green(),
            self.current_label()
        );
        println!(
            "Vehicles: {} active, {} spawned, {} passed, {} waiting",
            self.vehicles.len(),
            self.stats.total_vehicles,
            self.stats.vehicles_passed,
            self.stats.current_waiting
        );
        println!(
            "Violations: {} ({} speeding, {} red light) | Accidents: {}",
            self.stats.rule_violations,
            self.safety.speeding_count(),
            self.safety.red_light_count(),
            self.stats.accidents
        );
        println!("Efficiency: {:.1}%", self.stats.efficiency);

        for light in self.lights.lights() {
            println!(
                "  {} light: {:?}, {} queued, weight {:.1}",
                light.direction, light.state, light.car_count, light.ml_weight
            );
        }
    }

    /// Draw a terminal map of the intersection and active vehicles
    pub fn draw_map(&self) {
        const COLS: usize = 80;
        const ROWS: usize = 30;

        let scale_x = COLS as f32 / self.layout.width;
        let scale_y = ROWS as f32 / self.layout.height;
        let to_grid = |position: &Position| -> (usize, usize) {
            let col = (position.x * scale_x) as usize;
            let row = (position.y * scale_y) as usize;
            (row.min(ROWS - 1), col.min(COLS - 1))
        };

        let mut grid = vec![vec![' '; COLS]; ROWS];

        // Roads
        let (center_row, center_col) = to_grid(&self.layout.center);
        let half_cols = (self.layout.road_width / 2.0 * scale_x) as usize;
        let half_rows = (self.layout.road_width / 2.0 * scale_y) as usize;
        for row in grid.iter_mut() {
            for col in center_col.saturating_sub(half_cols)..(center_col + half_cols).min(COLS) {
                row[col] = '.';
            }
        }
        for row in center_row.saturating_sub(half_rows)..(center_row + half_rows).min(ROWS) {
            for col in 0..COLS {
                grid[row][col] = '.';
            }
        }

        // Lights at their anchors
        for light in self.lights.lights() {
            let (row, col) = to_grid(&light.anchor);
            grid[row][col] = match light.state {
                LightState::Red => 'R',
                LightState::Yellow => 'Y',
                LightState::Green => 'G',
            };
        }

        // Vehicles
        for vehicle in &self.vehicles {
            let (row, col) = to_grid(&vehicle.position);
            grid[row][col] = if vehicle.wrecked {
                'X'
            } else if vehicle.is_emergency {
                'E'
            } else {
                'c'
            };
        }

        println!("=== Intersection Map ===");
        println!("Legend: c=Car, E=Emergency, X=Wreck, R/Y/G=Light, .=Road");
        for row in &grid {
            let line: String = row.iter().collect();
            println!("{}", line);
        }
        println!();
    }
}

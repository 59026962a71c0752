//! Core types for the intersection simulation
//!
//! Standalone types shared by the vehicle store, light controller and
//! safety monitor.

use std::fmt;

/// A unique identifier for a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub u64);

/// A unique identifier for a recorded accident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccidentId(pub u64);

/// Compass direction a vehicle approaches the intersection from.
///
/// `North` is northbound traffic entering from the bottom edge of the
/// canvas, matching the approach naming used by the light controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn from_index(index: usize) -> Direction {
        Direction::ALL[index % 4]
    }

    /// The direction after this one in the round-robin cycle
    pub fn next(self) -> Direction {
        Direction::from_index(self.index() + 1)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "North",
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
        };
        write!(f, "{}", name)
    }
}

/// Movement intent of a vehicle through the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Straight,
    Left,
    Right,
}

impl Movement {
    pub const ALL: [Movement; 3] = [Movement::Straight, Movement::Left, Movement::Right];
}

/// State of one traffic light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

/// Scheduling label supplied by the external advisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingLabel {
    #[default]
    RoundRobin,
    PriorityScheduling,
    ShortestJobFirst,
}

impl SchedulingLabel {
    /// Wire representation used by the advisor collaborator
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulingLabel::RoundRobin => "Round Robin",
            SchedulingLabel::PriorityScheduling => "Priority Scheduling",
            SchedulingLabel::ShortestJobFirst => "Shortest Job First",
        }
    }

    pub fn parse(label: &str) -> Option<SchedulingLabel> {
        match label {
            "Round Robin" => Some(SchedulingLabel::RoundRobin),
            "Priority Scheduling" => Some(SchedulingLabel::PriorityScheduling),
            "Shortest Job First" => Some(SchedulingLabel::ShortestJobFirst),
            _ => None,
        }
    }
}

impl fmt::Display for SchedulingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A 2D position in canvas coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Position) -> Position {
        Position {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Fixed geometry of the four-way intersection.
///
/// All coordinates live in the 800x600 canvas space of the rendering
/// collaborator; the simulation itself only cares about the relative
/// distances derived from them.
#[derive(Debug, Clone)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub center: Position,
    pub road_width: f32,
    lane_offset: f32,
    edge_margin: f32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            center: Position::new(400.0, 300.0),
            road_width: 120.0,
            lane_offset: 15.0,
            edge_margin: 30.0,
        }
    }
}

impl Layout {
    /// Where a vehicle approaching from `direction` enters the canvas,
    /// pushed `offset` pixels further out to leave room for queued traffic.
    pub fn spawn_point(&self, direction: Direction, offset: f32) -> Position {
        match direction {
            Direction::North => {
                Position::new(self.center.x - self.lane_offset, self.height + offset)
            }
            Direction::East => {
                Position::new(-self.edge_margin - offset, self.center.y - self.lane_offset)
            }
            Direction::South => {
                Position::new(self.center.x + self.lane_offset, -self.edge_margin - offset)
            }
            Direction::West => Position::new(
                self.width + self.edge_margin + offset,
                self.center.y + self.lane_offset,
            ),
        }
    }

    /// Exit point for a vehicle from `direction` making `movement`
    pub fn target_point(&self, direction: Direction, movement: Movement) -> Position {
        let north_exit = Position::new(self.center.x - self.lane_offset, -self.edge_margin);
        let east_exit = Position::new(
            self.width + self.edge_margin,
            self.center.y - self.lane_offset,
        );
        let south_exit = Position::new(
            self.center.x + self.lane_offset,
            self.height + self.edge_margin,
        );
        let west_exit = Position::new(-self.edge_margin, self.center.y + self.lane_offset);

        match (direction, movement) {
            (Direction::North, Movement::Straight) => north_exit,
            (Direction::North, Movement::Right) => east_exit,
            (Direction::North, Movement::Left) => west_exit,
            (Direction::East, Movement::Straight) => east_exit,
            (Direction::East, Movement::Right) => south_exit,
            (Direction::East, Movement::Left) => north_exit,
            (Direction::South, Movement::Straight) => south_exit,
            (Direction::South, Movement::Right) => west_exit,
            (Direction::South, Movement::Left) => east_exit,
            (Direction::West, Movement::Straight) => west_exit,
            (Direction::West, Movement::Right) => north_exit,
            (Direction::West, Movement::Left) => south_exit,
        }
    }

    /// Initial heading angle for an approach, in radians
    pub fn heading(&self, direction: Direction) -> f32 {
        match direction {
            Direction::North => -std::f32::consts::FRAC_PI_2,
            Direction::East => 0.0,
            Direction::South => std::f32::consts::FRAC_PI_2,
            Direction::West => std::f32::consts::PI,
        }
    }

    /// Screen anchor of the traffic light for an approach
    pub fn light_anchor(&self, direction: Direction) -> Position {
        match direction {
            Direction::North => Position::new(self.center.x - 15.0, self.center.y - 80.0),
            Direction::East => Position::new(self.center.x + 80.0, self.center.y - 15.0),
            Direction::South => Position::new(self.center.x + 15.0, self.center.y + 80.0),
            Direction::West => Position::new(self.center.x - 80.0, self.center.y + 15.0),
        }
    }

    /// Whether a vehicle at `position` is inside the approach window for
    /// its direction: the fixed band before the stop line in which a
    /// non-green light causes stopping.
    pub fn in_approach_window(&self, direction: Direction, position: &Position) -> bool {
        let near = self.road_width / 2.0 - STOP_LINE_INSET;
        match direction {
            Direction::North => {
                let stop_line = self.center.y + near;
                position.y > stop_line && position.y < stop_line + APPROACH_WINDOW_DEPTH
            }
            Direction::East => {
                let stop_line = self.center.x - near;
                position.x < stop_line && position.x > stop_line - APPROACH_WINDOW_DEPTH
            }
            Direction::South => {
                let stop_line = self.center.y - near;
                position.y < stop_line && position.y > stop_line - APPROACH_WINDOW_DEPTH
            }
            Direction::West => {
                let stop_line = self.center.x + near;
                position.x > stop_line && position.x < stop_line + APPROACH_WINDOW_DEPTH
            }
        }
    }

    /// Whether a position lies inside the intersection's bounding box
    pub fn in_intersection(&self, position: &Position) -> bool {
        let half = self.road_width / 2.0;
        position.x >= self.center.x - half
            && position.x <= self.center.x + half
            && position.y >= self.center.y - half
            && position.y <= self.center.y + half
    }

    /// Distance from a position to the intersection center
    pub fn center_distance(&self, position: &Position) -> f32 {
        position.distance(&self.center)
    }

    /// How far beyond the canvas edge a queued vehicle on this approach
    /// sits, or zero if it is already on screen. Used by spawn admission
    /// to place new vehicles behind the existing queue.
    pub fn offscreen_depth(&self, direction: Direction, position: &Position) -> f32 {
        match direction {
            Direction::North if position.y > self.height => position.y - self.height,
            Direction::East if position.x < 0.0 => -position.x,
            Direction::South if position.y < 0.0 => -position.y,
            Direction::West if position.x > self.width => position.x - self.width,
            _ => 0.0,
        }
    }
}

/// Speed limit in pixels per tick
pub const SPEED_LIMIT: f32 = 3.0;

/// Emergency vehicles may exceed the speed limit by this factor
pub const EMERGENCY_SPEED_FACTOR: f32 = 1.3;

/// Distance below which a vehicle pair triggers emergency braking
pub const SAFETY_DISTANCE: f32 = 25.0;

/// Distance below which a vehicle pair counts as a collision
pub const COLLISION_DISTANCE: f32 = 15.0;

/// Radius around the center within which an emergency vehicle preempts
pub const PREEMPTION_RADIUS: f32 = 100.0;

/// Remaining distance at which a vehicle counts as arrived
pub const ARRIVAL_EPSILON: f32 = 5.0;

/// Maximum concurrent vehicles admitted per approach
pub const MAX_QUEUE_PER_DIRECTION: usize = 10;

/// Gap left behind the last queued vehicle when spawning
pub const SPAWN_GAP: f32 = 35.0;

/// Distance from the stop line to the edge of the intersection box
const STOP_LINE_INSET: f32 = 20.0;

/// Depth of the approach window behind the stop line
const APPROACH_WINDOW_DEPTH: f32 = 80.0;

/// Fixed yellow phase duration
pub const YELLOW_TIME_MS: f32 = 2000.0;

/// Minimum and maximum green phase durations
pub const MIN_GREEN_MS: f32 = 4000.0;
pub const MAX_GREEN_MS: f32 = 10000.0;

/// Green time bonus per queued vehicle
pub const GREEN_BONUS_PER_CAR_MS: f32 = 1000.0;

/// Green time bonus per unit of scheduling weight
pub const GREEN_BONUS_PER_WEIGHT_MS: f32 = 1000.0;

/// Extra green time while an emergency vehicle is on the green approach
pub const EMERGENCY_GREEN_BONUS_MS: f32 = 3000.0;

/// Delay before wrecked vehicles are cleared and lights restored
pub const ACCIDENT_CLEAR_DELAY_MS: f32 = 400.0;

/// Sharp braking factor applied on near-collisions
pub const BRAKE_FACTOR: f32 = 0.3;

/// Fraction of the leader's speed a tailgating vehicle is capped to
pub const FOLLOW_FACTOR: f32 = 0.8;

/// Extra margin on top of the safety distance for car-following
pub const FOLLOW_MARGIN: f32 = 10.0;

/// Speed floor once a vehicle is moving; vehicles never reverse
pub const MIN_SPEED: f32 = 0.1;

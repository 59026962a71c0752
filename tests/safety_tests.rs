//! Safety monitor validation through the public world API: violation
//! records, collision handling with light lockdown, and car-following.

use intersection_sim::simulation::{
    Direction, Movement, Position, SimWorld, ViolationKind, COLLISION_DISTANCE, SPEED_LIMIT,
};

const FRAME_MS: f32 = 16.7;

fn quiet_world() -> SimWorld {
    let mut world = SimWorld::new_with_seed(11);
    world.set_auto_spawn(false);
    world.start();
    world
}

#[test]
fn speeding_vehicle_is_recorded_exactly_once() {
    let mut world = quiet_world();
    let id = world
        .spawn_vehicle(Direction::North, Some(Movement::Straight))
        .unwrap();
    world.vehicle_mut(id).unwrap().speed = SPEED_LIMIT + 0.5;

    for _ in 0..5 {
        world.advance(FRAME_MS);
    }

    assert_eq!(world.violations().len(), 1);
    let record = &world.violations()[0];
    assert_eq!(record.vehicle, id);
    assert!(matches!(record.kind, ViolationKind::Speeding { .. }));
    assert_eq!(world.stats().rule_violations, 1);
}

#[test]
fn red_light_running_is_flagged_inside_the_box() {
    let mut world = quiet_world();

    // North holds green, so an East vehicle in the box runs the red.
    let runner = world
        .spawn_vehicle(Direction::East, Some(Movement::Straight))
        .unwrap();
    world.vehicle_mut(runner).unwrap().position = Position::new(400.0, 285.0);
    world.advance(FRAME_MS);

    let red_light_runs: Vec<_> = world
        .violations()
        .iter()
        .filter(|v| v.kind == ViolationKind::RedLight)
        .collect();
    assert_eq!(red_light_runs.len(), 1);
    assert_eq!(red_light_runs[0].vehicle, runner);
}

#[test]
fn emergency_vehicles_may_cross_on_red() {
    let mut world = quiet_world();

    let emergency = world
        .spawn_emergency_vehicle(Some(Direction::East))
        .unwrap();
    world.vehicle_mut(emergency).unwrap().position = Position::new(395.0, 285.0);
    world.advance(FRAME_MS);

    assert!(world.violations().is_empty());
}

#[test]
fn collision_locks_down_lights_until_clearance() {
    let mut world = quiet_world();
    let first = world
        .spawn_vehicle(Direction::North, Some(Movement::Straight))
        .unwrap();
    let second = world
        .spawn_vehicle(Direction::East, Some(Movement::Straight))
        .unwrap();
    world.vehicle_mut(first).unwrap().position = Position::new(400.0, 295.0);
    world.vehicle_mut(second).unwrap().position = Position::new(405.0, 300.0);

    world.advance(FRAME_MS);

    assert_eq!(world.accidents().len(), 1);
    let record = &world.accidents()[0];
    assert_eq!(record.vehicles, [first, second]);
    assert!(world.has_pending_accident());
    assert_eq!(world.green_count(), 0, "lights not forced red after wreck");

    // Wrecked vehicles hold position instead of being removed outright.
    assert_eq!(world.vehicles().len(), 2);
    assert!(world.vehicles().iter().all(|v| v.wrecked));
    assert!(world.vehicles().iter().all(|v| v.speed == 0.0));

    // Ride out the clearance delay.
    for _ in 0..30 {
        world.advance(FRAME_MS);
    }

    assert!(!world.has_pending_accident());
    assert!(world.vehicles().is_empty());
    assert_eq!(world.green_count(), 1);
    assert_eq!(world.current_green(), Direction::North);

    // One accident record per episode, and it drags efficiency down.
    assert_eq!(world.accidents().len(), 1);
    assert_eq!(world.stats().accidents, 1);
    assert!(world.stats().efficiency < 100.0);
}

#[test]
fn car_following_prevents_rear_end_collisions() {
    let mut world = quiet_world();
    let leader = world
        .spawn_vehicle(Direction::North, Some(Movement::Straight))
        .unwrap();
    let trailer = world
        .spawn_vehicle(Direction::North, Some(Movement::Straight))
        .unwrap();
    // Fast trailer right behind a slow leader
    world.vehicle_mut(leader).unwrap().speed = 1.5;
    world.vehicle_mut(trailer).unwrap().speed = 2.9;

    for _ in 0..200 {
        world.advance(FRAME_MS);
        assert!(world.accidents().is_empty());

        let positions: Vec<Position> = world.vehicles().iter().map(|v| v.position).collect();
        if positions.len() == 2 {
            assert!(
                positions[0].distance(&positions[1]) >= COLLISION_DISTANCE,
                "vehicles closed to collision range at t={}ms",
                world.time_ms()
            );
        }
    }
}

//! Scheduling policy for picking the next green direction
//!
//! Pure functions over the four per-direction queue counts and the
//! externally supplied scheduling label. The light controller feeds the
//! resulting weights back into green-duration calculation and uses
//! `select_next` when a yellow phase expires.

use ordered_float::OrderedFloat;

use super::types::{Direction, SchedulingLabel};

/// Score bonus for a direction with an emergency vehicle waiting
const EMERGENCY_SCORE_BONUS: f32 = 100.0;

/// Per-direction weights for the given label.
///
/// Round Robin treats all approaches equally; Priority favors congested
/// approaches; Shortest Job First favors the least congested so short
/// queues clear fast.
pub fn weights(label: SchedulingLabel, car_counts: &[usize; 4]) -> [f32; 4] {
    match label {
        SchedulingLabel::RoundRobin => [1.0; 4],
        SchedulingLabel::PriorityScheduling => {
            car_counts.map(|count| 1.0 + count as f32 * 0.2)
        }
        SchedulingLabel::ShortestJobFirst => {
            let max = *car_counts.iter().max().unwrap_or(&0) as f32;
            car_counts.map(|count| max - count as f32 + 0.5)
        }
    }
}

/// Pick the next green direction among the three non-current approaches.
///
/// Score = queue length x weight, plus a large bonus when an emergency
/// vehicle waits there, plus the average wait in seconds as a tie
/// breaker. A strict improvement is required, so an empty intersection
/// falls back to the (current + 1) mod 4 cycle.
pub fn select_next(
    current: Direction,
    car_counts: &[usize; 4],
    weights: &[f32; 4],
    emergency_waiting: &[bool; 4],
    avg_wait_ms: &[f32; 4],
) -> Direction {
    let mut best = current.next();
    let mut best_score = OrderedFloat(0.0f32);

    for direction in Direction::ALL {
        if direction == current {
            continue;
        }
        let i = direction.index();
        let mut score = car_counts[i] as f32 * weights[i];
        if emergency_waiting[i] {
            score += EMERGENCY_SCORE_BONUS;
        }
        score += avg_wait_ms[i] / 1000.0;

        if OrderedFloat(score) > best_score {
            best_score = OrderedFloat(score);
            best = direction;
        }
    }

    best
}

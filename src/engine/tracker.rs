use super::evaluator::Outcome;

/// Accumulation state of one duration alert. Owned by the stock's worker
/// task; there is exactly one writer per alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Accumulating { since: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub state: TrackerState,
    pub fire: bool,
}

/// Advances the state machine by one sample.
///
/// `now` is the sample timestamp (unix seconds), not wall-clock time, so
/// replayed history evaluates the same way live data does. A single
/// contrary sample resets the streak entirely; after a fire the cycle
/// restarts from `Idle`.
pub fn step(state: TrackerState, outcome: Outcome, now: i64, duration_minutes: i64) -> Step {
    match (state, outcome) {
        (TrackerState::Idle, Outcome::Satisfied) => Step {
            state: TrackerState::Accumulating { since: now },
            fire: false,
        },
        (TrackerState::Idle, Outcome::NotSatisfied) => Step {
            state: TrackerState::Idle,
            fire: false,
        },
        (TrackerState::Accumulating { .. }, Outcome::NotSatisfied) => Step {
            state: TrackerState::Idle,
            fire: false,
        },
        (TrackerState::Accumulating { since }, Outcome::Satisfied) => {
            if now - since >= duration_minutes * 60 {
                Step {
                    state: TrackerState::Idle,
                    fire: true,
                }
            } else {
                Step {
                    state: TrackerState::Accumulating { since },
                    fire: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::evaluator::Outcome::{NotSatisfied, Satisfied};

    const MIN: i64 = 60;

    fn drive(samples: &[(i64, Outcome)], duration_minutes: i64) -> (TrackerState, Vec<i64>) {
        let mut state = TrackerState::Idle;
        let mut fired = Vec::new();

        for &(ts, outcome) in samples {
            let step = step(state, outcome, ts, duration_minutes);
            state = step.state;
            if step.fire {
                fired.push(ts);
            }
        }

        (state, fired)
    }

    #[test]
    fn first_satisfied_sample_only_starts_the_streak() {
        let step = step(TrackerState::Idle, Satisfied, 1_000, 30);
        assert_eq!(step.state, TrackerState::Accumulating { since: 1_000 });
        assert!(!step.fire);
    }

    #[test]
    fn unbroken_streak_fires_once_the_duration_has_elapsed() {
        // condition holds at t=0, 10, 20, 30 minutes; 30-minute alert
        let samples = [
            (0, Satisfied),
            (10 * MIN, Satisfied),
            (20 * MIN, Satisfied),
            (30 * MIN, Satisfied),
        ];

        let (_, fired) = drive(&samples, 30);
        assert_eq!(fired, vec![30 * MIN]);
    }

    #[test]
    fn contrary_sample_resets_the_streak_with_no_partial_credit() {
        // break at t=15 invalidates the run; t=30 must not fire
        let samples = [
            (0, Satisfied),
            (10 * MIN, Satisfied),
            (15 * MIN, NotSatisfied),
            (20 * MIN, Satisfied),
            (30 * MIN, Satisfied),
        ];

        let (state, fired) = drive(&samples, 30);
        assert!(fired.is_empty());
        // the new streak runs from t=20, not t=0
        assert_eq!(state, TrackerState::Accumulating { since: 20 * MIN });
    }

    #[test]
    fn fresh_streak_after_a_break_needs_the_full_duration_again() {
        let samples = [
            (0, Satisfied),
            (15 * MIN, NotSatisfied),
            (20 * MIN, Satisfied),
            (49 * MIN, Satisfied),
            (50 * MIN, Satisfied),
        ];

        let (_, fired) = drive(&samples, 30);
        assert_eq!(fired, vec![50 * MIN]);
    }

    #[test]
    fn firing_resets_to_idle_for_a_later_cycle() {
        let step = step(
            TrackerState::Accumulating { since: 0 },
            Satisfied,
            30 * MIN,
            30,
        );
        assert!(step.fire);
        assert_eq!(step.state, TrackerState::Idle);
    }

    #[test]
    fn not_satisfied_while_idle_stays_idle() {
        let step = step(TrackerState::Idle, NotSatisfied, 5 * MIN, 30);
        assert_eq!(step.state, TrackerState::Idle);
        assert!(!step.fire);
    }

    #[test]
    fn elapsed_time_is_measured_from_the_first_satisfying_sample() {
        // 29m59s is not enough, 30m00s exactly is
        let early = step(TrackerState::Accumulating { since: 0 }, Satisfied, 30 * MIN - 1, 30);
        assert!(!early.fire);

        let exact = step(TrackerState::Accumulating { since: 0 }, Satisfied, 30 * MIN, 30);
        assert!(exact.fire);
    }
}

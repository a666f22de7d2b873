//! DuplicateDetector - resend risk of an incoming transaction.
//!
//! # Scoring
//! Every stored task with the same event, partner and local id is a
//! candidate. Per candidate, first matching rule wins:
//! 1. event method is POST: the whole score is [`POST_RESEND`]
//! 2. state `Processed` or `Published`: 0
//! 3. state `Error`: 1
//! 4. updated within the last [`RECENT_WINDOW_SECS`] seconds: 2
//! 5. otherwise 0
//!
//! A score above [`CONFLICT_THRESHOLD`] rejects the transaction.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::domain::{State, StoreError, Task};
use crate::ports::{Clock, DuplicateCandidate, DuplicateKey, TaskStore};

pub const POST_RESEND: u32 = 100;
pub const CONFLICT_THRESHOLD: u32 = 5;
pub const RECENT_WINDOW_SECS: i64 = 120;

const ERROR_RESEND: u32 = 1;
const RECENT_ACTIVITY: u32 = 2;

/// Pure scoring over already loaded candidates.
pub fn score(candidates: &[DuplicateCandidate], now: DateTime<Utc>) -> u32 {
    let mut total = 0;
    for candidate in candidates {
        if candidate.method.eq_ignore_ascii_case("POST") {
            return POST_RESEND;
        }
        total += match candidate.state {
            state if state.is_finished() => 0,
            State::Error => ERROR_RESEND,
            _ if now - candidate.updated_on < Duration::seconds(RECENT_WINDOW_SECS) => {
                RECENT_ACTIVITY
            }
            _ => 0,
        };
    }
    total
}

pub fn is_conflict(score: u32) -> bool {
    score > CONFLICT_THRESHOLD
}

pub struct DuplicateDetector {
    tasks: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl DuplicateDetector {
    pub fn new(tasks: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self { tasks, clock }
    }

    /// Load the candidates of `task` and score them.
    pub async fn score(&self, task: &Task) -> Result<u32, StoreError> {
        let candidates = self.tasks.duplicate_candidates(&DuplicateKey::of(task)).await?;
        let score = score(&candidates, self.clock.now());
        if score > 0 {
            tracing::warn!(
                local_id = %task.local_id,
                partner_id = %task.partner_id,
                event_id = %task.event_id,
                candidates = candidates.len(),
                score,
                "possible resend"
            );
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn candidate(method: &str, state: State, age: Duration) -> DuplicateCandidate {
        DuplicateCandidate {
            task_id: TaskId::new(1),
            state,
            updated_on: now() - age,
            method: method.to_string(),
        }
    }

    #[test]
    fn no_candidates_scores_zero() {
        assert_eq!(score(&[], now()), 0);
    }

    #[rstest]
    #[case::post_processed("POST", State::Processed, Duration::hours(5), 100)]
    #[case::post_old_new("post", State::New, Duration::days(3), 100)]
    #[case::put_processed("PUT", State::Processed, Duration::seconds(1), 0)]
    #[case::put_published("PUT", State::Published, Duration::seconds(1), 0)]
    #[case::put_error_recent("PUT", State::Error, Duration::seconds(1), 1)]
    #[case::put_error_old("PUT", State::Error, Duration::hours(1), 1)]
    #[case::put_new_recent("PUT", State::New, Duration::seconds(30), 2)]
    #[case::put_in_progress_recent("PUT", State::InProgress, Duration::seconds(119), 2)]
    #[case::put_new_at_window("PUT", State::New, Duration::minutes(2), 0)]
    #[case::put_new_old("PUT", State::New, Duration::minutes(10), 0)]
    fn single_candidate(
        #[case] method: &str,
        #[case] state: State,
        #[case] age: Duration,
        #[case] expected: u32,
    ) {
        assert_eq!(score(&[candidate(method, state, age)], now()), expected);
    }

    #[test]
    fn post_overrides_everything_else() {
        let rows = [
            candidate("PUT", State::Processed, Duration::seconds(1)),
            candidate("POST", State::Processed, Duration::hours(1)),
        ];
        assert_eq!(score(&rows, now()), POST_RESEND);
    }

    #[test]
    fn contributions_add_up() {
        let recent = candidate("PUT", State::New, Duration::seconds(10));
        let failed = candidate("PUT", State::Error, Duration::hours(1));
        let done = candidate("PUT", State::Processed, Duration::seconds(10));

        let three_recent = [recent.clone(), recent.clone(), recent.clone()];
        assert_eq!(score(&three_recent, now()), 6);
        assert!(is_conflict(score(&three_recent, now())));

        let mixed = [recent.clone(), recent, failed, done];
        assert_eq!(score(&mixed, now()), 5);
        assert!(!is_conflict(score(&mixed, now())));
    }
}

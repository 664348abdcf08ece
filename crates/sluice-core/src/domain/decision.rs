//! Termination decision: whether a running task has outlived its budget.
//!
//! The decider is a pure function of the snapshot, the current time and the
//! reaper settings. Acting on the decision (stop call, dry-run log) is the
//! reaper's job.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::task::RunningTaskSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminationDecision {
    pub task_arn: String,
    pub elapsed_minutes: f64,
    pub threshold_minutes: u64,
    pub will_terminate: bool,
    pub dry_run: bool,
}

impl TerminationDecision {
    /// Reason passed to the orchestrator's stop call.
    pub fn reason(&self) -> String {
        format!(
            "Automatically terminated after running for {:.2} minutes (threshold: {} minutes)",
            self.elapsed_minutes, self.threshold_minutes
        )
    }
}

/// Decides the fate of a running task.
pub trait TerminationDecider: Send + Sync {
    /// `None` when the task cannot be evaluated (no start time).
    fn decide(
        &self,
        task: &RunningTaskSnapshot,
        now: DateTime<Utc>,
    ) -> Option<TerminationDecision>;
}

/// Wall-clock budget: terminate once `elapsed > threshold`.
#[derive(Debug, Clone)]
pub struct TimeoutDecider {
    threshold_minutes: u64,
    dry_run: bool,
}

impl TimeoutDecider {
    pub fn new(threshold_minutes: u64, dry_run: bool) -> Self {
        Self {
            threshold_minutes,
            dry_run,
        }
    }
}

impl TerminationDecider for TimeoutDecider {
    fn decide(
        &self,
        task: &RunningTaskSnapshot,
        now: DateTime<Utc>,
    ) -> Option<TerminationDecision> {
        let created_at = task.created_at?;
        let elapsed_minutes = elapsed_minutes(created_at, now);
        Some(TerminationDecision {
            task_arn: task.task_arn.clone(),
            elapsed_minutes,
            threshold_minutes: self.threshold_minutes,
            will_terminate: elapsed_minutes > self.threshold_minutes as f64,
            dry_run: self.dry_run,
        })
    }
}

/// Fractional minutes between `created_at` and `now`. Negative when the
/// orchestrator clock runs ahead of ours.
pub fn elapsed_minutes(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed = now.signed_duration_since(created_at);
    elapsed.num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn task_started(minutes_ago: i64) -> RunningTaskSnapshot {
        RunningTaskSnapshot {
            task_arn: "arn:aws:ecs:region:acct:task/cluster/abc".into(),
            created_at: Some(now() - Duration::minutes(minutes_ago)),
            containers: vec![],
        }
    }

    #[rstest]
    #[case::well_within(10, false)]
    #[case::exactly_at_threshold(20, false)]
    #[case::just_over(21, true)]
    #[case::far_over(25, true)]
    fn terminates_only_past_threshold(#[case] minutes_ago: i64, #[case] expected: bool) {
        let decider = TimeoutDecider::new(20, false);
        let decision = decider.decide(&task_started(minutes_ago), now()).unwrap();
        assert_eq!(decision.will_terminate, expected);
        assert_eq!(decision.threshold_minutes, 20);
    }

    #[test]
    fn missing_start_time_is_not_evaluated() {
        let decider = TimeoutDecider::new(20, false);
        let mut task = task_started(60);
        task.created_at = None;
        assert!(decider.decide(&task, now()).is_none());
    }

    #[test]
    fn elapsed_is_fractional() {
        let created = now() - Duration::seconds(90);
        assert_eq!(elapsed_minutes(created, now()), 1.5);
    }

    #[test]
    fn reason_mentions_elapsed_and_threshold() {
        let decision = TimeoutDecider::new(20, true)
            .decide(&task_started(25), now())
            .unwrap();
        assert!(decision.dry_run);
        assert_eq!(
            decision.reason(),
            "Automatically terminated after running for 25.00 minutes (threshold: 20 minutes)"
        );
    }
}

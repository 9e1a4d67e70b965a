//! Workflow events emitted by the review service
//!
//! The service reports what it did (and what it quietly skipped) through a
//! single injected [`EventSink`]. [`WorkflowMetrics`] is the sink used in
//! production: it logs each event and keeps counters that the HTTP layer
//! exposes in Prometheus text format.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// Something the review workflow did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    PullRequestCreated {
        pr_id: i64,
        author_id: i64,
        reviewer_count: usize,
    },
    /// Candidate lookup failed while auto-assigning; the PR was still created
    AutoAssignmentFailed {
        author_id: i64,
        team_id: i64,
        reason: String,
    },
    CreatedWithoutReviewers {
        pr_id: i64,
        author_id: i64,
    },
    ReviewerAdded {
        pr_id: i64,
        reviewer_id: i64,
    },
    ReviewerReassigned {
        pr_id: i64,
        old_reviewer_id: i64,
        new_reviewer_id: i64,
    },
    /// Bulk deactivation could not replace a reviewer on one PR
    ReassignmentSkipped {
        pr_id: i64,
        reviewer_id: i64,
        reason: String,
    },
    PullRequestMerged {
        pr_id: i64,
    },
    PullRequestClosed {
        pr_id: i64,
    },
    UsersDeactivated {
        team_id: i64,
        deactivated: u64,
        reassigned: u64,
    },
}

/// Receives workflow events
pub trait EventSink: Send + Sync {
    fn record(&self, event: WorkflowEvent);
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: WorkflowEvent) {
        log_event(&event);
    }
}

fn log_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::PullRequestCreated {
            pr_id,
            author_id,
            reviewer_count,
        } => tracing::info!(pr_id, author_id, reviewer_count, "Pull request created"),
        WorkflowEvent::AutoAssignmentFailed {
            author_id,
            team_id,
            reason,
        } => tracing::warn!(author_id, team_id, %reason, "Reviewer auto-assignment failed"),
        WorkflowEvent::CreatedWithoutReviewers { pr_id, author_id } => {
            tracing::warn!(pr_id, author_id, "Pull request created without reviewers")
        }
        WorkflowEvent::ReviewerAdded { pr_id, reviewer_id } => {
            tracing::info!(pr_id, reviewer_id, "Reviewer added")
        }
        WorkflowEvent::ReviewerReassigned {
            pr_id,
            old_reviewer_id,
            new_reviewer_id,
        } => tracing::info!(pr_id, old_reviewer_id, new_reviewer_id, "Reviewer reassigned"),
        WorkflowEvent::ReassignmentSkipped {
            pr_id,
            reviewer_id,
            reason,
        } => tracing::warn!(pr_id, reviewer_id, %reason, "Reviewer reassignment skipped"),
        WorkflowEvent::PullRequestMerged { pr_id } => tracing::info!(pr_id, "Pull request merged"),
        WorkflowEvent::PullRequestClosed { pr_id } => tracing::info!(pr_id, "Pull request closed"),
        WorkflowEvent::UsersDeactivated {
            team_id,
            deactivated,
            reassigned,
        } => tracing::info!(team_id, deactivated, reassigned, "Users deactivated"),
    }
}

/// Counting sink; also logs every event
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    prs_created: AtomicU64,
    prs_without_reviewers: AtomicU64,
    auto_assignment_failures: AtomicU64,
    reviewers_added: AtomicU64,
    reviewers_reassigned: AtomicU64,
    reassignments_skipped: AtomicU64,
    prs_merged: AtomicU64,
    prs_closed: AtomicU64,
    users_deactivated: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub prs_created: u64,
    pub prs_without_reviewers: u64,
    pub auto_assignment_failures: u64,
    pub reviewers_added: u64,
    pub reviewers_reassigned: u64,
    pub reassignments_skipped: u64,
    pub prs_merged: u64,
    pub prs_closed: u64,
    pub users_deactivated: u64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            prs_created: self.prs_created.load(Ordering::Relaxed),
            prs_without_reviewers: self.prs_without_reviewers.load(Ordering::Relaxed),
            auto_assignment_failures: self.auto_assignment_failures.load(Ordering::Relaxed),
            reviewers_added: self.reviewers_added.load(Ordering::Relaxed),
            reviewers_reassigned: self.reviewers_reassigned.load(Ordering::Relaxed),
            reassignments_skipped: self.reassignments_skipped.load(Ordering::Relaxed),
            prs_merged: self.prs_merged.load(Ordering::Relaxed),
            prs_closed: self.prs_closed.load(Ordering::Relaxed),
            users_deactivated: self.users_deactivated.load(Ordering::Relaxed),
        }
    }

    /// Render counters in the Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let s = self.snapshot();
        let rows = [
            ("pr_reviewer_pull_requests_created_total", "Pull requests created", s.prs_created),
            (
                "pr_reviewer_pull_requests_without_reviewers_total",
                "Pull requests created with an empty reviewer set",
                s.prs_without_reviewers,
            ),
            (
                "pr_reviewer_auto_assignment_failures_total",
                "Candidate lookups that failed during auto-assignment",
                s.auto_assignment_failures,
            ),
            ("pr_reviewer_reviewers_added_total", "Reviewers added explicitly", s.reviewers_added),
            (
                "pr_reviewer_reviewers_reassigned_total",
                "Reviewers replaced by a teammate",
                s.reviewers_reassigned,
            ),
            (
                "pr_reviewer_reassignments_skipped_total",
                "Replacements skipped during bulk deactivation",
                s.reassignments_skipped,
            ),
            ("pr_reviewer_pull_requests_merged_total", "Pull requests merged", s.prs_merged),
            ("pr_reviewer_pull_requests_closed_total", "Pull requests closed", s.prs_closed),
            ("pr_reviewer_users_deactivated_total", "Users deactivated in bulk", s.users_deactivated),
        ];

        let mut out = String::new();
        for (name, help, value) in rows {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, value);
        }
        out
    }
}

impl EventSink for WorkflowMetrics {
    fn record(&self, event: WorkflowEvent) {
        log_event(&event);

        let counter = match &event {
            WorkflowEvent::PullRequestCreated { .. } => &self.prs_created,
            WorkflowEvent::AutoAssignmentFailed { .. } => &self.auto_assignment_failures,
            WorkflowEvent::CreatedWithoutReviewers { .. } => &self.prs_without_reviewers,
            WorkflowEvent::ReviewerAdded { .. } => &self.reviewers_added,
            WorkflowEvent::ReviewerReassigned { .. } => &self.reviewers_reassigned,
            WorkflowEvent::ReassignmentSkipped { .. } => &self.reassignments_skipped,
            WorkflowEvent::PullRequestMerged { .. } => &self.prs_merged,
            WorkflowEvent::PullRequestClosed { .. } => &self.prs_closed,
            WorkflowEvent::UsersDeactivated { deactivated, .. } => {
                self.users_deactivated.fetch_add(*deactivated, Ordering::Relaxed);
                return;
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_track_events() {
        let metrics = WorkflowMetrics::new();
        metrics.record(WorkflowEvent::PullRequestCreated {
            pr_id: 1,
            author_id: 2,
            reviewer_count: 0,
        });
        metrics.record(WorkflowEvent::CreatedWithoutReviewers { pr_id: 1, author_id: 2 });
        metrics.record(WorkflowEvent::UsersDeactivated {
            team_id: 1,
            deactivated: 3,
            reassigned: 2,
        });

        let snap = metrics.snapshot();
        assert_eq!(snap.prs_created, 1);
        assert_eq!(snap.prs_without_reviewers, 1);
        assert_eq!(snap.users_deactivated, 3);
        assert_eq!(snap.prs_merged, 0);
    }

    #[test]
    fn test_prometheus_rendering() {
        let metrics = WorkflowMetrics::new();
        metrics.record(WorkflowEvent::PullRequestMerged { pr_id: 5 });

        let text = metrics.render_prometheus();
        assert!(text.contains("# TYPE pr_reviewer_pull_requests_merged_total counter"));
        assert!(text.contains("pr_reviewer_pull_requests_merged_total 1\n"));
        assert!(text.contains("pr_reviewer_pull_requests_created_total 0\n"));
    }
}

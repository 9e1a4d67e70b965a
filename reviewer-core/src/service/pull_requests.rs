//! Pull request lifecycle and reviewer management

use std::collections::HashSet;

use chrono::Utc;

use super::{validate_id, validate_text, ReviewService, MAX_TITLE_LEN};
use crate::events::WorkflowEvent;
use crate::models::{CreatePullRequestRequest, PrStatus, PullRequest, ReassignReviewerRequest};
use crate::store::{NewPullRequest, PullRequestFilter, ReplaceOutcome};
use crate::{Error, Result};

/// Selections tried when a chosen replacement is taken concurrently
const REPLACEMENT_ATTEMPTS: u32 = 2;

impl ReviewService {
    /// Open a pull request and auto-assign reviewers from the author's team
    ///
    /// A failed candidate lookup does not fail creation; the PR is stored
    /// without reviewers and the failure is reported as an event.
    pub async fn create_pull_request(&self, req: CreatePullRequestRequest) -> Result<PullRequest> {
        validate_text("title", &req.title, MAX_TITLE_LEN)?;
        validate_id("authorId", req.author_id)?;

        let author = self
            .store
            .get_user(req.author_id)
            .await?
            .ok_or(Error::UserNotFound(req.author_id))?;

        let mut reviewer_ids = Vec::new();
        if let Some(team_id) = author.team_id {
            match self.store.active_team_members(team_id, author.id).await {
                Ok(candidates) => {
                    reviewer_ids = self
                        .policy
                        .select_reviewers(candidates)
                        .into_iter()
                        .map(|u| u.id)
                        .collect();
                }
                Err(e) => self.emit(WorkflowEvent::AutoAssignmentFailed {
                    author_id: author.id,
                    team_id,
                    reason: e.to_string(),
                }),
            }
        }

        let pr = self
            .store
            .create_pull_request(NewPullRequest {
                title: req.title,
                author_id: author.id,
                reviewer_ids,
            })
            .await?;

        if pr.reviewers.is_empty() {
            self.emit(WorkflowEvent::CreatedWithoutReviewers {
                pr_id: pr.id,
                author_id: author.id,
            });
        }
        self.emit(WorkflowEvent::PullRequestCreated {
            pr_id: pr.id,
            author_id: author.id,
            reviewer_count: pr.reviewers.len(),
        });

        Ok(self.enrich_pull_request(pr).await)
    }

    pub async fn get_pull_request(&self, pr_id: i64) -> Result<PullRequest> {
        validate_id("prId", pr_id)?;
        let pr = self
            .store
            .get_pull_request(pr_id)
            .await?
            .ok_or(Error::PullRequestNotFound(pr_id))?;
        Ok(self.enrich_pull_request(pr).await)
    }

    /// Pull requests matching the filter, newest first
    pub async fn list_pull_requests(&self, filter: PullRequestFilter) -> Result<Vec<PullRequest>> {
        let prs = self.store.list_pull_requests(filter).await?;
        Ok(self.enrich_pull_requests(prs).await)
    }

    /// Merge an open pull request; merging a merged one returns it unchanged
    pub async fn merge_pull_request(&self, pr_id: i64) -> Result<PullRequest> {
        validate_id("prId", pr_id)?;

        let now = Utc::now();
        let pr = self
            .store
            .merge_pull_request(pr_id, now)
            .await?
            .ok_or(Error::PullRequestFinalized(pr_id))?;

        if pr.merged_at == Some(now) {
            self.emit(WorkflowEvent::PullRequestMerged { pr_id });
        }
        Ok(self.enrich_pull_request(pr).await)
    }

    /// Close an open pull request
    pub async fn close_pull_request(&self, pr_id: i64) -> Result<PullRequest> {
        validate_id("prId", pr_id)?;

        let pr = self
            .store
            .close_pull_request(pr_id)
            .await?
            .ok_or(Error::PullRequestFinalized(pr_id))?;

        self.emit(WorkflowEvent::PullRequestClosed { pr_id });
        Ok(self.enrich_pull_request(pr).await)
    }

    /// Explicitly add a reviewer to an open pull request
    pub async fn add_reviewer(&self, pr_id: i64, reviewer_id: i64) -> Result<PullRequest> {
        validate_id("prId", pr_id)?;
        validate_id("reviewerId", reviewer_id)?;

        let pr = self
            .store
            .get_pull_request(pr_id)
            .await?
            .ok_or(Error::PullRequestNotFound(pr_id))?;

        if pr.author_id == reviewer_id {
            return Err(Error::AuthorCannotReview);
        }
        if pr.status.is_final() {
            return Err(Error::InvalidState(format!(
                "cannot add reviewer to {} pull request",
                pr.status
            )));
        }
        if pr.has_reviewer(reviewer_id) {
            return Err(Error::AlreadyAssigned { pr_id, reviewer_id });
        }

        let reviewer = self
            .store
            .get_user(reviewer_id)
            .await?
            .ok_or(Error::UserNotFound(reviewer_id))?;
        if !reviewer.is_active {
            return Err(Error::Inactive(reviewer_id));
        }

        // Status is re-checked against the persisted row inside the insert
        if !self.store.add_reviewer(pr_id, reviewer_id).await? {
            return Err(Error::InvalidState(
                "pull request was finalized before the reviewer could be added".to_string(),
            ));
        }

        self.emit(WorkflowEvent::ReviewerAdded { pr_id, reviewer_id });
        self.get_pull_request(pr_id).await
    }

    /// Replace one reviewer with a random active teammate
    pub async fn reassign_reviewer(&self, pr_id: i64, req: ReassignReviewerRequest) -> Result<PullRequest> {
        validate_id("prId", pr_id)?;
        validate_id("oldReviewerId", req.old_reviewer_id)?;

        let pr = self
            .store
            .get_pull_request(pr_id)
            .await?
            .ok_or(Error::PullRequestNotFound(pr_id))?;

        if pr.status == PrStatus::Merged {
            return Err(merged_reassignment());
        }
        if !pr.has_reviewer(req.old_reviewer_id) {
            return Err(Error::ReviewerNotAssigned {
                pr_id,
                reviewer_id: req.old_reviewer_id,
            });
        }

        self.swap_reviewer(&pr, req.old_reviewer_id).await?;
        self.get_pull_request(pr_id).await
    }

    /// Pick a replacement from the old reviewer's team and swap atomically.
    /// Returns the new reviewer's id.
    ///
    /// If a concurrent request assigns the chosen replacement first, the PR
    /// is re-read and selection runs once more before giving up.
    pub(crate) async fn swap_reviewer(&self, pr: &PullRequest, old_reviewer_id: i64) -> Result<i64> {
        let old = self
            .store
            .get_user(old_reviewer_id)
            .await?
            .ok_or(Error::UserNotFound(old_reviewer_id))?;
        let team_id = old.team_id.ok_or(Error::NoTeam(old_reviewer_id))?;

        let mut exclude: HashSet<i64> = pr.reviewer_ids().into_iter().collect();
        for attempt in 1..=REPLACEMENT_ATTEMPTS {
            let candidates = self.store.active_team_members(team_id, pr.author_id).await?;
            let new = self
                .policy
                .select_replacement(candidates, &exclude)
                .ok_or(Error::NoAvailableReviewer(team_id))?;

            match self.store.replace_reviewer(pr.id, old_reviewer_id, new.id).await? {
                ReplaceOutcome::Replaced => {
                    self.emit(WorkflowEvent::ReviewerReassigned {
                        pr_id: pr.id,
                        old_reviewer_id,
                        new_reviewer_id: new.id,
                    });
                    return Ok(new.id);
                }
                ReplaceOutcome::PullRequestMissing => return Err(Error::PullRequestNotFound(pr.id)),
                ReplaceOutcome::Merged => return Err(merged_reassignment()),
                ReplaceOutcome::ReviewerNotAssigned => {
                    return Err(Error::ReviewerNotAssigned {
                        pr_id: pr.id,
                        reviewer_id: old_reviewer_id,
                    })
                }
                ReplaceOutcome::ReplacementAssigned => {
                    tracing::debug!(
                        pr_id = pr.id,
                        candidate = new.id,
                        attempt,
                        "Replacement assigned concurrently"
                    );
                    let current = self
                        .store
                        .get_pull_request(pr.id)
                        .await?
                        .ok_or(Error::PullRequestNotFound(pr.id))?;
                    exclude = current.reviewer_ids().into_iter().collect();
                    exclude.insert(new.id);
                }
            }
        }

        Err(Error::NoAvailableReviewer(team_id))
    }
}

fn merged_reassignment() -> Error {
    Error::InvalidState("cannot reassign reviewer on merged pull request".to_string())
}

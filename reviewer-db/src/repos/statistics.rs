//! Aggregate queries for the statistics endpoint

use reviewer_core::models::{PrStatus, Statistics, TeamStatistic, UserStatistic};
use sqlx::SqlitePool;

use crate::error::Result;

/// Read-only reporting queries
pub struct StatisticsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StatisticsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// PR counts by status plus the top `top_n` reviewers and teams
    pub async fn collect(&self, top_n: u32) -> Result<Statistics> {
        let (total, open, merged, closed): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0)
            FROM pull_requests
            "#,
        )
        .bind(PrStatus::Open.as_db_str())
        .bind(PrStatus::Merged.as_db_str())
        .bind(PrStatus::Closed.as_db_str())
        .fetch_one(self.pool)
        .await?;

        let user_rows: Vec<(i64, String, i64)> = sqlx::query_as(
            r#"
            SELECT u.id, u.name, COUNT(*) AS assignments
            FROM pr_reviewers r
            JOIN users u ON u.id = r.reviewer_id
            GROUP BY u.id, u.name
            ORDER BY assignments DESC, u.name ASC
            LIMIT ?
            "#,
        )
        .bind(i64::from(top_n))
        .fetch_all(self.pool)
        .await?;

        let team_rows: Vec<(i64, String, i64)> = sqlx::query_as(
            r#"
            SELECT t.id, t.name, COUNT(p.id) AS pr_count
            FROM teams t
            JOIN users u ON u.team_id = t.id
            JOIN pull_requests p ON p.author_id = u.id
            GROUP BY t.id, t.name
            ORDER BY pr_count DESC, t.name ASC
            LIMIT ?
            "#,
        )
        .bind(i64::from(top_n))
        .fetch_all(self.pool)
        .await?;

        Ok(Statistics {
            total_prs: count(total),
            open_prs: count(open),
            merged_prs: count(merged),
            closed_prs: count(closed),
            user_stats: user_rows
                .into_iter()
                .map(|(user_id, user_name, n)| UserStatistic {
                    user_id,
                    user_name,
                    assignment_count: count(n),
                })
                .collect(),
            team_stats: team_rows
                .into_iter()
                .map(|(team_id, team_name, n)| TeamStatistic {
                    team_id,
                    team_name,
                    pr_count: count(n),
                })
                .collect(),
        })
    }
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use reviewer_core::store::{NewPullRequest, NewUser};

    use crate::repos::test_support::setup_test_db;

    #[tokio::test]
    async fn test_empty_database() {
        let (db, _temp) = setup_test_db().await;
        let stats = db.statistics().collect(20).await.unwrap();
        assert_eq!(stats.total_prs, 0);
        assert!(stats.user_stats.is_empty());
        assert!(stats.team_stats.is_empty());
    }

    #[tokio::test]
    async fn test_counts_and_rankings() {
        let (db, _temp) = setup_test_db().await;
        let qa = db.teams().create("QA").await.unwrap();
        let dev = db.teams().create("Dev").await.unwrap();

        let mut ids = Vec::new();
        for (username, team) in [("a", qa.id), ("b", qa.id), ("c", dev.id)] {
            let user = db
                .users()
                .create(NewUser {
                    username: username.into(),
                    name: username.to_uppercase(),
                    team_id: Some(team),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let prs = db.pull_requests();
        let first = prs
            .create(NewPullRequest {
                title: "One".into(),
                author_id: a,
                reviewer_ids: vec![b, c],
            })
            .await
            .unwrap();
        prs.create(NewPullRequest {
            title: "Two".into(),
            author_id: a,
            reviewer_ids: vec![b],
        })
        .await
        .unwrap();
        let third = prs
            .create(NewPullRequest {
                title: "Three".into(),
                author_id: c,
                reviewer_ids: vec![],
            })
            .await
            .unwrap();
        prs.merge(first.id, Utc::now()).await.unwrap();
        prs.close(third.id).await.unwrap();

        let stats = db.statistics().collect(20).await.unwrap();
        assert_eq!(
            (stats.total_prs, stats.open_prs, stats.merged_prs, stats.closed_prs),
            (3, 1, 1, 1)
        );

        assert_eq!(stats.user_stats[0].user_id, b);
        assert_eq!(stats.user_stats[0].assignment_count, 2);
        assert_eq!(stats.user_stats[1].user_id, c);

        assert_eq!(stats.team_stats[0].team_id, qa.id);
        assert_eq!(stats.team_stats[0].pr_count, 2);
        assert_eq!(stats.team_stats[1].team_id, dev.id);

        let top = db.statistics().collect(1).await.unwrap();
        assert_eq!(top.user_stats.len(), 1);
        assert_eq!(top.team_stats.len(), 1);
    }
}

//! Stats command - print assignment statistics from the database

use clap::Args;
use reviewer_core::models::Statistics;
use reviewer_core::Config;

use super::open_service;

/// Print PR counts and the busiest reviewers and teams
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl StatsArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let service = open_service(config).await?;
        let stats = service.get_statistics().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print!("{}", render(&stats));
        }
        Ok(())
    }
}

fn render(stats: &Statistics) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Pull requests: {} total, {} open, {} merged, {} closed\n",
        stats.total_prs, stats.open_prs, stats.merged_prs, stats.closed_prs
    ));

    out.push_str("\nTop reviewers:\n");
    if stats.user_stats.is_empty() {
        out.push_str("  (none)\n");
    }
    for s in &stats.user_stats {
        out.push_str(&format!("  {:>5}  {} (#{})\n", s.assignment_count, s.user_name, s.user_id));
    }

    out.push_str("\nTeams by authored PRs:\n");
    if stats.team_stats.is_empty() {
        out.push_str("  (none)\n");
    }
    for s in &stats.team_stats {
        out.push_str(&format!("  {:>5}  {} (#{})\n", s.pr_count, s.team_name, s.team_id));
    }
    out
}

#[cfg(test)]
mod tests {
    use reviewer_core::models::UserStatistic;

    use super::*;

    #[test]
    fn test_render() {
        let stats = Statistics {
            total_prs: 3,
            open_prs: 1,
            merged_prs: 1,
            closed_prs: 1,
            user_stats: vec![UserStatistic {
                user_id: 2,
                user_name: "Bob".into(),
                assignment_count: 4,
            }],
            team_stats: vec![],
        };
        let text = render(&stats);
        assert!(text.starts_with("Pull requests: 3 total, 1 open, 1 merged, 1 closed"));
        assert!(text.contains("    4  Bob (#2)"));
        assert!(text.contains("Teams by authored PRs:\n  (none)"));
    }
}

//! Statistics snapshot types.
//!
//! Derived, read-only views over the report collection. Nothing here is
//! persisted; a snapshot is recomputed on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most agents a snapshot will ever list.
pub const MAX_TOP_AGENTS: usize = 10;

/// Headline counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_reports: u64,
    pub high_threat_reports: u64,
    pub confirmed_reports: u64,
    pub unconfirmed_reports: u64,
    /// Percentage with one decimal, e.g. `"30.0%"`; `"0%"` when empty.
    pub confirmation_rate: String,
}

/// Number of reports at one threat level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatLevelCount {
    pub threat_level: u8,
    pub count: u64,
}

/// One agent's submission totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivity {
    pub field_code: String,
    pub report_count: u64,
    pub high_threat_count: u64,
}

/// Full statistics snapshot returned by `GET /stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub overview: StatsOverview,
    /// Ascending by threat level.
    pub threat_level_distribution: Vec<ThreatLevelCount>,
    /// Descending by report count, ties by field code ascending.
    pub top_agents: Vec<AgentActivity>,
}

/// Format `confirmed / total` as a one-decimal percentage.
#[allow(clippy::cast_precision_loss)]
pub fn confirmation_rate(confirmed: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", confirmed as f64 / total as f64 * 100.0)
}

/// Order agents by report count descending, then field code ascending,
/// and keep at most `limit` of them.
pub fn rank_agents(mut agents: Vec<AgentActivity>, limit: usize) -> Vec<AgentActivity> {
    agents.sort_by(|a, b| {
        b.report_count
            .cmp(&a.report_count)
            .then_with(|| a.field_code.cmp(&b.field_code))
    });
    agents.truncate(limit.min(MAX_TOP_AGENTS));
    agents
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(code: &str, reports: u64) -> AgentActivity {
        AgentActivity {
            field_code: code.to_string(),
            report_count: reports,
            high_threat_count: 0,
        }
    }

    #[test]
    fn confirmation_rate_handles_empty_collection() {
        assert_eq!(confirmation_rate(0, 0), "0%");
    }

    #[test]
    fn confirmation_rate_has_one_decimal() {
        assert_eq!(confirmation_rate(3, 10), "30.0%");
        assert_eq!(confirmation_rate(1, 3), "33.3%");
        assert_eq!(confirmation_rate(2, 3), "66.7%");
        assert_eq!(confirmation_rate(5, 5), "100.0%");
    }

    #[test]
    fn agents_ranked_by_count_then_code() {
        let ranked = rank_agents(
            vec![agent("C-1", 2), agent("B-1", 5), agent("A-1", 2), agent("D-1", 1)],
            10,
        );
        let codes: Vec<_> = ranked.iter().map(|a| a.field_code.as_str()).collect();
        assert_eq!(codes, vec!["B-1", "A-1", "C-1", "D-1"]);
    }

    #[test]
    fn agent_ranking_never_exceeds_ten() {
        let agents = (0..25).map(|i| agent(&format!("AG-{i:02}"), i)).collect();
        assert_eq!(rank_agents(agents, 50).len(), MAX_TOP_AGENTS);
    }
}

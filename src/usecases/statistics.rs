//! Statistics Aggregator - Collection-wide Counters and Groupings
//!
//! Builds a [`StatsSnapshot`] from six independent read-only queries.
//! The queries are issued concurrently and all must succeed; a failure
//! in any of them fails the whole snapshot (no partial results).

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::domain::error::Result;
use crate::domain::stats::{MAX_TOP_AGENTS, confirmation_rate, rank_agents};
use crate::domain::{ReportFilter, StatsOverview, StatsSnapshot};
use crate::ports::ReportStore;

/// Computes statistics snapshots over the whole report collection.
#[derive(Clone)]
pub struct StatisticsAggregator {
  /// Injected store handle.
  store: Arc<dyn ReportStore>,
}

impl StatisticsAggregator {
  /// Create an aggregator listing the ten most active agents.
  pub fn new(store: Arc<dyn ReportStore>) -> Self {
    Self { store }
  }

  /// Compute a fresh snapshot.
  ///
  /// # Errors
  /// `Store` if any of the underlying queries fails.
  #[instrument(skip(self))]
  pub async fn snapshot(&self) -> Result<StatsSnapshot> {
    let store = &self.store;
    let all_filter = ReportFilter::all();
    let high_filter = ReportFilter::high_priority();
    let confirmed_filter = ReportFilter::confirmed(true);
    let unconfirmed_filter = ReportFilter::confirmed(false);

    let (total, high_threat, confirmed, unconfirmed, mut distribution, agents) = tokio::try_join!(
      store.count(&all_filter),
      store.count(&high_filter),
      store.count(&confirmed_filter),
      store.count(&unconfirmed_filter),
      store.threat_level_distribution(),
      store.top_agents(MAX_TOP_AGENTS),
    )?;

    distribution.sort_by_key(|bucket| bucket.threat_level);
    let top_agents = rank_agents(agents, MAX_TOP_AGENTS);

    debug!(total, high_threat, confirmed, "Statistics computed");

    Ok(StatsSnapshot {
      timestamp: Utc::now(),
      overview: StatsOverview {
        total_reports: total,
        high_threat_reports: high_threat,
        confirmed_reports: confirmed,
        unconfirmed_reports: unconfirmed,
        confirmation_rate: confirmation_rate(confirmed, total),
      },
      threat_level_distribution: distribution,
      top_agents,
    })
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use mockall::mock;

  use super::*;
  use crate::domain::{
    AgentActivity, ListOptions, NewReport, Report, ReportChanges, ReportError, ReportId,
    StoreError, ThreatLevelCount,
  };
  use crate::ports::StoreResult;

  mock! {
    Store {}

    #[async_trait]
    impl ReportStore for Store {
      async fn insert(&self, report: NewReport) -> StoreResult<Report>;
      async fn find_by_id(&self, id: &ReportId) -> StoreResult<Option<Report>>;
      async fn find(&self, filter: &ReportFilter, options: &ListOptions) -> StoreResult<Vec<Report>>;
      async fn update(&self, id: &ReportId, changes: &ReportChanges) -> StoreResult<Option<Report>>;
      async fn delete(&self, id: &ReportId) -> StoreResult<bool>;
      async fn count(&self, filter: &ReportFilter) -> StoreResult<u64>;
      async fn threat_level_distribution(&self) -> StoreResult<Vec<ThreatLevelCount>>;
      async fn top_agents(&self, limit: usize) -> StoreResult<Vec<AgentActivity>>;
      async fn ping(&self) -> StoreResult<()>;
      fn backend_name(&self) -> &'static str;
    }
  }

  fn agent(code: &str, reports: u64, high: u64) -> AgentActivity {
    AgentActivity {
      field_code: code.to_string(),
      report_count: reports,
      high_threat_count: high,
    }
  }

  #[tokio::test]
  async fn test_snapshot_composes_all_aggregates() {
    let mut store = MockStore::new();
    store.expect_count().returning(|filter| {
      Ok(match (filter.min_threat_level, filter.confirmed) {
        (Some(_), _) => 4,
        (None, Some(true)) => 3,
        (None, Some(false)) => 7,
        (None, None) => 10,
      })
    });
    store.expect_threat_level_distribution().returning(|| {
      Ok(vec![
        ThreatLevelCount { threat_level: 5, count: 1 },
        ThreatLevelCount { threat_level: 1, count: 5 },
        ThreatLevelCount { threat_level: 4, count: 3 },
        ThreatLevelCount { threat_level: 2, count: 1 },
      ])
    });
    store
      .expect_top_agents()
      .withf(|limit| *limit == 10)
      .returning(|_| Ok(vec![agent("BR-2", 3, 0), agent("AX-12", 7, 4)]));

    let snapshot = StatisticsAggregator::new(Arc::new(store)).snapshot().await.unwrap();

    assert_eq!(snapshot.overview.total_reports, 10);
    assert_eq!(snapshot.overview.high_threat_reports, 4);
    assert_eq!(snapshot.overview.confirmed_reports, 3);
    assert_eq!(snapshot.overview.unconfirmed_reports, 7);
    assert_eq!(snapshot.overview.confirmation_rate, "30.0%");
    let levels: Vec<u8> = snapshot
      .threat_level_distribution
      .iter()
      .map(|b| b.threat_level)
      .collect();
    assert_eq!(levels, vec![1, 2, 4, 5]);
    assert_eq!(snapshot.top_agents[0].field_code, "AX-12");
  }

  #[tokio::test]
  async fn test_empty_collection_has_zero_rate() {
    let mut store = MockStore::new();
    store.expect_count().returning(|_| Ok(0));
    store.expect_threat_level_distribution().returning(|| Ok(vec![]));
    store.expect_top_agents().returning(|_| Ok(vec![]));

    let snapshot = StatisticsAggregator::new(Arc::new(store)).snapshot().await.unwrap();
    assert_eq!(snapshot.overview.confirmation_rate, "0%");
    assert!(snapshot.top_agents.is_empty());
  }

  #[tokio::test]
  async fn test_any_failed_query_fails_the_snapshot() {
    let mut store = MockStore::new();
    store.expect_count().returning(|_| Ok(1));
    store
      .expect_threat_level_distribution()
      .returning(|| Err(StoreError::Unavailable("connection reset".into())));
    store.expect_top_agents().returning(|_| Ok(vec![]));

    let result = StatisticsAggregator::new(Arc::new(store)).snapshot().await;
    assert!(matches!(result, Err(ReportError::Store(StoreError::Unavailable(_)))));
  }
}

//! MongoDB Report Store - Document Database Adapter
//!
//! Implements the `ReportStore` port on a single MongoDB collection.
//! The driver owns a bounded connection pool (min/max size, idle reclaim)
//! that is shared by every request through one `MongoReportStore` handle.
//!
//! Documents are mapped through `ReportDocument` so the wire `Report`
//! type never depends on BSON representations.

use std::time::Duration;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use futures_util::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::retry::{RetryPolicy, StartupError};
use crate::domain::{
    AgentActivity, ConfirmationStamp, ListOptions, NewReport, Report, ReportChanges,
    ReportFilter, ReportId, SortOrder, StoreError, ThreatLevel, ThreatLevelCount,
};
use crate::domain::report::HIGH_PRIORITY_THRESHOLD;
use crate::ports::{ReportStore, StoreResult};

/// Connection and pool settings for the MongoDB adapter.
#[derive(Debug, Clone)]
pub struct MongoSettings {
    /// Connection string (`mongodb://` or `mongodb+srv://`).
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Collection holding report documents.
    pub collection: String,
    /// Connections kept open even when idle.
    pub min_pool_size: u32,
    /// Upper bound on open connections.
    pub max_pool_size: u32,
    /// Idle connections older than this are reclaimed.
    pub max_idle_time: Duration,
    /// How long to wait for a usable server before failing an operation.
    pub server_selection_timeout: Duration,
    /// Reported to the server for diagnostics.
    pub app_name: String,
}

/// Stored shape of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    field_code: String,
    location: String,
    threat_level: i32,
    description: String,
    timestamp: bson::DateTime,
    confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confirmed_at: Option<bson::DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<bson::DateTime>,
}

impl ReportDocument {
    fn from_new(report: &NewReport) -> Self {
        Self {
            id: None,
            field_code: report.field_code.clone(),
            location: report.location.clone(),
            threat_level: i32::from(report.threat_level.value()),
            description: report.description.clone(),
            timestamp: bson::DateTime::from_chrono(report.timestamp.unwrap_or_else(chrono::Utc::now)),
            confirmed: false,
            confirmed_at: None,
            updated_at: None,
        }
    }

    /// Map a stored document onto the domain type.
    fn into_report(self) -> StoreResult<Report> {
        let raw_id = self.id.map(|oid| oid.to_hex()).unwrap_or_default();
        let corrupt = |reason: &str| StoreError::CorruptDocument {
            id: raw_id.clone(),
            reason: reason.to_string(),
        };

        let id = ReportId::parse(&raw_id).map_err(|_| corrupt("missing or malformed _id"))?;
        let threat_level = ThreatLevel::new(i64::from(self.threat_level))
            .ok_or_else(|| corrupt("threatLevel outside 1..=5"))?;

        Ok(Report {
            id,
            field_code: self.field_code,
            location: self.location,
            threat_level,
            description: self.description,
            timestamp: self.timestamp.to_chrono(),
            confirmed: self.confirmed,
            confirmed_at: self.confirmed_at.map(bson::DateTime::to_chrono),
            updated_at: self.updated_at.map(bson::DateTime::to_chrono),
        })
    }
}

/// Map a driver error onto the port's error type.
fn store_error(err: &mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Operation(err.to_string()),
    }
}

fn object_id(id: &ReportId) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id.as_str()).map_err(|e| StoreError::Operation(e.to_string()))
}

fn filter_document(filter: &ReportFilter) -> Document {
    let mut query = Document::new();
    if let Some(code) = &filter.field_code {
        query.insert("fieldCode", code.as_str());
    }
    let mut level = Document::new();
    if let Some(exact) = filter.threat_level {
        level.insert("$eq", i32::from(exact.value()));
    }
    if let Some(min) = filter.min_threat_level {
        level.insert("$gte", i32::from(min.value()));
    }
    if !level.is_empty() {
        query.insert("threatLevel", level);
    }
    if let Some(confirmed) = filter.confirmed {
        query.insert("confirmed", confirmed);
    }
    query
}

fn update_document(changes: &ReportChanges) -> Document {
    let patch = &changes.patch;
    let mut set = doc! { "updatedAt": bson::DateTime::from_chrono(changes.updated_at) };
    if let Some(code) = &patch.field_code {
        set.insert("fieldCode", code.as_str());
    }
    if let Some(location) = &patch.location {
        set.insert("location", location.as_str());
    }
    if let Some(level) = patch.threat_level {
        set.insert("threatLevel", i32::from(level.value()));
    }
    if let Some(description) = &patch.description {
        set.insert("description", description.as_str());
    }
    if let Some(confirmed) = patch.confirmed {
        set.insert("confirmed", confirmed);
    }

    let mut update = Document::new();
    match changes.confirmed_at {
        ConfirmationStamp::Keep => {}
        ConfirmationStamp::Set(at) => {
            set.insert("confirmedAt", bson::DateTime::from_chrono(at));
        }
        ConfirmationStamp::Clear => {
            update.insert("$unset", doc! { "confirmedAt": "" });
        }
    }
    update.insert("$set", set);
    update
}

/// Read a `$sum` result, which the server returns as int32 or int64.
fn count_of(doc: &Document, key: &str) -> u64 {
    match doc.get(key) {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or(0),
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(Bson::Double(n)) if *n >= 0.0 => *n as u64,
        _ => 0,
    }
}

/// Group-by-agent pipeline, or `None` when no agents are wanted
/// (the server rejects `$limit: 0`).
fn top_agents_pipeline(limit: usize) -> Option<Vec<Document>> {
    if limit == 0 {
        return None;
    }
    let high = i32::from(HIGH_PRIORITY_THRESHOLD);
    Some(vec![
        doc! { "$group": {
            "_id": "$fieldCode",
            "reportCount": { "$sum": 1 },
            "highThreatCount": {
                "$sum": { "$cond": [{ "$gte": ["$threatLevel", high] }, 1, 0] }
            },
        } },
        doc! { "$sort": { "reportCount": -1, "_id": 1 } },
        doc! { "$limit": i64::try_from(limit).unwrap_or(i64::MAX) },
    ])
}

/// MongoDB-backed [`ReportStore`].
#[derive(Debug, Clone)]
pub struct MongoReportStore {
    client: Client,
    database: Database,
    collection: Collection<ReportDocument>,
}

impl MongoReportStore {
    /// Build the client, open the pool and verify connectivity with a ping.
    ///
    /// # Errors
    /// Returns `StoreError` if the URI is invalid or the server is unreachable.
    #[instrument(skip(settings), fields(database = %settings.database))]
    pub async fn connect(settings: &MongoSettings) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(|e| store_error(&e))?;
        options.app_name = Some(settings.app_name.clone());
        options.min_pool_size = Some(settings.min_pool_size);
        options.max_pool_size = Some(settings.max_pool_size);
        options.max_idle_time = Some(settings.max_idle_time);
        options.server_selection_timeout = Some(settings.server_selection_timeout);

        let client = Client::with_options(options).map_err(|e| store_error(&e))?;
        let database = client.database(&settings.database);
        let collection = database.collection::<ReportDocument>(&settings.collection);

        let store = Self {
            client,
            database,
            collection,
        };
        store.ping().await?;
        info!(collection = %settings.collection, "MongoDB connection established");
        Ok(store)
    }

    /// Connect, retrying with backoff according to `policy`.
    ///
    /// # Errors
    /// [`StartupError`] once the retry budget is exhausted.
    pub async fn connect_with_retry(
        settings: &MongoSettings,
        policy: &RetryPolicy,
    ) -> Result<Self, StartupError> {
        policy
            .run("MongoDB connect", |_| Self::connect(settings))
            .await
    }

    /// Create the secondary indexes used by list and aggregate queries.
    ///
    /// # Errors
    /// Returns `StoreError` if index creation fails.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let indexes = vec![
            IndexModel::builder().keys(doc! { "timestamp": -1 }).build(),
            IndexModel::builder().keys(doc! { "threatLevel": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "fieldCode": 1, "timestamp": -1 })
                .build(),
        ];
        self.collection
            .create_indexes(indexes)
            .await
            .map_err(|e| store_error(&e))?;
        debug!("Report indexes ensured");
        Ok(())
    }

    /// Close the pool. In-flight operations finish first.
    pub async fn close(self) {
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }
}

#[async_trait]
impl ReportStore for MongoReportStore {
    async fn insert(&self, report: NewReport) -> StoreResult<Report> {
        let mut document = ReportDocument::from_new(&report);
        let result = self
            .collection
            .insert_one(&document)
            .await
            .map_err(|e| store_error(&e))?;
        document.id = result.inserted_id.as_object_id();
        document.into_report()
    }

    async fn find_by_id(&self, id: &ReportId) -> StoreResult<Option<Report>> {
        let found = self
            .collection
            .find_one(doc! { "_id": object_id(id)? })
            .await
            .map_err(|e| store_error(&e))?;
        found.map(ReportDocument::into_report).transpose()
    }

    async fn find(&self, filter: &ReportFilter, options: &ListOptions) -> StoreResult<Vec<Report>> {
        let direction = match options.sort_order {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        };
        let mut sort = Document::new();
        sort.insert(options.sort_field.as_str(), direction);
        sort.insert("_id", direction);
        let cursor = self
            .collection
            .find(filter_document(filter))
            .sort(sort)
            .skip(options.skip)
            .limit(i64::from(options.limit))
            .await
            .map_err(|e| store_error(&e))?;
        let documents: Vec<ReportDocument> =
            cursor.try_collect().await.map_err(|e| store_error(&e))?;
        documents.into_iter().map(ReportDocument::into_report).collect()
    }

    async fn update(
        &self,
        id: &ReportId,
        changes: &ReportChanges,
    ) -> StoreResult<Option<Report>> {
        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": object_id(id)? }, update_document(changes))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| store_error(&e))?;
        updated.map(ReportDocument::into_report).transpose()
    }

    async fn delete(&self, id: &ReportId) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": object_id(id)? })
            .await
            .map_err(|e| store_error(&e))?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self, filter: &ReportFilter) -> StoreResult<u64> {
        self.collection
            .count_documents(filter_document(filter))
            .await
            .map_err(|e| store_error(&e))
    }

    async fn threat_level_distribution(&self) -> StoreResult<Vec<ThreatLevelCount>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$threatLevel", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let cursor = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|e| store_error(&e))?;
        let groups: Vec<Document> = cursor.try_collect().await.map_err(|e| store_error(&e))?;

        Ok(groups
            .iter()
            .filter_map(|group| {
                let level = group.get_i32("_id").ok()?;
                Some(ThreatLevelCount {
                    threat_level: u8::try_from(level).ok()?,
                    count: count_of(group, "count"),
                })
            })
            .collect())
    }

    async fn top_agents(&self, limit: usize) -> StoreResult<Vec<AgentActivity>> {
        let Some(pipeline) = top_agents_pipeline(limit) else {
            return Ok(Vec::new());
        };
        let cursor = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|e| store_error(&e))?;
        let groups: Vec<Document> = cursor.try_collect().await.map_err(|e| store_error(&e))?;

        Ok(groups
            .iter()
            .filter_map(|group| {
                Some(AgentActivity {
                    field_code: group.get_str("_id").ok()?.to_string(),
                    report_count: count_of(group, "reportCount"),
                    high_threat_count: count_of(group, "highThreatCount"),
                })
            })
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| store_error(&e))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "MongoDB"
    }
}

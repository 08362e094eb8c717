// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Client for the dashboard datasource query endpoint.
//!
//! The dashboard exposes its Postgres datasource through `POST /api/ds/query`.
//! Each request carries exactly one raw SQL query and the reporting window in
//! epoch milliseconds; the response groups result frames by query reference
//! id. The request and response shapes are fixed by the dashboard and are
//! modelled here as typed serde structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::DashboardConfig, error::Error};

/// Reference id of the single query in every payload.
const QUERY_REF_ID: &str = "A";
const DATASOURCE_ID: u32 = 1;
const INTERVAL_MS: u64 = 3_600_000;
const MAX_DATA_POINTS: u32 = 1622;

/// Shape in which the datasource returns query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum ResultFormat
{
    /// One frame per series, column 0 holding timestamps.
    TimeSeries,
    /// Plain rows in the column order of the query.
    Table,
}

/// Datasource addressed by a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct DatasourceRef
{
    /// Datasource uid.
    pub uid:  String,
    /// Datasource plugin type.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Single query entry of a [`QueryPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntry
{
    /// Key under which the result is returned.
    pub ref_id:          String,
    /// Datasource executing the query.
    pub datasource:      DatasourceRef,
    /// SQL sent verbatim to the datasource.
    pub raw_sql:         String,
    /// Requested result shape.
    pub format:          ResultFormat,
    /// Numeric datasource id.
    pub datasource_id:   u32,
    /// Bucket width for time-series macros.
    pub interval_ms:     u64,
    /// Upper bound on returned points per series.
    pub max_data_points: u32,
}

/// Request body for `POST /api/ds/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct QueryPayload
{
    /// Always exactly one entry.
    pub queries: Vec<QueryEntry,>,
    /// Window start in epoch milliseconds.
    pub from:    String,
    /// Window end in epoch milliseconds.
    pub to:      String,
}

impl QueryPayload
{
    /// Builds the payload for a single raw SQL query.
    pub fn single(
        datasource: DatasourceRef,
        raw_sql: &str,
        format: ResultFormat,
        from: &str,
        to: &str,
    ) -> Self
    {
        Self {
            queries: vec![QueryEntry {
                ref_id: QUERY_REF_ID.to_owned(),
                datasource,
                raw_sql: raw_sql.to_owned(),
                format,
                datasource_id: DATASOURCE_ID,
                interval_ms: INTERVAL_MS,
                max_data_points: MAX_DATA_POINTS,
            }],
            from:    from.to_owned(),
            to:      to.to_owned(),
        }
    }
}

/// Decoded response of `POST /api/ds/query`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize,)]
pub struct ResponseEnvelope
{
    /// Results keyed by query reference id, iterated in key order.
    pub results: BTreeMap<String, QueryResult,>,
}

/// Result of one query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize,)]
pub struct QueryResult
{
    /// Error reported by the datasource for this query.
    #[serde(default)]
    pub error:  Option<String,>,
    /// Returned frames.
    #[serde(default)]
    pub frames: Vec<Frame,>,
}

/// One tabular slice of a query result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize,)]
pub struct Frame
{
    /// Column descriptions.
    #[serde(default)]
    pub schema: FrameSchema,
    /// Column values.
    #[serde(default)]
    pub data:   FrameData,
}

/// Ordered column descriptions of a [`Frame`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize,)]
pub struct FrameSchema
{
    /// One entry per column.
    #[serde(default)]
    pub fields: Vec<Field,>,
}

/// Column description.
#[derive(Debug, Clone, Default, PartialEq, Deserialize,)]
pub struct Field
{
    /// Column name; a username for time-series reviewer frames.
    pub name: String,
}

/// Column-major values of a [`Frame`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize,)]
pub struct FrameData
{
    /// One inner sequence per column, rows aligned by index.
    #[serde(default)]
    pub values: Vec<Vec<Option<Cell,>,>,>,
}

/// Non-null cell value.
#[derive(Debug, Clone, PartialEq, Deserialize,)]
#[serde(untagged)]
pub enum Cell
{
    /// Any JSON number.
    Number(f64,),
    /// Any JSON string.
    Text(String,),
}

/// Seam over the dashboard query endpoint.
#[allow(async_fn_in_trait)]
pub trait DashboardQuery
{
    /// Runs one raw SQL query over the `[from, to]` epoch-millisecond window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failures or non-success
    /// statuses and [`Error::ResponseFormat`] when the body cannot be decoded
    /// or the datasource reports a query error.
    async fn run_query(
        &self,
        raw_sql: &str,
        format: ResultFormat,
        from: &str,
        to: &str,
    ) -> Result<ResponseEnvelope, Error,>;
}

/// HTTP implementation of [`DashboardQuery`].
#[derive(Debug, Clone,)]
pub struct DashboardClient
{
    http:       reqwest::Client,
    endpoint:   String,
    datasource: DatasourceRef,
}

impl DashboardClient
{
    /// Builds a client for the configured dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] when the HTTP client cannot be initialized.
    pub fn new(config: &DashboardConfig,) -> Result<Self, Error,>
    {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),)
            .build()
            .map_err(|e| Error::network(format!("failed to initialize HTTP client: {e}"),),)?;

        Ok(Self {
            http,
            endpoint: config.query_endpoint(),
            datasource: DatasourceRef {
                uid:  config.datasource_uid.clone(),
                kind: config.datasource_type.clone(),
            },
        },)
    }
}

impl DashboardQuery for DashboardClient
{
    async fn run_query(
        &self,
        raw_sql: &str,
        format: ResultFormat,
        from: &str,
        to: &str,
    ) -> Result<ResponseEnvelope, Error,>
    {
        let payload = QueryPayload::single(self.datasource.clone(), raw_sql, format, from, to,);
        debug!("Querying {} ({:?}) for {}..{}", self.endpoint, format, from, to);

        let response = self
            .http
            .post(&self.endpoint,)
            .json(&payload,)
            .send()
            .await
            .map_err(|e| {
                Error::network(format!("dashboard query to {} failed: {e}", self.endpoint),)
            },)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!(
                "dashboard query to {} returned {status}",
                self.endpoint
            ),),);
        }

        let body = response.bytes().await.map_err(|e| {
            Error::network(format!(
                "failed to read dashboard response from {}: {e}",
                self.endpoint
            ),)
        },)?;

        decode_envelope(&body,)
    }
}

/// Decodes a response body and surfaces per-query datasource errors.
///
/// # Errors
///
/// Returns [`Error::ResponseFormat`] when the body is not a valid envelope or
/// any query result carries an error message.
pub fn decode_envelope(body: &[u8],) -> Result<ResponseEnvelope, Error,>
{
    let envelope: ResponseEnvelope = serde_json::from_slice(body,)
        .map_err(|e| Error::response_format(format!("invalid dashboard response: {e}"),),)?;

    for (ref_id, result,) in &envelope.results {
        if let Some(message,) = &result.error {
            return Err(Error::response_format(format!("query {ref_id} failed: {message}"),),);
        }
    }

    Ok(envelope,)
}

/// SQL returning daily review counts per user for a series.
pub fn reviewers_sql(series: &str,) -> String
{
    format!(
        "select\n  * \nfrom\n  suser_reviews\nwhere\n  $__timeFilter(time)\n  and period = 'd'\n  and series = '{series}'\norder by\n  time"
    )
}

/// SQL returning the weekly merger ranking for a series.
pub fn mergers_sql(series: &str,) -> String
{
    format!(
        "select\n  row_number() over (order by value desc, name asc) as \"Rank\",\n  name,\n  value\nfrom\n  shpr_mergers\nwhere\n  series = '{series}'\n  and period = 'w'"
    )
}

/// Runs the time-series reviewers query for one series.
///
/// # Errors
///
/// Propagates errors from [`DashboardQuery::run_query`].
pub async fn reviewers_query<D,>(
    dashboard: &D,
    series: &str,
    from: &str,
    to: &str,
) -> Result<ResponseEnvelope, Error,>
where
    D: DashboardQuery,
{
    dashboard.run_query(&reviewers_sql(series,), ResultFormat::TimeSeries, from, to,).await
}

/// Runs the tabular mergers query for one series.
///
/// # Errors
///
/// Propagates errors from [`DashboardQuery::run_query`].
pub async fn mergers_query<D,>(
    dashboard: &D,
    series: &str,
    from: &str,
    to: &str,
) -> Result<ResponseEnvelope, Error,>
where
    D: DashboardQuery,
{
    dashboard.run_query(&mergers_sql(series,), ResultFormat::Table, from, to,).await
}

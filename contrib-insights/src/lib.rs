//! Weekly contributor meeting insights.
//!
//! The library counts created, closed and stale issues and pull requests
//! through the GitHub search API and ranks reviewers and mergers from a
//! DevStats dashboard. Each metric is rendered as a [`Digest`]: a summary line
//! plus a deep link. Clients sit behind the [`IssueSearch`] and
//! [`DashboardQuery`] traits so digests can be built against any backend.

mod aggregate;
mod config;
mod dashboard;
mod dates;
mod digest;
mod error;
mod github;
mod logging;
mod report;

pub use aggregate::{Contributor, aggregate_table, aggregate_time_series, format_contributors, top};
pub use config::{
    DashboardConfig, GithubConfig, InsightsConfig, ProjectConfig, RepositoryConfig, load_config,
    parse_config,
};
pub use dashboard::{
    Cell, DashboardClient, DashboardQuery, DatasourceRef, Field, Frame, FrameData, FrameSchema,
    QueryEntry, QueryPayload, QueryResult, ResponseEnvelope, ResultFormat, decode_envelope,
    mergers_query, mergers_sql, reviewers_query, reviewers_sql,
};
pub use dates::{ReportWindow, last_week_as_dates, last_week_as_epoch_millis, one_year_ago_as_date};
pub use digest::{Digest, DigestGenerator, DigestKind};
pub use error::{Error, io_error};
pub use github::{
    GithubSearch, IssueSearch, ItemKind, ItemState, created_and_closed_issues,
    created_and_closed_prs, created_query, stale_issues, stale_query,
};
pub use logging::init_tracing;
pub use report::{OutputFormat, run_report, section_heading, write_digest};

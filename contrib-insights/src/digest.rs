// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Digest builders for the weekly report.
//!
//! Each builder composes one or two client calls with fixed formatting and
//! returns a summary line plus a link. Errors from the clients are returned
//! unchanged; no builder retries or substitutes defaults.

use serde::Serialize;
use tracing::info;

use crate::{
    aggregate::{aggregate_table, aggregate_time_series, format_contributors, top},
    config::{InsightsConfig, RepositoryConfig},
    dashboard::{DashboardQuery, mergers_query, reviewers_query},
    dates::ReportWindow,
    error::Error,
    github::{IssueSearch, created_and_closed_issues, created_and_closed_prs, stale_issues},
};

/// Identifies one of the five digests, in report order via [`DigestKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize,)]
#[serde(rename_all = "snake_case")]
pub enum DigestKind
{
    CreatedIssues,
    CreatedPullRequests,
    StaleIssues,
    TopReviewers,
    TopMergers,
}

impl DigestKind
{
    /// Every digest in the order the report prints them.
    pub const ALL: [Self; 5] = [
        Self::CreatedIssues,
        Self::CreatedPullRequests,
        Self::StaleIssues,
        Self::TopReviewers,
        Self::TopMergers,
    ];
}

/// One metric of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct Digest
{
    /// Digest that produced this result.
    pub kind:    DigestKind,
    /// Human readable summary, possibly spanning several lines.
    pub summary: String,
    /// Deep link to the underlying data.
    pub link:    String,
}

/// Builds digests over a fixed [`ReportWindow`].
#[derive(Debug,)]
pub struct DigestGenerator<'config, S, D,>
{
    config:    &'config InsightsConfig,
    search:    S,
    dashboard: D,
    window:    ReportWindow,
}

impl<'config, S, D,> DigestGenerator<'config, S, D,>
where
    S: IssueSearch,
    D: DashboardQuery,
{
    pub fn new(
        config: &'config InsightsConfig,
        search: S,
        dashboard: D,
        window: ReportWindow,
    ) -> Self
    {
        Self {
            config,
            search,
            dashboard,
            window,
        }
    }

    /// Configuration the digests are built from.
    pub fn config(&self,) -> &InsightsConfig
    {
        self.config
    }

    /// Window shared by every digest of this generator.
    pub fn window(&self,) -> &ReportWindow
    {
        &self.window
    }

    /// Builds the digest identified by `kind`.
    ///
    /// # Errors
    ///
    /// Propagates the first client or aggregation error unchanged.
    pub async fn generate(&self, kind: DigestKind,) -> Result<Digest, Error,>
    {
        let digest = match kind {
            DigestKind::CreatedIssues => self.created_issues().await?,
            DigestKind::CreatedPullRequests => self.created_pull_requests().await?,
            DigestKind::StaleIssues => self.stale_issues().await?,
            DigestKind::TopReviewers => self.top_reviewers().await?,
            DigestKind::TopMergers => self.top_mergers().await?,
        };
        info!("Generated {:?} digest", kind);
        Ok(digest,)
    }

    /// `Created Issues: <open> open / <closed> closed` for the window.
    ///
    /// # Errors
    ///
    /// Propagates search errors unchanged.
    pub async fn created_issues(&self,) -> Result<Digest, Error,>
    {
        let repository = &self.config.repository;
        let window = &self.window;
        let (open, closed,) =
            created_and_closed_issues(&self.search, repository, &window.from_date, &window.to_date,)
                .await?;

        Ok(Digest {
            kind:    DigestKind::CreatedIssues,
            summary: format!("Created Issues: {open} open / {closed} closed"),
            link:    created_link(repository, "issues", "issue", window,),
        },)
    }

    /// `Created PRs: <open> open / <closed> closed` for the window.
    ///
    /// # Errors
    ///
    /// Propagates search errors unchanged.
    pub async fn created_pull_requests(&self,) -> Result<Digest, Error,>
    {
        let repository = &self.config.repository;
        let window = &self.window;
        let (open, closed,) =
            created_and_closed_prs(&self.search, repository, &window.from_date, &window.to_date,)
                .await?;

        Ok(Digest {
            kind:    DigestKind::CreatedPullRequests,
            summary: format!("Created PRs: {open} open / {closed} closed"),
            link:    created_link(repository, "pulls", "pr", window,),
        },)
    }

    /// `Stale Issues: <count>` for open issues idle for a year.
    ///
    /// # Errors
    ///
    /// Propagates search errors unchanged.
    pub async fn stale_issues(&self,) -> Result<Digest, Error,>
    {
        let repository = &self.config.repository;
        let before = &self.window.stale_before;
        let count = stale_issues(&self.search, repository, before,).await?;

        Ok(Digest {
            kind:    DigestKind::StaleIssues,
            summary: format!("Stale Issues: {count}"),
            link:    format!(
                "https://github.com/{}/issues?q=is%3Aissue+is%3Aopen+updated%3A%3C{before}+",
                repository.full_name()
            ),
        },)
    }

    /// One `<project>: name (total), ...` line per project, ranked by reviews.
    ///
    /// # Errors
    ///
    /// Propagates dashboard and aggregation errors unchanged.
    pub async fn top_reviewers(&self,) -> Result<Digest, Error,>
    {
        let window = &self.window;
        let mut lines = Vec::with_capacity(self.config.projects.len(),);

        for project in &self.config.projects {
            let envelope = reviewers_query(
                &self.dashboard,
                &project.reviewers_series,
                &window.from_millis,
                &window.to_millis,
            )
            .await?;
            let mut reviewers = aggregate_time_series(&envelope,)?;
            if let Some(limit,) = project.reviewers_limit {
                reviewers = top(reviewers, limit,);
            }
            lines.push(format!("{}: {}", project.display_name, format_contributors(&reviewers)),);
        }

        Ok(Digest {
            kind:    DigestKind::TopReviewers,
            summary: lines.join("\n",),
            link:    self.config.dashboard.reviewers_link.clone(),
        },)
    }

    /// One `<project>: name (total), ...` line per project, in merger rank order.
    ///
    /// # Errors
    ///
    /// Propagates dashboard and aggregation errors unchanged.
    pub async fn top_mergers(&self,) -> Result<Digest, Error,>
    {
        let window = &self.window;
        let mut lines = Vec::with_capacity(self.config.projects.len(),);

        for project in &self.config.projects {
            let envelope = mergers_query(
                &self.dashboard,
                &project.mergers_series,
                &window.from_millis,
                &window.to_millis,
            )
            .await?;
            let mergers = aggregate_table(&envelope,)?;
            lines.push(format!("{}: {}", project.display_name, format_contributors(&mergers)),);
        }

        Ok(Digest {
            kind:    DigestKind::TopMergers,
            summary: lines.join("\n",),
            link:    self.config.dashboard.mergers_link.clone(),
        },)
    }
}

fn created_link(
    repository: &RepositoryConfig,
    page: &str,
    qualifier: &str,
    window: &ReportWindow,
) -> String
{
    format!(
        "https://github.com/{}/{page}?q=is%3A{qualifier}+is%3Aopen+created%3A{}..{}+",
        repository.full_name(),
        window.from_date,
        window.to_date
    )
}

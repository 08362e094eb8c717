// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Configuration document describing what the weekly report covers.
//!
//! Every section has built-in defaults that reproduce the Argo contributor
//! meeting report, so the binary runs without any configuration file. A YAML
//! document may override individual fields or whole sections:
//!
//! ```yaml
//! repository:
//!   owner: argoproj
//!   name: argo-cd
//!   display_name: Argo CD
//! projects:
//!   - display_name: Argo CD
//!     reviewers_series: rev_per_usrargoprojargocd
//!     mergers_series: hpr_mergersargocd
//!     reviewers_limit: 10
//! ```

use std::{fs, path::Path};

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{self, Error};

const DEFAULT_OWNER: &str = "argoproj";
const DEFAULT_REPOSITORY: &str = "argo-cd";
const DEFAULT_DISPLAY_NAME: &str = "Argo CD";
const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_DASHBOARD_URL: &str = "https://argo.devstats.cncf.io";
const DEFAULT_DATASOURCE_UID: &str = "P172949F98CB31475";
const DEFAULT_DATASOURCE_TYPE: &str = "postgres";
const DEFAULT_REVIEWERS_LINK: &str = "https://argo.devstats.cncf.io/d/29/pr-reviews-by-contributor?orgId=1&from=now-7d&to=now&var-period=d&var-repo_name=argoproj%2Fargo-cd";
const DEFAULT_MERGERS_LINK: &str = "https://argo.devstats.cncf.io/d/75/prs-mergers-table?orgId=1&var-period_name=Last%20week&var-repogroup_name=All";
/// Number of reviewers shown for the primary project by default.
const DEFAULT_REVIEWERS_LIMIT: usize = 10;
/// Series names are embedded into SQL string literals.
const SERIES_PATTERN: &str = "^[A-Za-z0-9_]+$";

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default)]
pub struct InsightsConfig
{
    /// Repository whose issues and pull requests are counted.
    pub repository: RepositoryConfig,
    /// GitHub API settings.
    pub github:     GithubConfig,
    /// Dashboard endpoint and datasource settings.
    pub dashboard:  DashboardConfig,
    /// Projects listed in the reviewer and merger rankings, in display order.
    pub projects:   Vec<ProjectConfig,>,
}

impl Default for InsightsConfig
{
    fn default() -> Self
    {
        Self {
            repository: RepositoryConfig::default(),
            github:     GithubConfig::default(),
            dashboard:  DashboardConfig::default(),
            projects:   default_projects(),
        }
    }
}

/// Repository tracked by the issue and pull request digests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default)]
pub struct RepositoryConfig
{
    /// Account owning the repository.
    pub owner:        String,
    /// Repository name.
    #[serde(alias = "repo")]
    pub name:         String,
    /// Heading printed above the repository digests.
    pub display_name: String,
}

impl RepositoryConfig
{
    /// Returns the `owner/name` slug used in search qualifiers and links.
    pub fn full_name(&self,) -> String
    {
        format!("{}/{}", self.owner, self.name)
    }
}

impl Default for RepositoryConfig
{
    fn default() -> Self
    {
        Self {
            owner:        DEFAULT_OWNER.to_owned(),
            name:         DEFAULT_REPOSITORY.to_owned(),
            display_name: DEFAULT_DISPLAY_NAME.to_owned(),
        }
    }
}

/// GitHub REST API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default)]
pub struct GithubConfig
{
    /// Base URL of the REST API.
    pub api_url: String,
}

impl Default for GithubConfig
{
    fn default() -> Self
    {
        Self {
            api_url: DEFAULT_GITHUB_API.to_owned(),
        }
    }
}

/// Dashboard backend and link settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default)]
pub struct DashboardConfig
{
    /// Base URL of the dashboard; queries go to `<url>/api/ds/query`.
    pub url:             String,
    /// Datasource uid placed in every query.
    pub datasource_uid:  String,
    /// Datasource plugin type placed in every query.
    pub datasource_type: String,
    /// Link printed with the top reviewers digest.
    pub reviewers_link:  String,
    /// Link printed with the top mergers digest.
    pub mergers_link:    String,
}

impl DashboardConfig
{
    /// Returns the datasource query endpoint.
    pub fn query_endpoint(&self,) -> String
    {
        format!("{}/api/ds/query", self.url.trim_end_matches('/'))
    }
}

impl Default for DashboardConfig
{
    fn default() -> Self
    {
        Self {
            url:             DEFAULT_DASHBOARD_URL.to_owned(),
            datasource_uid:  DEFAULT_DATASOURCE_UID.to_owned(),
            datasource_type: DEFAULT_DATASOURCE_TYPE.to_owned(),
            reviewers_link:  DEFAULT_REVIEWERS_LINK.to_owned(),
            mergers_link:    DEFAULT_MERGERS_LINK.to_owned(),
        }
    }
}

/// A project ranked in the reviewer and merger digests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
pub struct ProjectConfig
{
    /// Label printed before the project's ranking.
    pub display_name:     String,
    /// DevStats series holding per-user review counts.
    pub reviewers_series: String,
    /// DevStats series holding per-user merge counts.
    pub mergers_series:   String,
    /// Optional cap on the number of reviewers listed.
    #[serde(default)]
    pub reviewers_limit:  Option<usize,>,
}

fn default_projects() -> Vec<ProjectConfig,>
{
    vec![
        ProjectConfig {
            display_name:     "Argo CD".to_owned(),
            reviewers_series: "rev_per_usrargoprojargocd".to_owned(),
            mergers_series:   "hpr_mergersargocd".to_owned(),
            reviewers_limit:  Some(DEFAULT_REVIEWERS_LIMIT,),
        },
        ProjectConfig {
            display_name:     "Argo Rollouts".to_owned(),
            reviewers_series: "rev_per_usrargoprojargorollouts".to_owned(),
            mergers_series:   "hpr_mergersargoprojargorollouts".to_owned(),
            reviewers_limit:  None,
        },
    ]
}

impl InsightsConfig
{
    /// Checks the invariants the clients rely on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violated invariant.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        validate_identifier("repository.owner", &self.repository.owner,)?;
        validate_identifier("repository.name", &self.repository.name,)?;
        validate_non_empty("repository.display_name", &self.repository.display_name,)?;
        validate_url("github.api_url", &self.github.api_url,)?;
        validate_url("dashboard.url", &self.dashboard.url,)?;
        validate_non_empty("dashboard.datasource_uid", &self.dashboard.datasource_uid,)?;
        validate_non_empty("dashboard.datasource_type", &self.dashboard.datasource_type,)?;

        if self.projects.is_empty() {
            return Err(Error::validation("at least one project must be configured",),);
        }

        let series = Regex::new(SERIES_PATTERN,)
            .map_err(|e| Error::validation(format!("invalid series pattern: {e}"),),)?;

        for (index, project,) in self.projects.iter().enumerate() {
            validate_non_empty(&format!("projects[{index}].display_name"), &project.display_name,)?;
            for (field, value,) in [
                ("reviewers_series", &project.reviewers_series,),
                ("mergers_series", &project.mergers_series,),
            ] {
                if !series.is_match(value,) {
                    return Err(Error::validation(format!(
                        "projects[{index}].{field} must match {SERIES_PATTERN}, got '{value}'"
                    ),),);
                }
            }
            if project.reviewers_limit == Some(0,) {
                return Err(Error::validation(format!(
                    "projects[{index}].reviewers_limit must be greater than zero"
                ),),);
            }
        }

        Ok((),)
    }
}

fn validate_non_empty(field: &str, value: &str,) -> Result<(), Error,>
{
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty"),),);
    }
    Ok((),)
}

fn validate_identifier(field: &str, value: &str,) -> Result<(), Error,>
{
    validate_non_empty(field, value,)?;
    if value.chars().any(|c| c.is_whitespace() || c == '/',) {
        return Err(Error::validation(format!(
            "{field} cannot contain whitespace or '/', got '{value}'"
        ),),);
    }
    Ok((),)
}

fn validate_url(field: &str, value: &str,) -> Result<(), Error,>
{
    let url = Url::parse(value,)
        .map_err(|e| Error::validation(format!("{field} is not a valid URL: {e}"),),)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::validation(format!("{field} must use http or https"),),);
    }
    Ok((),)
}

/// Loads and validates the configuration from a YAML file.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the document violates invariants.
pub fn load_config(path: &Path,) -> Result<InsightsConfig, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_config(&contents,)
}

/// Parses and validates the configuration from a YAML document string.
///
/// An empty document yields the defaults.
///
/// # Errors
///
/// Propagates [`Error::Parse`] when the YAML cannot be decoded and
/// [`Error::Validation`] when invariants are violated.
pub fn parse_config(contents: &str,) -> Result<InsightsConfig, Error,>
{
    let config = if contents.trim().is_empty() {
        InsightsConfig::default()
    } else {
        serde_yaml::from_str::<InsightsConfig,>(contents,)?
    };
    config.validate()?;
    Ok(config,)
}

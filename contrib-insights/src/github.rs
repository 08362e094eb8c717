// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Issue and pull request counts through the GitHub search API.
///
/// Only the `total_count` reported by `GET /search/issues` is used; items are
/// never enumerated, so open and closed counts come from two independent
/// queries.
use octocrab::Octocrab;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::{GithubConfig, RepositoryConfig},
    error::Error,
};

/// Search route, relative to the API root so enterprise prefixes survive.
const SEARCH_ROUTE: &str = "search/issues";
/// Search items only need the count, so a single item per page suffices.
const SEARCH_PAGE_SIZE: &str = "1";

/// Kind of tracker item matched by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum ItemKind
{
    Issue,
    PullRequest,
}

impl ItemKind
{
    fn qualifier(self,) -> &'static str
    {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pr",
        }
    }
}

/// State of tracker item matched by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum ItemState
{
    Open,
    Closed,
}

impl ItemState
{
    fn qualifier(self,) -> &'static str
    {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Seam over the code-hosting search endpoint.
#[allow(async_fn_in_trait)]
pub trait IssueSearch
{
    /// Returns the total number of items matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failures or error statuses and
    /// [`Error::ResponseFormat`] when the response cannot be decoded.
    async fn count_matching(&self, query: &str,) -> Result<u64, Error,>;
}

#[derive(Debug, Deserialize,)]
struct SearchTotal
{
    total_count: u64,
}

/// [`IssueSearch`] backed by an [`Octocrab`] client.
#[derive(Clone,)]
pub struct GithubSearch
{
    octocrab:   Octocrab,
    search_url: Url,
}

impl GithubSearch
{
    /// Builds a search client for the configured API, authenticated when a
    /// token is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the API URL is rejected and
    /// [`Error::Network`] when the client cannot be initialized.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use contrib_insights::{GithubConfig, GithubSearch, IssueSearch};
    ///
    /// # async fn example() -> Result<(), contrib_insights::Error> {
    /// let search = GithubSearch::new(&GithubConfig::default(), None,)?;
    /// let open = search.count_matching("repo:argoproj/argo-cd is:issue is:open",).await?;
    /// println!("{open} open issues");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: &GithubConfig, token: Option<&str,>,) -> Result<Self, Error,>
    {
        let search_url = search_endpoint(&config.api_url,)?;
        let mut builder = Octocrab::builder()
            .base_uri(config.api_url.as_str(),)
            .map_err(|e| invalid_api_url(&config.api_url, &e,),)?;
        if let Some(token,) = token {
            builder = builder.personal_token(token,);
        }

        let octocrab = builder
            .build()
            .map_err(|e| {
                Error::network(format!("failed to initialize GitHub client: {}", summarize(&e)),)
            },)?;

        Ok(Self {
            octocrab,
            search_url,
        },)
    }
}

impl std::fmt::Debug for GithubSearch
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("GithubSearch",)
            .field("search_url", &self.search_url.as_str(),)
            .finish_non_exhaustive()
    }
}

impl IssueSearch for GithubSearch
{
    async fn count_matching(&self, query: &str,) -> Result<u64, Error,>
    {
        debug!("Searching GitHub: {}", query);

        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("q", query,).append_pair("per_page", SEARCH_PAGE_SIZE,);

        let response = self.octocrab._get(url.as_str(),).await.map_err(|e| {
            Error::network(format!("GitHub search '{query}' failed: {}", summarize(&e)),)
        },)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!("GitHub search '{query}' returned {status}"),),);
        }

        let body = self.octocrab.body_to_string(response,).await.map_err(|e| {
            Error::network(format!(
                "failed to read GitHub search response for '{query}': {}",
                summarize(&e)
            ),)
        },)?;
        let total: SearchTotal = serde_json::from_str(&body,).map_err(|e| {
            Error::response_format(format!("invalid search response for '{query}': {e}"),)
        },)?;

        Ok(total.total_count,)
    }
}

/// Resolves the search endpoint below the configured API root.
fn search_endpoint(api_url: &str,) -> Result<Url, Error,>
{
    let root = Url::parse(&format!("{}/", api_url.trim_end_matches('/')),)
        .map_err(|e| invalid_api_url(api_url, &e,),)?;
    root.join(SEARCH_ROUTE,).map_err(|e| invalid_api_url(api_url, &e,),)
}

fn invalid_api_url(api_url: &str, error: &dyn std::fmt::Display,) -> Error
{
    Error::validation(format!("invalid GitHub API URL '{api_url}': {}", summarize(error)),)
}

/// First line of a rendered error; octocrab appends a captured backtrace.
fn summarize(error: &dyn std::fmt::Display,) -> String
{
    error.to_string().lines().next().unwrap_or_default().to_owned()
}

/// Query for items of `kind` in `state` created within `from..to`.
pub fn created_query(
    repository: &RepositoryConfig,
    kind: ItemKind,
    state: ItemState,
    from: &str,
    to: &str,
) -> String
{
    format!(
        "repo:{} is:{} is:{} created:{from}..{to}",
        repository.full_name(),
        kind.qualifier(),
        state.qualifier()
    )
}

/// Query for open issues not updated since `before`.
pub fn stale_query(repository: &RepositoryConfig, before: &str,) -> String
{
    format!("repo:{} is:issue is:open updated:<{before}", repository.full_name())
}

async fn created_and_closed<S,>(
    search: &S,
    repository: &RepositoryConfig,
    kind: ItemKind,
    from: &str,
    to: &str,
) -> Result<(u64, u64,), Error,>
where
    S: IssueSearch,
{
    let open =
        search.count_matching(&created_query(repository, kind, ItemState::Open, from, to,),).await?;
    let closed = search
        .count_matching(&created_query(repository, kind, ItemState::Closed, from, to,),)
        .await?;
    Ok((open, closed,),)
}

/// Counts issues created within `from..to` as `(still open, closed)`.
///
/// # Errors
///
/// Propagates the first error from [`IssueSearch::count_matching`].
pub async fn created_and_closed_issues<S,>(
    search: &S,
    repository: &RepositoryConfig,
    from: &str,
    to: &str,
) -> Result<(u64, u64,), Error,>
where
    S: IssueSearch,
{
    created_and_closed(search, repository, ItemKind::Issue, from, to,).await
}

/// Counts pull requests created within `from..to` as `(still open, closed)`.
///
/// # Errors
///
/// Propagates the first error from [`IssueSearch::count_matching`].
pub async fn created_and_closed_prs<S,>(
    search: &S,
    repository: &RepositoryConfig,
    from: &str,
    to: &str,
) -> Result<(u64, u64,), Error,>
where
    S: IssueSearch,
{
    created_and_closed(search, repository, ItemKind::PullRequest, from, to,).await
}

/// Counts open issues without updates since `before`.
///
/// # Errors
///
/// Propagates the error from [`IssueSearch::count_matching`].
pub async fn stale_issues<S,>(
    search: &S,
    repository: &RepositoryConfig,
    before: &str,
) -> Result<u64, Error,>
where
    S: IssueSearch,
{
    search.count_matching(&stale_query(repository, before,),).await
}

#[cfg(test)]
mod tests
{
    use std::sync::Mutex;

    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;

    /// Answers queries from a fixed list and records what was asked.
    struct ScriptedSearch
    {
        answers: Mutex<Vec<Result<u64, Error,>,>,>,
        queries: Mutex<Vec<String,>,>,
    }

    impl ScriptedSearch
    {
        fn new(answers: Vec<Result<u64, Error,>,>,) -> Self
        {
            Self {
                answers: Mutex::new(answers,), queries: Mutex::new(Vec::new(),),
            }
        }
    }

    impl IssueSearch for ScriptedSearch
    {
        async fn count_matching(&self, query: &str,) -> Result<u64, Error,>
        {
            self.queries.lock().unwrap().push(query.to_owned(),);
            self.answers.lock().unwrap().remove(0,)
        }
    }

    fn github_config(url: &str,) -> GithubConfig
    {
        GithubConfig {
            api_url: url.to_owned(),
        }
    }

    #[test]
    fn created_query_matches_search_syntax()
    {
        let repository = RepositoryConfig::default();
        assert_eq!(
            created_query(
                &repository,
                ItemKind::PullRequest,
                ItemState::Closed,
                "2024-03-08",
                "2024-03-15",
            ),
            "repo:argoproj/argo-cd is:pr is:closed created:2024-03-08..2024-03-15"
        );
    }

    #[test]
    fn stale_query_matches_search_syntax()
    {
        let repository = RepositoryConfig::default();
        assert_eq!(
            stale_query(&repository, "2023-03-15",),
            "repo:argoproj/argo-cd is:issue is:open updated:<2023-03-15"
        );
    }

    #[tokio::test]
    async fn created_and_closed_issues_queries_open_then_closed()
    {
        let search = ScriptedSearch::new(vec![Ok(7,), Ok(3,)],);
        let counts = created_and_closed_issues(
            &search,
            &RepositoryConfig::default(),
            "2024-03-08",
            "2024-03-15",
        )
        .await
        .expect("counts",);

        assert_eq!(counts, (7, 3));
        assert_eq!(*search.queries.lock().unwrap(), vec![
            "repo:argoproj/argo-cd is:issue is:open created:2024-03-08..2024-03-15".to_owned(),
            "repo:argoproj/argo-cd is:issue is:closed created:2024-03-08..2024-03-15".to_owned(),
        ]);
    }

    #[tokio::test]
    async fn created_and_closed_prs_stops_at_first_error()
    {
        let search = ScriptedSearch::new(vec![Err(Error::network("boom",),), Ok(1,)],);
        let repository = RepositoryConfig::default();
        let error = created_and_closed_prs(&search, &repository, "2024-03-08", "2024-03-15",)
            .await
            .expect_err("expected error",);

        assert!(matches!(error, Error::Network { ref message } if message == "boom"));
        assert_eq!(search.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn count_matching_reads_total_count()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/search/issues",),)
            .and(query_param("q", "repo:argoproj/argo-cd is:issue is:open updated:<2023-03-15",),)
            .and(query_param("per_page", "1",),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(json!({
                "total_count": 412,
                "incomplete_results": false,
                "items": []
            }),),)
            .expect(1,)
            .mount(&server,)
            .await;

        let search = GithubSearch::new(&github_config(&server.uri(),), None,).expect("client",);
        let count = stale_issues(&search, &RepositoryConfig::default(), "2023-03-15",)
            .await
            .expect("count",);

        assert_eq!(count, 412);
    }

    #[tokio::test]
    async fn count_matching_rejects_missing_total()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/search/issues",),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(json!({ "items": [] }),),)
            .mount(&server,)
            .await;

        let search = GithubSearch::new(&github_config(&server.uri(),), None,).expect("client",);
        let error = search.count_matching("is:issue",).await.expect_err("expected format error",);

        assert!(matches!(error, Error::ResponseFormat { .. }));
    }

    #[tokio::test]
    async fn count_matching_maps_api_errors_to_network()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/search/issues",),)
            .respond_with(ResponseTemplate::new(422,).set_body_json(json!({
                "message": "Validation Failed",
                "documentation_url": "https://docs.github.com/rest/search/search"
            }),),)
            .mount(&server,)
            .await;

        let search = GithubSearch::new(&github_config(&server.uri(),), None,).expect("client",);
        let error =
            search.count_matching("is:nonsense",).await.expect_err("expected network error",);

        assert!(matches!(error, Error::Network { .. }));
    }

    #[tokio::test]
    async fn count_matching_maps_html_gateway_errors_to_network()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/search/issues",),)
            .respond_with(
                ResponseTemplate::new(502,)
                    .insert_header("content-type", "text/html",)
                    .set_body_string("<html>Bad Gateway</html>",),
            )
            .mount(&server,)
            .await;

        let search = GithubSearch::new(&github_config(&server.uri(),), None,).expect("client",);
        let error = search.count_matching("is:issue",).await.expect_err("expected network error",);

        match error {
            Error::Network {
                message,
            } => assert_eq!(message, "GitHub search 'is:issue' returned 502 Bad Gateway"),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn count_matching_reports_transport_errors_on_one_line()
    {
        let search =
            GithubSearch::new(&github_config("http://127.0.0.1:1",), None,).expect("client",);
        let error = search.count_matching("is:issue",).await.expect_err("expected network error",);

        match error {
            Error::Network {
                message,
            } => {
                assert!(message.starts_with("GitHub search 'is:issue' failed: "));
                assert!(!message.contains('\n'), "multi-line message: {message}");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn search_endpoint_keeps_enterprise_prefix()
    {
        let url = search_endpoint("https://ghe.example.com/api/v3/",).expect("valid URL",);
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/search/issues");

        let url = search_endpoint("https://api.github.com",).expect("valid URL",);
        assert_eq!(url.as_str(), "https://api.github.com/search/issues");
    }

    #[test]
    fn summarize_drops_trailing_backtrace()
    {
        let rendered = "Hyper Error: connection refused\n\nFound at\n   0: frame";
        assert_eq!(summarize(&rendered,), "Hyper Error: connection refused");
    }

    #[test]
    fn new_rejects_unparseable_api_url()
    {
        let error = GithubSearch::new(&github_config("not a url",), None,)
            .expect_err("expected validation error",);
        assert!(matches!(error, Error::Validation { .. }));
    }
}

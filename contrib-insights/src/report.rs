// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Sequential report runner and output formatting.

use std::io::Write;

use crate::{
    config::RepositoryConfig,
    dashboard::DashboardQuery,
    digest::{Digest, DigestGenerator, DigestKind},
    error::Error,
    github::IssueSearch,
};

/// How digests are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default,)]
pub enum OutputFormat
{
    /// Section headings, then summary and link lines.
    #[default]
    Text,
    /// One JSON object per digest per line.
    Json,
}

/// Heading printed before a digest in text output, if any.
pub fn section_heading(kind: DigestKind, repository: &RepositoryConfig,) -> Option<String,>
{
    match kind {
        DigestKind::CreatedIssues => Some(format!(" - {}:", repository.display_name),),
        DigestKind::TopReviewers => Some(" - Top Reviewers:".to_owned(),),
        DigestKind::TopMergers => Some(" - Top Mergers:".to_owned(),),
        DigestKind::CreatedPullRequests | DigestKind::StaleIssues => None,
    }
}

/// Writes one digest and flushes the writer.
///
/// # Errors
///
/// Returns [`Error::Output`] when writing fails and [`Error::Serialize`] when
/// JSON encoding fails.
pub fn write_digest<W: Write,>(
    writer: &mut W,
    repository: &RepositoryConfig,
    digest: &Digest,
    format: OutputFormat,
) -> Result<(), Error,>
{
    match format {
        OutputFormat::Text => {
            if let Some(heading,) = section_heading(digest.kind, repository,) {
                writeln!(writer, "{heading}")?;
            }
            writeln!(writer, "{}", digest.summary)?;
            writeln!(writer, "{}", digest.link)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, digest,)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    Ok((),)
}

/// Builds and writes every digest in [`DigestKind::ALL`] order.
///
/// Each digest is written as soon as it is built. The first error aborts the
/// run, so later digests are neither built nor written.
///
/// # Errors
///
/// Propagates the first digest or output error unchanged.
pub async fn run_report<S, D, W,>(
    generator: &DigestGenerator<'_, S, D,>,
    writer: &mut W,
    format: OutputFormat,
) -> Result<(), Error,>
where
    S: IssueSearch,
    D: DashboardQuery,
    W: Write,
{
    for kind in DigestKind::ALL {
        let digest = generator.generate(kind,).await?;
        write_digest(writer, &generator.config().repository, &digest, format,)?;
    }

    Ok((),)
}

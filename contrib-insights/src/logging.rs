// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Diagnostic logging setup.
//!
//! Logs go to stderr so that stdout carries only the report.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn";
/// Filter applied for `--verbose` when `RUST_LOG` is unset.
const VERBOSE_FILTER: &str = "contrib_insights=debug,warn";

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`. Does nothing when a global
/// subscriber is already installed.
pub fn init_tracing(verbose: bool,)
{
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback,),);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter,)
        .with_writer(std::io::stderr,)
        .with_target(false,)
        .try_init();
}

#[cfg(test)]
mod tests
{
    use super::init_tracing;

    #[test]
    fn repeated_initialization_is_harmless()
    {
        init_tracing(false,);
        init_tracing(true,);
        tracing::debug!("subscriber installed");
    }
}

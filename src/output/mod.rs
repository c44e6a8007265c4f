//! Rendering of collected PRs and stored providers

mod table;

pub use table::{SEPARATOR_LENGTH, render_table, to_printable, wrap_text};

use crate::error::{Error, Result};
use crate::platform::Transform;
use crate::types::{Provider, PullRequest, PullRequestResponse};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

/// Message printed when no PR matched
pub const NO_PRS: &str = "No PRs found!";

/// Message printed when no provider matched
pub const NO_PROVIDERS: &str = "No providers found!";

/// Output format for `list prs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width table
    #[default]
    Table,
    /// JSON array of PRs
    Json,
    /// YAML sequence of PRs
    Yaml,
}

/// Transform producing the table projection of each PR
pub fn printable_transform() -> Transform {
    Arc::new(to_printable)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| Error::Output(format!("failed to convert PRs to json: {e}")))?;
    String::from_utf8(buf).map_err(|e| Error::Output(e.to_string()))
}

/// Render PRs in `format`
///
/// Responses are rendered in display order whatever order they arrive in.
pub fn render_pull_requests(
    responses: &[PullRequestResponse],
    format: OutputFormat,
) -> Result<String> {
    if responses.is_empty() {
        return Ok(format!("{NO_PRS}\n"));
    }

    let mut raw: Vec<&PullRequest> = responses.iter().map(|r| &r.pr).collect();
    raw.sort_by(|a, b| crate::types::compare_pull_requests(a, b));

    match format {
        OutputFormat::Table => {
            let printable: Vec<_> = responses.iter().map(|r| r.printable.clone()).collect();
            Ok(render_table(&printable))
        }
        OutputFormat::Json => Ok(format!("{}\n", to_json(&raw)?)),
        OutputFormat::Yaml => serde_yaml::to_string(&raw)
            .map_err(|e| Error::Output(format!("failed to convert PRs to yaml: {e}"))),
    }
}

/// Render the provider list
pub fn render_providers(providers: &[Provider]) -> String {
    if providers.is_empty() {
        return format!("{NO_PROVIDERS}\n");
    }

    let mut out = format!("{:<4}\t{:<10}\t{:<10}\t{:<20}\n", "#", "Name", "Type", "Host");
    for (index, provider) in providers.iter().enumerate() {
        let _ = writeln!(
            out,
            "{index:<4}\t{:<10}\t{:<10}\t{:<20}",
            provider.name,
            provider.provider_type.as_str(),
            provider.host
        );
    }
    out
}

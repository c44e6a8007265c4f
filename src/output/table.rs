//! Fixed-width PR table

use crate::types::{PrintablePullRequest, PullRequest, compare_printable};
use std::fmt::Write;

const WIDTH_INDEX: usize = 4;
const WIDTH_TITLE: usize = 34;
const WIDTH_NUMBER: usize = 10;
const WIDTH_PROVIDER: usize = 10;
const WIDTH_STATE: usize = 10;
const WIDTH_MERGEABLE: usize = 10;
const WIDTH_APPROVED: usize = 17;
const WIDTH_COMMENTED: usize = 17;
const WIDTH_REQUESTED: usize = 17;
const WIDTH_URL: usize = 34;

/// Column widths in display order
const WIDTHS: [usize; 10] = [
    WIDTH_INDEX,
    WIDTH_TITLE,
    WIDTH_NUMBER,
    WIDTH_PROVIDER,
    WIDTH_STATE,
    WIDTH_MERGEABLE,
    WIDTH_APPROVED,
    WIDTH_COMMENTED,
    WIDTH_REQUESTED,
    WIDTH_URL,
];

const HEADERS: [&str; 10] = [
    "#",
    "Title",
    "PR Number",
    "SCM Name",
    "State",
    "Mergeable",
    "Approved",
    "Commented",
    "Requested Changes",
    "URL",
];

/// Separator length: every column plus its `| ` and ` ` padding, plus the closing `|`
pub const SEPARATOR_LENGTH: usize = 31
    + WIDTH_INDEX
    + WIDTH_TITLE
    + WIDTH_NUMBER
    + WIDTH_PROVIDER
    + WIDTH_STATE
    + WIDTH_MERGEABLE
    + WIDTH_APPROVED
    + WIDTH_COMMENTED
    + WIDTH_REQUESTED
    + WIDTH_URL;

/// Split `text` into chunks of at most `width` characters
///
/// Empty text yields no chunks.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn wrap_names<'a>(names: impl IntoIterator<Item = &'a String>, width: usize) -> Vec<String> {
    let joined = names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    wrap_text(&joined, width)
}

/// Project a PR into its wrapped table form
pub fn to_printable(pr: &PullRequest) -> PrintablePullRequest {
    let mut printable = PrintablePullRequest {
        number_raw: pr.number,
        provider_type_raw: Some(pr.provider_type),
        provider_name_raw: pr.provider_name.clone(),
        url_raw: pr.url.clone(),
        number: wrap_text(&pr.number.to_string(), WIDTH_NUMBER),
        title: wrap_text(&pr.title, WIDTH_TITLE),
        provider_name: wrap_text(&pr.provider_name, WIDTH_PROVIDER),
        state: wrap_text(&pr.state, WIDTH_STATE),
        mergeable: wrap_text(pr.mergeable.as_str(), WIDTH_MERGEABLE),
        approved: wrap_names(&pr.approved, WIDTH_APPROVED),
        commented: wrap_names(&pr.commented, WIDTH_COMMENTED),
        requested_changes: wrap_names(&pr.requested_changes, WIDTH_REQUESTED),
        url: wrap_text(&pr.url, WIDTH_URL),
        max_rows: 0,
    };
    printable.max_rows = [
        printable.number.len(),
        printable.title.len(),
        printable.provider_name.len(),
        printable.state.len(),
        printable.mergeable.len(),
        printable.approved.len(),
        printable.commented.len(),
        printable.requested_changes.len(),
        printable.url.len(),
    ]
    .into_iter()
    .max()
    .unwrap_or(0);
    printable
}

fn separator(out: &mut String) {
    out.push_str(&"-".repeat(SEPARATOR_LENGTH));
    out.push('\n');
}

fn row(out: &mut String, cells: [&str; 10]) {
    for (cell, width) in cells.iter().zip(WIDTHS) {
        let _ = write!(out, "| {cell:<width$} ");
    }
    out.push_str("|\n");
}

fn line(cells: &[String], i: usize) -> &str {
    cells.get(i).map_or("", String::as_str)
}

/// Render printable PRs as a table, in display order
///
/// Rows are numbered from 0; a PR whose cells wrap spans several lines.
pub fn render_table(prs: &[PrintablePullRequest]) -> String {
    let mut sorted: Vec<&PrintablePullRequest> = prs.iter().collect();
    sorted.sort_by(|a, b| compare_printable(a, b));

    let mut out = String::new();
    separator(&mut out);
    row(&mut out, HEADERS);
    separator(&mut out);

    for (index, pr) in sorted.into_iter().enumerate() {
        let index = index.to_string();
        for i in 0..pr.max_rows {
            row(
                &mut out,
                [
                    if i == 0 { index.as_str() } else { "" },
                    line(&pr.title, i),
                    line(&pr.number, i),
                    line(&pr.provider_name, i),
                    line(&pr.state, i),
                    line(&pr.mergeable, i),
                    line(&pr.approved, i),
                    line(&pr.commented, i),
                    line(&pr.requested_changes, i),
                    line(&pr.url, i),
                ],
            );
        }
        separator(&mut out);
    }
    out
}

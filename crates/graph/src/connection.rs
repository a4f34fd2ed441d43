//! Cursor pagination over an ordered, in-memory sequence.
//!
//! Cursors encode an element's index in the full sequence. Windows are
//! recomputed on every call; nothing is cached between requests.
//!
//! ```text
//! start = after + 1 (if after is a valid cursor)   else 0
//! end   = before    (if before is a valid cursor)  else N
//! first → end   = min(end, start + first)          (first wins over last)
//! last  → start = max(start, end - last)
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use treasure_core::{GraphError, GraphResult};

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Pagination arguments. `first`/`last` are signed so that negative input
/// can be rejected instead of silently wrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionArgs {
    pub first: Option<i64>,
    pub after: Option<String>,
    pub last: Option<i64>,
    pub before: Option<String>,
}

impl ConnectionArgs {
    pub fn first(n: i64) -> Self {
        Self {
            first: Some(n),
            ..Default::default()
        }
    }

    pub fn last(n: i64) -> Self {
        Self {
            last: Some(n),
            ..Default::default()
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }
}

pub fn offset_to_cursor(offset: usize) -> String {
    STANDARD.encode(format!("{CURSOR_PREFIX}{offset}"))
}

/// `None` for anything that is not a cursor produced by [`offset_to_cursor`].
pub fn cursor_to_offset(cursor: &str) -> Option<usize> {
    let bytes = STANDARD.decode(cursor).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.strip_prefix(CURSOR_PREFIX)?.parse().ok()
}

fn non_negative(name: &str, value: Option<i64>) -> GraphResult<Option<usize>> {
    match value {
        None => Ok(None),
        Some(n) if n < 0 => Err(GraphError::invalid_argument(format!(
            "argument \"{name}\" must be a non-negative integer, got {n}"
        ))),
        Some(n) => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
    }
}

/// Build a window over `items` according to `args`.
///
/// Cursors that do not decode are ignored. Decoded offsets are clamped to
/// the sequence, so a cursor past the end yields an empty window.
pub fn connection_from_slice<T: Clone>(
    items: &[T],
    args: &ConnectionArgs,
) -> GraphResult<Connection<T>> {
    let len = items.len();
    let first = non_negative("first", args.first)?;
    let last = non_negative("last", args.last)?;

    let after = args.after.as_deref().and_then(cursor_to_offset);
    let before = args.before.as_deref().and_then(cursor_to_offset);

    let lower = after.map_or(0, |o| o.saturating_add(1).min(len));
    let upper = before.map_or(len, |o| o.min(len));
    let mut start = lower;
    let mut end = upper;

    let mut last_applied = false;
    if let Some(first) = first {
        end = end.min(start.saturating_add(first));
    } else if let Some(last) = last {
        start = start.max(end.saturating_sub(last));
        last_applied = true;
    }

    let edges: Vec<Edge<T>> = if start < end {
        items[start..end]
            .iter()
            .enumerate()
            .map(|(i, node)| Edge {
                cursor: offset_to_cursor(start + i),
                node: node.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let page_info = PageInfo {
        has_next_page: first.is_some() && end < upper,
        has_previous_page: last_applied && start > lower,
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
    };

    Ok(Connection { edges, page_info })
}

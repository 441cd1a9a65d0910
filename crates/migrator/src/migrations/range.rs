//! Migration ranges
//!
//! A range token selects one migration (`"name"`) or a contiguous span
//! (`"first..last"`) of an ordered migration set. Boundaries are matched by
//! substring, so a short fragment such as `"users"` is enough to pick
//! `20240101120000_create_users.sql`. When several names contain the fragment,
//! the first one in traversal order wins.

use super::definitions::Migration;
use crate::error::{MigratorError, MigratorResult};

/// Separator between the two boundaries of a range token
pub const RANGE_SEPARATOR: &str = "..";

/// A parsed range token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRange {
    start: String,
    end: Option<String>,
}

impl MigrationRange {
    /// Parse a range token.
    ///
    /// The first two separated parts are the boundaries, anything after a
    /// second separator is ignored. An empty end boundary (`"name.."`) is the
    /// same as no end boundary.
    pub fn parse(token: &str) -> Self {
        let mut parts = token.split(RANGE_SEPARATOR);
        let start = parts.next().unwrap_or_default();
        let end = parts.next().filter(|end| !end.is_empty());

        Self {
            start: start.to_string(),
            end: end.map(str::to_string),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    /// True when the range selects nothing
    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    /// True when the range selects a single migration
    pub fn is_single(&self) -> bool {
        match &self.end {
            None => true,
            Some(end) => *end == self.start,
        }
    }

    /// Select the migrations of `ordered` that fall inside this range.
    ///
    /// `ordered` must already be in traversal order (ascending to apply,
    /// descending to roll back). Boundaries are matched in token order along
    /// that traversal; the resolver never swaps them. Fails with
    /// [`MigratorError::NotFound`] when the start boundary matches nothing, or
    /// when an end boundary is given but nothing after the start matches it.
    pub fn resolve(&self, ordered: Vec<Migration>) -> MigratorResult<Vec<Migration>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut migrations = ordered.into_iter();

        let first = migrations
            .by_ref()
            .find(|migration| migration.name().contains(&self.start))
            .ok_or_else(|| MigratorError::NotFound {
                name: self.start.clone(),
            })?;

        let mut selected = vec![first];
        if self.is_single() {
            return Ok(selected);
        }

        let end = self.end.as_deref().unwrap_or_default();
        for migration in migrations {
            let reached = migration.name().contains(end);
            selected.push(migration);
            if reached {
                return Ok(selected);
            }
        }

        Err(MigratorError::NotFound {
            name: end.to_string(),
        })
    }
}

impl std::fmt::Display for MigrationRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.end {
            Some(end) => write!(f, "{}{}{}", self.start, RANGE_SEPARATOR, end),
            None => write!(f, "{}", self.start),
        }
    }
}

impl From<&str> for MigrationRange {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}

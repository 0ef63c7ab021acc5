//! Hash joins between tables.

use std::collections::HashMap;

use crate::{Table, TableError, Value, value::ValueKey};

/// Which unmatched rows survive a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only rows with a match on both sides.
    Inner,
    /// Every left row; unmatched right cells are null.
    Left,
    /// Every row from either side.
    Outer,
}

/// Description of a join between two tables.
#[derive(Debug, Clone, Copy)]
pub struct JoinSpec<'a> {
    /// Key columns of the left table.
    pub left_on: &'a [&'a str],
    /// Key columns of the right table, positionally paired with `left_on`.
    pub right_on: &'a [&'a str],
    /// Join flavour.
    pub how: JoinKind,
    /// Suffixes appended to non-key columns present on both sides.
    pub suffixes: (&'a str, &'a str),
}

impl<'a> JoinSpec<'a> {
    /// Join on columns that share their names on both sides.
    #[must_use]
    pub const fn on(keys: &'a [&'a str], how: JoinKind) -> Self {
        Self {
            left_on: keys,
            right_on: keys,
            how,
            suffixes: ("_x", "_y"),
        }
    }

    /// Join on differently named key columns.
    #[must_use]
    pub const fn between(left_on: &'a [&'a str], right_on: &'a [&'a str], how: JoinKind) -> Self {
        Self {
            left_on,
            right_on,
            how,
            suffixes: ("_x", "_y"),
        }
    }

    /// Override the collision suffixes.
    #[must_use]
    pub const fn with_suffixes(mut self, left: &'a str, right: &'a str) -> Self {
        self.suffixes = (left, right);
        self
    }
}

/// Matched row indices, one entry per output row.
pub(crate) type RowPairs = Vec<(Option<usize>, Option<usize>)>;

impl Table {
    /// Join `self` (left) with `right` according to `spec`.
    ///
    /// Key columns shared by name are emitted once; other columns present on
    /// both sides receive the configured suffixes. Null keys never match.
    ///
    /// # Errors
    ///
    /// Fails when a key column is missing or the key lists differ in length.
    pub fn merge(&self, right: &Self, spec: &JoinSpec<'_>) -> Result<Self, TableError> {
        let pairs = self.join_pairs(right, spec)?;
        self.assemble(right, spec, &pairs)
    }

    pub(crate) fn join_pairs(
        &self,
        right: &Self,
        spec: &JoinSpec<'_>,
    ) -> Result<RowPairs, TableError> {
        if spec.left_on.len() != spec.right_on.len() {
            return Err(TableError::KeyArity {
                left: spec.left_on.len(),
                right: spec.right_on.len(),
            });
        }
        let left_keys = row_keys(self, spec.left_on)?;
        let right_keys = row_keys(right, spec.right_on)?;

        let mut index: HashMap<&[ValueKey], Vec<usize>> = HashMap::new();
        for (row, key) in right_keys.iter().enumerate() {
            if let Some(key) = key {
                index.entry(key.as_slice()).or_default().push(row);
            }
        }

        let mut pairs = Vec::new();
        let mut right_matched = vec![false; right.height()];
        for (left_row, key) in left_keys.iter().enumerate() {
            let matches = key
                .as_ref()
                .and_then(|key| index.get(key.as_slice()))
                .filter(|rows| !rows.is_empty());
            match matches {
                Some(rows) => {
                    for right_row in rows {
                        right_matched[*right_row] = true;
                        pairs.push((Some(left_row), Some(*right_row)));
                    }
                }
                None if spec.how != JoinKind::Inner => pairs.push((Some(left_row), None)),
                None => {}
            }
        }
        if spec.how == JoinKind::Outer {
            for (right_row, matched) in right_matched.iter().enumerate() {
                if !matched {
                    pairs.push((None, Some(right_row)));
                }
            }
        }
        Ok(pairs)
    }

    pub(crate) fn assemble(
        &self,
        right: &Self,
        spec: &JoinSpec<'_>,
        pairs: &RowPairs,
    ) -> Result<Self, TableError> {
        let shared: Vec<&str> = spec
            .left_on
            .iter()
            .zip(spec.right_on)
            .filter(|(left, right)| left == right)
            .map(|(left, _)| *left)
            .collect();
        let right_emitted: Vec<&str> = right
            .column_names()
            .into_iter()
            .filter(|name| !shared.contains(name))
            .collect();
        let left_names = self.column_names();
        let collides = |name: &str| {
            !shared.contains(&name) && left_names.contains(&name) && right_emitted.contains(&name)
        };

        let mut output = Self::with_height(pairs.len());
        for name in &left_names {
            let values: Vec<Value> = if shared.contains(name) {
                pairs
                    .iter()
                    .map(|(left_row, right_row)| match (left_row, right_row) {
                        (Some(row), _) => cell(self, *row, name),
                        (None, Some(row)) => cell(right, *row, name),
                        (None, None) => Value::Null,
                    })
                    .collect()
            } else {
                pairs
                    .iter()
                    .map(|(left_row, _)| left_row.map_or(Value::Null, |row| cell(self, row, name)))
                    .collect()
            };
            let output_name = if collides(*name) {
                format!("{name}{}", spec.suffixes.0)
            } else {
                (*name).to_owned()
            };
            output.push_column(output_name, values)?;
        }
        for name in &right_emitted {
            let values = pairs
                .iter()
                .map(|(_, right_row)| right_row.map_or(Value::Null, |row| cell(right, row, name)))
                .collect();
            let output_name = if collides(*name) {
                format!("{name}{}", spec.suffixes.1)
            } else {
                (*name).to_owned()
            };
            output.push_column(output_name, values)?;
        }
        Ok(output)
    }
}

fn cell(table: &Table, row: usize, name: &str) -> Value {
    table.get(row, name).cloned().unwrap_or_default()
}

fn row_keys(table: &Table, names: &[&str]) -> Result<Vec<Option<Vec<ValueKey>>>, TableError> {
    let columns = names
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((0..table.height())
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    let value = &column[row];
                    (!value.is_null()).then(|| value.key())
                })
                .collect::<Option<Vec<_>>>()
        })
        .collect())
}

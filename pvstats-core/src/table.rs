//! Column-major in-memory table.

use std::collections::{BTreeMap, HashSet};

use crate::{NumericKind, TableError, Value};

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    /// Construct a column from a name and its cells.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column cells in row order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Ordered set of equally sized, uniquely named columns.
///
/// # Examples
///
/// ```
/// use pvstats_core::{Table, Value};
///
/// # fn main() -> Result<(), pvstats_core::TableError> {
/// let table = Table::from_columns(vec![
///     ("municipio".to_owned(), vec![Value::from("Alcorcón"), Value::from("Getafe")]),
///     ("superficie_km2".to_owned(), vec![Value::from(33.7), Value::from(78.4)]),
/// ])?;
/// assert_eq!(table.height(), 2);
/// assert_eq!(table.column_names(), vec!["municipio", "superficie_km2"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    height: usize,
}

impl Table {
    /// An empty table with no columns and no rows.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
            height: 0,
        }
    }

    /// A table with `height` rows and no columns yet.
    #[must_use]
    pub const fn with_height(height: usize) -> Self {
        Self {
            columns: Vec::new(),
            height,
        }
    }

    /// Build a table from `(name, cells)` pairs.
    ///
    /// # Errors
    ///
    /// Fails on duplicate names or columns of differing length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, TableError> {
        let height = columns.first().map_or(0, |(_, values)| values.len());
        let mut table = Self::with_height(height);
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Build a table from a header and row-major records.
    ///
    /// Short records are padded with [`Value::Null`]; surplus cells are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Fails when the header contains duplicates.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut buffers: Vec<Vec<Value>> = header
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        let height = rows.len();
        for row in rows {
            let mut cells = row.into_iter();
            for buffer in &mut buffers {
                buffer.push(cells.next().unwrap_or_default());
            }
        }
        let mut table = Self::with_height(height);
        for (name, values) in header.into_iter().zip(buffers) {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.height == 0
    }

    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Whether a column named `name` exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    fn require(&self, name: &str) -> Result<usize, TableError> {
        self.position(name).ok_or_else(|| TableError::MissingColumn {
            name: name.to_owned(),
        })
    }

    /// Cells of the column named `name`.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn column(&self, name: &str) -> Result<&[Value], TableError> {
        let index = self.require(name)?;
        Ok(&self.columns[index].values)
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Vec<Value>, TableError> {
        let index = self.require(name)?;
        Ok(&mut self.columns[index].values)
    }

    /// Cell at `row` in column `name`, if both exist.
    #[must_use]
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.position(name)
            .and_then(|index| self.columns[index].values.get(row))
    }

    /// Cells of row `row` in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &Value> + '_ {
        self.columns
            .iter()
            .filter_map(move |column| column.values.get(row))
    }

    /// Append a new column.
    ///
    /// A table without columns adopts the length of the first column pushed.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name or a length mismatch.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn { name });
        }
        if self.columns.is_empty() && self.height == 0 {
            self.height = values.len();
        }
        if values.len() != self.height {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.height,
                found: values.len(),
            });
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Replace the cells of `name`, appending the column when absent.
    ///
    /// # Errors
    ///
    /// Fails on a length mismatch.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<(), TableError> {
        let name = name.into();
        match self.position(&name) {
            Some(index) => {
                if values.len() != self.height {
                    return Err(TableError::LengthMismatch {
                        name,
                        expected: self.height,
                        found: values.len(),
                    });
                }
                self.columns[index].values = values;
                Ok(())
            }
            None => self.push_column(name, values),
        }
    }

    /// Remove the named columns.
    ///
    /// # Errors
    ///
    /// Fails when any of the names is absent; the table is left untouched.
    pub fn drop_columns(&mut self, names: &[&str]) -> Result<(), TableError> {
        for name in names {
            self.require(name)?;
        }
        self.columns
            .retain(|column| !names.contains(&column.name.as_str()));
        Ok(())
    }

    /// New table holding only `names`, in that order.
    ///
    /// # Errors
    ///
    /// Fails when any of the names is absent.
    pub fn select(&self, names: &[&str]) -> Result<Self, TableError> {
        let mut selected = Self::with_height(self.height);
        for name in names {
            let index = self.require(name)?;
            selected.push_column(*name, self.columns[index].values.clone())?;
        }
        Ok(selected)
    }

    /// New table holding the first `count` columns.
    #[must_use]
    pub fn head_columns(&self, count: usize) -> Self {
        Self {
            columns: self.columns.iter().take(count).cloned().collect(),
            height: self.height,
        }
    }

    /// Rename columns according to `mapping`; names not in the mapping stay.
    ///
    /// # Errors
    ///
    /// Fails when a rename would produce a duplicate column name.
    pub fn rename(&mut self, mapping: &BTreeMap<String, String>) -> Result<(), TableError> {
        let renamed: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                mapping
                    .get(&column.name)
                    .cloned()
                    .unwrap_or_else(|| column.name.clone())
            })
            .collect();
        let mut seen = HashSet::new();
        for name in &renamed {
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn { name: name.clone() });
            }
        }
        for (column, name) in self.columns.iter_mut().zip(renamed) {
            column.name = name;
        }
        Ok(())
    }

    /// Rows for which `mask` is `true`.
    ///
    /// # Errors
    ///
    /// Fails when the mask length differs from the table height.
    pub fn filter(&self, mask: &[bool]) -> Result<Self, TableError> {
        if mask.len() != self.height {
            return Err(TableError::LengthMismatch {
                name: "mask".to_owned(),
                expected: self.height,
                found: mask.len(),
            });
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(index, keep)| keep.then_some(index))
            .collect();
        Ok(self.take(&indices))
    }

    /// Rows at `indices`, in that order. Out-of-range indices yield nulls.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                values: indices
                    .iter()
                    .map(|index| column.values.get(*index).cloned().unwrap_or_default())
                    .collect(),
            })
            .collect();
        Self {
            columns,
            height: indices.len(),
        }
    }

    /// Mask of rows whose `name` cell equals any of `candidates`.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn is_in(&self, name: &str, candidates: &[Value]) -> Result<Vec<bool>, TableError> {
        let keys: HashSet<_> = candidates.iter().map(Value::key).collect();
        Ok(self
            .column(name)?
            .iter()
            .map(|value| keys.contains(&value.key()))
            .collect())
    }

    /// Apply `transform` to every cell of `name`.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn transform<F>(&mut self, name: &str, transform: F) -> Result<(), TableError>
    where
        F: FnMut(&Value) -> Value,
    {
        let column = self.column_mut(name)?;
        *column = column.iter().map(transform).collect();
        Ok(())
    }

    /// Trim surrounding whitespace from text cells of `name`.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn strip(&mut self, name: &str) -> Result<(), TableError> {
        self.transform(name, |value| match value {
            Value::Text(text) => Value::Text(text.trim().to_owned()),
            other => other.clone(),
        })
    }

    /// Convert `name` to `kind`, failing on the first unparsable cell.
    ///
    /// # Errors
    ///
    /// Fails when the column is missing or holds a non-numeric value.
    pub fn coerce_numeric(&mut self, name: &str, kind: NumericKind) -> Result<(), TableError> {
        let column = self.column_mut(name)?;
        let mut converted = Vec::with_capacity(column.len());
        for (row, value) in column.iter().enumerate() {
            let cell = value.to_numeric(kind).ok_or_else(|| TableError::NotNumeric {
                column: name.to_owned(),
                row,
                value: value.clone(),
            })?;
            converted.push(cell);
        }
        *column = converted;
        Ok(())
    }

    /// Convert `name` to `kind`, turning unparsable cells into nulls.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn coerce_numeric_lenient(
        &mut self,
        name: &str,
        kind: NumericKind,
    ) -> Result<(), TableError> {
        self.transform(name, |value| value.to_numeric(kind).unwrap_or_default())
    }

    /// Replace the text of `name` through `mapping`; unmapped cells become null.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn map_values(
        &mut self,
        name: &str,
        mapping: &BTreeMap<String, String>,
    ) -> Result<(), TableError> {
        self.transform(name, |value| {
            let key = value.to_string();
            mapping
                .get(&key)
                .map_or(Value::Null, |mapped| Value::Text(mapped.clone()))
        })
    }

    /// Numeric view of `name`; non-numeric cells are `None`.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn float_column(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        Ok(self.column(name)?.iter().map(Value::as_f64).collect())
    }

    /// Combine two numeric columns cell by cell; nulls propagate.
    ///
    /// Non-finite results (division by zero) become nulls.
    ///
    /// # Errors
    ///
    /// Fails when either column does not exist.
    pub fn zip_f64<F>(&self, left: &str, right: &str, combine: F) -> Result<Vec<Value>, TableError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let lhs = self.float_column(left)?;
        let rhs = self.float_column(right)?;
        Ok(lhs
            .into_iter()
            .zip(rhs)
            .map(|pair| match pair {
                (Some(a), Some(b)) => finite(combine(a, b)),
                _ => Value::Null,
            })
            .collect())
    }

    /// Apply `map` to a numeric column; nulls propagate.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn map_f64<F>(&self, name: &str, map: F) -> Result<Vec<Value>, TableError>
    where
        F: Fn(f64) -> f64,
    {
        Ok(self
            .float_column(name)?
            .into_iter()
            .map(|cell| cell.map_or(Value::Null, |value| finite(map(value))))
            .collect())
    }

    /// Stack tables vertically.
    ///
    /// Columns are unioned in first-appearance order; cells missing from a
    /// table are null.
    #[must_use]
    pub fn concat(tables: &[Self]) -> Self {
        let mut names: Vec<&str> = Vec::new();
        for table in tables {
            for column in &table.columns {
                if !names.contains(&column.name.as_str()) {
                    names.push(column.name.as_str());
                }
            }
        }
        let height = tables.iter().map(Self::height).sum();
        let columns = names
            .iter()
            .map(|name| {
                let mut values = Vec::with_capacity(height);
                for table in tables {
                    match table.position(name) {
                        Some(index) => values.extend(table.columns[index].values.iter().cloned()),
                        None => values.extend(std::iter::repeat_n(Value::Null, table.height)),
                    }
                }
                Column::new(*name, values)
            })
            .collect();
        Self { columns, height }
    }
}

fn finite(value: f64) -> Value {
    if value.is_finite() {
        Value::Float(value)
    } else {
        Value::Null
    }
}

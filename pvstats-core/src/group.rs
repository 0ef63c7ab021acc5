//! Group-by aggregation.

use std::collections::HashMap;

use crate::{Table, TableError, Value, value::ValueKey};

impl Table {
    /// Group rows by `keys` and sum `value` within each group.
    ///
    /// Groups appear in order of first occurrence. Null and non-numeric cells
    /// of `value` are skipped; a group with only such cells sums to `0`.
    /// Integer columns stay integers, anything else sums as floats. Rows with
    /// a null key are dropped.
    ///
    /// # Errors
    ///
    /// Fails when a key or the value column is missing.
    pub fn group_sum(&self, keys: &[&str], value: &str) -> Result<Self, TableError> {
        let key_columns = keys
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let values = self.column(value)?;
        let integral = values
            .iter()
            .all(|cell| matches!(cell, Value::Int(_) | Value::Null));

        let mut order: Vec<usize> = Vec::new();
        let mut groups: HashMap<Vec<ValueKey>, usize> = HashMap::new();
        let mut int_sums: Vec<i64> = Vec::new();
        let mut float_sums: Vec<f64> = Vec::new();

        for (row, cell) in values.iter().enumerate() {
            let key: Option<Vec<ValueKey>> = key_columns
                .iter()
                .map(|column| {
                    let value = &column[row];
                    (!value.is_null()).then(|| value.key())
                })
                .collect();
            let Some(key) = key else { continue };
            let slot = *groups.entry(key).or_insert_with(|| {
                order.push(row);
                int_sums.push(0);
                float_sums.push(0.0);
                order.len() - 1
            });
            if let Value::Int(amount) = cell {
                int_sums[slot] = int_sums[slot].saturating_add(*amount);
            }
            if let Some(amount) = cell.as_f64() {
                float_sums[slot] += amount;
            }
        }

        let mut grouped = self.select(keys)?.take(&order);
        let sums = if integral {
            int_sums.into_iter().map(Value::Int).collect()
        } else {
            float_sums.into_iter().map(Value::Float).collect()
        };
        grouped.push_column(value, sums)?;
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn land_use() -> Table {
        Table::from_columns(vec![
            (
                "MUNICIPIO".to_owned(),
                vec![Value::Int(5), Value::Int(7), Value::Int(5), Value::Null],
            ),
            (
                "MUNICIPIO_NOMBRE".to_owned(),
                vec![
                    Value::from("Alcorcón"),
                    Value::from("Getafe"),
                    Value::from("Alcorcón"),
                    Value::from("Sin municipio"),
                ],
            ),
            (
                "SUPERF_M2".to_owned(),
                vec![
                    Value::Float(100.0),
                    Value::Float(50.0),
                    Value::Float(25.5),
                    Value::Float(1.0),
                ],
            ),
        ])
        .expect("land use")
    }

    #[rstest]
    fn sums_per_group_in_first_appearance_order() {
        let grouped = land_use()
            .group_sum(&["MUNICIPIO", "MUNICIPIO_NOMBRE"], "SUPERF_M2")
            .expect("group");
        assert_eq!(grouped.height(), 2);
        assert_eq!(
            grouped.column("MUNICIPIO").expect("keys"),
            &[Value::Int(5), Value::Int(7)]
        );
        assert_eq!(
            grouped.column("SUPERF_M2").expect("sums"),
            &[Value::Float(125.5), Value::Float(50.0)]
        );
    }

    #[rstest]
    fn integer_values_stay_integral() {
        let table = Table::from_columns(vec![
            ("k".to_owned(), vec![Value::from("a"), Value::from("a")]),
            ("v".to_owned(), vec![Value::Int(2), Value::Null]),
        ])
        .expect("table");
        let grouped = table.group_sum(&["k"], "v").expect("group");
        assert_eq!(grouped.column("v").expect("sums"), &[Value::Int(2)]);
    }

    #[rstest]
    fn missing_value_column_errors() {
        assert!(matches!(
            land_use().group_sum(&["MUNICIPIO"], "AREA"),
            Err(TableError::MissingColumn { .. })
        ));
    }
}

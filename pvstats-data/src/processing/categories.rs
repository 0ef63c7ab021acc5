//! Renaming of category codes in a geo table column.

use std::collections::BTreeMap;

use camino::Utf8Path;
use log::info;
use pvstats_core::GeoTable;

use super::ProcessingError;
use crate::io::{read_geo_table, write_geo_table};

/// Replace the values of `column` through `mapping`, optionally writing the
/// result to `saving_path`.
///
/// Values absent from the mapping become null.
///
/// # Errors
///
/// Fails when the input cannot be read, the column is missing, or the output
/// cannot be written.
pub fn remap_column_categories(
    path: &Utf8Path,
    column: &str,
    mapping: &BTreeMap<String, String>,
    saving_path: Option<&Utf8Path>,
) -> Result<GeoTable, ProcessingError> {
    let mut table = read_geo_table(path, None)?;
    table.update_attributes(|attributes| attributes.map_values(column, mapping))?;
    if let Some(saving_path) = saving_path {
        write_geo_table(saving_path, &table)?;
        info!("saved remapped `{column}` categories to {saving_path}");
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::fixtures::{Workspace, geo_table, square, text, workspace};
    use pvstats_core::Value;
    use rstest::rstest;

    #[rstest]
    fn unmapped_categories_become_null(workspace: Workspace) {
        let raw = workspace.root.join("zonas.geojson");
        let zones = geo_table(
            vec![("categoria", vec![text("EXT"), text("IND-SUR"), text("???")])],
            vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0), square(2.0, 0.0, 1.0)],
        );
        write_geo_table(&raw, &zones).expect("raw input");
        let mapping: BTreeMap<String, String> = [
            ("EXT", "Perimetro"),
            ("IND-SUR", "Industrial - S"),
        ]
        .into_iter()
        .map(|(code, name)| (code.to_owned(), name.to_owned()))
        .collect();
        let saving_path = workspace.root.join("out/zonas.geojson");

        let remapped =
            remap_column_categories(&raw, "categoria", &mapping, Some(&saving_path)).expect("remapped");

        assert_eq!(
            remapped.attributes().column("categoria").expect("categories"),
            [text("Perimetro"), text("Industrial - S"), Value::Null]
        );
        let saved = read_geo_table(&saving_path, None).expect("saved");
        assert_eq!(saved.attributes().get(2, "categoria"), Some(&Value::Null));
    }
}

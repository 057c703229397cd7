
// imports
use crate::error::Result;
use crate::similarity::SimilarityMatrix;
use crate::source::Catalog;

use std::fs;
use std::io::Write;
use std::path::Path;
use serde::Serialize;
use tracing::info;

const HEADER: [&str; 3] = ["datasetX", "datasetY", "similarity"];


/// One persisted pair, keyed by identifiers. `similarity` is empty when not finite.
#[derive(Debug, PartialEq, Serialize)]
pub struct RelationRow<'a> {
    pub dataset_x: &'a str,
    pub dataset_y: &'a str,
    pub similarity: Option<f64>,
}


/// The similarity matrix seen through the catalog's identifiers.
pub struct SimilarityRelation<'a> {
    catalog: &'a Catalog,
    matrix: &'a SimilarityMatrix,
}

impl<'a> SimilarityRelation<'a> {

    pub fn new(catalog: &'a Catalog, matrix: &'a SimilarityMatrix) -> SimilarityRelation<'a> {
        assert_eq!(catalog.len(), matrix.len(), "matrix does not cover the catalog");
        Self {
            catalog: catalog,
            matrix: matrix
        }
    }

    /// One row per pair `i <= j` in catalog order, diagonal included.
    pub fn rows(&self) -> impl Iterator<Item = RelationRow<'a>> {
        let catalog: &'a Catalog = self.catalog;
        let concepts = catalog.concepts();
        let matrix: &'a SimilarityMatrix = self.matrix;
        (0..concepts.len()).flat_map(move |i| {
            (i..concepts.len()).map(move |j| RelationRow {
                dataset_x: &concepts[i].identifier,
                dataset_y: &concepts[j].identifier,
                similarity: matrix.get(i, j).filter(|s| s.is_finite()),
            })
        })
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<usize> {

        // the header is written by hand so that an empty relation still carries it
        let mut wrt = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        wrt.write_record(HEADER)?;

        let mut n_rows = 0;
        for row in self.rows() {
            wrt.serialize(row)?;
            n_rows += 1;
        }
        wrt.flush()?;
        Ok(n_rows)
    }

    /// Writes the relation to `path`, creating parent directories.
    pub fn save(&self, path: &str) -> Result<()> {

        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let f = fs::File::create(path)?;
        let n_rows = self.write(f)?;
        info!("saved {} pairs to {}", n_rows, path);
        Ok(())
    }
}


// imports
use ndarray::prelude::*;
use tracing::debug;

// vectors no longer than this fraction of the longest indexed vector are treated as the
// zero vector
const RELATIVE_ZERO_NORM: f64 = 1e-9;


fn norm(vec: ArrayView1<f64>) -> f64 {
    vec.iter().map(|a| a * a).sum::<f64>().sqrt()
}

fn unit(vec: ArrayView1<f64>, zero_norm: f64) -> Array1<f64> {
    let length = norm(vec);
    if length <= zero_norm {
        Array1::zeros(vec.len())
    } else {
        vec.mapv(|a| a / length)
    }
}

// dot product of two unit vectors, summed in index order so that (a, b) and (b, a)
// give the exact same value
fn cosine(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    // no negative zero
    if dot == 0.0 { 0.0 } else { dot }
}


/// Latent vectors of every concept, in catalog order, scaled to unit length.
pub struct SimilarityIndex {
    w: Array2<f64>,
    zero_norm: f64,
}

impl SimilarityIndex {

    pub fn new(latent: &Array2<f64>) -> SimilarityIndex {

        // rounding left over by the projection is measured against the longest row
        let longest = latent.axis_iter(Axis(0)).map(norm).fold(0.0, f64::max);
        let zero_norm = RELATIVE_ZERO_NORM * longest;

        // need to normalize w so each row has l2 norm 1, zero rows stay zero
        let mut w: Array2<f64> = Array2::zeros(latent.dim());
        for (i, row) in latent.axis_iter(Axis(0)).enumerate() {
            w.row_mut(i).assign(&unit(row, zero_norm));
        }

        Self {
            w: w,
            zero_norm: zero_norm
        }
    }

    pub fn len(&self) -> usize {
        self.w.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.w.nrows() == 0
    }

    pub fn dim(&self) -> usize {
        self.w.ncols()
    }

    /// Cosine similarity of `vec` against every indexed vector, as (index, score) sorted by
    /// score descending, ties by ascending index. A zero vector scores 0 against everything.
    pub fn query(&self, vec: &Array1<f64>) -> Vec<(usize, f64)> {

        assert_eq!(vec.len(), self.dim(), "query dimension does not match the index");
        let q = unit(vec.view(), self.zero_norm);

        let mut indexed_scores: Vec<(usize, f64)> = self.w.axis_iter(Axis(0))
            .map(|row| cosine(row, q.view()))
            .enumerate()
            .collect();

        // sort by most similar in descending order
        indexed_scores.sort_by(|(i, s), (j, t)| t.total_cmp(s).then(i.cmp(j)));
        indexed_scores
    }

    /// Cosine similarity between two indexed vectors, the same value the matrix holds.
    pub fn score(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.len() || j >= self.len() {
            return None;
        }
        Some(cosine(self.w.row(i), self.w.row(j)))
    }

    /// The `k` most similar indexed vectors.
    pub fn nearest(&self, vec: &Array1<f64>, k: usize) -> Vec<(usize, f64)> {
        let mut ranked = self.query(vec);
        ranked.truncate(k);
        ranked
    }
}


/// The full similarity relation, `scores[[i, j]]` for catalog positions i and j.
pub struct SimilarityMatrix {
    scores: Array2<f64>,
}

impl SimilarityMatrix {

    /// Queries the index once per concept with its own latent vector.
    pub fn build(index: &SimilarityIndex, latent: &Array2<f64>) -> SimilarityMatrix {

        let n = index.len();
        let mut scores: Array2<f64> = Array2::zeros((n, n));

        for (i, vec) in latent.axis_iter(Axis(0)).enumerate() {
            for (j, score) in index.query(&vec.to_owned()) {
                scores[[i, j]] = score;
            }
        }

        debug!("assembled {} x {} similarity matrix", n, n);
        Self {
            scores: scores
        }
    }

    pub fn len(&self) -> usize {
        self.scores.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.nrows() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.scores.get((i, j)).copied()
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }
}


#[cfg(test)]
mod tests {

    use super::{SimilarityIndex, SimilarityMatrix};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};

    fn latent() -> Array2<f64> {
        array![
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
            [0.0, 2.0],
            [1.0, 1.0]
        ]
    }

    #[test]
    fn query_ranks_with_ties_by_index() {

        let index = SimilarityIndex::new(&latent());
        let ranked = index.query(&array![3.0, 3.0]);

        // 1 and 4 are the same vector and score 1.0, then 0 and 3 tie at 1/sqrt(2), the zero vector last
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 4, 0, 3, 2]);
        assert_abs_diff_eq!(ranked[0].1, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ranked[2].1, 0.5f64.sqrt(), epsilon = 1e-12);
        assert_eq!(ranked[4].1, 0.0);

        assert_eq!(index.nearest(&array![3.0, 3.0], 2), ranked[..2].to_vec());
    }

    #[test]
    fn zero_query_scores_zero() {
        let index = SimilarityIndex::new(&latent());
        let ranked = index.query(&Array1::zeros(2));
        assert!(ranked.iter().all(|(_, s)| *s == 0.0));
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {

        let latent = latent();
        let index = SimilarityIndex::new(&latent);
        let matrix = SimilarityMatrix::build(&index, &latent);

        assert_eq!(matrix.len(), 5);
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
        for i in [0, 1, 3, 4] {
            assert_abs_diff_eq!(matrix.get(i, i).unwrap(), 1.0, epsilon = 1e-12);
        }

        // the zero vector is 0 against everything, itself included
        for j in 0..5 {
            assert_eq!(matrix.get(2, j), Some(0.0));
        }
        assert_eq!(matrix.get(5, 0), None);

        // single pair scores agree with the matrix
        assert_eq!(index.score(0, 3), matrix.get(0, 3));
        assert_eq!(index.score(4, 1), matrix.get(4, 1));
        assert_eq!(index.score(0, 5), None);
    }

    #[test]
    fn rounding_residue_counts_as_zero() {

        let latent = array![[3.0, 4.0], [2e-10, -1e-10], [0.0, 1.0]];
        let index = SimilarityIndex::new(&latent);
        let matrix = SimilarityMatrix::build(&index, &latent);

        // row 1 is far below the longest row and behaves as the zero vector
        for j in 0..3 {
            assert_eq!(matrix.get(1, j), Some(0.0));
        }
        assert_abs_diff_eq!(matrix.get(0, 2).unwrap(), 0.8, epsilon = 1e-12);
        assert!(index.query(&array![1e-11, 1e-11]).iter().all(|(_, s)| *s == 0.0));

        // on its own the same vector is a regular direction
        let alone = array![[2e-10, -1e-10]];
        let index = SimilarityIndex::new(&alone);
        assert_abs_diff_eq!(index.score(0, 0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_index() {
        let latent: Array2<f64> = Array2::zeros((0, 3));
        let index = SimilarityIndex::new(&latent);
        assert!(index.is_empty());
        assert!(index.query(&Array1::zeros(3)).is_empty());
        assert!(SimilarityMatrix::build(&index, &latent).is_empty());
    }
}

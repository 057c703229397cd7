
// imports
use crate::config::LsiParams;
use crate::weight::WeightedVector;

use std::time::Instant;
use ndarray::prelude::*;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_stats::QuantileExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

// columns shorter than this (relative to the longest input column) are treated as
// linearly dependent when building an orthonormal basis
const ORTHO_TOLERANCE: f64 = 1e-10;

// topics whose singular value falls below this fraction of the largest one are zeroed
const RANK_TOLERANCE: f64 = 1e-10;

const MAX_JACOBI_SWEEPS: usize = 100;


/// A fitted rank-`num_topics` latent semantic projection of the TF-IDF space.
///
/// `term_topics` has one row per vocabulary term and one column per topic. Columns are
/// orthonormal up to the effective rank of the corpus and zero beyond it.
#[derive(Clone, Debug)]
pub struct Projection {
    term_topics: Array2<f64>,
    singular_values: Array1<f64>,
}

impl Projection {

    // column c of the matrix holds document layout[c]
    fn term_document_matrix(weighted: &[WeightedVector], layout: &[usize], num_terms: usize) -> Array2<f64> {
        let mut a: Array2<f64> = Array2::zeros((num_terms, layout.len()));
        for (col, doc) in layout.iter().enumerate() {
            for (id, w) in weighted[*doc].iter().filter(|(id, _)| *id < num_terms) {
                a[[*id, col]] = *w;
            }
        }
        a
    }

    // documents ordered by key, so that row k of the random test matrix always meets the
    // same document whatever order the batch came in
    fn key_layout<K: Ord>(keys: &[K]) -> Vec<usize> {
        let mut layout: Vec<usize> = (0..keys.len()).collect();
        layout.sort_by(|i, j| keys[*i].cmp(&keys[*j]).then(i.cmp(j)));
        layout
    }

    fn empty(num_terms: usize, num_topics: usize) -> Projection {
        Self {
            term_topics: Array2::zeros((num_terms, num_topics)),
            singular_values: Array1::zeros(num_topics)
        }
    }

    /// Fits the projection on the weighted corpus with a randomized truncated SVD.
    ///
    /// The range of the term-document matrix `A` is sampled with a gaussian test matrix drawn
    /// from `params.seed`, refined by `params.power_iters` rounds of `Q <- orth(A orth(A^T Q))`,
    /// and the small problem `(Q^T A)(Q^T A)^T` is diagonalized to rotate `Q` onto the
    /// singular directions.
    ///
    /// `keys` holds one stable key per document (the concept identifiers). Columns of `A`
    /// are laid out in key order, which makes the fit independent of the batch order.
    pub fn fit<K: Ord>(weighted: &[WeightedVector], keys: &[K], num_terms: usize, params: &LsiParams) -> Projection {

        assert_eq!(weighted.len(), keys.len(), "one key per document");

        let timer = Instant::now();
        let num_topics = params.num_topics;
        let layout = Projection::key_layout(keys);
        let a = Projection::term_document_matrix(weighted, &layout, num_terms);
        let (n_terms, n_docs) = a.dim();

        let samples = (num_topics + params.oversample).min(n_terms).min(n_docs);
        info!("fitting {} topics on a {} x {} term-document matrix ({} samples, {} power iterations)",
            num_topics, n_terms, n_docs, samples, params.power_iters);

        if samples == 0 {
            return Projection::empty(n_terms, num_topics);
        }

        // the random test matrix is the only source of randomness, pinned by the seed
        let mut rng = StdRng::seed_from_u64(params.seed);
        let omega: Array2<f64> = Array2::random_using((n_docs, samples), StandardNormal, &mut rng);

        let mut q = orthonormalize(&a.dot(&omega));
        for _ in 0..params.power_iters {
            if q.ncols() == 0 { break }
            let z = orthonormalize(&a.t().dot(&q));
            q = orthonormalize(&a.dot(&z));
        }

        if q.ncols() == 0 {
            debug!("term-document matrix is all zeros");
            return Projection::empty(n_terms, num_topics);
        }

        let b = q.t().dot(&a);
        let (eigenvalues, rotation) = symmetric_eigen(b.dot(&b.t()));
        let basis = q.dot(&rotation);

        let top = eigenvalues.max().map(|top| top.max(0.0).sqrt()).unwrap_or(0.0);
        let mut projection = Projection::empty(n_terms, num_topics);
        let mut rank = 0;
        for k in 0..num_topics.min(basis.ncols()) {
            let sigma = eigenvalues[k].max(0.0).sqrt();
            if sigma <= RANK_TOLERANCE * top { break }
            projection.term_topics.column_mut(k).assign(&basis.column(k));
            projection.singular_values[k] = sigma;
            rank += 1;
        }

        info!("effective rank {} of {} topics, top singular value {:.4}, took {} seconds ...",
            rank, num_topics, top, timer.elapsed().as_secs());
        projection
    }

    pub fn num_topics(&self) -> usize {
        self.term_topics.ncols()
    }

    pub fn num_terms(&self) -> usize {
        self.term_topics.nrows()
    }

    pub fn term_topics(&self) -> &Array2<f64> {
        &self.term_topics
    }

    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    /// Projects a weighted vector into the latent space without refitting. Term ids outside
    /// the fitted vocabulary are ignored.
    pub fn fold_in(&self, vector: &WeightedVector) -> Array1<f64> {
        let mut latent: Array1<f64> = Array1::zeros(self.num_topics());
        for (id, w) in vector.iter().filter(|(id, _)| *id < self.num_terms()) {
            latent.scaled_add(*w, &self.term_topics.row(*id));
        }
        latent
    }

    /// Folds in every vector, one row per input vector.
    pub fn fold_in_all(&self, weighted: &[WeightedVector]) -> Array2<f64> {
        let mut latent: Array2<f64> = Array2::zeros((weighted.len(), self.num_topics()));
        for (i, vector) in weighted.iter().enumerate() {
            latent.row_mut(i).assign(&self.fold_in(vector));
        }
        latent
    }
}


// modified gram-schmidt, run twice per column for stability; dependent columns are dropped
fn orthonormalize(m: &Array2<f64>) -> Array2<f64> {

    let scale = m.columns().into_iter().map(|c| c.dot(&c).sqrt()).fold(0.0, f64::max);
    let mut basis: Vec<Array1<f64>> = Vec::new();

    if scale > 0.0 {
        for column in m.columns() {
            let mut v = column.to_owned();
            for _ in 0..2 {
                for b in &basis {
                    let proj = b.dot(&v);
                    v.scaled_add(-proj, b);
                }
            }
            let norm = v.dot(&v).sqrt();
            if norm > ORTHO_TOLERANCE * scale {
                v /= norm;
                basis.push(v);
            }
        }
    }

    let mut q: Array2<f64> = Array2::zeros((m.nrows(), basis.len()));
    for (k, b) in basis.iter().enumerate() {
        q.column_mut(k).assign(b);
    }
    q
}


// cyclic jacobi eigen decomposition of a symmetric matrix.
// returns eigenvalues in descending order and the matching eigenvectors as columns.
fn symmetric_eigen(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {

    let n = a.nrows();
    let mut v: Array2<f64> = Array2::eye(n);
    let total: f64 = a.iter().map(|x| x * x).sum();

    for _sweep in 0..MAX_JACOBI_SWEEPS {

        let mut off = 0.0;
        for p in 0..n {
            for q in 0..n {
                if p != q { off += a[[p, q]] * a[[p, q]]; }
            }
        }
        if off <= f64::EPSILON * f64::EPSILON * total { break }

        for p in 0..n {
            for q in p + 1..n {

                let apq = a[[p, q]];
                if apq == 0.0 { continue }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // a <- J^T a J, v <- v J
                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    // sort by eigenvalue, descending, stable on ties
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|i, j| a[[*j, *j]].total_cmp(&a[[*i, *i]]));

    let eigenvalues: Array1<f64> = order.iter().map(|i| a[[*i, *i]]).collect();
    let eigenvectors = v.select(Axis(1), &order);
    (eigenvalues, eigenvectors)
}


#[cfg(test)]
mod tests {

    use super::{orthonormalize, symmetric_eigen, Projection};
    use crate::config::LsiParams;
    use crate::weight::WeightedVector;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};

    fn params(num_topics: usize) -> LsiParams {
        LsiParams { num_topics: num_topics, power_iters: 2, oversample: 10, seed: 0 }
    }

    // 5 documents over 4 terms, two groups of co-occurring terms
    fn weighted() -> Vec<WeightedVector> {
        vec![
            vec![(0, 1.0), (1, 0.5)],
            vec![(0, 0.7), (1, 1.2)],
            vec![(2, 1.0), (3, 0.9)],
            vec![(2, 0.3), (3, 1.1)],
            vec![],
        ]
    }

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{}", i)).collect()
    }

    fn cosine(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        let na = a.dot(a).sqrt();
        let nb = b.dot(b).sqrt();
        if na == 0.0 || nb == 0.0 { 0.0 } else { a.dot(b) / (na * nb) }
    }

    fn dense(vector: &WeightedVector, num_terms: usize) -> Array1<f64> {
        let mut d = Array1::zeros(num_terms);
        for (id, w) in vector { d[*id] = *w; }
        d
    }

    #[test]
    fn jacobi_eigen_test() {

        let (values, vectors) = symmetric_eigen(array![[2.0, 1.0], [1.0, 2.0]]);
        assert_abs_diff_eq!(values[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 1.0, epsilon = 1e-12);

        // the first eigenvector is (1, 1) / sqrt(2) up to sign
        assert_abs_diff_eq!(vectors[[0, 0]].abs(), 0.5f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(vectors[[0, 0]], vectors[[1, 0]], epsilon = 1e-12);
    }

    #[test]
    fn dependent_columns_are_dropped() {

        let m: Array2<f64> = array![[1.0, 2.0, 0.0], [0.0, 0.0, 1.0], [1.0, 2.0, 0.0]];
        let q = orthonormalize(&m);
        assert_eq!(q.dim(), (3, 2));
        let gram = q.t().dot(&q);
        for ((i, j), value) in gram.indexed_iter() {
            assert_abs_diff_eq!(*value, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-12);
        }

        assert_eq!(orthonormalize(&Array2::zeros((3, 2))).ncols(), 0);
    }

    #[test]
    fn topics_are_orthonormal_and_padded() {

        // rank of the corpus is 4, ask for 6 topics
        let projection = Projection::fit(&weighted(), &keys(5), 4, &params(6));
        assert_eq!(projection.num_topics(), 6);
        assert_eq!(projection.num_terms(), 4);

        let u = projection.term_topics();
        let gram = u.t().dot(u);
        for i in 0..6 {
            for j in 0..6 {
                let expected = if i == j && i < 4 { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-9);
            }
        }

        let s = projection.singular_values();
        assert!(s[0] >= s[1] && s[1] >= s[2] && s[2] >= s[3]);
        assert_eq!(s[4], 0.0);
        assert_eq!(s[5], 0.0);
    }

    #[test]
    fn full_rank_projection_preserves_cosines() {

        let docs = weighted();
        let projection = Projection::fit(&docs, &keys(5), 4, &params(4));
        let latent = projection.fold_in_all(&docs);

        for i in 0..docs.len() {
            for j in 0..docs.len() {
                let original = cosine(&dense(&docs[i], 4), &dense(&docs[j], 4));
                let projected = cosine(&latent.row(i).to_owned(), &latent.row(j).to_owned());
                assert_abs_diff_eq!(original, projected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn truncated_projection_keeps_groups_apart() {

        let docs = weighted();
        let projection = Projection::fit(&docs, &keys(5), 4, &params(2));
        let latent = projection.fold_in_all(&docs);

        let same_group = cosine(&latent.row(0).to_owned(), &latent.row(1).to_owned());
        let other_group = cosine(&latent.row(0).to_owned(), &latent.row(2).to_owned());
        assert!(same_group > other_group);

        // the empty document folds in to the origin
        assert!(latent.row(4).iter().all(|x| *x == 0.0));
    }

    #[test]
    fn fit_is_reproducible() {

        let a = Projection::fit(&weighted(), &keys(5), 4, &params(2));
        let b = Projection::fit(&weighted(), &keys(5), 4, &params(2));
        assert_eq!(a.term_topics(), b.term_topics());
        assert_eq!(a.singular_values(), b.singular_values());
    }

    #[test]
    fn degenerate_inputs_give_zero_projection() {

        let projection = Projection::fit(&[], &keys(0), 0, &params(3));
        assert_eq!(projection.term_topics().dim(), (0, 3));

        let projection = Projection::fit(&[vec![], vec![]], &keys(2), 0, &params(3));
        assert_eq!(projection.fold_in(&vec![]), Array1::<f64>::zeros(3));

        // terms exist but every weight is zero
        let projection = Projection::fit(&[vec![(0, 0.0)], vec![(0, 0.0)]], &keys(2), 1, &params(3));
        assert!(projection.term_topics().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn fold_in_ignores_unknown_terms() {
        let projection = Projection::fit(&weighted(), &keys(5), 4, &params(2));
        let known = projection.fold_in(&vec![(0, 1.0)]);
        let with_unknown = projection.fold_in(&vec![(0, 1.0), (9, 3.0)]);
        assert_eq!(known, with_unknown);
    }

    #[test]
    fn truncated_fit_ignores_document_order() {

        // rank 6 corpus, two topics, no oversampling and a single power iteration, so the
        // sampled subspace is only an approximation of the leading one
        let docs: Vec<WeightedVector> = vec![
            vec![(0, 3.0), (1, 1.0), (4, 0.2)],
            vec![(0, 2.5), (1, 1.5), (5, 0.3)],
            vec![(0, 0.4), (2, 2.0), (3, 1.0)],
            vec![(2, 1.0), (3, 2.2)],
            vec![(1, 0.5), (4, 1.7), (5, 0.9)],
            vec![(3, 0.2), (4, 0.6), (5, 1.4)],
            vec![(0, 1.0), (2, 1.0), (4, 1.0)],
            vec![(1, 0.8), (3, 0.7), (5, 1.2)],
        ];
        let params = LsiParams { num_topics: 2, power_iters: 1, oversample: 0, seed: 3 };

        let forward = Projection::fit(&docs, &keys(8), 6, &params);
        let forward_latent = forward.fold_in_all(&docs);

        let mut reversed_docs = docs.clone();
        reversed_docs.reverse();
        let mut reversed_keys = keys(8);
        reversed_keys.reverse();
        let reversed = Projection::fit(&reversed_docs, &reversed_keys, 6, &params);
        let reversed_latent = reversed.fold_in_all(&reversed_docs);

        assert_eq!(forward.singular_values(), reversed.singular_values());
        for i in 0..8 {
            for j in 0..8 {
                let f = cosine(&forward_latent.row(i).to_owned(), &forward_latent.row(j).to_owned());
                let r = cosine(&reversed_latent.row(7 - i).to_owned(), &reversed_latent.row(7 - j).to_owned());
                assert_abs_diff_eq!(f, r, epsilon = 1e-12);
            }
        }
    }
}

//! Binary L2-penalised logistic regression
//!
//! Minimises
//!
//! ```text
//! ½‖w‖² + C · Σᵢ log(1 + exp(−ỹᵢ (xᵢ·w + b)))
//! ```
//!
//! with Newton's method (iteratively reweighted least squares). The intercept
//! `b` is not penalised. Each step solves the Hessian system with a Cholesky
//! factorisation.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cortex_mi_core::{ClassLabel, ClassifierConfig, ValidationError};

use crate::error::{ModelError, ModelResult};
use crate::ml::Classifier;

/// Added to the Hessian diagonal so a saturated intercept stays solvable
const HESSIAN_JITTER: f64 = 1e-10;

/// Binary logistic regression classifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: ClassifierConfig,
    /// [negative, positive] class labels
    classes: Vec<ClassLabel>,
    coef: Option<Array1<f64>>,
    intercept: f64,
    n_iter: usize,
}

impl LogisticRegression {
    /// Create an unfitted classifier
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            coef: None,
            intercept: 0.0,
            n_iter: 0,
        }
    }

    /// Signed distance to the decision boundary; positive favours the higher class.
    ///
    /// # Errors
    ///
    /// [`ModelError::NotFitted`] before fit, [`ValidationError::FeatureMismatch`]
    /// for a different feature count.
    pub fn decision_function(&self, features: ArrayView2<'_, f64>) -> ModelResult<Array1<f64>> {
        let coef = self
            .coef
            .as_ref()
            .ok_or(ModelError::NotFitted { component: "LogisticRegression" })?;
        if features.ncols() != coef.len() {
            return Err(ValidationError::FeatureMismatch {
                expected: coef.len(),
                got: features.ncols(),
            }
            .into());
        }

        Ok(features.dot(coef) + self.intercept)
    }

    /// Class probabilities, one column per class in [`Self::classes`] order.
    pub fn predict_proba(&self, features: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        let decision = self.decision_function(features)?;
        let mut proba = Array2::zeros((decision.len(), 2));
        for (mut row, &z) in proba.rows_mut().into_iter().zip(decision.iter()) {
            let positive = sigmoid(z);
            row[0] = 1.0 - positive;
            row[1] = positive;
        }
        Ok(proba)
    }

    /// Learned weights
    #[must_use]
    pub fn coef(&self) -> Option<&Array1<f64>> {
        self.coef.as_ref()
    }

    /// Learned intercept
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Classes seen at fit time, ascending
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Newton iterations used by the last fit
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[ClassLabel]) -> ModelResult<()> {
        let (n_samples, n_features) = features.dim();
        if n_samples == 0 {
            return Err(ValidationError::EmptyAxis { axis: "samples" }.into());
        }
        if labels.len() != n_samples {
            return Err(ValidationError::LengthMismatch {
                epochs: n_samples,
                labels: labels.len(),
            }
            .into());
        }

        let mut classes = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() != 2 {
            return Err(ModelError::NotBinary { found: classes.len() });
        }

        // Design matrix with a trailing column of ones for the intercept
        let dim = n_features + 1;
        let design = DMatrix::from_fn(n_samples, dim, |i, j| {
            if j < n_features {
                features[[i, j]]
            } else {
                1.0
            }
        });
        let target = DVector::from_iterator(
            n_samples,
            labels.iter().map(|&label| if label == classes[1] { 1.0 } else { 0.0 }),
        );

        let c = self.config.c;
        let mut weights = DVector::<f64>::zeros(dim);
        let mut n_iter = 0;

        for iteration in 0..self.config.max_iter {
            n_iter = iteration + 1;

            let proba = (&design * &weights).map(sigmoid);

            let mut gradient = design.transpose() * (&proba - &target) * c;
            for j in 0..n_features {
                gradient[j] += weights[j];
            }

            if gradient.amax() <= self.config.tol {
                break;
            }

            let curvature = proba.map(|p| c * p * (1.0 - p));
            let mut weighted = design.clone();
            for (mut row, &s) in weighted.row_iter_mut().zip(curvature.iter()) {
                row *= s;
            }
            let mut hessian = design.transpose() * weighted;
            for j in 0..n_features {
                hessian[(j, j)] += 1.0;
            }
            for j in 0..dim {
                hessian[(j, j)] += HESSIAN_JITTER;
            }

            let step = hessian
                .cholesky()
                .ok_or(ModelError::SingularHessian { iteration })?
                .solve(&gradient);
            weights -= &step;

            if step.amax() <= self.config.tol * 1e-2 {
                break;
            }
        }

        debug!(iterations = n_iter, features = n_features, "Logistic regression fitted");

        self.coef = Some(weights.rows(0, n_features).iter().copied().collect());
        self.intercept = weights[n_features];
        self.classes = classes;
        self.n_iter = n_iter;
        Ok(())
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> ModelResult<Vec<ClassLabel>> {
        let decision = self.decision_function(features)?;
        Ok(decision
            .iter()
            .map(|&z| if z > 0.0 { self.classes[1] } else { self.classes[0] })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.coef.is_some()
    }
}

/// Numerically stable logistic function
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn blobs(n_per_class: usize, separation: f64) -> (Array2<f64>, Vec<ClassLabel>) {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (label, center) in [(1, -separation), (2, separation)] {
            for _ in 0..n_per_class {
                rows.push(center + rng.gen::<f64>() - 0.5);
                rows.push(rng.gen::<f64>() - 0.5);
                labels.push(label);
            }
        }
        let x = Array2::from_shape_vec((2 * n_per_class, 2), rows).unwrap();
        (x, labels)
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-15);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_separates_blobs() {
        let (x, y) = blobs(20, 2.0);
        let mut model = LogisticRegression::default();
        model.fit(x.view(), &y).unwrap();

        assert_eq!(model.classes(), &[1, 2]);
        assert_eq!(model.predict(x.view()).unwrap(), y);
        assert!(model.coef().unwrap()[0] > 0.0);
    }

    #[test]
    fn test_stationary_point() {
        let (x, y) = blobs(15, 0.3);
        let config = ClassifierConfig { tol: 1e-10, ..ClassifierConfig::default() };
        let mut model = LogisticRegression::new(config);
        model.fit(x.view(), &y).unwrap();

        // Gradient of the penalised objective vanishes at the solution
        let coef = model.coef().unwrap();
        let p = model.predict_proba(x.view()).unwrap().column(1).to_owned();
        let t: Array1<f64> = y.iter().map(|&l| if l == 2 { 1.0 } else { 0.0 }).collect();
        let residual = &p - &t;
        let grad_w = x.t().dot(&residual) + coef;
        assert!(grad_w.iter().all(|g| g.abs() < 1e-6));
        assert!(residual.sum().abs() < 1e-6);
    }

    #[test]
    fn test_stronger_penalty_shrinks_weights() {
        let (x, y) = blobs(20, 1.0);
        let mut loose = LogisticRegression::new(ClassifierConfig { c: 10.0, ..ClassifierConfig::default() });
        let mut tight = LogisticRegression::new(ClassifierConfig { c: 0.01, ..ClassifierConfig::default() });
        loose.fit(x.view(), &y).unwrap();
        tight.fit(x.view(), &y).unwrap();

        let norm = |m: &LogisticRegression| m.coef().unwrap().mapv(|w| w * w).sum();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = blobs(10, 1.0);
        let mut model = LogisticRegression::default();
        model.fit(x.view(), &y).unwrap();

        let proba = model.predict_proba(x.view()).unwrap();
        for total in proba.sum_axis(Axis(1)) {
            assert!((total - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rejects_non_binary() {
        let x = array![[0.0], [1.0], [2.0]];
        let mut model = LogisticRegression::default();
        assert!(matches!(model.fit(x.view(), &[1, 1, 1]), Err(ModelError::NotBinary { found: 1 })));
        assert!(matches!(model.fit(x.view(), &[1, 2, 3]), Err(ModelError::NotBinary { found: 3 })));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::default();
        assert!(matches!(
            model.predict(array![[1.0]].view()),
            Err(ModelError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_feature_mismatch() {
        let (x, y) = blobs(5, 1.0);
        let mut model = LogisticRegression::default();
        model.fit(x.view(), &y).unwrap();
        assert!(model.predict(array![[1.0, 2.0, 3.0]].view()).is_err());
    }
}

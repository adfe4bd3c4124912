//! Derivative-free minimisation used for model parameter estimation.

use std::cmp::Ordering;

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found.
    pub optimal_point: Vec<f64>,
    /// Objective value at the best point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of objective evaluations.
    pub evaluations: usize,
    /// Whether the simplex met the tolerance before `max_iter`.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Relative tolerance on the spread of objective values across the simplex.
    pub tolerance: f64,
    /// Reflection coefficient (default: 1.0).
    pub alpha: f64,
    /// Expansion coefficient (default: 2.0).
    pub gamma: f64,
    /// Contraction coefficient (default: 0.5).
    pub rho: f64,
    /// Shrinkage coefficient (default: 0.5).
    pub sigma: f64,
    /// Initial simplex step, relative to the coordinate when it is non-zero.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Simplex vertices with their cached objective values.
struct Simplex<'a, F> {
    objective: F,
    bounds: Option<&'a [(f64, f64)]>,
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
    evaluations: usize,
}

impl<'a, F> Simplex<'a, F>
where
    F: Fn(&[f64]) -> f64,
{
    fn new(objective: F, initial: &[f64], bounds: Option<&'a [(f64, f64)]>, step: f64) -> Self {
        let mut simplex = Self {
            objective,
            bounds,
            vertices: Vec::with_capacity(initial.len() + 1),
            values: Vec::with_capacity(initial.len() + 1),
            evaluations: 0,
        };

        let start = simplex.clamp(initial.to_vec());
        simplex.push(start.clone());
        for i in 0..initial.len() {
            let mut vertex = start.clone();
            vertex[i] += if vertex[i].abs() > 1e-10 {
                step * vertex[i].abs()
            } else {
                step
            };
            // A vertex pinned to a bound would duplicate the start; step inward instead.
            let clamped = simplex.clamp(vertex.clone());
            if clamped[i] == start[i] {
                vertex[i] = start[i] - (vertex[i] - start[i]);
            }
            let vertex = simplex.clamp(vertex);
            simplex.push(vertex);
        }
        simplex
    }

    fn clamp(&self, mut point: Vec<f64>) -> Vec<f64> {
        if let Some(bounds) = self.bounds {
            for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
                *x = x.clamp(lo, hi);
            }
        }
        point
    }

    fn eval(&mut self, point: &[f64]) -> f64 {
        self.evaluations += 1;
        let value = (self.objective)(point);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    }

    fn push(&mut self, vertex: Vec<f64>) {
        let value = self.eval(&vertex);
        self.vertices.push(vertex);
        self.values.push(value);
    }

    fn replace(&mut self, idx: usize, vertex: Vec<f64>, value: f64) {
        self.vertices[idx] = vertex;
        self.values[idx] = value;
    }

    /// Vertex indices ordered from best to worst.
    fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| {
            self.values[a]
                .partial_cmp(&self.values[b])
                .unwrap_or(Ordering::Equal)
        });
        order
    }

    fn centroid_without(&self, excluded: usize) -> Vec<f64> {
        let dims = self.vertices[0].len();
        let mut centroid = vec![0.0; dims];
        for (_, vertex) in self
            .vertices
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != excluded)
        {
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x;
            }
        }
        let count = (self.vertices.len() - 1) as f64;
        centroid.iter_mut().for_each(|c| *c /= count);
        centroid
    }

    /// Point along the line from `from` through `towards`: `from + t * (towards - from)`.
    fn along(&self, from: &[f64], towards: &[f64], t: f64) -> Vec<f64> {
        let point = from
            .iter()
            .zip(towards)
            .map(|(a, b)| a + t * (b - a))
            .collect();
        self.clamp(point)
    }

    fn shrink_towards(&mut self, best: usize, sigma: f64) {
        let anchor = self.vertices[best].clone();
        for i in 0..self.vertices.len() {
            if i == best {
                continue;
            }
            let vertex = self.along(&anchor, &self.vertices[i].clone(), sigma);
            let value = self.eval(&vertex);
            self.replace(i, vertex, value);
        }
    }

    fn diameter_around(&self, centre: &[f64]) -> f64 {
        self.vertices
            .iter()
            .map(|v| {
                v.iter()
                    .zip(centre)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0, f64::max)
    }
}

/// Minimise `objective` with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as `+inf`, so the simplex moves
/// away from invalid parameter regions. Bounds clamp every trial point.
///
/// # Example
/// ```
/// use weekcast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] - 3.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            evaluations: 0,
            converged: false,
        };
    }

    let mut simplex = Simplex::new(objective, initial, bounds, config.initial_step);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let order = simplex.ranking();
        let (best, worst, second_worst) = (order[0], order[n], order[n - 1]);
        let best_value = simplex.values[best];

        let spread = simplex.values[worst] - best_value;
        if best_value.is_finite() && spread <= config.tolerance * (1.0 + best_value.abs()) {
            converged = true;
            break;
        }

        let centroid = simplex.centroid_without(worst);
        if simplex.diameter_around(&centroid) < config.tolerance {
            converged = best_value.is_finite();
            break;
        }

        let worst_vertex = simplex.vertices[worst].clone();
        let reflected = simplex.along(&centroid, &worst_vertex, -config.alpha);
        let reflected_value = simplex.eval(&reflected);

        if reflected_value < best_value {
            let expanded = simplex.along(&centroid, &reflected, config.gamma);
            let expanded_value = simplex.eval(&expanded);
            if expanded_value < reflected_value {
                simplex.replace(worst, expanded, expanded_value);
            } else {
                simplex.replace(worst, reflected, reflected_value);
            }
            continue;
        }

        if reflected_value < simplex.values[second_worst] {
            simplex.replace(worst, reflected, reflected_value);
            continue;
        }

        // Contract on the better side of the worst vertex.
        let (target, target_value) = if reflected_value < simplex.values[worst] {
            (reflected, reflected_value)
        } else {
            (worst_vertex, simplex.values[worst])
        };
        let contracted = simplex.along(&centroid, &target, config.rho);
        let contracted_value = simplex.eval(&contracted);
        if contracted_value < target_value {
            simplex.replace(worst, contracted, contracted_value);
            continue;
        }

        simplex.shrink_towards(best, config.sigma);
    }

    let best = simplex.ranking()[0];
    NelderMeadResult {
        optimal_point: simplex.vertices[best].clone(),
        optimal_value: simplex.values[best],
        iterations,
        evaluations: simplex.evaluations,
        converged,
    }
}

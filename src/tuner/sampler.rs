//! Seeded tree-structured Parzen estimator
//!
//! Each dimension is modelled on its own. After the random start-up phase,
//! the history is split into the best `gamma` fraction and the rest, a
//! Parzen density is fitted to each part, and among a batch of candidates
//! drawn from the good density the one maximising l(x)/g(x) is chosen.

use super::space::{Domain, SearchSpace};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

pub const DEFAULT_SEED: u64 = 42;

/// A finished trial as the sampler sees it
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub values: Vec<f64>,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct TpeSampler {
    rng: ChaCha8Rng,
    n_startup_trials: usize,
    gamma: f64,
    n_candidates: usize,
}

impl TpeSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            n_startup_trials: 10,
            gamma: 0.25,
            n_candidates: 24,
        }
    }

    /// Next point to evaluate, snapped onto each dimension's grid
    pub fn sample(&mut self, space: &SearchSpace, history: &[Observation]) -> Vec<f64> {
        if history.len() < self.n_startup_trials {
            return space
                .dimensions
                .iter()
                .map(|d| self.sample_uniform(&d.domain))
                .collect();
        }

        let mut ranked: Vec<&Observation> = history.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        let n_good = ((self.gamma * ranked.len() as f64).ceil() as usize).clamp(1, ranked.len());
        let (good, bad) = ranked.split_at(n_good);

        space
            .dimensions
            .iter()
            .enumerate()
            .map(|(i, dim)| {
                let good_points: Vec<f64> = good.iter().filter_map(|o| o.values.get(i).copied()).collect();
                let bad_points: Vec<f64> = bad.iter().filter_map(|o| o.values.get(i).copied()).collect();
                self.sample_dimension(&dim.domain, &good_points, &bad_points)
            })
            .collect()
    }

    fn sample_uniform(&mut self, domain: &Domain) -> f64 {
        let index = self.rng.gen_range(0..domain.cardinality().max(1));
        domain.point(index)
    }

    fn sample_dimension(&mut self, domain: &Domain, good: &[f64], bad: &[f64]) -> f64 {
        let good_density = Parzen::fit(domain, good);
        let bad_density = Parzen::fit(domain, bad);

        let mut best: Option<(f64, f64)> = None;
        for _ in 0..self.n_candidates {
            let candidate = domain.snap(good_density.draw(domain, &mut self.rng));
            let ratio = good_density.pdf(candidate) / bad_density.pdf(candidate).max(f64::MIN_POSITIVE);
            if best.map(|(_, r)| ratio > r).unwrap_or(true) {
                best = Some((candidate, ratio));
            }
        }

        best.map(|(x, _)| x)
            .unwrap_or_else(|| self.sample_uniform(domain))
    }
}

/// Gaussian kernels on observed points plus a uniform prior component
struct Parzen {
    points: Vec<f64>,
    bandwidth: f64,
    low: f64,
    high: f64,
}

impl Parzen {
    fn fit(domain: &Domain, points: &[f64]) -> Self {
        let (low, high) = domain.bounds();
        let range = (high - low).max(f64::EPSILON);
        let bandwidth = match domain {
            Domain::Bool => 0.5,
            Domain::Stepped { step, .. } => (range / (points.len() as f64 + 1.0).sqrt()).max(*step),
        };
        Self {
            points: points.to_vec(),
            bandwidth,
            low,
            high,
        }
    }

    fn components(&self) -> f64 {
        self.points.len() as f64 + 1.0
    }

    fn pdf(&self, x: f64) -> f64 {
        let range = (self.high - self.low).max(f64::EPSILON);
        let prior = 1.0 / range;
        let norm = 1.0 / (self.bandwidth * (2.0 * PI).sqrt());
        let kernels: f64 = self
            .points
            .iter()
            .map(|p| {
                let z = (x - p) / self.bandwidth;
                norm * (-0.5 * z * z).exp()
            })
            .sum();
        (kernels + prior) / self.components()
    }

    /// Pick a component uniformly, then sample it
    fn draw(&self, domain: &Domain, rng: &mut ChaCha8Rng) -> f64 {
        let component = rng.gen_range(0..self.points.len() + 1);
        match self.points.get(component) {
            Some(&center) => match domain {
                Domain::Bool => center,
                Domain::Stepped { .. } => center + self.bandwidth * standard_normal(rng),
            },
            None => rng.gen_range(self.low..=self.high),
        }
    }
}

/// Box-Muller transform
fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

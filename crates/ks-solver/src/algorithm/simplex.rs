use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use ks_types::ranking::rank_strict;
use ks_types::{AlgorithmError, KsResult, Objective, Problem, Trial};

use super::SearchAlgorithm;
use crate::rating::Rating;
use crate::run::{AlgorithmRun, EvalOutcome};

/// Nelder-Mead coefficients for [`SimplexSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexConfig {
    /// Edge length of a fresh simplex as a fraction of each span.
    pub initial_step: f64,
    pub reflection: f64,
    pub expansion: f64,
    pub contraction: f64,
    pub shrink: f64,
    /// Relative simplex size below which the simplex is rebuilt.
    pub tolerance: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            initial_step: 0.1,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
            tolerance: 1e-9,
        }
    }
}

impl SimplexConfig {
    pub fn validate(&self) -> KsResult<()> {
        let ok = self.initial_step > 0.0
            && self.initial_step <= 0.5
            && self.reflection > 0.0
            && self.expansion > 1.0
            && self.expansion > self.reflection
            && self.contraction > 0.0
            && self.contraction < 1.0
            && self.shrink > 0.0
            && self.shrink < 1.0
            && self.tolerance > 0.0;
        if ok {
            Ok(())
        } else {
            Err(AlgorithmError::InvalidConfig {
                message: format!("invalid simplex search configuration: {self:?}"),
            }
            .into())
        }
    }
}

/// Bounded Nelder-Mead search.
///
/// Keeps an `n + 1` vertex simplex and performs one reflection, expansion,
/// contraction or shrink step per run. Candidate points are clamped into
/// the variable bounds. When the simplex collapses it is rebuilt around
/// the incumbent, and optima found by peers replace the worst vertex.
#[derive(Debug, Clone)]
pub struct SimplexSearch {
    config: SimplexConfig,
    vertices: Vec<Arc<Trial>>,
    incumbent: Option<Arc<Trial>>,
    objectives: Vec<Objective>,
    dimensions: usize,
    /// Edge length used by the next build, as a fraction of span.
    edge: f64,
    /// Iterations since the best vertex last changed.
    stall: usize,
    momentum: u8,
    restarts: u32,
}

impl SimplexSearch {
    pub fn new(config: SimplexConfig) -> KsResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: SimplexConfig) -> Self {
        Self {
            edge: config.initial_step,
            config,
            vertices: Vec::new(),
            incumbent: None,
            objectives: Vec::new(),
            dimensions: 0,
            stall: 0,
            momentum: 3,
            restarts: 0,
        }
    }

    /// Vertices of the current simplex, best first after each iteration.
    pub fn vertices(&self) -> &[Arc<Trial>] {
        &self.vertices
    }

    pub fn incumbent(&self) -> Option<&Arc<Trial>> {
        self.incumbent.as_ref()
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    fn is_complete(&self) -> bool {
        self.dimensions > 0 && self.vertices.len() == self.dimensions + 1
    }

    fn evaluate_at(run: &mut AlgorithmRun<'_>, coordinates: &[f64]) -> KsResult<Option<Arc<Trial>>> {
        let point = run.problem().point_from_coordinates(coordinates)?;
        match run.evaluate_trial_point(point)? {
            EvalOutcome::Evaluated(trial) => Ok(Some(trial)),
            EvalOutcome::Terminated => Ok(None),
        }
    }

    /// Evaluate the missing vertices. Returns `false` if the run ended first.
    fn build(&mut self, run: &mut AlgorithmRun<'_>) -> KsResult<bool> {
        let problem = run.problem();
        if self.vertices.is_empty() {
            let base = match &self.incumbent {
                Some(incumbent) => incumbent.clone(),
                None => match Self::evaluate_at(run, &problem.coordinates(&problem.initial_point()))? {
                    Some(trial) => trial,
                    None => return Ok(false),
                },
            };
            self.vertices.push(base);
        }

        let base = problem.coordinates(self.vertices[0].point());
        // Alternate the edge direction on every rebuild.
        let sign = if self.restarts % 2 == 0 { 1.0 } else { -1.0 };
        while self.vertices.len() <= self.dimensions {
            let axis = self.vertices.len() - 1;
            let variable = &problem.variables()[axis];
            if variable.is_fixed() {
                let base_trial = self.vertices[0].clone();
                self.vertices.push(base_trial);
                continue;
            }

            let delta = sign * self.edge * variable.span();
            let forward = base[axis] + delta;
            let mut coordinates = base.clone();
            coordinates[axis] = if variable.contains(forward) {
                forward
            } else {
                variable.clamp(base[axis] - delta)
            };
            match Self::evaluate_at(run, &coordinates)? {
                Some(trial) => self.vertices.push(trial),
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn sort_vertices(&mut self) {
        let objectives = &self.objectives;
        self.vertices.sort_by(|a, b| rank_strict(objectives, a, b));
    }

    fn better(&self, a: &Trial, b: &Trial) -> bool {
        rank_strict(&self.objectives, a, b) == Ordering::Less
    }

    /// Drop the simplex so the next build starts around the incumbent
    /// with edges of `edge`.
    fn restart(&mut self, edge: f64) {
        debug!(
            "Rebuilding simplex around the incumbent (restart {}, edge {:.3e})",
            self.restarts + 1,
            edge
        );
        self.vertices.clear();
        self.edge = edge;
        self.stall = 0;
        self.momentum = 0;
        self.restarts += 1;
    }

    /// One Nelder-Mead iteration on a complete, sorted simplex.
    fn iterate(&mut self, run: &mut AlgorithmRun<'_>) -> KsResult<()> {
        let problem = run.problem();
        let n = self.dimensions;
        let coords: Vec<Vec<f64>> = self
            .vertices
            .iter()
            .map(|v| problem.coordinates(v.point()))
            .collect();

        let mut centroid = vec![0.0; n];
        for vertex in &coords[..n] {
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x / n as f64;
            }
        }
        let worst = &coords[n];
        let toward = |from: &[f64], to: &[f64], factor: f64| -> Vec<f64> {
            from.iter()
                .zip(to)
                .map(|(f, t)| f + factor * (t - f))
                .collect::<Vec<f64>>()
        };

        let reflected = toward(&centroid, worst, -self.config.reflection);
        let Some(xr) = Self::evaluate_at(run, &reflected)? else {
            return Ok(());
        };

        if self.better(&xr, &self.vertices[0]) {
            let expanded = toward(&centroid, &reflected, self.config.expansion);
            let Some(xe) = Self::evaluate_at(run, &expanded)? else {
                self.vertices[n] = xr;
                return Ok(());
            };
            self.vertices[n] = if self.better(&xe, &xr) { xe } else { xr };
            return Ok(());
        }

        if self.better(&xr, &self.vertices[n - 1]) {
            self.vertices[n] = xr;
            return Ok(());
        }

        let outside = self.better(&xr, &self.vertices[n]);
        let contracted = if outside {
            toward(&centroid, &reflected, self.config.contraction)
        } else {
            toward(&centroid, worst, self.config.contraction)
        };
        let Some(xc) = Self::evaluate_at(run, &contracted)? else {
            return Ok(());
        };
        let accepted = if outside {
            !self.better(&xr, &xc)
        } else {
            self.better(&xc, &self.vertices[n])
        };
        if accepted {
            self.vertices[n] = xc;
            return Ok(());
        }

        for i in 1..=n {
            let shrunk = toward(&coords[0], &coords[i], self.config.shrink);
            match Self::evaluate_at(run, &shrunk)? {
                Some(trial) => self.vertices[i] = trial,
                None => return Ok(()),
            }
        }
        Ok(())
    }
}

impl Default for SimplexSearch {
    fn default() -> Self {
        Self::from_config(SimplexConfig::default())
    }
}

const STALL_ITERATIONS: usize = 10;

/// Largest vertex offset from the first vertex, relative to each span.
fn relative_size(problem: &Problem, vertices: &[Arc<Trial>]) -> f64 {
    let Some(first) = vertices.first() else {
        return 0.0;
    };
    let origin = problem.coordinates(first.point());
    let mut size: f64 = 0.0;
    for vertex in &vertices[1..] {
        let coords = problem.coordinates(vertex.point());
        for ((variable, x), o) in problem.variables().iter().zip(&coords).zip(&origin) {
            if !variable.is_fixed() {
                size = size.max((x - o).abs() / variable.span());
            }
        }
    }
    size
}

impl SearchAlgorithm for SimplexSearch {
    fn label(&self) -> &str {
        "Simplex Search"
    }

    fn perform_run(&mut self, run: &mut AlgorithmRun<'_>) -> KsResult<()> {
        let problem = run.problem();
        if self.objectives.is_empty() {
            self.objectives = problem.objectives().to_vec();
            self.dimensions = problem.dimensions();
        }

        if !self.is_complete() {
            if self.build(run)? {
                self.sort_vertices();
            }
            return Ok(());
        }

        let size = relative_size(problem, &self.vertices);
        if size < self.config.tolerance {
            self.restart(self.config.initial_step);
            if self.build(run)? {
                self.sort_vertices();
            }
            return Ok(());
        }

        let previous_best = self.vertices[0].sequence;
        self.iterate(run)?;
        self.sort_vertices();
        if self.vertices[0].sequence != previous_best {
            self.stall = 0;
            self.momentum = (self.momentum + 2).min(Rating::MAX.value());
        } else {
            self.stall += 1;
            self.momentum = self.momentum.saturating_sub(1);
        }

        // A simplex flattened against a bound stops making progress
        // without ever collapsing; rebuild it at its current scale.
        if self.stall >= STALL_ITERATIONS * (self.dimensions + 1) {
            let edge = size.clamp(self.config.tolerance * 10.0, self.config.initial_step);
            self.restart(edge);
        }
        Ok(())
    }

    fn global_rating(&self) -> Rating {
        Rating::new(4)
    }

    fn local_rating(&self) -> Rating {
        Rating::new(self.momentum)
    }

    fn found_new_optimal_solution(&mut self, solutions: &[Arc<Trial>], _solution: &Arc<Trial>) {
        let Some(best) = solutions.first() else {
            return;
        };
        self.incumbent = Some(best.clone());

        if !self.is_complete() || self.vertices.iter().any(|v| v.sequence == best.sequence) {
            return;
        }
        self.sort_vertices();
        if let Some(worst) = self.vertices.last_mut() {
            *worst = best.clone();
        }
        self.sort_vertices();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_types::{Evaluation, TrialPoint, Variable};

    fn problem() -> Problem {
        Problem::new(
            vec![
                Variable::new("x", -1.0, 1.0).unwrap(),
                Variable::fixed("y", 0.5).unwrap(),
            ],
            vec![Objective::minimize("f")],
            |p: &TrialPoint| Evaluation::scored("f", p.value("x").unwrap_or(0.0).powi(2)),
        )
        .unwrap()
    }

    fn trial(seq: u64, x: f64) -> Arc<Trial> {
        let point: TrialPoint = [("x", x), ("y", 0.5)].into_iter().collect();
        Arc::new(Trial::new(seq, point, Evaluation::scored("f", x * x), "test"))
    }

    #[test]
    fn config_validation() {
        assert!(SimplexConfig::default().validate().is_ok());
        let wide = SimplexConfig {
            initial_step: 0.8,
            ..SimplexConfig::default()
        };
        assert!(SimplexSearch::new(wide).is_err());
        let flat = SimplexConfig {
            expansion: 0.9,
            ..SimplexConfig::default()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn relative_size_ignores_fixed_axes() {
        let problem = problem();
        let vertices = vec![trial(0, 0.0), trial(1, 0.5), trial(2, 0.0)];
        assert!((relative_size(&problem, &vertices) - 0.25).abs() < 1e-12);
        let collapsed = vec![trial(0, 0.1), trial(1, 0.1), trial(2, 0.1)];
        assert_eq!(relative_size(&problem, &collapsed), 0.0);
    }

    #[test]
    fn peer_optimum_replaces_worst_vertex() {
        let problem = problem();
        let mut ss = SimplexSearch::default();
        ss.objectives = problem.objectives().to_vec();
        ss.dimensions = problem.dimensions();
        ss.vertices = vec![trial(0, 0.2), trial(1, 0.4), trial(2, 0.8)];

        let peer = trial(7, 0.05);
        ss.found_new_optimal_solution(&[peer.clone()], &peer);

        let sequences: Vec<u64> = ss.vertices().iter().map(|v| v.sequence).collect();
        assert_eq!(sequences, vec![7, 0, 1]);
        assert_eq!(ss.incumbent().map(|t| t.sequence), Some(7));

        // Already a vertex: nothing changes.
        ss.found_new_optimal_solution(&[peer.clone()], &peer);
        assert_eq!(ss.vertices().len(), 3);
    }

    #[test]
    fn incomplete_simplex_only_tracks_incumbent() {
        let mut ss = SimplexSearch::default();
        let peer = trial(3, 0.3);
        ss.found_new_optimal_solution(&[peer.clone()], &peer);
        assert!(ss.vertices().is_empty());
        assert_eq!(ss.incumbent().map(|t| t.sequence), Some(3));
    }

    #[test]
    fn restart_clears_simplex() {
        let mut ss = SimplexSearch::default();
        ss.vertices = vec![trial(0, 0.1)];
        ss.restart(0.01);
        assert!(ss.vertices().is_empty());
        assert_eq!(ss.edge, 0.01);
        assert_eq!(ss.restarts(), 1);
        assert_eq!(ss.local_rating(), Rating::MIN);
        assert_eq!(ss.global_rating(), Rating::new(4));
    }
}

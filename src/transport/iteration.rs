//! Two-level iteration: source iteration over the per-unknown solves, and power iteration
//! around it for the k-eigenvalue problem.

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::ReflectiveMode;
use crate::context::KspContext;
use crate::error::{IterationStage, TransportError};
use crate::parallel::WorkerPool;
use crate::transport::reflective::ReflectiveStrategy;
use crate::transport::setup::TransportSetup;
use crate::transport::source::{generate_fixed_source, generate_ho_source};
use crate::utils::norms::{l1_norm, max_relative_l1_difference};

/// Linear system and vectors of one (direction, group) unknown.
pub struct UnknownSystem {
    pub ksp: KspContext,
    pub angular_flux: Vec<f64>,
    pub rhs: Vec<f64>,
    /// Inflow from prescribed incident fluxes, fixed after assembly.
    pub boundary_rhs: Vec<f64>,
}

/// One outer generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub k_eff: f64,
    pub k_error: f64,
    pub phi_error: f64,
    pub inner_iterations: usize,
}

/// Convergence history of the last solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IterationHistory {
    /// Relative scalar-flux change of every inner iteration, over all generations.
    pub inner_errors: Vec<f64>,
    pub generations: Vec<GenerationRecord>,
}

/// Scalar fluxes, sources and eigenvalue carried between iterations.
#[derive(Debug, Clone)]
pub struct SolverState {
    pub scalar_flux: Vec<Vec<f64>>,
    /// Moments of the previous inner iterate.
    pub scalar_flux_old: Vec<Vec<f64>>,
    /// Moments at the start of the current generation.
    pub scalar_flux_prev_gen: Vec<Vec<f64>>,
    /// Fixed or fission source per group.
    pub fixed_rhs: Vec<Vec<f64>>,
    pub k_eff: f64,
    pub k_eff_prev: f64,
    pub history: IterationHistory,
    rhs_scratch: Vec<Vec<f64>>,
}

impl SolverState {
    pub fn new(n_group: usize, n_unknowns: usize, n_dofs: usize) -> Self {
        let zeros = vec![vec![0.0; n_dofs]; n_group];
        Self {
            scalar_flux: zeros.clone(),
            scalar_flux_old: zeros.clone(),
            scalar_flux_prev_gen: zeros.clone(),
            fixed_rhs: zeros,
            k_eff: 1.0,
            k_eff_prev: 1.0,
            history: IterationHistory::default(),
            rhs_scratch: vec![vec![0.0; n_dofs]; n_unknowns],
        }
    }
}

/// Solve every unknown against its current right-hand side, starting from zero.
pub fn solve_all<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    pool: &WorkerPool,
    systems: &mut [UnknownSystem],
) -> Result<(), TransportError> {
    pool.try_for_each(systems, |k, sys| {
        sys.angular_flux.iter_mut().for_each(|v| *v = 0.0);
        let stats = sys
            .ksp
            .solve_context(&sys.rhs, &mut sys.angular_flux)
            .map_err(|source| TransportError::LinearSolve { unknown: k, source })?;
        if !stats.converged {
            return Err(TransportError::LinearSolveStalled {
                unknown: k,
                iterations: stats.iterations,
                residual: stats.final_residual,
            });
        }
        setup.constraints.distribute(&mut sys.angular_flux);
        debug!("unknown {k}: {} iterations, residual {:.3e}", stats.iterations, stats.final_residual);
        Ok(())
    })
}

/// `φ_g = Σ_d w_d ψ_(d,g)`
pub fn update_moments<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    systems: &[UnknownSystem],
    scalar_flux: &mut [Vec<f64>],
) {
    for (g, phi) in scalar_flux.iter_mut().enumerate() {
        phi.iter_mut().for_each(|v| *v = 0.0);
        for d in 0..setup.index_map.n_dir() {
            let w = setup.quadrature.weight(d);
            let psi = &systems[setup.index_map.index_of(d, g)].angular_flux;
            for (p, s) in phi.iter_mut().zip(psi) {
                *p += w * s;
            }
        }
    }
}

/// Build every right-hand side from the current moments and angular fluxes.
fn build_sources<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    reflective: &dyn ReflectiveStrategy<DIM>,
    pool: &WorkerPool,
    systems: &mut [UnknownSystem],
    state: &mut SolverState,
) -> Result<(), TransportError> {
    {
        let psi: Vec<&[f64]> = systems.iter().map(|s| s.angular_flux.as_slice()).collect();
        let boundary: Vec<&[f64]> = systems.iter().map(|s| s.boundary_rhs.as_slice()).collect();
        let fixed = &state.fixed_rhs;
        let phi = &state.scalar_flux;
        pool.try_for_each(&mut state.rhs_scratch, |k, out| {
            let g = setup.index_map.group_of(k);
            generate_ho_source(setup, reflective, k, &fixed[g], boundary[k], phi, &psi, out);
            Ok::<(), TransportError>(())
        })?;
    }
    for (sys, rhs) in systems.iter_mut().zip(state.rhs_scratch.iter_mut()) {
        std::mem::swap(&mut sys.rhs, rhs);
    }
    Ok(())
}

/// Source iteration until the scalar fluxes stop changing.
///
/// Returns the number of inner iterations performed.
pub fn source_iteration<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    reflective: &dyn ReflectiveStrategy<DIM>,
    pool: &WorkerPool,
    systems: &mut [UnknownSystem],
    state: &mut SolverState,
) -> Result<usize, TransportError> {
    let max_iterations = setup.config.max_inner_iterations;
    let mut error = f64::INFINITY;
    for it in 1..=max_iterations {
        build_sources(setup, reflective, pool, systems, state)?;
        solve_all(setup, pool, systems)?;
        std::mem::swap(&mut state.scalar_flux_old, &mut state.scalar_flux);
        update_moments(setup, systems, &mut state.scalar_flux);
        error = max_relative_l1_difference(&state.scalar_flux, &state.scalar_flux_old);
        state.history.inner_errors.push(error);
        debug!("source iteration {it}: relative change {error:.6e}");
        if error < setup.config.inner_tol {
            return Ok(it);
        }
    }
    warn!("source iteration stopped after {max_iterations} iterations, relative change {error:.3e}");
    if reflective.mode() == ReflectiveMode::Implicit && !setup.config.reflective_boundaries.is_empty() {
        warn!("lagged reflection converges in O(1/h) sweeps; raise max_inner_iterations or use explicit reflection");
    }
    Err(TransportError::NotConverged { stage: IterationStage::Inner, iterations: max_iterations, error })
}

/// `Σ_c ∫_c Σ_g νσf(m, g) φ_g` over fissile cells.
pub fn fission_source<const DIM: usize>(setup: &TransportSetup<DIM>, scalar_flux: &[Vec<f64>]) -> f64 {
    let lib = &setup.materials;
    scalar_flux
        .iter()
        .enumerate()
        .map(|(g, phi)| {
            setup.integrate(phi, |c| {
                let m = setup.mesh.material_id(c);
                if lib.is_fissile(m) { lib.nu_sigma_f(m, g) } else { 0.0 }
            })
        })
        .sum()
}

/// Divide the scalar and angular fluxes by `‖φ_0‖₁`; returns the divisor.
///
/// A vanishing first group leaves the fluxes untouched and returns 1.
pub fn renormalize(state: &mut SolverState, systems: &mut [UnknownSystem]) -> f64 {
    let norm = state.scalar_flux.first().map_or(0.0, |phi| l1_norm(phi));
    if !(norm > 0.0) || !norm.is_finite() {
        return 1.0;
    }
    for v in state.scalar_flux.iter_mut().flatten() {
        *v /= norm;
    }
    for v in systems.iter_mut().flat_map(|s| s.angular_flux.iter_mut()) {
        *v /= norm;
    }
    norm
}

/// Power iteration on `k_eff`, starting from a flat flux and `k = 1`.
pub fn power_iteration<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    reflective: &dyn ReflectiveStrategy<DIM>,
    pool: &WorkerPool,
    systems: &mut [UnknownSystem],
    state: &mut SolverState,
) -> Result<(), TransportError> {
    let config = &setup.config;
    state.k_eff = 1.0;
    state.k_eff_prev = 1.0;
    state.scalar_flux.iter_mut().flatten().for_each(|v| *v = 1.0);
    renormalize(state, systems);
    let mut fission_prev = fission_source(setup, &state.scalar_flux);
    if !(fission_prev > 0.0) {
        return Err(TransportError::InvalidInput("no fissile material in the domain".into()));
    }

    let mut k_error = f64::INFINITY;
    let mut phi_error = f64::INFINITY;
    for generation in 1..=config.max_outer_iterations {
        state.scalar_flux_prev_gen.clone_from(&state.scalar_flux);
        state.k_eff_prev = state.k_eff;
        generate_fixed_source(setup, true, state.k_eff_prev, &state.scalar_flux, &mut state.fixed_rhs);
        let inner_iterations = source_iteration(setup, reflective, pool, systems, state)?;

        let fission_new = fission_source(setup, &state.scalar_flux);
        state.k_eff = state.k_eff_prev * fission_new / fission_prev;
        let factor = renormalize(state, systems);
        fission_prev = fission_new / factor;

        k_error = ((state.k_eff - state.k_eff_prev) / state.k_eff).abs();
        phi_error = max_relative_l1_difference(&state.scalar_flux, &state.scalar_flux_prev_gen);
        state.history.generations.push(GenerationRecord {
            generation,
            k_eff: state.k_eff,
            k_error,
            phi_error,
            inner_iterations,
        });
        info!(
            "generation {generation}: k_eff = {:.8}, dk/k = {k_error:.3e}, dphi = {phi_error:.3e} ({inner_iterations} inner)",
            state.k_eff
        );
        if k_error < config.k_tol && phi_error < config.phi_tol {
            info!("power iteration converged: k_eff = {:.8}", state.k_eff);
            return Ok(());
        }
    }
    warn!(
        "power iteration stopped after {} generations (dk/k = {k_error:.3e}, dphi = {phi_error:.3e})",
        config.max_outer_iterations
    );
    Err(TransportError::NotConverged {
        stage: IterationStage::Outer,
        iterations: config.max_outer_iterations,
        error: k_error.max(phi_error),
    })
}

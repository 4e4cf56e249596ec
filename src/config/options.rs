//! Run options for the transport engine.
//!
//! This module provides the `TransportConfig` struct, which is deserialized from JSON with
//! `serde_json` and gathers everything the engine needs beyond mesh, materials and angular
//! quadrature: the spatial discretization kind, boundary treatment, iteration tolerances and
//! budgets, and the options of the per-unknown linear solves (`PcOptions`). Every field has a
//! default, so `{}` is a valid configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::PC;
use crate::error::TransportError;

/// Continuous or discontinuous Lagrange elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discretization {
    Cfem,
    #[default]
    Dfem,
}

/// Where reflective-boundary coupling enters the discrete system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectiveMode {
    /// Lagged source term built from the previous inner iterate.
    ///
    /// The reflected inflow is imposed weakly from the previous sweep, and each sweep
    /// corrects it by an amount proportional to the cell size. Source iterations grow
    /// like `1/h` under refinement: a unit slab of 160 cells takes well over 1000.
    /// Fine meshes need a larger `max_inner_iterations` or `Explicit`.
    #[default]
    Implicit,
    /// Coupling term in the system matrix.
    Explicit,
}

/// Preconditioner types & parameters for the per-unknown solves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcOptions {
    /// Preconditioner kind (none, jacobi, ssor)
    pub pc: PC,

    /// Absolute residual tolerance per degree of freedom
    pub abs_tol_per_dof: f64,

    /// Relative residual tolerance, applied together with the absolute one
    pub rel_tol: f64,

    /// Iteration cap; `None` means `10 · n_dofs + 100`
    pub max_iters: Option<usize>,
}

impl Default for PcOptions {
    fn default() -> Self {
        Self {
            pc: PC::default(),
            abs_tol_per_dof: 1e-15,
            rel_tol: 1e-12,
            max_iters: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub discretization: Discretization,
    /// Polynomial order of the Lagrange elements, at least 1.
    pub p_order: usize,
    /// Run power iteration instead of a fixed-source solve.
    pub eigen: bool,
    /// Boundary ids treated as specular reflectors.
    pub reflective_boundaries: Vec<usize>,
    pub reflective_mode: ReflectiveMode,
    /// Isotropic incident angular flux per group, keyed by vacuum boundary id.
    pub incident_flux: BTreeMap<usize, Vec<f64>>,
    /// Overrides the `p(p+1)` penalty scale of the interior-penalty coefficient.
    pub penalty_scale: Option<f64>,
    pub inner_tol: f64,
    pub k_tol: f64,
    pub phi_tol: f64,
    /// Source-iteration budget. See [`ReflectiveMode::Implicit`] for refined meshes.
    pub max_inner_iterations: usize,
    pub max_outer_iterations: usize,
    pub linear: PcOptions,
    /// Worker threads for the per-unknown solves; `None` uses every core.
    pub threads: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            discretization: Discretization::default(),
            p_order: 1,
            eigen: false,
            reflective_boundaries: Vec::new(),
            reflective_mode: ReflectiveMode::default(),
            incident_flux: BTreeMap::new(),
            penalty_scale: None,
            inner_tol: 1e-7,
            k_tol: 1e-6,
            phi_tol: 1e-6,
            max_inner_iterations: 1000,
            max_outer_iterations: 500,
            linear: PcOptions::default(),
            threads: None,
        }
    }
}

impl TransportConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, TransportError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), TransportError> {
        if self.p_order == 0 {
            return Err(TransportError::InvalidInput("p_order must be at least 1".into()));
        }
        for (name, tol) in [
            ("inner_tol", self.inner_tol),
            ("k_tol", self.k_tol),
            ("phi_tol", self.phi_tol),
        ] {
            if !(tol > 0.0 && tol.is_finite()) {
                return Err(TransportError::InvalidInput(format!("{name} must be positive, got {tol}")));
            }
        }
        if self.max_inner_iterations == 0 || self.max_outer_iterations == 0 {
            return Err(TransportError::InvalidInput("iteration budgets must be positive".into()));
        }
        if let Some(b) = self.reflective_boundaries.iter().find(|&b| self.incident_flux.contains_key(b)) {
            return Err(TransportError::InvalidInput(format!(
                "boundary {b} is reflective and also carries an incident flux"
            )));
        }
        if self.threads == Some(0) {
            return Err(TransportError::InvalidInput("threads must be positive".into()));
        }
        Ok(())
    }

    /// Penalty scale `c` in `τ(d) = c · ‖Ω Ωᵀ‖_F`.
    pub fn penalty_scale(&self) -> f64 {
        self.penalty_scale
            .unwrap_or_else(|| (self.p_order * (self.p_order + 1)) as f64)
    }

    pub fn is_reflective(&self, boundary: usize) -> bool {
        self.reflective_boundaries.contains(&boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = TransportConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, TransportConfig::default());
        assert_eq!(cfg.penalty_scale(), 2.0);
    }

    #[test]
    fn full_document_parses() {
        let json = r#"{
            "discretization": "cfem",
            "p_order": 2,
            "eigen": true,
            "reflective_boundaries": [0, 1],
            "reflective_mode": "explicit",
            "incident_flux": { "2": [1.0, 0.5] },
            "linear": { "pc": { "type": "jacobi" }, "rel_tol": 1e-10 },
            "threads": 2
        }"#;
        let cfg = TransportConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.discretization, Discretization::Cfem);
        assert_eq!(cfg.reflective_mode, ReflectiveMode::Explicit);
        assert_eq!(cfg.incident_flux[&2], vec![1.0, 0.5]);
        assert_eq!(cfg.linear.pc, PC::Jacobi);
        assert_eq!(cfg.linear.abs_tol_per_dof, 1e-15);
        assert_eq!(cfg.penalty_scale(), 6.0);
        assert!(cfg.is_reflective(1) && !cfg.is_reflective(2));
        let round = TransportConfig::from_json_str(&cfg.to_json_string().unwrap()).unwrap();
        assert_eq!(round.discretization, cfg.discretization);
        assert_eq!(round.reflective_boundaries, cfg.reflective_boundaries);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        assert!(matches!(
            TransportConfig::from_json_str(r#"{"p_order": 0}"#),
            Err(TransportError::InvalidInput(_))
        ));
        assert!(matches!(
            TransportConfig::from_json_str(r#"{"reflective_boundaries": [0], "incident_flux": {"0": [1.0]}}"#),
            Err(TransportError::InvalidInput(_))
        ));
        assert!(matches!(
            TransportConfig::from_json_str(r#"{"discretization": "fv"}"#),
            Err(TransportError::Config(_))
        ));
    }
}

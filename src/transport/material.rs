//! Multigroup cross sections.
//!
//! Transfer tables are indexed `[g_in][g_out]`. The library divides the isotropic scattering,
//! fission transfer and fixed source by the total quadrature weight once, so the source builder
//! works with per-steradian values directly.

use crate::error::TransportError;

/// Cross sections of one material, built with the `with_*` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub sigma_t: Vec<f64>,
    pub sigma_s: Vec<Vec<f64>>,
    pub nu_sigma_f: Vec<f64>,
    pub chi_nu_sigma_f: Vec<Vec<f64>>,
    pub fixed_source: Vec<f64>,
}

impl Material {
    /// Pure absorber with total cross sections `sigma_t`.
    pub fn new(sigma_t: Vec<f64>) -> Self {
        let n = sigma_t.len();
        Self {
            sigma_t,
            sigma_s: vec![vec![0.0; n]; n],
            nu_sigma_f: vec![0.0; n],
            chi_nu_sigma_f: vec![vec![0.0; n]; n],
            fixed_source: vec![0.0; n],
        }
    }

    pub fn with_scattering(mut self, sigma_s: Vec<Vec<f64>>) -> Self {
        self.sigma_s = sigma_s;
        self
    }

    /// Fission with spectrum `chi`: `χνσf(gin → g) = χ(g) · νσf(gin)`.
    pub fn with_fission(mut self, nu_sigma_f: Vec<f64>, chi: &[f64]) -> Self {
        self.chi_nu_sigma_f = nu_sigma_f
            .iter()
            .map(|&nsf| chi.iter().map(|&c| c * nsf).collect())
            .collect();
        self.nu_sigma_f = nu_sigma_f;
        self
    }

    /// Fission with an explicit transfer table.
    pub fn with_fission_transfer(mut self, nu_sigma_f: Vec<f64>, chi_nu_sigma_f: Vec<Vec<f64>>) -> Self {
        self.nu_sigma_f = nu_sigma_f;
        self.chi_nu_sigma_f = chi_nu_sigma_f;
        self
    }

    pub fn with_fixed_source(mut self, q: Vec<f64>) -> Self {
        self.fixed_source = q;
        self
    }

    pub fn n_group(&self) -> usize {
        self.sigma_t.len()
    }

    pub fn is_fissile(&self) -> bool {
        self.nu_sigma_f.iter().any(|&v| v > 0.0)
    }

    fn validate(&self, id: usize, n_group: usize) -> Result<(), TransportError> {
        let check = |what: &'static str, found: usize| {
            if found == n_group {
                Ok(())
            } else {
                Err(TransportError::SizeMismatch { what, expected: n_group, found })
            }
        };
        check("total cross sections", self.sigma_t.len())?;
        check("scattering rows", self.sigma_s.len())?;
        check("nu-fission", self.nu_sigma_f.len())?;
        check("fission transfer rows", self.chi_nu_sigma_f.len())?;
        check("fixed source", self.fixed_source.len())?;
        for row in self.sigma_s.iter().chain(&self.chi_nu_sigma_f) {
            check("transfer columns", row.len())?;
        }
        if let Some(g) = self.sigma_t.iter().position(|s| !(*s > 0.0 && s.is_finite())) {
            return Err(TransportError::InvalidInput(format!(
                "material {id}: total cross section of group {g} must be positive"
            )));
        }
        Ok(())
    }
}

/// All materials of a problem, indexed by material id.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    n_group: usize,
    materials: Vec<Material>,
    inv_sigma_t: Vec<Vec<f64>>,
    sigma_s_per_ster: Vec<Vec<Vec<f64>>>,
    chi_nu_sigma_f_per_ster: Vec<Vec<Vec<f64>>>,
    q_per_ster: Vec<Vec<f64>>,
}

impl MaterialLibrary {
    pub fn new(materials: Vec<Material>, total_weight: f64) -> Result<Self, TransportError> {
        let n_group = materials
            .first()
            .map(Material::n_group)
            .ok_or_else(|| TransportError::InvalidInput("no materials".into()))?;
        if n_group == 0 {
            return Err(TransportError::InvalidInput("materials have no energy groups".into()));
        }
        if !(total_weight > 0.0) {
            return Err(TransportError::InvalidInput(format!("total quadrature weight {total_weight}")));
        }
        for (id, m) in materials.iter().enumerate() {
            m.validate(id, n_group)?;
        }
        let scale_table = |t: &Vec<Vec<f64>>| -> Vec<Vec<f64>> {
            t.iter().map(|row| row.iter().map(|v| v / total_weight).collect()).collect()
        };
        Ok(Self {
            n_group,
            inv_sigma_t: materials.iter().map(|m| m.sigma_t.iter().map(|s| 1.0 / s).collect()).collect(),
            sigma_s_per_ster: materials.iter().map(|m| scale_table(&m.sigma_s)).collect(),
            chi_nu_sigma_f_per_ster: materials.iter().map(|m| scale_table(&m.chi_nu_sigma_f)).collect(),
            q_per_ster: materials
                .iter()
                .map(|m| m.fixed_source.iter().map(|q| q / total_weight).collect())
                .collect(),
            materials,
        })
    }

    pub fn n_group(&self) -> usize {
        self.n_group
    }

    pub fn n_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn material(&self, id: usize) -> &Material {
        &self.materials[id]
    }

    #[inline]
    pub fn sigma_t(&self, id: usize, g: usize) -> f64 {
        self.materials[id].sigma_t[g]
    }

    #[inline]
    pub fn inv_sigma_t(&self, id: usize, g: usize) -> f64 {
        self.inv_sigma_t[id][g]
    }

    #[inline]
    pub fn sigma_s_per_ster(&self, id: usize, g_in: usize, g: usize) -> f64 {
        self.sigma_s_per_ster[id][g_in][g]
    }

    #[inline]
    pub fn chi_nu_sigma_f_per_ster(&self, id: usize, g_in: usize, g: usize) -> f64 {
        self.chi_nu_sigma_f_per_ster[id][g_in][g]
    }

    #[inline]
    pub fn nu_sigma_f(&self, id: usize, g: usize) -> f64 {
        self.materials[id].nu_sigma_f[g]
    }

    #[inline]
    pub fn fixed_source(&self, id: usize, g: usize) -> f64 {
        self.materials[id].fixed_source[g]
    }

    #[inline]
    pub fn q_per_ster(&self, id: usize, g: usize) -> f64 {
        self.q_per_ster[id][g]
    }

    pub fn is_fissile(&self, id: usize) -> bool {
        self.materials[id].is_fissile()
    }

    pub fn any_fissile(&self) -> bool {
        self.materials.iter().any(Material::is_fissile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn per_steradian_tables() {
        let fuel = Material::new(vec![1.0, 2.0])
            .with_scattering(vec![vec![0.2, 0.1], vec![0.0, 0.5]])
            .with_fission(vec![0.3, 0.6], &[1.0, 0.0]);
        let lib = MaterialLibrary::new(vec![fuel], 4.0).unwrap();
        assert_eq!(lib.n_group(), 2);
        assert!(lib.is_fissile(0));
        assert_relative_eq!(lib.inv_sigma_t(0, 1), 0.5);
        assert_relative_eq!(lib.sigma_s_per_ster(0, 0, 1), 0.025);
        // everything is born in group 0
        assert_relative_eq!(lib.chi_nu_sigma_f_per_ster(0, 1, 0), 0.15);
        assert_eq!(lib.chi_nu_sigma_f_per_ster(0, 1, 1), 0.0);
    }

    #[test]
    fn inconsistent_tables_are_rejected() {
        let bad = Material::new(vec![1.0, 1.0]).with_fixed_source(vec![1.0]);
        assert!(matches!(
            MaterialLibrary::new(vec![bad], 1.0),
            Err(TransportError::SizeMismatch { what: "fixed source", .. })
        ));
        let void = Material::new(vec![0.0]);
        assert!(MaterialLibrary::new(vec![void], 1.0).is_err());
        let mixed = vec![Material::new(vec![1.0]), Material::new(vec![1.0, 1.0])];
        assert!(MaterialLibrary::new(mixed, 1.0).is_err());
    }
}

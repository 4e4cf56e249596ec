//! Right-preconditioned BiCGStab solver (Saad §7.1, van der Vorst 1992).
//!
//! Used for the non-symmetric systems that appear when reflective boundaries are coupled
//! directly into the bilinear form.
//!
//! A vanishing `(r_hat, r)` or `(r_hat, A p)` restarts the recurrence once from the current
//! residual. Only a breakdown on the restarted step is reported.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats};

pub struct BiCgStabSolver<T> {
    pub conv: Convergence<T>,
}

impl<T: num_traits::Float> BiCgStabSolver<T> {
    pub fn new(conv: Convergence<T>) -> Self {
        Self { conv }
    }
}

fn apply_pc<M, V: Clone>(pc: Option<&dyn Preconditioner<M, V>>, r: &V, z: &mut V) -> Result<(), KError> {
    match pc {
        Some(pc) => pc.apply(r, z),
        None => {
            z.clone_from(r);
            Ok(())
        }
    }
}

impl<M, V, T> LinearSolver<M, V> for BiCgStabSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + Clone + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        if x.as_ref().len() != n {
            return Err(KError::DimensionMismatch { expected: n, found: x.as_ref().len() });
        }
        let ip = ();
        // r0 = b - A x0
        let mut tmp = V::from(vec![T::zero(); n]);
        a.matvec(x, &mut tmp);
        let mut r = V::from(tmp.as_ref().iter().zip(b.as_ref()).map(|(&ax, &bi)| bi - ax).collect::<Vec<_>>());
        let mut r_hat = r.clone(); // shadow residual
        let mut r_hat_norm = ip.norm(&r_hat);
        let mut rho_prev = T::one();
        let mut alpha = T::one();
        let mut omega_prev = T::one();
        let mut v = V::from(vec![T::zero(); n]);
        let mut p = V::from(vec![T::zero(); n]);
        let mut p_hat = V::from(vec![T::zero(); n]);
        let mut s_hat = V::from(vec![T::zero(); n]);
        let mut t = V::from(vec![T::zero(); n]);
        let res0 = ip.norm(&r);
        let (stop, mut stats) = self.conv.check(res0, res0, 0);
        if stop && stats.converged {
            return Ok(stats);
        }
        let mut r_norm = res0;
        // set while the current iteration runs on a freshly restarted shadow residual
        let mut restarted = false;
        let mut i = 0;
        while i < self.conv.max_iters {
            i += 1;
            let mut rho = ip.dot(&r_hat, &r);
            if rho.abs() <= T::epsilon() * r_hat_norm * r_norm {
                if restarted {
                    return Err(KError::Breakdown("rho = (r_hat, r) vanished after restart"));
                }
                restart::<T, V>(&r, &mut r_hat, &mut p, &mut v);
                r_hat_norm = r_norm;
                (rho_prev, alpha, omega_prev) = (T::one(), T::one(), T::one());
                restarted = true;
                rho = ip.dot(&r_hat, &r);
            }
            let beta = (rho / rho_prev) * (alpha / omega_prev);
            // p = r + beta * (p - omega_prev * v)
            for ((p_j, r_j), v_j) in p.as_mut().iter_mut().zip(r.as_ref()).zip(v.as_ref()) {
                *p_j = *r_j + beta * (*p_j - omega_prev * *v_j);
            }
            apply_pc(pc, &p, &mut p_hat)?;
            a.matvec(&p_hat, &mut v);
            let alpha_den = ip.dot(&r_hat, &v);
            if alpha_den.abs() < T::min_positive_value() {
                if restarted {
                    return Err(KError::Breakdown("(r_hat, A p) vanished after restart"));
                }
                restart::<T, V>(&r, &mut r_hat, &mut p, &mut v);
                r_hat_norm = r_norm;
                (rho_prev, alpha, omega_prev) = (T::one(), T::one(), T::one());
                restarted = true;
                continue;
            }
            alpha = rho / alpha_den;
            // s = r - alpha * v
            let s = V::from(r.as_ref().iter().zip(v.as_ref()).map(|(&rj, &vj)| rj - alpha * vj).collect::<Vec<_>>());
            let s_norm = ip.norm(&s);
            if s_norm <= self.conv.threshold(res0) {
                for (xj, pj) in x.as_mut().iter_mut().zip(p_hat.as_ref()) {
                    *xj = *xj + alpha * *pj;
                }
                return Ok(SolveStats { iterations: i, final_residual: s_norm, converged: true });
            }
            // t = A M⁻¹ s
            apply_pc(pc, &s, &mut s_hat)?;
            a.matvec(&s_hat, &mut t);
            let omega_den = ip.dot(&t, &t);
            if omega_den.abs() < T::min_positive_value() {
                return Err(KError::Breakdown("(t, t) vanished"));
            }
            let omega = ip.dot(&t, &s) / omega_den;
            // x = x + alpha * p_hat + omega * s_hat
            for ((xj, pj), sj) in x.as_mut().iter_mut().zip(p_hat.as_ref()).zip(s_hat.as_ref()) {
                *xj = *xj + alpha * *pj + omega * *sj;
            }
            r = V::from(s.as_ref().iter().zip(t.as_ref()).map(|(&sj, &tj)| sj - omega * tj).collect::<Vec<_>>());
            r_norm = ip.norm(&r);
            let (stop, st) = self.conv.check(r_norm, res0, i);
            stats = st;
            if stop {
                return Ok(stats);
            }
            if omega.abs() < T::min_positive_value() {
                return Err(KError::Breakdown("omega vanished"));
            }
            rho_prev = rho;
            omega_prev = omega;
            restarted = false;
        }
        Ok(stats)
    }
}

/// Restart the recurrence from the current residual: `r_hat = r`, `p = v = 0`.
fn restart<T, V>(r: &V, r_hat: &mut V, p: &mut V, v: &mut V)
where
    T: num_traits::Float,
    V: AsMut<[T]> + AsRef<[T]> + Clone,
{
    r_hat.clone_from(r);
    p.as_mut().iter_mut().for_each(|pj| *pj = T::zero());
    v.as_mut().iter_mut().for_each(|vj| *vj = T::zero());
}

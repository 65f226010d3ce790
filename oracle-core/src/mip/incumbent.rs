//! Best integer-feasible point found so far.

/// `|primal - dual| / max(|primal|, 1e-10)`, infinite while either side is.
pub fn mip_gap(primal: f64, dual: f64) -> f64 {
    if !primal.is_finite() || !dual.is_finite() {
        return f64::INFINITY;
    }
    (primal - dual).abs() / primal.abs().max(1e-10)
}

/// Incumbent in minimization sense.
#[derive(Debug, Clone)]
pub struct Incumbent {
    pub x: Option<Vec<f64>>,
    /// `+inf` until a point is accepted.
    pub objective: f64,
    pub improvements: u64,
}

impl Default for Incumbent {
    fn default() -> Self {
        Self {
            x: None,
            objective: f64::INFINITY,
            improvements: 0,
        }
    }
}

impl Incumbent {
    pub fn exists(&self) -> bool {
        self.x.is_some()
    }

    /// Accept `x` if it beats the current objective by more than 1e-9.
    pub fn offer(&mut self, x: &[f64], objective: f64) -> bool {
        if objective >= self.objective - 1e-9 {
            return false;
        }
        self.x = Some(x.to_vec());
        self.objective = objective;
        self.improvements += 1;
        true
    }

    pub fn gap(&self, dual_bound: f64) -> f64 {
        mip_gap(self.objective, dual_bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_strict_improvements_accepted() {
        let mut inc = Incumbent::default();
        assert!(!inc.exists());
        assert!(inc.offer(&[3.0], -12.0));
        assert!(!inc.offer(&[4.0], -12.0 + 1e-12));
        assert!(!inc.offer(&[1.0], -5.0));
        assert!(inc.offer(&[2.0], -21.0));
        assert_eq!(inc.x.as_deref(), Some(&[2.0][..]));
        assert_eq!(inc.improvements, 2);
    }

    #[test]
    fn test_gap() {
        assert_eq!(mip_gap(-20.0, -22.0), 0.1);
        assert_eq!(Incumbent::default().gap(-22.0), f64::INFINITY);
    }
}

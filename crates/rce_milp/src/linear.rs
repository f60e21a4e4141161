//! Linear expressions and constraints, independent of any solver backend.

/// Handle to a decision variable. Only valid for the backend that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A linear expression `sum(coef_i * var_i) + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The expression consisting of a single `1.0 * var` term.
    #[must_use]
    pub fn variable(var: VarId) -> Self {
        Self::new().plus(var, 1.0)
    }

    #[must_use]
    pub fn plus(mut self, var: VarId, coef: f64) -> Self {
        self.terms.push((var, coef));
        self
    }

    #[must_use]
    pub fn minus(self, var: VarId) -> Self {
        self.plus(var, -1.0)
    }

    #[must_use]
    pub fn plus_constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    pub fn push(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessOrEqual,
    GreaterOrEqual,
    Equal,
}

/// A linear constraint `expr <op> rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub comparison: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    #[must_use]
    pub const fn less_or_equal(expr: LinearExpr, rhs: f64) -> Self {
        Self {
            expr,
            comparison: Comparison::LessOrEqual,
            rhs,
        }
    }

    #[must_use]
    pub const fn greater_or_equal(expr: LinearExpr, rhs: f64) -> Self {
        Self {
            expr,
            comparison: Comparison::GreaterOrEqual,
            rhs,
        }
    }

    #[must_use]
    pub const fn equal(expr: LinearExpr, rhs: f64) -> Self {
        Self {
            expr,
            comparison: Comparison::Equal,
            rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn expression_builder() {
        let a = VarId(0);
        let b = VarId(1);
        let expr = LinearExpr::variable(a).plus(b, 2.0).plus_constant(-3.0);
        assert_eq!(expr.terms, vec![(a, 1.0), (b, 2.0)]);
        assert_eq!(expr.constant, -3.0);
    }

    #[test]
    fn constraint_constructors() {
        let expr = LinearExpr::variable(VarId(0));
        let constraint = LinearConstraint::equal(expr.clone(), 5.0);
        assert_eq!(constraint.comparison, Comparison::Equal);
        assert_eq!(constraint.rhs, 5.0);
        assert_eq!(constraint.expr, expr);
    }
}

use core::fmt;

use super::constant::Constant;
use super::scan::{Scan, ScanError, Scannable};

/// One side of a term: a literal or a field reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    Constant(Constant),
    Field(String),
}

impl Expression {
    pub fn evaluate(&self, scan: &Scan) -> Result<Constant, ScanError> {
        match self {
            Expression::Constant(c) => Ok(c.clone()),
            Expression::Field(name) => scan.read(name),
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Expression::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_field_name(&self) -> Option<&str> {
        match self {
            Expression::Field(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(c) => write!(f, "{}", c),
            Expression::Field(name) => write!(f, "{}", name),
        }
    }
}

/// An equality between two expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term {
    lhs: Expression,
    rhs: Expression,
}

impl Term {
    pub fn new(lhs: Expression, rhs: Expression) -> Self {
        Self { lhs, rhs }
    }

    pub fn lhs(&self) -> &Expression {
        &self.lhs
    }

    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }

    pub fn is_satisfied(&self, scan: &Scan) -> Result<bool, ScanError> {
        let l = self.lhs.evaluate(scan)?;
        let r = self.rhs.evaluate(scan)?;
        Ok(l == r)
    }

    /// The constant this term equates `field_name` with, if it has the shape
    /// `F = c` or `c = F`.
    pub fn equates_with_constant(&self, field_name: &str) -> Option<&Constant> {
        match (self.lhs.as_field_name(), self.rhs.as_constant()) {
            (Some(f), Some(c)) if f == field_name => return Some(c),
            _ => {}
        }
        match (self.lhs.as_constant(), self.rhs.as_field_name()) {
            (Some(c), Some(f)) if f == field_name => Some(c),
            _ => None,
        }
    }

    /// The field this term equates `field_name` with, if it has the shape
    /// `F1 = F2`.
    pub fn equates_with_field(&self, field_name: &str) -> Option<&str> {
        match (self.lhs.as_field_name(), self.rhs.as_field_name()) {
            (Some(l), Some(r)) if l == field_name => Some(r),
            (Some(l), Some(r)) if r == field_name => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

/// A conjunction of terms. The empty predicate is always satisfied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn from_term(term: Term) -> Self {
        Self { terms: vec![term] }
    }

    pub fn from_terms(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    pub fn append_term(&mut self, term: Term) {
        self.terms.push(term);
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_satisfied(&self, scan: &Scan) -> Result<bool, ScanError> {
        for term in &self.terms {
            if !term.is_satisfied(scan)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn equates_with_constant(&self, field_name: &str) -> Option<&Constant> {
        self.terms
            .iter()
            .find_map(|t| t.equates_with_constant(field_name))
    }

    pub fn equates_with_field(&self, field_name: &str) -> Option<&str> {
        self.terms
            .iter()
            .find_map(|t| t.equates_with_field(field_name))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", terms.join(" AND "))
    }
}

//! Typed predicate builder
//!
//! Filters reaching the store are built from these variants rather than
//! by concatenating user strings into SQL. String literals are quoted
//! with single-quote doubling, so a concept named `O'Reilly` (or worse)
//! cannot break out of its literal.

use std::fmt::Write;

/// A literal value in a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Str(String),
}

impl Literal {
    fn write_sql(&self, out: &mut String) {
        match self {
            Self::Int(v) => {
                let _ = write!(out, "{}", v);
            }
            Self::Str(s) => {
                out.push('\'');
                out.push_str(&s.replace('\'', "''"));
                out.push('\'');
            }
        }
    }
}

/// Filter over integer and string columns: equality, membership, conjunction
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(&'static str, Literal),
    In(&'static str, Vec<Literal>),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq_int(column: &'static str, value: i64) -> Self {
        Self::Eq(column, Literal::Int(value))
    }

    pub fn eq_id(column: &'static str, value: u32) -> Self {
        Self::Eq(column, Literal::Int(value as i64))
    }

    pub fn eq_str(column: &'static str, value: impl Into<String>) -> Self {
        Self::Eq(column, Literal::Str(value.into()))
    }

    pub fn in_ids(column: &'static str, values: &[u32]) -> Self {
        Self::In(
            column,
            values.iter().map(|v| Literal::Int(*v as i64)).collect(),
        )
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Self::And(predicates)
    }

    /// Render as a SQL boolean expression. An empty `IN` list renders as
    /// a constant-false clause so "id in []" returns no rows rather than
    /// erroring.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    fn write_sql(&self, out: &mut String) {
        match self {
            Self::Eq(column, value) => {
                out.push_str(column);
                out.push_str(" = ");
                value.write_sql(out);
            }
            Self::In(column, values) => {
                if values.is_empty() {
                    out.push_str("1 = 0");
                    return;
                }
                out.push_str(column);
                out.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    value.write_sql(out);
                }
                out.push(')');
            }
            Self::And(predicates) => {
                if predicates.is_empty() {
                    out.push_str("1 = 1");
                    return;
                }
                for (i, predicate) in predicates.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    out.push('(');
                    predicate.write_sql(out);
                    out.push(')');
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_int() {
        assert_eq!(Predicate::eq_int("catalog_id", 7).to_sql(), "catalog_id = 7");
    }

    #[test]
    fn test_eq_str_escapes_single_quotes() {
        let p = Predicate::eq_str("concept", "O'Reilly's guide");
        assert_eq!(p.to_sql(), "concept = 'O''Reilly''s guide'");
    }

    #[test]
    fn test_injection_attempt_stays_inside_literal() {
        let p = Predicate::eq_str("concept", "x'; DROP TABLE concepts; --");
        assert_eq!(p.to_sql(), "concept = 'x''; DROP TABLE concepts; --'");
    }

    #[test]
    fn test_in_ids() {
        let p = Predicate::in_ids("id", &[1, 2, 3]);
        assert_eq!(p.to_sql(), "id IN (1, 2, 3)");
    }

    #[test]
    fn test_empty_in_is_constant_false() {
        assert_eq!(Predicate::in_ids("id", &[]).to_sql(), "1 = 0");
    }

    #[test]
    fn test_and_composition() {
        let p = Predicate::and(vec![
            Predicate::eq_id("catalog_id", 9),
            Predicate::in_ids("id", &[4, 5]),
        ]);
        assert_eq!(p.to_sql(), "(catalog_id = 9) AND (id IN (4, 5))");
    }
}

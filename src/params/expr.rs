//! Scalar expression evaluation.

use super::units::{convert_literal, Dimension};
use super::ParamContext;
use crate::normalize::ValidationError;
use crate::types::{BinaryOp, Expr, Scalar};

/// Evaluate a scalar against a parameter context.
///
/// Both operands of a binary expression are evaluated with the same expected
/// dimension; count parameters are accepted anywhere as plain factors.
pub fn evaluate_scalar(
    scalar: &Scalar,
    expected: Dimension,
    ctx: &ParamContext,
) -> Result<f64, ValidationError> {
    match scalar {
        Scalar::Value(v) => Ok(*v),
        Scalar::Expr(expr) => evaluate_expr(expr, expected, ctx),
    }
}

fn evaluate_expr(
    expr: &Expr,
    expected: Dimension,
    ctx: &ParamContext,
) -> Result<f64, ValidationError> {
    match expr {
        Expr::Literal { value, unit } => {
            convert_literal(*value, unit.as_deref(), expected, ctx.units)
        }
        Expr::Param { id } => {
            let param = ctx
                .get(id)
                .ok_or_else(|| ValidationError::ParamMissing { id: id.clone() })?;
            if !param.kind.usable_as(expected) {
                return Err(ValidationError::ParamType {
                    id: id.clone(),
                    found: param.kind,
                    expected,
                });
            }
            Ok(param.value)
        }
        Expr::Binary { op, left, right } => {
            let l = evaluate_scalar(left, expected, ctx)?;
            let r = evaluate_scalar(right, expected, ctx)?;
            Ok(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
            })
        }
        Expr::Neg { value } => Ok(-evaluate_scalar(value, expected, ctx)?),
    }
}

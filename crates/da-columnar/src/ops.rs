//! Elementwise operators with R semantics over engine kernels.
//!
//! A length-1 array facing a longer array degrades to a scalar operand;
//! any other length disagreement is an error. Logical operands promote to
//! integer for arithmetic, `/` always yields doubles and `%/%`, `%%` are
//! derived from a double division followed by `floor`. Integer overflow gives
//! a missing element, except for `^`, which then computes in doubles.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Datum, Int64Array, Scalar, UInt32Array};
use arrow::compute::kernels::arity::{binary, unary};
use arrow::compute::kernels::boolean::{and_kleene, not, or_kleene};
use arrow::compute::kernels::cmp::{eq, gt, gt_eq, lt, lt_eq, neq};
use arrow::compute::kernels::numeric::{add, div, mul, neg_wrapping, sub};
use arrow::compute::{cast, take};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::error::ArrowError;
use da_types::{DType, Value, common_dtype};
use serde::{Deserialize, Serialize};

use crate::{DatarError, RArray, array_from_values};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    FloorDiv,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
            Self::FloorDiv => "%/%",
            Self::Mod => "%%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "xor",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Pos,
    Abs,
    Not,
}

/// One side of a binary operator.
#[derive(Debug, Clone)]
pub enum Operand {
    Array(RArray),
    Value(Value),
}

impl From<RArray> for Operand {
    fn from(value: RArray) -> Self {
        Self::Array(value)
    }
}

impl From<&RArray> for Operand {
    fn from(value: &RArray) -> Self {
        Self::Array(value.clone())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

macro_rules! value_operands {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

value_operands!(bool, i64, i32, f64, &str);

struct Side {
    data: ArrayRef,
    scalar: bool,
}

impl Side {
    fn new(operand: Operand) -> Result<Self, DatarError> {
        match operand {
            Operand::Array(array) => Ok(Self {
                data: array.into_storage(),
                scalar: false,
            }),
            Operand::Value(value) => Ok(Self {
                data: array_from_values(&[value], None)?,
                scalar: true,
            }),
        }
    }

    fn class(&self, op: BinaryOp) -> Result<DType, DatarError> {
        DType::of(self.data.data_type()).ok_or_else(|| {
            DatarError::unsupported(
                op.symbol(),
                format!("operand of type {}", self.data.data_type()),
            )
        })
    }

    fn cast(&self, class: DType) -> Result<Self, DatarError> {
        let target = class.canonical();
        let data = if self.data.data_type() == &target {
            Arc::clone(&self.data)
        } else {
            cast(self.data.as_ref(), &target)?
        };
        Ok(Self {
            data,
            scalar: self.scalar,
        })
    }

    /// Materialize a scalar side to `len` elements for kernels that need
    /// equal-length inputs.
    fn expand(&self, len: usize) -> Result<ArrayRef, DatarError> {
        if self.data.len() == len {
            return Ok(Arc::clone(&self.data));
        }
        let zeros = UInt32Array::from(vec![0_u32; len]);
        Ok(take(self.data.as_ref(), &zeros, None)?)
    }
}

/// Apply the degrade rule and return both sides plus the output length.
fn align(x: Operand, y: Operand) -> Result<(Side, Side, usize), DatarError> {
    let mut left = Side::new(x)?;
    let mut right = Side::new(y)?;
    if !left.scalar && !right.scalar && left.data.len() != right.data.len() {
        if left.data.len() == 1 {
            left.scalar = true;
        } else if right.data.len() == 1 {
            right.scalar = true;
        } else {
            return Err(DatarError::LengthMismatch {
                lengths: vec![left.data.len(), right.data.len()],
            });
        }
    }
    let len = match (left.scalar, right.scalar) {
        (true, false) => right.data.len(),
        (false, _) => left.data.len(),
        (true, true) => 1,
    };
    Ok((left, right, len))
}

fn kernel<T>(
    left: &Side,
    right: &Side,
    f: impl Fn(&dyn Datum, &dyn Datum) -> Result<T, ArrowError>,
) -> Result<T, DatarError> {
    let out = match (left.scalar, right.scalar) {
        (true, false) => f(&Scalar::new(Arc::clone(&left.data)), &right.data),
        (false, true) => f(&left.data, &Scalar::new(Arc::clone(&right.data))),
        _ => f(&left.data, &right.data),
    };
    Ok(out?)
}

fn numeric_class(op: BinaryOp, left: DType, right: DType) -> Result<DType, DatarError> {
    let class = match common_dtype(left, right)? {
        DType::Null | DType::Bool => DType::Int64,
        other => other,
    };
    if class.is_numeric() {
        Ok(class)
    } else {
        Err(DatarError::unsupported(
            op.symbol(),
            format!("non-numeric argument to binary operator ({left}, {right})"),
        ))
    }
}

fn comparison_class(left: DType, right: DType) -> Result<DType, DatarError> {
    match common_dtype(left, right) {
        Ok(class) => Ok(class),
        Err(_) if left == DType::Utf8 || right == DType::Utf8 => Ok(DType::Utf8),
        Err(err) => Err(err.into()),
    }
}

fn floor_div_f64(left: &Side, right: &Side) -> Result<ArrayRef, DatarError> {
    let left = left.cast(DType::Float64)?;
    let right = right.cast(DType::Float64)?;
    let quotient = kernel(&left, &right, div)?;
    let floored = unary::<Float64Type, _, Float64Type>(quotient.as_primitive(), f64::floor);
    Ok(Arc::new(floored))
}

fn binary_f64(
    left: &Side,
    right: &Side,
    len: usize,
    f: impl Fn(f64, f64) -> f64,
) -> Result<ArrayRef, DatarError> {
    let lhs = left.cast(DType::Float64)?.expand(len)?;
    let rhs = right.cast(DType::Float64)?.expand(len)?;
    let out = binary::<Float64Type, Float64Type, _, Float64Type>(
        lhs.as_primitive(),
        rhs.as_primitive(),
        f,
    )?;
    Ok(Arc::new(out))
}

fn binary_i64(
    left: &Side,
    right: &Side,
    len: usize,
    f: impl Fn(i64, i64) -> i64,
) -> Result<ArrayRef, DatarError> {
    let lhs = left.cast(DType::Int64)?.expand(len)?;
    let rhs = right.cast(DType::Int64)?.expand(len)?;
    let out = binary::<Int64Type, Int64Type, _, Int64Type>(
        lhs.as_primitive(),
        rhs.as_primitive(),
        f,
    )?;
    Ok(Arc::new(out))
}

/// Integer kernel where `None` from `f` marks an element that overflowed.
/// Overflowed elements become missing; the flag reports whether any did.
fn checked_i64(
    left: &Side,
    right: &Side,
    len: usize,
    f: impl Fn(i64, i64) -> Option<i64>,
) -> Result<(ArrayRef, bool), DatarError> {
    let lhs = left.cast(DType::Int64)?.expand(len)?;
    let rhs = right.cast(DType::Int64)?.expand(len)?;
    let mut overflowed = false;
    let out = lhs
        .as_primitive::<Int64Type>()
        .iter()
        .zip(rhs.as_primitive::<Int64Type>().iter())
        .map(|pair| match pair {
            (Some(a), Some(b)) => {
                let value = f(a, b);
                overflowed |= value.is_none();
                value
            }
            _ => None,
        })
        .collect::<Int64Array>();
    Ok((Arc::new(out), overflowed))
}

fn shift_amount(b: i64) -> Option<u32> {
    u32::try_from(b).ok().filter(|b| *b < i64::BITS)
}

fn logical(
    left: &Side,
    right: &Side,
    len: usize,
    f: impl Fn(&BooleanArray, &BooleanArray) -> Result<BooleanArray, ArrowError>,
) -> Result<ArrayRef, DatarError> {
    let lhs = left.cast(DType::Bool)?.expand(len)?;
    let rhs = right.cast(DType::Bool)?.expand(len)?;
    Ok(Arc::new(f(lhs.as_boolean(), rhs.as_boolean())?))
}

fn has_negative(side: &Side) -> Result<bool, DatarError> {
    let ints = side.cast(DType::Int64)?;
    Ok(ints
        .data
        .as_primitive::<Int64Type>()
        .iter()
        .any(|v| v.is_some_and(|v| v < 0)))
}

/// Apply a binary operator.
pub fn binop(
    op: BinaryOp,
    x: impl Into<Operand>,
    y: impl Into<Operand>,
) -> Result<RArray, DatarError> {
    let (left, right, len) = align(x.into(), y.into())?;
    let lc = left.class(op)?;
    let rc = right.class(op)?;

    let out: ArrayRef = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            let class = numeric_class(op, lc, rc)?;
            if class == DType::Int64 {
                let f = match op {
                    BinaryOp::Add => i64::checked_add,
                    BinaryOp::Sub => i64::checked_sub,
                    _ => i64::checked_mul,
                };
                let (out, overflowed) = checked_i64(&left, &right, len, f)?;
                if overflowed {
                    log::warn!(
                        "[da-columnar] NAs produced by integer overflow in `{}`",
                        op.symbol()
                    );
                }
                out
            } else {
                let (l, r) = (left.cast(class)?, right.cast(class)?);
                match op {
                    BinaryOp::Add => kernel(&l, &r, add)?,
                    BinaryOp::Sub => kernel(&l, &r, sub)?,
                    _ => kernel(&l, &r, mul)?,
                }
            }
        }
        BinaryOp::Div => {
            numeric_class(op, lc, rc)?;
            kernel(&left.cast(DType::Float64)?, &right.cast(DType::Float64)?, div)?
        }
        BinaryOp::Pow => {
            let class = numeric_class(op, lc, rc)?;
            let exact = if class == DType::Int64 && !has_negative(&right)? {
                let (out, overflowed) = checked_i64(&left, &right, len, |base, exp| {
                    base.checked_pow(u32::try_from(exp).ok()?)
                })?;
                (!overflowed).then_some(out)
            } else {
                None
            };
            match exact {
                Some(out) => out,
                None => binary_f64(&left, &right, len, f64::powf)?,
            }
        }
        BinaryOp::FloorDiv => {
            numeric_class(op, lc, rc)?;
            cast(floor_div_f64(&left, &right)?.as_ref(), &DataType::Int64)?
        }
        BinaryOp::Mod => {
            let class = numeric_class(op, lc, rc)?;
            let rem = binary_f64(&left, &right, len, |x, y| x - (x / y).floor() * y)?;
            cast(rem.as_ref(), &class.canonical())?
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let class = comparison_class(lc, rc)?;
            let (l, r) = (left.cast(class)?, right.cast(class)?);
            let result = match op {
                BinaryOp::Eq => kernel(&l, &r, eq)?,
                BinaryOp::Ne => kernel(&l, &r, neq)?,
                BinaryOp::Lt => kernel(&l, &r, lt)?,
                BinaryOp::Le => kernel(&l, &r, lt_eq)?,
                BinaryOp::Gt => kernel(&l, &r, gt)?,
                _ => kernel(&l, &r, gt_eq)?,
            };
            Arc::new(result)
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let logical_operands = matches!(lc, DType::Bool | DType::Null)
                || matches!(rc, DType::Bool | DType::Null);
            if logical_operands {
                match op {
                    BinaryOp::BitAnd => logical(&left, &right, len, and_kleene)?,
                    BinaryOp::BitOr => logical(&left, &right, len, or_kleene)?,
                    _ => {
                        let (l, r) = (left.cast(DType::Bool)?, right.cast(DType::Bool)?);
                        Arc::new(kernel(&l, &r, neq)?)
                    }
                }
            } else {
                numeric_class(op, lc, rc)?;
                match op {
                    BinaryOp::BitAnd => binary_i64(&left, &right, len, |a, b| a & b)?,
                    BinaryOp::BitOr => binary_i64(&left, &right, len, |a, b| a | b)?,
                    _ => binary_i64(&left, &right, len, |a, b| a ^ b)?,
                }
            }
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            numeric_class(op, lc, rc)?;
            let (out, _) = if op == BinaryOp::Shl {
                checked_i64(&left, &right, len, |a, b| a.checked_shl(shift_amount(b)?))?
            } else {
                checked_i64(&left, &right, len, |a, b| a.checked_shr(shift_amount(b)?))?
            };
            out
        }
    };
    RArray::create(out)
}

/// Apply a unary operator. `+` returns its operand unchanged.
pub fn unop(op: UnaryOp, x: &RArray) -> Result<RArray, DatarError> {
    let storage = x.storage();
    let class = x.dtype().ok_or_else(|| {
        DatarError::unsupported(format!("{op:?}"), format!("operand of type {}", x.data_type()))
    })?;
    let out: ArrayRef = match op {
        UnaryOp::Pos => return Ok(x.clone()),
        UnaryOp::Neg | UnaryOp::Abs => {
            let class = match class {
                DType::Null | DType::Bool => DType::Int64,
                DType::Int64 | DType::Float64 => class,
                other => {
                    return Err(DatarError::unsupported(
                        format!("{op:?}").to_lowercase(),
                        format!("invalid argument to unary operator ({other})"),
                    ));
                }
            };
            let data = cast(storage.as_ref(), &class.canonical())?;
            match (op, class) {
                (UnaryOp::Neg, _) => neg_wrapping(data.as_ref())?,
                (_, DType::Int64) => Arc::new(unary::<Int64Type, _, Int64Type>(
                    data.as_primitive(),
                    i64::wrapping_abs,
                )),
                _ => Arc::new(unary::<Float64Type, _, Float64Type>(
                    data.as_primitive(),
                    f64::abs,
                )),
            }
        }
        UnaryOp::Not => {
            let data = cast(storage.as_ref(), &DataType::Boolean)?;
            Arc::new(not(data.as_boolean())?)
        }
    };
    RArray::create(out)
}

impl RArray {
    pub fn pow(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::Pow, self, rhs)
    }

    pub fn floor_div(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::FloorDiv, self, rhs)
    }

    pub fn equal(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::Eq, self, rhs)
    }

    pub fn not_equal(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::Ne, self, rhs)
    }

    pub fn less(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::Lt, self, rhs)
    }

    pub fn less_equal(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::Le, self, rhs)
    }

    pub fn greater(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::Gt, self, rhs)
    }

    pub fn greater_equal(&self, rhs: impl Into<Operand>) -> Result<Self, DatarError> {
        binop(BinaryOp::Ge, self, rhs)
    }

    pub fn abs(&self) -> Result<Self, DatarError> {
        unop(UnaryOp::Abs, self)
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Operand>> std::ops::$trait<T> for RArray {
            type Output = Result<RArray, DatarError>;

            fn $method(self, rhs: T) -> Self::Output {
                binop($op, self, rhs)
            }
        }

        impl<T: Into<Operand>> std::ops::$trait<T> for &RArray {
            type Output = Result<RArray, DatarError>;

            fn $method(self, rhs: T) -> Self::Output {
                binop($op, self, rhs)
            }
        }

        binary_operator!(@reflected $trait, $method, $op, i64, f64);
    };
    (@reflected $trait:ident, $method:ident, $op:expr, $($lhs:ty),*) => {
        $(
            impl std::ops::$trait<RArray> for $lhs {
                type Output = Result<RArray, DatarError>;

                fn $method(self, rhs: RArray) -> Self::Output {
                    binop($op, self, rhs)
                }
            }

            impl std::ops::$trait<&RArray> for $lhs {
                type Output = Result<RArray, DatarError>;

                fn $method(self, rhs: &RArray) -> Self::Output {
                    binop($op, self, rhs)
                }
            }
        )*
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);
binary_operator!(Rem, rem, BinaryOp::Mod);
binary_operator!(BitAnd, bitand, BinaryOp::BitAnd);
binary_operator!(BitOr, bitor, BinaryOp::BitOr);
binary_operator!(BitXor, bitxor, BinaryOp::BitXor);
binary_operator!(Shl, shl, BinaryOp::Shl);
binary_operator!(Shr, shr, BinaryOp::Shr);

impl std::ops::Neg for RArray {
    type Output = Result<RArray, DatarError>;

    fn neg(self) -> Self::Output {
        unop(UnaryOp::Neg, &self)
    }
}

impl std::ops::Neg for &RArray {
    type Output = Result<RArray, DatarError>;

    fn neg(self) -> Self::Output {
        unop(UnaryOp::Neg, self)
    }
}

impl std::ops::Not for RArray {
    type Output = Result<RArray, DatarError>;

    fn not(self) -> Self::Output {
        unop(UnaryOp::Not, &self)
    }
}

impl std::ops::Not for &RArray {
    type Output = Result<RArray, DatarError>;

    fn not(self) -> Self::Output {
        unop(UnaryOp::Not, self)
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;
    use da_types::Value;

    use super::{BinaryOp, UnaryOp, binop, unop};
    use crate::{DatarError, RArray, make_array};

    fn arr(values: Vec<i64>) -> RArray {
        make_array(values, None).expect("build")
    }

    fn ints(values: Vec<i64>) -> Vec<Value> {
        values.into_iter().map(Value::Int).collect()
    }

    fn bools(values: Vec<Option<bool>>) -> Vec<Value> {
        values.into_iter().map(Value::from).collect()
    }

    #[test]
    fn scalar_degrade_is_commutative() {
        let x = arr(vec![1, 2, 3]);
        let y = arr(vec![10]);
        let xy = (&x + &y).expect("x + y");
        let yx = (&y + &x).expect("y + x");
        assert_eq!(xy.values().expect("v"), ints(vec![11, 12, 13]));
        assert_eq!(yx.values().expect("v"), ints(vec![11, 12, 13]));
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = (arr(vec![1, 2]) + arr(vec![1, 2, 3])).expect_err("mismatch");
        assert_eq!(err, DatarError::LengthMismatch { lengths: vec![2, 3] });
    }

    #[test]
    fn modulo_and_floor_division_follow_r() {
        let x = arr(vec![1, 2, 3]);
        assert_eq!((&x % 2_i64).expect("mod").values().expect("v"), ints(vec![1, 0, 1]));
        let fd = x.floor_div(2_i64).expect("floor div");
        assert_eq!(fd.data_type(), &DataType::Int64);
        assert_eq!(fd.values().expect("v"), ints(vec![0, 1, 1]));

        let neg = arr(vec![-5]);
        assert_eq!((&neg % 3_i64).expect("mod").values().expect("v"), ints(vec![1]));
        assert_eq!(neg.floor_div(3_i64).expect("fd").values().expect("v"), ints(vec![-2]));
    }

    #[test]
    fn division_always_yields_doubles() {
        let out = (arr(vec![1, 2]) / 2_i64).expect("div");
        assert_eq!(out.values().expect("v"), vec![Value::Float(0.5), Value::Float(1.0)]);
    }

    #[test]
    fn reflected_scalars() {
        let x = arr(vec![1, 2]);
        assert_eq!((10_i64 - &x).expect("rsub").values().expect("v"), ints(vec![9, 8]));
        assert_eq!(
            (1.0_f64 / &x).expect("rdiv").values().expect("v"),
            vec![Value::Float(1.0), Value::Float(0.5)]
        );
    }

    #[test]
    fn power_keeps_integers_for_non_negative_exponents() {
        let x = arr(vec![2, 3]);
        assert_eq!(x.pow(2_i64).expect("pow").values().expect("v"), ints(vec![4, 9]));
        let out = x.pow(-1_i64).expect("pow");
        assert_eq!(out.data_type(), &DataType::Float64);
    }

    #[test]
    fn integer_overflow_gives_missing_values() {
        let x = arr(vec![i64::MAX, 1]);
        let sum = (&x + 1_i64).expect("add");
        assert_eq!(sum.values().expect("v"), vec![Value::Null, Value::Int(2)]);
        let product = (&x * 2_i64).expect("mul");
        assert_eq!(product.values().expect("v"), vec![Value::Null, Value::Int(2)]);
        let diff = (arr(vec![i64::MIN]) - 1_i64).expect("sub");
        assert_eq!(diff.values().expect("v"), vec![Value::Null]);
    }

    #[test]
    fn overflowing_power_falls_back_to_doubles() {
        let out = arr(vec![10, 2]).pow(30_i64).expect("pow");
        assert_eq!(out.data_type(), &DataType::Float64);
        let values = out.values().expect("v");
        let Value::Float(big) = values[0] else {
            panic!("power result must be a double, got {:?}", values[0]);
        };
        assert!((big / 1e30 - 1.0).abs() < 1e-12);
        assert_eq!(values[1], Value::Float(1_073_741_824.0));
    }

    #[test]
    fn comparisons_propagate_missing() {
        let x = make_array(vec![Some(1_i64), None, Some(3)], None).expect("build");
        let out = x.greater(1_i64).expect("gt");
        assert_eq!(out.values().expect("v"), bools(vec![Some(false), None, Some(true)]));
        let out = x.equal(1.0_f64).expect("eq");
        assert_eq!(out.values().expect("v"), bools(vec![Some(true), None, Some(false)]));
    }

    #[test]
    fn string_comparison() {
        let x = make_array(vec!["a", "b"], None).expect("build");
        let out = x.equal("b").expect("eq");
        assert_eq!(out.values().expect("v"), bools(vec![Some(false), Some(true)]));
    }

    #[test]
    fn logical_operators_use_kleene_logic() {
        let x = make_array(vec![Some(true), None, Some(false)], None).expect("build");
        let and = (&x & false).expect("and");
        assert_eq!(and.values().expect("v"), bools(vec![Some(false), Some(false), Some(false)]));
        let or = (&x | true).expect("or");
        assert_eq!(or.values().expect("v"), bools(vec![Some(true), Some(true), Some(true)]));
        let xor = (&x ^ true).expect("xor");
        assert_eq!(xor.values().expect("v"), bools(vec![Some(false), None, Some(true)]));
    }

    #[test]
    fn integer_bit_operations() {
        let x = arr(vec![6, 5]);
        assert_eq!((&x & 3_i64).expect("and").values().expect("v"), ints(vec![2, 1]));
        assert_eq!((&x << 1_i64).expect("shl").values().expect("v"), ints(vec![12, 10]));
        assert_eq!((&x >> 1_i64).expect("shr").values().expect("v"), ints(vec![3, 2]));
        let out = (&x << -1_i64).expect("negative shift");
        assert_eq!(out.values().expect("v"), vec![Value::Null, Value::Null]);
        let out = (&x >> 64_i64).expect("wide shift");
        assert_eq!(out.values().expect("v"), vec![Value::Null, Value::Null]);
    }

    #[test]
    fn unary_operators() {
        let x = arr(vec![-1, 2]);
        assert_eq!((-&x).expect("neg").values().expect("v"), ints(vec![1, -2]));
        assert_eq!(x.abs().expect("abs").values().expect("v"), ints(vec![1, 2]));
        assert_eq!(unop(UnaryOp::Pos, &x).expect("pos"), x);
        let b = make_array(vec![true, false], None).expect("bool");
        assert_eq!((!&b).expect("not").values().expect("v"), bools(vec![Some(false), Some(true)]));
    }

    #[test]
    fn non_numeric_arithmetic_is_unsupported() {
        let x = make_array(vec!["a"], None).expect("build");
        let err = binop(BinaryOp::Add, &x, 1_i64).expect_err("string + int");
        assert!(matches!(err, DatarError::Type(_) | DatarError::Unsupported { .. }));
    }

    #[test]
    fn operators_on_factors_use_decoded_storage() {
        let x = arr(vec![1, 2, 2]).dictionary_encode().expect("encode");
        let out = (&x * 2_i64).expect("mul");
        assert!(!out.is_factor());
        assert_eq!(out.values().expect("v"), ints(vec![2, 4, 4]));
    }
}

use crate::bindings::{binding_id, BindingId, Bindings, VARIABLE_NAMES};
use crate::error::EvalError;
use crate::expression::{Constant, Expr};
use crate::function::Function;
use crate::parse::parse;

#[cfg(feature = "rayon")]
use rayon::prelude::{
    IndexedParallelIterator, IntoParallelRefIterator, ParallelExtend, ParallelIterator,
};

/// An `f64`-valued expression with variables resolved to [`BindingId`]s.
///
/// This is the compiled form of an [`Expr`]: constants are folded to
/// literals, `log(x, b)` and `fraction(n, d)` are lowered to quotients, and
/// evaluation is purely real (domain errors yield `NaN`).
#[derive(Clone, Debug, PartialEq)]
pub enum RealExpression {
    // Binary real ops.
    Add(Box<RealExpression>, Box<RealExpression>),
    Div(Box<RealExpression>, Box<RealExpression>),
    Mul(Box<RealExpression>, Box<RealExpression>),
    Pow(Box<RealExpression>, Box<RealExpression>),
    Sub(Box<RealExpression>, Box<RealExpression>),

    // Unary real ops.
    Neg(Box<RealExpression>),
    Call(Function, Box<RealExpression>),

    // Constant.
    Literal(f64),

    // Input variable.
    Binding(BindingId),
}

impl RealExpression {
    /// Parse and compile `input` independently of any earlier parse.
    pub fn parse(input: &str) -> Result<Self, EvalError> {
        Self::compile(&parse(input)?)
    }

    /// Lower a syntax tree, resolving variables through [`binding_id`].
    pub fn compile(expr: &Expr) -> Result<Self, EvalError> {
        let binary = |lhs: &Expr, rhs: &Expr| -> Result<_, EvalError> {
            Ok((Box::new(Self::compile(lhs)?), Box::new(Self::compile(rhs)?)))
        };
        Ok(match expr {
            Expr::Number(n) => Self::Literal(*n),
            Expr::Constant(Constant::I) => {
                return Err(EvalError::NonNumericResult {
                    kind: "complex",
                    value: "i".to_string(),
                })
            }
            Expr::Constant(c) => Self::Literal(c.real_value().unwrap_or(f64::NAN)),
            Expr::Variable(name) => Self::Binding(
                binding_id(name).ok_or_else(|| EvalError::UnboundVariable(name.clone()))?,
            ),
            Expr::Neg(only) => Self::Neg(Box::new(Self::compile(only)?)),
            Expr::Add(lhs, rhs) => {
                let (l, r) = binary(lhs, rhs)?;
                Self::Add(l, r)
            }
            Expr::Sub(lhs, rhs) => {
                let (l, r) = binary(lhs, rhs)?;
                Self::Sub(l, r)
            }
            Expr::Mul(lhs, rhs) => {
                let (l, r) = binary(lhs, rhs)?;
                Self::Mul(l, r)
            }
            Expr::Div(lhs, rhs) => {
                let (l, r) = binary(lhs, rhs)?;
                Self::Div(l, r)
            }
            Expr::Pow(lhs, rhs) => {
                let (l, r) = binary(lhs, rhs)?;
                Self::Pow(l, r)
            }
            Expr::Call(Function::Fraction, args) | Expr::Call(Function::Log, args)
                if args.len() == 2 =>
            {
                let (l, r) = binary(&args[0], &args[1])?;
                match expr {
                    Expr::Call(Function::Log, _) => Self::Div(
                        Box::new(Self::Call(Function::Log, l)),
                        Box::new(Self::Call(Function::Log, r)),
                    ),
                    _ => Self::Div(l, r),
                }
            }
            Expr::Call(function, args) => match args.as_slice() {
                [only] if *function != Function::Random => {
                    Self::Call(*function, Box::new(Self::compile(only)?))
                }
                _ => {
                    return Err(EvalError::BadCall {
                        name: function.name(),
                        got: args.len(),
                    })
                }
            },
        })
    }

    /// Whether evaluation reads the given binding slot.
    pub fn uses_binding(&self, id: BindingId) -> bool {
        match self {
            Self::Add(lhs, rhs)
            | Self::Div(lhs, rhs)
            | Self::Mul(lhs, rhs)
            | Self::Pow(lhs, rhs)
            | Self::Sub(lhs, rhs) => lhs.uses_binding(id) || rhs.uses_binding(id),
            Self::Neg(only) | Self::Call(_, only) => only.uses_binding(id),
            Self::Literal(_) => false,
            Self::Binding(b) => *b == id,
        }
    }

    /// Evaluates at a single point.
    pub fn evaluate_point(&self, bindings: &Bindings) -> Result<f64, EvalError> {
        let mut columns = Vec::with_capacity(VARIABLE_NAMES.len());
        for (id, name) in VARIABLE_NAMES.iter().enumerate() {
            match bindings.slot(id) {
                Some(v) => columns.push([v]),
                None if self.uses_binding(id) => {
                    return Err(EvalError::UnboundVariable(name.to_string()))
                }
                None => columns.push([f64::NAN]),
            }
        }
        let mut registers = Registers::new(1);
        let output = self.evaluate(&columns, &mut registers);
        Ok(output.first().copied().unwrap_or(f64::NAN))
    }

    /// Calculates the real-valued results of the expression component-wise.
    pub fn evaluate<R: AsRef<[f64]>>(&self, bindings: &[R], registers: &mut Registers) -> Vec<f64> {
        validate_bindings(bindings, registers.register_length);
        self.evaluate_recursive(bindings, registers)
    }

    fn evaluate_recursive<R: AsRef<[f64]>>(
        &self,
        bindings: &[R],
        registers: &mut Registers,
    ) -> Vec<f64> {
        match self {
            Self::Add(lhs, rhs) => {
                evaluate_binary_real_op(|lhs, rhs| lhs + rhs, lhs, rhs, bindings, registers)
            }
            // This branch should only be taken if the entire expression is
            // literally the identity map from one of the bindings.
            Self::Binding(binding) => {
                let mut output = registers.allocate_real();
                output.extend_from_slice(bindings[*binding].as_ref());
                output
            }
            Self::Call(function, only) => {
                let function = *function;
                evaluate_unary_real_op(
                    move |only| function.apply_real(only),
                    only,
                    bindings,
                    registers,
                )
            }
            Self::Div(lhs, rhs) => {
                evaluate_binary_real_op(|lhs, rhs| lhs / rhs, lhs, rhs, bindings, registers)
            }
            Self::Literal(value) => {
                let mut output = registers.allocate_real();
                output.extend(std::iter::repeat(*value).take(registers.register_length));
                output
            }
            Self::Mul(lhs, rhs) => {
                evaluate_binary_real_op(|lhs, rhs| lhs * rhs, lhs, rhs, bindings, registers)
            }
            Self::Neg(only) => evaluate_unary_real_op(|only| -only, only, bindings, registers),
            Self::Pow(lhs, rhs) => {
                evaluate_binary_real_op(|lhs, rhs| lhs.powf(rhs), lhs, rhs, bindings, registers)
            }
            Self::Sub(lhs, rhs) => {
                evaluate_binary_real_op(|lhs, rhs| lhs - rhs, lhs, rhs, bindings, registers)
            }
        }
    }
}

fn validate_bindings<T, B: AsRef<[T]>>(input_bindings: &[B], expected_length: usize) {
    for b in input_bindings.iter() {
        assert_eq!(b.as_ref().len(), expected_length);
    }
}

fn evaluate_binary_real_op<R: AsRef<[f64]>>(
    op: fn(f64, f64) -> f64,
    lhs: &RealExpression,
    rhs: &RealExpression,
    bindings: &[R],
    registers: &mut Registers,
) -> Vec<f64> {
    // Before doing recursive evaluation, we check first if we already have
    // input values in our bindings. This avoids unnecessary copies.
    let lhs_reg = match lhs {
        RealExpression::Binding(_) => None,
        _ => Some(lhs.evaluate_recursive(bindings, registers)),
    };
    let rhs_reg = match rhs {
        RealExpression::Binding(_) => None,
        _ => Some(rhs.evaluate_recursive(bindings, registers)),
    };
    let lhs_values = operand_values(lhs, &lhs_reg, bindings);
    let rhs_values = operand_values(rhs, &rhs_reg, bindings);
    // Allocate this output register as lazily as possible.
    let mut output = registers.allocate_real();

    #[cfg(feature = "rayon")]
    {
        output.par_extend(
            lhs_values
                .par_iter()
                .zip(rhs_values.par_iter())
                .map(|(lhs, rhs)| op(*lhs, *rhs)),
        );
    }
    #[cfg(not(feature = "rayon"))]
    {
        output.extend(
            lhs_values
                .iter()
                .zip(rhs_values.iter())
                .map(|(lhs, rhs)| op(*lhs, *rhs)),
        );
    }

    if let Some(r) = lhs_reg {
        registers.recycle_real(r);
    }
    if let Some(r) = rhs_reg {
        registers.recycle_real(r);
    }
    output
}

fn evaluate_unary_real_op<R: AsRef<[f64]>>(
    op: impl Fn(f64) -> f64 + Sync + Send,
    only: &RealExpression,
    bindings: &[R],
    registers: &mut Registers,
) -> Vec<f64> {
    let only_reg = match only {
        RealExpression::Binding(_) => None,
        _ => Some(only.evaluate_recursive(bindings, registers)),
    };
    let only_values = operand_values(only, &only_reg, bindings);
    // Allocate this output register as lazily as possible.
    let mut output = registers.allocate_real();

    #[cfg(feature = "rayon")]
    {
        output.par_extend(only_values.par_iter().map(|only| op(*only)));
    }
    #[cfg(not(feature = "rayon"))]
    {
        output.extend(only_values.iter().map(|only| op(*only)));
    }

    if let Some(r) = only_reg {
        registers.recycle_real(r);
    }
    output
}

/// Borrow a binding column directly, or the register it was evaluated into.
fn operand_values<'a, R: AsRef<[f64]>>(
    expr: &RealExpression,
    register: &'a Option<Vec<f64>>,
    bindings: &'a [R],
) -> &'a [f64] {
    match (expr, register) {
        (_, Some(values)) => values,
        (RealExpression::Binding(binding), None) => bindings[*binding].as_ref(),
        _ => &[],
    }
}

/// Scratch space for calculations. Can be reused across evaluations with the
/// same data binding length.
///
/// Attempts to minimize allocations by recycling registers after intermediate
/// calculations have finished.
pub struct Registers {
    num_allocations: usize,
    real_registers: Vec<Vec<f64>>,
    register_length: usize,
}

impl Registers {
    pub fn new(register_length: usize) -> Self {
        Self {
            num_allocations: 0,
            real_registers: vec![],
            register_length,
        }
    }

    fn recycle_real(&mut self, mut used: Vec<f64>) {
        used.clear();
        self.real_registers.push(used);
    }

    fn allocate_real(&mut self) -> Vec<f64> {
        self.real_registers.pop().unwrap_or_else(|| {
            self.num_allocations += 1;
            Vec::with_capacity(self.register_length)
        })
    }

    pub fn num_allocations(&self) -> usize {
        self.num_allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectorized_expression() {
        let real = RealExpression::parse("2 * (z + x) * -y").unwrap();

        let x = [1.0, 2.0, 3.0];
        let y = [4.0, 5.0, 6.0];
        let z = [7.0, 8.0, 9.0];
        let bindings = &[x, y, z];
        let mut registers = Registers::new(3);
        let output = real.evaluate(bindings, &mut registers);
        assert_eq!(&output, &[-64.0, -100.0, -144.0]);
        assert_eq!(registers.num_allocations(), 3);
    }

    #[test]
    fn op_precedence_without_vars() {
        let none = Bindings::new();
        let real = RealExpression::parse("1 * 2 + 3 * 4").unwrap();
        assert_eq!(real.evaluate_point(&none).unwrap(), 14.0);
        let real = RealExpression::parse("4 ^ 3 ^ 2").unwrap();
        assert_eq!(real.evaluate_point(&none).unwrap(), 262144.0);
    }

    #[test]
    fn naive_allocations_limited_by_recycling() {
        let real = RealExpression::parse("x + y + z + x + y + z + x + y + z").unwrap();
        let bindings = &[[7.0, 8.0, 9.0], [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mut registers = Registers::new(3);
        let output = real.evaluate(bindings, &mut registers);
        assert_eq!(&output, &[36.0, 45.0, 54.0]);
        assert_eq!(registers.num_allocations(), 2);
    }

    #[test]
    fn lowering() {
        let log = RealExpression::parse("log(8, 2)").unwrap();
        let v = log.evaluate_point(&Bindings::new()).unwrap();
        assert!((v - 3.0).abs() < 1e-12);
        let frac = RealExpression::parse("fraction(1, 4)").unwrap();
        assert_eq!(frac.evaluate_point(&Bindings::new()), Ok(0.25));
        assert!(RealExpression::parse("random()").is_err());
        assert!(RealExpression::parse("2 * i").is_err());
    }

    #[test]
    fn point_evaluation_requires_used_bindings() {
        let real = RealExpression::parse("x * y").unwrap();
        assert_eq!(real.evaluate_point(&Bindings::xy(2.0, 3.0)), Ok(6.0));
        assert_eq!(
            real.evaluate_point(&Bindings::x(2.0)),
            Err(EvalError::UnboundVariable("y".to_string()))
        );
        assert!(real.evaluate_point(&Bindings::new().with(1, 1.0)).is_err());
        assert!(matches!(
            RealExpression::parse("w + 1"),
            Err(EvalError::UnboundVariable(_))
        ));
        assert!(RealExpression::parse("sqrt(x)")
            .unwrap()
            .evaluate_point(&Bindings::x(-1.0))
            .unwrap()
            .is_nan());
    }
}

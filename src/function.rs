use num_complex::Complex64;

/// Builtin functions understood by the symbolic engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    // Trigonometric.
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Asin,
    Acos,
    Atan,

    // Hyperbolic.
    Sinh,
    Cosh,
    Tanh,

    // Exponential and logarithmic. `log` is the natural logarithm, with an
    // optional second argument for the base.
    Exp,
    Log,
    Log10,
    Log2,

    // Roots and magnitude.
    Sqrt,
    Cbrt,
    Abs,
    Sign,

    // Constructors.
    Fraction,
    Random,
}

/// Accepted argument counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::Range(lo, hi) => (lo..=hi).contains(&count),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Exactly(0) => "0",
            Self::Exactly(1) => "1",
            Self::Exactly(2) => "2",
            Self::Range(1, 2) => "1 or 2",
            _ => "a different number of",
        }
    }
}

impl Function {
    pub const ALL: [Function; 22] = [
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Sec,
        Self::Csc,
        Self::Cot,
        Self::Asin,
        Self::Acos,
        Self::Atan,
        Self::Sinh,
        Self::Cosh,
        Self::Tanh,
        Self::Exp,
        Self::Log,
        Self::Log10,
        Self::Log2,
        Self::Sqrt,
        Self::Cbrt,
        Self::Abs,
        Self::Sign,
        Self::Fraction,
        Self::Random,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ln" => Some(Self::Log),
            "arcsin" => Some(Self::Asin),
            "arccos" => Some(Self::Acos),
            "arctan" => Some(Self::Atan),
            _ => Self::ALL.into_iter().find(|f| f.name() == name),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Sec => "sec",
            Self::Csc => "csc",
            Self::Cot => "cot",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Log2 => "log2",
            Self::Sqrt => "sqrt",
            Self::Cbrt => "cbrt",
            Self::Abs => "abs",
            Self::Sign => "sign",
            Self::Fraction => "fraction",
            Self::Random => "random",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::Log => Arity::Range(1, 2),
            Self::Fraction => Arity::Exactly(2),
            Self::Random => Arity::Exactly(0),
            _ => Arity::Exactly(1),
        }
    }

    /// Real-valued application of a unary function.
    ///
    /// Domain errors produce `NaN` rather than failing, the way the compiled
    /// evaluator and the native closures behave.
    pub fn apply_real(self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Sec => x.cos().recip(),
            Self::Csc => x.sin().recip(),
            Self::Cot => x.tan().recip(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Exp => x.exp(),
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Log2 => x.log2(),
            Self::Sqrt => x.sqrt(),
            Self::Cbrt => x.cbrt(),
            Self::Abs => x.abs(),
            Self::Sign => {
                if x == 0.0 {
                    0.0
                } else {
                    x.signum()
                }
            }
            Self::Fraction | Self::Random => f64::NAN,
        }
    }

    /// Whether a real argument leaves the real domain of this function.
    pub fn goes_complex(self, x: f64) -> bool {
        match self {
            Self::Sqrt | Self::Log | Self::Log10 | Self::Log2 => x < 0.0,
            Self::Asin | Self::Acos => x.abs() > 1.0,
            _ => false,
        }
    }

    /// Complex-valued application of a unary function.
    pub fn apply_complex(self, z: Complex64) -> Complex64 {
        match self {
            Self::Sin => z.sin(),
            Self::Cos => z.cos(),
            Self::Tan => z.tan(),
            Self::Sec => z.cos().inv(),
            Self::Csc => z.sin().inv(),
            Self::Cot => z.tan().inv(),
            Self::Asin => z.asin(),
            Self::Acos => z.acos(),
            Self::Atan => z.atan(),
            Self::Sinh => z.sinh(),
            Self::Cosh => z.cosh(),
            Self::Tanh => z.tanh(),
            Self::Exp => z.exp(),
            Self::Log => z.ln(),
            Self::Log10 => z.log10(),
            Self::Log2 => z.log2(),
            Self::Sqrt => z.sqrt(),
            Self::Cbrt => z.cbrt(),
            Self::Abs => Complex64::new(z.norm(), 0.0),
            Self::Sign => {
                let norm = z.norm();
                if norm == 0.0 {
                    Complex64::new(0.0, 0.0)
                } else {
                    z / norm
                }
            }
            Self::Fraction | Self::Random => Complex64::new(f64::NAN, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for f in Function::ALL {
            assert_eq!(Function::from_name(f.name()), Some(f));
        }
        assert_eq!(Function::from_name("ln"), Some(Function::Log));
        assert_eq!(Function::from_name("arctan"), Some(Function::Atan));
        assert_eq!(Function::from_name("foo"), None);
    }

    #[test]
    fn arity() {
        assert!(Function::Log.arity().accepts(1));
        assert!(Function::Log.arity().accepts(2));
        assert!(!Function::Sin.arity().accepts(2));
        assert!(Function::Random.arity().accepts(0));
    }

    #[test]
    fn complex_domain() {
        assert!(Function::Sqrt.goes_complex(-4.0));
        assert!(!Function::Sqrt.goes_complex(4.0));
        let root = Function::Sqrt.apply_complex(Complex64::new(-4.0, 0.0));
        assert!((root.im - 2.0).abs() < 1e-12);
        assert!(root.re.abs() < 1e-12);
    }
}

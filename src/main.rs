use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use calculus_expr::{
    Bindings, IntegrationMethod, MultiOp, OdeKind, Operation, SeriesKind, Session, Settings,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Decimal places kept in numeric results
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(0..=100))]
    precision: Option<u32>,
    /// Quadrature intervals and 2D plot samples
    #[arg(long, global = true)]
    resolution: Option<usize>,
    /// JSON settings file; flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a function at a point
    Eval {
        #[arg(allow_hyphen_values = true)]
        function: String,
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        z: f64,
    },
    /// Normalize a function and check that it evaluates
    Validate {
        #[arg(allow_hyphen_values = true)]
        function: String,
    },
    /// Symbolic derivative in x
    Derivative {
        #[arg(allow_hyphen_values = true)]
        function: String,
        #[arg(short, long, default_value_t = 1)]
        order: usize,
    },
    /// Indefinite integral in x
    Integral {
        #[arg(allow_hyphen_values = true)]
        function: String,
    },
    /// Definite integral by Simpson's rule
    Definite {
        #[arg(allow_hyphen_values = true)]
        function: String,
        #[arg(allow_hyphen_values = true)]
        lower: f64,
        #[arg(allow_hyphen_values = true)]
        upper: f64,
    },
    /// Integration with a method hint; numeric when both limits are given
    Advanced {
        #[arg(allow_hyphen_values = true)]
        function: String,
        #[arg(short, long, value_enum, default_value_t = IntegrationMethod::Auto)]
        method: IntegrationMethod,
        #[arg(long, requires = "upper", allow_hyphen_values = true)]
        lower: Option<f64>,
        #[arg(long, requires = "lower", allow_hyphen_values = true)]
        upper: Option<f64>,
    },
    /// Differential equation summary
    Ode {
        #[arg(allow_hyphen_values = true)]
        function: String,
        #[arg(short, long, value_enum, default_value_t = OdeKind::FirstOrder)]
        kind: OdeKind,
        /// Initial conditions, e.g. "y(0)=1"
        #[arg(short, long)]
        initial: Option<String>,
    },
    /// Taylor, Maclaurin or power series in x
    Series {
        #[arg(allow_hyphen_values = true)]
        function: String,
        #[arg(short, long, value_enum, default_value_t = SeriesKind::Taylor)]
        kind: SeriesKind,
        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        point: f64,
        #[arg(short, long, default_value_t = 5)]
        terms: usize,
    },
    /// Multivariable calculus over the given variables
    Multi {
        #[arg(allow_hyphen_values = true)]
        function: String,
        #[arg(short, long, value_enum)]
        op: MultiOp,
        /// Comma separated, e.g. x,y
        #[arg(short, long, value_delimiter = ',', default_value = "x,y")]
        vars: Vec<String>,
    },
    /// Sample y = f(x) for plotting
    Plot {
        #[arg(allow_hyphen_values = true)]
        function: String,
    },
    /// Sample z = f(x, y) on a grid for surface plotting
    Plot3d {
        #[arg(allow_hyphen_values = true)]
        function: String,
    },
}

impl Commands {
    fn function(&self) -> &str {
        match self {
            Self::Eval { function, .. }
            | Self::Validate { function }
            | Self::Derivative { function, .. }
            | Self::Integral { function }
            | Self::Definite { function, .. }
            | Self::Advanced { function, .. }
            | Self::Ode { function, .. }
            | Self::Series { function, .. }
            | Self::Multi { function, .. }
            | Self::Plot { function }
            | Self::Plot3d { function } => function,
        }
    }

    fn operation(&self) -> Option<Operation> {
        Some(match self {
            Self::Eval { .. } | Self::Validate { .. } => return None,
            Self::Derivative { order, .. } => Operation::Derivative { order: *order },
            Self::Integral { .. } => Operation::Integral,
            Self::Definite { lower, upper, .. } => Operation::Definite {
                lower: *lower,
                upper: *upper,
            },
            Self::Advanced {
                method,
                lower,
                upper,
                ..
            } => Operation::Advanced {
                method: *method,
                limits: lower.zip(*upper),
            },
            Self::Ode { kind, initial, .. } => Operation::Differential {
                kind: *kind,
                initial_conditions: initial.clone(),
            },
            Self::Series {
                kind, point, terms, ..
            } => Operation::Series {
                kind: *kind,
                point: *point,
                terms: *terms,
            },
            Self::Multi { op, vars, .. } => Operation::Multivariable {
                op: *op,
                vars: vars.clone(),
            },
            Self::Plot { .. } => Operation::Plot,
            Self::Plot3d { .. } => Operation::Plot3d,
        })
    }
}

fn settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(precision) = cli.precision {
        settings.precision = precision;
    }
    if let Some(resolution) = cli.resolution {
        settings.resolution = resolution;
    }
    Ok(settings)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = Session::new(settings(&cli)?);
    let validation = session.validate(cli.command.function())?;

    if let Some(operation) = cli.command.operation() {
        let report = session.compute(&operation)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            print!("{report}");
        }
    } else if let Commands::Eval { x, y, z, .. } = &cli.command {
        let value = session.evaluate(&Bindings::xyz(*x, *y, *z))?;
        if cli.json {
            println!("{}", json!({ "function": validation.function, "value": value }));
        } else {
            println!("{value}");
        }
    } else if cli.json {
        println!(
            "{}",
            json!({ "function": validation.function, "test": validation.test_value })
        );
    } else {
        println!(
            "Valid: {} (test: f(1) = {:.4})",
            validation.function, validation.test_value
        );
    }
    Ok(())
}

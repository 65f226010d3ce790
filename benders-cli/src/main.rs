//! `benders`: command-line driver for the decomposition walkthroughs.

mod demos;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use benders_core::{BendersController, BendersInstance, BendersSettings};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use oracle_core::{
    minimize, LinearModel, LpOracle, NlpSettings, NodeSelection, OracleSettings, SimplexOracle,
    SolveStatus,
};

#[derive(Parser, Debug)]
#[command(name = "benders")]
#[command(version)]
#[command(about = "Benders decomposition, conflict diagnosis and BFGS over a simplex oracle")]
struct Cli {
    /// Increase log output (-v progress, -vv details, -vvv state transitions)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run Benders decomposition on an instance
    Benders(BendersArgs),

    /// Solve the undecomposed MILP directly
    Monolithic {
        /// Instance JSON file (defaults to the built-in worked example)
        #[arg(long, value_name = "FILE")]
        instance: Option<PathBuf>,

        /// Branch-and-bound node order
        #[arg(long, value_enum, default_value = "best-bound")]
        node_order: NodeOrder,
    },

    /// Solve a model and, if it is infeasible, print an irreducible conflict
    Diagnose {
        /// Diagnose the relaxation of this instance instead of the built-in plan
        #[arg(long, value_name = "FILE")]
        instance: Option<PathBuf>,
    },

    /// Minimize the chained Rosenbrock function with BFGS
    Nonlinear {
        /// Number of variables
        #[arg(long, default_value_t = 2)]
        dim: usize,

        #[arg(long, default_value_t = 1000)]
        max_iterations: usize,

        /// Gradient norm tolerance
        #[arg(long, default_value_t = 1e-8)]
        tolerance: f64,
    },
}

#[derive(Args, Debug)]
struct BendersArgs {
    /// Instance JSON file (defaults to the built-in worked example)
    #[arg(long, value_name = "FILE")]
    instance: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    max_iterations: usize,

    /// Relative gap tolerance
    #[arg(long, default_value_t = 1e-6)]
    tolerance: f64,

    /// Initial lower bound on the recourse estimate theta
    #[arg(long, default_value_t = -1e6, allow_hyphen_values = true)]
    theta_lb: f64,

    /// Stop with SubproblemInfeasible instead of adding feasibility cuts
    #[arg(long)]
    no_feasibility_cuts: bool,

    /// Wall-clock limit in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Write the outcome as JSON
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NodeOrder {
    BestBound,
    DepthFirst,
}

impl From<NodeOrder> for NodeSelection {
    fn from(order: NodeOrder) -> Self {
        match order {
            NodeOrder::BestBound => NodeSelection::BestBound,
            NodeOrder::DepthFirst => NodeSelection::DepthFirst,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Benders(args) => run_benders(&args, cli.verbose > 0),
        Command::Monolithic {
            instance,
            node_order,
        } => run_monolithic(instance.as_deref(), node_order),
        Command::Diagnose { instance } => run_diagnose(instance.as_deref()),
        Command::Nonlinear {
            dim,
            max_iterations,
            tolerance,
        } => run_nonlinear(dim, max_iterations, tolerance),
    }
}

fn load_instance(path: Option<&Path>) -> Result<BendersInstance> {
    let Some(path) = path else {
        return Ok(BendersInstance::worked_example());
    };
    let file = File::open(path)
        .with_context(|| format!("Failed to open instance {}", path.display()))?;
    let instance: BendersInstance = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse instance JSON from {}", path.display()))?;
    instance
        .validate()
        .with_context(|| format!("Invalid instance in {}", path.display()))?;
    debug!("loaded instance {} from {}", instance.name(), path.display());
    Ok(instance)
}

fn run_benders(args: &BendersArgs, verbose: bool) -> Result<()> {
    let instance = load_instance(args.instance.as_deref())?;
    let settings = BendersSettings {
        verbose,
        ..BendersSettings::default()
    }
    .with_max_iterations(args.max_iterations)
    .with_gap_tol(args.tolerance)
    .with_theta_lower_bound(args.theta_lb)
    .with_feasibility_cuts(!args.no_feasibility_cuts)
    .with_time_limit_ms(args.time_limit_ms);

    info!(
        "Benders on {} (n = {}, m = {}, rows = {})",
        instance.name(),
        instance.n(),
        instance.m(),
        instance.rows()
    );
    let mut controller =
        BendersController::with_settings(instance, SimplexOracle::default(), settings)
            .context("Failed to build master and subproblem")?;
    let outcome = controller.run_with_settings().context("Benders run failed")?;

    println!("{}", outcome);

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &outcome)
            .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
        info!("wrote outcome to {}", path.display());
    }
    Ok(())
}

fn run_monolithic(path: Option<&Path>, node_order: NodeOrder) -> Result<()> {
    let instance = load_instance(path)?;
    let model = instance.monolithic_model()?;
    let settings = OracleSettings::default().with_node_selection(node_order.into());
    let oracle = SimplexOracle::new(settings);
    let sol = oracle.solve(&model).context("Monolithic solve failed")?;

    println!("Status:     {}", sol.status);
    if sol.status != SolveStatus::Optimal {
        return Ok(());
    }
    println!("Objective:  {:.6}", sol.obj_val);
    for (var, value) in model.variables().iter().zip(&sol.x) {
        println!("  {:<8} = {}", var.name, value);
    }
    println!("Nodes:      {}", sol.info.nodes);
    println!("Pivots:     {}", sol.info.pivots);
    Ok(())
}

fn run_diagnose(path: Option<&Path>) -> Result<()> {
    let model: LinearModel = match path {
        Some(_) => load_instance(path)?.monolithic_model()?.relaxed(),
        None => demos::infeasible_plan()?,
    };
    let oracle = SimplexOracle::default();
    let sol = oracle.solve(&model).with_context(|| format!("Failed to solve {}", model.name()))?;

    println!("{}: {}", model.name(), sol.status);
    match sol.status {
        SolveStatus::Infeasible => {
            let conflict = oracle
                .compute_iis(&model)
                .with_context(|| format!("Failed to compute IIS for {}", model.name()))?;
            print!("{}", conflict);
        }
        SolveStatus::Optimal => println!("Objective: {:.6}", sol.obj_val),
        SolveStatus::Unbounded => {}
    }
    Ok(())
}

fn run_nonlinear(dim: usize, max_iterations: usize, tolerance: f64) -> Result<()> {
    if dim < 2 {
        bail!("Rosenbrock needs at least 2 variables, got {}", dim);
    }
    let f = demos::Rosenbrock { dim };
    let settings = NlpSettings::default()
        .with_max_iterations(max_iterations)
        .with_grad_tol(tolerance);
    let sol = minimize(&f, &demos::rosenbrock_start(dim), &settings).context("BFGS failed")?;

    println!("Status:      {}", sol.status);
    println!("Objective:   {:.6e}", sol.obj_val);
    println!("|grad|:      {:.3e}", sol.grad_norm);
    println!("Iterations:  {}", sol.iterations);
    println!("x*:          {:?}", sol.x);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_instances_parse() {
        let worked: BendersInstance =
            serde_json::from_str(include_str!("../instances/worked_example.json")).unwrap();
        assert_eq!(worked, BendersInstance::worked_example());

        let order: BendersInstance =
            serde_json::from_str(include_str!("../instances/minimum_order.json")).unwrap();
        order.validate().unwrap();
        assert_eq!(order.name(), "minimum_order");
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "benders",
            "-vv",
            "benders",
            "--theta-lb",
            "-50",
            "--no-feasibility-cuts",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Benders(args) => {
                assert_eq!(args.theta_lb, -50.0);
                assert!(args.no_feasibility_cuts);
                assert_eq!(args.max_iterations, 100);
                assert!(args.instance.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_missing_instance_has_context() {
        let err = load_instance(Some(Path::new("/nonexistent/instance.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/instance.json"));
    }
}

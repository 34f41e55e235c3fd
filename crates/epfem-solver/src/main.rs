use std::path::{Path, PathBuf};
use std::process::ExitCode;

use epfem_io::save_history;
use epfem_solver::{
    IncrementalResults, IncrementalSolver, MemorySink, PLASTIC_STRAIN_FIELD, Problem,
    ResultSink, SolverConfig, VtkSink, element_von_mises, field_statistics,
};

fn usage() {
    eprintln!("usage:");
    eprintln!("  epfem-solver solve <input.inp> [--config <config.json>] [--output <dir>] [--verbose]");
    eprintln!("  epfem-solver check <input.inp>");
}

#[derive(Debug, Default, PartialEq)]
struct SolveArgs {
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    verbose: bool,
}

fn parse_solve_args(args: &[String]) -> Option<SolveArgs> {
    let mut parsed = SolveArgs::default();
    let mut input = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(iter.next()?)),
            "--output" => parsed.output = Some(PathBuf::from(iter.next()?)),
            "--verbose" | "-v" => parsed.verbose = true,
            flag if flag.starts_with('-') => return None,
            path if input.is_none() => input = Some(PathBuf::from(path)),
            _ => return None,
        }
    }
    parsed.input = input?;
    Some(parsed)
}

fn load_problem(path: &Path) -> Result<Problem, String> {
    Problem::from_file(path).map_err(|err| format!("{}: {}", path.display(), err))
}

fn check_file(path: &Path) -> Result<(), String> {
    let problem = load_problem(path)?;
    println!("{}", problem.statistics());
    problem
        .validate()
        .map_err(|err| format!("{}: {}", path.display(), err))?;
    println!("model_ok: {}", path.display());
    Ok(())
}

fn print_results(results: &IncrementalResults) {
    println!("\nAnalysis Results:");
    println!("  Increments: {}", results.num_increments());
    println!("  Newton iterations: {}", results.total_iterations());
    println!("  Max plastic strain: {:.6e}", results.max_plastic_strain());
    println!("  Max |u|: {:.6e}", results.displacement.amax());

    let von_mises = element_von_mises(&results.element_stress, &results.element_stress_zz);
    if let Some(stats) = field_statistics(von_mises.values()) {
        println!(
            "  Von Mises stress: min {:.6e}, max {:.6e}, mean {:.6e}",
            stats.min, stats.max, stats.mean
        );
    }
}

fn solve_file(args: &SolveArgs) -> Result<(), String> {
    let problem = load_problem(&args.input)?;

    let mut config = match &args.config {
        Some(path) => SolverConfig::from_file(path)
            .map_err(|err| format!("{}: {}", path.display(), err))?,
        None => SolverConfig::default(),
    };
    config.verbose |= args.verbose;

    println!("Initializing solver for: {}", args.input.display());
    let solver = IncrementalSolver::new(&problem, config).map_err(|err| err.to_string())?;
    println!(
        "Plane condition: {:?}, {} load increments",
        solver.plane(),
        solver.load_program().len()
    );

    let mut vtk_sink;
    let mut memory_sink = MemorySink::new();
    let sink: &mut dyn ResultSink = match &args.output {
        Some(dir) => {
            let stem = args
                .input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("result");
            vtk_sink = VtkSink::new(&problem.mesh, dir, stem).map_err(|err| err.to_string())?;
            &mut vtk_sink
        }
        None => &mut memory_sink,
    };

    let results = solver.solve(sink).map_err(|err| err.to_string())?;
    print_results(&results);

    if let Some(last) = memory_sink.last()
        && let Some(field) = last.field(PLASTIC_STRAIN_FIELD)
    {
        let plastic = field.values.values().filter(|v| **v > 0.0).count();
        println!("  Plastic elements: {} of {}", plastic, field.values.len());
    }

    if let Some(dir) = &args.output {
        let record = results
            .history
            .to_record(results.num_increments())
            .map_err(|err| err.to_string())?;
        let path = dir.join("history.json");
        save_history(&path, &record).map_err(|err| err.to_string())?;
        println!("  Wrote {} VTK frames and {}", results.num_increments(), path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("check") if args.len() == 3 => match check_file(Path::new(&args[2])) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("check_error: {err}");
                ExitCode::from(1)
            }
        },
        Some("solve") => {
            let Some(solve_args) = parse_solve_args(&args[2..]) else {
                usage();
                return ExitCode::from(2);
            };
            match solve_file(&solve_args) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("solve_error: {err}");
                    ExitCode::from(1)
                }
            }
        }
        _ => {
            usage();
            ExitCode::from(2)
        }
    }
}

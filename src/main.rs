use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{arg, crate_version, value_parser, ArgAction, ArgMatches, Command};
use log::{error, info};
use serde_json::json;

use u_cptp::logging::{init_logger, LogOptions};
use u_cptp::models::{Instance, Solution, SolveStatus};
use u_cptp::parser::parse_instance;
use u_cptp::render::write_tour_svg;
use u_cptp::signals::CancellationToken;
use u_cptp::solvers::{
    cptp_solve, find_solver, parse_key_value, solve_status_or_err, SolveOptions, SOLVERS,
};

fn cli() -> Command {
    Command::new("cptp")
        .version(crate_version!())
        .about("Solves the Capacitated Profitable Tour Problem by branch and cut")
        .arg(
            arg!(-i --instance <PATH> "Instance file (.vrp for VRPLIB, legacy format otherwise)")
                .value_parser(value_parser!(PathBuf))
                .required_unless_present("list-params"),
        )
        .arg(
            arg!(-S --solver <NAME> "Solver to use")
                .default_value("mip")
                .value_parser(SOLVERS.iter().map(|s| s.name).collect::<Vec<_>>()),
        )
        .arg(
            arg!(-t --timelimit <SECONDS> "Time limit in seconds")
                .default_value("600")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            arg!(-s --seed <SEED> "Random seed, 0 picks one from the clock")
                .default_value("0")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(-D --define <KEY_VALUE> "Solver parameter as KEY=VALUE (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(arg!(-l --log <PATH> "Write the log to this file").value_parser(value_parser!(PathBuf)))
        .arg(arg!(-v --verbose "Debug logging"))
        .arg(arg!(--timestamps "Prefix log records with a timestamp"))
        .arg(
            arg!(--visualize <PATH> "Write an SVG of the final tour")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-w --"json-output" <PATH> "Write a JSON summary of the run")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(--"list-params" "Print the parameters of the selected solver and exit"))
}

fn list_params(matches: &ArgMatches) -> Result<()> {
    let name = matches
        .get_one::<String>("solver")
        .ok_or_else(|| anyhow!("missing solver"))?;
    let spec = find_solver(name)?;
    println!("Parameters of solver `{}`:", spec.name);
    for p in spec.params {
        println!(
            "  {:<36} {:<6} (default {:<5}) {}",
            p.name,
            p.ty.name(),
            p.default,
            p.glossary
        );
    }
    Ok(())
}

fn solve_options(matches: &ArgMatches) -> Result<SolveOptions> {
    let solver = matches
        .get_one::<String>("solver")
        .cloned()
        .unwrap_or_else(|| "mip".to_string());
    let seconds = matches.get_one::<f64>("timelimit").copied().unwrap_or(600.0);
    let time_limit = Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("invalid time limit `{seconds}`"))?;
    let params = matches
        .get_many::<String>("define")
        .into_iter()
        .flatten()
        .map(|pair| parse_key_value(pair))
        .collect::<u_cptp::Result<Vec<_>>>()?;

    Ok(SolveOptions {
        solver,
        time_limit: Some(time_limit),
        seed: matches.get_one::<u64>("seed").copied().unwrap_or(0),
        params,
        handle_signals: true,
    })
}

fn finite_or_null(value: f64) -> serde_json::Value {
    if value.is_finite() {
        json!(value)
    } else {
        serde_json::Value::Null
    }
}

fn write_json_dump(
    path: &Path,
    instance: &Instance,
    options: &SolveOptions,
    solution: &Solution,
    status: SolveStatus,
    took: Duration,
) -> Result<()> {
    let dump = json!({
        "took": took.as_secs_f64(),
        "feasible": status.is_feasible(),
        "valid": !status.is_invalid(),
        "primalBound": finite_or_null(solution.upper_bound()),
        "dualBound": finite_or_null(solution.lower_bound()),
        "status": status,
        "instance": instance.name(),
        "seed": options.seed,
        "tour": solution.tour().visit_order(),
    });
    let text = serde_json::to_string_pretty(&dump)?;
    std::fs::write(path, text).with_context(|| format!("writing `{}`", path.display()))?;
    Ok(())
}

fn print_solution(solution: &Solution, status: SolveStatus, took: Duration) {
    println!("OBJ: [{}, {}]", solution.lower_bound(), solution.upper_bound());
    if status.is_feasible() {
        let order = solution.tour().visit_order();
        let path: Vec<String> = order.iter().chain(order.first()).map(|v| v.to_string()).collect();
        println!("TOUR: {}", path.join(" -> "));
    }
    println!("STATUS: {status}");
    println!("TOOK: {:.3}s", took.as_secs_f64());
}

fn run(matches: &ArgMatches) -> Result<SolveStatus> {
    let path = matches
        .get_one::<PathBuf>("instance")
        .ok_or_else(|| anyhow!("missing instance path"))?;
    let options = solve_options(matches)?;

    let instance = parse_instance(path)
        .with_context(|| format!("loading instance `{}`", path.display()))?;
    info!(
        "loaded `{}`: {} customers, capacity {}",
        instance.name(),
        instance.num_customers(),
        instance.vehicle_cap()
    );

    let now = Instant::now();
    let token = CancellationToken::new();
    let mut solution = Solution::for_instance(&instance);
    let status = solve_status_or_err(cptp_solve(&instance, &options, &mut solution, &token));
    let took = now.elapsed();

    print_solution(&solution, status, took);

    if let Some(svg) = matches.get_one::<PathBuf>("visualize") {
        if status.is_feasible() {
            write_tour_svg(svg, &instance, solution.tour())
                .with_context(|| format!("writing `{}`", svg.display()))?;
            info!("tour rendered to `{}`", svg.display());
        }
    }
    if let Some(dump) = matches.get_one::<PathBuf>("json-output") {
        write_json_dump(dump, &instance, &options, &solution, status, took)?;
    }
    Ok(status)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let log_options = LogOptions::from_verbosity(matches.get_flag("verbose"))
        .with_output(matches.get_one::<PathBuf>("log").cloned())
        .with_timestamp(matches.get_flag("timestamps"));
    if let Err(e) = init_logger(&log_options) {
        eprintln!("cptp: {e}");
        return ExitCode::FAILURE;
    }

    if matches.get_flag("list-params") {
        return match list_params(&matches) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        };
    }

    match run(&matches) {
        Ok(status) if status.is_feasible() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

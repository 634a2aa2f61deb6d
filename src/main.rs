use hyperrail::plan::{self, RoutingResult};
use hyperrail::solver::Z3Solver;
use hyperrail::{raw_problem, Formulation, PipelineSettings};
use log::*;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "hyperrail", about = "Train composition routing on hypergraphs.")]
struct Opt {
    /// Problem instance (JSON)
    #[structopt(name = "FILE")]
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// Write the chosen hyperedges as JSON.
    #[structopt(short)]
    #[structopt(parse(from_os_str))]
    outputfile: Option<PathBuf>,

    /// Dump the filtered hyperedges to a text file.
    #[structopt(long)]
    #[structopt(parse(from_os_str))]
    hyperedges: Option<PathBuf>,

    /// Model to build: hypergraph or graph.
    #[structopt(long, default_value = "hypergraph")]
    formulation: Formulation,

    /// Activate debug mode
    #[structopt(short, long)]
    verbose: bool,

    /// Generate and filter hyperedges in parallel.
    #[structopt(long)]
    parallel: bool,

    /// Trains on a timetable trip keep their arrangement.
    #[structopt(long)]
    preserve_trip_composition: bool,

    /// Solver timeout in milliseconds.
    #[structopt(long)]
    timeout: Option<u64>,

    /// Stop after building the model.
    #[structopt(long)]
    build_only: bool,
}

fn main() {
    let _h1 = hprof::enter("init");

    let opt = Opt::from_args();
    let level = if opt.verbose {
        if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    } else {
        LevelFilter::Error
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("could not initialize logger: {}", e);
    }
    info!("{:#?}", opt);
    drop(_h1);

    let code = match run(&opt) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            1
        }
    };

    hprof::end_frame();
    if opt.verbose {
        hprof::profiler().print_timing();
    }
    std::process::exit(code);
}

fn run(opt: &Opt) -> Result<(), hyperrail::Error> {
    let instance = {
        let _h = hprof::enter("load");
        trace!("Loading file {}", opt.file.display());
        let raw = raw_problem::read_instance(&opt.file)?;
        raw_problem::convert(&raw)?
    };

    let settings = PipelineSettings {
        formulation: opt.formulation,
        parallel: opt.parallel,
        preserve_trip_composition: opt.preserve_trip_composition,
    };

    let model = match opt.formulation {
        Formulation::Hypergraph => {
            let hyperedges = hyperrail::filtered_hyperedges(&instance, settings)?;
            if let Some(f) = opt.hyperedges.as_ref() {
                plan::write_hyperedges(f, &instance.problem, &hyperedges)?;
                info!("Wrote hyperedges to file {}", f.display());
            }
            hyperrail::model::build_model(&instance.problem, hyperedges)?
        }
        Formulation::Graph => {
            if opt.hyperedges.is_some() {
                warn!("--hyperedges has no effect with the graph formulation");
            }
            hyperrail::configure_model(&instance, settings)?
        }
    };
    println!(
        "Model: {} variables, {} constraints",
        model.num_variables(),
        model.constraints().len()
    );
    if opt.build_only {
        return Ok(());
    }

    let mut solver = Z3Solver::with_timeout(opt.timeout);
    match hyperrail::solve_model(&model, &mut solver)? {
        RoutingResult::Routed(routing) => {
            println!("{}", plan::print_routing(&instance.problem, &routing));
            if let Some(f) = opt.outputfile.as_ref() {
                plan::write_routing_json(f, &instance.problem, &routing)?;
                info!("Wrote routing to file {}", f.display());
            }
        }
        RoutingResult::Infeasible => {
            println!("Model is infeasible.");
        }
    }
    Ok(())
}

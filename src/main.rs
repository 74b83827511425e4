use std::{process::ExitCode, time::Instant};

use log::info;

use tsp_ga_core::{
    GaOptions, PointSourceSpec, Result, Tour, TourReport, logging, solve, write_report,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let now = Instant::now();
    let options = GaOptions::from_args()?;
    logging::init_logger(&options)?;

    info!("options: {options}");

    let mut source = PointSourceSpec::parse(&options.points)?.open()?;
    let initial = Tour::from_source(source.as_mut())?;
    info!("input: n={} length={:.3}", initial.len(), initial.length());

    let best = solve(&initial, &options)?;
    let report = best.as_ref().map(TourReport::from);
    write_report(&options, report.as_ref())?;

    info!(
        "output: length={} time={:.2}s",
        report.as_ref().map_or(f64::NAN, |r| r.length),
        now.elapsed().as_secs_f32()
    );

    Ok(())
}

use std::{
    fmt,
    fs::File,
    io::{self, Write},
};

use crate::{GaOptions, Result, Tour};

/// What the result sink gets: the city cycle and its length.
#[derive(Clone, Debug, PartialEq)]
pub struct TourReport {
    pub city_ids: Vec<usize>,
    pub length: f64,
}

impl From<&Tour> for TourReport {
    fn from(tour: &Tour) -> Self {
        Self {
            city_ids: tour.city_ids(),
            length: tour.length(),
        }
    }
}

impl fmt::Display for TourReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.city_ids {
            write!(f, "{id} -> ")?;
        }
        if let Some(first) = self.city_ids.first() {
            writeln!(f, "{first}")?;
        }
        write!(f, "length={:.3}", self.length)
    }
}

/// Writes the report to `--output`, or stdout when unset.
pub fn write_report(options: &GaOptions, report: Option<&TourReport>) -> Result<()> {
    match options.output_path() {
        Some(path) => {
            let mut file = File::create(path)?;
            render(&mut file, report)?;
            log::info!("output: wrote report to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            render(&mut lock, report)?;
        }
    }
    Ok(())
}

fn render<W: Write>(out: &mut W, report: Option<&TourReport>) -> io::Result<()> {
    match report {
        Some(report) => writeln!(out, "{report}"),
        None => writeln!(out, "no result"),
    }
}

use std::{fs, io::Read, path::PathBuf};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Error, Result};

/// Supplies the cities of one problem instance.
///
/// `next_point` must be called exactly `count()` times; one call more is an error.
pub trait PointSource {
    fn count(&self) -> usize;
    fn next_point(&mut self) -> Result<(f64, f64)>;
}

/// `n` points with both coordinates uniform in `[-max, +max]`.
#[derive(Debug)]
pub struct RandomPointSource {
    n: usize,
    max: f64,
    generated: usize,
    rng: StdRng,
}

impl RandomPointSource {
    pub fn new(n: usize, max: f64, seed: u64) -> Self {
        Self {
            n,
            max,
            generated: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn coordinate(&mut self) -> f64 {
        (self.rng.random::<f64>() * 2.0 - 1.0) * self.max
    }
}

impl PointSource for RandomPointSource {
    fn count(&self) -> usize {
        self.n
    }

    fn next_point(&mut self) -> Result<(f64, f64)> {
        if self.generated == self.n {
            return Err(Error::PointSourceExhausted {
                requested: self.generated + 1,
                available: self.n,
            });
        }
        let x = self.coordinate();
        let y = self.coordinate();
        self.generated += 1;
        Ok((x, y))
    }
}

/// Points read from text: whitespace-separated `x,y` tokens.
#[derive(Debug)]
pub struct ListPointSource {
    points: Vec<(f64, f64)>,
    cursor: usize,
}

impl ListPointSource {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points, cursor: 0 }
    }

    pub fn parse(input: &str) -> Result<Self> {
        parse_points(input).map(Self::new)
    }
}

impl PointSource for ListPointSource {
    fn count(&self) -> usize {
        self.points.len()
    }

    fn next_point(&mut self) -> Result<(f64, f64)> {
        let point = self
            .points
            .get(self.cursor)
            .copied()
            .ok_or(Error::PointSourceExhausted {
                requested: self.cursor + 1,
                available: self.points.len(),
            })?;
        self.cursor += 1;
        Ok(point)
    }
}

/// Parsed `--points` constructor expression.
#[derive(Clone, Debug, PartialEq)]
pub enum PointSourceSpec {
    Random { n: usize, max: f64, seed: u64 },
    File(PathBuf),
    Stdin,
}

impl PointSourceSpec {
    /// Accepts `random(N,MAX,SEED)`, `RandomPointGroup(N,MAX,SEED)`, `file(PATH)`,
    /// `stdin` and `-`.
    pub fn parse(raw: &str) -> Result<Self> {
        let expr = raw.trim();
        if expr == "-" || expr.eq_ignore_ascii_case("stdin") {
            return Ok(Self::Stdin);
        }

        let (name, args) = expr
            .strip_suffix(')')
            .and_then(|head| head.split_once('('))
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "Invalid point source expression: {raw} (expected name(args))"
                ))
            })?;

        match name.trim().to_ascii_lowercase().as_str() {
            "random" | "randompointgroup" => {
                let fields: Vec<&str> = args.split(',').map(str::trim).collect();
                let [n, max, seed] = fields.as_slice() else {
                    return Err(Error::invalid_input(format!(
                        "Invalid point source expression: {raw} (expected random(N,MAX,SEED))"
                    )));
                };
                Ok(Self::Random {
                    n: parse_arg(raw, "N", n)?,
                    max: parse_arg(raw, "MAX", max)?,
                    seed: parse_arg(raw, "SEED", seed)?,
                })
            }
            "file" => {
                let path = args.trim();
                if path.is_empty() {
                    return Err(Error::invalid_input(format!(
                        "Invalid point source expression: {raw} (missing path)"
                    )));
                }
                Ok(Self::File(PathBuf::from(path)))
            }
            other => Err(Error::invalid_input(format!(
                "Unknown point source: {other} (expected random|file|stdin)"
            ))),
        }
    }

    pub fn open(&self) -> Result<Box<dyn PointSource>> {
        match self {
            Self::Random { n, max, seed } => Ok(Box::new(RandomPointSource::new(*n, *max, *seed))),
            Self::File(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    Error::invalid_input(format!("failed to read points {}: {e}", path.display()))
                })?;
                Ok(Box::new(ListPointSource::parse(&text)?))
            }
            Self::Stdin => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Ok(Box::new(ListPointSource::parse(&text)?))
            }
        }
    }
}

fn parse_arg<T: std::str::FromStr>(raw: &str, label: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        Error::invalid_input(format!(
            "Invalid point source expression: {raw} ({label} is not a number: {value})"
        ))
    })
}

fn parse_points(input: &str) -> Result<Vec<(f64, f64)>> {
    let mut points = Vec::new();
    for (idx, tok) in input.split_whitespace().enumerate() {
        let mut it = tok.split(',');
        let x_s = it
            .next()
            .ok_or_else(|| Error::invalid_input(format!("Token {}: missing x", idx + 1)))?;
        let y_s = it
            .next()
            .ok_or_else(|| Error::invalid_input(format!("Token {}: missing y", idx + 1)))?;

        if it.next().is_some() {
            return Err(Error::invalid_input(format!(
                "Token {}: expected 'x,y' but got extra comma fields: {tok}",
                idx + 1
            )));
        }

        let x: f64 = x_s.parse().map_err(|_| {
            Error::invalid_input(format!("Token {}: invalid x: {}", idx + 1, x_s))
        })?;
        let y: f64 = y_s.parse().map_err(|_| {
            Error::invalid_input(format!("Token {}: invalid y: {}", idx + 1, y_s))
        })?;

        points.push((x, y));
    }

    if points.is_empty() {
        return Err(Error::invalid_input("No points provided."));
    }

    Ok(points)
}

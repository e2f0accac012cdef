use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kurbo::{Point, Rect};
use layruler_core::AngleConstraint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Constraint {
    Any,
    Diagonal,
    Ortho,
    Horizontal,
    Vertical,
    /// Use the configured default
    Global,
}

impl From<Constraint> for AngleConstraint {
    fn from(c: Constraint) -> Self {
        match c {
            Constraint::Any => AngleConstraint::Any,
            Constraint::Diagonal => AngleConstraint::Diagonal,
            Constraint::Ortho => AngleConstraint::Ortho,
            Constraint::Horizontal => AngleConstraint::Horizontal,
            Constraint::Vertical => AngleConstraint::Vertical,
            Constraint::Global => AngleConstraint::Global,
        }
    }
}

/// Polygon hull points in dbu.
#[derive(Debug, Clone, PartialEq)]
pub struct Hull(pub Vec<Point>);

#[derive(Debug, Parser)]
#[command(name = "layruler", version, about = "Snap points against a single-cell layout")]
pub struct Cli {
    #[command(flatten)]
    pub layout: LayoutArgs,

    #[arg(long, help = "Ruler configuration file (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Grid pitch in microns, overrides the configuration")]
    pub grid: Option<f64>,

    #[arg(long, default_value_t = 0.02, help = "Search range in microns")]
    pub range: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct LayoutArgs {
    #[arg(long, default_value_t = 0.001, help = "Database unit in microns")]
    pub dbu: f64,

    #[arg(
        long = "polygon",
        value_parser = parse_hull,
        allow_hyphen_values = true,
        help = "Polygon in dbu as \"x,y x,y ...\""
    )]
    pub polygons: Vec<Hull>,

    #[arg(
        long = "box",
        value_parser = parse_box,
        allow_hyphen_values = true,
        help = "Box in dbu as \"x0,y0,x1,y1\""
    )]
    pub boxes: Vec<Rect>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Snap a point, optionally under an angle constraint from a reference point
    Snap {
        #[arg(
            value_parser = parse_point,
            allow_hyphen_values = true,
            help = "Point in microns as \"x,y\""
        )]
        point: Point,

        #[arg(
            long,
            value_parser = parse_point,
            allow_hyphen_values = true,
            help = "Reference point in microns"
        )]
        reference: Option<Point>,

        #[arg(long, value_enum, default_value_t = Constraint::Global)]
        constraint: Constraint,
    },
    /// Measure between the contours around a point
    Measure {
        #[arg(
            value_parser = parse_point,
            allow_hyphen_values = true,
            help = "Point in microns as \"x,y\""
        )]
        point: Point,

        #[arg(
            long,
            value_parser = parse_point,
            allow_hyphen_values = true,
            help = "Direction hint for the second contour"
        )]
        to: Option<Point>,

        #[arg(long, value_enum, default_value_t = Constraint::Global)]
        constraint: Constraint,

        #[arg(long, help = "Largest search range in microns")]
        max_range: Option<f64>,
    },
}

fn parse_numbers(s: &str, sep: char) -> Result<Vec<f64>, String> {
    s.split(sep)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().map_err(|e| format!("invalid number '{t}': {e}")))
        .collect()
}

pub fn parse_point(s: &str) -> Result<Point, String> {
    match parse_numbers(s, ',')?.as_slice() {
        [x, y] => Ok(Point::new(*x, *y)),
        _ => Err(format!("expected \"x,y\", got '{s}'")),
    }
}

pub fn parse_hull(s: &str) -> Result<Hull, String> {
    let points = s.split_whitespace().map(parse_point).collect::<Result<Vec<_>, _>>()?;
    if points.len() < 3 {
        return Err(format!("a polygon needs at least 3 points, got {}", points.len()));
    }
    Ok(Hull(points))
}

pub fn parse_box(s: &str) -> Result<Rect, String> {
    match parse_numbers(s, ',')?.as_slice() {
        [x0, y0, x1, y1] => Ok(Rect::new(*x0, *y0, *x1, *y1)),
        _ => Err(format!("expected \"x0,y0,x1,y1\", got '{s}'")),
    }
}

//! Command line front end: snap and measure against a layout given as arguments.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command, LayoutArgs};
use layruler_core::{
    AngleConstraint, ConfigError, Layout, LayoutError, LayoutShape, LayoutView, RulerConfig,
    obj_snap, obj_snap2_constrained, obj_snap_constrained,
};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn build_view(args: &LayoutArgs) -> Result<LayoutView, LayoutError> {
    let mut layout = Layout::new(args.dbu);
    let layer = layout.insert_layer("1/0");
    let top = layout.add_cell("TOP");
    for hull in &args.polygons {
        layout.insert_shape(top, layer, LayoutShape::Polygon(hull.0.clone()))?;
    }
    for rect in &args.boxes {
        layout.insert_shape(top, layer, LayoutShape::Box(*rect))?;
    }
    log::info!(
        "Layout: {} polygons, {} boxes, dbu {}",
        args.polygons.len(),
        args.boxes.len(),
        args.dbu
    );
    Ok(LayoutView::new(layout, top))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => RulerConfig::load(path)?,
        None => RulerConfig::default(),
    };
    if let Some(grid) = cli.grid {
        config.grid = grid;
        config.check()?;
        config = config.validated();
    }

    let layout_view = build_view(&cli.layout)?;
    let view = config.obj_snap.then_some(&layout_view);
    let grid = config.grid_vector();
    let template = config.ruler_template();
    let resolve =
        |c: cli::Constraint| AngleConstraint::from(c).resolve(config.default_angle_constraint);

    match cli.command {
        Command::Snap { point, reference, constraint } => {
            let result = match reference {
                Some(reference) => obj_snap_constrained(
                    view,
                    reference,
                    point,
                    grid,
                    resolve(constraint),
                    cli.range,
                ),
                None => obj_snap(view, point, grid, cli.range),
            };
            println!("{} {} {:?}", result.point.x, result.point.y, result.kind);
            if let Some(reference) = reference {
                let ruler = template.with_points(vec![reference, result.point]);
                println!("{}", ruler.text());
            }
        }
        Command::Measure { point, to, constraint, max_range } => {
            let max_range = max_range.unwrap_or(cli.range * config.max_range_factor);
            let result = obj_snap2_constrained(
                view,
                point,
                to.unwrap_or(point),
                grid,
                resolve(constraint),
                cli.range,
                max_range,
            );
            match result.edge() {
                Some(edge) => {
                    let ruler = template.with_points(vec![edge.p1, edge.p2]);
                    println!(
                        "{} {} -> {} {} ({:?} -> {:?})",
                        edge.p1.x,
                        edge.p1.y,
                        edge.p2.x,
                        edge.p2.y,
                        result.first_kind,
                        result.second_kind
                    );
                    println!("{}", ruler.text());
                    println!("dx {} dy {}", ruler.text_x(), ruler.text_y());
                }
                None => println!("no contours found"),
            }
        }
    }
    Ok(())
}

use miette::*;
use tracing_subscriber::EnvFilter;

use laser_beams::{Level, SolverOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let level = match std::env::args().nth(1) {
        Some(path) => {
            let input = std::fs::read_to_string(&path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read level {path}"))?;
            Level::parse(&input)?
        }
        None => Level::laser_pyramid()?,
    };

    let mut puzzle = level.build()?;
    println!("{}", puzzle.grid);
    println!("Solving...");
    match puzzle.solve(SolverOptions::default())? {
        Some(solution) => {
            println!("Solution:");
            for placement in &solution.placements {
                println!(
                    "  {} facing {} at ({}, {})",
                    placement.kind, placement.rotation, placement.position.x, placement.position.y
                );
            }
            println!("{}", puzzle.grid);
            println!("Visited {} search nodes", solution.nodes);
        }
        None => println!("No solution"),
    }
    Ok(())
}

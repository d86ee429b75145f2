//! Ties [`crate::tick::Simulation`] to the CLI: runs the requested tick
//! budget, printing and checkpointing around it.
//!
//! Grounded in `FluidSimulation::run`'s driving loop in
//! `examples/original_source/include/FluidSimulation.h`, split out of the
//! tick/propagator modules so the "what happens around a tick" concern
//! (stdout, checkpoint cadence) stays separate from "what a tick does".

use crate::config::Cli;
use crate::error::SimError;
use crate::grid::Backend;
use crate::io::LoadedGrid;
use crate::scalar::Scalar;
use crate::tick::Simulation;

const CHECKPOINT_INTERVAL: u64 = 10;

pub fn run<P, V, FV, B>(cli: &Cli, grid: LoadedGrid) -> Result<(), SimError>
where
    P: Scalar,
    V: Scalar,
    FV: Scalar,
    B: Backend,
    B::Storage<u8>: Sync,
{
    tracing::info!(
        backend = B::label(),
        rows = grid.rows,
        cols = grid.cols,
        ticks = cli.ticks,
        "starting simulation"
    );

    let rng = crate::rng::new_rng();
    let mut sim: Simulation<P, V, FV, B> = Simulation::from_grid(&grid, rng);

    for tick_index in 0..cli.ticks {
        let moved = sim.tick(tick_index);

        if moved {
            println!("Tick {tick_index}:");
            for row in sim.field_rows() {
                println!("{row}");
            }
        }

        if tick_index % CHECKPOINT_INTERVAL == 0 {
            let (rho_air, rho_fluid, g) = sim.checkpoint_scalars();
            crate::io::write_checkpoint(
                &cli.checkpoint,
                grid.rows,
                grid.cols,
                &sim.field_rows(),
                rho_air,
                rho_fluid,
                g,
            )
            .map_err(SimError::from)?;
        }
    }

    tracing::info!(
        total_delta_p = ?sim.total_delta_p().to_f64(),
        "simulation finished"
    );

    Ok(())
}

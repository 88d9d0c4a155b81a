//! Path tracking error report.
//!
//! Compares the poses recorded in a tick archive against the reference path they were tracking,
//! printing the distance and heading error statistics.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, eyre::eyre, Report};
use std::path::PathBuf;
use structopt::StructOpt;

use mpc_lib::analysis;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "track_error", about = "Path tracking error of a recorded run")]
struct Opt {
    /// Reference waypoint file (t_s, x_m, y_m, psi_rad)
    #[structopt(parse(from_os_str))]
    waypoints: PathBuf,

    /// Tick archive written by mpc_exec
    #[structopt(parse(from_os_str))]
    ticks: PathBuf,

    /// Write the per-pose errors to this CSV file
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let (reference, path_length_m) =
        analysis::load_reference(&opt.waypoints).wrap_err("Failed to load the reference path")?;
    let poses =
        analysis::load_recorded_poses(&opt.ticks).wrap_err("Failed to load the tick archive")?;

    let errors = analysis::tracking_errors(&reference, &poses);
    let stats = analysis::error_stats(&errors, path_length_m)
        .ok_or_else(|| eyre!("No poses could be matched to the reference"))?;

    println!("Reference path length: {:.2} m", stats.path_length_m);
    println!("Poses:                 {}", stats.num_samples);
    println!("Mean error:            {:.3} m", stats.mean_error_m);
    println!("Max error:             {:.3} m", stats.max_error_m);
    println!("RMS error:             {:.3} m", stats.rms_error_m);
    println!(
        "Mean heading error:    {:.3} rad",
        stats.mean_abs_heading_error_rad
    );

    if let Some(path) = opt.output {
        let mut writer = csv::Writer::from_path(&path)
            .wrap_err_with(|| format!("Could not create {:?}", path))?;

        for e in errors.iter() {
            writer.serialize(e).wrap_err("Could not write error record")?;
        }
        writer.flush().wrap_err("Could not flush the error file")?;

        println!("Per-pose errors written to {:?}", path);
    }

    Ok(())
}

//! # Goniophotometer Executable
//!
//! This executable runs a complete goniophotometric measurement:
//! - Finds the reference position of the theta and phi axes
//! - Sweeps the light sensor over the hemisphere, archiving a sample at every position
//! - Parks the rig and saves a summary of the sweep, including the luminous flux and beam widths
//!   of the source, into the session directory
//!
//! Use `--sim` to run against the simulated rig instead of the Raspberry Pi hardware.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use embedded_hal::blocking::delay::DelayMs;
use log::{error, info, warn};
use structopt::StructOpt;

// Internal
use gonio_lib::{
    hal::{NoDelay, ReferenceInput, Stepper},
    motion_ctrl::{Axis, MotionCtrl, MotionCtrlError},
    params::GonioExecParams,
    sim::SimRig,
    sweep::{LightSensor, Sweep, SweepError},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "gonio_exec", about = "Goniophotometer measurement executable")]
struct Opts {
    /// Run against the simulated rig
    #[structopt(long)]
    sim: bool,

    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "gonio_exec.toml")]
    params: String,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("gonio_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Goniophotometer Executable\n");
    if let Some(hostname) = host::get_hostname() {
        info!("Running on: {}", hostname);
    }
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: GonioExecParams =
        util::params::load(&opts.params).wrap_err("Failed to load parameters")?;

    info!("Parameters loaded from {}", opts.params);

    // ---- RIG INITIALISATION ----

    let theta_spr = params
        .theta
        .steps_per_rev()
        .ok_or(MotionCtrlError::InvalidDegreesPerStep(
            Axis::Theta,
            params.theta.degrees_per_step,
        ))?;
    let phi_spr = params
        .phi
        .steps_per_rev()
        .ok_or(MotionCtrlError::InvalidDegreesPerStep(
            Axis::Phi,
            params.phi.degrees_per_step,
        ))?;

    let result = if opts.sim {
        info!("Using the simulated rig");

        let rig = SimRig::new(
            &params.sim,
            theta_spr as i64,
            phi_spr as i64,
            params.theta.degrees_per_step,
        );
        let motion = MotionCtrl::new(params.motion.clone(), rig.theta_hw, rig.phi_hw, NoDelay);

        measure(&params, &session, motion, rig.light_source)
    } else {
        measure_hardware(&params, &session, (theta_spr as u32, phi_spr as u32))
    };

    if let Err(ref e) = result {
        error!("Measurement failed: {:#}", e);
    }

    result
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

#[cfg(all(target_arch = "arm", target_os = "linux"))]
fn measure_hardware(
    params: &GonioExecParams,
    session: &Session,
    steps_per_rev: (u32, u32),
) -> Result<()> {
    use gonio_lib::{hal::StdDelay, rpi::RpiRig};

    let rig = RpiRig::new(
        &params.pins,
        &params.sensor,
        steps_per_rev,
        params.motion.motor_speed_rpm,
    )
    .wrap_err("Failed to initialise the rig hardware")?;

    info!("Rig hardware initialised");

    let motion = MotionCtrl::new(params.motion.clone(), rig.theta_hw, rig.phi_hw, StdDelay);

    measure(params, session, motion, rig.sensor)
}

#[cfg(not(all(target_arch = "arm", target_os = "linux")))]
fn measure_hardware(
    _params: &GonioExecParams,
    _session: &Session,
    _steps_per_rev: (u32, u32),
) -> Result<()> {
    Err(color_eyre::eyre::eyre!(
        "The rig hardware is only available on the Raspberry Pi, use --sim to run the simulation"
    ))
}

/// Calibrate the rig, run the sweep and save the results into the session.
fn measure<S, I, D, L>(
    params: &GonioExecParams,
    session: &Session,
    mut motion: MotionCtrl<S, I, D>,
    sensor: L,
) -> Result<()>
where
    S: Stepper,
    I: ReferenceInput,
    D: DelayMs<u32>,
    L: LightSensor,
{
    // ---- AXES ----

    let theta_res = params.theta.resolution(Axis::Theta)?;
    let phi_res = params.phi.resolution(Axis::Phi)?;

    motion
        .theta_init(params.theta.degrees_per_step, theta_res)
        .wrap_err("Failed to initialise theta")?;
    motion
        .phi_init(params.phi.degrees_per_step, phi_res)
        .wrap_err("Failed to initialise phi")?;

    let mut sweep = Sweep::new(params.sweep.clone(), motion, sensor);

    // ---- CALIBRATION ----

    info!("Calibrating...");

    let mut attempt = 1;
    loop {
        match sweep.calibrate() {
            Ok(()) => break,
            Err(SweepError::ReferenceNotFound(axis))
                if attempt < params.max_calibration_attempts =>
            {
                warn!(
                    "{:?} reference not found (attempt {} of {}), retrying",
                    axis, attempt, params.max_calibration_attempts
                );
                attempt += 1;
            }
            Err(e) => return Err(e).wrap_err("Calibration failed"),
        }
    }

    // ---- SWEEP ----

    let mut archiver =
        Archiver::from_path(session, "samples.csv").wrap_err("Failed to create the sample archive")?;

    let report = sweep
        .run(&mut archiver)
        .wrap_err("Measurement sweep failed")?;

    info!(
        "{} samples archived to {:?}",
        archiver.num_records(),
        archiver.path()
    );

    if params.park_on_end {
        sweep
            .motion_mut()
            .park()
            .wrap_err("Failed to park the rig")?;
        info!("Rig parked");
    }

    session
        .save_json("sweep_report.json", &report)
        .wrap_err("Failed to save the sweep report")?;

    info!("Measurement complete");

    Ok(())
}

//! # Kinematic tracker
//!
//! A feedback controller for the [`Controller`] contract. Steering comes from PID controllers on
//! the lateral and heading errors to a lookahead point of the reference, acceleration from a
//! proportional controller on the speed error. The predicted trajectory is a kinematic bicycle
//! rollout holding the current input over the horizon.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector2;

use super::{ControlAction, Controller, CtrlError, Params, PidController, SolverStatus};
use crate::{traj::Trajectory, vehicle::VehicleState};
use util::maths::wrap_to_pi;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct KinematicTracker {
    params: Params,

    /// Time between calls to `solve`
    ctrl_period_s: f64,

    /// Time between consecutive reference points
    horizon_step_s: f64,

    lat_ctrl: PidController,
    head_ctrl: PidController,

    initial: Option<VehicleState>,
    reference: Trajectory,
    desired_speed_ms: f64,

    /// Input currently applied to the vehicle
    steer_rad: f64,
    accel_mps2: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl KinematicTracker {
    pub fn new(params: Params, ctrl_period_s: f64, horizon_step_s: f64) -> Result<Self, CtrlError> {
        params.validate()?;

        if !(ctrl_period_s > 0.0 && horizon_step_s > 0.0) {
            return Err(CtrlError::InvalidParams(format!(
                "control period ({}) and horizon step ({}) must be positive",
                ctrl_period_s, horizon_step_s
            )));
        }

        Ok(Self {
            lat_ctrl: PidController::new(params.lat_k_p, params.lat_k_i, params.lat_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
            params,
            ctrl_period_s,
            horizon_step_s,
            initial: None,
            reference: Trajectory::default(),
            desired_speed_ms: 0.0,
            steer_rad: 0.0,
            accel_mps2: 0.0,
        })
    }

    /// Load the parameters from a file relative to the parameters directory.
    pub fn from_file(
        params_file: &str,
        ctrl_period_s: f64,
        horizon_step_s: f64,
    ) -> Result<Self, CtrlError> {
        let params = util::params::load(params_file).map_err(CtrlError::ParamLoadError)?;

        Self::new(params, ctrl_period_s, horizon_step_s)
    }

    /// Speed to track, either the desired speed or the one implied by the reference spacing.
    fn reference_speed(&self, state: &VehicleState) -> f64 {
        if self.desired_speed_ms > 0.0 {
            return self.desired_speed_ms;
        }

        let r = &self.reference;
        let n = r.len();

        if n >= 2 {
            let length_m: f64 = (1..n)
                .map(|i| {
                    (Vector2::new(r.xs_m[i], r.ys_m[i]) - Vector2::new(r.xs_m[i - 1], r.ys_m[i - 1]))
                        .norm()
                })
                .sum();

            length_m / ((n - 1) as f64 * self.horizon_step_s)
        }
        else {
            (Vector2::new(r.xs_m[0], r.ys_m[0]) - Vector2::new(state.x_m, state.y_m)).norm()
                / self.horizon_step_s
        }
    }

    fn hold(&self, status: SolverStatus) -> ControlAction {
        ControlAction {
            accel_mps2: 0.0,
            steer_rad: self.steer_rad,
            status,
        }
    }
}

impl Controller for KinematicTracker {
    fn update_initial_condition(&mut self, x_m: f64, y_m: f64, psi_rad: f64, v_ms: f64) {
        self.initial = Some(VehicleState::new(x_m, y_m, psi_rad, v_ms));
    }

    fn update_reference(
        &mut self,
        xs_m: &[f64],
        ys_m: &[f64],
        psis_rad: &[f64],
        desired_speed_ms: f64,
    ) {
        self.reference = Trajectory {
            xs_m: xs_m.to_vec(),
            ys_m: ys_m.to_vec(),
            psis_rad: psis_rad.to_vec(),
        };
        self.desired_speed_ms = desired_speed_ms;
    }

    fn solve(&mut self) -> Result<ControlAction, CtrlError> {
        let state = self.initial.ok_or(CtrlError::NoInitialCondition)?;

        // Ragged arrays also report zero length
        let n = self.reference.len();
        if n == 0 {
            return Ok(self.hold(SolverStatus::Infeasible));
        }

        let i = self.params.lookahead_index.min(n - 1);
        let psi_ref = self.reference.psis_rad[i];

        // Lateral error is positive when the vehicle is left of the reference
        let target = Vector2::new(self.reference.xs_m[i], self.reference.ys_m[i]);
        let position = Vector2::new(state.x_m, state.y_m);
        let normal = Vector2::new(-psi_ref.sin(), psi_ref.cos());
        let lat_err_m = normal.dot(&(position - target));

        // Heading error is positive when the reference is to the left of the vehicle
        let head_err_rad = wrap_to_pi(psi_ref - state.psi_rad);

        let steer_dem_rad = self.head_ctrl.get(head_err_rad, self.ctrl_period_s)
            - self.lat_ctrl.get(lat_err_m, self.ctrl_period_s);

        let speed_ref_ms = self.reference_speed(&state);
        let accel_dem_mps2 = self.params.speed_k_p * (speed_ref_ms - state.v_ms);

        trace!(
            "lat_err = {:.3} m, head_err = {:.3} rad, speed_ref = {:.3} m/s",
            lat_err_m,
            head_err_rad,
            speed_ref_ms
        );

        if !(steer_dem_rad.is_finite() && accel_dem_mps2.is_finite()) {
            return Ok(self.hold(SolverStatus::Error));
        }

        let accel_mps2 =
            accel_dem_mps2.clamp(self.params.min_accel_mps2, self.params.max_accel_mps2);

        let max_delta_rad = self.params.max_steer_rate_rads * self.ctrl_period_s;
        let steer_rad = steer_dem_rad
            .clamp(-self.params.max_steer_rad, self.params.max_steer_rad)
            .clamp(self.steer_rad - max_delta_rad, self.steer_rad + max_delta_rad);

        let status = if accel_mps2 != accel_dem_mps2 || steer_rad != steer_dem_rad {
            SolverStatus::Suboptimal
        }
        else {
            SolverStatus::Optimal
        };

        Ok(ControlAction {
            accel_mps2,
            steer_rad,
            status,
        })
    }

    fn update_current_input(&mut self, steer_rad: f64, accel_mps2: f64) {
        self.steer_rad = steer_rad;
        self.accel_mps2 = accel_mps2;
    }

    fn predicted_trajectory(&self) -> Trajectory {
        let mut state = match self.initial {
            Some(s) => s,
            None => return Trajectory::default(),
        };

        let n = self.reference.len();
        let dt = self.horizon_step_s;
        let lf = self.params.lf_m;
        let lr = self.params.lr_m;

        let beta = (lr / (lf + lr) * self.steer_rad.tan()).atan();

        let mut traj = Trajectory::with_capacity(n);

        for _ in 0..n {
            state.x_m += state.v_ms * (state.psi_rad + beta).cos() * dt;
            state.y_m += state.v_ms * (state.psi_rad + beta).sin() * dt;
            state.psi_rad += state.v_ms / lr * beta.sin() * dt;
            state.v_ms = (state.v_ms + self.accel_mps2 * dt).max(0.0);

            traj.push(state.x_m, state.y_m, state.psi_rad);
        }

        traj
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> Params {
        Params {
            lat_k_p: 0.5,
            lat_k_i: 0.0,
            lat_k_d: 0.0,
            head_k_p: 1.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            speed_k_p: 1.0,
            lookahead_index: 3,
            min_accel_mps2: -3.0,
            max_accel_mps2: 2.0,
            max_steer_rad: 0.5,
            max_steer_rate_rads: 1.0,
            lf_m: 1.5213,
            lr_m: 1.4987,
        }
    }

    /// Tracker with a reference along the x axis at 2 m/s, starting one step ahead of the origin.
    fn tracker() -> KinematicTracker {
        let mut t = KinematicTracker::new(params(), 0.1, 0.2).unwrap();
        let xs: Vec<f64> = (1..=8).map(|k| 0.4 * k as f64).collect();
        t.update_reference(&xs, &[0.0; 8], &[0.0; 8], 0.0);
        t
    }

    #[test]
    fn test_on_path() {
        let mut t = tracker();
        t.update_initial_condition(0.0, 0.0, 0.0, 2.0);

        let action = t.solve().unwrap();
        assert_eq!(action.status, SolverStatus::Optimal);
        assert!(action.accel_mps2.abs() < 1e-9);
        assert!(action.steer_rad.abs() < 1e-9);
    }

    #[test]
    fn test_steers_back_to_path() {
        // Left of the path, steer right and hit the rate limit
        let mut t = tracker();
        t.update_initial_condition(0.0, 1.0, 0.0, 2.0);
        let action = t.solve().unwrap();
        assert!(action.steer_rad < 0.0);
        assert!((action.steer_rad + 0.1).abs() < 1e-9);
        assert_eq!(action.status, SolverStatus::Suboptimal);

        // Pointing right of the path, steer left
        let mut t = tracker();
        t.update_initial_condition(0.0, 0.0, -0.05, 2.0);
        let action = t.solve().unwrap();
        assert!((action.steer_rad - 0.05).abs() < 1e-9);
        assert_eq!(action.status, SolverStatus::Optimal);
    }

    #[test]
    fn test_desired_speed_and_limits() {
        let mut t = tracker();
        t.update_initial_condition(0.0, 0.0, 0.0, 0.0);
        t.update_reference(&[0.4, 0.8], &[0.0, 0.0], &[0.0, 0.0], 10.0);

        let action = t.solve().unwrap();
        assert_eq!(action.accel_mps2, 2.0);
        assert_eq!(action.status, SolverStatus::Suboptimal);
    }

    #[test]
    fn test_infeasible_and_misuse() {
        let mut t = KinematicTracker::new(params(), 0.1, 0.2).unwrap();
        assert!(matches!(t.solve(), Err(CtrlError::NoInitialCondition)));

        t.update_initial_condition(0.0, 0.0, 0.0, 1.0);
        t.update_reference(&[1.0, 2.0], &[0.0], &[0.0, 0.0], 0.0);
        assert_eq!(t.solve().unwrap().status, SolverStatus::Infeasible);

        assert!(KinematicTracker::new(params(), 0.0, 0.2).is_err());
        assert!(KinematicTracker::new(
            Params {
                max_accel_mps2: -1.0,
                ..params()
            },
            0.1,
            0.2
        )
        .is_err());
    }

    #[test]
    fn test_predicted_trajectory() {
        let mut t = tracker();
        assert!(t.predicted_trajectory().is_empty());

        // Braking to a halt, the vehicle never reverses
        t.update_initial_condition(0.0, 0.0, 0.0, 1.0);
        t.update_current_input(0.0, -3.0);
        let p = t.predicted_trajectory();
        assert_eq!(p.len(), 8);
        assert!((p.xs_m[0] - 0.2).abs() < 1e-9);
        assert!((p.xs_m[1] - 0.28).abs() < 1e-9);
        assert_eq!(p.xs_m[1], p.xs_m[7]);
        assert!(p.ys_m.iter().all(|&y| y == 0.0));

        // Steering left curves left
        t.update_current_input(0.2, 0.0);
        let p = t.predicted_trajectory();
        assert!(p.ys_m[7] > 0.0);
        assert!(p.psis_rad[7] > p.psis_rad[0]);
    }
}

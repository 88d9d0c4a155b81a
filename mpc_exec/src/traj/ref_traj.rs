//! # Reference trajectory
//!
//! A recorded path loaded from a CSV waypoint file with the columns `t_s, x_m, y_m, psi_rad`.
//! Horizons are produced by interpolating the path either in time or in distance travelled.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::Deserialize;
use std::{path::Path, time::Instant};

use super::{Horizon, Params, TrajError, TrajOracle, Trajectory};
use crate::vehicle::VehicleState;
use util::maths::{closest_point, cumulative_distance, interp, unwrap_near, unwrap_sequence};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A recorded reference path.
#[derive(Debug, Clone)]
pub struct RefTrajectory {
    params: Params,

    ts_s: Vec<f64>,
    xs_m: Vec<f64>,
    ys_m: Vec<f64>,

    /// Headings, unwrapped so that there are no jumps between neighbours
    psis_rad: Vec<f64>,

    /// Distance along the path of each waypoint
    dists_m: Vec<f64>,

    /// Instant of the first time-tracking query, the path's first timestamp maps onto this
    time_origin: Option<Instant>,
}

/// A row of the waypoint file.
#[derive(Debug, Deserialize)]
struct WaypointRecord {
    t_s: f64,
    x_m: f64,
    y_m: f64,
    psi_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RefTrajectory {
    /// Load a reference trajectory from a CSV waypoint file.
    pub fn load<P: AsRef<Path>>(path: P, params: Params) -> Result<Self, TrajError> {
        let path = path.as_ref();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| TrajError::WaypointLoadError(path.to_path_buf(), e))?;

        let mut ts_s = Vec::new();
        let mut xs_m = Vec::new();
        let mut ys_m = Vec::new();
        let mut psis_rad = Vec::new();

        for record in reader.deserialize() {
            let wp: WaypointRecord =
                record.map_err(|e| TrajError::WaypointLoadError(path.to_path_buf(), e))?;

            ts_s.push(wp.t_s);
            xs_m.push(wp.x_m);
            ys_m.push(wp.y_m);
            psis_rad.push(wp.psi_rad);
        }

        debug!("Loaded {} waypoints from {:?}", ts_s.len(), path);

        Self::from_waypoints(ts_s, xs_m, ys_m, psis_rad, params)
    }

    /// Build a reference trajectory from waypoint arrays.
    pub fn from_waypoints(
        ts_s: Vec<f64>,
        xs_m: Vec<f64>,
        ys_m: Vec<f64>,
        mut psis_rad: Vec<f64>,
        params: Params,
    ) -> Result<Self, TrajError> {
        params.validate()?;

        if ts_s.is_empty() {
            return Err(TrajError::NoWaypoints);
        }
        if ts_s.len() != xs_m.len() || xs_m.len() != ys_m.len() || ys_m.len() != psis_rad.len() {
            return Err(TrajError::LengthMismatch);
        }

        for i in 0..ts_s.len() {
            if !(ts_s[i].is_finite()
                && xs_m[i].is_finite()
                && ys_m[i].is_finite()
                && psis_rad[i].is_finite())
            {
                return Err(TrajError::NonFiniteWaypoint(i));
            }
            if i > 0 && ts_s[i] <= ts_s[i - 1] {
                return Err(TrajError::NonIncreasingTime {
                    prev: ts_s[i - 1],
                    next: ts_s[i],
                });
            }
        }

        unwrap_sequence(&mut psis_rad);
        let dists_m = cumulative_distance(&xs_m, &ys_m);

        Ok(Self {
            params,
            ts_s,
            xs_m,
            ys_m,
            psis_rad,
            dists_m,
            time_origin: None,
        })
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.ts_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ts_s.is_empty()
    }

    /// The waypoints, with headings unwrapped.
    pub fn waypoints(&self) -> Trajectory {
        Trajectory {
            xs_m: self.xs_m.clone(),
            ys_m: self.ys_m.clone(),
            psis_rad: self.psis_rad.clone(),
        }
    }

    /// Total length of the path.
    pub fn path_length_m(&self) -> f64 {
        *self.dists_m.last().unwrap_or(&0.0)
    }

    /// Time between the first and last waypoints.
    pub fn duration_s(&self) -> f64 {
        self.ts_s[self.ts_s.len() - 1] - self.ts_s[0]
    }

    /// Horizon starting at the given path time, used by time tracking.
    pub fn horizon_at_time(&self, state: &VehicleState, t0_s: f64) -> Horizon {
        let dt = self.params.horizon_step_s;
        let t_end = self.ts_s[self.ts_s.len() - 1];

        let times: Vec<f64> = (1..=self.params.horizon_len)
            .map(|k| t0_s + dt * k as f64)
            .collect();

        let past_end = times.last().map_or(false, |&t| t > t_end);
        let off_path = self.off_path(state);

        Horizon {
            path: self.sample(state, &times, &self.ts_s),
            stop: past_end || off_path,
        }
    }

    /// Horizon ahead of the closest waypoint, used by speed tracking.
    pub fn horizon_at_speed(&self, state: &VehicleState, speed_ms: f64) -> Horizon {
        let dt = self.params.horizon_step_s;
        let (closest, _) = self.closest(state);

        // Without a desired speed follow the path's own timing from the closest waypoint
        let (queries, xp, end): (Vec<f64>, &[f64], f64) = if speed_ms > 0.0 {
            let s0 = self.dists_m[closest];
            (
                (1..=self.params.horizon_len)
                    .map(|k| s0 + speed_ms * dt * k as f64)
                    .collect(),
                self.dists_m.as_slice(),
                self.path_length_m(),
            )
        }
        else {
            let t0 = self.ts_s[closest];
            (
                (1..=self.params.horizon_len)
                    .map(|k| t0 + dt * k as f64)
                    .collect(),
                self.ts_s.as_slice(),
                self.ts_s[self.ts_s.len() - 1],
            )
        };

        let past_end = queries.last().map_or(false, |&q| q > end);
        let off_path = self.off_path(state);

        Horizon {
            path: self.sample(state, &queries, xp),
            stop: past_end || off_path,
        }
    }

    /// Closest waypoint to the vehicle and its distance.
    fn closest(&self, state: &VehicleState) -> (usize, f64) {
        // Construction guarantees at least one waypoint
        closest_point(&self.xs_m, &self.ys_m, state.x_m, state.y_m).unwrap_or((0, 0.0))
    }

    fn off_path(&self, state: &VehicleState) -> bool {
        let (_, dist_m) = self.closest(state);

        if dist_m > self.params.max_offpath_m {
            debug!(
                "Vehicle is {:.2} m from the path, limit is {:.2} m",
                dist_m, self.params.max_offpath_m
            );
            true
        }
        else {
            false
        }
    }

    /// Interpolate the path at each query along the given abscissa (times or distances).
    fn sample(&self, state: &VehicleState, queries: &[f64], xp: &[f64]) -> Trajectory {
        let mut traj = Trajectory::with_capacity(queries.len());

        for &q in queries {
            let x = interp(q, xp, &self.xs_m).unwrap_or(state.x_m);
            let y = interp(q, xp, &self.ys_m).unwrap_or(state.y_m);
            let psi = interp(q, xp, &self.psis_rad).unwrap_or(state.psi_rad);

            traj.push(x, y, unwrap_near(psi, state.psi_rad));
        }

        traj
    }
}

impl TrajOracle for RefTrajectory {
    fn waypoints_by_time(&mut self, state: &VehicleState) -> Result<Horizon, TrajError> {
        let origin = *self.time_origin.get_or_insert_with(Instant::now);
        let t0_s = self.ts_s[0] + origin.elapsed().as_secs_f64();

        Ok(self.horizon_at_time(state, t0_s))
    }

    fn waypoints_by_speed(
        &mut self,
        state: &VehicleState,
        desired_speed_ms: f64,
    ) -> Result<Horizon, TrajError> {
        Ok(self.horizon_at_speed(state, desired_speed_ms))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    /// Straight path along x at 1 m/s, one waypoint per second from 0 to 10 s.
    fn straight() -> RefTrajectory {
        let ts: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        RefTrajectory::from_waypoints(
            ts.clone(),
            ts.clone(),
            vec![0.0; 11],
            vec![0.0; 11],
            Params::default(),
        )
        .unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_horizon_at_speed() {
        let traj = straight();
        assert_close(traj.path_length_m(), 10.0);
        assert_close(traj.duration_s(), 10.0);

        let state = VehicleState::new(3.0, 0.5, 0.0, 2.0);
        let h = traj.horizon_at_speed(&state, 2.0);

        assert!(!h.stop);
        assert_eq!(h.path.len(), 8);
        assert_close(h.path.xs_m[0], 3.4);
        assert_close(h.path.xs_m[7], 6.2);
        assert!(h.path.ys_m.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_horizon_path_implied_speed() {
        let traj = straight();
        let state = VehicleState::new(3.0, 0.0, 0.0, 0.0);

        // Path timing is 1 m/s so points are 0.2 m apart
        let h = traj.horizon_at_speed(&state, 0.0);
        assert!(!h.stop);
        assert_close(h.path.xs_m[0], 3.2);
        assert_close(h.path.xs_m[7], 4.6);
    }

    #[test]
    fn test_stop_conditions() {
        let traj = straight();

        // Horizon runs off the end of the path
        let near_end = VehicleState::new(9.0, 0.0, 0.0, 2.0);
        let h = traj.horizon_at_speed(&near_end, 2.0);
        assert!(h.stop);
        assert_close(*h.path.xs_m.last().unwrap(), 10.0);

        // Too far from the path
        let off = VehicleState::new(5.0, 20.0, 0.0, 2.0);
        assert!(traj.horizon_at_speed(&off, 2.0).stop);

        assert!(traj.horizon_at_time(&near_end, 9.0).stop);
        assert!(!traj.horizon_at_time(&near_end, 1.0).stop);
    }

    #[test]
    fn test_horizon_at_time() {
        let traj = straight();
        let state = VehicleState::new(0.0, 0.0, 0.0, 0.0);

        let h = traj.horizon_at_time(&state, 2.0);
        assert_close(h.path.xs_m[0], 2.2);
        assert_close(h.path.xs_m[7], 3.6);
    }

    #[test]
    fn test_time_cursor_starts_on_first_call() {
        let mut traj = straight();
        let state = VehicleState::new(0.0, 0.0, 0.0, 0.0);

        let h = traj.waypoints_by_time(&state).unwrap();
        assert!(!h.stop);
        assert!((h.path.xs_m[0] - 0.2).abs() < 0.05);
    }

    #[test]
    fn test_headings_near_vehicle() {
        // Heading west, recorded as +pi, with the vehicle reporting just over -pi
        let traj = RefTrajectory::from_waypoints(
            vec![0.0, 1.0, 2.0],
            vec![0.0, -1.0, -2.0],
            vec![0.0, 0.0, 0.0],
            vec![PI, PI, PI],
            Params::default(),
        )
        .unwrap();

        let state = VehicleState::new(0.0, 0.0, -PI + 0.1, 1.0);
        let h = traj.horizon_at_speed(&state, 1.0);

        for psi in h.path.psis_rad {
            assert!((psi - state.psi_rad).abs() <= PI);
            assert_close(psi, -PI);
        }
    }

    #[test]
    fn test_invalid_waypoints() {
        assert!(matches!(
            RefTrajectory::from_waypoints(vec![], vec![], vec![], vec![], Params::default()),
            Err(TrajError::NoWaypoints)
        ));
        assert!(matches!(
            RefTrajectory::from_waypoints(
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![0.0, 0.0],
                vec![0.0, 0.0],
                Params::default()
            ),
            Err(TrajError::NonIncreasingTime { .. })
        ));
        assert!(matches!(
            RefTrajectory::from_waypoints(
                vec![0.0],
                vec![0.0],
                vec![0.0],
                vec![0.0],
                Params {
                    horizon_len: 0,
                    ..Default::default()
                }
            ),
            Err(TrajError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_load_csv() {
        let path = std::env::temp_dir().join("mpc_ref_traj_test.csv");
        std::fs::write(
            &path,
            "t_s,x_m,y_m,psi_rad\n0.0,0.0,0.0,0.0\n1.0, 1.0, 0.0, 0.0\n2.0,2.0,0.0,0.0\n",
        )
        .unwrap();

        let traj = RefTrajectory::load(&path, Params::default()).unwrap();
        assert_eq!(traj.len(), 3);
        assert_close(traj.path_length_m(), 2.0);

        std::fs::write(&path, "t_s,x_m\n0.0,0.0\n").unwrap();
        assert!(matches!(
            RefTrajectory::load(&path, Params::default()),
            Err(TrajError::WaypointLoadError(_, _))
        ));

        std::fs::remove_file(&path).ok();
    }
}

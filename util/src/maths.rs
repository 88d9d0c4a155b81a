//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range [-pi, pi).
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau = pi + pi;

    rem_euclid(angle + pi, tau) - pi
}

/// Shift `angle` by a multiple of 2pi so that it lies within pi of `reference`.
///
/// Used to keep reference headings continuous with the vehicle heading, so that a controller
/// never sees an apparent error of nearly 2pi across the wrap point.
pub fn unwrap_near<T>(angle: T, reference: T) -> T
where
    T: Float
{
    reference + wrap_to_pi(angle - reference)
}

/// Unwrap a sequence of angles in place, removing jumps of more than pi between neighbours.
pub fn unwrap_sequence<T>(angles: &mut [T])
where
    T: Float
{
    for i in 1..angles.len() {
        angles[i] = unwrap_near(angles[i], angles[i - 1]);
    }
}

/// One dimensional piecewise linear interpolation.
///
/// `xp` must be increasing and the same length as `fp`. Queries outside the range of `xp` are
/// clamped to the first or last value of `fp`. Returns `None` if `xp` is empty or the lengths
/// differ.
pub fn interp<T>(x: T, xp: &[T], fp: &[T]) -> Option<T>
where
    T: Float
{
    if xp.is_empty() || xp.len() != fp.len() {
        return None;
    }

    let last = xp.len() - 1;

    if x <= xp[0] {
        return Some(fp[0]);
    }
    if x >= xp[last] {
        return Some(fp[last]);
    }

    // Index of the first sample strictly greater than x, guaranteed in 1..=last here
    let upper = xp.iter().position(|&v| v > x).unwrap_or(last);
    let lower = upper - 1;

    let span = xp[upper] - xp[lower];
    if span <= T::zero() {
        return Some(fp[upper]);
    }

    let frac = (x - xp[lower]) / span;
    Some(fp[lower] + frac * (fp[upper] - fp[lower]))
}

/// Cumulative distance along a polyline, starting at zero for the first point.
pub fn cumulative_distance<T>(xs: &[T], ys: &[T]) -> Vec<T>
where
    T: Float
{
    let mut dists = Vec::with_capacity(xs.len());

    for i in 0..xs.len().min(ys.len()) {
        if i == 0 {
            dists.push(T::zero());
        }
        else {
            let step = ((xs[i] - xs[i - 1]).powi(2) + (ys[i] - ys[i - 1]).powi(2)).sqrt();
            dists.push(dists[i - 1] + step);
        }
    }

    dists
}

/// Find the point of a polyline closest to `(x, y)`, returning its index and distance.
///
/// Ties resolve to the earliest point. Returns `None` for an empty polyline.
pub fn closest_point<T>(xs: &[T], ys: &[T], x: T, y: T) -> Option<(usize, T)>
where
    T: Float
{
    xs.iter()
        .zip(ys.iter())
        .map(|(&px, &py)| ((px - x).powi(2) + (py - y).powi(2)).sqrt())
        .enumerate()
        .fold(None, |best: Option<(usize, T)>, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d))
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_to_pi() {
        assert!((wrap_to_pi(3.0 * PI / 2.0) - (-PI / 2.0)).abs() < 1e-12);
        assert!((wrap_to_pi(-3.0 * PI / 2.0) - (PI / 2.0)).abs() < 1e-12);
        assert!((wrap_to_pi(0.5f64) - 0.5).abs() < 1e-12);
        assert!((wrap_to_pi(PI) - (-PI)).abs() < 1e-12);
    }

    #[test]
    fn test_unwrap_near() {
        // A reference heading just past -pi next to a vehicle heading just below pi
        let vehicle = PI - 0.1;
        let reference = -PI + 0.1;
        let unwrapped = unwrap_near(reference, vehicle);
        assert!((unwrapped - (PI + 0.1)).abs() < 1e-12);

        let mut seq = vec![3.0, -3.0, -2.9];
        unwrap_sequence(&mut seq);
        assert!((seq[1] - (2.0 * PI - 3.0)).abs() < 1e-12);
        assert!((seq[2] - (2.0 * PI - 2.9)).abs() < 1e-12);
    }

    #[test]
    fn test_interp() {
        let xp = [0.0, 1.0, 3.0];
        let fp = [0.0, 10.0, 30.0];

        assert_eq!(interp(0.5, &xp, &fp), Some(5.0));
        assert_eq!(interp(2.0, &xp, &fp), Some(20.0));
        assert_eq!(interp(-1.0, &xp, &fp), Some(0.0));
        assert_eq!(interp(10.0, &xp, &fp), Some(30.0));
        assert_eq!(interp(1.0, &xp, &[1.0]), None);
    }

    #[test]
    fn test_cumulative_distance() {
        let d = cumulative_distance(&[0.0, 3.0, 3.0], &[0.0, 4.0, 5.0]);
        assert_eq!(d, vec![0.0, 5.0, 6.0]);
    }

    #[test]
    fn test_closest_point() {
        let xs = [0.0, 1.0, 2.0, 1.0];
        let ys = [0.0, 0.0, 0.0, 0.0];

        assert_eq!(closest_point(&xs, &ys, 1.2, 3.0).map(|(i, _)| i), Some(1));
        assert_eq!(closest_point(&xs, &ys, 5.0, 0.0), Some((2, 3.0)));
        assert_eq!(closest_point::<f64>(&[], &[], 0.0, 0.0), None);
    }
}

//! Pure, synchronous math over a `Snapshot`. Nothing in this module
//! performs I/O or suspends; every function is referentially transparent,
//! as the specification requires.

use crate::model::{StateVector, Velocity};

/// `1 AU` in kilometers.
pub const AU_KM: f64 = 149_597_870.7;
/// Speed of light in km/s.
pub const C_KM_S: f64 = 299_792.458;
/// `1 mile` in kilometers.
pub const KM_PER_MILE: f64 = 1.609_344;

/// Euclidean norm of a 3D vector.
///
/// # Arguments
/// * `x` - First component
/// * `y` - Second component
/// * `z` - Third component
///
/// # Returns
/// `Some(magnitude)`, or `None` if any component is non-finite.
pub fn magnitude(x: f64, y: f64, z: f64) -> Option<f64> {
    if !x.is_finite() || !y.is_finite() || !z.is_finite() {
        return None;
    }
    Some((x * x + y * y + z * z).sqrt())
}

/// Magnitude of the difference between two position vectors.
///
/// # Arguments
/// * `a` - First position `(x, y, z)`
/// * `b` - Second position `(x, y, z)`
///
/// # Returns
/// `Some(distance)` between `a` and `b`, or `None` if either side is non-finite.
pub fn delta_magnitude(a: (f64, f64, f64), b: (f64, f64, f64)) -> Option<f64> {
    magnitude(a.0 - b.0, a.1 - b.1, a.2 - b.2)
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightTime {
    pub one_way_seconds: f64,
    pub one_way_minutes: f64,
    pub two_way_minutes: f64,
}

/// One-way and round-trip light travel time for a given distance.
///
/// # Arguments
/// * `distance_km` - Distance in kilometers
///
/// # Returns
/// `LightTime` with one-way seconds/minutes and two-way minutes.
pub fn light_time(distance_km: f64) -> LightTime {
    let one_way_seconds = distance_km / C_KM_S;
    let one_way_minutes = one_way_seconds / 60.0;
    LightTime {
        one_way_seconds,
        one_way_minutes,
        two_way_minutes: one_way_minutes * 2.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Ecliptic {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

/// Ecliptic latitude/longitude of a position vector.
///
/// # Arguments
/// * `x` - First component
/// * `y` - Second component
/// * `z` - Third component
///
/// # Returns
/// `Some(Ecliptic)` with `lon_deg` normalized to `[0, 360)`, or `None` if
/// the vector is non-finite.
pub fn ecliptic(x: f64, y: f64, z: f64) -> Option<Ecliptic> {
    let r = magnitude(x, y, z)?;
    if r == 0.0 {
        return Some(Ecliptic {
            lat_deg: 0.0,
            lon_deg: 0.0,
        });
    }
    let lat_deg = (z / r).asin().to_degrees();
    let mut lon_deg = y.atan2(x).to_degrees();
    if lon_deg < 0.0 {
        lon_deg += 360.0;
    }
    Some(Ecliptic { lat_deg, lon_deg })
}

/// Linear drift of a state vector's position over a time offset.
///
/// # Arguments
/// * `sv` - State vector to extrapolate from
/// * `delta_days` - Time offset in days, may be negative
///
/// # Returns
/// `Some((x, y, z))` extrapolated as `p + v * delta_days`, or `None` if `sv`
/// carries no velocity. Callers without a velocity must fall back to an
/// orbital approximation of their own; this function never fabricates one.
pub fn drift_position(sv: &StateVector, delta_days: f64) -> Option<(f64, f64, f64)> {
    let v: Velocity = sv.velocity?;
    Some((
        sv.x + v.vx * delta_days,
        sv.y + v.vy * delta_days,
        sv.z + v.vz * delta_days,
    ))
}

/// Convert astronomical units to kilometers.
///
/// # Arguments
/// * `au` - Distance in astronomical units
///
/// # Returns
/// Distance in kilometers
pub fn au_to_km(au: f64) -> f64 {
    au * AU_KM
}

/// Convert kilometers to miles.
///
/// # Arguments
/// * `km` - Distance in kilometers
///
/// # Returns
/// Distance in miles
pub fn km_to_miles(km: f64) -> f64 {
    km / KM_PER_MILE
}

/// Convert astronomical units to miles.
///
/// # Arguments
/// * `au` - Distance in astronomical units
///
/// # Returns
/// Distance in miles
pub fn au_to_miles(au: f64) -> f64 {
    km_to_miles(au_to_km(au))
}

/// Convert a speed in AU/day to km/s.
///
/// # Arguments
/// * `speed_au_per_day` - Speed in astronomical units per day
///
/// # Returns
/// Speed in kilometers per second
pub fn speed_au_per_day_to_km_per_s(speed_au_per_day: f64) -> f64 {
    au_to_km(speed_au_per_day) / 86_400.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BodyId;
    use chrono::Utc;

    #[test]
    fn magnitude_of_3_4_0_is_5() {
        assert_eq!(magnitude(3.0, 4.0, 0.0), Some(5.0));
    }

    #[test]
    fn magnitude_propagates_non_finite_to_none() {
        assert_eq!(magnitude(f64::NAN, 0.0, 0.0), None);
        assert_eq!(magnitude(f64::INFINITY, 0.0, 0.0), None);
    }

    #[test]
    fn delta_magnitude_between_voyager_and_earth() {
        let d = delta_magnitude((100.0, 0.0, 0.0), (1.0, 0.0, 0.0)).unwrap();
        assert!((d - 99.0).abs() < 1e-9);
    }

    #[test]
    fn light_time_matches_one_au_roughly_8_minutes() {
        let lt = light_time(AU_KM);
        assert!((lt.one_way_minutes - 8.3167).abs() < 0.01);
        assert!((lt.two_way_minutes - 2.0 * lt.one_way_minutes).abs() < 1e-9);
    }

    #[test]
    fn ecliptic_of_x_axis_point_is_zero_lat_zero_lon() {
        let e = ecliptic(1.0, 0.0, 0.0).unwrap();
        assert!(e.lat_deg.abs() < 1e-9);
        assert!(e.lon_deg.abs() < 1e-9);
    }

    #[test]
    fn ecliptic_longitude_normalized_non_negative() {
        let e = ecliptic(-1.0, -1.0, 0.0).unwrap();
        assert!(e.lon_deg >= 0.0 && e.lon_deg < 360.0);
    }

    #[test]
    fn drift_without_velocity_is_none() {
        let sv = StateVector::new(
            BodyId::Mars,
            1.0,
            0.0,
            0.0,
            None,
            "J2000-ECLIPTIC",
            "test",
            Utc::now(),
        )
        .unwrap();
        assert!(drift_position(&sv, 1.0).is_none());
    }

    #[test]
    fn drift_with_velocity_extrapolates_linearly() {
        let sv = StateVector::new(
            BodyId::Mars,
            1.0,
            2.0,
            3.0,
            Some(Velocity {
                vx: 0.1,
                vy: 0.2,
                vz: 0.3,
            }),
            "J2000-ECLIPTIC",
            "test",
            Utc::now(),
        )
        .unwrap();
        let (x, y, z) = drift_position(&sv, 2.0).unwrap();
        assert!((x - 1.2).abs() < 1e-9);
        assert!((y - 2.4).abs() < 1e-9);
        assert!((z - 3.6).abs() < 1e-9);
    }
}

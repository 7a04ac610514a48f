//! Synthetic sky and observations
use crate::prelude::{Constellation, DesignRow, Duration, Epoch, SatelliteObservation, SV};

/// Nominal sampling period of the synthetic time series
pub const SAMPLING_PERIOD_S: f64 = 30.0;

/// GPS sky: PRN, elevation and azimuth (degrees)
pub const GPS_SKY: [(u8, f64, f64); 6] = [
    (1, 75.0, 10.0),
    (3, 40.0, 45.0),
    (6, 25.0, 130.0),
    (11, 55.0, 200.0),
    (17, 20.0, 270.0),
    (22, 35.0, 320.0),
];

/// Mixed sky: constellation, PRN, elevation and azimuth (degrees)
pub const MIXED_SKY: [(Constellation, u8, f64, f64); 12] = [
    (Constellation::GPS, 1, 75.0, 10.0),
    (Constellation::GPS, 3, 40.0, 45.0),
    (Constellation::GPS, 6, 25.0, 130.0),
    (Constellation::GPS, 11, 55.0, 200.0),
    (Constellation::GPS, 17, 20.0, 270.0),
    (Constellation::Glonass, 2, 60.0, 80.0),
    (Constellation::Glonass, 9, 30.0, 170.0),
    (Constellation::Galileo, 5, 45.0, 300.0),
    (Constellation::Galileo, 12, 65.0, 230.0),
    (Constellation::Galileo, 24, 15.0, 100.0),
    (Constellation::BeiDou, 7, 50.0, 20.0),
    (Constellation::SBAS, 23, 35.0, 180.0),
];

/// First epoch of every synthetic time series
pub fn t0() -> Epoch {
    Epoch::from_gpst_seconds(1.0E9)
}

/// Epoch #i of the nominal time series
pub fn epoch(i: usize) -> Epoch {
    t0() + Duration::from_seconds(SAMPLING_PERIOD_S * i as f64)
}

/// Local frame (north, east, up) design partials
/// of a satellite seen at this elevation and azimuth.
pub fn design(elevation_deg: f64, azimuth_deg: f64) -> DesignRow {
    let (el, az) = (elevation_deg.to_radians(), azimuth_deg.to_radians());
    DesignRow::new(
        [-el.cos() * az.cos(), -el.cos() * az.sin(), -el.sin()],
        1.0 / el.sin(),
    )
}

/// Prefit residual caused by this coordinates offset (m)
pub fn offset_residual(design: &DesignRow, offset_m: (f64, f64, f64)) -> f64 {
    design.position[0] * offset_m.0
        + design.position[1] * offset_m.1
        + design.position[2] * offset_m.2
}

/// Noise free GPS observations, for a receiver located
/// at this offset (m) of the a priori position.
pub fn gps_observations(offset_m: (f64, f64, f64)) -> Vec<SatelliteObservation> {
    GPS_SKY
        .iter()
        .map(|(prn, elevation, azimuth)| {
            let sv = SV::new(Constellation::GPS, *prn);
            let design = design(*elevation, *azimuth);
            let residual = offset_residual(&design, offset_m);
            SatelliteObservation::new(sv, residual, residual, design)
        })
        .collect()
}

/// Noise free observations of the whole [MIXED_SKY]
pub fn mixed_observations() -> Vec<SatelliteObservation> {
    MIXED_SKY
        .iter()
        .map(|(constellation, prn, elevation, azimuth)| {
            let sv = SV::new(*constellation, *prn);
            SatelliteObservation::new(sv, 0.0, 0.0, design(*elevation, *azimuth))
        })
        .collect()
}

/// Returns GPS [SV] of given PRN
pub fn gps(prn: u8) -> SV {
    SV::new(Constellation::GPS, prn)
}

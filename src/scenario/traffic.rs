//! Random background traffic.

use rand::Rng;
use rand_distr::{Distribution, Exp};

use super::config::{BackgroundTrafficConfig, TransmissionConfig};
use crate::phy::WifiPreamble;

/// Expand `traffic` into concrete interfering transmissions.
///
/// Arrivals form a Poisson process starting at time zero; each frame is sent
/// from a distance drawn uniformly from the configured range.
pub fn generate_background<R: Rng + ?Sized>(traffic: &BackgroundTrafficConfig, rng: &mut R) -> Vec<TransmissionConfig> {
    let inter_arrival = match Exp::new(1.0 / traffic.mean_interval_us) {
        Ok(distribution) => distribution,
        Err(e) => {
            log::warn!("Background traffic disabled, bad mean interval {}: {}", traffic.mean_interval_us, e);
            return Vec::new();
        }
    };

    let mut clock_us = 0.0;
    let mut transmissions = Vec::with_capacity(traffic.count);
    for index in 0..traffic.count {
        clock_us += inter_arrival.sample(rng);
        let distance_m = if traffic.max_distance_m > traffic.min_distance_m {
            rng.gen_range(traffic.min_distance_m..traffic.max_distance_m)
        } else {
            traffic.min_distance_m
        };
        transmissions.push(TransmissionConfig {
            label: format!("background-{index}"),
            start_us: clock_us.round() as u64,
            duration_us: traffic.duration_us,
            size: 0,
            mode: traffic.mode.clone(),
            preamble: WifiPreamble::Long,
            nss: 1,
            tx_power_dbm: traffic.tx_power_dbm,
            distance_m,
            receive: false,
        });
    }
    log::debug!("Generated {} background frames over {:.0}us", transmissions.len(), clock_us);
    transmissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn traffic() -> BackgroundTrafficConfig {
        BackgroundTrafficConfig {
            count: 50,
            mean_interval_us: 100.0,
            duration_us: 40,
            mode: "OfdmRate6Mbps".to_string(),
            tx_power_dbm: 10.0,
            min_distance_m: 5.0,
            max_distance_m: 25.0,
        }
    }

    #[test]
    fn frames_arrive_in_order_within_distance_range() {
        let frames = generate_background(&traffic(), &mut StdRng::seed_from_u64(3));
        assert_eq!(frames.len(), 50);
        assert!(frames.windows(2).all(|pair| pair[0].start_us <= pair[1].start_us));
        assert!(frames.iter().all(|f| (5.0..25.0).contains(&f.distance_m)));
        assert!(frames.iter().all(|f| !f.receive && f.duration_us == 40));
    }

    #[test]
    fn same_seed_same_traffic() {
        let a = generate_background(&traffic(), &mut StdRng::seed_from_u64(17));
        let b = generate_background(&traffic(), &mut StdRng::seed_from_u64(17));
        let starts = |frames: &[TransmissionConfig]| frames.iter().map(|f| (f.start_us, f.distance_m)).collect::<Vec<_>>();
        assert_eq!(starts(&a), starts(&b));
    }

    #[test]
    fn fixed_distance_when_range_is_empty() {
        let config = BackgroundTrafficConfig {
            min_distance_m: 12.0,
            max_distance_m: 12.0,
            ..traffic()
        };
        let frames = generate_background(&config, &mut StdRng::seed_from_u64(1));
        assert!(frames.iter().all(|f| f.distance_m == 12.0));
    }
}

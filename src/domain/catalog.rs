use crate::domain::models::Station;

struct StationSeed {
    id: &'static str,
    name: &'static str,
    location: &'static str,
    available: bool,
    rate_kwh: f64,
    rate_crypto: f64,
    power_kw: u32,
    lat: f64,
    lng: f64,
}

const SEEDS: &[StationSeed] = &[
    StationSeed {
        id: "station-001",
        name: "ChargeX Indiranagar",
        location: "100 Feet Rd, Indiranagar, Bangalore",
        available: true,
        rate_kwh: 20.5,
        rate_crypto: 0.25,
        power_kw: 150,
        lat: 12.9784,
        lng: 77.6408,
    },
    StationSeed {
        id: "station-002",
        name: "ChargeX Whitefield Hub",
        location: "ITPL Main Rd, Whitefield, Bangalore",
        available: true,
        rate_kwh: 22.0,
        rate_crypto: 0.27,
        power_kw: 120,
        lat: 12.9697,
        lng: 77.7499,
    },
    StationSeed {
        id: "station-003",
        name: "ChargeX Electronic City",
        location: "Phase 1, Electronic City, Bangalore",
        available: false,
        rate_kwh: 19.5,
        rate_crypto: 0.24,
        power_kw: 50,
        lat: 12.8458,
        lng: 77.6663,
    },
    StationSeed {
        id: "station-004",
        name: "ChargeX Koramangala",
        location: "80 Feet Rd, 4th Block, Koramangala, Bangalore",
        available: true,
        rate_kwh: 21.0,
        rate_crypto: 0.26,
        power_kw: 100,
        lat: 12.9338,
        lng: 77.6341,
    },
    StationSeed {
        id: "station-005",
        name: "ChargeX MG Road",
        location: "MG Road, Central Bangalore",
        available: true,
        rate_kwh: 23.5,
        rate_crypto: 0.29,
        power_kw: 200,
        lat: 12.9758,
        lng: 77.6096,
    },
    StationSeed {
        id: "station-006",
        name: "ChargeX Hebbal",
        location: "Bellary Road, Hebbal, Bangalore",
        available: true,
        rate_kwh: 21.5,
        rate_crypto: 0.26,
        power_kw: 150,
        lat: 13.0365,
        lng: 77.5963,
    },
    StationSeed {
        id: "station-007",
        name: "ChargeX Jayanagar",
        location: "11th Main Rd, 4th Block, Jayanagar, Bangalore",
        available: true,
        rate_kwh: 20.0,
        rate_crypto: 0.24,
        power_kw: 100,
        lat: 12.9299,
        lng: 77.5933,
    },
];

pub fn default_stations() -> Vec<Station> {
    SEEDS
        .iter()
        .map(|seed| Station {
            id: seed.id.to_string(),
            name: seed.name.to_string(),
            location: seed.location.to_string(),
            available: seed.available,
            rate_kwh: seed.rate_kwh,
            rate_crypto: seed.rate_crypto,
            power_kw: seed.power_kw,
            lat: seed.lat,
            lng: seed.lng,
        })
        .collect()
}

/// Cheapest available station by crypto rate; ties keep catalog order.
pub fn cheapest_available(stations: &[Station]) -> Option<&Station> {
    stations
        .iter()
        .filter(|station| station.available)
        .min_by(|left, right| left.rate_crypto.total_cmp(&right.rate_crypto))
}

#[cfg(test)]
mod tests {
    use super::{cheapest_available, default_stations};

    #[test]
    fn catalog_has_unique_ids() {
        let stations = default_stations();
        let mut ids: Vec<&str> = stations.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), stations.len());
    }

    #[test]
    fn electronic_city_is_unavailable() {
        let stations = default_stations();
        let station = stations
            .iter()
            .find(|s| s.name == "ChargeX Electronic City")
            .expect("station should exist");
        assert!(!station.available);
    }

    #[test]
    fn cheapest_skips_unavailable_stations() {
        let stations = default_stations();
        let cheapest = cheapest_available(&stations).expect("some station is available");

        // Electronic City is cheaper at 0.24 but offline; Jayanagar ties and is available.
        assert_eq!(cheapest.id, "station-007");
    }

    #[test]
    fn cheapest_returns_none_when_everything_is_offline() {
        let mut stations = default_stations();
        for station in &mut stations {
            station.available = false;
        }
        assert!(cheapest_available(&stations).is_none());
    }
}

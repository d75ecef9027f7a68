//! Parent selection from surveyed beacons

use zcl_data::cluster_library::wwah::{BeaconSurvey, ParentClassification, ParentPriority};

/// RSSI margin above the minimum for the good link bucket, dB
pub const GOOD_RSSI_MARGIN: i16 = 30;

/// Priority of a beacon, beacons of devices without the classification are
/// treated as very low
pub fn priority(beacon: &BeaconSurvey, classification_enabled: bool) -> ParentPriority {
    if classification_enabled {
        beacon.classification.priority()
    } else {
        ParentClassification::empty().priority()
    }
}

/// Pick the best parent
///
/// Beacons below `minimum_rssi` are ignored. End devices prefer beacons at
/// least `GOOD_RSSI_MARGIN` above the minimum. Within a bucket the highest
/// priority wins and the RSSI breaks ties.
pub fn select_parent(
    beacons: &[BeaconSurvey],
    minimum_rssi: i8,
    end_device: bool,
    classification_enabled: bool,
) -> Option<BeaconSurvey> {
    let good = i16::from(minimum_rssi) + GOOD_RSSI_MARGIN;
    let rank = |beacon: &BeaconSurvey| {
        let in_good_bucket = end_device && i16::from(beacon.rssi) >= good;
        (
            in_good_bucket,
            priority(beacon, classification_enabled),
            beacon.rssi,
        )
    };
    beacons
        .iter()
        .filter(|b| b.rssi >= minimum_rssi)
        .max_by_key(|b| rank(*b))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_data::ShortAddress;

    fn beacon(address: u16, rssi: i8, classification: ParentClassification) -> BeaconSurvey {
        BeaconSurvey {
            device_short: ShortAddress::new(address),
            rssi,
            classification,
        }
    }

    #[test]
    fn priority_order() {
        let tc = ParentClassification::TC_CONNECTIVITY;
        let long = ParentClassification::LONG_UPTIME;
        assert!(
            priority(&beacon(1, 0, tc | long), true) > priority(&beacon(1, 0, tc), true)
        );
        assert!(priority(&beacon(1, 0, tc), true) > priority(&beacon(1, 0, long), true));
        assert!(
            priority(&beacon(1, 0, long), true)
                > priority(&beacon(1, 0, ParentClassification::empty()), true)
        );
        assert_eq!(priority(&beacon(1, 0, tc | long), false), ParentPriority::VeryLow);
    }

    #[test]
    fn end_device_prefers_good_link() {
        let beacons = [
            beacon(0x0001, -85, ParentClassification::all()),
            beacon(0x0002, -55, ParentClassification::empty()),
            beacon(0x0003, -95, ParentClassification::all()),
        ];
        let parent = select_parent(&beacons, -90, true, true).unwrap();
        assert_eq!(parent.device_short, ShortAddress::new(0x0002));
        let parent = select_parent(&beacons, -90, false, true).unwrap();
        assert_eq!(parent.device_short, ShortAddress::new(0x0001));
        let parent = select_parent(&beacons, -90, false, false).unwrap();
        assert_eq!(parent.device_short, ShortAddress::new(0x0002));
        assert_eq!(select_parent(&beacons[2..], -90, true, true), None);
    }
}

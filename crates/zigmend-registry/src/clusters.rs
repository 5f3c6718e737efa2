//! Static ZCL cluster referential
//!
//! Maps symbolic cluster names to their numeric ZCL identifiers. Both the
//! spec-era names ("onOff") and the legacy shorthand still found in older
//! registry entries ("genOnOff") are accepted. Unknown names have no
//! mapping; callers decide whether that is an error.

/// Name-to-id table. Kept sorted by id for readability.
const CLUSTERS: &[(&str, u16)] = &[
    ("basic", 0x0000),
    ("genBasic", 0x0000),
    ("powerConfiguration", 0x0001),
    ("genPowerCfg", 0x0001),
    ("identify", 0x0003),
    ("genIdentify", 0x0003),
    ("groups", 0x0004),
    ("genGroups", 0x0004),
    ("scenes", 0x0005),
    ("genScenes", 0x0005),
    ("onOff", 0x0006),
    ("genOnOff", 0x0006),
    ("levelControl", 0x0008),
    ("genLevelCtrl", 0x0008),
    ("otaUpgrade", 0x0019),
    ("genOta", 0x0019),
    ("colorControl", 0x0300),
    ("lightingColorCtrl", 0x0300),
    ("illuminanceMeasurement", 0x0400),
    ("msIlluminanceMeasurement", 0x0400),
    ("temperatureMeasurement", 0x0402),
    ("msTemperatureMeasurement", 0x0402),
    ("relativeHumidity", 0x0405),
    ("msRelativeHumidity", 0x0405),
    ("occupancySensing", 0x0406),
    ("msOccupancySensing", 0x0406),
    ("iasZone", 0x0500),
    ("ssIasZone", 0x0500),
    ("metering", 0x0702),
    ("seMetering", 0x0702),
    ("electricalMeasurement", 0x0B04),
    ("haElectricalMeasurement", 0x0B04),
    ("touchlink", 0x1000),
    ("tuya", 0xEF00),
    ("manuSpecificTuya", 0xEF00),
];

/// Resolve a symbolic cluster name to its numeric ZCL identifier.
pub fn cluster_id(name: &str) -> Option<u16> {
    CLUSTERS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

/// Resolve a numeric ZCL identifier to its canonical name.
pub fn cluster_name(id: u16) -> Option<&'static str> {
    // First entry per id is the canonical (non-legacy) name.
    CLUSTERS.iter().find(|(_, i)| *i == id).map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_and_legacy_names() {
        assert_eq!(cluster_id("onOff"), Some(6));
        assert_eq!(cluster_id("genOnOff"), Some(6));
        assert_eq!(cluster_id("msTemperatureMeasurement"), Some(1026));
        assert_eq!(cluster_id("seMetering"), Some(1794));
        assert_eq!(cluster_id("manuSpecificTuya"), Some(0xEF00));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(cluster_id("GENONOFF"), Some(6));
        assert_eq!(cluster_id("iaszone"), Some(0x0500));
    }

    #[test]
    fn test_unknown_name_has_no_mapping() {
        assert_eq!(cluster_id("notACluster"), None);
    }

    #[test]
    fn test_reverse_lookup_prefers_canonical_name() {
        assert_eq!(cluster_name(6), Some("onOff"));
        assert_eq!(cluster_name(0x0402), Some("temperatureMeasurement"));
        assert_eq!(cluster_name(0x4242), None);
    }
}

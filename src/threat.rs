// src/threat.rs
//
// Immediate-threat detector. Scans the whole history, never a window: a fire
// seen once keeps the camera in the immediate state for the rest of the
// session.

use crate::flow::FlowSnapshot;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreatReport {
    pub has_immediate_threat: bool,
    pub threat_types: BTreeSet<String>,
}

pub fn detect_immediate_threats(snapshots: &[FlowSnapshot]) -> ThreatReport {
    let mut report = ThreatReport::default();

    for snapshot in snapshots {
        let t = &snapshot.triggers;
        if !t.has_immediate_threat() {
            continue;
        }
        report.has_immediate_threat = true;

        if t.fire_detected {
            report.threat_types.insert("fire".to_string());
        }
        if t.smoke_detected {
            report.threat_types.insert("smoke".to_string());
        }
        if t.weapon_detected {
            report.threat_types.insert("weapons".to_string());
            report.threat_types.extend(t.weapon_types.iter().cloned());
        }
        if t.violence_detected {
            report.threat_types.insert("violence".to_string());
        }
        if t.emergency_evacuation {
            report.threat_types.insert("emergency_evacuation".to_string());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_history_has_no_threat() {
        let mut suspicious = FlowSnapshot::empty(1);
        suspicious.triggers.suspicious_behavior = true;
        let report = detect_immediate_threats(&[FlowSnapshot::empty(0), suspicious]);
        assert!(!report.has_immediate_threat);
        assert!(report.threat_types.is_empty());
    }

    #[test]
    fn test_threats_deduplicated_across_history() {
        let mut first = FlowSnapshot::empty(0);
        first.triggers.weapon_detected = true;
        first.triggers.weapon_types.insert("knife".to_string());
        let mut second = FlowSnapshot::empty(1);
        second.triggers.weapon_detected = true;
        second.triggers.weapon_types.insert("knife".to_string());
        second.triggers.weapon_types.insert("gun".to_string());
        second.triggers.smoke_detected = true;

        let report = detect_immediate_threats(&[first, FlowSnapshot::empty(2), second]);
        assert!(report.has_immediate_threat);
        let types: Vec<_> = report.threat_types.iter().map(String::as_str).collect();
        assert_eq!(types, vec!["gun", "knife", "smoke", "weapons"]);
    }

    #[test]
    fn test_old_threat_still_counts() {
        let mut snapshots: Vec<_> = (0..50).map(FlowSnapshot::empty).collect();
        snapshots[0].triggers.emergency_evacuation = true;
        let report = detect_immediate_threats(&snapshots);
        assert!(report.has_immediate_threat);
        assert!(report.threat_types.contains("emergency_evacuation"));
    }
}

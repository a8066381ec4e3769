//! Compliance reporting over the audit trail.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AuditRecord;

/// Aggregated view of audit activity for a reporting period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,

    pub total_actions: usize,
    pub successful_actions: usize,
    pub failed_actions: usize,
    /// 0.0 when the period is empty.
    pub success_rate: f64,

    pub actions_by_type: BTreeMap<String, usize>,
    pub actions_by_role: BTreeMap<String, usize>,

    pub generated_at: DateTime<Utc>,
}

/// Aggregate the records of one reporting period.
///
/// Pure: the caller fetches records via `AuditStore::in_range` and hands
/// them over. Records outside `[from, to]` are ignored defensively.
pub fn compliance_report(
    records: &[AuditRecord],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> ComplianceReport {
    let in_period: Vec<&AuditRecord> = records
        .iter()
        .filter(|r| r.timestamp >= from && r.timestamp <= to)
        .collect();

    let total_actions = in_period.len();
    let successful_actions = in_period.iter().filter(|r| r.entry.success).count();
    let failed_actions = total_actions - successful_actions;

    let mut actions_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut actions_by_role: BTreeMap<String, usize> = BTreeMap::new();
    for record in &in_period {
        *actions_by_type.entry(record.entry.action.clone()).or_default() += 1;
        *actions_by_role.entry(record.entry.actor.role.clone()).or_default() += 1;
    }

    ComplianceReport {
        from,
        to,
        total_actions,
        successful_actions,
        failed_actions,
        success_rate: if total_actions > 0 {
            successful_actions as f64 / total_actions as f64
        } else {
            0.0
        },
        actions_by_type,
        actions_by_role,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use entrylog_core::{Actor, AuditId, UserId};

    use crate::AuditLogEntry;

    fn record(minute: u32, role: &str, action: &str, success: bool) -> AuditRecord {
        let actor = Actor::new(UserId::new(), role, format!("{role}1"));
        let mut entry = AuditLogEntry::action(actor, action, "data_entry");
        if !success {
            entry = entry.failed("denied");
        }
        AuditRecord {
            audit_id: AuditId::new(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap(),
            entry,
        }
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn aggregates_totals_and_groupings() {
        let records = vec![
            record(1, "operator", "data.create", true),
            record(2, "operator", "data.submit", true),
            record(3, "supervisor", "data.confirm", true),
            record(4, "operator", "data.confirm", false),
        ];
        let (from, to) = window();

        let report = compliance_report(&records, from, to);

        assert_eq!(report.total_actions, 4);
        assert_eq!(report.successful_actions, 3);
        assert_eq!(report.failed_actions, 1);
        assert!((report.success_rate - 0.75).abs() < f64::EPSILON);
        assert_eq!(report.actions_by_role.get("operator"), Some(&3));
        assert_eq!(report.actions_by_type.get("data.confirm"), Some(&2));
    }

    #[test]
    fn records_outside_the_window_are_ignored() {
        let mut outside = record(1, "operator", "data.create", true);
        outside.timestamp = Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap();
        let (from, to) = window();

        let report = compliance_report(&[outside], from, to);
        assert_eq!(report.total_actions, 0);
        assert_eq!(report.success_rate, 0.0);
    }
}

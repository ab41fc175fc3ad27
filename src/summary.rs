//! Headline KPIs and categorical/time breakdowns of a ticket export.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDateTime, Timelike};
use counter::Counter;
use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::models::{TicketExport, COL_PRIORITY, COL_SERVICE};

pub const UNASSIGNED: &str = "Non assigné";
/// Upper bound on the inactivity window, about a century.
pub const MAX_INACTIVE_DAYS: i64 = 36_500;
const NEW_STATUS: &str = "Nouveau";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_tickets: usize,
    /// `None` when the export has no service column.
    pub services: Option<usize>,
    /// `None` when the export has no priority column.
    pub priority_levels: Option<usize>,
    pub new_tickets: usize,
    pub last_modified: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InactiveTicket {
    pub id: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub last_modified: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub tickets: usize,
    pub subcategories: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub kpis: Kpis,
    /// priority -> status -> count
    pub priority_by_status: BTreeMap<String, BTreeMap<String, usize>>,
    pub tickets_per_month: BTreeMap<String, usize>,
    pub tickets_per_day: BTreeMap<String, usize>,
    pub tickets_per_hour: BTreeMap<u32, usize>,
    pub top_technicians: Vec<(String, usize)>,
    pub top_requesters: Vec<(String, usize)>,
    pub categories: Vec<CategoryBreakdown>,
    pub inactive_days: i64,
    pub inactive: Vec<InactiveTicket>,
}

pub struct SummaryOptions {
    pub now: NaiveDateTime,
    pub inactive_days: i64,
    pub top: usize,
}

fn top_counts(counts: Counter<String>, top: usize) -> Vec<(String, usize)> {
    counts.most_common_ordered().into_iter().take(top).collect()
}

pub fn kpis(export: &TicketExport) -> Kpis {
    let distinct = |values: Vec<Option<&String>>| -> usize {
        values.into_iter().flatten().collect::<BTreeSet<_>>().len()
    };
    let services = export
        .has_column(COL_SERVICE)
        .then(|| distinct(export.records.iter().map(|r| r.service.as_ref()).collect()));
    let priority_levels = export
        .has_column(COL_PRIORITY)
        .then(|| distinct(export.records.iter().map(|r| r.priority.as_ref()).collect()));

    Kpis {
        total_tickets: export.len(),
        services,
        priority_levels,
        new_tickets: export
            .records
            .iter()
            .filter(|r| r.status.as_deref() == Some(NEW_STATUS))
            .count(),
        last_modified: export.records.iter().filter_map(|r| r.last_modified).max(),
    }
}

/// Fails only when the inactivity window is negative or too large to subtract
/// from `options.now`.
pub fn summarize(export: &TicketExport, options: &SummaryOptions) -> Result<ExportSummary> {
    let cutoff = inactivity_cutoff(options)?;
    let mut priority_by_status: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    let mut per_month: BTreeMap<String, usize> = BTreeMap::new();
    let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
    let mut per_hour: BTreeMap<u32, usize> = BTreeMap::new();
    let mut technicians: Counter<String> = Counter::new();
    let mut requesters: Counter<String> = Counter::new();
    let mut main_categories: Counter<String> = Counter::new();
    let mut subcategories: BTreeMap<String, Counter<String>> = BTreeMap::new();

    for record in &export.records {
        if let (Some(priority), Some(status)) = (&record.priority, &record.status) {
            *priority_by_status
                .entry(priority.clone())
                .or_default()
                .entry(status.clone())
                .or_insert(0) += 1;
        }

        if let Some(ts) = record.last_modified {
            *per_month.entry(ts.format("%Y-%m").to_string()).or_insert(0) += 1;
            *per_day.entry(ts.format("%Y-%m-%d").to_string()).or_insert(0) += 1;
            *per_hour.entry(ts.hour()).or_insert(0) += 1;
        }

        let technician = record.technician.clone().unwrap_or_else(|| UNASSIGNED.to_string());
        technicians[&technician] += 1;
        let requester = record.requester.clone().unwrap_or_else(|| UNASSIGNED.to_string());
        requesters[&requester] += 1;

        if let Some(category) = &record.category {
            let mut parts = category.splitn(2, '>');
            let main = parts.next().unwrap_or_default().trim().to_string();
            main_categories[&main] += 1;
            if let Some(sub) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
                subcategories.entry(main).or_insert_with(Counter::new)[&sub.to_string()] += 1;
            }
        }
    }

    let categories = main_categories
        .most_common_ordered()
        .into_iter()
        .map(|(category, tickets)| {
            let subs = subcategories
                .remove(&category)
                .map(|c| c.most_common_ordered())
                .unwrap_or_default();
            CategoryBreakdown {
                category,
                tickets,
                subcategories: subs,
            }
        })
        .collect();

    let mut inactive: Vec<InactiveTicket> = export
        .records
        .iter()
        .filter_map(|r| {
            let ts = r.last_modified?;
            (ts < cutoff).then(|| InactiveTicket {
                id: r.id.clone(),
                title: r.title.clone(),
                status: r.status.clone(),
                last_modified: ts,
            })
        })
        .collect();
    inactive.sort_by_key(|t| t.last_modified);

    Ok(ExportSummary {
        kpis: kpis(export),
        priority_by_status,
        tickets_per_month: per_month,
        tickets_per_day: per_day,
        tickets_per_hour: per_hour,
        top_technicians: top_counts(technicians, options.top),
        top_requesters: top_counts(requesters, options.top),
        categories,
        inactive_days: options.inactive_days,
        inactive,
    })
}

fn inactivity_cutoff(options: &SummaryOptions) -> Result<NaiveDateTime> {
    if !(0..=MAX_INACTIVE_DAYS).contains(&options.inactive_days) {
        return Err(AnalysisError::invalid_config(format!(
            "inactive_days must be in 0..={}, got {}",
            MAX_INACTIVE_DAYS, options.inactive_days
        )));
    }
    Duration::try_days(options.inactive_days)
        .and_then(|window| options.now.checked_sub_signed(window))
        .ok_or_else(|| {
            AnalysisError::invalid_config(format!(
                "inactive_days {} reaches before the earliest representable date",
                options.inactive_days
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_timestamp, TicketRecord, COL_STATUS, COL_TITLE};

    fn record(id: &str, status: &str, priority: &str, modified: &str) -> TicketRecord {
        TicketRecord {
            id: Some(id.to_string()),
            title: Some(format!("ticket {}", id)),
            status: Some(status.to_string()),
            priority: Some(priority.to_string()),
            last_modified: parse_timestamp(modified),
            ..TicketRecord::default()
        }
    }

    fn export() -> TicketExport {
        let mut records = vec![
            record("1", "Nouveau", "Haute", "01-03-2025 09:00"),
            record("2", "Clos", "Basse", "15-02-2025 14:30"),
            record("3", "Nouveau", "Haute", "02-03-2025 09:45"),
            record("4", "En cours (Attribué)", "Moyenne", "10-01-2025 08:00"),
        ];
        records[0].category = Some("Réseau > Wifi".to_string());
        records[1].category = Some("Réseau > VPN".to_string());
        records[2].category = Some("Matériel".to_string());
        records[0].technician = Some("A. Martin".to_string());
        records[2].technician = Some("A. Martin".to_string());
        TicketExport::from_records(&[COL_TITLE, COL_STATUS, COL_PRIORITY], records)
    }

    #[test]
    fn test_kpis() {
        let kpis = kpis(&export());
        assert_eq!(kpis.total_tickets, 4);
        assert_eq!(kpis.services, None);
        assert_eq!(kpis.priority_levels, Some(3));
        assert_eq!(kpis.new_tickets, 2);
        assert_eq!(kpis.last_modified, parse_timestamp("02-03-2025 09:45"));
    }

    #[test]
    fn test_breakdowns() {
        let options = SummaryOptions {
            now: parse_timestamp("05-03-2025 12:00").unwrap(),
            inactive_days: 7,
            top: 20,
        };
        let summary = summarize(&export(), &options).unwrap();

        assert_eq!(summary.priority_by_status["Haute"]["Nouveau"], 2);
        assert_eq!(summary.tickets_per_month["2025-03"], 2);
        assert_eq!(summary.tickets_per_hour[&9], 2);
        assert_eq!(summary.top_technicians[0], ("A. Martin".to_string(), 2));
        assert_eq!(summary.top_technicians[1], (UNASSIGNED.to_string(), 2));
        assert_eq!(summary.top_requesters, vec![(UNASSIGNED.to_string(), 4)]);

        assert_eq!(summary.categories[0].category, "Réseau");
        assert_eq!(summary.categories[0].tickets, 2);
        assert_eq!(summary.categories[0].subcategories.len(), 2);
        assert_eq!(summary.categories[1].subcategories, vec![]);

        let inactive: Vec<_> = summary.inactive.iter().map(|t| t.id.clone().unwrap()).collect();
        assert_eq!(inactive, vec!["4", "2"]);
    }

    #[test]
    fn test_out_of_range_inactivity_window_is_rejected() {
        let now = parse_timestamp("05-03-2025 12:00").unwrap();
        for inactive_days in [-1, MAX_INACTIVE_DAYS + 1, i64::MAX / 1000] {
            let options = SummaryOptions {
                now,
                inactive_days,
                top: 20,
            };
            assert!(matches!(
                summarize(&export(), &options),
                Err(AnalysisError::InvalidConfig { .. })
            ));
        }

        let widest = SummaryOptions {
            now,
            inactive_days: MAX_INACTIVE_DAYS,
            top: 20,
        };
        assert!(summarize(&export(), &widest).unwrap().inactive.is_empty());
    }
}

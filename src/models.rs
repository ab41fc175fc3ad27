//! Ticket records read from a GLPI CSV export.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

pub const COL_ID: &str = "ID";
pub const COL_TITLE: &str = "Titre";
pub const COL_STATUS: &str = "Statut";
pub const COL_PRIORITY: &str = "Priorité";
pub const COL_SERVICE: &str = "Plugins - Champs Sup - Etablissement";
pub const COL_CATEGORY: &str = "Catégorie";
pub const COL_TECHNICIAN: &str = "Attribué à - Technicien";
pub const COL_REQUESTER: &str = "Demandeur - Demandeur";
pub const COL_LAST_MODIFIED: &str = "Dernière modification";

const DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub service: Option<String>,
    pub category: Option<String>,
    pub technician: Option<String>,
    pub requester: Option<String>,
    pub last_modified: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketExport {
    pub columns: Vec<String>,
    pub records: Vec<TicketRecord>,
}

impl TicketExport {
    pub fn from_records(columns: &[&str], records: Vec<TicketRecord>) -> Self {
        TicketExport {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Raw titles in record order; missing cells stay `None`.
    pub fn titles(&self) -> Vec<Option<&str>> {
        self.records.iter().map(|r| r.title.as_deref()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn from_csv_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        info!("Reading ticket export {}", path.display());
        Self::from_csv_str(&raw)
    }

    /// Parses a `;`-separated export. Rows with only empty cells are dropped.
    pub fn from_csv_str(raw: &str) -> Result<Self> {
        let content = raw.trim_start_matches('\u{feff}');
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(content.as_bytes());

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let position = |name: &str| columns.iter().position(|c| c == name);
        let id_col = position(COL_ID);
        let title_col = position(COL_TITLE);
        let status_col = position(COL_STATUS);
        let priority_col = position(COL_PRIORITY);
        let service_col = position(COL_SERVICE);
        let category_col = position(COL_CATEGORY);
        let technician_col = position(COL_TECHNICIAN);
        let requester_col = position(COL_REQUESTER);
        let modified_col = position(COL_LAST_MODIFIED);

        if title_col.is_none() {
            warn!("Export has no '{}' column, title analysis will be empty", COL_TITLE);
        }

        let mut records = Vec::new();
        let mut skipped = 0;
        for row in reader.records() {
            let row = row?;
            if row.iter().all(|cell| cell.trim().is_empty()) {
                skipped += 1;
                continue;
            }
            let cell = |col: Option<usize>| -> Option<String> {
                col.and_then(|i| row.get(i))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            let last_modified = cell(modified_col).and_then(|v| parse_timestamp(&v));
            records.push(TicketRecord {
                id: cell(id_col),
                title: cell(title_col),
                status: cell(status_col),
                priority: cell(priority_col),
                service: cell(service_col),
                category: cell(category_col),
                technician: cell(technician_col),
                requester: cell(requester_col),
                last_modified,
            });
        }

        debug!("Parsed {} records, dropped {} empty rows", records.len(), skipped);
        Ok(TicketExport { columns, records })
    }
}

/// Day-first timestamp parsing; unparseable values become `None`.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

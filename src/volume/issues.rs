use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::abstracts::{Abstract, AbstractId};

/// Page to column to the abstracts printed there
pub type IssuePages = BTreeMap<u32, BTreeMap<u32, Vec<AbstractId>>>;

/// Newspaper issues reconstructed from abstract placements
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct IssueIndex {
    issues: BTreeMap<NaiveDate, IssuePages>,
}

impl IssueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entry per (page, column) block; synthetic records are skipped
    pub fn add(&mut self, record: &Abstract) {
        if record.synthetic {
            return;
        }
        let pages = self.issues.entry(record.date).or_default();
        for (page, column) in record.placements() {
            pages
                .entry(page)
                .or_default()
                .entry(column)
                .or_default()
                .push(record.id);
        }
    }

    pub fn issue(&self, date: NaiveDate) -> Option<&IssuePages> {
        self.issues.get(&date)
    }

    pub fn column(&self, date: NaiveDate, page: u32, column: u32) -> &[AbstractId] {
        self.issues
            .get(&date)
            .and_then(|pages| pages.get(&page))
            .and_then(|columns| columns.get(&column))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.issues.keys().copied()
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

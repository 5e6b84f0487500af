//! Sparse records reconciled into one table
//!
//! Mandatory columns are fixed up front. Every other column is registered the
//! first time a pushed record carries it, so the header is
//! `mandatory ++ discovered-in-first-seen-order` no matter how sparse the rows are.

use super::record::{Cell, Record};
use std::collections::HashSet;

static EMPTY: Cell = Cell::Empty;

#[derive(Debug, Clone, Default)]
pub struct Table {
    mandatory: Vec<String>,
    discovered: Vec<String>,
    known: HashSet<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(mandatory: &[&str]) -> Self {
        let mandatory: Vec<String> = mandatory.iter().map(|c| c.to_string()).collect();
        let known = mandatory.iter().cloned().collect();
        Self {
            mandatory,
            discovered: Vec::new(),
            known,
            rows: Vec::new(),
        }
    }

    /// Append a record, registering any column not seen before
    pub fn push(&mut self, record: Record) {
        for column in record.columns() {
            if !self.known.contains(column) {
                self.known.insert(column.to_string());
                self.discovered.push(column.to_string());
            }
        }
        self.rows.push(record);
    }

    /// Full header: mandatory columns, then discovered ones
    pub fn header(&self) -> Vec<&str> {
        self.mandatory
            .iter()
            .chain(self.discovered.iter())
            .map(|c| c.as_str())
            .collect()
    }

    pub fn discovered_columns(&self) -> &[String] {
        &self.discovered
    }

    /// Rows materialized against the header; missing columns are [`Cell::Empty`]
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        let header = self.header();
        self.rows.iter().map(move |record| {
            header
                .iter()
                .map(|column| record.get(column).unwrap_or(&EMPTY))
                .collect()
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

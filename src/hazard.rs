//! Per-day, per-location hurricane intensity.
//!
//! The data file is a wide matrix:
//!
//! ```text
//! #Day,marsh_harbour,treasure_cay
//! 0,1,0
//! 1,4,2
//! ```
//!
//! Blank or missing trailing cells are recorded as 0; blank cells past the
//! header width are ignored. A day with no row leaves
//! every location at the level it already had.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::ecosystem::Ecosystem;
use crate::error::DataFormatError;
use crate::table;

/// Source of hazard intensities that the simulation loop applies each day.
pub trait HazardDataSource: Send {
    /// Writes the day's intensities onto matching locations and returns how
    /// many were updated.
    fn apply(&self, day: u32, ecosystem: &mut Ecosystem) -> usize;
    /// Every level present in the data, for diagnostics.
    fn levels(&self) -> BTreeSet<i32>;
    fn location_names(&self) -> BTreeSet<String>;
}

#[derive(Debug, Clone, Default)]
pub struct HazardTimeSeries {
    records: BTreeMap<u32, BTreeMap<String, i32>>,
    issues: Vec<DataFormatError>,
}

impl HazardTimeSeries {
    /// Reads a hazard file. Problems are logged and leave the affected rows (or
    /// the whole series) empty; the run then treats them as calm.
    pub fn read(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                let issue = DataFormatError::Unreadable {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                };
                warn!("{issue}; continuing without hazard data");
                Self {
                    records: BTreeMap::new(),
                    issues: vec![issue],
                }
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut series = Self::default();
        let mut lines = table::lines(text);
        let columns = match lines.next().and_then(|(_, header)| table::header(header)) {
            Some(columns) => columns,
            None => {
                series.report(DataFormatError::MissingHeader);
                return series;
            }
        };

        for (line_number, line) in lines {
            if line.starts_with('#') {
                continue;
            }
            match parse_row(line_number, line, &columns) {
                Ok((day, row)) => {
                    let entry = series.records.entry(day).or_default();
                    if !entry.is_empty() {
                        warn!("day {day} appears more than once; later values win");
                    }
                    entry.extend(row);
                }
                Err(issue) => series.report(issue),
            }
        }
        series
    }

    pub fn get(&self, day: u32, location: &str) -> i32 {
        self.records
            .get(&day)
            .and_then(|row| row.get(location))
            .copied()
            .unwrap_or(0)
    }

    /// Problems found while loading.
    pub fn issues(&self) -> &[DataFormatError] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of days with at least one record.
    pub fn days(&self) -> usize {
        self.records.len()
    }

    /// Locations that reached a positive level on any day.
    pub fn affected_locations(&self) -> BTreeSet<String> {
        self.records
            .values()
            .flat_map(|row| row.iter())
            .filter(|(_, level)| **level > 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn report(&mut self, issue: DataFormatError) {
        warn!("skipping hazard data: {issue}");
        self.issues.push(issue);
    }
}

impl HazardDataSource for HazardTimeSeries {
    fn apply(&self, day: u32, ecosystem: &mut Ecosystem) -> usize {
        let Some(row) = self.records.get(&day) else {
            return 0;
        };
        let mut updated = 0;
        for (name, level) in row {
            if let Some(id) = ecosystem.location_id(name) {
                if ecosystem.set_hazard_level(id, day, *level) {
                    updated += 1;
                    if *level > 0 {
                        debug!("day {day}: {name} impacted by hurricane (level {level})");
                    }
                }
            }
        }
        updated
    }

    fn levels(&self) -> BTreeSet<i32> {
        self.records
            .values()
            .flat_map(|row| row.values().copied())
            .collect()
    }

    fn location_names(&self) -> BTreeSet<String> {
        self.records
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect()
    }
}

fn parse_row(
    line: usize,
    text: &str,
    columns: &[String],
) -> Result<(u32, Vec<(String, i32)>), DataFormatError> {
    let cells = table::cells(text, columns.len() + 1).map_err(|found| {
        DataFormatError::TooManyCells {
            line,
            expected: columns.len() + 1,
            found,
        }
    })?;
    let day = cells[0]
        .parse::<u32>()
        .map_err(|_| DataFormatError::BadDay {
            line,
            value: cells[0].to_string(),
        })?;

    let mut row = Vec::with_capacity(columns.len());
    for (index, location) in columns.iter().enumerate() {
        let cell = cells.get(index + 1).copied().unwrap_or("");
        let level = if cell.is_empty() {
            0
        } else {
            cell.parse::<i32>().map_err(|_| DataFormatError::BadCell {
                line,
                location: location.clone(),
                value: cell.to_string(),
            })?
        };
        let level = if level < 0 {
            warn!("line {line}: negative level {level} for {location}; using 0");
            0
        } else {
            level
        };
        row.push((location.clone(), level));
    }
    Ok((day, row))
}

//! Reference displacement data and the per-day error metrics computed against it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::warn;

use crate::{
    ecosystem::{Ecosystem, LocationId},
    error::ReferenceDataError,
    table,
};

const TOTAL_COLUMN: &str = "total";

/// `|sim - reference|`
pub fn abs_error(simulated: f64, reference: f64) -> f64 {
    (simulated - reference).abs()
}

/// `|sim / reference - 1|`, or 0 when the reference is effectively zero.
pub fn rel_error(simulated: f64, reference: f64) -> f64 {
    if reference < 0.00001 {
        return 0.0;
    }
    (simulated / reference - 1.0).abs()
}

/// Observed counts per camp and day, read from `#Day,<camp>...[,total]`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    columns: Vec<String>,
    points: Vec<BTreeMap<u32, f64>>,
}

impl ReferenceTable {
    pub fn load(path: impl AsRef<Path>, scaledown: f64) -> Result<Self, ReferenceDataError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ReferenceDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, scaledown)
    }

    pub fn parse(text: &str, scaledown: f64) -> Result<Self, ReferenceDataError> {
        let scaledown = if scaledown.is_finite() && scaledown > 0.0 {
            scaledown
        } else {
            warn!("population scaledown factor {scaledown} is not positive; using 1");
            1.0
        };
        let mut lines = table::lines(text);
        let columns = lines
            .next()
            .and_then(|(_, header)| table::header(header))
            .ok_or(ReferenceDataError::MissingHeader)?;
        let mut points = vec![BTreeMap::new(); columns.len()];

        for (line, text) in lines {
            let cells =
                table::cells(text, columns.len() + 1).map_err(|_| ReferenceDataError::BadRow {
                    line,
                    reason: format!("expected at most {} cells", columns.len() + 1),
                })?;
            let day = cells[0].parse::<u32>().map_err(|_| ReferenceDataError::BadRow {
                line,
                reason: format!("day '{}' is not a non-negative integer", cells[0]),
            })?;
            for (column, cell) in cells.iter().skip(1).enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let value = cell.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                    ReferenceDataError::BadRow {
                        line,
                        reason: format!("'{cell}' for {} is not a number", columns[column]),
                    }
                })?;
                points[column].insert(day, value / scaledown);
            }
        }

        Ok(Self { columns, points })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Reference count for `name` on `day`, interpolated linearly between the
    /// nearest recorded days. Days outside the recorded range have no value.
    pub fn get(&self, name: &str, day: u32) -> Option<f64> {
        let series = &self.points[self.column(name)?];
        if let Some(value) = series.get(&day) {
            return Some(*value);
        }
        let (before_day, before) = series.range(..day).next_back()?;
        let (after_day, after) = series.range(day..).next()?;
        let span = (after_day - before_day) as f64;
        let offset = (day - before_day) as f64;
        Some(before + (after - before) * offset / span)
    }

    /// Value of the `total` column when the file has one.
    pub fn raw_total(&self, day: u32) -> Option<f64> {
        self.get(TOTAL_COLUMN, day)
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampRecord {
    pub name: String,
    pub simulated: usize,
    pub reference: Option<f64>,
    pub relative_error: Option<f64>,
}

/// One row of simulation output.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub day: u32,
    pub date: NaiveDate,
    pub camps: Vec<CampRecord>,
    pub total_error: f64,
    pub reference_total: f64,
    pub simulated_total: usize,
    pub raw_reference_total: f64,
    pub simulated_camp_total: usize,
    pub refugee_debt: u64,
    pub idp_total: Option<usize>,
}

/// Compares camp occupancy with the reference table.
#[derive(Debug, Clone)]
pub struct Validator {
    camps: Vec<(LocationId, String)>,
    reference: Option<ReferenceTable>,
    idp_totals: bool,
}

impl Validator {
    /// Tracks every camp in the ecosystem. Each camp must have a column in
    /// the reference table.
    pub fn new(
        ecosystem: &Ecosystem,
        reference: Option<ReferenceTable>,
        idp_totals: bool,
    ) -> Result<Self, ReferenceDataError> {
        let camps: Vec<(LocationId, String)> = ecosystem
            .camp_ids()
            .into_iter()
            .map(|id| (id, ecosystem.location(id).name.clone()))
            .collect();
        if let Some(table) = &reference {
            if let Some((_, missing)) = camps.iter().find(|(_, name)| !table.has_column(name)) {
                return Err(ReferenceDataError::MissingCamp(missing.clone()));
            }
        }
        Ok(Self {
            camps,
            reference,
            idp_totals,
        })
    }

    pub fn camp_names(&self) -> Vec<&str> {
        self.camps.iter().map(|(_, name)| name.as_str()).collect()
    }

    pub fn idp_totals(&self) -> bool {
        self.idp_totals
    }

    pub fn reference(&self) -> Option<&ReferenceTable> {
        self.reference.as_ref()
    }

    pub fn record(
        &self,
        day: u32,
        date: NaiveDate,
        ecosystem: &Ecosystem,
        refugee_debt: u64,
    ) -> DayRecord {
        let mut camps = Vec::with_capacity(self.camps.len());
        let mut abs_total = 0.0;
        let mut reference_total = 0.0;
        for (id, name) in &self.camps {
            let simulated = ecosystem.location(*id).occupancy();
            let reference = self
                .reference
                .as_ref()
                .and_then(|table| table.get(name, day));
            if let Some(reference) = reference {
                abs_total += abs_error(simulated as f64, reference);
                reference_total += reference;
            }
            camps.push(CampRecord {
                name: name.clone(),
                simulated,
                reference,
                relative_error: reference.map(|r| rel_error(simulated as f64, r)),
            });
        }

        let simulated_camp_total = camps.iter().map(|camp| camp.simulated).sum();
        let raw_reference_total = self
            .reference
            .as_ref()
            .and_then(|table| table.raw_total(day))
            .unwrap_or(reference_total);
        let total_error = if raw_reference_total > 0.0 {
            abs_total / raw_reference_total
        } else {
            0.0
        };

        DayRecord {
            day,
            date,
            camps,
            total_error,
            reference_total,
            simulated_total: ecosystem.num_agents(),
            raw_reference_total,
            simulated_camp_total,
            refugee_debt,
            idp_total: self.idp_totals.then(|| ecosystem.num_idps()),
        }
    }
}

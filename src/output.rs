use std::io::{self, Write};

use crate::validation::DayRecord;

/// Writes the daily validation table as CSV.
pub struct OutputWriter<W: Write> {
    inner: W,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_header(&mut self, camps: &[&str], idp_totals: bool) -> io::Result<()> {
        writeln!(self.inner, "{}", header(camps, idp_totals))
    }

    pub fn write_record(&mut self, record: &DayRecord) -> io::Result<()> {
        writeln!(self.inner, "{}", format_record(record))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

pub fn header(camps: &[&str], idp_totals: bool) -> String {
    let mut line = String::from("Day,Date");
    for camp in camps {
        line.push_str(&format!(",{camp} sim,{camp} data,{camp} error"));
    }
    line.push_str(
        ",Total error,refugees in camps (UNHCR),total refugees (simulation),\
         raw UNHCR refugee count,refugees in camps (simulation),refugee_debt",
    );
    if idp_totals {
        line.push_str(",total IDPs");
    }
    line
}

/// Missing reference values render as empty fields so every row keeps the
/// header's column count.
pub fn format_record(record: &DayRecord) -> String {
    let mut line = format!("{},{}", record.day, record.date.format("%Y-%m-%d"));
    for camp in &record.camps {
        line.push_str(&format!(
            ",{},{},{}",
            camp.simulated,
            optional(camp.reference),
            optional(camp.relative_error)
        ));
    }
    if record.raw_reference_total > 0.0 {
        line.push_str(&format!(
            ",{},{},{},{},{},{}",
            record.total_error,
            record.reference_total.trunc() as i64,
            record.simulated_total,
            record.raw_reference_total,
            record.simulated_camp_total,
            record.refugee_debt
        ));
    } else {
        line.push_str(&format!(
            ",0.0,0,{},0,{},{}",
            record.simulated_total, record.simulated_camp_total, record.refugee_debt
        ));
    }
    if let Some(idps) = record.idp_total {
        line.push_str(&format!(",{idps}"));
    }
    line
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::validation::CampRecord;

    fn record(reference: Option<f64>) -> DayRecord {
        DayRecord {
            day: 3,
            date: NaiveDate::from_ymd_opt(2019, 9, 4).unwrap(),
            camps: vec![CampRecord {
                name: "gym".into(),
                simulated: 12,
                reference,
                relative_error: reference.map(|r| crate::validation::rel_error(12.0, r)),
            }],
            total_error: 0.2,
            reference_total: reference.unwrap_or(0.0),
            simulated_total: 40,
            raw_reference_total: reference.unwrap_or(0.0),
            simulated_camp_total: 12,
            refugee_debt: 0,
            idp_total: Some(28),
        }
    }

    #[test]
    fn camp_reference_total_is_truncated() {
        let mut interpolated = record(Some(10.0));
        interpolated.reference_total = 374.6;
        let row = format_record(&interpolated);
        assert_eq!(row.split(',').nth(6), Some("374"));
    }

    #[test]
    fn rows_match_header_width() {
        let head = header(&["gym"], true);
        let full = format_record(&record(Some(10.0)));
        let missing = format_record(&record(None));
        let width = head.split(',').count();
        assert_eq!(full.split(',').count(), width);
        assert_eq!(missing.split(',').count(), width);
        assert_eq!(full, "3,2019-09-04,12,10,0.19999999999999996,0.2,10,40,10,12,0,28");
        assert_eq!(missing, "3,2019-09-04,12,,,0.0,0,40,0,12,0,28");
    }
}

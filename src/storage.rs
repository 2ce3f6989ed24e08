use crate::models::NormalizedRecord;
use crate::series::AnnualSeries;
use anyhow::Result;
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save normalized rows as CSV with header. Missing values are empty cells.
pub fn save_csv<P: AsRef<Path>>(records: &[NormalizedRecord], path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.serialize(("category", "area", "time", "tab", "class_code", "value"))?;
    for r in records {
        wtr.serialize((
            &r.category,
            &r.area,
            &r.time,
            &r.tab,
            &r.class_code,
            r.value,
        ))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save normalized rows as a pretty JSON array.
pub fn save_json<P: AsRef<Path>>(records: &[NormalizedRecord], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(records)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save an annual series as `year,value,nowcast`; only the projected row is
/// flagged.
pub fn save_series_csv<P: AsRef<Path>>(series: &AnnualSeries, path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.serialize(("year", "value", "nowcast"))?;
    let projected = series.latest().filter(|_| series.is_nowcast()).map(|(y, _)| y);
    for (year, value) in series.iter() {
        wtr.serialize((year, value, Some(year) == projected))?;
    }
    wtr.flush()?;
    Ok(())
}

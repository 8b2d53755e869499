//! Excel report export
//!
//! Loads a fixed xlsx template, walks the code column of the `Datos` sheet
//! until a blank cell, and writes the product name and a formatted total for
//! every code present in today's aggregation. Codes without transactions get
//! a literal `"0"` so stale template values never survive an export.

use crate::config;
use crate::error::{AppError, Result};
use crate::models::GroupedTransaction;
use chrono::{DateTime, TimeZone};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::{reader, writer, Worksheet};

/// What gets written for one matched code: product name and display total
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub product: String,
    pub total: String,
}

/// Formats a summed total for the report: the fractional digits are scaled
/// by the pack multiplier and rendered after a comma.
///
/// `12.5` with a pack multiplier of 30 becomes `"12,15"` (0.5 packs = 15
/// units). Integral totals render without a fraction. A fractional total
/// with no known pack multiplier renders as `"Error"`, matching the report's
/// tolerance for bad rows over failing the whole export.
pub fn format_report_total(total: f64, packs: Option<f64>) -> String {
    let text = total.to_string();
    let Some((int_part, frac_part)) = text.split_once('.') else {
        return text;
    };
    let Some(packs) = packs else {
        log::warn!("total {} has a fraction but no pack multiplier", total);
        return "Error".to_string();
    };
    match frac_part.parse::<u64>() {
        Ok(frac) => {
            let scaled = (frac as f64 / 10f64.powi(frac_part.len() as i32)) * packs;
            // round to one decimal, then truncate
            let units = ((scaled * 10.0).round() / 10.0).trunc() as i64;
            format!("{},{}", int_part, units)
        }
        Err(e) => {
            log::warn!("unparseable fraction in total {}: {}", text, e);
            "Error".to_string()
        }
    }
}

/// Indexes aggregation rows by code; rows with a blank code are dropped
pub fn build_report_map(rows: &[GroupedTransaction]) -> HashMap<String, ReportEntry> {
    let mut map = HashMap::new();
    for row in rows {
        let code = row.code.trim();
        if code.is_empty() {
            continue;
        }
        map.insert(
            code.to_string(),
            ReportEntry {
                product: row.product.clone(),
                total: format_report_total(row.total, row.packs),
            },
        );
    }
    map
}

/// Fills the report sheet in place.
///
/// Scans the code column from the first data row until a blank cell; rows
/// below the blank are left untouched. Returns the number of matched codes.
pub fn fill_sheet(sheet: &mut Worksheet, map: &HashMap<String, ReportEntry>) -> usize {
    let mut row = config::REPORT_START_ROW;
    let mut matched = 0;
    loop {
        let code = sheet.get_value((config::REPORT_CODE_COL, row)).trim().to_string();
        if code.is_empty() {
            break;
        }
        match map.get(&code) {
            Some(entry) => {
                sheet
                    .get_cell_mut((config::REPORT_PRODUCT_COL, row))
                    .set_value(entry.product.clone());
                sheet
                    .get_cell_mut((config::REPORT_TOTAL_COL, row))
                    .set_value(entry.total.clone());
                matched += 1;
            }
            None => {
                sheet
                    .get_cell_mut((config::REPORT_TOTAL_COL, row))
                    .set_value("0");
            }
        }
        row += 1;
    }
    matched
}

/// Loads the template, fills it from the aggregation rows, and returns the
/// finished workbook as xlsx bytes.
pub fn render_report(template_path: &Path, rows: &[GroupedTransaction]) -> Result<Vec<u8>> {
    if !template_path.is_file() {
        return Err(AppError::TemplateNotFound(
            template_path.display().to_string(),
        ));
    }
    let mut book = reader::xlsx::read(template_path)
        .map_err(|e| AppError::Spreadsheet(e.to_string()))?;

    let map = build_report_map(rows);
    {
        let sheet = book
            .get_sheet_by_name_mut(config::REPORT_SHEET)
            .ok_or_else(|| AppError::SheetNotFound(config::REPORT_SHEET.to_string()))?;
        let matched = fill_sheet(sheet, &map);
        log::info!(
            "Report filled: {} of {} aggregated codes matched the template",
            matched,
            map.len()
        );
    }

    let mut buffer = Cursor::new(Vec::new());
    writer::xlsx::write_writer(&book, &mut buffer)
        .map_err(|e| AppError::Spreadsheet(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Download file name for an export at the given instant
pub fn report_filename<Tz: TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("report_{}.xlsx", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn grouped(code: &str, product: &str, total: f64, packs: Option<f64>) -> GroupedTransaction {
        GroupedTransaction {
            product: product.to_string(),
            code: code.to_string(),
            inventory_id: None,
            total,
            count: 1,
            packs,
        }
    }

    #[test]
    fn integral_total_renders_without_fraction() {
        assert_eq!(format_report_total(12.0, Some(30.0)), "12");
        assert_eq!(format_report_total(0.0, None), "0");
    }

    #[test]
    fn fractional_total_scales_by_pack_multiplier() {
        // 0.5 of a 30-unit pack = 15 units
        assert_eq!(format_report_total(12.5, Some(30.0)), "12,15");
        // 0.25 of a 12-unit pack = 3 units
        assert_eq!(format_report_total(7.25, Some(12.0)), "7,3");
    }

    #[test]
    fn fractional_total_without_packs_is_an_error_cell() {
        assert_eq!(format_report_total(12.5, None), "Error");
    }

    #[test]
    fn zero_pack_multiplier_scales_fraction_to_zero() {
        assert_eq!(format_report_total(12.5, Some(0.0)), "12,0");
    }

    #[test]
    fn report_map_drops_blank_codes() {
        let rows = vec![
            grouped("101", "Harina", 10.0, Some(30.0)),
            grouped("  ", "Sin codigo", 5.0, Some(10.0)),
        ];
        let map = build_report_map(&rows);
        assert_eq!(map.len(), 1);
        assert_eq!(map["101"].product, "Harina");
        assert_eq!(map["101"].total, "10");
    }

    #[test]
    fn fill_sheet_writes_matches_and_zeroes_the_rest() {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut((1, 6)).set_value("101");
        sheet.get_cell_mut((1, 7)).set_value("102");

        let map = build_report_map(&[grouped("101", "Harina", 12.5, Some(30.0))]);
        let matched = fill_sheet(sheet, &map);
        assert_eq!(matched, 1);

        assert_eq!(sheet.get_value((2, 6)), "Harina");
        assert_eq!(sheet.get_value((4, 6)), "12,15");
        // code absent from the aggregation gets a literal zero
        assert_eq!(sheet.get_value((4, 7)), "0");
    }

    #[test]
    fn fill_sheet_stops_at_first_blank_code() {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut((1, 6)).set_value("101");
        // row 7 blank, row 8 has a code that must not be touched
        sheet.get_cell_mut((1, 8)).set_value("103");

        let map = build_report_map(&[grouped("103", "Azucar", 4.0, Some(10.0))]);
        let matched = fill_sheet(sheet, &map);
        assert_eq!(matched, 0);
        assert_eq!(sheet.get_value((4, 8)), "");
    }

    #[test]
    fn render_report_rejects_missing_template() {
        let err = render_report(Path::new("/nonexistent/template.xlsx"), &[]).unwrap_err();
        assert!(matches!(err, AppError::TemplateNotFound(_)));
    }

    #[test]
    fn render_report_rejects_missing_sheet() {
        // a fresh workbook has no "Datos" sheet
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.xlsx");
        let book = umya_spreadsheet::new_file();
        writer::xlsx::write(&book, &path).unwrap();

        let err = render_report(&path, &[]).unwrap_err();
        assert!(matches!(err, AppError::SheetNotFound(_)));
    }

    #[test]
    fn render_report_round_trips_through_the_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.xlsx");
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.set_name(config::REPORT_SHEET);
        sheet.get_cell_mut((1, 6)).set_value("101");
        writer::xlsx::write(&book, &path).unwrap();

        let rows = vec![grouped("101", "Harina", 10.0, Some(30.0))];
        let bytes = render_report(&path, &rows).unwrap();
        assert!(!bytes.is_empty());

        let reread = reader::xlsx::read_reader(Cursor::new(bytes), true).unwrap();
        let sheet = reread.get_sheet_by_name(config::REPORT_SHEET).unwrap();
        assert_eq!(sheet.get_value((2, 6)), "Harina");
        assert_eq!(sheet.get_value((4, 6)), "10");
    }

    #[test]
    fn report_filename_embeds_the_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 11, 3, 15, 30, 45).unwrap();
        assert_eq!(report_filename(now), "report_20251103_153045.xlsx");
    }
}

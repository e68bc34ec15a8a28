//! Monthly timesheet report and its PDF rendering.

use chrono::{Datelike, NaiveDate};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use serde::Serialize;

use super::{
    summary::{self, credited_duration, MonthSummary, OvertimeAccounting},
    work_log::WorkLog,
};
use crate::{
    calendar::YearMonth,
    errors::{Result, TrackerError},
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const ROW_HEIGHT: f32 = 7.0;
const BOTTOM_LIMIT: f32 = 30.0;
const COLUMNS: [(f32, &str); 5] = [
    (0.0, "Date"),
    (25.0, "Place"),
    (85.0, "Time"),
    (120.0, "Duration"),
    (148.0, "Credited"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimesheetRow {
    pub date: NaiveDate,
    pub place: String,
    pub time_range: String,
    /// Raw shift length.
    pub hours: f64,
    /// Shift length after the lunch deduction.
    pub credited_hours: f64,
}

/// Work days of one month with their totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timesheet {
    pub month: YearMonth,
    pub rows: Vec<TimesheetRow>,
    pub summary: MonthSummary,
}

impl Timesheet {
    /// Fails with `NotFound` when the month has no work days.
    pub fn for_month(log: &WorkLog, month: YearMonth, policy: OvertimeAccounting) -> Result<Self> {
        let entries = log.entries_in_month(month);
        let rows: Vec<TimesheetRow> = entries
            .iter()
            .filter_map(|entry| {
                let raw = entry.hours_worked()?;
                Some(TimesheetRow {
                    date: entry.date,
                    place: entry.place.clone(),
                    time_range: entry.time_range(),
                    hours: summary::hours(raw),
                    credited_hours: summary::hours(credited_duration(raw)),
                })
            })
            .collect();
        if rows.is_empty() {
            return Err(TrackerError::NotFound(format!(
                "no work days recorded for {}",
                month
            )));
        }
        let summary = summary::summarize(month, entries, policy);
        Ok(Self {
            month,
            rows,
            summary,
        })
    }

    pub fn title(&self) -> String {
        format!("Timesheet for {}", self.month.label())
    }

    pub fn file_name(&self) -> String {
        format!("worklog_{}.pdf", self.month)
    }

    /// Totals block printed under the table.
    pub fn total_lines(&self) -> Vec<String> {
        vec![
            format!("Work days: {}", self.summary.work_days),
            format!("Hours worked: {:.1}", self.summary.total_hours),
            format!(
                "Overtime (above 8 hours a day): {:.1}",
                self.summary.overtime_hours
            ),
            format!(
                "Total including overtime: {:.1}",
                self.summary.total_with_overtime
            ),
        ]
    }

    /// Renders the timesheet as an A4 PDF document.
    pub fn render_pdf(&self) -> Result<Vec<u8>> {
        let (doc, page, layer) =
            PdfDocument::new(self.title(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = builtin_font(&doc, BuiltinFont::Helvetica)?;
        let bold = builtin_font(&doc, BuiltinFont::HelveticaBold)?;

        let mut layer = doc.get_page(page).get_layer(layer);
        layer.use_text(self.title(), 16.0, Mm(MARGIN_LEFT), Mm(277.0), &bold);
        let mut y = 262.0;
        write_header(&layer, &bold, y);
        y -= ROW_HEIGHT + 1.0;

        for row in &self.rows {
            if y < BOTTOM_LIMIT {
                layer = new_page(&doc);
                y = 277.0;
                write_header(&layer, &bold, y);
                y -= ROW_HEIGHT + 1.0;
            }
            let cells = [
                format!("{:02}.{:02}.{}", row.date.day(), row.date.month(), row.date.year()),
                row.place.clone(),
                row.time_range.clone(),
                format!("{:.1} h", row.hours),
                format!("{:.1} h", row.credited_hours),
            ];
            for ((offset, _), text) in COLUMNS.iter().zip(cells) {
                layer.use_text(text, 10.0, Mm(MARGIN_LEFT + offset), Mm(y), &font);
            }
            y -= ROW_HEIGHT;
        }

        y -= ROW_HEIGHT;
        for line in self.total_lines() {
            if y < BOTTOM_LIMIT {
                layer = new_page(&doc);
                y = 277.0;
            }
            layer.use_text(line, 12.0, Mm(MARGIN_LEFT), Mm(y), &font);
            y -= ROW_HEIGHT;
        }

        doc.save_to_bytes()
            .map_err(|err| TrackerError::Export(err.to_string()))
    }
}

fn builtin_font(doc: &PdfDocumentReference, font: BuiltinFont) -> Result<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|err| TrackerError::Export(err.to_string()))
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn write_header(layer: &PdfLayerReference, font: &IndirectFontRef, y: f32) {
    for (offset, label) in COLUMNS {
        layer.use_text(label, 11.0, Mm(MARGIN_LEFT + offset), Mm(y), font);
    }
}

//! Workbook renderer: one styled sheet per evaluated file.
//!
//! Layout per sheet (columns): A/B peak data, C/D hidden flag columns,
//! E..G the limits / average / target summary block, I the chart and the
//! colour legend.

use std::path::Path;

use rust_xlsxwriter::{
    Chart, ChartType, Color, ConditionalFormatCell, ConditionalFormatCellRule,
    ConditionalFormatTop, ConditionalFormatTopRule, Format, FormatAlign, Formula, Workbook,
    Worksheet, XlsxError,
};

use crate::data::model::{EvalError, FileEvaluation};
use crate::locale::NumberLocale;

/// Values at or under a limit cell.
const ALERT_ORANGE: Color = Color::RGB(0xE6_7E_17);
/// Fill of the single largest peak.
const LARGEST_GREEN: Color = Color::RGB(0xB8_F5_89);
/// Fill of the single smallest peak.
const SMALLEST_RED: Color = Color::RGB(0xFF_C7_CE);
/// Legend "Upper limit" sample colour.
const LIMIT_RED: Color = Color::RGB(0xD9_11_2A);

/// Fixed process targets for plug-in depth, in mm.
const INFUSION_TARGET: &str = "0.65";
const INJECTION_TARGET: &str = "0.40";

/// Host format limit for worksheet names.
const SHEET_NAME_LIMIT: usize = 31;

/// Write the result workbook. A save failure (destination locked, folder
/// missing) is reported as a single `RenderWrite`; the run itself is still
/// considered complete.
pub fn write_workbook(
    evaluations: &[FileEvaluation],
    path: &Path,
    locale: NumberLocale,
) -> Result<(), EvalError> {
    let mut workbook = Workbook::new();

    for eval in evaluations {
        let sheet = workbook.add_worksheet();
        write_sheet(sheet, eval, locale).map_err(|e| render_error(path, e))?;
    }

    workbook.save(path).map_err(|e| render_error(path, e))?;
    log::info!("wrote {} sheets to {}", evaluations.len(), path.display());
    Ok(())
}

fn render_error(path: &Path, err: XlsxError) -> EvalError {
    EvalError::RenderWrite {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Worksheet name: file stem truncated to the host limit.
fn sheet_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    stem.chars().take(SHEET_NAME_LIMIT).collect()
}

fn write_sheet(
    ws: &mut Worksheet,
    eval: &FileEvaluation,
    locale: NumberLocale,
) -> Result<(), XlsxError> {
    let name = sheet_name(&eval.file_name);
    ws.set_name(&name)?;

    write_data_table(ws, eval)?;
    set_column_widths(ws, eval.one_port)?;
    add_chart(ws, eval, &name)?;
    add_conditional_formats(ws, eval)?;
    write_summary(ws, eval, locale)?;
    write_legend(ws)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Data table
// ---------------------------------------------------------------------------

fn write_data_table(ws: &mut Worksheet, eval: &FileEvaluation) -> Result<(), XlsxError> {
    ws.write_string(0, 0, "Infusion")?;
    ws.write_string(0, 1, "Injection")?;
    ws.write_string(0, 2, "Error Infusion")?;
    ws.write_string(0, 3, "Error Injection")?;

    for (i, row) in eval.rows.iter().enumerate() {
        let r = i as u32 + 1;
        ws.write_number(r, 0, row.infusion_peak)?;
        ws.write_boolean(r, 2, row.infusion_below)?;
        // One-port sheets leave the injection columns blank.
        if !eval.one_port {
            ws.write_number(r, 1, row.injection_peak)?;
            ws.write_boolean(r, 3, row.injection_below)?;
        }
    }

    Ok(())
}

fn set_column_widths(ws: &mut Worksheet, one_port: bool) -> Result<(), XlsxError> {
    ws.set_column_width(0, 15)?;
    ws.set_column_width(1, 15)?;
    ws.set_column_width(2, 15)?;
    ws.set_column_width(3, if one_port { 5 } else { 15 })?;
    // The flag columns feed the AVERAGEIF formulas but are noise on screen.
    ws.set_column_hidden(2)?;
    ws.set_column_hidden(3)?;
    ws.set_column_width(4, 16)?;
    ws.set_column_width(5, 20)?;
    ws.set_column_width(6, if one_port { 5 } else { 20 })?;
    ws.set_column_width(8, 20)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

fn add_chart(ws: &mut Worksheet, eval: &FileEvaluation, name: &str) -> Result<(), XlsxError> {
    let last_row = eval.rows.len() as u32;

    let mut chart = Chart::new(ChartType::Column);
    chart
        .add_series()
        .set_values((name, 1, 0, last_row, 0))
        .set_name((name, 0, 0));
    if !eval.one_port {
        chart
            .add_series()
            .set_values((name, 1, 1, last_row, 1))
            .set_name((name, 0, 1));
    }
    chart.title().set_name(name);
    chart.x_axis().set_name("Cycle");
    chart.y_axis().set_name("Depth [mm]");
    chart.set_style(2);

    ws.insert_chart(0, 8, &chart)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Conditional formatting
// ---------------------------------------------------------------------------

fn add_conditional_formats(ws: &mut Worksheet, eval: &FileEvaluation) -> Result<(), XlsxError> {
    let last_row = eval.rows.len() as u32;

    let below_limit = Format::new().set_bold().set_font_color(ALERT_ORANGE);
    let infusion_rule = ConditionalFormatCell::new()
        .set_rule(ConditionalFormatCellRule::LessThanOrEqualTo(Formula::new(
            "$F$2",
        )))
        .set_format(&below_limit);
    ws.add_conditional_format(1, 0, last_row, 0, &infusion_rule)?;

    if !eval.one_port {
        let injection_rule = ConditionalFormatCell::new()
            .set_rule(ConditionalFormatCellRule::LessThanOrEqualTo(Formula::new(
                "$G$2",
            )))
            .set_format(&below_limit);
        ws.add_conditional_format(1, 1, last_row, 1, &injection_rule)?;
    }

    // Single largest value green, single smallest red.
    let largest = ConditionalFormatTop::new()
        .set_rule(ConditionalFormatTopRule::Top(1))
        .set_format(Format::new().set_background_color(LARGEST_GREEN));
    let smallest = ConditionalFormatTop::new()
        .set_rule(ConditionalFormatTopRule::Bottom(1))
        .set_format(Format::new().set_background_color(SMALLEST_RED));

    ws.add_conditional_format(0, 0, last_row, 0, &largest)?;
    ws.add_conditional_format(0, 0, last_row, 0, &smallest)?;
    if !eval.one_port {
        ws.add_conditional_format(0, 1, last_row, 1, &largest)?;
        ws.add_conditional_format(0, 1, last_row, 1, &smallest)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Summary block and legend
// ---------------------------------------------------------------------------

fn write_summary(
    ws: &mut Worksheet,
    eval: &FileEvaluation,
    locale: NumberLocale,
) -> Result<(), XlsxError> {
    let right = Format::new().set_align(FormatAlign::Right);
    let bold = Format::new().set_bold();
    let number = Format::new()
        .set_num_format("#,##0.00")
        .set_align(FormatAlign::Right);
    let bold_number = Format::new()
        .set_bold()
        .set_num_format("#,##0.00")
        .set_align(FormatAlign::Right);

    ws.write_string_with_format(1, 4, "Lower limit", &right)?;
    ws.write_string_with_format(2, 4, "Upper limit", &right)?;
    ws.write_number_with_format(1, 5, eval.limits.infusion.0, &number)?;
    ws.write_number_with_format(2, 5, eval.limits.infusion.1, &number)?;
    if !eval.one_port {
        ws.write_number_with_format(1, 6, eval.limits.injection.0, &number)?;
        ws.write_number_with_format(2, 6, eval.limits.injection.1, &number)?;
    }

    ws.write_string_with_format(4, 4, "Average", &right)?;
    ws.write_string_with_format(5, 4, "Target", &right)?;
    ws.write_string_with_format(6, 4, "Delta", &right)?;
    ws.write_string_with_format(8, 4, "Installed shim", &right)?;
    ws.write_string_with_format(9, 4, "Required shim", &right)?;

    // 1-based row number of the last data row.
    let last = eval.rows.len() + 1;
    let false_literal = locale.false_literal();

    ws.write_string_with_format(0, 5, "Infusion evaluation", &bold)?;
    ws.write_formula_with_format(
        4,
        5,
        Formula::new(format!(
            "=AVERAGEIF(C2:C{last}, \"{false_literal}\", A2:A{last})"
        )),
        &number,
    )?;
    ws.write_string_with_format(5, 5, locale.decimal_literal(INFUSION_TARGET), &number)?;
    ws.write_formula_with_format(6, 5, Formula::new("=F6-F5"), &bold_number)?;

    if !eval.one_port {
        ws.write_string_with_format(0, 6, "Injection evaluation", &bold)?;
        ws.write_formula_with_format(
            4,
            6,
            Formula::new(format!(
                "=AVERAGEIF(D2:D{last}, \"{false_literal}\", B2:B{last})"
            )),
            &number,
        )?;
        ws.write_string_with_format(5, 6, locale.decimal_literal(INJECTION_TARGET), &number)?;
        ws.write_formula_with_format(6, 6, Formula::new("=G6-G5"), &bold_number)?;
    }

    Ok(())
}

fn write_legend(ws: &mut Worksheet) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();

    ws.write_string_with_format(15, 8, "Legend", &bold)?;

    ws.write_string(16, 8, "Smallest value")?;
    ws.write_string_with_format(
        16,
        9,
        "0.001",
        &Format::new().set_background_color(SMALLEST_RED),
    )?;

    ws.write_string(17, 8, "Largest value")?;
    ws.write_string_with_format(
        17,
        9,
        "0.7",
        &Format::new().set_background_color(LARGEST_GREEN),
    )?;

    ws.write_string(18, 8, "Lower limit")?;
    ws.write_string_with_format(
        18,
        9,
        "0.001",
        &Format::new().set_bold().set_font_color(ALERT_ORANGE),
    )?;

    ws.write_string(19, 8, "Upper limit")?;
    ws.write_string_with_format(
        19,
        9,
        "1.0",
        &Format::new().set_bold().set_font_color(LIMIT_RED),
    )?;

    Ok(())
}

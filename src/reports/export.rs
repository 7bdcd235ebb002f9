//! CSV and HTML rendering of reports

use chrono::NaiveDate;
use serde_json::Value;

use super::{Report, ReportBody, ReportFormat, ReportKind, ReportTable};
use crate::utils::errors::{KindergartenError, Result};

/// Lets spreadsheet tools detect UTF-8
pub const UTF8_BOM: &str = "\u{feff}";

/// A report ready to be written to a response
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub content_type: &'static str,
    /// Set for downloads
    pub filename: Option<String>,
    pub body: String,
}

pub fn csv_filename(kind: ReportKind, on: NaiveDate) -> String {
    format!("report_{}_{}.csv", kind.as_str(), on.format("%Y-%m-%d"))
}

/// Render `report` in `format`. Only tables have a CSV form.
pub fn render(report: &Report, format: ReportFormat, delimiter: char) -> Result<RenderedReport> {
    match format {
        ReportFormat::Json => Ok(RenderedReport {
            content_type: "application/json",
            filename: None,
            body: serde_json::to_string(report)?,
        }),
        ReportFormat::Csv => match &report.body {
            ReportBody::Table(table) => Ok(RenderedReport {
                content_type: "text/csv; charset=utf-8",
                filename: Some(csv_filename(report.kind, report.generated_on)),
                body: to_csv(table, delimiter),
            }),
            _ => Err(KindergartenError::invalid(format!(
                "Report '{}' cannot be exported as CSV",
                report.kind
            ))),
        },
        ReportFormat::Html => Ok(RenderedReport {
            content_type: "text/html; charset=utf-8",
            filename: None,
            body: to_html(report),
        }),
    }
}

/// BOM, header row, CRLF line endings
pub fn to_csv(table: &ReportTable, delimiter: char) -> String {
    let mut out = String::from(UTF8_BOM);
    push_csv_line(&mut out, table.columns.iter().map(String::as_str), delimiter);
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        push_csv_line(&mut out, cells.iter().map(String::as_str), delimiter);
    }
    out
}

fn push_csv_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>, delimiter: char) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        let needs_quotes = field.contains(delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r');
        if needs_quotes {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        other => other.to_string(),
    }
}

pub fn to_html(report: &Report) -> String {
    let mut out = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>");
    out.push_str(&escape_html(report.body.title()));
    out.push_str("</title></head><body><h1>");
    out.push_str(&escape_html(report.body.title()));
    out.push_str("</h1>");

    match &report.body {
        ReportBody::Table(table) => {
            let rows: Vec<Vec<String>> = table
                .rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect();
            push_html_table(&mut out, &table.columns, &rows);
        }
        ReportBody::ChartData(chart) => {
            let columns = ["Month", "Present", "Absent", "Attendance rate"].map(String::from);
            let rows: Vec<Vec<String>> = chart
                .points
                .iter()
                .map(|p| {
                    vec![
                        p.label.to_string(),
                        p.present.to_string(),
                        p.absent.to_string(),
                        p.attendance_rate.to_string(),
                    ]
                })
                .collect();
            push_html_table(&mut out, &columns, &rows);
        }
        ReportBody::DashboardData { data, .. } => {
            let columns = ["Key", "Value"].map(String::from);
            let rows: Vec<Vec<String>> = data
                .iter()
                .map(|(key, value)| vec![key.clone(), cell_text(value)])
                .collect();
            push_html_table(&mut out, &columns, &rows);
        }
    }

    out.push_str("</body></html>");
    out
}

fn push_html_table(out: &mut String, columns: &[String], rows: &[Vec<String>]) {
    out.push_str("<table><thead><tr>");
    for column in columns {
        out.push_str("<th>");
        out.push_str(&escape_html(column));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&escape_html(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::ChartData;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn table_report() -> Report {
        let mut table = ReportTable::new("Students", &["ID", "FIO", "Group"]);
        table.push_row(vec![json!(1), json!("Smith; Ann"), Value::Null]);
        table.push_row(vec![json!(2), json!("Said \"hi\""), json!("Sun")]);
        Report {
            kind: ReportKind::StudentsCsv,
            generated_on: day(),
            body: ReportBody::Table(table),
        }
    }

    #[test]
    fn test_csv_quoting_and_bom() {
        let rendered = render(&table_report(), ReportFormat::Csv, ';').unwrap();

        assert_eq!(rendered.filename.as_deref(), Some("report_students_csv_2024-09-02.csv"));
        assert!(rendered.body.starts_with(UTF8_BOM));
        let lines: Vec<&str> = rendered.body[UTF8_BOM.len()..].split("\r\n").collect();
        assert_eq!(lines[0], "ID;FIO;Group");
        assert_eq!(lines[1], "1;\"Smith; Ann\";");
        assert_eq!(lines[2], "2;\"Said \"\"hi\"\"\";Sun");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_comma_delimiter_leaves_semicolons_alone() {
        let rendered = render(&table_report(), ReportFormat::Csv, ',').unwrap();
        assert!(rendered.body.contains("1,Smith; Ann,\r\n"));
    }

    #[test]
    fn test_chart_data_has_no_csv_form() {
        let report = Report {
            kind: ReportKind::MonthlyStats,
            generated_on: day(),
            body: ReportBody::ChartData(ChartData { title: "Monthly".into(), points: vec![] }),
        };
        assert_matches!(
            render(&report, ReportFormat::Csv, ';'),
            Err(KindergartenError::InvalidInput(_))
        );
        assert!(render(&report, ReportFormat::Html, ';').is_ok());
    }

    #[test]
    fn test_html_is_escaped() {
        let mut report = table_report();
        if let ReportBody::Table(table) = &mut report.body {
            table.push_row(vec![json!(3), json!("<script>"), json!("A&B")]);
        }
        let rendered = render(&report, ReportFormat::Html, ';').unwrap();

        assert_eq!(rendered.content_type, "text/html; charset=utf-8");
        assert!(rendered.body.contains("<td>&lt;script&gt;</td>"));
        assert!(rendered.body.contains("<td>A&amp;B</td>"));
        assert!(!rendered.body.contains("<script>"));
    }
}

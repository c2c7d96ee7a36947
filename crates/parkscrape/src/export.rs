use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use rust_xlsxwriter::{Workbook, XlsxError};
use serde::{Deserialize, Serialize};

use crate::target::OutputSpec;
use crate::types::{Field, Record, ScrapeReport};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid output format '{0}'. Accepted values: 'xlsx', 'csv'")]
pub struct OutputFormatParseError(String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = OutputFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(OutputFormatParseError(s.to_string())),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

enum Cell<'a> {
    Number(u32),
    Text(&'a str),
    Empty,
}

fn cell(record: &Record, field: Field) -> Cell<'_> {
    match field {
        Field::Id => record.id.map_or(Cell::Empty, Cell::Number),
        other => record.text(other).map_or(Cell::Empty, Cell::Text),
    }
}

/// Writes header plus one row per record to `path`, replacing any existing file.
pub fn write_table(
    records: &[Record],
    output: &OutputSpec,
    path: &Path,
    format: OutputFormat,
) -> Result<(), ExportError> {
    match format {
        OutputFormat::Xlsx => write_xlsx(records, output, path),
        OutputFormat::Csv => write_csv(records, output, path),
    }
}

fn write_xlsx(records: &[Record], output: &OutputSpec, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&output.sheet)?;

    for (col, column) in output.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, &column.header)?;
    }

    for (row, record) in records.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, column) in output.columns.iter().enumerate() {
            let col = col as u16;
            match cell(record, column.field) {
                Cell::Number(n) => {
                    worksheet.write_number(row, col, n)?;
                }
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Empty => {}
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_csv(records: &[Record], output: &OutputSpec, path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(output.columns.iter().map(|c| c.header.as_str()))?;

    for record in records {
        let row: Vec<String> = output
            .columns
            .iter()
            .map(|c| match cell(record, c.field) {
                Cell::Number(n) => n.to_string(),
                Cell::Text(text) => text.to_string(),
                Cell::Empty => String::new(),
            })
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Turns a finished [`ScrapeReport`] into a file under `output_dir`.
#[derive(Debug, Clone)]
pub struct TabularExporter {
    format: OutputFormat,
    output_dir: PathBuf,
}

impl TabularExporter {
    pub fn new(format: OutputFormat, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            format,
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, output: &OutputSpec) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", output.file_stem, self.format.extension()))
    }

    pub fn export(&self, report: ScrapeReport, output: &OutputSpec) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(output);
        write_table(&report.records, output, &path, self.format)?;
        log::info!(
            "Saved {} row(s) for {} to {}",
            report.records.len(),
            report.target,
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;

    fn read_csv(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .expect("Failed to open CSV");
        reader
            .records()
            .map(|r| r.expect("bad row").iter().map(String::from).collect())
            .collect()
    }

    fn company(id: u32, name: &str, email: &str) -> Record {
        Record {
            id: Some(id),
            company: name.to_string(),
            email: email.to_string(),
            url: format!("https://technopark.in/company-details/{}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_has_header_and_declared_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = ScrapeReport::new("technopark-companies");
        report.records = vec![
            company(5610, "Quantum Leaf", "jobs@ql.example"),
            company(5611, "Coral Reef", "hr@coral.example"),
        ];
        let output = presets::technopark_companies().output;

        let exporter = TabularExporter::new(OutputFormat::Csv, dir.path());
        let path = exporter.export(report, &output).expect("Export failed");

        assert_eq!(path, dir.path().join("technopark_company_emails.csv"));
        let rows = read_csv(&path);
        assert_eq!(rows[0], vec!["ID", "Company Name", "Email", "URL"]);
        assert_eq!(
            rows[1],
            vec![
                "5610",
                "Quantum Leaf",
                "jobs@ql.example",
                "https://technopark.in/company-details/5610"
            ]
        );
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_export_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = presets::infopark_companies().output;
        let exporter = TabularExporter::new(OutputFormat::Csv, dir.path());

        let mut first = ScrapeReport::new("infopark-companies");
        first.records = vec![company(1, "A", "a@a.example"), company(2, "B", "b@b.example")];
        let mut second = ScrapeReport::new("infopark-companies");
        second.records = vec![company(3, "C", "c@c.example")];

        exporter.export(first, &output).unwrap();
        let path = exporter.export(second, &output).unwrap();

        let rows = read_csv(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "C");
    }

    #[test]
    fn test_xlsx_export_writes_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = ScrapeReport::new("technopark-jobs");
        report.records = vec![Record {
            id: Some(20716),
            title: "Senior Python Developer".to_string(),
            company: "Acme".to_string(),
            email: String::new(),
            url: "https://technopark.in/job-details/20716".to_string(),
        }];
        let output = presets::technopark_jobs().output;

        let path = TabularExporter::new(OutputFormat::Xlsx, dir.path())
            .export(report, &output)
            .expect("Export failed");

        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"), "xlsx files are zip archives");
    }

    #[test]
    fn test_export_fails_when_target_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = presets::infopark_companies().output;
        let exporter = TabularExporter::new(OutputFormat::Csv, dir.path());
        fs::create_dir(exporter.path_for(&output)).unwrap();

        let result = exporter.export(ScrapeReport::new("infopark-companies"), &output);

        assert!(result.is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("XLSX".parse::<OutputFormat>().unwrap(), OutputFormat::Xlsx);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("ods".parse::<OutputFormat>().is_err());
    }
}

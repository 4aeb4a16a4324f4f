//! Report exporters - CSV, JSON, Markdown
//!
//! An exporter turns any [`ReportData`] into text. Reports only describe
//! their title, columns, rows and summary lines.

/// Trait for exporting reports to different formats
pub trait ReportExporter {
    /// Export to the target format
    fn export(&self, report: &dyn ReportData) -> String;

    /// Get the file extension for this format
    fn extension(&self) -> &'static str;

    /// Get the MIME type for this format
    fn mime_type(&self) -> &'static str;
}

/// Trait for data that can be exported
pub trait ReportData {
    /// Get the report title
    fn title(&self) -> &str;

    /// Get column headers
    fn headers(&self) -> Vec<String>;

    /// Get data rows
    fn rows(&self) -> Vec<Vec<String>>;

    /// Get summary statistics as key-value pairs
    fn summary(&self) -> Vec<(String, String)>;

    /// Indexes of columns holding amounts (right-aligned in Markdown)
    fn numeric_columns(&self) -> Vec<usize> {
        Vec::new()
    }
}

// ============================================================================
// CSV Exporter
// ============================================================================

/// CSV format exporter
pub struct CsvExporter {
    delimiter: char,
    include_header: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field delimiter, `,` by default
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn escape_csv_field(&self, field: &str) -> String {
        if field.contains(self.delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn write_line(&self, output: &mut String, fields: &[String]) {
        let escaped: Vec<String> = fields.iter().map(|f| self.escape_csv_field(f)).collect();
        output.push_str(&escaped.join(&self.delimiter.to_string()));
        output.push('\n');
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        if self.include_header {
            self.write_line(&mut output, &report.headers());
        }
        for row in report.rows() {
            self.write_line(&mut output, &row);
        }

        output
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON Exporter
// ============================================================================

/// JSON format exporter
pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let headers = report.headers();

        // Mỗi dòng thành một object theo tên cột
        let json_rows: Vec<serde_json::Value> = report
            .rows()
            .into_iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        let value = row.get(i).cloned().unwrap_or_default();
                        (header.clone(), serde_json::Value::String(value))
                    })
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();

        let summary_obj: serde_json::Map<String, serde_json::Value> = report
            .summary()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        let output = serde_json::json!({
            "title": report.title(),
            "summary": summary_obj,
            "data": json_rows,
        });

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_default()
        } else {
            serde_json::to_string(&output).unwrap_or_default()
        }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

// ============================================================================
// Markdown Exporter
// ============================================================================

/// Markdown format exporter
pub struct MarkdownExporter {
    include_summary: bool,
    include_toc: bool,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_toc: false,
        }
    }
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }

    pub fn with_toc(mut self) -> Self {
        self.include_toc = true;
        self
    }

    fn escape_cell(cell: &str) -> String {
        cell.replace('|', "\\|").replace('\n', " ")
    }
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", report.title()));

        if self.include_toc {
            output.push_str("## Table of Contents\n\n");
            if self.include_summary {
                output.push_str("- [Summary](#summary)\n");
            }
            output.push_str("- [Data](#data)\n\n");
        }

        if self.include_summary {
            output.push_str("## Summary\n\n");
            for (key, value) in report.summary() {
                output.push_str(&format!("- **{}**: {}\n", key, value));
            }
            output.push('\n');
        }

        output.push_str("## Data\n\n");

        let headers = report.headers();
        let rows = report.rows();
        if headers.is_empty() {
            return output;
        }
        if rows.is_empty() {
            output.push_str("_No rows._\n");
            return output;
        }

        let numeric = report.numeric_columns();
        output.push_str("| ");
        output.push_str(&headers.join(" | "));
        output.push_str(" |\n");

        let separators: Vec<&str> = (0..headers.len())
            .map(|i| if numeric.contains(&i) { "---:" } else { "---" })
            .collect();
        output.push_str("| ");
        output.push_str(&separators.join(" | "));
        output.push_str(" |\n");

        for row in rows {
            let cells: Vec<String> = row.iter().map(|c| Self::escape_cell(c)).collect();
            output.push_str("| ");
            output.push_str(&cells.join(" | "));
            output.push_str(" |\n");
        }

        output
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn mime_type(&self) -> &'static str {
        "text/markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collections {
        rows: Vec<Vec<String>>,
    }

    impl ReportData for Collections {
        fn title(&self) -> &str {
            "Collections"
        }

        fn headers(&self) -> Vec<String> {
            vec!["Receipt".to_string(), "Client".to_string(), "Total".to_string()]
        }

        fn rows(&self) -> Vec<Vec<String>> {
            self.rows.clone()
        }

        fn summary(&self) -> Vec<(String, String)> {
            vec![("Payments".to_string(), self.rows.len().to_string())]
        }

        fn numeric_columns(&self) -> Vec<usize> {
            vec![2]
        }
    }

    fn sample() -> Collections {
        Collections {
            rows: vec![
                vec!["REC00000001".to_string(), "Ana Gomez".to_string(), "100000".to_string()],
                vec!["REC00000002".to_string(), "Luis Perez".to_string(), "30000".to_string()],
            ],
        }
    }

    #[test]
    fn test_csv_exporter() {
        let exporter = CsvExporter::new();
        let output = exporter.export(&sample());

        assert!(output.starts_with("Receipt,Client,Total\n"));
        assert!(output.contains("REC00000001,Ana Gomez,100000"));
        assert_eq!(output.lines().count(), 3);
        assert_eq!(exporter.extension(), "csv");
    }

    #[test]
    fn test_csv_escaping_and_delimiter() {
        let report = Collections {
            rows: vec![vec![
                "REC00000003".to_string(),
                "Gomez, \"Ana\"".to_string(),
                "1.5".to_string(),
            ]],
        };
        let output = CsvExporter::new().without_header().export(&report);
        assert_eq!(output, "REC00000003,\"Gomez, \"\"Ana\"\"\",1.5\n");

        let output = CsvExporter::new().with_delimiter(';').export(&report);
        assert!(output.contains("REC00000003;\"Gomez, \"\"Ana\"\"\";1.5"));
    }

    #[test]
    fn test_json_exporter() {
        let output = JsonExporter::new().export(&sample());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["title"], "Collections");
        assert_eq!(value["summary"]["Payments"], "2");
        assert_eq!(value["data"][1]["Client"], "Luis Perez");
        assert_eq!(value["data"][1]["Total"], "30000");
    }

    #[test]
    fn test_json_compact() {
        let output = JsonExporter::new().compact().export(&sample());
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_markdown_exporter() {
        let exporter = MarkdownExporter::new();
        let output = exporter.export(&sample());

        assert!(output.contains("# Collections"));
        assert!(output.contains("- **Payments**: 2"));
        assert!(output.contains("| Receipt | Client | Total |"));
        assert!(output.contains("| --- | --- | ---: |"));
        assert!(output.contains("| REC00000001 | Ana Gomez | 100000 |"));
        assert_eq!(exporter.extension(), "md");
    }

    #[test]
    fn test_markdown_toc_and_empty_table() {
        let empty = Collections { rows: Vec::new() };
        let output = MarkdownExporter::new().with_toc().export(&empty);

        assert!(output.contains("- [Summary](#summary)"));
        assert!(output.contains("_No rows._"));
        assert!(!output.contains("| Receipt |"));

        let output = MarkdownExporter::new().without_summary().export(&sample());
        assert!(!output.contains("## Summary"));
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let report = Collections {
            rows: vec![vec!["REC1".to_string(), "A | B".to_string(), "1".to_string()]],
        };
        let output = MarkdownExporter::new().export(&report);
        assert!(output.contains("| REC1 | A \\| B | 1 |"));
    }
}

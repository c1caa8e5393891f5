use std::fmt::Write as FmtWrite;

use crate::models::OutputFormat;
use crate::services::{UploadSummary, percent};

pub trait Formatter: Send + Sync {
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_upload(&self, report: &UploadReport) -> String;
    fn format_index(&self, report: &IndexReport) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub corpus_dir: String,
    pub corpus_found: bool,
    pub partitions: usize,
    pub records: u64,
    pub embedding_driver: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_dimension: u32,
    pub embedding_ready: bool,
    pub vector_store_driver: String,
    pub vector_store_url: String,
    pub vector_store_connected: bool,
    pub index: String,
    pub index_exists: bool,
    pub vector_count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub index: String,
    pub summary: UploadSummary,
    pub duration_ms: u64,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub index: String,
    pub driver: String,
    pub exists: bool,
    pub ready: bool,
    pub vector_count: u64,
    pub dimension: Option<u64>,
}

fn dimension_text(dimension: Option<u64>) -> String {
    dimension.map_or_else(|| "unknown".to_string(), |d| d.to_string())
}

fn percent_text(uploaded: u64, total: u64) -> String {
    percent(uploaded, total).map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}%"))
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let corpus_status = if status.corpus_found {
            "[FOUND]"
        } else {
            "[MISSING]"
        };
        writeln!(output, "Corpus:        {} ({})", status.corpus_dir, corpus_status).unwrap();
        if status.corpus_found {
            writeln!(output, "  Partitions:  {}", status.partitions).unwrap();
            writeln!(output, "  Records:     {}", status.records).unwrap();
        }
        writeln!(output).unwrap();

        let key_status = if status.embedding_ready {
            "[READY]"
        } else {
            "[UNAVAILABLE]"
        };
        writeln!(
            output,
            "Embedding:     {} ({})",
            status.embedding_driver, key_status
        )
        .unwrap();
        writeln!(output, "  URL:         {}", status.embedding_url).unwrap();
        writeln!(output, "  Model:       {}", status.embedding_model).unwrap();
        writeln!(output, "  Dimension:   {}", status.embedding_dimension).unwrap();
        writeln!(output).unwrap();

        let vector_status = if status.vector_store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        )
        .unwrap();
        writeln!(output, "  URL:         {}", status.vector_store_url).unwrap();
        writeln!(output, "  Index:       {}", status.index).unwrap();
        if status.vector_store_connected {
            if status.index_exists {
                writeln!(output, "  Vectors:     {}", status.vector_count).unwrap();
            } else {
                writeln!(output, "  Vectors:     (index not created)").unwrap();
            }
        }

        output
    }

    fn format_upload(&self, report: &UploadReport) -> String {
        let s = &report.summary;
        let mut output = String::new();
        if report.dry_run {
            writeln!(output, "Dry Run Complete").unwrap();
            writeln!(output, "----------------").unwrap();
            writeln!(output, "Records found: {}", s.total).unwrap();
            writeln!(output, "Would upload: {}", s.uploaded).unwrap();
            writeln!(output, "Skipped: {}", s.skipped).unwrap();
        } else {
            writeln!(output, "Upload Complete").unwrap();
            writeln!(output, "---------------").unwrap();
            writeln!(output, "Index: {}", report.index).unwrap();
            writeln!(
                output,
                "Uploaded: {}/{} ({})",
                s.uploaded,
                s.total,
                percent_text(s.uploaded, s.total)
            )
            .unwrap();
            writeln!(output, "Skipped: {}", s.skipped).unwrap();
            writeln!(
                output,
                "Failed: {} records in {} batches",
                s.failed_records, s.failed_batches
            )
            .unwrap();
        }
        writeln!(output, "Duration: {}ms", report.duration_ms).unwrap();
        output
    }

    fn format_index(&self, report: &IndexReport) -> String {
        let mut output = String::new();
        writeln!(output, "Index: {} ({})", report.index, report.driver).unwrap();
        if !report.exists {
            writeln!(output, "  Status:      [MISSING]").unwrap();
            return output;
        }
        let ready = if report.ready { "[READY]" } else { "[PENDING]" };
        writeln!(output, "  Status:      {}", ready).unwrap();
        writeln!(output, "  Vectors:     {}", report.vector_count).unwrap();
        writeln!(output, "  Dimension:   {}", dimension_text(report.dimension)).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut text = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        text.push('\n');
        text
    }
}

impl Formatter for JsonFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        let json = serde_json::json!({
            "corpus": {
                "path": status.corpus_dir,
                "found": status.corpus_found,
                "partitions": status.partitions,
                "records": status.records,
            },
            "embedding": {
                "driver": status.embedding_driver,
                "url": status.embedding_url,
                "model": status.embedding_model,
                "dimension": status.embedding_dimension,
                "ready": status.embedding_ready,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "url": status.vector_store_url,
                "connected": status.vector_store_connected,
                "index": status.index,
                "index_exists": status.index_exists,
                "vectors": status.vector_count,
            }
        });
        self.render(&json)
    }

    fn format_upload(&self, report: &UploadReport) -> String {
        let s = &report.summary;
        let json = serde_json::json!({
            "index": report.index,
            "dry_run": report.dry_run,
            "total": s.total,
            "uploaded": s.uploaded,
            "skipped": s.skipped,
            "failed_batches": s.failed_batches,
            "failed_records": s.failed_records,
            "duration_ms": report.duration_ms,
        });
        self.render(&json)
    }

    fn format_index(&self, report: &IndexReport) -> String {
        let json = serde_json::json!({
            "index": report.index,
            "driver": report.driver,
            "exists": report.exists,
            "ready": report.ready,
            "vectors": report.vector_count,
            "dimension": report.dimension,
        });
        self.render(&json)
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", serde_json::json!({"message": message}))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{}\n", serde_json::json!({"error": error}))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        let mark = |ok: bool| if ok { "✅" } else { "❌" };
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        writeln!(output, "### Corpus {}\n", mark(status.corpus_found)).unwrap();
        writeln!(output, "- **Path:** `{}`", status.corpus_dir).unwrap();
        writeln!(output, "- **Partitions:** {}", status.partitions).unwrap();
        writeln!(output, "- **Records:** {}", status.records).unwrap();
        writeln!(output).unwrap();

        writeln!(
            output,
            "### Embedding ({}) {}\n",
            status.embedding_driver,
            mark(status.embedding_ready)
        )
        .unwrap();
        writeln!(output, "- **URL:** `{}`", status.embedding_url).unwrap();
        writeln!(output, "- **Model:** {}", status.embedding_model).unwrap();
        writeln!(output, "- **Dimension:** {}", status.embedding_dimension).unwrap();
        writeln!(output).unwrap();

        writeln!(
            output,
            "### Vector Store ({}) {}\n",
            status.vector_store_driver,
            mark(status.vector_store_connected)
        )
        .unwrap();
        writeln!(output, "- **URL:** `{}`", status.vector_store_url).unwrap();
        writeln!(output, "- **Index:** {}", status.index).unwrap();
        writeln!(output, "- **Vectors:** {}", status.vector_count).unwrap();

        output
    }

    fn format_upload(&self, report: &UploadReport) -> String {
        let s = &report.summary;
        let mut output = String::new();
        let title = if report.dry_run {
            "Dry Run Complete"
        } else {
            "Upload Complete"
        };
        writeln!(output, "## {}\n", title).unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Index | `{}` |", report.index).unwrap();
        writeln!(output, "| Records found | {} |", s.total).unwrap();
        writeln!(output, "| Uploaded | {} |", s.uploaded).unwrap();
        writeln!(output, "| Skipped | {} |", s.skipped).unwrap();
        writeln!(output, "| Failed records | {} |", s.failed_records).unwrap();
        writeln!(output, "| Failed batches | {} |", s.failed_batches).unwrap();
        writeln!(output, "| Duration | {}ms |", report.duration_ms).unwrap();
        output
    }

    fn format_index(&self, report: &IndexReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Index `{}` ({})\n", report.index, report.driver).unwrap();
        if !report.exists {
            writeln!(output, "*Index does not exist.*").unwrap();
            return output;
        }
        writeln!(output, "- **Ready:** {}", report.ready).unwrap();
        writeln!(output, "- **Vectors:** {}", report.vector_count).unwrap();
        writeln!(output, "- **Dimension:** {}", dimension_text(report.dimension)).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

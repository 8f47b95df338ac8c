//! Server-rendered HTML pages.

use std::fmt::Write;

use vidtally_core::run::RunId;
use vidtally_pipeline::assemble::AssemblySummary;
use vidtally_pipeline::detect::DetectionSummary;
use vidtally_pipeline::extract::ExtractionSummary;

/// Escape text for use in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape(title),
    )
}

/// Upload form.
pub fn index_page() -> String {
    layout(
        "Video object counter",
        "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"video\" accept=\"video/*\">\n\
         <button type=\"submit\">Upload</button>\n\
         </form>\n",
    )
}

/// Page shown after upload and after a detection pass.
pub fn results_page(
    run_id: RunId,
    extraction: Option<&ExtractionSummary>,
    detection: Option<&DetectionSummary>,
) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<p>Run <code>{run_id}</code></p>");

    if let Some(extraction) = extraction {
        let _ = write!(body, "<p>Extracted {} frames", extraction.frames);
        if let Some(duration) = extraction.source_duration_secs {
            let _ = write!(body, " from {duration:.1} s of video");
        }
        body.push_str(".</p>\n");
    }

    match detection {
        Some(detection) => {
            let _ = writeln!(
                body,
                "<p>Processed {} frames, {} rows in <a href=\"/download_report?run={run_id}\">{}</a>.</p>",
                detection.processed.len(),
                detection.report_rows,
                escape(&report_name(detection)),
            );
            if !detection.totals.is_empty() {
                body.push_str("<table>\n<tr><th>Object</th><th>Count</th></tr>\n");
                for (label, count) in &detection.totals {
                    let _ = writeln!(body, "<tr><td>{}</td><td>{count}</td></tr>", escape(label));
                }
                body.push_str("</table>\n");
            }
            body.push_str("<ul>\n");
            for frame in &detection.processed {
                let _ = writeln!(
                    body,
                    "<li>{} ({} detections)</li>",
                    escape(&frame.frame),
                    frame.detections
                );
            }
            body.push_str("</ul>\n");
            if !detection.failed.is_empty() {
                body.push_str("<h2>Skipped frames</h2>\n<ul>\n");
                for failure in &detection.failed {
                    let _ = writeln!(
                        body,
                        "<li>{}: {}</li>",
                        escape(&failure.frame),
                        escape(&failure.reason)
                    );
                }
                body.push_str("</ul>\n");
            }
            let _ = writeln!(
                body,
                "<p><a href=\"/download?run={run_id}\">Create video</a></p>"
            );
        }
        None => {
            let _ = writeln!(
                body,
                "<form action=\"/process?run={run_id}\" method=\"post\"><button type=\"submit\">Detect objects</button></form>"
            );
        }
    }

    layout("Results", &body)
}

/// Page shown after the video has been assembled.
pub fn download_page(run_id: RunId, assembly: &AssemblySummary) -> String {
    let body = format!(
        "<p>Video saved to: <code>{}</code> ({} frames, {:.1} s)</p>\n\
         <p><a href=\"/download_video_file?run={run_id}\">Download video</a></p>\n",
        escape(&assembly.video_path.display().to_string()),
        assembly.frames,
        assembly.duration_secs,
    );
    layout("Video ready", &body)
}

/// Error page with a status line and detail text.
pub fn error_page(title: &str, detail: &str) -> String {
    layout(title, &format!("<p>{}</p>\n<p><a href=\"/\">Back</a></p>\n", escape(detail)))
}

fn report_name(detection: &DetectionSummary) -> String {
    detection
        .report_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

use std::fs;
use std::path::PathBuf;

use tabled::builder::Builder;
use tabled::settings::Style;

use credit_pd_core::commentary::ProviderError;
use credit_pd_core::report::{ReportExporter, ReportInput};

/// Writes the credit report as a Markdown document.
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    path: PathBuf,
}

impl MarkdownExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &ReportInput) -> Result<(), ProviderError> {
        fs::write(&self.path, render(report))
            .map_err(|e| format!("cannot write '{}': {}", self.path.display(), e))?;
        Ok(())
    }
}

pub fn render(report: &ReportInput) -> String {
    let mut ratios = Builder::default();
    ratios.push_record(["Code", "Ratio", "Value"]);
    for line in &report.ratios {
        ratios.push_record([line.code.as_str(), line.name.as_str(), line.value.as_str()]);
    }
    let mut ratio_table = ratios.build();
    ratio_table.with(Style::markdown());

    let label = report
        .predicted_label
        .map(|l| l.to_string())
        .unwrap_or_else(|| "N/A".into());

    let mut out = String::new();
    out.push_str(&format!("# Credit risk report: {}\n\n", report.company_name));
    out.push_str(&format!(
        "_Generated {}_\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str("## Financial ratios\n\n");
    out.push_str(&ratio_table.to_string());
    out.push_str("\n\n## Probability of default\n\n");
    out.push_str(&format!("- PD: {}\n", report.pd_display));
    out.push_str(&format!("- Predicted label: {label}\n"));
    out.push_str(&format!(
        "- Rating: {} ({}, PD {})\n",
        report.tier.rating, report.tier.classification, report.tier.range
    ));
    out.push_str(&format!("- {}\n", report.tier.meaning));
    out.push_str("\n## Analyst commentary\n\n");
    out.push_str(report.commentary.trim());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use credit_pd_core::report::RatioLine;
    use credit_pd_core::risk::tier::RiskTier;

    fn sample() -> ReportInput {
        ReportInput {
            company_name: "ACME JSC".into(),
            generated_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            ratios: vec![RatioLine {
                code: "X1".into(),
                name: "Gross margin (X1)".into(),
                value: "0.2500".into(),
            }],
            pd: None,
            pd_display: "N/A".into(),
            predicted_label: None,
            tier: RiskTier::Undetermined.profile(),
            commentary: "Commentary unavailable: offline".into(),
        }
    }

    #[test]
    fn test_render_contains_sections() {
        let md = render(&sample());
        assert!(md.starts_with("# Credit risk report: ACME JSC"));
        assert!(md.contains("2024-03-01 09:30 UTC"));
        assert!(md.contains("| X1 "));
        assert!(md.contains("0.2500"));
        assert!(md.contains("- PD: N/A"));
        assert!(md.contains("Commentary unavailable: offline"));
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let exporter = MarkdownExporter::new("/nonexistent-dir/for/report.md");
        assert!(exporter.export(&sample()).is_err());
    }
}

use chrono::Utc;
use clap::Args;
use serde_json::{json, Value};

use credit_pd_core::commentary::{request_commentary, AnalysisPayload, CommentaryOutcome};
use credit_pd_core::ensemble::{PredictionRequest, TrainingDataset};
use credit_pd_core::report::{export_report, ReportInput};
use credit_pd_core::risk::tier::classify_pd;
use credit_pd_core::session::ScoringSession;
use credit_pd_core::ScoringConfig;

use super::ratios::load_statements;
use crate::input;
use crate::report::{CommandCommentary, MarkdownExporter};

#[derive(Args)]
pub struct TrainArgs {
    /// Labelled dataset (CSV with X_1..X_14 and default)
    #[arg(long)]
    pub training: String,
}

#[derive(Args)]
pub struct PredictArgs {
    /// Labelled dataset used to fit the model before scoring
    #[arg(long)]
    pub training: String,
    /// Feature record (JSON or YAML) with exactly X_1..X_14
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct AssessArgs {
    /// Labelled dataset used to fit the model before scoring
    #[arg(long)]
    pub training: String,
    /// Workbook (JSON or YAML) keyed by sheet name
    #[arg(long)]
    pub input: Option<String>,
    /// Balance sheet CSV (use with --income-statement and --cash-flow)
    #[arg(long, requires_all = ["income_statement", "cash_flow"], conflicts_with = "input")]
    pub balance_sheet: Option<String>,
    #[arg(long, requires = "balance_sheet")]
    pub income_statement: Option<String>,
    #[arg(long, requires = "balance_sheet")]
    pub cash_flow: Option<String>,
    /// Borrower name printed on the report
    #[arg(long)]
    pub company: Option<String>,
    /// Program that reads the analysis payload (JSON) on stdin and writes commentary to stdout
    #[arg(long)]
    pub commentary_cmd: Option<String>,
    /// Write a Markdown report to this path
    #[arg(long)]
    pub report: Option<String>,
}

fn trained_session(
    training: &str,
    config: ScoringConfig,
) -> Result<ScoringSession, Box<dyn std::error::Error>> {
    let path = input::file::resolve_path(training)?;
    let dataset = TrainingDataset::from_csv_path(&path)?;
    let mut session = ScoringSession::new(config)?;
    session.train(&dataset)?;
    Ok(session)
}

pub fn run_train(args: TrainArgs, config: ScoringConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let path = input::file::resolve_path(&args.training)?;
    let dataset = TrainingDataset::from_csv_path(&path)?;
    let mut session = ScoringSession::new(config)?;
    let result = session.train(&dataset)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_predict(
    args: PredictArgs,
    config: ScoringConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: PredictionRequest = input::read_typed(args.input.as_deref())?;
    let session = trained_session(&args.training, config)?;
    let score = session.predict_request(&request)?;
    let tier = classify_pd(Some(score.pd_stacking));
    Ok(json!({
        "result": {
            "pd_stacking": score.pd_stacking,
            "pd_logistic": score.pd_logistic,
            "pd_random_forest": score.pd_random_forest,
            "pd_gradient_boosting": score.pd_gradient_boosting,
            "predicted_label": score.predicted_label,
            "decision_threshold": score.decision_threshold,
            "rating": tier.rating(),
            "classification": tier.classification(),
        }
    }))
}

pub fn run_assess(
    args: AssessArgs,
    config: ScoringConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let statements = load_statements(
        args.input.as_deref(),
        args.balance_sheet.as_deref(),
        args.income_statement.as_deref(),
        args.cash_flow.as_deref(),
    )?;
    let session = trained_session(&args.training, config)?;
    let mut output = session.assess(&statements)?;

    let commentary = match args.commentary_cmd.as_deref() {
        Some(cmd) => {
            let provider = CommandCommentary::parse(cmd)?;
            let payload =
                AnalysisPayload::new(output.result.ratios(), output.result.score.as_ref());
            request_commentary(&provider, &payload)
        }
        None => CommentaryOutcome::Unavailable("no commentary provider configured".into()),
    };

    if let Some(path) = args.report.as_deref() {
        let report = ReportInput::new(
            args.company.as_deref(),
            &output.result,
            &commentary,
            Utc::now(),
        );
        match export_report(&MarkdownExporter::new(path), &report) {
            Some(failure) => output.warnings.push(failure),
            None => tracing::info!(path, "report written"),
        }
    }

    let mut value = serde_json::to_value(output)?;
    if let Value::Object(map) = &mut value {
        map.insert("commentary".into(), serde_json::to_value(&commentary)?);
    }
    Ok(value)
}

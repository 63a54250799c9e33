//! `shipalloc <plan.json> [--dry-run]`
//!
//! Builds the shipment drafts described by a plan file, validates them, and
//! buys one label per non-empty shipment. `--dry-run` uses the in-memory
//! label API instead of `SHIPALLOC_LABEL_API_URL`.

mod plan;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use serde_json::json;

use shipalloc_issuance::{
    HttpLabelApi, InMemoryLabelApi, IssuanceError, LabelApiConfig, LabelIssuanceApi,
    LabelIssuanceCoordinator,
};

use crate::plan::Plan;

const EXIT_PARTIAL: u8 = 1;
const EXIT_INVALID: u8 = 2;

struct Args {
    plan_path: String,
    dry_run: bool,
}

fn parse_args() -> Result<Args> {
    let mut plan_path = None;
    let mut dry_run = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            path if plan_path.is_none() => plan_path = Some(path.to_string()),
            extra => bail!("unexpected argument {extra}"),
        }
    }
    let plan_path = plan_path.context("usage: shipalloc <plan.json> [--dry-run]")?;
    Ok(Args { plan_path, dry_run })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    shipalloc_observability::init();

    let args = parse_args()?;
    let raw = std::fs::read_to_string(&args.plan_path)
        .with_context(|| format!("failed to read {}", args.plan_path))?;
    let plan = Plan::from_json(&raw)?;

    if args.dry_run {
        tracing::info!("dry run: labels are issued by the in-memory API");
        run(&plan, InMemoryLabelApi::new()).await
    } else {
        let config = LabelApiConfig::from_env().context("label API is not configured")?;
        run(&plan, HttpLabelApi::new(config)?).await
    }
}

async fn run<A: LabelIssuanceApi>(plan: &Plan, api: A) -> Result<ExitCode> {
    let set = plan.build()?;
    let coordinator = LabelIssuanceCoordinator::new(api, plan.directory());
    let outcome = match coordinator
        .submit(&set, &plan.order.shipping_address, |label| {
            tracing::info!(label_url = %label.label_url, draft = %label.draft_name, "label ready");
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(IssuanceError::Validation(issues)) => {
            print_json(&json!({ "validationIssues": issues }))?;
            return Ok(ExitCode::from(EXIT_INVALID));
        }
        Err(other) => return Err(other.into()),
    };

    match outcome.into_result() {
        Ok(labels) => {
            print_json(&json!({ "labels": labels }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            print_json(&json!({
                "labels": failure.labels,
                "failedDraft": { "id": failure.failed_draft, "name": failure.error.draft_name() },
                "error": failure.error.to_string(),
                "untried": failure.untried,
            }))?;
            Ok(ExitCode::from(EXIT_PARTIAL))
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

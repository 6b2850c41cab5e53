//! One-shot status: log in, refresh once, summarize.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusReport {
    profile: String,
    base_url: String,
    username: String,
    session: String,
    state: String,
    last_success: Option<DateTime<Utc>>,
    data_age_secs: Option<i64>,
    devices: Vec<String>,
}

fn detail(r: &StatusReport) -> String {
    let last = r
        .last_success
        .map_or_else(|| "-".into(), |t| t.to_rfc3339());
    let age = r
        .data_age_secs
        .map_or_else(|| "-".into(), |s| format!("{s}s"));
    let devices = if r.devices.is_empty() {
        "(none online)".into()
    } else {
        r.devices.join(", ")
    };
    [
        format!("Profile:      {}", r.profile),
        format!("Portal:       {}", r.base_url),
        format!("Username:     {}", r.username),
        format!("Session:      {}", r.session),
        format!("State:        {}", r.state),
        format!("Last update:  {last}"),
        format!("Data age:     {age}"),
        format!("Devices:      {devices}"),
    ]
    .join("\n")
}

pub async fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = super::connect(resolved).await?;
    let snapshot = coordinator.snapshot();

    let report = StatusReport {
        profile: resolved.profile_name.clone(),
        base_url: coordinator.source().base_url().to_string(),
        username: coordinator.source().username().to_string(),
        session: format!("{:?}", coordinator.source().session_state()),
        state: format!("{:?}", coordinator.current_state()),
        last_success: coordinator.last_success(),
        data_age_secs: coordinator.store().data_age().map(|d| d.num_seconds()),
        devices: snapshot.serials().map(str::to_string).collect(),
    };

    let out = output::render_single(&global.output, &report, detail, |r| r.state.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

//! `watch`: run the scheduler and print every published snapshot.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ilex_core::{CoordinatorState, MIN_SCAN_INTERVAL, SessionState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::devices;

pub async fn handle(
    args: WatchArgs,
    mut resolved: Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        let interval = Duration::from_secs(secs);
        if interval < MIN_SCAN_INTERVAL {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: format!("must be at least {} seconds", MIN_SCAN_INTERVAL.as_secs()),
            });
        }
        resolved.bridge.scan_interval = interval;
    }

    let coordinator = super::connect(&resolved).await?;
    let mut snapshots = coordinator.subscribe();
    let mut state = coordinator.state();
    let mut session = coordinator.source().subscribe_session();

    let cancel = CancellationToken::new();
    let scheduler = coordinator.start(cancel.clone());
    info!(
        interval_secs = coordinator.scan_interval().as_secs(),
        "watching for updates (Ctrl-C to stop)"
    );

    let print = |global: &GlobalOpts| -> Result<(), CliError> {
        let ctx = coordinator.entity_context();
        let views = devices::entity_views(&ctx, args.serial.as_deref());
        if matches!(global.output, OutputFormat::Table) && !global.quiet {
            println!("── {} ──", Utc::now().to_rfc3339());
        }
        let out = devices::render_entities(&views, global)?;
        output::print_output(&out, global.quiet);
        Ok(())
    };

    print(global)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            snap = snapshots.changed() => {
                if snap.is_none() {
                    break Ok(());
                }
                if let Err(e) = print(global) {
                    break Err(e);
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = state.borrow_and_update().clone();
                match current {
                    CoordinatorState::ReauthRequired => {
                        break Err(CliError::ReauthRequired {
                            profile: resolved.profile_name.clone(),
                        });
                    }
                    CoordinatorState::UpdateFailed { message } => {
                        warn!(%message, "update failed, entities unavailable until the next cycle");
                    }
                    _ => {}
                }
            }
            changed = session.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *session.borrow_and_update();
                match current {
                    SessionState::Stale => info!("portal session expired, renewing"),
                    other => debug!(session = ?other, "session state changed"),
                }
            }
        }
    };

    stop_scheduler(&cancel, scheduler).await;
    outcome
}

/// Cancel the refresh task and wait for it. Returns `false` if the task
/// panicked or was aborted instead of stopping cleanly.
async fn stop_scheduler(cancel: &CancellationToken, scheduler: JoinHandle<()>) -> bool {
    cancel.cancel();
    match scheduler.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "refresh task ended abnormally");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_scheduler_stop() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { token.cancelled().await });
        assert!(stop_scheduler(&cancel, handle).await);
    }

    #[tokio::test]
    async fn panicked_scheduler_is_reported() {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async { panic!("refresh task blew up") });
        assert!(!stop_scheduler(&cancel, handle).await);
    }
}

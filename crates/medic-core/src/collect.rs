//! The administrator's current problem list.
//!
//! Realtime checks run now. Scheduled checks are not run; instead each one
//! whose tracker is `Broken` contributes its standing problem. A realtime
//! check that errors is reported as a problem of its own so the rest of the
//! list is still produced.

use tracing::error;

use crate::data::CheckData;
use crate::definition::HealthState;
use crate::error::CheckResult;
use crate::problem::Problem;
use crate::runner::CheckRunner;

/// Gather problems across all registered checks.
///
/// Tracker store failures are returned; check failures are not.
pub async fn collect_problems(runner: &CheckRunner) -> CheckResult<Vec<Problem>> {
    let mut problems = Vec::new();
    let no_data = CheckData::new();

    for registered in runner.registry().realtime() {
        match runner.run(registered, &no_data).await {
            Ok(found) => problems.extend(found),
            Err(e) => {
                error!(
                    identifier = %registered.identifier(),
                    error = %e,
                    "realtime problem check failed"
                );
                problems.push(runner.failure_problem(registered, &e));
            }
        }
    }

    for registered in runner.registry().scheduled() {
        let Some(tracker) = runner.store().get(registered.identifier())? else {
            continue;
        };
        if registered.definition().health_state(tracker.blips) == HealthState::Broken {
            problems.extend(runner.standing_problem(registered));
        }
    }

    Ok(problems)
}

//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_LIMITS;
use crate::run::abort_reason_name;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use mpstream_core::error::{AbortReason, BuildError, MpError};

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingLeftAxis => {
                "What happened: No left axis was provided to the coordinator.\nLikely causes: The left controller or profile was not wired into the builder.\nHow to fix: Pass a device and profile via with_left(...).".to_string()
            }
            BuildError::MissingRightAxis => {
                "What happened: No right axis was provided to the coordinator.\nLikely causes: The right controller or profile was not wired into the builder.\nHow to fix: Pass a device and profile via with_right(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(me) = err.downcast_ref::<MpError>() {
        return match me {
            MpError::Timeout => {
                "What happened: A motor controller did not answer in time.\nLikely causes: Bus disconnected, controller unpowered, or wrong device id.\nHow to fix: Check the bus wiring and power, then run `mpstream self-check`.".to_string()
            }
            MpError::EmptyProfile => {
                "What happened: A motion profile has no points.\nLikely causes: The CSV only contains its header line.\nHow to fix: Add at least one position,velocity,duration_ms row.".to_string()
            }
            MpError::Abort(AbortReason::MaxRuntime) => {
                "max run time was exceeded before both axes finished.\nLikely causes: Profile longer than runner.max_run_ms, an axis that was never armed, or a profile too short to buffer.\nHow to fix: Increase runner.max_run_ms (or --max-run-ms), check coordinator.arm, or give each profile more points than streaming.min_points_in_device.".to_string()
            }
            MpError::Abort(AbortReason::Shutdown) => {
                "What happened: The maneuver was interrupted.\nLikely causes: Ctrl-C or a termination signal.\nHow to fix: Both axes were disabled; start a new run when ready.".to_string()
            }
            MpError::HardwareFault(msg) => {
                format!(
                    "What happened: Motor controller fault ({msg}).\nLikely causes: Controller lost power or the bus dropped.\nHow to fix: Power-cycle the controller and check wiring."
                )
            }
            other => {
                format!(
                    "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
                )
            }
        };
    }

    // String-based heuristics for errors coming from config or profile loading
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("profile csv must have headers") {
        return "Invalid headers in profile CSV. Expected 'position,velocity,duration_ms'.".to_string();
    }

    if lower.contains("no left profile") || lower.contains("no right profile") {
        return format!(
            "What happened: {msg}.\nLikely causes: The config has no [axes.*].profile entry and no flag was given.\nHow to fix: Pass --left/--right or set the profile paths in the config."
        );
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid ({err:#}).\nLikely causes: Out-of-range or mistyped values in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map AbortReason (if present) to stable exit codes; other errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use mpstream_core::error::{AbortReason, MpError};
    if let Some(MpError::Abort(reason)) = err.downcast_ref::<MpError>() {
        return match reason {
            AbortReason::Shutdown => 2,
            AbortReason::MaxRuntime => 4,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use mpstream_core::error::{AbortReason, MpError};
    use serde_json::json;

    if let Some(MpError::Abort(reason)) = err.downcast_ref::<MpError>() {
        let msg = humanize(err);
        let reason_name = abort_reason_name(reason);
        let detail_obj = match reason {
            AbortReason::MaxRuntime => LAST_LIMITS
                .get()
                .map(|l| json!({ "max_run_ms": l.max_run_ms, "control_period_ms": l.control_period_ms })),
            AbortReason::Shutdown => None,
        };

        let obj = if let Some(d) = detail_obj {
            json!({ "reason": reason_name, "details": d, "message": msg })
        } else {
            json!({ "reason": reason_name, "message": msg })
        };
        return obj.to_string();
    }

    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}

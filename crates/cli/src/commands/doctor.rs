use std::process::Command;

use perch_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };
    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            None
        }
    };

    match &config {
        Some(config) => checks.push(check_required_variables(config)),
        None => checks.push(skipped("required_variables")),
    }

    checks.push(check_toolbox_binary());
    checks.push(check_gcloud_credentials());

    match &config {
        Some(config) => checks.push(check_toolbox_server(config)),
        None => checks.push(skipped("toolbox_server")),
    }

    finalize_report(checks)
}

fn finalize_report(checks: Vec<DoctorCheck>) -> DoctorReport {
    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all preflight checks passed".to_string()
    } else {
        "doctor: one or more preflight checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

/// The env contract mirrors the deployment's `.env`: identifiers may be
/// absent (the tool drops out) but the doctor should say so, and values
/// still carrying template placeholders count as unset.
fn check_required_variables(config: &AppConfig) -> DoctorCheck {
    let mut problems = Vec::new();

    for field in config.datastore.missing_required() {
        problems.push(format!("datastore.{field} is not set"));
    }
    for field in config.database.missing_required() {
        problems.push(format!("database.{field} is not set"));
    }

    let placeholder_fields = [
        ("datastore.project_id", config.datastore.project_id.as_str()),
        ("datastore.engine_id", config.datastore.engine_id.as_str()),
        ("database.host", config.database.host.as_str()),
        ("database.user", config.database.user.as_str()),
    ];
    for (name, value) in placeholder_fields {
        if looks_placeholder(value) {
            problems.push(format!("{name} still has a placeholder value"));
        }
    }

    if problems.is_empty() {
        DoctorCheck {
            name: "required_variables",
            status: CheckStatus::Pass,
            details: "all required variables are set".to_string(),
        }
    } else {
        DoctorCheck {
            name: "required_variables",
            status: CheckStatus::Fail,
            details: problems.join("; "),
        }
    }
}

fn looks_placeholder(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value.starts_with("your-") || value.ends_with("-here")
}

fn check_toolbox_binary() -> DoctorCheck {
    match which::which("toolbox") {
        Ok(path) => DoctorCheck {
            name: "toolbox_binary",
            status: CheckStatus::Pass,
            details: format!("toolbox found at `{}`", path.display()),
        },
        Err(_) => DoctorCheck {
            name: "toolbox_binary",
            status: CheckStatus::Fail,
            details: "toolbox binary not found on PATH".to_string(),
        },
    }
}

fn check_gcloud_credentials() -> DoctorCheck {
    let output = Command::new("gcloud")
        .args(["auth", "list", "--filter=status:ACTIVE", "--format=value(account)"])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            match stdout.lines().find(|line| !line.trim().is_empty()) {
                Some(account) => DoctorCheck {
                    name: "gcloud_credentials",
                    status: CheckStatus::Pass,
                    details: format!("authenticated as {}", account.trim()),
                },
                None => DoctorCheck {
                    name: "gcloud_credentials",
                    status: CheckStatus::Fail,
                    details: "no active account; run `gcloud auth application-default login`"
                        .to_string(),
                },
            }
        }
        Ok(output) => DoctorCheck {
            name: "gcloud_credentials",
            status: CheckStatus::Fail,
            details: format!(
                "gcloud auth list failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        },
        Err(error) => DoctorCheck {
            name: "gcloud_credentials",
            status: CheckStatus::Fail,
            details: format!("could not run gcloud: {error}"),
        },
    }
}

fn check_toolbox_server(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "toolbox_server",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let url = format!("{}/api/tool/{}", config.toolbox.base_url, config.toolbox.tool_name);
    let result = runtime.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.toolbox.timeout_secs))
            .build()
            .map_err(|error| format!("could not build http client: {error}"))?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|error| format!("could not reach the toolbox at {}: {error}", config.toolbox.base_url))?;
        if response.status().is_success() {
            Ok::<(), String>(())
        } else {
            Err(format!("toolbox responded with status {} for `{url}`", response.status()))
        }
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "toolbox_server",
            status: CheckStatus::Pass,
            details: format!("tool `{}` is declared and reachable", config.toolbox.tool_name),
        },
        Err(details) => DoctorCheck { name: "toolbox_server", status: CheckStatus::Fail, details },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{
        finalize_report, looks_placeholder, render_human, skipped, CheckStatus, DoctorCheck,
    };

    #[test]
    fn placeholder_values_are_detected() {
        assert!(looks_placeholder("your-engine-id-here"));
        assert!(looks_placeholder("YOUR-MYSQL-HOST"));
        assert!(!looks_placeholder("boutique-prod"));
        assert!(!looks_placeholder(""));
    }

    #[test]
    fn overall_status_fails_unless_every_check_passes() {
        let report = finalize_report(vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "ok".to_string(),
            },
            skipped("toolbox_server"),
        ]);

        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert!(report.summary.contains("failed"));
    }

    #[test]
    fn overall_status_passes_when_all_checks_pass() {
        let report = finalize_report(vec![DoctorCheck {
            name: "config_validation",
            status: CheckStatus::Pass,
            details: "ok".to_string(),
        }]);

        assert_eq!(report.overall_status, CheckStatus::Pass);
    }

    #[test]
    fn human_rendering_marks_each_check() {
        let report = finalize_report(vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            },
            DoctorCheck {
                name: "toolbox_binary",
                status: CheckStatus::Fail,
                details: "toolbox binary not found on PATH".to_string(),
            },
        ]);

        let rendered = render_human(&report);
        assert!(rendered.contains("- [ok] config_validation: configuration loaded and validated"));
        assert!(rendered.contains("- [fail] toolbox_binary: toolbox binary not found on PATH"));
    }
}

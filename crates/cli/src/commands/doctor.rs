use std::sync::Arc;

use budgetbook_core::config::{AppConfig, LoadOptions};
use budgetbook_store::{ByteStore, FsByteStore, Presence, RegistryStore};
use serde::Serialize;

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

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(check_storage(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["data_dir_writable", "registry_readable"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_storage(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck {
                name: "data_dir_writable",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            }];
        }
    };

    let storage = Arc::new(FsByteStore::new(&config.storage.data_dir));
    runtime.block_on(async {
        let writable = check_writable(storage.as_ref()).await;
        let readable = check_registry(Arc::clone(&storage), &config.storage.registry_path).await;
        vec![writable, readable]
    })
}

async fn check_writable(storage: &FsByteStore) -> DoctorCheck {
    const SCRATCH: &str = ".budgetbook-doctor";

    let result = async {
        storage.mkdir("", true).await?;
        storage.write(SCRATCH, b"ok").await?;
        storage.delete(SCRATCH).await
    }
    .await;

    match result {
        Ok(()) => DoctorCheck {
            name: "data_dir_writable",
            status: CheckStatus::Pass,
            details: format!("wrote a scratch file under `{}`", storage.root().display()),
        },
        Err(error) => DoctorCheck {
            name: "data_dir_writable",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

async fn check_registry(storage: Arc<FsByteStore>, registry_path: &str) -> DoctorCheck {
    match storage.stat(registry_path).await {
        Ok(Presence::NotFound) => {
            return DoctorCheck {
                name: "registry_readable",
                status: CheckStatus::Pass,
                details: format!("`{registry_path}` not created yet; starts empty"),
            };
        }
        Ok(Presence::Exists) => {}
        Err(error) => {
            return DoctorCheck {
                name: "registry_readable",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    }

    let registry = RegistryStore::new(storage, registry_path);
    let customers = registry.load(false).await;
    match registry.last_load_failure().await {
        None => DoctorCheck {
            name: "registry_readable",
            status: CheckStatus::Pass,
            details: format!("{} customer(s) in `{registry_path}`", customers.len()),
        },
        Some(error) => DoctorCheck {
            name: "registry_readable",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
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

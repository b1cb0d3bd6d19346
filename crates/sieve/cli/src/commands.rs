//! Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Serialize;
use sieve_engine::{replay as replay_trace, static_registry, CancellationToken, DecisionTrace, Engine};
use sieve_policy::{ConfigHandle, EngineConfig};
use tracing::info;

use crate::advisor::FileAdvisor;
use crate::evidence::EvidenceFile;
use crate::output::{print_single, OutputFormat};

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            EngineConfig::load(path).with_context(|| format!("loading configuration {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

pub async fn assess(
    evidence: &Path,
    config: Option<&Path>,
    advisory: Option<&Path>,
    trace_out: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let file = EvidenceFile::load(evidence)?;
    let registry = static_registry(file.fragments)?;

    let mut engine = Engine::new(registry, Arc::new(ConfigHandle::new(config)?));
    if let Some(path) = advisory {
        engine = engine.with_advisor(Arc::new(FileAdvisor::load(path)?));
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let assessment = engine.assess(file.input, cancel).await;

    if let Some(path) = trace_out {
        std::fs::write(path, assessment.trace.to_json()?)
            .with_context(|| format!("writing trace {}", path.display()))?;
        info!(path = %path.display(), trace_id = %assessment.trace.trace_id, "trace written");
    }

    print_single(&assessment.response, format)
}

pub fn replay(trace: &Path, config: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let contents =
        std::fs::read_to_string(trace).with_context(|| format!("reading trace {}", trace.display()))?;
    let trace = DecisionTrace::from_json(&contents)?;

    let response = replay_trace(&trace, &config);
    if response != trace.response {
        eprintln!("replayed response differs from the recorded one");
    }
    print_single(&response, format)
}

#[derive(Serialize)]
struct ConfigSummary {
    path: String,
    fingerprint: String,
    valid: bool,
}

pub fn check_config(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("configuration file not found: {}", path.display());
    }
    let config = load_config(Some(path))?;
    print_single(
        &ConfigSummary {
            path: path.display().to_string(),
            fingerprint: config.fingerprint(),
            valid: true,
        },
        format,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn check_config_rejects_invalid_thresholds() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[thresholds]\nescalate = 80\nblock = 60\n").unwrap();
        assert!(check_config(file.path(), OutputFormat::Json).is_err());
    }

    #[test]
    fn check_config_requires_an_existing_file() {
        let err = check_config(Path::new("/nonexistent/sieve.toml"), OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn assess_writes_a_replayable_trace() {
        let dir = tempfile::tempdir().unwrap();
        let evidence = dir.path().join("evidence.json");
        std::fs::write(
            &evidence,
            r#"{
                "input": { "message_id": "<cli-1>", "sender": "a@example.com", "subject": "Hello" },
                "fragments": [
                    { "slot": "header_auth", "data": { "spf": "pass", "dkim": "pass", "dmarc": "pass", "aligned": true } },
                    { "slot": "quick_features", "data": { "sender_domain": "example.com" } }
                ]
            }"#,
        )
        .unwrap();
        let trace_path = dir.path().join("trace.json");

        assess(&evidence, None, None, Some(&trace_path), OutputFormat::Json)
            .await
            .unwrap();

        let trace = DecisionTrace::from_json(&std::fs::read_to_string(&trace_path).unwrap()).unwrap();
        assert_eq!(trace.request_id.as_str(), "<cli-1>");
        assert_eq!(replay_trace(&trace, &EngineConfig::default()), trace.response);
        replay(&trace_path, None, OutputFormat::Yaml).unwrap();
    }
}

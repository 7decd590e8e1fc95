use anyhow::{bail, Context};
use proseguard_lib::init_logging;
use proseguard_lib::services::config_store::{AppConfig, ConfigStore};
use proseguard_lib::services::detection::{
    DecisionPolicy, Ensemble, EnsembleConfig, EnsembleMember, LexicalClassifier,
    LEXICAL_CLASSIFIER_NAME,
};
use proseguard_lib::services::providers::{parse_classifier_spec, Classifier, HttpClassifier};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "Usage:\n  explain_text <path.txt> [options]\n  explain_text --text <string> [options]\n\nOptions:\n  --endpoint <name=url>   remote classifier (repeatable)\n  --config <path>         config file (default: platform config dir)\n  --explain               explain the primary member's prediction\n  --policy <dual|single|any>\n  --out <json_path>       also write the JSON response to a file\n\nWithout endpoints (on the command line or in the config file) the built-in\nlexical classifier is used.";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_arg_values(args: &[String], key: &str) -> Vec<String> {
    args.iter()
        .enumerate()
        .filter(|(_, a)| *a == key)
        .filter_map(|(i, _)| args.get(i + 1).cloned())
        .collect()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn load_config(path: Option<String>) -> anyhow::Result<AppConfig> {
    let store = match path {
        Some(p) => ConfigStore::with_file(PathBuf::from(p)),
        None => match ConfigStore::default_config_dir() {
            Some(dir) => ConfigStore::new(dir),
            None => return Ok(AppConfig::default()),
        },
    };
    store.load().map_err(anyhow::Error::msg)
}

/// Build the ensemble from CLI endpoints and configured classifiers,
/// falling back to the lexical classifier when none are available.
fn build_ensemble(
    config: AppConfig,
    endpoints: &[String],
    policy: Option<DecisionPolicy>,
) -> anyhow::Result<Ensemble> {
    let mut configured: Vec<_> = config.classifiers.iter().collect();
    configured.sort_by(|a, b| a.0.cmp(b.0));
    let mut remotes: Vec<HttpClassifier> = configured
        .into_iter()
        .map(|(name, ep)| {
            HttpClassifier::new(name, &ep.base_url, ep.timeout_secs, &config.api_keys)
        })
        .collect();
    for raw in endpoints {
        let spec = parse_classifier_spec(raw);
        remotes.retain(|c| c.name() != spec.name);
        remotes.push(HttpClassifier::from_spec(&spec, None, &config.api_keys));
    }

    let mut ensemble_config = if remotes.is_empty() {
        info!("[CLI] no remote classifiers configured, using lexical classifier");
        EnsembleConfig {
            labels: config.ensemble.labels.clone(),
            ..EnsembleConfig::single(LEXICAL_CLASSIFIER_NAME, "AI")
        }
    } else if remotes
        .iter()
        .all(|c| config.ensemble.members.iter().any(|m| m.name == c.name()))
    {
        config.ensemble.clone()
    } else {
        // Ad-hoc endpoints: equal weights, first one explained
        let weight = 1.0 / remotes.len() as f64;
        let members: Vec<EnsembleMember> = remotes
            .iter()
            .map(|c| EnsembleMember::new(c.name(), "AI", weight))
            .collect();
        EnsembleConfig {
            primary: members[0].name.clone(),
            members,
            ..config.ensemble.clone()
        }
    };
    if let Some(policy) = policy {
        ensemble_config.policy = policy;
    }

    let mut ensemble =
        Ensemble::new(ensemble_config, config.explanation).map_err(anyhow::Error::msg)?;
    if remotes.is_empty() {
        ensemble = ensemble.with_classifier(Arc::new(LexicalClassifier::new()));
    }
    for remote in remotes {
        ensemble = ensemble.with_classifier(Arc::new(remote));
    }
    Ok(ensemble)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    let text = match parse_arg_value(&args, "--text") {
        Some(t) => t,
        None if !args[1].starts_with("--") => std::fs::read_to_string(&args[1])
            .with_context(|| format!("read file failed: {}", args[1]))?,
        None => bail!("no input: pass a file path or --text\n\n{}", USAGE),
    };
    if text.trim().is_empty() {
        bail!("input text is empty");
    }

    init_logging();

    let config = load_config(parse_arg_value(&args, "--config"))?;
    let endpoints = parse_arg_values(&args, "--endpoint");
    let policy = parse_arg_value(&args, "--policy").map(|p| DecisionPolicy::from_str(&p));
    let include_explanations = has_flag(&args, "--explain");
    let out_path = parse_arg_value(&args, "--out");

    let ensemble = build_ensemble(config, &endpoints, policy)?;
    let response = ensemble.ensemble_predict(&text, include_explanations).await;

    let json = serde_json::to_string_pretty(&response)?;
    println!("{}", json);

    if let Some(out) = out_path {
        std::fs::write(&out, &json).with_context(|| format!("write failed: {}", out))?;
        eprintln!("Wrote: {}", out);
    }

    Ok(())
}

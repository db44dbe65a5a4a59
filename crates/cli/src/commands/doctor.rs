//! `orbitchat doctor`: report configuration and credential status.
//!
//! Secrets are never printed, only whether they are present.

use orbitchat_agent::Vocabulary;
use orbitchat_config::AppConfig;
use orbitchat_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("OrbitChat doctor");
    println!("================\n");

    // `load` reads `.env` first, so the path is resolved after it.
    let loaded = AppConfig::load();
    let config_path = AppConfig::config_path(|key| std::env::var(key).ok());
    if config_path.exists() {
        println!("  [ok]   Config file found at {}", config_path.display());
    } else {
        println!("  [info] No config file at {}, using defaults", config_path.display());
    }

    let config = match loaded {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] Configuration invalid: {e}");
            println!("\n  1 issue found. Fix the config and run `orbitchat doctor` again.");
            return Err(e.into());
        }
    };

    let mut report = checks(&config);
    if config.has_api_key() {
        let provider = orbitchat_providers::build_from_config(&config);
        report.record(reachability(provider.as_ref()).await);
    }
    for line in &report.lines {
        println!("  {line}");
    }

    println!();
    if report.issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {} issue(s) found. See above for details.", report.issues);
    }

    Ok(())
}

struct Report {
    lines: Vec<String>,
    issues: usize,
}

impl Report {
    fn record(&mut self, (line, ok): (String, bool)) {
        self.lines.push(line);
        if !ok {
            self.issues += 1;
        }
    }
}

/// Ask the chat API whether it is reachable with the configured key.
async fn reachability(provider: &dyn Provider) -> (String, bool) {
    match provider.health_check().await {
        Ok(true) => (format!("[ok]   Chat API reachable ({})", provider.name()), true),
        Ok(false) => (
            format!("[warn] Chat API ({}) answered but rejected the health check", provider.name()),
            false,
        ),
        Err(e) => (format!("[warn] Chat API unreachable: {e}"), false),
    }
}

fn checks(config: &AppConfig) -> Report {
    let mut lines = Vec::new();
    let mut issues = 0;

    if config.has_api_key() {
        lines.push("[ok]   Chat API key configured".to_string());
    } else {
        lines.push("[warn] No chat API key: set OPENAI_API_KEY (chat will answer 503)".to_string());
        issues += 1;
    }

    if config.has_data_key() {
        lines.push("[ok]   NASA API key configured".to_string());
    } else {
        lines.push("[warn] No NASA API key: set NASA_API_KEY (replies won't include live data)".to_string());
        issues += 1;
    }

    lines.push(format!("[info] Model:      {}", config.default_model));
    lines.push(format!("[info] Chat API:   {}", config.api_url));
    lines.push(format!("[info] NASA API:   {}", config.space_data.base_url));
    lines.push(format!("[info] Listen:     http://{}", config.gateway.addr()));

    let vocabulary = Vocabulary::from_config(&config.classifier);
    let source = if config.classifier.vocabulary.is_some() { "custom" } else { "built-in" };
    lines.push(format!("[info] Vocabulary: {} terms ({source})", vocabulary.len()));

    Report { lines, issues }
}

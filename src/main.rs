// =============================================================================
// Momentum Gate: Main Entry Point
// =============================================================================
//
// Usage: momentum-gate <request.json>
//
// The request carries one scoring input, its market context and optional
// measurement snapshots; the explanation JSON is printed to stdout.
// =============================================================================

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use momentum_gate::{DecisionEngine, EngineConfig, MarketContext, ScoringInput, StaticMeasurements};

const DEFAULT_CONFIG_PATH: &str = "engine_config.json";

#[derive(Debug, Deserialize)]
struct Request {
    input: ScoringInput,
    market: MarketContext,
    #[serde(default)]
    measurements: Option<StaticMeasurements>,
}

fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("MOMENTUM_GATE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = EngineConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    let engine = DecisionEngine::new(config).context("invalid engine configuration")?;

    // ── 2. Request ───────────────────────────────────────────────────────
    let Some(request_path) = std::env::args().nth(1) else {
        bail!("usage: momentum-gate <request.json>");
    };
    let raw = std::fs::read_to_string(&request_path)
        .with_context(|| format!("reading request {}", request_path))?;
    let request: Request = serde_json::from_str(&raw)
        .with_context(|| format!("parsing request {}", request_path))?;

    // ── 3. Decide & explain ──────────────────────────────────────────────
    let json = match &request.measurements {
        Some(source) => {
            let decision =
                engine.evaluate_with_measurements(&request.input, &request.market, source);
            info!(summary = %decision.explanation, "decision complete");
            decision.explanation.to_json()?
        }
        None => {
            let decision = engine.evaluate(&request.input, &request.market);
            info!(summary = %decision.explanation, "decision complete");
            decision.explanation.to_json()?
        }
    };

    println!("{}", json);
    Ok(())
}

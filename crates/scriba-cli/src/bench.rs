//! Benchmark harness: processes a directory of test articles and reports
//! latency and token statistics.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use scriba_llm::UsageTrackingMiddleware;
use scriba_pipeline::Orchestrator;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub title: String,
    pub latency_secs: f64,
    pub total_tokens: u64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RunMetrics {
    fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenStats {
    pub mean: f64,
    pub median: f64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BenchStats {
    pub total_runs: usize,
    pub successful_runs: usize,
    pub error_rate: f64,
    pub latency: LatencyStats,
    pub tokens: TokenStats,
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    runs: Vec<RunMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_run(&mut self, run: RunMetrics) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[RunMetrics] {
        &self.runs
    }

    pub fn statistics(&self) -> BenchStats {
        let successes: Vec<&RunMetrics> = self.runs.iter().filter(|r| r.is_success()).collect();
        let error_count = self.runs.len() - successes.len();

        let mut latencies: Vec<f64> = successes.iter().map(|r| r.latency_secs).collect();
        latencies.sort_by(|a, b| a.total_cmp(b));
        let mut tokens: Vec<u64> = successes.iter().map(|r| r.total_tokens).collect();
        tokens.sort_unstable();

        BenchStats {
            total_runs: self.runs.len(),
            successful_runs: successes.len(),
            error_rate: if self.runs.is_empty() {
                0.0
            } else {
                error_count as f64 / self.runs.len() as f64 * 100.0
            },
            latency: LatencyStats {
                mean: mean_f64(&latencies),
                median: percentile(&latencies, 0.50),
                p95: percentile(&latencies, 0.95),
                p99: percentile(&latencies, 0.99),
                min: latencies.first().copied().unwrap_or(0.0),
                max: latencies.last().copied().unwrap_or(0.0),
            },
            tokens: TokenStats {
                mean: mean_u64(&tokens),
                median: percentile(&tokens.iter().map(|t| *t as f64).collect::<Vec<_>>(), 0.50),
                total: tokens.iter().sum(),
                min: tokens.first().copied().unwrap_or(0),
                max: tokens.last().copied().unwrap_or(0),
            },
        }
    }

    pub fn print_report(&self) {
        let stats = self.statistics();

        println!("\n{}", "=".repeat(72));
        println!("Benchmark report");
        println!("{}", "=".repeat(72));
        println!("Total runs:      {}", stats.total_runs);
        println!("Successful:      {}", stats.successful_runs);
        println!("Error rate:      {:.2}%", stats.error_rate);

        if stats.successful_runs > 0 {
            println!("\nLatency (secs)");
            println!("  mean:   {:.2}", stats.latency.mean);
            println!("  median: {:.2}", stats.latency.median);
            println!("  p95:    {:.2}", stats.latency.p95);
            println!("  p99:    {:.2}", stats.latency.p99);
            println!(
                "  min/max: {:.2} / {:.2}",
                stats.latency.min, stats.latency.max
            );

            println!("\nTokens");
            println!("  mean:   {:.0}", stats.tokens.mean);
            println!("  median: {:.0}", stats.tokens.median);
            println!("  total:  {}", stats.tokens.total);
            println!("  min/max: {} / {}", stats.tokens.min, stats.tokens.max);
        }

        let errors: Vec<&RunMetrics> = self.runs.iter().filter(|r| !r.is_success()).collect();
        if !errors.is_empty() {
            println!("\nErrors ({}):", errors.len());
            for run in errors.iter().take(5) {
                println!(
                    "  {}: {}",
                    run.title,
                    run.error_message.as_deref().unwrap_or("unknown error")
                );
            }
        }
        println!("{}", "=".repeat(72));
    }

    /// Write the full report (statistics plus per-run data) as JSON.
    pub fn write_report(&self, path: &Path) -> anyhow::Result<()> {
        let report = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "statistics": self.statistics(),
            "runs": self.runs,
        });
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report saved to {}", path.display());
        Ok(())
    }
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn mean_u64(values: &[u64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<u64>() as f64 / values.len() as f64
    }
}

/// Nearest-rank percentile over pre-sorted data.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[index]
}

// ---------------------------------------------------------------------------
// Benchmark driver
// ---------------------------------------------------------------------------

/// Run the pipeline over every supported article in `dir`.
pub async fn run_bench(dir: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let mut articles: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(scriba_extract::allowed_file)
                .unwrap_or(false)
        })
        .collect();
    articles.sort();

    anyhow::ensure!(
        !articles.is_empty(),
        "No .pdf or .txt articles found in {}",
        dir.display()
    );
    println!("Benchmarking {} articles from {}", articles.len(), dir.display());

    let usage = UsageTrackingMiddleware::new();
    let client = scriba_llm::CompletionClient::from_env()?.with_middleware(usage.clone());
    let orchestrator = Orchestrator::new(
        std::sync::Arc::new(client),
        scriba_pipeline::PipelineConfig::from_env(),
    );

    let mut collector = MetricsCollector::new();

    for path in &articles {
        let title = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        println!("Processing {title}...");

        let tokens_before = usage.total_tokens();
        let started = Instant::now();

        let run = match scriba_extract::extract_article_text(path) {
            Ok(text) => orchestrator.run(&text).await.map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };

        let latency_secs = started.elapsed().as_secs_f64();
        let total_tokens = usage.total_tokens() - tokens_before;

        match run {
            Ok(_) => collector.add_run(RunMetrics {
                title,
                latency_secs,
                total_tokens,
                status: "success".into(),
                error_message: None,
            }),
            Err(e) => collector.add_run(RunMetrics {
                title,
                latency_secs,
                total_tokens,
                status: "error".into(),
                error_message: Some(e.to_string()),
            }),
        }
    }

    collector.print_report();
    if let Some(path) = output {
        collector.write_report(path)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

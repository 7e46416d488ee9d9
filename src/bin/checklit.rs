use anyhow::{bail, Context, Result};
use checklit_lib::models::{AnalysisReport, CompareReport};
use checklit_lib::services::{
    extract_file, load_config_file, segment_sentences, AppConfig, Analyzer, ConfigStore,
    PerplexityModel, RemotePerplexityModel, StaticPerplexity,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

const USAGE: &str = "Usage:
  checklit analyze <file> [--perplexity-url <url> | --perplexity <value>]
                   [--config <path>] [--sentences <n>] [--out <json_path>]
  checklit compare <file_a> <file_b> [--config <path>] [--out <json_path>]
  checklit config [--init] [--config <path>]

Notes:
  - Supported inputs: .txt, .pdf, .docx
  - Without --perplexity the model URL comes from --perplexity-url, then CHECKLIT_MODEL_URL,
    then the config file.
  - config --init writes the config to --config <path>, or to the default config directory.
  - If the model is unreachable the detection falls back to a low-confidence heuristic.";

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn load_config(args: &[String]) -> Result<AppConfig> {
    match parse_arg_value(args, "--config") {
        Some(path) => load_config_file(Path::new(&path))
            .with_context(|| format!("failed to load config from {}", path)),
        None => match ConfigStore::default_config_dir() {
            Some(dir) => ConfigStore::new(dir).load().context("failed to load stored config"),
            None => Ok(AppConfig::default()),
        },
    }
}

/// Model URL precedence: command line, then environment, then config.
fn apply_model_url(config: &mut AppConfig, args: &[String]) {
    let env_url = std::env::var("CHECKLIT_MODEL_URL")
        .ok()
        .filter(|u| !u.trim().is_empty());
    if let Some(url) = parse_arg_value(args, "--perplexity-url").or(env_url) {
        config.model.base_url = url;
    }
}

fn read_input(path: &str) -> Result<String> {
    extract_file(Path::new(path)).with_context(|| format!("failed to extract text from {}", path))
}

fn write_json<T: Serialize>(out_path: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(out_path, json).with_context(|| format!("write out failed: {}", out_path))?;
    println!();
    println!("Wrote JSON: {}", out_path);
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    let det = &report.ai_detection;
    println!("Analysis: {}", report.id);
    println!(
        "Text: {} chars, {} words, {} sentences",
        report.text_length, report.stylometry.word_count, report.stylometry.sentence_count
    );
    println!();
    println!(
        "Detection: {} (P(ai)={:.4}, confidence={})",
        det.label,
        det.ai_probability,
        det.confidence.as_str()
    );
    match det.perplexity {
        Some(ppx) => println!(
            "Perplexity: {:.2}  method={:?}  gray_zone={}",
            ppx, det.method, det.in_gray_zone
        ),
        None => println!("Perplexity: unavailable  method={:?}", det.method),
    }
    if let Some(note) = &det.confidence_note {
        println!("Note: {}", note);
    }
    if !det.indicators.is_empty() {
        println!("Indicators: {}", det.indicators.join(", "));
    }
    println!();

    let fv = &report.stylometry;
    println!("Stylometry:");
    println!(
        "  ttr={:.4}  lexical_density={:.4}  vocab_richness={:.4}",
        fv.ttr, fv.lexical_density, fv.vocab_richness
    );
    println!(
        "  entropy={:.4} (norm {:.4})  mtld={:.2}  yules_k={:.2}",
        fv.entropy, fv.entropy_norm, fv.mtld, fv.yules_k
    );
    println!(
        "  sentence length {:.2} ± {:.2}  dialogue_ratio={:.4}",
        fv.avg_sentence_length, fv.sentence_length_std, fv.dialogue_ratio
    );
    for g in &fv.top_ngrams {
        println!("  [{}] x{}", g.ngram, g.count);
    }
    println!();

    let q = &report.quality;
    println!(
        "Readability: LIX {:.2} - {} ({})",
        q.lix_score, q.lix_label, q.lix_description
    );
}

fn print_sentences(text: &str, config: &AppConfig, limit: usize) {
    let sentences = segment_sentences(text, &config.stylometry);
    println!();
    println!("Sentences: {}", sentences.len());
    for (i, s) in sentences.iter().take(limit).enumerate() {
        println!(
            "[S{:04}] bytes=[{},{}] words={}  {}",
            i,
            s.start,
            s.end,
            s.word_count(),
            preview(&s.text, 120)
        );
    }
    if sentences.len() > limit {
        println!("... ({} more sentences)", sentences.len() - limit);
    }
}

async fn run_analysis<M: PerplexityModel>(
    analyzer: &Analyzer<M>,
    text: &str,
) -> Result<AnalysisReport> {
    if let Err(e) = analyzer.model().ensure_initialized().await {
        eprintln!("Model unavailable ({}), using heuristic fallback", e);
    }
    Ok(analyzer.analyze(text).await?)
}

async fn cmd_analyze(args: &[String]) -> Result<()> {
    let Some(path) = args.get(2).filter(|a| !a.starts_with("--")) else {
        bail!("missing input file\n\n{}", USAGE);
    };
    let mut config = load_config(args)?;
    apply_model_url(&mut config, args);

    let text = read_input(path)?;
    println!("File: {}", path);

    let report = match parse_arg_value(args, "--perplexity") {
        Some(raw) => {
            let value: f64 = raw
                .parse()
                .with_context(|| format!("invalid --perplexity value: {}", raw))?;
            let analyzer = Analyzer::new(config.clone(), StaticPerplexity::new(Some(value)))?;
            run_analysis(&analyzer, &text).await?
        }
        None => {
            let model = RemotePerplexityModel::new(config.model.clone());
            let analyzer = Analyzer::new(config.clone(), model)?;
            run_analysis(&analyzer, &text).await?
        }
    };

    print_report(&report);

    if let Some(n) = parse_arg_value(args, "--sentences").and_then(|s| s.parse().ok()) {
        print_sentences(&text, &config, n);
    }

    if let Some(out_path) = parse_arg_value(args, "--out") {
        write_json(&out_path, &report)?;
    }
    Ok(())
}

fn print_comparison(report: &CompareReport) {
    let sim = &report.similarity;
    println!(
        "Similarity: {:.4} ({:?}), distance {:.4}",
        sim.similarity_score, sim.level, sim.distance
    );
    for (name, diff) in &sim.breakdown {
        println!("  {:<22} diff={:.4}", name, diff);
    }
}

async fn cmd_compare(args: &[String]) -> Result<()> {
    let (Some(path_a), Some(path_b)) = (args.get(2), args.get(3)) else {
        bail!("compare needs two input files\n\n{}", USAGE);
    };
    let config = load_config(args)?;
    let text_a = read_input(path_a)?;
    let text_b = read_input(path_b)?;

    let analyzer = Analyzer::new(config, StaticPerplexity::unavailable())?;
    let report = analyzer.compare(&text_a, &text_b);

    println!("A: {}", path_a);
    println!("B: {}", path_b);
    print_comparison(&report);

    if let Some(out_path) = parse_arg_value(args, "--out") {
        write_json(&out_path, &report)?;
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> Result<()> {
    if !has_flag(args, "--init") {
        let config = load_config(args)?;
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    // A missing target is created from defaults; an existing one is rewritten as is.
    let store = match parse_arg_value(args, "--config") {
        Some(path) => ConfigStore::for_file(PathBuf::from(path)),
        None => ConfigStore::new(
            ConfigStore::default_config_dir().context("no config directory on this platform")?,
        ),
    };
    let config = store.load().context("failed to load existing config")?;
    store.save(&config).context("failed to save config")?;
    println!("Wrote config: {}", store.config_file().display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    checklit_lib::init_logging();

    match args[1].as_str() {
        "analyze" => cmd_analyze(&args).await,
        "compare" => cmd_compare(&args).await,
        "config" => cmd_config(&args),
        other => bail!("unknown command: {}\n\n{}", other, USAGE),
    }
}

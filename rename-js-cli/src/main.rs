use anyhow::Context;
use cache_js::timestamp_of;
use cache_js::Cache;
use clap::Parser;
use std::fs;
use std::io::stdout;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tree_js::SourceNode;
use tree_js::Tree;

#[derive(Parser)]
#[command(
  name = "rename-js",
  version,
  about = "Rename local identifiers of a parsed JavaScript tree"
)]
struct Cli {
  /// Tree to optimize, in nested JSON form.
  #[arg(short, long)]
  input: PathBuf,

  /// Output destination; omit for stdout.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Directory holding the persistent build cache; omit to disable caching.
  #[arg(long)]
  cache_dir: Option<PathBuf>,

  /// Indent the JSON output.
  #[arg(long)]
  pretty: bool,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .with_ansi(false)
    .init();

  let args = Cli::parse();
  if let Err(err) = run(&args) {
    eprintln!("error: {err:#}");
    process::exit(1);
  }
}

fn run(args: &Cli) -> anyhow::Result<()> {
  let tree = match &args.cache_dir {
    Some(dir) => optimize_cached(&args.input, dir)?,
    None => optimize_file(&args.input)?,
  };
  write_output(args, &tree)
}

fn optimize_file(input: &Path) -> anyhow::Result<Tree> {
  let text = fs::read_to_string(input)
    .with_context(|| format!("failed to read {}", input.display()))?;
  let source: SourceNode = serde_json::from_str(&text)
    .with_context(|| format!("{} is not a valid tree", input.display()))?;
  let mut tree = Tree::from_source(&source);
  symbol_js::optimize(&mut tree)
    .with_context(|| format!("failed to optimize {}", input.display()))?;
  Ok(tree)
}

/// Stamp covering both the renaming logic and the cache format.
fn producer_version() -> String {
  format!(
    "symbol-js@{}+cache-js@{}",
    symbol_js::VERSION,
    cache_js::PRODUCER_VERSION
  )
}

/// Reuses the tree optimized by an earlier run unless the input changed since.
fn optimize_cached(input: &Path, dir: &Path) -> anyhow::Result<Tree> {
  let modified = fs::metadata(input)
    .and_then(|meta| meta.modified())
    .with_context(|| format!("failed to read {}", input.display()))?;
  let canonical = fs::canonicalize(input)
    .with_context(|| format!("failed to resolve {}", input.display()))?;
  let key = format!("optimized:{}", canonical.display());

  let mut cache =
    Cache::<Tree>::open_with_version(dir, producer_version()).context("failed to open build cache")?;
  if let Some(tree) = cache.read_since(&key, timestamp_of(modified)) {
    tracing::debug!(target: "rename_js", %key, "cache hit");
    cache.close()?;
    return Ok(tree);
  }
  tracing::debug!(target: "rename_js", %key, "cache miss");

  let tree = optimize_file(input)?;
  cache.store(&key, tree.clone())?;
  cache.close()?;
  Ok(tree)
}

fn write_output(args: &Cli, tree: &Tree) -> anyhow::Result<()> {
  let source = tree.to_source();
  let mut json = if args.pretty {
    serde_json::to_vec_pretty(&source)?
  } else {
    serde_json::to_vec(&source)?
  };
  json.push(b'\n');
  match &args.output {
    Some(path) => {
      fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?
    }
    None => stdout()
      .write_all(&json)
      .context("failed to write output")?,
  };
  Ok(())
}

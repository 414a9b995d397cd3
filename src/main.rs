use clap::{Parser, Subcommand};
use picmark::document::{self, DocumentRenderer};
use picmark::proxy::{ProcessingOptions, UrlSigner};
use picmark::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "picmark")]
#[command(about = "Expand [pic] directives in markdown into responsive, proxy-signed pictures")]
#[command(long_about = "\
Expand [pic] directives in markdown into responsive, proxy-signed pictures

A directive that opens a paragraph becomes a <figure> whose <picture>
sources are signed URLs on an image proxy. Text after the directive is
kept as a paragraph below it:

  [pic src=\"img/1.jpg\" ratio=\"4:3\" alt=\"Harbour at dusk\"]
  [pic src=\"img/2.jpg\" orient=\"portrait\" v=\"3\" crop=\"800:600:ce\"]

Attributes:
  src          Image path relative to the proxy namespace, or a full URL
  ratio        W:H or a decimal; a WxH filename suffix (img/1.800x600.jpg)
               takes precedence
  orient       'portrait' flips the default 16:9
  alt          Alternative text (default: \"Image N\")
  id           Anchor id (default: N)
  eager        Load immediately instead of lazily
  v            Cache buster
  crop         W:H[:gravity] crop before resizing

Proxy location and secrets come from picmark.toml or the environment:
  PICMARK_PROXY_HOST  PICMARK_PROXY_NAMESPACE  PICMARK_PROXY_KEY  PICMARK_PROXY_SALT

Run 'picmark gen-config' to generate a documented picmark.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render markdown files (or directories of them) to HTML
    Render {
        /// Markdown files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write HTML here instead of next to each input
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the signed proxy URL for one source
    Sign {
        /// Image path or URL
        source: String,

        /// Resize to this width
        #[arg(long)]
        width: Option<u32>,

        /// Output format extension
        #[arg(long)]
        ext: Option<String>,

        /// Extra processing option as key:value (repeatable)
        #[arg(long = "option", value_name = "KEY:VALUE")]
        options: Vec<String>,

        /// Send the source as plain text instead of base64
        #[arg(long)]
        plain: bool,
    },
    /// Validate configuration and signing secrets
    Check,
    /// Print a stock picmark.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Render { paths, output } => {
            let config = config::load_config(&cli.config)?;
            let signer = UrlSigner::from_proxy_config(&config.proxy)?;
            let renderer = DocumentRenderer::from_config(&signer, &config);
            let inputs = document::collect_markdown(&paths)?;
            init_thread_pool(&config.processing);
            let results = document::render_files(&renderer, &inputs, output.as_deref());
            output::print_render_output(&results);
            let failed = results.iter().filter(|r| r.is_err()).count();
            if failed > 0 {
                return Err(format!("{failed} of {} files failed to render", results.len()).into());
            }
        }
        Command::Sign {
            source,
            width,
            ext,
            options,
            plain,
        } => {
            let config = config::load_config(&cli.config)?;
            let signer = UrlSigner::from_proxy_config(&config.proxy)?;
            let signer = if plain { signer.plain_source(true) } else { signer };
            let options = parse_options(&options)?;
            let url = match width {
                Some(width) => {
                    let ext = ext.as_deref().unwrap_or(&config.images.format);
                    signer.resized_url(&source, width, ext, &options)
                }
                None => signer.processed_url(&source, &options, ext.as_deref()),
            };
            println!("{url}");
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let config = config::load_config(&cli.config)?;
            UrlSigner::from_proxy_config(&config.proxy)?;
            output::print_check_output(&config);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the `warn` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Parse repeated `key:value` flags in the order given.
fn parse_options(raw: &[String]) -> Result<ProcessingOptions, String> {
    let mut options = ProcessingOptions::new();
    for item in raw {
        match item.split_once(':') {
            Some((key, value)) if !key.is_empty() => options.set(key, value),
            _ => return Err(format!("invalid option '{item}', expected key:value")),
        }
    }
    Ok(options)
}

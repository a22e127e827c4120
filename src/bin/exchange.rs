//! Command-line front end for the exchange engine
//!
//! Parses rule attributes and replays viewport changes against an in-memory
//! element, printing which rule wins at each step.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use exchange::{
    ChangeHub, CollectingErrorSink, Exchange, ExchangeConfig, Host, HttpFetcher, MediaQueryMatcher,
    MemoryDocument, MemoryElement, RESIZE_EVENT, RuleParser, Viewport,
};
use std::fs;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "exchange")]
#[command(about = "Resolve responsive content rules against a simulated viewport")]
#[command(version)]
struct Cli {
    /// JSON file with options (`target_attr`, `media_queries`)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a rule attribute and print the rules as JSON
    Parse {
        /// Attribute value, e.g. "[a.jpg, small][b.jpg, large]"
        attribute: String,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Print the rule that wins for one viewport
    Resolve {
        /// Attribute value
        attribute: String,
        /// Viewport width in CSS pixels
        #[arg(long)]
        width: u32,
        #[command(flatten)]
        screen: ScreenArgs,
    },
    /// Walk a viewport through several widths and print every swap
    Simulate {
        /// Attribute value
        attribute: String,
        /// Comma-separated widths, e.g. 320,800,1400
        #[arg(long, value_delimiter = ',', required = true)]
        widths: Vec<u32>,
        /// Fetch markup relative to this URL instead of swapping an image
        #[arg(long)]
        base_url: Option<String>,
        #[command(flatten)]
        screen: ScreenArgs,
    },
}

#[derive(Args, Clone, Copy)]
struct ScreenArgs {
    /// Viewport height in CSS pixels
    #[arg(long, default_value = "800")]
    height: u32,
    /// Device pixel ratio
    #[arg(long, default_value = "1.0")]
    dpr: f64,
}

impl ScreenArgs {
    fn viewport(&self, width: u32) -> Viewport {
        Viewport::new(width, self.height).with_device_pixel_ratio(self.dpr)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new().filter_level(level).init();

    let options = match &cli.config {
        Some(path) => {
            let content =
                fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
            Some(
                serde_json::from_str::<serde_json::Value>(&content)
                    .with_context(|| format!("parsing config '{path}'"))?,
            )
        }
        None => None,
    };

    match cli.command {
        Commands::Parse { attribute, pretty } => handle_parse(&attribute, options.as_ref(), pretty),
        Commands::Resolve {
            attribute,
            width,
            screen,
        } => handle_resolve(&attribute, options.as_ref(), screen.viewport(width)),
        Commands::Simulate {
            attribute,
            widths,
            base_url,
            screen,
        } => handle_simulate(&attribute, options.as_ref(), &widths, base_url, screen).await,
    }
}

fn effective_config(options: Option<&serde_json::Value>) -> ExchangeConfig {
    let mut config = ExchangeConfig::default();
    if let Some(options) = options {
        for err in config.apply_options(options) {
            eprintln!("warning: {err}");
        }
    }
    config
}

fn handle_parse(attribute: &str, options: Option<&serde_json::Value>, pretty: bool) -> Result<()> {
    let config = effective_config(options);
    let rules = RuleParser::new(&config.media_queries).parse(attribute)?;
    let output = if pretty {
        serde_json::to_string_pretty(&rules)?
    } else {
        serde_json::to_string(&rules)?
    };
    println!("{output}");
    Ok(())
}

fn handle_resolve(
    attribute: &str,
    options: Option<&serde_json::Value>,
    viewport: Viewport,
) -> Result<()> {
    let session = Session::new(attribute, options, viewport, None)?;
    let exchange = session.start();

    match exchange.registry().bindings().next() {
        Some((_, binding)) => match binding.active_condition() {
            Some(condition) => {
                let rule = binding
                    .rules()
                    .iter()
                    .find(|rule| rule.condition == condition)
                    .context("active condition without a rule")?;
                println!("{}", rule.content_source);
                eprintln!("condition: {condition}");
            }
            None => bail!("no rule matches a {}x{} viewport", viewport.width, viewport.height),
        },
        None => bail!("attribute produced no binding"),
    }
    Ok(())
}

async fn handle_simulate(
    attribute: &str,
    options: Option<&serde_json::Value>,
    widths: &[u32],
    base_url: Option<String>,
    screen: ScreenArgs,
) -> Result<()> {
    let Some((first, rest)) = widths.split_first() else {
        bail!("at least one width is required");
    };

    let base_url = base_url
        .map(|url| parse_base_url(&url))
        .transpose()?;
    let session = Session::new(attribute, options, screen.viewport(*first), base_url)?;
    let mut exchange = session.start();
    exchange.settle().await;
    session.report(*first);

    for width in rest {
        session.matcher.set_viewport(screen.viewport(*width));
        session.hub.emit(RESIZE_EVENT);
        exchange.process_pending();
        exchange.settle().await;
        session.report(*width);
    }

    for err in session.sink.take() {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn parse_base_url(url: &str) -> Result<exchange::fetch::Url> {
    exchange::fetch::Url::parse(url).with_context(|| format!("invalid base URL '{url}'"))
}

/// One element, one viewport and the services around them
struct Session {
    config: ExchangeConfig,
    document: Arc<MemoryDocument>,
    element: Arc<MemoryElement>,
    matcher: Arc<MediaQueryMatcher>,
    hub: Arc<ChangeHub>,
    sink: Arc<CollectingErrorSink>,
    fetcher: Arc<HttpFetcher>,
}

impl Session {
    fn new(
        attribute: &str,
        options: Option<&serde_json::Value>,
        viewport: Viewport,
        base_url: Option<exchange::fetch::Url>,
    ) -> Result<Self> {
        let config = effective_config(options);
        RuleParser::new(&config.media_queries).parse(attribute)?;

        let tag = if base_url.is_some() { "div" } else { "img" };
        let document = Arc::new(MemoryDocument::new());
        let element = document
            .append(MemoryElement::new(tag).with_attribute(config.attribute_name(), attribute));

        let fetcher = match base_url {
            Some(url) => HttpFetcher::new().with_base_url(url),
            None => HttpFetcher::new(),
        };

        Ok(Self {
            config,
            document,
            element,
            matcher: Arc::new(MediaQueryMatcher::new(viewport)),
            hub: Arc::new(ChangeHub::new()),
            sink: Arc::new(CollectingErrorSink::new()),
            fetcher: Arc::new(fetcher),
        })
    }

    fn start(&self) -> Exchange {
        let host = Host::new(
            self.document.clone(),
            self.matcher.clone(),
            self.fetcher.clone(),
            self.hub.clone(),
        )
        .with_sink(self.sink.clone());
        Exchange::init(self.config.clone(), None, host)
    }

    fn report(&self, width: u32) {
        let content = match self.element.source() {
            Some(source) => source,
            None => format!("{} bytes of markup", self.element.inner_markup().len()),
        };
        println!("{width:>6}px  {content}");
    }
}

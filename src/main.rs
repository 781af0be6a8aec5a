use clap::{Parser, Subcommand};
use slide_deck::{config, deck, output};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "slide-deck")]
#[command(about = "Assemble a self-contained HTML slide deck from text lists and screenshots")]
#[command(long_about = "\
Assemble a self-contained HTML slide deck from text lists and screenshots

The template is your own HTML. Sections are filled between region markers,
single values are filled into slots, and every other byte is kept as is.

Source directory:

  deck/
  ├── config.toml                  # Optional, see 'slide-deck gen-config'
  ├── template.html                # Never modified by build
  ├── October Achievements.txt     # One item per line: name -- category
  ├── November Plans.txt
  ├── notCompleted.txt             # Optional
  ├── timeline.txt                 # Optional: date -- event
  └── images/
      ├── 01_01_Login page.png     # group 01, first image
      ├── 01_02_Login page.png
      ├── Reports-1.png            # label-sequence form
      ├── background.jpg           # background slot
      └── TeamMember-01.jpg        # team region, paired with [team].members

Template markers:

  <!-- deck:accomplished --> ... <!-- /deck:accomplished -->
  <title data-slot=\"title\">...</title>
  --bg: /*slot:background*/none/*/slot*/;

The output is written next to the sources as <Label>-KPI.html, where
<Label> is the first capitalized word of the achievements file name.

Run 'slide-deck gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding the template, text sources and config.toml
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Show debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write the deck
    Build {
        /// Template file [default: <source>/<template.file>]
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output file [default: <source>/<Label>-KPI.html]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Image directory [default: <source>/<images.dir>]
        #[arg(long)]
        images: Option<PathBuf>,
    },
    /// Parse sources and match images without writing anything
    Check {
        /// Image directory [default: <source>/<images.dir>]
        #[arg(long)]
        images: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the template with a reviewed generated deck
    Promote {
        /// Generated deck to promote
        generated: PathBuf,
        /// Template file [default: <source>/<template.file>]
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build {
            template,
            output: output_path,
            images,
        } => {
            let config = deck::load_config(&cli.source)?;
            let paths = deck::DeckPaths::new(&cli.source, &config)
                .with_template(template)
                .with_images(images);
            let summary = deck::build(&paths, output_path.as_deref(), &config)?;
            output::print_build_output(&summary);
        }
        Command::Check { images, json } => {
            let config = deck::load_config(&cli.source)?;
            let paths = deck::DeckPaths::new(&cli.source, &config).with_images(images);
            let report = deck::check(&paths, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_check_output(&report);
            }
        }
        Command::Promote {
            generated,
            template,
        } => {
            let config = deck::load_config(&cli.source)?;
            let paths = deck::DeckPaths::new(&cli.source, &config).with_template(template);
            deck::promote(&generated, &paths.template, &config)?;
            println!(
                "Promoted {} \u{2192} {}",
                generated.display(),
                paths.template.display()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so the report on stdout stays pipeable.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "slide_deck=debug"
    } else {
        "slide_deck=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gossamer::browser::{Browser, MockBrowser};
use gossamer::config::{self, parse_diffcolor};
use gossamer::images::ImageDiff;
use gossamer::run::read_recorded_run;
use gossamer::session::TestDir;
use gossamer::step::{Action, IdentifierType, Step};
use gossamer::logging;

/// Gossamer - visual regression testing for web pages
#[derive(Parser, Debug)]
#[command(
    name = "gossamer",
    about = "Record, replay and compare web page screenshots",
    after_help = "ENVIRONMENT VARIABLES:\n\
        GOSSAMER_DATA_DIR        Base directory for recorded tests\n\
        GOSSAMER_BROWSER         Browser stored with new recordings\n\
        GOSSAMER_SCREENSIZE      Window size for new recordings (WxH)\n\
        GOSSAMER_DIFFCOLOR       Color for mismatched pixels (R,G,B)\n\
        GOSSAMER_SLEEP_FACTOR    Multiplier for recorded step delays\n\
        GOSSAMER_RMS_TOLERANCE   Maximum RMS for matching screenshots"
)]
struct Args {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two screenshots and write a diff image when they differ
    Diff {
        /// Baseline screenshot
        baseline: PathBuf,

        /// Candidate screenshot
        candidate: PathBuf,

        /// Diff image path
        #[arg(short, long, default_value = "diff.png")]
        output: PathBuf,

        /// Color for mismatched pixels as R,G,B
        #[arg(short, long, env = "GOSSAMER_DIFFCOLOR", default_value = "0,255,0")]
        diffcolor: String,

        /// Maximum RMS difference for the screenshots to match
        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Print the settings, ordered steps and baselines of a recorded test
    Inspect {
        /// Test name under GOSSAMER_DATA_DIR, or a path to record.json
        test: String,

        /// Output the loaded test as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a mock browser screenshot for fixtures
    Mock {
        /// Width in pixels
        #[arg(short = 'W', long, default_value = "1024")]
        width: u32,

        /// Height in pixels
        #[arg(short = 'H', long, default_value = "768")]
        height: u32,

        /// Output file path
        #[arg(short, long, default_value = "./mock_screenshot.png")]
        output: PathBuf,

        /// Fill color as hex (e.g., "ff0000" for red)
        #[arg(short, long, default_value = "ffffff")]
        color: String,

        /// Write an RGBA screenshot instead of RGB
        #[arg(long)]
        rgba: bool,
    },
}

/// Screenshots matched or the command succeeded
const EXIT_OK: u8 = 0;
/// Screenshots differ
const EXIT_DIFFERENT: u8 = 1;
/// Any error
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args.command) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(command: Option<Commands>) -> Result<u8, Box<dyn Error>> {
    match command {
        Some(Commands::Diff {
            baseline,
            candidate,
            output,
            diffcolor,
            tolerance,
        }) => {
            let color = parse_diffcolor(&diffcolor)
                .ok_or_else(|| format!("Invalid diff color '{}'. Use R,G,B (e.g., 0,255,0)", diffcolor))?;
            let engine = ImageDiff::new(tolerance.unwrap_or_else(config::rms_tolerance));

            let rms = engine.rms_diff(&baseline, &candidate)?;
            println!("RMS: {:.3} (tolerance {:.3})", rms, engine.tolerance());
            if rms <= engine.tolerance() {
                println!("Screenshots match");
                return Ok(EXIT_OK);
            }

            let summary = engine.image_diff(&baseline, &candidate, &output, color)?;
            println!("Screenshots differ: {}", output.display());
            println!("  Size: {}x{}", summary.width, summary.height);
            Ok(EXIT_DIFFERENT)
        }

        Some(Commands::Inspect { test, json }) => {
            let dir = resolve_test_dir(&test);
            let test = read_recorded_run(&dir.record_file())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&test)?);
                return Ok(EXIT_OK);
            }

            let settings = &test.settings;
            println!("Test: {}", settings.name);
            if let Some(desc) = &settings.desc {
                println!("  Description: {}", desc);
            }
            println!("  URL: {}", settings.url);
            println!("  Path: {}", settings.path.display());
            println!("  Browser: {}", settings.browser);
            println!("  Screen size: {}x{}", settings.screensize.0, settings.screensize.1);
            if settings.postdata.is_some() {
                println!("  POST data: yes");
            }
            if settings.cookies.is_some() {
                println!("  Cookies: yes");
            }
            println!();
            println!(
                "Steps ({} replayed, {} screenshots):",
                test.playback_steps().count(),
                test.screenshot_count()
            );
            for (index, step) in test.steps.iter().enumerate() {
                let marker = if step.playback() { "" } else { " (not replayed)" };
                println!("  {:>3}  {:>7}ms  {}{}", index, step.offset_time(), describe(step), marker);
            }

            let baselines = dir.list_screenshots()?;
            println!();
            println!("Baselines in {}:", dir.path().display());
            for path in &baselines {
                println!("  {}", path.display());
            }
            if baselines.len() != test.screenshot_count() {
                println!("  warning: {} baselines for {} screenshot steps", baselines.len(), test.screenshot_count());
            }
            Ok(EXIT_OK)
        }

        Some(Commands::Mock {
            width,
            height,
            output,
            color,
            rgba,
        }) => {
            let color_bytes = parse_hex_color(&color)?;
            let mut browser = MockBrowser::with_color(width, height, color_bytes).rgba(rgba);

            // Draw some sample content
            browser.draw_text(10, 10, "Mock Browser", [0, 0, 0], color_bytes);
            browser.draw_rect(10, 30, 100, 50, [128, 128, 128]);

            browser.save_screenshot(&output)?;
            println!("Created mock screenshot: {}", output.display());
            println!("  Size: {}x{}", width, height);
            Ok(EXIT_OK)
        }

        None => {
            println!("Gossamer - visual regression testing for web pages");
            println!();
            println!("Usage: gossamer <COMMAND>");
            println!();
            println!("Commands:");
            println!("  diff     Compare two screenshots");
            println!("  inspect  Print a recorded test");
            println!("  mock     Create a mock browser screenshot");
            println!();
            println!("Run with --help for more information.");
            Ok(EXIT_OK)
        }
    }
}

/// A path to an existing record.json wins over a test name
fn resolve_test_dir(target: &str) -> TestDir {
    let path = Path::new(target);
    if path.is_file() {
        TestDir::new(path.parent().unwrap_or_else(|| Path::new(".")))
    } else {
        TestDir::from_config(target)
    }
}

fn describe(step: &Step) -> String {
    match step {
        Step::Click(click) => format!("click at {}", click.pos),
        Step::Key(event) => {
            let (identifier, kind) = event.identifier();
            format!("key '{}' on {} ({})", event.key(), identifier, identifier_label(kind))
        }
        Step::Text(text) => format!(
            "text '{}' into {} ({})",
            text.value,
            text.identifier,
            identifier_label(text.identifier_type)
        ),
        Step::Screenshot(shot) => format!("screenshot {}", shot.index),
        Step::Scroll(scroll) => format!("scroll by {}", scroll.pos),
    }
}

fn identifier_label(kind: IdentifierType) -> &'static str {
    match kind {
        IdentifierType::Id => "id",
        IdentifierType::ClassName => "class name",
        IdentifierType::ClassList => "class list",
    }
}

fn parse_hex_color(hex: &str) -> Result<[u8; 3], Box<dyn Error>> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err("Color must be 6 hex digits (e.g., 'ff0000')".into());
    }
    let r = u8::from_str_radix(&hex[0..2], 16)?;
    let g = u8::from_str_radix(&hex[2..4], 16)?;
    let b = u8::from_str_radix(&hex[4..6], 16)?;
    Ok([r, g, b])
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sfm_frame_sync::scene::FrameId;
use sfm_frame_sync::system::{SessionConfig, ViewerSession};
use sfm_frame_sync::tools::builtin;
use sfm_frame_sync::view::{RecordingSink, ViewSink};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Project manifest (JSON)
    project: PathBuf,

    /// Debounce window for merging streamed tool results, in milliseconds
    #[arg(long, default_value_t = 1000)]
    merge_delay_ms: u64,

    /// Builtin tool to run after loading: "filter-tracks" or "canonical-transform"
    #[arg(long)]
    tool: Option<String>,

    /// Frame to make active before printing the summary
    #[arg(long)]
    frame: Option<usize>,

    /// Write the final cameras as KRTD files into this directory
    #[arg(long)]
    export_cameras: Option<PathBuf>,

    /// Write the final tracks to this CSV file
    #[arg(long)]
    export_tracks: Option<PathBuf>,

    /// Write the final landmarks to this CSV file
    #[arg(long)]
    export_landmarks: Option<PathBuf>,

    /// Stream the scene to a Rerun viewer
    #[cfg(feature = "rerun")]
    #[arg(long)]
    rerun: bool,
}

/// Longest a builtin tool may run before the CLI gives up waiting.
const TOOL_TIMEOUT: Duration = Duration::from_secs(600);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    #[cfg(feature = "rerun")]
    if cli.rerun {
        let sink = sfm_frame_sync::view::RerunSink::spawn("sfm-view")?;
        return run(&cli, sink);
    }

    run(&cli, RecordingSink::new())
}

fn run<S: ViewSink>(cli: &Cli, sink: S) -> Result<()> {
    let config = SessionConfig {
        merge_delay: Duration::from_millis(cli.merge_delay_ms),
    };
    let mut session = ViewerSession::new(config, sink);

    let report = session.load_project(&cli.project)?;
    println!(
        "Loaded {} frames ({} with cameras)",
        report.frames_added, report.cameras_loaded
    );
    for problem in &report.problems {
        println!("  warning: {}", problem);
    }

    if let Some(name) = &cli.tool {
        let Some(tool) = builtin::by_name(name) else {
            bail!(
                "Unknown tool '{}' (available: {})",
                name,
                builtin::NAMES.join(", ")
            );
        };
        session.start_tool(tool)?;
        if !session.run_until_idle(TOOL_TIMEOUT) {
            bail!("Tool '{}' did not finish within {:?}", name, TOOL_TIMEOUT);
        }
        println!("Tool '{}' finished after {} merge(s)", name, session.merge_count());
    }

    if let Some(frame) = cli.frame {
        session.set_active_frame(FrameId::new(frame))?;
    }

    let view = session.view();
    match view.frame {
        Some(id) => {
            println!(
                "Active frame {}: image {}x{}, camera: {}",
                id,
                view.image_size.0,
                view.image_size.1,
                if view.has_camera { "yes" } else { "no" }
            );
            println!(
                "  {} landmarks visible, {} residuals",
                view.landmarks.len(),
                view.residuals.len()
            );
            if let Some(rms) = view.rms_residual() {
                println!("  RMS reprojection error: {:.3} px", rms);
            }
        }
        None => println!("No active frame"),
    }

    if let Some(dir) = &cli.export_cameras {
        let export = session.export_cameras(dir)?;
        println!(
            "Exported {} cameras to {} ({} failed)",
            export.written.len(),
            dir.display(),
            export.failures.len()
        );
    }
    if let Some(path) = &cli.export_tracks {
        match session.export_tracks(path) {
            Ok(n) => println!("Exported {} tracks to {}", n, path.display()),
            Err(e) => println!("  warning: {}", e),
        }
    }
    if let Some(path) = &cli.export_landmarks {
        match session.export_landmarks(path) {
            Ok(n) => println!("Exported {} landmarks to {}", n, path.display()),
            Err(e) => println!("  warning: {}", e),
        }
    }

    Ok(())
}

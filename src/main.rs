use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracker::config::{API_URL_VAR, Config, DOWNLOAD_DIR_VAR};
use tracker::download::DirectorySink;
use tracker::placement::{AnchorGeometry, Offsets, Placement, Rect, resolve};
use tracker::screen::HEADER;
use tracker::selection::SelectedFile;
use tracker::transport::HttpTransport;
use tracker::workflow::{FormKind, SubmitOutcome, WorkflowController};

#[derive(Parser, Debug)]
#[command(name = "tracker", version, about = HEADER)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one input file against the tracker
    Latest {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        tracker: PathBuf,
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Process a batch of input files against the tracker
    Backlog {
        #[arg(long = "input", num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        tracker: PathBuf,
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Print the resolved overlay style for a placement as JSON
    Place {
        #[arg(long, default_value = "Centered")]
        placement: Placement,
        /// Anchor rectangle as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        anchor: Option<Rect>,
        /// Overlay container rectangle as x,y,width,height
        #[arg(long, value_parser = parse_rect)]
        container: Option<Rect>,
        /// Offsets as left,right,top,bottom
        #[arg(long, value_parser = parse_offsets)]
        offsets: Option<Offsets>,
    },
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Base URL of the processing service
    #[arg(long = "api-url", env = API_URL_VAR)]
    api_url: Option<String>,
    /// Directory the processed tracker is written to
    #[arg(long = "out", env = DOWNLOAD_DIR_VAR)]
    out: Option<PathBuf>,
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{}: {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected {} comma separated numbers, got {}", N, v.len()))
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let [x, y, width, height] = parse_numbers::<4>(s)?;
    Ok(Rect::new(x, y, width, height))
}

fn parse_offsets(s: &str) -> Result<Offsets, String> {
    let [left, right, top, bottom] = parse_numbers::<4>(s)?;
    Ok(Offsets {
        left,
        right,
        top,
        bottom,
    })
}

/// Lines describing what is about to be sent.
fn summary(controller: &WorkflowController) -> Vec<String> {
    let mut lines = vec![controller.kind().title().to_string()];
    for file in controller.selection().inputs() {
        lines.push(format!("  input   {} ({} bytes)", file.name, file.size()));
    }
    if let Some(tracker) = controller.selection().tracker() {
        lines.push(format!("  tracker {} ({} bytes)", tracker.name, tracker.size()));
    }
    lines
}

async fn run_form(
    mut controller: WorkflowController,
    service: ServiceArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().with_overrides(service.api_url, service.out);
    let transport = HttpTransport::new(config.api_base);
    let mut sink = DirectorySink::new(config.download_dir);

    for line in summary(&controller) {
        println!("{}", line);
    }

    match controller.submit(&transport, &mut sink).await {
        SubmitOutcome::Saved(artifact) => {
            match &artifact.location {
                Some(path) => println!("Saved {}", path.display()),
                None => println!("Saved {}", artifact.file_name),
            }
            Ok(())
        }
        SubmitOutcome::Failed(message) => Err(message.to_string().into()),
        SubmitOutcome::Discarded | SubmitOutcome::Busy => {
            Err("submission did not complete".into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Latest {
            input,
            tracker,
            service,
        } => {
            let mut controller = WorkflowController::new(FormKind::Latest);
            controller
                .selection_mut()
                .add_inputs([SelectedFile::from_path(&input)?]);
            controller
                .selection_mut()
                .add_tracker([SelectedFile::from_path(&tracker)?]);
            run_form(controller, service).await?;
        }
        Command::Backlog {
            inputs,
            tracker,
            service,
        } => {
            let mut controller = WorkflowController::new(FormKind::Backlog);
            let files = inputs
                .iter()
                .map(SelectedFile::from_path)
                .collect::<Result<Vec<_>, _>>()?;
            controller.selection_mut().add_inputs(files);
            controller
                .selection_mut()
                .add_tracker([SelectedFile::from_path(&tracker)?]);
            run_form(controller, service).await?;
        }
        Command::Place {
            placement,
            anchor,
            container,
            offsets,
        } => {
            let geometry = anchor.map(|anchor| AnchorGeometry {
                anchor,
                container: container.unwrap_or_default(),
            });
            let style = resolve(placement, geometry.as_ref(), &offsets.unwrap_or_default());
            println!("{}", serde_json::to_string_pretty(&style)?);
            log::debug!("layer: {}", style.layer_css());
            log::debug!("container: {}", style.container_css());
        }
    }

    Ok(())
}

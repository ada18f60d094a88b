use anyhow::Result;
use clap::Parser;
use snapcam::camera::{CaptureMode, MockCameraBackend};
use snapcam::{
    CameraEvent, ControllerRuntime, CorrectedImage, EventBus, EventFilter, Facing,
    FixedOrientation, PictureSink, PictureVisibility, PreviewSurface, PreviewTarget,
    SnapcamConfig, SurfaceBindingController, Visibility,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "snapcam")]
#[command(about = "Camera lifecycle controller binding a capture device to a preview surface")]
#[command(version)]
#[command(long_about = "Drives a camera through its surface lifecycle: opens the sensor when \
a preview surface appears, negotiates preview and picture sizes for the surface geometry, \
captures orientation-corrected stills and releases the device when the surface goes away. \
This binary runs a session against simulated camera hardware.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "snapcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without opening a camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// Override the configured camera facing
    #[arg(long, value_name = "FACING", value_parser = parse_facing)]
    facing: Option<Facing>,

    /// Simulated preview surface size
    #[arg(long, value_name = "WxH", default_value = "1080x1920", value_parser = parse_surface)]
    surface: (u32, u32),

    /// Take one picture, then exit
    #[arg(long)]
    capture: bool,

    /// Seconds to wait for the picture
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

/// View that only logs what the controller asks of it
struct LoggingView {
    target: PreviewTarget,
}

impl PreviewSurface for LoggingView {
    fn preview_target(&self) -> PreviewTarget {
        self.target.clone()
    }
}

impl PictureSink for LoggingView {
    fn on_picture_taken(&mut self, image: CorrectedImage) {
        info!(
            "Picture {} ready: {} from {} camera",
            image.capture_id,
            image.resolution(),
            image.facing
        );
    }
}

impl PictureVisibility for LoggingView {
    fn on_picture_visibility_changed(&mut self, visibility: Visibility) {
        debug!("Picture visibility: {:?}", visibility);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting snapcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match SnapcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    if let Some(facing) = args.facing {
        config.camera.facing = facing;
    }

    let event_bus = Arc::new(if config.events.debug_logging {
        EventBus::with_debug_logging(config.events.bus_capacity)
    } else {
        EventBus::new(config.events.bus_capacity)
    });

    let printer = event_bus.on(
        vec![
            "camera_changed",
            "preview_started",
            "picture_taken",
            "system_error",
        ],
        "cli-printer",
        |event: CameraEvent| match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize event: {}", e),
        },
    );
    let mut pictures =
        event_bus.subscribe_to(EventFilter::EventTypes(vec!["picture_taken"]), "cli-capture");

    let runtime = {
        let config = config.clone();
        let event_bus = Arc::clone(&event_bus);
        tokio::task::spawn_blocking(move || {
            ControllerRuntime::spawn(move || {
                let backend = MockCameraBackend::new().with_capture_mode(CaptureMode::Background);
                let orientation = FixedOrientation::new(
                    config.orientation.display_rotation,
                    config.orientation.layout_orientation,
                );

                SurfaceBindingController::builder()
                    .view(LoggingView {
                        target: PreviewTarget::new(1, "snapcam-demo"),
                    })
                    .backend(backend)
                    .orientation(orientation)
                    .event_bus(event_bus)
                    .config(&config)
                    .build()
            })
        })
        .await??
    };

    let mailbox = runtime.mailbox();
    let (width, height) = args.surface;
    mailbox.surface_created()?;
    mailbox.surface_changed(width, height)?;

    if args.capture {
        mailbox.take_picture()?;

        match tokio::time::timeout(Duration::from_secs(args.timeout), pictures.recv()).await {
            Ok(Ok(event)) => info!("{}", event.description()),
            Ok(Err(e)) => warn!("Picture notification lost: {}", e),
            Err(_) => warn!("No picture within {}s", args.timeout),
        }
    } else {
        info!("Preview running; press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
    }

    mailbox.surface_destroyed()?;
    tokio::task::spawn_blocking(move || runtime.shutdown()).await??;

    drop(event_bus);
    drop(pictures);
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        debug!("Event printer still running at exit");
    }

    info!("snapcam stopped");
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snapcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_names(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_names(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_names(args.debug)
                .boxed()
        }
    };

    // Optional rolling file output
    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "snapcam.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

fn parse_facing(value: &str) -> std::result::Result<Facing, String> {
    match value.to_ascii_lowercase().as_str() {
        "front" => Ok(Facing::Front),
        "back" => Ok(Facing::Back),
        other => Err(format!("unknown facing '{}', expected front or back", other)),
    }
}

fn parse_surface(value: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;

    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad width '{}': {}", width, e))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad height '{}': {}", height, e))?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be non-zero".to_string());
    }
    Ok((width, height))
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Snapcam Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Camera parameters are added as:");
    println!("#   [[camera.parameters]]");
    println!("#   key = \"focus-mode\"");
    println!("#   value = \"continuous-picture\"");
    println!();

    let default_config = toml::to_string_pretty(&SnapcamConfig::default())?;
    println!("{}", default_config);
    Ok(())
}

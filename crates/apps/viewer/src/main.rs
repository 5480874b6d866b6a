use std::ops::ControlFlow;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use dashboard::{
    AlertSubscription, DashboardConfig, DashboardSession, HealthProfile, HttpProvider, LoadOutcome,
    SubscriptionClient, SubscriptionError,
};
use foundation::bounds::Viewport;
use foundation::geo::LatLng;
use geocode::{GeocodeError, LocationResolver, NominatimClient};
use streaming::{ChannelMessage, Handler, SharedChannel, Topic, WsChannel};
use timeline::QuickJump;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use wind::{RenderFrame, WindAnimation, WindFieldAnimator, WindVector};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless air-quality dashboard")]
struct Args {
    /// Backend base URL (overrides AIRWATCH_BACKEND_URL)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Realtime WebSocket URL (overrides AIRWATCH_WS_URL)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// Geocoder base URL (overrides AIRWATCH_GEOCODER_URL)
    #[arg(long, global = true)]
    geocoder: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a location, follow live updates and run the wind overlay
    Show {
        /// Free-text place to look up
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        query: Option<String>,

        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,

        /// Move the cursor after loading
        #[arg(long, value_enum)]
        jump: Option<Jump>,

        /// Print health advice for this profile
        #[arg(long, default_value = "general")]
        profile: HealthProfile,

        /// How long to stay connected, in seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,

        /// Skip the realtime channel
        #[arg(long)]
        offline: bool,

        /// Wind particle count (overrides AIRWATCH_PARTICLES)
        #[arg(long)]
        particles: Option<usize>,

        /// Overlay size in pixels
        #[arg(long, default_value_t = 800.0)]
        width: f64,

        #[arg(long, default_value_t = 600.0)]
        height: f64,
    },

    /// Print geocoder matches for a query
    Search { query: String },

    /// Register for email alerts
    Subscribe {
        #[arg(long)]
        email: String,

        #[arg(long)]
        location: String,

        #[arg(long, default_value = "general")]
        profile: HealthProfile,

        #[arg(long, default_value_t = dashboard::subscription::DEFAULT_AQI_THRESHOLD)]
        threshold: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Jump {
    Back24h,
    Back6h,
    Now,
    Forward6h,
    Forward24h,
}

impl From<Jump> for QuickJump {
    fn from(j: Jump) -> Self {
        match j {
            Jump::Back24h => QuickJump::Back24h,
            Jump::Back6h => QuickJump::Back6h,
            Jump::Now => QuickJump::Now,
            Jump::Forward6h => QuickJump::Forward6h,
            Jump::Forward24h => QuickJump::Forward24h,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ViewerError {
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
    #[error("no place matches {0:?}")]
    NoMatch(String),
    #[error("pass --query or both --lat and --lng")]
    NoLocation,
    #[error("invalid coordinate {lat}, {lng}")]
    BadCoordinate { lat: f64, lng: f64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = DashboardConfig::from_env();
    if let Some(backend) = args.backend {
        config.backend_url = backend.trim_end_matches('/').to_string();
        if args.ws_url.is_none() {
            config.ws_url = dashboard::config::ws_url_for(&config.backend_url);
        }
    }
    if let Some(ws_url) = args.ws_url {
        config.ws_url = ws_url;
    }
    if let Some(geocoder) = args.geocoder {
        config.geocoder_url = geocoder;
    }

    let result = match args.command {
        Command::Show {
            query,
            lat,
            lng,
            jump,
            profile,
            seconds,
            offline,
            particles,
            width,
            height,
        } => {
            if let Some(particles) = particles {
                config.particles = particles;
            }
            let opts = ShowOptions {
                jump: jump.map(QuickJump::from),
                profile,
                run_for: Duration::from_secs(seconds),
                live: !offline,
                viewport: Viewport::new(width, height),
            };
            match locate(&config, query, lat, lng).await {
                Ok((name, at)) => show(&config, name, at, opts).await,
                Err(e) => Err(e),
            }
        }
        Command::Search { query } => search(&config, &query).await,
        Command::Subscribe {
            email,
            location,
            profile,
            threshold,
        } => subscribe(&config, email, location, profile, threshold).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn resolver(config: &DashboardConfig) -> Result<LocationResolver, ViewerError> {
    let client = NominatimClient::new(config.geocoder_url.clone())?;
    Ok(LocationResolver::new(Arc::new(client), config.debounce_config()))
}

async fn locate(
    config: &DashboardConfig,
    query: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<(Option<String>, LatLng), ViewerError> {
    match (query, lat, lng) {
        (_, Some(lat), Some(lng)) => LatLng::checked(lat, lng)
            .map(|at| (None, at))
            .ok_or(ViewerError::BadCoordinate { lat, lng }),
        (Some(query), _, _) => {
            let places = resolver(config)?.resolve(&query).await?;
            let place = places
                .into_iter()
                .next()
                .ok_or_else(|| ViewerError::NoMatch(query.clone()))?;
            info!(place = %place.display_name, at = %place.coord, "resolved {query:?}");
            Ok((Some(place.display_name), place.coord))
        }
        _ => Err(ViewerError::NoLocation),
    }
}

struct ShowOptions {
    jump: Option<QuickJump>,
    profile: HealthProfile,
    run_for: Duration,
    live: bool,
    viewport: Viewport,
}

async fn show(
    config: &DashboardConfig,
    place: Option<String>,
    at: LatLng,
    opts: ShowOptions,
) -> Result<(), ViewerError> {
    let provider = Arc::new(HttpProvider::new(config.backend_url.clone()));
    let mut session = DashboardSession::new(provider, config.hours_per_sample);

    let animator = WindFieldAnimator::new(config.animator_config(), opts.viewport, WindVector::CALM);
    let mut animation = WindAnimation::start(animator, config.frame_hz, log_frame);
    session.attach_animator(animation.animator().clone());

    match session.load(at, Utc::now()).await {
        LoadOutcome::Loaded { samples } => {
            info!(samples, name = %session.location_name(), "dashboard ready");
        }
        LoadOutcome::NoData => warn!(%at, "upstream has no samples for this location"),
        LoadOutcome::KeptPrevious => warn!(%at, "upstream unavailable"),
    }
    if let Some(name) = place {
        debug!(%name, "geocoded name, backend reports {}", session.location_name());
    }
    if let Some(jump) = opts.jump {
        if !session.quick_jump(jump, Utc::now()) {
            debug!(jump = jump.label(), "cursor already at the edge");
        }
    }
    println!("{}", session.summary(Utc::now()));
    print_advice(&session, opts.profile);

    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel::<ChannelMessage>();
    let realtime = if opts.live {
        let ws = WsChannel::spawn(config.channel_config());
        let handler: Handler = Arc::new(move |msg: &ChannelMessage| {
            let _ = updates_tx.send(msg.clone());
        });
        let subscription = ws.channel().lock().subscribe(Topic::All, handler);
        ws.connect();
        if let Some(msg) = session.subscribe_message() {
            send_when_open(ws.channel(), &msg, Duration::from_secs(5)).await;
        }
        Some((ws, subscription))
    } else {
        drop(updates_tx);
        None
    };

    let deadline = tokio::time::sleep(opts.run_for);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            update = updates_rx.recv() => {
                let Some(msg) = update else { break };
                if session.apply_update(&msg, Utc::now()) {
                    println!("{}", session.summary(Utc::now()));
                }
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    if let Some((mut ws, subscription)) = realtime {
        if let Some(msg) = session.unsubscribe_message() {
            if let Err(e) = ws.channel().lock().send(&msg) {
                debug!("unsubscribe not sent: {e}");
            }
        }
        if ws.channel().lock().permanently_failed() {
            warn!("realtime channel gave up; showing last loaded data");
        }
        subscription.unsubscribe();
        ws.shutdown();
    }
    animation.stop();
    info!(frames = animation.frames_run(), "wind overlay stopped");

    for alert in session.recent_alerts() {
        println!("alert [{:?}] {}: {}", alert.severity, alert.location, alert.message);
    }
    println!("{}", session.summary(Utc::now()));
    Ok(())
}

fn print_advice(session: &DashboardSession, profile: HealthProfile) {
    let Some(readout) = session.readout(Utc::now()) else {
        return;
    };
    for advice in readout.advice(profile) {
        println!("  {advice}");
    }
}

fn log_frame(frame: RenderFrame) -> ControlFlow<()> {
    if frame.index % 60 == 0 {
        debug!(frame = frame.index, dots = frame.dots().count(), "wind frame");
    }
    ControlFlow::Continue(())
}

/// Waits for the channel to open, then sends `msg`. Gives up after `timeout`.
async fn send_when_open(channel: &SharedChannel, msg: &streaming::ControlMessage, timeout: Duration) {
    let poll = Duration::from_millis(50);
    let mut waited = Duration::ZERO;
    while waited < timeout {
        {
            let mut ch = channel.lock();
            if ch.is_open() {
                if let Err(e) = ch.send(msg) {
                    warn!("location subscription not sent: {e}");
                }
                return;
            }
            if ch.permanently_failed() {
                break;
            }
        }
        tokio::time::sleep(poll).await;
        waited += poll;
    }
    warn!("realtime channel not open; continuing without live updates");
}

async fn search(config: &DashboardConfig, query: &str) -> Result<(), ViewerError> {
    let places = resolver(config)?.resolve(query).await?;
    if places.is_empty() {
        return Err(ViewerError::NoMatch(query.to_string()));
    }
    for place in places {
        println!("{:<10} {}  ({})", place.kind, place.display_name, place.coord);
    }
    Ok(())
}

async fn subscribe(
    config: &DashboardConfig,
    email: String,
    location: String,
    profile: HealthProfile,
    threshold: u32,
) -> Result<(), ViewerError> {
    let sub = AlertSubscription::new(email, location)
        .with_profile(profile)
        .with_threshold(threshold);
    SubscriptionClient::new(&config.backend_url).subscribe(&sub).await?;
    println!("subscribed {} to alerts above AQI {}", sub.location, sub.aqi_threshold);
    Ok(())
}

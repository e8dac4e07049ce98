use color_eyre::{eyre::eyre, Result};
use ghosttouch::config::AppConfig;
use ghosttouch::control::{ChannelOutput, ControlCommand, ControllerStatus, SessionHandle};
use ghosttouch::pose::PoseReaderHandle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

// Commands buffered between the control loop and the dispatcher
const COMMAND_CHANNEL_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    let config = setup().await?;
    info!("Starting ghosttouch");
    debug!("Config: {:?}", config);

    let cancel = CancellationToken::new();

    let (pose_sender, pose_receiver) = mpsc::channel(config.source.channel_capacity);
    let reader = PoseReaderHandle::spawn(&config.source, pose_sender, cancel.child_token());

    let (command_sender, command_receiver) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let output = ChannelOutput::new(command_sender).with_range(config.gesture.volume_range_db.into());
    let dispatcher = tokio::spawn(dispatch_commands(command_receiver));

    let mut session = SessionHandle::spawn(
        "main",
        &config.gesture,
        pose_receiver,
        Box::new(output.clone()),
        Box::new(output),
        cancel.clone(),
    )
    .map_err(|e| eyre!("Failed to start gesture session: {}", e))?;
    let _status_logger = tokio::spawn(log_mode_changes(session.subscribe()));

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                ctrl_c_cancel.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let result = session.wait().await;
    cancel.cancel();

    // The session owned the last command sender, so the dispatcher drains and ends
    if let Err(e) = dispatcher.await {
        error!("Command dispatcher failed: {}", e);
    }
    debug!("Pose reader finished: {}", reader.is_finished());

    let stats = result.map_err(|e| eyre!("Gesture session failed: {}", e))?;
    info!(
        "Session ended: {} frames ({} with a hand), {} transitions, {} commands, {} dropped, {}",
        stats.frames,
        stats.hand_frames,
        stats.transitions,
        stats.commands,
        stats.dropped_commands,
        stats
            .average_fps()
            .map(|fps| format!("{:.1} fps", fps))
            .unwrap_or_else(|| "no frame rate".to_string())
    );
    Ok(())
}

async fn setup() -> Result<AppConfig> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;

    let config = AppConfig::load_from_env().await?;
    setup_logging(config.logging.max_level());
    Ok(config)
}

fn setup_logging(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

// Stands in for the platform mouse and mixer: every command is logged
async fn dispatch_commands(mut receiver: mpsc::Receiver<ControlCommand>) {
    while let Some(command) = receiver.recv().await {
        match command {
            ControlCommand::Scroll { delta } => info!("Scroll {:+}", delta),
            ControlCommand::Volume { level_db } => info!("Volume {:.2} dB", level_db),
        }
    }
    debug!("Command channel closed");
}

async fn log_mode_changes(mut receiver: watch::Receiver<ControllerStatus>) {
    let mut mode = receiver.borrow().mode;
    while receiver.changed().await.is_ok() {
        let status = receiver.borrow_and_update().clone();
        if status.mode != mode {
            info!(
                "Mode {} (gesture {}, fingers {}, {:.0} fps)",
                status.mode, status.gesture, status.fingers, status.fps
            );
            mode = status.mode;
        }
    }
}

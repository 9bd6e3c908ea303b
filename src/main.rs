use std::{
    env,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use gesture_stream::AppConfig;

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            let config = AppConfig::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            log::info!("loaded configuration from {}", path.display());
            config
        }
        None => {
            log::info!("no config file given, using defaults");
            AppConfig::default()
        }
    };

    let stdout = io::stdout();
    run(config, stdout.lock())
}

#[cfg(feature = "camera-nokhwa")]
fn run(config: AppConfig, mut out: impl Write) -> Result<()> {
    use std::{sync::Arc, thread};

    use crossbeam_channel::bounded;
    use gesture_stream::{
        Debouncer, EventRecorder, EventTally,
        model_download::ensure_handpose_model_ready,
        pipeline::{
            CameraSessionManager, FramePipeline, HandposeProvider, MjpegStream, NokhwaOpener,
            StreamChunk, stream,
        },
    };

    ensure_handpose_model_ready(&config.model.handpose_path, &config.model.handpose_url, |_evt| {})?;
    let provider = HandposeProvider::load(&config.model.handpose_path, config.model.min_confidence)?;

    let opener = NokhwaOpener::new(config.camera.read_timeout());
    let camera = Arc::new(CameraSessionManager::new(
        Box::new(opener),
        config.camera.clone(),
    ));
    let index = camera.start()?;
    log::info!(
        "streaming camera index {index} as {}",
        stream::content_type(&config.stream.boundary)
    );

    let mut pipeline = FramePipeline::new(camera.clone(), Box::new(provider), &config);
    let stream_config = config.stream.clone();
    let (chunk_tx, chunk_rx) = bounded::<StreamChunk>(1);
    let worker = thread::Builder::new()
        .name("mjpeg-stream".into())
        .spawn(move || {
            for chunk in MjpegStream::new(&mut pipeline, &stream_config) {
                if chunk_tx.send(chunk).is_err() {
                    break;
                }
            }
        })?;

    let mut recorder = EventRecorder::new(
        Debouncer::new(config.debounce.threshold),
        EventTally::new(),
        config.debounce.event_confidence,
    );

    let mut sent: u64 = 0;
    for chunk in chunk_rx.iter() {
        recorder.observe(chunk.gesture);

        if let Err(err) = out.write_all(&chunk.bytes).and_then(|()| out.flush()) {
            log::info!("output closed ({err}), stopping");
            break;
        }
        sent += 1;
        if config.stream.max_frames.is_some_and(|max| sent >= max) {
            log::info!("reached {sent} frames, stopping");
            break;
        }
    }

    camera.stop();
    drop(chunk_rx);
    if worker.join().is_err() {
        log::warn!("stream worker panicked");
    }

    let stats = recorder.sink().statistics();
    log::info!(
        "streamed {sent} frames, {} confirmed gestures ({} distinct), most detected: {}",
        stats.total,
        stats.unique,
        stats
            .most_detected
            .map_or_else(|| "none".to_string(), |g| g.to_string())
    );
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn run(_config: AppConfig, _out: impl Write) -> Result<()> {
    anyhow::bail!("built without a camera backend; enable the `camera-nokhwa` feature")
}

use clap::Parser;
use redditnarrator::args::Args;
use redditnarrator::config::Settings;
use redditnarrator::pipeline::NarrationPipeline;
use redditnarrator::thread::load_thread;
use redditnarrator::tts::build_backend;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info") // set to "debug" for more logs
        .init();

    info!("Starting reddit narration pipeline");

    let args = Args::parse();
    let settings = Settings::from_args(&args);

    let thread = load_thread(Path::new(&args.thread))?;

    let backend = match build_backend(&settings) {
        Ok(backend) => backend,
        Err(e) => {
            error!("TTS backend configuration error: {e}");
            std::process::exit(1);
        }
    };
    info!("Using TTS backend '{}'", backend.name());

    if let Some(notice) = settings.translation_notice() {
        warn!("{notice}");
    }

    let pipeline = NarrationPipeline::new(backend.as_ref(), &settings);
    let (total_duration, processed_count) = pipeline.run(&thread).await?;

    info!(
        "Narration complete: {processed_count} unit(s), {total_duration:.2}s of audio under {}",
        settings.output_root.display()
    );
    Ok(())
}

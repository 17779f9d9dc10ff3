use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use visage_engine::{EngineConfig, EnrollmentController, NullDetector};
use visage_server::ServerConfig;
use visage_store::FaceDb;
use visage_telemetry::TelemetryConfig;

/// Reference embedding dimensionality (buffalo_l).
const EMBEDDING_DIMS: usize = 512;

#[derive(Parser, Debug)]
#[command(name = "visage", about = "Live face enrollment server")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Root directory for the face database.
    #[arg(long, default_value = "live_face_db")]
    db_dir: PathBuf,

    /// Cosine-similarity threshold above which two embeddings count as
    /// the same face.
    #[arg(long, default_value_t = 0.7)]
    threshold: f32,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    visage_telemetry::init(&TelemetryConfig {
        json: args.json_logs,
        ..Default::default()
    });

    tracing::info!("Starting visage enrollment server");

    let db = Arc::new(FaceDb::open(&args.db_dir)?);
    tracing::info!(path = %db.root().display(), "Face database opened");

    // The detection model runs behind the FaceDetector seam; without a
    // backend wired in, every frame reads as "no face visible".
    let detector = Arc::new(NullDetector::new(EMBEDDING_DIMS));
    tracing::warn!("No detector backend configured; using the null detector");

    let controller = Arc::new(EnrollmentController::new(
        detector,
        db,
        EngineConfig {
            threshold: args.threshold,
        },
    ));

    let config = ServerConfig {
        port: args.port,
        ..Default::default()
    };
    let handle = visage_server::start(config, controller).await?;
    tracing::info!(port = handle.port, "Enrollment server ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}

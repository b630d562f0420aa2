use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use partscout::{ingest, types::*, AppState};

fn port_from_env() -> u16 {
    for key in ["PARTSCOUT_PORT", "PORT"] {
        if let Ok(value) = std::env::var(key) {
            if let Ok(port) = value.trim().parse::<u16>() {
                return port;
            }
        }
    }
    8787
}

/// `--batch <parts.csv> [--out <enriched.csv>]` runs the batch adapter
/// instead of serving HTTP.
fn parse_batch_args() -> Option<(String, String)> {
    let mut args = std::env::args().peekable();
    let mut input = None;
    let mut output = None;
    while let Some(a) = args.next() {
        match a.as_str() {
            "--batch" => input = args.next(),
            "--out" => output = args.next(),
            _ => {}
        }
    }
    input.map(|i| (i, output.unwrap_or_else(|| "enriched.csv".to_string())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting partscout enrichment server");

    let http_client = AppState::default_http_client();
    let state = Arc::new(AppState::new(http_client));

    if state.config.resolve_search_key().is_none() {
        tracing::warn!("SEARCH_API_KEY not set; discovery will fail against the search proxy");
    }
    if state.config.resolve_llm_key().is_none() {
        tracing::warn!("LLM_API_KEY not set; datasheet mapping and synthesis will fail");
    }
    info!("LLM model: {}", state.llm.model());

    // Batch mode: ingest a spreadsheet, enrich serially, export + manifest.
    if let Some((input, output)) = parse_batch_args() {
        let rows = ingest::read_parts_csv(Path::new(&input))?;
        info!("batch mode: {} parts from {}", rows.len(), input);

        let results = ingest::run_batch(&state, &rows).await;
        ingest::export_results_csv(Path::new(&output), &results)?;

        let paths = ingest::AssetPaths::new(
            &state.config.resolve_data_dir(),
            &state.config.resolve_tenant(),
        );
        let manifest = ingest::build_manifest(&results, &paths);
        ingest::write_manifest(&paths.manifest_path(), &manifest)?;

        let enriched = results.iter().filter(|(_, r)| r.is_some()).count();
        info!(
            "batch complete: {}/{} enriched, exported to {}",
            enriched,
            rows.len(),
            output
        );
        return Ok(());
    }

    let app = Router::new()
        .route("/enrich", post(enrich_handler))
        .route("/healthz", get(healthz_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = port_from_env();
    let addr = format!("0.0.0.0:{port}");
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn enrich_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<FinalResult>, (StatusCode, Json<ErrorResponse>)> {
    if request.mpn.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "mpn is required".to_string(),
            }),
        ));
    }

    match partscout::pipeline::enrich_part(&state, &request.mpn, &request.manufacturer).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("enrich failed for {}: {}", request.mpn, e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

use axum::{routing::{get, post}, Router};
use bill_split_ai::{api, create_client, AppConfig, OpenAiGateway, SplitService, Transcriber};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 共享的 HTTP 连接池 + 凭据
    let http = create_client()?;
    let gateway = Arc::new(OpenAiGateway::new(http, config.gateway.clone())?);
    info!("Completion gateway ready at {}", config.gateway.base_url);

    let transcriber: Arc<dyn Transcriber> = gateway.clone();
    let service = Arc::new(SplitService::new(gateway, Some(transcriber), config.clone()));

    // 构建路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/bills/recognize", post(api::recognize_bill))
        .route("/api/guests/extract", post(api::extract_mentions))
        .route("/api/guests/transcribe", post(api::transcribe))
        .route("/api/reconcile", post(api::reconcile))
        .with_state(service)
        .layer(ServiceBuilder::new().layer(ConcurrencyLimitLayer::new(config.server.max_concurrency)));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/bills/recognize   - bill photo -> order");
    info!("  POST /api/guests/extract    - description -> mentions");
    info!("  POST /api/guests/transcribe - voice note -> description");
    info!("  POST /api/reconcile         - order + mentions -> alignment + split");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    omnigate_observability::init();

    let config = omnigate_gateway::config::GatewayConfig::from_env();
    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set; authenticated routes will answer 500");
    }

    let app = omnigate_gateway::app::build_app(&config);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    tracing::info!("gateway listening on {}", listener.local_addr().unwrap());
    tracing::info!("auth service: {}", config.auth_service_url);
    tracing::info!("product service: {}", config.product_service_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::warn!("shutting down gracefully");
}

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use billing::{
    domain::value_objects::enums::payment_gateways::PaymentGateway,
    gateways::{
        paynpro_client::{PaynproClient, PaynproSettings},
        razorpay_client::RazorpayClient,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            payments::PaymentPostgres, payouts::PayoutPostgres, plans::PlanPostgres,
            subscriptions::SubscriptionPostgres, users::UserPostgres,
        },
    },
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    usecases::{
        payouts::{PayoutGateway, PayoutReporting, PayoutTrigger, PayoutUseCase},
        subscriptions::{OrderGateway, SubscriptionUseCase},
    },
};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let razorpay = Arc::new(RazorpayClient::new(
        config.razorpay.base_url.clone(),
        config.razorpay.key_id.clone(),
        config.razorpay.key_secret.clone(),
        config.razorpay.webhook_secret.clone(),
        config.razorpay.payout_account_number.clone(),
    )?);
    let paynpro = Arc::new(PaynproClient::new(PaynproSettings {
        base_url: config.paynpro.base_url.clone(),
        payout_base_url: config.paynpro.payout_base_url.clone(),
        api_key: config.paynpro.api_key.clone(),
        api_secret: config.paynpro.api_secret.clone(),
        encryption_key: config.paynpro.encryption_key.clone(),
        salt_key: config.paynpro.salt_key.clone(),
        notify_url: config.paynpro.notify_url.clone(),
        return_url: config.paynpro.return_url.clone(),
    })?);

    let plan_repo = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let subscription_repo = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let payment_repo = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let payout_repo = Arc::new(PayoutPostgres::new(Arc::clone(&db_pool)));
    let user_repo = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));

    let mut order_gateways: HashMap<PaymentGateway, Arc<dyn OrderGateway>> = HashMap::new();
    order_gateways.insert(
        PaymentGateway::Razorpay,
        Arc::clone(&razorpay) as Arc<dyn OrderGateway>,
    );
    order_gateways.insert(
        PaymentGateway::Paynpro,
        Arc::clone(&paynpro) as Arc<dyn OrderGateway>,
    );

    let mut payout_gateways: HashMap<PaymentGateway, Arc<dyn PayoutGateway>> = HashMap::new();
    payout_gateways.insert(
        PaymentGateway::Razorpay,
        Arc::clone(&razorpay) as Arc<dyn PayoutGateway>,
    );
    payout_gateways.insert(
        PaymentGateway::Paynpro,
        Arc::clone(&paynpro) as Arc<dyn PayoutGateway>,
    );

    let payout_usecase = Arc::new(PayoutUseCase::new(
        Arc::clone(&payout_repo),
        Arc::clone(&user_repo),
        Arc::clone(&plan_repo),
        Arc::clone(&subscription_repo),
        Arc::clone(&payment_repo),
        payout_gateways,
        Arc::clone(&paynpro) as Arc<dyn PayoutReporting>,
    ));

    let subscription_usecase = Arc::new(SubscriptionUseCase::new(
        Arc::clone(&plan_repo),
        Arc::clone(&subscription_repo),
        Arc::clone(&payment_repo),
        Arc::clone(&user_repo),
        order_gateways,
        Arc::clone(&payout_usecase) as Arc<dyn PayoutTrigger>,
    ));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/subscriptions",
            routers::subscriptions::routes(Arc::clone(&subscription_usecase)),
        )
        .nest(
            "/api/v1/payments",
            routers::payments::routes(Arc::clone(&subscription_usecase)),
        )
        .nest(
            "/api/v1/webhooks",
            routers::webhooks::routes(
                Arc::clone(&subscription_usecase),
                Arc::clone(&payout_usecase),
            ),
        )
        .nest(
            "/api/v1/admin/payouts",
            routers::payouts::routes(Arc::clone(&payout_usecase)),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

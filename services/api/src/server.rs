use crate::cli::ServeArgs;
use crate::infra::{AppState, SelectedStore};
use crate::routes::{with_service_routes, ServiceComponents};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_intake::config::AppConfig;
use loan_intake::crypto::PayloadCipher;
use loan_intake::error::AppError;
use loan_intake::i18n::TranslationStore;
use loan_intake::intake::ApplicationIntakeService;
use loan_intake::notify::{EmailComposer, EmailState, HttpNotifier, SmtpMailer};
use loan_intake::telemetry;
use loan_intake::upload::UploadState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let translations = Arc::new(TranslationStore::load(
        &config.i18n.locales_dir,
        config.i18n.default_locale.clone(),
    )?);
    info!(locales = ?translations.locales(), "translations loaded");

    let cipher = Arc::new(PayloadCipher::from_secret(
        config.security.encryption_key.expose(),
    )?);
    let store = Arc::new(SelectedStore::from_config(&config.storage).await?);
    info!(backend = store.backend(), "temporary store ready");

    let notifier = Arc::new(HttpNotifier::new(config.server.public_base_url()));
    let intake = Arc::new(ApplicationIntakeService::new(store, notifier, cipher));

    let email = EmailState {
        mailer: Arc::new(SmtpMailer::new(config.mail.clone())),
        composer: Arc::new(EmailComposer::new(
            translations.clone(),
            config.mail.admin_email.clone(),
        )),
    };

    let uploads = Arc::new(UploadState::from_config(&config.uploads));
    tokio::fs::create_dir_all(&uploads.directory).await?;

    let app = with_service_routes(ServiceComponents {
        intake,
        email,
        translations,
        uploads,
    })
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use pins4days::openapi::ApiDoc;
use pins4days::repo::Repo;
use pins4days::{config, worker_config, AppConfig, AppState, SecurityHeaders};

#[allow(unreachable_code, unused_variables)]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    #[cfg(feature = "postgres-store")]
    {
        use sqlx::postgres::PgPoolOptions;
        let url = cfg
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        let repo = pins4days::repo::pg::PgRepo::new(pool);
        repo.migrate().await?;
        info!("Using Postgres repository backend");
        return Ok(Arc::new(repo));
    }

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    {
        use pins4days::repo::inmem::InMemRepo;
        let repo = match &cfg.data_dir {
            Some(dir) => InMemRepo::with_snapshot_dir(dir),
            None => InMemRepo::new(),
        };
        info!(snapshot = cfg.data_dir.is_some(), "Using in-memory repository backend");
        return Ok(Arc::new(repo));
    }

    Err(anyhow::anyhow!("no repository backend enabled; build with `inmem-store` or `postgres-store`"))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    info!("Bootstrapping pins4days");
    info!(origins = cfg.allowed_origins.len(), hsts = cfg.enable_hsts, worker = cfg.worker_enabled, "configuration loaded");

    let repo = build_repo(&cfg).await?;
    let state = web::Data::new(AppState { repo, config: cfg.clone() });
    let openapi = ApiDoc::openapi();

    let server_cfg = cfg.clone();
    let server = HttpServer::new(move || {
        let cors = server_cfg
            .allowed_origins
            .iter()
            .fold(Cors::default(), |c, origin| c.allowed_origin(origin))
            .allowed_methods(["GET"])
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::new(server_cfg.enable_hsts))
            .wrap(cors)
            .app_data(state.clone())
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()));

        if server_cfg.worker_enabled {
            app = app.configure(worker_config);
        }
        app
    })
    .bind(cfg.bind_addr.as_str())?;

    info!("Listening on http://{}", cfg.bind_addr);

    server.run().await?;
    Ok(())
}

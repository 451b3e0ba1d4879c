use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use quizverse_server::{app_state::AppState, auth::JwtService, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    if std::env::var("APP_ENV").as_deref() == Ok("production") {
        config.validate_for_production();
    }

    let jwt_service = web::Data::new(JwtService::new(
        &config.jwt_secret,
        config.jwt_expiration_hours,
    ));
    let bind = (config.web_server_host.clone(), config.web_server_port);

    let app_state = AppState::new(config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let app_state = web::Data::new(app_state);

    log::info!("Starting HTTP server on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(jwt_service.clone())
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run()
    .await
}

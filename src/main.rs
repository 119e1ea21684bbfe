use dosewise::config::AppConfig;

#[tokio::main]
async fn main() {
    dosewise::init_tracing();

    let config = AppConfig::from_env();
    if let Err(e) = dosewise::run(config).await {
        tracing::error!("Fatal: {e}");
        std::process::exit(1);
    }
}

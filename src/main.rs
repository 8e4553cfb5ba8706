use clap::Parser;
use fanscope::app::App;
use fanscope::cli::{Args, ServiceName};
use fanscope::logging::setup_logging;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are
    // never silently dropped.
    let early_config = {
        use figment::providers::Env;
        figment::Figment::new()
            .merge(Env::raw())
            .extract::<fanscope::config::Config>()
            .expect("Failed to load config for logging setup")
    };
    setup_logging(&early_config, args.tracing);

    let mut app = App::new().await.expect("Failed to initialize application");

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting fanscope"
    );

    let enabled_services = ServiceName::all();
    app.setup_services(&enabled_services)
        .expect("Failed to setup services");

    app.start_services();
    app.run().await
}

use bannerart::cli::CliOptions;
use bannerart::config::{audit_settings, setup_logging};
use bannerart::web::{AppState, setup_server};
use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }
    audit_settings(&cli);

    let state = match AppState::from_options(&cli) {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to set up services: {}", err);
            return;
        }
    };

    if let Err(err) = setup_server(&cli.listen_address, cli.port, state).await {
        error!("Application error: {}", err);
    }
}

use std::net::SocketAddr;

use foodgram_sdk::{
    config::Config,
    routes::{handle_rejection, routes},
    state::State,
};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let port = config.port;
    let state = State::new(config).await?;

    let app = routes(state)
        .recover(handle_rejection)
        .with(warp::log("foodgram"));

    let address = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Listening on {address}");
    warp::serve(app).run(address).await;

    Ok(())
}

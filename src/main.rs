use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use paperbot::{
    tools::arxiv_toolkit, Agent, AnswerSynthesizer, AppConfig, ArxivGateway, BotServer,
};

#[tokio::main]
async fn main() -> paperbot::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path =
        std::env::var("PAPERBOT_CONFIG").unwrap_or_else(|_| "paperbot.toml".to_string());
    let config = AppConfig::from_env_or_file(&config_path)?;

    let model = paperbot::build_model(&config.model)?;
    let gateway = Arc::new(ArxivGateway::from_config(&config.arxiv)?);
    let synthesizer = Arc::new(AnswerSynthesizer::new(model.clone()));
    let tools = arxiv_toolkit(gateway, synthesizer);
    let agent = Arc::new(Agent::new(model).with_tools(tools));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|err| paperbot::PaperbotError::Protocol(format!("bad listen address: {err}")))?;

    BotServer::new(agent).serve(addr).await
}

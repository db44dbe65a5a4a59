//! `orbitchat serve`: start the HTTP API server and web frontend.

use orbitchat_config::AppConfig;

pub async fn run(
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("OrbitChat server");
    println!("   Listening:  http://{}", config.gateway.addr());
    println!("   Model:      {}", config.default_model);
    println!(
        "   Chat key:   {}",
        if config.has_api_key() { "configured" } else { "MISSING (chat requests will fail)" }
    );
    println!(
        "   NASA key:   {}",
        if config.has_data_key() { "configured" } else { "missing (space data disabled)" }
    );

    orbitchat_gateway::start(config).await?;

    Ok(())
}

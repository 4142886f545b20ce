//! `server <key_file> <vpn_server_ip|"auto"> <port|"auto"> <tun_name|"auto">`
//! `       <local_tun_ip|"auto"> <remote_tun_ip|"auto"> <external_ip|"auto">`

use clap::Parser;

use duotun::config::{EndpointConfig, PeerRole, RawArgs};
use duotun::endpoint::Endpoint;
use duotun::event_loop;
use duotun::signals::ExitFlag;

#[derive(Parser)]
#[command(name = "server", about = "Run the VPN server endpoint")]
struct Args {
    key_file: String,
    vpn_server_ip: String,
    port: String,
    tun_name: String,
    local_tun_ip: String,
    remote_tun_ip: String,
    external_ip: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = duotun::logging::init() {
        eprintln!("failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(254);
        }
    };

    let raw = RawArgs {
        key_file: args.key_file,
        server_or_bind_ip: args.vpn_server_ip,
        port: args.port,
        tun_name: args.tun_name,
        local_tun_ip: args.local_tun_ip,
        remote_tun_ip: args.remote_tun_ip,
        ext_or_gateway_ip: args.external_ip,
    };

    let config = match EndpointConfig::resolve(PeerRole::Server, raw) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let exit_flag = ExitFlag::new();
    if let Err(e) = duotun::signals::install(exit_flag.clone()).await {
        tracing::error!("failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    let mut endpoint = match Endpoint::init_server(config, exit_flag).await {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("server listening on {}:{}", endpoint.config.bind_or_server_ip, endpoint.config.port);

    match event_loop::run(&mut endpoint).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!("fatal: {}", e);
            std::process::exit(1);
        }
    }
}

//! Endpoint initialization (spec §4.7): load the PSK, open the TUN
//! device, derive tunnel addresses, and — per role — install firewall
//! rules and open a listener, or run the reconnect driver once so the
//! first connection is subject to the same retry policy as later
//! recoveries.

use tokio::net::TcpListener;
use tun::AsyncDevice;

use crate::config::{EndpointConfig, PeerRole};
use crate::consts::DEFAULT_MTU;
use crate::crypto::psk::load_key_file;
use crate::crypto::HandshakeState;
use crate::error::VpnError;
use crate::platform::firewall::{firewall_rules_cmds, FirewallState, FirewallVars};
use crate::platform::{net_info, tun};
use crate::session::Session;
use crate::signals::ExitFlag;

pub struct Endpoint {
    pub config: EndpointConfig,
    pub handshake_state: HandshakeState,
    pub tun: AsyncDevice,
    pub listener: Option<TcpListener>,
    pub session: Option<Session>,
    pub firewall: FirewallState,
    pub firewall_cmds: (Vec<String>, Vec<String>),
    pub exit_flag: ExitFlag,
    /// Last gateway IP observed (client only) — a change triggers a
    /// firewall unset/set around the next reconnect.
    pub last_gateway: String,
    pub if_name: String,
}

impl Endpoint {
    pub async fn init_server(config: EndpointConfig, exit_flag: ExitFlag) -> Result<Self, VpnError> {
        let key = load_key_file(&config.key_file)?;
        let handshake_state = HandshakeState::from_psk(&key);

        let tun = tun::open(config.tun_name.as_deref(), &config.local_tun_ip, &config.remote_tun_ip, DEFAULT_MTU)?;
        let if_name = tun::interface_name(&tun)?;

        tracing::info!(
            local = %config.local_tun_ip,
            remote = %config.remote_tun_ip,
            local_v6 = %config.local_tun_ipv6(),
            "tun interface {} up",
            if_name
        );

        let vars = FirewallVars {
            if_name: if_name.clone(),
            ext_if_name: config.ext_if_name.clone(),
            ext_gw_ip: config.ext_gw_ip.clone(),
            local_tun_ip: config.local_tun_ip.clone(),
        };
        let firewall_cmds = firewall_rules_cmds(true, &vars);
        let mut firewall = FirewallState::new();
        firewall.set(&firewall_cmds.0)?;

        let bind_addr = format!("{}:{}", config.bind_or_server_ip, config.port)
            .parse()
            .map_err(|e| VpnError::ConfigError(format!("invalid bind address: {}", e)))?;
        let listener = crate::transport::tcp::bind_listener(bind_addr)?;

        Ok(Self {
            config,
            handshake_state,
            tun,
            listener: Some(listener),
            session: None,
            firewall,
            firewall_cmds,
            exit_flag,
            last_gateway: String::new(),
            if_name,
        })
    }

    pub async fn init_client(config: EndpointConfig, exit_flag: ExitFlag) -> Result<Self, VpnError> {
        let key = load_key_file(&config.key_file)?;
        let handshake_state = HandshakeState::from_psk(&key);

        let tun = tun::open(config.tun_name.as_deref(), &config.local_tun_ip, &config.remote_tun_ip, DEFAULT_MTU)?;
        let if_name = tun::interface_name(&tun)?;

        tracing::info!(
            local = %config.local_tun_ip,
            remote = %config.remote_tun_ip,
            local_v6 = %config.local_tun_ipv6(),
            "tun interface {} up",
            if_name
        );

        let gateway = config.ext_gw_ip.clone();
        let vars = FirewallVars {
            if_name: if_name.clone(),
            ext_if_name: String::new(),
            ext_gw_ip: gateway.clone(),
            local_tun_ip: config.local_tun_ip.clone(),
        };
        let firewall_cmds = firewall_rules_cmds(false, &vars);

        // Unlike the server, the client's rules go up only after its
        // first successful handshake (inside `event_loop::reconnect`),
        // not here — there is no tunnel to protect yet.
        Ok(Self {
            config,
            handshake_state,
            tun,
            listener: None,
            session: None,
            firewall: FirewallState::new(),
            firewall_cmds,
            exit_flag,
            last_gateway: gateway,
            if_name,
        })
    }

    pub fn role(&self) -> PeerRole {
        self.config.role
    }

    /// Re-reads the default gateway; if it changed, reinstalls firewall
    /// rules (unset then set) so routes remain consistent (scenario 6).
    pub fn refresh_gateway_if_changed(&mut self) -> Result<(), VpnError> {
        let current = net_info::get_default_gw_ip()?;
        if current != self.last_gateway {
            tracing::info!(old = %self.last_gateway, new = %current, "default gateway changed, reinstalling firewall rules");
            self.firewall.unset(&self.firewall_cmds.1)?;
            let vars = FirewallVars {
                if_name: self.if_name.clone(),
                ext_if_name: String::new(),
                ext_gw_ip: current.clone(),
                local_tun_ip: self.config.local_tun_ip.clone(),
            };
            self.firewall_cmds = firewall_rules_cmds(false, &vars);
            self.firewall.set(&self.firewall_cmds.0)?;
            self.last_gateway = current;
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        let _ = self.firewall.unset(&self.firewall_cmds.1);
        self.session = None;
    }
}

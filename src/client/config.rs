//! Client configuration.

use std::time::Duration;

/// Knobs shared by both dialect clients. The machine name is threaded in
/// explicitly — it feeds the NetBIOS calling name and the NTLMv2 target
/// information — rather than read from the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub machine_name: String,
    /// Bound on SMB2 response and credit waits.
    pub response_timeout: Duration,
    /// SMB1: refuse servers that cannot do extended security.
    pub force_extended_security: bool,
    /// SMB1: the receive buffer size advertised to the server.
    pub client_max_buffer_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            machine_name: "RSMBCLIENT".to_string(),
            response_timeout: Duration::from_secs(60),
            force_extended_security: false,
            client_max_buffer_size: 65535,
        }
    }
}

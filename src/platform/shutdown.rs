//! Shutdown request transports.
//!
//! The handheld's front-end listens for a `SHUTDOWN` network command on a
//! local UDP port and powers the system down cleanly. Boards without the
//! front-end can run a privileged command instead. Both are fire-and-forget:
//! the engine keeps sampling until the OS terminates it.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::process::{Command, Stdio};
use std::thread;

use super::{PlatformError, ShutdownReason, ShutdownRequester};
use crate::config::ShutdownConfig;

/// Builds the requester selected by `[shutdown] method`.
pub fn create_shutdown_requester(
    config: &ShutdownConfig,
) -> Result<Box<dyn ShutdownRequester>, PlatformError> {
    match config {
        ShutdownConfig::Udp { address, payload } => {
            UdpShutdown::new(address.clone(), payload.clone())
                .map(|s| Box::new(s) as Box<dyn ShutdownRequester>)
        }
        ShutdownConfig::Command { program, args } => {
            Ok(Box::new(CommandShutdown::new(program.clone(), args.clone())))
        }
    }
}

// ---------------------------------------------------------------------------
// UDP network command
// ---------------------------------------------------------------------------

/// Sends one datagram carrying `payload` to `address` per request.
pub struct UdpShutdown {
    socket: UdpSocket,
    address: SocketAddr,
    payload: String,
}

impl UdpShutdown {
    /// Resolves `address` up front so a bad `[shutdown] address` fails at
    /// startup rather than when the battery runs out.
    pub fn new(address: String, payload: String) -> Result<Self, PlatformError> {
        let address = address
            .to_socket_addrs()
            .map_err(|e| PlatformError::Shutdown(format!("invalid address {address:?}: {e}")))?
            .next()
            .ok_or_else(|| PlatformError::Shutdown(format!("{address:?} resolved to nothing")))?;

        let local = if address.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)
            .map_err(|e| PlatformError::Shutdown(format!("could not bind udp socket: {e}")))?;
        Ok(Self { socket, address, payload })
    }
}

impl ShutdownRequester for UdpShutdown {
    fn request(&mut self, reason: ShutdownReason) -> Result<(), PlatformError> {
        self.socket
            .send_to(self.payload.as_bytes(), self.address)
            .map_err(|e| PlatformError::Shutdown(format!("send to {}: {e}", self.address)))?;
        log::info!("shutdown: sent {:?} to {} ({reason})", self.payload, self.address);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Local command
// ---------------------------------------------------------------------------

/// Spawns `program args..` per request without waiting for it to finish.
pub struct CommandShutdown {
    program: String,
    args: Vec<String>,
}

impl CommandShutdown {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl ShutdownRequester for CommandShutdown {
    fn request(&mut self, reason: ShutdownReason) -> Result<(), PlatformError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| PlatformError::Shutdown(format!("spawn {}: {e}", self.program)))?;
        log::info!("shutdown: spawned {} (pid {}, {reason})", self.program, child.id());

        // Reap in the background so the sampling loop never blocks on it.
        thread::spawn(move || {
            if let Err(e) = child.wait() {
                log::warn!("shutdown: waiting for command failed: {e}");
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn udp_request_delivers_payload() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let mut shutdown = UdpShutdown::new(address, "SHUTDOWN".into()).unwrap();
        shutdown.request(ShutdownReason::PowerSwitch).unwrap();

        let mut buf = [0u8; 32];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"SHUTDOWN");
    }

    #[test]
    fn address_without_port_is_rejected_at_startup() {
        let config = ShutdownConfig::Udp {
            address: "127.0.0.1".into(),
            payload: "SHUTDOWN".into(),
        };
        assert!(matches!(
            create_shutdown_requester(&config),
            Err(PlatformError::Shutdown(_))
        ));
    }

    #[test]
    fn default_udp_config_builds() {
        assert!(create_shutdown_requester(&ShutdownConfig::default()).is_ok());
    }

    #[test]
    fn missing_program_is_error() {
        let mut shutdown = CommandShutdown::new("/nonexistent/poweroff".into(), vec![]);
        assert!(shutdown.request(ShutdownReason::LowBattery).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn command_request_spawns_program() {
        let mut shutdown = CommandShutdown::new("true".into(), vec![]);
        assert!(shutdown.request(ShutdownReason::PowerSwitch).is_ok());
    }

    #[test]
    fn factory_selects_command_transport() {
        let config = ShutdownConfig::Command {
            program: "true".into(),
            args: vec![],
        };
        assert!(create_shutdown_requester(&config).is_ok());
    }
}

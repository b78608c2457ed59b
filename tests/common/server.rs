//! Test server management.
//!
//! Spawns and manages minircd instances for integration testing. Each
//! test picks its own port so tests can run in parallel.

use std::net::TcpStream;
use std::process::{Child, Command};
use std::thread::sleep;
use std::time::Duration;

/// Password every test server is started with.
pub const TEST_PASSWORD: &str = "secret";

/// A minircd instance under test.
pub struct TestServer {
    child: Child,
    port: u16,
}

impl TestServer {
    /// Spawn a server on the given port and wait for it to listen.
    pub fn spawn(port: u16) -> anyhow::Result<Self> {
        let child = Command::new(env!("CARGO_BIN_EXE_minircd"))
            .arg(port.to_string())
            .arg(TEST_PASSWORD)
            .spawn()?;
        let server = Self { child, port };
        server.wait_until_ready()?;
        Ok(server)
    }

    fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(100));
        }
        anyhow::bail!("server failed to start within 5 seconds")
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Connect a raw test client.
    pub fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

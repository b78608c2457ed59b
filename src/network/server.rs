//! The readiness loop and connection multiplexer.
//!
//! One mio `Poll` multiplexes the listener and every client socket on a
//! single thread; nothing else ever blocks. Each iteration re-arms write
//! interest for clients with queued output, waits for readiness, accepts
//! pending connections, dispatches reads then writes per client, and
//! finally reaps every client flagged for removal during the iteration.

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Registry, Token, Waker};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, trace, warn};

use minirc_proto::Message;

use crate::handlers;
use crate::state::ServerState;

use super::connection::{Connection, ReadOutcome};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);

/// Listener backlog length.
const BACKLOG: i32 = 10;

/// The IRC server: listener, readiness plumbing, and the state tables.
pub struct Server {
    port: u16,
    state: ServerState,
    listener: Option<TcpListener>,
    poll: Option<Poll>,
    local_addr: Option<SocketAddr>,
    stop: Arc<AtomicBool>,
    waker: Option<Arc<Waker>>,
}

/// Cloneable handle that requests loop shutdown from another thread.
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
    waker: Option<Arc<Waker>>,
}

impl StopHandle {
    /// Flag the loop to stop and wake it up. The loop tears down between
    /// iterations; queued client output is not drained.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(waker) = &self.waker {
            let _ = waker.wake();
        }
    }
}

impl Server {
    pub fn new(port: u16, password: String) -> Self {
        Self {
            port,
            state: ServerState::new(password),
            listener: None,
            poll: None,
            local_addr: None,
            stop: Arc::new(AtomicBool::new(false)),
            waker: None,
        }
    }

    /// Bind and listen. Port zero asks the kernel for an ephemeral port,
    /// readable afterwards through [`Server::local_addr`].
    pub fn setup(&mut self) -> io::Result<()> {
        let poll = Poll::new()?;
        let waker = Waker::new(poll.registry(), WAKER)?;
        let mut listener = bind_listener(self.port)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        let local_addr = listener.local_addr()?;
        info!(port = local_addr.port(), "server listening");

        self.local_addr = Some(local_addr);
        self.listener = Some(listener);
        self.poll = Some(poll);
        self.waker = Some(Arc::new(waker));
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Handle for stopping the loop; valid before and after `setup`.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
            waker: self.waker.clone(),
        }
    }

    /// Drive the loop until stopped or a fatal poll error.
    pub fn run(&mut self) -> io::Result<()> {
        let mut poll = self
            .poll
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "run() called before setup()"))?;
        let mut events = Events::with_capacity(256);

        while !self.stop.load(Ordering::SeqCst) {
            self.arm_interest(poll.registry());

            let timeout = self.state.next_registration_deadline(Instant::now());
            match poll.poll(&mut events, timeout) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "poll failed");
                    self.teardown(poll.registry());
                    return Err(e);
                }
            }

            // New connections are admitted before any client I/O in the
            // same iteration.
            if events.iter().any(|event| event.token() == LISTENER) {
                self.accept_pending(poll.registry());
            }

            for event in events.iter() {
                let token = event.token();
                if token == LISTENER || token == WAKER {
                    continue;
                }
                let fd = token.0 as RawFd;
                if event.is_error() {
                    self.mark_disconnected(fd);
                    continue;
                }
                // Reads come before writes for the same descriptor.
                if event.is_readable() || event.is_read_closed() {
                    self.handle_readable(fd);
                }
                if event.is_writable() {
                    self.handle_writable(fd);
                }
            }

            self.state.sweep_registration_timeouts(Instant::now());
            self.reap_disconnected(poll.registry());
        }

        self.teardown(poll.registry());
        Ok(())
    }

    /// Step one of each iteration: read interest always, write interest
    /// only while output is queued.
    fn arm_interest(&mut self, registry: &Registry) {
        for client in self.state.clients.values_mut() {
            if client.disconnected {
                continue;
            }
            let wants_write = client.conn.wants_write();
            if wants_write == client.conn.armed_writable() {
                continue;
            }
            let interest = if wants_write {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };
            let token = Token(client.fd() as usize);
            match registry.reregister(client.conn.stream_mut(), token, interest) {
                Ok(()) => client.conn.set_armed_writable(wants_write),
                Err(e) => {
                    warn!(fd = client.fd(), error = %e, "reregister failed");
                    client.mark_disconnected();
                }
            }
        }
    }

    /// Accept until the listener reports would-block.
    fn accept_pending(&mut self, registry: &Registry) {
        loop {
            let Some(listener) = self.listener.as_ref() else {
                return;
            };
            match listener.accept() {
                Ok((mut stream, peer)) => {
                    let fd = stream.as_raw_fd();
                    if let Err(e) =
                        registry.register(&mut stream, Token(fd as usize), Interest::READABLE)
                    {
                        warn!(error = %e, "failed to register accepted connection");
                        continue;
                    }
                    debug!(fd, peer = %peer, "connection accepted");
                    self.state.add_client(fd, Connection::new(stream));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    /// Drain the socket, frame lines, and dispatch commands in arrival
    /// order. Stops as soon as the client is flagged for removal.
    fn handle_readable(&mut self, fd: RawFd) {
        loop {
            let outcome = {
                let Some(client) = self.state.clients.get_mut(&fd) else {
                    return;
                };
                if client.disconnected {
                    return;
                }
                client.conn.read_chunk()
            };
            match outcome {
                Ok(ReadOutcome::Data(n)) => {
                    trace!(fd, bytes = n, "read chunk");
                    if !self.process_input(fd) {
                        return;
                    }
                }
                Ok(ReadOutcome::WouldBlock) => return,
                Ok(ReadOutcome::Closed) => {
                    debug!(fd, "peer closed connection");
                    self.mark_disconnected(fd);
                    return;
                }
                Err(e) => {
                    debug!(fd, error = %e, "read error");
                    self.mark_disconnected(fd);
                    return;
                }
            }
        }
    }

    /// Frame and dispatch buffered input. Returns false when the client
    /// went away or tripped the input cap.
    fn process_input(&mut self, fd: RawFd) -> bool {
        let (lines, overflowed) = {
            let Some(client) = self.state.clients.get_mut(&fd) else {
                return false;
            };
            let lines = client.conn.take_lines();
            (lines, client.conn.input_overflowed())
        };

        for line in lines {
            // Unparseable frames are dropped without a reply.
            let Ok(msg) = line.parse::<Message>() else {
                continue;
            };
            handlers::dispatch(&mut self.state, fd, msg);
            let gone = self
                .state
                .clients
                .get(&fd)
                .map(|c| c.disconnected)
                .unwrap_or(true);
            if gone {
                return false;
            }
        }

        if overflowed {
            warn!(fd, "input buffer cap exceeded");
            self.state
                .send_line(fd, "ERROR :Client exceeded buffer size limit");
            if let Some(client) = self.state.clients.get_mut(&fd) {
                client.conn.clear_input();
                client.mark_disconnected();
            }
            return false;
        }
        true
    }

    fn handle_writable(&mut self, fd: RawFd) {
        let Some(client) = self.state.clients.get_mut(&fd) else {
            return;
        };
        if client.disconnected {
            return;
        }
        if let Err(e) = client.conn.flush() {
            debug!(fd, error = %e, "write error");
            client.mark_disconnected();
        }
    }

    fn mark_disconnected(&mut self, fd: RawFd) {
        if let Some(client) = self.state.clients.get_mut(&fd) {
            client.mark_disconnected();
        }
    }

    /// End-of-iteration removal: propagate QUIT through the state, try
    /// one final non-blocking drain so protocol ERROR lines reach the
    /// peer, then deregister and close. Whatever does not send
    /// immediately is discarded.
    fn reap_disconnected(&mut self, registry: &Registry) {
        let doomed: Vec<RawFd> = self
            .state
            .clients
            .values()
            .filter(|c| c.disconnected)
            .map(|c| c.fd())
            .collect();
        for fd in doomed {
            if let Some(mut client) = self.state.remove_client(fd) {
                let _ = client.conn.flush();
                let _ = registry.deregister(client.conn.stream_mut());
                debug!(fd, nick = %client.nickname, "client removed");
            }
        }
    }

    fn teardown(&mut self, registry: &Registry) {
        info!("shutting down");
        if let Some(mut listener) = self.listener.take() {
            let _ = registry.deregister(&mut listener);
        }
        let fds: Vec<RawFd> = self.state.clients.keys().copied().collect();
        for fd in fds {
            if let Some(mut client) = self.state.clients.remove(&fd) {
                let _ = registry.deregister(client.conn.stream_mut());
            }
        }
    }
}

/// Build the listening socket by hand so the backlog can be pinned.
fn bind_listener(port: u16) -> io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    Ok(TcpListener::from_std(socket.into()))
}

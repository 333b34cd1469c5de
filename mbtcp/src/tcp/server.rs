use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::decode::DecodeLevel;
use crate::server::RequestRouter;
use crate::server::task::SessionTask;

struct SessionTracker {
    id: u64,
    sessions: BTreeMap<u64, tokio::sync::mpsc::Sender<()>>,
}

type SessionTrackerWrapper = Arc<Mutex<SessionTracker>>;

impl SessionTracker {
    fn new() -> SessionTracker {
        Self {
            id: 0,
            sessions: BTreeMap::new(),
        }
    }

    fn get_next_id(&mut self) -> u64 {
        let ret = self.id;
        self.id += 1;
        ret
    }

    fn wrapped() -> SessionTrackerWrapper {
        Arc::new(Mutex::new(Self::new()))
    }

    fn add(&mut self, sender: tokio::sync::mpsc::Sender<()>) -> u64 {
        let id = self.get_next_id();
        self.sessions.insert(id, sender);
        id
    }

    fn remove(&mut self, id: u64) {
        self.sessions.remove(&id);
    }

    // dropping every sender stops every session
    fn clear(&mut self) {
        self.sessions.clear();
    }
}

// pause after a failed accept so errors like EMFILE do not spin the loop
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Source of incoming connections for the accept loop
pub(crate) trait Listener: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(
        &mut self,
    ) -> impl Future<Output = std::io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> std::io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

pub(crate) struct ServerTask<L: Listener> {
    listener: L,
    router: RequestRouter,
    tracker: SessionTrackerWrapper,
    decode: DecodeLevel,
}

impl<L: Listener> ServerTask<L> {
    pub(crate) fn new(listener: L, router: RequestRouter, decode: DecodeLevel) -> Self {
        Self {
            listener,
            router,
            tracker: SessionTracker::wrapped(),
            decode,
        }
    }

    pub(crate) async fn run(&mut self, mut shutdown: tokio::sync::mpsc::Receiver<()>) {
        loop {
            tokio::select! {
               _ = shutdown.recv() => {
                    tracing::info!("server shutdown");
                    break;
               }
               result = self.listener.accept() => {
                   match result {
                        Err(err) => {
                            tracing::warn!("error accepting connection: {}", err);
                            tokio::select! {
                                _ = shutdown.recv() => {
                                    tracing::info!("server shutdown");
                                    break;
                                }
                                _ = tokio::time::sleep(ACCEPT_ERROR_DELAY) => {}
                            }
                        }
                        Ok((socket, addr)) => {
                            self.handle(socket, addr)
                        }
                   }
               }
            }
        }

        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.clear();
        }
    }

    fn handle(&self, socket: L::Stream, addr: SocketAddr) {
        let router = self.router.clone();
        let tracker = self.tracker.clone();
        let decode = self.decode;
        let (tx, rx) = tokio::sync::mpsc::channel(1);

        let id = match self.tracker.lock() {
            Ok(mut tracker) => tracker.add(tx),
            Err(_) => {
                tracing::error!("session tracker poisoned, rejecting connection from: {}", addr);
                return;
            }
        };

        tracing::info!("accepted connection {} from: {}", id, addr);

        let session = async move {
            if let Err(err) = SessionTask::new(socket, router, rx, decode).run().await {
                tracing::info!("session closed: {}", err);
            }
            tracing::info!("shutdown session: {}", id);
            if let Ok(mut tracker) = tracker.lock() {
                tracker.remove(id);
            }
        };

        tokio::spawn(session.instrument(tracing::info_span!("Session", id = id, remote = %addr)));
    }
}

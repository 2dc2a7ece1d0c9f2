//! Session bootstrap, the fixed-rate tick loop, and teardown.
//!
//! Task layout for one session:
//! - one ingest task per controller, writing only that controller's cell
//! - one observer acceptor, inserting into the shared observer registry
//! - the tick loop (the caller's task), the only reader of the cells and the
//!   only writer of simulation state; it also performs the broadcast
//!
//! The session ends the first time a send to a controller fails, or when a
//! shutdown is requested through the watch channel handed to `serve_on`.
//! Whatever the cause, teardown closes every connection and the listening
//! socket.

use crate::acceptor::run_acceptor;
use crate::broadcast::{fan_out, send_line};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::ingest::run_ingest;
use crate::leaderboard::ResultRecorder;
use crate::registry::{ControllerSlot, ObserverRegistry, SharedObservers};
use crate::simulation::{Side, Simulation, TickInput, TickOutcome};
use log::{debug, error, info, warn};
use shared::{frame_line, Handshake, LineCipher, Role};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Summary returned once a session has been torn down
#[derive(Debug)]
pub struct SessionReport {
    pub ticks: u64,
    pub rounds_completed: u32,
    pub ended_by: SessionError,
}

pub struct Session<W> {
    controllers: [ControllerSlot<W>; 2],
    observers: SharedObservers<W>,
    simulation: Simulation,
    recorder: Arc<dyn ResultRecorder>,
    cipher: Arc<dyn LineCipher>,
    pending_records: Vec<JoinHandle<()>>,
    rounds_completed: u32,
}

impl<W> Session<W>
where
    W: AsyncWrite + Unpin,
{
    /// `controllers` must be ordered left, right.
    pub fn new(
        controllers: [ControllerSlot<W>; 2],
        observers: SharedObservers<W>,
        recorder: Arc<dyn ResultRecorder>,
        cipher: Arc<dyn LineCipher>,
    ) -> Self {
        Self {
            controllers,
            observers,
            simulation: Simulation::new(),
            recorder,
            cipher,
            pending_records: Vec::new(),
            rounds_completed: 0,
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Runs one tick: read intents, step, record a win, broadcast.
    pub async fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        let [left, right] = &self.controllers;
        let input = TickInput {
            left: left.control.intent(),
            right: right.control.intent(),
            left_ready: left.control.is_ready(),
            right_ready: right.control.is_ready(),
        };

        let outcome = self.simulation.step(input);

        if outcome.rematch {
            for controller in &self.controllers {
                controller.control.clear_ready();
            }
            info!("Both controllers ready, starting a new round");
        }

        if let Some(side) = outcome.winner {
            self.rounds_completed += 1;
            self.record_win(side);
        }

        let line = frame_line(self.cipher.as_ref(), &self.simulation.snapshot().to_string());
        fan_out(line.as_bytes(), &mut self.controllers, &self.observers).await?;

        Ok(outcome)
    }

    /// Hands the winner's identity to the recorder off the tick path.
    fn record_win(&mut self, side: Side) {
        let slot = match side {
            Side::Left => &self.controllers[0],
            Side::Right => &self.controllers[1],
        };
        info!("{} controller ({}) wins the round", slot.role, slot.identity);

        let recorder = Arc::clone(&self.recorder);
        let identity = slot.identity.clone();
        self.pending_records
            .push(tokio::task::spawn_blocking(move || recorder.record_win(&identity)));
        self.pending_records.retain(|handle| !handle.is_finished());
    }

    /// Waits for every handed-off result to reach the recorder.
    pub async fn flush_records(&mut self) {
        for handle in self.pending_records.drain(..) {
            if let Err(e) = handle.await {
                warn!("Result recording task failed: {}", e);
            }
        }
    }

    /// Ticks at `tick_duration` until a controller send fails or shutdown
    /// is requested.
    pub async fn run(
        &mut self,
        tick_duration: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionError {
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_requested(shutdown) => return SessionError::Shutdown,
            }

            if let Err(e) = self.tick().await {
                return e;
            }

            if self.simulation.tick % 60 == 0 {
                let observer_count = self.observers.lock().await.len();
                debug!(
                    "Tick {}: {:?}, {} observers",
                    self.simulation.tick, self.simulation.phase, observer_count
                );
            }
        }
    }

    /// Closes every connection and waits for outstanding result records.
    pub async fn close(mut self, ended_by: SessionError) -> SessionReport {
        self.flush_records().await;

        let observers = self.observers.lock().await.drain();
        for mut observer in observers {
            let _ = observer.sink.shutdown().await;
        }
        for controller in self.controllers.iter_mut() {
            let _ = controller.sink.shutdown().await;
        }

        SessionReport {
            ticks: self.simulation.tick,
            rounds_completed: self.rounds_completed,
            ended_by,
        }
    }
}

/// Resolves once `shutdown` holds `true`. Pends forever if the sender is
/// dropped without ever requesting shutdown.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Binds the shared listening endpoint. Failure here is fatal before any
/// session exists.
pub async fn bind(addr: &str) -> Result<TcpListener, SessionError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| SessionError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!("Listening on {}", addr);
    Ok(listener)
}

/// Accepts the left then the right controller and sends each its handshake.
pub async fn accept_controllers(
    listener: &TcpListener,
    config: &SessionConfig,
    cipher: &dyn LineCipher,
) -> Result<[(ControllerSlot<OwnedWriteHalf>, OwnedReadHalf); 2], SessionError> {
    let left = accept_controller(listener, Role::Left, &config.left_identity, cipher).await?;
    let right = accept_controller(listener, Role::Right, &config.right_identity, cipher).await?;
    Ok([left, right])
}

async fn accept_controller(
    listener: &TcpListener,
    role: Role,
    identity: &str,
    cipher: &dyn LineCipher,
) -> Result<(ControllerSlot<OwnedWriteHalf>, OwnedReadHalf), SessionError> {
    let (stream, addr) = listener
        .accept()
        .await
        .map_err(|source| SessionError::Bootstrap { role, source })?;

    let (reader, mut writer) = stream.into_split();
    greet_controller(&mut writer, role, cipher).await?;

    info!("{} controller connected from {} as {}", role, addr, identity);
    Ok((ControllerSlot::new(role, identity, writer), reader))
}

/// Sends the role handshake. Any failure here is fatal to bootstrap.
async fn greet_controller<W>(
    sink: &mut W,
    role: Role,
    cipher: &dyn LineCipher,
) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    let handshake = frame_line(cipher, &Handshake::new(role).to_string());
    send_line(sink, handshake.as_bytes())
        .await
        .map_err(|source| SessionError::Bootstrap { role, source })
}

/// Runs one full session on an already bound listener.
///
/// Returns `Err` only if bootstrap fails or shutdown is requested before
/// both controllers joined; a session that ran and ended returns its report.
pub async fn serve_on(
    listener: TcpListener,
    config: SessionConfig,
    recorder: Arc<dyn ResultRecorder>,
    cipher: Arc<dyn LineCipher>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<SessionReport, SessionError> {
    let [(left, left_reader), (right, right_reader)] = tokio::select! {
        accepted = accept_controllers(&listener, &config, cipher.as_ref()) => accepted?,
        _ = shutdown_requested(&mut shutdown) => {
            info!("Shutdown requested while waiting for controllers");
            return Err(SessionError::Shutdown);
        }
    };

    let readers = [(&left, left_reader), (&right, right_reader)].map(|(slot, reader)| {
        let control = Arc::clone(&slot.control);
        let role = slot.role;
        let cipher = Arc::clone(&cipher);
        tokio::spawn(async move {
            run_ingest(reader, role, control, cipher).await;
        })
    });

    let observers = ObserverRegistry::shared();
    let acceptor = tokio::spawn(run_acceptor(
        listener,
        Arc::clone(&observers),
        Arc::clone(&cipher),
    ));

    let mut session = Session::new([left, right], observers, recorder, cipher);
    info!("Session started");
    let ended_by = session.run(config.tick_duration, &mut shutdown).await;
    if matches!(ended_by, SessionError::Shutdown) {
        info!("Session ending: {}", ended_by);
    } else {
        error!("Session ending: {}", ended_by);
    }

    acceptor.abort();
    for reader in readers {
        reader.abort();
    }
    let report = session.close(ended_by).await;
    info!(
        "Session closed after {} ticks and {} completed rounds",
        report.ticks, report.rounds_completed
    );

    Ok(report)
}

/// Binds `config.bind_addr` and runs one session on it.
pub async fn serve(
    config: SessionConfig,
    recorder: Arc<dyn ResultRecorder>,
    cipher: Arc<dyn LineCipher>,
    shutdown: watch::Receiver<bool>,
) -> Result<SessionReport, SessionError> {
    let listener = bind(&config.bind_addr).await?;
    serve_on(listener, config, recorder, cipher, shutdown).await
}

use super::*;

/// Process-wide registry mapping device identity to its one [`Session`].
///
/// Constructed once at startup and injected into whatever drives polling;
/// [`SessionManager::close_all`] tears it down at shutdown. There are no
/// ambient globals, so tests build a fresh manager per case.
pub struct SessionManager {
    /// Device addr -> session. Unbounded and never idle-evicted: a session
    /// lives until `close_all`, dead or alive, while its reconnect loop
    /// works in the background.
    sessions: Cache<String, Arc<Session>>,
    credentials: Arc<dyn CredentialSource>,
    settings: SessionSettings,
    reconnect_tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(credentials: Arc<dyn CredentialSource>, settings: SessionSettings) -> Self {
        Self {
            sessions: Cache::builder().build(),
            credentials,
            settings,
            reconnect_tasks: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Returns the session for a device, dialing it on first use.
    ///
    /// Concurrent acquisitions for the same device share a single dial (at
    /// most one `Session` ever exists per identity), and a dial in progress
    /// never serializes acquisitions of unrelated devices. A cached session
    /// that fails its liveness probe is not handed out: the caller gets
    /// [`ConnectError::NotConnected`] and a background reconnect loop takes
    /// over the device.
    pub async fn acquire(&self, device: &Device) -> Result<Arc<Session>, ConnectError> {
        let key = device.addr().to_string();

        let session = self
            .sessions
            .try_get_with(key.clone(), async {
                debug!("{key}: no cached session, dialing");
                let credentials = self.credentials.credentials(device)?;
                let session = Session::connect(
                    device.clone(),
                    credentials,
                    SecurityOptions::for_level(device.security()),
                    self.settings,
                )
                .await?;
                Ok::<_, ConnectError>(Arc::new(session))
            })
            .await
            .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(ConnectError::Shared))?;

        if !session.is_alive().await {
            debug!("{key}: cached session is dead");
            self.spawn_reconnect(session);
            return Err(ConnectError::NotConnected(key));
        }
        Ok(session)
    }

    /// Starts the background reconnect loop for a dead session, unless one
    /// is already running.
    ///
    /// The loop retries at the fixed reconnect interval, forever: a
    /// persistently unreachable device keeps being retried until process
    /// shutdown. On success the fresh transport is swapped into the existing
    /// session, so references held by callers recover transparently.
    fn spawn_reconnect(&self, session: Arc<Session>) {
        if !session.begin_reconnect() {
            return;
        }
        let interval = self.settings.reconnect_interval;
        let handle = tokio::spawn(async move {
            debug!("{}: reconnect loop started", session.device());
            loop {
                tokio::time::sleep(interval).await;
                match session.redial().await {
                    Ok(()) => {
                        debug!("{}: reconnected", session.device());
                        break;
                    }
                    Err(err) => {
                        warn!("{}: reconnect attempt failed: {err}", session.device());
                    }
                }
            }
            session.end_reconnect();
        });

        let mut tasks = self
            .reconnect_tasks
            .lock()
            .expect("reconnect task list lock poisoned");
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Closes every session and cancels all reconnect loops.
    ///
    /// Used only at process shutdown.
    pub async fn close_all(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self
                .reconnect_tasks
                .lock()
                .expect("reconnect task list lock poisoned");
            tasks.drain(..).collect()
        };
        for task in tasks {
            task.abort();
        }

        for (_, session) in self.sessions.iter() {
            session.close().await;
        }
        self.sessions.invalidate_all();
        debug!("all sessions closed");
    }

    /// Number of sessions currently in the registry (connected or not).
    pub fn session_count(&self) -> u64 {
        self.sessions.entry_count()
    }
}

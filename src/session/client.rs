use super::*;

/// NETCONF 1.0 end-of-message delimiter (RFC 4742 framing).
const EOM: &[u8] = b"]]>]]>";

/// Baseline hello advertised on the NETCONF subsystem channel. The session
/// does not interpret capabilities; it only completes the exchange so the
/// peer starts accepting RPCs.
const CLIENT_HELLO: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">"#,
    r#"<capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities>"#,
    r#"</hello>"#,
);

/// The live transport behind a session.
#[derive(Debug)]
enum Transport {
    /// CLI mode: one exec channel per command.
    Cli { client: Client },
    /// NETCONF mode: a persistent subsystem channel; `buf` carries bytes
    /// read past the last delimiter.
    Netconf {
        client: Client,
        channel: Channel<Msg>,
        buf: Vec<u8>,
    },
}

impl Transport {
    fn client(&self) -> &Client {
        match self {
            Transport::Cli { client } | Transport::Netconf { client, .. } => client,
        }
    }

    async fn shutdown(self) {
        match self {
            Transport::Cli { client } => {
                let _ = client.disconnect().await;
            }
            Transport::Netconf {
                client, channel, ..
            } => {
                let _ = channel.eof().await;
                let _ = client.disconnect().await;
            }
        }
    }
}

/// One authenticated connection to one device.
///
/// The transport lives in a box behind a lock: `run` holds the lock for the
/// duration of a command (one command in flight per session), and the
/// reconnect loop swaps a fresh transport into the same box, so every caller
/// holding this `Session` sees the recovered connection without re-acquiring.
#[derive(Debug)]
pub struct Session {
    device: Device,
    credentials: Credentials,
    security: SecurityOptions,
    settings: SessionSettings,
    transport: Mutex<Option<Transport>>,
    reconnecting: AtomicBool,
}

impl Session {
    /// Dials, authenticates and (in NETCONF mode) opens the subsystem
    /// channel. Bounded by the connect timeout; no internal retry.
    pub(super) async fn connect(
        device: Device,
        credentials: Credentials,
        security: SecurityOptions,
        settings: SessionSettings,
    ) -> Result<Self, ConnectError> {
        let transport = dial(&device, &credentials, &security, &settings).await?;
        debug!("{}: session established", device);
        Ok(Self {
            device,
            credentials,
            security,
            settings,
            transport: Mutex::new(Some(transport)),
            reconnecting: AtomicBool::new(false),
        })
    }

    /// The identity this session was built for.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Sends one command and returns its raw output.
    ///
    /// CLI mode runs the command on a fresh exec channel; NETCONF mode
    /// writes the RPC envelope and reads up to the end-of-message delimiter.
    /// Command content is opaque to the session either way.
    pub async fn run(&self, command: &str) -> Result<Vec<u8>, ExecError> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(ExecError::NotConnected)?;
        run_on(transport, command).await
    }

    /// Like [`Session::run`] with a deadline.
    ///
    /// After a timeout the channel state is unknowable, so the transport is
    /// dropped and the session reads as dead until the manager reconnects it.
    pub async fn run_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, ExecError> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(ExecError::NotConnected)?;
        let result = tokio::time::timeout(timeout, run_on(transport, command)).await;
        match result {
            Ok(result) => result,
            Err(_) => {
                if let Some(transport) = guard.take() {
                    transport.shutdown().await;
                }
                warn!("{}: command timed out, session marked dead", self.device);
                Err(ExecError::Timeout(timeout))
            }
        }
    }

    /// Cheap liveness probe.
    ///
    /// Fast path is the transport's own closed flag; when that still reads
    /// open, a channel-open bounded by the keepalive timeout exercises the
    /// connection end to end.
    pub async fn is_alive(&self) -> bool {
        let guard = self.transport.lock().await;
        let Some(transport) = guard.as_ref() else {
            return false;
        };
        let client = transport.client();
        if client.is_closed() {
            return false;
        }
        matches!(
            tokio::time::timeout(self.settings.keepalive_timeout, client.get_channel()).await,
            Ok(Ok(_))
        )
    }

    /// Releases the transport. Idempotent.
    pub async fn close(&self) {
        let mut guard = self.transport.lock().await;
        if let Some(transport) = guard.take() {
            transport.shutdown().await;
            debug!("{}: session closed", self.device);
        }
    }

    /// Dials a replacement transport and swaps it into place.
    ///
    /// The dial happens before the transport lock is taken, so in-flight
    /// `run` callers are never blocked on a reconnection attempt.
    pub(super) async fn redial(&self) -> Result<(), ConnectError> {
        let transport = dial(
            &self.device,
            &self.credentials,
            &self.security,
            &self.settings,
        )
        .await?;
        let mut guard = self.transport.lock().await;
        if let Some(old) = guard.replace(transport) {
            old.shutdown().await;
        }
        Ok(())
    }

    /// Claims the (single) reconnect loop slot. Returns false when a loop is
    /// already running for this session.
    pub(super) fn begin_reconnect(&self) -> bool {
        self.reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(super) fn end_reconnect(&self) {
        self.reconnecting.store(false, Ordering::SeqCst);
    }
}

/// Dials the device and builds the mode-appropriate transport.
async fn dial(
    device: &Device,
    credentials: &Credentials,
    security: &SecurityOptions,
    settings: &SessionSettings,
) -> Result<Transport, ConnectError> {
    let config = Config {
        preferred: security.preferred(),
        // Sessions idle between poll cycles; protocol keepalives stand in
        // for an inactivity timeout.
        inactivity_timeout: None,
        keepalive_interval: Some(Duration::from_secs(10)),
        ..Default::default()
    };

    let connect = Client::connect_with_config(
        (device.host().to_string(), device.port()),
        &credentials.username,
        credentials.auth_method(),
        security.server_check.clone(),
        config,
    );
    let client = tokio::time::timeout(settings.connect_timeout, connect)
        .await
        .map_err(|_| ConnectError::Timeout {
            addr: device.addr().to_string(),
            timeout: settings.connect_timeout,
        })??;
    debug!("{}: transport connected", device);

    match device.mode() {
        TransportMode::Cli => Ok(Transport::Cli { client }),
        TransportMode::Netconf => {
            // Subsystem negotiation and the hello exchange count against the
            // connect timeout as well; a peer that accepts TCP but never
            // speaks NETCONF must not hang the dial.
            let negotiate = async {
                let mut channel = client.get_channel().await?;
                channel.request_subsystem(true, "netconf").await?;

                let mut buf = Vec::new();
                let hello = [CLIENT_HELLO.as_bytes(), EOM].concat();
                channel
                    .data(hello.as_slice())
                    .await
                    .map_err(ConnectError::Channel)?;
                // Drain the server hello; its capability list is not our
                // concern.
                read_frame(&mut channel, &mut buf)
                    .await
                    .map_err(|_| ConnectError::Hello(device.addr().to_string()))?;
                Ok::<_, ConnectError>((channel, buf))
            };
            let (channel, buf) = tokio::time::timeout(settings.connect_timeout, negotiate)
                .await
                .map_err(|_| ConnectError::Timeout {
                    addr: device.addr().to_string(),
                    timeout: settings.connect_timeout,
                })??;
            debug!("{}: netconf subsystem ready", device);

            Ok(Transport::Netconf {
                client,
                channel,
                buf,
            })
        }
    }
}

async fn run_on(transport: &mut Transport, command: &str) -> Result<Vec<u8>, ExecError> {
    match transport {
        Transport::Cli { client } => {
            let result = client.execute(command).await?;
            if result.exit_status != 0 {
                return Err(ExecError::CommandFailed {
                    status: result.exit_status,
                    detail: result.stderr.trim().to_string(),
                });
            }
            Ok(result.stdout.into_bytes())
        }
        Transport::Netconf { channel, buf, .. } => {
            let payload = [command.as_bytes(), EOM].concat();
            channel
                .data(payload.as_slice())
                .await
                .map_err(ExecError::Channel)?;
            read_frame(channel, buf).await
        }
    }
}

/// Takes one complete `]]>]]>`-delimited frame out of `buf`, if present.
/// Bytes past the delimiter stay in `buf` for the next frame.
fn split_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buf.windows(EOM.len()).position(|window| window == EOM)?;
    let mut frame: Vec<u8> = buf.drain(..pos + EOM.len()).collect();
    frame.truncate(pos);
    Some(frame)
}

/// Reads one framed message, returning it without the delimiter.
async fn read_frame(channel: &mut Channel<Msg>, buf: &mut Vec<u8>) -> Result<Vec<u8>, ExecError> {
    loop {
        if let Some(frame) = split_frame(buf) {
            return Ok(frame);
        }
        match channel.wait().await {
            Some(ChannelMsg::Data { ref data }) => buf.extend_from_slice(data),
            Some(ChannelMsg::ExtendedData { .. }) => {}
            Some(ChannelMsg::Eof)
            | Some(ChannelMsg::Close)
            | Some(ChannelMsg::ExitStatus { .. })
            | None => return Err(ExecError::Disconnected),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CLIENT_HELLO, split_frame};

    #[test]
    fn partial_buffer_yields_no_frame() {
        let mut buf = b"<rpc-reply/>]]".to_vec();
        assert_eq!(split_frame(&mut buf), None);
        assert_eq!(buf, b"<rpc-reply/>]]".to_vec());
    }

    #[test]
    fn frame_is_returned_without_delimiter() {
        let mut buf = b"<rpc-reply/>]]>]]>".to_vec();
        assert_eq!(split_frame(&mut buf), Some(b"<rpc-reply/>".to_vec()));
        assert!(buf.is_empty());
    }

    #[test]
    fn bytes_past_the_delimiter_stay_buffered() {
        let mut buf = b"<a/>]]>]]><b/>]]>]]>trailing".to_vec();
        assert_eq!(split_frame(&mut buf), Some(b"<a/>".to_vec()));
        assert_eq!(split_frame(&mut buf), Some(b"<b/>".to_vec()));
        assert_eq!(split_frame(&mut buf), None);
        assert_eq!(buf, b"trailing".to_vec());
    }

    #[test]
    fn hello_is_a_single_line_base_capability_announcement() {
        assert!(CLIENT_HELLO.starts_with("<?xml"));
        assert!(CLIENT_HELLO.contains("urn:ietf:params:netconf:base:1.0"));
        assert!(!CLIENT_HELLO.contains('\n'));
    }
}

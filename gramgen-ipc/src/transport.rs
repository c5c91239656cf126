//! IPC transport implementations
//!
//! Both directions of the protocol travel as newline-delimited JSON
//! envelopes. The worker talks over its own stdin/stdout; the controller
//! talks over the pipe ends of the child it spawned.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::IpcError;
use crate::protocol::{MessageEnvelope, IPC_PROTOCOL_VERSION};

/// IPC transport trait for different communication mechanisms
#[async_trait]
pub trait IpcTransport: Send {
    /// Send a message to the other end
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError>;

    /// Receive a message from the other end
    async fn receive<T: DeserializeOwned + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), IpcError>;
}

async fn write_envelope<W, T>(writer: &mut W, message: &MessageEnvelope<T>) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin + Send,
    T: Serialize,
{
    let mut line = serde_json::to_string(message)?;
    line.push('\n');

    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

async fn read_envelope<R, T>(reader: &mut R) -> Result<MessageEnvelope<T>, IpcError>
where
    R: AsyncBufRead + Unpin + Send,
    T: DeserializeOwned,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(IpcError::ConnectionClosed);
    }

    let envelope: MessageEnvelope<T> = serde_json::from_str(line.trim_end())?;
    if !envelope.is_compatible() {
        return Err(IpcError::ProtocolVersionMismatch {
            expected: IPC_PROTOCOL_VERSION,
            actual: envelope.protocol_version,
        });
    }

    Ok(envelope)
}

/// Stdin/Stdout IPC transport, used on the worker side of the connection
pub struct StdioTransport {
    stdin: BufReader<tokio::io::Stdin>,
    stdout: tokio::io::Stdout,
}

impl StdioTransport {
    /// Create a new stdio transport
    pub fn new() -> Self {
        Self {
            stdin: BufReader::new(tokio::io::stdin()),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpcTransport for StdioTransport {
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError> {
        write_envelope(&mut self.stdout, message).await
    }

    async fn receive<T: DeserializeOwned + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError> {
        read_envelope(&mut self.stdin).await
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        // Stdin/stdout don't need explicit closing
        Ok(())
    }
}

/// Controller-side transport over a spawned child's piped stdin/stdout
pub struct ChildProcessTransport {
    stdin: Option<tokio::process::ChildStdin>,
    stdout: Option<BufReader<tokio::process::ChildStdout>>,
}

impl ChildProcessTransport {
    /// Create a new child process transport
    pub fn new(stdin: tokio::process::ChildStdin, stdout: tokio::process::ChildStdout) -> Self {
        Self {
            stdin: Some(stdin),
            stdout: Some(BufReader::new(stdout)),
        }
    }
}

#[async_trait]
impl IpcTransport for ChildProcessTransport {
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError> {
        let stdin = self.stdin.as_mut().ok_or(IpcError::NotConnected)?;
        write_envelope(stdin, message).await
    }

    async fn receive<T: DeserializeOwned + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError> {
        let stdout = self.stdout.as_mut().ok_or(IpcError::NotConnected)?;
        read_envelope(stdout).await
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        // Take ownership and drop to close the pipe ends
        let _ = self.stdin.take();
        let _ = self.stdout.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{GenerationSpec, WorkerMessage};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_envelope_round_trip_through_buffer() {
        let message = WorkerMessage::Generate {
            spec: GenerationSpec::new(vec!["Grammar.g4".to_string()], "1g"),
            correlation_id: Uuid::new_v4(),
        };
        let envelope = MessageEnvelope::new(message);

        let mut buffer = Vec::new();
        write_envelope(&mut buffer, &envelope).await.unwrap();
        assert!(buffer.ends_with(b"\n"));

        let mut reader = BufReader::new(buffer.as_slice());
        let decoded: MessageEnvelope<WorkerMessage> = read_envelope(&mut reader).await.unwrap();
        assert_eq!(decoded.protocol_version, IPC_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_closed_stream_is_connection_closed() {
        let mut reader = BufReader::new(&b""[..]);
        let err = read_envelope::<_, WorkerMessage>(&mut reader).await.unwrap_err();
        assert!(matches!(err, IpcError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_rejected() {
        let line = format!(
            "{{\"protocol_version\":99,\"timestamp\":\"{}\",\"message\":{{\"type\":\"generate\",\"spec\":{{\"arguments\":[],\"max_heap_size\":\"1g\",\"working_dir\":null}},\"correlation_id\":\"{}\"}}}}\n",
            chrono::Utc::now().to_rfc3339(),
            Uuid::new_v4(),
        );
        let mut reader = BufReader::new(line.as_bytes());
        let err = read_envelope::<_, WorkerMessage>(&mut reader).await.unwrap_err();
        assert!(matches!(err, IpcError::ProtocolVersionMismatch { expected: 1, actual: 99 }));
    }
}

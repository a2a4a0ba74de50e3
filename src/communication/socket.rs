use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

//This trait is meant to abstract the byte stream the transport talks over,
//a TCP socket in production and in-memory pipes in tests
#[async_trait]
pub trait ModbusSocket: Send {
    /// Reads whatever is available into `buffer`, `Ok(0)` means the peer closed.
    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    async fn write(&mut self, data: &[u8]) -> io::Result<()>;

    async fn shutdown(&mut self) -> io::Result<()>;
}

#[async_trait]
impl<T> ModbusSocket for T
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        AsyncReadExt::read(self, buffer).await
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, data).await?;
        AsyncWriteExt::flush(self).await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(self).await
    }
}

/// Opens the byte stream for a transport.
#[async_trait]
pub trait ModbusConnector: Send + Sync {
    async fn connect(&self, address: &str) -> io::Result<Box<dyn ModbusSocket>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

#[async_trait]
impl ModbusConnector for TcpConnector {
    async fn connect(&self, address: &str) -> io::Result<Box<dyn ModbusSocket>> {
        let stream = TcpStream::connect(address).await?;
        // frames are small and latency bound
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

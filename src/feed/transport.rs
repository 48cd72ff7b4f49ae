use std::io;
use std::net::SocketAddr;

use socket2::SockRef;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use super::endpoint::Endpoint;

/// Kernel send/receive buffer size for feed connections. Feed messages are
/// a few dozen bytes, so this caps what sits between a publisher and a
/// subscriber that stopped reading at a few hundred messages.
pub(crate) const SOCKET_BUFFER_SIZE: u32 = 4096;

/// Byte stream carried by any transport
pub(crate) trait Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Conn for T {}

pub(crate) type BoxConn = Box<dyn Conn>;

pub(crate) async fn dial(endpoint: &Endpoint) -> io::Result<BoxConn> {
    match endpoint {
        Endpoint::Tcp { host, port } => {
            let mut last_err = None;
            for addr in tokio::net::lookup_host((host.as_str(), *port)).await? {
                match connect_tcp(addr).await {
                    Ok(stream) => return Ok(Box::new(stream)),
                    Err(e) => last_err = Some(e),
                }
            }
            Err(last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{host} resolved to no address"))
            }))
        }
        #[cfg(unix)]
        Endpoint::Ipc(path) => {
            let stream = tokio::net::UnixStream::connect(path).await?;
            shrink_buffers(SockRef::from(&stream))?;
            Ok(Box::new(stream))
        }
        #[cfg(not(unix))]
        Endpoint::Ipc(_) => Err(ipc_unsupported()),
    }
}

// The receive buffer must be sized before connecting, so that the window
// offered in the handshake already reflects it.
async fn connect_tcp(addr: SocketAddr) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_recv_buffer_size(SOCKET_BUFFER_SIZE)?;
    socket.set_send_buffer_size(SOCKET_BUFFER_SIZE)?;
    let stream = socket.connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

fn shrink_buffers(sock: SockRef<'_>) -> io::Result<()> {
    sock.set_send_buffer_size(SOCKET_BUFFER_SIZE as usize)?;
    sock.set_recv_buffer_size(SOCKET_BUFFER_SIZE as usize)
}

/// Listening side of a transport
pub(crate) enum Acceptor {
    Tcp(TcpListener),
    #[cfg(unix)]
    Ipc(tokio::net::UnixListener, std::path::PathBuf),
}

impl Acceptor {
    pub(crate) async fn bind(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Tcp { host, port } => {
                Ok(Acceptor::Tcp(TcpListener::bind((host.as_str(), *port)).await?))
            }
            #[cfg(unix)]
            Endpoint::Ipc(path) => {
                // A socket file left behind by a previous run blocks the bind.
                match tokio::fs::remove_file(path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
                let listener = tokio::net::UnixListener::bind(path)?;
                Ok(Acceptor::Ipc(listener, path.clone()))
            }
            #[cfg(not(unix))]
            Endpoint::Ipc(_) => Err(ipc_unsupported()),
        }
    }

    /// Actual endpoint after binding, with the kernel-chosen port filled in
    pub(crate) fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            Acceptor::Tcp(listener) => {
                let addr = listener.local_addr()?;
                Ok(Endpoint::Tcp {
                    host: addr.ip().to_string(),
                    port: addr.port(),
                })
            }
            #[cfg(unix)]
            Acceptor::Ipc(_, path) => Ok(Endpoint::Ipc(path.clone())),
        }
    }

    pub(crate) async fn accept(&self) -> io::Result<BoxConn> {
        match self {
            Acceptor::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                stream.set_nodelay(true)?;
                shrink_buffers(SockRef::from(&stream))?;
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Acceptor::Ipc(listener, _) => {
                let (stream, _) = listener.accept().await?;
                shrink_buffers(SockRef::from(&stream))?;
                Ok(Box::new(stream))
            }
        }
    }
}

#[cfg(not(unix))]
fn ipc_unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "ipc:// endpoints need Unix domain sockets",
    )
}

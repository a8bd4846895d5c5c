use super::http::{Request, Response};
use super::routes;
use crate::sentinel::Sentinel;
use std::io::{BufReader, ErrorKind};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(100);
const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind((host, port))?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Serves the dashboard until `running` is cleared. One thread per
/// connection; every response closes the connection.
pub fn start_http_server(
    listener: TcpListener,
    sentinel: Arc<Sentinel>,
    running: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        match listener.local_addr() {
            Ok(addr) => log::info!("HTTP server listening on http://{}", addr),
            Err(_) => log::info!("HTTP server started"),
        }

        while running.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let sentinel = Arc::clone(&sentinel);
                    std::thread::spawn(move || {
                        if let Err(e) = serve_connection(stream, &sentinel) {
                            log::debug!("Connection from {} ended: {}", peer, e);
                        }
                    });
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    log::warn!("Accept failed: {}", e);
                    std::thread::sleep(ACCEPT_POLL);
                }
            }
        }
        log::info!("HTTP server stopped");
    })
}

fn serve_connection(stream: TcpStream, sentinel: &Arc<Sentinel>) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut reader = BufReader::new(&stream);
    let response = match Request::read_from(&mut reader) {
        Ok(Some(request)) => {
            log::debug!("{} {}", request.method, request.path);
            routes::handle(sentinel, &request)
        }
        Ok(None) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::InvalidData => Response::error(400, &e.to_string()),
        Err(e) => return Err(e),
    };

    let mut writer = &stream;
    response.write_to(&mut writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::testing::{FakeSource, sentinel_with};
    use std::io::{Read, Write};

    #[test]
    fn serves_requests_over_tcp() {
        let (_dir, sentinel, _rx) = sentinel_with(FakeSource::offline(), |_| {});
        let listener = bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let handle = start_http_server(listener, Arc::new(sentinel), Arc::clone(&running));

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET /api/watchlist HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("{\"devices\":[]}"));

        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();
    }
}

//! `split` command implementation.
//!
//! Streams the concatenation of the given files to a UDP destination in
//! fixed-size datagrams, pausing between sends, and prints per-second rates.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::cli::SplitArgs;
use crate::error::CliError;

/// Default datagram payload (fits a 1500-byte MTU with headroom)
pub const DEFAULT_SPLIT_SIZE: usize = 1380;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Default)]
struct Counters {
    packets: AtomicU64,
    bytes: AtomicU64,
}

/// Execute the `split` command
pub async fn run_split(args: &SplitArgs) -> Result<()> {
    let size = if args.size == 0 { DEFAULT_SPLIT_SIZE } else { args.size };
    let interval = if args.interval.is_zero() {
        DEFAULT_INTERVAL
    } else {
        args.interval
    };

    let mut reader = open_all(&args.files).await?;

    let target = tokio::net::lookup_host(&args.addr)
        .await
        .with_context(|| format!("Cannot resolve {}", args.addr))?
        .next()
        .with_context(|| format!("{} resolved to no addresses", args.addr))?;
    let local = args.bind.unwrap_or_else(|| match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    });
    let socket = UdpSocket::bind(local).await.map_err(CliError::Io)?;
    socket.connect(target).await.map_err(CliError::Io)?;

    info!(%target, files = args.files.len(), size, ?interval, "Splitting files into datagrams");

    let counters = Arc::new(Counters::default());
    let reporter = tokio::spawn(report(Arc::clone(&counters)));

    let result = pump(&mut reader, &socket, size, interval, &counters).await;
    reporter.abort();

    let (packets, bytes) = result?;
    info!(packets, bytes, "Split finished");
    Ok(())
}

/// Send `size`-byte datagrams until the input is exhausted
async fn pump(
    reader: &mut (dyn AsyncRead + Unpin + Send),
    socket: &UdpSocket,
    size: usize,
    interval: Duration,
    counters: &Counters,
) -> Result<(u64, u64)> {
    let mut buf = vec![0u8; size];
    let mut packets = 0u64;
    let mut bytes = 0u64;
    loop {
        let n = read_full(reader, &mut buf).await.map_err(CliError::Io)?;
        if n == 0 {
            return Ok((packets, bytes));
        }
        socket.send(&buf[..n]).await.context("Datagram send failed")?;
        counters.packets.fetch_add(1, Ordering::Relaxed);
        counters.bytes.fetch_add(n as u64, Ordering::Relaxed);
        packets += 1;
        bytes += n as u64;
        tokio::time::sleep(interval).await;
    }
}

async fn open_all(paths: &[PathBuf]) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    let mut reader: Option<Box<dyn AsyncRead + Unpin + Send>> = None;
    for path in paths {
        let file = File::open(path).await.map_err(|source| CliError::Input {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Input opened");
        reader = Some(match reader {
            None => Box::new(file),
            Some(prev) => Box::new(prev.chain(file)),
        });
    }
    reader.ok_or_else(|| anyhow::anyhow!("no files given"))
}

/// Fill `buf` from `reader`, returning fewer bytes only at end of input
async fn read_full<R: AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn report(counters: Arc<Counters>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;
    let mut second = 0u64;
    let mut total = 0u64;
    loop {
        ticker.tick().await;
        second += 1;
        let packets = counters.packets.swap(0, Ordering::Relaxed);
        let bytes = counters.bytes.swap(0, Ordering::Relaxed);
        total += bytes;
        println!(
            "{second:04}: {packets} packets - {} ({})",
            format_iec(bytes),
            format_iec(total)
        );
    }
}

/// Binary-prefixed byte size, e.g. `1.50KiB`
pub(crate) fn format_iec(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.2}{}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_iec() {
        assert_eq!(format_iec(0), "0B");
        assert_eq!(format_iec(1023), "1023B");
        assert_eq!(format_iec(1536), "1.50KiB");
        assert_eq!(format_iec(3 << 20), "3.00MiB");
    }

    #[tokio::test]
    async fn test_read_full_spans_files() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        a.write_all(b"abc").unwrap();
        b.write_all(b"defgh").unwrap();

        let mut reader = open_all(&[a.path().to_path_buf(), b.path().to_path_buf()])
            .await
            .unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"efgh");
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_split_sends_fixed_size_datagrams() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let payload: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        file.write_all(&payload).unwrap();

        let args = SplitArgs {
            addr: receiver.local_addr().unwrap().to_string(),
            files: vec![file.path().to_path_buf()],
            size: 100,
            interval: Duration::from_micros(100),
            bind: None,
        };
        run_split(&args).await.unwrap();

        let mut received = Vec::new();
        let mut sizes = Vec::new();
        let mut buf = [0u8; 512];
        for _ in 0..3 {
            let n = receiver.recv(&mut buf).await.unwrap();
            sizes.push(n);
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn test_split_missing_file() {
        let args = SplitArgs {
            addr: "127.0.0.1:9".into(),
            files: vec!["/nonexistent/input.bin".into()],
            size: 0,
            interval: Duration::ZERO,
            bind: None,
        };
        let err = run_split(&args).await.unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some());
    }
}

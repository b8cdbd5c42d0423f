use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{debug, warn};
use nmeawave_decode::Sentence;
use parking_lot::Mutex;
use serialport::SerialPortInfo;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{Error, LineAssembler, Pipeline, PipelineConfig, Result};

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (port_type, vid, pid, manufacturer, product) = match &info.port_type {
            serialport::SerialPortType::UsbPort(usb) => (
                "USB".to_string(),
                Some(usb.vid),
                Some(usb.pid),
                usb.manufacturer.clone(),
                usb.product.clone(),
            ),
            serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None),
            serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None, None, None, None),
            serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None, None, None),
        };
        Self {
            port_name: info.port_name,
            port_type,
            vid,
            pid,
            manufacturer,
            product,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        // NMEA 0183 line settings
        Self {
            port_name: String::new(),
            baud_rate: 4800,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            read_timeout: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Opened(String),
    Error(String),
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub bytes_read: u64,
    pub chunks_submitted: u64,
    pub frames_validated: u64,
}

enum Command {
    Close,
}

/// Reads a serial port on a background thread and submits what it reads,
/// one line per chunk, to a [`Pipeline`] owned by that thread.
///
/// Dropping the feed stops the reader thread, even while it waits on a full
/// queue, and releases the port.
pub struct SerialFeed {
    cfg: SerialConfig,
    tx_cmd: Sender<Command>,
    rx_evt: Receiver<FeedEvent>,
    sentences: Receiver<Sentence>,
    stats: Arc<Mutex<FeedStats>>,
}

impl SerialFeed {
    pub fn list_ports() -> Vec<PortInfo> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(PortInfo::from)
            .collect()
    }

    /// Opens the port and starts the reader thread with a pipeline built
    /// from `pipeline`. The pipeline is closed when the feed stops.
    pub fn open(cfg: SerialConfig, pipeline: PipelineConfig) -> Result<Self> {
        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.read_timeout)
            .open()?;
        debug!("opened {} at {} baud", cfg.port_name, cfg.baud_rate);

        Ok(Self::spawn(cfg, port, pipeline))
    }

    fn spawn<R>(cfg: SerialConfig, port: R, pipeline: PipelineConfig) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx_cmd, rx_cmd) = unbounded::<Command>();
        let (tx_evt, rx_evt) = unbounded::<FeedEvent>();
        let (pipeline, sentences) = Pipeline::new(pipeline);
        let stats = Arc::new(Mutex::new(FeedStats::default()));

        let _ = tx_evt.send(FeedEvent::Opened(cfg.port_name.clone()));
        let thread_stats = Arc::clone(&stats);
        std::thread::spawn(move || read_loop(port, pipeline, rx_cmd, tx_evt, thread_stats));

        Self {
            cfg,
            tx_cmd,
            rx_evt,
            sentences,
            stats,
        }
    }

    /// Stops the reader thread. Sentences already decoded are still
    /// delivered; a partial line and anything waiting on a full raw queue
    /// are dropped.
    pub fn close(&self) -> Result<()> {
        self.tx_cmd.send(Command::Close).map_err(|_| Error::Disconnected)
    }

    pub fn events(&self) -> &Receiver<FeedEvent> {
        &self.rx_evt
    }

    pub fn sentences(&self) -> &Receiver<Sentence> {
        &self.sentences
    }

    pub fn stats(&self) -> FeedStats {
        *self.stats.lock()
    }

    pub fn config(&self) -> &SerialConfig {
        &self.cfg
    }
}

fn read_loop<R: Read>(
    mut port: R,
    mut pipeline: Pipeline,
    rx_cmd: Receiver<Command>,
    tx_evt: Sender<FeedEvent>,
    stats: Arc<Mutex<FeedStats>>,
) {
    let mut lines = LineAssembler::default();
    let mut buf = [0u8; 4096];

    // false once a close request (or a dropped feed) cut a submission short
    let submit = |pipeline: &mut Pipeline, chunk: &[u8]| -> bool {
        let Some(frames) = pipeline.submit_cancellable(chunk, &rx_cmd) else {
            return false;
        };
        let mut s = stats.lock();
        s.chunks_submitted += 1;
        s.frames_validated += frames;
        true
    };

    let finished = 'read: loop {
        match port.read(&mut buf) {
            Ok(0) => {
                debug!("serial source reached end of input");
                break true;
            }
            Ok(n) => {
                stats.lock().bytes_read += n as u64;
                for line in lines.push(&buf[..n], Instant::now()) {
                    if !submit(&mut pipeline, &line) {
                        break 'read false;
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                if let Some(line) = lines.take_stale(Instant::now()) {
                    if !submit(&mut pipeline, &line) {
                        break false;
                    }
                }
            }
            Err(e) => {
                warn!("serial read failed: {e}");
                let _ = tx_evt.send(FeedEvent::Error(e.to_string()));
                break true;
            }
        }

        match rx_cmd.try_recv() {
            Ok(Command::Close) | Err(TryRecvError::Disconnected) => break false,
            Err(TryRecvError::Empty) => {}
        }
    };

    if finished {
        if let Some(line) = lines.flush() {
            submit(&mut pipeline, &line);
        }
    } else {
        debug!("serial feed closed with {} bytes pending", lines.pending());
    }
    pipeline.close();
    let _ = tx_evt.send(FeedEvent::Closed);
}

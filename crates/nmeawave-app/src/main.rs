mod logger;
mod settings;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::Receiver;
use nmeawave_core::{FeedEvent, Pipeline, PipelineConfig, SerialConfig, SerialFeed};
use nmeawave_decode::Sentence;
use settings::Settings;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::thread;

const USAGE: &str = "\
usage: nmeawave [OPTIONS] [FILE|-]

Reads NMEA 0183 sentences from a serial port, a file or stdin and prints
every frame whose checksum verifies.

options:
  --port NAME        read from a serial port
  --baud N           serial baud rate (default 4800)
  --list-ports       print available serial ports and exit
  --carry-over       let frames span reads instead of resetting per line
  --ignore-case      accept lower-case checksum digits
  --encoding NAME    payload encoding: utf-8, ascii, latin1, cp1252
  --json             print sentences as JSON lines
  --echo             print re-rendered frames
  --invalid          also print sentences without a 5-character header
  --config PATH      JSON config file
  -h, --help         show this help";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Format {
    #[default]
    Text,
    Json,
    Echo,
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    input: Option<PathBuf>,
    port: Option<String>,
    baud: Option<u32>,
    list_ports: bool,
    carry_over: bool,
    ignore_case: bool,
    encoding: Option<String>,
    format: Format,
    invalid: bool,
    config: Option<PathBuf>,
    help: bool,
}

impl Args {
    fn parse(mut it: impl Iterator<Item = String>) -> Result<Self> {
        let mut args = Self::default();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--port" => args.port = Some(value(&mut it, &arg)?),
                "--baud" => {
                    let baud = value(&mut it, &arg)?;
                    args.baud = Some(baud.parse().with_context(|| format!("bad baud rate {baud:?}"))?);
                }
                "--list-ports" => args.list_ports = true,
                "--carry-over" => args.carry_over = true,
                "--ignore-case" => args.ignore_case = true,
                "--encoding" => args.encoding = Some(value(&mut it, &arg)?),
                "--json" => args.format = Format::Json,
                "--echo" => args.format = Format::Echo,
                "--invalid" => args.invalid = true,
                "--config" => args.config = Some(value(&mut it, &arg)?.into()),
                "-h" | "--help" => args.help = true,
                "-" => args.input = None,
                other if other.starts_with('-') => bail!("unknown option {other}\n\n{USAGE}"),
                other => args.input = Some(other.into()),
            }
        }
        Ok(args)
    }

    /// Command-line options win over the config file.
    fn apply(&self, settings: &mut Settings) {
        if let Some(port) = &self.port {
            settings.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = Some(baud);
        }
        if self.carry_over {
            settings.chunk_mode = Some("carry-over".into());
        }
        if self.ignore_case {
            settings.checksum_case = Some("insensitive".into());
        }
        if let Some(enc) = &self.encoding {
            settings.encoding = Some(enc.clone());
        }
    }
}

fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    it.next().ok_or_else(|| anyhow!("{flag} expects a value"))
}

fn main() -> Result<()> {
    logger::init();

    let args = Args::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }
    if args.list_ports {
        for p in SerialFeed::list_ports() {
            match (p.vid, p.pid) {
                (Some(vid), Some(pid)) => println!("{} ({:04X}:{:04X}) {}", p.port_name, vid, pid, p.port_type),
                _ => println!("{} {}", p.port_name, p.port_type),
            }
        }
        return Ok(());
    }

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    args.apply(&mut settings);

    let pipeline = settings.pipeline_config()?;
    let printed = match settings.serial_config() {
        Some(cfg) => run_serial(cfg, pipeline, &args)?,
        None => run_file(args.input.as_deref(), pipeline, &args)?,
    };
    log::info!("{printed} sentences printed");
    Ok(())
}

fn run_serial(cfg: SerialConfig, pipeline: PipelineConfig, args: &Args) -> Result<u64> {
    let port = cfg.port_name.clone();
    let feed = SerialFeed::open(cfg, pipeline).with_context(|| format!("opening {port}"))?;

    let out = BufWriter::new(io::stdout().lock());
    let printed = print_all(feed.sentences(), out, args.format, args.invalid)?;
    let stats = feed.stats();
    log::info!(
        "{} bytes read, {} frames validated",
        stats.bytes_read, stats.frames_validated
    );

    for event in feed.events().try_iter() {
        if let FeedEvent::Error(e) = event {
            bail!("reading {port}: {e}");
        }
    }
    Ok(printed)
}

fn run_file(input: Option<&std::path::Path>, config: PipelineConfig, args: &Args) -> Result<u64> {
    let (mut pipeline, sentences) = Pipeline::new(config);
    let (format, invalid) = (args.format, args.invalid);
    let printer = thread::spawn(move || {
        let out = BufWriter::new(io::stdout().lock());
        print_all(&sentences, out, format, invalid)
    });

    let submitted = match input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            pipeline.submit_lines(BufReader::new(file))
        }
        None => pipeline.submit_lines(io::stdin().lock()),
    };
    pipeline.close();
    let stats = pipeline.stats();
    drop(pipeline);

    let printed = printer.join().map_err(|_| anyhow!("printer thread panicked"))??;
    let frames = submitted?;
    log::info!(
        "{frames} frames validated, {} checksum mismatches, {} partial frames discarded",
        stats.mismatched, stats.discarded
    );
    Ok(printed)
}

/// Prints sentences until the queue disconnects. After a render or write
/// failure the rest of the queue is still drained so the pipeline never
/// blocks on it.
fn print_all<W: Write>(sentences: &Receiver<Sentence>, mut out: W, format: Format, invalid: bool) -> Result<u64> {
    let mut printed = 0;
    let mut failure: Option<anyhow::Error> = None;

    for s in sentences.iter() {
        if failure.is_some() || (!s.valid && !invalid) {
            continue;
        }
        let written = render(&s, format).and_then(|line| {
            writeln!(out, "{line}")?;
            out.flush()?;
            Ok(())
        });
        match written {
            Ok(()) => printed += 1,
            Err(e) => failure = Some(e),
        }
    }

    match failure {
        Some(e) if is_broken_pipe(&e) => Ok(printed),
        Some(e) => Err(e.context("writing output")),
        None => Ok(printed),
    }
}

fn is_broken_pipe(e: &anyhow::Error) -> bool {
    e.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
}

fn render(s: &Sentence, format: Format) -> Result<String> {
    Ok(match format {
        Format::Text => {
            let kind = if s.kind.is_empty() { "-" } else { s.kind.as_str() };
            format!("{kind}\t{}", s.fields().join(","))
        }
        Format::Json => serde_json::to_string(s)?,
        Format::Echo => s.to_string(),
    })
}

mod capture;
mod display;
mod frame;
mod helpers;
mod runner;
mod screen_guard;

use std::io;
use std::process::ChildStdout;
use std::time::Duration;

use capture::{producer::Producer, reader::FrameReader, sampler::Sampler};
use display::{kitty::KittySink, log_sink::LogSink, DisplaySink};
use frame::Geometry;
use helpers::args::{parse_args, Mode, SampleArgs, SinkKind, StreamArgs};
use helpers::signal::install_interrupt_flag;
use helpers::types::Res;
use runner::{run_stream, RetryPolicy};

fn main() -> Res<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    let geometry = Geometry::new(args.height, args.width)?;

    let mut producer = Producer::start(&args.executable, &args.producer_args, !args.null_stdin)?;
    let stdout = producer.take_stdout()?;

    match args.mode {
        Mode::Stream(stream_args) => stream(stdout, geometry, &stream_args),
        Mode::Sample(sample_args) => sample(stdout, &mut producer, &sample_args),
    }
}

fn stream(stdout: ChildStdout, geometry: Geometry, args: &StreamArgs) -> Res<()> {
    let mut reader = FrameReader::new(stdout, geometry)?;
    reader.set_read_timeout(args.read_timeout());
    reader.set_cancel_flag(install_interrupt_flag()?);

    let policy = RetryPolicy::new(args.max_failures, Duration::from_millis(args.backoff_ms));
    log::info!(
        "reading {}x{} frames ({} bytes each)",
        geometry.width(),
        geometry.height(),
        geometry.frame_len()
    );

    let summary = {
        let mut sink: Box<dyn DisplaySink> = match args.sink {
            SinkKind::Kitty => Box::new(KittySink::terminal(geometry)?),
            SinkKind::Log => Box::new(LogSink::new()),
        };
        run_stream(&mut reader, sink.as_mut(), &policy)?
    };

    log::info!(
        "stopped ({:?}) after {} frames, {} short reads, {} timeouts",
        summary.stopped_by,
        summary.frames,
        summary.decode_errors,
        summary.timeouts
    );
    Ok(())
}

fn sample(mut stdout: ChildStdout, producer: &mut Producer, args: &SampleArgs) -> Res<()> {
    let sampler = Sampler::new(args.iterations, args.chunk_len);
    let report = sampler.run(&mut stdout, &mut io::stdout().lock())?;

    log::info!(
        "{} reads, {} non-empty, {} bytes",
        report.attempts,
        report.non_empty,
        report.bytes
    );

    if args.wait {
        drop(stdout);
        producer.wait()?;
    }
    Ok(())
}

use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    /// Capture executable whose stdout carries raw 8-bit grayscale frames
    #[clap(short, long, default_value = "./cpp/genicam")]
    pub executable: String,

    /// Frame height in pixels, as agreed with the producer
    #[clap(long, default_value = "1024")]
    pub height: usize,

    /// Frame width in pixels, as agreed with the producer
    #[clap(long, default_value = "1280")]
    pub width: usize,

    /// Connect the producer's stdin to /dev/null instead of a pipe
    #[clap(long)]
    pub null_stdin: bool,

    /// Extra argument handed to the producer, repeatable
    #[clap(long = "producer-arg", allow_hyphen_values = true)]
    pub producer_args: Vec<String>,

    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Frame the producer output and display every frame
    Stream(StreamArgs),
    /// Print a fixed number of raw reads without framing them
    Sample(SampleArgs),
}

#[derive(ClapArgs, Debug)]
pub struct StreamArgs {
    #[clap(short, long, value_enum, default_value = "kitty")]
    pub sink: SinkKind,

    /// Give up waiting for a frame after this many milliseconds (0 waits forever)
    #[clap(long, default_value = "5000")]
    pub read_timeout_ms: u64,

    /// Stop after this many consecutive bad reads (0 retries forever)
    #[clap(long, default_value = "10")]
    pub max_failures: u32,

    /// Initial delay before retrying a bad read, doubled on every retry
    #[clap(long, default_value = "10")]
    pub backoff_ms: u64,
}

impl StreamArgs {
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct SampleArgs {
    #[clap(short = 'n', long, default_value = "200")]
    pub iterations: usize,

    /// Bytes requested per read
    #[clap(short, long, default_value = "150")]
    pub chunk_len: usize,

    /// Wait for the producer to exit on its own once sampling is done
    #[clap(long)]
    pub wait: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkKind {
    /// Draw frames in the terminal with the kitty graphics protocol
    Kitty,
    /// Log per-frame statistics only
    Log,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_producer_convention() {
        let args = Args::try_parse_from(["genicam-view", "stream"]).unwrap();

        assert_eq!(args.executable, "./cpp/genicam");
        assert_eq!(args.height, 1024);
        assert_eq!(args.width, 1280);
        assert!(!args.null_stdin);
        match args.mode {
            Mode::Stream(stream) => {
                assert_eq!(stream.sink, SinkKind::Kitty);
                assert_eq!(stream.read_timeout(), Some(Duration::from_secs(5)));
                assert_eq!(stream.max_failures, 10);
            }
            Mode::Sample(_) => panic!("expected stream mode"),
        }
    }

    #[test]
    fn sample_defaults() {
        let args = Args::try_parse_from(["genicam-view", "sample"]).unwrap();

        match args.mode {
            Mode::Sample(sample) => {
                assert_eq!(sample.iterations, 200);
                assert_eq!(sample.chunk_len, 150);
                assert!(!sample.wait);
            }
            Mode::Stream(_) => panic!("expected sample mode"),
        }
    }

    #[test]
    fn zero_timeout_waits_forever() {
        let args = Args::try_parse_from([
            "genicam-view",
            "stream",
            "--sink",
            "log",
            "--read-timeout-ms",
            "0",
        ])
        .unwrap();

        match args.mode {
            Mode::Stream(stream) => {
                assert_eq!(stream.sink, SinkKind::Log);
                assert_eq!(stream.read_timeout(), None);
            }
            Mode::Sample(_) => panic!("expected stream mode"),
        }
    }

    #[test]
    fn producer_args_keep_their_order() {
        let args = Args::try_parse_from([
            "genicam-view",
            "--executable",
            "/opt/cam",
            "--producer-arg",
            "-c",
            "--producer-arg",
            "1",
            "sample",
        ])
        .unwrap();

        assert_eq!(args.executable, "/opt/cam");
        assert_eq!(args.producer_args, vec!["-c", "1"]);
    }
}

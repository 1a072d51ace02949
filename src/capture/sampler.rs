use std::io::{ErrorKind, Read, Write};

use crate::helpers::types::{Bytes, Res};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport {
    pub attempts: usize,
    pub non_empty: usize,
    pub bytes: usize,
}

/// Dumps a fixed number of raw reads from the producer, for checking what
/// it actually writes before trusting the frame geometry.
pub struct Sampler {
    iterations: usize,
    chunk_len: usize,
}

impl Sampler {
    pub fn new(iterations: usize, chunk_len: usize) -> Self {
        Sampler {
            iterations,
            chunk_len,
        }
    }

    pub fn run<R: Read, W: Write>(&self, stream: &mut R, out: &mut W) -> Res<SampleReport> {
        let mut report = SampleReport::default();

        for _ in 0..self.iterations {
            let data = read_up_to(stream, self.chunk_len)?;
            report.attempts += 1;

            if !data.is_empty() {
                report.non_empty += 1;
                report.bytes += data.len();
                writeln!(out, "{}", escape_bytes(&data))?;
            }
        }
        out.flush()?;

        Ok(report)
    }
}

/// Reads until `len` bytes arrived or the stream ended.
fn read_up_to<R: Read>(stream: &mut R, len: usize) -> std::io::Result<Bytes> {
    let mut buffer = vec![0u8; len];
    let mut filled = 0;

    while filled < len {
        match stream.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    buffer.truncate(filled);
    Ok(buffer)
}

fn escape_bytes(data: &[u8]) -> String {
    let escaped: String = data
        .iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect();
    format!("b\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn always_makes_every_attempt() {
        let mut stream = Cursor::new(vec![0xABu8; 1000]);
        let mut out = Vec::new();

        let report = Sampler::new(200, 150).run(&mut stream, &mut out).unwrap();

        assert_eq!(
            report,
            SampleReport {
                attempts: 200,
                non_empty: 7,
                bytes: 1000
            }
        );
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 7);
    }

    #[test]
    fn long_stream_is_not_drained() {
        let mut stream = Cursor::new(vec![1u8; 200 * 150 + 10]);
        let mut out = Vec::new();

        let report = Sampler::new(200, 150).run(&mut stream, &mut out).unwrap();

        assert_eq!(report.attempts, 200);
        assert_eq!(report.bytes, 200 * 150);
        assert_eq!(stream.position(), 200 * 150);
    }

    #[test]
    fn empty_reads_print_nothing() {
        let mut stream = Cursor::new(Vec::new());
        let mut out = Vec::new();

        let report = Sampler::new(3, 150).run(&mut stream, &mut out).unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.non_empty, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn bytes_are_printed_escaped() {
        let mut stream = Cursor::new(b"ok\x00\xff\n".to_vec());
        let mut out = Vec::new();

        Sampler::new(1, 150).run(&mut stream, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "b\"ok\\x00\\xff\\n\"\n");
    }
}

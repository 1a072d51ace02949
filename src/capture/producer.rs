use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use crate::helpers::error::ReaderError;

/// Owns the capture subprocess. Dropping it kills and reaps the child, so
/// every exit path of the reader releases the process.
pub struct Producer {
    child: Child,
    path: String,
}

impl Producer {
    pub fn start(path: &str, args: &[String], pipe_stdin: bool) -> Result<Self, ReaderError> {
        let stdin = if pipe_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let child = Command::new(path)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ReaderError::Launch {
                path: path.to_string(),
                source,
            })?;

        let producer = Producer {
            child,
            path: path.to_string(),
        };
        log::info!("started producer {} (pid {})", producer.path, producer.id());

        Ok(producer)
    }

    pub fn take_stdout(&mut self) -> Result<ChildStdout, ReaderError> {
        self.child
            .stdout
            .take()
            .ok_or(ReaderError::StdoutUnavailable)
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the producer exits on its own.
    pub fn wait(&mut self) -> Result<ExitStatus, ReaderError> {
        let status = self.child.wait()?;
        log::info!("producer {} exited with {}", self.path, status);
        Ok(status)
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }

        if let Err(e) = self.child.kill() {
            log::warn!("failed to kill producer {}: {}", self.path, e);
        }
        let _ = self.child.wait();
        log::debug!("producer {} released", self.path);
    }
}

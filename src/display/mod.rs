pub mod kitty;
pub mod log_sink;

use crate::frame::Frame;
use crate::helpers::types::Res;

/// Where decoded frames end up. Sinks render and return; they never keep
/// frames around.
pub trait DisplaySink {
    fn display(&mut self, frame: &Frame) -> Res<()>;
}

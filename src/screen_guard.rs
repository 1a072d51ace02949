use std::io::{self, Write};

pub const ALTERNATE_SCREEN: &[u8] = b"\x1B[?1049h";
pub const MAIN_SCREEN: &[u8] = b"\x1B[?1049l";
pub const HIDE_CURSOR: &[u8] = b"\x1B[?25l";
pub const SHOW_CURSOR: &[u8] = b"\x1B[?25h";
pub const RESET_CURSOR: &[u8] = b"\x1B[H";

/// Holds the terminal on an alternate screen with the cursor hidden, and
/// hands the main screen back when dropped.
pub struct ScreenGuard<W: Write> {
    out: W,
}

impl<W: Write> ScreenGuard<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        out.write_all(&[ALTERNATE_SCREEN, HIDE_CURSOR, RESET_CURSOR].concat())?;
        out.flush()?;
        Ok(ScreenGuard { out })
    }
}

impl<W: Write> Drop for ScreenGuard<W> {
    fn drop(&mut self) {
        let _ = self.out.write_all(&[MAIN_SCREEN, SHOW_CURSOR].concat());
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enters_on_new_and_leaves_on_drop() {
        let mut out = Vec::new();

        {
            let _guard = ScreenGuard::new(&mut out).unwrap();
        }

        let expected = [
            ALTERNATE_SCREEN,
            HIDE_CURSOR,
            RESET_CURSOR,
            MAIN_SCREEN,
            SHOW_CURSOR,
        ]
        .concat();
        assert_eq!(out, expected);
    }
}

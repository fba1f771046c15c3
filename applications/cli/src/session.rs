use crate::commands::{execute, parse_command, Outcome};
use crate::error::Result;
use playhead_playback::PlaybackController;
use std::io::{BufRead, Write};

/// Read commands line by line until `quit` or end of input
///
/// Bad input is reported on `output` and the session continues.
pub fn run<R: BufRead, W: Write>(
    controller: &PlaybackController,
    input: R,
    mut output: W,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(output, "error: {}", e)?;
                continue;
            }
        };

        tracing::debug!("Executing {:?}", command);
        match execute(controller, command) {
            Outcome::Continue(message) => writeln!(output, "{}", message)?,
            Outcome::Quit => break,
        }
        output.flush()?;
    }

    Ok(())
}

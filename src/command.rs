// ============================================================================
// TEXT COMMANDS AND THE BACKGROUND COMMAND READER
// ============================================================================

use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::DVec2;

use crate::pose::{Pose, PoseStore};
use crate::transform::FieldTransform;

/// One parsed input line. Coordinates are in inches, headings in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetPose { x: f64, y: f64, theta: f64 },
    SetX(f64),
    SetY(f64),
    SetTheta(f64),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Invalid input, use format: x y theta")]
    InvalidFormat,
    #[error("Invalid modifier, use format: modifier value")]
    InvalidModifier(String),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
}

/// Finite numbers only; `nan` and `inf` parse as f64 but have no place on
/// the field.
fn parse_number(token: &str) -> Result<f64, CommandError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidNumber(token.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [x, y, theta] => Ok(Command::SetPose {
                x: parse_number(x)?,
                y: parse_number(y)?,
                theta: parse_number(theta)?,
            }),
            [modifier, value] => {
                // value first: "foo abc" reports the number, "foo 1" the modifier
                let value = parse_number(value)?;
                match *modifier {
                    "x" => Ok(Command::SetX(value)),
                    "y" => Ok(Command::SetY(value)),
                    "theta" => Ok(Command::SetTheta(value)),
                    other => Err(CommandError::InvalidModifier(other.to_string())),
                }
            }
            _ => Err(CommandError::InvalidFormat),
        }
    }
}

impl Command {
    /// The pose after this command, given the pose before it.
    pub fn apply(self, pose: Pose, transform: &FieldTransform) -> Pose {
        match self {
            Command::SetPose { x, y, theta } => {
                Pose::new(transform.inches_to_pixels(DVec2::new(x, y)), theta)
            }
            Command::SetX(x) => pose.with_x(transform.inch_x_to_pixel(x)),
            Command::SetY(y) => pose.with_y(transform.inch_y_to_pixel(y)),
            Command::SetTheta(theta) => pose.with_heading(theta),
        }
    }
}

/// Shared, set-once shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Parses `line` and, when valid, commits it to `store`. A rejected line
/// leaves the store untouched.
pub fn execute_line(
    line: &str,
    store: &PoseStore,
    transform: &FieldTransform,
) -> Result<Pose, CommandError> {
    let command: Command = line.parse()?;
    Ok(store.write(|pose| command.apply(pose, transform)))
}

/// Reads commands line by line until end of input, an unrecoverable read
/// error, or `stop` is raised. Returns the number of lines applied.
pub fn run_reader<R: BufRead>(
    mut input: R,
    store: &PoseStore,
    transform: &FieldTransform,
    stop: &StopSignal,
) -> usize {
    let mut applied = 0;
    let mut line = String::new();
    while !stop.is_raised() {
        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                log::debug!("command input reached end of stream");
                break;
            }
            Ok(_) => {
                if stop.is_raised() {
                    break;
                }
                match execute_line(&line, store, transform) {
                    Ok(pose) => {
                        applied += 1;
                        log::debug!("applied {:?} -> {:?}", line.trim(), pose);
                    }
                    Err(err) => log::warn!("{err}"),
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                // the offending bytes are consumed; carry on with the next line
                log::warn!("Error: {err}");
            }
            Err(err) => {
                if !stop.is_raised() {
                    log::error!("command input failed: {err}");
                }
                break;
            }
        }
    }
    applied
}

/// Handle to the background thread running [`run_reader`].
#[derive(Debug)]
pub struct CommandReader {
    handle: JoinHandle<usize>,
    stop: StopSignal,
}

impl CommandReader {
    pub fn spawn<R>(
        input: R,
        store: Arc<PoseStore>,
        transform: FieldTransform,
        stop: StopSignal,
    ) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("command-reader".to_string())
            .spawn(move || run_reader(input, &store, &transform, &thread_stop))?;
        Ok(Self { handle, stop })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Raises the stop signal and waits up to `timeout` for the reader to
    /// exit. A reader still blocked on input is detached; `None` is
    /// returned in that case.
    pub fn shutdown(self, timeout: Duration) -> Option<usize> {
        self.stop.raise();
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !self.handle.is_finished() {
            log::debug!("command reader still blocked on input, detaching");
            return None;
        }
        match self.handle.join() {
            Ok(applied) => {
                log::info!("command reader stopped after {applied} command(s)");
                Some(applied)
            }
            Err(_) => {
                log::error!("command reader panicked");
                None
            }
        }
    }
}

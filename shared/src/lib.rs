//! Line-oriented wire protocol and play-field geometry shared by the server
//! and headless clients.
//!
//! Every message is a single line of UTF-8 text terminated by `\n`:
//! - handshake (server → client, once): `"<width> <height> <role>"`
//! - state (server → everyone, every tick): six whitespace-separated integers
//! - control (controller → server): `up`, `down`, empty, or `ready`

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const FIELD_WIDTH: i32 = 640;
pub const FIELD_HEIGHT: i32 = 480;
pub const WALL_THICKNESS: i32 = 10;

pub const PADDLE_WIDTH: i32 = 10;
pub const PADDLE_HEIGHT: i32 = 50;
pub const PADDLE_SPEED: i32 = 5;
pub const LEFT_PADDLE_X: i32 = 10;
pub const RIGHT_PADDLE_X: i32 = FIELD_WIDTH - 20;
pub const PADDLE_START_Y: i32 = FIELD_HEIGHT / 2 - PADDLE_HEIGHT / 2;
pub const PADDLE_MIN_Y: i32 = WALL_THICKNESS;
pub const PADDLE_MAX_Y: i32 = FIELD_HEIGHT - WALL_THICKNESS - PADDLE_HEIGHT;

pub const BALL_SIZE: i32 = 5;
pub const BALL_SPEED: i32 = 5;
pub const BALL_START_X: i32 = FIELD_WIDTH / 2;
pub const BALL_START_Y: i32 = FIELD_HEIGHT / 2;

pub const WIN_SCORE: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("expected {expected} fields, got {got}")]
    FieldCount { expected: usize, got: usize },
    #[error("invalid integer field {0:?}")]
    InvalidInteger(String),
    #[error("unknown role {0:?}")]
    UnknownRole(String),
}

/// Which part a connection plays in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Left,
    Right,
    Spectator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Left => "left",
            Role::Right => "right",
            Role::Spectator => "spec",
        }
    }

    pub fn is_controller(&self) -> bool {
        !matches!(self, Role::Spectator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Role::Left),
            "right" => Ok(Role::Right),
            "spec" => Ok(Role::Spectator),
            other => Err(ProtocolError::UnknownRole(other.to_string())),
        }
    }
}

/// Latest movement request from a controller. Stays in force until overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    #[default]
    None,
    Up,
    Down,
}

impl Intent {
    pub fn as_u8(self) -> u8 {
        match self {
            Intent::None => 0,
            Intent::Up => 1,
            Intent::Down => 2,
        }
    }

    /// Unknown values collapse to `None`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Intent::Up,
            2 => Intent::Down,
            _ => Intent::None,
        }
    }
}

/// A decoded controller → server line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    Move(Intent),
    Ready,
}

impl ControlLine {
    /// Surrounding whitespace is ignored. Anything unrecognized yields `None`
    /// so the caller can drop it silently.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => Some(ControlLine::Move(Intent::None)),
            "up" => Some(ControlLine::Move(Intent::Up)),
            "down" => Some(ControlLine::Move(Intent::Down)),
            "ready" => Some(ControlLine::Ready),
            _ => None,
        }
    }
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ControlLine::Move(Intent::None) => "",
            ControlLine::Move(Intent::Up) => "up",
            ControlLine::Move(Intent::Down) => "down",
            ControlLine::Ready => "ready",
        };
        f.write_str(text)
    }
}

/// First line every connection receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub width: i32,
    pub height: i32,
    pub role: Role,
}

impl Handshake {
    pub fn new(role: Role) -> Self {
        Self {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
            role,
        }
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.width, self.height, self.role)
    }
}

impl FromStr for Handshake {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(ProtocolError::FieldCount {
                expected: 3,
                got: fields.len(),
            });
        }

        Ok(Handshake {
            width: parse_int(fields[0])?,
            height: parse_int(fields[1])?,
            role: fields[2].parse()?,
        })
    }
}

/// Per-tick state broadcast: both paddle tops, the ball's top-left corner and
/// both scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub left_y: i32,
    pub right_y: i32,
    pub ball_x: i32,
    pub ball_y: i32,
    pub left_score: u32,
    pub right_score: u32,
}

impl Snapshot {
    pub fn round_over(&self) -> bool {
        self.left_score >= WIN_SCORE || self.right_score >= WIN_SCORE
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.left_y, self.right_y, self.ball_x, self.ball_y, self.left_score, self.right_score
        )
    }
}

impl FromStr for Snapshot {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ProtocolError::FieldCount {
                expected: 6,
                got: fields.len(),
            });
        }

        Ok(Snapshot {
            left_y: parse_int(fields[0])?,
            right_y: parse_int(fields[1])?,
            ball_x: parse_int(fields[2])?,
            ball_y: parse_int(fields[3])?,
            left_score: parse_int(fields[4])?,
            right_score: parse_int(fields[5])?,
        })
    }
}

fn parse_int<T: FromStr>(field: &str) -> Result<T, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::InvalidInteger(field.to_string()))
}

/// Transport-security seam. Implementations turn one line of protocol text
/// into one token (and back). Tokens must not contain `\n`.
pub trait LineCipher: Send + Sync {
    fn seal(&self, text: &str) -> String;

    /// `None` means the token could not be decoded.
    fn open(&self, token: &str) -> Option<String>;
}

/// Passes text through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plaintext;

impl LineCipher for Plaintext {
    fn seal(&self, text: &str) -> String {
        text.to_string()
    }

    fn open(&self, token: &str) -> Option<String> {
        Some(token.to_string())
    }
}

/// Credential half of the transport-security seam. The wire protocol carries
/// no credentials, so sessions never consult it; front ends that gate access
/// before connecting plug a store in here.
pub trait Authenticator: Send + Sync {
    /// Returns `false` if `user` already exists or cannot be stored.
    fn register(&self, user: &str, pass: &str) -> bool;

    fn authenticate(&self, user: &str, pass: &str) -> bool;
}

/// Admits everyone and stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl Authenticator for OpenAccess {
    fn register(&self, _user: &str, _pass: &str) -> bool {
        true
    }

    fn authenticate(&self, _user: &str, _pass: &str) -> bool {
        true
    }
}

/// Seals `text` and appends the line terminator.
pub fn frame_line(cipher: &dyn LineCipher, text: &str) -> String {
    let mut line = cipher.seal(text);
    line.push('\n');
    line
}

//! Authoritative paddle and ball simulation with the win / rematch state machine.
//!
//! The simulation is purely synchronous and owns no I/O. The session feeds it
//! one `TickInput` per tick and acts on the returned `TickOutcome`.

use log::info;
use shared::{
    Intent, Snapshot, BALL_SIZE, BALL_SPEED, BALL_START_X, BALL_START_Y, FIELD_HEIGHT,
    FIELD_WIDTH, LEFT_PADDLE_X, PADDLE_HEIGHT, PADDLE_MAX_Y, PADDLE_MIN_Y, PADDLE_SPEED,
    PADDLE_START_Y, PADDLE_WIDTH, RIGHT_PADDLE_X, WALL_THICKNESS, WIN_SCORE,
};

/// Offset from paddle center is divided by this to get the outgoing vertical speed.
pub const DEFLECTION_DIVISOR: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    RoundOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paddle {
    pub x: i32,
    pub y: i32,
}

impl Paddle {
    fn center_y(&self) -> i32 {
        self.y + PADDLE_HEIGHT / 2
    }

    /// Moves one step in the requested direction unless already at the bound.
    fn apply(&mut self, intent: Intent) {
        match intent {
            Intent::Up if self.y > PADDLE_MIN_Y => {
                self.y = (self.y - PADDLE_SPEED).max(PADDLE_MIN_Y);
            }
            Intent::Down if self.y < PADDLE_MAX_Y => {
                self.y = (self.y + PADDLE_SPEED).min(PADDLE_MAX_Y);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ball {
    pub x: i32,
    pub y: i32,
    pub vx: i32,
    pub vy: i32,
}

impl Ball {
    /// Centered ball heading horizontally toward `toward`.
    pub fn serve(toward: Side) -> Self {
        let vx = match toward {
            Side::Left => -BALL_SPEED,
            Side::Right => BALL_SPEED,
        };
        Ball {
            x: BALL_START_X,
            y: BALL_START_Y,
            vx,
            vy: 0,
        }
    }

    fn center_y(&self) -> i32 {
        self.y + BALL_SIZE / 2
    }

    fn overlaps(&self, paddle: &Paddle) -> bool {
        self.x < paddle.x + PADDLE_WIDTH
            && paddle.x < self.x + BALL_SIZE
            && self.y < paddle.y + PADDLE_HEIGHT
            && paddle.y < self.y + BALL_SIZE
    }

    /// Sends the ball back away from `from`, angled by where it struck.
    fn deflect(&mut self, paddle: &Paddle, from: Side) {
        self.vx = match from {
            Side::Left => self.vx.abs(),
            Side::Right => -self.vx.abs(),
        };
        self.vy = (self.center_y() - paddle.center_y()) / DEFLECTION_DIVISOR;
    }
}

/// Everything the simulation reads from the controllers on one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub left: Intent,
    pub right: Intent,
    pub left_ready: bool,
    pub right_ready: bool,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Side that scored this tick
    pub scored: Option<Side>,
    /// Set only on the tick a round is won
    pub winner: Option<Side>,
    /// Both controllers were ready and a fresh round began
    pub rematch: bool,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub tick: u64,
    pub left: Paddle,
    pub right: Paddle,
    pub ball: Ball,
    pub left_score: u32,
    pub right_score: u32,
    pub phase: Phase,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            tick: 0,
            left: Paddle {
                x: LEFT_PADDLE_X,
                y: PADDLE_START_Y,
            },
            right: Paddle {
                x: RIGHT_PADDLE_X,
                y: PADDLE_START_Y,
            },
            ball: Ball::serve(Side::Left),
            left_score: 0,
            right_score: 0,
            phase: Phase::Playing,
        }
    }

    /// Advances the simulation by one fixed tick.
    ///
    /// Paddles always follow their intents. The ball only moves while
    /// `Playing`; while `RoundOver` the only way out is both ready flags.
    pub fn step(&mut self, input: TickInput) -> TickOutcome {
        self.tick += 1;
        self.left.apply(input.left);
        self.right.apply(input.right);

        let mut outcome = TickOutcome::default();
        match self.phase {
            Phase::Playing => {
                outcome.scored = self.advance_ball();
                if outcome.scored.is_some() {
                    outcome.winner = self.check_winner();
                }
            }
            Phase::RoundOver => {
                if input.left_ready && input.right_ready {
                    self.start_rematch();
                    outcome.rematch = true;
                }
            }
        }

        outcome
    }

    fn advance_ball(&mut self) -> Option<Side> {
        self.ball.x += self.ball.vx;
        self.ball.y += self.ball.vy;

        if self.ball.x > FIELD_WIDTH {
            self.left_score += 1;
            self.ball = Ball::serve(Side::Right);
            return Some(Side::Left);
        }
        if self.ball.x < 0 {
            self.right_score += 1;
            self.ball = Ball::serve(Side::Left);
            return Some(Side::Right);
        }

        if self.ball.overlaps(&self.left) {
            self.ball.deflect(&self.left, Side::Left);
        } else if self.ball.overlaps(&self.right) {
            self.ball.deflect(&self.right, Side::Right);
        }

        if self.ball.y < WALL_THICKNESS {
            self.ball.vy = self.ball.vy.abs();
        } else if self.ball.y + BALL_SIZE > FIELD_HEIGHT - WALL_THICKNESS {
            self.ball.vy = -self.ball.vy.abs();
        }

        None
    }

    fn check_winner(&mut self) -> Option<Side> {
        let winner = if self.left_score >= WIN_SCORE {
            Side::Left
        } else if self.right_score >= WIN_SCORE {
            Side::Right
        } else {
            return None;
        };

        self.phase = Phase::RoundOver;
        info!(
            "Round over at tick {}: {} - {}",
            self.tick, self.left_score, self.right_score
        );
        Some(winner)
    }

    fn start_rematch(&mut self) {
        self.left_score = 0;
        self.right_score = 0;
        self.left.y = PADDLE_START_Y;
        self.right.y = PADDLE_START_Y;
        self.ball = Ball::serve(Side::Left);
        self.phase = Phase::Playing;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            left_y: self.left.y,
            right_y: self.right.y,
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            left_score: self.left_score,
            right_score: self.right_score,
        }
    }
}

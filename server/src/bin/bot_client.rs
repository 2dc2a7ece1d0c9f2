//! Headless client for exercising a running server.
//!
//! As a controller it chases the ball and asks for a rematch whenever a round
//! ends. As a spectator it just logs the state stream.

use clap::Parser;
use log::{debug, info};
use rand::Rng;
use shared::{
    frame_line, ControlLine, Handshake, Intent, Plaintext, Role, Snapshot, BALL_SIZE,
    PADDLE_HEIGHT,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:6000")]
    server: String,

    /// Chance per tick of holding still instead of chasing the ball
    #[arg(long, default_value = "0.1")]
    hesitation: f64,

    /// Stop after this many state lines (0 runs until disconnected)
    #[arg(long, default_value = "0")]
    max_states: u64,
}

/// Picks the movement that brings the paddle center toward the ball.
fn chase(paddle_y: i32, ball_y: i32) -> Intent {
    let paddle_center = paddle_y + PADDLE_HEIGHT / 2;
    let ball_center = ball_y + BALL_SIZE / 2;
    let dead_zone = PADDLE_HEIGHT / 5;

    if ball_center < paddle_center - dead_zone {
        Intent::Up
    } else if ball_center > paddle_center + dead_zone {
        Intent::Down
    } else {
        Intent::None
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let cipher = Plaintext;
    let mut rng = rand::thread_rng();

    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {}", args.server);
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let handshake: Handshake = match lines.next_line().await? {
        Some(line) => line.parse()?,
        None => return Err("server closed before handshake".into()),
    };
    info!(
        "Assigned role {} on a {}x{} field",
        handshake.role, handshake.width, handshake.height
    );

    let mut received = 0u64;
    while let Some(line) = lines.next_line().await? {
        let snapshot: Snapshot = line.parse()?;
        received += 1;

        let paddle_y = match handshake.role {
            Role::Left => snapshot.left_y,
            Role::Right => snapshot.right_y,
            Role::Spectator => {
                if received % 60 == 0 {
                    info!("State: {}", snapshot);
                }
                continue;
            }
        };

        let command = if snapshot.round_over() {
            ControlLine::Ready
        } else if rng.gen_bool(args.hesitation.clamp(0.0, 1.0)) {
            ControlLine::Move(Intent::None)
        } else {
            ControlLine::Move(chase(paddle_y, snapshot.ball_y))
        };
        debug!("Sending {:?}", command);
        writer
            .write_all(frame_line(&cipher, &command.to_string()).as_bytes())
            .await?;

        if args.max_states != 0 && received >= args.max_states {
            break;
        }
    }

    info!("Disconnected after {} state lines", received);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chase_direction() {
        assert_eq!(chase(215, 100), Intent::Up);
        assert_eq!(chase(215, 400), Intent::Down);
        assert_eq!(chase(215, 238), Intent::None);
    }
}

// Keyboard teleop over the HTTP endpoint:
// WASD move, QE/ZC diagonals, space stop, 0-9/M speed, H horn, L light, X stop-all, Esc quit
//
// Usage: cargo run --example keyboard_teleop -- [host:port]
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, warn};

const DEFAULT_TARGET: &str = "192.168.4.1:80";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());

    info!("Sending commands to http://{}", target);
    info!("Controls: WASD=move, QE/ZC=diagonals, space=stop, 0-9/M=speed, H=horn, L=light, X=stop all, Esc=quit");

    enable_raw_mode()?;
    let result = run_teleop(&target).await;
    disable_raw_mode()?;

    result
}

/// Map a key to a command token
fn token_for(code: KeyCode) -> Option<&'static str> {
    let token = match code {
        KeyCode::Char('w') => "F",
        KeyCode::Char('s') => "B",
        KeyCode::Char('a') => "L",
        KeyCode::Char('d') => "R",
        KeyCode::Char('q') => "G",
        KeyCode::Char('e') => "I",
        KeyCode::Char('z') => "H",
        KeyCode::Char('c') => "J",
        KeyCode::Char(' ') => "S",
        KeyCode::Char('h') => "V",
        KeyCode::Char('l') => "LIGHT",
        KeyCode::Char('x') => "D",
        KeyCode::Char('m') => "q",
        KeyCode::Char(c @ '0'..='9') => {
            const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
            DIGITS[c as usize - '0' as usize]
        }
        _ => return None,
    };
    Some(token)
}

async fn run_teleop(target: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        if !event::poll(Duration::from_millis(20))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        if code == KeyCode::Esc {
            break;
        }

        if let Some(token) = token_for(code) {
            // The car keeps running on a dropped request, so just report it
            if let Err(e) = send_command(target, token).await {
                warn!("Failed to send {}: {}", token, e);
            }
        }
    }

    Ok(())
}

async fn send_command(target: &str, token: &str) -> std::io::Result<()> {
    let mut stream = TcpStream::connect(target).await?;
    let request = format!("GET /?cmd={} HTTP/1.1\r\nHost: {}\r\n\r\n", token, target);
    stream.write_all(request.as_bytes()).await?;

    // Drain the control page so the car can close cleanly
    let mut sink = Vec::new();
    stream.read_to_end(&mut sink).await?;
    info!("Sent {}", token);
    Ok(())
}

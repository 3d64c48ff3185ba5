//! Banco Client
//!
//! Reads one command per line from stdin, sends it to the server and prints
//! the reply as `Servidor: <reply>`. Stops after `SAIR`, at end of input, or
//! when the server closes the connection.
//!
//! ```bash
//! cargo run --bin banco-client -- --host 127.0.0.1 --port 12345
//! ```

use banco_server::cli;
use banco_server::io::MAX_LINE_LENGTH;
use banco_server::logging;
use banco_server::types::ServerError;
use futures::{SinkExt, StreamExt};
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::parse_client_args();

    if let Err(e) = logging::init("warn", None) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&args.host, args.port).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(host: &str, port: u16) -> Result<(), ServerError> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| ServerError::Io {
            message: format!("cannot connect to {}:{}: {}", host, port, e),
        })?;
    // Replies are short, but stay tolerant of anything the server sends
    let mut server = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH * 4));

    println!("Cliente bancário conectado ao servidor. Digite comandos (SAIR para encerrar):");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(command) = input.next_line().await? {
        let command = command.trim();
        // A blank line would end the session without a reply
        if command.is_empty() {
            continue;
        }

        server.send(command).await.map_err(io_error)?;

        match server.next().await {
            Some(Ok(reply)) => println!("Servidor: {}", reply),
            Some(Err(e)) => return Err(io_error(e)),
            None => {
                debug!("Server closed the connection");
                break;
            }
        }

        if command.eq_ignore_ascii_case("SAIR") {
            break;
        }
    }

    Ok(())
}

fn io_error(e: impl std::fmt::Display) -> ServerError {
    ServerError::Io {
        message: e.to_string(),
    }
}

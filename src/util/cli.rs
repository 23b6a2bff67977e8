use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::models::CallerState;
use crate::core::types::RedirectUri;
use crate::relay::StateError;
use crate::util::config::{self, ConfigError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[clap(
    name = "sekisho-util",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Options {
    #[clap(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    ListClients(ListClients),
    EncodeState(EncodeState),
    DecodeState(DecodeState),
}

#[derive(Parser)]
struct ListClients {
    #[clap(short, long, env = "CLIENTS_FILE")]
    clients_file: PathBuf,
}

#[derive(Parser)]
struct EncodeState {
    #[clap(short, long)]
    redirect_uri: String,
    #[clap(short, long, env = "STATE_SECRET", hide_env_values = true)]
    state_secret: Option<String>,
}

#[derive(Parser)]
struct DecodeState {
    #[clap(short, long)]
    token: String,
    #[clap(short, long, env = "STATE_SECRET", hide_env_values = true)]
    state_secret: Option<String>,
}

fn list_clients(c: &ListClients, out: &mut impl Write) -> Result<(), CliError> {
    let mut clients = config::load_clients(&c.clients_file)?;
    clients.sort_by(|a, b| a.client_id.0.cmp(&b.client_id.0));

    for client in clients {
        writeln!(out, "{} (slug: \"{}\")", client.client_id.0, client.slug.0)?;
    }
    Ok(())
}

fn encode_state(c: &EncodeState, out: &mut impl Write) -> Result<(), CliError> {
    let codec = config::state_codec(c.state_secret.as_deref());
    let token = codec.encode(&CallerState {
        redirect_uri: RedirectUri(c.redirect_uri.clone()),
    })?;
    writeln!(out, "{}", token)?;
    Ok(())
}

fn decode_state(c: &DecodeState, out: &mut impl Write) -> Result<(), CliError> {
    let codec = config::state_codec(c.state_secret.as_deref());
    let caller = codec.decode(&c.token)?;
    writeln!(out, "{}", caller.redirect_uri.0)?;
    Ok(())
}

pub fn run_cli_action(opts: Options, out: &mut impl Write) -> Result<(), CliError> {
    use SubCommand::*;

    match &opts.command {
        ListClients(c) => list_clients(c, out),
        EncodeState(c) => encode_state(c, out),
        DecodeState(c) => decode_state(c, out),
    }
}

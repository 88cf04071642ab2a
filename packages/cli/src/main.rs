//! `adext` — Adext graph API command-line interface.
//!
//! Subcommands:
//!
//! - **`get`** — fetch an endpoint, cast the response, optionally follow pages.
//! - **`classify`** — cast a saved response body offline.
//! - **`proof`** — print the app-secret proof for a token.
//!
//! `classify` reads from a file path or from stdin (`-`). `get` reads its app
//! credentials from the `ADEXT_*` environment variables.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use adext::render::{render_edge, render_node};
use adext::{AccessToken, Edge, Headers, HttpMethod, NodeKind, NodeOrEdge, RawResponse, SignedRequest};
use adext_client::{Adext, AdextConfig};
use clap::{Parser, Subcommand};
use tracing::info;

/// adext — Adext graph API CLI
///
/// Fetch, page through, and classify graph API responses.
#[derive(Parser)]
#[command(name = "adext", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// GET an endpoint and print the cast result.
    ///
    /// Examples:
    ///   adext get /me --as user
    ///   adext get /me/friends --edge --pages 3 --json
    Get {
        /// Endpoint path, optionally with a query string.
        endpoint: String,

        /// Access token for this call.
        #[arg(long, env = "ADEXT_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Subtype to cast to: user | page | album | event | group | ...
        #[arg(long = "as", value_name = "KIND")]
        kind: Option<NodeKind>,

        /// Require an edge (fails if the response is not edge-shaped).
        #[arg(long)]
        edge: bool,

        /// Pages to fetch when the result is an edge.
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Cast a saved response body without any network access.
    ///
    /// Pass `-` as FILE to read from stdin.
    Classify {
        /// Path to the response body, or `-` for stdin.
        file: PathBuf,

        /// Subtype to cast to.
        #[arg(long = "as", value_name = "KIND")]
        kind: Option<NodeKind>,

        /// Require an edge.
        #[arg(long, conflicts_with = "node")]
        edge: bool,

        /// Require a node.
        #[arg(long)]
        node: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the app-secret proof (HMAC-SHA256) for an access token.
    Proof {
        #[arg(long, env = "ADEXT_ACCESS_TOKEN", hide_env_values = true)]
        token: String,

        #[arg(long, env = "ADEXT_APP_SECRET", hide_env_values = true)]
        secret: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adext=info,adext_client=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Get {
            endpoint,
            token,
            kind,
            edge,
            pages,
            json,
        } => {
            let mut config = AdextConfig::from_env().unwrap_or_else(|e| fatal(&e.to_string()));
            if let Some(token) = token {
                config.default_access_token = Some(AccessToken::new(token));
            }
            let adext = Adext::new(config).unwrap_or_else(|e| fatal(&e.to_string()));
            let response = adext.get(&endpoint).unwrap_or_else(|e| fatal(&e.to_string()));

            let first = if edge {
                NodeOrEdge::Edge(response.edge(kind).unwrap_or_else(|e| fatal(&e.to_string())))
            } else {
                response.classify(kind).unwrap_or_else(|e| fatal(&e.to_string()))
            };

            match first {
                NodeOrEdge::Edge(first) => {
                    let pages = pages.max(1);
                    let mut page = first;
                    for n in 1..=pages {
                        print_edge(&page, json);
                        if n == pages {
                            break;
                        }
                        match adext.next(&page).unwrap_or_else(|e| fatal(&e.to_string())) {
                            Some(next) => page = next,
                            None => {
                                info!(pages = n, "reached the end of the collection");
                                break;
                            }
                        }
                    }
                }
                node => print_result(&node, json),
            }
        }

        Command::Classify {
            file,
            kind,
            edge,
            node,
            json,
        } => {
            let body = read_input(&file);
            let response = offline_response(body);
            let result = if edge {
                response.edge(kind).map(NodeOrEdge::Edge)
            } else if node {
                response.node(kind).map(NodeOrEdge::Node)
            } else {
                response.classify(kind)
            };
            let result = result.unwrap_or_else(|e| fatal(&e.to_string()));
            if let Some(err) = response.thrown_exception() {
                eprintln!("warning: body carries an API error: {err}");
            }
            print_result(&result, json);
        }

        Command::Proof { token, secret } => {
            println!("{}", AccessToken::new(token).app_secret_proof(&secret));
        }
    }
}

/// Wrap a saved body in an envelope so it decodes exactly like a live one.
fn offline_response(body: String) -> RawResponse {
    let request = SignedRequest::builder()
        .method(HttpMethod::Get)
        .endpoint("/")
        .build()
        .unwrap_or_else(|e| fatal(&e.to_string()));
    RawResponse::new(Arc::new(request), 200, Headers::new(), body)
}

fn print_result(result: &NodeOrEdge, json: bool) {
    match result {
        NodeOrEdge::Node(node) if !json => print!("{}", render_node(node)),
        NodeOrEdge::Edge(edge) => print_edge(edge, json),
        _ => print_json(result),
    }
}

fn print_edge(edge: &Edge, json: bool) {
    if json {
        print_json(edge);
    } else {
        print!("{}", render_edge(edge));
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|e| fatal(&e.to_string()));
    println!("{text}");
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &PathBuf) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path).unwrap_or_else(|e| {
            fatal(&format!("failed to read {}: {}", path.display(), e))
        })
    }
}

fn fatal(msg: &str) -> ! {
    eprintln!("adext: {}", msg);
    process::exit(2);
}

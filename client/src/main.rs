//! PDF Chat - Ask questions about a document from the terminal
//!
//! # Usage
//!
//! ```bash
//! # Load a PDF through the relay and ask questions on stdin
//! pdf-chat manual.pdf
//!
//! # Different relay and model
//! pdf-chat --relay-url http://gpu-box:3000 --model mistral manual.pdf
//!
//! # Show the models the relay offers
//! pdf-chat --list-models
//! ```
//!
//! Ctrl-C stops the answer being streamed. Ctrl-D quits.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use relay_core::GenerationParameters;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pdf_chat_client::{
    read_local_file, ChatSettings, RelayClient, SessionController, DEFAULT_RELAY_URL,
};

/// PDF Chat - Streams answers about a document from the relay daemon
#[derive(Parser, Debug)]
#[command(name = "pdf-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document to ask about (PDF, or plain text)
    #[arg(value_name = "FILE", required_unless_present = "list_models")]
    document: Option<PathBuf>,

    /// Relay daemon address
    #[arg(short = 'r', long, env = "PDF_CHAT_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay_url: String,

    /// Model id (relay default when omitted)
    #[arg(short = 'm', long, env = "PDF_CHAT_MODEL")]
    model: Option<String>,

    /// System prompt override
    #[arg(long)]
    system_prompt: Option<String>,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    /// Nucleus sampling threshold
    #[arg(long, default_value_t = 0.9)]
    top_p: f32,

    /// Maximum tokens to generate
    #[arg(long, default_value_t = 2000)]
    max_tokens: u32,

    /// Print the available models and exit
    #[arg(long)]
    list_models: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PDF_CHAT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            parameters: GenerationParameters {
                temperature: self.temperature,
                top_p: self.top_p,
                max_tokens: self.max_tokens,
                ..GenerationParameters::default()
            },
        }
    }
}

/// Log to stderr so answers on stdout stay clean
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("pdf_chat_client={level},pdf_chat={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn print_models(client: &RelayClient) -> Result<()> {
    let list = client.list_models().await;
    if list.fallback {
        warn!(
            error = list.error.as_deref().unwrap_or("unknown error"),
            "Could not reach the relay, showing the default model list"
        );
    }

    let mut stdout = tokio::io::stdout();
    for model in list.models {
        stdout.write_all(format!("{model}\n").as_bytes()).await?;
    }
    stdout.flush().await?;
    Ok(())
}

/// Stream one answer to stdout, stopping on Ctrl-C
async fn ask(controller: &mut SessionController, question: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let cancel_on_ctrl_c = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_ctrl_c.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    let mut progress = controller.subscribe();
    let mut printed = String::new();

    let submit = controller.submit(question, cancel);
    tokio::pin!(submit);

    let result = loop {
        tokio::select! {
            result = &mut submit => break result,
            Ok(()) = progress.changed() => {
                let buffer = progress.borrow_and_update().clone();
                let delta = buffer.strip_prefix(printed.as_str()).unwrap_or(buffer.as_str());
                stdout.write_all(delta.as_bytes()).await?;
                stdout.flush().await?;
                printed = buffer;
            }
        }
    };
    ctrl_c.abort();

    let outcome = result?;
    debug!(state = ?outcome.state, "Question finished");

    // Whatever was committed beyond the streamed text: markers or a fallback answer
    if let Some(message) = &outcome.message {
        match message.content.strip_prefix(printed.as_str()) {
            Some(rest) => stdout.write_all(rest.as_bytes()).await?,
            None => {
                stdout.write_all(b"\n").await?;
                stdout.write_all(message.content.as_bytes()).await?;
            }
        }
    }
    if let Some(notice) = &outcome.notice {
        stdout
            .write_all(format!("\n[{}]", notice.content).as_bytes())
            .await?;
    }
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let client = RelayClient::new(&args.relay_url);

    if args.list_models {
        return print_models(&client).await;
    }

    let Some(path) = args.document.clone() else {
        bail!("A document path is required");
    };

    let file = read_local_file(&path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let document = if file.is_pdf() {
        info!(name = %file.name, "Uploading document to relay");
        client.upload_document(file).await
    } else {
        file.into_text_document()
    };

    let mut controller = SessionController::new(client, args.settings());
    controller.load_document(document);
    let mut stdout = tokio::io::stdout();
    if let Some(notice) = controller.transcript().last() {
        stdout
            .write_all(format!("{}\n", notice.content).as_bytes())
            .await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        ask(&mut controller, question).await?;
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use apipod::{Config, Session, StreamingClient, TerminalUi, Ui};

#[derive(Parser, Debug)]
#[command(name = "apipod", version, about = "Terminal coding assistant")]
struct Args {
    /// Model name (overrides config file and APIPOD_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// API key (overrides config file and APIPOD_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Working directory for tool execution (defaults to the current directory)
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Persist the resolved base URL, API key, and model to ~/.apipod/config.json
    #[arg(long)]
    save: bool,

    /// Run a single prompt non-interactively and exit
    #[arg(short, long)]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(api_key) = args.api_key {
        config.api_key = api_key;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.save {
        config.save().context("saving config")?;
    }

    anyhow::ensure!(
        !config.api_key.is_empty(),
        "no API key configured; set APIPOD_API_KEY, pass --api-key, or add api_key to ~/.apipod/config.json"
    );

    let cwd = match args.workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving working directory")?,
    };

    let client = StreamingClient::new(&config.base_url, &config.api_key);
    let mut session = Session::new(
        client,
        &config.model,
        Some(cwd.clone()),
        Box::new(TerminalUi::new()),
    );

    if let Some(prompt) = args.prompt {
        return session.send_message(&prompt).await.map_err(Into::into);
    }

    // REPL chrome lives outside the session's display handle.
    let shell = TerminalUi::new();
    shell.banner(&config.model, &cwd.display().to_string());

    let mut editor = DefaultEditor::new().context("initializing line editor")?;
    loop {
        match editor.readline(&shell.prompt_symbol()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                match line {
                    "/quit" | "/exit" => break,
                    "/help" => shell.help(),
                    "/clear" => session.clear(),
                    _ if line.starts_with('/') => {
                        shell.error(&format!("Unknown command: {line}"));
                    }
                    _ => {
                        if let Err(e) = session.send_message(line).await {
                            shell.error(&e.to_string());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("reading input"),
        }
    }

    Ok(())
}

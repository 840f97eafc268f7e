use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dialoguer::Input;
use tracing_subscriber::EnvFilter;

use image_chat::api::ApiServer;
use image_chat::media::save_base64_image;
use image_chat::{ChatReply, Config, ConversationSession, SendOptions};

/// Image Chat - multi-turn conversational image generation
#[derive(Parser)]
#[command(name = "image-chat", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Generation settings shared by the one-shot commands
#[derive(Args)]
struct GenerationArgs {
    /// Aspect ratio (1:1, 16:9, 4:3, 3:2, 9:16, 21:9, 5:4)
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Output resolution (1K, 2K, 4K)
    #[arg(long, default_value = image_chat::chat::DEFAULT_IMAGE_SIZE)]
    image_size: String,

    /// Collect intermediate "thinking" images
    #[arg(long)]
    thinking: bool,
}

impl GenerationArgs {
    fn options(self, base: SendOptions) -> SendOptions {
        let options = match self.aspect_ratio {
            Some(ratio) => base.with_aspect_ratio(ratio),
            None => base,
        };
        options
            .with_image_size(self.image_size)
            .with_thinking(self.thinking)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Directory with the web UI build
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Generate an image from a text prompt
    Generate {
        /// Text prompt
        prompt: String,

        /// Output file
        #[arg(short, long, default_value = "generated.png")]
        output: PathBuf,

        /// Ground the generation with Google Search
        #[arg(long)]
        search: bool,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Edit an existing image
    Edit {
        /// Image to edit
        input: PathBuf,

        /// Edit instruction
        prompt: String,

        /// Output file
        #[arg(short, long, default_value = "edited_image.png")]
        output: PathBuf,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Compose a new image from up to 14 reference images
    Composite {
        /// Composition instruction
        prompt: String,

        /// Reference images
        #[arg(required = true, num_args = 1..)]
        images: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = "composite.png")]
        output: PathBuf,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Interactive multi-turn conversation
    Chat {
        /// Directory for generated images
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Ground every turn with Google Search
        #[arg(long)]
        search: bool,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,image_chat=info",
        1 => "info,image_chat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load();
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Serve { port, static_dir } => serve(&config, port, static_dir).await,
        Command::Generate {
            prompt,
            output,
            search,
            generation,
        } => {
            let options = generation.options(base_options(search));
            cmd_generate(&config, &prompt, &output, &options).await
        }
        Command::Edit {
            input,
            prompt,
            output,
            generation,
        } => {
            let options = generation.options(SendOptions::default());
            let mut session = ConversationSession::new(config.gemini()?);
            let path = session.edit_image(&input, &prompt, &output, &options).await?;
            println!("Edited image saved to {}", path.display());
            Ok(())
        }
        Command::Composite {
            prompt,
            images,
            output,
            generation,
        } => {
            let options = generation.options(SendOptions::composite());
            let mut session = ConversationSession::new(config.gemini()?);
            let path = session
                .composite_images(&prompt, &images, &output, &options)
                .await?;
            println!(
                "Composite of {} images saved to {}",
                images.len(),
                path.display()
            );
            Ok(())
        }
        Command::Chat {
            output_dir,
            search,
            generation,
        } => {
            let options = generation.options(base_options(search));
            cmd_chat(&config, &output_dir, &options).await
        }
        Command::Setup => image_chat::setup::run_setup(),
    }
}

/// Run the HTTP gateway
async fn serve(config: &Config, port: Option<u16>, static_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    let static_dir = static_dir.or_else(|| config.server.static_dir.clone());

    tracing::info!(port, api_url = %config.api_url, "starting image chat gateway");

    ApiServer::new(config.gemini()?, port)
        .static_dir(static_dir)
        .run()
        .await?;

    Ok(())
}

/// Generate a single image
async fn cmd_generate(
    config: &Config,
    prompt: &str,
    output: &Path,
    options: &SendOptions,
) -> anyhow::Result<()> {
    let mut session = ConversationSession::new(config.gemini()?);
    let reply = session.send_message(prompt, &[], options).await?;

    print_reply(&reply)?;

    let data = reply.image_data.ok_or(image_chat::Error::NoImage)?;
    save_base64_image(&data, output)?;
    println!("Image saved to {}", output.display());

    Ok(())
}

/// Interactive conversation; each generated image is saved as `turn-<n>.png`
async fn cmd_chat(config: &Config, output_dir: &Path, options: &SendOptions) -> anyhow::Result<()> {
    let mut session = ConversationSession::new(config.gemini()?);
    let mut turn = 0_usize;

    println!("Multi-turn image chat. Commands: /reset, /quit (empty line also quits)\n");

    loop {
        let prompt: String = Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()?;
        let prompt = prompt.trim();

        match prompt {
            "" | "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("Conversation reset\n");
                continue;
            }
            _ => {}
        }

        let reply = match session.send_message(prompt, &[], options).await {
            Ok(reply) => reply,
            Err(e) => {
                // History is untouched on failure, so the user can retry
                println!("Request failed: {e}\n");
                continue;
            }
        };

        turn += 1;
        print_reply(&reply)?;

        for path in save_turn_images(&reply, output_dir, turn) {
            println!("Image saved to {}", path.display());
        }

        println!("({} turns in history)\n", session.len());
    }

    Ok(())
}

/// Search-grounded preset when `search` is set, plain defaults otherwise
fn base_options(search: bool) -> SendOptions {
    if search {
        SendOptions::search()
    } else {
        SendOptions::default()
    }
}

/// Save a chat turn's image and thinking images, returning the written paths
///
/// A payload that fails to decode or write is reported and skipped; the turn
/// is already in history, so the conversation carries on.
fn save_turn_images(reply: &ChatReply, output_dir: &Path, turn: usize) -> Vec<PathBuf> {
    let final_image = reply
        .image_data
        .iter()
        .map(|data| (data, output_dir.join(format!("turn-{turn}.png"))));
    let thoughts = reply.thinking_images.iter().enumerate().map(|(i, data)| {
        (
            data,
            output_dir.join(format!("turn-{turn}-thought-{}.png", i + 1)),
        )
    });

    final_image
        .chain(thoughts)
        .filter_map(|(data, path)| match save_base64_image(data, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to save image");
                println!("Could not save {}: {e}", path.display());
                None
            }
        })
        .collect()
}

/// Print reply text and grounding metadata
fn print_reply(reply: &ChatReply) -> anyhow::Result<()> {
    if !reply.text.is_empty() {
        println!("{}", reply.text);
    }

    if let Some(metadata) = &reply.grounding_metadata {
        println!("Search grounding sources:");
        println!("{}", serde_json::to_string_pretty(metadata)?);
    }

    Ok(())
}

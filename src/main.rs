use clap::{Parser, Subcommand};
use hkxconv::codec::{Codec, PackfileCodec};
use hkxconv::container::decode_container;
use hkxconv::convert::{self, BinaryOptions, TextOptions};
use hkxconv::header::Platform;
use hkxconv::kind::{classify, FileKind};
use hkxconv::HavokRoot;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hkxconv", about = "Convert Breath of the Wild Havok packfiles to JSON and back")]
struct Cli {
    /// Log every conversion step
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Havok packfile to JSON
    #[command(visible_alias = "hkx2json")]
    ToText {
        /// Source packfile
        src: PathBuf,
        /// Destination (default: source with a .json extension)
        dst: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(short, long, visible_alias = "prettyprint")]
        pretty: bool,
    },
    /// Convert JSON back to a Havok packfile
    #[command(visible_alias = "json2hkx")]
    ToBinary {
        /// Source JSON
        src: PathBuf,
        /// Destination (default: source with the detected packfile extension)
        dst: Option<PathBuf>,
        /// Write for Nintendo Switch instead of Wii U
        #[arg(long, visible_alias = "platform-b")]
        nx: bool,
    },
    /// Show packfile header and root objects
    Info {
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("hkxconv=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hkxconv=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {

        // ── ToText ───────────────────────────────────────────────────────────
        Commands::ToText { src, dst, pretty } => {
            let opts = TextOptions { pretty, ..Default::default() };
            let written = convert::to_text(&src, dst.as_deref(), &opts)?;
            println!("Created: {}", written.display());
        }

        // ── ToBinary ─────────────────────────────────────────────────────────
        Commands::ToBinary { src, dst, nx } => {
            let platform = if nx { Platform::Nx } else { Platform::WiiU };
            let opts = BinaryOptions { platform, ..Default::default() };
            let written = convert::to_binary(&src, dst.as_deref(), &opts)?;
            println!("Created: {}", written.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let bytes = std::fs::read(&input)?;
            let extension = convert::extension_of(&input);
            let decoded = PackfileCodec.decode(&bytes)?;
            let roots = decode_container(&PackfileCodec, &bytes, &extension)?;
            let h = &decoded.header;

            println!("── Havok packfile ───────────────────────────────────────");
            println!("  Path             {}", input.display());
            println!("  Size             {} B", bytes.len());
            println!("  Kind             {}", FileKind::from_extension(&extension)
                .or_else(|| classify(&roots))
                .map(|k| k.extension())
                .unwrap_or("unknown"));
            println!("  Platform         {}", h.platform().map(|p| p.name()).unwrap_or("custom"));
            println!("  Pointer size     {}", h.layout.pointer_size);
            println!("  Little endian    {}", h.layout.little_endian);
            println!("  File version     {}", h.file_version);
            println!("  Contents version {}", h.contents_version);
            println!("  Section offset   {}", h.section_offset);
            println!("  Roots ({}):", roots.len());
            for root in &roots {
                match root {
                    HavokRoot::StaticCompoundInfo(info) => println!(
                        "    {}  offset={}  actors={}  shapes={}",
                        root.class_name(), info.offset, info.actor_info.len(), info.shape_info.len()),
                    HavokRoot::RootLevelContainer(c) => {
                        println!("    {}  variants={}", root.class_name(), c.named_variants.len());
                        for v in &c.named_variants {
                            println!("      {:<24} {}", v.name, v.class_name);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

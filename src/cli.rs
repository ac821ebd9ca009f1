//! Process entry logic: multi-call dispatch on the binary name, otherwise a
//! small launcher with `<tool>`, `bootstrap`, `clean` and `list`.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{error::ErrorKind, ArgAction, Parser, Subcommand};

use crate::install;
use crate::logging;
use crate::tools::Registry;

/// ox9: small network toolkit.
#[derive(Debug, Parser)]
#[command(
    name = "ox9",
    version,
    about = "Small network toolkit: TCP port scanner, DNS lookups and an HTTP header dumper.",
    long_about = None
)]
struct Launcher {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: LauncherCommand,
}

#[derive(Debug, Subcommand)]
enum LauncherCommand {
    /// Symlink this executable into ~/.local/bin once per tool.
    Bootstrap,
    /// Remove the symlinks created by `bootstrap`.
    Clean,
    /// List the available tools.
    List,
    /// Run a tool: `ox9 <tool> [args...]`.
    #[command(external_subcommand)]
    Tool(Vec<String>),
}

/// Name the process was invoked as, without directory or extension.
pub fn invoked_as(argv0: &str) -> Option<String> {
    Path::new(argv0)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}

pub async fn run(argv: Vec<String>, registry: &Registry) -> Result<()> {
    let argv0 = argv.first().map(String::as_str).unwrap_or("ox9");
    if let Some(tool) = invoked_as(argv0).and_then(|name| registry.get(&name)) {
        logging::init(0);
        return tool.run(&argv[1..]).await;
    }

    let launcher = match Launcher::try_parse_from(&argv) {
        Ok(l) => l,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(());
        }
        Err(e) => bail!(e.render().to_string().trim_end().to_string()),
    };
    logging::init(launcher.verbose);

    match launcher.command {
        LauncherCommand::Bootstrap => {
            let exe = std::env::current_exe().context("failed to locate the running executable")?;
            let bin_dir = install::default_bin_dir()?;
            let created = install::bootstrap(&exe, &bin_dir, &registry.names())?;
            println!("linked {} tool(s) into {}", created.len(), bin_dir.display());
            Ok(())
        }
        LauncherCommand::Clean => {
            let bin_dir = install::default_bin_dir()?;
            let removed = install::clean(&bin_dir, &registry.names());
            println!("removed {} link(s) from {}", removed.len(), bin_dir.display());
            Ok(())
        }
        LauncherCommand::List => {
            write_tool_list(&mut io::stdout().lock(), registry)?;
            Ok(())
        }
        LauncherCommand::Tool(args) => {
            let Some((name, rest)) = args.split_first() else {
                bail!("missing tool name");
            };
            match registry.get(name) {
                Some(tool) => tool.run(rest).await,
                None => bail!("unknown command: {name} (see `ox9 list`)"),
            }
        }
    }
}

pub fn write_tool_list(out: &mut impl Write, registry: &Registry) -> Result<()> {
    for tool in registry.iter() {
        writeln!(out, "{:<8} {}", tool.name(), tool.about())?;
    }
    Ok(())
}

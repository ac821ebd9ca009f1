//! Command-line tools behind one capability interface.
//!
//! Each tool parses its own arguments, runs, and can describe its usage. The
//! set is closed and fixed at startup by [`Registry::builtin`].

use anyhow::Result;
use async_trait::async_trait;
use clap::{error::ErrorKind, CommandFactory, Parser};

pub mod dns;
pub mod headers;
pub mod scan;

pub use dns::DnsTool;
pub use headers::HeadersTool;
pub use scan::ScanTool;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Name used both as subcommand and as multi-call binary name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn about(&self) -> &'static str;

    /// Full usage text.
    fn usage(&self) -> String;

    /// Parses `args` (without the program name) and executes.
    async fn run(&self, args: &[String]) -> Result<()>;
}

pub struct Registry {
    tools: Vec<Box<dyn Tool>>,
}

impl Registry {
    pub fn builtin() -> Self {
        Self {
            tools: vec![
                Box::new(ScanTool),
                Box::new(DnsTool),
                Box::new(HeadersTool),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }
}

/// Parses tool arguments with clap.
///
/// `Ok(None)` means help or version was requested and already printed.
pub(crate) fn parse_args<A: Parser>(name: &str, args: &[String]) -> Result<Option<A>> {
    let argv = std::iter::once(name.to_string()).chain(args.iter().cloned());
    match A::try_parse_from(argv) {
        Ok(a) => Ok(Some(a)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            Ok(None)
        }
        Err(e) => Err(anyhow::anyhow!(e.render().to_string().trim_end().to_string())),
    }
}

pub(crate) fn render_usage<A: CommandFactory>(name: &'static str) -> String {
    A::command().name(name).render_help().to_string()
}

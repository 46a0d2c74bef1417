//! Namespace inspection commands: `ls`, `tree`, `cat` and `stat`.
//!
//! Each command reads from a loaded [`DefaultMapper`] and writes to any
//! `Write`, so they can be exercised without a terminal.

use std::io::Write;

use archivefs::{DefaultMapper, NodeRef};
use clap::Subcommand;

use crate::error::CliError;

/// Inspection subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum InspectCommand {
    /// List a directory of the merged namespace
    Ls {
        /// Path inside the namespace (defaults to the root)
        #[arg(default_value = "")]
        path: String,
    },

    /// Print the merged namespace as an indented tree
    Tree {
        /// Path inside the namespace (defaults to the root)
        #[arg(default_value = "")]
        path: String,
    },

    /// Write a file's contents to stdout
    Cat {
        /// Path of a file inside the namespace
        path: String,
    },

    /// Show a node's kind, size and owning archive
    Stat {
        /// Path inside the namespace
        path: String,
    },
}

/// Run an inspection subcommand.
pub fn run(
    command: &InspectCommand,
    mapper: &DefaultMapper,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        InspectCommand::Ls { path } => run_ls(mapper, path, out),
        InspectCommand::Tree { path } => run_tree(mapper, path, out),
        InspectCommand::Cat { path } => {
            mapper.read_into(path, out)?;
            Ok(())
        }
        InspectCommand::Stat { path } => run_stat(mapper, path, out),
    }
}

fn lookup<'a>(mapper: &'a DefaultMapper, path: &str) -> Result<NodeRef<'a>, CliError> {
    mapper
        .traverse(path)
        .ok_or_else(|| CliError::NotFound(path.to_string()))
}

/// List a directory, suffixing subdirectories with `/`.
fn run_ls(mapper: &DefaultMapper, path: &str, out: &mut dyn Write) -> Result<(), CliError> {
    match lookup(mapper, path)? {
        NodeRef::Directory(dir) => {
            for (name, node) in dir.iter() {
                if node.is_dir() {
                    writeln!(out, "{}/", name)?;
                } else {
                    writeln!(out, "{}", name)?;
                }
            }
        }
        NodeRef::File(_) => writeln!(out, "{}", path)?,
    }
    Ok(())
}

fn run_tree(mapper: &DefaultMapper, path: &str, out: &mut dyn Write) -> Result<(), CliError> {
    match lookup(mapper, path)? {
        NodeRef::Directory(dir) => {
            write!(out, "{}", dir)?;
            writeln!(
                out,
                "\n{} directories, {} files",
                dir.dir_count(),
                dir.file_count()
            )?;
        }
        NodeRef::File(file) => {
            writeln!(out, "{} ({} bytes, {})", path, file.size, file.archive)?;
        }
    }
    Ok(())
}

fn run_stat(mapper: &DefaultMapper, path: &str, out: &mut dyn Write) -> Result<(), CliError> {
    match lookup(mapper, path)? {
        NodeRef::Directory(dir) => {
            writeln!(out, "  Path:     /{}", path)?;
            writeln!(out, "  Type:     directory")?;
            writeln!(out, "  Entries:  {}", dir.len())?;
        }
        NodeRef::File(file) => {
            writeln!(out, "  Path:     /{}", path)?;
            writeln!(out, "  Type:     file")?;
            writeln!(out, "  Size:     {} bytes", file.size)?;
            writeln!(out, "  Archive:  {}", file.archive)?;
            writeln!(out, "  Entry:    {}", file.name)?;

            let claimants = mapper.occupants(&mapper.effective_name(&file.archive, &file.name));
            if claimants.len() > 1 {
                writeln!(out, "  Claimed:  {}", claimants.join(", "))?;
            }
        }
    }
    Ok(())
}

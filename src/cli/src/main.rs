//! Command-line front end for `rsrcedit-core`: parses flags, copies the
//! input executable to the output path, and drives one edit session over
//! it. Contains no PE/resource parsing logic of its own.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rsrcedit_core::io::FileIo;
use rsrcedit_core::pe::section_header::SectionHeader;
use rsrcedit_core::version_info::VersionQuad;
use rsrcedit_core::{run_edit_session, Error, IconEdit, Mutations, Subsystem};

/// Edits the resources and select header fields of a Windows PE/PE32+
/// executable, without requiring Windows or the native `rcedit` tool.
#[derive(Debug, Parser)]
#[command(name = "rsrcedit", version, about)]
struct Cli {
    /// Executable to read.
    input: PathBuf,

    /// Path the edited executable is written to.
    output: PathBuf,

    /// Print debug-level diagnostics, including the parsed header summary.
    #[arg(long)]
    verbose: bool,

    /// Set the subsystem to IMAGE_SUBSYSTEM_WINDOWS_CUI.
    #[arg(long, conflicts_with = "gui")]
    console: bool,

    /// Set the subsystem to IMAGE_SUBSYSTEM_WINDOWS_GUI.
    #[arg(long, conflicts_with = "console")]
    gui: bool,

    /// Replace the executable's icon with the first icon group in PATH.
    #[arg(long, value_name = "PATH", conflicts_with = "no_icon")]
    icon: Option<PathBuf>,

    /// Remove every icon resource.
    #[arg(long, conflicts_with = "icon")]
    no_icon: bool,

    /// File version, 1-4 dot-separated 16-bit integers (e.g. 1.2.3.4).
    #[arg(long, value_name = "V")]
    file_version: Option<String>,

    /// Product version, 1-4 dot-separated 16-bit integers.
    #[arg(long, value_name = "V")]
    product_version: Option<String>,

    /// Set a VERSIONINFO string, e.g. `--set-version CompanyName Acme`.
    /// May be repeated.
    #[arg(long, value_names = ["NAME", "VALUE"], num_args = 2)]
    set_version: Vec<String>,

    /// Delete a VERSIONINFO string by name. May be repeated.
    #[arg(long, value_name = "NAME")]
    delete_version: Vec<String>,
}

impl Cli {
    fn subsystem(&self) -> Option<Subsystem> {
        if self.gui {
            Some(Subsystem::Gui)
        } else if self.console {
            Some(Subsystem::Console)
        } else {
            None
        }
    }

    fn icon_edit(&self) -> rsrcedit_core::Result<Option<IconEdit>> {
        if self.no_icon {
            return Ok(Some(IconEdit::Remove));
        }
        match &self.icon {
            Some(path) => {
                let bytes = fs::read(path).map_err(Error::IOError)?;
                Ok(Some(IconEdit::Replace(bytes)))
            }
            None => Ok(None),
        }
    }

    fn mutations(&self) -> rsrcedit_core::Result<Mutations> {
        let mut strings = Vec::new();
        for pair in self.set_version.chunks_exact(2) {
            strings.push((pair[0].clone(), Some(pair[1].clone())));
        }
        for name in &self.delete_version {
            strings.push((name.clone(), None));
        }

        Ok(Mutations {
            subsystem: self.subsystem(),
            icon: self.icon_edit()?,
            version: rsrcedit_core::version_info::VersionUpdateOptions {
                file_version: self.file_version.as_deref().map(VersionQuad::parse_dotted).transpose()?,
                product_version: self.product_version.as_deref().map(VersionQuad::parse_dotted).transpose()?,
                strings,
            },
        })
    }
}

fn run() -> rsrcedit_core::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    env_logger::Builder::new().filter_level(level).init();

    let mutations = cli.mutations()?;

    log::info!("copying {} to {}", cli.input.display(), cli.output.display());
    fs::copy(&cli.input, &cli.output).map_err(Error::IOError)?;

    let mut io = FileIo::open_read_write(&cli.output)?;
    if cli.verbose {
        log_header_summary(&mut io)?;
    }

    run_edit_session(&mut io, &mutations)
}

/// Prints the parsed header summary for `--verbose` mode, before any
/// mutation is applied.
fn log_header_summary<IO: rsrcedit_core::io::Readable>(io: &mut IO) -> rsrcedit_core::Result<()> {
    let header = rsrcedit_core::pe::ExeHeader::read(io)?;
    log::debug!("subsystem: {}", header.optional_header.subsystem);
    log::debug!("file alignment: 0x{:x}", header.file_alignment());
    log::debug!("section alignment: 0x{:x}", header.section_alignment());
    for section in &header.sections {
        log_section(section);
    }
    Ok(())
}

fn log_section(section: &SectionHeader) {
    log::debug!(
        "section {}: virtual=[0x{:x}, 0x{:x}) file=[0x{:x}, 0x{:x})",
        section.name,
        section.virtual_range.start,
        section.virtual_range.end,
        section.file.start,
        section.file.end,
    );
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rsrcedit: {err}");
            ExitCode::FAILURE
        }
    }
}

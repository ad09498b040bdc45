//! Command-line interface for ISZ containers

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use isz_tools::isz::{self, IszError, IszHandle};
use isz_tools::logging;

#[derive(Parser)]
#[command(name = "isz-tools", about = "Handle .isz files (ISO zipped)", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Display information about an ISZ file
    Info {
        /// ISZ file
        file: String,
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify the checksums of one or more ISZ files
    Verify {
        /// Also decompress every block and verify the uncompressed checksum
        #[arg(short, long)]
        slow: bool,
        /// ISZ files to verify
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Convert an ISZ file to a raw .iso image
    #[command(name = "isz2iso", visible_alias = "2iso")]
    Isz2Iso {
        /// ISZ file to extract
        file: String,
        /// Destination ISO file (defaults to the source with an .iso extension)
        dest: Option<String>,
    },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<bool, IszError> {
    match command {
        Command::Info { file, json } => {
            let summary = isz::info(&file)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary).expect("info is serializable")
                );
            } else {
                println!("ISZ version {}, {}", summary.version, summary.encryption);
                println!("Volume serial number {}", summary.volume_serial);
                println!(
                    "Uncompressed size: {} MB ({} sectors of {} bytes)",
                    summary.uncompressed_size / 1024 / 1024,
                    summary.total_sectors,
                    summary.sector_size
                );
                println!(
                    "{} blocks of {} bytes",
                    summary.block_count, summary.block_size
                );
                if let Some(segments) = &summary.segment_files {
                    println!("Segments ({}):", segments.len());
                    for segment in segments {
                        println!("  {}", segment);
                    }
                }
            }
            Ok(true)
        }
        Command::Verify { slow, targets } => {
            let mut all_ok = true;
            for target in &targets {
                let mut handle = IszHandle::open(target)?;

                print!("Verifying {} - ", target);
                flush();
                let ok = isz::verify_compressed(&mut handle)?;
                println!("{}", if ok { "PASS" } else { "ERROR" });
                all_ok &= ok;

                if slow {
                    print!("Decompressing and verifying {} - ", target);
                    flush();
                    let ok = isz::verify_uncompressed(&mut handle)?;
                    println!("{}", if ok { "PASS" } else { "ERROR" });
                    all_ok &= ok;
                }

                handle.close();
            }
            Ok(all_ok)
        }
        Command::Isz2Iso { file, dest } => {
            let dest = dest.unwrap_or_else(|| default_iso_name(&file));
            let mut handle = IszHandle::open(&file)?;

            print!("Extracting {} to {} - ", file, dest);
            flush();
            isz::extract(&mut handle, &dest)?;
            println!("Done");

            handle.close();
            Ok(true)
        }
    }
}

fn default_iso_name(src: &str) -> String {
    match src.strip_suffix(".isz") {
        Some(stem) => format!("{}.iso", stem),
        None => format!("{}.iso", src),
    }
}

fn flush() {
    let _ = std::io::stdout().flush();
}

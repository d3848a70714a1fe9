use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, LevelFilter};

use flatfs::block_store::render_slot;
use flatfs::config::{self, Config, Geometry};
use flatfs::{FileSystem, Slot};

#[derive(Parser)]
#[command(about = "Menu-driven flat file system over a simulated block disk")]
struct Args {
    /// Disk artifact, one line per block
    #[arg(long, default_value = config::DISK_FILE)]
    disk: PathBuf,

    /// File table artifact, one line per file
    #[arg(long, default_value = config::TABLE_FILE)]
    table: PathBuf,

    /// Name of the root directory
    #[arg(long, default_value = config::DIR_NAME)]
    dir_name: String,

    #[arg(long, default_value_t = config::BLOCK_COUNT)]
    blocks: usize,

    #[arg(long, default_value_t = config::BLOCK_SIZE)]
    block_size: usize,

    /// Blocks at the start of the disk never given to files
    #[arg(long, default_value_t = config::RESERVED_SIZE)]
    reserved: usize,

    /// Descriptor slots, including the one held by the directory
    #[arg(long, default_value_t = config::FD_COUNT)]
    descriptors: usize,

    /// Size of the transfer memory
    #[arg(long, default_value_t = config::MEM_SIZE)]
    memory: usize,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            geometry: Geometry {
                block_count: self.blocks,
                block_size: self.block_size,
                reserved: self.reserved,
                fd_count: self.descriptors,
                mem_size: self.memory,
            },
            disk_path: self.disk.clone(),
            table_path: self.table.clone(),
            dir_name: self.dir_name.clone(),
        }
    }
}

/// Pulls answers off the input, one line each. `None` means input ended.
struct Prompt<R> {
    input: io::Lines<R>,
}

impl<R: BufRead> Prompt<R> {
    fn line(&mut self, question: &str) -> Option<String> {
        println!("{question}");
        match self.input.next()? {
            Ok(line) => Some(line.trim().to_string()),
            Err(e) => {
                error!("failed to read input: {e}");
                None
            }
        }
    }

    fn number(&mut self, question: &str) -> Option<usize> {
        loop {
            let line = self.line(question)?;
            match line.parse() {
                Ok(n) => return Some(n),
                Err(_) => println!("not a number: {line}"),
            }
        }
    }

    fn pair(&mut self, question: &str) -> Option<(usize, usize)> {
        loop {
            let line = self.line(question)?;
            let parsed: Vec<usize> = line
                .split_whitespace()
                .filter_map(|token| token.parse().ok())
                .collect();
            match parsed[..] {
                [a, b] if line.split_whitespace().count() == 2 => return Some((a, b)),
                _ => println!("expected two numbers: {line}"),
            }
        }
    }
}

fn render(slots: &[Slot]) -> String {
    slots
        .iter()
        .copied()
        .map(render_slot)
        .collect::<Vec<_>>()
        .join(" ")
}

fn report<T>(result: flatfs::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            println!("Error: {e}");
            None
        }
    }
}

/// Returns `false` when input ran out mid-session.
fn edit<R: BufRead>(fs: &mut FileSystem, prompt: &mut Prompt<R>) -> bool {
    let name = loop {
        let Some(name) = prompt.line("file name:") else {
            return false;
        };
        if report(fs.open(&name)).is_some() {
            break name;
        }
    };

    loop {
        let Some(choice) =
            prompt.number("(1) write (2) append (3) read (4) view (5) seek (6) close")
        else {
            let _ = report(fs.close(&name));
            return false;
        };
        match choice {
            1 | 2 | 3 => {
                let Some((offset, count)) = prompt.pair("memory offset and byte count:") else {
                    let _ = report(fs.close(&name));
                    return false;
                };
                match choice {
                    1 => {
                        report(fs.write(&name, offset, count));
                    }
                    2 => {
                        report(fs.append(&name, offset, count));
                    }
                    _ => {
                        if let Some(data) = report(fs.read(&name, offset, count)) {
                            println!("{data:?}");
                        }
                    }
                }
            }
            4 => {
                if let Some(slots) = report(fs.view(&name)) {
                    println!("{}", render(&slots));
                }
            }
            5 => {
                let Some(pos) = prompt.number("new position:") else {
                    let _ = report(fs.close(&name));
                    return false;
                };
                report(fs.seek(&name, pos));
            }
            6 => {
                // a failed close keeps the file open for another try
                if report(fs.close(&name)).is_some() {
                    return true;
                }
            }
            _ => println!("invalid choice {choice}"),
        }
    }
}

fn run<R: BufRead>(fs: &mut FileSystem, input: R) {
    let mut prompt = Prompt { input: input.lines() };
    println!("{}", fs.status());
    loop {
        let Some(choice) =
            prompt.number("(1) create (2) edit (3) view (4) delete (5) quit")
        else {
            return;
        };
        match choice {
            1 => {
                let Some(name) = prompt.line("file name:") else {
                    return;
                };
                report(fs.create(&name));
            }
            2 => {
                if !edit(fs, &mut prompt) {
                    return;
                }
            }
            3 => {
                let Some(name) = prompt.line("file name:") else {
                    return;
                };
                if let Some(slots) = report(fs.view(&name)) {
                    println!("{}", render(&slots));
                }
            }
            4 => {
                let Some(name) = prompt.line("file name:") else {
                    return;
                };
                report(fs.destroy(&name));
            }
            5 => return,
            _ => println!("invalid choice {choice}"),
        }
        println!("{}", fs.status());
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut fs = match FileSystem::load(args.config()) {
        Ok(fs) => fs,
        Err(e) => {
            error!("failed to load file system: {e}");
            return ExitCode::FAILURE;
        }
    };

    run(&mut fs, io::stdin().lock());

    if let Err(e) = fs.save() {
        error!("failed to save file system: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};

use mars::output::{MsgColor, Output};
use mars::word::{decode, Word};
use mars::{status, Disassembly, Loader, TickResult, Warrior, WriteCounts};

/// Mars assembles Redcode warriors and pits two of them against each other in a shared core.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.red` file and print the serialized warrior
    Assemble {
        /// `.red` file to assemble
        name: PathBuf,
    },
    /// Create binary `.rcw` file to load later
    Compile {
        /// `.red` file to compile
        name: PathBuf,
        /// Destination to output .rcw file
        dest: Option<PathBuf>,
    },
    /// Check a `.red` file without outputting anything
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Print the instructions of a `.red` or `.rcw` warrior
    Disasm {
        /// Warrior file or built-in name
        name: String,
    },
    /// Load two warriors into a core and run until one of them violates
    Battle {
        /// First warrior: `.red`, `.rcw` or a built-in (`dwarf`, `imp`)
        a: String,
        /// Second warrior
        b: String,
        /// Core width
        #[arg(long, default_value_t = 64)]
        width: usize,
        /// Core height
        #[arg(long, default_value_t = 16)]
        height: usize,
        /// Placement seed, defaults to `MARS_SEED` or a random one
        #[arg(short, long)]
        seed: Option<u64>,
        /// Declare a draw after this many ticks
        #[arg(long, default_value_t = 100_000)]
        max_ticks: u64,
        /// Pause between ticks, in milliseconds
        #[arg(long, default_value_t = 0)]
        tick_ms: u64,
        /// Print the final core as a grid
        #[arg(long)]
        map: bool,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    mars::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .context_lines(mars::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        println!("\n~ mars v{VERSION} ~");
        println!("{}", LOGO.truecolor(0xb3, 0x6b, 0x30).bold());
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Assemble { name } => {
            let warrior = assemble_file(&name)?;
            let words: Vec<String> = warrior.to_raw().iter().map(|w| format!("{w:#x}")).collect();
            println!("[{}]", words.join(", "));
            Ok(())
        }
        Command::Compile { name, dest } => {
            Output::file_status(MsgColor::Green, "Assembling", &name);
            let warrior = assemble_file(&name)?;

            let out_file_name = match dest {
                Some(dest) => dest,
                None => name.with_extension("rcw"),
            };
            let mut file = File::create(&out_file_name).into_diagnostic()?;
            for word in warrior.to_raw() {
                file.write_all(&word.to_be_bytes()).into_diagnostic()?;
            }

            status!(Green, "Finished", "emit binary");
            Output::file_status(MsgColor::Green, "Saved", &out_file_name);
            Ok(())
        }
        Command::Check { name } => {
            Output::file_status(MsgColor::Green, "Checking", &name);
            let _ = assemble_file(&name)?;
            status!(Green, "Success", "no errors found!");
            Ok(())
        }
        Command::Disasm { name } => {
            let warrior = read_warrior(&name)?;
            for (i, &word) in warrior.words().iter().enumerate() {
                let marker = if i == warrior.entry() as usize { ">" } else { " " };
                println!("{marker}{i:>4}  {word:08x}  {}", Disassembly::from(decode(word)));
            }
            Ok(())
        }
        Command::Battle {
            a,
            b,
            width,
            height,
            seed,
            max_ticks,
            tick_ms,
            map,
            minimal,
        } => {
            Output::set_minimal(minimal);
            battle(Battle {
                a,
                b,
                width,
                height,
                seed,
                max_ticks,
                tick_ms,
                map,
            })
        }
    }
}

/// Settings for one run of the `battle` command.
struct Battle {
    a: String,
    b: String,
    width: usize,
    height: usize,
    seed: Option<u64>,
    max_ticks: u64,
    tick_ms: u64,
    map: bool,
}

fn battle(opts: Battle) -> Result<()> {
    let Battle {
        a,
        b,
        width,
        height,
        seed,
        max_ticks,
        tick_ms,
        map,
    } = opts;
    let warrior_a = read_warrior(&a)?;
    let warrior_b = read_warrior(&b)?;

    let seed = seed.or_else(mars::env::seed).unwrap_or_else(rand::random);
    status!(Green, "Loading", "{} vs {}, core {}x{}, seed {}", a, b, width, height, seed);
    let mut engine = Loader::seeded(width, height, seed)
        .load(&warrior_a, &warrior_b)
        .map_err(|e| e.report())?;
    let writes = WriteCounts::new(engine.core().len());
    writes.attach(&mut engine);

    status!(Green, "Running", "at most {} ticks", max_ticks);
    let trace = mars::env::is_trace_enabled();
    while engine.ticks() < max_ticks {
        match engine.update() {
            TickResult::Executed { program, address } => {
                if trace {
                    Output::trace(&engine.observer(), program, address);
                }
            }
            TickResult::Violated(violation) => {
                if trace {
                    Output::trace(&engine.observer(), violation.program, violation.address);
                }
                break;
            }
            TickResult::Halted { .. } => break,
        }
        if tick_ms > 0 {
            sleep(Duration::from_millis(tick_ms));
        }
    }

    let observer = engine.observer();
    if map {
        print!("{}", Output::core_map(&observer, &writes));
    }
    match (observer.winner(), observer.violation()) {
        (Some(winner), Some(violation)) => {
            status!(Red, "Violation", "{}", violation);
            let name = if winner == mars::ProgramId::A { &a } else { &b };
            status!(Green, "Winner", "{} ({}) after {} ticks", winner, name, observer.ticks());
        }
        _ => status!(Cyan, "Draw", "no winner after {} ticks", observer.ticks()),
    }
    Ok(())
}

/// Return the warrior assembled from a source file, rendering errors against the source.
fn assemble_file(name: &Path) -> Result<Warrior> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    mars::assemble(&src).map_err(|e| e.report(&name.display().to_string(), &src))
}

/// Built-in name, `.red` source or `.rcw` binary.
fn read_warrior(name: &str) -> Result<Warrior> {
    if let Some(warrior) = Warrior::builtin(name) {
        return Ok(warrior);
    }
    let path = Path::new(name);
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        bail!("File has no extension. Exiting...");
    };
    match ext {
        "red" => assemble_file(path),
        "rcw" => {
            // Read to byte buffer
            let mut file = File::open(path).into_diagnostic()?;
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer).into_diagnostic()?;

            if buffer.len() % 4 != 0 {
                bail!("File is not aligned to 32 bits")
            }
            let raw: Vec<Word> = buffer
                .chunks_exact(4)
                .map(|word| Word::from_be_bytes([word[0], word[1], word[2], word[3]]))
                .collect();
            match Warrior::from_raw(&raw) {
                Some(warrior) => Ok(warrior),
                None => bail!("File is empty"),
            }
        }
        _ => bail!("File has unknown extension. Exiting..."),
    }
}

const LOGO: &str = r#"
  _ __ ___   __ _ _ __ ___
 | '_ ` _ \ / _` | '__/ __|
 | | | | | | (_| | |  \__ \
 |_| |_| |_|\__,_|_|  |___/"#;

const SHORT_INFO: &str = r"
Welcome to mars, a memory array Redcode simulator for two warriors.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");

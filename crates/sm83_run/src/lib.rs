use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_num::maybe_hex;
use sm83::table::FlagEffect;
use sm83::{
    decode, DispatchConfig, Dispatcher, FlatBus, HostSignal, InstructionDescriptor, OpcodeTable,
    RunOutcome,
};

/// Where program images are placed when `--load` is not given.
pub const DEFAULT_LOAD_ADDR: u16 = 0x0100;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run a raw program image until it halts or hits the instruction limit
    Run(RunOptions),
    /// Print one line per opcode table entry
    Table {
        /// Opcode metadata JSON to use instead of the built-in table
        #[arg(long)]
        opcodes: Option<PathBuf>,
    },
    /// Disassemble a raw program image
    Disasm(DisasmOptions),
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Raw program image
    pub image: PathBuf,

    /// Address to load the image at (hex ok with '0x')
    #[arg(long, value_parser = maybe_hex::<u16>, default_value_t = DEFAULT_LOAD_ADDR)]
    pub load: u16,

    /// Entry point; defaults to the load address (hex ok with '0x')
    #[arg(long, value_parser = maybe_hex::<u16>)]
    pub pc: Option<u16>,

    /// Stop after this many instructions
    #[arg(long = "max", value_parser = maybe_hex::<u64>)]
    pub max_instructions: Option<u64>,

    /// Opcode metadata JSON to use instead of the built-in table
    #[arg(long)]
    pub opcodes: Option<PathBuf>,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct DisasmOptions {
    /// Raw program image
    pub image: PathBuf,

    /// Address the image is loaded at (hex ok with '0x')
    #[arg(long, value_parser = maybe_hex::<u16>, default_value_t = DEFAULT_LOAD_ADDR)]
    pub load: u16,

    /// Opcode metadata JSON to use instead of the built-in table
    #[arg(long)]
    pub opcodes: Option<PathBuf>,
}

pub fn execute(command: Command) -> Result<()> {
    match command {
        Command::Run(options) => run_image(&options),
        Command::Table { opcodes } => print_table(load_table(opcodes.as_deref())?),
        Command::Disasm(options) => disassemble(&options),
    }
}

/// The built-in table, or one built from a metadata file.
fn load_table(path: Option<&Path>) -> Result<&'static OpcodeTable> {
    let Some(path) = path else {
        return Ok(OpcodeTable::builtin());
    };
    let file = File::open(path)
        .with_context(|| format!("failed to open opcode metadata '{}'", path.display()))?;
    let table = OpcodeTable::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to build opcode table from '{}'", path.display()))?;
    log::info!("using opcode metadata from '{}'", path.display());
    // The table lives for the rest of the process.
    Ok(Box::leak(Box::new(table)))
}

fn load_image(path: &Path, load: u16) -> Result<(FlatBus, usize)> {
    let image =
        std::fs::read(path).with_context(|| format!("failed to read image '{}'", path.display()))?;
    let mut bus = FlatBus::new();
    let loaded = bus.load(load, &image);
    log::info!(
        "loaded {loaded} of {} bytes from '{}' at 0x{load:04X}",
        image.len(),
        path.display()
    );
    Ok((bus, loaded))
}

fn run_image(options: &RunOptions) -> Result<()> {
    let table = load_table(options.opcodes.as_deref())?;
    let (bus, _) = load_image(&options.image, options.load)?;

    let config = match options.max_instructions {
        Some(max) => DispatchConfig::builder()
            .max_instructions(max)
            .stop_on_halt(true)
            .build(),
        None => DispatchConfig::builder().stop_on_halt(true).build(),
    };
    let mut dispatcher = Dispatcher::with_config(table, bus, config);
    dispatcher.cpu_mut().regs.pc = options.pc.unwrap_or(options.load);

    let outcome = dispatcher
        .run(|_| HostSignal::Continue)
        .context("execution stopped by a bus fault")?;

    let cpu = dispatcher.cpu();
    let regs = &cpu.regs;
    let reason = match outcome {
        RunOutcome::Halted => "halted",
        RunOutcome::InstructionLimit => "instruction limit reached",
        RunOutcome::Stopped => "stopped",
        RunOutcome::BudgetSpent => "cycle budget spent",
    };
    println!("{reason} after {} instructions, {} cycles", cpu.instructions, cpu.cycles);
    println!(
        "AF={:04X} BC={:04X} DE={:04X} HL={:04X} SP={:04X} PC={:04X} IME={:?}",
        regs.af(),
        regs.bc(),
        regs.de(),
        regs.hl(),
        regs.sp,
        regs.pc,
        cpu.ime()
    );
    Ok(())
}

fn print_table(table: &OpcodeTable) -> Result<()> {
    for descriptor in table.iter() {
        println!("{}", describe(descriptor));
    }
    Ok(())
}

/// One line per descriptor: opcode, text, length, cycles and ZNHC effects.
pub fn describe(descriptor: &InstructionDescriptor) -> String {
    let prefix = if descriptor.prefixed { "CB " } else { "" };
    let cycles = match descriptor.branch_cycles {
        Some(taken) => format!("{}/{taken}", descriptor.cycles),
        None => descriptor.cycles.to_string(),
    };
    let flags: String = [
        ('Z', descriptor.flags.z),
        ('N', descriptor.flags.n),
        ('H', descriptor.flags.h),
        ('C', descriptor.flags.c),
    ]
    .into_iter()
    .map(|(letter, effect)| match effect {
        FlagEffect::Unaffected => '-',
        FlagEffect::Reset => '0',
        FlagEffect::Set => '1',
        FlagEffect::Computed => letter,
    })
    .collect();
    format!(
        "{prefix}{:02X}  {:<16} {} bytes  {:>5} cycles  {flags}",
        descriptor.opcode,
        descriptor.to_string(),
        descriptor.length,
        cycles
    )
}

fn disassemble(options: &DisasmOptions) -> Result<()> {
    let table = load_table(options.opcodes.as_deref())?;
    let (mut bus, loaded) = load_image(&options.image, options.load)?;
    if loaded == 0 {
        return Ok(());
    }

    let end = options.load as usize + loaded;
    let mut pc = options.load as usize;
    while pc < end {
        let decoded = decode(table, &mut bus, pc as u16)?;
        let length = decoded.descriptor().length as usize;
        let bytes: Vec<String> = (pc..pc + length)
            .map(|addr| format!("{:02X}", bus.memory[addr & 0xFFFF]))
            .collect();
        println!("{pc:04X}: {:<9} {decoded}", bytes.join(" "));
        pc += length;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        let args = std::iter::once("sm83-run").chain(line.split_whitespace());
        Cli::try_parse_from(args).map(|cli| cli.command)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_options() {
        let command = parse("run prog.bin --load 0x0150 --pc 0x0150 --max 1000").unwrap();
        assert_eq!(
            command,
            Command::Run(RunOptions {
                image: PathBuf::from("prog.bin"),
                load: 0x0150,
                pc: Some(0x0150),
                max_instructions: Some(1000),
                opcodes: None,
            })
        );
    }

    #[test]
    fn run_defaults_load_address() {
        let Command::Run(options) = parse("run prog.bin").unwrap() else {
            panic!("expected run");
        };
        assert_eq!(options.load, DEFAULT_LOAD_ADDR);
        assert_eq!(options.pc, None);
        assert_eq!(options.max_instructions, None);
    }

    #[test]
    fn parses_table_and_disasm() {
        assert_eq!(
            parse("table --opcodes ops.json").unwrap(),
            Command::Table {
                opcodes: Some(PathBuf::from("ops.json"))
            }
        );
        assert_eq!(
            parse("disasm prog.bin --load 512").unwrap(),
            Command::Disasm(DisasmOptions {
                image: PathBuf::from("prog.bin"),
                load: 0x0200,
                opcodes: None,
            })
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        for line in [
            "",
            "fly",
            "run",
            "run a.bin b.bin",
            "run a.bin --load",
            "run a.bin --load 0x10000",
            "run a.bin --speed 2",
            "table --max 3",
            "disasm a.bin --pc 0x100",
        ] {
            assert!(parse(line).is_err(), "{line:?} should be rejected");
        }
    }

    #[test]
    fn table_command_uses_builtin_or_file() {
        execute(Command::Table { opcodes: None }).unwrap();

        let err = execute(Command::Table {
            opcodes: Some(PathBuf::from("no/such/opcodes.json")),
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("no/such/opcodes.json"));
    }

    #[test]
    fn describes_descriptors() {
        let table = OpcodeTable::builtin();
        assert_eq!(
            describe(table.lookup(false, 0x20)),
            "20  JR NZ,r8         2 bytes   8/12 cycles  ----"
        );
        assert_eq!(
            describe(table.lookup(true, 0x7C)),
            "CB 7C  BIT 7,H          2 bytes      8 cycles  Z01-"
        );
    }
}

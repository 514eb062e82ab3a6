use clap::{App, Arg, ArgMatches, SubCommand};
use ringprobe::{
    config::{DATA_OFFSET, DEFAULT_MAP_MAX_ENTRIES, RECORD_ALIGNMENT, RECORD_HEADER_SIZE},
    error::RingprobeError,
    ringbuf::layout::record_size,
    BackingType, EmitArgs, EmitProgram, EmitStatus, Event, HashTable, Result, RingBuffer,
    RingConfig,
};
use std::sync::Arc;

fn ring_args<'a, 'b>(cmd: App<'a, 'b>) -> App<'a, 'b> {
    cmd.arg(
        Arg::with_name("capacity")
            .short("b")
            .long("capacity")
            .value_name("BYTES")
            .help("Ring capacity in bytes (must be power of 2)")
            .default_value("4096")
            .takes_value(true),
    )
    .arg(
        Arg::with_name("file")
            .short("f")
            .long("file")
            .value_name("FILE")
            .help("Back the ring with this file")
            .takes_value(true)
            .conflicts_with("memfd"),
    )
    .arg(
        Arg::with_name("memfd")
            .long("memfd")
            .help("Back the ring with an anonymous memory file descriptor (Linux only)"),
    )
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("ringprobe-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Ring buffer event-emission probe")
        .subcommand(
            ring_args(
                SubCommand::with_name("emit")
                    .about("Emit events and read them back")
                    .arg(
                        Arg::with_name("magic")
                            .short("m")
                            .long("magic")
                            .value_name("MAGIC")
                            .help("Magic value (decimal or 0x-prefixed hex)")
                            .default_value("0")
                            .takes_value(true),
                    )
                    .arg(
                        Arg::with_name("count")
                            .short("c")
                            .long("count")
                            .value_name("COUNT")
                            .help("Number of invocations, magic incremented each time")
                            .default_value("1")
                            .takes_value(true),
                    ),
            ),
        )
        .subcommand(ring_args(
            SubCommand::with_name("fill").about("Emit until the ring rejects an event"),
        ))
        .subcommand(SubCommand::with_name("info").about("Show version and layout information"))
        .get_matches();

    match matches.subcommand() {
        ("emit", Some(emit_matches)) => handle_emit_command(emit_matches),
        ("fill", Some(fill_matches)) => handle_fill_command(fill_matches),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_u64(value: &str, parameter: &str) -> Result<u64> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| {
        RingprobeError::invalid_parameter(parameter, format!("Invalid value '{}'", value))
    })
}

fn open_ring(matches: &ArgMatches) -> Result<RingBuffer> {
    let capacity = matches.value_of("capacity").unwrap_or("4096");
    let capacity = parse_u64(capacity, "capacity")? as usize;

    let mut config = RingConfig::new("ringprobe_cli", capacity);
    if let Some(path) = matches.value_of("file") {
        config = config
            .with_backing_type(BackingType::FileBacked)
            .with_file_path(path);
    } else if matches.is_present("memfd") {
        #[cfg(target_os = "linux")]
        {
            config = config.with_backing_type(BackingType::MemFd);
        }
        #[cfg(not(target_os = "linux"))]
        {
            return Err(RingprobeError::platform("memfd not supported on this platform"));
        }
    }

    RingBuffer::with_config(config)
}

fn handle_emit_command(matches: &ArgMatches) -> Result<()> {
    let magic = parse_u64(matches.value_of("magic").unwrap_or("0"), "magic")?;
    let count = parse_u64(matches.value_of("count").unwrap_or("1"), "count")?;

    let ring = Arc::new(open_ring(matches)?);
    let program = EmitProgram::new(ring.clone(), Arc::new(HashTable::default()));

    let mut submitted = 0u64;
    for i in 0..count {
        let args = EmitArgs::from(magic.wrapping_add(i));
        let status = program.emit(&args);
        println!("emit magic={:#018x} -> status {}", args.magic, u32::from(status));
        if status == EmitStatus::Submitted {
            submitted += 1;
        }
    }

    let mut consumer = ring.consumer()?;
    let events = consumer.drain_events()?;
    let intact = events.iter().filter(|e| e.is_intact()).count();

    println!("\nRecords:");
    for event in &events {
        let verdict = if event.is_intact() { "ok" } else { "CORRUPT" };
        println!("  {} {}", event, verdict);
    }

    println!("\nResults:");
    println!("  Submitted: {}/{}", submitted, count);
    println!("  Read back: {}", events.len());
    println!("  Intact: {}", intact);

    if intact != events.len() || events.len() as u64 != submitted {
        return Err(RingprobeError::serialization(
            "records read back do not match submissions",
        ));
    }
    Ok(())
}

fn handle_fill_command(matches: &ArgMatches) -> Result<()> {
    let ring = Arc::new(open_ring(matches)?);
    let program = EmitProgram::new(ring.clone(), Arc::new(HashTable::default()));

    let mut accepted = 0u64;
    while program.emit(&accepted.into()) == EmitStatus::Submitted {
        accepted += 1;
    }

    let stats = ring.stats();
    println!("Ring capacity: {} bytes", ring.capacity());
    println!("Record size: {} bytes", record_size(Event::SIZE));
    println!("Events accepted: {}", accepted);
    println!("Free bytes left: {}", ring.available());
    println!("Rejections: {}", stats.rejected);

    Ok(())
}

fn show_info() -> Result<()> {
    println!("ringprobe");
    println!("Version: {}", ringprobe::VERSION);

    println!("\nLayout:");
    println!("  Control header: {} bytes", DATA_OFFSET);
    println!("  Record header: {} bytes", RECORD_HEADER_SIZE);
    println!("  Record alignment: {} bytes", RECORD_ALIGNMENT);
    println!("  Event payload: {} bytes", Event::SIZE);
    println!("  Side table entries: {}", DEFAULT_MAP_MAX_ENTRIES);

    println!("\nStatus codes:");
    println!("  {}: submitted", EmitStatus::Submitted.code());
    println!("  {}: no space in ring", EmitStatus::NoSpace.code());

    Ok(())
}

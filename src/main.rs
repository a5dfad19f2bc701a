use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
};

use tablewright::{
    extract_tables, BorderStyle, ColorizedRenderer, Format, MarkdownRenderer, MarkdownTable,
    MergeMode, Renderer, TableConfig, TableError, TextRenderer, WidthInference,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> io::Result<()> {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return Ok(()),
        Err(message) => {
            eprintln!("{message}");
            eprintln!("Usage: tablewright [options] <path-to-markdown>");
            std::process::exit(2);
        }
    };
    setup_logging();

    let markdown = fs::read_to_string(&args.path)?;
    let config = load_config(&args)?;
    let tables = extract_tables(&markdown);
    tracing::debug!(path = %args.path.display(), tables = tables.len(), "extracted tables");

    let mut out = io::BufWriter::new(io::stdout());
    for (idx, table) in tables.iter().enumerate() {
        if idx > 0 {
            writeln!(out)?;
        }
        let mut renderer = renderer_for(&args, table);
        table
            .to_table(config.clone())
            .render(renderer.as_mut(), &mut out)
            .map_err(into_io)?;
    }
    out.flush()
}

struct Args {
    path: PathBuf,
    format: Format,
    style: BorderStyle,
    stream: bool,
    width: Option<usize>,
    merge: Option<MergeMode>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut path = None;
    let mut format = Format::Text;
    let mut style = BorderStyle::LIGHT;
    let mut stream = false;
    let mut width = None;
    let mut merge = None;
    let mut config = None;
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--stream" => stream = true,
            "--format" | "-f" => format = value("--format")?.parse()?,
            "--style" => {
                let name = value("--style")?;
                style = BorderStyle::by_name(&name)
                    .ok_or_else(|| format!("unknown border style: {name}"))?;
            }
            "--width" | "-w" => {
                let raw = value("--width")?;
                width = Some(
                    raw.parse()
                        .map_err(|_| format!("invalid width: {raw}"))?,
                );
            }
            "--merge" => merge = Some(value("--merge")?.parse()?),
            "--config" => config = Some(PathBuf::from(value("--config")?)),
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    let path = path.ok_or_else(|| "missing markdown path".to_string())?;
    Ok(Some(Args {
        path,
        format,
        style,
        stream,
        width,
        merge,
        config,
    }))
}

fn print_help() {
    println!("tablewright");
    println!("Usage: tablewright [options] <path-to-markdown>\n");
    println!("Renders every table found in a markdown file.\n");
    println!("Options:");
    println!("  --format, -f <fmt>  text | ascii | markdown | html | color (default: text)");
    println!("  --style <name>      light | rounded | heavy | double | ascii");
    println!("  --width, -w <cols>  Total width budget (default: terminal width)");
    println!("  --merge <mode>      none | horizontal | vertical | hierarchical | both");
    println!("  --stream            Emit rows one at a time, widths taken from the header");
    println!("  --config <file>     JSON table configuration");
    println!("  --help, -h          Show this help text");
    println!("\nSet RUST_LOG=debug to see width and merge decisions on stderr.");
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(args: &Args) -> io::Result<TableConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
        }
        None => TableConfig::default(),
    };
    if let Some(mode) = args.merge {
        config.row.merge.mode = mode;
    }
    if args.stream {
        config.stream.enabled = true;
        if config.stream.widths.is_empty() {
            config.stream.inference = WidthInference::FirstRow;
        }
    }
    let fixed_width = matches!(args.format, Format::Text | Format::Ascii | Format::Color);
    config.widths.total = args.width.or(config.widths.total).or_else(|| {
        fixed_width
            .then(|| crossterm::terminal::size().ok())
            .flatten()
            .map(|(w, _)| w as usize)
    });
    Ok(config)
}

fn renderer_for(args: &Args, table: &MarkdownTable) -> Box<dyn Renderer> {
    match args.format {
        Format::Text => Box::new(TextRenderer::new(args.style)),
        Format::Markdown => Box::new(MarkdownRenderer::with_alignments(table.render_alignments())),
        Format::Color => Box::new(ColorizedRenderer {
            glyphs: args.style,
            ..ColorizedRenderer::default()
        }),
        format => format.renderer(),
    }
}

fn into_io(err: TableError) -> io::Error {
    match err {
        TableError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::InvalidInput, other),
    }
}

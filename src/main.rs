use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use anyhow::Context;
use clap::{Parser, ValueEnum, ColorChoice, ArgAction, CommandFactory};
use clap_complete::Shell;
use comfy_table::{Table, ContentArrangement};
use serde::{Deserialize, Serialize};
use is_terminal::IsTerminal;
mod tables;
mod error;
mod locator;
mod edid;
mod classify;
mod hwdb;
mod report;
mod markdown;
mod windows;
mod linux;

use report::{Collector, HardwareReport};

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFmt { Text, Json }

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Platform { Auto, Windows, Linux }

impl Platform {
    fn detect() -> Platform {
        if cfg!(target_os = "windows") { Platform::Windows } else { Platform::Linux }
    }

    fn name(self) -> &'static str {
        match self { Platform::Windows => "Windows", Platform::Linux => "Linux", Platform::Auto => "Auto" }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

const DEFAULT_OUTPUT_DIR: &str = "SysReport";
const DEFAULT_SYSFS_ROOT: &str = "/";

#[derive(Parser, Debug)]
#[command(
    name = "HardwareSniffer",
    about = "Hardware identification and classification report",
    long_about = "Enumerates the host's motherboard, BIOS, CPU, GPUs, monitors, buses and peripherals, classifies them (codenames, bus paths, EDID) and writes a de-duplicated report.",
    after_long_help = "Examples:\n  HardwareSniffer\n  HardwareSniffer --export --output-dir SysReport\n  HardwareSniffer --output json --pci-ids /usr/share/hwdata/pci.ids\n  HardwareSniffer --platform linux --sysfs-root /mnt/target\n  HardwareSniffer --snapshot capture.json --md-path report.md",
    color = ColorChoice::Auto
)]
struct Args {
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: String,
    #[arg(long, short = 'e', default_value_t = false, help = "Write Report.json into the output directory")]
    export: bool,
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFmt,
    #[arg(long)]
    md_path: Option<String>,
    #[arg(long, value_enum, default_value = "auto")]
    platform: Platform,
    #[arg(long, default_value = DEFAULT_SYSFS_ROOT)]
    sysfs_root: String,
    #[arg(long, help = "Replay a saved Windows snapshot instead of querying WMI")]
    snapshot: Option<String>,
    #[arg(long)]
    save_snapshot: Option<String>,
    #[arg(long)]
    pci_ids: Option<String>,
    #[arg(long)]
    usb_ids: Option<String>,
    #[arg(long, default_value_t = false)]
    progress: bool,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
    #[arg(long)]
    config: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            export: false,
            output: OutputFmt::Text,
            md_path: None,
            platform: Platform::Auto,
            sysfs_root: DEFAULT_SYSFS_ROOT.to_string(),
            snapshot: None,
            save_snapshot: None,
            pci_ids: None,
            usb_ids: None,
            progress: false,
            no_color: false,
            quiet: false,
            verbose: 0,
            log_level: None,
            log_format: None,
            log_path: None,
            completions: None,
            completions_out: None,
            config: None,
        }
    }
}

#[derive(Deserialize)]
struct AppConfig {
    output_dir: Option<String>,
    export: Option<bool>,
    output: Option<OutputFmt>,
    md_path: Option<String>,
    platform: Option<Platform>,
    sysfs_root: Option<String>,
    pci_ids: Option<String>,
    usb_ids: Option<String>,
    progress: Option<bool>,
    no_color: Option<bool>,
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() {
            if let Ok(mut f) = std::fs::File::create(path) { clap_complete::generate(sh, &mut cmd, "HardwareSniffer", &mut f); } else { clap_complete::generate(sh, &mut cmd, "HardwareSniffer", &mut std::io::stdout()); }
        } else {
            clap_complete::generate(sh, &mut cmd, "HardwareSniffer", &mut std::io::stdout());
        }
        return;
    }
    if let Some(p) = args.config.as_ref()
        && let Ok(s) = std::fs::read_to_string(p)
        && let Ok(cfg) = toml::from_str::<AppConfig>(&s) { apply_config(&mut args, cfg); }
    else {
        let def = "HardwareSniffer.toml";
        if let Ok(s) = std::fs::read_to_string(def)
            && let Ok(cfg) = toml::from_str::<AppConfig>(&s) { apply_config(&mut args, cfg); }
    }
    init_logging(&args);
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let _ = ENABLE_COLOR.set(color_default && !args.no_color);
    if let Err(e) = run(&args) {
        log::error!("{:#}", e);
        if !args.quiet { eprintln!("{}", paint(&format!("error: {:#}", e), "1;31")); }
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if let Some(lvl) = args.log_level {
        let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
        builder.filter_level(f);
    } else if args.verbose > 0 {
        let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
        builder.filter_level(f);
    }
    if let Some(fmt) = args.log_format {
        match fmt {
            LogFormat::Json => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().to_rfc3339();
                    let obj = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", obj)
                });
            }
            LogFormat::Text => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().format("%H:%M:%S");
                    writeln!(buf, "[{:<5} {}] {}", record.level(), ts, record.args())
                });
            }
        }
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => { eprintln!("Failed to open log file {}: {}", path, e); }
        }
    }
    builder.init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    let platform = resolve_platform(args);
    log::info!("Platform: {}", platform.name());
    let pci_ids = hwdb::load_pci_ids(args.pci_ids.as_deref().map(Path::new));
    let usb_ids = hwdb::load_usb_ids(args.usb_ids.as_deref().map(Path::new));
    let mut collector = make_collector(args, platform, pci_ids, usb_ids)?;
    let pb = if args.progress && !args.quiet { Some(indicatif::ProgressBar::new(report::STEP_COUNT as u64)) } else { None };
    let rep = report::build_report(collector.as_mut(), pb.as_ref());
    if let Some(pb) = pb { pb.finish_and_clear(); }
    if rep.is_empty() { log::warn!("No hardware information collected."); }
    match args.output {
        OutputFmt::Text => { if !args.quiet { print_text(&rep); } }
        OutputFmt::Json => { println!("{}", serde_json::to_string_pretty(&rep).context("serializing report")?); }
    }
    if args.export {
        let p = write_report_json(Path::new(&args.output_dir), &rep)?;
        if !args.quiet { println!("{}", paint(&format!("JSON written: {}", p.display()), "1;36")); }
    }
    if let Some(p) = args.md_path.as_ref() {
        let md = markdown::render_markdown(&rep, chrono::Local::now(), platform.name());
        std::fs::write(p, md).with_context(|| format!("writing Markdown to {}", p))?;
        if !args.quiet { println!("{}", paint(&format!("Markdown written: {}", p), "1;36")); }
    }
    Ok(())
}

/// A snapshot can only come from Windows, so `--snapshot` pins the platform when none is given.
fn resolve_platform(args: &Args) -> Platform {
    match args.platform {
        Platform::Auto if args.snapshot.is_some() => Platform::Windows,
        Platform::Auto => Platform::detect(),
        p => p,
    }
}

fn make_collector(args: &Args, platform: Platform, pci_ids: Option<hwdb::IdsDatabase>, usb_ids: Option<hwdb::IdsDatabase>) -> anyhow::Result<Box<dyn Collector>> {
    match platform {
        Platform::Windows => {
            let snap = match args.snapshot.as_ref() {
                Some(p) => {
                    let s = std::fs::read_to_string(p).with_context(|| format!("reading snapshot {}", p))?;
                    windows::WindowsSnapshot::from_json(&s).with_context(|| format!("parsing snapshot {}", p))?
                }
                None => windows::capture().context("querying WMI")?,
            };
            if let Some(p) = args.save_snapshot.as_ref() {
                let data = serde_json::to_vec_pretty(&snap).context("serializing snapshot")?;
                std::fs::write(p, data).with_context(|| format!("writing snapshot {}", p))?;
                log::info!("Snapshot saved to {}", p);
            }
            Ok(Box::new(windows::WindowsCollector::new(snap, pci_ids, usb_ids)))
        }
        Platform::Linux | Platform::Auto => {
            if args.save_snapshot.is_some() { log::warn!("--save-snapshot only applies to the Windows backend"); }
            Ok(Box::new(linux::LinuxCollector::new(PathBuf::from(&args.sysfs_root), pci_ids, usb_ids)))
        }
    }
}

fn write_report_json(dir: &Path, rep: &HardwareReport) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("Report.json");
    let data = serde_json::to_vec_pretty(rep).context("serializing report")?;
    std::fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn print_text(rep: &HardwareReport) {
    let view = rep.view();
    if view.is_empty() { println!("{}", paint("No hardware information collected.", "33")); return; }
    for cat in view {
        println!("{}", paint(cat.name, "1;36"));
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        if cat.entries.iter().any(|(n, _)| n.is_some()) {
            table.set_header(vec![paint("Device", "1"), paint("Details", "1")]);
        } else {
            table.set_header(vec![paint("Field", "1"), paint("Value", "1")]);
        }
        for (name, fields) in &cat.entries {
            match name {
                Some(n) => {
                    let details: Vec<String> = fields.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                    table.add_row(vec![n.clone(), details.join("\n")]);
                }
                None => { for (k, v) in fields { table.add_row(vec![k.to_string(), v.clone()]); } }
            }
        }
        println!("{}", table);
    }
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.output_dir == DEFAULT_OUTPUT_DIR && let Some(v) = cfg.output_dir { args.output_dir = v; }
    if let Some(v) = cfg.export { args.export = args.export || v; }
    if args.output == OutputFmt::Text && let Some(v) = cfg.output { args.output = v; }
    if args.md_path.is_none() && let Some(v) = cfg.md_path { args.md_path = Some(v); }
    if args.platform == Platform::Auto && let Some(v) = cfg.platform { args.platform = v; }
    if args.sysfs_root == DEFAULT_SYSFS_ROOT && let Some(v) = cfg.sysfs_root { args.sysfs_root = v; }
    if args.pci_ids.is_none() && let Some(v) = cfg.pci_ids { args.pci_ids = Some(v); }
    if args.usb_ids.is_none() && let Some(v) = cfg.usb_ids { args.usb_ids = Some(v); }
    if let Some(v) = cfg.progress { args.progress = args.progress || v; }
    if let Some(v) = cfg.no_color { args.no_color = args.no_color || v; }
    if args.log_level.is_none() && let Some(v) = cfg.log_level { args.log_level = Some(v); }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
}

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&true) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}

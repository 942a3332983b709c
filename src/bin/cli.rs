//! uf2reset command line interface.

use std::{cell::RefCell, error::Error as _, process};

use clap::{crate_authors, crate_description, crate_name, crate_version, App, AppSettings::*, Arg};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, trace, LevelFilter};
use simplelog::*;

use uf2reset::{self as ur, CancelToken, Error, Outcome, ResetOutcome, Reporter, Status};

/// Prints the session progress on the terminal, with a spinner while waiting
/// for the device to be plugged in.
struct ConsoleReporter {
    spinner: RefCell<Option<ProgressBar>>,
}
impl ConsoleReporter {
    fn new() -> Self {
        ConsoleReporter {
            spinner: RefCell::new(None),
        }
    }

    fn finish_spinner(&self, message: String) -> bool {
        match self.spinner.borrow_mut().take() {
            Some(pb) => {
                pb.finish_with_message(message);
                true
            }
            None => false,
        }
    }
}
impl Reporter for ConsoleReporter {
    fn report(&self, status: Status<'_>) {
        match status {
            Status::ImageValidated(image) => {
                debug!("{} is a valid UF2 file", image.path.display());
            }
            Status::WaitingForDevice(target) => {
                let pb = ProgressBar::new_spinner();
                pb.enable_steady_tick(120);
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
                        .template("{spinner:.blue} {msg}"),
                );
                pb.set_message(format!(
                    "⌛ Waiting for device {}...",
                    style(target).cyan()
                ));
                *self.spinner.borrow_mut() = Some(pb);
            }
            Status::DeviceFound {
                device,
                after_waiting,
            } => {
                let message = if after_waiting {
                    format!("🔍 Reset interface connected: {}", style(device).green())
                } else {
                    format!("🔍 Found reset interface: {}", style(device).green())
                };
                if !self.finish_spinner(message.clone()) {
                    println!("{}", message);
                }
            }
            Status::ResetRequested(outcome) => match outcome {
                ResetOutcome::ResetLikely(_) => {
                    println!("{}", style("✅ Device reset successfully").green())
                }
                ResetOutcome::ResetUncertain => {
                    println!("{}", style("⚠️  Device might not have been reset").yellow())
                }
                ResetOutcome::OpenError(e) => println!(
                    "{} ({})",
                    style("⚠️  Device might not have been reset").yellow(),
                    e
                ),
            },
            Status::WaitingForBootloader => println!("⌛ Waiting for UF2 bootloader..."),
            Status::BootloaderFound(volume) => println!(
                "{}",
                style(format!(
                    "⚙️ UF2 bootloader found ({}). Flashing...",
                    volume.display()
                ))
                .green()
            ),
            Status::Flashed(_) => {
                println!("{}", style("✅ Firmware flashed successfully").green())
            }
        }
    }
}

fn report_failure(error: &Error, settings: &ur::Settings) {
    match error {
        Error::BootloaderTimeout { .. } => {
            let message = if cfg!(windows) {
                "❌ UF2 bootloader not found on Windows"
            } else {
                "⚠️ UF2 bootloader not found among mounted drives"
            };
            println!("{}", style(message).yellow());
            if let Some(firmware) = &settings.firmware {
                if let Some(hint) = ur::manual_recovery_hint(firmware) {
                    for line in hint.lines() {
                        println!("💡 {}", line);
                    }
                }
            }
        }
        Error::DeviceNotFound { .. } => {
            println!("{}", style("❌ No compatible device found").yellow())
        }
        Error::CopyFailed { .. } => {
            println!("{}", style("❓ UF2 flashing failed").red());
        }
        Error::InvalidFirmwareHeader { .. } => println!("{}", style("❌ Invalid UF2 file").red()),
        Error::FirmwareUnreadable { .. } => {
            println!("{}", style("❌ Cannot access UF2 file").red())
        }
        Error::UnsupportedPlatform => println!(
            "{}",
            style("❌ UF2 flashing is not supported on this platform").red()
        ),
    }

    if settings.verbose {
        println!("Error: {}", error);
        if let Some(source) = error.source() {
            println!("Cause: {}", source);
        }
    }
}

fn main() {
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            eprintln!("failed to install the Ctrl-C handler: {}", e);
        }
    }

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Looks for the serial reset interface of the device (by USB vendor \
            and product id) and opens it at 1200 baud, which makes the \
            firmware reboot into its UF2 bootloader.\n\
            \n\
            When a firmware image is given, waits for the bootloader to show \
            up as a mounted drive (identified by its INFO_UF2.TXT file) and \
            copies the image onto it.\n\
            \n\
            Unless --nowait is given, waits for the device to be plugged in \
            if it is not connected yet. Hit Ctrl+C to stop waiting.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("VID")
                .help("USB vendor id of the device (hex or int)")
                .long("vid")
                .takes_value(true)
                .default_value("0x2FE3"),
        )
        .arg(
            Arg::with_name("PID")
                .help("USB product id of the device (hex or int)")
                .long("pid")
                .takes_value(true)
                .default_value("0x1337"),
        )
        .arg(
            Arg::with_name("FIRMWARE")
                .help("path to the UF2 file to flash after the reset")
                .long("firmware")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("NOWAIT")
                .help("do not wait for the device if it is not found")
                .long("nowait"),
        )
        .arg(Arg::with_name("v").short("v").long("verbose").multiple(true).help(
            "Shows the cause of errors and sets the logging level of verbosity, \
                repeat several times for higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'uf2reset -v -v -v' or 'uf2reset -vvv' vs 'uf2reset -v'
    let verbosity = matches.occurrences_of("v");
    let log_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("failed to set up logging: {}", e);
    }

    trace!("{:#?}", matches);

    // Arguments with default values ===========================================

    let parse_id = |name: &str, what: &str| -> u16 {
        // Arguments with a default value are always present
        let value = matches.value_of(name).unwrap_or_default();
        ur::parse_usb_id(value).unwrap_or_else(|_| {
            println!(
                "{}: `{}` needs to be a 16-bit hex or decimal value",
                style("error").red(),
                style(what).cyan()
            );
            println!(
                "   {} `{}` is not a valid value",
                style("-->").cyan(),
                style(value).on_red()
            );
            process::exit(-1);
        })
    };
    let vid = parse_id("VID", "vid");
    let pid = parse_id("PID", "pid");

    // END - Arguments with default values =====================================

    let mut builder = ur::SettingsBuilder::default()
        .vendor_id(vid)
        .product_id(pid)
        .wait_for_device(!matches.is_present("NOWAIT"))
        .verbose(verbosity > 0);

    if let Some(firmware) = matches.value_of("FIRMWARE") {
        builder = builder.firmware(firmware);
    }
    let settings = builder.finalize();

    // Run the session =========================================================

    let reporter = ConsoleReporter::new();
    let system = ur::System::new(&settings);
    let session = ur::factory(settings.clone(), system.environment(&reporter, cancel));
    let outcome = session.run();
    debug!("outcome: {:?}", outcome);

    match &outcome {
        Outcome::Failed(error) => report_failure(error, &settings),
        Outcome::Aborted => {
            reporter.finish_spinner(String::new());
        }
        Outcome::Done => {}
    }
    process::exit(outcome.exit_code());
}

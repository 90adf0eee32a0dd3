use std::{fs::File, path::Path};

use color_eyre::{
    config::{HookBuilder, Theme},
    eyre::{self, Context},
};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, LevelPadding,
    SharedLogger, TermLogger, TerminalMode, ThreadLogMode, ThreadPadding, WriteLogger,
};

fn stdout_is_terminal() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Installs the eyre report hook and a panic hook that also sends the panic to the log,
/// so it ends up in the log file if there is one.
pub fn init_eyre() -> eyre::Result<()> {
    let eyre_color = if stdout_is_terminal() {
        Theme::dark()
    } else {
        Theme::new()
    };

    let (stderr_panic_hook, eyre_hook) =
        HookBuilder::default().theme(eyre_color).into_hooks();
    eyre_hook
        .install()
        .wrap_err("failed to install eyre hook")?;

    let (log_panic_hook, _) = HookBuilder::default().theme(Theme::new()).into_hooks();

    std::panic::set_hook(Box::new(move |info| {
        eprintln!("{}", stderr_panic_hook.panic_report(info));
        log::error!(target: "panic", "{}", log_panic_hook.panic_report(info));
    }));

    Ok(())
}

/// Logs to stdout, and additionally to `logfile` if given. A log file that can't be
/// created is reported through the logger itself instead of failing.
pub fn init_logger(logfile: Option<&Path>, level: LevelFilter) -> eyre::Result<()> {
    let mut builder = ConfigBuilder::new();
    builder.set_thread_level(LevelFilter::Error);
    builder.set_target_level(LevelFilter::Error);
    builder.set_location_level(LevelFilter::Trace);

    builder.set_level_padding(LevelPadding::Right);
    builder.set_thread_padding(ThreadPadding::Right(3));

    builder.set_thread_mode(ThreadLogMode::Both);

    // NOTE: set_time_offset_to_local can only be run when there is only on thread active.
    let timezone_failed = builder.set_time_offset_to_local().is_err();

    let log_color = if stdout_is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        builder.build(),
        TerminalMode::Stdout,
        log_color,
    )];

    let logfile_failed = logfile.and_then(|logfile| match File::create(logfile) {
        Ok(f) => {
            loggers.push(WriteLogger::new(level, builder.build(), f));
            None
        }
        Err(e) => Some(e),
    });

    CombinedLogger::init(loggers).wrap_err("failed to set the logger")?;

    if timezone_failed {
        log::warn!("Failed to set time zone for the logger, using UTC instead");
    }

    if let Some(logfile) = logfile {
        match logfile_failed {
            Some(e) => log::error!(
                "Failed to create the log file at '{}' because: {e}",
                logfile.display()
            ),
            None => log::debug!("Logging to: {}", logfile.display()),
        }
    }

    Ok(())
}

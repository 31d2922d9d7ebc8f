use std::panic::PanicHookInfo;

/// Panics on runtime workers are logged with a trimmed backtrace instead of only going to stderr.
pub fn install_hook() {
    let old_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if std::thread::current().name() == Some("tokio-runtime-worker") {
            log::error!("{}", describe(info));
        } else {
            (old_hook)(info);
        }
    }));
}

fn describe(info: &PanicHookInfo<'_>) -> String {
    let payload = match info.payload().downcast_ref::<&'static str>() {
        Some(s) => *s,
        None => match info.payload().downcast_ref::<String>() {
            Some(s) => &**s,
            None => "Box<Any>",
        },
    };
    let backtrace = PrettyBacktrace(backtrace::Backtrace::new());

    match info.location() {
        Some(location) => format!(
            "Worker panicked at {}:{}:{}\n{payload}\n{backtrace:?}",
            location.file(),
            location.line(),
            location.column(),
        ),
        None => format!("Worker panicked\n{payload}\n{backtrace:?}"),
    }
}

/// Prints frames after the panic machinery, with paths relative to the working directory.
struct PrettyBacktrace(backtrace::Backtrace);

const HOOK_FRAMES: &[&str] = &[
    "backtrace::backtrace::trace",
    "backtrace::capture::Backtrace::create",
    "backtrace::capture::Backtrace::new",
    "eminium_launcher::panic::describe",
    "eminium_launcher::panic::install_hook::{{closure}}",
    "__rustc::rust_begin_unwind",
];

impl std::fmt::Debug for PrettyBacktrace {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cwd = std::env::current_dir();
        let mut print_path = move |fmt: &mut std::fmt::Formatter<'_>, path: backtrace::BytesOrWideString<'_>| {
            let path = path.into_path_buf();
            match cwd.as_ref().ok().and_then(|cwd| path.strip_prefix(cwd).ok()) {
                Some(suffix) => std::fmt::Display::fmt(&suffix.display(), fmt),
                None => std::fmt::Display::fmt(&path.display(), fmt),
            }
        };

        let frames = self.0.frames();
        let start = frames.iter()
            .rposition(|frame| frame.symbols().iter().any(|symbol| {
                symbol.name().is_some_and(|name| HOOK_FRAMES.contains(&format!("{name:#}").as_str()))
            }))
            .unwrap_or(0);

        let mut f = backtrace::BacktraceFmt::new(fmt, backtrace::PrintFmt::Short, &mut print_path);
        f.add_context()?;
        for frame in &frames[start..] {
            f.frame().backtrace_frame(frame)?;
        }
        f.finish()
    }
}

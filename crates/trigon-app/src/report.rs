//! Fatal error reporting.

use trigon_engine::device::InitError;

const TITLE: &str = "Initialization Failed";

/// Shows a startup failure to the user.
pub fn fatal(err: &anyhow::Error) {
    let text = message(err);
    log::error!("{text}");
    show(&text);
}

fn message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<InitError>() {
        Some(init) => format!("Renderer initialization failed during {}.\n\n{:#}", init.stage, init.source),
        None => format!("{err:#}"),
    }
}

#[cfg(windows)]
fn show(text: &str) {
    use windows::core::HSTRING;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    unsafe {
        MessageBoxW(
            HWND::default(),
            &HSTRING::from(text),
            &HSTRING::from(TITLE),
            MB_OK | MB_ICONERROR,
        );
    }
}

#[cfg(not(windows))]
fn show(text: &str) {
    eprintln!("{TITLE}: {text}");
}

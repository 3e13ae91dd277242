//! Text progress bar on stderr

use std::io::Write;

use dispatcher::Progress;

/// Bar width in columns
pub const BAR_WIDTH: usize = 50;

/// `[#####-----]  42.0% (420/1000)`
pub fn render(progress: Progress) -> String {
    let percent = progress.percent().clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:5.1}% ({}/{})",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent,
        progress.current,
        progress.total
    )
}

/// Observer for the driver that redraws the bar in place
pub fn stderr_bar() -> impl FnMut(Progress) + 'static {
    move |progress: Progress| {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{}", render(progress));
        if progress.current >= progress.total {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    }
}
